use std::time::Duration;

/// Backoff schedule applied after a dropped or failed connection.
///
/// `delay_for(n)` is the wait before reconnect attempt `n` (0-based):
/// `initial_delay * multiplier^n`, capped at `max_delay`. Once `max_attempts`
/// consecutive attempts have failed the feed stays down until `connect()`
/// is called again. A successful handshake resets the count.
#[derive(Clone, Debug, PartialEq)]
pub struct ReconnectPolicy {
    pub initial_delay: Duration,
    pub max_delay: Duration,
    pub multiplier: f64,
    /// `None` retries forever.
    pub max_attempts: Option<u32>,
}

impl Default for ReconnectPolicy {
    fn default() -> Self {
        Self {
            initial_delay: Duration::from_secs(5),
            max_delay: Duration::from_secs(60),
            multiplier: 2.0,
            max_attempts: Some(5),
        }
    }
}

impl ReconnectPolicy {
    /// Never reconnect automatically.
    pub fn disabled() -> Self {
        Self {
            max_attempts: Some(0),
            ..Self::default()
        }
    }

    pub fn delay_for(&self, attempt: u32) -> Option<Duration> {
        if let Some(max) = self.max_attempts {
            if attempt >= max {
                return None;
            }
        }

        let factor = self.multiplier.max(1.0).powi(attempt.min(i32::MAX as u32) as i32);
        let base_ms = self.initial_delay.as_millis() as f64 * factor;
        let capped = base_ms.min(self.max_delay.as_millis() as f64);

        Some(Duration::from_millis(capped as u64))
    }
}
