use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use feed::{DEFAULT_EVENT_LOG_CAPACITY, ReconnectPolicy};
use tracing::warn;

use crate::auth::AuthToken;

#[derive(Clone, Debug)]
pub struct AppConfig {
    // =========================
    // Endpoints
    // =========================
    /// STOMP-over-WebSocket endpoint of the push broker.
    pub ws_url: String,

    /// Base URL of the REST collaborator, without a trailing slash.
    pub api_url: String,

    /// Bearer credential presented on the socket handshake and on every
    /// REST call. Taken verbatim from `DASHBOARD_AUTH_TOKEN`.
    pub auth_token: Option<AuthToken>,

    /// File holding the credential when it is not passed inline.
    /// Only read if `auth_token` is unset.
    pub auth_token_file: Option<PathBuf>,

    // =========================
    // Live feed
    // =========================
    /// How many recent live messages each panel keeps, newest first.
    ///
    /// Values below 1 are raised to 1.
    pub event_log_capacity: usize,

    /// Backoff applied after the socket drops or a handshake fails.
    ///
    /// The delay doubles per attempt (capped at one minute) and the feed
    /// gives up after `max_attempts`, staying in `Error` until the next
    /// explicit connect.
    pub reconnect: ReconnectPolicy,

    // =========================
    // REST
    // =========================
    /// How often mounted panels re-fetch their REST data.
    pub poll_interval: Duration,

    /// Per-request timeout for the REST client.
    pub http_timeout: Duration,

    // =========================
    // Demo data
    // =========================
    /// Skip the REST collaborator entirely and run on seed values.
    pub mock_mode: bool,

    /// Run the jitter tickers that make seed values move.
    pub realtime_updates: bool,
}

impl AppConfig {
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the config from any key lookup. Unparsable values fall back to
    /// their default with a warning.
    pub fn from_lookup<F>(get: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = ReconnectPolicy::default();

        let reconnect = ReconnectPolicy {
            initial_delay: Duration::from_millis(parse_or(
                &get,
                "DASHBOARD_RECONNECT_DELAY_MS",
                defaults.initial_delay.as_millis() as u64,
            )),
            max_attempts: Some(parse_or(
                &get,
                "DASHBOARD_RECONNECT_MAX_ATTEMPTS",
                defaults.max_attempts.unwrap_or(5),
            )),
            ..defaults
        };

        // interval() panics on a zero period.
        let poll_secs: u64 = parse_or(&get, "DASHBOARD_POLL_INTERVAL_SECS", 30);

        Self {
            ws_url: get("DASHBOARD_WS_URL").unwrap_or_else(|| "ws://localhost:8080/ws".to_string()),
            api_url: get("DASHBOARD_API_URL")
                .unwrap_or_else(|| "http://localhost:8080".to_string())
                .trim_end_matches('/')
                .to_string(),
            auth_token: get("DASHBOARD_AUTH_TOKEN").and_then(AuthToken::new),
            auth_token_file: get("DASHBOARD_AUTH_TOKEN_FILE")
                .filter(|p| !p.trim().is_empty())
                .map(PathBuf::from),

            event_log_capacity: parse_or::<usize, _>(
                &get,
                "DASHBOARD_EVENT_LOG_CAPACITY",
                DEFAULT_EVENT_LOG_CAPACITY,
            )
            .max(1),
            reconnect,

            poll_interval: Duration::from_secs(poll_secs.max(1)),
            http_timeout: Duration::from_secs(10),

            mock_mode: flag(&get, "DASHBOARD_MOCK_MODE", false),
            realtime_updates: flag(&get, "DASHBOARD_REALTIME_UPDATES", true),
        }
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> T
where
    T: FromStr + Copy,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        None => default,
        Some(raw) => raw.trim().parse().unwrap_or_else(|_| {
            warn!(key, value = %raw, "invalid config value; using default");
            default
        }),
    }
}

fn flag<F>(get: &F, key: &str, default: bool) -> bool
where
    F: Fn(&str) -> Option<String>,
{
    let Some(raw) = get(key) else {
        return default;
    };

    match raw.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => true,
        "0" | "false" | "no" | "off" => false,
        _ => {
            warn!(key, value = %raw, "invalid boolean; using default");
            default
        }
    }
}
