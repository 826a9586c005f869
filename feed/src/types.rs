use std::fmt;
use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::errors::FeedError;

const TOPIC_PREFIX: &str = "/topic/";

/// Named push channel, e.g. `risk-updates`.
///
/// Stored without the broker prefix; `destination()` adds it back.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Topic(String);

impl Topic {
    pub const RISK_UPDATES: &'static str = "risk-updates";
    pub const RECOMMENDATIONS: &'static str = "recommendations";
    pub const ALERTS: &'static str = "alerts";
    pub const ANALYTICS: &'static str = "analytics";
    pub const PREDICTIONS: &'static str = "predictions";
    pub const PERFORMANCE: &'static str = "performance";

    pub fn new(name: impl Into<String>) -> Self {
        let name = name.into();
        match name.strip_prefix(TOPIC_PREFIX) {
            Some(bare) => Self(bare.to_string()),
            None => Self(name),
        }
    }

    pub fn risk_updates() -> Self {
        Self::new(Self::RISK_UPDATES)
    }

    pub fn recommendations() -> Self {
        Self::new(Self::RECOMMENDATIONS)
    }

    pub fn alerts() -> Self {
        Self::new(Self::ALERTS)
    }

    pub fn analytics() -> Self {
        Self::new(Self::ANALYTICS)
    }

    pub fn predictions() -> Self {
        Self::new(Self::PREDICTIONS)
    }

    pub fn performance() -> Self {
        Self::new(Self::PERFORMANCE)
    }

    /// Maps a broker destination back to a topic. Only `/topic/*` is routable.
    pub fn from_destination(destination: &str) -> Option<Self> {
        destination
            .strip_prefix(TOPIC_PREFIX)
            .filter(|name| !name.is_empty())
            .map(|name| Self(name.to_string()))
    }

    pub fn name(&self) -> &str {
        &self.0
    }

    pub fn destination(&self) -> String {
        format!("{}{}", TOPIC_PREFIX, self.0)
    }

    /// Subscription id used on the wire. One broker subscription per topic.
    pub(crate) fn subscription_id(&self) -> String {
        format!("sub-{}", self.0)
    }
}

impl fmt::Display for Topic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Topic {
    fn from(v: &str) -> Self {
        Self::new(v)
    }
}

/// A single push-delivered event. Immutable once built; clones share the payload.
#[derive(Clone, Debug, PartialEq)]
pub struct LiveMessage {
    topic: Topic,
    payload: Arc<Map<String, Value>>,
    timestamp: DateTime<Utc>,
}

impl LiveMessage {
    pub fn new(topic: Topic, payload: Map<String, Value>, timestamp: DateTime<Utc>) -> Self {
        Self {
            topic,
            payload: Arc::new(payload),
            timestamp,
        }
    }

    /// Parses a frame body.
    ///
    /// The body must be a JSON object. A payload `timestamp` in RFC 3339 wins
    /// over `received_at`; anything else in that field is ignored.
    pub fn parse(topic: Topic, body: &str, received_at: DateTime<Utc>) -> Result<Self, FeedError> {
        let value: Value = serde_json::from_str(body)
            .map_err(|e| FeedError::MalformedPayload(format!("invalid json: {e}")))?;

        let Value::Object(payload) = value else {
            return Err(FeedError::MalformedPayload(
                "payload is not a json object".to_string(),
            ));
        };

        let timestamp = payload
            .get("timestamp")
            .and_then(Value::as_str)
            .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
            .map(|t| t.with_timezone(&Utc))
            .unwrap_or(received_at);

        Ok(Self::new(topic, payload, timestamp))
    }

    pub fn topic(&self) -> &Topic {
        &self.topic
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }

    pub fn timestamp(&self) -> DateTime<Utc> {
        self.timestamp
    }

    /// The payload's `type` discriminator, if any.
    pub fn kind(&self) -> Option<&str> {
        self.payload.get("type").and_then(Value::as_str)
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.payload.get(key)
    }
}

/// Lifecycle of a feed connection.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConnectionState {
    #[default]
    Disconnected,
    Connecting,
    Connected,
    Error,
}

impl ConnectionState {
    pub fn is_connected(self) -> bool {
        matches!(self, Self::Connected)
    }

    /// Connecting or connected; `connect()` is a no-op in these states.
    pub fn is_live(self) -> bool {
        matches!(self, Self::Connecting | Self::Connected)
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Disconnected => "DISCONNECTED",
            Self::Connecting => "CONNECTING",
            Self::Connected => "CONNECTED",
            Self::Error => "ERROR",
        };
        f.write_str(s)
    }
}

/// Handle returned by `LiveFeed::subscribe`, used to remove one handler.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SubscriptionId(pub(crate) u64);
