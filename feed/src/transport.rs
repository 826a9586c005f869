use std::time::Duration;

use async_trait::async_trait;

use crate::errors::FeedError;

/// Events a transport session hands to the feed.
#[derive(Clone, Debug, PartialEq)]
pub enum Inbound {
    /// A broker MESSAGE with its destination and raw body.
    Message { destination: String, body: String },
    /// Broker-side failure; the session is unusable afterwards.
    Error(String),
    /// Keep-alive from the broker.
    Heartbeat,
    /// A frame that could not be decoded. Dropped, the session stays up.
    Malformed(String),
}

/// Opens push sessions. One call = one handshake.
#[async_trait]
pub trait Transport: Send + Sync + 'static {
    async fn open(&self) -> Result<Box<dyn TransportSession>, FeedError>;
}

/// An established push session.
///
/// `recv` must be cancel-safe: the feed polls it inside `select!`.
#[async_trait]
pub trait TransportSession: Send {
    async fn subscribe(&mut self, subscription_id: &str, destination: &str) -> Result<(), FeedError>;

    async fn unsubscribe(&mut self, subscription_id: &str) -> Result<(), FeedError>;

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), FeedError>;

    /// `None` once the peer closed the session.
    async fn recv(&mut self) -> Option<Result<Inbound, FeedError>>;

    /// Interval at which `keepalive` should be called, if the session wants one.
    fn heartbeat_interval(&self) -> Option<Duration> {
        None
    }

    /// Interval at which the peer promised to send something. Silence for
    /// twice this long means the connection is dead.
    fn incoming_heartbeat(&self) -> Option<Duration> {
        None
    }

    async fn keepalive(&mut self) -> Result<(), FeedError> {
        Ok(())
    }

    async fn close(&mut self);
}
