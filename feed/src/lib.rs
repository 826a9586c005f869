//! Live push feed for dashboard panels.
//!
//! Data flow:
//! STOMP/WebSocket transport → LiveFeed (dispatch per topic) → handlers → EventLog

pub mod adapter;
pub mod counters;
pub mod errors;
pub mod event_log;
pub mod reconnect;
pub mod stomp;
pub mod transport;
pub mod types;

pub use adapter::LiveFeed;
pub use counters::{FeedCounters, FeedCountersSnapshot};
pub use errors::FeedError;
pub use event_log::{DEFAULT_EVENT_LOG_CAPACITY, EventLog};
pub use reconnect::ReconnectPolicy;
pub use stomp::StompWsTransport;
pub use transport::{Inbound, Transport, TransportSession};
pub use types::{ConnectionState, LiveMessage, SubscriptionId, Topic};
