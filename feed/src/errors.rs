use std::time::Duration;

use thiserror::Error;

use crate::stomp::FrameError;

#[derive(Error, Debug)]
pub enum FeedError {
    #[error("websocket error: {0}")]
    WebSocket(#[from] tokio_tungstenite::tungstenite::Error),

    #[error("stomp frame error: {0}")]
    Frame(#[from] FrameError),

    #[error("handshake rejected: {0}")]
    Handshake(String),

    #[error("timed out after {0:?}")]
    Timeout(Duration),

    #[error("broker reported error: {0}")]
    Protocol(String),

    #[error("malformed payload: {0}")]
    MalformedPayload(String),

    #[error("feed is not connected")]
    NotConnected,

    #[error("connection task stopped")]
    ChannelClosed,
}
