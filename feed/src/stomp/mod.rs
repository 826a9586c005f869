mod frame;
mod ws;

pub use frame::{Command, Decoded, Frame, FrameError};
pub use ws::{DEFAULT_HANDSHAKE_TIMEOUT, DEFAULT_HEARTBEAT, StompWsSession, StompWsTransport, negotiate_heartbeat, negotiate_incoming};
