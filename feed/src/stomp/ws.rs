use std::time::Duration;

use async_trait::async_trait;
use futures::stream::{SplitSink, SplitStream};
use futures::{SinkExt, StreamExt};
use tokio::net::TcpStream;
use tokio::time::timeout;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async, tungstenite::Message};
use tracing::{debug, info, instrument, trace, warn};

use super::frame::{Command, Decoded, Frame};
use crate::errors::FeedError;
use crate::transport::{Inbound, Transport, TransportSession};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

pub const DEFAULT_HEARTBEAT: Duration = Duration::from_millis(4000);
pub const DEFAULT_HANDSHAKE_TIMEOUT: Duration = Duration::from_secs(10);

/// STOMP 1.2 over a plain WebSocket endpoint.
#[derive(Clone)]
pub struct StompWsTransport {
    url: String,
    host: String,
    bearer: Option<String>,
    heartbeat: Duration,
    handshake_timeout: Duration,
}

impl StompWsTransport {
    pub fn new(url: impl Into<String>) -> Self {
        let url = url.into();
        let host = host_of(&url).unwrap_or("localhost").to_string();
        Self {
            url,
            host,
            bearer: None,
            heartbeat: DEFAULT_HEARTBEAT,
            handshake_timeout: DEFAULT_HANDSHAKE_TIMEOUT,
        }
    }

    /// Sent as `Authorization: Bearer <token>` on CONNECT.
    pub fn with_bearer(mut self, token: impl Into<String>) -> Self {
        self.bearer = Some(token.into());
        self
    }

    /// Both directions; zero disables heart-beating.
    pub fn with_heartbeat(mut self, every: Duration) -> Self {
        self.heartbeat = every;
        self
    }

    pub fn with_handshake_timeout(mut self, t: Duration) -> Self {
        self.handshake_timeout = t;
        self
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    fn connect_frame(&self) -> Frame {
        let hb = self.heartbeat.as_millis();
        let mut frame = Frame::new(Command::Connect)
            .header("accept-version", "1.2")
            .header("host", self.host.clone())
            .header("heart-beat", format!("{hb},{hb}"));

        if let Some(token) = &self.bearer {
            frame = frame.header("Authorization", format!("Bearer {token}"));
        }
        frame
    }

    async fn handshake(&self) -> Result<StompWsSession, FeedError> {
        let (ws, _) = connect_async(self.url.as_str()).await?;
        let (mut write, mut read) = ws.split();

        write
            .send(Message::Text(self.connect_frame().encode().into()))
            .await?;

        while let Some(msg) = read.next().await {
            let msg = msg?;
            if msg.is_close() {
                break;
            }
            if !(msg.is_text() || msg.is_binary()) {
                continue;
            }

            let raw = msg.to_text()?;
            match Frame::decode(raw)? {
                Decoded::Heartbeat => continue,
                Decoded::Frame(f) if f.command == Command::Connected => {
                    let server_hb = f.get("heart-beat");
                    let heartbeat = negotiate_heartbeat(self.heartbeat, server_hb);
                    let incoming = negotiate_incoming(self.heartbeat, server_hb);
                    info!(
                        version = f.get("version").unwrap_or("?"),
                        heartbeat_ms = heartbeat.map(|d| d.as_millis() as u64),
                        incoming_ms = incoming.map(|d| d.as_millis() as u64),
                        "stomp session established"
                    );
                    return Ok(StompWsSession {
                        write,
                        read,
                        heartbeat,
                        incoming,
                    });
                }
                Decoded::Frame(f) if f.command == Command::Error => {
                    let reason = f.get("message").unwrap_or(f.body.as_str()).to_string();
                    return Err(FeedError::Handshake(reason));
                }
                Decoded::Frame(f) => {
                    return Err(FeedError::Handshake(format!(
                        "unexpected {} before CONNECTED",
                        f.command
                    )));
                }
            }
        }

        Err(FeedError::Handshake(
            "connection closed during handshake".to_string(),
        ))
    }
}

#[async_trait]
impl Transport for StompWsTransport {
    #[instrument(skip(self), fields(url = %self.url))]
    async fn open(&self) -> Result<Box<dyn TransportSession>, FeedError> {
        debug!("opening stomp websocket");
        let session = timeout(self.handshake_timeout, self.handshake())
            .await
            .map_err(|_| FeedError::Timeout(self.handshake_timeout))??;
        Ok(Box::new(session))
    }
}

pub struct StompWsSession {
    write: SplitSink<WsStream, Message>,
    read: SplitStream<WsStream>,
    heartbeat: Option<Duration>,
    incoming: Option<Duration>,
}

impl StompWsSession {
    async fn send_frame(&mut self, frame: Frame) -> Result<(), FeedError> {
        self.write
            .send(Message::Text(frame.encode().into()))
            .await?;
        Ok(())
    }
}

#[async_trait]
impl TransportSession for StompWsSession {
    async fn subscribe(&mut self, subscription_id: &str, destination: &str) -> Result<(), FeedError> {
        debug!(subscription_id, destination, "stomp subscribe");
        self.send_frame(
            Frame::new(Command::Subscribe)
                .header("id", subscription_id)
                .header("destination", destination)
                .header("ack", "auto"),
        )
        .await
    }

    async fn unsubscribe(&mut self, subscription_id: &str) -> Result<(), FeedError> {
        debug!(subscription_id, "stomp unsubscribe");
        self.send_frame(Frame::new(Command::Unsubscribe).header("id", subscription_id))
            .await
    }

    async fn send(&mut self, destination: &str, body: &str) -> Result<(), FeedError> {
        self.send_frame(
            Frame::new(Command::Send)
                .header("destination", destination)
                .header("content-type", "application/json")
                .with_body(body),
        )
        .await
    }

    async fn recv(&mut self) -> Option<Result<Inbound, FeedError>> {
        loop {
            let msg = match self.read.next().await? {
                Ok(m) => m,
                Err(e) => return Some(Err(e.into())),
            };

            // Any traffic proves the peer is alive.
            if msg.is_ping() || msg.is_pong() {
                return Some(Ok(Inbound::Heartbeat));
            }
            if msg.is_close() {
                return None;
            }

            let raw = match msg.to_text() {
                Ok(t) => t,
                Err(e) => return Some(Ok(Inbound::Malformed(format!("non-utf8 frame: {e}")))),
            };

            trace!(raw_frame = %raw, "received stomp frame");

            let frame = match Frame::decode(raw) {
                Ok(Decoded::Heartbeat) => return Some(Ok(Inbound::Heartbeat)),
                Ok(Decoded::Frame(f)) => f,
                Err(e) => return Some(Ok(Inbound::Malformed(e.to_string()))),
            };

            match frame.command {
                Command::Message => {
                    let destination = frame.get("destination").unwrap_or_default().to_string();
                    return Some(Ok(Inbound::Message {
                        destination,
                        body: frame.body,
                    }));
                }
                Command::Error => {
                    let reason = frame
                        .get("message")
                        .map(str::to_string)
                        .unwrap_or(frame.body);
                    return Some(Ok(Inbound::Error(reason)));
                }
                Command::Receipt => continue,
                other => {
                    warn!(command = %other, "ignoring unexpected stomp frame");
                    continue;
                }
            }
        }
    }

    fn heartbeat_interval(&self) -> Option<Duration> {
        self.heartbeat
    }

    fn incoming_heartbeat(&self) -> Option<Duration> {
        self.incoming
    }

    async fn keepalive(&mut self) -> Result<(), FeedError> {
        self.write.send(Message::Text("\n".to_string().into())).await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.send_frame(Frame::new(Command::Disconnect)).await {
            debug!(error = %e, "disconnect frame not delivered");
        }
        let _ = self.write.close().await;
    }
}

/// Outgoing heart-beat interval per STOMP 1.2: disabled if either side says 0,
/// otherwise the larger of our offer and the broker's expectation.
pub fn negotiate_heartbeat(ours: Duration, server_header: Option<&str>) -> Option<Duration> {
    let ours_ms = ours.as_millis() as u64;
    let server_wants_ms = server_header
        .and_then(|h| h.split(',').nth(1))
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    if ours_ms == 0 || server_wants_ms == 0 {
        return None;
    }
    Some(Duration::from_millis(ours_ms.max(server_wants_ms)))
}

/// Interval at which the broker promised to send, per STOMP 1.2: disabled if
/// we did not ask for heart-beats or the broker cannot send them.
pub fn negotiate_incoming(ours: Duration, server_header: Option<&str>) -> Option<Duration> {
    let ours_ms = ours.as_millis() as u64;
    let server_sends_ms = server_header
        .and_then(|h| h.split(',').next())
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(0);

    if ours_ms == 0 || server_sends_ms == 0 {
        return None;
    }
    Some(Duration::from_millis(ours_ms.max(server_sends_ms)))
}

fn host_of(url: &str) -> Option<&str> {
    let after_scheme = url.split_once("://").map(|(_, r)| r).unwrap_or(url);
    let authority = after_scheme.split(['/', '?']).next()?;
    let host = authority.rsplit_once('@').map(|(_, h)| h).unwrap_or(authority);
    let host = host.split(':').next()?;
    (!host.is_empty()).then_some(host)
}
