use std::sync::Arc;

use async_trait::async_trait;
use feed::{FeedError, Inbound, Transport, TransportSession};
use parking_lot::Mutex;
use tokio::sync::mpsc;

/// Broker side of one mock session: push frames in, read what the feed sent.
pub struct Broker {
    inbound: mpsc::UnboundedSender<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
}

impl Broker {
    pub fn push(&self, topic: &str, body: serde_json::Value) {
        let _ = self.inbound.send(Inbound::Message {
            destination: format!("/topic/{topic}"),
            body: body.to_string(),
        });
    }

    /// `SUBSCRIBE <dest>` / `UNSUBSCRIBE <id>` lines in send order.
    pub fn sent(&self) -> Vec<String> {
        self.sent.lock().clone()
    }
}

pub struct MockTransport {
    sessions: mpsc::UnboundedSender<Broker>,
}

impl MockTransport {
    pub fn new() -> (Arc<Self>, mpsc::UnboundedReceiver<Broker>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Arc::new(Self { sessions: tx }), rx)
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn open(&self) -> Result<Box<dyn TransportSession>, FeedError> {
        let (tx, rx) = mpsc::unbounded_channel();
        let sent = Arc::new(Mutex::new(Vec::new()));
        let _ = self.sessions.send(Broker {
            inbound: tx,
            sent: Arc::clone(&sent),
        });
        Ok(Box::new(MockSession { inbound: rx, sent }))
    }
}

struct MockSession {
    inbound: mpsc::UnboundedReceiver<Inbound>,
    sent: Arc<Mutex<Vec<String>>>,
}

#[async_trait]
impl TransportSession for MockSession {
    async fn subscribe(&mut self, _id: &str, destination: &str) -> Result<(), FeedError> {
        self.sent.lock().push(format!("SUBSCRIBE {destination}"));
        Ok(())
    }

    async fn unsubscribe(&mut self, id: &str) -> Result<(), FeedError> {
        self.sent.lock().push(format!("UNSUBSCRIBE {id}"));
        Ok(())
    }

    async fn send(&mut self, destination: &str, _body: &str) -> Result<(), FeedError> {
        self.sent.lock().push(format!("SEND {destination}"));
        Ok(())
    }

    async fn recv(&mut self) -> Option<Result<Inbound, FeedError>> {
        self.inbound.recv().await.map(Ok)
    }

    async fn close(&mut self) {
        self.sent.lock().push("DISCONNECT".to_string());
    }
}
