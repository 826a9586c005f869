//! LiveFeed
//!
//! Owns one push connection and fans inbound messages out to per-topic handlers.
//! Responsibilities:
//!   • Drive the transport handshake and report `ConnectionState`
//!   • (Re)subscribe every registered topic after each handshake
//!   • Parse inbound bodies into `LiveMessage`, dropping malformed ones
//!   • Reconnect according to `ReconnectPolicy`
//!   • Guarantee that no handler runs once `unsubscribe()` or `disconnect()`
//!     has returned
//!
//! The connection runs as a single tokio task. Handlers are invoked on that
//! task, in transport delivery order, and must not block.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use parking_lot::Mutex;
use tokio::sync::{Mutex as AsyncMutex, mpsc, oneshot, watch};
use tokio::task::JoinHandle;
use tokio::time::{Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, instrument, warn};

use crate::counters::FeedCounters;
use crate::errors::FeedError;
use crate::reconnect::ReconnectPolicy;
use crate::transport::{Inbound, Transport, TransportSession};
use crate::types::{ConnectionState, LiveMessage, SubscriptionId, Topic};

type Handler = Box<dyn Fn(&LiveMessage) + Send + Sync>;

const COMMAND_QUEUE: usize = 64;
const CLOSE_GRACE: Duration = Duration::from_secs(2);
/// Multiple of the broker's heart-beat interval tolerated without any frame.
const SILENCE_FACTOR: u32 = 2;

enum Command {
    Subscribe(Topic),
    Unsubscribe(Topic),
    Publish {
        destination: String,
        body: String,
        reply: oneshot::Sender<Result<(), FeedError>>,
    },
    Close,
}

/// How a served session ended.
enum SessionEnd {
    /// `disconnect()` asked us to stop.
    Closed,
    /// Peer went away or a write failed.
    Dropped,
    /// Broker sent ERROR.
    Protocol(String),
}

/// One registered handler. `live` stays locked for the whole call, so
/// retiring a slot waits out an invocation already in progress.
struct Slot {
    id: SubscriptionId,
    live: Mutex<bool>,
    handler: Handler,
}

impl Slot {
    fn new(id: SubscriptionId, handler: Handler) -> Self {
        Self {
            id,
            live: Mutex::new(true),
            handler,
        }
    }

    /// Returns false if the slot was retired before the call.
    fn invoke(&self, msg: &LiveMessage) -> bool {
        let live = self.live.lock();
        if !*live {
            return false;
        }
        (self.handler)(msg);
        true
    }

    fn retire(&self) {
        *self.live.lock() = false;
    }
}

#[derive(Default)]
struct Registry {
    next_id: u64,
    handlers: HashMap<Topic, Vec<Arc<Slot>>>,
}

impl Registry {
    fn handlers_for(&self, topic: &Topic) -> Vec<Arc<Slot>> {
        self.handlers.get(topic).cloned().unwrap_or_default()
    }

    fn topics(&self) -> Vec<Topic> {
        self.handlers.keys().cloned().collect()
    }

    fn has_topic(&self, topic: &Topic) -> bool {
        self.handlers.contains_key(topic)
    }
}

struct Shared {
    transport: Arc<dyn Transport>,
    policy: ReconnectPolicy,
    registry: Mutex<Registry>,
    state: watch::Sender<ConnectionState>,
    counters: FeedCounters,
}

impl Shared {
    fn set_state(&self, next: ConnectionState) {
        let prev = self.state.send_replace(next);
        if prev != next {
            debug!(from = %prev, to = %next, "feed state changed");
        }
    }
}

struct Connection {
    commands: mpsc::Sender<Command>,
    task: JoinHandle<()>,
}

/// Push-feed adapter: connect / subscribe / disconnect.
pub struct LiveFeed {
    shared: Arc<Shared>,
    conn: AsyncMutex<Option<Connection>>,
}

impl LiveFeed {
    pub fn new(transport: Arc<dyn Transport>, policy: ReconnectPolicy) -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self {
            shared: Arc::new(Shared {
                transport,
                policy,
                registry: Mutex::new(Registry::default()),
                state,
                counters: FeedCounters::default(),
            }),
            conn: AsyncMutex::new(None),
        }
    }

    pub fn state(&self) -> ConnectionState {
        *self.shared.state.borrow()
    }

    /// Status flag for the UI; changes on every transition.
    pub fn watch_state(&self) -> watch::Receiver<ConnectionState> {
        self.shared.state.subscribe()
    }

    pub fn counters(&self) -> &FeedCounters {
        &self.shared.counters
    }

    /// Opens the connection and waits for the first handshake outcome.
    ///
    /// No-op while Connecting or Connected. From Error or Disconnected any
    /// pending reconnect is cancelled and a fresh handshake starts.
    #[instrument(skip(self))]
    pub async fn connect(&self) -> ConnectionState {
        let mut conn = self.conn.lock().await;

        if let Some(c) = conn.as_ref() {
            let current = self.state();
            if !c.task.is_finished() && current.is_live() {
                debug!(state = %current, "connect ignored; feed already live");
                return current;
            }
        }

        if let Some(stale) = conn.take() {
            stale.task.abort();
            let _ = stale.task.await;
        }

        self.shared.set_state(ConnectionState::Connecting);

        let (commands, command_rx) = mpsc::channel(COMMAND_QUEUE);
        let (ready_tx, ready_rx) = oneshot::channel();
        let shared = Arc::clone(&self.shared);
        let task = tokio::spawn(run_connection(shared, command_rx, ready_tx));

        *conn = Some(Connection { commands, task });
        drop(conn);

        match ready_rx.await {
            Ok(state) => state,
            Err(_) => self.state(),
        }
    }

    /// Registers `handler` for `topic`. Several handlers per topic are allowed;
    /// they run in registration order for each message.
    pub async fn subscribe<F>(&self, topic: Topic, handler: F) -> SubscriptionId
    where
        F: Fn(&LiveMessage) + Send + Sync + 'static,
    {
        let (id, first_for_topic) = {
            let mut reg = self.shared.registry.lock();
            reg.next_id += 1;
            let id = SubscriptionId(reg.next_id);
            let entry = reg.handlers.entry(topic.clone()).or_default();
            let first = entry.is_empty();
            entry.push(Arc::new(Slot::new(id, Box::new(handler))));
            (id, first)
        };

        debug!(topic = %topic, ?id, "handler registered");

        if first_for_topic {
            self.command(Command::Subscribe(topic)).await;
        }
        id
    }

    /// Removes one handler. Returns false if the id was unknown.
    ///
    /// If the handler is running on the connection task right now, this
    /// waits for that call to finish. Once it returns the handler is never
    /// invoked again, even for a message whose dispatch already started.
    pub async fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let (slot, emptied) = {
            let mut reg = self.shared.registry.lock();
            let mut found = None;
            for (topic, hs) in reg.handlers.iter_mut() {
                if let Some(pos) = hs.iter().position(|s| s.id == id) {
                    let slot = hs.remove(pos);
                    found = Some((slot, topic.clone(), hs.is_empty()));
                    break;
                }
            }

            match found {
                None => return false,
                Some((slot, topic, true)) => {
                    reg.handlers.remove(&topic);
                    (slot, Some(topic))
                }
                Some((slot, _, false)) => (slot, None),
            }
        };

        slot.retire();
        debug!(?id, "handler retired");

        if let Some(topic) = emptied {
            self.command(Command::Unsubscribe(topic)).await;
        }
        true
    }

    /// Sends a JSON body to a broker destination. Requires a live session.
    pub async fn publish(
        &self,
        destination: &str,
        body: &serde_json::Value,
    ) -> Result<(), FeedError> {
        if !self.state().is_connected() {
            warn!(destination, "cannot publish; feed not connected");
            return Err(FeedError::NotConnected);
        }

        let commands = {
            let conn = self.conn.lock().await;
            conn.as_ref()
                .map(|c| c.commands.clone())
                .ok_or(FeedError::NotConnected)?
        };

        let (reply, reply_rx) = oneshot::channel();
        commands
            .send(Command::Publish {
                destination: destination.to_string(),
                body: body.to_string(),
                reply,
            })
            .await
            .map_err(|_| FeedError::ChannelClosed)?;

        reply_rx.await.map_err(|_| FeedError::ChannelClosed)?
    }

    /// Tears the connection down and forgets every handler.
    ///
    /// Idempotent. When this returns the connection task has finished, so no
    /// handler will be invoked again.
    #[instrument(skip(self))]
    pub async fn disconnect(&self) {
        let conn = self.conn.lock().await.take();

        let slots: Vec<Arc<Slot>> = {
            let mut reg = self.shared.registry.lock();
            reg.handlers.drain().flat_map(|(_, hs)| hs).collect()
        };
        let dropped_handlers = slots.len();
        for slot in &slots {
            slot.retire();
        }

        if let Some(Connection { commands, mut task }) = conn {
            let _ = commands.try_send(Command::Close);
            drop(commands);

            if tokio::time::timeout(CLOSE_GRACE, &mut task).await.is_err() {
                warn!("connection task did not stop in time; aborting");
                task.abort();
                let _ = task.await;
            }
            info!(dropped_handlers, "feed disconnected");
        }

        self.shared.set_state(ConnectionState::Disconnected);
    }

    async fn command(&self, cmd: Command) {
        let conn = self.conn.lock().await;
        if let Some(c) = conn.as_ref() {
            // Full or closed queue: the next handshake resubscribes from the registry.
            if let Err(e) = c.commands.try_send(cmd) {
                debug!(error = %e, "feed command not queued");
            }
        }
    }
}

impl Drop for LiveFeed {
    fn drop(&mut self) {
        if let Some(c) = self.conn.get_mut().take() {
            c.task.abort();
        }
    }
}

async fn run_connection(
    shared: Arc<Shared>,
    mut commands: mpsc::Receiver<Command>,
    ready: oneshot::Sender<ConnectionState>,
) {
    let mut ready = Some(ready);
    let mut attempt: u32 = 0;
    let mut handshakes: u64 = 0;

    loop {
        shared.set_state(ConnectionState::Connecting);

        let end_state = match shared.transport.open().await {
            Ok(mut session) => match resubscribe_all(&shared, session.as_mut()).await {
                Ok(mut active) => {
                    attempt = 0;
                    handshakes += 1;
                    if handshakes > 1 {
                        FeedCounters::bump(&shared.counters.reconnects);
                    }

                    shared.set_state(ConnectionState::Connected);
                    report(&mut ready, ConnectionState::Connected);
                    info!("feed connected");

                    match serve(&shared, session.as_mut(), &mut active, &mut commands).await {
                        SessionEnd::Closed => {
                            session.close().await;
                            return;
                        }
                        SessionEnd::Dropped => {
                            warn!("feed connection dropped");
                            ConnectionState::Disconnected
                        }
                        SessionEnd::Protocol(reason) => {
                            error!(reason = %reason, "broker reported error");
                            session.close().await;
                            ConnectionState::Error
                        }
                    }
                }
                Err(e) => {
                    error!(error = %e, "resubscribe failed after handshake");
                    session.close().await;
                    ConnectionState::Error
                }
            },
            Err(e) => {
                error!(error = %e, "feed connection failed");
                ConnectionState::Error
            }
        };

        shared.set_state(end_state);
        report(&mut ready, end_state);

        let Some(delay) = shared.policy.delay_for(attempt) else {
            warn!(attempt, "reconnect attempts exhausted; feed stays down");
            return;
        };
        attempt += 1;

        warn!(attempt, delay = ?delay, "scheduling reconnect");
        if !backoff(delay, &mut commands).await {
            return;
        }
    }
}

fn report(ready: &mut Option<oneshot::Sender<ConnectionState>>, state: ConnectionState) {
    if let Some(tx) = ready.take() {
        let _ = tx.send(state);
    }
}

/// Subscribes every registered topic on a fresh session and returns the
/// set of topics the broker now knows about.
async fn resubscribe_all(
    shared: &Shared,
    session: &mut dyn TransportSession,
) -> Result<HashSet<Topic>, FeedError> {
    let topics = shared.registry.lock().topics();
    let mut active = HashSet::with_capacity(topics.len());
    for topic in topics {
        session
            .subscribe(&topic.subscription_id(), &topic.destination())
            .await?;
        active.insert(topic);
    }
    Ok(active)
}

/// Sleeps out the backoff while still answering commands.
/// Returns false if the feed was closed meanwhile.
async fn backoff(delay: Duration, commands: &mut mpsc::Receiver<Command>) -> bool {
    let sleep = tokio::time::sleep(delay);
    tokio::pin!(sleep);

    loop {
        tokio::select! {
            _ = &mut sleep => return true,
            cmd = commands.recv() => match cmd {
                None | Some(Command::Close) => return false,
                Some(Command::Publish { reply, .. }) => {
                    let _ = reply.send(Err(FeedError::NotConnected));
                }
                // Registry is the source of truth; the next handshake picks these up.
                Some(Command::Subscribe(_)) | Some(Command::Unsubscribe(_)) => {}
            },
        }
    }
}

async fn serve(
    shared: &Shared,
    session: &mut dyn TransportSession,
    active: &mut HashSet<Topic>,
    commands: &mut mpsc::Receiver<Command>,
) -> SessionEnd {
    let mut heartbeat = session.heartbeat_interval().map(|every| {
        let mut i = tokio::time::interval_at(tokio::time::Instant::now() + every, every);
        i.set_missed_tick_behavior(MissedTickBehavior::Delay);
        i
    });
    let silence_limit = session.incoming_heartbeat().map(|every| every * SILENCE_FACTOR);
    let mut last_inbound = Instant::now();

    loop {
        tokio::select! {
            inbound = session.recv() => match inbound {
                None => return SessionEnd::Dropped,
                Some(Err(e)) => {
                    warn!(error = %e, "feed transport error");
                    return SessionEnd::Dropped;
                }
                Some(Ok(inbound)) => {
                    last_inbound = Instant::now();
                    match inbound {
                        Inbound::Heartbeat => {}
                        Inbound::Error(reason) => return SessionEnd::Protocol(reason),
                        Inbound::Malformed(reason) => {
                            warn!(reason = %reason, "dropping undecodable frame");
                            FeedCounters::bump(&shared.counters.dropped);
                        }
                        Inbound::Message { destination, body } => {
                            deliver(shared, &destination, &body);
                        }
                    }
                }
            },
            cmd = commands.recv() => match cmd {
                None | Some(Command::Close) => return SessionEnd::Closed,
                Some(Command::Subscribe(topic)) => {
                    // Already covered by the handshake, or no longer wanted.
                    if active.contains(&topic) || !shared.registry.lock().has_topic(&topic) {
                        continue;
                    }
                    if let Err(e) = session.subscribe(&topic.subscription_id(), &topic.destination()).await {
                        warn!(error = %e, topic = %topic, "subscribe failed");
                        return SessionEnd::Dropped;
                    }
                    active.insert(topic);
                }
                Some(Command::Unsubscribe(topic)) => {
                    if !active.remove(&topic) {
                        continue;
                    }
                    if let Err(e) = session.unsubscribe(&topic.subscription_id()).await {
                        warn!(error = %e, topic = %topic, "unsubscribe failed");
                        return SessionEnd::Dropped;
                    }
                }
                Some(Command::Publish { destination, body, reply }) => {
                    let res = session.send(&destination, &body).await;
                    let failed = res.is_err();
                    let _ = reply.send(res);
                    if failed {
                        return SessionEnd::Dropped;
                    }
                }
            },
            _ = tick(&mut heartbeat) => {
                if let Err(e) = session.keepalive().await {
                    warn!(error = %e, "heart-beat failed");
                    return SessionEnd::Dropped;
                }
            }
            _ = silent_until(silence_limit, last_inbound) => {
                warn!(limit = ?silence_limit, "no frame from broker within heart-beat window");
                return SessionEnd::Dropped;
            }
        }
    }
}

async fn silent_until(limit: Option<Duration>, since: Instant) {
    match limit {
        Some(limit) => tokio::time::sleep_until(since + limit).await,
        None => std::future::pending::<()>().await,
    }
}

async fn tick(interval: &mut Option<Interval>) {
    match interval {
        Some(i) => {
            i.tick().await;
        }
        None => std::future::pending::<()>().await,
    }
}

fn deliver(shared: &Shared, destination: &str, body: &str) {
    let Some(topic) = Topic::from_destination(destination) else {
        debug!(destination, "message for non-topic destination");
        FeedCounters::bump(&shared.counters.unrouted);
        return;
    };

    let msg = match LiveMessage::parse(topic, body, Utc::now()) {
        Ok(m) => m,
        Err(e) => {
            warn!(error = %e, destination, "dropping malformed payload");
            FeedCounters::bump(&shared.counters.dropped);
            return;
        }
    };

    // Registry lock is released before any handler runs; retired slots are
    // skipped inside `invoke`.
    let slots = shared.registry.lock().handlers_for(msg.topic());
    let mut invoked = 0usize;
    for slot in &slots {
        if slot.invoke(&msg) {
            invoked += 1;
        }
    }

    if invoked == 0 {
        FeedCounters::bump(&shared.counters.unrouted);
    } else {
        FeedCounters::bump(&shared.counters.delivered);
    }
}
