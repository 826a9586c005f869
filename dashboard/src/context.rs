use std::sync::Arc;

use feed::{ConnectionState, LiveFeed, StompWsTransport, Transport};
use telemetry::MetricStore;
use tracing::{info, instrument};

use crate::api::ApiClient;
use crate::auth::AuthToken;
use crate::config::AppConfig;
use crate::error::AppError;

/// Everything panels share, built once by the host and passed by reference.
pub struct DashboardContext {
    config: AppConfig,
    feed: LiveFeed,
    api: Option<ApiClient>,
    metrics: MetricStore,
}

impl DashboardContext {
    /// Real wiring: STOMP over WebSocket plus the REST client.
    pub fn from_config(config: AppConfig) -> Result<Self, AppError> {
        let token = AuthToken::resolve(&config)?;

        let mut transport = StompWsTransport::new(config.ws_url.clone());
        if let Some(t) = &token {
            transport = transport.with_bearer(t.expose());
        }

        Self::with_transport(config, token, Arc::new(transport))
    }

    pub fn with_transport(
        config: AppConfig,
        token: Option<AuthToken>,
        transport: Arc<dyn Transport>,
    ) -> Result<Self, AppError> {
        let api = if config.mock_mode {
            None
        } else {
            Some(ApiClient::new(
                config.api_url.clone(),
                token,
                config.http_timeout,
            )?)
        };

        let feed = LiveFeed::new(transport, config.reconnect.clone());

        Ok(Self {
            config,
            feed,
            api,
            metrics: MetricStore::new(),
        })
    }

    /// Connects the live feed. In mock mode there is no broker and the feed
    /// stays `Disconnected`.
    #[instrument(skip(self), fields(ws_url = %self.config.ws_url, mock = self.config.mock_mode))]
    pub async fn init(&self) -> ConnectionState {
        if self.config.mock_mode {
            info!("mock mode; live feed not started");
            return self.feed.state();
        }

        let state = self.feed.connect().await;
        info!(%state, "live feed initialised");
        state
    }

    /// Disconnects the feed. Panels should be unmounted first so their
    /// tickers and refreshers are stopped.
    #[instrument(skip(self))]
    pub async fn shutdown(&self) {
        self.feed.disconnect().await;
        let c = self.feed.counters().snapshot();
        info!(
            delivered = c.delivered,
            dropped = c.dropped,
            unrouted = c.unrouted,
            reconnects = c.reconnects,
            "dashboard context shut down"
        );
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn feed(&self) -> &LiveFeed {
        &self.feed
    }

    /// `None` in mock mode.
    pub fn api(&self) -> Option<&ApiClient> {
        self.api.as_ref()
    }

    pub fn metrics(&self) -> &MetricStore {
        &self.metrics
    }
}
