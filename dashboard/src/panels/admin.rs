//! Admin testing panel
//!
//! System stats (REST, falling back to seed values), the scenario catalog,
//! scenario runs and mock-data generation. The last ten scenario runs are
//! kept newest first.

use common::{TraceId, panel_span};
use feed::EventLog;
use parking_lot::Mutex;
use serde_json::Value;
use telemetry::{JitterTicker, MetricSnapshot, MetricStore, presets};
use tracing::{Span, info, instrument, warn};

use crate::api::{ApiClient, ApiError, MockDataRequest, ScenarioCatalog, ScenarioRequest, ScenarioRun};
use crate::context::DashboardContext;
use crate::error::AppError;
use crate::refresh::Refresher;

pub const NAME: &str = "admin";
pub const SIMULATION_HISTORY: usize = 10;

pub struct AdminPanel {
    api: Option<ApiClient>,
    catalog: ScenarioCatalog,
    simulations: Mutex<EventLog<ScenarioRun>>,
    ticker: Option<JitterTicker>,
    refresher: Option<Refresher>,
    span: Span,
}

impl AdminPanel {
    pub async fn mount(ctx: &DashboardContext) -> Result<Self, AppError> {
        let span = panel_span(NAME, &TraceId::new());
        let store = ctx.metrics();
        let api = ctx.api().cloned();

        store.set(NAME, presets::admin_seed()).await;

        let mut catalog = ScenarioCatalog::default();
        let mut refresher = None;

        if let Some(api) = &api {
            if let Err(e) = load_stats(api, store).await {
                warn!(parent: &span, error = %e, "system stats unavailable; using seed");
            }

            match api.scenarios().await {
                Ok(c) => catalog = c,
                Err(e) => warn!(parent: &span, error = %e, "scenario catalog unavailable"),
            }

            let api = api.clone();
            let store = store.clone();
            refresher = Some(Refresher::spawn(
                NAME,
                ctx.config().poll_interval,
                span.clone(),
                move || {
                    let api = api.clone();
                    let store = store.clone();
                    async move { load_stats(&api, &store).await }
                },
            ));
        }

        let ticker = if ctx.config().realtime_updates {
            Some(JitterTicker::spawn(
                store.clone(),
                NAME,
                presets::admin_jitter()?,
                presets::ADMIN_INTERVAL,
            ))
        } else {
            None
        };

        info!(
            parent: &span,
            scenarios = catalog.scenarios.len(),
            realtime = ticker.is_some(),
            "admin panel mounted"
        );

        Ok(Self {
            api,
            catalog,
            simulations: Mutex::new(EventLog::new(SIMULATION_HISTORY)),
            ticker,
            refresher,
            span,
        })
    }

    pub fn catalog(&self) -> &ScenarioCatalog {
        &self.catalog
    }

    /// Starts a scenario. On success the run is recorded as the newest
    /// simulation; on failure the history is left untouched.
    #[instrument(skip(self, req), parent = &self.span, fields(scenario = %req.scenario_type))]
    pub async fn run_scenario(&self, req: ScenarioRequest) -> Result<ScenarioRun, AppError> {
        let api = self.api.as_ref().ok_or_else(mock_mode_error)?;

        let run = api.generate_scenario(&req).await?;
        self.simulations.lock().push(run.clone());

        info!("scenario run recorded");
        Ok(run)
    }

    #[instrument(skip(self, config), parent = &self.span)]
    pub async fn generate_mock_data(&self, data_type: &str, config: Value) -> Result<Value, AppError> {
        let api = self.api.as_ref().ok_or_else(mock_mode_error)?;
        Ok(api
            .generate_mock_data(&MockDataRequest::new(data_type, config))
            .await?)
    }

    /// Newest first, at most ten.
    pub fn simulation_results(&self) -> Vec<ScenarioRun> {
        self.simulations.lock().to_vec()
    }

    /// The most recent run, shown as the active simulation.
    pub fn active_simulation(&self) -> Option<ScenarioRun> {
        self.simulations.lock().latest().cloned()
    }

    pub async fn unmount(mut self) {
        if let Some(t) = self.ticker.take() {
            t.stop().await;
        }
        if let Some(r) = self.refresher.take() {
            r.stop().await;
        }
        info!(parent: &self.span, "admin panel unmounted");
    }
}

fn mock_mode_error() -> AppError {
    AppError::Unavailable("no REST backend in mock mode")
}

async fn load_stats(api: &ApiClient, store: &MetricStore) -> Result<(), ApiError> {
    let stats = api.system_stats().await?;
    store
        .update(NAME, |snap: &mut MetricSnapshot| {
            for (field, v) in stats.fields() {
                snap.set(field, v);
            }
        })
        .await;
    Ok(())
}
