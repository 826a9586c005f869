//! Executive overview
//!
//! Seeded KPIs, optionally overwritten by planning analytics and system
//! stats from the REST collaborator, kept moving by two jitter tickers
//! (headline KPIs and integration-module performance).

use common::{TraceId, panel_span};
use telemetry::{JitterTicker, MetricSnapshot, MetricStore, presets};
use tracing::{Span, info, warn};

use crate::api::ApiClient;
use crate::context::DashboardContext;
use crate::error::AppError;

pub const NAME: &str = "executive";
pub const MODULES_PANEL: &str = "executive.modules";

const PERFECT_ORDER_RATE: &str = "perfectOrderRate";

/// Integration modules and their starting performance percentage.
pub const MODULES: [(&str, f64); 5] = [
    ("Digital Manufacturing", 98.2),
    ("Ariba Sourcing", 96.7),
    ("IBP Planning", 94.8),
    ("Transportation Mgmt", 91.3),
    ("Quality Management", 97.9),
];

pub fn seed() -> MetricSnapshot {
    presets::executive_seed().with(PERFECT_ORDER_RATE, 96.8)
}

pub fn modules_seed() -> MetricSnapshot {
    MODULES
        .iter()
        .fold(MetricSnapshot::new(), |s, (m, v)| s.with(*m, *v))
}

pub struct ExecutivePanel {
    tickers: Vec<JitterTicker>,
    span: Span,
}

impl ExecutivePanel {
    pub async fn mount(ctx: &DashboardContext) -> Result<Self, AppError> {
        let span = panel_span(NAME, &TraceId::new());
        let store = ctx.metrics();

        store.set(NAME, seed()).await;
        store.set(MODULES_PANEL, modules_seed()).await;

        if let Some(api) = ctx.api() {
            load(api, store, &span).await;
        }

        let mut tickers = Vec::new();
        if ctx.config().realtime_updates {
            tickers.push(JitterTicker::spawn(
                store.clone(),
                NAME,
                presets::executive_jitter()?,
                presets::EXECUTIVE_INTERVAL,
            ));
            tickers.push(JitterTicker::spawn(
                store.clone(),
                MODULES_PANEL,
                presets::module_performance_jitter(MODULES.iter().map(|(m, _)| *m))?,
                presets::EXECUTIVE_INTERVAL,
            ));
        }

        info!(parent: &span, tickers = tickers.len(), "executive panel mounted");
        Ok(Self { tickers, span })
    }

    pub async fn unmount(self) {
        let Self { tickers, span } = self;
        for t in tickers {
            t.stop().await;
        }
        info!(parent: &span, "executive panel unmounted");
    }
}

/// Each fetch is independent; a failure keeps the seeded values.
async fn load(api: &ApiClient, store: &MetricStore, span: &Span) {
    match api.planning_analytics().await {
        Ok(planning) => {
            store
                .update(NAME, |snap| {
                    for (field, v) in planning.fields() {
                        snap.set(field, v);
                    }
                })
                .await;
        }
        Err(e) => warn!(parent: span, error = %e, "planning analytics unavailable; using seed"),
    }

    match api.system_stats().await {
        Ok(stats) => {
            if let Some(rate) = stats.on_time_delivery_rate.filter(|r| r.is_finite()) {
                store.update(NAME, |snap| snap.set(PERFECT_ORDER_RATE, rate)).await;
            }
        }
        Err(e) => warn!(parent: span, error = %e, "system stats unavailable; using seed"),
    }
}
