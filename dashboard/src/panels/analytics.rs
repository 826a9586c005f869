//! Advanced analytics panel
//!
//! Listens on every analytics-related topic and folds the stream into a
//! small view model: merged summary figures, the latest risk update per
//! supplier, the current recommendation list and a bounded log of recent
//! updates. REST summary and performance figures are refreshed on a timer.

use std::collections::HashMap;
use std::sync::Arc;

use common::{TraceId, panel_span};
use feed::{EventLog, LiveMessage, SubscriptionId, Topic};
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tracing::{Span, debug, info, warn};

use crate::api::ApiClient;
use crate::context::DashboardContext;
use crate::refresh::Refresher;

pub const NAME: &str = "analytics";

pub const ANALYTICS_SUMMARY: &str = "ANALYTICS_SUMMARY";
pub const RECOMMENDATION_UPDATE: &str = "RECOMMENDATION_UPDATE";

const PERFORMANCE_METRICS_KEY: &str = "performanceMetrics";

pub fn topics() -> [Topic; 6] {
    [
        Topic::analytics(),
        Topic::risk_updates(),
        Topic::predictions(),
        Topic::recommendations(),
        Topic::alerts(),
        Topic::performance(),
    ]
}

#[derive(Clone, Debug)]
pub struct AnalyticsState {
    analytics: Map<String, Value>,
    updates: EventLog<LiveMessage>,
    risk_by_supplier: HashMap<String, LiveMessage>,
    recommendations: Vec<Value>,
}

impl AnalyticsState {
    pub fn new(log_capacity: usize) -> Self {
        Self {
            analytics: Map::new(),
            updates: EventLog::new(log_capacity),
            risk_by_supplier: HashMap::new(),
            recommendations: Vec::new(),
        }
    }

    /// Folds one live message into the view.
    ///
    /// Performance messages only replace `performanceMetrics`; every other
    /// topic also lands in the recent-updates log.
    pub fn apply(&mut self, msg: &LiveMessage) {
        match msg.topic().name() {
            Topic::PERFORMANCE => {
                let metrics = msg.get("metrics").cloned().unwrap_or(Value::Null);
                self.analytics
                    .insert(PERFORMANCE_METRICS_KEY.to_string(), metrics);
                return;
            }
            Topic::ANALYTICS if msg.kind() == Some(ANALYTICS_SUMMARY) => {
                if let Some(Value::Object(summary)) = msg.get("summary") {
                    self.merge_summary(summary);
                }
            }
            Topic::RISK_UPDATES => match msg.get("supplierId").and_then(supplier_key) {
                Some(id) => {
                    self.risk_by_supplier.insert(id, msg.clone());
                }
                None => debug!("risk update without supplierId"),
            },
            Topic::RECOMMENDATIONS if msg.kind() == Some(RECOMMENDATION_UPDATE) => {
                self.recommendations = match msg.get("recommendations") {
                    Some(Value::Array(list)) => list.clone(),
                    _ => Vec::new(),
                };
            }
            _ => {}
        }

        self.updates.push(msg.clone());
    }

    pub fn merge_summary(&mut self, summary: &Map<String, Value>) {
        for (k, v) in summary {
            self.analytics.insert(k.clone(), v.clone());
        }
    }

    pub fn set_performance_metrics(&mut self, metrics: Map<String, Value>) {
        self.analytics
            .insert(PERFORMANCE_METRICS_KEY.to_string(), Value::Object(metrics));
    }

    pub fn analytics(&self) -> &Map<String, Value> {
        &self.analytics
    }

    pub fn updates(&self) -> &EventLog<LiveMessage> {
        &self.updates
    }

    pub fn risk_for_supplier(&self, supplier_id: &str) -> Option<&LiveMessage> {
        self.risk_by_supplier.get(supplier_id)
    }

    pub fn recommendations(&self) -> &[Value] {
        &self.recommendations
    }

    pub fn clear_updates(&mut self) {
        self.updates.clear();
    }
}

/// Supplier ids arrive as numbers or strings depending on the producer.
fn supplier_key(v: &Value) -> Option<String> {
    match v {
        Value::String(s) if !s.is_empty() => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

pub struct AnalyticsPanel {
    state: Arc<Mutex<AnalyticsState>>,
    subscriptions: Vec<SubscriptionId>,
    refresher: Option<Refresher>,
    span: Span,
}

impl AnalyticsPanel {
    pub async fn mount(ctx: &DashboardContext) -> Self {
        let trace_id = TraceId::new();
        let span = panel_span(NAME, &trace_id);

        let state = Arc::new(Mutex::new(AnalyticsState::new(
            ctx.config().event_log_capacity,
        )));

        let mut subscriptions = Vec::with_capacity(6);
        for topic in topics() {
            let s = Arc::clone(&state);
            let handler_span = span.clone();
            let id = ctx
                .feed()
                .subscribe(topic, move |msg| {
                    handler_span.in_scope(|| s.lock().apply(msg));
                })
                .await;
            subscriptions.push(id);
        }

        let refresher = match ctx.api() {
            Some(api) => {
                if let Err(e) = refresh(api, &state).await {
                    warn!(parent: &span, error = %e, "initial analytics load failed");
                }

                let api = api.clone();
                let s = Arc::clone(&state);
                Some(Refresher::spawn(
                    NAME,
                    ctx.config().poll_interval,
                    span.clone(),
                    move || {
                        let api = api.clone();
                        let s = Arc::clone(&s);
                        async move { refresh(&api, &s).await }
                    },
                ))
            }
            None => None,
        };

        info!(parent: &span, topics = subscriptions.len(), "analytics panel mounted");

        Self {
            state,
            subscriptions,
            refresher,
            span,
        }
    }

    /// Drops this panel's handlers and stops its refresher. Other panels on
    /// the same feed keep their subscriptions. Once this returns the view is
    /// frozen: no handler of this panel runs again, though the last state can
    /// still be read. Calling it twice is harmless.
    pub async fn unmount(&mut self, ctx: &DashboardContext) {
        for id in self.subscriptions.drain(..) {
            ctx.feed().unsubscribe(id).await;
        }
        if let Some(r) = self.refresher.take() {
            r.stop().await;
        }
        info!(parent: &self.span, "analytics panel unmounted");
    }

    pub fn analytics_data(&self) -> Map<String, Value> {
        self.state.lock().analytics().clone()
    }

    /// Newest first.
    pub fn recent_updates(&self) -> Vec<LiveMessage> {
        self.state.lock().updates().to_vec()
    }

    pub fn risk_for_supplier(&self, supplier_id: &str) -> Option<LiveMessage> {
        self.state.lock().risk_for_supplier(supplier_id).cloned()
    }

    pub fn recommendations(&self) -> Vec<Value> {
        self.state.lock().recommendations().to_vec()
    }

    pub fn clear_updates(&self) {
        self.state.lock().clear_updates();
    }

    pub fn snapshot(&self) -> AnalyticsState {
        self.state.lock().clone()
    }
}

/// Both fetches must succeed before anything is written.
async fn refresh(
    api: &ApiClient,
    state: &Mutex<AnalyticsState>,
) -> Result<(), crate::api::ApiError> {
    let summary = api.analytics_summary().await?;
    let metrics = api.performance_metrics().await?;

    let mut s = state.lock();
    s.merge_summary(&summary);
    s.set_performance_metrics(metrics);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Utc;
    use serde_json::json;

    fn msg(topic: Topic, payload: Value) -> LiveMessage {
        let Value::Object(map) = payload else {
            panic!("object payload");
        };
        LiveMessage::new(topic, map, Utc::now())
    }

    #[test]
    fn summary_merges_and_is_logged() {
        let mut s = AnalyticsState::new(10);
        s.apply(&msg(
            Topic::analytics(),
            json!({"type": "ANALYTICS_SUMMARY", "summary": {"totalSuppliers": 156, "riskScore": 2.3}}),
        ));
        s.apply(&msg(
            Topic::analytics(),
            json!({"type": "ANALYTICS_SUMMARY", "summary": {"riskScore": 2.9}}),
        ));

        assert_eq!(s.analytics()["totalSuppliers"], json!(156));
        assert_eq!(s.analytics()["riskScore"], json!(2.9));
        assert_eq!(s.updates().len(), 2);
    }

    #[test]
    fn other_analytics_types_do_not_touch_the_summary() {
        let mut s = AnalyticsState::new(10);
        s.apply(&msg(
            Topic::analytics(),
            json!({"type": "TREND", "summary": {"riskScore": 9.9}}),
        ));
        assert!(s.analytics().is_empty());
        assert_eq!(s.updates().len(), 1);
    }

    #[test]
    fn risk_updates_are_keyed_by_supplier() {
        let mut s = AnalyticsState::new(10);
        s.apply(&msg(Topic::risk_updates(), json!({"supplierId": 42, "riskScore": 61.0})));
        s.apply(&msg(Topic::risk_updates(), json!({"supplierId": 42, "riskScore": 64.5})));
        s.apply(&msg(Topic::risk_updates(), json!({"supplierId": "SUP-7", "riskScore": 12.0})));
        s.apply(&msg(Topic::risk_updates(), json!({"riskScore": 1.0})));

        assert_eq!(s.risk_for_supplier("42").unwrap().get("riskScore"), Some(&json!(64.5)));
        assert!(s.risk_for_supplier("SUP-7").is_some());
        assert_eq!(s.updates().len(), 4);
    }

    #[test]
    fn recommendation_update_replaces_the_list() {
        let mut s = AnalyticsState::new(10);
        s.apply(&msg(
            Topic::recommendations(),
            json!({"type": "RECOMMENDATION_UPDATE", "recommendations": [{"id": 1}, {"id": 2}]}),
        ));
        s.apply(&msg(
            Topic::recommendations(),
            json!({"type": "RECOMMENDATION_UPDATE", "recommendations": [{"id": 3}]}),
        ));
        assert_eq!(s.recommendations(), &[json!({"id": 3})]);
    }

    #[test]
    fn performance_is_not_logged() {
        let mut s = AnalyticsState::new(10);
        s.apply(&msg(Topic::performance(), json!({"metrics": {"latencyMs": 41}})));

        assert_eq!(s.analytics()["performanceMetrics"], json!({"latencyMs": 41}));
        assert!(s.updates().is_empty());
    }

    #[test]
    fn log_keeps_the_newest_entries() {
        let mut s = AnalyticsState::new(10);
        for i in 0..12 {
            s.apply(&msg(Topic::alerts(), json!({"seq": i})));
        }
        let seqs: Vec<_> = s.updates().iter().map(|m| m.get("seq").cloned().unwrap()).collect();
        assert_eq!(seqs.len(), 10);
        assert_eq!(seqs[0], json!(11));
        assert_eq!(seqs[9], json!(2));

        s.clear_updates();
        assert!(s.updates().is_empty());
    }
}
