use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode};
use axum::routing::{get, post};
use axum::{Json, Router};
use parking_lot::Mutex;
use serde_json::{Value, json};
use tokio::task::JoinHandle;

/// One request as the mock backend saw it.
#[derive(Clone, Debug)]
pub struct Seen {
    pub path: String,
    pub authorization: Option<String>,
    pub request_id: Option<String>,
    pub body: Option<Value>,
}

#[derive(Clone)]
struct ApiState {
    seen: Arc<Mutex<Vec<Seen>>>,
    healthy: Arc<AtomicBool>,
    runs: Arc<AtomicUsize>,
}

type Reply = (StatusCode, Json<Value>);

impl ApiState {
    /// Records the request; `Err` carries the 500 reply while unhealthy.
    fn record(&self, path: String, headers: &HeaderMap, body: Option<Value>) -> Result<(), Reply> {
        let header = |name: &str| {
            headers
                .get(name)
                .and_then(|v| v.to_str().ok())
                .map(str::to_string)
        };
        self.seen.lock().push(Seen {
            path: path.clone(),
            authorization: header("authorization"),
            request_id: header("x-request-id"),
            body,
        });

        if self.healthy.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err((
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(json!({"error": format!("{path} is down")})),
            ))
        }
    }
}

fn ok(v: Value) -> Reply {
    (StatusCode::OK, Json(v))
}

async fn data_stats(State(s): State<ApiState>, headers: HeaderMap) -> Reply {
    if let Err(e) = s.record("/api/admin/data-stats".into(), &headers, None) {
        return e;
    }
    ok(json!({
        "totalSuppliers": 160,
        "onTimeDeliveryRate": 95.5,
        "activeShipments": 851,
        "lastUpdated": "2026-10-18T09:00:00Z"
    }))
}

async fn scenarios(State(s): State<ApiState>, headers: HeaderMap) -> Reply {
    if let Err(e) = s.record("/api/admin/testing/scenarios".into(), &headers, None) {
        return e;
    }
    ok(json!({
        "scenarios": {
            "SUEZ_CANAL_CRISIS": {
                "name": "Suez Canal Blockage",
                "description": "Major shipping route disruption",
                "categories": ["Crisis Management"],
                "complexity": "High",
                "estimatedDuration": "2-4 hours",
                "dataVolume": "Enterprise-scale"
            },
            "CYBER_ATTACK": {
                "name": "Cyber Attack",
                "description": "Supplier systems compromised",
                "categories": ["Risk Assessment"]
            }
        },
        "totalCount": 2,
        "categories": ["Crisis Management", "Risk Assessment"]
    }))
}

async fn generate_scenario(
    State(s): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(e) = s.record(
        "/api/admin/testing/generate-scenario".into(),
        &headers,
        Some(body.clone()),
    ) {
        return e;
    }

    let kind = body["scenarioType"].as_str().unwrap_or_default().to_string();
    if kind == "BROKEN" {
        return ok(json!({"success": false, "error": "Scenario generation failed: unknown type"}));
    }

    let n = s.runs.fetch_add(1, Ordering::SeqCst);
    ok(json!({
        "success": true,
        "scenario": {"id": format!("sim-{n}"), "type": kind, "intensity": body["intensity"]},
        "message": "Testing scenario generated successfully"
    }))
}

async fn generate_mock_data(
    State(s): State<ApiState>,
    headers: HeaderMap,
    Json(body): Json<Value>,
) -> Reply {
    if let Err(e) = s.record(
        "/api/admin/testing/generate-mock-data".into(),
        &headers,
        Some(body.clone()),
    ) {
        return e;
    }
    ok(json!({
        "success": true,
        "data": {"dataType": body["dataType"], "generated": body["config"]["count"]},
        "message": "Mock data generated successfully"
    }))
}

async fn planning(State(s): State<ApiState>, headers: HeaderMap) -> Reply {
    if let Err(e) = s.record("/api/planning/analytics".into(), &headers, None) {
        return e;
    }
    ok(json!({
        "success": true,
        "analytics": {
            "demandAccuracy": {"currentMonth": 93.4, "previousMonth": 92.0},
            "supplyPerformance": {"planAdherence": 89.6},
            "inventoryMetrics": {"turnover": 8.2, "serviceLevel": 97.3}
        }
    }))
}

async fn summary(State(s): State<ApiState>, headers: HeaderMap) -> Reply {
    if let Err(e) = s.record("/api/analytics/summary".into(), &headers, None) {
        return e;
    }
    ok(json!({"totalSuppliers": 160, "averageRiskScore": 2.1}))
}

async fn performance(State(s): State<ApiState>, headers: HeaderMap) -> Reply {
    if let Err(e) = s.record("/api/analytics/performance-metrics".into(), &headers, None) {
        return e;
    }
    ok(json!({"modelAccuracy": 0.91, "latencyMs": 41}))
}

async fn real_time_risk(
    State(s): State<ApiState>,
    Path(supplier_id): Path<u64>,
    headers: HeaderMap,
) -> Reply {
    if let Err(e) = s.record(
        format!("/api/analytics/real-time-risk/{supplier_id}"),
        &headers,
        None,
    ) {
        return e;
    }
    ok(json!({"supplierId": supplier_id, "riskScore": 33.0, "riskLevel": "MEDIUM"}))
}

/// In-process stand-in for the dashboard's REST backend.
pub struct MockApi {
    pub base_url: String,
    seen: Arc<Mutex<Vec<Seen>>>,
    healthy: Arc<AtomicBool>,
    task: JoinHandle<()>,
}

impl MockApi {
    pub async fn start() -> Self {
        let state = ApiState {
            seen: Arc::new(Mutex::new(Vec::new())),
            healthy: Arc::new(AtomicBool::new(true)),
            runs: Arc::new(AtomicUsize::new(0)),
        };

        let app = Router::new()
            .route("/api/admin/data-stats", get(data_stats))
            .route("/api/admin/testing/scenarios", get(scenarios))
            .route("/api/admin/testing/generate-scenario", post(generate_scenario))
            .route("/api/admin/testing/generate-mock-data", post(generate_mock_data))
            .route("/api/planning/analytics", get(planning))
            .route("/api/analytics/summary", get(summary))
            .route("/api/analytics/performance-metrics", get(performance))
            .route("/api/analytics/real-time-risk/{supplier_id}", get(real_time_risk))
            .with_state(state.clone());

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("bind mock api");
        let addr: SocketAddr = listener.local_addr().expect("local addr");

        let task = tokio::spawn(async move {
            let _ = axum::serve(listener, app).await;
        });

        Self {
            base_url: format!("http://{addr}"),
            seen: state.seen,
            healthy: state.healthy,
            task,
        }
    }

    /// Every endpoint answers 500 while unhealthy.
    pub fn set_healthy(&self, healthy: bool) {
        self.healthy.store(healthy, Ordering::SeqCst);
    }

    pub fn seen(&self) -> Vec<Seen> {
        self.seen.lock().clone()
    }

    pub fn hits(&self, path: &str) -> usize {
        self.seen().iter().filter(|s| s.path == path).count()
    }
}

impl Drop for MockApi {
    fn drop(&mut self) {
        self.task.abort();
    }
}
