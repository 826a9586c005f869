use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, Response};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

use crate::api::errors::ApiError;
use crate::api::types::{
    Envelope, ErrorBody, MockDataRequest, PlanningAnalytics, ScenarioCatalog, ScenarioRequest,
    ScenarioRun, SystemStats,
};
use crate::auth::AuthToken;

pub const DATA_STATS: &str = "/api/admin/data-stats";
pub const SCENARIOS: &str = "/api/admin/testing/scenarios";
pub const GENERATE_SCENARIO: &str = "/api/admin/testing/generate-scenario";
pub const GENERATE_MOCK_DATA: &str = "/api/admin/testing/generate-mock-data";
pub const PLANNING_ANALYTICS: &str = "/api/planning/analytics";
pub const ANALYTICS_SUMMARY: &str = "/api/analytics/summary";
pub const PERFORMANCE_METRICS: &str = "/api/analytics/performance-metrics";
pub const REAL_TIME_RISK: &str = "/api/analytics/real-time-risk";

pub const REQUEST_ID_HEADER: &str = "X-Request-ID";

/// REST collaborator of the dashboard. Cheap to clone.
#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    token: Option<AuthToken>,
}

impl ApiClient {
    pub fn new(
        base_url: impl Into<String>,
        token: Option<AuthToken>,
        timeout: Duration,
    ) -> Result<Self, ApiError> {
        let http = Client::builder()
            .timeout(timeout)
            .pool_idle_timeout(Duration::from_secs(30))
            .tcp_keepalive(Duration::from_secs(30))
            .build()?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            token,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn system_stats(&self) -> Result<SystemStats, ApiError> {
        self.get_json(DATA_STATS).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn scenarios(&self) -> Result<ScenarioCatalog, ApiError> {
        self.get_json(SCENARIOS).await
    }

    #[instrument(skip(self, req), fields(scenario = %req.scenario_type))]
    pub async fn generate_scenario(&self, req: &ScenarioRequest) -> Result<ScenarioRun, ApiError> {
        let env: Envelope<Value> = self.post_json(GENERATE_SCENARIO, req).await?;
        let message = env.message.clone();
        let scenario = env.into_data(GENERATE_SCENARIO)?;

        debug!(?message, "scenario started");

        Ok(ScenarioRun {
            scenario_type: req.scenario_type.clone(),
            scenario,
            message,
        })
    }

    #[instrument(skip(self, req), fields(data_type = %req.data_type))]
    pub async fn generate_mock_data(&self, req: &MockDataRequest) -> Result<Value, ApiError> {
        let env: Envelope<Value> = self.post_json(GENERATE_MOCK_DATA, req).await?;
        env.into_data(GENERATE_MOCK_DATA)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn planning_analytics(&self) -> Result<PlanningAnalytics, ApiError> {
        let env: Envelope<PlanningAnalytics> = self.get_json(PLANNING_ANALYTICS).await?;
        env.into_data(PLANNING_ANALYTICS)
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn analytics_summary(&self) -> Result<Map<String, Value>, ApiError> {
        self.get_json(ANALYTICS_SUMMARY).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn performance_metrics(&self) -> Result<Map<String, Value>, ApiError> {
        self.get_json(PERFORMANCE_METRICS).await
    }

    #[instrument(skip(self), level = "debug")]
    pub async fn real_time_risk(&self, supplier_id: u64) -> Result<Map<String, Value>, ApiError> {
        self.get_json(&format!("{REAL_TIME_RISK}/{supplier_id}")).await
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        let mut req = self
            .http
            .request(method, url)
            .header(REQUEST_ID_HEADER, Uuid::new_v4().to_string());

        if let Some(token) = &self.token {
            req = req.bearer_auth(token.expose());
        }
        req
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, ApiError> {
        let resp = self.request(Method::GET, path).send().await?;
        read_body(path, resp).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, ApiError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let resp = self.request(Method::POST, path).json(body).send().await?;
        read_body(path, resp).await
    }
}

/// Non-2xx and `success: false` bodies both become errors.
async fn read_body<T: DeserializeOwned>(endpoint: &str, resp: Response) -> Result<T, ApiError> {
    let status = resp.status();
    let bytes = resp.bytes().await?;

    if !status.is_success() {
        let message = serde_json::from_slice::<ErrorBody>(&bytes)
            .ok()
            .and_then(ErrorBody::into_message);
        warn!(endpoint, status = status.as_u16(), ?message, "api request failed");
        return Err(ApiError::Status {
            endpoint: endpoint.to_string(),
            status: status.as_u16(),
            message,
        });
    }

    let decode = |source| ApiError::Decode {
        endpoint: endpoint.to_string(),
        source,
    };

    let value: Value = serde_json::from_slice(&bytes).map_err(decode)?;

    if value.get("success") == Some(&Value::Bool(false)) {
        let message = serde_json::from_value::<ErrorBody>(value)
            .ok()
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| "no reason given".to_string());
        warn!(endpoint, %message, "api reported failure");
        return Err(ApiError::Unsuccessful {
            endpoint: endpoint.to_string(),
            message,
        });
    }

    serde_json::from_value(value).map_err(decode)
}
