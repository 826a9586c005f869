use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::api::errors::ApiError;

/// `{ success, data | analytics, message }` wrapper used by the write
/// endpoints and by planning analytics.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T> {
    #[serde(alias = "analytics", alias = "scenario")]
    pub data: Option<T>,
    #[serde(default)]
    pub message: Option<String>,
}

impl<T> Envelope<T> {
    pub fn into_data(self, endpoint: &str) -> Result<T, ApiError> {
        self.data.ok_or_else(|| ApiError::MissingField {
            endpoint: endpoint.to_string(),
            field: "data",
        })
    }
}

/// Body of a non-2xx or `success: false` response.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    pub error: Option<String>,
    pub message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn into_message(self) -> Option<String> {
        self.error.or(self.message)
    }
}

/// `/api/admin/data-stats`. Every field is optional; absent ones keep
/// whatever the panel already shows.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SystemStats {
    pub total_suppliers: Option<f64>,
    pub total_shipments: Option<f64>,
    pub total_tracking_events: Option<f64>,
    pub on_time_delivery_rate: Option<f64>,
    pub average_risk_score: Option<f64>,
    pub high_risk_suppliers: Option<f64>,
    pub active_shipments: Option<f64>,
    pub recent_shipments: Option<f64>,
    pub recent_events: Option<f64>,
}

impl SystemStats {
    /// Present values keyed by their wire name.
    pub fn fields(&self) -> Vec<(&'static str, f64)> {
        [
            ("totalSuppliers", self.total_suppliers),
            ("totalShipments", self.total_shipments),
            ("totalTrackingEvents", self.total_tracking_events),
            ("onTimeDeliveryRate", self.on_time_delivery_rate),
            ("averageRiskScore", self.average_risk_score),
            ("highRiskSuppliers", self.high_risk_suppliers),
            ("activeShipments", self.active_shipments),
            ("recentShipments", self.recent_shipments),
            ("recentEvents", self.recent_events),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.filter(|x| x.is_finite()).map(|x| (k, x)))
        .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioInfo {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub categories: Vec<String>,
    #[serde(default)]
    pub complexity: Option<String>,
    #[serde(default)]
    pub estimated_duration: Option<String>,
}

/// `/api/admin/testing/scenarios`, keyed by scenario type.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioCatalog {
    #[serde(default)]
    pub scenarios: BTreeMap<String, ScenarioInfo>,
    #[serde(default)]
    pub total_count: usize,
    #[serde(default)]
    pub categories: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ScenarioRequest {
    pub scenario_type: String,
    pub intensity: u8,
    pub affected_regions: Vec<String>,
    #[serde(flatten)]
    pub options: Map<String, Value>,
}

impl ScenarioRequest {
    pub fn new(scenario_type: impl Into<String>) -> Self {
        Self {
            scenario_type: scenario_type.into(),
            intensity: 3,
            affected_regions: vec!["Asia".to_string(), "Europe".to_string()],
            options: Map::new(),
        }
    }

    pub fn with_intensity(mut self, intensity: u8) -> Self {
        self.intensity = intensity;
        self
    }

    pub fn with_regions<I, S>(mut self, regions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_regions = regions.into_iter().map(Into::into).collect();
        self
    }

    /// Extra scenario-specific setting. Keys already modelled above are ignored.
    pub fn with_option(mut self, key: &str, value: Value) -> Self {
        if !matches!(key, "scenarioType" | "intensity" | "affectedRegions") {
            self.options.insert(key.to_string(), value);
        }
        self
    }
}

/// A started scenario as returned by `generate-scenario`.
#[derive(Debug, Clone, PartialEq)]
pub struct ScenarioRun {
    pub scenario_type: String,
    pub scenario: Value,
    pub message: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MockDataRequest {
    pub data_type: String,
    pub config: Value,
}

impl MockDataRequest {
    pub fn new(data_type: impl Into<String>, config: Value) -> Self {
        Self {
            data_type: data_type.into(),
            config,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DemandAccuracy {
    pub current_month: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SupplyPerformance {
    pub plan_adherence: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryMetrics {
    pub turnover: f64,
    pub service_level: f64,
}

/// The subset of `/api/planning/analytics` the executive view shows.
#[derive(Debug, Clone, Copy, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlanningAnalytics {
    pub demand_accuracy: DemandAccuracy,
    pub supply_performance: SupplyPerformance,
    pub inventory_metrics: InventoryMetrics,
}

impl PlanningAnalytics {
    pub fn fields(&self) -> [(&'static str, f64); 4] {
        [
            ("demandAccuracy", self.demand_accuracy.current_month),
            ("supplyPlanAdherence", self.supply_performance.plan_adherence),
            ("inventoryTurnover", self.inventory_metrics.turnover),
            ("serviceLevel", self.inventory_metrics.service_level),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn scenario_request_wire_shape() {
        let req = ScenarioRequest::new("SUEZ_CANAL_CRISIS")
            .with_option("durationHours", json!(48))
            .with_option("intensity", json!(9));

        let v = serde_json::to_value(&req).unwrap();
        assert_eq!(
            v,
            json!({
                "scenarioType": "SUEZ_CANAL_CRISIS",
                "intensity": 3,
                "affectedRegions": ["Asia", "Europe"],
                "durationHours": 48
            })
        );
    }

    #[test]
    fn planning_envelope_reads_analytics_key() {
        let body = json!({
            "success": true,
            "analytics": {
                "demandAccuracy": {"currentMonth": 94.2, "trend": "up"},
                "supplyPerformance": {"planAdherence": 91.5},
                "inventoryMetrics": {"turnover": 8.4, "serviceLevel": 97.1}
            }
        });
        let env: Envelope<PlanningAnalytics> = serde_json::from_value(body).unwrap();
        let p = env.into_data("/api/planning/analytics").unwrap();
        assert_eq!(p.fields()[0], ("demandAccuracy", 94.2));
        assert_eq!(p.fields()[3], ("serviceLevel", 97.1));
    }

    #[test]
    fn stats_skip_absent_fields() {
        let s: SystemStats =
            serde_json::from_value(json!({"totalSuppliers": 160, "activeShipments": 851.0, "extra": "x"}))
                .unwrap();
        assert_eq!(
            s.fields(),
            vec![("totalSuppliers", 160.0), ("activeShipments", 851.0)]
        );
    }
}
