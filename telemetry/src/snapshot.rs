use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Latest known value per named KPI. No history.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSnapshot {
    fields: BTreeMap<String, f64>,
}

impl MetricSnapshot {
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style seed value.
    pub fn with(mut self, field: impl Into<String>, value: f64) -> Self {
        self.set(field, value);
        self
    }

    pub fn get(&self, field: &str) -> Option<f64> {
        self.fields.get(field).copied()
    }

    pub fn set(&mut self, field: impl Into<String>, value: f64) {
        self.fields.insert(field.into(), value);
    }

    pub fn fields(&self) -> impl Iterator<Item = (&str, f64)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), *v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Copies every top-level numeric field of `obj`. Non-numeric values are
    /// ignored. Returns how many fields were written.
    pub fn merge_numeric(&mut self, obj: &Map<String, Value>) -> usize {
        let mut n = 0;
        for (k, v) in obj {
            if let Some(x) = v.as_f64().filter(|x| x.is_finite()) {
                self.fields.insert(k.clone(), x);
                n += 1;
            }
        }
        n
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn merge_takes_only_numbers() {
        let mut s = MetricSnapshot::new().with("riskScore", 10.0);
        let obj = json!({
            "riskScore": 42.5,
            "throughput": 900,
            "label": "north",
            "nested": {"x": 1},
            "flag": true
        });

        let written = s.merge_numeric(obj.as_object().unwrap());

        assert_eq!(written, 2);
        assert_eq!(s.get("riskScore"), Some(42.5));
        assert_eq!(s.get("throughput"), Some(900.0));
        assert_eq!(s.get("label"), None);
        assert_eq!(s.len(), 2);
    }

    #[test]
    fn serializes_as_flat_object() {
        let s = MetricSnapshot::new().with("a", 1.0).with("b", 2.5);
        assert_eq!(serde_json::to_value(&s).unwrap(), json!({"a": 1.0, "b": 2.5}));
    }
}
