//! Seed values and jitter rules for the demo dashboards.

use std::time::Duration;

use crate::jitter::{Jitter, JitterError, JitterRule};
use crate::snapshot::MetricSnapshot;

pub const EXECUTIVE_INTERVAL: Duration = Duration::from_secs(30);
pub const ADMIN_INTERVAL: Duration = Duration::from_secs(15);

pub fn executive_seed() -> MetricSnapshot {
    MetricSnapshot::new()
        .with("supplyChainHealth", 91.7)
        .with("capacityUtilization", 87.9)
        .with("riskExposure", 27.3)
}

pub fn executive_jitter() -> Result<Jitter, JitterError> {
    Ok(Jitter::new(vec![
        JitterRule::symmetric("supplyChainHealth", 1.0, 85.0, 100.0)?,
        JitterRule::symmetric("riskExposure", 1.5, 0.0, 50.0)?,
        JitterRule::symmetric("capacityUtilization", 1.0, 70.0, 95.0)?,
    ]))
}

pub fn admin_seed() -> MetricSnapshot {
    MetricSnapshot::new()
        .with("totalSuppliers", 156.0)
        .with("totalShipments", 2450.0)
        .with("totalTrackingEvents", 15670.0)
        .with("onTimeDeliveryRate", 94.8)
        .with("averageRiskScore", 2.3)
        .with("highRiskSuppliers", 12.0)
        .with("activeShipments", 847.0)
        .with("recentShipments", 23.0)
        .with("recentEvents", 145.0)
}

pub fn admin_jitter() -> Result<Jitter, JitterError> {
    Ok(Jitter::new(vec![
        JitterRule::whole_step("activeShipments", -5, 4, 0.0, f64::MAX)?,
        JitterRule::whole_step("recentEvents", 0, 19, 0.0, f64::MAX)?,
        JitterRule::symmetric("onTimeDeliveryRate", 1.0, 90.0, 99.0)?,
    ]))
}

/// Per-module performance percentages (one field per integration module).
pub fn module_performance_jitter<'a>(
    modules: impl IntoIterator<Item = &'a str>,
) -> Result<Jitter, JitterError> {
    let rules = modules
        .into_iter()
        .map(|m| JitterRule::symmetric(m, 1.0, 85.0, 100.0))
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Jitter::new(rules))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn presets_are_valid_and_seeded_inside_their_bands() {
        for (seed, jitter) in [
            (executive_seed(), executive_jitter().unwrap()),
            (admin_seed(), admin_jitter().unwrap()),
        ] {
            for rule in jitter.rules() {
                let v = seed.get(rule.field()).expect("seeded");
                let (min, max) = rule.bounds();
                assert!(v >= min && v <= max, "{} = {v}", rule.field());
            }
        }
    }

    #[test]
    fn module_rules_cover_every_module() {
        let j = module_performance_jitter(["Ariba Sourcing", "IBP Planning"]).unwrap();
        let fields: Vec<_> = j.rules().iter().map(|r| r.field()).collect();
        assert_eq!(fields, vec!["Ariba Sourcing", "IBP Planning"]);
    }
}
