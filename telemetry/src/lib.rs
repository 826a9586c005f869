//! Simulated telemetry for demo dashboards.
//!
//! Data flow:
//! JitterTicker (interval) → Jitter rules → MetricStore (latest snapshot per panel)

pub mod jitter;
pub mod presets;
pub mod snapshot;
pub mod store;
pub mod ticker;

pub use jitter::{Jitter, JitterError, JitterRule};
pub use snapshot::MetricSnapshot;
pub use store::MetricStore;
pub use ticker::JitterTicker;
