pub mod admin;
pub mod analytics;
pub mod executive;

pub use admin::AdminPanel;
pub use analytics::{AnalyticsPanel, AnalyticsState};
pub use executive::ExecutivePanel;
