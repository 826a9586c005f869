//! Supply-chain dashboard runtime.
//!
//! Data flow:
//! push broker → LiveFeed → panel reducers
//! REST collaborator → ApiClient → panels / MetricStore
//! JitterTicker → MetricStore

pub mod api;
pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod panels;
pub mod refresh;

pub use config::AppConfig;
pub use context::DashboardContext;
pub use error::AppError;
