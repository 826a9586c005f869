pub mod logger;

pub use logger::{TraceId, init_logger, panel_span};
