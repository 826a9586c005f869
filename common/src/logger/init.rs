use once_cell::sync::OnceCell;
use tracing_subscriber::prelude::*;
use tracing_subscriber::{EnvFilter, fmt};

static LOGGER_INIT: OnceCell<()> = OnceCell::new();

/// Output format for the global subscriber.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl LogFormat {
    /// `APP_ENV=production` selects JSON lines, anything else pretty output.
    pub fn from_env() -> Self {
        match std::env::var("APP_ENV") {
            Ok(v) if v == "production" => Self::Json,
            _ => Self::Pretty,
        }
    }
}

/// Installs the global tracing subscriber once per process.
///
/// Later calls are no-ops, so tests and binaries can both call it freely.
/// The filter comes from `RUST_LOG` and defaults to `info`.
pub fn init_logger(service_name: &'static str, format: LogFormat) {
    LOGGER_INIT.get_or_init(|| {
        let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

        let base = fmt::layer()
            .with_target(true)
            .with_thread_ids(true)
            .with_line_number(true)
            .with_span_events(fmt::format::FmtSpan::CLOSE);

        // try_init: a test harness may already own the global dispatcher
        let res = match format {
            LogFormat::Json => tracing_subscriber::registry()
                .with(filter)
                .with(base.json())
                .try_init(),
            LogFormat::Pretty => tracing_subscriber::registry()
                .with(filter)
                .with(base.pretty())
                .try_init(),
        };

        if res.is_ok() {
            tracing::info!(service = service_name, ?format, "logger initialized");
        }
    });
}
