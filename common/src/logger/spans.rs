use tracing::{Span, field};

use super::TraceId;

/// Root span for a mounted dashboard panel. Everything the panel does while
/// mounted (feed callbacks, ticks, REST refreshes) is recorded under it.
pub fn panel_span(panel: &'static str, trace_id: &TraceId) -> Span {
    tracing::info_span!(
        "panel",
        panel = %panel,
        trace_id = %trace_id,
        topic = field::Empty
    )
}

/// Create a child span (inherits trace_id automatically)
pub fn child_span(name: &'static str) -> Span {
    tracing::info_span!("child", name = %name, topic = field::Empty)
}
