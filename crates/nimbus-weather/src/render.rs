use crate::types::{ForecastSnapshot, Place};

/// Presentation callbacks driven by the orchestrator.
///
/// Renders are idempotent for a given `(place, data)` pair; a later call
/// replaces whatever the previous one drew.
pub trait RenderSink: Send + Sync {
    fn render(&self, place: &Place, data: &ForecastSnapshot);

    /// An empty message clears the status line
    fn set_status(&self, message: &str, is_error: bool);

    fn set_loading(&self, visible: bool);
}
