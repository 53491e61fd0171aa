//! Per-session state owned by the caller and handed to every orchestrator flow.

use parking_lot::Mutex;

use crate::types::{ForecastSnapshot, Place};

/// Where the most recent flow currently stands
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FlowState {
    #[default]
    Idle,
    Resolving,
    Fetching,
    Rendered,
    Failed,
}

#[derive(Debug, Default)]
struct SessionState {
    flow: FlowState,
    last: Option<(Place, ForecastSnapshot)>,
    status: String,
    renders: u32,
}

/// Last resolved place/data and flow progress for one dashboard.
///
/// Overlapping flows share it; the last writer wins.
#[derive(Debug, Default)]
pub struct Session {
    inner: Mutex<SessionState>,
}

impl Session {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn state(&self) -> FlowState {
        self.inner.lock().flow
    }

    pub(crate) fn transition(&self, next: FlowState) {
        let mut inner = self.inner.lock();
        tracing::debug!(from = ?inner.flow, to = ?next, "Flow transition");
        inner.flow = next;
    }

    pub(crate) fn record_render(&self, place: Place, data: ForecastSnapshot) {
        let mut inner = self.inner.lock();
        inner.flow = FlowState::Rendered;
        inner.last = Some((place, data));
        inner.renders += 1;
    }

    pub(crate) fn record_status(&self, message: &str) {
        self.inner.lock().status = message.to_string();
    }

    pub fn last_place(&self) -> Option<Place> {
        self.inner.lock().last.as_ref().map(|(place, _)| place.clone())
    }

    /// Last status line shown (empty when cleared)
    pub fn status(&self) -> String {
        self.inner.lock().status.clone()
    }

    /// Number of renders so far, cached renders included
    pub fn render_count(&self) -> u32 {
        self.inner.lock().renders
    }
}
