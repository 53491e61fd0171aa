//! Debounced loading indicator.

use std::future::Future;
use std::time::Duration;

use crate::render::RenderSink;

/// Run `operation`, showing the loading indicator only if it is still
/// running after `delay`. A fast operation never flickers the indicator;
/// a slow one keeps it up until it completes.
pub async fn debounced<F>(sink: &dyn RenderSink, delay: Duration, operation: F) -> F::Output
where
    F: Future,
{
    tokio::pin!(operation);

    tokio::select! {
        biased;
        output = &mut operation => output,
        () = tokio::time::sleep(delay) => {
            sink.set_loading(true);
            let output = operation.await;
            sink.set_loading(false);
            output
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ForecastSnapshot, Place};
    use parking_lot::Mutex;

    #[derive(Default)]
    struct LoadingLog {
        events: Mutex<Vec<bool>>,
    }

    impl RenderSink for LoadingLog {
        fn render(&self, _place: &Place, _data: &ForecastSnapshot) {}

        fn set_status(&self, _message: &str, _is_error: bool) {}

        fn set_loading(&self, visible: bool) {
            self.events.lock().push(visible);
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_operation_never_shows_indicator() {
        let sink = LoadingLog::default();
        let value = debounced(&sink, Duration::from_millis(300), async {
            tokio::time::sleep(Duration::from_millis(100)).await;
            7
        })
        .await;
        assert_eq!(value, 7);
        assert!(sink.events.lock().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_slow_operation_shows_then_hides() {
        let sink = LoadingLog::default();
        debounced(&sink, Duration::from_millis(300), async {
            tokio::time::sleep(Duration::from_millis(900)).await;
        })
        .await;
        assert_eq!(*sink.events.lock(), vec![true, false]);
    }
}
