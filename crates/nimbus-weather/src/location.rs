//! Position sources: the device's own geolocation capability and the
//! [`CoordinateSource`] strategies the orchestrator walks when falling back.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::types::{Coordinates, LocationError};

/// Options forwarded to the device geolocation capability
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PositionOptions {
    /// Provider-level time budget for one request
    pub timeout: Duration,
    /// A cached position younger than this is acceptable
    pub maximum_age: Duration,
}

/// Platform geolocation (GPS, OS location service, browser API, ...).
///
/// Implementations should give up when `cancel` fires; the orchestrator
/// cancels requests that lost the startup race.
#[async_trait]
pub trait DeviceLocator: Send + Sync {
    /// Whether the capability exists at all on this host
    async fn is_available(&self) -> bool;

    async fn current_position(
        &self,
        options: PositionOptions,
        cancel: CancellationToken,
    ) -> Result<Coordinates, LocationError>;
}

/// A host without any geolocation capability
#[derive(Debug, Default, Clone, Copy)]
pub struct UnavailableLocator;

#[async_trait]
impl DeviceLocator for UnavailableLocator {
    async fn is_available(&self) -> bool {
        false
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
        _cancel: CancellationToken,
    ) -> Result<Coordinates, LocationError> {
        Err(LocationError::ServiceUnavailable)
    }
}

/// A host whose position is known up front (configured or pinned)
#[derive(Debug, Clone, Copy)]
pub struct FixedLocator {
    position: Coordinates,
}

impl FixedLocator {
    pub fn new(position: Coordinates) -> Self {
        Self { position }
    }
}

#[async_trait]
impl DeviceLocator for FixedLocator {
    async fn is_available(&self) -> bool {
        true
    }

    async fn current_position(
        &self,
        _options: PositionOptions,
        cancel: CancellationToken,
    ) -> Result<Coordinates, LocationError> {
        if cancel.is_cancelled() {
            return Err(LocationError::Cancelled);
        }
        Ok(self.position)
    }
}

/// Ask the device for a position, enforcing the time budget locally as well.
pub async fn request_position(
    locator: &dyn DeviceLocator,
    options: PositionOptions,
    cancel: CancellationToken,
) -> Result<Coordinates, LocationError> {
    if !locator.is_available().await {
        return Err(LocationError::ServiceUnavailable);
    }

    let request = locator.current_position(options, cancel.clone());
    tokio::select! {
        () = cancel.cancelled() => Err(LocationError::Cancelled),
        outcome = tokio::time::timeout(options.timeout, request) => {
            outcome.unwrap_or(Err(LocationError::Timeout))
        }
    }
}

/// One fallback strategy that may produce a position.
/// Failures are reported as `None`, never as errors.
#[async_trait]
pub trait CoordinateSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn locate(&self) -> Option<Coordinates>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const OPTIONS: PositionOptions = PositionOptions {
        timeout: Duration::from_millis(5000),
        maximum_age: Duration::from_millis(600_000),
    };

    /// Never answers until cancelled
    struct HangingLocator;

    #[async_trait]
    impl DeviceLocator for HangingLocator {
        async fn is_available(&self) -> bool {
            true
        }

        async fn current_position(
            &self,
            _options: PositionOptions,
            cancel: CancellationToken,
        ) -> Result<Coordinates, LocationError> {
            cancel.cancelled().await;
            Err(LocationError::Cancelled)
        }
    }

    #[tokio::test]
    async fn test_unavailable_locator() {
        let result = request_position(&UnavailableLocator, OPTIONS, CancellationToken::new()).await;
        assert!(matches!(result, Err(LocationError::ServiceUnavailable)));
    }

    #[tokio::test]
    async fn test_fixed_locator() {
        let position = Coordinates::new(51.5, -0.12).unwrap();
        let result =
            request_position(&FixedLocator::new(position), OPTIONS, CancellationToken::new()).await;
        assert_eq!(result.unwrap(), position);
    }

    #[tokio::test(start_paused = true)]
    async fn test_hanging_locator_times_out() {
        let result = request_position(&HangingLocator, OPTIONS, CancellationToken::new()).await;
        assert!(matches!(result, Err(LocationError::Timeout)));
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancel_stops_pending_request() {
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });
        let result = request_position(&HangingLocator, OPTIONS, cancel).await;
        assert!(matches!(result, Err(LocationError::Cancelled)));
    }
}
