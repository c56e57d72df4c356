//! Bot status endpoints.
//!
//! `GET /health` answers 200 whenever the process can serve HTTP at all.
//! `GET /ready` answers 200 only while the bot service is `Running` and
//! accepting media platform callbacks, and 503 before start, after a
//! failed start and once stopped. The hosted service merges `/metrics` in.

use axum::{extract::State, http::StatusCode, routing::get, Router};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Whether the bot is accepting platform callbacks.
///
/// Shared between the hosted service, which flips it around its listener,
/// and the status router.
#[derive(Debug, Default)]
pub struct HealthState {
    accepting_callbacks: AtomicBool,
}

impl HealthState {
    /// A bot that has not started yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// The service is running and its listener is bound.
    pub fn mark_accepting(&self) {
        self.accepting_callbacks.store(true, Ordering::SeqCst);
    }

    /// The service is stopping or never came up.
    pub fn mark_not_accepting(&self) {
        self.accepting_callbacks.store(false, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_accepting_callbacks(&self) -> bool {
        self.accepting_callbacks.load(Ordering::SeqCst)
    }
}

/// Router with the bot status endpoints.
pub fn health_router(health_state: Arc<HealthState>) -> Router {
    Router::new()
        .route("/health", get(|| async { StatusCode::OK }))
        .route("/ready", get(callback_readiness))
        .layer(TraceLayer::new_for_http())
        .with_state(health_state)
}

async fn callback_readiness(State(state): State<Arc<HealthState>>) -> StatusCode {
    if state.is_accepting_callbacks() {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::Request;
    use tower::util::ServiceExt;

    async fn status_of(state: &Arc<HealthState>, uri: &str) -> StatusCode {
        let request = Request::builder()
            .uri(uri)
            .body(Body::empty())
            .expect("Failed to build request");

        health_router(Arc::clone(state))
            .oneshot(request)
            .await
            .expect("Failed to execute request")
            .status()
    }

    #[test]
    fn test_new_bot_is_not_accepting() {
        let state = HealthState::new();
        assert!(!state.is_accepting_callbacks());

        state.mark_accepting();
        assert!(state.is_accepting_callbacks());

        state.mark_not_accepting();
        assert!(!state.is_accepting_callbacks());
    }

    #[tokio::test]
    async fn test_health_answers_before_start() {
        let state = Arc::new(HealthState::new());
        assert_eq!(status_of(&state, "/health").await, StatusCode::OK);
    }

    #[tokio::test]
    async fn test_ready_tracks_callback_acceptance() {
        let state = Arc::new(HealthState::new());
        assert_eq!(
            status_of(&state, "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE
        );

        state.mark_accepting();
        assert_eq!(status_of(&state, "/ready").await, StatusCode::OK);

        state.mark_not_accepting();
        assert_eq!(
            status_of(&state, "/ready").await,
            StatusCode::SERVICE_UNAVAILABLE,
            "a stopped bot must not report ready"
        );
    }

    #[tokio::test]
    async fn test_unknown_path_returns_404() {
        let state = Arc::new(HealthState::new());
        assert_eq!(status_of(&state, "/unknown").await, StatusCode::NOT_FOUND);
    }
}
