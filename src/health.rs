use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;

/// Readiness probe: 200 when the central store answers a trivial query,
/// 503 otherwise.
pub async fn db_health(State(state): State<crate::state::AppState>) -> impl IntoResponse {
	if let Err(e) = state.store.ping().await {
		return (
			StatusCode::SERVICE_UNAVAILABLE,
			format!("central store unreachable: {}", e),
		);
	}
	(StatusCode::OK, "OK".to_string())
}

/// Prometheus exposition endpoint.
pub async fn metrics_handler(State(state): State<crate::state::AppState>) -> String {
	state.metrics.encode()
}
