pub mod callback;
pub mod checkout;
pub mod journal;

use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};

use crate::health::check_health;
use crate::AppState;

pub async fn health(State(state): State<AppState>) -> impl IntoResponse {
    let health_response = check_health(&state.health_checkers, state.start_time).await;

    // Return 503 if a dependency is down, 200 otherwise
    let status_code = if health_response.status == "healthy" {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };

    (status_code, Json(health_response))
}
