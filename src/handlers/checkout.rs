use axum::{
    extract::{Path, State},
    Json,
};

use crate::error::AppError;
use crate::liqpay::CheckoutForm;
use crate::AppState;

/// `GET /liqpay/checkout/:reference`: form values the storefront renders
/// and the customer's browser posts to `action_url`.
pub async fn get_checkout(
    State(state): State<AppState>,
    Path(reference): Path<String>,
) -> Result<Json<CheckoutForm>, AppError> {
    let form = state.checkout.execute(&reference).await?;
    Ok(Json(form))
}
