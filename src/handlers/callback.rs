use axum::{
    extract::{rejection::FormRejection, State},
    http::StatusCode,
    response::IntoResponse,
    Form,
};

use crate::liqpay::CallbackForm;
use crate::AppState;

/// `POST /liqpay/callback`. No authentication: the signature inside the
/// form is the only proof of origin. Always answers 200 so validation
/// failures never trigger provider-side redelivery.
pub async fn callback(
    State(state): State<AppState>,
    form: Result<Form<CallbackForm>, FormRejection>,
) -> impl IntoResponse {
    let form = match form {
        Ok(Form(form)) => form,
        Err(rejection) => {
            tracing::warn!(error = %rejection, "Callback body is not a form, treating as empty");
            CallbackForm::default()
        }
    };

    let response = state.callbacks.execute(form).await;
    (StatusCode::OK, response.as_str())
}
