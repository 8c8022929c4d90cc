//! LiqPay wire formats: request signing, checkout payloads and callbacks.

pub mod callback;
pub mod checkout;
pub mod signature;

pub use callback::{CallbackData, CallbackForm, CallbackRejection, StatusClass};
pub use checkout::{build_checkout, CheckoutError, CheckoutForm, CheckoutValues};
pub use signature::{sign, sign_data, verify_data};
