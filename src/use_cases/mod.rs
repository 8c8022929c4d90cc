pub mod build_checkout;
pub mod order_locks;
pub mod process_callback;

pub use build_checkout::BuildCheckout;
pub use process_callback::{CallbackResponse, ProcessCallback};
