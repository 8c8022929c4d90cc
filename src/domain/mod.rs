//! Framework-agnostic domain entities.

pub mod acquirer;
pub mod journal;
pub mod order;
pub mod transaction;

pub use acquirer::{Acquirer, Environment, LIQPAY_PROVIDER};
pub use journal::{JournalEntry, NewJournalEntry};
pub use order::{InvoicePolicy, OrderLine, OrderState, SaleOrder};
pub use transaction::{Transaction, TransactionState, TransactionUpdate};
