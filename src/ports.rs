//! Storage and order-management boundaries used by the use cases.
//! Postgres implementations live in `adapters`, in-memory ones in `adapters::memory`.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use thiserror::Error;
use uuid::Uuid;

use crate::domain::{
    Acquirer, JournalEntry, NewJournalEntry, SaleOrder, Transaction, TransactionUpdate,
};

#[derive(Error, Debug)]
pub enum RepositoryError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Invalid stored value: {0}")]
    Invalid(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Error, Debug)]
pub enum AcquirerLookupError {
    #[error("no acquirer configured for provider {0}")]
    NotFound(String),

    #[error("more than one acquirer configured for provider {0}")]
    Ambiguous(String),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

#[async_trait]
pub trait AcquirerRepository: Send + Sync {
    async fn find_by_provider(&self, provider: &str) -> RepositoryResult<Vec<Acquirer>>;

    /// Insert or replace the acquirer configured for `acquirer.provider`.
    async fn upsert(&self, acquirer: &Acquirer) -> RepositoryResult<Acquirer>;

    /// The one acquirer configured for `provider`. Zero or several is an error.
    async fn find_single(&self, provider: &str) -> Result<Acquirer, AcquirerLookupError> {
        let mut found = self.find_by_provider(provider).await?;
        match found.len() {
            0 => Err(AcquirerLookupError::NotFound(provider.to_string())),
            1 => Ok(found.remove(0)),
            _ => Err(AcquirerLookupError::Ambiguous(provider.to_string())),
        }
    }
}

#[async_trait]
pub trait TransactionRepository: Send + Sync {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction>;

    async fn count_for_acquirer(&self, acquirer_id: Uuid) -> RepositoryResult<i64>;

    /// All transactions of the acquirer carrying `reference`. Callers decide
    /// what zero or several matches mean.
    async fn find_by_reference(
        &self,
        acquirer_id: Uuid,
        reference: &str,
    ) -> RepositoryResult<Vec<Transaction>>;

    async fn update(&self, id: Uuid, update: &TransactionUpdate) -> RepositoryResult<Transaction>;
}

#[async_trait]
pub trait JournalRepository: Send + Sync {
    async fn append(&self, entry: NewJournalEntry) -> RepositoryResult<JournalEntry>;

    /// Newest first.
    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<JournalEntry>>;
}

#[derive(Error, Debug)]
pub enum InvoicingError {
    #[error("No order line is invoiced on ordered quantity for order {0}")]
    NothingToInvoice(Uuid),

    #[error("Invoice {0} cannot be {1}")]
    InvalidInvoiceState(Uuid, &'static str),

    #[error(transparent)]
    Repository(#[from] RepositoryError),
}

/// The order and invoicing subsystem the callback reconciles against.
#[async_trait]
pub trait OrderService: Send + Sync {
    async fn get_order(&self, order_id: Uuid) -> RepositoryResult<SaleOrder>;

    /// Move a draft/sent order to `sale`. Confirming a confirmed order is a no-op.
    async fn confirm_order(&self, order_id: Uuid) -> RepositoryResult<()>;

    /// Draft invoice for every line invoiced on ordered quantity.
    async fn create_invoice(&self, order_id: Uuid) -> Result<Uuid, InvoicingError>;

    async fn validate_invoice(&self, invoice_id: Uuid) -> Result<(), InvoicingError>;

    async fn register_payment(
        &self,
        invoice_id: Uuid,
        currency: &str,
        amount: &BigDecimal,
    ) -> Result<(), InvoicingError>;

    /// Human-readable note shown on the order.
    async fn post_message(&self, order_id: Uuid, body: &str) -> RepositoryResult<()>;
}
