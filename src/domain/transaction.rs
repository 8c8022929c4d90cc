//! Payment transaction domain entity.
//! Tracks one payment attempt for an order reference.

use std::fmt;
use std::str::FromStr;

use bigdecimal::BigDecimal;
use chrono::{DateTime, Utc};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransactionState {
    /// Created, or the provider is still processing it.
    Pending,
    Done,
    Error,
}

impl TransactionState {
    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionState::Pending => "pending",
            TransactionState::Done => "done",
            TransactionState::Error => "error",
        }
    }

    /// Whether moving from `self` to `next` changes anything.
    ///
    /// `pending` may go anywhere (including back to `pending` while the
    /// provider keeps processing). A confirmed payment may still be
    /// reversed. Everything else is a replay or a stale notification.
    pub fn accepts(&self, next: TransactionState) -> bool {
        matches!(
            (self, next),
            (TransactionState::Pending, _) | (TransactionState::Done, TransactionState::Error)
        )
    }
}

impl fmt::Display for TransactionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TransactionState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TransactionState::Pending),
            "done" => Ok(TransactionState::Done),
            "error" => Ok(TransactionState::Error),
            other => Err(format!("unknown transaction state '{}'", other)),
        }
    }
}

/// Domain entity representing a payment transaction.
#[derive(Debug, Clone)]
pub struct Transaction {
    pub id: Uuid,
    pub acquirer_id: Uuid,
    /// Order reference, sent to the provider as `order_id`.
    pub reference: String,
    pub amount: BigDecimal,
    pub currency: String,
    pub state: TransactionState,
    pub acquirer_reference: Option<String>,
    pub state_message: Option<String>,
    pub date_validate: Option<DateTime<Utc>>,
    pub sale_order_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Transaction {
    pub fn new(
        acquirer_id: Uuid,
        reference: String,
        amount: BigDecimal,
        currency: String,
        sale_order_id: Option<Uuid>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            acquirer_id,
            reference,
            amount,
            currency,
            state: TransactionState::Pending,
            acquirer_reference: None,
            state_message: None,
            date_validate: None,
            sale_order_id,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn apply(&mut self, update: &TransactionUpdate) {
        self.state = update.state;
        self.acquirer_reference = Some(update.acquirer_reference.clone());
        if update.state_message.is_some() {
            self.state_message = update.state_message.clone();
        }
        if update.date_validate.is_some() {
            self.date_validate = update.date_validate;
        }
        self.updated_at = Utc::now();
    }
}

/// Fields written by a verified provider callback.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionUpdate {
    pub state: TransactionState,
    pub acquirer_reference: String,
    pub state_message: Option<String>,
    pub date_validate: Option<DateTime<Utc>>,
}
