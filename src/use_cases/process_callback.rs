//! Process callback use case.
//! Verifies one provider notification and applies at most one transaction
//! state transition, journaling every attempt.

use std::sync::Arc;

use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::domain::{NewJournalEntry, Transaction, TransactionState, LIQPAY_PROVIDER};
use crate::liqpay::callback::{self, CallbackData, CallbackForm, CallbackRejection, StatusClass};
use crate::ports::{
    AcquirerRepository, InvoicingError, JournalRepository, OrderService, TransactionRepository,
};
use crate::use_cases::order_locks::OrderLocks;
use crate::utils::sanitize::sanitize_json;

pub const INVOICE_POLICY_NOTE: &str =
    "Invoice wasn't created. Check if your products invoice policy is set to \"on ordered qty\"";

/// Plain-text body answered to the provider. Always sent with HTTP 200.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallbackResponse {
    Processed,
    Failed,
}

impl CallbackResponse {
    pub fn as_str(&self) -> &'static str {
        match self {
            CallbackResponse::Processed => "Transaction processed",
            CallbackResponse::Failed => "Transaction failed",
        }
    }
}

/// A rejection together with what the journal should record about it.
struct Failure {
    rejection: CallbackRejection,
    received_data: Option<String>,
    acquirer_id: Option<Uuid>,
}

impl Failure {
    fn new(rejection: CallbackRejection) -> Self {
        Self {
            rejection,
            received_data: None,
            acquirer_id: None,
        }
    }
}

/// What a verified callback did to its transaction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Applied,
    Replayed,
    Stale,
    UnknownStatus,
}

/// Use case for provider callbacks.
pub struct ProcessCallback {
    acquirers: Arc<dyn AcquirerRepository>,
    transactions: Arc<dyn TransactionRepository>,
    journal: Arc<dyn JournalRepository>,
    orders: Arc<dyn OrderService>,
    locks: OrderLocks,
}

impl ProcessCallback {
    pub fn new(
        acquirers: Arc<dyn AcquirerRepository>,
        transactions: Arc<dyn TransactionRepository>,
        journal: Arc<dyn JournalRepository>,
        orders: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            acquirers,
            transactions,
            journal,
            orders,
            locks: OrderLocks::new(),
        }
    }

    pub async fn execute(&self, form: CallbackForm) -> CallbackResponse {
        match self.verify_and_apply(&form).await {
            Ok(()) => CallbackResponse::Processed,
            Err(failure) => {
                match &failure.rejection {
                    CallbackRejection::Internal(err) => {
                        error!(error = %err, "Callback processing failed")
                    }
                    rejection => warn!(reason = %rejection, "Callback rejected"),
                }
                self.record(NewJournalEntry::failed(
                    failure.received_data,
                    &failure.rejection.to_string(),
                    failure.acquirer_id,
                ))
                .await;
                CallbackResponse::Failed
            }
        }
    }

    async fn verify_and_apply(&self, form: &CallbackForm) -> Result<(), Failure> {
        let (raw_data, signature) = callback::require_fields(form).map_err(Failure::new)?;
        let decoded = callback::decode_data(raw_data).map_err(Failure::new)?;

        let received_data = String::from_utf8_lossy(&decoded).into_owned();
        let fail = |rejection: CallbackRejection, acquirer_id: Option<Uuid>| Failure {
            rejection,
            received_data: Some(received_data.clone()),
            acquirer_id,
        };

        let payload = callback::parse_data(&decoded).map_err(|r| fail(r, None))?;

        let acquirer = self
            .acquirers
            .find_single(LIQPAY_PROVIDER)
            .await
            .map_err(|e| fail(e.into(), None))?;
        let acquirer_id = Some(acquirer.id);

        callback::authenticate(&acquirer, raw_data, signature, &payload)
            .map_err(|r| fail(r, acquirer_id))?;

        if let Ok(value) = serde_json::from_slice(&decoded) {
            debug!(payload = %sanitize_json(&value), "Verified callback payload");
        }

        let connected = self
            .transactions
            .count_for_acquirer(acquirer.id)
            .await
            .map_err(|e| fail(e.into(), acquirer_id))?;
        if connected == 0 {
            return Err(fail(CallbackRejection::NoTransactions, acquirer_id));
        }

        let _guard = self.locks.acquire(&payload.order_id).await;

        let mut matches = self
            .transactions
            .find_by_reference(acquirer.id, &payload.order_id)
            .await
            .map_err(|e| fail(e.into(), acquirer_id))?;
        let transaction = match matches.len() {
            0 => return Err(fail(CallbackRejection::OrderNotFound, acquirer_id)),
            1 => matches.remove(0),
            _ => return Err(fail(CallbackRejection::DuplicateOrder, acquirer_id)),
        };

        let outcome = self
            .transition(transaction.clone(), &payload)
            .await
            .map_err(|e| fail(e, acquirer_id))?;

        info!(
            reference = %transaction.reference,
            status = %payload.status,
            outcome = ?outcome,
            "Callback processed"
        );

        let name = self.journal_name(&transaction).await;
        self.record(NewJournalEntry {
            name,
            received_data,
            status: payload.status.clone(),
            acquirer_id,
        })
        .await;

        Ok(())
    }

    /// Classify the provider status and write the transition it asks for.
    async fn transition(
        &self,
        transaction: Transaction,
        payload: &CallbackData,
    ) -> Result<Outcome, CallbackRejection> {
        let Some(update) = payload.transaction_update() else {
            warn!(
                reference = %transaction.reference,
                status = %payload.status,
                "Unrecognized provider status, no transition applied"
            );
            return Ok(Outcome::UnknownStatus);
        };

        if transaction.state == update.state {
            if update.state != TransactionState::Pending {
                info!(
                    reference = %transaction.reference,
                    state = %transaction.state,
                    "Replayed callback, transaction already in target state"
                );
                return Ok(Outcome::Replayed);
            }
        } else if !transaction.state.accepts(update.state) {
            warn!(
                reference = %transaction.reference,
                from = %transaction.state,
                to = %update.state,
                "Stale callback ignored"
            );
            return Ok(Outcome::Stale);
        }

        let updated = self.transactions.update(transaction.id, &update).await?;

        if payload.status_class() == StatusClass::Success {
            self.reconcile(&updated).await;
        }

        Ok(Outcome::Applied)
    }

    /// Confirm and invoice the linked order. Failures here never undo the
    /// payment; they are reported on the order instead.
    async fn reconcile(&self, transaction: &Transaction) {
        let Some(order_id) = transaction.sale_order_id else {
            return;
        };

        let result = async {
            self.orders.confirm_order(order_id).await?;
            let invoice_id = self.orders.create_invoice(order_id).await?;
            self.orders.validate_invoice(invoice_id).await?;
            self.orders
                .register_payment(invoice_id, &transaction.currency, &transaction.amount)
                .await?;
            Ok::<Uuid, InvoicingError>(invoice_id)
        }
        .await;

        let note = match result {
            Ok(invoice_id) => {
                info!(order_id = %order_id, invoice_id = %invoice_id, "Order invoiced and paid");
                return;
            }
            Err(InvoicingError::NothingToInvoice(_)) => {
                warn!(order_id = %order_id, "No order lines invoiced on ordered quantity");
                INVOICE_POLICY_NOTE.to_string()
            }
            Err(err) => {
                error!(order_id = %order_id, error = %err, "Order reconciliation failed");
                format!("Invoice wasn't processed: {}", err)
            }
        };

        if let Err(err) = self.orders.post_message(order_id, &note).await {
            error!(order_id = %order_id, error = %err, "Failed to post order note");
        }
    }

    async fn journal_name(&self, transaction: &Transaction) -> String {
        match transaction.sale_order_id {
            Some(order_id) => match self.orders.get_order(order_id).await {
                Ok(order) => order.name,
                Err(err) => {
                    warn!(order_id = %order_id, error = %err, "Linked sale order not readable");
                    transaction.reference.clone()
                }
            },
            None => transaction.reference.clone(),
        }
    }

    async fn record(&self, entry: NewJournalEntry) {
        if let Err(err) = self.journal.append(entry).await {
            error!(error = %err, "Failed to write journal entry");
        }
    }
}
