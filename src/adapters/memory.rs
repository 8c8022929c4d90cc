//! In-memory implementation of every port. Backs the HTTP tests and local
//! experiments without a database.

use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::Instant;

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use uuid::Uuid;

use crate::domain::{
    Acquirer, JournalEntry, NewJournalEntry, OrderLine, OrderState, SaleOrder, Transaction,
    TransactionUpdate,
};
use crate::health::{DependencyChecker, DependencyStatus};
use crate::ports::{
    AcquirerRepository, InvoicingError, JournalRepository, OrderService, RepositoryError,
    RepositoryResult, TransactionRepository,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoiceState {
    Draft,
    Open,
    Paid,
}

#[derive(Debug, Clone)]
pub struct Invoice {
    pub id: Uuid,
    pub order_id: Uuid,
    pub state: InvoiceState,
    pub amount_total: BigDecimal,
}

#[derive(Debug, Clone)]
pub struct Payment {
    pub invoice_id: Uuid,
    pub currency: String,
    pub amount: BigDecimal,
}

#[derive(Default)]
struct Tables {
    acquirers: Vec<Acquirer>,
    transactions: Vec<Transaction>,
    journal: Vec<JournalEntry>,
    orders: HashMap<Uuid, SaleOrder>,
    lines: Vec<OrderLine>,
    invoices: Vec<Invoice>,
    payments: Vec<Payment>,
    messages: Vec<(Uuid, String)>,
    confirmations: HashMap<Uuid, usize>,
}

#[derive(Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn tables(&self) -> MutexGuard<'_, Tables> {
        // A poisoned lock only means a test panicked mid-write.
        self.tables.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn add_acquirer(&self, acquirer: Acquirer) {
        self.tables().acquirers.push(acquirer);
    }

    pub fn add_order(&self, order: SaleOrder, lines: Vec<OrderLine>) {
        let mut tables = self.tables();
        tables.lines.extend(lines);
        tables.orders.insert(order.id, order);
    }

    pub fn add_transaction(&self, tx: Transaction) {
        self.tables().transactions.push(tx);
    }

    pub fn transaction(&self, id: Uuid) -> Option<Transaction> {
        self.tables().transactions.iter().find(|tx| tx.id == id).cloned()
    }

    pub fn order(&self, id: Uuid) -> Option<SaleOrder> {
        self.tables().orders.get(&id).cloned()
    }

    pub fn journal_entries(&self) -> Vec<JournalEntry> {
        self.tables().journal.clone()
    }

    pub fn invoices(&self, order_id: Uuid) -> Vec<Invoice> {
        self.tables()
            .invoices
            .iter()
            .filter(|invoice| invoice.order_id == order_id)
            .cloned()
            .collect()
    }

    pub fn payments(&self) -> Vec<Payment> {
        self.tables().payments.clone()
    }

    pub fn messages(&self, order_id: Uuid) -> Vec<String> {
        self.tables()
            .messages
            .iter()
            .filter(|(id, _)| *id == order_id)
            .map(|(_, body)| body.clone())
            .collect()
    }

    /// How many times `confirm_order` was called for the order.
    pub fn confirmations(&self, order_id: Uuid) -> usize {
        self.tables().confirmations.get(&order_id).copied().unwrap_or(0)
    }
}

#[async_trait]
impl AcquirerRepository for InMemoryStore {
    async fn find_by_provider(&self, provider: &str) -> RepositoryResult<Vec<Acquirer>> {
        Ok(self
            .tables()
            .acquirers
            .iter()
            .filter(|acquirer| acquirer.provider == provider)
            .cloned()
            .collect())
    }

    async fn upsert(&self, acquirer: &Acquirer) -> RepositoryResult<Acquirer> {
        let mut tables = self.tables();
        match tables
            .acquirers
            .iter_mut()
            .find(|existing| existing.provider == acquirer.provider)
        {
            Some(existing) => {
                let id = existing.id;
                *existing = Acquirer { id, ..acquirer.clone() };
                Ok(existing.clone())
            }
            None => {
                tables.acquirers.push(acquirer.clone());
                Ok(acquirer.clone())
            }
        }
    }
}

#[async_trait]
impl TransactionRepository for InMemoryStore {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        self.tables().transactions.push(tx.clone());
        Ok(tx.clone())
    }

    async fn count_for_acquirer(&self, acquirer_id: Uuid) -> RepositoryResult<i64> {
        Ok(self
            .tables()
            .transactions
            .iter()
            .filter(|tx| tx.acquirer_id == acquirer_id)
            .count() as i64)
    }

    async fn find_by_reference(
        &self,
        acquirer_id: Uuid,
        reference: &str,
    ) -> RepositoryResult<Vec<Transaction>> {
        Ok(self
            .tables()
            .transactions
            .iter()
            .filter(|tx| tx.acquirer_id == acquirer_id && tx.reference == reference)
            .cloned()
            .collect())
    }

    async fn update(&self, id: Uuid, update: &TransactionUpdate) -> RepositoryResult<Transaction> {
        let mut tables = self.tables();
        let tx = tables
            .transactions
            .iter_mut()
            .find(|tx| tx.id == id)
            .ok_or_else(|| RepositoryError::NotFound(id.to_string()))?;
        tx.apply(update);
        Ok(tx.clone())
    }
}

#[async_trait]
impl JournalRepository for InMemoryStore {
    async fn append(&self, entry: NewJournalEntry) -> RepositoryResult<JournalEntry> {
        let entry = entry.into_entry();
        self.tables().journal.push(entry.clone());
        Ok(entry)
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<JournalEntry>> {
        Ok(self
            .tables()
            .journal
            .iter()
            .rev()
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[async_trait]
impl OrderService for InMemoryStore {
    async fn get_order(&self, order_id: Uuid) -> RepositoryResult<SaleOrder> {
        self.order(order_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("sale order {}", order_id)))
    }

    async fn confirm_order(&self, order_id: Uuid) -> RepositoryResult<()> {
        let mut tables = self.tables();
        let order = tables
            .orders
            .get_mut(&order_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("sale order {}", order_id)))?;
        if order.state.is_confirmable() {
            order.state = OrderState::Sale;
        }
        *tables.confirmations.entry(order_id).or_default() += 1;
        Ok(())
    }

    async fn create_invoice(&self, order_id: Uuid) -> Result<Uuid, InvoicingError> {
        let mut tables = self.tables();
        let zero = BigDecimal::from(0);
        let mut total = BigDecimal::from(0);
        let mut invoiced_any = false;

        for line in tables.lines.iter_mut().filter(|line| line.order_id == order_id) {
            let qty = line.qty_to_invoice();
            if qty > zero {
                total += &qty * &line.price_unit;
                line.qty_invoiced = line.quantity.clone();
                invoiced_any = true;
            }
        }

        if !invoiced_any {
            return Err(InvoicingError::NothingToInvoice(order_id));
        }

        let invoice = Invoice {
            id: Uuid::new_v4(),
            order_id,
            state: InvoiceState::Draft,
            amount_total: total,
        };
        let id = invoice.id;
        tables.invoices.push(invoice);
        Ok(id)
    }

    async fn validate_invoice(&self, invoice_id: Uuid) -> Result<(), InvoicingError> {
        let mut tables = self.tables();
        let invoice = tables
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == invoice_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("invoice {}", invoice_id)))?;
        if invoice.state != InvoiceState::Draft {
            return Err(InvoicingError::InvalidInvoiceState(invoice_id, "validated"));
        }
        invoice.state = InvoiceState::Open;
        Ok(())
    }

    async fn register_payment(
        &self,
        invoice_id: Uuid,
        currency: &str,
        amount: &BigDecimal,
    ) -> Result<(), InvoicingError> {
        let mut tables = self.tables();
        let invoice = tables
            .invoices
            .iter_mut()
            .find(|invoice| invoice.id == invoice_id)
            .ok_or_else(|| RepositoryError::NotFound(format!("invoice {}", invoice_id)))?;
        if invoice.state != InvoiceState::Open {
            return Err(InvoicingError::InvalidInvoiceState(invoice_id, "paid"));
        }
        if *amount >= invoice.amount_total {
            invoice.state = InvoiceState::Paid;
        }
        tables.payments.push(Payment {
            invoice_id,
            currency: currency.to_string(),
            amount: amount.clone(),
        });
        Ok(())
    }

    async fn post_message(&self, order_id: Uuid, body: &str) -> RepositoryResult<()> {
        self.tables().messages.push((order_id, body.to_string()));
        Ok(())
    }
}

#[async_trait]
impl DependencyChecker for InMemoryStore {
    fn name(&self) -> &'static str {
        "memory"
    }

    async fn check(&self) -> DependencyStatus {
        let start = Instant::now();
        match self.tables.lock() {
            Ok(_) => DependencyStatus::Healthy {
                status: "healthy".to_string(),
                latency_ms: start.elapsed().as_millis() as u64,
            },
            Err(e) => DependencyStatus::Unhealthy {
                status: "unhealthy".to_string(),
                error: e.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Environment, InvoicePolicy};

    #[tokio::test]
    async fn test_journal_list_is_newest_first() {
        let store = InMemoryStore::new();
        for status in ["first", "second", "third"] {
            store
                .append(NewJournalEntry::failed(None, status, None))
                .await
                .unwrap();
        }
        let listed = store.list(2, 0).await.unwrap();
        let statuses: Vec<_> = listed.iter().map(|e| e.status.as_str()).collect();
        assert_eq!(statuses, vec!["third", "second"]);
    }

    #[tokio::test]
    async fn test_upsert_keeps_single_acquirer_per_provider() {
        let store = InMemoryStore::new();
        let first = Acquirer::liqpay("a", "b", "https://one", Environment::Test);
        let second = Acquirer::liqpay("c", "d", "https://two", Environment::Prod);
        let stored = store.upsert(&first).await.unwrap();
        let replaced = store.upsert(&second).await.unwrap();

        assert_eq!(stored.id, replaced.id);
        let all = store.find_by_provider("liqpay").await.unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].public_key, "c");
    }

    #[tokio::test]
    async fn test_invoice_lifecycle() {
        let store = InMemoryStore::new();
        let order = SaleOrder::new("SO042");
        let order_id = order.id;
        let line = OrderLine::new(
            order_id,
            "Book",
            BigDecimal::from(2),
            BigDecimal::from(50),
            InvoicePolicy::Order,
        );
        store.add_order(order, vec![line]);

        let invoice_id = store.create_invoice(order_id).await.unwrap();
        store.validate_invoice(invoice_id).await.unwrap();
        store
            .register_payment(invoice_id, "UAH", &BigDecimal::from(100))
            .await
            .unwrap();

        let invoices = store.invoices(order_id);
        assert_eq!(invoices[0].amount_total, BigDecimal::from(100));
        assert_eq!(invoices[0].state, InvoiceState::Paid);

        // Everything is invoiced now.
        assert!(matches!(
            store.create_invoice(order_id).await,
            Err(InvoicingError::NothingToInvoice(_))
        ));
    }

    #[tokio::test]
    async fn test_find_single_acquirer() {
        let store = InMemoryStore::new();
        assert!(matches!(
            store.find_single("liqpay").await,
            Err(crate::ports::AcquirerLookupError::NotFound(_))
        ));

        let acquirer = Acquirer::liqpay("public", "private", "https://shop", Environment::Test);
        store.add_acquirer(acquirer.clone());
        assert_eq!(store.find_single("liqpay").await.unwrap().id, acquirer.id);

        store.add_acquirer(Acquirer::liqpay("other", "private", "https://shop", Environment::Prod));
        assert!(matches!(
            store.find_single("liqpay").await,
            Err(crate::ports::AcquirerLookupError::Ambiguous(_))
        ));
    }

    #[tokio::test]
    async fn test_health_check_reports_poisoned_store() {
        let store = std::sync::Arc::new(InMemoryStore::new());
        assert!(matches!(store.check().await, DependencyStatus::Healthy { .. }));

        let poisoner = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.tables.lock().unwrap();
            panic!("writer died holding the lock");
        })
        .join();

        assert!(matches!(store.check().await, DependencyStatus::Unhealthy { .. }));
        // Reads recover from the poisoned lock.
        assert!(store.journal_entries().is_empty());
    }
}
