//! Postgres implementation of TransactionRepository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{Transaction, TransactionUpdate};
use crate::ports::{RepositoryError, RepositoryResult, TransactionRepository};

const TRANSACTION_COLUMNS: &str = "id, acquirer_id, reference, amount, currency, state, \
    acquirer_reference, state_message, date_validate, sale_order_id, created_at, updated_at";

/// Postgres-backed transaction repository.
#[derive(Clone)]
pub struct PostgresTransactionRepository {
    pool: PgPool,
}

impl PostgresTransactionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TransactionRepository for PostgresTransactionRepository {
    async fn insert(&self, tx: &Transaction) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            INSERT INTO payment_transactions (
                id, acquirer_id, reference, amount, currency, state,
                acquirer_reference, state_message, date_validate, sale_order_id,
                created_at, updated_at
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(tx.id)
        .bind(tx.acquirer_id)
        .bind(&tx.reference)
        .bind(&tx.amount)
        .bind(&tx.currency)
        .bind(tx.state.as_str())
        .bind(&tx.acquirer_reference)
        .bind(&tx.state_message)
        .bind(tx.date_validate)
        .bind(tx.sale_order_id)
        .bind(tx.created_at)
        .bind(tx.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| match e {
            sqlx::Error::Database(db) if db.is_unique_violation() => {
                RepositoryError::Conflict(format!("transaction {} already exists", tx.id))
            }
            other => RepositoryError::Database(other),
        })?;

        row.into_domain()
    }

    async fn count_for_acquirer(&self, acquirer_id: Uuid) -> RepositoryResult<i64> {
        let count: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM payment_transactions WHERE acquirer_id = $1")
                .bind(acquirer_id)
                .fetch_one(&self.pool)
                .await?;
        Ok(count)
    }

    async fn find_by_reference(
        &self,
        acquirer_id: Uuid,
        reference: &str,
    ) -> RepositoryResult<Vec<Transaction>> {
        let rows = sqlx::query_as::<_, TransactionRow>(&format!(
            "SELECT {} FROM payment_transactions WHERE acquirer_id = $1 AND reference = $2 ORDER BY created_at",
            TRANSACTION_COLUMNS
        ))
        .bind(acquirer_id)
        .bind(reference)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(TransactionRow::into_domain).collect()
    }

    async fn update(&self, id: Uuid, update: &TransactionUpdate) -> RepositoryResult<Transaction> {
        let row = sqlx::query_as::<_, TransactionRow>(&format!(
            r#"
            UPDATE payment_transactions
            SET state = $2,
                acquirer_reference = $3,
                state_message = COALESCE($4, state_message),
                date_validate = COALESCE($5, date_validate),
                updated_at = NOW()
            WHERE id = $1
            RETURNING {}
            "#,
            TRANSACTION_COLUMNS
        ))
        .bind(id)
        .bind(update.state.as_str())
        .bind(&update.acquirer_reference)
        .bind(&update.state_message)
        .bind(update.date_validate)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(id.to_string()))?
            .into_domain()
    }
}

/// Internal row type for SQLx. Not exposed outside the adapter.
#[derive(Debug, sqlx::FromRow)]
struct TransactionRow {
    id: Uuid,
    acquirer_id: Uuid,
    reference: String,
    amount: bigdecimal::BigDecimal,
    currency: String,
    state: String,
    acquirer_reference: Option<String>,
    state_message: Option<String>,
    date_validate: Option<chrono::DateTime<chrono::Utc>>,
    sale_order_id: Option<Uuid>,
    created_at: chrono::DateTime<chrono::Utc>,
    updated_at: chrono::DateTime<chrono::Utc>,
}

impl TransactionRow {
    fn into_domain(self) -> RepositoryResult<Transaction> {
        Ok(Transaction {
            id: self.id,
            acquirer_id: self.acquirer_id,
            reference: self.reference,
            amount: self.amount,
            currency: self.currency,
            state: self.state.parse().map_err(RepositoryError::Invalid)?,
            acquirer_reference: self.acquirer_reference,
            state_message: self.state_message,
            date_validate: self.date_validate,
            sale_order_id: self.sale_order_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}
