//! Postgres implementation of JournalRepository. Insert and select only.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::{JournalEntry, NewJournalEntry};
use crate::ports::{JournalRepository, RepositoryResult};

#[derive(Clone)]
pub struct PostgresJournalRepository {
    pool: PgPool,
}

impl PostgresJournalRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl JournalRepository for PostgresJournalRepository {
    async fn append(&self, entry: NewJournalEntry) -> RepositoryResult<JournalEntry> {
        let entry = sqlx::query_as::<_, JournalEntry>(
            r#"
            INSERT INTO liqpay_journal (id, name, received_data, status, acquirer_id)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING id, name, received_data, status, acquirer_id, created_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(&entry.name)
        .bind(&entry.received_data)
        .bind(&entry.status)
        .bind(entry.acquirer_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(entry)
    }

    async fn list(&self, limit: i64, offset: i64) -> RepositoryResult<Vec<JournalEntry>> {
        let entries = sqlx::query_as::<_, JournalEntry>(
            r#"
            SELECT id, name, received_data, status, acquirer_id, created_at
            FROM liqpay_journal
            ORDER BY created_at DESC
            LIMIT $1 OFFSET $2
            "#,
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        Ok(entries)
    }
}
