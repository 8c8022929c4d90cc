//! Postgres implementation of AcquirerRepository.

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::Acquirer;
use crate::ports::{AcquirerRepository, RepositoryError, RepositoryResult};

#[derive(Clone)]
pub struct PostgresAcquirerRepository {
    pool: PgPool,
}

impl PostgresAcquirerRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl AcquirerRepository for PostgresAcquirerRepository {
    async fn find_by_provider(&self, provider: &str) -> RepositoryResult<Vec<Acquirer>> {
        let rows = sqlx::query_as::<_, AcquirerRow>(
            r#"
            SELECT id, provider, name, public_key, private_key, base_url,
                   client_side_url, server_side_url, environment
            FROM payment_acquirers
            WHERE provider = $1
            "#,
        )
        .bind(provider)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(AcquirerRow::into_domain).collect()
    }

    async fn upsert(&self, acquirer: &Acquirer) -> RepositoryResult<Acquirer> {
        let row = sqlx::query_as::<_, AcquirerRow>(
            r#"
            INSERT INTO payment_acquirers (
                id, provider, name, public_key, private_key, base_url,
                client_side_url, server_side_url, environment
            ) VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            ON CONFLICT (provider) DO UPDATE SET
                name = EXCLUDED.name,
                public_key = EXCLUDED.public_key,
                private_key = EXCLUDED.private_key,
                base_url = EXCLUDED.base_url,
                client_side_url = EXCLUDED.client_side_url,
                server_side_url = EXCLUDED.server_side_url,
                environment = EXCLUDED.environment,
                updated_at = NOW()
            RETURNING id, provider, name, public_key, private_key, base_url,
                      client_side_url, server_side_url, environment
            "#,
        )
        .bind(acquirer.id)
        .bind(&acquirer.provider)
        .bind(&acquirer.name)
        .bind(&acquirer.public_key)
        .bind(&acquirer.private_key)
        .bind(&acquirer.base_url)
        .bind(&acquirer.client_side_url)
        .bind(&acquirer.server_side_url)
        .bind(acquirer.environment.as_str())
        .fetch_one(&self.pool)
        .await?;

        row.into_domain()
    }
}

#[derive(Debug, sqlx::FromRow)]
struct AcquirerRow {
    id: Uuid,
    provider: String,
    name: String,
    public_key: String,
    private_key: String,
    base_url: String,
    client_side_url: String,
    server_side_url: String,
    environment: String,
}

impl AcquirerRow {
    fn into_domain(self) -> RepositoryResult<Acquirer> {
        Ok(Acquirer {
            id: self.id,
            provider: self.provider,
            name: self.name,
            public_key: self.public_key,
            private_key: self.private_key,
            base_url: self.base_url,
            client_side_url: self.client_side_url,
            server_side_url: self.server_side_url,
            environment: self.environment.parse().map_err(RepositoryError::Invalid)?,
        })
    }
}
