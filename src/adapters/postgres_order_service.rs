//! Postgres implementation of OrderService: confirmation, invoicing and
//! payment registration against the sale order tables.

use async_trait::async_trait;
use bigdecimal::BigDecimal;
use sqlx::PgPool;
use uuid::Uuid;

use crate::domain::SaleOrder;
use crate::ports::{InvoicingError, OrderService, RepositoryError, RepositoryResult};

/// Journal code payments from this acquirer are booked under.
pub const PAYMENT_JOURNAL_CODE: &str = "LIQPAY";

#[derive(Clone)]
pub struct PostgresOrderService {
    pool: PgPool,
}

impl PostgresOrderService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OrderService for PostgresOrderService {
    async fn get_order(&self, order_id: Uuid) -> RepositoryResult<SaleOrder> {
        let row = sqlx::query_as::<_, SaleOrderRow>(
            r#"
            SELECT id, name, state, partner_name, partner_city, partner_address, partner_zip
            FROM sale_orders
            WHERE id = $1
            "#,
        )
        .bind(order_id)
        .fetch_optional(&self.pool)
        .await?;

        row.ok_or_else(|| RepositoryError::NotFound(format!("sale order {}", order_id)))?
            .into_domain()
    }

    async fn confirm_order(&self, order_id: Uuid) -> RepositoryResult<()> {
        let result = sqlx::query(
            "UPDATE sale_orders SET state = 'sale', updated_at = NOW() WHERE id = $1 AND state IN ('draft', 'sent')",
        )
        .bind(order_id)
        .execute(&self.pool)
        .await?;

        if result.rows_affected() == 0 {
            // Either already confirmed or missing; only the latter is an error.
            self.get_order(order_id).await?;
        }
        Ok(())
    }

    async fn create_invoice(&self, order_id: Uuid) -> Result<Uuid, InvoicingError> {
        let mut transaction = self.pool.begin().await.map_err(RepositoryError::from)?;

        let total: Option<BigDecimal> = sqlx::query_scalar(
            r#"
            SELECT SUM((quantity - qty_invoiced) * price_unit)
            FROM sale_order_lines
            WHERE order_id = $1
              AND invoice_policy = 'order'
              AND quantity > qty_invoiced
            "#,
        )
        .bind(order_id)
        .fetch_one(&mut *transaction)
        .await
        .map_err(RepositoryError::from)?;

        let Some(total) = total else {
            return Err(InvoicingError::NothingToInvoice(order_id));
        };

        let invoice_id = Uuid::new_v4();
        sqlx::query(
            "INSERT INTO account_invoices (id, order_id, state, amount_total) VALUES ($1, $2, 'draft', $3)",
        )
        .bind(invoice_id)
        .bind(order_id)
        .bind(&total)
        .execute(&mut *transaction)
        .await
        .map_err(RepositoryError::from)?;

        sqlx::query(
            r#"
            UPDATE sale_order_lines
            SET qty_invoiced = quantity
            WHERE order_id = $1 AND invoice_policy = 'order' AND quantity > qty_invoiced
            "#,
        )
        .bind(order_id)
        .execute(&mut *transaction)
        .await
        .map_err(RepositoryError::from)?;

        transaction.commit().await.map_err(RepositoryError::from)?;
        Ok(invoice_id)
    }

    async fn validate_invoice(&self, invoice_id: Uuid) -> Result<(), InvoicingError> {
        let result = sqlx::query(
            "UPDATE account_invoices SET state = 'open', updated_at = NOW() WHERE id = $1 AND state = 'draft'",
        )
        .bind(invoice_id)
        .execute(&self.pool)
        .await
        .map_err(RepositoryError::from)?;

        if result.rows_affected() == 0 {
            return Err(InvoicingError::InvalidInvoiceState(invoice_id, "validated"));
        }
        Ok(())
    }

    async fn register_payment(
        &self,
        invoice_id: Uuid,
        currency: &str,
        amount: &BigDecimal,
    ) -> Result<(), InvoicingError> {
        let mut transaction = self.pool.begin().await.map_err(RepositoryError::from)?;

        let total: Option<BigDecimal> = sqlx::query_scalar(
            "SELECT amount_total FROM account_invoices WHERE id = $1 AND state = 'open' FOR UPDATE",
        )
        .bind(invoice_id)
        .fetch_optional(&mut *transaction)
        .await
        .map_err(RepositoryError::from)?;

        let Some(total) = total else {
            return Err(InvoicingError::InvalidInvoiceState(invoice_id, "paid"));
        };

        sqlx::query(
            r#"
            INSERT INTO account_payments (id, invoice_id, journal_code, currency, amount)
            VALUES ($1, $2, $3, $4, $5)
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(invoice_id)
        .bind(PAYMENT_JOURNAL_CODE)
        .bind(currency)
        .bind(amount)
        .execute(&mut *transaction)
        .await
        .map_err(RepositoryError::from)?;

        if *amount >= total {
            sqlx::query("UPDATE account_invoices SET state = 'paid', updated_at = NOW() WHERE id = $1")
                .bind(invoice_id)
                .execute(&mut *transaction)
                .await
                .map_err(RepositoryError::from)?;
        }

        transaction.commit().await.map_err(RepositoryError::from)?;
        Ok(())
    }

    async fn post_message(&self, order_id: Uuid, body: &str) -> RepositoryResult<()> {
        sqlx::query("INSERT INTO sale_order_messages (id, order_id, body) VALUES ($1, $2, $3)")
            .bind(Uuid::new_v4())
            .bind(order_id)
            .bind(body)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[derive(Debug, sqlx::FromRow)]
struct SaleOrderRow {
    id: Uuid,
    name: String,
    state: String,
    partner_name: Option<String>,
    partner_city: Option<String>,
    partner_address: Option<String>,
    partner_zip: Option<String>,
}

impl SaleOrderRow {
    fn into_domain(self) -> RepositoryResult<SaleOrder> {
        Ok(SaleOrder {
            id: self.id,
            name: self.name,
            state: self.state.parse().map_err(RepositoryError::Invalid)?,
            partner_name: self.partner_name,
            partner_city: self.partner_city,
            partner_address: self.partner_address,
            partner_zip: self.partner_zip,
        })
    }
}
