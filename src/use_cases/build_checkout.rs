//! Build checkout use case.
//! Renders the signed LiqPay form for an existing transaction.

use std::sync::Arc;

use crate::domain::LIQPAY_PROVIDER;
use crate::error::AppError;
use crate::liqpay::checkout::{build_checkout, CheckoutForm, CheckoutValues};
use crate::ports::{AcquirerRepository, OrderService, TransactionRepository};

pub struct BuildCheckout {
    acquirers: Arc<dyn AcquirerRepository>,
    transactions: Arc<dyn TransactionRepository>,
    orders: Arc<dyn OrderService>,
}

impl BuildCheckout {
    pub fn new(
        acquirers: Arc<dyn AcquirerRepository>,
        transactions: Arc<dyn TransactionRepository>,
        orders: Arc<dyn OrderService>,
    ) -> Self {
        Self {
            acquirers,
            transactions,
            orders,
        }
    }

    pub async fn execute(&self, reference: &str) -> Result<CheckoutForm, AppError> {
        let acquirer = self.acquirers.find_single(LIQPAY_PROVIDER).await?;

        let mut matches = self
            .transactions
            .find_by_reference(acquirer.id, reference)
            .await?;
        let transaction = match matches.len() {
            0 => {
                return Err(AppError::NotFound(format!(
                    "Transaction {} not found",
                    reference
                )))
            }
            1 => matches.remove(0),
            _ => {
                return Err(AppError::Conflict(format!(
                    "More than one transaction uses reference {}",
                    reference
                )))
            }
        };

        let order = match transaction.sale_order_id {
            Some(order_id) => Some(self.orders.get_order(order_id).await?),
            None => None,
        };

        let values = CheckoutValues {
            amount: transaction.amount.clone(),
            currency: Some(transaction.currency.clone()),
            reference: transaction.reference.clone(),
            billing_partner_name: order.as_ref().and_then(|o| o.partner_name.clone()),
            billing_partner_city: order.as_ref().and_then(|o| o.partner_city.clone()),
            billing_partner_address: order.as_ref().and_then(|o| o.partner_address.clone()),
            billing_partner_zip: order.as_ref().and_then(|o| o.partner_zip.clone()),
        };

        let form = build_checkout(&acquirer, &values)?;
        tracing::info!(reference = %reference, "Checkout form built");
        Ok(form)
    }
}
