//! Checkout request payload for the LiqPay hosted checkout.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use bigdecimal::{BigDecimal, ToPrimitive};
use serde::Serialize;
use thiserror::Error;

use crate::domain::Acquirer;
use crate::liqpay::signature::sign_data;

pub const API_VERSION: &str = "3";
pub const DEFAULT_CURRENCY: &str = "UAH";
pub const CHECKOUT_LANGUAGE: &str = "ru";

#[derive(Error, Debug)]
pub enum CheckoutError {
    #[error("Amount {0} cannot be sent to the provider")]
    InvalidAmount(BigDecimal),

    #[error("Failed to serialize checkout payload: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Order values the checkout is built from.
#[derive(Debug, Clone)]
pub struct CheckoutValues {
    pub amount: BigDecimal,
    pub currency: Option<String>,
    pub reference: String,
    pub billing_partner_name: Option<String>,
    pub billing_partner_city: Option<String>,
    pub billing_partner_address: Option<String>,
    pub billing_partner_zip: Option<String>,
}

/// The JSON object LiqPay expects inside `data`.
#[derive(Debug, Serialize)]
pub struct CheckoutPayload {
    pub version: &'static str,
    pub public_key: String,
    pub action: &'static str,
    pub amount: f64,
    pub currency: String,
    pub description: String,
    pub order_id: String,
    pub language: &'static str,
    pub sandbox: &'static str,
    pub server_url: String,
    pub result_url: String,
    pub sender_first_name: String,
    pub sender_city: String,
    pub sender_address: String,
    pub sender_postal_code: String,
}

/// Values embedded in the form the customer's browser posts to `action_url`.
#[derive(Debug, Clone, Serialize)]
pub struct CheckoutForm {
    pub action_url: String,
    pub data: String,
    pub signature: String,
}

impl CheckoutPayload {
    pub fn new(acquirer: &Acquirer, values: &CheckoutValues) -> Result<Self, CheckoutError> {
        let amount = values
            .amount
            .to_f64()
            .filter(|amount| amount.is_finite())
            .ok_or_else(|| CheckoutError::InvalidAmount(values.amount.clone()))?;

        let currency = values
            .currency
            .as_deref()
            .filter(|code| !code.is_empty())
            .unwrap_or(DEFAULT_CURRENCY)
            .to_string();

        Ok(Self {
            version: API_VERSION,
            public_key: acquirer.public_key.clone(),
            action: "pay",
            amount,
            currency,
            description: format!("Order payment: {}", values.reference),
            order_id: values.reference.clone(),
            language: CHECKOUT_LANGUAGE,
            sandbox: if acquirer.is_sandbox() { "1" } else { "" },
            server_url: acquirer.callback_url(),
            result_url: acquirer.return_url(),
            sender_first_name: values.billing_partner_name.clone().unwrap_or_default(),
            sender_city: values.billing_partner_city.clone().unwrap_or_default(),
            sender_address: values.billing_partner_address.clone().unwrap_or_default(),
            sender_postal_code: values.billing_partner_zip.clone().unwrap_or_default(),
        })
    }

    /// base64 of the JSON payload, the `data` form field.
    pub fn encode(&self) -> Result<String, CheckoutError> {
        let json = serde_json::to_vec(self)?;
        Ok(STANDARD.encode(json))
    }
}

/// Build the signed checkout form for `values`.
pub fn build_checkout(acquirer: &Acquirer, values: &CheckoutValues) -> Result<CheckoutForm, CheckoutError> {
    let data = CheckoutPayload::new(acquirer, values)?.encode()?;
    let signature = sign_data(&acquirer.private_key, &data);

    Ok(CheckoutForm {
        action_url: acquirer.form_action_url().to_string(),
        data,
        signature,
    })
}
