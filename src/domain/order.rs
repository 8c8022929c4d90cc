//! Sale orders as seen by the payment integration.

use std::str::FromStr;

use bigdecimal::BigDecimal;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OrderState {
    Draft,
    Sent,
    Sale,
}

impl OrderState {
    pub fn as_str(&self) -> &'static str {
        match self {
            OrderState::Draft => "draft",
            OrderState::Sent => "sent",
            OrderState::Sale => "sale",
        }
    }

    pub fn is_confirmable(&self) -> bool {
        matches!(self, OrderState::Draft | OrderState::Sent)
    }
}

impl FromStr for OrderState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "draft" => Ok(OrderState::Draft),
            "sent" => Ok(OrderState::Sent),
            "sale" => Ok(OrderState::Sale),
            other => Err(format!("unknown order state '{}'", other)),
        }
    }
}

/// Which quantity a line is invoiced on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InvoicePolicy {
    /// Invoice on ordered quantity. Only these lines can be invoiced at payment time.
    Order,
    /// Invoice on delivered quantity.
    Delivery,
}

impl InvoicePolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            InvoicePolicy::Order => "order",
            InvoicePolicy::Delivery => "delivery",
        }
    }
}

impl FromStr for InvoicePolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "order" => Ok(InvoicePolicy::Order),
            "delivery" => Ok(InvoicePolicy::Delivery),
            other => Err(format!("unknown invoice policy '{}'", other)),
        }
    }
}

#[derive(Debug, Clone)]
pub struct SaleOrder {
    pub id: Uuid,
    pub name: String,
    pub state: OrderState,
    pub partner_name: Option<String>,
    pub partner_city: Option<String>,
    pub partner_address: Option<String>,
    pub partner_zip: Option<String>,
}

impl SaleOrder {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: Uuid::new_v4(),
            name: name.into(),
            state: OrderState::Draft,
            partner_name: None,
            partner_city: None,
            partner_address: None,
            partner_zip: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct OrderLine {
    pub id: Uuid,
    pub order_id: Uuid,
    pub product_name: String,
    pub quantity: BigDecimal,
    pub qty_invoiced: BigDecimal,
    pub price_unit: BigDecimal,
    pub invoice_policy: InvoicePolicy,
}

impl OrderLine {
    pub fn new(
        order_id: Uuid,
        product_name: impl Into<String>,
        quantity: BigDecimal,
        price_unit: BigDecimal,
        invoice_policy: InvoicePolicy,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            order_id,
            product_name: product_name.into(),
            quantity,
            qty_invoiced: BigDecimal::from(0),
            price_unit,
            invoice_policy,
        }
    }

    /// Quantity still to invoice under the "on ordered qty" policy.
    pub fn qty_to_invoice(&self) -> BigDecimal {
        match self.invoice_policy {
            InvoicePolicy::Order => &self.quantity - &self.qty_invoiced,
            InvoicePolicy::Delivery => BigDecimal::from(0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_delivery_lines_have_nothing_to_invoice() {
        let line = OrderLine::new(
            Uuid::new_v4(),
            "Widget",
            BigDecimal::from(3),
            BigDecimal::from(10),
            InvoicePolicy::Delivery,
        );
        assert_eq!(line.qty_to_invoice(), BigDecimal::from(0));
    }

    #[test]
    fn test_ordered_lines_subtract_invoiced() {
        let mut line = OrderLine::new(
            Uuid::new_v4(),
            "Widget",
            BigDecimal::from(3),
            BigDecimal::from(10),
            InvoicePolicy::Order,
        );
        line.qty_invoiced = BigDecimal::from(1);
        assert_eq!(line.qty_to_invoice(), BigDecimal::from(2));
    }

    #[test]
    fn test_only_draft_and_sent_orders_confirm() {
        assert!(OrderState::Draft.is_confirmable());
        assert!(OrderState::Sent.is_confirmable());
        assert!(!OrderState::Sale.is_confirmable());
    }
}
