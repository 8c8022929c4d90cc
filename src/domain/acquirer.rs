//! Payment acquirer configuration.

use std::fmt;
use std::str::FromStr;

use uuid::Uuid;

pub const LIQPAY_PROVIDER: &str = "liqpay";
pub const DEFAULT_CHECKOUT_URL: &str = "https://www.liqpay.ua/api/3/checkout";
pub const DEFAULT_API_URL: &str = "https://www.liqpay.ua/api/request";

/// Whether the acquirer talks to the provider's sandbox or to live payments.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Environment {
    Test,
    Prod,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Test => "test",
            Environment::Prod => "prod",
        }
    }
}

impl FromStr for Environment {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "test" | "sandbox" => Ok(Environment::Test),
            "prod" | "production" | "live" => Ok(Environment::Prod),
            other => Err(format!("unknown acquirer environment '{}'", other)),
        }
    }
}

/// A configured provider instance. Read on every checkout build and every
/// callback verification, never mutated by request handling.
#[derive(Clone)]
pub struct Acquirer {
    pub id: Uuid,
    pub provider: String,
    pub name: String,
    pub public_key: String,
    pub private_key: String,
    pub base_url: String,
    pub client_side_url: String,
    pub server_side_url: String,
    pub environment: Environment,
}

impl Acquirer {
    pub fn liqpay(
        public_key: impl Into<String>,
        private_key: impl Into<String>,
        base_url: impl Into<String>,
        environment: Environment,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            provider: LIQPAY_PROVIDER.to_string(),
            name: "LiqPay".to_string(),
            public_key: public_key.into(),
            private_key: private_key.into(),
            base_url: base_url.into(),
            client_side_url: DEFAULT_CHECKOUT_URL.to_string(),
            server_side_url: DEFAULT_API_URL.to_string(),
            environment,
        }
    }

    pub fn is_sandbox(&self) -> bool {
        self.environment == Environment::Test
    }

    /// Where the customer's browser posts the checkout form.
    pub fn form_action_url(&self) -> &str {
        &self.client_side_url
    }

    pub fn callback_url(&self) -> String {
        format!("{}/liqpay/callback", self.base_url.trim_end_matches('/'))
    }

    pub fn return_url(&self) -> String {
        format!("{}/shop/confirmation", self.base_url.trim_end_matches('/'))
    }
}

// The private key must never reach logs.
impl fmt::Debug for Acquirer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Acquirer")
            .field("id", &self.id)
            .field("provider", &self.provider)
            .field("name", &self.name)
            .field("public_key", &self.public_key)
            .field("private_key", &"****")
            .field("base_url", &self.base_url)
            .field("client_side_url", &self.client_side_url)
            .field("server_side_url", &self.server_side_url)
            .field("environment", &self.environment)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_urls_are_derived_from_base_url() {
        let acquirer = Acquirer::liqpay("pub", "priv", "https://shop.example.com/", Environment::Test);
        assert_eq!(acquirer.callback_url(), "https://shop.example.com/liqpay/callback");
        assert_eq!(acquirer.return_url(), "https://shop.example.com/shop/confirmation");
        assert_eq!(acquirer.form_action_url(), "https://www.liqpay.ua/api/3/checkout");
    }

    #[test]
    fn test_debug_hides_private_key() {
        let acquirer = Acquirer::liqpay("pub", "very-secret", "https://shop", Environment::Prod);
        let rendered = format!("{:?}", acquirer);
        assert!(!rendered.contains("very-secret"));
        assert!(rendered.contains("pub"));
    }

    #[test]
    fn test_environment_parsing() {
        assert_eq!("test".parse::<Environment>(), Ok(Environment::Test));
        assert_eq!("PROD".parse::<Environment>(), Ok(Environment::Prod));
        assert!("staging".parse::<Environment>().is_err());
    }
}
