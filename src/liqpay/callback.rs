//! Provider callback: wire schema, verification steps and status classification.
//!
//! Every step returns a `CallbackRejection` instead of failing the request;
//! the handler journals the rejection and answers `Transaction failed`.

use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::{DateTime, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Deserializer};
use serde_json::Value;
use thiserror::Error;

use crate::domain::{Acquirer, TransactionState, TransactionUpdate};
use crate::liqpay::signature::verify_data;
use crate::ports::{AcquirerLookupError, RepositoryError};

pub const PAY_ACTION: &str = "pay";

const PENDING_STATUSES: &[&str] = &[
    "processing",
    "prepared",
    "wait_bitcoin",
    "wait_secure",
    "wait_accept",
    "wait_lc",
    "hold_wait",
    "cash_wait",
    "wait_qr",
    "wait_sender",
    "wait_card",
    "wait_compensation",
    "invoice_wait",
    "wait_reserve",
];
const SUCCESS_STATUSES: &[&str] = &["success", "sandbox"];
const ERROR_STATUSES: &[&str] = &["error", "reversed", "failure"];

/// Form body posted by the provider.
#[derive(Debug, Default, Deserialize)]
pub struct CallbackForm {
    pub data: Option<String>,
    pub signature: Option<String>,
}

/// Decoded `data` object. Absent fields take the provider's defaults.
#[derive(Debug, Default, Clone, Deserialize)]
#[serde(default)]
pub struct CallbackData {
    #[serde(deserialize_with = "lenient_string")]
    pub public_key: String,
    #[serde(deserialize_with = "lenient_string")]
    pub action: String,
    #[serde(deserialize_with = "lenient_string")]
    pub order_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub status: String,
    #[serde(deserialize_with = "string_or_number")]
    pub payment_id: String,
    #[serde(deserialize_with = "lenient_string")]
    pub description: String,
    #[serde(deserialize_with = "lenient_optional_string")]
    pub err_description: Option<String>,
    pub completion_date: Option<Value>,
}

#[derive(Error, Debug)]
pub enum CallbackRejection {
    #[error("No data provided")]
    MissingData,

    #[error("No signature provided")]
    MissingSignature,

    #[error("Can't decode received data")]
    UndecodableData,

    #[error("Can't parse received json")]
    UnparsableJson,

    #[error("Can't find liqpay acquirer")]
    AcquirerNotFound,

    #[error("Found more then one liqpay acquirer")]
    AmbiguousAcquirer,

    #[error("Wrong public key")]
    WrongPublicKey,

    #[error("Wrong signature")]
    WrongSignature,

    #[error("Wrong action")]
    WrongAction,

    #[error("No connected transactions found")]
    NoTransactions,

    #[error("No connected orders found")]
    OrderNotFound,

    #[error("Found more then one connected order")]
    DuplicateOrder,

    #[error("Internal error")]
    Internal(#[source] RepositoryError),
}

impl From<RepositoryError> for CallbackRejection {
    fn from(err: RepositoryError) -> Self {
        CallbackRejection::Internal(err)
    }
}

/// Step 5: exactly one acquirer must be configured for the provider.
impl From<AcquirerLookupError> for CallbackRejection {
    fn from(err: AcquirerLookupError) -> Self {
        match err {
            AcquirerLookupError::NotFound(_) => CallbackRejection::AcquirerNotFound,
            AcquirerLookupError::Ambiguous(_) => CallbackRejection::AmbiguousAcquirer,
            AcquirerLookupError::Repository(err) => CallbackRejection::Internal(err),
        }
    }
}

/// Steps 1 and 2: both form fields must be present.
pub fn require_fields(form: &CallbackForm) -> Result<(&str, &str), CallbackRejection> {
    let data = form.data.as_deref().ok_or(CallbackRejection::MissingData)?;
    let signature = form.signature.as_deref().ok_or(CallbackRejection::MissingSignature)?;
    Ok((data, signature))
}

/// Step 3: base64 transport decoding of `data`.
pub fn decode_data(data: &str) -> Result<Vec<u8>, CallbackRejection> {
    STANDARD
        .decode(data.trim())
        .map_err(|_| CallbackRejection::UndecodableData)
}

/// Step 4: the decoded bytes must be a JSON object. Field types are not
/// enforced; a mistyped or null field reads as absent.
pub fn parse_data(decoded: &[u8]) -> Result<CallbackData, CallbackRejection> {
    let value: Value =
        serde_json::from_slice(decoded).map_err(|_| CallbackRejection::UnparsableJson)?;
    if !value.is_object() {
        return Err(CallbackRejection::UnparsableJson);
    }
    CallbackData::deserialize(value).map_err(|_| CallbackRejection::UnparsableJson)
}

/// Steps 6 to 8. The signature is checked against the raw, still
/// base64-encoded `data`, and only once the public key matched.
pub fn authenticate(
    acquirer: &Acquirer,
    raw_data: &str,
    signature: &str,
    payload: &CallbackData,
) -> Result<(), CallbackRejection> {
    if payload.public_key != acquirer.public_key {
        return Err(CallbackRejection::WrongPublicKey);
    }
    if !verify_data(&acquirer.private_key, raw_data, signature) {
        return Err(CallbackRejection::WrongSignature);
    }
    if payload.action != PAY_ACTION {
        return Err(CallbackRejection::WrongAction);
    }
    Ok(())
}

/// Bucket a provider status falls into.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StatusClass {
    Pending,
    Success,
    Error,
    Unknown,
}

impl StatusClass {
    pub fn classify(status: &str) -> Self {
        if PENDING_STATUSES.contains(&status) {
            StatusClass::Pending
        } else if SUCCESS_STATUSES.contains(&status) {
            StatusClass::Success
        } else if ERROR_STATUSES.contains(&status) {
            StatusClass::Error
        } else {
            StatusClass::Unknown
        }
    }
}

impl CallbackData {
    pub fn status_class(&self) -> StatusClass {
        StatusClass::classify(&self.status)
    }

    /// The transaction write this callback asks for, `None` for unknown statuses.
    pub fn transaction_update(&self) -> Option<TransactionUpdate> {
        let acquirer_reference = self.payment_id.clone();
        match self.status_class() {
            StatusClass::Pending => Some(TransactionUpdate {
                state: TransactionState::Pending,
                acquirer_reference,
                state_message: None,
                date_validate: None,
            }),
            StatusClass::Success => Some(TransactionUpdate {
                state: TransactionState::Done,
                acquirer_reference,
                state_message: Some(self.description.clone()),
                date_validate: self.completion_date(),
            }),
            StatusClass::Error => Some(TransactionUpdate {
                state: TransactionState::Error,
                acquirer_reference,
                state_message: Some(
                    self.err_description
                        .clone()
                        .unwrap_or_else(|| "error".to_string()),
                ),
                date_validate: None,
            }),
            StatusClass::Unknown => None,
        }
    }

    /// `completion_date` arrives either as epoch milliseconds or as a
    /// `YYYY-MM-DD HH:MM:SS` string.
    pub fn completion_date(&self) -> Option<DateTime<Utc>> {
        match self.completion_date.as_ref()? {
            Value::Number(ms) => ms
                .as_i64()
                .and_then(|ms| Utc.timestamp_millis_opt(ms).single()),
            Value::String(text) => DateTime::parse_from_rfc3339(text)
                .map(|dt| dt.with_timezone(&Utc))
                .ok()
                .or_else(|| {
                    NaiveDateTime::parse_from_str(text, "%Y-%m-%d %H:%M:%S")
                        .ok()
                        .map(|naive| Utc.from_utc_datetime(&naive))
                }),
            _ => None,
        }
    }
}

// `payment_id` is numeric in LiqPay responses but stored as text.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        Value::Number(n) => n.to_string(),
        _ => String::new(),
    })
}

fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => s,
        _ => String::new(),
    })
}

fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Value::deserialize(deserializer)? {
        Value::String(s) => Some(s),
        _ => None,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::Environment;
    use crate::liqpay::signature::sign_data;
    use serde_json::json;

    fn acquirer() -> Acquirer {
        Acquirer::liqpay("public", "private", "https://shop", Environment::Test)
    }

    fn encode(value: &Value) -> String {
        STANDARD.encode(serde_json::to_vec(value).unwrap())
    }

    #[test]
    fn test_require_fields_order() {
        let form = CallbackForm::default();
        assert!(matches!(require_fields(&form), Err(CallbackRejection::MissingData)));

        let form = CallbackForm {
            data: Some("abc".to_string()),
            signature: None,
        };
        assert!(matches!(require_fields(&form), Err(CallbackRejection::MissingSignature)));
    }

    #[test]
    fn test_decode_rejects_invalid_base64() {
        assert!(matches!(decode_data("not base64!!"), Err(CallbackRejection::UndecodableData)));
    }

    #[test]
    fn test_parse_rejects_non_json_and_non_objects() {
        assert!(matches!(parse_data(b"hello"), Err(CallbackRejection::UnparsableJson)));
        assert!(matches!(parse_data(b"[1,2]"), Err(CallbackRejection::UnparsableJson)));
    }

    #[test]
    fn test_parse_applies_defaults_and_numeric_payment_id() {
        let data = parse_data(br#"{"status":"success","payment_id":165629}"#).unwrap();
        assert_eq!(data.payment_id, "165629");
        assert_eq!(data.public_key, "");
        assert_eq!(data.action, "");
        assert_eq!(data.order_id, "");
    }

    #[test]
    fn test_parse_tolerates_null_and_mistyped_fields() {
        let data = parse_data(
            br#"{"public_key":null,"description":null,"amount":"100.00","currency":7,
                "status":"success","err_description":false,"payment_id":null}"#,
        )
        .unwrap();
        assert_eq!(data.public_key, "");
        assert_eq!(data.description, "");
        assert_eq!(data.status, "success");
        assert_eq!(data.err_description, None);
        assert_eq!(data.payment_id, "");
    }

    #[test]
    fn test_null_public_key_is_a_wrong_public_key() {
        let raw = encode(&json!({"public_key": null, "action": "pay", "amount": "3.00"}));
        let payload = parse_data(&decode_data(&raw).unwrap()).unwrap();
        let result = authenticate(&acquirer(), &raw, "garbage", &payload);
        assert!(matches!(result, Err(CallbackRejection::WrongPublicKey)));
    }

    #[test]
    fn test_acquirer_lookup_rejections() {
        assert!(matches!(
            CallbackRejection::from(AcquirerLookupError::NotFound("liqpay".into())),
            CallbackRejection::AcquirerNotFound
        ));
        assert!(matches!(
            CallbackRejection::from(AcquirerLookupError::Ambiguous("liqpay".into())),
            CallbackRejection::AmbiguousAcquirer
        ));
    }

    #[test]
    fn test_authenticate_checks_public_key_before_signature() {
        let raw = encode(&json!({"public_key": "other", "action": "pay"}));
        let payload = parse_data(&decode_data(&raw).unwrap()).unwrap();
        let result = authenticate(&acquirer(), &raw, "garbage", &payload);
        assert!(matches!(result, Err(CallbackRejection::WrongPublicKey)));
    }

    #[test]
    fn test_authenticate_signs_raw_data() {
        let raw = encode(&json!({"public_key": "public", "action": "pay"}));
        let payload = parse_data(&decode_data(&raw).unwrap()).unwrap();

        let signature = sign_data("private", &raw);
        assert!(authenticate(&acquirer(), &raw, &signature, &payload).is_ok());

        let decoded = String::from_utf8(decode_data(&raw).unwrap()).unwrap();
        let wrong = sign_data("private", &decoded);
        assert!(matches!(
            authenticate(&acquirer(), &raw, &wrong, &payload),
            Err(CallbackRejection::WrongSignature)
        ));
    }

    #[test]
    fn test_authenticate_requires_pay_action() {
        let raw = encode(&json!({"public_key": "public", "action": "refund"}));
        let payload = parse_data(&decode_data(&raw).unwrap()).unwrap();
        let signature = sign_data("private", &raw);
        assert!(matches!(
            authenticate(&acquirer(), &raw, &signature, &payload),
            Err(CallbackRejection::WrongAction)
        ));
    }

    #[test]
    fn test_classify() {
        assert_eq!(StatusClass::classify("wait_secure"), StatusClass::Pending);
        assert_eq!(StatusClass::classify("processing"), StatusClass::Pending);
        assert_eq!(StatusClass::classify("sandbox"), StatusClass::Success);
        assert_eq!(StatusClass::classify("success"), StatusClass::Success);
        assert_eq!(StatusClass::classify("reversed"), StatusClass::Error);
        assert_eq!(StatusClass::classify("subscribed"), StatusClass::Unknown);
        // No substring matching across adjacent statuses.
        assert_eq!(StatusClass::classify("processingprepared"), StatusClass::Unknown);
    }

    #[test]
    fn test_success_update_carries_description_and_date() {
        let data = parse_data(
            br#"{"status":"success","payment_id":"7","description":"Order payment: SO1","completion_date":"2017-03-01 12:30:00"}"#,
        )
        .unwrap();
        let update = data.transaction_update().unwrap();
        assert_eq!(update.state, TransactionState::Done);
        assert_eq!(update.acquirer_reference, "7");
        assert_eq!(update.state_message.as_deref(), Some("Order payment: SO1"));
        assert_eq!(
            update.date_validate.map(|d| d.to_rfc3339()),
            Some("2017-03-01T12:30:00+00:00".to_string())
        );
    }

    #[test]
    fn test_error_update_defaults_description() {
        let data = parse_data(br#"{"status":"failure","payment_id":1}"#).unwrap();
        let update = data.transaction_update().unwrap();
        assert_eq!(update.state, TransactionState::Error);
        assert_eq!(update.state_message.as_deref(), Some("error"));
    }

    #[test]
    fn test_epoch_millis_completion_date() {
        let data = parse_data(br#"{"completion_date":1488371400000}"#).unwrap();
        assert_eq!(
            data.completion_date().map(|d| d.timestamp()),
            Some(1_488_371_400)
        );
    }

    #[test]
    fn test_unknown_status_has_no_update() {
        let data = parse_data(br#"{"status":"subscribed"}"#).unwrap();
        assert!(data.transaction_update().is_none());
    }
}
