use serde_json::Value;

/// Sanitizes sensitive fields in JSON payloads for logging
pub fn sanitize_json(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut sanitized = serde_json::Map::new();
            for (key, val) in map {
                let sanitized_val = if is_sensitive_field(key) {
                    mask_value(val)
                } else {
                    sanitize_json(val)
                };
                sanitized.insert(key.clone(), sanitized_val);
            }
            Value::Object(sanitized)
        }
        Value::Array(arr) => Value::Array(arr.iter().map(sanitize_json).collect()),
        _ => value.clone(),
    }
}

/// Sanitizes a form-encoded body. The callback's `data` field is only
/// summarized; it is decoded and sanitized once verified.
pub fn sanitize_form(body: &[u8]) -> String {
    url::form_urlencoded::parse(body)
        .map(|(key, val)| {
            let shown = if key == "data" {
                format!("[base64, {} chars]", val.len())
            } else if is_sensitive_field(&key) {
                mask_str(&val)
            } else {
                val.into_owned()
            };
            format!("{}={}", key, shown)
        })
        .collect::<Vec<_>>()
        .join("&")
}

fn is_sensitive_field(key: &str) -> bool {
    matches!(
        key.to_lowercase().as_str(),
        "public_key"
            | "private_key"
            | "signature"
            | "sender_phone"
            | "sender_card_mask2"
            | "sender_first_name"
            | "sender_last_name"
            | "ip"
            | "password"
            | "secret"
            | "token"
            | "authorization"
    )
}

fn mask_value(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(mask_str(s)),
        _ => Value::String("****".to_string()),
    }
}

fn mask_str(s: &str) -> String {
    let chars: Vec<char> = s.chars().collect();
    if chars.len() > 8 {
        let visible: String = chars[..4].iter().collect();
        let end: String = chars[chars.len() - 4..].iter().collect();
        format!("{}****{}", visible, end)
    } else {
        "****".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_sanitize_callback_payload() {
        let input = json!({
            "public_key": "i00000000001",
            "sender_phone": "380950000001",
            "amount": 3,
            "status": "success"
        });

        let sanitized = sanitize_json(&input);
        let key = sanitized["public_key"].as_str().unwrap();

        assert!(key.contains("****"));
        assert!(!key.contains("00000000"));
        assert_eq!(sanitized["sender_phone"], "3809****0001");
        assert_eq!(sanitized["amount"], 3);
        assert_eq!(sanitized["status"], "success");
    }

    #[test]
    fn test_short_values_are_fully_masked() {
        let sanitized = sanitize_json(&json!({"ip": "1.2.3.4", "private_key": 12}));
        assert_eq!(sanitized["ip"], "****");
        assert_eq!(sanitized["private_key"], "****");
    }

    #[test]
    fn test_sanitize_nested() {
        let input = json!({
            "sender": {
                "sender_first_name": "Taras Shevchenko",
                "sender_city": "Kyiv"
            }
        });

        let sanitized = sanitize_json(&input);
        assert!(sanitized["sender"]["sender_first_name"].as_str().unwrap().contains("****"));
        assert_eq!(sanitized["sender"]["sender_city"], "Kyiv");
    }

    #[test]
    fn test_sanitize_form_body() {
        let body = b"data=eyJhIjoxfQ%3D%3D&signature=TBTmgscUGvwjIW%2BlIEkXjOejKcc%3D";
        let sanitized = sanitize_form(body);
        assert_eq!(sanitized, "data=[base64, 12 chars]&signature=TBTm****Kcc=");
    }
}
