//! # Body Parsing & Validation
//!
//! Webhook senders do not reliably set `Content-Type`, so handlers take
//! the raw body as [`Bytes`] and parse it here. Parse and validation
//! failures become [`AppError::BadRequest`].

use axum::body::Bytes;
use serde::de::DeserializeOwned;

use crate::error::AppError;

/// Trait for request types that can validate their business rules
/// beyond what serde deserialization checks.
pub trait Validate {
    /// Validate business rules. Returns an error message on failure.
    fn validate(&self) -> Result<(), String>;
}

/// Parse a raw JSON body into `T`.
pub fn parse_json<T: DeserializeOwned>(body: &Bytes) -> Result<T, AppError> {
    serde_json::from_slice(body)
        .map_err(|e| AppError::BadRequest(format!("body is not valid JSON: {e}")))
}

/// Parse a raw JSON body and validate it using the [`Validate`] trait.
pub fn parse_validated_json<T: DeserializeOwned + Validate>(body: &Bytes) -> Result<T, AppError> {
    let value: T = parse_json(body)?;
    value.validate().map_err(AppError::BadRequest)?;
    Ok(value)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, serde::Deserialize)]
    struct Flag {
        on: Option<bool>,
    }

    impl Validate for Flag {
        fn validate(&self) -> Result<(), String> {
            self.on.map(|_| ()).ok_or_else(|| "on must be a boolean".to_string())
        }
    }

    #[test]
    fn invalid_json_is_bad_request() {
        let err = parse_json::<serde_json::Value>(&Bytes::from_static(b"{nope")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(_)));
    }

    #[test]
    fn validation_failure_is_bad_request() {
        let err = parse_validated_json::<Flag>(&Bytes::from_static(b"{}")).unwrap_err();
        assert!(matches!(err, AppError::BadRequest(ref m) if m == "on must be a boolean"));
        let ok = parse_validated_json::<Flag>(&Bytes::from_static(b"{\"on\":true}")).unwrap();
        assert_eq!(ok.on, Some(true));
    }
}
