//! Conversion request validation and amount calculation

use serde::{Deserialize, Serialize};
use serde_json::Value;
use serde_json::value::RawValue;
use std::collections::HashMap;
use thiserror::Error;

/// Failure modes of a single conversion. The display strings are returned
/// verbatim to HTTP clients.
#[derive(Debug, Error)]
pub enum ConversionError {
    #[error("Missing required parameters")]
    MissingParameters,
    #[error("Invalid amount")]
    InvalidAmount,
    #[error("Invalid currency code")]
    InvalidCurrency,
    #[error("Error fetching exchange rate")]
    Upstream(#[source] anyhow::Error),
}

/// Raw body of `POST /convert`.
///
/// Each field is kept as the JSON text the client sent and classified on its
/// own during validation, so one oddly typed field never hides the others.
#[derive(Debug, Default, Clone)]
pub struct ConversionRequest {
    pub from_currency: Option<Box<RawValue>>,
    pub to_currency: Option<Box<RawValue>>,
    pub amount: Option<Box<RawValue>>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct ValidatedRequest {
    pub from_currency: String,
    pub to_currency: String,
    pub amount: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ConversionResult {
    pub rate: f64,
    pub converted_amount: f64,
}

impl ConversionRequest {
    /// Reads the three fields out of a JSON object body. Numbers are not
    /// decoded here, so out-of-range values survive until validation.
    /// Repeated keys keep the last value.
    pub fn from_slice(body: &[u8]) -> serde_json::Result<Self> {
        let mut fields: HashMap<String, Box<RawValue>> = serde_json::from_slice(body)?;
        Ok(ConversionRequest {
            from_currency: fields.remove("fromCurrency"),
            to_currency: fields.remove("toCurrency"),
            amount: fields.remove("amount"),
        })
    }

    /// Checks that all three fields are present and truthy, and that the
    /// amount is a finite number.
    pub fn validate(&self) -> Result<ValidatedRequest, ConversionError> {
        let from_currency = currency_code(self.from_currency.as_deref())?;
        let to_currency = currency_code(self.to_currency.as_deref())?;
        let amount = parse_amount(self.amount.as_deref())?;

        Ok(ValidatedRequest {
            from_currency,
            to_currency,
            amount,
        })
    }
}

/// Text of a field as it should appear in logs: strings unquoted, anything
/// else as sent.
pub fn field_text(raw: Option<&RawValue>) -> String {
    match raw {
        None => "-".to_string(),
        Some(raw) => match serde_json::from_str::<Value>(raw.get()) {
            Ok(Value::String(s)) => s,
            _ => raw.get().to_string(),
        },
    }
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null | Value::Bool(false) => true,
        Value::String(s) => s.is_empty(),
        Value::Number(n) => n.as_f64() == Some(0.0),
        _ => false,
    }
}

// Truthy non-string codes are passed on as their JSON text, e.g. `5` -> "5".
fn currency_code(raw: Option<&RawValue>) -> Result<String, ConversionError> {
    let raw = raw.ok_or(ConversionError::MissingParameters)?;
    match serde_json::from_str::<Value>(raw.get()) {
        Ok(value) if is_falsy(&value) => Err(ConversionError::MissingParameters),
        Ok(Value::String(s)) => Ok(s),
        _ => Ok(raw.get().to_string()),
    }
}

fn parse_amount(raw: Option<&RawValue>) -> Result<f64, ConversionError> {
    let raw = raw.ok_or(ConversionError::MissingParameters)?;
    // Numbers beyond f64 range fail to decode.
    let value: Value =
        serde_json::from_str(raw.get()).map_err(|_| ConversionError::InvalidAmount)?;
    if is_falsy(&value) {
        return Err(ConversionError::MissingParameters);
    }

    let amount = match &value {
        Value::Number(n) => n.as_f64().ok_or(ConversionError::InvalidAmount)?,
        Value::String(s) => s
            .trim()
            .parse::<f64>()
            .map_err(|_| ConversionError::InvalidAmount)?,
        _ => return Err(ConversionError::InvalidAmount),
    };

    if !amount.is_finite() {
        return Err(ConversionError::InvalidAmount);
    }
    Ok(amount)
}

pub fn convert(amount: f64, rate: f64) -> ConversionResult {
    ConversionResult {
        rate,
        converted_amount: amount * rate,
    }
}
