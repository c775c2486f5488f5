//! Quote response schema
//!
//! The quoting endpoint is loosely typed: numeric fields may be absent,
//! `null`, strings or numbers. Everything is funnelled through the lenient
//! readers here so that a missing or garbage value becomes zero instead of
//! leaking into totals.

use std::str::FromStr;

use rust_decimal::{Decimal, prelude::ToPrimitive};
use serde::{Deserialize, Deserializer, de::Error as _};
use serde_json::Value;

use crate::quote::PricedLine;

/// A quote exactly as reported by the backend, after validation.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerQuote {
    /// Priced lines, in the order the backend returned them
    #[serde(deserialize_with = "lenient_lines")]
    pub ordered_items: Vec<PricedLine>,

    /// Total after discounts
    #[serde(deserialize_with = "lenient_amount")]
    pub total: Decimal,

    /// Total at label prices
    #[serde(deserialize_with = "lenient_amount")]
    pub labeled_total: Decimal,

    /// Discount as reported by the backend
    #[serde(deserialize_with = "lenient_amount")]
    pub discount: Decimal,

    /// Status message from the backend
    #[serde(deserialize_with = "lenient_string")]
    pub message: String,
}

impl ServerQuote {
    /// Parse a response body.
    ///
    /// # Errors
    ///
    /// Returns an error if the body is not JSON, or is JSON but not an object.
    pub fn parse(body: &str) -> Result<Self, serde_json::Error> {
        let value: Value = serde_json::from_str(body)?;

        if !value.is_object() {
            return Err(serde_json::Error::custom(
                "quote response must be a JSON object",
            ));
        }

        serde_json::from_value(value)
    }
}

/// Read a monetary amount. Non-numeric, negative and missing values are zero.
pub(crate) fn lenient_amount<'de, D>(deserializer: D) -> Result<Decimal, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(value.as_ref().map_or(Decimal::ZERO, amount_from_value))
}

/// Read a unit quantity. Anything that is not a non-negative integer is zero.
pub(crate) fn lenient_qty<'de, D>(deserializer: D) -> Result<u32, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    let qty = value
        .as_ref()
        .and_then(decimal_from_value)
        .filter(|d| d.fract().is_zero())
        .and_then(|d| d.to_u32())
        .unwrap_or(0);

    Ok(qty)
}

/// Read a string, accepting numbers as their textual form.
pub(crate) fn lenient_string<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    Ok(match value {
        Some(Value::String(s)) => s,
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// Read an optional string; empty strings count as absent.
pub(crate) fn lenient_optional_string<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = lenient_string(deserializer)?;

    Ok(Some(value).filter(|s| !s.is_empty()))
}

fn lenient_lines<'de, D>(deserializer: D) -> Result<Vec<PricedLine>, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<Value>::deserialize(deserializer)?;

    let Some(Value::Array(items)) = value else {
        return Ok(Vec::new());
    };

    // Every field of a priced line is defaulted, so any object converts;
    // non-object entries are dropped.
    Ok(items
        .into_iter()
        .filter(Value::is_object)
        .filter_map(|item| serde_json::from_value(item).ok())
        .collect())
}

fn amount_from_value(value: &Value) -> Decimal {
    decimal_from_value(value)
        .filter(|d| !d.is_sign_negative())
        .unwrap_or(Decimal::ZERO)
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    let text = match value {
        Value::Number(n) => n.to_string(),
        Value::String(s) => s.trim().to_string(),
        _ => return None,
    };

    Decimal::from_str(&text)
        .or_else(|_err| Decimal::from_scientific(&text))
        .ok()
}
