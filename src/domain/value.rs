//! Shared monetary and period types.
//!
//! Field names and defaults follow the external wire contract: camelCase
//! keys, `"UAH"` default currency, VAT included by default.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

pub const DEFAULT_CURRENCY: &str = "UAH";

fn default_currency() -> String {
    DEFAULT_CURRENCY.to_string()
}

fn default_vat() -> bool {
    true
}

/// Monetary value with currency and VAT inclusion flag.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Value {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default = "default_vat")]
    pub value_added_tax_included: bool,
}

impl Value {
    pub fn new(amount: Decimal) -> Self {
        Self {
            amount,
            currency: default_currency(),
            value_added_tax_included: true,
        }
    }
}

/// Partial value payload used in create/update requests.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ValuePatch {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub value_added_tax_included: Option<bool>,
}

/// Guarantee deposit. Its currency is independent of the value currency.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Guarantee {
    pub amount: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
}

/// Partial guarantee payload used in create/update requests.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GuaranteePatch {
    #[serde(default)]
    pub amount: Option<Decimal>,
    #[serde(default)]
    pub currency: Option<String>,
}

/// Half-open time window with optional bounds.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Period {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub start_date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_date: Option<DateTime<Utc>>,
}

impl Period {
    pub fn ended_by(&self, now: DateTime<Utc>) -> bool {
        matches!(self.end_date, Some(end) if end <= now)
    }
}
