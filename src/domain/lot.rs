use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value::{Guarantee, GuaranteePatch, Period, Value, ValuePatch};

/// Lot status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LotStatus {
    Active,
    Unsuccessful,
    Cancelled,
    Complete,
}

impl Default for LotStatus {
    fn default() -> Self {
        Self::Active
    }
}

impl LotStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Unsuccessful => "unsuccessful",
            Self::Cancelled => "cancelled",
            Self::Complete => "complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, Self::Active)
    }
}

/// An independently priced, independently awarded subdivision of a tender.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Lot {
    pub id: String,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
    pub minimal_step: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<Guarantee>,
    pub status: LotStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub auction_period: Option<Period>,
    /// Last status-change timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl Lot {
    pub fn is_active(&self) -> bool {
        self.status == LotStatus::Active
    }

    /// Status change always stamps `date`.
    pub fn set_status(&mut self, status: LotStatus, now: DateTime<Utc>) {
        self.status = status;
        self.date = Some(now);
    }
}

/// Request DTO for creating a lot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateLotRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub minimal_step: Option<ValuePatch>,
    #[serde(default)]
    pub guarantee: Option<GuaranteePatch>,
}

/// Request DTO for updating a lot
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLotRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub minimal_step: Option<ValuePatch>,
    #[serde(default)]
    pub guarantee: Option<GuaranteePatch>,
}

/// Response DTO for lot. `auctionPeriod` is visible only while the lot is
/// still active.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LotResponse {
    pub id: String,
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub value: Value,
    pub minimal_step: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<Guarantee>,
    pub status: LotStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub auction_period: Option<Period>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl From<&Lot> for LotResponse {
    fn from(lot: &Lot) -> Self {
        Self {
            id: lot.id.clone(),
            title: lot.title.clone(),
            description: lot.description.clone(),
            value: lot.value.clone(),
            minimal_step: lot.minimal_step.clone(),
            guarantee: lot.guarantee.clone(),
            status: lot.status,
            auction_period: if lot.is_active() {
                lot.auction_period.clone()
            } else {
                None
            },
            date: lot.date,
        }
    }
}
