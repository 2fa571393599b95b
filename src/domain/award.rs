use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value::{Period, Value};

/// Award status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum AwardStatus {
    Pending,
    Active,
    Unsuccessful,
    Cancelled,
}

impl AwardStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Unsuccessful => "unsuccessful",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Per-lot award issued from the auction outcome. At most one active award
/// per lot at completion time.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Award {
    pub id: String,
    #[serde(rename = "bidID")]
    pub bid_id: String,
    #[serde(rename = "lotID")]
    pub lot_id: String,
    pub status: AwardStatus,
    pub value: Value,
    pub complaint_period: Period,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Request DTO for deciding an award
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateAwardRequest {
    #[serde(default)]
    pub status: Option<AwardStatus>,
    #[serde(default)]
    pub qualified: Option<bool>,
    #[serde(default)]
    pub eligible: Option<bool>,
}
