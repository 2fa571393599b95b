use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Qualification status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum QualificationStatus {
    Pending,
    Active,
    Unsuccessful,
}

impl QualificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Unsuccessful => "unsuccessful",
        }
    }
}

/// Pre-auction eligibility determination for one (bid, lot) pair.
///
/// Records are materialized atomically when the tender enters
/// pre-qualification, never created by a client.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Qualification {
    pub id: String,
    #[serde(rename = "bidID")]
    pub bid_id: String,
    #[serde(rename = "lotID")]
    pub lot_id: String,
    pub status: QualificationStatus,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualified: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eligible: Option<bool>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Request DTO for deciding a qualification
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateQualificationRequest {
    #[serde(default)]
    pub status: Option<QualificationStatus>,
    #[serde(default)]
    pub qualified: Option<bool>,
    #[serde(default)]
    pub eligible: Option<bool>,
}
