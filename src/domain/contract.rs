use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::value::Value;

/// Contract status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum ContractStatus {
    Pending,
    Active,
    Cancelled,
}

impl ContractStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Active => "active",
            Self::Cancelled => "cancelled",
        }
    }
}

/// Contract generated 1:1 when an award becomes active.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Contract {
    pub id: String,
    #[serde(rename = "awardID")]
    pub award_id: String,
    pub status: ContractStatus,
    pub value: Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Request DTO for signing or cancelling a contract
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateContractRequest {
    #[serde(default)]
    pub status: Option<ContractStatus>,
}
