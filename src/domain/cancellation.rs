use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Cancellation scope
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancellationOf {
    Tender,
    Lot,
}

impl Default for CancellationOf {
    fn default() -> Self {
        Self::Tender
    }
}

/// Cancellation status
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum CancellationStatus {
    Pending,
    Active,
}

/// Cancellation of the whole tender or of a single lot. A lot-scoped
/// cancellation, once active, is terminal for the target lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cancellation {
    pub id: String,
    pub reason: String,
    pub status: CancellationStatus,
    pub cancellation_of: CancellationOf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_lot: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

/// Request DTO for creating a cancellation
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCancellationRequest {
    #[serde(default)]
    pub reason: Option<String>,
    #[serde(default)]
    pub status: Option<CancellationStatus>,
    #[serde(default)]
    pub cancellation_of: Option<CancellationOf>,
    #[serde(default)]
    pub related_lot: Option<String>,
}

/// Request DTO for updating a cancellation
#[derive(Debug, Clone, Default, Deserialize)]
pub struct UpdateCancellationRequest {
    #[serde(default)]
    pub status: Option<CancellationStatus>,
    #[serde(default)]
    pub reason: Option<String>,
}
