use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::value::{Value, ValuePatch};

/// Bid status. Deletion is a soft transition, never physical removal.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BidStatus {
    Active,
    Deleted,
}

impl Default for BidStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// Per-lot status of one lot value, mirroring qualification/award outcomes.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LotValueStatus {
    Active,
    Unsuccessful,
    Deleted,
}

impl Default for LotValueStatus {
    fn default() -> Self {
        Self::Active
    }
}

/// A bid's price commitment against one specific lot.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotValue {
    pub related_lot: String,
    pub value: Value,
    #[serde(default)]
    pub status: LotValueStatus,
    /// Bumped on amount change only.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub participation_url: Option<String>,
}

/// Feature parameter supplied by the bidder.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Parameter {
    pub code: String,
    pub value: Decimal,
}

/// Bid entity
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Bid {
    pub id: String,
    pub status: BidStatus,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lot_values: Vec<LotValue>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl Bid {
    pub fn is_active(&self) -> bool {
        self.status == BidStatus::Active
    }

    /// The bid's active lot value for the given lot, if any.
    pub fn lot_value(&self, lot_id: &str) -> Option<&LotValue> {
        self.lot_values
            .iter()
            .find(|lv| lv.related_lot == lot_id && lv.status == LotValueStatus::Active)
    }
}

/// Request DTO for one lot value entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LotValueRequest {
    #[serde(default)]
    pub related_lot: Option<String>,
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub participation_url: Option<String>,
}

/// Request DTO for creating a bid
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateBidRequest {
    /// Mutually exclusive with `lot_values` on a multi-lot tender.
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub lot_values: Option<Vec<LotValueRequest>>,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
}

/// Request DTO for updating a bid
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateBidRequest {
    #[serde(default)]
    pub lot_values: Option<Vec<LotValueRequest>>,
    #[serde(default)]
    pub parameters: Option<Vec<Parameter>>,
}

/// Response DTO for bid. Lot values are hidden once the bid is deleted.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BidResponse {
    pub id: String,
    pub status: BidStatus,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lot_values: Vec<LotValue>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub parameters: Vec<Parameter>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
}

impl From<&Bid> for BidResponse {
    fn from(bid: &Bid) -> Self {
        Self {
            id: bid.id.clone(),
            status: bid.status,
            lot_values: if bid.is_active() {
                bid.lot_values.clone()
            } else {
                Vec::new()
            },
            parameters: bid.parameters.clone(),
            date: bid.date,
        }
    }
}
