use std::fmt;

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::award::Award;
use crate::domain::bid::{Bid, BidResponse};
use crate::domain::cancellation::Cancellation;
use crate::domain::contract::Contract;
use crate::domain::lot::{Lot, LotResponse};
use crate::domain::qualification::Qualification;
use crate::domain::value::{Guarantee, GuaranteePatch, Period, Value, ValuePatch};
use crate::rollup;

/// Tender status. Serialized literals are part of the external contract.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum TenderStatus {
    #[serde(rename = "draft")]
    Draft,
    #[serde(rename = "active.tendering")]
    ActiveTendering,
    #[serde(rename = "active.pre-qualification")]
    ActivePreQualification,
    #[serde(rename = "active.pre-qualification.stand-still")]
    ActivePreQualificationStandStill,
    #[serde(rename = "active.auction")]
    ActiveAuction,
    #[serde(rename = "active.qualification")]
    ActiveQualification,
    #[serde(rename = "active.awarded")]
    ActiveAwarded,
    #[serde(rename = "complete")]
    Complete,
    #[serde(rename = "unsuccessful")]
    Unsuccessful,
    #[serde(rename = "cancelled")]
    Cancelled,
}

impl TenderStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Draft => "draft",
            Self::ActiveTendering => "active.tendering",
            Self::ActivePreQualification => "active.pre-qualification",
            Self::ActivePreQualificationStandStill => "active.pre-qualification.stand-still",
            Self::ActiveAuction => "active.auction",
            Self::ActiveQualification => "active.qualification",
            Self::ActiveAwarded => "active.awarded",
            Self::Complete => "complete",
            Self::Unsuccessful => "unsuccessful",
            Self::Cancelled => "cancelled",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete | Self::Unsuccessful | Self::Cancelled)
    }

    /// Statuses in which the lot set may still be edited.
    pub fn allows_lot_edits(&self) -> bool {
        matches!(self, Self::Draft | Self::ActiveTendering)
    }
}

impl fmt::Display for TenderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tender item. Items may reference the lot they belong to.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_lot: Option<String>,
}

/// What a feature is scoped to.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum FeatureOf {
    Tenderer,
    Lot,
    Item,
}

/// One admissible value of a feature.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeatureChoice {
    pub value: Decimal,
    pub title: String,
}

/// Tender-declared bid feature with an enumerated value set.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Feature {
    pub code: String,
    pub feature_of: FeatureOf,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub related_item: Option<String>,
    pub title: String,
    #[serde(rename = "enum")]
    pub choices: Vec<FeatureChoice>,
}

/// Tender aggregate root. All sub-entities are exclusively owned by it and
/// every mutation is routed through the current status gate.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Tender {
    pub id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: TenderStatus,
    /// Last status-change timestamp.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub value: Value,
    pub minimal_step: Value,
    /// Declared guarantee. The rolled-up guarantee is exposed through
    /// projections; see `rollup::tender_guarantee`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<Guarantee>,
    #[serde(default)]
    pub tender_period: Period,
    #[serde(default)]
    pub qualification_period: Period,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub lots: Vec<Lot>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub bids: Vec<Bid>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub qualifications: Vec<Qualification>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub awards: Vec<Award>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<Contract>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub cancellations: Vec<Cancellation>,
    /// Document revision for optimistic concurrency at the store.
    #[serde(default)]
    pub rev: u64,
}

impl Tender {
    pub fn lot(&self, lot_id: &str) -> Option<&Lot> {
        self.lots.iter().find(|l| l.id == lot_id)
    }

    pub fn lot_mut(&mut self, lot_id: &str) -> Option<&mut Lot> {
        self.lots.iter_mut().find(|l| l.id == lot_id)
    }

    pub fn bid(&self, bid_id: &str) -> Option<&Bid> {
        self.bids.iter().find(|b| b.id == bid_id)
    }

    pub fn active_lots(&self) -> impl Iterator<Item = &Lot> {
        self.lots.iter().filter(|l| l.is_active())
    }

    pub fn has_lots(&self) -> bool {
        !self.lots.is_empty()
    }

    pub fn set_status(&mut self, status: TenderStatus, now: DateTime<Utc>) {
        self.status = status;
        self.date = Some(now);
    }

    /// Active bids targeting the given lot with a live lot value.
    pub fn active_bids_on_lot<'a>(&'a self, lot_id: &'a str) -> impl Iterator<Item = &'a Bid> + 'a {
        self.bids
            .iter()
            .filter(move |b| b.is_active() && b.lot_value(lot_id).is_some())
    }
}

/// Request DTO for creating a tender
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateTenderRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub minimal_step: Option<ValuePatch>,
    #[serde(default)]
    pub guarantee: Option<GuaranteePatch>,
    #[serde(default)]
    pub tender_period: Option<Period>,
    #[serde(default)]
    pub items: Option<Vec<ItemRequest>>,
}

/// Request DTO for one item entry.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemRequest {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub related_lot: Option<String>,
}

/// Request DTO for updating a tender
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateTenderRequest {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub status: Option<TenderStatus>,
    #[serde(default)]
    pub value: Option<ValuePatch>,
    #[serde(default)]
    pub minimal_step: Option<ValuePatch>,
    #[serde(default)]
    pub guarantee: Option<GuaranteePatch>,
    #[serde(default)]
    pub items: Option<Vec<ItemRequest>>,
    #[serde(default)]
    pub features: Option<Vec<Feature>>,
}

/// Response DTO for tender. Derived fields are recomputed from the lot set on
/// every projection.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TenderResponse {
    pub id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    pub status: TenderStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub date: Option<DateTime<Utc>>,
    pub value: Value,
    pub minimal_step: Value,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub guarantee: Option<Guarantee>,
    pub tender_period: Period,
    pub qualification_period: Period,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub items: Vec<Item>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub features: Vec<Feature>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub lots: Vec<LotResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub bids: Vec<BidResponse>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub qualifications: Vec<Qualification>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub awards: Vec<Award>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub contracts: Vec<Contract>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub cancellations: Vec<Cancellation>,
}

impl From<&Tender> for TenderResponse {
    fn from(t: &Tender) -> Self {
        Self {
            id: t.id.clone(),
            title: t.title.clone(),
            status: t.status,
            date: t.date,
            value: rollup::tender_value(t),
            minimal_step: rollup::tender_minimal_step(t),
            guarantee: rollup::tender_guarantee(t),
            tender_period: t.tender_period.clone(),
            qualification_period: t.qualification_period.clone(),
            items: t.items.clone(),
            features: t.features.clone(),
            lots: t.lots.iter().map(LotResponse::from).collect(),
            bids: t.bids.iter().map(BidResponse::from).collect(),
            qualifications: t.qualifications.clone(),
            awards: t.awards.clone(),
            contracts: t.contracts.clone(),
            cancellations: t.cancellations.clone(),
        }
    }
}
