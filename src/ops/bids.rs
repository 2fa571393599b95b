//! Bid lifecycle: create, patch, soft delete.
//!
//! Bids on a lot-partitioned tender price each lot separately through
//! `lotValues`; every entry is validated against the target lot's value,
//! currency and VAT flag. Feature parameters are validated against the
//! tender-declared feature set.

use chrono::{DateTime, Utc};

use crate::domain::bid::{
    Bid, BidStatus, CreateBidRequest, LotValue, LotValueRequest, LotValueStatus, Parameter,
    UpdateBidRequest,
};
use crate::domain::new_id;
use crate::domain::tender::{Feature, Tender, TenderStatus};
use crate::domain::value::{Value, DEFAULT_CURRENCY};
use crate::error::{TenderError, TenderResult};
use crate::ops::tender::applies_to_lot;

const REQUIRED: &str = "This field is required.";

pub fn create_bid(
    tender: &mut Tender,
    req: CreateBidRequest,
    now: DateTime<Utc>,
) -> TenderResult<Bid> {
    ensure_tendering(tender, "add")?;

    if req.value.is_some() {
        return Err(TenderError::validation(
            "value",
            "value should be posted for each lot of bid",
        ));
    }
    let lot_value_reqs = req
        .lot_values
        .filter(|lvs| !lvs.is_empty())
        .ok_or_else(|| TenderError::validation("lotValues", REQUIRED))?;

    let lot_values = build_lot_values(tender, lot_value_reqs, &[], now)?;
    let parameters = req.parameters.unwrap_or_default();
    validate_parameters(tender, &lot_values, &parameters)?;

    let bid = Bid {
        id: new_id(),
        status: BidStatus::Active,
        lot_values,
        parameters,
        date: Some(now),
    };
    tender.bids.push(bid.clone());
    Ok(bid)
}

pub fn patch_bid(
    tender: &mut Tender,
    bid_id: &str,
    req: UpdateBidRequest,
    now: DateTime<Utc>,
) -> TenderResult<Bid> {
    ensure_tendering(tender, "update")?;

    let current = tender
        .bid(bid_id)
        .ok_or_else(|| TenderError::not_found("bid_id"))?;
    if !current.is_active() {
        return Err(TenderError::forbidden(
            "Can't update bid in current (deleted) bid status".to_string(),
        ));
    }
    let previous = current.lot_values.clone();

    let mut bid = current.clone();
    if let Some(lot_value_reqs) = req.lot_values {
        if lot_value_reqs.is_empty() {
            return Err(TenderError::validation("lotValues", REQUIRED));
        }
        bid.lot_values = build_lot_values(tender, lot_value_reqs, &previous, now)?;
        bid.date = Some(now);
    }
    if let Some(parameters) = req.parameters {
        validate_parameters(tender, &bid.lot_values, &parameters)?;
        bid.parameters = parameters;
        bid.date = Some(now);
    }

    let slot = tender
        .bids
        .iter_mut()
        .find(|b| b.id == bid_id)
        .ok_or_else(|| TenderError::not_found("bid_id"))?;
    *slot = bid.clone();
    Ok(bid)
}

/// Deletion keeps the record for audit; the bid simply stops counting.
pub fn delete_bid(tender: &mut Tender, bid_id: &str, now: DateTime<Utc>) -> TenderResult<Bid> {
    ensure_tendering(tender, "delete")?;
    let bid = tender
        .bids
        .iter_mut()
        .find(|b| b.id == bid_id)
        .ok_or_else(|| TenderError::not_found("bid_id"))?;
    bid.status = BidStatus::Deleted;
    bid.date = Some(now);
    Ok(bid.clone())
}

fn ensure_tendering(tender: &Tender, verb: &str) -> TenderResult<()> {
    if tender.status != TenderStatus::ActiveTendering {
        return Err(TenderError::forbidden(format!(
            "Can't {} bid in current ({}) tender status",
            verb, tender.status
        )));
    }
    Ok(())
}

/// Validate and materialize one `lotValues` array. Dates carry over from the
/// previous entries unless the amount changed.
fn build_lot_values(
    tender: &Tender,
    requests: Vec<LotValueRequest>,
    previous: &[LotValue],
    now: DateTime<Utc>,
) -> TenderResult<Vec<LotValue>> {
    let mut lot_values = Vec::with_capacity(requests.len());
    for req in requests {
        let related_lot = req
            .related_lot
            .ok_or_else(|| TenderError::validation("lotValues", REQUIRED))?;
        let lot = tender
            .lot(&related_lot)
            .ok_or_else(|| TenderError::validation("lotValues", "relatedLot should be one of lots"))?;

        let patch = req
            .value
            .ok_or_else(|| TenderError::validation("lotValues", REQUIRED))?;
        if lot_values
            .iter()
            .any(|lv: &LotValue| lv.related_lot == related_lot)
        {
            return Err(TenderError::validation(
                "lotValues",
                "relatedLot should be uniq for all lotValues of bid",
            ));
        }

        let amount = patch
            .amount
            .ok_or_else(|| TenderError::validation("lotValues", REQUIRED))?;
        if amount >= lot.value.amount {
            return Err(TenderError::validation(
                "lotValues",
                "value of bid should be less than value of lot",
            ));
        }
        let currency = patch
            .currency
            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
        if currency != lot.value.currency {
            return Err(TenderError::validation(
                "lotValues",
                "currency of bid should be identical to currency of value of lot",
            ));
        }
        let vat = patch
            .value_added_tax_included
            .unwrap_or(lot.value.value_added_tax_included);
        if vat != lot.value.value_added_tax_included {
            return Err(TenderError::validation(
                "lotValues",
                "valueAddedTaxIncluded of bid should be identical to valueAddedTaxIncluded of value of lot",
            ));
        }

        let date = match previous
            .iter()
            .find(|lv| lv.related_lot == related_lot && lv.value.amount == amount)
        {
            Some(prior) => prior.date,
            None => Some(now),
        };
        lot_values.push(LotValue {
            related_lot,
            value: Value {
                amount,
                currency,
                value_added_tax_included: vat,
            },
            status: LotValueStatus::Active,
            date,
            participation_url: req.participation_url,
        });
    }
    Ok(lot_values)
}

/// Bidder parameters must cover exactly the features that apply to the lots
/// the bid targets, each with a value from the feature's enumerated set.
fn validate_parameters(
    tender: &Tender,
    lot_values: &[LotValue],
    parameters: &[Parameter],
) -> TenderResult<()> {
    let applicable: Vec<&Feature> = tender
        .features
        .iter()
        .filter(|f| {
            lot_values
                .iter()
                .any(|lv| applies_to_lot(f, &tender.items, &lv.related_lot))
        })
        .collect();

    for parameter in parameters {
        if parameters.iter().filter(|p| p.code == parameter.code).count() > 1 {
            return Err(TenderError::validation(
                "parameters",
                "Parameter code should be uniq for all parameters",
            ));
        }
        let feature = applicable
            .iter()
            .find(|f| f.code == parameter.code)
            .ok_or_else(|| {
                TenderError::validation("parameters", "code should be one of feature code.")
            })?;
        if !feature.choices.iter().any(|c| c.value == parameter.value) {
            return Err(TenderError::validation(
                "parameters",
                "value should be one of feature value.",
            ));
        }
    }
    let all_covered = applicable
        .iter()
        .all(|f| parameters.iter().any(|p| p.code == f.code));
    if !all_covered {
        return Err(TenderError::validation(
            "parameters",
            "All features parameters is required.",
        ));
    }
    Ok(())
}
