//! Awards: auction outcome intake and award review.
//!
//! Every award is lot-scoped. The auction collaborator reports one lot at a
//! time; the cheapest surviving lot value wins a pending award. Rejecting an
//! award rolls straight to the next candidate, or fails the lot when no
//! candidate is left.

use chrono::{DateTime, Duration, Utc};

use crate::config::Settings;
use crate::domain::award::{Award, AwardStatus, UpdateAwardRequest};
use crate::domain::bid::LotValueStatus;
use crate::domain::contract::{Contract, ContractStatus};
use crate::domain::lot::LotStatus;
use crate::domain::new_id;
use crate::domain::tender::{Tender, TenderStatus};
use crate::domain::value::Period;
use crate::error::{TenderError, TenderResult};

/// Record the auction outcome for one lot: close its auction period and issue
/// a pending award to the best active lot value.
pub fn submit_auction_result(
    tender: &mut Tender,
    lot_id: &str,
    settings: &Settings,
    now: DateTime<Utc>,
) -> TenderResult<Award> {
    if tender.status != TenderStatus::ActiveAuction {
        return Err(TenderError::forbidden(format!(
            "Can't report auction results in current ({}) tender status",
            tender.status
        )));
    }
    let lot = tender
        .lot(lot_id)
        .ok_or_else(|| TenderError::not_found("lot_id"))?;
    if !lot.is_active() {
        return Err(TenderError::forbidden(format!(
            "Can't report auction results in current ({}) lot status",
            lot.status.as_str()
        )));
    }
    if tender
        .awards
        .iter()
        .any(|a| a.lot_id == lot_id && a.status != AwardStatus::Cancelled)
    {
        return Err(TenderError::forbidden(
            "Auction results already reported for this lot".to_string(),
        ));
    }

    let award = match next_candidate(tender, lot_id) {
        Some((bid_id, value)) => build_award(bid_id, lot_id, value, settings, now),
        None => {
            return Err(TenderError::forbidden(
                "Can't report auction results for lot without active bids".to_string(),
            ))
        }
    };
    if let Some(lot) = tender.lot_mut(lot_id) {
        lot.auction_period
            .get_or_insert_with(Period::default)
            .end_date = Some(now);
    }
    tender.awards.push(award.clone());

    // Last lot out of auction moves the whole tender into qualification.
    let all_reported = tender.active_lots().all(|l| {
        tender
            .awards
            .iter()
            .any(|a| a.lot_id == l.id && a.status != AwardStatus::Cancelled)
    });
    if all_reported {
        tender.set_status(TenderStatus::ActiveQualification, now);
    }
    Ok(award)
}

pub fn patch_award(
    tender: &mut Tender,
    award_id: &str,
    req: UpdateAwardRequest,
    settings: &Settings,
    now: DateTime<Utc>,
) -> TenderResult<Award> {
    if !matches!(
        tender.status,
        TenderStatus::ActiveQualification | TenderStatus::ActiveAwarded
    ) {
        return Err(TenderError::forbidden(format!(
            "Can't update award in current ({}) tender status",
            tender.status
        )));
    }

    let idx = tender
        .awards
        .iter()
        .position(|a| a.id == award_id)
        .ok_or_else(|| TenderError::not_found("award_id"))?;
    let current_status = tender.awards[idx].status;
    let lot_id = tender.awards[idx].lot_id.clone();
    let bid_id = tender.awards[idx].bid_id.clone();

    // Written only once the transition below has validated.
    let qualified = req.qualified.or(tender.awards[idx].qualified);
    let eligible = req.eligible.or(tender.awards[idx].eligible);

    match (current_status, req.status) {
        (AwardStatus::Pending, Some(AwardStatus::Active)) => {
            if qualified != Some(true) || eligible != Some(true) {
                return Err(TenderError::forbidden(
                    "Can't update award to active status when bid is not qualified or not eligible"
                        .to_string(),
                ));
            }
            let (award_value, award_id) = {
                let award = &mut tender.awards[idx];
                award.status = AwardStatus::Active;
                award.date = Some(now);
                (award.value.clone(), award.id.clone())
            };
            tender.contracts.push(Contract {
                id: new_id(),
                award_id,
                status: ContractStatus::Pending,
                value: award_value,
                date: Some(now),
            });
        }
        (AwardStatus::Pending, Some(AwardStatus::Unsuccessful)) => {
            {
                let award = &mut tender.awards[idx];
                award.status = AwardStatus::Unsuccessful;
                award.date = Some(now);
            }
            knock_out_lot_value(tender, &bid_id, &lot_id);
            advance_or_fail_lot(tender, &lot_id, settings, now);
        }
        (AwardStatus::Active, Some(AwardStatus::Cancelled)) => {
            {
                let award = &mut tender.awards[idx];
                award.status = AwardStatus::Cancelled;
                award.date = Some(now);
            }
            for contract in tender
                .contracts
                .iter_mut()
                .filter(|c| c.award_id == award_id && c.status == ContractStatus::Pending)
            {
                contract.status = ContractStatus::Cancelled;
                contract.date = Some(now);
            }
            advance_or_fail_lot(tender, &lot_id, settings, now);
        }
        (_, None) => {}
        (from, Some(to)) => {
            return Err(TenderError::forbidden(format!(
                "Can't update award status from ({}) to ({})",
                from.as_str(),
                to.as_str()
            )));
        }
    }

    let award = &mut tender.awards[idx];
    award.qualified = qualified;
    award.eligible = eligible;
    Ok(award.clone())
}

fn build_award(
    bid_id: String,
    lot_id: &str,
    value: crate::domain::value::Value,
    settings: &Settings,
    now: DateTime<Utc>,
) -> Award {
    Award {
        id: new_id(),
        bid_id,
        lot_id: lot_id.to_string(),
        status: AwardStatus::Pending,
        value,
        complaint_period: Period {
            start_date: Some(now),
            end_date: Some(now + Duration::days(settings.complaint_period_days)),
        },
        qualified: None,
        eligible: None,
        date: Some(now),
    }
}

/// Best remaining candidate on the lot: the cheapest active lot value among
/// bids without a settled award there. Ties go to the earlier offer.
fn next_candidate(tender: &Tender, lot_id: &str) -> Option<(String, crate::domain::value::Value)> {
    tender
        .active_bids_on_lot(lot_id)
        .filter(|b| {
            // A cancelled award is a procedural reset; only a rejection takes
            // the bid out of the running.
            !tender.awards.iter().any(|a| {
                a.bid_id == b.id && a.lot_id == lot_id && a.status == AwardStatus::Unsuccessful
            })
        })
        .filter_map(|b| b.lot_value(lot_id).map(|lv| (b.id.clone(), lv)))
        .min_by(|(_, a), (_, b)| a.value.amount.cmp(&b.value.amount).then(a.date.cmp(&b.date)))
        .map(|(bid_id, lv)| (bid_id, lv.value.clone()))
}

fn knock_out_lot_value(tender: &mut Tender, bid_id: &str, lot_id: &str) {
    if let Some(bid) = tender.bids.iter_mut().find(|b| b.id == bid_id) {
        for lv in bid
            .lot_values
            .iter_mut()
            .filter(|lv| lv.related_lot == lot_id)
        {
            lv.status = LotValueStatus::Unsuccessful;
        }
    }
}

/// After a rejection or cancellation: either the next candidate gets a fresh
/// pending award, or the lot fails.
fn advance_or_fail_lot(tender: &mut Tender, lot_id: &str, settings: &Settings, now: DateTime<Utc>) {
    match next_candidate(tender, lot_id) {
        Some((bid_id, value)) => {
            let award = build_award(bid_id, lot_id, value, settings, now);
            tender.awards.push(award);
        }
        None => {
            if let Some(lot) = tender.lot_mut(lot_id) {
                lot.set_status(LotStatus::Unsuccessful, now);
            }
        }
    }
}
