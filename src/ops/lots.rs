//! Lot lifecycle: create, patch, delete.
//!
//! Lot edits are gated on the tender status and on the lot still being
//! active. Currency and VAT fields are tender-cascade-only: lot-level
//! attempts to change them are silently ignored.

use chrono::{DateTime, Utc};

use crate::domain::lot::{CreateLotRequest, Lot, LotStatus, UpdateLotRequest};
use crate::domain::new_id;
use crate::domain::tender::{Tender, TenderStatus};
use crate::domain::value::{Guarantee, GuaranteePatch, Period, Value, DEFAULT_CURRENCY};
use crate::error::{TenderError, TenderResult};

const REQUIRED: &str = "This field is required.";

pub fn create_lot(
    tender: &mut Tender,
    req: CreateLotRequest,
    now: DateTime<Utc>,
) -> TenderResult<Lot> {
    if !tender.status.allows_lot_edits() {
        return Err(TenderError::forbidden(format!(
            "Can't add lot in current ({}) tender status",
            tender.status
        )));
    }

    let title = req
        .title
        .ok_or_else(|| TenderError::validation("title", REQUIRED))?;
    let value_amount = req
        .value
        .and_then(|v| v.amount)
        .ok_or_else(|| TenderError::validation("value", REQUIRED))?;
    let step_amount = req
        .minimal_step
        .and_then(|v| v.amount)
        .ok_or_else(|| TenderError::validation("minimalStep", REQUIRED))?;
    if step_amount >= value_amount {
        return Err(TenderError::validation(
            "minimalStep",
            "value should be less than value of lot",
        ));
    }

    let id = req.id.unwrap_or_else(new_id);
    if tender.lots.iter().any(|l| l.id == id) {
        return Err(TenderError::validation(
            "lots",
            "Lot id should be uniq for all lots",
        ));
    }

    let guarantee = match req.guarantee {
        Some(g) => Some(build_guarantee(tender, g)?),
        None => None,
    };

    // Currency and VAT always inherit from the tender; the cascade is
    // one-directional.
    let currency = tender.value.currency.clone();
    let vat = tender.value.value_added_tax_included;

    let lot = Lot {
        id,
        title,
        description: req.description,
        value: Value {
            amount: value_amount,
            currency: currency.clone(),
            value_added_tax_included: vat,
        },
        minimal_step: Value {
            amount: step_amount,
            currency,
            value_added_tax_included: vat,
        },
        guarantee,
        status: LotStatus::Active,
        auction_period: scheduled_auction_period(tender),
        date: Some(now),
    };
    tender.lots.push(lot.clone());
    Ok(lot)
}

/// Lots added after publication pick up the scheduled auction start.
fn scheduled_auction_period(tender: &Tender) -> Option<Period> {
    if tender.status == TenderStatus::ActiveTendering {
        Some(Period {
            start_date: tender.tender_period.end_date,
            end_date: None,
        })
    } else {
        None
    }
}

fn build_guarantee(tender: &Tender, patch: GuaranteePatch) -> TenderResult<Guarantee> {
    let amount = patch
        .amount
        .ok_or_else(|| TenderError::validation("guarantee", REQUIRED))?;
    let currency = patch
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    if let Some(tg) = &tender.guarantee {
        if currency != tg.currency {
            return Err(TenderError::validation(
                "lots",
                "lot guarantee currency should be identical to tender guarantee currency",
            ));
        }
    }
    Ok(Guarantee { amount, currency })
}

pub fn patch_lot(
    tender: &mut Tender,
    lot_id: &str,
    req: UpdateLotRequest,
    _now: DateTime<Utc>,
) -> TenderResult<Lot> {
    if !tender.status.allows_lot_edits() {
        return Err(TenderError::forbidden(format!(
            "Can't update lot in current ({}) tender status",
            tender.status
        )));
    }

    let tender_guarantee_currency = tender.guarantee.as_ref().map(|g| g.currency.clone());
    let current = tender
        .lot(lot_id)
        .ok_or_else(|| TenderError::not_found("lot_id"))?;
    if !current.is_active() {
        return Err(TenderError::forbidden(format!(
            "Can't update lot in current ({}) lot status",
            current.status.as_str()
        )));
    }

    // Validate against a scratch copy, commit on success.
    let mut lot = current.clone();
    if let Some(title) = req.title {
        lot.title = title;
    }
    if let Some(description) = req.description {
        lot.description = Some(description);
    }
    if let Some(v) = req.value {
        // currency/VAT are cascade-only, amount is lot-local
        if let Some(amount) = v.amount {
            lot.value.amount = amount;
        }
    }
    if let Some(v) = req.minimal_step {
        if let Some(amount) = v.amount {
            lot.minimal_step.amount = amount;
        }
    }
    if lot.minimal_step.amount >= lot.value.amount {
        return Err(TenderError::validation(
            "minimalStep",
            "value should be less than value of lot",
        ));
    }
    if let Some(g) = req.guarantee {
        match (&mut lot.guarantee, g.amount) {
            (Some(existing), Some(amount)) => existing.amount = amount,
            (Some(_), None) => {} // currency-only patches are ignored
            (None, Some(amount)) => {
                lot.guarantee = Some(Guarantee {
                    amount,
                    currency: tender_guarantee_currency
                        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                });
            }
            (None, None) => {}
        }
    }

    *tender
        .lot_mut(lot_id)
        .ok_or_else(|| TenderError::not_found("lot_id"))? = lot.clone();
    Ok(lot)
}

pub fn delete_lot(tender: &mut Tender, lot_id: &str) -> TenderResult<Lot> {
    if !tender.status.allows_lot_edits() {
        return Err(TenderError::forbidden(format!(
            "Can't delete lot in current ({}) tender status",
            tender.status
        )));
    }
    let idx = tender
        .lots
        .iter()
        .position(|l| l.id == lot_id)
        .ok_or_else(|| TenderError::not_found("lot_id"))?;
    if !tender.lots[idx].is_active() {
        return Err(TenderError::forbidden(format!(
            "Can't delete lot in current ({}) lot status",
            tender.lots[idx].status.as_str()
        )));
    }
    // Dangling-reference protection: items must be detached first.
    if tender
        .items
        .iter()
        .any(|i| i.related_lot.as_deref() == Some(lot_id))
    {
        return Err(TenderError::validation(
            "items",
            "relatedLot should be one of lots",
        ));
    }

    let lot = tender.lots.remove(idx);
    for bid in &mut tender.bids {
        bid.lot_values.retain(|lv| lv.related_lot != lot_id);
    }
    Ok(lot)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::testutil::{guarantee_patch, lot_request, now, tender};
    use crate::rollup;

    #[test]
    fn create_requires_step_below_value() {
        let mut t = tender();
        let err = create_lot(&mut t, lot_request(100, 500), now()).unwrap_err();
        let body = err.to_response();
        assert_eq!(body.name, "minimalStep");
        assert_eq!(body.description, "value should be less than value of lot");
        assert!(t.lots.is_empty());
    }

    #[test]
    fn create_requires_title_value_and_step() {
        let mut t = tender();
        let err = create_lot(&mut t, Default::default(), now()).unwrap_err();
        assert_eq!(err.to_response().description, "This field is required.");
    }

    #[test]
    fn lot_inherits_tender_currency_and_vat() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        assert_eq!(lot.value.currency, "UAH");
        assert_eq!(lot.minimal_step.currency, "UAH");
        assert!(lot.value.value_added_tax_included);
    }

    #[test]
    fn duplicate_lot_id_rejected() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let mut again = lot_request(500, 100);
        again.id = Some(lot.id.clone());
        let err = create_lot(&mut t, again, now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Lot id should be uniq for all lots"
        );
    }

    #[test]
    fn guarantee_currency_must_match_tender_guarantee() {
        let mut t = tender();
        t.guarantee = Some(crate::domain::value::Guarantee {
            amount: crate::ops::testutil::amount(100),
            currency: "USD".to_string(),
        });
        let mut req = lot_request(500, 100);
        req.guarantee = Some(guarantee_patch(500, "UAH"));
        let err = create_lot(&mut t, req, now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "lot guarantee currency should be identical to tender guarantee currency"
        );

        let mut req = lot_request(500, 100);
        req.guarantee = Some(guarantee_patch(20, "USD"));
        let lot = create_lot(&mut t, req, now()).unwrap();
        assert_eq!(lot.guarantee.unwrap().amount, crate::ops::testutil::amount(20));
        // declared 100 + lot 20
        assert_eq!(
            rollup::tender_guarantee(&t).unwrap().amount,
            crate::ops::testutil::amount(120)
        );
    }

    #[test]
    fn patch_ignores_currency_and_vat() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let patched = patch_lot(
            &mut t,
            &lot.id,
            UpdateLotRequest {
                title: Some("new title".to_string()),
                value: Some(crate::domain::value::ValuePatch {
                    currency: Some("USD".to_string()),
                    value_added_tax_included: Some(false),
                    ..Default::default()
                }),
                minimal_step: Some(crate::domain::value::ValuePatch {
                    currency: Some("USD".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        assert_eq!(patched.title, "new title");
        assert_eq!(patched.value.currency, "UAH");
        assert_eq!(patched.minimal_step.currency, "UAH");
        assert!(patched.value.value_added_tax_included);
    }

    #[test]
    fn delete_rejected_while_item_references_lot() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        t.items.push(crate::domain::tender::Item {
            id: crate::domain::new_id(),
            description: None,
            related_lot: Some(lot.id.clone()),
        });
        let err = delete_lot(&mut t, &lot.id).unwrap_err();
        assert_eq!(err.to_response().name, "items");
        assert_eq!(
            err.to_response().description,
            "relatedLot should be one of lots"
        );

        t.items.clear();
        delete_lot(&mut t, &lot.id).unwrap();
        assert!(t.lots.is_empty());
    }

    #[test]
    fn lot_edits_gated_on_tender_status() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        t.set_status(crate::domain::tender::TenderStatus::Unsuccessful, now());

        let err = create_lot(&mut t, lot_request(500, 100), now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can't add lot in current (unsuccessful) tender status"
        );
        let err = patch_lot(&mut t, &lot.id, Default::default(), now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can't update lot in current (unsuccessful) tender status"
        );
        let err = delete_lot(&mut t, &lot.id).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can't delete lot in current (unsuccessful) tender status"
        );
    }
}
