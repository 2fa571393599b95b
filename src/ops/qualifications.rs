//! Qualification review.
//!
//! Qualifications are created by the pre-qualification sweep, never by
//! clients. The reviewer only decides them: activation needs explicit
//! qualified and eligible confirmations, rejection knocks the bid's lot value
//! out. Once nothing is pending the procuring entity opens the stand-still
//! window through the tender status patch.

use chrono::{DateTime, Utc};

use crate::domain::bid::LotValueStatus;
use crate::domain::qualification::{Qualification, QualificationStatus, UpdateQualificationRequest};
use crate::domain::tender::{Tender, TenderStatus};
use crate::error::{TenderError, TenderResult};

const REQUIRED: &str = "This field is required.";

pub fn patch_qualification(
    tender: &mut Tender,
    qualification_id: &str,
    req: UpdateQualificationRequest,
    now: DateTime<Utc>,
) -> TenderResult<Qualification> {
    if tender.status != TenderStatus::ActivePreQualification {
        return Err(TenderError::forbidden(format!(
            "Can't update qualification in current ({}) tender status",
            tender.status
        )));
    }

    let idx = tender
        .qualifications
        .iter()
        .position(|q| q.id == qualification_id)
        .ok_or_else(|| TenderError::not_found("qualification_id"))?;
    let current = &tender.qualifications[idx];
    if current.status != QualificationStatus::Pending {
        return Err(TenderError::forbidden(format!(
            "Can't update qualification in current ({}) qualification status",
            current.status.as_str()
        )));
    }
    let lot_active = tender
        .lot(&current.lot_id)
        .is_some_and(|l| l.is_active());
    if !lot_active {
        return Err(TenderError::forbidden(
            "Can update qualification only in active lot status".to_string(),
        ));
    }

    let qualified = req.qualified.or(current.qualified);
    let eligible = req.eligible.or(current.eligible);
    let bid_id = current.bid_id.clone();
    let lot_id = current.lot_id.clone();

    match req.status {
        Some(QualificationStatus::Active) => {
            if qualified.is_none() {
                return Err(TenderError::validation("qualified", REQUIRED));
            }
            if eligible.is_none() {
                return Err(TenderError::validation("eligible", REQUIRED));
            }
            if qualified != Some(true) || eligible != Some(true) {
                return Err(TenderError::forbidden(
                    "Can't update qualification to active status when bid is not qualified or not eligible"
                        .to_string(),
                ));
            }
            let q = &mut tender.qualifications[idx];
            q.status = QualificationStatus::Active;
            q.qualified = qualified;
            q.eligible = eligible;
            q.date = Some(now);
        }
        Some(QualificationStatus::Unsuccessful) => {
            let q = &mut tender.qualifications[idx];
            q.status = QualificationStatus::Unsuccessful;
            q.qualified = qualified;
            q.eligible = eligible;
            q.date = Some(now);
            // The rejected bid stops counting for this lot only.
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
        Some(QualificationStatus::Pending) | None => {
            let q = &mut tender.qualifications[idx];
            q.qualified = qualified;
            q.eligible = eligible;
        }
    }

    Ok(tender.qualifications[idx].clone())
}
