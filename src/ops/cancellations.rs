//! Tender- and lot-scoped cancellations.
//!
//! A pending cancellation is an announcement; activating it is the terminal
//! act. Lot-scoped activation cancels exactly one lot, tender-scoped
//! activation cancels every live lot. The reconciliation pass then settles
//! the parent status.

use chrono::{DateTime, Utc};

use crate::domain::cancellation::{
    Cancellation, CancellationOf, CancellationStatus, CreateCancellationRequest,
    UpdateCancellationRequest,
};
use crate::domain::lot::LotStatus;
use crate::domain::new_id;
use crate::domain::tender::{Tender, TenderStatus};
use crate::error::{TenderError, TenderResult};

const REQUIRED: &str = "This field is required.";

pub fn create_cancellation(
    tender: &mut Tender,
    req: CreateCancellationRequest,
    now: DateTime<Utc>,
) -> TenderResult<Cancellation> {
    if tender.status.is_terminal() {
        return Err(TenderError::forbidden(format!(
            "Can't add cancellation in current ({}) tender status",
            tender.status
        )));
    }

    let reason = req
        .reason
        .ok_or_else(|| TenderError::validation("reason", REQUIRED))?;
    let cancellation_of = req.cancellation_of.unwrap_or_default();
    let related_lot = match cancellation_of {
        CancellationOf::Lot => {
            let related_lot = req
                .related_lot
                .ok_or_else(|| TenderError::validation("relatedLot", REQUIRED))?;
            let lot = tender.lot(&related_lot).ok_or_else(|| {
                TenderError::validation("relatedLot", "relatedLot should be one of lots")
            })?;
            if !lot.is_active() {
                return Err(TenderError::forbidden(
                    "Can add cancellation only in active lot status".to_string(),
                ));
            }
            Some(related_lot)
        }
        CancellationOf::Tender => None,
    };

    let cancellation = Cancellation {
        id: new_id(),
        reason,
        status: req.status.unwrap_or(CancellationStatus::Pending),
        cancellation_of,
        related_lot,
        date: Some(now),
    };
    tender.cancellations.push(cancellation.clone());
    if cancellation.status == CancellationStatus::Active {
        apply_cancellation(tender, &cancellation, now);
    }
    Ok(cancellation)
}

pub fn patch_cancellation(
    tender: &mut Tender,
    cancellation_id: &str,
    req: UpdateCancellationRequest,
    now: DateTime<Utc>,
) -> TenderResult<Cancellation> {
    if tender.status.is_terminal() {
        return Err(TenderError::forbidden(format!(
            "Can't update cancellation in current ({}) tender status",
            tender.status
        )));
    }

    let idx = tender
        .cancellations
        .iter()
        .position(|c| c.id == cancellation_id)
        .ok_or_else(|| TenderError::not_found("cancellation_id"))?;
    if let Some(related_lot) = tender.cancellations[idx].related_lot.clone() {
        let lot_active = tender.lot(&related_lot).is_some_and(|l| l.is_active());
        if !lot_active {
            return Err(TenderError::forbidden(
                "Can update cancellation only in active lot status".to_string(),
            ));
        }
    }
    if tender.cancellations[idx].status == CancellationStatus::Active {
        return Err(TenderError::forbidden(
            "Can't update cancellation in current (active) cancellation status".to_string(),
        ));
    }

    if let Some(reason) = req.reason {
        tender.cancellations[idx].reason = reason;
    }
    if let Some(status) = req.status {
        tender.cancellations[idx].status = status;
        tender.cancellations[idx].date = Some(now);
        if status == CancellationStatus::Active {
            let cancellation = tender.cancellations[idx].clone();
            apply_cancellation(tender, &cancellation, now);
        }
    }
    Ok(tender.cancellations[idx].clone())
}

fn apply_cancellation(tender: &mut Tender, cancellation: &Cancellation, now: DateTime<Utc>) {
    match (&cancellation.cancellation_of, &cancellation.related_lot) {
        (CancellationOf::Lot, Some(lot_id)) => {
            if let Some(lot) = tender.lot_mut(lot_id) {
                lot.set_status(LotStatus::Cancelled, now);
            }
        }
        _ => {
            if tender.has_lots() {
                for lot in tender.lots.iter_mut().filter(|l| l.is_active()) {
                    lot.set_status(LotStatus::Cancelled, now);
                }
            } else {
                tender.set_status(TenderStatus::Cancelled, now);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ops::lots::create_lot;
    use crate::ops::testutil::{lot_request, now, tender};
    use crate::rollup;

    fn lot_cancellation(lot_id: &str) -> CreateCancellationRequest {
        CreateCancellationRequest {
            reason: Some("cancellation reason".to_string()),
            status: None,
            cancellation_of: Some(CancellationOf::Lot),
            related_lot: Some(lot_id.to_string()),
        }
    }

    #[test]
    fn reason_and_related_lot_required() {
        let mut t = tender();
        let err = create_cancellation(&mut t, CreateCancellationRequest::default(), now())
            .unwrap_err();
        assert_eq!(err.to_response().name, "reason");

        let err = create_cancellation(
            &mut t,
            CreateCancellationRequest {
                reason: Some("r".to_string()),
                cancellation_of: Some(CancellationOf::Lot),
                ..Default::default()
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(err.to_response().name, "relatedLot");
        assert_eq!(err.to_response().description, "This field is required.");
    }

    #[test]
    fn related_lot_must_exist_and_be_active() {
        let mut t = tender();
        let err = create_cancellation(&mut t, lot_cancellation("missing"), now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "relatedLot should be one of lots"
        );

        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        t.lot_mut(&lot.id)
            .unwrap()
            .set_status(LotStatus::Unsuccessful, now());
        let err = create_cancellation(&mut t, lot_cancellation(&lot.id), now()).unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can add cancellation only in active lot status"
        );
    }

    #[test]
    fn activating_lot_cancellation_cancels_only_that_lot() {
        let mut t = tender();
        let first = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let second = create_lot(&mut t, lot_request(300, 30), now()).unwrap();

        let c = create_cancellation(&mut t, lot_cancellation(&first.id), now()).unwrap();
        assert_eq!(c.status, CancellationStatus::Pending);
        assert!(t.lot(&first.id).unwrap().is_active());

        patch_cancellation(
            &mut t,
            &c.id,
            UpdateCancellationRequest {
                status: Some(CancellationStatus::Active),
                reason: None,
            },
            now(),
        )
        .unwrap();
        assert_eq!(t.lot(&first.id).unwrap().status, LotStatus::Cancelled);
        assert!(t.lot(&second.id).unwrap().is_active());

        rollup::reconcile(&mut t, now());
        assert_eq!(t.status, TenderStatus::ActiveTendering);
    }

    #[test]
    fn cancelling_every_lot_cancels_the_tender() {
        let mut t = tender();
        let first = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let second = create_lot(&mut t, lot_request(300, 30), now()).unwrap();
        for lot_id in [&first.id, &second.id] {
            let mut req = lot_cancellation(lot_id);
            req.status = Some(CancellationStatus::Active);
            create_cancellation(&mut t, req, now()).unwrap();
        }
        rollup::reconcile(&mut t, now());
        assert_eq!(t.status, TenderStatus::Cancelled);
    }

    #[test]
    fn tender_cancellation_sweeps_active_lots() {
        let mut t = tender();
        create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        create_lot(&mut t, lot_request(300, 30), now()).unwrap();
        create_cancellation(
            &mut t,
            CreateCancellationRequest {
                reason: Some("procedure stopped".to_string()),
                status: Some(CancellationStatus::Active),
                cancellation_of: Some(CancellationOf::Tender),
                related_lot: None,
            },
            now(),
        )
        .unwrap();
        assert!(t.lots.iter().all(|l| l.status == LotStatus::Cancelled));
        rollup::reconcile(&mut t, now());
        assert_eq!(t.status, TenderStatus::Cancelled);
    }

    #[test]
    fn cancelled_lot_blocks_reversal_to_pending() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        create_lot(&mut t, lot_request(300, 30), now()).unwrap();
        let mut req = lot_cancellation(&lot.id);
        req.status = Some(CancellationStatus::Active);
        let c = create_cancellation(&mut t, req, now()).unwrap();

        let err = patch_cancellation(
            &mut t,
            &c.id,
            UpdateCancellationRequest {
                status: Some(CancellationStatus::Pending),
                reason: None,
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 403);
        assert_eq!(
            err.to_response().description,
            "Can update cancellation only in active lot status"
        );
        assert_eq!(t.lot(&lot.id).unwrap().status, LotStatus::Cancelled);
    }

    #[test]
    fn active_tender_cancellation_is_frozen() {
        let mut t = tender();
        create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let c = create_cancellation(
            &mut t,
            CreateCancellationRequest {
                reason: Some("procedure stopped".to_string()),
                status: Some(CancellationStatus::Active),
                cancellation_of: Some(CancellationOf::Tender),
                related_lot: None,
            },
            now(),
        )
        .unwrap();

        let err = patch_cancellation(
            &mut t,
            &c.id,
            UpdateCancellationRequest {
                status: Some(CancellationStatus::Pending),
                reason: None,
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can't update cancellation in current (active) cancellation status"
        );
    }
}
