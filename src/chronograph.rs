//! Scheduler-facing entry point.
//!
//! The external chronograph calls `tick` periodically with no client payload.
//! A tick applies whichever time-driven bulk transition is due, then runs the
//! reconciliation pass. Ticking a settled tender is a no-op.

use chrono::{DateTime, Utc};

use crate::config::Settings;
use crate::domain::qualification::{Qualification, QualificationStatus};
use crate::domain::tender::{Tender, TenderStatus};
use crate::domain::{new_id, LotStatus, Period};
use crate::rollup;

/// Advance the tender along its time-driven transitions. Returns whether the
/// tender or any lot changed status.
pub fn tick(tender: &mut Tender, settings: &Settings, now: DateTime<Utc>) -> bool {
    let status_before = tender.status;
    let lots_before: Vec<LotStatus> = tender.lots.iter().map(|l| l.status).collect();

    match tender.status {
        TenderStatus::ActiveTendering if tender.tender_period.ended_by(now) => {
            begin_pre_qualification(tender, settings, now);
        }
        TenderStatus::ActivePreQualificationStandStill
            if tender.qualification_period.ended_by(now) =>
        {
            close_standstill(tender, settings, now);
        }
        _ => {}
    }

    rollup::reconcile(tender, now);

    tender.status != status_before
        || tender
            .lots
            .iter()
            .map(|l| l.status)
            .ne(lots_before.into_iter())
}

/// Tendering deadline: under-subscribed lots fail, qualifications are
/// materialized atomically for every remaining (bid, lot) combination.
fn begin_pre_qualification(tender: &mut Tender, settings: &Settings, now: DateTime<Utc>) {
    let lot_ids: Vec<String> = tender.active_lots().map(|l| l.id.clone()).collect();
    for lot_id in &lot_ids {
        let bids = tender.active_bids_on_lot(lot_id).count();
        if bids < settings.min_bids_number {
            if let Some(lot) = tender.lot_mut(lot_id) {
                lot.set_status(LotStatus::Unsuccessful, now);
            }
        }
    }

    let mut qualifications: Vec<Qualification> = Vec::new();
    for lot in tender.active_lots() {
        for bid in tender.active_bids_on_lot(&lot.id) {
            qualifications.push(Qualification {
                id: new_id(),
                bid_id: bid.id.clone(),
                lot_id: lot.id.clone(),
                status: QualificationStatus::Pending,
                qualified: None,
                eligible: None,
                date: Some(now),
            });
        }
    }

    if !qualifications.is_empty() {
        tender.qualifications = qualifications;
        tender.qualification_period = Period {
            start_date: Some(now),
            end_date: None,
        };
        tender.set_status(TenderStatus::ActivePreQualification, now);
    }
    // No surviving lot means no qualifications; the reconciliation pass
    // settles the tender from the lot statuses.
}

/// Stand-still expiry: lots without enough actively qualified bids fail, the
/// rest move to auction.
fn close_standstill(tender: &mut Tender, settings: &Settings, now: DateTime<Utc>) {
    let lot_ids: Vec<String> = tender.active_lots().map(|l| l.id.clone()).collect();
    for lot_id in &lot_ids {
        let qualified = tender
            .qualifications
            .iter()
            .filter(|q| q.lot_id == *lot_id && q.status == QualificationStatus::Active)
            .count();
        if qualified < settings.min_bids_number {
            if let Some(lot) = tender.lot_mut(lot_id) {
                lot.set_status(LotStatus::Unsuccessful, now);
            }
        }
    }

    if tender.lots.iter().any(|l| l.is_active()) {
        for lot in tender.lots.iter_mut().filter(|l| l.is_active()) {
            let period = lot.auction_period.get_or_insert_with(Period::default);
            if period.start_date.is_none() || period.start_date > Some(now) {
                period.start_date = Some(now);
            }
        }
        tender.set_status(TenderStatus::ActiveAuction, now);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Settings;
    use crate::domain::bid::{CreateBidRequest, LotValueRequest};
    use crate::ops::bids::create_bid;
    use crate::ops::lots::create_lot;
    use crate::ops::testutil::{lot_request, now, tender, value_patch};
    use chrono::Duration;

    fn bid_on(t: &mut Tender, lot_id: &str, n: i64) {
        create_bid(
            t,
            CreateBidRequest {
                value: None,
                lot_values: Some(vec![LotValueRequest {
                    related_lot: Some(lot_id.to_string()),
                    value: Some(value_patch(n)),
                    participation_url: None,
                }]),
                parameters: None,
            },
            now(),
        )
        .unwrap();
    }

    fn close_tendering(t: &mut Tender) {
        t.tender_period.end_date = Some(now());
    }

    #[test]
    fn deadline_with_enough_bids_opens_pre_qualification() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        bid_on(&mut t, &lot.id, 400);
        bid_on(&mut t, &lot.id, 450);
        close_tendering(&mut t);

        assert!(tick(&mut t, &Settings::default(), now()));
        assert_eq!(t.status, TenderStatus::ActivePreQualification);
        assert_eq!(t.qualifications.len(), 2);
        assert_eq!(t.qualification_period.start_date, Some(now()));
    }

    #[test]
    fn under_subscribed_lot_fails_at_deadline() {
        let mut t = tender();
        let thin = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let full = create_lot(&mut t, lot_request(300, 30), now()).unwrap();
        bid_on(&mut t, &thin.id, 400);
        bid_on(&mut t, &full.id, 200);
        bid_on(&mut t, &full.id, 250);
        close_tendering(&mut t);

        tick(&mut t, &Settings::default(), now());
        assert_eq!(t.lot(&thin.id).unwrap().status, LotStatus::Unsuccessful);
        assert!(t.lot(&full.id).unwrap().is_active());
        assert_eq!(t.status, TenderStatus::ActivePreQualification);
        // Only the surviving lot's bids are up for review.
        assert!(t.qualifications.iter().all(|q| q.lot_id == full.id));
    }

    #[test]
    fn no_surviving_lot_means_unsuccessful_tender() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        bid_on(&mut t, &lot.id, 400);
        close_tendering(&mut t);

        tick(&mut t, &Settings::default(), now());
        assert_eq!(t.status, TenderStatus::Unsuccessful);
        assert!(t.qualifications.is_empty());
    }

    #[test]
    fn standstill_expiry_moves_survivors_to_auction() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        bid_on(&mut t, &lot.id, 400);
        bid_on(&mut t, &lot.id, 450);
        close_tendering(&mut t);
        tick(&mut t, &Settings::default(), now());
        for q in &mut t.qualifications {
            q.status = QualificationStatus::Active;
        }
        t.set_status(TenderStatus::ActivePreQualificationStandStill, now());
        t.qualification_period.end_date = Some(now() + Duration::days(10));

        // Nothing due before the window closes.
        assert!(!tick(&mut t, &Settings::default(), now()));

        let after = now() + Duration::days(10);
        assert!(tick(&mut t, &Settings::default(), after));
        assert_eq!(t.status, TenderStatus::ActiveAuction);
        let period = t.lot(&lot.id).unwrap().auction_period.clone().unwrap();
        assert!(period.start_date.is_some());
    }

    #[test]
    fn standstill_expiry_fails_lot_without_qualified_pair() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        bid_on(&mut t, &lot.id, 400);
        bid_on(&mut t, &lot.id, 450);
        close_tendering(&mut t);
        tick(&mut t, &Settings::default(), now());
        t.qualifications[0].status = QualificationStatus::Active;
        t.qualifications[1].status = QualificationStatus::Unsuccessful;
        t.set_status(TenderStatus::ActivePreQualificationStandStill, now());
        t.qualification_period.end_date = Some(now());

        tick(&mut t, &Settings::default(), now());
        assert_eq!(t.lot(&lot.id).unwrap().status, LotStatus::Unsuccessful);
        assert_eq!(t.status, TenderStatus::Unsuccessful);
    }

    #[test]
    fn settled_tender_ignores_ticks() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        bid_on(&mut t, &lot.id, 400);
        close_tendering(&mut t);
        assert!(tick(&mut t, &Settings::default(), now()));
        assert_eq!(t.status, TenderStatus::Unsuccessful);
        assert!(!tick(&mut t, &Settings::default(), now() + Duration::days(1)));
    }
}
