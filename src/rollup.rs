//! Derived-value aggregation and tender status reconciliation.
//!
//! `tender_value`, `tender_minimal_step` and `tender_guarantee` are pure
//! functions over the lot set. `reconcile` is the single idempotent pass run
//! after every state-changing operation and on chronograph ticks: it syncs
//! derived amounts and rolls the parent status up from the lot statuses.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;

use crate::domain::lot::{Lot, LotStatus};
use crate::domain::tender::{Tender, TenderStatus};
use crate::domain::value::{Guarantee, Value};

/// Lots that still count towards tender value and minimal step. Terminal
/// failures stop counting; completed lots keep their price in the total.
fn priced_lots(tender: &Tender) -> impl Iterator<Item = &Lot> {
    tender.lots.iter().filter(|l| {
        !matches!(l.status, LotStatus::Cancelled | LotStatus::Unsuccessful)
    })
}

/// Tender value: sum of lot values, falling back to the direct field when no
/// lot qualifies.
pub fn tender_value(tender: &Tender) -> Value {
    let mut value = tender.value.clone();
    let amounts: Vec<Decimal> = priced_lots(tender).map(|l| l.value.amount).collect();
    if !amounts.is_empty() {
        value.amount = amounts.into_iter().sum();
    }
    value
}

/// Tender minimal step: the smallest lot step, falling back to the direct
/// field when no lot qualifies.
pub fn tender_minimal_step(tender: &Tender) -> Value {
    let mut step = tender.minimal_step.clone();
    if let Some(min) = priced_lots(tender).map(|l| l.minimal_step.amount).min() {
        step.amount = min;
    }
    step
}

/// Tender guarantee: declared base amount plus the guarantees of all
/// non-deleted lots, regardless of lot status. Absent when the tender
/// declares none. Guarantee rollup is keyed strictly to lot deletion, so a
/// cancelled lot keeps contributing until it is removed.
pub fn tender_guarantee(tender: &Tender) -> Option<Guarantee> {
    let declared = tender.guarantee.as_ref()?;
    let lot_sum: Decimal = tender
        .lots
        .iter()
        .filter_map(|l| l.guarantee.as_ref())
        .map(|g| g.amount)
        .sum();
    Some(Guarantee {
        amount: declared.amount + lot_sum,
        currency: declared.currency.clone(),
    })
}

/// Write the lot-derived value/step amounts back onto the aggregate. The
/// declared guarantee is left alone; its rollup stays a pure projection.
fn sync_derived(tender: &mut Tender) {
    tender.value = tender_value(tender);
    tender.minimal_step = tender_minimal_step(tender);
}

/// Recompute derived fields and the parent status from the lot collection.
/// Safe to re-run: a settled tender comes out unchanged.
pub fn reconcile(tender: &mut Tender, now: DateTime<Utc>) {
    sync_derived(tender);

    if tender.lots.is_empty()
        || tender.status == TenderStatus::Draft
        || tender.status.is_terminal()
    {
        return;
    }

    // Award-collection-driven stage moves within the shared tender stage.
    let all_active_awarded = tender.active_lots().all(|lot| {
        tender
            .awards
            .iter()
            .any(|a| a.lot_id == lot.id && a.status == crate::domain::award::AwardStatus::Active)
    });
    match tender.status {
        TenderStatus::ActiveQualification if all_active_awarded => {
            tender.set_status(TenderStatus::ActiveAwarded, now);
        }
        TenderStatus::ActiveAwarded if !all_active_awarded => {
            tender.set_status(TenderStatus::ActiveQualification, now);
        }
        _ => {}
    }

    // Terminal rollup once no lot is live.
    if tender.lots.iter().any(|l| l.is_active()) {
        return;
    }
    if tender.lots.iter().all(|l| l.status == LotStatus::Cancelled) {
        tender.set_status(TenderStatus::Cancelled, now);
    } else if tender.lots.iter().any(|l| l.status == LotStatus::Complete) {
        tender.set_status(TenderStatus::Complete, now);
    } else {
        tender.set_status(TenderStatus::Unsuccessful, now);
    }
}
