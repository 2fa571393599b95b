//! Application service over the tender aggregate.
//!
//! Each method is one load-apply-reconcile-save cycle. The store and the
//! clock are injected so the whole procedure can run against an in-memory
//! store and a frozen clock.

use chrono::{DateTime, Duration, Utc};
use tracing::{debug, info};

use crate::clock::Clock;
use crate::config::Settings;
use crate::domain::award::{Award, UpdateAwardRequest};
use crate::domain::bid::{Bid, CreateBidRequest, UpdateBidRequest};
use crate::domain::cancellation::{
    Cancellation, CreateCancellationRequest, UpdateCancellationRequest,
};
use crate::domain::contract::{Contract, UpdateContractRequest};
use crate::domain::lot::{CreateLotRequest, Lot, UpdateLotRequest};
use crate::domain::qualification::{Qualification, UpdateQualificationRequest};
use crate::domain::tender::{CreateTenderRequest, Tender, TenderResponse, UpdateTenderRequest};
use crate::domain::value::Period;
use crate::error::TenderResult;
use crate::ops;
use crate::rollup;
use crate::store::TenderStore;
use crate::{chronograph, ops::tender as tender_ops};

pub struct TenderService<S, C> {
    store: S,
    clock: C,
    settings: Settings,
}

impl<S: TenderStore, C: Clock> TenderService<S, C> {
    pub fn new(store: S, clock: C, settings: Settings) -> Self {
        Self {
            store,
            clock,
            settings,
        }
    }

    pub fn settings(&self) -> &Settings {
        &self.settings
    }

    pub fn create_tender(&self, req: CreateTenderRequest) -> TenderResult<TenderResponse> {
        let now = self.clock.now();
        let mut tender = tender_ops::create_tender(req, now)?;
        if tender.tender_period.end_date.is_none() {
            tender.tender_period.end_date =
                Some(now + Duration::days(self.settings.tendering_period_days));
        }
        self.store.save(&tender)?;
        info!(tender_id = %tender.id, "tender created");
        Ok(TenderResponse::from(&tender))
    }

    pub fn get_tender(&self, tender_id: &str) -> TenderResult<TenderResponse> {
        let tender = self.store.load(tender_id)?;
        Ok(TenderResponse::from(&tender))
    }

    pub fn patch_tender(
        &self,
        tender_id: &str,
        req: UpdateTenderRequest,
    ) -> TenderResult<TenderResponse> {
        let settings = self.settings.clone();
        let tender = self.mutate(tender_id, |t, now| {
            tender_ops::patch_tender(t, req, &settings, now)?;
            Ok(t.clone())
        })?;
        info!(tender_id, status = %tender.status, "tender updated");
        Ok(TenderResponse::from(&tender))
    }

    pub fn create_lot(&self, tender_id: &str, req: CreateLotRequest) -> TenderResult<Lot> {
        let lot = self.mutate(tender_id, |t, now| ops::lots::create_lot(t, req, now))?;
        info!(tender_id, lot_id = %lot.id, "lot added");
        Ok(lot)
    }

    pub fn patch_lot(
        &self,
        tender_id: &str,
        lot_id: &str,
        req: UpdateLotRequest,
    ) -> TenderResult<Lot> {
        let lot = self.mutate(tender_id, |t, now| ops::lots::patch_lot(t, lot_id, req, now))?;
        info!(tender_id, lot_id, "lot updated");
        Ok(lot)
    }

    pub fn delete_lot(&self, tender_id: &str, lot_id: &str) -> TenderResult<Lot> {
        let lot = self.mutate(tender_id, |t, _| ops::lots::delete_lot(t, lot_id))?;
        info!(tender_id, lot_id, "lot deleted");
        Ok(lot)
    }

    pub fn create_bid(&self, tender_id: &str, req: CreateBidRequest) -> TenderResult<Bid> {
        let bid = self.mutate(tender_id, |t, now| ops::bids::create_bid(t, req, now))?;
        info!(tender_id, bid_id = %bid.id, "bid registered");
        Ok(bid)
    }

    pub fn patch_bid(
        &self,
        tender_id: &str,
        bid_id: &str,
        req: UpdateBidRequest,
    ) -> TenderResult<Bid> {
        let bid = self.mutate(tender_id, |t, now| ops::bids::patch_bid(t, bid_id, req, now))?;
        info!(tender_id, bid_id, "bid updated");
        Ok(bid)
    }

    pub fn delete_bid(&self, tender_id: &str, bid_id: &str) -> TenderResult<Bid> {
        let bid = self.mutate(tender_id, |t, now| ops::bids::delete_bid(t, bid_id, now))?;
        info!(tender_id, bid_id, "bid deleted");
        Ok(bid)
    }

    pub fn patch_qualification(
        &self,
        tender_id: &str,
        qualification_id: &str,
        req: UpdateQualificationRequest,
    ) -> TenderResult<Qualification> {
        let qualification = self.mutate(tender_id, |t, now| {
            ops::qualifications::patch_qualification(t, qualification_id, req, now)
        })?;
        info!(
            tender_id,
            qualification_id,
            status = qualification.status.as_str(),
            "qualification decided"
        );
        Ok(qualification)
    }

    pub fn submit_auction_result(&self, tender_id: &str, lot_id: &str) -> TenderResult<Award> {
        let settings = self.settings.clone();
        let award = self.mutate(tender_id, |t, now| {
            ops::awards::submit_auction_result(t, lot_id, &settings, now)
        })?;
        info!(tender_id, lot_id, award_id = %award.id, "auction results recorded");
        Ok(award)
    }

    pub fn patch_award(
        &self,
        tender_id: &str,
        award_id: &str,
        req: UpdateAwardRequest,
    ) -> TenderResult<Award> {
        let settings = self.settings.clone();
        let award = self.mutate(tender_id, |t, now| {
            ops::awards::patch_award(t, award_id, req, &settings, now)
        })?;
        info!(tender_id, award_id, status = award.status.as_str(), "award decided");
        Ok(award)
    }

    pub fn patch_contract(
        &self,
        tender_id: &str,
        contract_id: &str,
        req: UpdateContractRequest,
    ) -> TenderResult<Contract> {
        let contract = self.mutate(tender_id, |t, now| {
            ops::contracts::patch_contract(t, contract_id, req, now)
        })?;
        info!(
            tender_id,
            contract_id,
            status = contract.status.as_str(),
            "contract updated"
        );
        Ok(contract)
    }

    pub fn create_cancellation(
        &self,
        tender_id: &str,
        req: CreateCancellationRequest,
    ) -> TenderResult<Cancellation> {
        let cancellation = self.mutate(tender_id, |t, now| {
            ops::cancellations::create_cancellation(t, req, now)
        })?;
        info!(tender_id, cancellation_id = %cancellation.id, "cancellation added");
        Ok(cancellation)
    }

    pub fn patch_cancellation(
        &self,
        tender_id: &str,
        cancellation_id: &str,
        req: UpdateCancellationRequest,
    ) -> TenderResult<Cancellation> {
        let cancellation = self.mutate(tender_id, |t, now| {
            ops::cancellations::patch_cancellation(t, cancellation_id, req, now)
        })?;
        info!(tender_id, cancellation_id, "cancellation updated");
        Ok(cancellation)
    }

    /// Chronograph entry point. Returns whether anything changed; unchanged
    /// tenders are not written back.
    pub fn tick(&self, tender_id: &str) -> TenderResult<bool> {
        let mut tender = self.store.load(tender_id)?;
        let now = self.clock.now();
        let changed = chronograph::tick(&mut tender, &self.settings, now);
        if changed {
            self.store.save(&tender)?;
            info!(tender_id, status = %tender.status, "chronograph transition");
        } else {
            debug!(tender_id, "chronograph tick: no transition due");
        }
        Ok(changed)
    }

    /// Auction scheduling: stamp the expected start on every active lot.
    pub fn schedule_auctions(&self, tender_id: &str, start: DateTime<Utc>) -> TenderResult<()> {
        self.mutate(tender_id, |t, _| {
            for lot in t.lots.iter_mut().filter(|l| l.is_active()) {
                lot.auction_period.get_or_insert_with(Period::default).start_date = Some(start);
            }
            Ok(())
        })
    }

    fn mutate<T>(
        &self,
        tender_id: &str,
        apply: impl FnOnce(&mut Tender, DateTime<Utc>) -> TenderResult<T>,
    ) -> TenderResult<T> {
        let mut tender = self.store.load(tender_id)?;
        let now = self.clock.now();
        let out = apply(&mut tender, now)?;
        rollup::reconcile(&mut tender, now);
        self.store.save(&tender)?;
        Ok(out)
    }
}
