//! Contract signing.
//!
//! A contract exists 1:1 with an activated award. Signing is blocked until
//! the award's complaint window has run out; a signed contract completes its
//! lot, and completing the last live lot settles the tender.

use chrono::{DateTime, Utc};

use crate::domain::award::AwardStatus;
use crate::domain::contract::{Contract, ContractStatus, UpdateContractRequest};
use crate::domain::lot::LotStatus;
use crate::domain::tender::{Tender, TenderStatus};
use crate::error::{TenderError, TenderResult};

pub fn patch_contract(
    tender: &mut Tender,
    contract_id: &str,
    req: UpdateContractRequest,
    now: DateTime<Utc>,
) -> TenderResult<Contract> {
    if !matches!(
        tender.status,
        TenderStatus::ActiveQualification | TenderStatus::ActiveAwarded
    ) {
        return Err(TenderError::forbidden(format!(
            "Can't update contract in current ({}) tender status",
            tender.status
        )));
    }

    let idx = tender
        .contracts
        .iter()
        .position(|c| c.id == contract_id)
        .ok_or_else(|| TenderError::not_found("contract_id"))?;
    let current_status = tender.contracts[idx].status;
    let award_id = tender.contracts[idx].award_id.clone();

    match (current_status, req.status) {
        (ContractStatus::Pending, Some(ContractStatus::Active)) => {
            let award = tender
                .awards
                .iter()
                .find(|a| a.id == award_id)
                .ok_or_else(|| TenderError::not_found("award_id"))?;
            if award.status != AwardStatus::Active {
                return Err(TenderError::forbidden(format!(
                    "Can't sign contract for ({}) award",
                    award.status.as_str()
                )));
            }
            if let Some(end) = award.complaint_period.end_date {
                if end > now {
                    return Err(TenderError::forbidden(format!(
                        "Can't sign contract before stand-still period end ({})",
                        end.to_rfc3339()
                    )));
                }
            }
            let lot_id = award.lot_id.clone();
            {
                let contract = &mut tender.contracts[idx];
                contract.status = ContractStatus::Active;
                contract.date = Some(now);
            }
            if let Some(lot) = tender.lot_mut(&lot_id) {
                lot.set_status(LotStatus::Complete, now);
            }
        }
        (ContractStatus::Pending, Some(ContractStatus::Cancelled)) => {
            let contract = &mut tender.contracts[idx];
            contract.status = ContractStatus::Cancelled;
            contract.date = Some(now);
        }
        (_, None) => {}
        (from, Some(to)) => {
            return Err(TenderError::forbidden(format!(
                "Can't update contract status from ({}) to ({})",
                from.as_str(),
                to.as_str()
            )));
        }
    }

    Ok(tender.contracts[idx].clone())
}
