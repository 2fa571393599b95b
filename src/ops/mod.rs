//! Domain operations over the tender aggregate.
//!
//! Every operation takes the loaded aggregate, an already-decoded payload and
//! the injected timestamp, applies exactly one transition and returns the
//! touched entity. Derived recomputation happens afterwards in a single
//! `rollup::reconcile` pass driven by the service layer.

pub mod awards;
pub mod bids;
pub mod cancellations;
pub mod contracts;
pub mod lots;
pub mod qualifications;
pub mod tender;

#[cfg(test)]
pub(crate) mod testutil {
    use chrono::{DateTime, TimeZone, Utc};
    use rust_decimal::Decimal;

    use crate::domain::lot::CreateLotRequest;
    use crate::domain::tender::{CreateTenderRequest, Tender, TenderStatus};
    use crate::domain::value::{GuaranteePatch, ValuePatch};

    pub fn now() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 12, 0, 0).unwrap()
    }

    pub fn amount(n: i64) -> Decimal {
        Decimal::from(n)
    }

    pub fn value_patch(n: i64) -> ValuePatch {
        ValuePatch {
            amount: Some(amount(n)),
            ..Default::default()
        }
    }

    pub fn tender() -> Tender {
        let mut t = super::tender::create_tender(
            CreateTenderRequest {
                title: Some("test tender".to_string()),
                value: Some(value_patch(1000)),
                minimal_step: Some(value_patch(10)),
                ..Default::default()
            },
            now(),
        )
        .expect("test tender");
        t.status = TenderStatus::ActiveTendering;
        t
    }

    pub fn lot_request(value: i64, step: i64) -> CreateLotRequest {
        CreateLotRequest {
            title: Some("lot title".to_string()),
            description: Some("lot description".to_string()),
            value: Some(value_patch(value)),
            minimal_step: Some(value_patch(step)),
            ..Default::default()
        }
    }

    pub fn guarantee_patch(n: i64, currency: &str) -> GuaranteePatch {
        GuaranteePatch {
            amount: Some(amount(n)),
            currency: Some(currency.to_string()),
        }
    }
}
