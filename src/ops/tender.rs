//! Tender-level operations: creation, patching, activation.
//!
//! The tender carries the authoritative currency and VAT flags. Changing them
//! here cascades down to every lot; lot-level attempts to diverge are ignored
//! by the lot operations.

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;

use crate::config::Settings;
use crate::domain::lot::Lot;
use crate::domain::new_id;
use crate::domain::qualification::QualificationStatus;
use crate::domain::tender::{
    CreateTenderRequest, Feature, FeatureOf, Item, ItemRequest, Tender, TenderStatus,
    UpdateTenderRequest,
};
use crate::domain::value::{Guarantee, Period, Value, DEFAULT_CURRENCY};
use crate::error::{TenderError, TenderResult};

const REQUIRED: &str = "This field is required.";

/// Upper bound on a single feature weight and on the per-lot weight sum.
fn feature_limit() -> Decimal {
    Decimal::new(3, 1)
}

pub fn create_tender(req: CreateTenderRequest, now: DateTime<Utc>) -> TenderResult<Tender> {
    let title = req
        .title
        .ok_or_else(|| TenderError::validation("title", REQUIRED))?;
    let value_patch = req
        .value
        .ok_or_else(|| TenderError::validation("value", REQUIRED))?;
    let value_amount = value_patch
        .amount
        .ok_or_else(|| TenderError::validation("value", REQUIRED))?;
    let step_patch = req
        .minimal_step
        .ok_or_else(|| TenderError::validation("minimalStep", REQUIRED))?;
    let step_amount = step_patch
        .amount
        .ok_or_else(|| TenderError::validation("minimalStep", REQUIRED))?;
    if step_amount >= value_amount {
        return Err(TenderError::validation(
            "minimalStep",
            "value should be less than value of tender",
        ));
    }

    let currency = value_patch
        .currency
        .unwrap_or_else(|| DEFAULT_CURRENCY.to_string());
    let vat = value_patch.value_added_tax_included.unwrap_or(true);

    let guarantee = match req.guarantee {
        Some(g) => {
            let amount = g
                .amount
                .ok_or_else(|| TenderError::validation("guarantee", REQUIRED))?;
            Some(Guarantee {
                amount,
                currency: g.currency.unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
            })
        }
        None => None,
    };

    let items = build_items(req.items.unwrap_or_default(), &[])?;

    Ok(Tender {
        id: new_id(),
        title: Some(title),
        status: TenderStatus::Draft,
        date: Some(now),
        value: Value {
            amount: value_amount,
            currency: currency.clone(),
            value_added_tax_included: vat,
        },
        // The step always shares the value currency and VAT flag.
        minimal_step: Value {
            amount: step_amount,
            currency,
            value_added_tax_included: vat,
        },
        guarantee,
        tender_period: req.tender_period.unwrap_or(Period {
            start_date: Some(now),
            end_date: None,
        }),
        qualification_period: Period::default(),
        items,
        features: Vec::new(),
        lots: Vec::new(),
        bids: Vec::new(),
        qualifications: Vec::new(),
        awards: Vec::new(),
        contracts: Vec::new(),
        cancellations: Vec::new(),
        rev: 0,
    })
}

pub fn patch_tender(
    tender: &mut Tender,
    req: UpdateTenderRequest,
    settings: &Settings,
    now: DateTime<Utc>,
) -> TenderResult<()> {
    if !matches!(
        tender.status,
        TenderStatus::Draft | TenderStatus::ActiveTendering
    ) {
        // Past tendering only one client move remains: closing the
        // qualification review into the stand-still window.
        if tender.status == TenderStatus::ActivePreQualification
            && req.status == Some(TenderStatus::ActivePreQualificationStandStill)
        {
            return open_standstill(tender, settings, now);
        }
        return Err(TenderError::forbidden(format!(
            "Can't update tender in current ({}) tender status",
            tender.status
        )));
    }

    if let Some(status) = req.status {
        if status != tender.status {
            // Publication is the only other client-driven transition; the
            // rest is owned by the chronograph and the reconciliation pass.
            if tender.status == TenderStatus::Draft && status == TenderStatus::ActiveTendering {
                publish(tender, settings, now);
            } else {
                return Err(TenderError::validation(
                    "status",
                    "Can't update tender status",
                ));
            }
        }
    }

    apply_value_patches(tender, &req)?;

    if let Some(g) = req.guarantee {
        if let Some(amount) = g.amount {
            match &mut tender.guarantee {
                Some(existing) => existing.amount = amount,
                None => {
                    tender.guarantee = Some(Guarantee {
                        amount,
                        currency: g
                            .currency
                            .clone()
                            .unwrap_or_else(|| DEFAULT_CURRENCY.to_string()),
                    });
                }
            }
        }
        if let Some(currency) = g.currency {
            if let Some(existing) = &mut tender.guarantee {
                existing.currency = currency.clone();
            }
            // Declared currency wins over every lot guarantee.
            for lot in &mut tender.lots {
                if let Some(lg) = &mut lot.guarantee {
                    lg.currency = currency.clone();
                }
            }
        }
    }

    if let Some(items) = req.items {
        tender.items = build_items(items, &tender.lots)?;
    }

    if let Some(features) = req.features {
        validate_features(&features, &tender.items, &tender.lots)?;
        tender.features = features;
    }

    if let Some(title) = req.title {
        tender.title = Some(title);
    }

    if !tender.has_lots() && tender.minimal_step.amount >= tender.value.amount {
        return Err(TenderError::validation(
            "minimalStep",
            "value should be less than value of tender",
        ));
    }

    Ok(())
}

/// Publication stamps the tendering deadline and the scheduled auction start
/// on every lot created while the tender was a draft.
fn publish(tender: &mut Tender, settings: &Settings, now: DateTime<Utc>) {
    if tender.tender_period.end_date.is_none() {
        tender.tender_period.end_date =
            Some(now + Duration::days(settings.tendering_period_days));
    }
    let auction_start = tender.tender_period.end_date;
    for lot in tender.lots.iter_mut().filter(|l| l.is_active()) {
        lot.auction_period
            .get_or_insert_with(Period::default)
            .start_date = auction_start;
    }
    tender.set_status(TenderStatus::ActiveTendering, now);
}

fn open_standstill(tender: &mut Tender, settings: &Settings, now: DateTime<Utc>) -> TenderResult<()> {
    let undecided = tender
        .qualifications
        .iter()
        .any(|q| q.status == QualificationStatus::Pending);
    if undecided {
        return Err(TenderError::forbidden(
            "Can't switch to 'active.pre-qualification.stand-still' while not all qualifications are qualified"
                .to_string(),
        ));
    }
    tender.qualification_period.end_date =
        Some(now + Duration::days(settings.standstill_period_days));
    tender.set_status(TenderStatus::ActivePreQualificationStandStill, now);
    Ok(())
}

/// Currency and VAT changes must arrive consistently on value and
/// minimalStep, then cascade onto every lot. Amounts are derived from the lot
/// set and reject direct writes while lots exist.
fn apply_value_patches(tender: &mut Tender, req: &UpdateTenderRequest) -> TenderResult<()> {
    if tender.has_lots() {
        if req.value.as_ref().is_some_and(|v| v.amount.is_some()) {
            return Err(TenderError::validation(
                "value",
                "Can't update value: amount is calculated from lots",
            ));
        }
        if req
            .minimal_step
            .as_ref()
            .is_some_and(|v| v.amount.is_some())
        {
            return Err(TenderError::validation(
                "minimalStep",
                "Can't update minimalStep: amount is calculated from lots",
            ));
        }
        if req.guarantee.as_ref().is_some_and(|g| g.amount.is_some()) {
            return Err(TenderError::validation(
                "guarantee",
                "Can't update guarantee: amount is calculated from lots",
            ));
        }
    }

    let new_currency = req
        .value
        .as_ref()
        .and_then(|v| v.currency.clone())
        .unwrap_or_else(|| tender.value.currency.clone());
    let step_currency = req
        .minimal_step
        .as_ref()
        .and_then(|v| v.currency.clone())
        .unwrap_or_else(|| tender.minimal_step.currency.clone());
    if new_currency != step_currency {
        return Err(TenderError::validation(
            "minimalStep",
            "currency should be identical to currency of value of tender",
        ));
    }
    let new_vat = req
        .value
        .as_ref()
        .and_then(|v| v.value_added_tax_included)
        .unwrap_or(tender.value.value_added_tax_included);

    if let Some(v) = &req.value {
        if let Some(amount) = v.amount {
            tender.value.amount = amount;
        }
    }
    if let Some(v) = &req.minimal_step {
        if let Some(amount) = v.amount {
            tender.minimal_step.amount = amount;
        }
    }
    tender.value.currency = new_currency.clone();
    tender.value.value_added_tax_included = new_vat;
    tender.minimal_step.currency = new_currency.clone();
    tender.minimal_step.value_added_tax_included = new_vat;

    for lot in &mut tender.lots {
        lot.value.currency = new_currency.clone();
        lot.value.value_added_tax_included = new_vat;
        lot.minimal_step.currency = new_currency.clone();
        lot.minimal_step.value_added_tax_included = new_vat;
    }
    Ok(())
}

fn build_items(requests: Vec<ItemRequest>, lots: &[Lot]) -> TenderResult<Vec<Item>> {
    let mut items = Vec::with_capacity(requests.len());
    for req in requests {
        if let Some(related_lot) = &req.related_lot {
            if !lots.iter().any(|l| &l.id == related_lot) {
                return Err(TenderError::validation(
                    "items",
                    "relatedLot should be one of lots",
                ));
            }
        }
        items.push(Item {
            id: req.id.unwrap_or_else(new_id),
            description: req.description,
            related_lot: req.related_lot,
        });
    }
    Ok(items)
}

/// Feature weights are capped individually and as a per-lot sum, so the
/// auction discount can never exceed 30%.
fn validate_features(features: &[Feature], items: &[Item], lots: &[Lot]) -> TenderResult<()> {
    for feature in features {
        for choice in &feature.choices {
            if choice.value > feature_limit() {
                return Err(TenderError::validation(
                    "features",
                    "Float value should be less than 0.3.",
                ));
            }
        }
        match feature.feature_of {
            FeatureOf::Item => {
                let ok = feature
                    .related_item
                    .as_ref()
                    .is_some_and(|ri| items.iter().any(|i| &i.id == ri));
                if !ok {
                    return Err(TenderError::validation(
                        "features",
                        "relatedItem should be one of items",
                    ));
                }
            }
            FeatureOf::Lot => {
                let ok = feature
                    .related_item
                    .as_ref()
                    .is_some_and(|ri| lots.iter().any(|l| &l.id == ri));
                if !ok {
                    return Err(TenderError::validation(
                        "features",
                        "relatedItem should be one of lots",
                    ));
                }
            }
            FeatureOf::Tenderer => {}
        }
    }

    if lots.is_empty() {
        let total: Decimal = features.iter().map(max_choice).sum();
        if total > feature_limit() {
            return Err(TenderError::validation(
                "features",
                "Sum of max value of all features should be less then or equal to 30%",
            ));
        }
        return Ok(());
    }
    for lot in lots {
        let total: Decimal = features
            .iter()
            .filter(|f| applies_to_lot(f, items, &lot.id))
            .map(max_choice)
            .sum();
        if total > feature_limit() {
            return Err(TenderError::validation(
                "features",
                "Sum of max value of all features for lot should be less then or equal to 30%",
            ));
        }
    }
    Ok(())
}

fn max_choice(feature: &Feature) -> Decimal {
    feature
        .choices
        .iter()
        .map(|c| c.value)
        .max()
        .unwrap_or_default()
}

pub(crate) fn applies_to_lot(feature: &Feature, items: &[Item], lot_id: &str) -> bool {
    match feature.feature_of {
        FeatureOf::Tenderer => true,
        FeatureOf::Lot => feature.related_item.as_deref() == Some(lot_id),
        FeatureOf::Item => feature.related_item.as_deref().is_some_and(|ri| {
            items
                .iter()
                .any(|i| i.id == ri && i.related_lot.as_deref() == Some(lot_id))
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::tender::FeatureChoice;
    use crate::domain::value::ValuePatch;
    use crate::ops::lots::create_lot;
    use crate::ops::testutil::{amount, lot_request, now, tender, value_patch};
    use crate::rollup;

    fn feature(code: &str, of: FeatureOf, related: Option<&str>, max: Decimal) -> Feature {
        Feature {
            code: code.to_string(),
            feature_of: of,
            related_item: related.map(str::to_string),
            title: code.to_string(),
            choices: vec![
                FeatureChoice {
                    value: Decimal::ZERO,
                    title: "none".to_string(),
                },
                FeatureChoice {
                    value: max,
                    title: "max".to_string(),
                },
            ],
        }
    }

    #[test]
    fn create_defaults_currency_and_vat() {
        let t = tender();
        assert_eq!(t.value.currency, "UAH");
        assert!(t.value.value_added_tax_included);
        assert_eq!(t.minimal_step.currency, "UAH");
    }

    #[test]
    fn create_requires_step_below_value() {
        let err = create_tender(
            CreateTenderRequest {
                title: Some("t".to_string()),
                value: Some(value_patch(100)),
                minimal_step: Some(value_patch(100)),
                ..Default::default()
            },
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "value should be less than value of tender"
        );
    }

    #[test]
    fn currency_patch_requires_matching_step_currency() {
        let mut t = tender();
        create_lot(&mut t, lot_request(500, 100), now()).unwrap();

        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                value: Some(ValuePatch {
                    currency: Some("GBP".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(
            err.to_response().description,
            "currency should be identical to currency of value of tender"
        );
        assert_eq!(t.lots[0].value.currency, "UAH");
    }

    #[test]
    fn currency_patch_cascades_to_lots() {
        let mut t = tender();
        create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        create_lot(&mut t, lot_request(300, 30), now()).unwrap();

        patch_tender(
            &mut t,
            UpdateTenderRequest {
                value: Some(ValuePatch {
                    currency: Some("GBP".to_string()),
                    value_added_tax_included: Some(false),
                    ..Default::default()
                }),
                minimal_step: Some(ValuePatch {
                    currency: Some("GBP".to_string()),
                    ..Default::default()
                }),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap();
        for lot in &t.lots {
            assert_eq!(lot.value.currency, "GBP");
            assert_eq!(lot.minimal_step.currency, "GBP");
            assert!(!lot.value.value_added_tax_included);
        }
    }

    #[test]
    fn guarantee_currency_cascades_to_lot_guarantees() {
        let mut t = tender();
        t.guarantee = Some(Guarantee {
            amount: amount(100),
            currency: "UAH".to_string(),
        });
        let mut req = lot_request(500, 100);
        req.guarantee = Some(crate::ops::testutil::guarantee_patch(20, "UAH"));
        create_lot(&mut t, req, now()).unwrap();

        patch_tender(
            &mut t,
            UpdateTenderRequest {
                guarantee: Some(crate::domain::value::GuaranteePatch {
                    amount: None,
                    currency: Some("EUR".to_string()),
                }),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap();
        assert_eq!(t.guarantee.as_ref().unwrap().currency, "EUR");
        assert_eq!(t.lots[0].guarantee.as_ref().unwrap().currency, "EUR");
        let rolled = rollup::tender_guarantee(&t).unwrap();
        assert_eq!(rolled.amount, amount(120));
        assert_eq!(rolled.currency, "EUR");
    }

    #[test]
    fn derived_amounts_reject_direct_writes_while_lots_exist() {
        let mut t = tender();
        create_lot(&mut t, lot_request(500, 100), now()).unwrap();

        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                value: Some(value_patch(900)),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.status_code(), 422);
        assert_eq!(
            err.to_response().description,
            "Can't update value: amount is calculated from lots"
        );

        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                guarantee: Some(crate::domain::value::GuaranteePatch {
                    amount: Some(amount(50)),
                    currency: None,
                }),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Can't update guarantee: amount is calculated from lots"
        );

        // Without lots the direct fields stay writable.
        t.lots.clear();
        patch_tender(
            &mut t,
            UpdateTenderRequest {
                value: Some(value_patch(900)),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap();
        assert_eq!(t.value.amount, amount(900));
    }

    #[test]
    fn direct_status_change_rejected() {
        let mut t = tender();
        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                status: Some(TenderStatus::Complete),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(err.to_response().description, "Can't update tender status");
    }

    #[test]
    fn draft_activation_allowed() {
        let mut t = create_tender(
            CreateTenderRequest {
                title: Some("t".to_string()),
                value: Some(value_patch(1000)),
                minimal_step: Some(value_patch(10)),
                ..Default::default()
            },
            now(),
        )
        .unwrap();
        patch_tender(
            &mut t,
            UpdateTenderRequest {
                status: Some(TenderStatus::ActiveTendering),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap();
        assert_eq!(t.status, TenderStatus::ActiveTendering);
    }

    #[test]
    fn feature_value_capped() {
        let mut t = tender();
        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                features: Some(vec![feature(
                    "OCDS-123454-AIR-INTAKE",
                    FeatureOf::Tenderer,
                    None,
                    Decimal::new(4, 1),
                )]),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Float value should be less than 0.3."
        );
    }

    #[test]
    fn feature_sum_per_lot_capped() {
        let mut t = tender();
        let lot = create_lot(&mut t, lot_request(500, 100), now()).unwrap();
        let features = vec![
            feature("F1", FeatureOf::Tenderer, None, Decimal::new(2, 1)),
            feature("F2", FeatureOf::Lot, Some(&lot.id), Decimal::new(2, 1)),
        ];
        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                features: Some(features),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "Sum of max value of all features for lot should be less then or equal to 30%"
        );

        // Weights on distinct lots do not sum together.
        let other = create_lot(&mut t, lot_request(300, 30), now()).unwrap();
        let split = vec![
            feature("F1", FeatureOf::Lot, Some(&lot.id), Decimal::new(2, 1)),
            feature("F2", FeatureOf::Lot, Some(&other.id), Decimal::new(2, 1)),
        ];
        patch_tender(
            &mut t,
            UpdateTenderRequest {
                features: Some(split),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap();
        assert_eq!(t.features.len(), 2);
    }

    #[test]
    fn item_related_lot_must_exist() {
        let mut t = tender();
        let err = patch_tender(
            &mut t,
            UpdateTenderRequest {
                items: Some(vec![ItemRequest {
                    related_lot: Some("missing".to_string()),
                    ..Default::default()
                }]),
                ..Default::default()
            },
            &Settings::default(),
            now(),
        )
        .unwrap_err();
        assert_eq!(
            err.to_response().description,
            "relatedLot should be one of lots"
        );
    }
}
