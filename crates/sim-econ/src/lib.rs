#![deny(warnings)]

//! Economic models: recurring production and accrual helpers for
//! Hearthvale.
//!
//! This module provides validated utilities for:
//! - Per-node production rates by kind and element
//! - Tick-count-scalable accrual (`rate × ticks` arithmetic)
//! - Festival production multipliers
//! - Town recovery (healing) rates
//!
//! Accrual is plain arithmetic on the whole tick count of a catch-up
//! burst; only the timer table is advanced tick by tick. That asymmetry
//! belongs to the orchestrator and is deliberate.

use rust_decimal::Decimal;
use sim_core::{CurrencyKind, CurrencyLedger, Element, Festival, NodeKind, ProductionEntry};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors produced by economic helpers.
#[derive(Debug, Error, PartialEq)]
pub enum EconError {
    /// Multipliers must be non-negative.
    #[error("negative multiplier is invalid")]
    NegativeMultiplier,
    /// Amounts fed into the helpers must be non-negative.
    #[error("negative amount is invalid")]
    NegativeAmount,
}

/// Recurring production granted by claiming a node of this kind and
/// element. Empty nodes produce nothing.
pub fn production_rates(kind: NodeKind, element: Element) -> Vec<ProductionEntry> {
    let entry = |currency, units: i64| ProductionEntry {
        currency,
        per_tick: Decimal::new(units, 0),
    };
    let mut rates = match kind {
        NodeKind::Town => vec![entry(CurrencyKind::Gold, 1)],
        NodeKind::Village => vec![entry(CurrencyKind::Gold, 2), entry(CurrencyKind::Lumber, 1)],
        NodeKind::Cave => vec![entry(CurrencyKind::Stone, 2), entry(CurrencyKind::Gold, 1)],
        NodeKind::Dungeon => vec![entry(CurrencyKind::Gold, 3), entry(CurrencyKind::Mana, 1)],
        NodeKind::Castle => vec![entry(CurrencyKind::Gold, 5), entry(CurrencyKind::Mana, 2)],
        NodeKind::Empty => vec![],
    };
    if kind != NodeKind::Empty {
        match element {
            Element::Neutral => {}
            Element::Forest => rates.push(entry(CurrencyKind::Lumber, 1)),
            Element::Stone => rates.push(entry(CurrencyKind::Stone, 1)),
            Element::Arcane => rates.push(entry(CurrencyKind::Mana, 1)),
        }
    }
    rates
}

/// Accrue a per-tick rate over a whole burst of ticks.
pub fn accrue(per_tick: Decimal, ticks: u64) -> Decimal {
    per_tick * Decimal::from(ticks)
}

/// Scale an amount by a multiplier, rejecting negative inputs.
pub fn apply_multiplier(amount: Decimal, multiplier: Decimal) -> Result<Decimal, EconError> {
    if amount < Decimal::ZERO {
        return Err(EconError::NegativeAmount);
    }
    if multiplier < Decimal::ZERO {
        return Err(EconError::NegativeMultiplier);
    }
    Ok(amount * multiplier)
}

/// Product of the production multipliers of the given (active) festivals;
/// `1` when none are running. Negative multipliers from bad content are
/// clamped to zero here so accrual can never debit the ledger.
pub fn festival_production_multiplier<'a>(
    active: impl Iterator<Item = &'a Festival>,
) -> Decimal {
    let mut product = Decimal::ONE;
    for festival in active {
        product *= festival.production_multiplier.max(Decimal::ZERO);
    }
    product
}

/// Income produced over `ticks` by every production entry in the ledger,
/// scaled by the festival multiplier and summed per currency.
pub fn tick_income(
    ledger: &CurrencyLedger,
    multiplier: Decimal,
    ticks: u64,
) -> Result<BTreeMap<CurrencyKind, Decimal>, EconError> {
    let mut income = BTreeMap::new();
    for entry in ledger.production.values().flatten() {
        let amount = apply_multiplier(accrue(entry.per_tick, ticks), multiplier)?;
        *income.entry(entry.currency).or_insert(Decimal::ZERO) += amount;
    }
    Ok(income)
}

/// Hit points restored per tick while resting in town; the Inn level
/// sweetens the base rate.
pub fn heal_per_tick(inn_level: u8) -> u32 {
    1 + u32::from(inn_level)
}

/// Healing accumulated over a burst, saturating at `u32::MAX`.
pub fn heal_over(inn_level: u8, ticks: u64) -> u32 {
    u64::from(heal_per_tick(inn_level))
        .saturating_mul(ticks)
        .min(u64::from(u32::MAX)) as u32
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use sim_core::Coord;

    #[test]
    fn empty_nodes_produce_nothing() {
        assert!(production_rates(NodeKind::Empty, Element::Arcane).is_empty());
    }

    #[test]
    fn element_adds_a_rate_entry() {
        let neutral = production_rates(NodeKind::Cave, Element::Neutral);
        let arcane = production_rates(NodeKind::Cave, Element::Arcane);
        assert_eq!(arcane.len(), neutral.len() + 1);
        assert!(arcane.iter().any(|e| e.currency == CurrencyKind::Mana));
    }

    #[test]
    fn accrue_is_plain_multiplication() {
        assert_eq!(accrue(Decimal::new(25, 1), 4), Decimal::new(100, 1));
        assert_eq!(accrue(Decimal::ONE, 0), Decimal::ZERO);
    }

    #[test]
    fn negative_multiplier_is_rejected() {
        assert_eq!(
            apply_multiplier(Decimal::ONE, Decimal::new(-1, 0)),
            Err(EconError::NegativeMultiplier)
        );
    }

    #[test]
    fn tick_income_sums_per_currency() {
        let mut ledger = CurrencyLedger::default();
        ledger.grant_production(
            Coord::new(1, 1),
            production_rates(NodeKind::Village, Element::Neutral),
        );
        ledger.grant_production(
            Coord::new(2, 2),
            production_rates(NodeKind::Castle, Element::Neutral),
        );
        let income = tick_income(&ledger, Decimal::ONE, 10).unwrap();
        // Village gold 2 + castle gold 5, over 10 ticks.
        assert_eq!(income[&CurrencyKind::Gold], Decimal::new(70, 0));
        assert_eq!(income[&CurrencyKind::Lumber], Decimal::new(10, 0));
        assert_eq!(income[&CurrencyKind::Mana], Decimal::new(20, 0));
    }

    #[test]
    fn festival_multiplier_scales_income() {
        let mut ledger = CurrencyLedger::default();
        ledger.grant_production(
            Coord::new(1, 1),
            production_rates(NodeKind::Village, Element::Neutral),
        );
        let income = tick_income(&ledger, Decimal::new(2, 0), 5).unwrap();
        assert_eq!(income[&CurrencyKind::Gold], Decimal::new(20, 0));
    }

    #[test]
    fn heal_rate_grows_with_inn_level() {
        assert_eq!(heal_per_tick(0), 1);
        assert!(heal_per_tick(3) > heal_per_tick(1));
        assert_eq!(heal_over(1, 10), 20);
    }

    proptest! {
        #[test]
        fn accrue_is_monotonic_in_ticks(units in 0i64..10_000, ticks in 0u64..10_000) {
            let rate = Decimal::new(units, 2);
            prop_assert!(accrue(rate, ticks + 1) >= accrue(rate, ticks));
        }

        #[test]
        fn split_accrual_equals_whole(units in 0i64..10_000, a in 0u64..5_000, b in 0u64..5_000) {
            let rate = Decimal::new(units, 2);
            prop_assert_eq!(accrue(rate, a) + accrue(rate, b), accrue(rate, a + b));
        }
    }
}
