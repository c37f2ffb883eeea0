// Copyright (c) 2025 Soumyadip Sarkar.
// All rights reserved.
//
// This source code is licensed under the license found in the
// LICENSE file in the root directory of this source tree.

//! Income splits and budget allocation arithmetic.
//!
//! All amounts are whole currency units (i64). There are two rounding
//! policies in here and they are deliberately kept apart:
//! [`allocate_by_percentages`] pushes the whole rounding residue onto the
//! first category, so the allocation sums exactly to its input;
//! [`distribute_proportionally`] rounds each share on its own, so its total
//! may drift by a unit or two. Do not merge them.

use std::collections::BTreeMap;

use crate::models::{BudgetStatus, Parameters};

pub const WARNING_THRESHOLD: f64 = 75.0;
pub const CRITICAL_THRESHOLD: f64 = 90.0;
pub const BLOCK_THRESHOLD: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IncomeSplit {
    pub tithing: i64,
    pub saving: i64,
    /// What is left after the mandatory deductions. Always computed by
    /// subtraction so the three parts sum exactly to the income.
    pub spendable: i64,
}

fn floor_percent(amount: i64, percent: i64) -> i64 {
    // Non-negative operands, so integer division is the floor.
    amount * percent / 100
}

/// Split a primary income into tithing / saving / spendable.
pub fn split_main_income(amount: i64, params: &Parameters) -> IncomeSplit {
    let tithing = floor_percent(amount, params.tithing_percent);
    let saving = floor_percent(amount, params.main_saving_percent);
    IncomeSplit {
        tithing,
        saving,
        spendable: amount - tithing - saving,
    }
}

/// Split an occasional income. Same tithing computation, its own saving
/// percentage; the spendable part is later spread over existing budgets
/// rather than re-allocated from the percentage table.
pub fn split_extra_income(amount: i64, params: &Parameters) -> IncomeSplit {
    let tithing = floor_percent(amount, params.tithing_percent);
    let saving = floor_percent(amount, params.extra_saving_percent);
    IncomeSplit {
        tithing,
        saving,
        spendable: amount - tithing - saving,
    }
}

/// Allocate `total` across categories by integer percentage.
///
/// Each share is floored; whatever the flooring lost is added to the first
/// category in ascending id order, so the result always sums to `total`.
/// The rounding bias toward that category is accepted, not corrected.
/// An empty percentage map yields an empty allocation.
pub fn allocate_by_percentages(
    total: i64,
    percentages: &BTreeMap<i64, i64>,
) -> BTreeMap<i64, i64> {
    let mut allocation = BTreeMap::new();
    for (&category_id, &percentage) in percentages {
        allocation.insert(category_id, floor_percent(total, percentage));
    }
    if allocation.is_empty() {
        return allocation;
    }

    let allocated: i64 = allocation.values().sum();
    if allocated != total {
        let difference = total - allocated;
        let first = *allocation.keys().next().unwrap();
        *allocation.get_mut(&first).unwrap() += difference;
    }
    allocation
}

/// Spread `available` over existing budgets in proportion to their current
/// allocated amounts. Each share is rounded independently; this is the
/// second rounding policy and its total is allowed to differ from
/// `available` by rounding.
pub fn distribute_proportionally(available: i64, budgets: &[(i64, i64)]) -> Vec<(i64, i64)> {
    let total_allocated: i64 = budgets.iter().map(|(_, allocated)| allocated).sum();
    if total_allocated <= 0 {
        return Vec::new();
    }
    budgets
        .iter()
        .map(|&(id, allocated)| {
            let share = allocated as f64 / total_allocated as f64;
            (id, (available as f64 * share).round() as i64)
        })
        .collect()
}

/// Percentage of a budget consumed, one decimal, clamped at 100.
pub fn budget_usage(allocated: i64, spent: i64) -> f64 {
    if allocated <= 0 {
        return 0.0;
    }
    let pct = (spent as f64 * 100.0 / allocated as f64 * 10.0).round() / 10.0;
    pct.min(100.0)
}

pub fn budget_status(percentage: f64) -> BudgetStatus {
    if percentage >= BLOCK_THRESHOLD {
        BudgetStatus::Over
    } else if percentage >= CRITICAL_THRESHOLD {
        BudgetStatus::Critical
    } else if percentage >= WARNING_THRESHOLD {
        BudgetStatus::Warning
    } else {
        BudgetStatus::Normal
    }
}

/// Least-squares slope of a series, normalized by its mean. Zero for short
/// series or a non-positive mean.
pub fn linear_trend(values: &[i64]) -> f64 {
    let n = values.len();
    if n < 2 {
        return 0.0;
    }
    let nf = n as f64;
    let mut sum_x = 0.0;
    let mut sum_y = 0.0;
    let mut sum_xy = 0.0;
    let mut sum_x2 = 0.0;
    for (i, &v) in values.iter().enumerate() {
        let x = i as f64;
        let y = v as f64;
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_x2 += x * x;
    }
    let slope = (nf * sum_xy - sum_x * sum_y) / (nf * sum_x2 - sum_x * sum_x);
    let mean = sum_y / nf;
    if mean > 0.0 { slope / mean } else { 0.0 }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(tithing: i64, main_saving: i64, extra_saving: i64) -> Parameters {
        Parameters {
            id: 1,
            default_income: 120000,
            currency: "FC".into(),
            tithing_percent: tithing,
            main_saving_percent: main_saving,
            extra_saving_percent: extra_saving,
            is_active: true,
        }
    }

    #[test]
    fn main_split_is_exact() {
        let p = params(10, 20, 50);
        let s = split_main_income(100000, &p);
        assert_eq!(s.tithing, 10000);
        assert_eq!(s.saving, 20000);
        assert_eq!(s.spendable, 70000);
        assert_eq!(s.tithing + s.saving + s.spendable, 100000);
    }

    #[test]
    fn spendable_absorbs_flooring() {
        // 33 and 33 percent of 101 both floor; spendable picks up the rest.
        let p = params(33, 33, 0);
        let s = split_main_income(101, &p);
        assert_eq!(s.tithing, 33);
        assert_eq!(s.saving, 33);
        assert_eq!(s.spendable, 35);
    }

    #[test]
    fn extra_split_uses_extra_saving_percent() {
        let p = params(10, 20, 50);
        let s = split_extra_income(10000, &p);
        assert_eq!(s.tithing, 1000);
        assert_eq!(s.saving, 5000);
        assert_eq!(s.spendable, 4000);
    }

    #[test]
    fn allocation_sums_to_total() {
        let pcts = BTreeMap::from([(1, 40), (2, 30), (3, 30)]);
        let alloc = allocate_by_percentages(70000, &pcts);
        assert_eq!(alloc[&1], 28000);
        assert_eq!(alloc[&2], 21000);
        assert_eq!(alloc[&3], 21000);
        assert_eq!(alloc.values().sum::<i64>(), 70000);
    }

    #[test]
    fn allocation_residue_goes_to_first_category() {
        // 33/33/34 of 100: floors are 33/33/34, exact. Use 1000/3-way split
        // with an awkward total instead.
        let pcts = BTreeMap::from([(1, 33), (2, 33), (3, 34)]);
        let alloc = allocate_by_percentages(101, &pcts);
        assert_eq!(alloc.values().sum::<i64>(), 101);
        // floors: 33, 33, 34 => 100; the missing unit lands on category 1
        assert_eq!(alloc[&1], 34);
        assert_eq!(alloc[&2], 33);
        assert_eq!(alloc[&3], 34);
    }

    #[test]
    fn allocation_empty_map_is_empty() {
        let alloc = allocate_by_percentages(5000, &BTreeMap::new());
        assert!(alloc.is_empty());
    }

    #[test]
    fn proportional_rounds_each_share() {
        let budgets = vec![(1, 28000), (2, 21000), (3, 21000)];
        let extra = distribute_proportionally(2000, &budgets);
        assert_eq!(extra, vec![(1, 800), (2, 600), (3, 600)]);
        // A total that does not divide evenly: shares round on their own.
        let extra = distribute_proportionally(100, &[(1, 1), (2, 1), (3, 1)]);
        assert_eq!(extra, vec![(1, 33), (2, 33), (3, 33)]);
    }

    #[test]
    fn proportional_with_no_allocation_is_empty() {
        assert!(distribute_proportionally(1000, &[]).is_empty());
        assert!(distribute_proportionally(1000, &[(1, 0)]).is_empty());
    }

    #[test]
    fn usage_clamps_at_hundred() {
        assert_eq!(budget_usage(1000, 2000), 100.0);
        assert_eq!(budget_usage(1000, 500), 50.0);
        assert_eq!(budget_usage(0, 500), 0.0);
        assert_eq!(budget_usage(3000, 1000), 33.3);
    }

    #[test]
    fn status_bands() {
        assert_eq!(budget_status(74.9), BudgetStatus::Normal);
        assert_eq!(budget_status(75.0), BudgetStatus::Warning);
        assert_eq!(budget_status(90.0), BudgetStatus::Critical);
        assert_eq!(budget_status(100.0), BudgetStatus::Over);
    }

    #[test]
    fn trend_detects_increase() {
        assert!(linear_trend(&[100, 120, 140]) > 0.1);
        assert!(linear_trend(&[100, 100, 100]).abs() < f64::EPSILON);
        assert_eq!(linear_trend(&[100]), 0.0);
        assert_eq!(linear_trend(&[0, 0]), 0.0);
    }
}
