use std::fmt;

use tracing::debug;

use crate::{Dollar, Percent, policy::Policy, portfolio::Portfolio};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Weighting {
    Balanced,
    Overweight,
    Underweight,
}

impl Weighting {
    /// `band` is in percentage points; drift exactly on the band is balanced.
    pub fn classify(difference_pct: Percent, band: Percent) -> Self {
        match difference_pct {
            d if d > band => Weighting::Overweight,
            d if d < -band => Weighting::Underweight,
            _ => Weighting::Balanced,
        }
    }
}

impl fmt::Display for Weighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            Weighting::Balanced => "balanced",
            Weighting::Overweight => "overweight",
            Weighting::Underweight => "underweight",
        };
        f.write_str(label)
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct DerivedLine {
    pub fund: String,
    pub balance: Dollar,
    pub current_allocation_pct: Percent,
    pub target_allocation_pct: Percent,
    /// Drift: current minus target.
    pub difference_pct: Percent,
    pub weighting: Weighting,
}

/// Current allocation and drift per line, in input order.
///
/// A portfolio whose balances sum to zero has no meaningful current
/// allocation; every line then reports 0% instead of NaN.
pub fn metrics(portfolio: &Portfolio, policy: &Policy) -> Vec<DerivedLine> {
    let total = portfolio.total_balance();
    if total == 0.0 {
        debug!("total balance is zero, reporting 0% current allocation");
    }
    portfolio
        .iter()
        .map(|line| {
            let current_allocation_pct = match total == 0.0 {
                true => 0.0,
                false => line.balance / total * 100.0,
            };
            let target_allocation_pct = line.target * 100.0;
            let difference_pct = current_allocation_pct - target_allocation_pct;
            DerivedLine {
                fund: line.fund.clone(),
                balance: line.balance,
                current_allocation_pct,
                target_allocation_pct,
                difference_pct,
                weighting: Weighting::classify(difference_pct, policy.balanced_band),
            }
        })
        .collect()
}

/// Most overweight first. Ties keep their input order.
pub fn ranked_by_drift(lines: &[DerivedLine]) -> Vec<DerivedLine> {
    let mut ranked = lines.to_vec();
    ranked.sort_by(|a, b| b.difference_pct.total_cmp(&a.difference_pct));
    ranked
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WeightingCounts {
    pub balanced: usize,
    pub overweight: usize,
    pub underweight: usize,
}

pub fn partition(lines: &[DerivedLine]) -> WeightingCounts {
    lines
        .iter()
        .fold(WeightingCounts::default(), |mut counts, line| {
            match line.weighting {
                Weighting::Balanced => counts.balanced += 1,
                Weighting::Overweight => counts.overweight += 1,
                Weighting::Underweight => counts.underweight += 1,
            }
            counts
        })
}
