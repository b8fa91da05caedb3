use anyhow::{bail, ensure};
use clap::ValueEnum;
use tracing::debug;

use crate::{Dollar, Fraction};

/// Unit a caller used to express a fund's target allocation.
///
/// CSV files carry raw fractions (`0.6`) while hand-entered values are usually
/// percentages (`60`). Everything is normalized to a fraction before it reaches
/// a [`PortfolioLine`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum TargetUnit {
    #[default]
    Fraction,
    Percent,
}

impl TargetUnit {
    pub fn to_fraction(self, value: f64) -> Fraction {
        match self {
            TargetUnit::Fraction => value,
            TargetUnit::Percent => value / 100.0,
        }
    }
}

/// One fund position.
#[derive(Clone, Debug, PartialEq)]
pub struct PortfolioLine {
    pub fund: String,
    pub balance: Dollar,
    pub target: Fraction,
}

impl PortfolioLine {
    pub fn new(fund: impl Into<String>, balance: Dollar, target: Fraction) -> Self {
        Self {
            fund: fund.into(),
            balance,
            target,
        }
    }

    /// Builds a line from hand-entered values, converting `target` from `unit`.
    pub fn from_entry(
        fund: &str,
        balance: Dollar,
        target: f64,
        unit: TargetUnit,
    ) -> anyhow::Result<Self> {
        let fund = fund.trim();
        if fund.is_empty() {
            bail!("Fund name cannot be empty");
        }
        ensure!(balance.is_finite(), "Balance for '{fund}' is not a number");
        ensure!(target.is_finite(), "Target for '{fund}' is not a number");
        Ok(Self::new(fund, balance, unit.to_fraction(target)))
    }
}

/// Ordered set of fund positions.
///
/// Edits never happen in place: every `with_*`/`without_*` call returns a new
/// portfolio and leaves the receiver untouched. Duplicate fund names are kept
/// as distinct lines.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Portfolio {
    lines: Vec<PortfolioLine>,
}

impl Portfolio {
    pub fn new(lines: Vec<PortfolioLine>) -> Self {
        Self { lines }
    }

    pub fn lines(&self) -> &[PortfolioLine] {
        &self.lines
    }

    pub fn iter(&self) -> std::slice::Iter<'_, PortfolioLine> {
        self.lines.iter()
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn total_balance(&self) -> Dollar {
        self.lines.iter().map(|line| line.balance).sum()
    }

    pub fn target_sum(&self) -> Fraction {
        self.lines.iter().map(|line| line.target).sum()
    }

    pub fn with_line(&self, line: PortfolioLine) -> Self {
        debug!(?line, "adding line");
        self.lines.iter().cloned().chain(Some(line)).collect()
    }

    /// Out-of-range indices yield an unchanged copy.
    pub fn without_line(&self, index: usize) -> Self {
        self.lines
            .iter()
            .enumerate()
            .filter(|&(i, _)| i != index)
            .map(|(_, line)| line.clone())
            .collect()
    }

    /// Out-of-range indices yield an unchanged copy.
    pub fn with_updated_line(&self, index: usize, line: PortfolioLine) -> Self {
        self.lines
            .iter()
            .enumerate()
            .map(|(i, existing)| match i == index {
                true => line.clone(),
                false => existing.clone(),
            })
            .collect()
    }
}

impl FromIterator<PortfolioLine> for Portfolio {
    fn from_iter<I: IntoIterator<Item = PortfolioLine>>(iter: I) -> Self {
        Self {
            lines: iter.into_iter().collect(),
        }
    }
}

impl From<Vec<PortfolioLine>> for Portfolio {
    fn from(lines: Vec<PortfolioLine>) -> Self {
        Self::new(lines)
    }
}

impl<'a> IntoIterator for &'a Portfolio {
    type Item = &'a PortfolioLine;
    type IntoIter = std::slice::Iter<'a, PortfolioLine>;

    fn into_iter(self) -> Self::IntoIter {
        self.lines.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Portfolio {
        Portfolio::new(vec![
            PortfolioLine::new("A", 250.0, 0.5),
            PortfolioLine::new("B", 100.0, 0.2),
            PortfolioLine::new("C", 200.0, 0.3),
        ])
    }

    #[test]
    fn test_totals() {
        let portfolio = sample();
        assert_eq!(portfolio.total_balance(), 550.0);
        assert!((portfolio.target_sum() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_with_line_appends_and_leaves_original() {
        let portfolio = sample();
        let added = portfolio.with_line(PortfolioLine::new("D", 10.0, 0.0));
        assert_eq!(portfolio.len(), 3);
        assert_eq!(added.len(), 4);
        assert_eq!(added.lines()[3].fund, "D");
    }

    #[test]
    fn test_without_line() {
        let portfolio = sample();
        let removed = portfolio.without_line(1);
        let funds: Vec<_> = removed.iter().map(|l| l.fund.as_str()).collect();
        assert_eq!(funds, ["A", "C"]);
        assert_eq!(portfolio.without_line(10), portfolio);
    }

    #[test]
    fn test_with_updated_line() {
        let portfolio = sample();
        let updated = portfolio.with_updated_line(2, PortfolioLine::new("C", 300.0, 0.3));
        assert_eq!(updated.lines()[2].balance, 300.0);
        assert_eq!(portfolio.lines()[2].balance, 200.0);
    }

    #[test]
    fn test_duplicate_funds_are_distinct_lines() {
        let portfolio = sample().with_line(PortfolioLine::new("A", 5.0, 0.0));
        assert_eq!(portfolio.iter().filter(|l| l.fund == "A").count(), 2);
    }

    #[test]
    fn test_from_entry_converts_percent() {
        let line = PortfolioLine::from_entry(" VTI ", 1000.0, 60.0, TargetUnit::Percent).unwrap();
        assert_eq!(line, PortfolioLine::new("VTI", 1000.0, 0.6));
        let line = PortfolioLine::from_entry("VTI", 1000.0, 0.6, TargetUnit::Fraction).unwrap();
        assert_eq!(line.target, 0.6);
    }

    #[test]
    fn test_from_entry_rejects_bad_input() {
        assert!(PortfolioLine::from_entry("  ", 1.0, 1.0, TargetUnit::Percent).is_err());
        assert!(PortfolioLine::from_entry("X", f64::NAN, 1.0, TargetUnit::Percent).is_err());
        assert!(PortfolioLine::from_entry("X", 1.0, f64::INFINITY, TargetUnit::Percent).is_err());
    }
}
