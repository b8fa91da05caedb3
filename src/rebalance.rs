use derive_more::{Add, Sum};
use tracing::debug;

use crate::{
    Action, Dollar, Fraction,
    error::RebalanceError,
    policy::Policy,
    portfolio::{Portfolio, PortfolioLine},
    validate::validate,
};

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RebalanceRequest {
    pub contribution: Dollar,
    pub allow_selling: bool,
}

impl RebalanceRequest {
    pub fn new(contribution: Dollar, allow_selling: bool) -> Self {
        Self {
            contribution,
            allow_selling,
        }
    }

    /// Reads a contribution typed by a user. Text that is not a number is an
    /// [`RebalanceError::InvalidContribution`], same as zero or a negative amount.
    pub fn parse(contribution: &str, allow_selling: bool) -> Result<Self, RebalanceError> {
        let trimmed = contribution.trim();
        let value = trimmed
            .strip_prefix('$')
            .unwrap_or(trimmed)
            .parse::<Dollar>()
            .map_err(|_| RebalanceError::InvalidContribution {
                contribution: contribution.to_string(),
            })?;
        let request = Self::new(value, allow_selling);
        request.check()?;
        Ok(request)
    }

    fn check(&self) -> Result<(), RebalanceError> {
        if !self.contribution.is_finite() || self.contribution <= 0.0 {
            return Err(RebalanceError::invalid_contribution(self.contribution));
        }
        Ok(())
    }
}

/// How one fund should absorb the contribution.
#[derive(Clone, Debug, PartialEq)]
pub struct RebalanceLine {
    pub fund: String,
    /// Positive to buy, negative to sell.
    pub dollars_to_add: Dollar,
    /// Share of the new money going to this fund. Can exceed 1 or go negative
    /// when selling is allowed.
    pub allocation_of_contribution: Fraction,
    pub target_allocation: Fraction,
    pub difference_from_target: Fraction,
}

impl RebalanceLine {
    fn new(line: &PortfolioLine, delta: Dollar, contribution: Dollar) -> Self {
        let allocation = delta / contribution;
        Self {
            fund: line.fund.clone(),
            dollars_to_add: delta,
            allocation_of_contribution: allocation,
            target_allocation: line.target,
            difference_from_target: allocation - line.target,
        }
    }

    pub fn action(&self) -> Action {
        Action::from_delta(self.dollars_to_add)
    }
}

/// Spreads `request.contribution` over the portfolio so every fund lands on
/// `target * (current total + contribution)`.
///
/// Without `allow_selling`, a single fund needing a sale fails the whole batch;
/// no partial result is ever returned. The deltas always sum to the contribution
/// because the targets sum to one.
pub fn rebalance(
    portfolio: &Portfolio,
    request: &RebalanceRequest,
    policy: &Policy,
) -> Result<Vec<RebalanceLine>, RebalanceError> {
    validate(portfolio, policy)?;
    request.check()?;

    let current_total = portfolio.total_balance();
    let projected_total = current_total + request.contribution;
    let deltas: Vec<Dollar> = portfolio
        .iter()
        .map(|line| line.target * projected_total - line.balance)
        .collect();
    debug!(current_total, projected_total, ?deltas, "computed deltas");

    if !request.allow_selling {
        let funds: Vec<String> = portfolio
            .iter()
            .zip(&deltas)
            .filter(|&(_, &delta)| delta < 0.0)
            .map(|(line, _)| line.fund.clone())
            .collect();
        if !funds.is_empty() {
            debug!(?funds, "selling required but not allowed");
            return Err(RebalanceError::SellingRequired { funds });
        }
    }

    Ok(portfolio
        .iter()
        .zip(deltas)
        .map(|(line, delta)| RebalanceLine::new(line, delta, request.contribution))
        .collect())
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Add, Sum)]
struct Flows {
    bought: Dollar,
    sold: Dollar,
}

impl From<&RebalanceLine> for Flows {
    fn from(line: &RebalanceLine) -> Self {
        match line.action() {
            Action::Buy(val) => Flows {
                bought: val,
                sold: 0.0,
            },
            Action::Sell(val) => Flows {
                bought: 0.0,
                sold: val,
            },
            Action::Nothing => Flows::default(),
        }
    }
}

/// Totals for a computed rebalance.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct RebalanceSummary {
    pub current_total: Dollar,
    pub contribution: Dollar,
    pub projected_total: Dollar,
    pub bought: Dollar,
    /// Always reported as a positive amount.
    pub sold: Dollar,
    pub turnover: Dollar,
}

impl RebalanceSummary {
    pub fn from_lines(current_total: Dollar, contribution: Dollar, lines: &[RebalanceLine]) -> Self {
        let Flows { bought, sold } = lines.iter().map(Flows::from).sum();
        Self {
            current_total,
            contribution,
            projected_total: current_total + contribution,
            bought,
            sold,
            turnover: bought + sold,
        }
    }
}
