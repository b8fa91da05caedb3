use tracing::warn;

use crate::{error::ValidationError, policy::Policy, portfolio::Portfolio};

/// Checks a portfolio before any calculation, stopping at the first problem:
/// emptiness, then the target sum, then negative balances.
///
/// Fund names and non-finite numbers are not checked here; whoever builds the
/// [`crate::portfolio::PortfolioLine`]s is responsible for those.
pub fn validate(portfolio: &Portfolio, policy: &Policy) -> Result<(), ValidationError> {
    if portfolio.is_empty() {
        warn!("empty portfolio");
        return Err(ValidationError::EmptyPortfolio);
    }

    let sum = portfolio.target_sum();
    // Written so a NaN sum also fails.
    if !((sum - 1.0).abs() <= policy.target_sum_tolerance) {
        warn!(sum, tolerance = policy.target_sum_tolerance, "targets do not sum to 1");
        return Err(ValidationError::TargetSumMismatch { sum });
    }

    if let Some(line) = portfolio.iter().find(|line| line.balance < 0.0) {
        warn!(fund = %line.fund, balance = line.balance, "negative balance");
        return Err(ValidationError::NegativeBalance {
            fund: line.fund.clone(),
        });
    }

    Ok(())
}
