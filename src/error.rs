use thiserror::Error;

use crate::{Dollar, Fraction};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ValidationError {
    #[error("Portfolio cannot be empty")]
    EmptyPortfolio,
    #[error("Target allocations must sum to 100% (1.0), got {sum}")]
    TargetSumMismatch { sum: Fraction },
    #[error("Balance for fund '{fund}' cannot be negative")]
    NegativeBalance { fund: String },
}

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RebalanceError {
    #[error(transparent)]
    Invalid(#[from] ValidationError),
    #[error("Contribution must be a positive amount of dollars, got {contribution}")]
    InvalidContribution { contribution: String },
    #[error(
        "Some funds require selling to reach target allocation ({}); allow selling or add more money",
        .funds.join(", ")
    )]
    SellingRequired { funds: Vec<String> },
}

impl RebalanceError {
    pub(crate) fn invalid_contribution(contribution: Dollar) -> Self {
        RebalanceError::InvalidContribution {
            contribution: contribution.to_string(),
        }
    }
}

#[derive(Debug, Error)]
pub enum CsvError {
    #[error("CSV must have at least a header and one data row")]
    MalformedCsv,
    #[error("CSV must contain Fund, Balance, and Target columns (missing: {})", .missing.join(", "))]
    MissingColumns { missing: Vec<&'static str> },
    #[error("Invalid numeric value for {column} in row {row}")]
    InvalidNumericValue { row: u64, column: &'static str },
    #[error(transparent)]
    Csv(#[from] csv::Error),
    #[error("CSV output was not valid UTF-8")]
    Encoding(#[from] std::string::FromUtf8Error),
}
