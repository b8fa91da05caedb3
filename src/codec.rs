//! CSV import and export.
//!
//! Import reads a header-tagged `Fund,Balance,Target` file. Header names are
//! matched case-insensitively in any order and extra columns are ignored.
//! The target column holds raw fractions (`0.6`) unless the caller asks for
//! [`TargetUnit::Percent`].
//!
//! Nothing is quoted or escaped in either direction: a fund name containing a
//! comma splits into extra fields. Import also trims every field, so leading or
//! trailing spaces in a fund name are lost on a round trip.

use clap::ValueEnum;
use csv::{QuoteStyle, ReaderBuilder, StringRecord, Trim, WriterBuilder};
use tracing::debug;

use crate::{
    Action, Dollar,
    error::CsvError,
    portfolio::{Portfolio, PortfolioLine, TargetUnit},
    rebalance::RebalanceLine,
};

enum Column {
    Fund,
    Balance,
    Target,
}

impl Column {
    const ALL: [Column; 3] = [Column::Fund, Column::Balance, Column::Target];

    fn name(&self) -> &'static str {
        match self {
            Column::Fund => "fund",
            Column::Balance => "balance",
            Column::Target => "target",
        }
    }
}

struct ColumnIndices {
    fund: usize,
    balance: usize,
    target: usize,
}

impl ColumnIndices {
    fn from_headers(headers: &StringRecord) -> Result<Self, CsvError> {
        let names: Vec<String> = headers.iter().map(|h| h.to_lowercase()).collect();
        let find = |column: &Column| names.iter().position(|n| n == column.name());
        let missing: Vec<&'static str> = Column::ALL
            .iter()
            .filter(|&column| find(column).is_none())
            .map(Column::name)
            .collect();
        match (
            find(&Column::Fund),
            find(&Column::Balance),
            find(&Column::Target),
        ) {
            (Some(fund), Some(balance), Some(target)) => Ok(Self {
                fund,
                balance,
                target,
            }),
            _ => {
                debug!(?headers, ?missing, "missing required columns");
                Err(CsvError::MissingColumns { missing })
            }
        }
    }
}

/// Parses a portfolio whose target column holds fractions.
pub fn parse(text: &str) -> Result<Portfolio, CsvError> {
    parse_with(text, TargetUnit::Fraction)
}

pub fn parse_with(text: &str, unit: TargetUnit) -> Result<Portfolio, CsvError> {
    let text = text.trim();
    if text.lines().count() < 2 {
        return Err(CsvError::MalformedCsv);
    }

    let mut csv_reader = ReaderBuilder::new()
        .flexible(true)
        .quoting(false)
        .trim(Trim::All)
        .from_reader(text.as_bytes());
    let columns = ColumnIndices::from_headers(csv_reader.headers()?)?;

    let mut lines = Vec::new();
    for row in csv_reader.records() {
        let row = row?;
        if row.len() < Column::ALL.len() {
            debug!(?row, "Row doesn't have enough fields to be a position");
            continue;
        }
        let row_number = row.position().map_or(0, |pos| pos.line());
        let fund = row.get(columns.fund).unwrap_or_default();
        let balance = parse_number(&row, columns.balance).ok_or(CsvError::InvalidNumericValue {
            row: row_number,
            column: Column::Balance.name(),
        })?;
        let target = parse_number(&row, columns.target).ok_or(CsvError::InvalidNumericValue {
            row: row_number,
            column: Column::Target.name(),
        })?;
        let line = PortfolioLine::new(fund, balance, unit.to_fraction(target));
        debug!(?line, "parsed row");
        lines.push(line);
    }
    Ok(Portfolio::new(lines))
}

/// Accepts an optional leading `$`; rejects NaN and infinities.
fn parse_number(row: &StringRecord, index: usize) -> Option<f64> {
    row.get(index)
        .map(|s| s.strip_prefix('$').unwrap_or(s))
        .and_then(|s| s.parse::<f64>().ok())
        .filter(|n| n.is_finite())
}

/// Column layout for exported rebalance results.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, ValueEnum)]
pub enum ResultLayout {
    /// Signed dollar amounts, negative meaning sell.
    #[default]
    Signed,
    /// Absolute dollar amounts with a `Buy`/`Sell` column.
    WithAction,
}

impl ResultLayout {
    fn header(self) -> &'static [&'static str] {
        match self {
            ResultLayout::Signed => &[
                "Fund",
                "Dollars_to_Add",
                "Allocation_%",
                "Target_Allocation_%",
                "Difference_%",
            ],
            ResultLayout::WithAction => &[
                "Fund",
                "Dollars_to_Add",
                "Action",
                "Allocation_%",
                "Target_Allocation_%",
                "Difference_%",
            ],
        }
    }

    fn row(self, line: &RebalanceLine) -> Vec<String> {
        let percent = |fraction: f64| format!("{:.2}", fraction * 100.0);
        let mut row = vec![line.fund.clone()];
        match self {
            ResultLayout::Signed => row.push(dollars(line.dollars_to_add)),
            ResultLayout::WithAction => {
                let label = match line.action() {
                    Action::Sell(_) => "Sell",
                    Action::Buy(_) | Action::Nothing => "Buy",
                };
                row.push(dollars(line.dollars_to_add.abs()));
                row.push(label.to_string());
            }
        }
        row.push(percent(line.allocation_of_contribution));
        row.push(percent(line.target_allocation));
        row.push(percent(line.difference_from_target));
        row
    }
}

fn dollars(value: Dollar) -> String {
    format!("{value:.2}")
}

pub fn results_to_csv(lines: &[RebalanceLine], layout: ResultLayout) -> Result<String, CsvError> {
    write_csv(layout.header(), lines.iter().map(|line| layout.row(line)))
}

/// Writes balances and fractional targets unrounded, so the output parses
/// back into the same portfolio.
pub fn portfolio_to_csv(portfolio: &Portfolio) -> Result<String, CsvError> {
    write_csv(
        &["Fund", "Balance", "Target"],
        portfolio.iter().map(|line| {
            vec![
                line.fund.clone(),
                line.balance.to_string(),
                line.target.to_string(),
            ]
        }),
    )
}

fn write_csv<I>(header: &[&str], rows: I) -> Result<String, CsvError>
where
    I: Iterator<Item = Vec<String>>,
{
    let mut csv_writer = WriterBuilder::new()
        .quote_style(QuoteStyle::Never)
        .from_writer(Vec::new());
    csv_writer.write_record(header)?;
    for row in rows {
        csv_writer.write_record(&row)?;
    }
    let bytes = csv_writer
        .into_inner()
        .map_err(|e| csv::Error::from(e.into_error()))?;
    Ok(String::from_utf8(bytes)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        policy::Policy,
        rebalance::{RebalanceRequest, rebalance},
    };

    #[test]
    fn test_parse_basic() {
        let portfolio = parse("Fund,Balance,Target\nX,1000,0.6\nY,400,0.4").unwrap();
        assert_eq!(
            portfolio,
            Portfolio::new(vec![
                PortfolioLine::new("X", 1000.0, 0.6),
                PortfolioLine::new("Y", 400.0, 0.4),
            ])
        );
    }

    #[test]
    fn test_parse_header_order_and_case() {
        let portfolio =
            parse("  TARGET , note, fund,BALANCE\n0.25, old ,Bonds, $300\n0.75,,Stocks,900.5\n")
                .unwrap();
        assert_eq!(
            portfolio.lines(),
            [
                PortfolioLine::new("Bonds", 300.0, 0.25),
                PortfolioLine::new("Stocks", 900.5, 0.75),
            ]
        );
    }

    #[test]
    fn test_parse_crlf_and_blank_trailing_lines() {
        let portfolio = parse("Fund,Balance,Target\r\nX,1,0.5\r\nY,2,0.5\r\n\r\n,\n").unwrap();
        assert_eq!(portfolio.len(), 2);
        assert_eq!(portfolio.lines()[1].fund, "Y");
    }

    #[test]
    fn test_parse_percent_targets() {
        let portfolio =
            parse_with("Fund,Balance,Target\nX,1000,60\nY,400,40", TargetUnit::Percent).unwrap();
        assert_eq!(portfolio.lines()[0].target, 0.6);
        assert_eq!(portfolio.lines()[1].target, 0.4);
    }

    #[test]
    fn test_parse_malformed() {
        for text in ["", "Fund,Balance,Target", "  \nFund,Balance,Target\n  "] {
            assert!(matches!(parse(text), Err(CsvError::MalformedCsv)), "{text:?}");
        }
    }

    #[test]
    fn test_parse_missing_columns() {
        match parse("Fund,Amount,Target\nX,1,1") {
            Err(CsvError::MissingColumns { missing }) => assert_eq!(missing, ["balance"]),
            other => panic!("unexpected result {other:?}"),
        }
    }

    #[test]
    fn test_parse_invalid_number_reports_row() {
        match parse("Fund,Balance,Target\nX,1000,0.6\nY,lots,0.4") {
            Err(CsvError::InvalidNumericValue { row, column }) => {
                assert_eq!(row, 3);
                assert_eq!(column, "balance");
            }
            other => panic!("unexpected result {other:?}"),
        }
        assert!(matches!(
            parse("Fund,Balance,Target\nX,1000,NaN"),
            Err(CsvError::InvalidNumericValue { row: 2, column: "target" })
        ));
    }

    #[test]
    fn test_portfolio_round_trip() {
        let portfolio = Portfolio::new(vec![
            PortfolioLine::new("Total Market", 12345.67, 0.35),
            PortfolioLine::new("Intl", 0.1, 1.0 / 3.0),
            PortfolioLine::new("Bonds", 0.0, 1.0 - 0.35 - 1.0 / 3.0),
        ]);
        let text = portfolio_to_csv(&portfolio).unwrap();
        assert!(text.starts_with("Fund,Balance,Target\n"));
        assert_eq!(parse(&text).unwrap(), portfolio);
    }

    fn scenario_b() -> Vec<RebalanceLine> {
        let portfolio = Portfolio::new(vec![
            PortfolioLine::new("A", 250.0, 0.5),
            PortfolioLine::new("B", 100.0, 0.2),
            PortfolioLine::new("C", 200.0, 0.3),
        ]);
        rebalance(
            &portfolio,
            &RebalanceRequest::new(100.0, true),
            &Policy::default(),
        )
        .unwrap()
    }

    #[test]
    fn test_results_signed() {
        let text = results_to_csv(&scenario_b(), ResultLayout::Signed).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(
            rows,
            [
                "Fund,Dollars_to_Add,Allocation_%,Target_Allocation_%,Difference_%",
                "A,75.00,75.00,50.00,25.00",
                "B,30.00,30.00,20.00,10.00",
                "C,-5.00,-5.00,30.00,-35.00",
            ]
        );
    }

    #[test]
    fn test_results_with_action() {
        let text = results_to_csv(&scenario_b(), ResultLayout::WithAction).unwrap();
        let rows: Vec<_> = text.lines().collect();
        assert_eq!(
            rows[0],
            "Fund,Dollars_to_Add,Action,Allocation_%,Target_Allocation_%,Difference_%"
        );
        assert_eq!(rows[1], "A,75.00,Buy,75.00,50.00,25.00");
        assert_eq!(rows[3], "C,5.00,Sell,-5.00,30.00,-35.00");
    }

    #[test]
    fn test_commas_in_fund_names_are_not_escaped() {
        let portfolio = Portfolio::new(vec![PortfolioLine::new("Smith, Jones", 1.0, 1.0)]);
        let text = portfolio_to_csv(&portfolio).unwrap();
        assert_eq!(text.lines().nth(1), Some("Smith, Jones,1,1"));
    }

    #[test]
    fn test_fund_name_padding_is_trimmed_on_import() {
        let portfolio = Portfolio::new(vec![PortfolioLine::new(" Padded ", 1.0, 1.0)]);
        let text = portfolio_to_csv(&portfolio).unwrap();
        assert_eq!(text.lines().nth(1), Some(" Padded ,1,1"));
        let parsed = parse(&text).unwrap();
        assert_eq!(parsed.lines(), [PortfolioLine::new("Padded", 1.0, 1.0)]);
    }
}
