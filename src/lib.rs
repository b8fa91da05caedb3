pub mod codec;
pub mod error;
pub mod metrics;
pub mod policy;
pub mod portfolio;
pub mod rebalance;
pub mod validate;

pub type Dollar = f64;
/// Percentage points, e.g. `60.0` for 60%.
pub type Percent = f64;
/// Share of a whole in `[0, 1]`.
pub type Fraction = f64;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Action {
    Nothing,
    Sell(Dollar),
    Buy(Dollar),
}

impl Action {
    pub fn from_delta(delta: Dollar) -> Self {
        match delta {
            val if val > 0.0 => Action::Buy(val.abs()),
            val if val < 0.0 => Action::Sell(val.abs()),
            _ => Action::Nothing,
        }
    }
}
