use std::path::Path;

use anyhow::Context;
use serde::Deserialize;
use tracing::debug;

use crate::{Fraction, Percent};

pub const DEFAULT_TARGET_SUM_TOLERANCE: Fraction = 0.001;
pub const DEFAULT_BALANCED_BAND: Percent = 0.5;

/// Tolerances applied by validation and drift classification.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Policy {
    /// How far the sum of all targets may stray from `1.0`.
    pub target_sum_tolerance: Fraction,
    /// Drift, in percentage points, still considered balanced.
    pub balanced_band: Percent,
}

impl Default for Policy {
    fn default() -> Self {
        Self {
            target_sum_tolerance: DEFAULT_TARGET_SUM_TOLERANCE,
            balanced_band: DEFAULT_BALANCED_BAND,
        }
    }
}

impl Policy {
    pub fn load_from_file(path: &Path) -> anyhow::Result<Self> {
        let policy_file =
            std::fs::File::open(path).with_context(|| format!("Failed to open file {path:?}"))?;
        let builder: PolicyBuilder = serde_yaml::from_reader(policy_file)
            .with_context(|| format!("Failed to parse policy file {path:?}"))?;
        let policy = builder.build()?;
        debug!(?policy, ?path, "loaded policy");
        Ok(policy)
    }

    /// Loads `path` when it exists, otherwise falls back to the default policy.
    pub fn load_or_default(path: &Path) -> anyhow::Result<Self> {
        if path.exists() {
            Self::load_from_file(path)
        } else {
            debug!(?path, "no policy file, using defaults");
            Ok(Self::default())
        }
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default, deny_unknown_fields)]
struct PolicyBuilder {
    target_sum_tolerance: Option<Fraction>,
    balanced_band: Option<Percent>,
}

impl TryFrom<PolicyBuilder> for Policy {
    type Error = anyhow::Error;

    fn try_from(builder: PolicyBuilder) -> Result<Self, Self::Error> {
        builder.validate()?;
        let defaults = Policy::default();
        Ok(Policy {
            target_sum_tolerance: builder
                .target_sum_tolerance
                .unwrap_or(defaults.target_sum_tolerance),
            balanced_band: builder.balanced_band.unwrap_or(defaults.balanced_band),
        })
    }
}

impl PolicyBuilder {
    fn validate(&self) -> anyhow::Result<()> {
        for (name, value) in [
            ("TargetSumTolerance", self.target_sum_tolerance),
            ("BalancedBand", self.balanced_band),
        ] {
            if let Some(value) = value {
                anyhow::ensure!(
                    value.is_finite() && value >= 0.0,
                    "{name} must be a non-negative number, got {value}"
                );
            }
        }
        Ok(())
    }

    fn build(self) -> anyhow::Result<Policy> {
        self.try_into()
    }
}
