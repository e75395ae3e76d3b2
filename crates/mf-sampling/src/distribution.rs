//! Per-parameter distribution table.

use mf_sim::{MotorParam, MotorParameters};
use serde::{Deserialize, Serialize};

use crate::error::{SamplingError, SamplingResult};

/// Half-width of the Latin Hypercube range in standard deviations.
pub const LHS_SIGMA_SPAN: f64 = 3.0;

/// Normal distribution of a single motor parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct ParameterDistribution {
    pub param: MotorParam,
    pub mean: f64,
    pub std: f64,
}

impl ParameterDistribution {
    pub fn new(param: MotorParam, mean: f64, std: f64) -> Self {
        Self { param, mean, std }
    }

    /// Uniform range used by the space-filling strategy: `mean ± 3σ`.
    pub fn lhs_bounds(&self) -> (f64, f64) {
        (
            self.mean - LHS_SIGMA_SPAN * self.std,
            self.mean + LHS_SIGMA_SPAN * self.std,
        )
    }

    fn validate(&self) -> SamplingResult<()> {
        if !self.mean.is_finite() {
            return Err(SamplingError::Distribution {
                param: self.param,
                message: format!("mean must be finite, got {}", self.mean),
            });
        }
        if !(self.std.is_finite() && self.std >= 0.0) {
            return Err(SamplingError::Distribution {
                param: self.param,
                message: format!("std must be finite and non-negative, got {}", self.std),
            });
        }
        Ok(())
    }
}

/// One distribution per [`MotorParam`], in canonical order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "Vec<ParameterDistribution>", into = "Vec<ParameterDistribution>")]
pub struct DistributionTable {
    rows: [ParameterDistribution; 6],
}

impl DistributionTable {
    /// Build a table from rows in any order.
    ///
    /// Every parameter must appear exactly once with a finite mean and a
    /// finite, non-negative standard deviation.
    pub fn new(rows: Vec<ParameterDistribution>) -> SamplingResult<Self> {
        let mut slots: [Option<ParameterDistribution>; 6] = [None; 6];
        for row in rows {
            row.validate()?;
            let slot = &mut slots[index_of(row.param)];
            if slot.is_some() {
                return Err(SamplingError::DuplicateParameter { param: row.param });
            }
            *slot = Some(row);
        }

        let mut table = Vec::with_capacity(6);
        for (param, slot) in MotorParam::ALL.into_iter().zip(slots) {
            table.push(slot.ok_or(SamplingError::MissingParameter { param })?);
        }
        let rows: [ParameterDistribution; 6] = table
            .try_into()
            .map_err(|_| SamplingError::InvalidArg {
                what: "distribution table must have six rows",
            })?;
        Ok(Self { rows })
    }

    pub fn get(&self, param: MotorParam) -> &ParameterDistribution {
        &self.rows[index_of(param)]
    }

    pub fn iter(&self) -> impl Iterator<Item = &ParameterDistribution> {
        self.rows.iter()
    }

    /// Motor built from the means.
    pub fn nominal(&self) -> MotorParameters {
        MotorParameters::from_array(self.rows.map(|r| r.mean))
    }
}

impl Default for DistributionTable {
    /// Nominal motor with a 10% standard deviation on every parameter.
    fn default() -> Self {
        let nominal = MotorParameters::default();
        Self {
            rows: MotorParam::ALL.map(|p| {
                let mean = nominal.get(p);
                ParameterDistribution::new(p, mean, 0.1 * mean)
            }),
        }
    }
}

impl TryFrom<Vec<ParameterDistribution>> for DistributionTable {
    type Error = SamplingError;

    fn try_from(rows: Vec<ParameterDistribution>) -> SamplingResult<Self> {
        Self::new(rows)
    }
}

impl From<DistributionTable> for Vec<ParameterDistribution> {
    fn from(table: DistributionTable) -> Self {
        table.rows.to_vec()
    }
}

// Variants are declared in `MotorParam::ALL` order.
fn index_of(param: MotorParam) -> usize {
    param as usize
}
