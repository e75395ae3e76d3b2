//! Sampling strategies producing parameter ensembles.

use mf_sim::{MotorParam, MotorParameters};
use rand::Rng;
use rand::SeedableRng;
use rand::seq::SliceRandom;
use rand_chacha::ChaCha8Rng;
use rand_distr::{Distribution, Normal};
use serde::{Deserialize, Serialize};

use crate::distribution::{DistributionTable, ParameterDistribution};
use crate::error::{SamplingError, SamplingResult};

/// How an ensemble of motor parameters is drawn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum SamplingStrategy {
    /// Independent normal draws per parameter.
    MonteCarlo,
    /// One uniform draw per stratum of `mean ± 3σ`, strata shuffled per parameter.
    LatinHypercube,
    /// Independent normal draws with the standard deviation narrowed.
    Importance,
}

impl SamplingStrategy {
    pub const ALL: [SamplingStrategy; 3] = [
        SamplingStrategy::MonteCarlo,
        SamplingStrategy::LatinHypercube,
        SamplingStrategy::Importance,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SamplingStrategy::MonteCarlo => "monte_carlo",
            SamplingStrategy::LatinHypercube => "latin_hypercube",
            SamplingStrategy::Importance => "importance",
        }
    }

    fn seed_salt(self) -> u64 {
        match self {
            SamplingStrategy::MonteCarlo => 0x4D43_5F52_554E_0001,
            SamplingStrategy::LatinHypercube => 0x4C48_535F_5255_0002,
            SamplingStrategy::Importance => 0x494D_505F_5255_0003,
        }
    }
}

impl std::fmt::Display for SamplingStrategy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Deterministic RNG stream for one strategy of a study.
pub fn strategy_rng(seed: u64, strategy: SamplingStrategy) -> ChaCha8Rng {
    ChaCha8Rng::seed_from_u64(seed ^ strategy.seed_salt())
}

/// Ordered parameter vectors drawn by one strategy.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterEnsemble {
    pub strategy: SamplingStrategy,
    pub samples: Vec<MotorParameters>,
}

impl ParameterEnsemble {
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, MotorParameters> {
        self.samples.iter()
    }

    /// Values of one parameter across the ensemble.
    pub fn column(&self, param: MotorParam) -> Vec<f64> {
        self.samples.iter().map(|p| p.get(param)).collect()
    }
}

/// Draw `n` parameter vectors.
///
/// `importance_std_scale` multiplies every standard deviation for
/// [`SamplingStrategy::Importance`] and is ignored otherwise.
pub fn sample_ensemble<R: Rng + ?Sized>(
    strategy: SamplingStrategy,
    table: &DistributionTable,
    n: usize,
    importance_std_scale: f64,
    rng: &mut R,
) -> SamplingResult<ParameterEnsemble> {
    if n == 0 {
        return Err(SamplingError::InvalidArg {
            what: "ensemble size must be at least one",
        });
    }

    let samples = match strategy {
        SamplingStrategy::MonteCarlo => sample_normal(table, n, 1.0, rng)?,
        SamplingStrategy::LatinHypercube => sample_latin_hypercube(table, n, rng),
        SamplingStrategy::Importance => {
            if !(importance_std_scale.is_finite() && importance_std_scale > 0.0) {
                return Err(SamplingError::InvalidArg {
                    what: "importance std scale must be positive and finite",
                });
            }
            sample_normal(table, n, importance_std_scale, rng)?
        }
    };

    Ok(ParameterEnsemble { strategy, samples })
}

fn normal_for(dist: &ParameterDistribution, std_scale: f64) -> SamplingResult<Normal<f64>> {
    Normal::new(dist.mean, dist.std * std_scale).map_err(|e| SamplingError::Distribution {
        param: dist.param,
        message: e.to_string(),
    })
}

fn sample_normal<R: Rng + ?Sized>(
    table: &DistributionTable,
    n: usize,
    std_scale: f64,
    rng: &mut R,
) -> SamplingResult<Vec<MotorParameters>> {
    let normals = MotorParam::ALL
        .iter()
        .map(|p| normal_for(table.get(*p), std_scale))
        .collect::<SamplingResult<Vec<_>>>()?;

    Ok((0..n)
        .map(|_| {
            let mut params = MotorParameters::default();
            for (p, normal) in MotorParam::ALL.iter().zip(&normals) {
                params.set(*p, normal.sample(rng));
            }
            params
        })
        .collect())
}

fn sample_latin_hypercube<R: Rng + ?Sized>(
    table: &DistributionTable,
    n: usize,
    rng: &mut R,
) -> Vec<MotorParameters> {
    let mut samples = vec![MotorParameters::default(); n];

    for dist in table.iter() {
        let (lo, hi) = dist.lhs_bounds();
        let width = (hi - lo) / n as f64;

        let mut column: Vec<f64> = (0..n)
            .map(|k| lo + (k as f64 + rng.gen_range(0.0..1.0)) * width)
            .collect();
        column.shuffle(rng);

        for (params, value) in samples.iter_mut().zip(column) {
            params.set(dist.param, value);
        }
    }

    samples
}
