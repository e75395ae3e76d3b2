use crate::MfError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, MfError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(MfError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, MfError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(MfError::NonPositive { what, value: v })
    }
}

/// Maximum that propagates NaN instead of skipping it like `f64::max` does.
///
/// Returns `None` for an empty iterator.
pub fn nan_max<I: IntoIterator<Item = Real>>(values: I) -> Option<Real> {
    values.into_iter().fold(None, |acc, v| match acc {
        None => Some(v),
        Some(m) if m.is_nan() || v.is_nan() => Some(Real::NAN),
        Some(m) => Some(m.max(v)),
    })
}

/// Mean and population standard deviation of a sample.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Moments {
    pub mean: Real,
    pub std: Real,
    pub count: usize,
}

/// Population moments (divide by N). An empty sample yields NaN/NaN.
pub fn population_moments(values: &[Real]) -> Moments {
    if values.is_empty() {
        return Moments {
            mean: Real::NAN,
            std: Real::NAN,
            count: 0,
        };
    }
    let n = values.len() as Real;
    let mean = values.iter().sum::<Real>() / n;
    let var = values.iter().map(|v| (v - mean) * (v - mean)).sum::<Real>() / n;
    Moments {
        mean,
        std: var.sqrt(),
        count: values.len(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn nearly_equal_basic() {
        let tol = Tolerances {
            abs: 1e-12,
            rel: 1e-9,
        };
        assert!(nearly_equal(1.0, 1.0 + 1e-12, tol));
        assert!(nearly_equal(0.0, 1e-13, tol));
        assert!(!nearly_equal(1.0, 1.0 + 1e-6, tol));
    }

    #[test]
    fn ensure_finite_detects_nan() {
        let err = ensure_finite(Real::NAN, "test").unwrap_err();
        let msg = format!("{err}");
        assert!(msg.contains("Non-finite"));
    }

    #[test]
    fn ensure_positive_rejects_zero() {
        assert!(ensure_positive(0.0, "dt").is_err());
        assert!(ensure_positive(-1.0, "dt").is_err());
        assert_eq!(ensure_positive(1e-3, "dt").unwrap(), 1e-3);
    }

    #[test]
    fn nan_max_propagates() {
        assert_eq!(nan_max([1.0, 3.0, 2.0]), Some(3.0));
        assert!(nan_max([1.0, Real::NAN, 2.0]).unwrap().is_nan());
        assert!(nan_max(std::iter::empty::<f64>()).is_none());
    }

    #[test]
    fn population_moments_divides_by_n() {
        let m = population_moments(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]);
        assert_eq!(m.count, 8);
        assert!((m.mean - 5.0).abs() < 1e-12);
        assert!((m.std - 2.0).abs() < 1e-12);
    }

    #[test]
    fn population_moments_empty_is_nan() {
        let m = population_moments(&[]);
        assert!(m.mean.is_nan());
        assert!(m.std.is_nan());
        assert_eq!(m.count, 0);
    }
}
