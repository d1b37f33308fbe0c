use crate::CoreError;

/// Floating point type used throughout system
pub type Real = f64;

/// Absolute tolerance for treating two simulation times as equal.
pub const EPS: Real = 1e-13;

/// Absolute/relative tolerance pair.
#[derive(Clone, Copy, Debug)]
pub struct Tolerances {
    pub abs: Real,
    pub rel: Real,
}

impl Default for Tolerances {
    fn default() -> Self {
        Self {
            abs: 1e-12,
            rel: 1e-9,
        }
    }
}

pub fn nearly_equal(a: Real, b: Real, tol: Tolerances) -> bool {
    if !a.is_finite() || !b.is_finite() {
        return a == b;
    }
    let diff = (a - b).abs();
    if diff <= tol.abs {
        return true;
    }
    diff <= tol.rel * a.abs().max(b.abs())
}

/// Time comparison used by the master algorithms.
///
/// Accumulated grid arithmetic drifts by a few ulps, so exact equality is never
/// used on simulation times.
pub fn is_close(a: Real, b: Real) -> bool {
    nearly_equal(
        a,
        b,
        Tolerances {
            abs: EPS,
            rel: 1e-12,
        },
    )
}

/// `a >= b` up to [`is_close`].
pub fn reached(a: Real, b: Real) -> bool {
    a > b || is_close(a, b)
}

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

pub fn ensure_positive(v: Real, what: &'static str) -> Result<Real, CoreError> {
    let v = ensure_finite(v, what)?;
    if v > 0.0 {
        Ok(v)
    } else {
        Err(CoreError::InvalidArg { what })
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
    fn accumulated_grid_is_close() {
        let mut t = 0.0;
        for _ in 0..10 {
            t += 0.1;
        }
        assert_ne!(t, 1.0);
        assert!(is_close(t, 1.0));
        assert!(reached(t, 1.0));
        assert!(!reached(0.9, 1.0));
    }

    #[test]
    fn infinity_is_never_close_to_a_finite_time() {
        assert!(!is_close(1.0, Real::INFINITY));
        assert!(!is_close(Real::INFINITY, 1e300));
        assert!(!reached(1.0, Real::INFINITY));
        assert!(reached(Real::INFINITY, 1.0));
        assert!(is_close(Real::INFINITY, Real::INFINITY));
        assert!(!is_close(Real::NAN, Real::NAN));
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
        assert_eq!(ensure_positive(0.5, "dt").unwrap(), 0.5);
    }
}
