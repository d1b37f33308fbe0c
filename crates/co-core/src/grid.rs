//! Output and communication grid arithmetic.
//!
//! Grid points are integer multiples of an interval. All comparisons go through
//! [`reached`] so that accumulated rounding never produces a zero-length step.

use crate::numeric::{Real, reached};
use crate::{CoreError, CoreResult};

/// Smallest grid point `k * interval` that lies strictly after `time`.
pub fn next_grid_point(time: Real, interval: Real) -> Real {
    let mut k = (time / interval).floor();
    let mut t = (k + 1.0) * interval;
    while reached(time, t) {
        k += 1.0;
        t = (k + 1.0) * interval;
    }
    t
}

/// Check that `value` is an integer multiple of `base`.
///
/// Uses a loose absolute/relative tolerance so that decimal intervals such as
/// `0.1 / 0.01` are accepted.
pub fn is_multiple_of(value: Real, base: Real) -> bool {
    if base <= 0.0 || !base.is_finite() || !value.is_finite() {
        return false;
    }
    let n = (value / base).round();
    if n < 1.0 {
        return false;
    }
    (n * base - value).abs() <= 1e-8 + 1e-5 * value.abs()
}

pub fn ensure_multiple_of(value: Real, base: Real, what: &'static str) -> CoreResult<()> {
    if is_multiple_of(value, base) {
        Ok(())
    } else {
        Err(CoreError::NotAMultiple { what, value, base })
    }
}

/// Default fixed step size for a simulation span: `10^(round(log10(T)) - 3)`.
pub fn default_step_size(span: Real) -> Real {
    10f64.powf(span.log10().round() - 3.0)
}

/// A "nice" interval that divides `span` into roughly 500 to 1000 samples.
pub fn auto_interval(span: Real) -> Real {
    let mut h = default_step_size(span);
    let n_samples = span / h;

    if n_samples >= 2500.0 {
        h *= 5.0;
    } else if n_samples >= 2000.0 {
        h *= 4.0;
    } else if n_samples >= 1000.0 {
        h *= 2.0;
    } else if n_samples <= 200.0 {
        h /= 5.0;
    } else if n_samples <= 250.0 {
        h /= 4.0;
    } else if n_samples <= 500.0 {
        h /= 2.0;
    }

    h
}

/// Double `interval` until `span` holds at most `max_samples` of it.
pub fn coarsen_interval(mut interval: Real, span: Real, max_samples: Real) -> Real {
    while span / interval > max_samples {
        interval *= 2.0;
    }
    interval
}


#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn next_grid_point_is_strictly_ahead(time in 0.0_f64..100.0, interval in 1e-3_f64..10.0) {
            let t = next_grid_point(time, interval);
            prop_assert!(t > time);
            prop_assert!(!reached(time, t));
            prop_assert!(t - time <= interval + 1e-9);
        }
    }
}
