//! Zero-crossing localization with the Illinois method.

use super::root_direction;
use crate::error::SimResult;

/// Cap on bracket refinements before the current bracket is accepted.
const MAX_ITERATIONS: usize = 200;

/// Whether any indicator changes sign between `lo` and `hi`.
pub(crate) fn any_crossing(lo: &[f64], hi: &[f64]) -> bool {
    lo.iter().zip(hi).any(|(&a, &b)| root_direction(a, b) != 0)
}

/// Narrow `[t_lo, t_hi]` around the earliest sign change of `g`.
///
/// `g_lo` and `g_hi` are the indicator values at the bracket ends and must
/// contain at least one sign change. `g(t, out)` evaluates the indicators at
/// an intermediate time. Returns the right end of the final bracket, which
/// always lies past the crossing, with `1`/`-1`/`0` per indicator.
pub fn illinois<G>(
    mut t_lo: f64,
    g_lo: &[f64],
    mut t_hi: f64,
    g_hi: &[f64],
    tolerance: f64,
    mut g: G,
) -> SimResult<(f64, Vec<i32>)>
where
    G: FnMut(f64, &mut [f64]) -> SimResult<()>,
{
    let mut lo = g_lo.to_vec();
    let mut hi = g_hi.to_vec();
    let mut mid = vec![0.0; lo.len()];
    let mut alpha = 1.0;
    // +1: the right end moved last, -1: the left end moved last
    let mut last_side = 0;

    for _ in 0..MAX_ITERATIONS {
        let width = t_hi - t_lo;
        if width <= tolerance {
            break;
        }

        let mut t_mid = t_hi;
        for (&a, &b) in lo.iter().zip(&hi) {
            if root_direction(a, b) != 0 {
                let candidate = t_hi - width * b / (b - alpha * a);
                if candidate < t_mid {
                    t_mid = candidate;
                }
            }
        }
        let margin = 0.5 * tolerance;
        if t_mid.is_nan() || t_mid - t_lo <= margin {
            t_mid = t_lo + margin;
        } else if t_hi - t_mid <= margin {
            t_mid = t_hi - margin;
        }

        g(t_mid, &mut mid)?;

        if any_crossing(&lo, &mid) {
            t_hi = t_mid;
            hi.copy_from_slice(&mid);
            alpha = if last_side == 1 { 0.5 * alpha } else { 1.0 };
            last_side = 1;
        } else {
            t_lo = t_mid;
            lo.copy_from_slice(&mid);
            alpha = if last_side == -1 { 2.0 * alpha } else { 1.0 };
            last_side = -1;
        }
    }

    let roots = lo
        .iter()
        .zip(&hi)
        .map(|(&a, &b)| root_direction(a, b))
        .collect();
    Ok((t_hi, roots))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn finds_linear_root() {
        let f = |t: f64, z: &mut [f64]| -> SimResult<()> {
            z[0] = t - 0.3;
            Ok(())
        };
        let (t, roots) = illinois(0.0, &[-0.3], 1.0, &[0.7], 1e-12, f).unwrap();
        assert!((t - 0.3).abs() < 1e-10);
        assert!(t >= 0.3);
        assert_eq!(roots, [1]);
    }

    #[test]
    fn finds_earliest_of_two_roots() {
        let f = |t: f64, z: &mut [f64]| -> SimResult<()> {
            z[0] = 0.8 - t;
            z[1] = t * t - 0.25;
            Ok(())
        };
        let (t, roots) =
            illinois(0.0, &[0.8, -0.25], 1.0, &[-0.2, 0.75], 1e-12, f).unwrap();
        assert!((t - 0.5).abs() < 1e-9);
        assert_eq!(roots, [0, 1]);
    }

    #[test]
    fn falling_root_on_curved_function() {
        let f = |t: f64, z: &mut [f64]| -> SimResult<()> {
            z[0] = (1.0 - t).powi(3);
            Ok(())
        };
        let (t, roots) = illinois(0.0, &[1.0], 2.0, &[-1.0], 1e-12, f).unwrap();
        assert!((t - 1.0).abs() < 1e-3);
        assert_eq!(roots, [-1]);
    }
}
