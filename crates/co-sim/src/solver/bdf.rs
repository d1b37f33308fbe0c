//! Adaptive variable-order BDF solver with root localization.
//!
//! Backward differentiation formulas of order 1 to 5 in quasi-constant step
//! form: the solution history is kept as a difference array `D` that is
//! rescaled whenever the step size changes. Each step solves the implicit
//! corrector with a simplified Newton iteration on a finite-difference
//! Jacobian. The step and order are chosen from local error estimates.
//!
//! Event indicators are checked on the dense output of every accepted step
//! and crossings are narrowed with [`illinois`](super::roots::illinois).

use super::roots::{any_crossing, illinois};
use super::{Solver, SolverStep};
use crate::error::{SimError, SimResult};
use crate::input::InputSignal;
use co_model::ModelInstance;
use nalgebra::{DMatrix, DVector, Dyn, linalg::LU};

const MAX_ORDER: usize = 5;
const NEWTON_MAXITER: usize = 4;
const MIN_FACTOR: f64 = 0.2;
const MAX_FACTOR: f64 = 10.0;
const KAPPA: [f64; MAX_ORDER + 1] = [0.0, -0.1850, -1.0 / 9.0, -0.0823, -0.0415, 0.0];

/// Tuning knobs for [`BdfSolver`].
#[derive(Clone, Debug, PartialEq)]
pub struct BdfOptions {
    pub relative_tolerance: f64,
    /// Defaults to the relative tolerance.
    pub absolute_tolerance: Option<f64>,
    pub max_step: f64,
    /// Initial step; chosen from the derivatives when `None`.
    pub first_step: Option<f64>,
    /// Internal steps allowed within one call to [`Solver::step`].
    pub max_internal_steps: usize,
}

impl Default for BdfOptions {
    fn default() -> Self {
        Self {
            relative_tolerance: 1e-5,
            absolute_tolerance: None,
            max_step: f64::INFINITY,
            first_step: None,
            max_internal_steps: 5000,
        }
    }
}

/// Weighted RMS norm.
fn rms(v: &DVector<f64>, scale: &DVector<f64>) -> f64 {
    if v.is_empty() {
        return 0.0;
    }
    let sum: f64 = v.iter().zip(scale.iter()).map(|(a, s)| (a / s).powi(2)).sum();
    (sum / v.len() as f64).sqrt()
}

fn spacing(t: f64) -> f64 {
    (t.abs() * f64::EPSILON).max(f64::MIN_POSITIVE)
}

/// Matrix that rescales the difference array for a step change by `factor`.
fn compute_r(order: usize, factor: f64) -> DMatrix<f64> {
    let mut m = DMatrix::zeros(order + 1, order + 1);
    for j in 0..=order {
        m[(0, j)] = 1.0;
    }
    for i in 1..=order {
        for j in 1..=order {
            m[(i, j)] = (i as f64 - 1.0 - factor * j as f64) / i as f64;
        }
    }
    for i in 1..=order {
        for j in 0..=order {
            m[(i, j)] *= m[(i - 1, j)];
        }
    }
    m
}

/// Adaptive BDF solver driving the continuous states of one instance.
#[derive(Debug)]
pub struct BdfSolver {
    options: BdfOptions,
    atol: f64,
    newton_tol: f64,
    /// Number of model states; the integrator carries at least one.
    nx: usize,
    nz: usize,
    t: f64,
    h_abs: f64,
    order: usize,
    n_equal_steps: usize,
    d: Vec<DVector<f64>>,
    jac: DMatrix<f64>,
    lu: Option<LU<f64, Dyn, Dyn>>,
    gamma: [f64; MAX_ORDER + 1],
    alpha: [f64; MAX_ORDER + 1],
    error_const: [f64; MAX_ORDER + 1],
    f_buf: DVector<f64>,
    z_lo: Vec<f64>,
    z_hi: Vec<f64>,
    steps: usize,
}

impl BdfSolver {
    /// Initialize from the states the instance holds at `time`.
    pub fn new<I: ModelInstance + ?Sized>(
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
        options: BdfOptions,
    ) -> SimResult<Self> {
        let rtol = options.relative_tolerance;
        if !rtol.is_finite() || rtol <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "relative tolerance must be positive",
            });
        }
        if options.max_step.is_nan() || options.max_step <= 0.0 {
            return Err(SimError::InvalidArg {
                what: "max step must be positive",
            });
        }

        let mut gamma = [0.0; MAX_ORDER + 1];
        for k in 1..=MAX_ORDER {
            gamma[k] = gamma[k - 1] + 1.0 / k as f64;
        }
        let mut alpha = [0.0; MAX_ORDER + 1];
        let mut error_const = [0.0; MAX_ORDER + 1];
        for k in 0..=MAX_ORDER {
            alpha[k] = (1.0 - KAPPA[k]) * gamma[k];
            error_const[k] = KAPPA[k] * gamma[k] + 1.0 / (k as f64 + 1.0);
        }

        let nx = instance.number_of_continuous_states();
        let nz = instance.number_of_event_indicators();
        let n = nx.max(1);
        let mut solver = Self {
            atol: options.absolute_tolerance.unwrap_or(rtol),
            newton_tol: (10.0 * f64::EPSILON / rtol).max(0.03f64.min(rtol.sqrt())),
            options,
            nx,
            nz,
            t: time,
            h_abs: 0.0,
            order: 1,
            n_equal_steps: 0,
            d: vec![DVector::zeros(n); MAX_ORDER + 3],
            jac: DMatrix::zeros(n, n),
            lu: None,
            gamma,
            alpha,
            error_const,
            f_buf: DVector::zeros(n),
            z_lo: vec![0.0; nz],
            z_hi: vec![0.0; nz],
            steps: 0,
        };
        solver.restart(instance, input, time)?;
        Ok(solver)
    }

    /// Internal time reached by the last accepted step.
    pub fn current_time(&self) -> f64 {
        self.t
    }

    pub fn order(&self) -> usize {
        self.order
    }

    /// Accepted internal steps since construction.
    pub fn steps(&self) -> usize {
        self.steps
    }

    fn restart<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
    ) -> SimResult<()> {
        let n = self.nx.max(1);
        let mut y0 = DVector::zeros(n);
        if self.nx > 0 {
            instance.get_continuous_states(y0.as_mut_slice())?;
        }

        let mut f0 = DVector::zeros(n);
        self.rhs(instance, input, time, &y0, &mut f0)?;
        if f0.iter().any(|v| !v.is_finite()) {
            return Err(SimError::SolverFailure {
                what: "non-finite derivatives",
                time,
            });
        }

        self.t = time;
        self.h_abs = match self.options.first_step {
            Some(h) => h.min(self.options.max_step),
            None => self.initial_step(instance, input, time, &y0, &f0)?,
        };
        self.jac = self.jacobian(instance, input, time, &y0, &f0)?;
        for d in &mut self.d {
            d.fill(0.0);
        }
        self.d[0].copy_from(&y0);
        self.d[1] = &f0 * self.h_abs;
        self.order = 1;
        self.n_equal_steps = 0;
        self.lu = None;

        self.load(instance, input, time, &y0)?;
        tracing::trace!(time, h = self.h_abs, "bdf restart");
        Ok(())
    }

    /// Put `y` at `time` into the instance, with continuous inputs applied.
    fn load<I: ModelInstance + ?Sized>(
        &self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
        y: &DVector<f64>,
    ) -> SimResult<()> {
        instance.set_time(time)?;
        if self.nx > 0 {
            instance.set_continuous_states(y.as_slice())?;
        }
        input.apply_continuous(instance, time)?;
        Ok(())
    }

    fn rhs<I: ModelInstance + ?Sized>(
        &self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
        y: &DVector<f64>,
        f: &mut DVector<f64>,
    ) -> SimResult<()> {
        self.load(instance, input, time, y)?;
        if self.nx > 0 {
            instance.get_derivatives(f.as_mut_slice())?;
        } else {
            f.fill(0.0);
        }
        Ok(())
    }

    fn indicators<I: ModelInstance + ?Sized>(
        &self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
        z: &mut [f64],
    ) -> SimResult<()> {
        let y = self.dense(time);
        self.load(instance, input, time, &y)?;
        instance.get_event_indicators(z)?;
        Ok(())
    }

    fn initial_step<I: ModelInstance + ?Sized>(
        &self,
        instance: &mut I,
        input: &mut InputSignal,
        t0: f64,
        y0: &DVector<f64>,
        f0: &DVector<f64>,
    ) -> SimResult<f64> {
        let rtol = self.options.relative_tolerance;
        let interval = self.options.max_step;
        let scale = y0.map(|y| self.atol + y.abs() * rtol);
        let d0 = rms(y0, &scale);
        let d1 = rms(f0, &scale);
        let h0 = if d0 < 1e-5 || d1 < 1e-5 {
            1e-6
        } else {
            0.01 * d0 / d1
        }
        .min(interval);

        let y1 = y0 + f0 * h0;
        let mut f1 = DVector::zeros(y0.len());
        self.rhs(instance, input, t0 + h0, &y1, &mut f1)?;
        let d2 = rms(&(&f1 - f0), &scale) / h0;

        let h1 = if d1 <= 1e-15 && d2 <= 1e-15 {
            (h0 * 1e-3).max(1e-6)
        } else {
            (0.01 / d1.max(d2)).powf(0.5)
        };
        Ok((100.0 * h0).min(h1).min(interval))
    }

    fn jacobian<I: ModelInstance + ?Sized>(
        &self,
        instance: &mut I,
        input: &mut InputSignal,
        t: f64,
        y: &DVector<f64>,
        f: &DVector<f64>,
    ) -> SimResult<DMatrix<f64>> {
        let n = y.len();
        let mut jac = DMatrix::zeros(n, n);
        if self.nx == 0 {
            return Ok(jac);
        }
        let mut y_pert = y.clone();
        let mut f_pert = DVector::zeros(n);
        let eps = f64::EPSILON.sqrt();
        for j in 0..n {
            let dx = eps * y[j].abs().max(1.0);
            y_pert[j] = y[j] + dx;
            self.rhs(instance, input, t, &y_pert, &mut f_pert)?;
            for i in 0..n {
                jac[(i, j)] = (f_pert[i] - f[i]) / dx;
            }
            y_pert[j] = y[j];
        }
        Ok(jac)
    }

    fn change_d(&mut self, factor: f64) {
        let order = self.order;
        let ru = compute_r(order, factor) * compute_r(order, 1.0);
        let old: Vec<DVector<f64>> = self.d[..=order].to_vec();
        for (i, d) in self.d[..=order].iter_mut().enumerate() {
            d.fill(0.0);
            for (k, dk) in old.iter().enumerate() {
                d.axpy(ru[(k, i)], dk, 1.0);
            }
        }
    }

    /// Value of the interpolating polynomial of the last step at `t`.
    fn dense(&self, t: f64) -> DVector<f64> {
        let mut y = self.d[0].clone();
        let mut p = 1.0;
        for j in 0..self.order {
            let shift = self.t - self.h_abs * j as f64;
            let denom = self.h_abs * (1.0 + j as f64);
            p *= (t - shift) / denom;
            y.axpy(p, &self.d[j + 1], 1.0);
        }
        y
    }

    /// Simplified Newton iteration on the corrector.
    #[allow(clippy::too_many_arguments)]
    fn solve_system<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        t_new: f64,
        y_predict: &DVector<f64>,
        c: f64,
        psi: &DVector<f64>,
        scale: &DVector<f64>,
    ) -> SimResult<(bool, usize, DVector<f64>, DVector<f64>)> {
        let n = y_predict.len();
        let mut d = DVector::zeros(n);
        let mut y = y_predict.clone();
        let mut f = std::mem::replace(&mut self.f_buf, DVector::zeros(0));
        let mut dy_norm_old: Option<f64> = None;
        let mut converged = false;
        let mut iterations = 0;

        for k in 0..NEWTON_MAXITER {
            iterations = k + 1;
            self.rhs(instance, input, t_new, &y, &mut f)?;
            if f.iter().any(|v| !v.is_finite()) {
                break;
            }
            let rhs = &f * c - psi - &d;
            let Some(dy) = self.lu.as_ref().and_then(|lu| lu.solve(&rhs)) else {
                break;
            };
            let dy_norm = rms(&dy, scale);
            let rate = dy_norm_old.map(|old| dy_norm / old);
            if let Some(rate) = rate
                && (rate >= 1.0
                    || rate.powi((NEWTON_MAXITER - k) as i32) / (1.0 - rate) * dy_norm
                        > self.newton_tol)
            {
                break;
            }
            y += &dy;
            d += &dy;
            if dy_norm == 0.0
                || rate.is_some_and(|rate| rate / (1.0 - rate) * dy_norm < self.newton_tol)
            {
                converged = true;
                break;
            }
            dy_norm_old = Some(dy_norm);
        }

        self.f_buf = f;
        Ok((converged, iterations, y, d))
    }

    /// One accepted internal step, never past `t_bound`.
    fn step_internal<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        t_bound: f64,
    ) -> SimResult<()> {
        let t = self.t;
        let rtol = self.options.relative_tolerance;
        let max_step = self.options.max_step;
        let min_step = 10.0 * spacing(t);

        if self.h_abs > max_step {
            self.change_d(max_step / self.h_abs);
            self.h_abs = max_step;
            self.n_equal_steps = 0;
            self.lu = None;
        } else if self.h_abs < min_step {
            self.change_d(min_step / self.h_abs);
            self.h_abs = min_step;
            self.n_equal_steps = 0;
            self.lu = None;
        }

        let mut h_abs = self.h_abs;
        let mut current_jac = false;

        let (t_new, d, error_norm, safety, scale) = loop {
            if h_abs < min_step {
                return Err(SimError::SolverFailure {
                    what: "step size too small",
                    time: t,
                });
            }

            let mut t_new = t + h_abs;
            if t_new > t_bound {
                t_new = t_bound;
                self.change_d((t_new - t) / h_abs);
                self.n_equal_steps = 0;
                self.lu = None;
            }
            let h = t_new - t;
            h_abs = h;
            self.h_abs = h_abs;

            let order = self.order;
            let mut y_predict = self.d[0].clone();
            for dk in &self.d[1..=order] {
                y_predict += dk;
            }
            let scale = y_predict.map(|y| self.atol + rtol * y.abs());
            let mut psi = DVector::zeros(y_predict.len());
            for (dk, g) in self.d[1..=order].iter().zip(&self.gamma[1..=order]) {
                psi.axpy(*g, dk, 1.0);
            }
            psi /= self.alpha[order];
            let c = h / self.alpha[order];

            let outcome = loop {
                if self.lu.is_none() {
                    let n = self.jac.nrows();
                    self.lu = Some((DMatrix::identity(n, n) - &self.jac * c).lu());
                }
                let outcome =
                    self.solve_system(instance, input, t_new, &y_predict, c, &psi, &scale)?;
                if outcome.0 || current_jac {
                    break outcome;
                }
                let mut f = DVector::zeros(y_predict.len());
                self.rhs(instance, input, t_new, &y_predict, &mut f)?;
                self.jac = self.jacobian(instance, input, t_new, &y_predict, &f)?;
                self.lu = None;
                current_jac = true;
            };
            let (converged, n_iter, y_new, d) = outcome;

            if !converged {
                h_abs *= 0.5;
                self.change_d(0.5);
                self.h_abs = h_abs;
                self.n_equal_steps = 0;
                self.lu = None;
                continue;
            }

            let safety = 0.9 * (2 * NEWTON_MAXITER + 1) as f64
                / (2 * NEWTON_MAXITER + n_iter) as f64;
            let scale = y_new.map(|y| self.atol + rtol * y.abs());
            let error = &d * self.error_const[order];
            let error_norm = rms(&error, &scale);

            if error_norm > 1.0 {
                let factor =
                    MIN_FACTOR.max(safety * error_norm.powf(-1.0 / (order as f64 + 1.0)));
                h_abs *= factor;
                self.change_d(factor);
                self.h_abs = h_abs;
                self.n_equal_steps = 0;
                self.lu = None;
                continue;
            }

            break (t_new, d, error_norm, safety, scale);
        };

        self.n_equal_steps += 1;
        self.steps += 1;
        self.t = t_new;
        self.h_abs = h_abs;

        let order = self.order;
        self.d[order + 2] = &d - &self.d[order + 1];
        self.d[order + 1] = d;
        for i in (0..=order).rev() {
            let next = self.d[i + 1].clone();
            self.d[i] += next;
        }
        tracing::trace!(t = t_new, h = h_abs, order, error_norm, "bdf step");

        if self.n_equal_steps < order + 1 {
            return Ok(());
        }

        let error_m_norm = if order > 1 {
            rms(&(&self.d[order] * self.error_const[order - 1]), &scale)
        } else {
            f64::INFINITY
        };
        let error_p_norm = if order < MAX_ORDER {
            rms(&(&self.d[order + 2] * self.error_const[order + 1]), &scale)
        } else {
            f64::INFINITY
        };

        let norms = [error_m_norm, error_norm, error_p_norm];
        let mut best = 1;
        let mut best_factor = f64::NEG_INFINITY;
        for (i, norm) in norms.iter().enumerate() {
            let exponent = -1.0 / (order as f64 + i as f64);
            let factor = norm.powf(exponent);
            if factor > best_factor {
                best_factor = factor;
                best = i;
            }
        }

        self.order = order + best - 1;
        let factor = MAX_FACTOR.min(safety * best_factor);
        self.h_abs *= factor;
        self.change_d(factor);
        self.n_equal_steps = 0;
        self.lu = None;
        Ok(())
    }
}

impl Solver for BdfSolver {
    fn step<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        t: f64,
        t_next: f64,
    ) -> SimResult<SolverStep> {
        if self.nz > 0 {
            instance.get_event_indicators(&mut self.z_lo)?;
        }
        let mut t_lo = t;
        let mut internal_steps = 0;

        loop {
            if self.t < t_next {
                internal_steps += 1;
                if internal_steps > self.options.max_internal_steps {
                    return Err(SimError::SolverFailure {
                        what: "too many internal steps",
                        time: self.t,
                    });
                }
                self.step_internal(instance, input, t_next)?;
            }
            let t_hi = self.t.min(t_next);

            if self.nz > 0 && t_hi > t_lo {
                let mut z_hi = std::mem::take(&mut self.z_hi);
                self.indicators(instance, input, t_hi, &mut z_hi)?;
                let crossed = any_crossing(&self.z_lo, &z_hi);
                self.z_hi = z_hi;

                if crossed {
                    let tolerance = 100.0 * f64::EPSILON * (t_hi.abs() + (t_hi - t_lo));
                    let (t_root, roots) =
                        illinois(t_lo, &self.z_lo, t_hi, &self.z_hi, tolerance, |tm, z| {
                            self.indicators(instance, input, tm, z)
                        })?;
                    let y = self.dense(t_root);
                    self.load(instance, input, t_root, &y)?;
                    tracing::trace!(time = t_root, ?roots, "state event located");
                    return Ok(SolverStep {
                        state_event: true,
                        roots,
                        time: t_root,
                    });
                }
                self.z_lo.copy_from_slice(&self.z_hi);
            }

            t_lo = t_hi;
            if t_hi >= t_next {
                break;
            }
        }

        let y = self.dense(t_next);
        self.load(instance, input, t_next, &y)?;
        Ok(SolverStep {
            state_event: false,
            roots: Vec::new(),
            time: t_next,
        })
    }

    fn reset<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        input: &mut InputSignal,
        time: f64,
    ) -> SimResult<()> {
        self.restart(instance, input, time)
    }

    fn is_fixed_step(&self) -> bool {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coefficients_match_the_formulas() {
        let r = compute_r(2, 1.0);
        // identity rescaling is an involution: R(1) * R(1) = I
        let ru = &r * &r;
        for i in 0..3 {
            for j in 0..3 {
                let expected = if i == j { 1.0 } else { 0.0 };
                assert!((ru[(i, j)] - expected).abs() < 1e-12);
            }
        }
    }

    #[test]
    fn rms_norm_is_scaled() {
        let v = DVector::from_vec(vec![3.0, 4.0]);
        let s = DVector::from_vec(vec![1.0, 2.0]);
        assert!((rms(&v, &s) - 6.5f64.sqrt()).abs() < 1e-12);
    }
}
