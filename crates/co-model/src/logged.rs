//! Call logging wrapper around any model instance.

use crate::error::InstanceResult;
use crate::instance::{
    Capabilities, CompletedIntegratorStep, DiscreteStatesUpdate, DoStepOutcome, ModelInstance,
};
use crate::value::{Values, ValuesMut};
use co_core::ValueReference;
use std::fmt::Debug;

/// Forwards every call to the wrapped instance and traces its arguments and
/// result at debug level.
#[derive(Debug)]
pub struct LoggedInstance<I> {
    inner: I,
}

impl<I: ModelInstance> LoggedInstance<I> {
    pub fn new(inner: I) -> Self {
        Self { inner }
    }

    pub fn into_inner(self) -> I {
        self.inner
    }

    pub fn inner(&self) -> &I {
        &self.inner
    }

    fn trace<T: Debug>(&self, function: &str, args: &str, result: InstanceResult<T>) -> InstanceResult<T> {
        match &result {
            Ok(value) => tracing::debug!(
                instance = self.inner.instance_name(),
                "{function}({args}) -> {value:?}"
            ),
            Err(err) => tracing::debug!(
                instance = self.inner.instance_name(),
                "{function}({args}) -> {err}"
            ),
        }
        result
    }
}

fn format_vrs(vrs: &[ValueReference]) -> String {
    let parts: Vec<String> = vrs.iter().map(|vr| vr.get().to_string()).collect();
    format!("[{}]", parts.join(", "))
}

impl<I: ModelInstance> ModelInstance for LoggedInstance<I> {
    fn instance_name(&self) -> &str {
        self.inner.instance_name()
    }

    fn capabilities(&self) -> Capabilities {
        self.inner.capabilities()
    }

    fn number_of_continuous_states(&self) -> usize {
        self.inner.number_of_continuous_states()
    }

    fn number_of_event_indicators(&self) -> usize {
        self.inner.number_of_event_indicators()
    }

    fn enter_initialization_mode(
        &mut self,
        tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> InstanceResult<()> {
        let result = self
            .inner
            .enter_initialization_mode(tolerance, start_time, stop_time);
        self.trace(
            "enter_initialization_mode",
            &format!("tolerance={tolerance:?}, start_time={start_time}, stop_time={stop_time:?}"),
            result,
        )
    }

    fn exit_initialization_mode(&mut self) -> InstanceResult<()> {
        let result = self.inner.exit_initialization_mode();
        self.trace("exit_initialization_mode", "", result)
    }

    fn set_time(&mut self, time: f64) -> InstanceResult<()> {
        let result = self.inner.set_time(time);
        self.trace("set_time", &format!("time={time}"), result)
    }

    fn get_continuous_states(&mut self, x: &mut [f64]) -> InstanceResult<()> {
        let result = self.inner.get_continuous_states(x);
        self.trace("get_continuous_states", &format!("x={x:?}"), result)
    }

    fn set_continuous_states(&mut self, x: &[f64]) -> InstanceResult<()> {
        let result = self.inner.set_continuous_states(x);
        self.trace("set_continuous_states", &format!("x={x:?}"), result)
    }

    fn get_derivatives(&mut self, dx: &mut [f64]) -> InstanceResult<()> {
        let result = self.inner.get_derivatives(dx);
        self.trace("get_derivatives", &format!("dx={dx:?}"), result)
    }

    fn get_event_indicators(&mut self, z: &mut [f64]) -> InstanceResult<()> {
        let result = self.inner.get_event_indicators(z);
        self.trace("get_event_indicators", &format!("z={z:?}"), result)
    }

    fn completed_integrator_step(
        &mut self,
        no_set_state_prior: bool,
    ) -> InstanceResult<CompletedIntegratorStep> {
        let result = self.inner.completed_integrator_step(no_set_state_prior);
        self.trace(
            "completed_integrator_step",
            &format!("no_set_state_prior={no_set_state_prior}"),
            result,
        )
    }

    fn enter_event_mode(&mut self) -> InstanceResult<()> {
        let result = self.inner.enter_event_mode();
        self.trace("enter_event_mode", "", result)
    }

    fn update_discrete_states(&mut self) -> InstanceResult<DiscreteStatesUpdate> {
        let result = self.inner.update_discrete_states();
        self.trace("update_discrete_states", "", result)
    }

    fn enter_continuous_time_mode(&mut self) -> InstanceResult<()> {
        let result = self.inner.enter_continuous_time_mode();
        self.trace("enter_continuous_time_mode", "", result)
    }

    fn enter_step_mode(&mut self) -> InstanceResult<()> {
        let result = self.inner.enter_step_mode();
        self.trace("enter_step_mode", "", result)
    }

    fn do_step(
        &mut self,
        current_time: f64,
        step_size: f64,
        no_set_state_prior: bool,
    ) -> InstanceResult<DoStepOutcome> {
        let result = self
            .inner
            .do_step(current_time, step_size, no_set_state_prior);
        self.trace(
            "do_step",
            &format!(
                "current_time={current_time}, step_size={step_size}, no_set_state_prior={no_set_state_prior}"
            ),
            result,
        )
    }

    fn get_values(&mut self, vrs: &[ValueReference], mut values: ValuesMut<'_>) -> InstanceResult<()> {
        let ty = values.variable_type();
        let result = self.inner.get_values(vrs, values.reborrow());
        self.trace(
            "get_values",
            &format!("type={}, vr={}, values={values:?}", ty.name(), format_vrs(vrs)),
            result,
        )
    }

    fn set_values(&mut self, vrs: &[ValueReference], values: Values<'_>) -> InstanceResult<()> {
        let result = self.inner.set_values(vrs, values);
        self.trace(
            "set_values",
            &format!(
                "type={}, vr={}, values={values:?}",
                values.variable_type().name(),
                format_vrs(vrs)
            ),
            result,
        )
    }

    fn set_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        order: u32,
        values: &[f64],
    ) -> InstanceResult<()> {
        let result = self.inner.set_input_derivatives(vrs, order, values);
        self.trace(
            "set_input_derivatives",
            &format!("vr={}, order={order}, values={values:?}", format_vrs(vrs)),
            result,
        )
    }

    fn terminated_status(&mut self) -> InstanceResult<bool> {
        let result = self.inner.terminated_status();
        self.trace("terminated_status", "", result)
    }

    fn last_successful_time(&mut self) -> InstanceResult<f64> {
        let result = self.inner.last_successful_time();
        self.trace("last_successful_time", "", result)
    }

    fn terminate(&mut self) -> InstanceResult<()> {
        let result = self.inner.terminate();
        self.trace("terminate", "", result)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::InstanceError;

    /// Scalar decay `x' = -x` with a single float parameter at vr 1.
    struct Decay {
        time: f64,
        x: f64,
        k: f64,
    }

    impl ModelInstance for Decay {
        fn instance_name(&self) -> &str {
            "decay"
        }

        fn capabilities(&self) -> Capabilities {
            Capabilities::default()
        }

        fn number_of_continuous_states(&self) -> usize {
            1
        }

        fn number_of_event_indicators(&self) -> usize {
            0
        }

        fn enter_initialization_mode(
            &mut self,
            _tolerance: Option<f64>,
            start_time: f64,
            _stop_time: Option<f64>,
        ) -> InstanceResult<()> {
            self.time = start_time;
            Ok(())
        }

        fn exit_initialization_mode(&mut self) -> InstanceResult<()> {
            Ok(())
        }

        fn set_time(&mut self, time: f64) -> InstanceResult<()> {
            self.time = time;
            Ok(())
        }

        fn get_continuous_states(&mut self, x: &mut [f64]) -> InstanceResult<()> {
            x[0] = self.x;
            Ok(())
        }

        fn set_continuous_states(&mut self, x: &[f64]) -> InstanceResult<()> {
            self.x = x[0];
            Ok(())
        }

        fn get_derivatives(&mut self, dx: &mut [f64]) -> InstanceResult<()> {
            dx[0] = -self.k * self.x;
            Ok(())
        }

        fn get_event_indicators(&mut self, _z: &mut [f64]) -> InstanceResult<()> {
            Ok(())
        }

        fn completed_integrator_step(
            &mut self,
            _no_set_state_prior: bool,
        ) -> InstanceResult<CompletedIntegratorStep> {
            Ok(CompletedIntegratorStep::default())
        }

        fn enter_event_mode(&mut self) -> InstanceResult<()> {
            Ok(())
        }

        fn update_discrete_states(&mut self) -> InstanceResult<DiscreteStatesUpdate> {
            Ok(DiscreteStatesUpdate::default())
        }

        fn enter_continuous_time_mode(&mut self) -> InstanceResult<()> {
            Ok(())
        }

        fn enter_step_mode(&mut self) -> InstanceResult<()> {
            Err(InstanceError::Unsupported {
                function: "enter_step_mode",
            })
        }

        fn do_step(&mut self, _t: f64, _h: f64, _n: bool) -> InstanceResult<DoStepOutcome> {
            Err(InstanceError::Unsupported { function: "do_step" })
        }

        fn get_values(
            &mut self,
            vrs: &[ValueReference],
            values: ValuesMut<'_>,
        ) -> InstanceResult<()> {
            match values {
                ValuesMut::Float64(out) => {
                    for (vr, slot) in vrs.iter().zip(out.iter_mut()) {
                        *slot = if vr.get() == 1 { self.k } else { self.x };
                    }
                    Ok(())
                }
                _ => Err(InstanceError::TypeMismatch {
                    function: "get_values",
                    vr: vrs.first().copied().unwrap_or(ValueReference(0)),
                    expected: crate::VariableType::Float64,
                }),
            }
        }

        fn set_values(&mut self, _vrs: &[ValueReference], values: Values<'_>) -> InstanceResult<()> {
            if let Values::Float64(v) = values {
                self.k = v[0];
            }
            Ok(())
        }

        fn terminate(&mut self) -> InstanceResult<()> {
            Ok(())
        }
    }

    #[test]
    fn forwards_calls_and_results() {
        let mut inst = LoggedInstance::new(Decay {
            time: 0.0,
            x: 2.0,
            k: 1.0,
        });

        inst.enter_initialization_mode(None, 1.5, None).unwrap();
        assert_eq!(inst.inner().time, 1.5);

        inst.set_values(&[ValueReference(1)], Values::Float64(&[3.0]))
            .unwrap();
        let mut dx = [0.0];
        inst.get_derivatives(&mut dx).unwrap();
        assert_eq!(dx, [-6.0]);

        let mut out = [0.0; 2];
        inst.get_values(
            &[ValueReference(1), ValueReference(0)],
            ValuesMut::Float64(&mut out),
        )
        .unwrap();
        assert_eq!(out, [3.0, 2.0]);
    }

    #[test]
    fn forwards_errors_unchanged() {
        let mut inst = LoggedInstance::new(Decay {
            time: 0.0,
            x: 0.0,
            k: 1.0,
        });
        let err = inst.do_step(0.0, 0.1, true).unwrap_err();
        assert_eq!(err, InstanceError::Unsupported { function: "do_step" });
        assert!(inst.terminated_status().is_err());
    }
}
