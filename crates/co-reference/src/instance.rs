//! Lifecycle state machine shared by all reference models.

use crate::common::{EPSILON_TIME, crossed, time_reached};
use crate::traits::{EventUpdate, ReferenceModel};
use co_model::error::ensure_len;
use co_model::{
    Capabilities, Causality, CompletedIntegratorStep, DiscreteStatesUpdate, DoStepOutcome,
    Initial, InstanceConfig, InstanceError, InstanceResult, InterfaceType, ModelDescription,
    ModelInstance, ScalarValue, Status, ValueReference, Values, ValuesMut, Variability,
    VariableType,
};
use std::collections::BTreeMap;

/// Fallback internal step for co-simulation when the metadata names none.
pub const DEFAULT_FIXED_STEP: f64 = 1e-3;

/// Lifecycle state of a reference instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Instantiated,
    InitializationMode,
    EventMode,
    ContinuousTimeMode,
    StepMode,
    Terminated,
}

impl Mode {
    pub fn name(self) -> &'static str {
        match self {
            Mode::Instantiated => "Instantiated",
            Mode::InitializationMode => "InitializationMode",
            Mode::EventMode => "EventMode",
            Mode::ContinuousTimeMode => "ContinuousTimeMode",
            Mode::StepMode => "StepMode",
            Mode::Terminated => "Terminated",
        }
    }
}

#[derive(Debug, Clone, Copy)]
struct VariableInfo {
    variable_type: VariableType,
    causality: Causality,
    variability: Variability,
    initial: Option<Initial>,
}

/// First-order extrapolation of a continuous input inside `do_step`.
#[derive(Debug, Clone, Copy)]
struct InputRamp {
    vr: ValueReference,
    base_value: f64,
    base_time: f64,
    slope: f64,
}

/// A [`ReferenceModel`] behind the full instance lifecycle.
///
/// Model exchange exposes the equations directly. Co-simulation integrates
/// them with a fixed-step explicit Euler scheme and handles state and time
/// events at internal step boundaries.
#[derive(Debug)]
pub struct ReferenceInstance<M> {
    model: M,
    config: InstanceConfig,
    capabilities: Capabilities,
    variables: BTreeMap<ValueReference, VariableInfo>,
    nx: usize,
    nz: usize,
    fixed_step: f64,
    mode: Mode,
    time: f64,
    stop_time: Option<f64>,
    next_event_time: Option<f64>,
    x: Vec<f64>,
    dx: Vec<f64>,
    z: Vec<f64>,
    pre_z: Vec<f64>,
    ramps: Vec<InputRamp>,
    terminated: bool,
    last_successful_time: f64,
}

impl<M: ReferenceModel> ReferenceInstance<M> {
    pub fn new(
        description: &ModelDescription,
        co_simulation: Capabilities,
        config: InstanceConfig,
    ) -> Self {
        let variables = description
            .variables
            .iter()
            .map(|v| {
                (
                    v.value_reference,
                    VariableInfo {
                        variable_type: v.variable_type,
                        causality: v.causality,
                        variability: v.variability,
                        initial: v.initial,
                    },
                )
            })
            .collect();
        let capabilities = match config.interface {
            InterfaceType::ModelExchange => Capabilities {
                needs_completed_integrator_step: true,
                ..Capabilities::default()
            },
            InterfaceType::CoSimulation => co_simulation,
        };
        let fixed_step = description
            .co_simulation
            .and_then(|cs| cs.fixed_internal_step_size)
            .unwrap_or(DEFAULT_FIXED_STEP);
        let nx = description.number_of_continuous_states;
        let nz = description.number_of_event_indicators;

        let instance = Self {
            model: M::default(),
            config,
            capabilities,
            variables,
            nx,
            nz,
            fixed_step,
            mode: Mode::Instantiated,
            time: 0.0,
            stop_time: None,
            next_event_time: None,
            x: vec![0.0; nx],
            dx: vec![0.0; nx],
            z: vec![0.0; nz],
            pre_z: vec![0.0; nz],
            ramps: Vec::new(),
            terminated: false,
            last_successful_time: 0.0,
        };
        instance.log(Status::Ok, "logStatusOk", "instantiated");
        instance
    }

    pub fn mode(&self) -> Mode {
        self.mode
    }

    pub fn model(&self) -> &M {
        &self.model
    }

    pub fn time(&self) -> f64 {
        self.time
    }

    fn log(&self, status: Status, category: &str, message: &str) {
        if self.config.logging_on || status > Status::Ok {
            self.config
                .log_sink
                .log(&self.config.instance_name, status, category, message);
        }
    }

    fn require(&self, function: &'static str, allowed: &[Mode]) -> InstanceResult<()> {
        if allowed.contains(&self.mode) {
            return Ok(());
        }
        self.log(
            Status::Error,
            "logStatusError",
            &format!("{function} must not be called in {}", self.mode.name()),
        );
        Err(InstanceError::IllegalCall {
            function,
            state: self.mode.name(),
        })
    }

    fn require_interface(
        &self,
        function: &'static str,
        interface: InterfaceType,
    ) -> InstanceResult<()> {
        if self.config.interface == interface {
            Ok(())
        } else {
            Err(InstanceError::Unsupported { function })
        }
    }

    fn info(&self, function: &'static str, vr: ValueReference) -> InstanceResult<VariableInfo> {
        self.variables
            .get(&vr)
            .copied()
            .ok_or(InstanceError::UnknownValueReference { function, vr })
    }

    fn can_set(&self, info: &VariableInfo) -> bool {
        if info.variability == Variability::Constant || info.causality == Causality::Independent {
            return false;
        }
        match self.mode {
            Mode::Instantiated | Mode::InitializationMode => {
                matches!(
                    info.causality,
                    Causality::Input | Causality::Parameter | Causality::StructuralParameter
                ) || matches!(info.initial, Some(Initial::Exact | Initial::Approx))
            }
            Mode::EventMode | Mode::ContinuousTimeMode | Mode::StepMode => {
                info.causality == Causality::Input || info.variability == Variability::Tunable
            }
            Mode::Terminated => false,
        }
    }

    fn refresh_indicators(&mut self) {
        if self.nz > 0 {
            self.model.event_indicators(self.time, &mut self.pre_z);
        }
    }

    fn event_iteration(&mut self) -> EventUpdate {
        let update = self.model.event_update(self.time, self.next_event_time);
        self.next_event_time = update.next_event_time;
        self.model.calculate_values(self.time);
        self.refresh_indicators();
        if update.terminate {
            self.log(
                Status::Ok,
                "logEvents",
                &format!("termination requested at t={}", self.time),
            );
        }
        update
    }

    fn apply_ramps(&mut self, time: f64) {
        for ramp in &self.ramps {
            let value = ramp.base_value + ramp.slope * (time - ramp.base_time);
            self.model.set(ramp.vr, ScalarValue::Float64(value));
        }
    }

    /// One explicit Euler step of the internal co-simulation solver.
    /// Returns whether a state event and a time event occurred.
    fn advance(&mut self, h: f64) -> (bool, bool) {
        let t0 = self.time;
        self.apply_ramps(t0);
        self.model.calculate_values(t0);

        if self.nx > 0 {
            self.model.continuous_states(&mut self.x);
            self.model.derivatives(t0, &mut self.dx);
            for (x, dx) in self.x.iter_mut().zip(&self.dx) {
                *x += h * dx;
            }
            self.model.set_continuous_states(&self.x);
        }

        self.time = t0 + h;
        self.apply_ramps(self.time);
        self.model.calculate_values(self.time);

        let mut state_event = false;
        if self.nz > 0 {
            self.model.event_indicators(self.time, &mut self.z);
            state_event = self
                .pre_z
                .iter()
                .zip(&self.z)
                .any(|(&pre, &z)| crossed(pre, z));
            self.pre_z.copy_from_slice(&self.z);
        }

        (state_event, time_reached(self.time, self.next_event_time))
    }

    fn step_outcome(&mut self, t_next: f64, tol: f64, event: bool, terminate: bool) -> DoStepOutcome {
        self.last_successful_time = self.time;
        DoStepOutcome {
            event_handling_needed: event,
            terminate_simulation: terminate,
            early_return: self.time < t_next - tol,
            last_successful_time: self.time,
        }
    }
}

impl<M: ReferenceModel> ModelInstance for ReferenceInstance<M> {
    fn instance_name(&self) -> &str {
        &self.config.instance_name
    }

    fn capabilities(&self) -> Capabilities {
        self.capabilities
    }

    fn number_of_continuous_states(&self) -> usize {
        self.nx
    }

    fn number_of_event_indicators(&self) -> usize {
        self.nz
    }

    fn enter_initialization_mode(
        &mut self,
        _tolerance: Option<f64>,
        start_time: f64,
        stop_time: Option<f64>,
    ) -> InstanceResult<()> {
        self.require("enter_initialization_mode", &[Mode::Instantiated])?;
        self.time = start_time;
        self.stop_time = stop_time;
        self.last_successful_time = start_time;
        self.mode = Mode::InitializationMode;
        Ok(())
    }

    fn exit_initialization_mode(&mut self) -> InstanceResult<()> {
        self.require("exit_initialization_mode", &[Mode::InitializationMode])?;
        self.model.calculate_values(self.time);
        self.next_event_time = self.model.first_event_time(self.time);
        self.refresh_indicators();
        self.mode = match self.config.interface {
            InterfaceType::ModelExchange => Mode::EventMode,
            InterfaceType::CoSimulation if self.config.event_mode_used => Mode::EventMode,
            InterfaceType::CoSimulation => Mode::StepMode,
        };
        Ok(())
    }

    fn set_time(&mut self, time: f64) -> InstanceResult<()> {
        self.require_interface("set_time", InterfaceType::ModelExchange)?;
        self.require("set_time", &[Mode::EventMode, Mode::ContinuousTimeMode])?;
        self.time = time;
        Ok(())
    }

    fn get_continuous_states(&mut self, x: &mut [f64]) -> InstanceResult<()> {
        ensure_len("get_continuous_states", self.nx, x.len())?;
        if self.nx > 0 {
            self.model.continuous_states(x);
        }
        Ok(())
    }

    fn set_continuous_states(&mut self, x: &[f64]) -> InstanceResult<()> {
        self.require_interface("set_continuous_states", InterfaceType::ModelExchange)?;
        self.require("set_continuous_states", &[Mode::ContinuousTimeMode])?;
        ensure_len("set_continuous_states", self.nx, x.len())?;
        if self.nx > 0 {
            self.model.set_continuous_states(x);
        }
        Ok(())
    }

    fn get_derivatives(&mut self, dx: &mut [f64]) -> InstanceResult<()> {
        ensure_len("get_derivatives", self.nx, dx.len())?;
        if self.nx > 0 {
            self.model.derivatives(self.time, dx);
        }
        Ok(())
    }

    fn get_event_indicators(&mut self, z: &mut [f64]) -> InstanceResult<()> {
        ensure_len("get_event_indicators", self.nz, z.len())?;
        if self.nz > 0 {
            self.model.calculate_values(self.time);
            self.model.event_indicators(self.time, z);
        }
        Ok(())
    }

    fn completed_integrator_step(
        &mut self,
        _no_set_state_prior: bool,
    ) -> InstanceResult<CompletedIntegratorStep> {
        self.require("completed_integrator_step", &[Mode::ContinuousTimeMode])?;
        Ok(CompletedIntegratorStep::default())
    }

    fn enter_event_mode(&mut self) -> InstanceResult<()> {
        match self.config.interface {
            InterfaceType::ModelExchange => {
                self.require("enter_event_mode", &[Mode::ContinuousTimeMode])?
            }
            InterfaceType::CoSimulation => {
                if !(self.capabilities.has_event_mode && self.config.event_mode_used) {
                    return Err(InstanceError::Unsupported {
                        function: "enter_event_mode",
                    });
                }
                self.require("enter_event_mode", &[Mode::StepMode])?
            }
        }
        self.mode = Mode::EventMode;
        Ok(())
    }

    fn update_discrete_states(&mut self) -> InstanceResult<DiscreteStatesUpdate> {
        self.require("update_discrete_states", &[Mode::EventMode])?;
        let update = self.event_iteration();
        Ok(DiscreteStatesUpdate {
            discrete_states_need_update: false,
            terminate_simulation: update.terminate,
            nominals_of_continuous_states_changed: false,
            values_of_continuous_states_changed: update.values_changed,
            next_event_time: update.next_event_time,
        })
    }

    fn enter_continuous_time_mode(&mut self) -> InstanceResult<()> {
        self.require_interface("enter_continuous_time_mode", InterfaceType::ModelExchange)?;
        self.require("enter_continuous_time_mode", &[Mode::EventMode])?;
        self.mode = Mode::ContinuousTimeMode;
        Ok(())
    }

    fn enter_step_mode(&mut self) -> InstanceResult<()> {
        self.require_interface("enter_step_mode", InterfaceType::CoSimulation)?;
        self.require("enter_step_mode", &[Mode::EventMode])?;
        self.mode = Mode::StepMode;
        Ok(())
    }

    fn do_step(
        &mut self,
        current_time: f64,
        step_size: f64,
        _no_set_state_prior: bool,
    ) -> InstanceResult<DoStepOutcome> {
        self.require_interface("do_step", InterfaceType::CoSimulation)?;
        self.require("do_step", &[Mode::StepMode])?;
        if !step_size.is_finite() || step_size < 0.0 {
            self.log(
                Status::Error,
                "logStatusError",
                &format!("invalid communication step size {step_size}"),
            );
            return Err(InstanceError::Call {
                function: "do_step",
                status: Status::Error,
            });
        }

        let t_next = current_time + step_size;
        let tol = EPSILON_TIME * (1.0 + t_next.abs());
        if let Some(stop_time) = self.stop_time
            && t_next > stop_time + tol
        {
            self.log(
                Status::Error,
                "logStatusError",
                &format!("communication point {t_next} is beyond the stop time {stop_time}"),
            );
            return Err(InstanceError::Call {
                function: "do_step",
                status: Status::Error,
            });
        }
        self.time = current_time;
        let early_return =
            self.config.early_return_allowed && self.capabilities.provides_early_return;
        let mut event_pending = false;

        while t_next - self.time > tol {
            let remaining = t_next - self.time;
            let h = if remaining < self.fixed_step + tol {
                remaining
            } else {
                self.fixed_step
            };
            let (state_event, time_event) = self.advance(h);
            if !(state_event || time_event) {
                continue;
            }

            if self.config.event_mode_used {
                event_pending = true;
                if early_return {
                    return Ok(self.step_outcome(t_next, tol, true, false));
                }
                continue;
            }

            let update = self.event_iteration();
            if update.terminate {
                if self.capabilities.reports_discard_status {
                    self.terminated = true;
                    self.last_successful_time = self.time;
                    self.log(
                        Status::Discard,
                        "logStatusDiscard",
                        &format!("terminated at t={} during do_step", self.time),
                    );
                    return Err(InstanceError::Call {
                        function: "do_step",
                        status: Status::Discard,
                    });
                }
                return Ok(self.step_outcome(t_next, tol, false, true));
            }
            if early_return {
                return Ok(self.step_outcome(t_next, tol, false, false));
            }
        }

        self.time = t_next;
        Ok(self.step_outcome(t_next, tol, event_pending, false))
    }

    fn get_values(
        &mut self,
        vrs: &[ValueReference],
        mut values: ValuesMut<'_>,
    ) -> InstanceResult<()> {
        const FUNCTION: &str = "get_values";
        ensure_len(FUNCTION, vrs.len(), values.len())?;
        self.model.calculate_values(self.time);
        for (i, &vr) in vrs.iter().enumerate() {
            let info = self.info(FUNCTION, vr)?;
            if info.variable_type != values.variable_type() {
                return Err(InstanceError::TypeMismatch {
                    function: FUNCTION,
                    vr,
                    expected: info.variable_type,
                });
            }
            let scalar = if info.causality == Causality::Independent {
                ScalarValue::Float64(self.time)
            } else {
                self.model
                    .get(vr)
                    .ok_or(InstanceError::UnknownValueReference {
                        function: FUNCTION,
                        vr,
                    })?
            };
            if !values.store(i, scalar) {
                return Err(InstanceError::TypeMismatch {
                    function: FUNCTION,
                    vr,
                    expected: info.variable_type,
                });
            }
        }
        Ok(())
    }

    fn set_values(&mut self, vrs: &[ValueReference], values: Values<'_>) -> InstanceResult<()> {
        const FUNCTION: &str = "set_values";
        ensure_len(FUNCTION, vrs.len(), values.len())?;
        for (i, &vr) in vrs.iter().enumerate() {
            let info = self.info(FUNCTION, vr)?;
            if info.variable_type != values.variable_type() {
                return Err(InstanceError::TypeMismatch {
                    function: FUNCTION,
                    vr,
                    expected: info.variable_type,
                });
            }
            if !self.can_set(&info) {
                self.log(
                    Status::Error,
                    "logStatusError",
                    &format!("variable {vr} must not be set in {}", self.mode.name()),
                );
                return Err(InstanceError::IllegalCall {
                    function: FUNCTION,
                    state: self.mode.name(),
                });
            }
            let scalar = values.scalar(i).ok_or(InstanceError::SizeMismatch {
                function: FUNCTION,
                expected: vrs.len(),
                actual: values.len(),
            })?;
            if !self.model.set(vr, scalar) {
                return Err(InstanceError::UnknownValueReference {
                    function: FUNCTION,
                    vr,
                });
            }
            self.ramps.retain(|r| r.vr != vr);
        }
        Ok(())
    }

    fn set_input_derivatives(
        &mut self,
        vrs: &[ValueReference],
        order: u32,
        values: &[f64],
    ) -> InstanceResult<()> {
        const FUNCTION: &str = "set_input_derivatives";
        self.require_interface(FUNCTION, InterfaceType::CoSimulation)?;
        if !self.capabilities.can_interpolate_inputs {
            return Err(InstanceError::Unsupported { function: FUNCTION });
        }
        self.require(FUNCTION, &[Mode::InitializationMode, Mode::StepMode])?;
        ensure_len(FUNCTION, vrs.len(), values.len())?;
        if order != 1 {
            return Err(InstanceError::Call {
                function: FUNCTION,
                status: Status::Error,
            });
        }
        for (&vr, &slope) in vrs.iter().zip(values) {
            let info = self.info(FUNCTION, vr)?;
            if info.variable_type != VariableType::Float64
                || info.causality != Causality::Input
                || info.variability != Variability::Continuous
            {
                return Err(InstanceError::TypeMismatch {
                    function: FUNCTION,
                    vr,
                    expected: VariableType::Float64,
                });
            }
            let base_value = self
                .model
                .get(vr)
                .and_then(|v| v.as_f64())
                .ok_or(InstanceError::UnknownValueReference {
                    function: FUNCTION,
                    vr,
                })?;
            self.ramps.retain(|r| r.vr != vr);
            self.ramps.push(InputRamp {
                vr,
                base_value,
                base_time: self.time,
                slope,
            });
        }
        Ok(())
    }

    fn terminated_status(&mut self) -> InstanceResult<bool> {
        if !self.capabilities.reports_discard_status {
            return Err(InstanceError::Unsupported {
                function: "terminated_status",
            });
        }
        Ok(self.terminated)
    }

    fn last_successful_time(&mut self) -> InstanceResult<f64> {
        if !self.capabilities.reports_discard_status {
            return Err(InstanceError::Unsupported {
                function: "last_successful_time",
            });
        }
        Ok(self.last_successful_time)
    }

    fn terminate(&mut self) -> InstanceResult<()> {
        self.require(
            "terminate",
            &[
                Mode::InitializationMode,
                Mode::EventMode,
                Mode::ContinuousTimeMode,
                Mode::StepMode,
            ],
        )?;
        self.mode = Mode::Terminated;
        self.log(Status::Ok, "logStatusOk", "terminated");
        Ok(())
    }
}
