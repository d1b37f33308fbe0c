//! Model factories and lookup by name.

use crate::bouncing_ball::BouncingBall;
use crate::dahlquist::Dahlquist;
use crate::error::{ReferenceError, ReferenceResult};
use crate::feedthrough::Feedthrough;
use crate::instance::ReferenceInstance;
use crate::stair::Stair;
use crate::traits::ReferenceModel;
use crate::van_der_pol::VanDerPol;
use co_model::{
    Capabilities, InstanceConfig, InstanceError, InstanceResult, InterfaceType, Model,
    ModelDescription, ModelInstance,
};
use std::marker::PhantomData;

pub const MODEL_NAMES: [&str; 5] = ["BouncingBall", "Dahlquist", "Feedthrough", "Stair", "VanDerPol"];

/// Which generation of the co-simulation interface an instance mimics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum CoSimulationFlavor {
    /// Event mode, early return and variable step sizes.
    #[default]
    Modern,
    /// No event mode; termination inside `do_step` is reported as a discard.
    Legacy,
}

impl CoSimulationFlavor {
    pub fn capabilities(self, description: &ModelDescription) -> Capabilities {
        let can_interpolate_inputs = description
            .co_simulation
            .is_some_and(|cs| cs.can_interpolate_inputs);
        match self {
            Self::Modern => Capabilities {
                needs_completed_integrator_step: false,
                can_handle_variable_communication_step_size: true,
                has_event_mode: true,
                provides_early_return: true,
                can_interpolate_inputs,
                reports_discard_status: false,
            },
            Self::Legacy => Capabilities {
                needs_completed_integrator_step: false,
                can_handle_variable_communication_step_size: true,
                has_event_mode: false,
                provides_early_return: false,
                can_interpolate_inputs,
                reports_discard_status: true,
            },
        }
    }
}

/// [`Model`] implementation for one reference model type.
#[derive(Debug, Clone)]
pub struct ReferenceFactory<M> {
    description: ModelDescription,
    co_simulation: Capabilities,
    _model: PhantomData<fn() -> M>,
}

impl<M: ReferenceModel> Default for ReferenceFactory<M> {
    fn default() -> Self {
        Self::new()
    }
}

impl<M: ReferenceModel> ReferenceFactory<M> {
    pub fn new() -> Self {
        Self::with_flavor(CoSimulationFlavor::Modern)
    }

    pub fn with_flavor(flavor: CoSimulationFlavor) -> Self {
        let description = M::description();
        let co_simulation = flavor.capabilities(&description);
        Self {
            description,
            co_simulation,
            _model: PhantomData,
        }
    }

    /// Override the co-simulation capabilities, e.g. to disable variable
    /// communication step sizes.
    pub fn with_capabilities(mut self, capabilities: Capabilities) -> Self {
        self.co_simulation = capabilities;
        self
    }

    /// Typed instantiation, for callers that want to inspect the model.
    pub fn instantiate_reference(
        &self,
        config: InstanceConfig,
    ) -> InstanceResult<ReferenceInstance<M>> {
        let supported = match config.interface {
            InterfaceType::ModelExchange => self.description.model_exchange,
            InterfaceType::CoSimulation => self.description.co_simulation.is_some(),
        };
        if !supported {
            return Err(InstanceError::Instantiation {
                message: format!(
                    "{} does not support {:?}",
                    self.description.model_name, config.interface
                ),
            });
        }
        if config.event_mode_used && !self.co_simulation.has_event_mode {
            return Err(InstanceError::Instantiation {
                message: format!("{} has no event mode", self.description.model_name),
            });
        }
        Ok(ReferenceInstance::new(
            &self.description,
            self.co_simulation,
            config,
        ))
    }
}

impl<M: ReferenceModel> Model for ReferenceFactory<M> {
    fn description(&self) -> &ModelDescription {
        &self.description
    }

    fn instantiate(&self, config: InstanceConfig) -> InstanceResult<Box<dyn ModelInstance>> {
        Ok(Box::new(self.instantiate_reference(config)?))
    }
}

/// Look up a reference model by its model name.
pub fn model_by_name(name: &str, flavor: CoSimulationFlavor) -> ReferenceResult<Box<dyn Model>> {
    let model: Box<dyn Model> = match name {
        "BouncingBall" => Box::new(ReferenceFactory::<BouncingBall>::with_flavor(flavor)),
        "Dahlquist" => Box::new(ReferenceFactory::<Dahlquist>::with_flavor(flavor)),
        "Feedthrough" => Box::new(ReferenceFactory::<Feedthrough>::with_flavor(flavor)),
        "Stair" => Box::new(ReferenceFactory::<Stair>::with_flavor(flavor)),
        "VanDerPol" => Box::new(ReferenceFactory::<VanDerPol>::with_flavor(flavor)),
        _ => {
            return Err(ReferenceError::UnknownModel {
                name: name.to_string(),
            });
        }
    };
    Ok(model)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_name_resolves() {
        for name in MODEL_NAMES {
            let model = model_by_name(name, CoSimulationFlavor::Modern).unwrap();
            assert_eq!(model.description().model_name, name);
        }
        assert!(model_by_name("Pendulum", CoSimulationFlavor::Modern).is_err());
    }

    #[test]
    fn legacy_flavor_reports_discard() {
        let factory = ReferenceFactory::<Stair>::with_flavor(CoSimulationFlavor::Legacy);
        let inst = factory
            .instantiate(InstanceConfig::new("stair", InterfaceType::CoSimulation))
            .unwrap();
        let caps = inst.capabilities();
        assert!(caps.reports_discard_status);
        assert!(!caps.has_event_mode);
    }

    #[test]
    fn event_mode_requires_capability() {
        let factory = ReferenceFactory::<Stair>::with_flavor(CoSimulationFlavor::Legacy);
        let config =
            InstanceConfig::new("stair", InterfaceType::CoSimulation).with_event_mode(true);
        assert!(matches!(
            factory.instantiate(config),
            Err(InstanceError::Instantiation { .. })
        ));
    }
}
