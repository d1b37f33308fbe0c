//! Integration tests driving reference instances through their lifecycle.

use co_model::{
    InstanceConfig, InstanceError, InterfaceType, LogSink, Model, ModelInstance, Status,
    ValueReference, Values, ValuesMut,
};
use co_reference::{
    BouncingBall, CoSimulationFlavor, Feedthrough, Mode, ReferenceFactory, Stair, bouncing_ball,
    feedthrough, stair,
};
use std::sync::{Arc, Mutex};

fn me_config(name: &str) -> InstanceConfig {
    InstanceConfig::new(name, InterfaceType::ModelExchange).with_log_sink(LogSink::Discard)
}

fn cs_config(name: &str) -> InstanceConfig {
    InstanceConfig::new(name, InterfaceType::CoSimulation).with_log_sink(LogSink::Discard)
}

#[test]
fn model_exchange_lifecycle() {
    let factory = ReferenceFactory::<BouncingBall>::new();
    let mut inst = factory.instantiate_reference(me_config("ball")).unwrap();
    assert_eq!(inst.mode(), Mode::Instantiated);

    inst.enter_initialization_mode(None, 0.0, Some(3.0)).unwrap();
    inst.exit_initialization_mode().unwrap();
    assert_eq!(inst.mode(), Mode::EventMode);

    let update = inst.update_discrete_states().unwrap();
    assert!(!update.discrete_states_need_update);
    assert!(!update.terminate_simulation);
    inst.enter_continuous_time_mode().unwrap();

    let mut x = [0.0; 2];
    let mut dx = [0.0; 2];
    inst.get_continuous_states(&mut x).unwrap();
    inst.get_derivatives(&mut dx).unwrap();
    assert_eq!(x, [1.0, 0.0]);
    assert_eq!(dx, [0.0, -9.81]);

    inst.set_time(0.1).unwrap();
    inst.set_continuous_states(&[0.5, -1.0]).unwrap();
    let mut z = [0.0];
    inst.get_event_indicators(&mut z).unwrap();
    assert_eq!(z, [0.5]);

    let step = inst.completed_integrator_step(true).unwrap();
    assert!(!step.enter_event_mode);

    inst.terminate().unwrap();
    assert_eq!(inst.mode(), Mode::Terminated);
}

#[test]
fn illegal_call_is_rejected_and_logged() {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        LogSink::callback(move |record| seen.lock().unwrap().push(record.status))
    };
    let factory = ReferenceFactory::<BouncingBall>::new();
    let mut inst = factory
        .instantiate(InstanceConfig::new("ball", InterfaceType::ModelExchange).with_log_sink(sink))
        .unwrap();

    let err = inst.set_continuous_states(&[0.0, 0.0]).unwrap_err();
    assert!(matches!(err, InstanceError::IllegalCall { state: "Instantiated", .. }));
    assert_eq!(err.status(), Status::Error);
    assert_eq!(seen.lock().unwrap().as_slice(), &[Status::Error]);
}

#[test]
fn typed_values_are_checked() {
    let factory = ReferenceFactory::<Stair>::new();
    let mut inst = factory.instantiate(me_config("stair")).unwrap();

    let mut reals = [0.0];
    let err = inst
        .get_values(&[ValueReference(stair::COUNTER)], ValuesMut::Float64(&mut reals))
        .unwrap_err();
    assert!(matches!(err, InstanceError::TypeMismatch { .. }));

    let mut ints = [0];
    inst.get_values(&[ValueReference(stair::COUNTER)], ValuesMut::Int32(&mut ints))
        .unwrap();
    assert_eq!(ints, [1]);

    let err = inst
        .get_values(&[ValueReference(99)], ValuesMut::Int32(&mut ints))
        .unwrap_err();
    assert!(matches!(err, InstanceError::UnknownValueReference { .. }));
}

#[test]
fn fixed_parameters_only_settable_before_initialization() {
    let factory = ReferenceFactory::<BouncingBall>::new();
    let mut inst = factory.instantiate(me_config("ball")).unwrap();
    let g = [ValueReference(bouncing_ball::G)];

    inst.set_values(&g, Values::Float64(&[-1.62])).unwrap();
    inst.enter_initialization_mode(None, 0.0, None).unwrap();
    inst.exit_initialization_mode().unwrap();

    let err = inst.set_values(&g, Values::Float64(&[-9.81])).unwrap_err();
    assert!(matches!(err, InstanceError::IllegalCall { .. }));

    // tunable parameters may change in event mode
    inst.set_values(&[ValueReference(bouncing_ball::E)], Values::Float64(&[0.5]))
        .unwrap();
}

#[test]
fn co_simulation_steps_to_communication_point() {
    let factory = ReferenceFactory::<BouncingBall>::new();
    let mut inst = factory.instantiate(cs_config("ball")).unwrap();
    inst.enter_initialization_mode(None, 0.0, Some(3.0)).unwrap();
    inst.exit_initialization_mode().unwrap();

    let outcome = inst.do_step(0.0, 0.1, true).unwrap();
    assert!(!outcome.early_return);
    assert!((outcome.last_successful_time - 0.1).abs() < 1e-12);

    let mut h = [0.0];
    inst.get_values(&[ValueReference(bouncing_ball::H)], ValuesMut::Float64(&mut h))
        .unwrap();
    // explicit Euler with 1 ms steps lags the exact solution slightly
    assert!((h[0] - (1.0 - 0.5 * 9.81 * 0.01)).abs() < 1e-2);
}

#[test]
fn co_simulation_returns_early_on_events() {
    let factory = ReferenceFactory::<BouncingBall>::new();
    let mut inst = factory
        .instantiate(cs_config("ball").with_early_return(true))
        .unwrap();
    inst.enter_initialization_mode(None, 0.0, Some(3.0)).unwrap();
    inst.exit_initialization_mode().unwrap();

    let outcome = inst.do_step(0.0, 1.0, true).unwrap();
    assert!(outcome.early_return);
    // first impact at sqrt(2 / 9.81) ~ 0.4515 s
    assert!((outcome.last_successful_time - 0.4515).abs() < 5e-3);
}

#[test]
fn legacy_co_simulation_discards_on_termination() {
    let factory = ReferenceFactory::<Stair>::with_flavor(CoSimulationFlavor::Legacy);
    let mut inst = factory.instantiate(cs_config("stair")).unwrap();
    inst.enter_initialization_mode(None, 0.0, Some(20.0)).unwrap();
    inst.exit_initialization_mode().unwrap();

    assert!(!inst.terminated_status().unwrap());
    let err = inst.do_step(0.0, 20.0, true).unwrap_err();
    assert!(err.is_discard());
    assert!(inst.terminated_status().unwrap());
    assert!((inst.last_successful_time().unwrap() - 9.0).abs() < 1e-9);
}

#[test]
fn modern_co_simulation_reports_termination() {
    let factory = ReferenceFactory::<Stair>::new();
    let mut inst = factory.instantiate(cs_config("stair")).unwrap();
    inst.enter_initialization_mode(None, 0.0, None).unwrap();
    inst.exit_initialization_mode().unwrap();

    let outcome = inst.do_step(0.0, 20.0, true).unwrap();
    assert!(outcome.terminate_simulation);
    assert!((outcome.last_successful_time - 9.0).abs() < 1e-9);
    assert!(inst.terminated_status().is_err());
}

#[test]
fn event_mode_hands_events_to_the_master() {
    let factory = ReferenceFactory::<Stair>::new();
    let mut inst = factory
        .instantiate(cs_config("stair").with_event_mode(true).with_early_return(true))
        .unwrap();
    inst.enter_initialization_mode(None, 0.0, None).unwrap();
    inst.exit_initialization_mode().unwrap();
    inst.update_discrete_states().unwrap();
    inst.enter_step_mode().unwrap();

    let outcome = inst.do_step(0.0, 2.5, true).unwrap();
    assert!(outcome.event_handling_needed);
    assert!(outcome.early_return);
    assert!((outcome.last_successful_time - 1.0).abs() < 1e-9);

    inst.enter_event_mode().unwrap();
    let update = inst.update_discrete_states().unwrap();
    assert_eq!(update.next_event_time, Some(2.0));
    inst.enter_step_mode().unwrap();

    let mut counter = [0];
    inst.get_values(&[ValueReference(stair::COUNTER)], ValuesMut::Int32(&mut counter))
        .unwrap();
    assert_eq!(counter, [2]);
}

#[test]
fn input_derivatives_extrapolate_inside_step() {
    let factory = ReferenceFactory::<Feedthrough>::new();
    let mut inst = factory.instantiate(cs_config("ft")).unwrap();
    assert!(inst.capabilities().can_interpolate_inputs);
    inst.enter_initialization_mode(None, 0.0, None).unwrap();
    inst.exit_initialization_mode().unwrap();

    let u = [ValueReference(feedthrough::FLOAT64_CONTINUOUS_INPUT)];
    inst.set_values(&u, Values::Float64(&[1.0])).unwrap();
    inst.set_input_derivatives(&u, 1, &[2.0]).unwrap();
    inst.do_step(0.0, 0.5, true).unwrap();

    let mut y = [0.0];
    inst.get_values(
        &[ValueReference(feedthrough::FLOAT64_CONTINUOUS_OUTPUT)],
        ValuesMut::Float64(&mut y),
    )
    .unwrap();
    assert!((y[0] - 2.0).abs() < 1e-12);
}
