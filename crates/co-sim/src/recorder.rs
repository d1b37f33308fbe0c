//! Output recorder.

use crate::error::SimResult;
use crate::trajectory::Trajectory;
use co_core::EPS;
use co_model::{Causality, ModelDescription, ModelInstance, ValueBuffer, ValueReference, VariableType};

/// Variables of one type, read with a single batch call per sample.
#[derive(Clone, Debug)]
struct RecorderBand {
    vrs: Vec<ValueReference>,
    /// Trajectory column of each variable.
    columns: Vec<usize>,
    buffer: ValueBuffer,
}

/// Samples variables of an instance into a [`Trajectory`].
///
/// Columns follow the order of the variables in the model description.
/// A sample is skipped unless it is forced or at least `interval` after the
/// previous row.
#[derive(Clone, Debug)]
pub struct Recorder {
    interval: Option<f64>,
    bands: Vec<RecorderBand>,
    trajectory: Trajectory,
}

impl Recorder {
    /// Record `names`, or the default selection when `None`.
    ///
    /// Unknown names and `time` are skipped.
    pub fn new(
        description: &ModelDescription,
        names: Option<&[String]>,
        interval: Option<f64>,
    ) -> Self {
        let selected: Vec<&str> = match names {
            Some(names) => {
                for name in names {
                    if name != "time" && description.variable(name).is_none() {
                        tracing::warn!(variable = %name, "unknown output variable");
                    }
                }
                names.iter().map(String::as_str).collect()
            }
            None => description
                .default_output_variables(5)
                .into_iter()
                .map(|v| v.name.as_str())
                .collect(),
        };

        let variables: Vec<_> = description
            .variables
            .iter()
            .filter(|v| {
                v.name != "time"
                    && v.causality != Causality::Independent
                    && selected.contains(&v.name.as_str())
            })
            .collect();

        let names = variables.iter().map(|v| v.name.clone()).collect();
        let types = variables.iter().map(|v| v.variable_type).collect();

        let bands = VariableType::ALL
            .iter()
            .filter_map(|&ty| {
                let (columns, vrs): (Vec<usize>, Vec<ValueReference>) = variables
                    .iter()
                    .enumerate()
                    .filter(|(_, v)| v.variable_type == ty)
                    .map(|(i, v)| (i, v.value_reference))
                    .unzip();
                (!vrs.is_empty()).then(|| RecorderBand {
                    buffer: ValueBuffer::zeros(ty, vrs.len()),
                    vrs,
                    columns,
                })
            })
            .collect();

        Self {
            interval,
            bands,
            trajectory: Trajectory::new(names, types),
        }
    }

    /// Append a row at `time`. Returns whether a row was written.
    pub fn sample<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        time: f64,
        force: bool,
    ) -> SimResult<bool> {
        if !force
            && let Some(interval) = self.interval
            && let Some(&last) = self.trajectory.time.last()
            && time - last + EPS < interval
        {
            return Ok(false);
        }

        for band in &mut self.bands {
            instance.get_values(&band.vrs, band.buffer.as_values_mut())?;
            for (k, &column) in band.columns.iter().enumerate() {
                self.trajectory.columns[column].push_from(&band.buffer, k);
            }
        }
        self.trajectory.time.push(time);
        Ok(true)
    }

    pub fn last_sample_time(&self) -> Option<f64> {
        self.trajectory.time.last().copied()
    }

    pub fn names(&self) -> &[String] {
        &self.trajectory.names
    }

    pub fn trajectory(&self) -> &Trajectory {
        &self.trajectory
    }

    /// The recorded rows.
    pub fn result(self) -> Trajectory {
        self.trajectory
    }
}


#[cfg(test)]
mod proptests {
    use super::*;
    use co_model::{InstanceConfig, InterfaceType, LogSink};
    use co_reference::{Dahlquist, ReferenceFactory, ReferenceModel};
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn sampled_times_respect_interval(
            steps in prop::collection::vec((0.0f64..0.3, any::<bool>()), 1..60),
            interval in 0.01f64..0.2,
        ) {
            let description = Dahlquist::description();
            let config = InstanceConfig::new("p", InterfaceType::ModelExchange)
                .with_log_sink(LogSink::Discard);
            let mut instance = ReferenceFactory::<Dahlquist>::new()
                .instantiate_reference(config)
                .unwrap();
            let mut recorder = Recorder::new(&description, None, Some(interval));

            let mut time = 0.0;
            let mut forced = Vec::new();
            for (dt, force) in steps {
                time += dt;
                if recorder.sample(&mut instance, time, force).unwrap() {
                    forced.push(force);
                }
            }

            let times = &recorder.trajectory().time;
            for (i, w) in times.windows(2).enumerate() {
                prop_assert!(w[1] >= w[0]);
                if !forced[i + 1] {
                    prop_assert!(w[1] - w[0] >= interval - 1e-12);
                }
            }
        }
    }
}
