//! Input signals: interpolation of tabulated inputs and input events.
//!
//! An [`InputTable`] holds samples of several channels on a shared,
//! non-decreasing time column. A repeated timestamp encodes a discontinuity:
//! the rows before and after the repeated time are the left and right limits.
//! [`InputSignal`] binds the channels of a table to the input and tunable
//! variables of a model and pushes interpolated values into an instance.

use crate::error::{SimError, SimResult};
use co_core::is_close;
use co_model::{
    Causality, ModelDescription, ModelInstance, ValueBuffer, ValueReference, Variability,
    VariableType,
};
use std::collections::BTreeMap;

/// Time-indexed samples of named channels.
#[derive(Clone, Debug, PartialEq)]
pub struct InputTable {
    names: Vec<String>,
    time: Vec<f64>,
    columns: Vec<Vec<f64>>,
}

impl InputTable {
    pub fn new(names: Vec<String>, time: Vec<f64>, columns: Vec<Vec<f64>>) -> SimResult<Self> {
        if time.is_empty() {
            return Err(SimError::Input {
                message: "input table has no rows".to_string(),
            });
        }
        if names.len() != columns.len() {
            return Err(SimError::Input {
                message: format!("{} names for {} columns", names.len(), columns.len()),
            });
        }
        if let Some((name, _)) = names
            .iter()
            .zip(&columns)
            .find(|(_, column)| column.len() != time.len())
        {
            return Err(SimError::Input {
                message: format!("column {name} does not have {} rows", time.len()),
            });
        }
        if time.iter().any(|t| !t.is_finite()) {
            return Err(SimError::Input {
                message: "input times must be finite".to_string(),
            });
        }
        if time.windows(2).any(|w| w[1] < w[0]) {
            return Err(SimError::Input {
                message: "input times must be non-decreasing".to_string(),
            });
        }
        for (i, name) in names.iter().enumerate() {
            if name == "time" || names[..i].contains(name) {
                return Err(SimError::Input {
                    message: format!("invalid or duplicate column name {name}"),
                });
            }
        }
        Ok(Self {
            names,
            time,
            columns,
        })
    }

    /// Build from rows of `(time, values)`.
    pub fn from_rows(names: Vec<String>, rows: &[(f64, Vec<f64>)]) -> SimResult<Self> {
        let mut columns = vec![Vec::with_capacity(rows.len()); names.len()];
        let mut time = Vec::with_capacity(rows.len());
        for (t, values) in rows {
            if values.len() != names.len() {
                return Err(SimError::Input {
                    message: format!("row at t={t} has {} values", values.len()),
                });
            }
            time.push(*t);
            for (column, v) in columns.iter_mut().zip(values) {
                column.push(*v);
            }
        }
        Self::new(names, time, columns)
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn time(&self) -> &[f64] {
        &self.time
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.columns[i].as_slice())
    }

    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }
}

/// Where `time` falls in a time column.
#[derive(Clone, Copy, Debug, PartialEq)]
enum Lookup {
    /// Outside the table or a single row: hold the sample, zero slope.
    Hold(usize),
    /// At a repeated timestamp: the selected sample plus the segment whose
    /// slope is reported for continuous channels.
    Event {
        index: usize,
        segment: Option<(usize, usize)>,
    },
    /// Strictly inside the segment `[i0, i1]`.
    Between(usize, usize),
}

fn lookup(t: &[f64], time: f64, after_event: bool) -> Lookup {
    let n = t.len();
    if n < 2 {
        return Lookup::Hold(0);
    }
    let mut i0 = t.partition_point(|&ti| ti < time);
    if i0 == 0 {
        return Lookup::Hold(0);
    }
    if i0 == n {
        return Lookup::Hold(n - 1);
    }
    if time == t[i0] && i0 < n - 1 && t[i0] == t[i0 + 1] {
        if after_event {
            while i0 < n - 1 && t[i0] == t[i0 + 1] {
                i0 += 1;
            }
            let segment = (i0 < n - 1).then_some((i0, i0 + 1));
            return Lookup::Event { index: i0, segment };
        }
        return Lookup::Event {
            index: i0,
            segment: Some((i0 - 1, i0)),
        };
    }
    Lookup::Between(i0 - 1, i0)
}

/// Interpolate every channel at `time`, writing values and first derivatives.
///
/// Continuous channels are linear between samples; discrete channels hold the
/// sample before `time`. At a sample time the left limit is returned unless
/// `after_event` is set.
/// Outside the table the boundary sample is held with zero derivative.
pub fn interpolate(
    t: &[f64],
    channels: &[&[f64]],
    time: f64,
    discrete: bool,
    after_event: bool,
    values: &mut [f64],
    derivatives: &mut [f64],
) {
    let at = lookup(t, time, after_event);
    for ((y, value), derivative) in channels.iter().zip(values.iter_mut()).zip(derivatives.iter_mut()) {
        let (v, d) = match at {
            Lookup::Hold(i) => (y[i], 0.0),
            Lookup::Event { index, segment } => {
                let d = match segment {
                    Some((a, b)) if !discrete => (y[b] - y[a]) / (t[b] - t[a]),
                    _ => 0.0,
                };
                (y[index], d)
            }
            Lookup::Between(i0, i1) if discrete => {
                // the next sample only counts once its time is reached
                let i = if after_event && is_close(time, t[i1]) { i1 } else { i0 };
                (y[i], 0.0)
            }
            Lookup::Between(i0, i1) => {
                let (t0, t1) = (t[i0], t[i1]);
                let w0 = (t1 - time) / (t1 - t0);
                let w1 = 1.0 - w0;
                (w0 * y[i0] + w1 * y[i1], (y[i1] - y[i0]) / (t1 - t0))
            }
        };
        *value = v;
        *derivative = d;
    }
}

/// Discontinuity times of a table: repeated timestamps and the first sample
/// after every change of a discrete channel, plus `+inf`, sorted and unique.
pub fn find_events(t: &[f64], discrete_channels: &[&[f64]]) -> Vec<f64> {
    let mut events = vec![f64::INFINITY];
    if t.len() >= 2 {
        events.extend(t.windows(2).filter(|w| w[0] == w[1]).map(|w| w[0]));
        for y in discrete_channels {
            events.extend(
                y.windows(2)
                    .zip(&t[1..])
                    .filter(|(w, _)| w[0] != w[1])
                    .map(|(_, &ti)| ti),
            );
        }
    }
    events.sort_by(f64::total_cmp);
    events.dedup();
    events
}

/// Channels of one value type that are pushed with a single setter call.
#[derive(Clone, Debug)]
struct InputBand {
    vrs: Vec<ValueReference>,
    channels: Vec<Vec<f64>>,
    values: Vec<f64>,
    derivatives: Vec<f64>,
    buffer: ValueBuffer,
}

impl InputBand {
    fn new(variable_type: VariableType, bound: Vec<(ValueReference, Vec<f64>)>) -> Self {
        let n = bound.len();
        let (vrs, channels) = bound.into_iter().unzip();
        Self {
            vrs,
            channels,
            values: vec![0.0; n],
            derivatives: vec![0.0; n],
            buffer: ValueBuffer::zeros(variable_type, n),
        }
    }

    fn interpolate(&mut self, t: &[f64], time: f64, discrete: bool, after_event: bool) {
        let channels: Vec<&[f64]> = self.channels.iter().map(Vec::as_slice).collect();
        interpolate(
            t,
            &channels,
            time,
            discrete,
            after_event,
            &mut self.values,
            &mut self.derivatives,
        );
        for (i, &v) in self.values.iter().enumerate() {
            self.buffer.set_f64(i, v);
        }
    }
}

/// An input table bound to the variables of one model.
#[derive(Clone, Debug, Default)]
pub struct InputSignal {
    time: Vec<f64>,
    events: Vec<f64>,
    continuous: Vec<InputBand>,
    discrete: Vec<InputBand>,
    set_input_derivatives: bool,
}

impl InputSignal {
    /// A signal without channels: applies nothing and has no events.
    pub fn none() -> Self {
        Self {
            events: vec![f64::INFINITY],
            ..Self::default()
        }
    }

    /// Bind the columns of `table` to input and tunable variables by name.
    pub fn new(table: &InputTable, description: &ModelDescription) -> SimResult<Self> {
        let mut continuous: BTreeMap<VariableType, Vec<(ValueReference, Vec<f64>)>> =
            BTreeMap::new();
        let mut discrete: BTreeMap<VariableType, Vec<(ValueReference, Vec<f64>)>> =
            BTreeMap::new();
        let mut event_channels: Vec<&[f64]> = Vec::new();

        for variable in &description.variables {
            if variable.causality != Causality::Input
                && variable.variability != Variability::Tunable
            {
                continue;
            }
            let Some(column) = table.column(&variable.name) else {
                if variable.causality == Causality::Input {
                    tracing::warn!(variable = %variable.name, "missing input for variable");
                }
                continue;
            };
            if variable.variable_type == VariableType::String {
                return Err(SimError::Input {
                    message: format!("string input {} cannot be interpolated", variable.name),
                });
            }

            let is_discrete = matches!(
                variable.variability,
                Variability::Discrete | Variability::Tunable
            );
            if is_discrete {
                event_channels.push(column);
            }
            let bands = if variable.variable_type.is_float() && !is_discrete {
                &mut continuous
            } else {
                &mut discrete
            };
            bands
                .entry(variable.variable_type)
                .or_default()
                .push((variable.value_reference, column.to_vec()));
        }

        let events = find_events(table.time(), &event_channels);
        Ok(Self {
            time: table.time().to_vec(),
            events,
            continuous: continuous
                .into_iter()
                .map(|(ty, bound)| InputBand::new(ty, bound))
                .collect(),
            discrete: discrete
                .into_iter()
                .map(|(ty, bound)| InputBand::new(ty, bound))
                .collect(),
            set_input_derivatives: false,
        })
    }

    /// Also push first-order derivatives of continuous channels.
    pub fn with_input_derivatives(mut self, enabled: bool) -> Self {
        self.set_input_derivatives = enabled;
        self
    }

    pub fn is_empty(&self) -> bool {
        self.continuous.is_empty() && self.discrete.is_empty()
    }

    /// All discontinuity times, ending with `+inf`.
    pub fn events(&self) -> &[f64] {
        &self.events
    }

    /// Earliest discontinuity strictly after `time`, or `+inf`.
    pub fn next_event(&self, time: f64) -> f64 {
        let i = self.events.partition_point(|&e| e <= time);
        self.events.get(i).copied().unwrap_or(f64::INFINITY)
    }

    /// Push values of the selected channel classes into the instance.
    pub fn apply<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        time: f64,
        continuous: bool,
        discrete: bool,
        after_event: bool,
    ) -> SimResult<()> {
        if self.time.is_empty() {
            return Ok(());
        }

        if continuous {
            for band in &mut self.continuous {
                band.interpolate(&self.time, time, false, after_event);
                instance.set_values(&band.vrs, band.buffer.as_values())?;
                if self.set_input_derivatives {
                    instance.set_input_derivatives(&band.vrs, 1, &band.derivatives)?;
                }
            }
        }

        if discrete {
            for band in &mut self.discrete {
                band.interpolate(&self.time, time, true, after_event);
                instance.set_values(&band.vrs, band.buffer.as_values())?;
            }
        }

        Ok(())
    }

    /// Continuous and discrete channels, left limit at discontinuities.
    pub fn apply_all<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        time: f64,
    ) -> SimResult<()> {
        self.apply(instance, time, true, true, false)
    }

    pub fn apply_continuous<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        time: f64,
    ) -> SimResult<()> {
        self.apply(instance, time, true, false, false)
    }

    /// Continuous and discrete channels, right limit at discontinuities.
    pub fn apply_after_event<I: ModelInstance + ?Sized>(
        &mut self,
        instance: &mut I,
        time: f64,
    ) -> SimResult<()> {
        self.apply(instance, time, true, true, true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn interp(
        t: &[f64],
        channels: &[&[f64]],
        time: f64,
        discrete: bool,
        after_event: bool,
    ) -> (Vec<f64>, Vec<f64>) {
        let mut values = vec![0.0; channels.len()];
        let mut derivatives = vec![0.0; channels.len()];
        interpolate(
            t,
            channels,
            time,
            discrete,
            after_event,
            &mut values,
            &mut derivatives,
        );
        (values, derivatives)
    }

    #[test]
    fn continuous_interpolation() {
        let t = [0.0, 1.0, 2.0, 3.0];
        let y0 = [0.0, 0.0, 3.0, 3.0];
        let y1 = [-1.0, 0.0, 1.0, 2.0];
        let channels: [&[f64]; 2] = [&y0, &y1];

        // left hold
        assert_eq!(interp(&t, &channels, -1.0, false, false).0, [0.0, -1.0]);
        assert_eq!(interp(&t, &channels, -1.0, false, false).1, [0.0, 0.0]);
        // exact sample
        assert_eq!(interp(&t, &channels, 1.0, false, false).0, [0.0, 0.0]);
        // linear
        let (v, d) = interp(&t, &channels, 1.5, false, false);
        assert_eq!(v, [1.5, 0.5]);
        assert_eq!(d, [3.0, 1.0]);
        // right hold
        assert_eq!(interp(&t, &channels, 4.0, false, false).0, [3.0, 2.0]);
    }

    #[test]
    fn discrete_hold() {
        let t = [0.0, 1.0, 1.0, 1.0, 2.0];
        let y = [0.0, 0.0, 4.0, 3.0, 3.0];
        let channels: [&[f64]; 1] = [&y];

        assert_eq!(interp(&t, &channels, 0.5, true, false).0, [0.0]);
        assert_eq!(interp(&t, &channels, 1.0, true, false).0, [0.0]);
        assert_eq!(interp(&t, &channels, 1.0, true, true).0, [3.0]);
        assert_eq!(interp(&t, &channels, 3.0, true, false).0, [3.0]);
    }

    #[test]
    fn discrete_right_limit_only_at_the_sample_time() {
        let t = [0.0, 2.0];
        let y = [0.0, 5.0];
        let channels: [&[f64]; 1] = [&y];

        assert_eq!(interp(&t, &channels, 0.2, true, true).0, [0.0]);
        assert_eq!(interp(&t, &channels, 1.999, true, true).0, [0.0]);
        assert_eq!(interp(&t, &channels, 2.0, true, false).0, [0.0]);
        assert_eq!(interp(&t, &channels, 2.0, true, true).0, [5.0]);
        assert_eq!(interp(&t, &channels, 2.0 - 1e-15, true, true).0, [5.0]);
    }

    #[test]
    fn continuous_discontinuity_uses_neighbouring_segments() {
        let t = [0.0, 1.0, 1.0, 2.0];
        let y = [0.0, 1.0, 5.0, 7.0];
        let channels: [&[f64]; 1] = [&y];

        let (v, d) = interp(&t, &channels, 1.0, false, false);
        assert_eq!((v[0], d[0]), (1.0, 1.0));
        let (v, d) = interp(&t, &channels, 1.0, false, true);
        assert_eq!((v[0], d[0]), (5.0, 2.0));
    }

    #[test]
    fn single_row_is_held() {
        let t = [0.5];
        let y = [2.0];
        let channels: [&[f64]; 1] = [&y];
        assert_eq!(interp(&t, &channels, 10.0, false, false), (vec![2.0], vec![0.0]));
        assert_eq!(find_events(&t, &channels), [f64::INFINITY]);
    }

    #[test]
    fn events_from_duplicates_and_changes() {
        let t = [0.0, 1.0, 1.0, 2.0, 3.0];
        let y = [0.0, 0.0, 0.0, 1.0, 1.0];
        let events = find_events(&t, &[&y]);
        assert_eq!(events, [1.0, 2.0, f64::INFINITY]);
    }

    #[test]
    fn next_event_is_strictly_after() {
        let signal = InputSignal {
            events: vec![1.0, 2.0, f64::INFINITY],
            ..InputSignal::none()
        };
        assert_eq!(signal.next_event(0.0), 1.0);
        assert_eq!(signal.next_event(1.0), 2.0);
        assert_eq!(signal.next_event(2.5), f64::INFINITY);
        assert_eq!(InputSignal::none().next_event(0.0), f64::INFINITY);
    }

    #[test]
    fn table_validation() {
        let names = vec!["u".to_string()];
        assert!(InputTable::new(names.clone(), vec![0.0, 1.0], vec![vec![0.0, 1.0]]).is_ok());
        assert!(InputTable::new(names.clone(), vec![1.0, 0.0], vec![vec![0.0, 1.0]]).is_err());
        assert!(InputTable::new(names.clone(), vec![0.0, 1.0], vec![vec![0.0]]).is_err());
        assert!(InputTable::new(names, vec![], vec![vec![]]).is_err());
        assert!(
            InputTable::new(vec!["time".into()], vec![0.0], vec![vec![0.0]]).is_err()
        );
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use proptest::prelude::*;

    fn table() -> impl Strategy<Value = (Vec<f64>, Vec<f64>)> {
        prop::collection::vec((0u8..3, 0i8..3), 1..30).prop_map(|steps| {
            let mut t = 0.0;
            let mut times = Vec::new();
            let mut values = Vec::new();
            for (dt, y) in steps {
                t += f64::from(dt) * 0.5;
                times.push(t);
                values.push(f64::from(y));
            }
            (times, values)
        })
    }

    proptest! {
        #[test]
        fn events_are_strictly_increasing((t, y) in table()) {
            let events = find_events(&t, &[&y]);
            prop_assert_eq!(events.last().copied(), Some(f64::INFINITY));
            for w in events.windows(2) {
                prop_assert!(w[0] < w[1]);
            }
            for &e in &events[..events.len() - 1] {
                let duplicated = t.windows(2).any(|w| w[0] == w[1] && w[0] == e);
                let changed = (1..t.len()).any(|i| t[i] == e && y[i] != y[i - 1]);
                prop_assert!(duplicated || changed);
            }
        }

        #[test]
        fn discrete_values_are_table_samples((t, y) in table(), time in -1.0f64..20.0, after in any::<bool>()) {
            let mut v = [0.0];
            let mut d = [0.0];
            interpolate(&t, &[&y], time, true, after, &mut v, &mut d);
            prop_assert!(y.contains(&v[0]));
            prop_assert_eq!(d[0], 0.0);
        }

        #[test]
        fn continuous_values_stay_within_bounds((t, y) in table(), time in -1.0f64..20.0) {
            let mut v = [0.0];
            let mut d = [0.0];
            interpolate(&t, &[&y], time, false, false, &mut v, &mut d);
            let lo = y.iter().copied().fold(f64::INFINITY, f64::min);
            let hi = y.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            prop_assert!(v[0] >= lo - 1e-12 && v[0] <= hi + 1e-12);
        }
    }
}
