//! Columnar simulation results.

use co_model::{ScalarValue, ValueBuffer, VariableType};
use serde::{Deserialize, Serialize};

/// One recorded variable; elements keep their native type.
pub type Column = ValueBuffer;

/// Time column plus one column per recorded variable.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Trajectory {
    pub names: Vec<String>,
    pub types: Vec<VariableType>,
    pub time: Vec<f64>,
    pub columns: Vec<Column>,
}

impl Trajectory {
    pub fn new(names: Vec<String>, types: Vec<VariableType>) -> Self {
        let columns = types
            .iter()
            .map(|&ty| ValueBuffer::with_capacity(ty, 0))
            .collect();
        Self {
            names,
            types,
            time: Vec::new(),
            columns,
        }
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.time.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&Column> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| &self.columns[i])
    }

    /// Numeric view of a column; `None` for unknown or string columns.
    pub fn values_f64(&self, name: &str) -> Option<Vec<f64>> {
        let column = self.column(name)?;
        (0..column.len()).map(|i| column.get_f64(i)).collect()
    }

    /// Values of row `i` in column order.
    pub fn row(&self, i: usize) -> Option<Vec<ScalarValue>> {
        if i >= self.len() {
            return None;
        }
        self.columns.iter().map(|c| c.get(i)).collect()
    }

    /// Append the rows of `other`, skipping a leading row that repeats the
    /// last time of `self`. Column layouts must match.
    pub fn append(&mut self, other: &Trajectory) -> bool {
        if self.names != other.names || self.types != other.types {
            return false;
        }
        let skip = match (self.time.last(), other.time.first()) {
            (Some(last), Some(first)) if last == first => 1,
            _ => 0,
        };
        for i in skip..other.len() {
            self.time.push(other.time[i]);
            for (dst, src) in self.columns.iter_mut().zip(&other.columns) {
                dst.push_from(src, i);
            }
        }
        true
    }
}
