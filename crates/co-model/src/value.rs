//! Typed value bands.
//!
//! Model instances only expose type-homogeneous batch getters and setters, so
//! every value exchanged with an instance travels in a slice of one native
//! element type.

use serde::{Deserialize, Serialize};

/// Native element type of a model variable.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum VariableType {
    Float64,
    Float32,
    Int32,
    Int64,
    Boolean,
    String,
}

impl VariableType {
    /// Band order used when batching calls.
    pub const ALL: [VariableType; 6] = [
        VariableType::Float64,
        VariableType::Float32,
        VariableType::Int32,
        VariableType::Int64,
        VariableType::Boolean,
        VariableType::String,
    ];

    pub fn is_float(self) -> bool {
        matches!(self, Self::Float64 | Self::Float32)
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Float64 => "Float64",
            Self::Float32 => "Float32",
            Self::Int32 => "Int32",
            Self::Int64 => "Int64",
            Self::Boolean => "Boolean",
            Self::String => "String",
        }
    }
}

/// Borrowed values handed to a setter.
#[derive(Clone, Copy, Debug)]
pub enum Values<'a> {
    Float64(&'a [f64]),
    Float32(&'a [f32]),
    Int32(&'a [i32]),
    Int64(&'a [i64]),
    Boolean(&'a [bool]),
    String(&'a [String]),
}

impl Values<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Float64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Float64(_) => VariableType::Float64,
            Self::Float32(_) => VariableType::Float32,
            Self::Int32(_) => VariableType::Int32,
            Self::Int64(_) => VariableType::Int64,
            Self::Boolean(_) => VariableType::Boolean,
            Self::String(_) => VariableType::String,
        }
    }

    /// Element `i` as an owned scalar.
    pub fn scalar(&self, i: usize) -> Option<ScalarValue> {
        match self {
            Self::Float64(v) => v.get(i).map(|x| ScalarValue::Float64(*x)),
            Self::Float32(v) => v.get(i).map(|x| ScalarValue::Float32(*x)),
            Self::Int32(v) => v.get(i).map(|x| ScalarValue::Int32(*x)),
            Self::Int64(v) => v.get(i).map(|x| ScalarValue::Int64(*x)),
            Self::Boolean(v) => v.get(i).map(|x| ScalarValue::Boolean(*x)),
            Self::String(v) => v.get(i).map(|x| ScalarValue::String(x.clone())),
        }
    }
}

/// Borrowed output buffer handed to a getter.
#[derive(Debug)]
pub enum ValuesMut<'a> {
    Float64(&'a mut [f64]),
    Float32(&'a mut [f32]),
    Int32(&'a mut [i32]),
    Int64(&'a mut [i64]),
    Boolean(&'a mut [bool]),
    String(&'a mut [String]),
}

impl ValuesMut<'_> {
    pub fn len(&self) -> usize {
        match self {
            Self::Float64(v) => v.len(),
            Self::Float32(v) => v.len(),
            Self::Int32(v) => v.len(),
            Self::Int64(v) => v.len(),
            Self::Boolean(v) => v.len(),
            Self::String(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Float64(_) => VariableType::Float64,
            Self::Float32(_) => VariableType::Float32,
            Self::Int32(_) => VariableType::Int32,
            Self::Int64(_) => VariableType::Int64,
            Self::Boolean(_) => VariableType::Boolean,
            Self::String(_) => VariableType::String,
        }
    }

    /// Shorter-lived view of the same buffer.
    pub fn reborrow(&mut self) -> ValuesMut<'_> {
        match self {
            Self::Float64(v) => ValuesMut::Float64(v),
            Self::Float32(v) => ValuesMut::Float32(v),
            Self::Int32(v) => ValuesMut::Int32(v),
            Self::Int64(v) => ValuesMut::Int64(v),
            Self::Boolean(v) => ValuesMut::Boolean(v),
            Self::String(v) => ValuesMut::String(v),
        }
    }

    /// Store `value` at `i`. Returns false if the index is out of range or
    /// the scalar does not belong to this band.
    pub fn store(&mut self, i: usize, value: ScalarValue) -> bool {
        match (self, value) {
            (Self::Float64(v), ScalarValue::Float64(x)) => put(v, i, x),
            (Self::Float32(v), ScalarValue::Float32(x)) => put(v, i, x),
            (Self::Int32(v), ScalarValue::Int32(x)) => put(v, i, x),
            (Self::Int64(v), ScalarValue::Int64(x)) => put(v, i, x),
            (Self::Boolean(v), ScalarValue::Boolean(x)) => put(v, i, x),
            (Self::String(v), ScalarValue::String(x)) => put(v, i, x),
            _ => false,
        }
    }
}

fn put<T>(slice: &mut [T], i: usize, value: T) -> bool {
    match slice.get_mut(i) {
        Some(slot) => {
            *slot = value;
            true
        }
        None => false,
    }
}

/// A single value of any native type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ScalarValue {
    Float64(f64),
    Float32(f32),
    Int32(i32),
    Int64(i64),
    Boolean(bool),
    String(String),
}

impl ScalarValue {
    pub fn variable_type(&self) -> VariableType {
        match self {
            Self::Float64(_) => VariableType::Float64,
            Self::Float32(_) => VariableType::Float32,
            Self::Int32(_) => VariableType::Int32,
            Self::Int64(_) => VariableType::Int64,
            Self::Boolean(_) => VariableType::Boolean,
            Self::String(_) => VariableType::String,
        }
    }

    /// Numeric view; booleans map to 0/1, strings have none.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Float64(x) => Some(*x),
            Self::Float32(x) => Some(f64::from(*x)),
            Self::Int32(x) => Some(f64::from(*x)),
            Self::Int64(x) => Some(*x as f64),
            Self::Boolean(x) => Some(if *x { 1.0 } else { 0.0 }),
            Self::String(_) => None,
        }
    }

    /// Convert a numeric sample into the given band.
    pub fn from_f64(ty: VariableType, value: f64) -> Option<Self> {
        match ty {
            VariableType::Float64 => Some(Self::Float64(value)),
            VariableType::Float32 => Some(Self::Float32(value as f32)),
            VariableType::Int32 => Some(Self::Int32(value.round() as i32)),
            VariableType::Int64 => Some(Self::Int64(value.round() as i64)),
            VariableType::Boolean => Some(Self::Boolean(value != 0.0)),
            VariableType::String => None,
        }
    }
}

impl std::fmt::Display for ScalarValue {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Float64(x) => write!(f, "{x}"),
            Self::Float32(x) => write!(f, "{x}"),
            Self::Int32(x) => write!(f, "{x}"),
            Self::Int64(x) => write!(f, "{x}"),
            Self::Boolean(x) => write!(f, "{x}"),
            Self::String(x) => write!(f, "{x}"),
        }
    }
}

/// Owned, growable buffer of one native type.
///
/// Used both as the pre-sized scratch band for batch calls and as a recorded
/// result column.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum ValueBuffer {
    Float64(Vec<f64>),
    Float32(Vec<f32>),
    Int32(Vec<i32>),
    Int64(Vec<i64>),
    Boolean(Vec<bool>),
    String(Vec<String>),
}

impl ValueBuffer {
    /// Buffer of `len` default elements.
    pub fn zeros(ty: VariableType, len: usize) -> Self {
        match ty {
            VariableType::Float64 => Self::Float64(vec![0.0; len]),
            VariableType::Float32 => Self::Float32(vec![0.0; len]),
            VariableType::Int32 => Self::Int32(vec![0; len]),
            VariableType::Int64 => Self::Int64(vec![0; len]),
            VariableType::Boolean => Self::Boolean(vec![false; len]),
            VariableType::String => Self::String(vec![String::new(); len]),
        }
    }

    /// Empty buffer with room for `capacity` elements.
    pub fn with_capacity(ty: VariableType, capacity: usize) -> Self {
        match ty {
            VariableType::Float64 => Self::Float64(Vec::with_capacity(capacity)),
            VariableType::Float32 => Self::Float32(Vec::with_capacity(capacity)),
            VariableType::Int32 => Self::Int32(Vec::with_capacity(capacity)),
            VariableType::Int64 => Self::Int64(Vec::with_capacity(capacity)),
            VariableType::Boolean => Self::Boolean(Vec::with_capacity(capacity)),
            VariableType::String => Self::String(Vec::with_capacity(capacity)),
        }
    }

    pub fn variable_type(&self) -> VariableType {
        self.as_values().variable_type()
    }

    pub fn len(&self) -> usize {
        self.as_values().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn as_values(&self) -> Values<'_> {
        match self {
            Self::Float64(v) => Values::Float64(v),
            Self::Float32(v) => Values::Float32(v),
            Self::Int32(v) => Values::Int32(v),
            Self::Int64(v) => Values::Int64(v),
            Self::Boolean(v) => Values::Boolean(v),
            Self::String(v) => Values::String(v),
        }
    }

    pub fn as_values_mut(&mut self) -> ValuesMut<'_> {
        match self {
            Self::Float64(v) => ValuesMut::Float64(v),
            Self::Float32(v) => ValuesMut::Float32(v),
            Self::Int32(v) => ValuesMut::Int32(v),
            Self::Int64(v) => ValuesMut::Int64(v),
            Self::Boolean(v) => ValuesMut::Boolean(v),
            Self::String(v) => ValuesMut::String(v),
        }
    }

    pub fn get(&self, i: usize) -> Option<ScalarValue> {
        self.as_values().scalar(i)
    }

    pub fn get_f64(&self, i: usize) -> Option<f64> {
        self.get(i).and_then(|v| v.as_f64())
    }

    /// Overwrite element `i` with a numeric value converted to this band.
    /// Returns false for string buffers or out-of-range indices.
    pub fn set_f64(&mut self, i: usize, value: f64) -> bool {
        match ScalarValue::from_f64(self.variable_type(), value) {
            Some(scalar) => self.as_values_mut().store(i, scalar),
            None => false,
        }
    }

    /// Append element `i` of `source`, which must have the same type.
    pub fn push_from(&mut self, source: &ValueBuffer, i: usize) -> bool {
        match (self, source) {
            (Self::Float64(dst), Self::Float64(src)) => push(dst, src, i),
            (Self::Float32(dst), Self::Float32(src)) => push(dst, src, i),
            (Self::Int32(dst), Self::Int32(src)) => push(dst, src, i),
            (Self::Int64(dst), Self::Int64(src)) => push(dst, src, i),
            (Self::Boolean(dst), Self::Boolean(src)) => push(dst, src, i),
            (Self::String(dst), Self::String(src)) => push(dst, src, i),
            _ => false,
        }
    }
}

fn push<T: Clone>(dst: &mut Vec<T>, src: &[T], i: usize) -> bool {
    match src.get(i) {
        Some(v) => {
            dst.push(v.clone());
            true
        }
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zeros_has_requested_type_and_len() {
        for ty in VariableType::ALL {
            let buf = ValueBuffer::zeros(ty, 3);
            assert_eq!(buf.variable_type(), ty);
            assert_eq!(buf.len(), 3);
        }
    }

    #[test]
    fn set_f64_converts_to_band() {
        let mut ints = ValueBuffer::zeros(VariableType::Int32, 2);
        assert!(ints.set_f64(1, 2.6));
        assert_eq!(ints, ValueBuffer::Int32(vec![0, 3]));

        let mut flags = ValueBuffer::zeros(VariableType::Boolean, 1);
        assert!(flags.set_f64(0, 1.0));
        assert_eq!(flags.get(0), Some(ScalarValue::Boolean(true)));

        let mut strings = ValueBuffer::zeros(VariableType::String, 1);
        assert!(!strings.set_f64(0, 1.0));
    }

    #[test]
    fn push_from_requires_matching_type() {
        let src = ValueBuffer::Float64(vec![1.5, 2.5]);
        let mut col = ValueBuffer::with_capacity(VariableType::Float64, 4);
        assert!(col.push_from(&src, 1));
        assert_eq!(col.get_f64(0), Some(2.5));

        let mut wrong = ValueBuffer::with_capacity(VariableType::Int32, 1);
        assert!(!wrong.push_from(&src, 0));
    }

    #[test]
    fn store_rejects_foreign_scalar() {
        let mut data = [0.0_f64; 2];
        let mut view = ValuesMut::Float64(&mut data);
        assert!(view.store(0, ScalarValue::Float64(4.0)));
        assert!(!view.store(1, ScalarValue::Int32(4)));
        assert!(!view.store(2, ScalarValue::Float64(4.0)));
        assert_eq!(data, [4.0, 0.0]);
    }
}
