use core::fmt;

/// Handle of a variable inside a model instance.
///
/// Value references are assigned by the model's metadata and are only
/// meaningful for the instance they were read from. Several variables may
/// share one reference (aliases).
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(transparent))]
pub struct ValueReference(pub u32);

impl ValueReference {
    pub fn new(raw: u32) -> Self {
        Self(raw)
    }

    pub fn get(self) -> u32 {
        self.0
    }
}

impl From<u32> for ValueReference {
    fn from(raw: u32) -> Self {
        Self(raw)
    }
}

impl fmt::Debug for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "vr({})", self.0)
    }
}

impl fmt::Display for ValueReference {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
