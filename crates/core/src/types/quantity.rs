//! Line-item quantities.

use core::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::validation::ValidationError;

/// A positive item count (`>= 1`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct Quantity(u32);

impl Quantity {
    pub const ONE: Self = Self(1);

    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` for zero.
    pub fn new(value: u32) -> Result<Self, ValidationError> {
        if value == 0 {
            return Err(ValidationError::invalid("qty", "must be an integer ≥ 1"));
        }
        Ok(Self(value))
    }

    /// Parse a quantity from a JSON request value.
    ///
    /// Accepts integer numbers and strings holding an integer (form-encoded
    /// clients send `"2"`). Anything else, including `0`, negatives and
    /// fractions, is rejected.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` when the value is not an integer `>= 1`.
    pub fn from_json(value: &Value) -> Result<Self, ValidationError> {
        let raw = match value {
            Value::Number(n) => n.as_u64(),
            Value::String(s) => s.trim().parse::<u64>().ok(),
            _ => None,
        };
        raw.and_then(|n| u32::try_from(n).ok())
            .ok_or_else(|| ValidationError::invalid("qty", "must be an integer ≥ 1"))
            .and_then(Self::new)
    }

    #[must_use]
    pub const fn get(self) -> u32 {
        self.0
    }

    /// Add `other` to this quantity.
    ///
    /// # Errors
    ///
    /// Returns `ValidationError::Invalid` if the sum overflows.
    pub fn checked_add(self, other: Self) -> Result<Self, ValidationError> {
        self.0
            .checked_add(other.0)
            .map(Self)
            .ok_or_else(|| ValidationError::invalid("qty", "is too large"))
    }
}

impl Default for Quantity {
    fn default() -> Self {
        Self::ONE
    }
}

impl TryFrom<u32> for Quantity {
    type Error = ValidationError;

    fn try_from(value: u32) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Quantity> for u32 {
    fn from(qty: Quantity) -> Self {
        qty.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}
