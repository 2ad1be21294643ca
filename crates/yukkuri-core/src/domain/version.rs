//! Panel version number.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Number;

/// The Panel's own API/build version, exactly as the Panel reported it.
///
/// The Panel answers with a plain number (`1`, `1.4`, ...); it is kept as a
/// JSON number so nothing is lost to float formatting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PanelVersion(Number);

impl PanelVersion {
    /// Wrap a reported version number.
    #[must_use]
    pub const fn new(number: Number) -> Self {
        Self(number)
    }

    /// The raw reported number.
    #[must_use]
    pub const fn as_number(&self) -> &Number {
        &self.0
    }

    /// The version as a float, for ordering checks against a known minimum.
    #[must_use]
    pub fn as_f64(&self) -> Option<f64> {
        self.0.as_f64()
    }
}

impl From<i64> for PanelVersion {
    fn from(value: i64) -> Self {
        Self(Number::from(value))
    }
}

impl fmt::Display for PanelVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
