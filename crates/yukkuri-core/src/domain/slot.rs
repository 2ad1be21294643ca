//! Setting slot identifiers.
//!
//! The Panel keeps several independent voice configurations ("settings"),
//! addressed by a zero-based index. `Slot` wraps that index so per-slot
//! calls cannot be handed a speed, a volume or any other bare integer by
//! mistake.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Index of one voice configuration on the Panel.
///
/// The Panel does not advertise how many slots it has, so the upper bound
/// is only checked when the caller knows it (see [`Slot::within`]).
/// Otherwise an out-of-range slot is reported by the Panel itself and
/// surfaces as `PanelError::InvalidSlot`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "i64", into = "i64")]
pub struct Slot(u32);

/// Error returned when an integer cannot be used as a slot index.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SlotError {
    /// Negative indices never address a slot.
    #[error("Slot index must not be negative, got {0}")]
    Negative(i64),

    /// The index does not fit the Panel's 32-bit integer parameter.
    #[error("Slot index {0} exceeds the Panel's integer range")]
    TooLarge(i64),

    /// The index is beyond a slot count the caller already knows.
    #[error("Slot {index} is out of range (panel has {count} slots)")]
    OutOfRange {
        /// Rejected index.
        index: u32,
        /// Known slot count.
        count: u32,
    },
}

impl Slot {
    /// The first slot; the one the Panel shows by default.
    pub const PRIMARY: Self = Self(0);

    /// Largest index the Panel's signed 32-bit parameter can carry.
    pub const MAX_INDEX: u32 = i32::MAX as u32;

    /// Create a slot from a raw index.
    pub const fn new(index: u32) -> Result<Self, SlotError> {
        if index > Self::MAX_INDEX {
            return Err(SlotError::TooLarge(index as i64));
        }
        Ok(Self(index))
    }

    /// Create a slot and check it against a known slot count.
    pub const fn within(index: u32, count: u32) -> Result<Self, SlotError> {
        if index >= count {
            return Err(SlotError::OutOfRange { index, count });
        }
        Self::new(index)
    }

    /// The zero-based index.
    #[must_use]
    pub const fn index(self) -> u32 {
        self.0
    }
}

impl Default for Slot {
    fn default() -> Self {
        Self::PRIMARY
    }
}

impl TryFrom<i64> for Slot {
    type Error = SlotError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        if value < 0 {
            return Err(SlotError::Negative(value));
        }
        let index = u32::try_from(value).map_err(|_| SlotError::TooLarge(value))?;
        Self::new(index)
    }
}

impl TryFrom<i32> for Slot {
    type Error = SlotError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::try_from(i64::from(value))
    }
}

impl From<Slot> for i64 {
    fn from(slot: Slot) -> Self {
        Self::from(slot.0)
    }
}

impl fmt::Display for Slot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "slot {}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primary_is_default() {
        assert_eq!(Slot::default(), Slot::PRIMARY);
        assert_eq!(Slot::PRIMARY.index(), 0);
    }

    #[test]
    fn test_negative_index_rejected() {
        assert_eq!(Slot::try_from(-1i64), Err(SlotError::Negative(-1)));
        assert_eq!(Slot::try_from(-3i32), Err(SlotError::Negative(-3)));
    }

    #[test]
    fn test_index_beyond_i32_rejected() {
        let too_big = i64::from(i32::MAX) + 1;
        assert!(matches!(Slot::try_from(too_big), Err(SlotError::TooLarge(_))));
        assert!(Slot::new(u32::MAX).is_err());
        assert!(Slot::new(Slot::MAX_INDEX).is_ok());
    }

    #[test]
    fn test_within_known_count() {
        assert_eq!(Slot::within(1, 2).unwrap().index(), 1);
        assert_eq!(
            Slot::within(2, 2),
            Err(SlotError::OutOfRange { index: 2, count: 2 })
        );
    }

    #[test]
    fn test_serde_uses_plain_integer() {
        let slot = Slot::new(3).unwrap();
        assert_eq!(serde_json::to_string(&slot).unwrap(), "3");

        let parsed: Slot = serde_json::from_str("2").unwrap();
        assert_eq!(parsed.index(), 2);

        assert!(serde_json::from_str::<Slot>("-1").is_err());
    }

    #[test]
    fn test_display() {
        assert_eq!(Slot::PRIMARY.to_string(), "slot 0");
    }
}
