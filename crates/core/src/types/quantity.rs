//! Cart line quantity.

use core::fmt;

use serde::{Deserialize, Deserializer, Serialize};

/// Errors that can occur when constructing a [`Quantity`].
#[derive(thiserror::Error, Debug, Clone, Copy, PartialEq, Eq)]
pub enum QuantityError {
    /// The requested quantity is below [`Quantity::MIN`].
    #[error("quantity must be at least {min}")]
    TooSmall {
        /// Minimum allowed quantity.
        min: i32,
    },
    /// The requested quantity is above [`Quantity::MAX`].
    #[error("quantity cannot exceed {max}")]
    TooLarge {
        /// Maximum allowed quantity.
        max: i32,
    },
}

/// Quantity of a single cart or order line.
///
/// ## Constraints
///
/// - Range: 1-100 inclusive
/// - Adding to an existing line saturates at 100 instead of failing
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(transparent)]
pub struct Quantity(i32);

impl Quantity {
    /// Smallest quantity a line can hold.
    pub const MIN: i32 = 1;
    /// Largest quantity a line can hold.
    pub const MAX: i32 = 100;
    /// A single unit.
    pub const ONE: Self = Self(1);

    /// Quantity requested when adding an item to a cart.
    ///
    /// Zero or negative requests are treated as a single unit.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooLarge` if `requested` exceeds [`Self::MAX`].
    pub const fn for_addition(requested: i32) -> Result<Self, QuantityError> {
        if requested < Self::MIN {
            return Ok(Self::ONE);
        }
        if requested > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(requested))
    }

    /// Quantity set explicitly on an existing line.
    ///
    /// # Errors
    ///
    /// Returns `QuantityError::TooSmall` or `QuantityError::TooLarge` if
    /// `requested` is outside 1-100.
    pub const fn exact(requested: i32) -> Result<Self, QuantityError> {
        if requested < Self::MIN {
            return Err(QuantityError::TooSmall { min: Self::MIN });
        }
        if requested > Self::MAX {
            return Err(QuantityError::TooLarge { max: Self::MAX });
        }
        Ok(Self(requested))
    }

    /// Merge an additional quantity into this one, capping at [`Self::MAX`].
    #[must_use]
    pub const fn saturating_add(self, other: Self) -> Self {
        let sum = self.0 + other.0;
        if sum > Self::MAX { Self(Self::MAX) } else { Self(sum) }
    }

    /// Get the underlying value.
    #[must_use]
    pub const fn get(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<i32> for Quantity {
    type Error = QuantityError;

    fn try_from(value: i32) -> Result<Self, Self::Error> {
        Self::exact(value)
    }
}

impl From<Quantity> for i32 {
    fn from(quantity: Quantity) -> Self {
        quantity.0
    }
}

impl<'de> Deserialize<'de> for Quantity {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let value = i32::deserialize(deserializer)?;
        Self::exact(value).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_for_addition_defaults_non_positive_to_one() {
        for requested in [i32::MIN, -5, -1, 0] {
            assert_eq!(Quantity::for_addition(requested), Ok(Quantity::ONE));
        }
    }

    #[test]
    fn test_for_addition_accepts_in_range_verbatim() {
        for requested in [1, 2, 50, 99, 100] {
            assert_eq!(
                Quantity::for_addition(requested).map(|q| q.get()),
                Ok(requested)
            );
        }
    }

    #[test]
    fn test_for_addition_rejects_over_max() {
        assert_eq!(
            Quantity::for_addition(101),
            Err(QuantityError::TooLarge { max: 100 })
        );
        assert!(Quantity::for_addition(150).is_err());
    }

    #[test]
    fn test_exact_bounds() {
        assert_eq!(
            Quantity::exact(0),
            Err(QuantityError::TooSmall { min: 1 })
        );
        assert!(Quantity::exact(-3).is_err());
        assert!(Quantity::exact(101).is_err());
        assert_eq!(Quantity::exact(1).map(|q| q.get()), Ok(1));
        assert_eq!(Quantity::exact(100).map(|q| q.get()), Ok(100));
    }

    #[test]
    fn test_saturating_add_caps_at_max() {
        let sixty = Quantity::exact(60).expect("quantity");
        let fifty = Quantity::exact(50).expect("quantity");
        assert_eq!(sixty.saturating_add(fifty).get(), 100);

        let two = Quantity::exact(2).expect("quantity");
        assert_eq!(two.saturating_add(Quantity::ONE).get(), 3);
    }

    #[test]
    fn test_error_messages() {
        assert_eq!(
            QuantityError::TooLarge { max: 100 }.to_string(),
            "quantity cannot exceed 100"
        );
        assert_eq!(
            QuantityError::TooSmall { min: 1 }.to_string(),
            "quantity must be at least 1"
        );
    }
}
