//! Core types for shopcart.
//!
//! This module provides type-safe wrappers for common domain concepts.

pub mod actor;
pub mod id;
pub mod name;
pub mod price;
pub mod quantity;
pub mod status;

pub use actor::Actor;
pub use id::*;
pub use name::{ItemName, ItemNameError, Username, UsernameError};
pub use price::{Price, PriceError};
pub use quantity::{Quantity, QuantityError};
pub use status::*;
