//! shopcart core - shared domain types.
//!
//! This crate provides the types and pricing rules used across all shopcart
//! components:
//! - `server` - HTTP API, services and persistence
//! - `cli` - Command-line tools for migrations, seeding and user management
//!
//! # Architecture
//!
//! The core crate contains only types and pure functions - no I/O, no
//! database access, no HTTP. This keeps it lightweight and lets every store
//! backend share the same money and quantity rules.
//!
//! # Modules
//!
//! - [`types`] - Newtype wrappers for IDs, prices, quantities, names and statuses
//! - [`pricing`] - Line and total computation

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod pricing;
pub mod types;

pub use types::*;
