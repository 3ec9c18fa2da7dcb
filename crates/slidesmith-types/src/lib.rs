//! Shared domain types for Slidesmith.
//!
//! This crate contains the core domain types used across the Slidesmith
//! backend: the session record and its stage machine positions, outline and
//! style page records, page materials, template settings, generation
//! outcomes, and their associated error types.
//!
//! Zero infrastructure dependencies -- only serde, chrono, thiserror.

pub mod error;
pub mod message;
pub mod outcome;
pub mod session;
pub mod settings;
