//! Business logic for Slidesmith.
//!
//! This crate owns the session state machine, the prompt builders, the
//! JSON-from-free-text extraction, the confirmation classifier, and the
//! ports (traits) that the infrastructure layer implements: session
//! repository, text/image generators, and template analyzer. It depends only
//! on `slidesmith-types` -- never on any HTTP or storage crate.

pub mod confirm;
pub mod generate;
pub mod machine;
pub mod parse;
pub mod prompt;
pub mod session;
