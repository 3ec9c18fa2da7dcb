//! Request handlers, grouped by resource.

pub mod chat;
pub mod image;
pub mod material;
pub mod outline;
pub mod reference;
pub mod session;
pub mod style;
