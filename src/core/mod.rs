//! Core document model: field resolution, classification, canonical mapping,
//! configuration, and submission state.
//!
//! This module is transport-free. It projects arbitrary source records into
//! the one [`CanonicalDocument`] shape the rest of the crate consumes.

mod classify;
mod config;
mod error;
mod map;
mod resolve;
mod types;

pub use classify::*;
pub use config::*;
pub use error::*;
pub use map::*;
pub use resolve::*;
pub use types::*;
