//! Core constants and error types.

pub mod constants;
mod error;

pub use constants::*;
pub use error::*;
