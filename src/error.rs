//! Error handling for engine operations
//!
//! The error type lives in [`crate::common`] next to the format identifiers;
//! this module re-exports it under the conventional name.

pub use crate::common::LzError;
pub use crate::common::Result;
