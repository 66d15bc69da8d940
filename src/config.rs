//! Configuration loader and schema types.
//!
//! This module exposes the configuration schema used to drive runtime
//! behavior and helpers to resolve config and state paths.

mod load;
mod schema;

pub use load::state_dir;
pub use schema::*;
