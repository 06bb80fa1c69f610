//! This module defines traits for external dependencies (the platform API, the activity monitor,
//! the current environment selector) so commands can be tested against mocks. By abstracting
//! external services behind traits, commands only see the operations they need.
pub mod environments;

pub use environments::*;
