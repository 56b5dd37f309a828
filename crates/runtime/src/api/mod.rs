//! Types downstream clients interact with.

mod errors;
mod source;

pub use errors::{Result, RuntimeError};
pub use source::{RequestSource, ScriptedSource};
