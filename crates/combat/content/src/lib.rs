//! Data-driven job definitions and simulation configuration.
//!
//! - Job definitions: resources, cooldown groups and skills (RON)
//! - Simulation configuration (TOML)
//! - Static party-buff windows (RON)
//!
//! A sample caster job ships with the crate so that tools can run without any
//! data directory. All loaders deserialize straight into combat-core types.

#[cfg(feature = "loaders")]
pub mod loaders;

#[cfg(feature = "loaders")]
pub use loaders::{ConfigLoader, JobLoader, LoadResult, PartyBuffLoader};
