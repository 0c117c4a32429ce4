//! # Runtime
//!
//! Process setup for the `s3sync` binary.

pub mod initialization;

pub use initialization::{initialize, InitializationResult};
