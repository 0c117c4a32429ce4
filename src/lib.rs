//! s3sync Library
//!
//! Syncs an S3 bucket prefix into a local directory, or into Kubernetes TLS
//! secrets, and runs a command when anything changed.
//! Tests are included in the module files and under `tests/`.
//!
//! ## Quick Start
//!
//! ```rust
//! use s3sync::prelude::*;
//! ```
//!
//! This brings commonly used types and traits into scope. For more specific imports,
//! use the individual modules.

pub mod cli;
pub mod config;
pub mod constants;
pub mod controller;
pub mod notifier;
pub mod observability;
pub mod prelude;
pub mod provider;
pub mod runtime;
pub mod secrets;
