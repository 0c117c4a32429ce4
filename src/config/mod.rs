//! # Configuration
//!
//! - `sync`: per-run settings (source, mode, filters, hook)
//! - `tuning`: operational knobs read from the environment

pub mod sync;
pub mod tuning;

pub use sync::{SyncConfig, SyncMode};
pub use tuning::{parse_bool_flag, TuningConfig};
