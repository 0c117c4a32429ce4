//! # Controller
//!
//! Core sync modules.
//!
//! - `address`: `s3://bucket/prefix` parsing
//! - `backoff`: exponential backoff for retries
//! - `fetcher`: object download and atomic file writes
//! - `integrity`: MD5 comparison against object ETags
//! - `reconciler`: the sync run itself

pub mod address;
pub mod backoff;
pub mod fetcher;
pub mod integrity;
pub mod reconciler;
