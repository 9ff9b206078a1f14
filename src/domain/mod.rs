//! Domain types used throughout the pipeline.
//!
//! This module defines:
//!
//! - the canonical schema (`CanonicalField`, `CanonicalRecord`)
//! - field provenance (`Provenance`) for backfill/synthetic flagging
//! - metric availability (`Metric`, `Unavailable`)
//! - the inclusive date window (`DateWindow`)
//! - run configuration (`config`)

pub mod config;
pub mod types;

pub use config::*;
pub use types::*;
