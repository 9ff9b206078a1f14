//! `layerx-warroom` library crate.
//!
//! The binary (`warroom`) is a thin wrapper around this library so that:
//!
//! - the normalizer and metrics engine are testable without spawning processes
//! - a dashboard front-end can call the same pipeline the CLI uses

pub mod app;
pub mod cli;
pub mod domain;
pub mod error;
pub mod forecast;
pub mod io;
pub mod math;
pub mod metrics;
pub mod normalize;
pub mod plot;
pub mod report;
