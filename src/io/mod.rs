//! Input/output helpers.
//!
//! - CSV ingest into a raw string table (`ingest`)
//! - canonical CSV, summary JSON and forecast CSV exports (`export`)

pub mod export;
pub mod ingest;

pub use export::*;
pub use ingest::*;
