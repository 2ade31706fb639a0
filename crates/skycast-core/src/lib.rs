//! Hourly-to-daily aggregation and classification for forecast series
//!
//! This crate turns an ordered hourly series of forecast samples into
//! per-day summaries, per-part sky/rain/thunder labels and composed
//! descriptions. Everything here is pure: no I/O, no shared state.

pub mod bucketing;
pub mod cloud;
pub mod config;
pub mod describe;
pub mod error;
pub mod nebulosity;
pub mod pipeline;
pub mod precip;
pub mod rollups;
pub mod types;

pub use bucketing::*;
pub use cloud::*;
pub use config::*;
pub use describe::*;
pub use error::*;
pub use nebulosity::*;
pub use pipeline::*;
pub use precip::*;
pub use rollups::*;
pub use types::*;
