//! Logic Module - Fusion Engines
//!
//! Data flows strictly left to right per request:
//! detection → features → schema → model (corrector) → report.

pub mod config;
pub mod error;
pub mod profile;
pub mod skin;

pub mod detection;
pub mod features;
pub mod schema;
pub mod model;
pub mod report;
pub mod pipeline;
