//! Schema Module - Projection onto the correction model's columns
//!
//! ## Structure
//! - `columns`: name normalization + legacy alias table
//! - `expected`: ExpectedSchema loading
//! - `aligner`: align() + SchemaCoverage

pub mod columns;
pub mod expected;
pub mod aligner;


pub use columns::{canonical_column, normalize_column_name};
pub use expected::ExpectedSchema;
pub use aligner::{align, AlignedVector, SchemaCoverage};
