//! Rate module for turning observed quotes into a rate graph.
//!
//! This module handles:
//! - Rate entries, stored rates and provenance
//! - Matrix construction (inverse and transitive derivation)
//! - Rate queries, conversion and price tables

pub mod matrix;
pub mod types;

pub use matrix::{BuildReport, RateMatrix, RateMatrixBuilder};
pub use types::{PriceQuote, Provenance, Rate, RateEntry};
