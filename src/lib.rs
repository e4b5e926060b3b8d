//! recipecalc: distribute a target volume across liquids and solids.
//!
//! The whole recipe lives in a percent-encoded URL fragment, so it can be
//! shared or bookmarked and reconstructed without any backend.

pub mod catalog;
pub mod cli;
pub mod core;
