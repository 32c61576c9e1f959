//! Tracks how long the focused browser tab stays on each website, classifies the time as
//! productive, unproductive or neutral, and keeps per day aggregates both locally and in a small
//! aggregation service.
//!

pub mod classifier;
pub mod cli;
pub mod config;
pub mod daemon;
pub mod fs;
pub mod server;
pub mod sync;
pub mod utils;
