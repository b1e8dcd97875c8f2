//! # Cuenca Parallel
//!
//! Batch orchestration of watershed delineation.
//!
//! This crate provides:
//! - Lazy sequential batches over query points
//! - Rayon-backed batches streaming results over a channel
//! - Cooperative cancellation and per-outcome tallies

pub mod batch;
pub mod strategy;

pub use batch::{
    BatchItem, BatchIter, BatchOutcome, BatchReport, BatchRunner, BatchStream, BatchTally,
    CancelToken, QueryPoint,
};
pub use strategy::{num_cpus, ProcessingMode};
