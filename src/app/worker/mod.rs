//! Fetch workers and their statistics
//!
//! A worker is one concurrent execution unit with an isolated counter state
//! and a single publication point at exit. The pool owns the workers'
//! lifecycle and the shutdown flag; aggregation happens only after every
//! worker has joined.

pub mod core;
pub mod pool;
pub mod stats;

pub use core::FetchWorker;
pub use pool::{WorkerConfig, WorkerPool};
pub use stats::{AggregateResult, WorkerStats};
