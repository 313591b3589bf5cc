//! Shared solver abstractions for tandem.
//!
//! Both backends and the model layer speak this vocabulary.
//!
//! # Overview
//!
//! - [`Method`]: which solving strategy a model dispatches to
//! - [`SolveStatus`]: terminal status of a solve
//! - [`SolverConfig`]: strategy selection and limits
//! - [`SolverError`]: contract violations in configuration and timing
//! - [`CpuBudget`]: CPU-time budget polled for cooperative cancellation

mod budget;
mod config;
mod error;
mod method;
mod status;

pub use budget::CpuBudget;
pub use config::SolverConfig;
pub use error::SolverError;
pub use method::Method;
pub use status::SolveStatus;
