//! Review workflow
//!
//! Sequences store reads and writes around the assignment policy for team,
//! user and pull request operations.

pub mod orchestrator;

pub use orchestrator::ReviewWorkflow;
