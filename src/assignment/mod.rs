//! Reviewer assignment policy
//!
//! Pure selection rules for initial reviewers and for replacing a reviewer.
//! No I/O; randomness comes from the caller's generator.

pub mod policy;

pub use policy::{AssignmentPolicy, MAX_REVIEWERS};
