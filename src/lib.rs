//! gx-cascade - Coordinate cascading republishing of gx packages
//!
//! When a shared dependency changes, every package that depends on it has
//! to be republished, lowest first. gx-cascade computes that order, tracks
//! which packages have been republished across invocations, and detects
//! publications made against dependency hashes that have since changed.

pub mod cli;
pub mod domain;
pub mod storage;

pub use domain::{gather, Hash, Todo, WorkflowState};
