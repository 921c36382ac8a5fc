//! Domain models for gx-cascade
//!
//! Contains the planning and workflow logic without any I/O concerns.
//! Package data is read through the [`PackageSource`] port.

mod bubble;
mod format;
mod graph;
mod hash;
mod layout;
mod source;
mod todo;
mod workflow;

pub use bubble::{DependencyBubbler, PlanEntry, PlanError};
pub use format::{format_help, render, FormatError, KeyError, Resolve};
pub use graph::{GraphError, PackageGraph, PackageNode};
pub use hash::{DependencySet, Hash};
pub use layout::Layout;
pub use source::{DeclaredDep, LastPublished, Manifest, ManifestError, MemorySource, PackageSource};
pub use todo::{is_reserved, keys_help, KeyDesc, Record, Todo, ALL_KEYS, BASIC_KEYS};
pub use workflow::{gather, Gathered, SessionDocument, WorkflowError, WorkflowState};
