//! DAGFLOW Planner
//!
//! Declares computation stages, validates that they form a well-formed DAG
//! with a single entry and a single exit, and freezes the result into an
//! immutable, reusable [`ExecutionGraph`].

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod graph;
pub mod stage;
pub mod validate;

pub use graph::{ExecutionGraph, GraphBuilder};
pub use stage::{Computation, Inputs, Stage};
pub use validate::Validator;
