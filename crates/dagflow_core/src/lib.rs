//! DAGFLOW Core Types
//!
//! Identities and error types shared by the planner and the runtime.
//! This crate performs no I/O and spawns nothing.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod id;

// Re-exports
pub use error::{BoxError, FlowError, FlowResult, PlanError, PlanResult};
pub use id::{NetworkId, StageId};
