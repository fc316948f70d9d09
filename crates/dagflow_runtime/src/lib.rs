//! DAGFLOW Runtime
//!
//! Spawns a live flow network from a validated execution graph: one tokio
//! task per stage, one single-slot pipe per dependency edge. Independent
//! stages run in parallel, failures travel forward to the caller, and
//! closing the ingress pipe tears the whole network down.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod config;
pub mod network;
pub mod pipe;
mod worker;

pub use config::{ErrorPolicy, NetworkConfig};
pub use network::{ExecutionGraphExt, FlowNetwork};
pub use pipe::{Envelope, PIPE_CAPACITY};
