//! Error types for DAGFLOW.
//!
//! Two classes exist: [`PlanError`] is raised synchronously while a graph is
//! assembled and validated, [`FlowError`] travels through a live network as
//! the error half of an envelope.

use crate::id::StageId;
use std::sync::Arc;

/// Boxed error returned by stage computations
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Construction result type
pub type PlanResult<T> = Result<T, PlanError>;

/// Invocation result type
pub type FlowResult<T> = Result<T, FlowError>;

/// Graph construction error
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum PlanError {
    /// Ordinary stage declared with an empty label
    #[error("Stage label must not be empty")]
    EmptyLabel,

    /// Two descriptors share one identity
    #[error("Duplicate stage: {stage}")]
    DuplicateStage {
        /// Offending stage
        stage: StageId,
    },

    /// Caller supplied a descriptor for a terminal stage
    #[error("Stage collides with reserved terminal: {stage}")]
    ReservedStage {
        /// Offending stage
        stage: StageId,
    },

    /// Entry or exit stage absent from the graph
    #[error("Terminal stage not found: {stage}")]
    MissingTerminal {
        /// Missing terminal
        stage: StageId,
    },

    /// A stage requires a stage that does not exist
    #[error("Stage {stage} requires unknown stage {dependency}")]
    UnknownDependency {
        /// Stage declaring the dependency
        stage: StageId,
        /// Unknown dependency
        dependency: StageId,
    },

    /// Dependency edges form a loop
    #[error("Execution graph contains loops")]
    Cycle,

    /// Stage output is never consumed
    #[error("Intermediate stage with no outputs: {stage}")]
    DanglingOutput {
        /// Stage without dependents
        stage: StageId,
    },

    /// Stage cannot be reached from the entry
    #[error("Unreachable stage: {stage}")]
    Unreachable {
        /// Unreachable stage
        stage: StageId,
    },
}

/// Invocation error carried through a flow network
#[derive(Debug, Clone, thiserror::Error)]
pub enum FlowError {
    /// A stage computation failed
    #[error("stage {stage}: {source}")]
    Stage {
        /// Failing stage
        stage: StageId,
        /// Error returned by the computation
        source: Arc<dyn std::error::Error + Send + Sync + 'static>,
    },

    /// Several distinct failures met at one stage in the same round
    #[error("{} stages failed: {}", .0.len(), join_failures(.0))]
    Compound(Vec<FlowError>),

    /// The network has been torn down
    #[error("Flow network collapsed")]
    Collapsed,

    /// A worker task panicked
    #[error("Worker for stage {stage} panicked")]
    WorkerPanicked {
        /// Stage whose worker panicked
        stage: StageId,
    },
}

fn join_failures(failures: &[FlowError]) -> String {
    failures
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FlowError {
    /// Wrap a computation error with the stage that produced it
    #[must_use]
    pub fn stage_failed(stage: StageId, source: BoxError) -> Self {
        Self::Stage {
            stage,
            source: Arc::from(source),
        }
    }

    /// Stage blamed by a single stage failure
    #[must_use]
    pub fn stage(&self) -> Option<&StageId> {
        match self {
            Self::Stage { stage, .. } | Self::WorkerPanicked { stage } => Some(stage),
            Self::Compound(_) | Self::Collapsed => None,
        }
    }

    /// Flattened list of individual failures
    #[must_use]
    pub fn failures(&self) -> Vec<&FlowError> {
        match self {
            Self::Compound(inner) => inner.iter().flat_map(FlowError::failures).collect(),
            other => vec![other],
        }
    }

    /// Whether two errors stem from the same original failure
    ///
    /// A failure that reaches a stage over two paths is cloned, not
    /// recreated, so stage failures compare by the identity of their source.
    #[must_use]
    pub fn same_origin(&self, other: &FlowError) -> bool {
        match (self, other) {
            (Self::Stage { source: a, .. }, Self::Stage { source: b, .. }) => Arc::ptr_eq(a, b),
            (Self::Collapsed, Self::Collapsed) => true,
            (Self::WorkerPanicked { stage: a }, Self::WorkerPanicked { stage: b }) => a == b,
            (Self::Compound(a), Self::Compound(b)) => {
                a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.same_origin(y))
            }
            _ => false,
        }
    }
}
