//! Execution graph assembly.
//!
//! An [`ExecutionGraph`] is the validated, immutable blueprint of a
//! computation: the caller's stages plus the entry and exit terminals.
//! It owns no runtime resources and can be shared by any number of live
//! networks.

use crate::stage::{Computation, Inputs, Stage};
use crate::validate::{Validator, successors};
use dagflow_core::{BoxError, PlanError, PlanResult, StageId};
use indexmap::IndexMap;
use std::sync::Arc;

/// A validated DAG of stages with a single entry and a single exit
pub struct ExecutionGraph<T> {
    stages: Arc<IndexMap<StageId, Stage<T>>>,
}

impl<T: 'static> ExecutionGraph<T> {
    /// Assemble and validate an execution graph
    ///
    /// `exit_requires` names the stages whose outputs feed `exit`, in
    /// argument order.
    ///
    /// # Errors
    ///
    /// Returns a construction error if a label is empty, duplicated or
    /// reserved, a dependency is unknown, the stages form a loop, or some
    /// stage is dangling or unreachable.
    pub fn new<I, R, F>(
        exit_requires: I,
        exit: F,
        stages: impl IntoIterator<Item = Stage<T>>,
    ) -> PlanResult<Self>
    where
        I: IntoIterator<Item = R>,
        R: Into<StageId>,
        F: Fn(Inputs<T>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let requires = exit_requires.into_iter().map(Into::into).collect();
        Self::assemble(stages.into_iter().collect(), requires, Arc::new(exit))
    }

    /// Start a fluent graph builder
    #[must_use]
    pub fn builder() -> GraphBuilder<T> {
        GraphBuilder::new()
    }

    fn assemble(
        stages: Vec<Stage<T>>,
        exit_requires: Vec<StageId>,
        exit: Computation<T>,
    ) -> PlanResult<Self> {
        let validator = Validator::new();
        validator.check_labels(&stages)?;

        let mut map = IndexMap::with_capacity(stages.len() + 2);
        map.insert(StageId::Entry, Stage::entry());
        for stage in stages {
            map.insert(stage.id().clone(), stage);
        }
        map.insert(StageId::Exit, Stage::exit(exit_requires, exit));

        validator.validate(&map)?;

        tracing::debug!(stages = map.len(), "execution graph validated");

        Ok(Self {
            stages: Arc::new(map),
        })
    }
}

impl<T> ExecutionGraph<T> {
    /// Get a stage by identity
    #[must_use]
    pub fn get(&self, id: &StageId) -> Option<&Stage<T>> {
        self.stages.get(id)
    }

    /// Iterate over all stages, terminals included
    pub fn stages(&self) -> impl Iterator<Item = &Stage<T>> {
        self.stages.values()
    }

    /// Get total stage count, terminals included
    #[must_use]
    pub fn stage_count(&self) -> usize {
        self.stages.len()
    }

    /// Get total dependency edge count
    #[must_use]
    pub fn edge_count(&self) -> usize {
        self.stages.values().map(|s| s.requires().len()).sum()
    }

    /// Get stages that require the given stage, once per edge
    #[must_use]
    pub fn dependents(&self, id: &StageId) -> Vec<&StageId> {
        self.stages
            .iter()
            .flat_map(move |(stage, s)| {
                s.requires().iter().filter(move |d| *d == id).map(move |_| stage)
            })
            .collect()
    }

    /// Successor adjacency of the whole graph
    #[must_use]
    pub fn successors(&self) -> crate::validate::Adjacency {
        successors(&self.stages)
    }
}

impl<T> Clone for ExecutionGraph<T> {
    fn clone(&self) -> Self {
        Self {
            stages: Arc::clone(&self.stages),
        }
    }
}

impl<T> std::fmt::Debug for ExecutionGraph<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ExecutionGraph")
            .field("stages", &self.stages.values().collect::<Vec<_>>())
            .finish()
    }
}

/// Fluent builder for [`ExecutionGraph`]
pub struct GraphBuilder<T> {
    stages: Vec<Stage<T>>,
    exit: Option<(Vec<StageId>, Computation<T>)>,
}

impl<T: 'static> GraphBuilder<T> {
    /// Create an empty builder
    #[must_use]
    pub fn new() -> Self {
        Self {
            stages: Vec::new(),
            exit: None,
        }
    }

    /// Add a stage
    #[must_use]
    pub fn stage(mut self, stage: Stage<T>) -> Self {
        self.stages.push(stage);
        self
    }

    /// Declare a stage in place
    #[must_use]
    pub fn with_stage<I, R, F>(self, id: impl Into<StageId>, requires: I, computation: F) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StageId>,
        F: Fn(Inputs<T>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        self.stage(Stage::new(id, requires, computation))
    }

    /// Set the exit aggregation
    #[must_use]
    pub fn exit<I, R, F>(mut self, requires: I, computation: F) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StageId>,
        F: Fn(Inputs<T>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        let requires = requires.into_iter().map(Into::into).collect();
        self.exit = Some((requires, Arc::new(computation)));
        self
    }

    /// Validate and freeze the graph
    ///
    /// # Errors
    ///
    /// Returns `MissingTerminal` if no exit was declared, otherwise any
    /// error of [`ExecutionGraph::new`]
    pub fn build(self) -> PlanResult<ExecutionGraph<T>> {
        let (requires, exit) = self.exit.ok_or(PlanError::MissingTerminal {
            stage: StageId::Exit,
        })?;
        ExecutionGraph::assemble(self.stages, requires, exit)
    }
}

impl<T: 'static> Default for GraphBuilder<T> {
    fn default() -> Self {
        Self::new()
    }
}
