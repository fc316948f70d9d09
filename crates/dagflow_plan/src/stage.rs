//! Stage descriptors.
//!
//! A stage is an immutable declaration: an identity, an ordered list of the
//! stages it requires, and the computation applied to their outputs. The
//! order of `requires` fixes the order of the computation's inputs.

use dagflow_core::{BoxError, StageId};
use std::sync::Arc;

/// Computation run by a stage, shared by every network spawned from a graph
pub type Computation<T> = Arc<dyn Fn(Inputs<T>) -> Result<T, BoxError> + Send + Sync>;

/// A named unit of computation with declared dependencies
pub struct Stage<T> {
    id: StageId,
    requires: Vec<StageId>,
    computation: Computation<T>,
}

impl<T> Stage<T> {
    /// Create a new stage
    ///
    /// `requires` lists the stages whose outputs feed this one; inputs are
    /// handed to `computation` in exactly that order. Use [`StageId::Entry`]
    /// to consume the external argument.
    pub fn new<I, R, F>(id: impl Into<StageId>, requires: I, computation: F) -> Self
    where
        I: IntoIterator<Item = R>,
        R: Into<StageId>,
        F: Fn(Inputs<T>) -> Result<T, BoxError> + Send + Sync + 'static,
    {
        Self {
            id: id.into(),
            requires: requires.into_iter().map(Into::into).collect(),
            computation: Arc::new(computation),
        }
    }

    /// Get the stage identity
    #[must_use]
    pub fn id(&self) -> &StageId {
        &self.id
    }

    /// Get the required stages, in argument order
    #[must_use]
    pub fn requires(&self) -> &[StageId] {
        &self.requires
    }

    /// Get the shared computation
    #[must_use]
    pub fn computation(&self) -> &Computation<T> {
        &self.computation
    }

    /// Run the computation on one round of inputs
    ///
    /// # Errors
    ///
    /// Returns whatever error the computation returns
    pub fn call(&self, inputs: Inputs<T>) -> Result<T, BoxError> {
        (self.computation)(inputs)
    }
}

impl<T: 'static> Stage<T> {
    /// Entry stage: passes the external argument through unchanged
    pub(crate) fn entry() -> Self {
        Self::new(StageId::Entry, Vec::<StageId>::new(), |inputs: Inputs<T>| {
            inputs
                .into_values()
                .into_iter()
                .next()
                .ok_or_else(|| "entry stage received no argument".into())
        })
    }

    /// Exit stage: aggregates the outputs named in `requires`
    pub(crate) fn exit(requires: Vec<StageId>, computation: Computation<T>) -> Self {
        Self {
            id: StageId::Exit,
            requires,
            computation,
        }
    }
}

impl<T> Clone for Stage<T> {
    fn clone(&self) -> Self {
        Self {
            id: self.id.clone(),
            requires: self.requires.clone(),
            computation: Arc::clone(&self.computation),
        }
    }
}

impl<T> std::fmt::Debug for Stage<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stage")
            .field("id", &self.id)
            .field("requires", &self.requires)
            .finish_non_exhaustive()
    }
}

/// Inputs of one round, each bound to the stage that produced it
///
/// Slots keep the order of the stage's `requires` list, so positional
/// access and lookup by producer always agree.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inputs<T> {
    slots: Vec<(StageId, T)>,
}

impl<T> Inputs<T> {
    /// Create inputs from `(producer, value)` slots in argument order
    #[must_use]
    pub fn new(slots: Vec<(StageId, T)>) -> Self {
        Self { slots }
    }

    /// Number of inputs
    #[must_use]
    pub fn len(&self) -> usize {
        self.slots.len()
    }

    /// Whether there are no inputs
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    /// Value produced by the ordinary stage `label`
    #[must_use]
    pub fn get(&self, label: &str) -> Option<&T> {
        self.slots
            .iter()
            .find(|(id, _)| id.is_named(label))
            .map(|(_, value)| value)
    }

    /// Value produced by the stage `id`
    #[must_use]
    pub fn get_by_id(&self, id: &StageId) -> Option<&T> {
        self.slots
            .iter()
            .find(|(slot, _)| slot == id)
            .map(|(_, value)| value)
    }

    /// Iterate over `(producer, value)` slots in argument order
    pub fn iter(&self) -> impl Iterator<Item = (&StageId, &T)> {
        self.slots.iter().map(|(id, value)| (id, value))
    }

    /// Iterate over values in argument order
    pub fn values(&self) -> impl Iterator<Item = &T> {
        self.slots.iter().map(|(_, value)| value)
    }

    /// Take the values in argument order
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.slots.into_iter().map(|(_, value)| value).collect()
    }
}

impl<T> std::ops::Index<usize> for Inputs<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        &self.slots[index].1
    }
}
