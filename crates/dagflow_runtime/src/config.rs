//! Flow network configuration.

use dagflow_core::FlowError;
use serde::{Deserialize, Serialize};

/// How a stage reports several failed inputs in one round
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorPolicy {
    /// Forward only the failure read last; earlier ones are dropped
    #[default]
    LastWins,
    /// Forward every distinct failure as a compound error
    Compound,
}

impl ErrorPolicy {
    /// Merge the failures observed in one round, in read order
    ///
    /// Returns `None` when the round carried no failure.
    #[must_use]
    pub fn merge(self, mut failures: Vec<FlowError>) -> Option<FlowError> {
        match self {
            Self::LastWins => failures.pop(),
            Self::Compound => {
                let mut distinct: Vec<FlowError> = Vec::new();
                for failure in failures.iter().flat_map(FlowError::failures) {
                    if !distinct.iter().any(|seen| seen.same_origin(failure)) {
                        distinct.push(failure.clone());
                    }
                }
                match distinct.len() {
                    0 => None,
                    1 => distinct.pop(),
                    _ => Some(FlowError::Compound(distinct)),
                }
            }
        }
    }
}

/// Flow network configuration
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Optional name attached to the network's log records
    pub name: Option<String>,
    /// Policy for several failed inputs meeting in one round
    pub error_policy: ErrorPolicy,
}

impl NetworkConfig {
    /// Create a default configuration
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the network name
    #[must_use]
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Set the error policy
    #[must_use]
    pub fn with_error_policy(mut self, policy: ErrorPolicy) -> Self {
        self.error_policy = policy;
        self
    }
}
