//! Stage worker execution loop.
//!
//! A worker waits for one envelope on every inbound pipe, strictly in
//! `requires` order, then either forwards the round's failure or runs its
//! computation once and broadcasts the result to every outbound pipe.
//! Computations are synchronous and run on tokio's blocking pool, so
//! independent stages overlap whatever the runtime flavour. When
//! an inbound pipe closes the worker drops its outbound pipes, which carries
//! the shutdown wave downstream, and stops for good.

use crate::config::ErrorPolicy;
use crate::pipe::{Envelope, Inlet, Outlet};
use dagflow_core::{FlowError, StageId};
use dagflow_plan::{Inputs, Stage};

/// One round of inputs: values bound to producers, plus any failures
struct Round<T> {
    slots: Vec<(StageId, T)>,
    failures: Vec<FlowError>,
}

/// Runtime counterpart of a stage descriptor
pub(crate) struct StageWorker<T> {
    stage: Stage<T>,
    inlets: Vec<Inlet<T>>,
    outlets: Vec<Outlet<T>>,
    policy: ErrorPolicy,
}

impl<T: Clone + Send + 'static> StageWorker<T> {
    pub(crate) fn new(stage: Stage<T>, policy: ErrorPolicy) -> Self {
        Self {
            stage,
            inlets: Vec::new(),
            outlets: Vec::new(),
            policy,
        }
    }

    /// Append an inbound pipe; call in `requires` order
    pub(crate) fn bind_input(&mut self, inlet: Inlet<T>) {
        self.inlets.push(inlet);
    }

    /// Append an outbound pipe
    pub(crate) fn bind_output(&mut self, outlet: Outlet<T>) {
        self.outlets.push(outlet);
    }

    pub(crate) async fn run(mut self) {
        let mut rounds: u64 = 0;

        loop {
            let Some(round) = self.receive().await else {
                break;
            };

            let Some(envelope) = self.evaluate(round).await else {
                break;
            };
            if !self.broadcast(envelope).await {
                break;
            }

            rounds += 1;
            tracing::trace!(rounds, "round complete");
        }

        tracing::debug!(rounds, "stage collapsed");
    }

    /// Read one envelope per inbound pipe, in index order
    async fn receive(&mut self) -> Option<Round<T>> {
        let mut round = Round {
            slots: Vec::with_capacity(self.inlets.len()),
            failures: Vec::new(),
        };

        for inlet in &mut self.inlets {
            match inlet.recv().await? {
                Ok(value) => round.slots.push((inlet.producer().clone(), value)),
                Err(err) => round.failures.push(err),
            }
        }

        Some(round)
    }

    /// Forward the round's failure or run the computation on the blocking pool
    ///
    /// Returns `None` if the runtime cancelled the computation. A panicking
    /// computation takes the worker task down with it.
    async fn evaluate(&self, round: Round<T>) -> Option<Envelope<T>> {
        if let Some(err) = self.policy.merge(round.failures) {
            tracing::debug!(error = %err, "forwarding upstream failure");
            return Some(Err(err));
        }

        let stage = self.stage.clone();
        let inputs = Inputs::new(round.slots);
        let result = match tokio::task::spawn_blocking(move || stage.call(inputs)).await {
            Ok(result) => result,
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(err) => {
                tracing::debug!(error = %err, "stage computation cancelled");
                return None;
            }
        };

        Some(result.map_err(|source| {
            tracing::debug!(error = %source, "stage computation failed");
            FlowError::stage_failed(self.stage.id().clone(), source)
        }))
    }

    /// Send the same envelope to every outbound pipe
    ///
    /// Returns `false` once a consumer is gone.
    async fn broadcast(&self, envelope: Envelope<T>) -> bool {
        let Some((last, rest)) = self.outlets.split_last() else {
            return true;
        };

        for outlet in rest {
            if outlet.send(envelope.clone()).await.is_err() {
                return false;
            }
        }

        last.send(envelope).await.is_ok()
    }
}
