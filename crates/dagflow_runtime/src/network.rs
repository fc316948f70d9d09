//! Flow network construction and lifecycle.
//!
//! A [`FlowNetwork`] is one live instance of an [`ExecutionGraph`]: a worker
//! task per stage and a single-slot pipe per dependency edge, plus an
//! ingress pipe feeding the entry stage and an egress pipe draining the exit
//! stage. Networks spawned from the same graph share nothing mutable.

use crate::config::NetworkConfig;
use crate::pipe::{Inlet, Outlet, pipe};
use crate::worker::StageWorker;
use dagflow_core::{FlowError, FlowResult, NetworkId, StageId};
use dagflow_plan::ExecutionGraph;
use indexmap::IndexMap;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::Instrument;

/// Spawning flow networks from an execution graph
pub trait ExecutionGraphExt<T> {
    /// Spawn a network on the current tokio runtime with default config
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime
    fn run(&self) -> FlowNetwork<T>;

    /// Spawn a network on the current tokio runtime
    ///
    /// # Panics
    ///
    /// Panics if called outside of a tokio runtime
    fn run_with(&self, config: NetworkConfig) -> FlowNetwork<T>;

    /// Spawn a network on an explicit runtime
    fn run_on(&self, handle: &Handle, config: NetworkConfig) -> FlowNetwork<T>;
}

impl<T: Clone + Send + 'static> ExecutionGraphExt<T> for ExecutionGraph<T> {
    fn run(&self) -> FlowNetwork<T> {
        self.run_with(NetworkConfig::default())
    }

    fn run_with(&self, config: NetworkConfig) -> FlowNetwork<T> {
        FlowNetwork::spawn(self, config, &Handle::current())
    }

    fn run_on(&self, handle: &Handle, config: NetworkConfig) -> FlowNetwork<T> {
        FlowNetwork::spawn(self, config, handle)
    }
}

/// One live, concurrent instance of an execution graph
///
/// Only one invocation can be in flight at a time; spawn more networks
/// from the same graph for concurrent throughput. Dropping the network
/// collapses it.
pub struct FlowNetwork<T> {
    id: NetworkId,
    ingress: Option<Outlet<T>>,
    egress: Inlet<T>,
    workers: Vec<(StageId, JoinHandle<()>)>,
    pipes: usize,
    /// Submitted arguments whose results were never read
    pending: usize,
}

impl<T: Clone + Send + 'static> FlowNetwork<T> {
    /// Wire and start a network for `graph` on `handle`
    pub fn spawn(graph: &ExecutionGraph<T>, config: NetworkConfig, handle: &Handle) -> Self {
        let id = NetworkId::new();
        let policy = config.error_policy;

        let mut workers: IndexMap<StageId, StageWorker<T>> = graph
            .stages()
            .map(|stage| (stage.id().clone(), StageWorker::new(stage.clone(), policy)))
            .collect();

        for stage in graph.stages() {
            for dependency in stage.requires() {
                let (outlet, inlet) = pipe(dependency.clone());
                workers[stage.id()].bind_input(inlet);
                workers[dependency].bind_output(outlet);
            }
        }

        let (ingress, entry_inlet) = pipe(StageId::Entry);
        let (exit_outlet, egress) = pipe(StageId::Exit);
        workers[&StageId::Entry].bind_input(entry_inlet);
        workers[&StageId::Exit].bind_output(exit_outlet);

        let name = config.name.unwrap_or_default();
        let workers = workers
            .into_iter()
            .map(|(stage, worker)| {
                let span =
                    tracing::debug_span!("stage", network = %id, label = %name, stage = %stage);
                let task = handle.spawn(worker.run().instrument(span));
                (stage, task)
            })
            .collect::<Vec<_>>();

        let pipes = graph.edge_count() + 2;
        tracing::debug!(
            network = %id,
            label = %name,
            workers = workers.len(),
            pipes,
            "flow network spawned"
        );

        Self {
            id,
            ingress: Some(ingress),
            egress,
            workers,
            pipes,
            pending: 0,
        }
    }

    /// Run one argument through the network and wait for its result
    ///
    /// If a previous invocation was cancelled after submitting its argument,
    /// its result is discarded first.
    ///
    /// # Errors
    ///
    /// Returns the failure of the first stage that failed on this argument,
    /// or `Collapsed` if the network has been torn down
    pub async fn invoke(&mut self, arg: T) -> FlowResult<T> {
        if self.ingress.is_none() {
            return Err(FlowError::Collapsed);
        }

        while self.pending > 0 {
            self.egress.recv().await.ok_or(FlowError::Collapsed)?.ok();
            self.pending -= 1;
        }

        let ingress = self.ingress.as_ref().ok_or(FlowError::Collapsed)?;
        ingress.send(Ok(arg)).await?;
        self.pending += 1;

        let envelope = self.egress.recv().await.ok_or(FlowError::Collapsed)?;
        self.pending -= 1;
        envelope
    }

    /// Blocking variant of [`FlowNetwork::invoke`]
    ///
    /// # Errors
    ///
    /// Same as [`FlowNetwork::invoke`]
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context
    pub fn invoke_blocking(&mut self, arg: T) -> FlowResult<T> {
        if self.ingress.is_none() {
            return Err(FlowError::Collapsed);
        }

        while self.pending > 0 {
            self.egress.blocking_recv().ok_or(FlowError::Collapsed)?.ok();
            self.pending -= 1;
        }

        let ingress = self.ingress.as_ref().ok_or(FlowError::Collapsed)?;
        ingress.blocking_send(Ok(arg))?;
        self.pending += 1;

        let envelope = self.egress.blocking_recv().ok_or(FlowError::Collapsed)?;
        self.pending -= 1;
        envelope
    }

    /// Collapse the network and wait for every worker to stop
    ///
    /// # Errors
    ///
    /// Returns `WorkerPanicked` for the first worker that panicked
    pub async fn shutdown(mut self) -> FlowResult<()> {
        self.collapse();
        self.egress.close();

        let (stages, tasks): (Vec<_>, Vec<_>) =
            std::mem::take(&mut self.workers).into_iter().unzip();
        let results = futures::future::join_all(tasks).await;

        for (stage, result) in stages.into_iter().zip(results) {
            if let Err(err) = result {
                tracing::debug!(
                    network = %self.id,
                    stage = %stage,
                    error = %err,
                    "worker did not finish"
                );
                if err.is_panic() {
                    return Err(FlowError::WorkerPanicked { stage });
                }
                return Err(FlowError::Collapsed);
            }
        }

        Ok(())
    }
}

impl<T> FlowNetwork<T> {
    /// Close the ingress pipe; the shutdown wave stops every worker
    ///
    /// Calling it again has no effect.
    pub fn collapse(&mut self) {
        if self.ingress.take().is_some() {
            tracing::debug!(network = %self.id, "flow network collapsing");
        }
    }

    /// Whether the network has been collapsed
    #[must_use]
    pub fn is_collapsed(&self) -> bool {
        self.ingress.is_none()
    }

    /// Get the network ID
    #[must_use]
    pub const fn id(&self) -> NetworkId {
        self.id
    }

    /// Get the number of stage workers
    #[must_use]
    pub fn worker_count(&self) -> usize {
        self.workers.len()
    }

    /// Get the number of pipes, ingress and egress included
    #[must_use]
    pub const fn pipe_count(&self) -> usize {
        self.pipes
    }
}

impl<T> std::fmt::Debug for FlowNetwork<T> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FlowNetwork")
            .field("id", &self.id)
            .field("workers", &self.workers.len())
            .field("pipes", &self.pipes)
            .field("collapsed", &self.is_collapsed())
            .finish()
    }
}
