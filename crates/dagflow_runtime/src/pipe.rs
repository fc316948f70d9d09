//! Single-slot pipes between stage workers.
//!
//! Each dependency edge gets its own pipe with room for exactly one
//! envelope. A producer sending into a full pipe waits until the consumer
//! reads, which is the only backpressure in a network. Closing a pipe is
//! dropping its [`Outlet`].

use dagflow_core::{FlowError, FlowResult, StageId};
use tokio::sync::mpsc;

/// Number of envelopes a pipe can buffer
pub const PIPE_CAPACITY: usize = 1;

/// Unit transmitted on a pipe: a produced value or a propagated error
pub type Envelope<T> = Result<T, FlowError>;

/// Sending end of a pipe
#[derive(Debug)]
pub struct Outlet<T> {
    tx: mpsc::Sender<Envelope<T>>,
}

/// Receiving end of a pipe, bound to the stage that feeds it
#[derive(Debug)]
pub struct Inlet<T> {
    from: StageId,
    rx: mpsc::Receiver<Envelope<T>>,
}

/// Create a pipe carrying the output of stage `from`
#[must_use]
pub fn pipe<T>(from: StageId) -> (Outlet<T>, Inlet<T>) {
    let (tx, rx) = mpsc::channel(PIPE_CAPACITY);
    (Outlet { tx }, Inlet { from, rx })
}

impl<T> Outlet<T> {
    /// Send one envelope, waiting while the slot is occupied
    ///
    /// # Errors
    ///
    /// Returns `Collapsed` if the receiving end is gone
    pub async fn send(&self, envelope: Envelope<T>) -> FlowResult<()> {
        self.tx.send(envelope).await.map_err(|_| FlowError::Collapsed)
    }

    /// Blocking variant of [`Outlet::send`]
    ///
    /// # Errors
    ///
    /// Returns `Collapsed` if the receiving end is gone
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context
    pub fn blocking_send(&self, envelope: Envelope<T>) -> FlowResult<()> {
        self.tx.blocking_send(envelope).map_err(|_| FlowError::Collapsed)
    }

    /// Whether the receiving end is gone
    #[must_use]
    pub fn is_closed(&self) -> bool {
        self.tx.is_closed()
    }
}

impl<T> Inlet<T> {
    /// Stage whose output arrives on this pipe
    #[must_use]
    pub fn producer(&self) -> &StageId {
        &self.from
    }

    /// Receive one envelope; `None` once the pipe is closed and drained
    pub async fn recv(&mut self) -> Option<Envelope<T>> {
        self.rx.recv().await
    }

    /// Blocking variant of [`Inlet::recv`]
    ///
    /// # Panics
    ///
    /// Panics if called from within an asynchronous execution context
    pub fn blocking_recv(&mut self) -> Option<Envelope<T>> {
        self.rx.blocking_recv()
    }

    /// Refuse further envelopes; already buffered ones can still be read
    pub fn close(&mut self) {
        self.rx.close();
    }
}
