use priscilla_core::{PriscillaError, Result};
use priscilla_protocol::Envelope;
use tokio::sync::{mpsc, oneshot};

use crate::conn::send::SharedSink;

/// One unit of work for the dispatcher.
pub enum DispatchRequest {
    /// First envelope of a connection. The dispatcher answers on `reply` with
    /// the assigned id, or an empty string when engagement is refused.
    Engage {
        envelope: Envelope,
        sink: SharedSink,
        reply: oneshot::Sender<String>,
    },
    /// Envelope from an engaged connection (or synthesized on its behalf).
    Inbound(Envelope),
    /// Follow-up from an invocation task, written to `to` without further handling.
    Deliver(Envelope),
}

/// Cloneable handle for feeding the dispatcher channel.
#[derive(Clone)]
pub struct Submitter {
    tx: mpsc::Sender<DispatchRequest>,
}

impl Submitter {
    pub fn new(tx: mpsc::Sender<DispatchRequest>) -> Self {
        Self { tx }
    }

    pub async fn engage(
        &self,
        envelope: Envelope,
        sink: SharedSink,
        reply: oneshot::Sender<String>,
    ) -> Result<()> {
        self.send(DispatchRequest::Engage {
            envelope,
            sink,
            reply,
        })
        .await
    }

    /// Queue an envelope for full dispatch (validation, routing, matching).
    pub async fn submit(&self, envelope: Envelope) -> Result<()> {
        self.send(DispatchRequest::Inbound(envelope)).await
    }

    /// Queue an envelope for verbatim delivery to its `to` connection.
    pub async fn deliver(&self, envelope: Envelope) -> Result<()> {
        self.send(DispatchRequest::Deliver(envelope)).await
    }

    async fn send(&self, req: DispatchRequest) -> Result<()> {
        self.tx
            .send(req)
            .await
            .map_err(|_| PriscillaError::Internal("dispatcher is not running".to_string()))
    }
}
