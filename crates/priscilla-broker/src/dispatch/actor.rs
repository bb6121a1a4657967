//! The dispatcher: single owner of the connection table and the responder
//! registries.
//!
//! Every state change happens inside [`Dispatcher::run`], one request at a
//! time, so neither table needs a lock. Anything that may block for long
//! (running a responder, relaying unhandled commands) is spawned.

use std::sync::Arc;

use priscilla_core::config::REQUEST_CHANNEL_CAPACITY;
use priscilla_protocol::{actions, Envelope, EnvelopeKind};
use priscilla_responders::Responders;
use tokio::sync::{mpsc, oneshot, watch};
use tracing::{debug, error, info, warn};

use crate::conn::{handshake, send, send::SharedSink};
use crate::dispatch::registry::ConnectionRegistry;
use crate::dispatch::request::{DispatchRequest, Submitter};
use crate::invoke::{self, Invoker};

pub struct Dispatcher {
    rx: mpsc::Receiver<DispatchRequest>,
    submit: Submitter,
    connections: ConnectionRegistry,
    responders: Responders,
    invoker: Arc<dyn Invoker>,
    secret: String,
}

impl Dispatcher {
    /// Build a dispatcher and the handle used to feed it.
    pub fn new(responders: Responders, invoker: Arc<dyn Invoker>, secret: impl Into<String>) -> (Self, Submitter) {
        let (tx, rx) = mpsc::channel(REQUEST_CHANNEL_CAPACITY);
        let submit = Submitter::new(tx);
        let dispatcher = Self {
            rx,
            submit: submit.clone(),
            connections: ConnectionRegistry::new(),
            responders,
            invoker,
            secret: secret.into(),
        };
        (dispatcher, submit)
    }

    /// Process requests until `shutdown` broadcasts `true`.
    ///
    /// The dispatcher holds a [`Submitter`] itself, so the channel never
    /// closes on its own.
    pub async fn run(mut self, mut shutdown: watch::Receiver<bool>) {
        info!("dispatcher started");
        loop {
            let req = tokio::select! {
                changed = shutdown.changed() => {
                    if changed.is_err() || *shutdown.borrow() {
                        break;
                    }
                    continue;
                }
                req = self.rx.recv() => match req {
                    Some(req) => req,
                    None => break,
                },
            };
            self.handle(req).await;
        }
        info!(connections = self.connections.len(), "dispatcher stopped");
    }

    async fn handle(&mut self, req: DispatchRequest) {
        match req {
            DispatchRequest::Engage { envelope, sink, reply } => self.engage(envelope, sink, reply).await,
            DispatchRequest::Inbound(envelope) => self.inbound(envelope).await,
            DispatchRequest::Deliver(envelope) => self.forward(envelope).await,
        }
    }

    async fn engage(&mut self, envelope: Envelope, sink: SharedSink, reply: oneshot::Sender<String>) {
        let requested = envelope.source;
        let verdict = match (&envelope.command, envelope.kind) {
            (Some(cmd), EnvelopeKind::Command) if cmd.action == actions::ENGAGE => {
                let now = chrono::Utc::now().timestamp();
                handshake::verify_engagement(cmd, &requested, &self.secret, now)
            }
            _ => Err("first envelope must be an engage command".to_string()),
        };

        if let Err(reason) = verdict {
            warn!(requested = %requested, reason = %reason, "engagement refused");
            if let Err(e) = send::envelope(&sink, Envelope::terminate(&requested, &reason)).await {
                debug!(error = %e, "could not deliver terminate");
            }
            let _ = reply.send(String::new());
            return;
        }

        let id = self.connections.claim_id(&requested);
        if !requested.is_empty() && id != requested {
            warn!(requested = %requested, assigned = %id, "requested id unavailable, assigned a fresh one");
        }
        self.connections.insert(id.clone(), sink.clone());
        info!(conn_id = %id, connections = self.connections.len(), "connection engaged");

        if let Err(e) = send::envelope(&sink, Envelope::proceed(&id)).await {
            warn!(conn_id = %id, error = %e, "could not deliver proceed");
        }
        let _ = reply.send(id);
    }

    async fn inbound(&mut self, envelope: Envelope) {
        if let Err(e) = envelope.validate() {
            error!(source = %envelope.source, code = e.code(), error = %e, "invalid envelope");
            return;
        }

        match envelope.kind {
            EnvelopeKind::Command => self.command(envelope),
            EnvelopeKind::Message if envelope.has_destination() => self.forward(envelope).await,
            EnvelopeKind::Message => self.route(envelope),
        }
    }

    fn command(&mut self, envelope: Envelope) {
        let action = envelope.action().unwrap_or_default().to_string();
        match action.as_str() {
            actions::ENGAGE => {
                error!(source = %envelope.source, "engage from an already engaged connection");
            }
            actions::DISENGAGE => self.disengage(&envelope.source),
            actions::REGISTER => {
                let Some(cmd) = envelope.command.as_ref() else {
                    return;
                };
                if let Err(e) = self.responders.register(&envelope.source, cmd) {
                    warn!(source = %envelope.source, code = e.code(), error = %e, "registration rejected");
                }
            }
            _ => {
                let invoker = Arc::clone(&self.invoker);
                let submit = self.submit.clone();
                tokio::spawn(async move { invoker.command(envelope, &submit).await });
            }
        }
    }

    fn disengage(&mut self, id: &str) {
        if !self.connections.remove(id) {
            debug!(conn_id = %id, "disengage for unknown connection");
            return;
        }
        let pruned = self.responders.prune_source(id);
        info!(conn_id = %id, pruned, connections = self.connections.len(), "connection disengaged");
    }

    fn route(&self, envelope: Envelope) {
        let Some(message) = envelope.message.as_ref() else {
            return;
        };
        let plan = self.responders.route(&envelope.source, message);
        if plan.is_empty() {
            return;
        }
        debug!(source = %envelope.source, steps = plan.len(), "dispatching routing plan");
        let invoker = Arc::clone(&self.invoker);
        tokio::spawn(invoke::run_plan(invoker, plan, self.submit.clone()));
    }

    /// Write an envelope to the connection named by `to`.
    ///
    /// The write happens inline, so a peer that stops reading stalls the
    /// dispatcher until its socket buffer drains or the peer goes away.
    async fn forward(&self, envelope: Envelope) {
        let Some(sink) = self.connections.get(&envelope.to) else {
            error!(to = %envelope.to, source = %envelope.source, "cannot find destination");
            return;
        };
        let to = envelope.to.clone();
        if let Err(e) = send::envelope(sink, envelope).await {
            warn!(to = %to, error = %e, "write to connection failed");
        }
    }
}
