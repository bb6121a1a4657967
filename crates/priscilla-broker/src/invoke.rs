//! Side effects of routing decisions.
//!
//! The dispatcher only decides *what* should happen; an [`Invoker`] does it on
//! a detached task and feeds any follow-up envelopes back through a
//! [`Submitter`].

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use priscilla_core::config::SERVER_ID;
use priscilla_protocol::{Envelope, Message};
use priscilla_responders::{ActiveInvocation, HelpReply, Invocation, PassiveInvocation};
use tracing::{debug, warn};

use crate::dispatch::Submitter;

#[async_trait]
pub trait Invoker: Send + Sync + 'static {
    /// Run a matched passive responder.
    async fn passive(&self, invocation: PassiveInvocation, submit: &Submitter);

    /// Hand a matched message to the connection owning an active responder.
    async fn active(&self, invocation: ActiveInvocation, submit: &Submitter);

    /// Answer a help query.
    async fn help(&self, reply: HelpReply, submit: &Submitter);

    /// Any command the dispatcher does not handle itself.
    async fn command(&self, envelope: Envelope, submit: &Submitter);
}

/// Execute a routing plan strictly in order.
pub async fn run_plan(invoker: Arc<dyn Invoker>, plan: Vec<Invocation>, submit: Submitter) {
    for step in plan {
        match step {
            Invocation::Help(reply) => invoker.help(reply, &submit).await,
            Invocation::Passive(inv) => invoker.passive(inv, &submit).await,
            Invocation::Active(inv) => invoker.active(inv, &submit).await,
        }
    }
}

/// Default invoker: passive responders are local processes whose stdout is
/// posted back to the originating room.
#[derive(Debug, Default, Clone)]
pub struct BrokerInvoker;

impl BrokerInvoker {
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl Invoker for BrokerInvoker {
    async fn passive(&self, inv: PassiveInvocation, submit: &Submitter) {
        debug!(responder = %inv.responder, cmd = %inv.cmd, args = ?inv.args, "running passive responder");

        let run = tokio::process::Command::new(&inv.cmd)
            .args(&inv.args)
            .env("PRISCILLA_ROOM", &inv.room)
            .env("PRISCILLA_ADAPTER", &inv.adapter)
            .kill_on_drop(true)
            .output();

        let out = match tokio::time::timeout(Duration::from_secs(inv.timeout_secs), run).await {
            Err(_) => {
                warn!(responder = %inv.responder, timeout_secs = inv.timeout_secs, "passive responder timed out");
                return;
            }
            Ok(Err(e)) => {
                warn!(responder = %inv.responder, cmd = %inv.cmd, error = %e, "failed to launch passive responder");
                return;
            }
            Ok(Ok(out)) => out,
        };

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr);
            warn!(
                responder = %inv.responder,
                exit = out.status.code().unwrap_or(-1),
                stderr = %stderr.trim(),
                "passive responder failed"
            );
            return;
        }

        let text = String::from_utf8_lossy(&out.stdout).trim().to_string();
        if text.is_empty() {
            return;
        }
        let reply = Message {
            text,
            room: inv.room,
            ..Default::default()
        };
        if let Err(e) = submit.deliver(Envelope::message(SERVER_ID, inv.adapter, reply)).await {
            warn!(responder = %inv.responder, error = %e, "dropping passive responder output");
        }
    }

    async fn active(&self, inv: ActiveInvocation, submit: &Submitter) {
        // Source is the adapter so the responder knows where to answer.
        let env = Envelope::message(inv.adapter, inv.responder, inv.message);
        if let Err(e) = submit.deliver(env).await {
            warn!(error = %e, "dropping active responder invocation");
        }
    }

    async fn help(&self, reply: HelpReply, submit: &Submitter) {
        let msg = Message {
            text: reply.text,
            room: reply.room,
            ..Default::default()
        };
        if let Err(e) = submit.deliver(Envelope::message(SERVER_ID, reply.adapter, msg)).await {
            warn!(error = %e, "dropping help reply");
        }
    }

    async fn command(&self, envelope: Envelope, submit: &Submitter) {
        if envelope.has_destination() {
            if let Err(e) = submit.deliver(envelope).await {
                warn!(error = %e, "dropping relayed command");
            }
            return;
        }
        debug!(
            source = %envelope.source,
            action = envelope.action().unwrap_or_default(),
            "no handler for command"
        );
    }
}
