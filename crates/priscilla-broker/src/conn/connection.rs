use futures_util::StreamExt;
use priscilla_core::config::SERVER_ID;
use priscilla_core::{PriscillaError, Result};
use priscilla_protocol::{actions, Envelope, EnvelopeKind, ProtocolError};
use thiserror::Error;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::oneshot;
use tokio_util::codec::FramedRead;
use tracing::{debug, error, info, trace, warn};

use crate::conn::codec::EnvelopeCodec;
use crate::conn::send::{self, SharedSink};
use crate::dispatch::Submitter;

/// Read-side states, advancing one way only.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConnState {
    AwaitingEngage,
    Engaged(Session),
    Closing,
}

/// What the broker knows about an engaged peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub id: String,
    pub adapter: bool,
}

/// Why an envelope from an engaged peer was not passed on.
#[derive(Debug, Error, PartialEq)]
pub enum Rejection {
    #[error(transparent)]
    Invalid(#[from] ProtocolError),

    #[error("adapters may not register responders")]
    AdapterRegister,

    #[error("responder envelope has no destination")]
    MissingDestination,

    #[error("responders may not send messages to the server")]
    MessageToServer,
}

impl Session {
    /// Apply the boundary policy to an envelope from this peer.
    ///
    /// The claimed `source` is always replaced with the engaged id. Adapters
    /// only ever talk to the broker, so their `to` is cleared except on `info`
    /// commands. Responders must address a concrete connection.
    pub fn admit(&self, mut env: Envelope) -> std::result::Result<Envelope, Rejection> {
        env.validate()?;
        env.source = self.id.clone();

        if self.adapter {
            if env.is_action(actions::REGISTER) {
                return Err(Rejection::AdapterRegister);
            }
            if !env.is_action(actions::INFO) {
                env.to.clear();
            }
        } else if env.to.is_empty() {
            return Err(Rejection::MissingDestination);
        } else if env.kind == EnvelopeKind::Message && env.to == SERVER_ID {
            return Err(Rejection::MessageToServer);
        }
        Ok(env)
    }
}

/// Drive one client connection until it ends.
///
/// The first envelope must engage; every later one passes the session's
/// boundary policy before reaching the dispatcher. When the stream ends
/// (or the peer disengages) the dispatcher is told to forget the connection.
pub async fn serve<S>(stream: S, peer: String, submit: Submitter)
where
    S: AsyncRead + AsyncWrite + Send + 'static,
{
    debug!(peer = %peer, "new connection");
    let (reader, writer) = tokio::io::split(stream);
    let sink = send::shared(writer);
    let mut frames = FramedRead::new(reader, EnvelopeCodec::new());
    let mut state = ConnState::AwaitingEngage;

    while let Some(frame) = frames.next().await {
        let env = match frame {
            Ok(Ok(env)) => env,
            Ok(Err(e)) => {
                warn!(peer = %peer, error = %e, "malformed envelope");
                continue;
            }
            Err(e) => {
                warn!(peer = %peer, error = %e, "connection read failed");
                break;
            }
        };
        trace!(peer = %peer, envelope = ?env, "received");

        state = match state {
            ConnState::AwaitingEngage => match engage(env, &sink, &submit).await {
                Ok(session) => {
                    info!(peer = %peer, conn_id = %session.id, adapter = session.adapter, "engaged");
                    ConnState::Engaged(session)
                }
                Err(e) => {
                    warn!(peer = %peer, code = e.code(), error = %e, "failed to engage");
                    ConnState::Closing
                }
            },
            ConnState::Engaged(session) => {
                let leaving = env.is_action(actions::DISENGAGE);
                match session.admit(env) {
                    Ok(env) => {
                        if submit.submit(env).await.is_err() {
                            ConnState::Closing
                        } else if leaving {
                            // The dispatcher has already been told.
                            return;
                        } else {
                            ConnState::Engaged(session)
                        }
                    }
                    Err(e) => {
                        warn!(conn_id = %session.id, error = %e, "envelope rejected");
                        ConnState::Engaged(session)
                    }
                }
            }
            ConnState::Closing => ConnState::Closing,
        };
        if state == ConnState::Closing {
            break;
        }
    }

    if let ConnState::Engaged(session) = state {
        if let Err(e) = submit.submit(Envelope::disengage(&session.id)).await {
            error!(conn_id = %session.id, error = %e, "could not report disconnect");
        }
    }
    debug!(peer = %peer, "connection closed");
}

/// Hand the first envelope to the dispatcher and wait for the verdict.
async fn engage(env: Envelope, sink: &SharedSink, submit: &Submitter) -> Result<Session> {
    env.check_engagement()
        .map_err(|e| PriscillaError::Protocol(e.to_string()))?;
    let adapter = env
        .command
        .as_ref()
        .is_some_and(|c| c.kind == actions::CLIENT_ADAPTER);

    let (tx, rx) = oneshot::channel();
    submit.engage(env, sink.clone(), tx).await?;
    let id = rx
        .await
        .map_err(|_| PriscillaError::Internal("dispatcher dropped engagement".to_string()))?;
    if id.is_empty() {
        return Err(PriscillaError::EngageRejected("refused by dispatcher".to_string()));
    }
    Ok(Session { id, adapter })
}
