use std::io;
use std::sync::Arc;

use futures_util::SinkExt;
use priscilla_protocol::Envelope;
use tokio::io::AsyncWrite;
use tokio::sync::Mutex;
use tokio_util::codec::FramedWrite;

use crate::conn::codec::EnvelopeCodec;

pub type BoxedWriter = Box<dyn AsyncWrite + Send + Unpin>;

/// Output side of one connection, shared between the read task (handshake
/// replies) and the dispatcher (routed envelopes).
pub type SharedSink = Arc<Mutex<FramedWrite<BoxedWriter, EnvelopeCodec>>>;

pub fn shared(writer: impl AsyncWrite + Send + Unpin + 'static) -> SharedSink {
    let boxed: BoxedWriter = Box::new(writer);
    Arc::new(Mutex::new(FramedWrite::new(boxed, EnvelopeCodec::new())))
}

/// Encode one envelope and flush it to the peer.
pub async fn envelope(sink: &SharedSink, env: Envelope) -> Result<(), io::Error> {
    let mut guard = sink.lock().await;
    guard.send(env).await
}
