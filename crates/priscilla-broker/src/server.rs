use tokio::net::TcpListener;
use tokio::sync::watch;
use tracing::{info, warn};

use crate::conn::connection;
use crate::dispatch::Submitter;

/// Accept connections until `shutdown` broadcasts `true`, one read task each.
pub async fn accept_loop(listener: TcpListener, submit: Submitter, mut shutdown: watch::Receiver<bool>) {
    if let Ok(addr) = listener.local_addr() {
        info!(addr = %addr, "listening for connections");
    }
    loop {
        tokio::select! {
            accepted = listener.accept() => match accepted {
                Ok((stream, peer)) => {
                    if let Err(e) = stream.set_nodelay(true) {
                        warn!(peer = %peer, error = %e, "set_nodelay failed");
                    }
                    tokio::spawn(connection::serve(stream, peer.to_string(), submit.clone()));
                }
                Err(e) => warn!(error = %e, "accept failed"),
            },
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    info!("accept loop shutting down");
                    break;
                }
            }
        }
    }
}
