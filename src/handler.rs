use std::io;
use std::sync::Arc;

use log::{error, info};
use signal_hook::consts::{SIGINT, SIGTERM};
use signal_hook::iterator::Signals;
use thiserror::Error;
use tokio::sync::{oneshot, watch};

use crate::channel::{self, SpeakerChannel};
use crate::config::ServerConfig;
use crate::reconcile::Reconciler;

#[derive(Debug, Error)]
pub enum ServeError {
    #[error("Unable to open control channel: {0}")]
    Connect(#[source] io::Error),
    #[error("Unable to install signal handlers: {0}")]
    Signals(#[source] io::Error),
    #[error("JSON-RPC server error: {0}")]
    Rpc(#[from] jsonrpsee::core::Error),
}

pub(crate) struct Inner {
    pub(crate) channel: SpeakerChannel,
    pub(crate) reconciler: Reconciler,
    // Flipped once the control channel breaks, the daemon exits instead of reconnecting
    pub(crate) fatal: watch::Sender<bool>,
}

#[derive(Clone)]
pub struct Server {
    pub(crate) inner: Arc<Inner>,
}

impl Server {
    pub fn new(channel: SpeakerChannel, reconciler: Reconciler) -> (Self, watch::Receiver<bool>) {
        let (fatal, failed) = watch::channel(false);
        let server = Self {
            inner: Arc::new(Inner {
                channel,
                reconciler,
                fatal,
            }),
        };
        (server, failed)
    }
}

/// Run the daemon until SIGINT/SIGTERM or until the control channel breaks
pub async fn serve(config: ServerConfig) -> Result<(), ServeError> {
    info!(
        "Managing {} (command timeout {:?})",
        config.speaker_config.display(),
        config.command_timeout
    );
    let channel =
        channel::connect(&config.transport, config.command_timeout).map_err(ServeError::Connect)?;
    let reconciler = Reconciler::new(&config.speaker_config);
    let (server, mut failed) = Server::new(channel, reconciler);
    let shutdown = shutdown_signal().map_err(ServeError::Signals)?;

    let (_addr, handle) = server.serve_rpc_api(config.listen).await?;

    tokio::select! {
        signal = shutdown => {
            if let Ok(signal) = signal {
                info!("Received signal {}, stopping...", signal);
            }
        }
        _ = failed.changed() => {
            error!("Control channel to the speaker is broken, stopping...");
        }
    }
    handle.stop()?;
    handle.stopped().await;
    info!("Stopped");
    Ok(())
}

/// Resolves with the first SIGINT or SIGTERM
fn shutdown_signal() -> io::Result<oneshot::Receiver<i32>> {
    let mut signals = Signals::new(&[SIGINT, SIGTERM])?;
    let (tx, rx) = oneshot::channel();
    std::thread::spawn(move || {
        if let Some(signal) = signals.forever().next() {
            tx.send(signal).ok();
        }
    });
    Ok(rx)
}
