//! Daemon accept loop
//!
//! Each IPC connection is served on its own task, so a slow surface fan-out for
//! one event does not hold up others. Ordering between competing claims is
//! decided by the store, not by connection order.

use eyre::Result;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::ipc::{DaemonMessage, DaemonResponse, read_message, send_response};
use crate::lifecycle::LifecycleController;
use crate::notify::ControlId;

/// Serves IPC requests against a [`LifecycleController`]
#[derive(Clone)]
pub struct CraftDaemon {
    controller: LifecycleController,
    version: String,
    shutdown_tx: mpsc::Sender<()>,
}

impl CraftDaemon {
    /// Create a daemon and the receiver that fires when shutdown is requested
    pub fn new(controller: LifecycleController, version: impl Into<String>) -> (Self, mpsc::Receiver<()>) {
        let (shutdown_tx, shutdown_rx) = mpsc::channel(1);
        let daemon = Self {
            controller,
            version: version.into(),
            shutdown_tx,
        };
        (daemon, shutdown_rx)
    }

    /// Sender that stops the accept loop
    pub fn shutdown_handle(&self) -> mpsc::Sender<()> {
        self.shutdown_tx.clone()
    }

    /// Accept connections until shutdown is requested
    pub async fn run(&self, listener: UnixListener, mut shutdown_rx: mpsc::Receiver<()>) -> Result<()> {
        debug!("run: called");
        info!("Daemon accepting connections");

        loop {
            tokio::select! {
                accepted = listener.accept() => {
                    match accepted {
                        Ok((stream, _)) => {
                            debug!("run: IPC connection accepted");
                            let daemon = self.clone();
                            tokio::spawn(async move {
                                daemon.serve_connection(stream).await;
                            });
                        }
                        Err(e) => {
                            warn!(error = %e, "run: IPC accept error");
                        }
                    }
                }

                _ = shutdown_rx.recv() => {
                    debug!("run: shutdown signal received");
                    info!("Shutdown signal received");
                    break;
                }
            }
        }

        if let Err(e) = self.controller.store().shutdown().await {
            warn!(error = %e, "run: store already stopped");
        }
        debug!("run: complete");
        Ok(())
    }

    async fn serve_connection(&self, mut stream: UnixStream) {
        let response = match read_message(&mut stream).await {
            Ok(msg) => self.respond(msg).await,
            Err(e) => {
                debug!(error = %e, "serve_connection: bad message");
                DaemonResponse::Error {
                    message: format!("{:#}", e),
                }
            }
        };

        if let Err(e) = send_response(&mut stream, &response).await {
            warn!(error = %e, "serve_connection: failed to send response");
        }
    }

    /// Produce the response for one message
    pub async fn respond(&self, msg: DaemonMessage) -> DaemonResponse {
        debug!(?msg, "respond: called");
        match msg {
            DaemonMessage::Event { event } => {
                let reply = self.controller.handle(event).await;
                DaemonResponse::Reply { reply }
            }
            DaemonMessage::Control { custom_id, actor } => match ControlId::decode(&custom_id) {
                Some(control) => {
                    let reply = self.controller.handle(control.into_event(actor)).await;
                    DaemonResponse::Reply { reply }
                }
                None => {
                    debug!(%custom_id, "respond: unknown control");
                    DaemonResponse::Error {
                        message: format!("Unknown control: {}", custom_id),
                    }
                }
            },
            DaemonMessage::Show { request_id } => match self.controller.store().get(&request_id).await {
                Ok(request) => DaemonResponse::Request {
                    request: request.map(Box::new),
                },
                Err(e) => DaemonResponse::Error { message: e.to_string() },
            },
            DaemonMessage::Status => match self.controller.store().metrics().await {
                Ok(metrics) => DaemonResponse::Metrics { metrics },
                Err(e) => DaemonResponse::Error { message: e.to_string() },
            },
            DaemonMessage::Ping => DaemonResponse::Pong {
                version: self.version.clone(),
            },
            DaemonMessage::Shutdown => {
                debug!("respond: Shutdown");
                // A full channel means shutdown is already underway
                let _ = self.shutdown_tx.try_send(());
                DaemonResponse::Ok
            }
        }
    }
}
