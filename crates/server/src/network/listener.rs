//! TCP listener
//!
//! Binds the control socket, accepts connections, and spawns one handler
//! task per connection. The lifecycle is explicit: [`Listener::bind`]
//! produces a running listener plus its [`ShutdownHandle`]; [`Listener::run`]
//! consumes the listener and returns once shutdown is requested. There is
//! no ambient "running" flag to poke.
//!
//! Concurrency is bounded: a semaphore permit is taken before each accept,
//! so once `max_connections` handlers are in flight the acceptor simply
//! stops accepting until one finishes. Shutdown stops new accepts only;
//! in-flight handlers run to completion.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use tokio::net::TcpListener;
use tokio::sync::{Semaphore, watch};
use tracing::{info, warn};

use super::connection::handle_connection;
use crate::dispatch::Dispatcher;

/// Requests a cooperative stop of the accept loop
#[derive(Debug, Clone)]
pub struct ShutdownHandle {
    tx: watch::Sender<bool>,
}

impl ShutdownHandle {
    /// Stop accepting new connections; idempotent
    pub fn shutdown(&self) {
        let _ = self.tx.send(true);
    }
}

/// Accept loop over the bound control socket
pub struct Listener {
    listener: TcpListener,
    local_addr: SocketAddr,
    dispatcher: Arc<Dispatcher>,
    max_connections: usize,
    shutdown_rx: watch::Receiver<bool>,
}

impl Listener {
    /// Bind the control socket and return the running listener with its
    /// shutdown handle
    pub async fn bind(
        host: &str,
        port: u16,
        dispatcher: Arc<Dispatcher>,
        max_connections: usize,
    ) -> Result<(Self, ShutdownHandle)> {
        let listener = TcpListener::bind((host, port))
            .await
            .with_context(|| format!("Failed to bind {}:{}", host, port))?;
        let local_addr = listener
            .local_addr()
            .context("Failed to read bound address")?;

        let (tx, shutdown_rx) = watch::channel(false);

        info!("Listening on {}", local_addr);

        Ok((
            Self {
                listener,
                local_addr,
                dispatcher,
                max_connections,
                shutdown_rx,
            },
            ShutdownHandle { tx },
        ))
    }

    /// The address the socket actually bound (useful with port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// Accept connections until shutdown is requested
    ///
    /// Never blocks on handler completion; a handler failure is that
    /// connection's problem alone.
    pub async fn run(mut self) -> Result<()> {
        let semaphore = Arc::new(Semaphore::new(self.max_connections));

        loop {
            // Backpressure: wait for a free slot before accepting.
            let permit = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                permit = semaphore.clone().acquire_owned() => {
                    let Ok(permit) = permit else { break };
                    permit
                }
            };

            let (stream, peer) = tokio::select! {
                _ = self.shutdown_rx.changed() => break,
                accepted = self.listener.accept() => match accepted {
                    Ok(pair) => pair,
                    Err(e) => {
                        // A closed listening socket during shutdown is the
                        // normal termination signal, not an error.
                        if *self.shutdown_rx.borrow() {
                            break;
                        }
                        warn!("Accept failed: {}", e);
                        continue;
                    }
                },
            };

            let dispatcher = self.dispatcher.clone();
            tokio::spawn(async move {
                let _permit = permit;
                handle_connection(stream, peer, dispatcher).await;
            });
        }

        info!("Listener stopped");
        Ok(())
    }
}
