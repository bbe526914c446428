//! Per-node event loop
//!
//! One task multiplexes inbound packets, the deadline tick and shutdown.
//! Replies are resolved inline (cheap); each request is served on its own
//! task so a slow handler never delays replies or timeouts.

use crate::engine::CommandEngine;
use crate::router::Router;
use crate::transport::Packet;
use nac_command::{build_reply, parse_request, ReplyContent};
use nac_core::Name;
use std::sync::Arc;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{interval, MissedTickBehavior};

/// Event loop driving one node's engine and handlers
#[derive(Debug)]
pub struct Reactor {
    engine: Arc<CommandEngine>,
    router: Arc<Router>,
    inbound: mpsc::UnboundedReceiver<Packet>,
}

impl Reactor {
    /// Reactor consuming packets from `inbound`
    pub fn new(
        engine: Arc<CommandEngine>,
        router: Arc<Router>,
        inbound: mpsc::UnboundedReceiver<Packet>,
    ) -> Self {
        Self {
            engine,
            router,
            inbound,
        }
    }

    /// Run on a new task
    pub fn spawn(self) -> ReactorHandle {
        let (shutdown_tx, shutdown_rx) = oneshot::channel();
        let task = tokio::spawn(self.run(shutdown_rx));
        ReactorHandle {
            shutdown: shutdown_tx,
            task,
        }
    }

    /// Run until `shutdown` fires (or its sender is dropped) or the network
    /// closes the inbound channel
    pub async fn run(mut self, mut shutdown: oneshot::Receiver<()>) {
        let mut tick = interval(self.engine.config().tick_interval());
        tick.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let identity = self.engine.signer().certificate().identity().clone();
        tracing::debug!(node = %identity, "Reactor started");

        loop {
            tokio::select! {
                _ = &mut shutdown => {
                    break;
                }

                packet = self.inbound.recv() => {
                    match packet {
                        Some(Packet::Reply(reply)) => {
                            self.engine.handle_reply(&reply);
                        }
                        Some(Packet::Request(name)) => {
                            let engine = self.engine.clone();
                            let router = self.router.clone();
                            tokio::spawn(serve_request(engine, router, name));
                        }
                        None => {
                            tracing::debug!(node = %identity, "Inbound channel closed");
                            break;
                        }
                    }
                }

                _ = tick.tick() => {
                    self.engine.expire_due();
                }
            }
        }

        tracing::debug!(
            node = %identity,
            abandoned = self.engine.pending_count(),
            "Reactor stopped"
        );
    }
}

async fn serve_request(engine: Arc<CommandEngine>, router: Arc<Router>, name: Name) {
    let Some((prefix, handler)) = router.route(&name) else {
        tracing::debug!(name = %name, "No handler for request");
        return;
    };

    let content = match parse_request(&name, &prefix) {
        Ok(request) => {
            let operation = request.operation();
            match handler.handle(request).await {
                Ok(content) => content,
                Err(err) => {
                    if err.is_expected_rejection() {
                        tracing::debug!(operation = %operation, error = %err, "Request rejected");
                    } else {
                        tracing::info!(operation = %operation, error = %err, "Request failed");
                    }
                    ReplyContent::failed(err.to_string())
                }
            }
        }
        Err(err) => {
            tracing::info!(name = %name, error = %err, "Malformed command");
            ReplyContent::failed(err.to_string())
        }
    };

    let signer = engine.signer().as_ref();
    let reply = match build_reply(&name, &content, signer, engine.clock().as_ref()) {
        Ok(reply) => reply,
        Err(err) => {
            tracing::warn!(name = %name, error = %err, "Failed to build reply");
            return;
        }
    };
    if let Err(err) = engine.face().send(Packet::Reply(reply)) {
        tracing::warn!(name = %name, error = %err, "Failed to send reply");
    }
}

/// Handle to a spawned [`Reactor`]; dropping it also stops the reactor
#[derive(Debug)]
pub struct ReactorHandle {
    shutdown: oneshot::Sender<()>,
    task: JoinHandle<()>,
}

impl ReactorHandle {
    /// Stop the reactor and wait for it to exit
    pub async fn shutdown(self) {
        let _ = self.shutdown.send(());
        if let Err(err) = self.task.await {
            tracing::warn!(error = %err, "Reactor task failed");
        }
    }

    /// Whether the reactor has exited
    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }
}
