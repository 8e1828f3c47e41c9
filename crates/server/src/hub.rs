//! Fan-out of server messages to per-connection outbound queues.
//!
//! The [`Hub`] holds the [`Server`] and every connection's queue sender behind
//! one mutex. Each event is handled and its deliveries enqueued inside a single
//! critical section. Enqueueing never blocks: a full or closed queue counts as
//! a failed delivery and the connection is disconnected on the spot, which may
//! itself produce a `reset` broadcast handled in the same pass.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;

use noughts_wire::{Codec, Frame, Inbound, ServerMessage};
use parking_lot::Mutex;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};

use crate::registry::{ConnectionId, Role};
use crate::{Delivery, Dispatch, Server, ServerConfig};

/// Receiving end of a connection's outbound queue.
pub type Outbound = mpsc::Receiver<Arc<Frame>>;

/// A registered connection as seen by the transport.
#[derive(Debug)]
pub struct Attached {
    pub id: ConnectionId,
    pub role: Role,
    pub outbound: Outbound,
}

struct Outlet {
    codec: Codec,
    tx: mpsc::Sender<Arc<Frame>>,
}

struct Inner {
    server: Server,
    outlets: HashMap<ConnectionId, Outlet>,
}

/// Serialized entry point for every connection's events.
pub struct Hub {
    inner: Mutex<Inner>,
    queue_capacity: usize,
}

impl Hub {
    pub fn new(config: &ServerConfig) -> Self {
        Self {
            inner: Mutex::new(Inner {
                server: Server::new(),
                outlets: HashMap::new(),
            }),
            queue_capacity: config.outbound_queue_capacity.max(1),
        }
    }

    /// Register a new connection whose outbound frames use `codec`.
    pub fn connect(&self, codec: Codec) -> Attached {
        let (tx, outbound) = mpsc::channel(self.queue_capacity);
        let mut inner = self.inner.lock();

        let admission = inner.server.accept_connection();
        inner.outlets.insert(admission.id, Outlet { codec, tx });
        info!(conn_id = admission.id, role = %admission.role, ?codec, "connection registered");

        inner.deliver(admission.deliveries);

        Attached {
            id: admission.id,
            role: admission.role,
            outbound,
        }
    }

    /// Route one inbound message.
    pub fn dispatch(&self, id: ConnectionId, inbound: Inbound) {
        let mut inner = self.inner.lock();

        match inner.server.receive(id, inbound) {
            Dispatch::Broadcast(delivery) => {
                if let ServerMessage::GameOver { winner, .. } = &delivery.message {
                    info!(conn_id = id, winner = winner.as_str(), "game over");
                } else if let ServerMessage::Reset { .. } = &delivery.message {
                    info!(conn_id = id, "game reset by player");
                }
                inner.deliver(vec![delivery]);
            }
            dropped => debug!(conn_id = id, reason = ?dropped, "inbound message dropped"),
        }
    }

    /// The transport reports the connection closed. Safe to call repeatedly.
    pub fn disconnect(&self, id: ConnectionId) {
        let mut inner = self.inner.lock();
        inner.remove(id, "closed");
    }

    pub fn connection_count(&self) -> usize {
        self.inner.lock().outlets.len()
    }

    /// Snapshot of the current role assignment, for tests and diagnostics.
    pub fn role(&self, id: ConnectionId) -> Option<Role> {
        self.inner.lock().server.registry().role(id)
    }
}

impl Inner {
    /// Drop the outlet (closing the queue) and unregister the connection.
    /// Returns the follow-up deliveries to process.
    fn detach(&mut self, id: ConnectionId, cause: &str) -> Vec<Delivery> {
        self.outlets.remove(&id);
        match self.server.disconnect(id) {
            Some(departure) => {
                info!(conn_id = id, role = %departure.role, cause, "connection removed");
                if departure.role.is_player() {
                    info!("game reset after player left");
                }
                departure.deliveries
            }
            None => Vec::new(),
        }
    }

    fn remove(&mut self, id: ConnectionId, cause: &str) {
        let deliveries = self.detach(id, cause);
        self.deliver(deliveries);
    }

    /// Enqueue deliveries in order. Failed recipients are disconnected and
    /// their resulting notices are appended to the same work queue.
    fn deliver(&mut self, deliveries: Vec<Delivery>) {
        let mut pending: VecDeque<Delivery> = deliveries.into();

        while let Some(delivery) = pending.pop_front() {
            let mut encoded: HashMap<Codec, Arc<Frame>> = HashMap::new();
            let mut failed = Vec::new();
            let recipients = self.server.recipients(delivery.recipients);

            for id in &recipients {
                let Some(outlet) = self.outlets.get(id) else {
                    continue;
                };

                let frame = match encoded.get(&outlet.codec) {
                    Some(frame) => Arc::clone(frame),
                    None => match outlet.codec.encode(&delivery.message) {
                        Ok(frame) => {
                            let frame = Arc::new(frame);
                            encoded.insert(outlet.codec, Arc::clone(&frame));
                            frame
                        }
                        Err(e) => {
                            warn!(kind = delivery.message.kind(), error = %e, "failed to encode message");
                            continue;
                        }
                    },
                };

                if outlet.tx.try_send(frame).is_err() {
                    warn!(conn_id = id, kind = delivery.message.kind(), "delivery failed, disconnecting");
                    failed.push(*id);
                }
            }

            debug!(
                kind = delivery.message.kind(),
                recipients = recipients.len(),
                failed = failed.len(),
                "message delivered"
            );

            for id in failed {
                pending.extend(self.detach(id, "delivery failed"));
            }
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
