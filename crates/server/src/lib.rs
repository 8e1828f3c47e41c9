//! Noughts Server
//!
//! The server mediates between connected clients and the one game. It owns:
//! - Role assignment and membership ([`registry`])
//! - The authoritative game and the messages it produces ([`session`])
//! - The serialized entry point tying both together ([`Server`])
//! - Fan-out to per-connection outbound queues ([`hub`])
//! - The WebSocket transport ([`transport`])
//!
//! # Architecture
//!
//! [`Server`] is plain synchronous state: every event (connect, inbound
//! message, disconnect) goes through one `&mut self` call and yields the
//! [`Delivery`]s it caused. The [`hub::Hub`] wraps it in a single mutex and
//! enqueues those deliveries before releasing the lock, so all connections
//! observe results in commit order.

#![deny(unsafe_code)]

pub mod config;
pub mod error;
pub mod hub;
pub mod registry;
pub mod session;
pub mod transport;

use std::net::{IpAddr, Ipv4Addr, SocketAddr};
use std::time::Duration;

use noughts_sim::MoveResult;
use noughts_wire::{Inbound, ServerMessage};
use registry::{ConnectionId, Recipients, Registry, Role};
use session::{GameSession, START_MESSAGE, player_disconnected_message};

pub use error::ServerError;

// ============================================================================
// Defaults
// ============================================================================

/// Default listen port.
pub const DEFAULT_PORT: u16 = 12345;

/// Default listen address (all interfaces).
pub const DEFAULT_HOST: IpAddr = IpAddr::V4(Ipv4Addr::UNSPECIFIED);

/// Messages buffered per connection before it counts as failed.
pub const OUTBOUND_QUEUE_CAPACITY: usize = 64;

/// Upper bound on a single socket send.
pub const SEND_TIMEOUT_MS: u64 = 5000;

// ============================================================================
// Configuration
// ============================================================================

/// Server configuration.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: IpAddr,
    pub port: u16,
    pub outbound_queue_capacity: usize,
    pub send_timeout: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST,
            port: DEFAULT_PORT,
            outbound_queue_capacity: OUTBOUND_QUEUE_CAPACITY,
            send_timeout: Duration::from_millis(SEND_TIMEOUT_MS),
        }
    }
}

impl ServerConfig {
    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.host, self.port)
    }

    pub fn validate(&self) -> Result<(), ServerError> {
        if self.outbound_queue_capacity == 0 {
            return Err(ServerError::Config("outbound queue capacity must be positive"));
        }
        if self.send_timeout.is_zero() {
            return Err(ServerError::Config("send timeout must be positive"));
        }
        Ok(())
    }
}

// ============================================================================
// Events and Deliveries
// ============================================================================

/// One message and who receives it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub recipients: Recipients,
    pub message: ServerMessage,
}

impl Delivery {
    pub fn new(recipients: Recipients, message: ServerMessage) -> Self {
        Self {
            recipients,
            message,
        }
    }
}

/// A newly admitted connection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Admission {
    pub id: ConnectionId,
    pub role: Role,
    pub deliveries: Vec<Delivery>,
}

/// A connection that has just been removed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Departure {
    pub role: Role,
    pub deliveries: Vec<Delivery>,
}

/// Outcome of an inbound message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Dispatch {
    /// State changed; deliver this.
    Broadcast(Delivery),
    /// Dropped: not a recognised message.
    DroppedMalformed,
    /// Dropped: sender is not registered (already disconnected).
    DroppedUnknownConnection,
    /// Dropped: spectators cannot move or reset.
    DroppedSpectator,
    /// Dropped: the game refused the move.
    DroppedMove(MoveResult),
}

// ============================================================================
// Server
// ============================================================================

/// Registry plus game session behind one `&mut self` entry point.
#[derive(Debug)]
pub struct Server {
    registry: Registry,
    session: GameSession,
}

impl Default for Server {
    fn default() -> Self {
        Self::new()
    }
}

impl Server {
    pub fn new() -> Self {
        Self {
            registry: Registry::new(),
            session: GameSession::new(),
        }
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    pub fn session(&self) -> &GameSession {
        &self.session
    }

    /// Admit a connection and assign its role.
    ///
    /// The newcomer gets `assign` or `spectator`. Filling the second player
    /// slot also broadcasts `start` to everyone.
    pub fn accept_connection(&mut self) -> Admission {
        let (id, role) = self.registry.admit();

        let mut deliveries = Vec::with_capacity(2);
        match role {
            Role::Player(symbol) => {
                deliveries.push(Delivery::new(
                    Recipients::One(id),
                    self.session.assign_message(symbol),
                ));
                if self.registry.player_count() == 2 {
                    deliveries.push(Delivery::new(
                        Recipients::All,
                        ServerMessage::Start {
                            message: START_MESSAGE.to_string(),
                        },
                    ));
                }
            }
            Role::Spectator => deliveries.push(Delivery::new(
                Recipients::One(id),
                self.session.spectator_message(),
            )),
        }

        Admission {
            id,
            role,
            deliveries,
        }
    }

    /// Remove a connection. A departing player resets the game and everyone
    /// left is told why. Returns `None` if `id` was already gone.
    pub fn disconnect(&mut self, id: ConnectionId) -> Option<Departure> {
        let role = self.registry.remove(id)?;

        let deliveries = match role {
            Role::Player(symbol) => {
                self.session.reset();
                vec![Delivery::new(
                    Recipients::All,
                    ServerMessage::Reset {
                        message: player_disconnected_message(symbol),
                    },
                )]
            }
            Role::Spectator => Vec::new(),
        };

        Some(Departure { role, deliveries })
    }

    /// Route an inbound message from `id`.
    pub fn receive(&mut self, id: ConnectionId, inbound: Inbound) -> Dispatch {
        if inbound == Inbound::Unknown {
            return Dispatch::DroppedMalformed;
        }

        let Some(role) = self.registry.role(id) else {
            return Dispatch::DroppedUnknownConnection;
        };
        let Some(symbol) = role.symbol() else {
            return Dispatch::DroppedSpectator;
        };

        match inbound {
            Inbound::Move { row, col } => match self.session.apply_move(symbol, row, col) {
                Ok(message) => Dispatch::Broadcast(Delivery::new(Recipients::All, message)),
                Err(reason) => Dispatch::DroppedMove(reason),
            },
            Inbound::Reset => Dispatch::Broadcast(Delivery::new(
                Recipients::AllExcept(id),
                self.session.request_reset(),
            )),
            Inbound::Unknown => Dispatch::DroppedMalformed,
        }
    }

    /// Resolve a recipient policy against current membership.
    pub fn recipients(&self, recipients: Recipients) -> Vec<ConnectionId> {
        self.registry.select(recipients)
    }
}

// ============================================================================
// Tests
// ============================================================================
