//! Connection registry: live connections and the role each one holds.
//!
//! Roles are handed out in arrival order: the X slot, then the O slot, then
//! spectators. A vacated player slot is refilled by the next arrival, never by
//! promoting an existing spectator.

use std::collections::BTreeMap;
use std::fmt;

use noughts_sim::Symbol;

/// Connection identifier (server-internal, connection-lifetime scoped).
pub type ConnectionId = u64;

/// What a connection may do.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Role {
    Player(Symbol),
    Spectator,
}

impl Role {
    /// The symbol played by this role, if any.
    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Self::Player(symbol) => Some(symbol),
            Self::Spectator => None,
        }
    }

    pub fn is_player(self) -> bool {
        matches!(self, Self::Player(_))
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Player(symbol) => write!(f, "player-{symbol}"),
            Self::Spectator => f.write_str("spectator"),
        }
    }
}

/// Which registered connections a message goes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Recipients {
    One(ConnectionId),
    All,
    AllExcept(ConnectionId),
}

/// Live connections partitioned by role.
#[derive(Debug, Default)]
pub struct Registry {
    /// Ordered by id, so fan-out order follows arrival order.
    roles: BTreeMap<ConnectionId, Role>,
    player_x: Option<ConnectionId>,
    player_o: Option<ConnectionId>,
    next_id: ConnectionId,
}

impl Registry {
    pub fn new() -> Self {
        Self {
            next_id: 1,
            ..Self::default()
        }
    }

    /// Register a new connection and assign its role.
    pub fn admit(&mut self) -> (ConnectionId, Role) {
        let id = self.next_id;
        self.next_id += 1;

        let role = if self.player_x.is_none() {
            self.player_x = Some(id);
            Role::Player(Symbol::X)
        } else if self.player_o.is_none() {
            self.player_o = Some(id);
            Role::Player(Symbol::O)
        } else {
            Role::Spectator
        };

        self.roles.insert(id, role);
        (id, role)
    }

    /// Drop a connection. Returns the role it held, or `None` if it was not
    /// registered (already removed).
    pub fn remove(&mut self, id: ConnectionId) -> Option<Role> {
        let role = self.roles.remove(&id)?;
        match role {
            Role::Player(Symbol::X) => self.player_x = None,
            Role::Player(Symbol::O) => self.player_o = None,
            Role::Spectator => {}
        }
        Some(role)
    }

    pub fn role(&self, id: ConnectionId) -> Option<Role> {
        self.roles.get(&id).copied()
    }

    /// Connection currently holding `symbol`.
    pub fn player(&self, symbol: Symbol) -> Option<ConnectionId> {
        match symbol {
            Symbol::X => self.player_x,
            Symbol::O => self.player_o,
        }
    }

    pub fn player_count(&self) -> usize {
        [Symbol::X, Symbol::O]
            .into_iter()
            .filter(|&symbol| self.player(symbol).is_some())
            .count()
    }

    pub fn len(&self) -> usize {
        self.roles.len()
    }

    pub fn is_empty(&self) -> bool {
        self.roles.is_empty()
    }

    /// Resolve a recipient policy against current membership.
    pub fn select(&self, recipients: Recipients) -> Vec<ConnectionId> {
        match recipients {
            Recipients::One(id) => self.roles.get(&id).map(|_| id).into_iter().collect(),
            Recipients::All => self.roles.keys().copied().collect(),
            Recipients::AllExcept(excluded) => self
                .roles
                .keys()
                .copied()
                .filter(|&id| id != excluded)
                .collect(),
        }
    }
}
