use std::time::{Duration, Instant};

use crate::lobby::PeerId;
use crate::net::protocol::{Role, RoomCode};

/// A two-seat room. The registry keeps no gameplay state in it.
#[derive(Debug, Clone)]
pub struct Room {
    pub code: RoomCode,
    pub host: Option<PeerId>,
    pub guest: Option<PeerId>,
    pub created_at: Instant,
}

impl Room {
    pub fn new(code: RoomCode, host: PeerId) -> Self {
        Self {
            code,
            host: Some(host),
            guest: None,
            created_at: Instant::now(),
        }
    }

    pub fn player_count(&self) -> usize {
        usize::from(self.host.is_some()) + usize::from(self.guest.is_some())
    }

    pub fn is_full(&self) -> bool {
        self.player_count() >= 2
    }

    pub fn is_empty(&self) -> bool {
        self.player_count() == 0
    }

    pub fn age(&self) -> Duration {
        self.created_at.elapsed()
    }

    pub fn role_of(&self, peer: PeerId) -> Option<Role> {
        if self.host == Some(peer) {
            Some(Role::Host)
        } else if self.guest == Some(peer) {
            Some(Role::Guest)
        } else {
            None
        }
    }

    pub fn occupant(&self, role: Role) -> Option<PeerId> {
        match role {
            Role::Host => self.host,
            Role::Guest => self.guest,
        }
    }

    /// The other seated peer, if any
    pub fn other_occupant(&self, peer: PeerId) -> Option<PeerId> {
        self.role_of(peer)
            .and_then(|role| self.occupant(role.other()))
    }

    /// Seat a joiner as guest. A room whose host has left takes no one
    /// new: its remaining occupant has already been told the match is over.
    pub fn seat(&mut self, peer: PeerId) -> Result<Role, RoomError> {
        if self.host.is_none() {
            return Err(RoomError::HostLeft);
        }
        if self.guest.is_some() {
            return Err(RoomError::RoomFull);
        }
        self.guest = Some(peer);
        Ok(Role::Guest)
    }

    /// Clear the peer's seat. Returns the role it held.
    pub fn vacate(&mut self, peer: PeerId) -> Option<Role> {
        let role = self.role_of(peer)?;
        match role {
            Role::Host => self.host = None,
            Role::Guest => self.guest = None,
        }
        Some(role)
    }
}

/// Room errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomError {
    #[error("Room is full")]
    RoomFull,
    #[error("Host has left the room")]
    HostLeft,
}
