use std::time::Duration;

use hashbrown::HashMap;
use rand::Rng;
use tracing::{debug, info};

use crate::game::constants::net::ROOM_CODE_ATTEMPTS;
use crate::lobby::room::{Room, RoomError};
use crate::lobby::PeerId;
use crate::net::protocol::{PeerMessage, Role, RoomCode, RoomErrorReason, ServerMessage};

/// A reply addressed to one connected peer
#[derive(Debug, Clone, PartialEq)]
pub struct Outbound {
    pub to: PeerId,
    pub message: ServerMessage,
}

impl Outbound {
    pub fn new(to: PeerId, message: ServerMessage) -> Self {
        Self { to, message }
    }
}

/// Room registry: matchmaking by code and 1:1 relay between occupants
pub struct RoomRegistry {
    rooms: HashMap<RoomCode, Room>,
    peer_rooms: HashMap<PeerId, RoomCode>,
    max_rooms: usize,
}

impl RoomRegistry {
    pub fn new(max_rooms: usize) -> Self {
        Self {
            rooms: HashMap::new(),
            peer_rooms: HashMap::new(),
            max_rooms,
        }
    }

    /// Open a room under a random code, retrying a bounded number of times
    /// when the code is already taken
    pub fn create_room<R: Rng + ?Sized>(
        &mut self,
        peer: PeerId,
        rng: &mut R,
    ) -> Result<Vec<Outbound>, RegistryError> {
        let mut last_err = RegistryError::CodeCollision;
        for _ in 0..ROOM_CODE_ATTEMPTS {
            match self.create_room_with_code(peer, RoomCode::generate(rng)) {
                Err(RegistryError::CodeCollision) => {
                    debug!("Room code collision, retrying");
                    last_err = RegistryError::CodeCollision;
                }
                other => return other,
            }
        }
        Err(last_err)
    }

    /// Open a room under a caller-chosen code. The creator is the host.
    pub fn create_room_with_code(
        &mut self,
        peer: PeerId,
        code: RoomCode,
    ) -> Result<Vec<Outbound>, RegistryError> {
        if self.peer_rooms.contains_key(&peer) {
            return Err(RegistryError::AlreadyInRoom);
        }
        if self.rooms.len() >= self.max_rooms {
            return Err(RegistryError::TooManyRooms);
        }
        if self.rooms.contains_key(&code) {
            return Err(RegistryError::CodeCollision);
        }

        self.rooms.insert(code, Room::new(code, peer));
        self.peer_rooms.insert(peer, code);
        info!(%code, %peer, "Room created");

        Ok(vec![Outbound::new(
            peer,
            ServerMessage::RoomCreated {
                room_code: code,
                role: Role::Host,
            },
        )])
    }

    /// Seat `peer` in the room named by `code` (case-insensitive)
    pub fn join_room(&mut self, peer: PeerId, code: &str) -> Result<Vec<Outbound>, RegistryError> {
        if self.peer_rooms.contains_key(&peer) {
            return Err(RegistryError::AlreadyInRoom);
        }
        let code = RoomCode::parse(code).map_err(|_| RegistryError::RoomNotFound)?;
        let room = self
            .rooms
            .get_mut(&code)
            .ok_or(RegistryError::RoomNotFound)?;

        let role = room.seat(peer)?;
        self.peer_rooms.insert(peer, code);
        info!(%code, %peer, %role, "Player joined room");

        let mut out = vec![Outbound::new(
            peer,
            ServerMessage::RoomJoined {
                room_code: code,
                role,
            },
        )];
        if let Some(other) = room.other_occupant(peer) {
            out.push(Outbound::new(other, ServerMessage::PlayerJoined));
            out.push(Outbound::new(other, ServerMessage::GameStart));
        }
        out.push(Outbound::new(peer, ServerMessage::GameStart));
        Ok(out)
    }

    /// Forward a gameplay message to the other occupant. `None` when the
    /// sender is alone in its room.
    pub fn relay(
        &self,
        peer: PeerId,
        message: PeerMessage,
    ) -> Result<Option<Outbound>, RegistryError> {
        let code = self.peer_rooms.get(&peer).ok_or(RegistryError::NotInRoom)?;
        let room = self.rooms.get(code).ok_or(RegistryError::RoomNotFound)?;
        Ok(room
            .other_occupant(peer)
            .map(|other| Outbound::new(other, ServerMessage::Peer(message))))
    }

    /// Remove a peer from its room, notifying the other occupant.
    /// Empty rooms are deleted.
    pub fn disconnect(&mut self, peer: PeerId) -> Vec<Outbound> {
        let Some(code) = self.peer_rooms.remove(&peer) else {
            return Vec::new();
        };
        let Some(room) = self.rooms.get_mut(&code) else {
            return Vec::new();
        };

        let other = room.other_occupant(peer);
        room.vacate(peer);
        info!(%code, %peer, remaining = room.player_count(), "Player left room");

        if room.is_empty() {
            self.rooms.remove(&code);
            info!(%code, "Room closed");
        }

        other
            .map(|other| Outbound::new(other, ServerMessage::PlayerDisconnected))
            .into_iter()
            .collect()
    }

    pub fn get_room(&self, code: &RoomCode) -> Option<&Room> {
        self.rooms.get(code)
    }

    /// Room and role of a seated peer
    pub fn seat_of(&self, peer: PeerId) -> Option<(RoomCode, Role)> {
        let code = *self.peer_rooms.get(&peer)?;
        let role = self.rooms.get(&code)?.role_of(peer)?;
        Some((code, role))
    }

    /// True while `peer` hosts a room nobody has joined yet
    pub fn is_waiting(&self, peer: PeerId) -> bool {
        self.peer_rooms
            .get(&peer)
            .and_then(|code| self.rooms.get(code))
            .is_some_and(|room| !room.is_full())
    }

    pub fn room_count(&self) -> usize {
        self.rooms.len()
    }

    /// Total seated peers across all rooms
    pub fn total_player_count(&self) -> usize {
        self.peer_rooms.len()
    }

    /// Snapshot of all rooms, for metrics and logs
    pub fn list_rooms(&self) -> Vec<RoomInfo> {
        self.rooms
            .values()
            .map(|room| RoomInfo {
                code: room.code,
                player_count: room.player_count(),
                age: room.age(),
            })
            .collect()
    }

    /// Drop every room. Returns the peers that were seated.
    pub fn shutdown(&mut self) -> Vec<PeerId> {
        let peers: Vec<PeerId> = self.peer_rooms.keys().copied().collect();
        info!(rooms = self.rooms.len(), peers = peers.len(), "Closing all rooms");
        self.rooms.clear();
        self.peer_rooms.clear();
        peers
    }
}

impl Default for RoomRegistry {
    fn default() -> Self {
        Self::new(100)
    }
}

/// Room information for listing
#[derive(Debug, Clone)]
pub struct RoomInfo {
    pub code: RoomCode,
    pub player_count: usize,
    pub age: Duration,
}

/// Registry errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RegistryError {
    #[error("Room not found")]
    RoomNotFound,
    #[error("Room is full")]
    RoomFull,
    #[error("Room code already in use")]
    CodeCollision,
    #[error("Too many rooms")]
    TooManyRooms,
    #[error("Already in a room")]
    AlreadyInRoom,
    #[error("Not in a room")]
    NotInRoom,
}

impl From<RoomError> for RegistryError {
    fn from(err: RoomError) -> Self {
        match err {
            RoomError::RoomFull => RegistryError::RoomFull,
            // The match in that room is over; the code is dead to newcomers
            RoomError::HostLeft => RegistryError::RoomNotFound,
        }
    }
}

impl RegistryError {
    /// Reason reported to the client
    pub fn reason(&self) -> RoomErrorReason {
        match self {
            RegistryError::RoomNotFound => RoomErrorReason::NotFound,
            RegistryError::RoomFull => RoomErrorReason::Full,
            RegistryError::CodeCollision
            | RegistryError::TooManyRooms
            | RegistryError::AlreadyInRoom
            | RegistryError::NotInRoom => RoomErrorReason::Unavailable,
        }
    }
}
