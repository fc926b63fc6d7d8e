use std::fmt;
use std::str::FromStr;

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::game::constants::net::{ROOM_CODE_ALPHABET, ROOM_CODE_LEN};
use crate::game::state::{AnimCode, Facing, Fighter, Slot};

/// Messages from client to the registry
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ClientMessage {
    /// Open a new room and take the host seat
    CreateRoom,
    /// Join an existing room by code (case-insensitive)
    JoinRoom { room_code: String },
    /// Gameplay message for the other occupant
    Peer(PeerMessage),
}

/// Messages from the registry to a client
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ServerMessage {
    RoomCreated { room_code: RoomCode, role: Role },
    RoomJoined { room_code: RoomCode, role: Role },
    RoomError { reason: RoomErrorReason },
    /// Sent to the host when a guest takes the second seat
    PlayerJoined,
    /// Sent to both occupants once the room is full
    GameStart,
    /// Gameplay message relayed from the other occupant
    Peer(PeerMessage),
    /// The other occupant left
    PlayerDisconnected,
}

/// Gameplay messages exchanged between the two peers of a room.
/// The transport must deliver these reliably and in order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum PeerMessage {
    /// Throttled pose broadcast of the sender's own fighter
    GameUpdate(FighterSnapshot),
    /// "You got hit": the receiver's own fighter now has this health
    OpponentHealthUpdate { health: i32, dead: bool },
    /// The sender's own fighter healed to this health
    MyHealthUpdate { health: i32, dead: bool },
    MouseSpawned { from_right: bool },
    MouseUpdate { x: f32, y: f32 },
    MouseRemoved,
    MouseEaten { eater_role: Role },
}

/// Pose of a locally owned fighter. Health is deliberately absent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FighterSnapshot {
    pub x: f32,
    pub y: f32,
    pub anim: AnimCode,
    pub facing: Facing,
    pub dead: bool,
    pub winner: bool,
    pub eating: u32,
}

impl FighterSnapshot {
    pub fn from_fighter(fighter: &Fighter) -> Self {
        Self {
            x: fighter.position.x,
            y: fighter.position.y,
            anim: fighter.anim,
            facing: fighter.facing,
            dead: fighter.dead,
            winner: fighter.winner,
            eating: fighter.eating,
        }
    }
}

/// Seat in a room. Fixed once assigned.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Role {
    /// First joiner; owns P1 and spawns the mouse
    Host,
    /// Second joiner; owns P2
    Guest,
}

impl Role {
    /// Fighter owned by this role
    pub fn slot(self) -> Slot {
        match self {
            Role::Host => Slot::P1,
            Role::Guest => Slot::P2,
        }
    }

    pub fn other(self) -> Role {
        match self {
            Role::Host => Role::Guest,
            Role::Guest => Role::Host,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Host => f.write_str("host"),
            Role::Guest => f.write_str("guest"),
        }
    }
}

/// Why the registry refused a request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum RoomErrorReason {
    NotFound,
    Full,
    /// Registry could not seat the peer (capacity or already seated)
    Unavailable,
}

impl fmt::Display for RoomErrorReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RoomErrorReason::NotFound => f.write_str("Room not found"),
            RoomErrorReason::Full => f.write_str("Room is full"),
            RoomErrorReason::Unavailable => f.write_str("Room unavailable"),
        }
    }
}

/// Six-character room code over `[A-Z0-9]`
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RoomCode([u8; ROOM_CODE_LEN]);

impl RoomCode {
    /// Uniformly random code. Not unique by construction.
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        let mut code = [0u8; ROOM_CODE_LEN];
        for c in code.iter_mut() {
            *c = ROOM_CODE_ALPHABET[rng.gen_range(0..ROOM_CODE_ALPHABET.len())];
        }
        Self(code)
    }

    /// Parse user input: trimmed and upper-cased before validation
    pub fn parse(input: &str) -> Result<Self, RoomCodeError> {
        let normalized = input.trim().to_ascii_uppercase();
        let len = normalized.chars().count();
        if len != ROOM_CODE_LEN {
            return Err(RoomCodeError::Length(len));
        }
        if let Some(bad) = normalized
            .chars()
            .find(|c| !c.is_ascii() || !ROOM_CODE_ALPHABET.contains(&(*c as u8)))
        {
            return Err(RoomCodeError::InvalidChar(bad));
        }

        let mut code = [0u8; ROOM_CODE_LEN];
        code.copy_from_slice(normalized.as_bytes());
        Ok(Self(code))
    }

    pub fn as_str(&self) -> &str {
        // Only ever built from ASCII alphabet bytes
        std::str::from_utf8(&self.0).unwrap_or_default()
    }
}

impl FromStr for RoomCode {
    type Err = RoomCodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for RoomCode {
    type Error = RoomCodeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<RoomCode> for String {
    fn from(code: RoomCode) -> Self {
        code.as_str().to_owned()
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Debug for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "RoomCode({})", self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum RoomCodeError {
    #[error("room code must be 6 characters, got {0}")]
    Length(usize),
    #[error("invalid room code character {0:?}")]
    InvalidChar(char),
}

/// Encode a message using bincode
/// Uses legacy config for fixed-size integers (compatible with the browser client)
pub fn encode<T: Serialize>(message: &T) -> Result<Vec<u8>, EncodeError> {
    bincode::serde::encode_to_vec(message, bincode::config::legacy())
        .map_err(|e| EncodeError(e.to_string()))
}

/// Decode a message using bincode
pub fn decode<T: for<'de> Deserialize<'de>>(data: &[u8]) -> Result<T, DecodeError> {
    bincode::serde::decode_from_slice(data, bincode::config::legacy())
        .map(|(msg, _)| msg)
        .map_err(|e| DecodeError(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
#[error("Encode error: {0}")]
pub struct EncodeError(String);

#[derive(Debug, thiserror::Error)]
#[error("Decode error: {0}")]
pub struct DecodeError(String);

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    #[test]
    fn test_room_code_generate_uses_alphabet() {
        let mut rng = StdRng::seed_from_u64(7);
        for _ in 0..100 {
            let code = RoomCode::generate(&mut rng);
            assert_eq!(code.as_str().len(), 6);
            assert!(code
                .as_str()
                .bytes()
                .all(|b| ROOM_CODE_ALPHABET.contains(&b)));
        }
    }

    #[test]
    fn test_room_code_parse_normalizes() {
        let code = RoomCode::parse("  ab12cd \n").unwrap();
        assert_eq!(code.as_str(), "AB12CD");
        assert_eq!(code.to_string(), "AB12CD");
        assert_eq!("xyz789".parse::<RoomCode>().unwrap().as_str(), "XYZ789");
    }

    #[test]
    fn test_room_code_parse_rejects() {
        assert_eq!(RoomCode::parse("ABC"), Err(RoomCodeError::Length(3)));
        assert_eq!(RoomCode::parse(""), Err(RoomCodeError::Length(0)));
        assert_eq!(
            RoomCode::parse("AB-12C"),
            Err(RoomCodeError::InvalidChar('-'))
        );
        assert!(RoomCode::parse("ÄBCDEF").is_err());
    }

    #[test]
    fn test_room_code_wire_form_is_string() {
        let code = RoomCode::parse("QWE123").unwrap();
        let bytes = encode(&code).unwrap();
        let as_string: String = decode(&bytes).unwrap();
        assert_eq!(as_string, "QWE123");

        // Invalid codes are rejected at decode time
        let bad = encode(&"nope".to_string()).unwrap();
        assert!(decode::<RoomCode>(&bad).is_err());
    }

    #[test]
    fn test_server_message_room_created() {
        let msg = ServerMessage::RoomCreated {
            room_code: RoomCode::parse("ABCDEF").unwrap(),
            role: Role::Host,
        };
        let decoded: ServerMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_peer_message_wrapping() {
        let snap = FighterSnapshot {
            x: 12.5,
            y: 360.0,
            anim: AnimCode::Attack,
            facing: Facing::Left,
            dead: false,
            winner: false,
            eating: 0,
        };
        let msg = ClientMessage::Peer(PeerMessage::GameUpdate(snap));
        let decoded: ClientMessage = decode(&encode(&msg).unwrap()).unwrap();
        assert_eq!(decoded, msg);
    }

    #[test]
    fn test_decode_garbage_fails() {
        assert!(decode::<ClientMessage>(&[0xFF, 0xFF, 0xFF, 0xFF, 0x01]).is_err());
    }

    #[test]
    fn test_role_slots() {
        assert_eq!(Role::Host.slot(), Slot::P1);
        assert_eq!(Role::Guest.slot(), Slot::P2);
        assert_eq!(Role::Host.other(), Role::Guest);
        assert_eq!(Role::Guest.to_string(), "guest");
    }

    #[test]
    fn test_room_error_text() {
        assert_eq!(RoomErrorReason::NotFound.to_string(), "Room not found");
        assert_eq!(RoomErrorReason::Full.to_string(), "Room is full");
    }
}
