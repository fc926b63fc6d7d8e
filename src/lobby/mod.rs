//! Room registry for matchmaking by code
//!
//! Seats two peers per room and relays gameplay messages between them.

pub mod manager;
pub mod room;

/// Identity of a connected peer
pub type PeerId = uuid::Uuid;
