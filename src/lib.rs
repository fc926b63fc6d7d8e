//! Cat Fighter
//!
//! Fixed-step simulation of a two-fighter arena brawl, peer state sync for
//! online matches, and the WebTransport relay that pairs players by room code.
//!
//! # Features
//!
//! - `lobby` - Room registry, relay hub and WebTransport relay server (enabled by default)
//!
//! Build with `--no-default-features` for the simulation and peer sync only.

pub mod config;
pub mod util;
pub mod game;
pub mod net;
pub mod metrics;

// Feature-gated modules (enabled by default)
#[cfg(feature = "lobby")]
pub mod lobby;
