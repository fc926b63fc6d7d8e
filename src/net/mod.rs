pub mod framing;
pub mod protocol;
pub mod sync;

// Relay server side (needs the room registry)
#[cfg(feature = "lobby")]
pub mod connection;
#[cfg(feature = "lobby")]
pub mod relay;
#[cfg(feature = "lobby")]
pub mod tls;
#[cfg(feature = "lobby")]
pub mod transport;
