use std::net::SocketAddr;
use std::time::{Duration, Instant};

use hashbrown::HashMap;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::lobby::PeerId;
use crate::net::protocol::ServerMessage;

/// Outbound queue of one connection, drained by its writer task
pub type OutboundSender = mpsc::UnboundedSender<ServerMessage>;
pub type OutboundReceiver = mpsc::UnboundedReceiver<ServerMessage>;

/// Client connection information
#[derive(Debug)]
pub struct Connection {
    pub id: PeerId,
    pub remote_addr: Option<SocketAddr>,
    pub created_at: Instant,
    pub last_activity: Instant,
    pub messages_sent: u64,
    pub messages_received: u64,
    pub bytes_received: u64,
    sender: OutboundSender,
}

impl Connection {
    pub fn new(id: PeerId, remote_addr: Option<SocketAddr>, sender: OutboundSender) -> Self {
        let now = Instant::now();
        Self {
            id,
            remote_addr,
            created_at: now,
            last_activity: now,
            messages_sent: 0,
            messages_received: 0,
            bytes_received: 0,
            sender,
        }
    }

    /// Update last activity timestamp
    pub fn touch(&mut self) {
        self.last_activity = Instant::now();
    }

    /// Record an inbound frame
    pub fn record_received(&mut self, bytes: usize) {
        self.bytes_received += bytes as u64;
        self.messages_received += 1;
        self.touch();
    }

    /// Queue a message. Fails only once the writer task is gone.
    pub fn send(&mut self, message: ServerMessage) -> bool {
        if self.sender.send(message).is_ok() {
            self.messages_sent += 1;
            true
        } else {
            false
        }
    }

    /// Get time since last activity
    pub fn idle_time(&self) -> Duration {
        self.last_activity.elapsed()
    }
}

/// Table of live connections keyed by peer id
#[derive(Default)]
pub struct ConnectionManager {
    connections: HashMap<PeerId, Connection>,
}

impl ConnectionManager {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a connection under a fresh random id
    pub fn register(&mut self, remote_addr: Option<SocketAddr>, sender: OutboundSender) -> PeerId {
        let id = loop {
            let candidate = Uuid::new_v4();
            if !self.connections.contains_key(&candidate) {
                break candidate;
            }
        };
        self.connections
            .insert(id, Connection::new(id, remote_addr, sender));
        id
    }

    pub fn get(&self, id: PeerId) -> Option<&Connection> {
        self.connections.get(&id)
    }

    pub fn get_mut(&mut self, id: PeerId) -> Option<&mut Connection> {
        self.connections.get_mut(&id)
    }

    /// Queue a message for a peer. False if the peer is unknown or gone.
    pub fn send(&mut self, to: PeerId, message: ServerMessage) -> bool {
        self.connections
            .get_mut(&to)
            .is_some_and(|conn| conn.send(message))
    }

    pub fn remove(&mut self, id: PeerId) -> Option<Connection> {
        self.connections.remove(&id)
    }

    pub fn count(&self) -> usize {
        self.connections.len()
    }

    pub fn ids(&self) -> Vec<PeerId> {
        self.connections.keys().copied().collect()
    }

    /// Ids of connections idle for longer than `max_idle`
    pub fn stale(&self, max_idle: Duration) -> Vec<PeerId> {
        self.connections
            .values()
            .filter(|conn| conn.idle_time() > max_idle)
            .map(|conn| conn.id)
            .collect()
    }
}
