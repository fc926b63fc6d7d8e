//! Relay hub: routes decoded client messages through the room registry
//! and fans replies out to per-connection outbound queues.
//!
//! Transport-agnostic. The WebTransport server owns one hub behind a lock
//! and calls into it from every connection task.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rand::Rng;
use tracing::{debug, info, warn};

use crate::lobby::manager::{Outbound, RegistryError, RoomRegistry};
use crate::lobby::PeerId;
use crate::metrics::Metrics;
use crate::net::connection::{ConnectionManager, OutboundSender};
use crate::net::protocol::{ClientMessage, ServerMessage};

pub struct RelayHub {
    registry: RoomRegistry,
    connections: ConnectionManager,
    metrics: Arc<Metrics>,
}

impl RelayHub {
    pub fn new(max_rooms: usize, metrics: Arc<Metrics>) -> Self {
        Self {
            registry: RoomRegistry::new(max_rooms),
            connections: ConnectionManager::new(),
            metrics,
        }
    }

    pub fn registry(&self) -> &RoomRegistry {
        &self.registry
    }

    pub fn connections(&self) -> &ConnectionManager {
        &self.connections
    }

    /// Register a new transport connection and return its peer id
    pub fn connect(&mut self, remote_addr: Option<SocketAddr>, sender: OutboundSender) -> PeerId {
        let peer = self.connections.register(remote_addr, sender);
        self.metrics.connections_total.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .connections_active
            .store(self.connections.count() as u64, Ordering::Relaxed);
        debug!(%peer, ?remote_addr, "Peer connected");
        peer
    }

    /// Account for one inbound frame before it is decoded
    pub fn record_frame(&mut self, peer: PeerId, bytes: usize) {
        if let Some(conn) = self.connections.get_mut(peer) {
            conn.record_received(bytes);
        }
        self.metrics.messages_received.fetch_add(1, Ordering::Relaxed);
        self.metrics
            .bytes_received
            .fetch_add(bytes as u64, Ordering::Relaxed);
    }

    /// A frame from `peer` could not be decoded and was dropped
    pub fn record_malformed(&self, peer: PeerId) {
        self.metrics.malformed_frames.fetch_add(1, Ordering::Relaxed);
        debug!(%peer, "Dropped malformed frame");
    }

    /// Handle one decoded client message
    pub fn handle<R: Rng + ?Sized>(&mut self, peer: PeerId, message: ClientMessage, rng: &mut R) {
        let started = Instant::now();

        match message {
            ClientMessage::CreateRoom => {
                let result = self.registry.create_room(peer, rng);
                if result.is_ok() {
                    self.metrics.rooms_created.fetch_add(1, Ordering::Relaxed);
                }
                self.reply(peer, result);
            }
            ClientMessage::JoinRoom { room_code } => {
                let result = self.registry.join_room(peer, &room_code);
                self.reply(peer, result);
            }
            ClientMessage::Peer(message) => match self.registry.relay(peer, message) {
                Ok(Some(outbound)) => {
                    self.metrics.messages_relayed.fetch_add(1, Ordering::Relaxed);
                    self.deliver(outbound);
                }
                Ok(None) => debug!(%peer, "No opponent to relay to"),
                Err(e) => debug!(%peer, "Relay refused: {}", e),
            },
        }

        self.sync_gauges();
        self.metrics.record_dispatch_time(started.elapsed());
    }

    /// Tear down a connection. The other occupant of its room is notified.
    pub fn disconnect(&mut self, peer: PeerId) {
        for outbound in self.registry.disconnect(peer) {
            self.deliver(outbound);
        }
        if let Some(conn) = self.connections.remove(peer) {
            debug!(
                %peer,
                received = conn.messages_received,
                sent = conn.messages_sent,
                bytes = conn.bytes_received,
                "Peer disconnected"
            );
        }
        self.sync_gauges();
    }

    /// Drop connections that have been silent for longer than `max_idle`.
    /// Their outbound queues close, which ends the transport tasks.
    /// A host alone in its room sends nothing until someone joins, so it
    /// is never considered idle.
    pub fn evict_idle(&mut self, max_idle: Duration) -> Vec<PeerId> {
        let stale: Vec<PeerId> = self
            .connections
            .stale(max_idle)
            .into_iter()
            .filter(|&peer| !self.registry.is_waiting(peer))
            .collect();
        for &peer in &stale {
            info!(%peer, "Evicting idle connection");
            self.disconnect(peer);
        }
        stale
    }

    /// Close every room and forget every connection
    pub fn shutdown(&mut self) {
        let seated = self.registry.shutdown();
        for peer in self.connections.ids() {
            self.connections.remove(peer);
        }
        info!(seated = seated.len(), "Relay hub shut down");
        self.sync_gauges();
    }

    fn reply(&mut self, peer: PeerId, result: Result<Vec<Outbound>, RegistryError>) {
        match result {
            Ok(outbound) => {
                for message in outbound {
                    self.deliver(message);
                }
            }
            Err(e) => {
                self.metrics.join_failures.fetch_add(1, Ordering::Relaxed);
                info!(%peer, "Room request refused: {}", e);
                self.deliver(Outbound::new(
                    peer,
                    ServerMessage::RoomError { reason: e.reason() },
                ));
            }
        }
    }

    fn deliver(&mut self, outbound: Outbound) {
        if self.connections.send(outbound.to, outbound.message) {
            self.metrics.messages_sent.fetch_add(1, Ordering::Relaxed);
        } else {
            warn!(peer = %outbound.to, "Outbound queue closed, message dropped");
        }
    }

    fn sync_gauges(&self) {
        self.metrics.set_room_gauges(
            self.registry.room_count(),
            self.registry.total_player_count(),
        );
        self.metrics
            .connections_active
            .store(self.connections.count() as u64, Ordering::Relaxed);
    }
}
