//! Prometheus-compatible metrics endpoint
//!
//! Exposes relay counters in Prometheus text format and as JSON.
//! Default endpoint: http://localhost:9090/metrics

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use serde_json::json;
use tokio::io::{AsyncReadExt, AsyncWriteExt};
use tokio::net::TcpListener;
use tracing::{debug, info};

const DISPATCH_HISTORY: usize = 1000;

/// Metrics registry for the relay server
#[derive(Debug)]
pub struct Metrics {
    // Connections
    pub connections_active: AtomicU64,
    pub connections_total: AtomicU64,

    // Rooms
    pub rooms_active: AtomicU64,
    pub rooms_created: AtomicU64,
    pub players_seated: AtomicU64,
    pub join_failures: AtomicU64,

    // Traffic
    pub messages_received: AtomicU64,
    pub messages_relayed: AtomicU64,
    pub messages_sent: AtomicU64,
    pub bytes_received: AtomicU64,
    pub bytes_sent: AtomicU64,
    pub malformed_frames: AtomicU64,

    // Time spent handling one inbound message (microseconds)
    pub dispatch_time_us: AtomicU64,
    pub dispatch_time_p99_us: AtomicU64,

    start_time: Instant,
    dispatch_history: RwLock<VecDeque<u64>>,
}

impl Metrics {
    pub fn new() -> Self {
        Self {
            connections_active: AtomicU64::new(0),
            connections_total: AtomicU64::new(0),
            rooms_active: AtomicU64::new(0),
            rooms_created: AtomicU64::new(0),
            players_seated: AtomicU64::new(0),
            join_failures: AtomicU64::new(0),
            messages_received: AtomicU64::new(0),
            messages_relayed: AtomicU64::new(0),
            messages_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            malformed_frames: AtomicU64::new(0),
            dispatch_time_us: AtomicU64::new(0),
            dispatch_time_p99_us: AtomicU64::new(0),
            start_time: Instant::now(),
            dispatch_history: RwLock::new(VecDeque::with_capacity(DISPATCH_HISTORY)),
        }
    }

    /// Record how long one inbound message took to dispatch
    pub fn record_dispatch_time(&self, duration: Duration) {
        let us = duration.as_micros() as u64;
        self.dispatch_time_us.store(us, Ordering::Relaxed);

        let mut history = self.dispatch_history.write();
        history.push_back(us);
        while history.len() > DISPATCH_HISTORY {
            history.pop_front();
        }

        if history.len() >= 10 {
            let mut sorted: Vec<u64> = history.iter().copied().collect();
            sorted.sort_unstable();
            let p99_idx = (sorted.len() as f32 * 0.99) as usize;
            self.dispatch_time_p99_us
                .store(sorted[p99_idx.min(sorted.len() - 1)], Ordering::Relaxed);
        }
    }

    /// Mirror registry gauges after a change
    pub fn set_room_gauges(&self, rooms: usize, players: usize) {
        self.rooms_active.store(rooms as u64, Ordering::Relaxed);
        self.players_seated.store(players as u64, Ordering::Relaxed);
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }

    /// Generate Prometheus-format metrics output
    pub fn to_prometheus(&self) -> String {
        let mut output = String::with_capacity(2048);

        macro_rules! metric {
            ($name:expr, $help:expr, $type:expr, $value:expr) => {
                output.push_str(&format!(
                    "# HELP {} {}\n# TYPE {} {}\n{} {}\n",
                    $name, $help, $name, $type, $name, $value
                ));
            };
        }

        metric!("cat_fighter_connections_active", "Open WebTransport connections", "gauge",
            self.connections_active.load(Ordering::Relaxed));
        metric!("cat_fighter_connections_total", "Connections accepted", "counter",
            self.connections_total.load(Ordering::Relaxed));

        metric!("cat_fighter_rooms_active", "Open rooms", "gauge",
            self.rooms_active.load(Ordering::Relaxed));
        metric!("cat_fighter_rooms_created_total", "Rooms created", "counter",
            self.rooms_created.load(Ordering::Relaxed));
        metric!("cat_fighter_players_seated", "Peers seated in a room", "gauge",
            self.players_seated.load(Ordering::Relaxed));
        metric!("cat_fighter_join_failures_total", "Rejected create or join requests", "counter",
            self.join_failures.load(Ordering::Relaxed));

        metric!("cat_fighter_messages_received_total", "Frames received from clients", "counter",
            self.messages_received.load(Ordering::Relaxed));
        metric!("cat_fighter_messages_relayed_total", "Peer messages forwarded", "counter",
            self.messages_relayed.load(Ordering::Relaxed));
        metric!("cat_fighter_messages_sent_total", "Frames sent to clients", "counter",
            self.messages_sent.load(Ordering::Relaxed));
        metric!("cat_fighter_bytes_received_total", "Payload bytes received", "counter",
            self.bytes_received.load(Ordering::Relaxed));
        metric!("cat_fighter_bytes_sent_total", "Payload bytes sent", "counter",
            self.bytes_sent.load(Ordering::Relaxed));
        metric!("cat_fighter_malformed_frames_total", "Frames dropped as undecodable", "counter",
            self.malformed_frames.load(Ordering::Relaxed));

        metric!("cat_fighter_dispatch_time_microseconds", "Last dispatch time", "gauge",
            self.dispatch_time_us.load(Ordering::Relaxed));
        metric!("cat_fighter_dispatch_time_p99_microseconds", "99th percentile dispatch time", "gauge",
            self.dispatch_time_p99_us.load(Ordering::Relaxed));
        metric!("cat_fighter_uptime_seconds", "Server uptime in seconds", "counter",
            self.uptime_seconds());

        output
    }

    /// Generate JSON format metrics
    pub fn to_json(&self) -> String {
        let value = json!({
            "connections": {
                "active": self.connections_active.load(Ordering::Relaxed),
                "total": self.connections_total.load(Ordering::Relaxed),
            },
            "rooms": {
                "active": self.rooms_active.load(Ordering::Relaxed),
                "created": self.rooms_created.load(Ordering::Relaxed),
                "players_seated": self.players_seated.load(Ordering::Relaxed),
                "join_failures": self.join_failures.load(Ordering::Relaxed),
            },
            "network": {
                "messages_received": self.messages_received.load(Ordering::Relaxed),
                "messages_relayed": self.messages_relayed.load(Ordering::Relaxed),
                "messages_sent": self.messages_sent.load(Ordering::Relaxed),
                "bytes_received": self.bytes_received.load(Ordering::Relaxed),
                "bytes_sent": self.bytes_sent.load(Ordering::Relaxed),
                "malformed_frames": self.malformed_frames.load(Ordering::Relaxed),
            },
            "performance": {
                "dispatch_time_us": self.dispatch_time_us.load(Ordering::Relaxed),
                "dispatch_time_p99_us": self.dispatch_time_p99_us.load(Ordering::Relaxed),
            },
            "uptime_seconds": self.uptime_seconds(),
        });
        serde_json::to_string_pretty(&value).unwrap_or_else(|_| value.to_string())
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

fn http_response(status: &str, content_type: &str, body: &str) -> String {
    format!(
        "HTTP/1.1 {}\r\nContent-Type: {}\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
        status,
        content_type,
        body.len(),
        body
    )
}

/// Build the response for one raw HTTP request
fn route(metrics: &Metrics, request: &str) -> String {
    if request.starts_with("GET /metrics/json") || request.starts_with("GET /json") {
        http_response("200 OK", "application/json", &metrics.to_json())
    } else if request.starts_with("GET /metrics") {
        http_response(
            "200 OK",
            "text/plain; version=0.0.4",
            &metrics.to_prometheus(),
        )
    } else if request.starts_with("GET /health") || request.starts_with("GET / ") {
        http_response("200 OK", "text/plain", "OK")
    } else {
        "HTTP/1.1 404 Not Found\r\nContent-Length: 0\r\nConnection: close\r\n\r\n".to_string()
    }
}

/// Start the metrics HTTP server
pub async fn start_metrics_server(metrics: Arc<Metrics>, port: u16) -> anyhow::Result<()> {
    let addr = format!("0.0.0.0:{}", port);
    let listener = TcpListener::bind(&addr).await?;

    info!("Metrics server listening on http://{}/metrics", addr);

    loop {
        let (mut socket, peer) = listener.accept().await?;
        let metrics = metrics.clone();

        tokio::spawn(async move {
            let mut buffer = [0u8; 1024];

            match socket.read(&mut buffer).await {
                Ok(n) if n > 0 => {
                    let request = String::from_utf8_lossy(&buffer[..n]);
                    let response = route(&metrics, &request);
                    if let Err(e) = socket.write_all(response.as_bytes()).await {
                        debug!("Failed to write metrics response to {}: {}", peer, e);
                    }
                }
                Ok(_) => {}
                Err(e) => {
                    debug!("Failed to read from metrics socket {}: {}", peer, e);
                }
            }
        });
    }
}
