//! WebTransport relay server
//!
//! Each client opens one bidirectional stream. Frames read from it are fed
//! to the shared `RelayHub`; a writer task drains the connection's outbound
//! queue back into the stream. The connection ends when either side stops.

use std::net::SocketAddr;
use std::sync::atomic::Ordering;
use std::sync::Arc;
use std::time::Duration;

use rand::rngs::StdRng;
use rand::SeedableRng;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::{mpsc, RwLock};
use tracing::{debug, info, warn};

use crate::config::ServerConfig;
use crate::game::constants::net::{IDLE_SWEEP_SECS, IDLE_TIMEOUT_SECS};
use crate::lobby::PeerId;
use crate::metrics::Metrics;
use crate::net::connection::OutboundReceiver;
use crate::net::framing::{read_message, write_message, FramingError};
use crate::net::protocol::ClientMessage;
use crate::net::relay::RelayHub;
use crate::net::tls::TlsConfig;

/// WebTransport server in front of a relay hub
pub struct RelayServer {
    config: ServerConfig,
    tls_config: TlsConfig,
    hub: Arc<RwLock<RelayHub>>,
    metrics: Arc<Metrics>,
}

impl RelayServer {
    pub async fn new(
        config: ServerConfig,
        hub: Arc<RwLock<RelayHub>>,
        metrics: Arc<Metrics>,
    ) -> anyhow::Result<Self> {
        let tls_config = TlsConfig::load(&config).await?;
        Ok(Self {
            config,
            tls_config,
            hub,
            metrics,
        })
    }

    /// Get the certificate hash for client configuration
    pub fn cert_hash(&self) -> &str {
        self.tls_config.cert_hash()
    }

    pub fn bind_addr(&self) -> SocketAddr {
        SocketAddr::new(self.config.bind_address, self.config.port)
    }

    /// Accept connections until the endpoint fails
    pub async fn run(self) -> anyhow::Result<()> {
        use wtransport::Endpoint;
        use wtransport::ServerConfig;

        let bind_addr = self.bind_addr();
        let server_config = ServerConfig::builder()
            .with_bind_address(bind_addr)
            .with_identity(self.tls_config.identity)
            .build();

        let server = Endpoint::server(server_config)?;
        info!("WebTransport relay listening on {}", bind_addr);

        spawn_idle_sweeper(self.hub.clone());

        loop {
            let incoming = server.accept().await;
            let hub = self.hub.clone();
            let metrics = self.metrics.clone();

            tokio::spawn(async move {
                if let Err(e) = handle_connection(incoming, hub, metrics).await {
                    warn!("Connection error: {}", e);
                }
            });
        }
    }
}

/// Periodically drop connections that stopped talking
fn spawn_idle_sweeper(hub: Arc<RwLock<RelayHub>>) {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(Duration::from_secs(IDLE_SWEEP_SECS));
        loop {
            interval.tick().await;
            let evicted = hub
                .write()
                .await
                .evict_idle(Duration::from_secs(IDLE_TIMEOUT_SECS));
            if !evicted.is_empty() {
                info!(count = evicted.len(), "Evicted idle connections");
            }
        }
    });
}

/// Handle a single WebTransport connection
async fn handle_connection(
    incoming: wtransport::endpoint::IncomingSession,
    hub: Arc<RwLock<RelayHub>>,
    metrics: Arc<Metrics>,
) -> anyhow::Result<()> {
    let session_request = incoming.await?;
    debug!(
        "New connection from: {:?}, path: {}",
        session_request.authority(),
        session_request.path()
    );

    let connection = session_request.accept().await?;
    let remote_addr = connection.remote_address();
    let (send, recv) = connection.accept_bi().await?;

    let (tx, rx) = mpsc::unbounded_channel();
    let peer = hub.write().await.connect(Some(remote_addr), tx);
    info!(%peer, %remote_addr, "Client connected");

    let result = tokio::select! {
        r = read_loop(recv, peer, hub.clone()) => r,
        r = write_loop(send, rx, metrics) => r,
    };

    hub.write().await.disconnect(peer);
    info!(%peer, "Client disconnected");

    match result {
        Ok(()) | Err(FramingError::ConnectionClosed) => Ok(()),
        Err(e) => Err(e.into()),
    }
}

/// Feed inbound frames to the hub. Undecodable frames are dropped and
/// reading continues; anything else ends the connection.
async fn read_loop<R>(
    mut stream: R,
    peer: PeerId,
    hub: Arc<RwLock<RelayHub>>,
) -> Result<(), FramingError>
where
    R: AsyncRead + Unpin,
{
    let mut rng = StdRng::from_entropy();

    loop {
        match read_message::<_, ClientMessage>(&mut stream).await {
            Ok((message, len)) => {
                let mut hub = hub.write().await;
                hub.record_frame(peer, len);
                hub.handle(peer, message, &mut rng);
            }
            Err(FramingError::Malformed { len, source }) => {
                warn!(%peer, "Failed to decode client message: {}", source);
                let mut hub = hub.write().await;
                hub.record_frame(peer, len);
                hub.record_malformed(peer);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Drain the outbound queue into the stream until the hub drops the sender
async fn write_loop<W>(
    mut stream: W,
    mut rx: OutboundReceiver,
    metrics: Arc<Metrics>,
) -> Result<(), FramingError>
where
    W: AsyncWrite + Unpin,
{
    while let Some(message) = rx.recv().await {
        let written = write_message(&mut stream, &message).await?;
        metrics
            .bytes_sent
            .fetch_add(written as u64, Ordering::Relaxed);
    }
    Ok(())
}
