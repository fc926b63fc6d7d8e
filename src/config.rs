use std::net::{IpAddr, Ipv4Addr};
use std::time::Duration;

use crate::game::constants::net::SNAPSHOT_INTERVAL_MS;

/// Relay server configuration
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Address to bind the server to
    pub bind_address: IpAddr,
    /// Port to listen on
    pub port: u16,
    /// Maximum number of concurrent rooms
    pub max_rooms: usize,
    /// Port of the plain-HTTP metrics endpoint
    pub metrics_port: u16,
    /// Path to TLS certificate file (PEM)
    pub tls_cert_path: Option<String>,
    /// Path to TLS key file (PEM)
    pub tls_key_path: Option<String>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_address: IpAddr::V4(Ipv4Addr::new(0, 0, 0, 0)),
            port: 4433,
            max_rooms: 100,
            metrics_port: 9090,
            tls_cert_path: None,
            tls_key_path: None,
        }
    }
}

impl ServerConfig {
    /// Load config from environment or use defaults
    pub fn load_or_default() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    /// Load config through an arbitrary variable lookup
    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();

        if let Some(addr) = lookup("BIND_ADDRESS") {
            if let Ok(parsed) = addr.parse() {
                config.bind_address = parsed;
            } else {
                tracing::warn!("Invalid BIND_ADDRESS '{}', using default", addr);
            }
        }

        if let Some(port) = lookup("PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.port = parsed,
                Ok(_) => tracing::warn!("PORT must be > 0, using default"),
                Err(_) => tracing::warn!("Invalid PORT '{}', using default", port),
            }
        }

        if let Some(max_rooms) = lookup("MAX_ROOMS") {
            if let Ok(parsed) = max_rooms.parse::<usize>() {
                if parsed > 0 && parsed <= 10000 {
                    config.max_rooms = parsed;
                } else {
                    tracing::warn!("MAX_ROOMS must be 1-10000, using default");
                }
            } else {
                tracing::warn!("Invalid MAX_ROOMS '{}', using default", max_rooms);
            }
        }

        if let Some(port) = lookup("METRICS_PORT") {
            match port.parse::<u16>() {
                Ok(parsed) if parsed > 0 => config.metrics_port = parsed,
                _ => tracing::warn!("Invalid METRICS_PORT '{}', using default", port),
            }
        }

        if let Some(cert_path) = lookup("TLS_CERT_PATH") {
            config.tls_cert_path = Some(cert_path);
        }

        if let Some(key_path) = lookup("TLS_KEY_PATH") {
            config.tls_key_path = Some(key_path);
        }

        config
    }

    /// Validate configuration after loading
    pub fn validate(&self) -> Result<(), String> {
        if self.port == 0 {
            return Err("Port cannot be 0".to_string());
        }
        if self.max_rooms == 0 {
            return Err("max_rooms must be at least 1".to_string());
        }
        if self.metrics_port == self.port {
            return Err("metrics_port must differ from port".to_string());
        }
        if self.tls_cert_path.is_some() != self.tls_key_path.is_some() {
            return Err("TLS_CERT_PATH and TLS_KEY_PATH must be set together".to_string());
        }
        Ok(())
    }
}

/// Client-side peer sync tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SyncConfig {
    /// Minimum spacing between outbound snapshots
    pub snapshot_interval: Duration,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            snapshot_interval: Duration::from_millis(SNAPSHOT_INTERVAL_MS),
        }
    }
}

impl SyncConfig {
    pub fn load_or_default() -> Self {
        Self::load_from(|key| std::env::var(key).ok())
    }

    pub fn load_from(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = Self::default();
        if let Some(ms) = lookup("SNAPSHOT_INTERVAL_MS") {
            match ms.parse::<u64>() {
                Ok(parsed) if parsed <= 1000 => {
                    config.snapshot_interval = Duration::from_millis(parsed)
                }
                _ => tracing::warn!("Invalid SNAPSHOT_INTERVAL_MS '{}', using default", ms),
            }
        }
        config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn env(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_default_config() {
        let config = ServerConfig::default();
        assert_eq!(config.port, 4433);
        assert_eq!(config.max_rooms, 100);
        assert_eq!(config.metrics_port, 9090);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_or_default() {
        let config = ServerConfig::load_or_default();
        assert!(config.port > 0);
    }

    #[test]
    fn test_load_from_overrides() {
        let config = ServerConfig::load_from(env(&[
            ("BIND_ADDRESS", "127.0.0.1"),
            ("PORT", "5000"),
            ("MAX_ROOMS", "12"),
            ("METRICS_PORT", "9100"),
            ("TLS_CERT_PATH", "cert.pem"),
            ("TLS_KEY_PATH", "key.pem"),
        ]));
        assert_eq!(config.bind_address.to_string(), "127.0.0.1");
        assert_eq!(config.port, 5000);
        assert_eq!(config.max_rooms, 12);
        assert_eq!(config.metrics_port, 9100);
        assert_eq!(config.tls_cert_path.as_deref(), Some("cert.pem"));
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_invalid_values_fall_back() {
        let config = ServerConfig::load_from(env(&[
            ("BIND_ADDRESS", "not-an-ip"),
            ("PORT", "0"),
            ("MAX_ROOMS", "99999"),
            ("METRICS_PORT", "abc"),
        ]));
        let defaults = ServerConfig::default();
        assert_eq!(config.bind_address, defaults.bind_address);
        assert_eq!(config.port, defaults.port);
        assert_eq!(config.max_rooms, defaults.max_rooms);
        assert_eq!(config.metrics_port, defaults.metrics_port);
    }

    #[test]
    fn test_validate_rejects() {
        let config = ServerConfig {
            metrics_port: 4433,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = ServerConfig {
            tls_cert_path: Some("cert.pem".into()),
            ..Default::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_sync_config() {
        assert_eq!(
            SyncConfig::default().snapshot_interval,
            Duration::from_millis(16)
        );
        let config = SyncConfig::load_from(env(&[("SNAPSHOT_INTERVAL_MS", "33")]));
        assert_eq!(config.snapshot_interval, Duration::from_millis(33));
        let config = SyncConfig::load_from(env(&[("SNAPSHOT_INTERVAL_MS", "-1")]));
        assert_eq!(config, SyncConfig::default());
    }
}
