//! Server settings read from the environment.

use std::env;
use std::net::SocketAddr;

const DEFAULT_HOST: &str = "0.0.0.0";
const DEFAULT_PORT: u16 = 3000;

/// Bind address and startup options for the HTTP server.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    /// Insert the sample profits when the store starts empty.
    pub seed_on_start: bool,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_HOST.to_string(),
            port: DEFAULT_PORT,
            seed_on_start: false,
        }
    }
}

impl ServerConfig {
    /// Read `HOST`, `PORT` and `SEED_ON_START`.
    ///
    /// Unset or unparsable values fall back to the defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the config from any key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        Self {
            host: lookup("HOST")
                .filter(|h| !h.trim().is_empty())
                .unwrap_or(defaults.host),
            port: lookup("PORT")
                .and_then(|p| p.trim().parse().ok())
                .unwrap_or(defaults.port),
            seed_on_start: lookup("SEED_ON_START")
                .map(|v| parse_flag(&v))
                .unwrap_or(defaults.seed_on_start),
        }
    }

    /// The address to bind.
    pub fn socket_addr(&self) -> Result<SocketAddr, std::net::AddrParseError> {
        format!("{}:{}", self.host, self.port).parse()
    }
}

fn parse_flag(value: &str) -> bool {
    matches!(
        value.trim().to_ascii_lowercase().as_str(),
        "1" | "true" | "yes" | "on"
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn config_from(pairs: &[(&str, &str)]) -> ServerConfig {
        let vars: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        ServerConfig::from_lookup(|key| vars.get(key).cloned())
    }

    #[test]
    fn test_defaults() {
        let config = config_from(&[]);
        assert_eq!(config, ServerConfig::default());
        assert_eq!(config.socket_addr().unwrap().port(), 3000);
    }

    #[test]
    fn test_overrides() {
        let config = config_from(&[("HOST", "127.0.0.1"), ("PORT", "8081"), ("SEED_ON_START", "TRUE")]);
        assert_eq!(config.host, "127.0.0.1");
        assert_eq!(config.port, 8081);
        assert!(config.seed_on_start);
        assert_eq!(config.socket_addr().unwrap().to_string(), "127.0.0.1:8081");
    }

    #[test]
    fn test_bad_port_falls_back() {
        let config = config_from(&[("PORT", "http"), ("SEED_ON_START", "no")]);
        assert_eq!(config.port, 3000);
        assert!(!config.seed_on_start);
    }
}
