//! Configuration for the match server.

use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use ataxx_core::{CodecConfig, Layout, MAX_PLAYERS};

use crate::lobby::LobbyConfig;
use crate::scheduler::TurnConfig;

/// Top-level configuration loaded from a TOML file.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    /// Listening socket.
    pub network: NetworkConfig,
    /// Match rules and deadlines.
    pub game: GameConfig,
    /// Wire framing.
    pub protocol: CodecConfig,
    /// Logging settings.
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NetworkConfig {
    /// Address to bind, e.g. "0.0.0.0" or "::".
    pub bind: String,
    /// TCP port to listen on.
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GameConfig {
    /// How long the player to move has to answer `your_turn`.
    pub turn_timeout_ms: u64,
    /// Rejected submissions allowed per turn before it is forced to a
    /// pass. 0 disables the cap.
    pub max_invalid_moves: u32,
    /// How long a fresh connection has to send `register`.
    pub register_timeout_ms: u64,
    /// Bound on a single outbound write.
    pub write_timeout_ms: u64,
    /// Opening position: "center" or "corners".
    pub layout: Layout,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: "trace", "debug", "info", "warn", "error".
    pub level: String,
    /// Print every emitted board to stdout.
    pub render_board: bool,
}

// ── Defaults ─────────────────────────────────────────────────────

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0".into(),
            port: 8080,
        }
    }
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            turn_timeout_ms: 5_000,
            max_invalid_moves: 3,
            register_timeout_ms: 10_000,
            write_timeout_ms: 5_000,
            layout: Layout::Center,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".into(),
            render_board: false,
        }
    }
}

// ── Loading ──────────────────────────────────────────────────────

impl ServerConfig {
    /// Load configuration from a TOML file, falling back to defaults.
    pub fn load(path: &Path) -> Self {
        match std::fs::read_to_string(path) {
            Ok(contents) => toml::from_str(&contents).unwrap_or_else(|e| {
                tracing::warn!("invalid config {}: {e}; using defaults", path.display());
                Self::default()
            }),
            Err(_) => {
                tracing::info!("no config at {}; using defaults", path.display());
                Self::default()
            }
        }
    }

    /// `bind:port`, bracketing IPv6 literals.
    pub fn listen_addr(&self) -> String {
        ataxx_core::ConnectionInfo::new(self.network.bind.clone(), self.network.port)
            .to_socket_string()
    }

    pub fn write_timeout(&self) -> Duration {
        Duration::from_millis(self.game.write_timeout_ms)
    }

    pub fn lobby_config(&self) -> LobbyConfig {
        LobbyConfig {
            capacity: MAX_PLAYERS,
            register_timeout: Duration::from_millis(self.game.register_timeout_ms.max(1)),
            write_timeout: self.write_timeout(),
            codec: self.protocol,
        }
    }

    pub fn turn_config(&self) -> TurnConfig {
        TurnConfig {
            turn_timeout: Duration::from_millis(self.game.turn_timeout_ms.max(1)),
            max_invalid_moves: self.game.max_invalid_moves,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ataxx_core::Framing;

    #[test]
    fn default_config_serializes() {
        let text = toml::to_string_pretty(&ServerConfig::default()).unwrap();
        assert!(text.contains("turn_timeout_ms"));
        assert!(text.contains("framing = \"lines\""));
        assert!(text.contains("layout = \"center\""));
    }

    #[test]
    fn partial_file_keeps_other_defaults() {
        let cfg: ServerConfig = toml::from_str(
            r#"
            [game]
            turn_timeout_ms = 250
            layout = "corners"

            [protocol]
            framing = "length_prefixed"
            "#,
        )
        .unwrap();
        assert_eq!(cfg.game.turn_timeout_ms, 250);
        assert_eq!(cfg.game.layout, Layout::Corners);
        assert_eq!(cfg.game.max_invalid_moves, 3);
        assert_eq!(cfg.protocol.framing, Framing::LengthPrefixed);
        assert_eq!(cfg.protocol.max_frame_len, ataxx_core::DEFAULT_MAX_FRAME_LEN);
        assert_eq!(cfg.network.port, 8080);
    }

    #[test]
    fn missing_file_falls_back() {
        let cfg = ServerConfig::load(Path::new("/nonexistent/ataxx-server.toml"));
        assert_eq!(cfg.network.bind, "0.0.0.0");
    }

    #[test]
    fn derived_runtime_configs() {
        let mut cfg = ServerConfig::default();
        cfg.game.turn_timeout_ms = 0;
        assert_eq!(cfg.turn_config().turn_timeout, Duration::from_millis(1));
        assert_eq!(cfg.lobby_config().capacity, 2);
        assert_eq!(cfg.lobby_config().register_timeout, Duration::from_secs(10));
    }

    #[test]
    fn listen_addr_brackets_ipv6() {
        let mut cfg = ServerConfig::default();
        assert_eq!(cfg.listen_addr(), "0.0.0.0:8080");
        cfg.network.bind = "::".into();
        assert_eq!(cfg.listen_addr(), "[::]:8080");
    }
}
