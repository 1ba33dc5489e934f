//! # ataxx-server
//!
//! Authoritative server for a single two-player ataxx match.
//!
//! ```text
//!   listener ──► Lobby (register handshake, late refusals)
//!                  │ two players
//!                  ▼
//!              TurnScheduler ──► Dispatcher ──► players
//!                  │
//!                  ▼
//!              MatchReport
//! ```

pub mod config;
pub mod dispatcher;
pub mod error;
pub mod lobby;
pub mod scheduler;

use tokio::net::TcpListener;
use tokio_util::sync::CancellationToken;
use tracing::info;

use ataxx_core::{Board, GameState, MAX_PLAYERS, NoopRenderer, Player, TerminalRenderer};

pub use config::ServerConfig;
pub use dispatcher::Dispatcher;
pub use error::ServerError;
pub use lobby::{Lobby, LobbyConfig};
pub use scheduler::{MatchReport, TurnConfig, TurnScheduler};

/// Runs one match from registration to `game_over`.
pub struct MatchServer {
    config: ServerConfig,
    opening: Option<Board>,
    shutdown: CancellationToken,
}

impl MatchServer {
    pub fn new(config: ServerConfig) -> Self {
        Self {
            config,
            opening: None,
            shutdown: CancellationToken::new(),
        }
    }

    /// Start from `board` instead of the configured layout.
    pub fn with_opening(mut self, board: Board) -> Self {
        self.opening = Some(board);
        self
    }

    /// Token that stops registration or the running match when cancelled.
    pub fn stop_handle(&self) -> CancellationToken {
        self.shutdown.clone()
    }

    /// Bind the configured address and serve one match on it.
    pub async fn run(&self) -> Result<Option<MatchReport>, ServerError> {
        let addr = self.config.listen_addr();
        let listener = TcpListener::bind(&addr)
            .await
            .map_err(|source| ServerError::Bind { addr, source })?;
        self.serve(listener).await
    }

    /// Serve one match on an already bound listener.
    ///
    /// Returns `None` when stopped before both players registered.
    pub async fn serve(&self, listener: TcpListener) -> Result<Option<MatchReport>, ServerError> {
        info!("listening on {}", listener.local_addr()?);

        let mut lobby = Lobby::spawn(listener, self.config.lobby_config(), &self.shutdown);
        let registered = tokio::select! {
            biased;
            _ = self.shutdown.cancelled() => None,
            players = lobby.accept_until_full() => Some(players),
        };
        let players = match registered {
            Some(players) => players,
            None => {
                info!("stopped during registration");
                lobby.shutdown().await;
                return Ok(None);
            }
        };
        let players = match players {
            Ok(players) => players,
            Err(e) => {
                lobby.shutdown().await;
                return Err(e.into());
            }
        };
        let got = players.len();
        let players: [Player; MAX_PLAYERS] = players
            .try_into()
            .map_err(|_| ServerError::LobbyClosed {
                expected: MAX_PLAYERS,
                got,
            })?;

        let board = self
            .opening
            .clone()
            .unwrap_or_else(|| Board::with_layout(self.config.game.layout));
        let state = GameState::new(players, board)?;

        let report = TurnScheduler::new(
            state,
            self.dispatcher(),
            self.config.turn_config(),
            self.shutdown.clone(),
        )
        .run()
        .await;

        // Dropping the listener ends the late-refusal loop.
        lobby.shutdown().await;
        Ok(Some(report?))
    }

    fn dispatcher(&self) -> Dispatcher {
        let timeout = self.config.write_timeout();
        if self.config.logging.render_board {
            Dispatcher::new(TerminalRenderer, timeout)
        } else {
            Dispatcher::new(NoopRenderer, timeout)
        }
    }
}
