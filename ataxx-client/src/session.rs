//! One client's view of a match: register, answer every `your_turn`,
//! stop at `game_over`.

use std::collections::BTreeMap;
use std::time::Duration;

use tracing::{debug, info, warn};

use ataxx_core::{
    AtaxxError, ClientConnection, ClientMessage, Color, EndReason, Inbound, Move, Renderer,
    ServerMessage,
};

use crate::strategy::propose_move;

#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub username: String,
    /// Artificial delay before answering `your_turn`.
    pub think: Duration,
}

/// How the match ended from this client's side.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionSummary {
    /// Our color, once `game_start` named it.
    pub color: Option<Color>,
    pub reason: EndReason,
    pub winner: Option<String>,
    pub draw: bool,
    pub scores: BTreeMap<String, usize>,
    /// Submissions sent, passes included.
    pub moves_sent: u32,
}

impl SessionSummary {
    pub fn won(&self, username: &str) -> bool {
        self.winner.as_deref() == Some(username)
    }
}

pub struct Session<R> {
    conn: ClientConnection,
    config: SessionConfig,
    renderer: R,
    color: Option<Color>,
    moves_sent: u32,
}

impl<R: Renderer> Session<R> {
    pub fn new(conn: ClientConnection, config: SessionConfig, renderer: R) -> Self {
        Self {
            conn,
            config,
            renderer,
            color: None,
            moves_sent: 0,
        }
    }

    /// Register and play until `game_over`.
    pub async fn run(mut self) -> Result<SessionSummary, AtaxxError> {
        self.register().await?;
        self.play().await
    }

    /// Send `register` and wait for the verdict.
    pub async fn register(&mut self) -> Result<(), AtaxxError> {
        let username = self.config.username.clone();
        self.conn
            .send(ClientMessage::Register {
                username: username.clone(),
            })
            .await?;

        loop {
            match self.conn.recv().await {
                Inbound::Message(ServerMessage::RegisterAck) => {
                    info!(%username, "registered");
                    return Ok(());
                }
                Inbound::Message(ServerMessage::RegisterNack { reason }) => {
                    return Err(AtaxxError::Registration(reason));
                }
                Inbound::Message(other) => {
                    warn!(kind = other.kind(), "unexpected reply to register");
                    return Err(AtaxxError::ProtocolViolation("expected register_ack"));
                }
                Inbound::Malformed(reason) => warn!("malformed message: {reason}"),
                Inbound::Closed => return Err(AtaxxError::ConnectionClosed),
            }
        }
    }

    /// Answer turns until the server ends the match.
    pub async fn play(mut self) -> Result<SessionSummary, AtaxxError> {
        loop {
            let message = match self.conn.recv().await {
                Inbound::Message(message) => message,
                Inbound::Malformed(reason) => {
                    warn!("malformed message: {reason}");
                    continue;
                }
                Inbound::Closed => return Err(AtaxxError::ConnectionClosed),
            };
            if let Some(board) = message.board() {
                self.renderer.render(board);
            }

            match message {
                ServerMessage::GameStart {
                    players,
                    colors,
                    first_player,
                    ..
                } => {
                    self.color = players
                        .iter()
                        .position(|name| *name == self.config.username)
                        .map(|idx| colors[idx]);
                    info!(color = ?self.color, %first_player, "game started");
                }
                ServerMessage::YourTurn { board, .. } => {
                    let color = self
                        .color
                        .ok_or(AtaxxError::ProtocolViolation("your_turn before game_start"))?;
                    let mv = propose_move(&board, color);
                    if !self.config.think.is_zero() {
                        tokio::time::sleep(self.config.think).await;
                    }
                    debug!(%mv, "submitting");
                    self.conn.send(to_message(mv)).await?;
                    self.moves_sent += 1;
                }
                ServerMessage::MoveOk { next_player, .. } => {
                    debug!(%next_player, "move accepted");
                }
                ServerMessage::Pass { next_player, .. } => {
                    info!(%next_player, "pass");
                }
                ServerMessage::InvalidMove { reason, .. } => {
                    warn!(%reason, "invalid move");
                }
                ServerMessage::GameOver {
                    scores,
                    winner,
                    draw,
                    reason,
                    ..
                } => {
                    info!(%reason, ?winner, draw, ?scores, "game over");
                    let summary = SessionSummary {
                        color: self.color,
                        reason,
                        winner,
                        draw,
                        scores,
                        moves_sent: self.moves_sent,
                    };
                    self.conn.close().await;
                    return Ok(summary);
                }
                ServerMessage::RegisterAck | ServerMessage::RegisterNack { .. } => {
                    debug!("ignoring late registration reply");
                }
            }
        }
    }
}

fn to_message(mv: Move) -> ClientMessage {
    match mv {
        Move::Place { from, to } => ClientMessage::Move {
            from: from.to_wire(),
            to: to.to_wire(),
        },
        Move::Pass => ClientMessage::Pass,
    }
}
