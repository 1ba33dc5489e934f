//! Per-match state: the two player records and the canonical board.

use std::collections::BTreeMap;

use crate::board::{Board, Color, Move, MoveError, Outcome, Played};
use crate::error::AtaxxError;
use crate::message::{ClientMessage, ServerMessage};
use crate::network::{Inbound, ServerConnection};

/// Players per match.
pub const MAX_PLAYERS: usize = 2;

// ── Player ───────────────────────────────────────────────────────

/// A registered participant.
///
/// Only the connection handle changes after registration; it is cleared
/// when the peer disconnects or a write to it fails.
#[derive(Debug)]
pub struct Player {
    name: String,
    color: Color,
    registered: bool,
    conn: Option<ServerConnection>,
}

impl Player {
    pub fn new(name: impl Into<String>, color: Color, conn: Option<ServerConnection>) -> Self {
        Self {
            name: name.into(),
            color,
            registered: true,
            conn,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn color(&self) -> Color {
        self.color
    }

    pub fn is_registered(&self) -> bool {
        self.registered
    }

    pub fn is_connected(&self) -> bool {
        self.conn.is_some()
    }

    pub async fn send(&mut self, message: ServerMessage) -> Result<(), AtaxxError> {
        match self.conn.as_mut() {
            Some(conn) => conn.send(message).await,
            None => Err(AtaxxError::ConnectionClosed),
        }
    }

    /// Next frame from this player; `Closed` at once if already disconnected.
    pub async fn recv(&mut self) -> Inbound<ClientMessage> {
        match self.conn.as_mut() {
            Some(conn) => conn.recv().await,
            None => Inbound::Closed,
        }
    }

    /// Drop the connection handle, returning it so the caller may close it.
    pub fn disconnect(&mut self) -> Option<ServerConnection> {
        self.conn.take()
    }
}

// ── GameState ────────────────────────────────────────────────────

/// Board, players, whose turn it is and the consecutive-pass counter.
///
/// Owned exclusively by the turn scheduler.
#[derive(Debug)]
pub struct GameState {
    board: Board,
    players: [Player; MAX_PLAYERS],
    current: usize,
    passes: u8,
}

impl GameState {
    /// The red player opens.
    pub fn new(players: [Player; MAX_PLAYERS], board: Board) -> Result<Self, AtaxxError> {
        if players.iter().any(|p| !p.is_registered()) {
            return Err(AtaxxError::ProtocolViolation("unregistered player in match"));
        }
        if players[0].name() == players[1].name() {
            return Err(AtaxxError::ProtocolViolation("duplicate player names"));
        }
        if players[0].color() == players[1].color() {
            return Err(AtaxxError::ProtocolViolation("players share a color"));
        }
        let current = players
            .iter()
            .position(|p| p.color() == Color::Red)
            .unwrap_or(0);
        Ok(Self {
            board,
            players,
            current,
            passes: 0,
        })
    }

    pub fn board(&self) -> &Board {
        &self.board
    }

    pub fn players(&self) -> &[Player; MAX_PLAYERS] {
        &self.players
    }

    pub fn players_mut(&mut self) -> &mut [Player; MAX_PLAYERS] {
        &mut self.players
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn current_player(&self) -> &Player {
        &self.players[self.current]
    }

    pub fn current_player_mut(&mut self) -> &mut Player {
        &mut self.players[self.current]
    }

    /// Validate and apply `mv` for the player to move. Does not advance the turn.
    pub fn play(&mut self, mv: Move) -> Result<Played, MoveError> {
        let color = self.players[self.current].color();
        self.board.play(color, mv)
    }

    /// An accepted placement resets the pass counter and hands over the turn.
    pub fn record_placement(&mut self) {
        self.passes = 0;
        self.advance();
    }

    /// Count a pass and hand over the turn. Returns the consecutive count.
    pub fn record_pass(&mut self) -> u8 {
        self.passes = self.passes.saturating_add(1);
        self.advance();
        self.passes
    }

    fn advance(&mut self) {
        self.current = 1 - self.current;
    }

    /// Index of the first player whose connection handle is gone.
    pub fn disconnected_player(&self) -> Option<usize> {
        self.players.iter().position(|p| !p.is_connected())
    }

    /// Stone count keyed by player name.
    pub fn scores(&self) -> BTreeMap<String, usize> {
        let score = self.board.score();
        self.players
            .iter()
            .map(|p| (p.name().to_string(), score.of(p.color())))
            .collect()
    }

    pub fn player_with_color(&self, color: Color) -> Option<&Player> {
        self.players.iter().find(|p| p.color() == color)
    }

    /// Winner's name for a scored board, `None` on a draw.
    pub fn winner_name(&self, outcome: Outcome) -> Option<&str> {
        match outcome {
            Outcome::Winner(color) => self.player_with_color(color).map(Player::name),
            Outcome::Draw => None,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::{Layout, Pos};

    fn players() -> [Player; 2] {
        [
            Player::new("alice", Color::Red, None),
            Player::new("bob", Color::Blue, None),
        ]
    }

    #[test]
    fn red_opens() {
        let state = GameState::new(players(), Board::with_layout(Layout::Center)).unwrap();
        assert_eq!(state.current_player().name(), "alice");
        assert_eq!(state.current_index(), 0);
    }

    #[test]
    fn rejects_duplicate_names() {
        let dup = [
            Player::new("alice", Color::Red, None),
            Player::new("alice", Color::Blue, None),
        ];
        assert!(GameState::new(dup, Board::empty()).is_err());
    }

    #[test]
    fn passes_accumulate_and_reset() {
        let mut state = GameState::new(players(), Board::with_layout(Layout::Center)).unwrap();
        assert_eq!(state.record_pass(), 1);
        assert_eq!(state.current_player().name(), "bob");

        let mv = Move::Place {
            from: Pos::new(3, 4).unwrap(),
            to: Pos::new(2, 4).unwrap(),
        };
        assert!(state.play(mv).is_ok());
        state.record_placement();
        assert_eq!(state.current_player().name(), "alice");

        // The placement broke the streak.
        assert_eq!(state.record_pass(), 1);
        assert_eq!(state.record_pass(), 2);
    }

    #[test]
    fn play_uses_current_color() {
        let mut state = GameState::new(players(), Board::with_layout(Layout::Center)).unwrap();
        let blue_stone = Move::Place {
            from: Pos::new(3, 4).unwrap(),
            to: Pos::new(2, 4).unwrap(),
        };
        assert!(matches!(state.play(blue_stone), Err(MoveError::NotOwnStone(..))));
    }

    #[test]
    fn scores_by_name() {
        let mut rows = vec!["RRRRRRRR"; 5];
        rows.extend(["BBBBBBBB"; 3]);
        let state = GameState::new(players(), Board::from_rows(&rows).unwrap()).unwrap();
        let scores = state.scores();
        assert_eq!(scores["alice"], 40);
        assert_eq!(scores["bob"], 24);
        let outcome = state.board().score().outcome();
        assert_eq!(state.winner_name(outcome), Some("alice"));
    }

    #[test]
    fn detached_players_count_as_disconnected() {
        let state = GameState::new(players(), Board::empty()).unwrap();
        assert_eq!(state.disconnected_player(), Some(0));
    }
}
