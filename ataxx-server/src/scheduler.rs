//! Turn scheduler.
//!
//! Owns the [`GameState`] for one match and drives it through
//! `Registering → Playing → Finished`. Each turn sends `your_turn` to the
//! player to move and waits for exactly one of: a submission, the turn
//! deadline, a disconnect, or server shutdown.
//!
//! ```text
//!   ┌──────────────┐  legal move   ┌──────────┐
//!   │  your_turn   │──────────────►│ move_ok  │──► next turn
//!   │  (deadline)  │  pass/timeout ├──────────┤
//!   │              │──────────────►│  pass    │──► next turn, or game_over
//!   │              │  illegal      ├──────────┤    after two in a row
//!   │              │──────────────►│ invalid  │──► same turn again
//!   └──────────────┘               └──────────┘
//! ```

use std::collections::BTreeMap;
use std::fmt;
use std::time::Duration;

use tokio::time::{Instant, sleep_until};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use ataxx_core::{
    AtaxxError, Board, ClientMessage, EndReason, GameState, Inbound, MatchPhase, Move, MoveError,
    Outcome, Played, ServerMessage,
};

use crate::dispatcher::Dispatcher;

/// Consecutive passes that end a match.
const PASSES_TO_END: u8 = 2;

#[derive(Debug, Clone, Copy)]
pub struct TurnConfig {
    /// Time the player to move has to answer.
    pub turn_timeout: Duration,
    /// Rejected submissions per turn before a forced pass. 0 = unlimited.
    pub max_invalid_moves: u32,
}

impl Default for TurnConfig {
    fn default() -> Self {
        Self {
            turn_timeout: Duration::from_secs(5),
            max_invalid_moves: 3,
        }
    }
}

/// Summary of a finished match.
#[derive(Debug, Clone, PartialEq)]
pub struct MatchReport {
    pub reason: EndReason,
    pub board: Board,
    pub scores: BTreeMap<String, usize>,
    /// Set only for scored endings with a strict majority.
    pub winner: Option<String>,
    pub draw: bool,
    /// Accepted placements over the whole match.
    pub placements: u32,
    pub duration: Duration,
}

impl MatchReport {
    /// The `game_over` broadcast for this result.
    pub fn to_message(&self) -> ServerMessage {
        ServerMessage::GameOver {
            board: self.board.clone(),
            scores: self.scores.clone(),
            winner: self.winner.clone(),
            draw: self.draw,
            reason: self.reason,
        }
    }
}

impl fmt::Display for MatchReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.reason)?;
        match (&self.winner, self.draw) {
            (Some(winner), _) => write!(f, ", {winner} wins")?,
            (None, true) => write!(f, ", draw")?,
            (None, false) => {}
        }
        for (name, score) in &self.scores {
            write!(f, " [{name}: {score}]")?;
        }
        Ok(())
    }
}

/// How a single wait on the current player resolved.
#[derive(Debug)]
enum Turn {
    Submitted(Result<Move, MoveError>),
    TimedOut,
    Disconnected(usize),
    Shutdown,
}

#[derive(Debug, Clone, Copy)]
enum PassCause {
    Requested,
    TimedOut,
    Forced,
}

impl fmt::Display for PassCause {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PassCause::Requested => write!(f, "requested"),
            PassCause::TimedOut => write!(f, "timed out"),
            PassCause::Forced => write!(f, "too many invalid moves"),
        }
    }
}

pub struct TurnScheduler {
    state: GameState,
    phase: MatchPhase,
    dispatcher: Dispatcher,
    config: TurnConfig,
    shutdown: CancellationToken,
    /// Rejected submissions in the current turn.
    strikes: u32,
    placements: u32,
}

impl TurnScheduler {
    pub fn new(
        state: GameState,
        dispatcher: Dispatcher,
        config: TurnConfig,
        shutdown: CancellationToken,
    ) -> Self {
        Self {
            state,
            phase: MatchPhase::Registering,
            dispatcher,
            config,
            shutdown,
            strikes: 0,
            placements: 0,
        }
    }

    /// Play the match to completion, broadcast `game_over` and close both
    /// connections.
    pub async fn run(mut self) -> Result<MatchReport, AtaxxError> {
        self.phase.begin_play()?;

        let start = self.game_start();
        info!(
            first_player = self.state.current_player().name(),
            "match started"
        );
        self.dispatcher
            .broadcast(self.state.players_mut(), &start)
            .await;

        let reason = loop {
            if let Some(reason) = self.step().await {
                break reason;
            }
        };

        let duration = self.phase.played_for().unwrap_or_default();
        self.phase.finish(reason)?;
        let report = self.report(reason, duration);
        info!(phase = %self.phase, ?duration, "match finished: {report}");

        let over = report.to_message();
        self.dispatcher
            .broadcast(self.state.players_mut(), &over)
            .await;
        self.dispatcher.hang_up(self.state.players_mut()).await;
        Ok(report)
    }

    fn game_start(&self) -> ServerMessage {
        let [a, b] = self.state.players();
        ServerMessage::GameStart {
            players: [a.name().to_string(), b.name().to_string()],
            colors: [a.color(), b.color()],
            first_player: self.state.current_player().name().to_string(),
            board: self.state.board().clone(),
        }
    }

    /// One turn. Returns the end reason once the match is over.
    async fn step(&mut self) -> Option<EndReason> {
        if let Some(idx) = self.state.disconnected_player() {
            info!(player = self.state.players()[idx].name(), "player gone");
            return Some(EndReason::Disconnect);
        }
        if self.state.board().is_terminal() {
            return Some(EndReason::BoardSettled);
        }

        let prompt = ServerMessage::YourTurn {
            board: self.state.board().clone(),
            timeout_seconds: self.config.turn_timeout.as_secs_f64(),
        };
        let deadline = Instant::now() + self.config.turn_timeout;
        if !self
            .dispatcher
            .send_to(self.state.current_player_mut(), &prompt)
            .await
        {
            return Some(EndReason::Disconnect);
        }

        match self.await_turn(deadline).await {
            Turn::Submitted(submission) => self.resolve(submission).await,
            Turn::TimedOut => self.pass(PassCause::TimedOut).await,
            Turn::Disconnected(idx) => {
                let player = &mut self.state.players_mut()[idx];
                info!(player = player.name(), "disconnected mid-match");
                player.disconnect();
                Some(EndReason::Disconnect)
            }
            Turn::Shutdown => Some(EndReason::Shutdown),
        }
    }

    /// Wait for the current player's submission. Traffic from the other
    /// player is discarded, except a disconnect.
    async fn await_turn(&mut self, deadline: Instant) -> Turn {
        let current = self.state.current_index();
        loop {
            let [first, second] = self.state.players_mut();
            let (inbound, idx) = tokio::select! {
                biased;
                _ = self.shutdown.cancelled() => return Turn::Shutdown,
                _ = sleep_until(deadline) => return Turn::TimedOut,
                inbound = first.recv() => (inbound, 0),
                inbound = second.recv() => (inbound, 1),
            };
            let sender = self.state.players()[idx].name();

            if idx != current {
                match inbound {
                    Inbound::Closed => return Turn::Disconnected(idx),
                    other => {
                        debug!(player = sender, "discarding out-of-turn {other:?}");
                        continue;
                    }
                }
            }

            match inbound {
                Inbound::Message(ClientMessage::Move { from, to }) => {
                    return Turn::Submitted(Move::from_wire(from, to));
                }
                Inbound::Message(ClientMessage::Pass) => return Turn::Submitted(Ok(Move::Pass)),
                Inbound::Message(other) => {
                    warn!(player = sender, kind = other.kind(), "unexpected message during play");
                }
                Inbound::Malformed(reason) => {
                    warn!(player = sender, "malformed message: {reason}");
                }
                Inbound::Closed => return Turn::Disconnected(idx),
            }
        }
    }

    async fn resolve(&mut self, submission: Result<Move, MoveError>) -> Option<EndReason> {
        let mover = self.state.current_player().name().to_string();
        match submission.and_then(|mv| self.state.play(mv)) {
            Ok(Played::Placed(placement)) => {
                self.state.record_placement();
                self.strikes = 0;
                self.placements += 1;
                info!(
                    player = %mover,
                    from = %placement.from,
                    to = %placement.to,
                    kind = ?placement.kind,
                    flipped = placement.flipped.len(),
                    "move accepted"
                );
                let msg = ServerMessage::MoveOk {
                    board: self.state.board().clone(),
                    next_player: self.state.current_player().name().to_string(),
                };
                self.dispatcher
                    .broadcast(self.state.players_mut(), &msg)
                    .await;
                None
            }
            Ok(Played::Passed) => self.pass(PassCause::Requested).await,
            Err(e) => self.reject(e).await,
        }
    }

    /// Refuse a submission; the same player moves again unless the cap
    /// on invalid moves is reached.
    async fn reject(&mut self, error: MoveError) -> Option<EndReason> {
        self.strikes += 1;
        let mover = self.state.current_player().name().to_string();
        warn!(player = %mover, strikes = self.strikes, "invalid move: {error}");

        let msg = ServerMessage::InvalidMove {
            board: self.state.board().clone(),
            next_player: mover,
            reason: error.to_string(),
        };
        if !self
            .dispatcher
            .send_to(self.state.current_player_mut(), &msg)
            .await
        {
            return Some(EndReason::Disconnect);
        }

        let cap = self.config.max_invalid_moves;
        if cap > 0 && self.strikes >= cap {
            return self.pass(PassCause::Forced).await;
        }
        None
    }

    async fn pass(&mut self, cause: PassCause) -> Option<EndReason> {
        let passer = self.state.current_player().name().to_string();
        let consecutive = self.state.record_pass();
        self.strikes = 0;
        info!(player = %passer, %cause, consecutive, "pass");

        let msg = ServerMessage::Pass {
            board: self.state.board().clone(),
            next_player: self.state.current_player().name().to_string(),
        };
        self.dispatcher
            .broadcast(self.state.players_mut(), &msg)
            .await;

        (consecutive >= PASSES_TO_END).then_some(EndReason::DoublePass)
    }

    fn report(&self, reason: EndReason, duration: Duration) -> MatchReport {
        let board = self.state.board().clone();
        let (winner, draw) = if reason.is_scored() {
            match board.score().outcome() {
                outcome @ Outcome::Winner(_) => {
                    (self.state.winner_name(outcome).map(str::to_string), false)
                }
                Outcome::Draw => (None, true),
            }
        } else {
            (None, false)
        };
        MatchReport {
            reason,
            scores: self.state.scores(),
            board,
            winner,
            draw,
            placements: self.placements,
            duration,
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use ataxx_core::{Color, Layout, Player};

    fn scheduler(board: Board) -> TurnScheduler {
        let players = [
            Player::new("alice", Color::Red, None),
            Player::new("bob", Color::Blue, None),
        ];
        TurnScheduler::new(
            GameState::new(players, board).unwrap(),
            Dispatcher::default(),
            TurnConfig::default(),
            CancellationToken::new(),
        )
    }

    #[test]
    fn report_names_majority_winner() {
        let mut rows = vec!["RRRRRRRR"; 5];
        rows.extend(["BBBBBBBB"; 3]);
        let s = scheduler(Board::from_rows(&rows).unwrap());
        let report = s.report(EndReason::BoardSettled, Duration::ZERO);
        assert_eq!(report.winner.as_deref(), Some("alice"));
        assert!(!report.draw);
        assert_eq!(report.scores["alice"], 40);
        assert_eq!(report.scores["bob"], 24);
    }

    #[test]
    fn report_draw_on_equal_counts() {
        let s = scheduler(Board::with_layout(Layout::Center));
        let report = s.report(EndReason::DoublePass, Duration::ZERO);
        assert_eq!(report.winner, None);
        assert!(report.draw);
    }

    #[test]
    fn interrupted_match_has_no_winner() {
        let mut rows = vec!["RRRRRRRR"; 5];
        rows.extend(["BBBBBBBB"; 3]);
        let s = scheduler(Board::from_rows(&rows).unwrap());
        let report = s.report(EndReason::Disconnect, Duration::ZERO);
        assert_eq!(report.winner, None);
        assert!(!report.draw);
        match report.to_message() {
            ServerMessage::GameOver { reason, .. } => assert_eq!(reason, EndReason::Disconnect),
            other => panic!("unexpected {other:?}"),
        }
    }

    #[tokio::test]
    async fn detached_players_end_match_as_disconnect() {
        let report = scheduler(Board::with_layout(Layout::Center))
            .run()
            .await
            .unwrap();
        assert_eq!(report.reason, EndReason::Disconnect);
        assert_eq!(report.placements, 0);
    }

    #[test]
    fn report_display() {
        let s = scheduler(Board::with_layout(Layout::Center));
        let text = s.report(EndReason::DoublePass, Duration::ZERO).to_string();
        assert_eq!(text, "two consecutive passes, draw [alice: 2] [bob: 2]");
    }
}
