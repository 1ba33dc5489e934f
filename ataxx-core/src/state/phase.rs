//! Match lifecycle state machine.
//!
//! ```text
//!  Registering ──► Playing ──► Finished { reason }
//!       │                           ▲
//!       └───────────────────────────┘   (shutdown before play)
//! ```
//!
//! Transitions return `Result` instead of panicking.

use std::fmt;
use std::time::Instant;

use serde::{Deserialize, Serialize};

use crate::error::AtaxxError;

/// Why a match ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// Neither color has a legal placement left.
    BoardSettled,
    /// Two passes in a row (explicit, forced or timed out).
    DoublePass,
    /// A player's connection closed or a write to it failed.
    Disconnect,
    /// The server process is stopping.
    Shutdown,
}

impl EndReason {
    /// Whether the final board decides a winner. Interrupted matches do not.
    pub fn is_scored(self) -> bool {
        matches!(self, EndReason::BoardSettled | EndReason::DoublePass)
    }
}

impl fmt::Display for EndReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            EndReason::BoardSettled => write!(f, "board settled"),
            EndReason::DoublePass => write!(f, "two consecutive passes"),
            EndReason::Disconnect => write!(f, "player disconnected"),
            EndReason::Shutdown => write!(f, "server shutdown"),
        }
    }
}

/// The current phase of a match.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum MatchPhase {
    /// Waiting for both players to register.
    #[default]
    Registering,

    /// Turns are being played.
    Playing {
        /// When play began.
        since: Instant,
    },

    /// Terminal state; `game_over` has been or is about to be sent.
    Finished { reason: EndReason },
}

impl fmt::Display for MatchPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Registering => write!(f, "Registering"),
            Self::Playing { .. } => write!(f, "Playing"),
            Self::Finished { .. } => write!(f, "Finished"),
        }
    }
}

impl MatchPhase {
    /// How long the match has been in play. `None` outside `Playing`.
    pub fn played_for(&self) -> Option<std::time::Duration> {
        match self {
            Self::Playing { since } => Some(since.elapsed()),
            _ => None,
        }
    }

    // ── Transitions ──────────────────────────────────────────────

    /// Transition to `Playing`.
    ///
    /// Valid from: `Registering`.
    pub fn begin_play(&mut self) -> Result<(), AtaxxError> {
        match self {
            Self::Registering => {
                *self = Self::Playing {
                    since: Instant::now(),
                };
                Ok(())
            }
            _ => Err(AtaxxError::ProtocolViolation(
                "cannot start play: not in Registering state",
            )),
        }
    }

    /// Transition to `Finished`.
    ///
    /// Valid from: `Playing`, or `Registering` when shutting down.
    pub fn finish(&mut self, reason: EndReason) -> Result<(), AtaxxError> {
        match self {
            Self::Playing { .. } => {
                *self = Self::Finished { reason };
                Ok(())
            }
            Self::Registering if reason == EndReason::Shutdown => {
                *self = Self::Finished { reason };
                Ok(())
            }
            Self::Registering => Err(AtaxxError::ProtocolViolation(
                "cannot finish: match never started",
            )),
            Self::Finished { .. } => Err(AtaxxError::ProtocolViolation(
                "cannot finish: already finished",
            )),
        }
    }
}

// ── Tests ────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn happy_path_lifecycle() {
        let mut phase = MatchPhase::default();
        assert_eq!(phase, MatchPhase::Registering);

        assert_eq!(phase.played_for(), None);

        phase.begin_play().unwrap();
        assert!(matches!(phase, MatchPhase::Playing { .. }));
        assert!(phase.played_for().is_some());

        phase.finish(EndReason::DoublePass).unwrap();
        assert_eq!(
            phase,
            MatchPhase::Finished {
                reason: EndReason::DoublePass
            }
        );
        assert_eq!(phase.played_for(), None);
    }

    #[test]
    fn cannot_play_twice() {
        let mut phase = MatchPhase::default();
        phase.begin_play().unwrap();
        assert!(phase.begin_play().is_err());
    }

    #[test]
    fn cannot_finish_twice() {
        let mut phase = MatchPhase::default();
        phase.begin_play().unwrap();
        phase.finish(EndReason::Disconnect).unwrap();
        assert!(phase.finish(EndReason::BoardSettled).is_err());
        assert_eq!(
            phase,
            MatchPhase::Finished {
                reason: EndReason::Disconnect
            }
        );
    }

    #[test]
    fn registering_only_finishes_on_shutdown() {
        let mut phase = MatchPhase::default();
        assert!(phase.finish(EndReason::BoardSettled).is_err());
        phase.finish(EndReason::Shutdown).unwrap();
        assert_eq!(
            phase,
            MatchPhase::Finished {
                reason: EndReason::Shutdown
            }
        );
    }

    #[test]
    fn scored_reasons() {
        assert!(EndReason::BoardSettled.is_scored());
        assert!(EndReason::DoublePass.is_scored());
        assert!(!EndReason::Disconnect.is_scored());
        assert!(!EndReason::Shutdown.is_scored());
    }

    #[test]
    fn display_format() {
        assert_eq!(MatchPhase::Registering.to_string(), "Registering");
        assert_eq!(
            MatchPhase::Playing {
                since: Instant::now()
            }
            .to_string(),
            "Playing"
        );
        assert_eq!(
            MatchPhase::Finished {
                reason: EndReason::Shutdown
            }
            .to_string(),
            "Finished"
        );
    }
}
