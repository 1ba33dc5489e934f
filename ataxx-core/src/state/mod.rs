pub mod game;
pub mod phase;

pub use game::{GameState, MAX_PLAYERS, Player};
pub use phase::{EndReason, MatchPhase};
