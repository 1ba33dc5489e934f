//! # ataxx-client
//!
//! Reference player for the ataxx match server: registers under a name,
//! answers every `your_turn` with a greedy move and prints the board.

pub mod session;
pub mod strategy;

pub use session::{Session, SessionConfig, SessionSummary};
pub use strategy::propose_move;
