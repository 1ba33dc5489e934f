//! # ataxx-core
//!
//! Shared library for the ataxx match server and its reference client.
//!
//! This crate contains:
//! - **Board**: `Board`, `Move`, `Pos` and the rules engine (`play`, `legal_moves`)
//! - **Messages**: `ClientMessage` / `ServerMessage`, tagged JSON unions
//! - **Codec**: `MessageCodec` for framed TCP I/O via `tokio_util`
//! - **Network**: `Connection` over a framed TCP stream
//! - **State**: `GameState`, `Player` and the `MatchPhase` state machine
//! - **Render**: the `Renderer` seam invoked for every emitted board
//! - **Error**: `AtaxxError`, typed and `thiserror`-based

pub mod board;
pub mod codec;
pub mod error;
pub mod message;
pub mod network;
pub mod render;
pub mod state;

// ── Re-exports for ergonomic usage ───────────────────────────────

pub use board::{
    BOARD_SIZE, Board, Cell, Color, Layout, Move, MoveError, MoveKind, Outcome, Placement, Played,
    Pos, Score,
};
pub use codec::{CodecConfig, DEFAULT_MAX_FRAME_LEN, Frame, Framing, MessageCodec};
pub use error::AtaxxError;
pub use message::{ClientMessage, ServerMessage};
pub use network::{ClientConnection, Connection, ConnectionInfo, Inbound, ServerConnection};
pub use render::{NoopRenderer, Renderer, TerminalRenderer};
pub use state::{EndReason, GameState, MAX_PLAYERS, MatchPhase, Player};
