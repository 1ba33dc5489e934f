use std::io;

use ataxx_core::AtaxxError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ServerError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        #[source]
        source: io::Error,
    },

    #[error("lobby closed before {expected} players registered (got {got})")]
    LobbyClosed { expected: usize, got: usize },

    #[error(transparent)]
    Match(#[from] AtaxxError),

    #[error(transparent)]
    Io(#[from] io::Error),
}
