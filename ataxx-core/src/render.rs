//! Optional board rendering.
//!
//! The server calls a [`Renderer`] once for every board it emits. The
//! default does nothing; [`TerminalRenderer`] writes the grid to stdout.

use std::io::{self, Write};

use crate::board::{BOARD_SIZE, Board};

pub trait Renderer: Send + Sync {
    fn render(&self, board: &Board);
}

/// Renders nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopRenderer;

impl Renderer for NoopRenderer {
    fn render(&self, _board: &Board) {}
}

/// Prints the board with row and column indices.
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalRenderer;

impl TerminalRenderer {
    /// The text written for `board`, one line per row plus a header.
    pub fn format(board: &Board) -> String {
        let mut out = String::with_capacity((BOARD_SIZE + 2) * (BOARD_SIZE * 2 + 4));
        out.push_str("   ");
        for col in 0..BOARD_SIZE {
            out.push_str(&format!("{col} "));
        }
        out.push('\n');
        for (row, line) in board.rows().iter().enumerate() {
            out.push_str(&format!("{row}  "));
            for symbol in line.chars() {
                out.push(symbol);
                out.push(' ');
            }
            out.push('\n');
        }
        let score = board.score();
        out.push_str(&format!("R {}  B {}\n", score.red, score.blue));
        out
    }
}

impl Renderer for TerminalRenderer {
    fn render(&self, board: &Board) {
        let mut stdout = io::stdout().lock();
        // A closed stdout must not take the match down.
        let _ = stdout.write_all(Self::format(board).as_bytes());
        let _ = stdout.flush();
    }
}

impl<R: Renderer + ?Sized> Renderer for Box<R> {
    fn render(&self, board: &Board) {
        (**self).render(board)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::board::Layout;

    #[test]
    fn format_includes_every_row() {
        let text = TerminalRenderer::format(&Board::with_layout(Layout::Center));
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), BOARD_SIZE + 2);
        assert_eq!(lines[0].trim_end(), "   0 1 2 3 4 5 6 7");
        assert_eq!(lines[4].trim_end(), "3  . . . R B . . .");
        assert_eq!(lines[BOARD_SIZE + 1], "R 2  B 2");
    }
}
