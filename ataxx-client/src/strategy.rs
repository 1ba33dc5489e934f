//! Move selection.

use ataxx_core::{Board, Color, Move};

/// Greedy choice: the placement that infects the most opponent stones.
///
/// Candidates are scanned in [`Board::legal_moves`] order and the first
/// one wins a tie. Passes when no placement exists.
pub fn propose_move(board: &Board, color: Color) -> Move {
    let mut best: Option<(usize, Move)> = None;
    for mv in board.legal_moves(color) {
        let Move::Place { to, .. } = mv else {
            continue;
        };
        let flips = board.count_flips(color, to);
        if best.is_none_or(|(most, _)| flips > most) {
            best = Some((flips, mv));
        }
    }
    best.map_or(Move::Pass, |(_, mv)| mv)
}

#[cfg(test)]
mod tests {
    use super::*;
    use ataxx_core::{Layout, Pos};

    fn pos(row: usize, col: usize) -> Pos {
        Pos::new(row, col).unwrap()
    }

    #[test]
    fn opening_takes_first_best_capture() {
        let board = Board::with_layout(Layout::Center);
        assert_eq!(
            propose_move(&board, Color::Red),
            Move::Place {
                from: pos(3, 3),
                to: pos(2, 3)
            }
        );
        assert_eq!(
            propose_move(&board, Color::Blue),
            Move::Place {
                from: pos(3, 4),
                to: pos(2, 3)
            }
        );
    }

    #[test]
    fn prefers_more_flips_over_scan_order() {
        let board = Board::from_rows(&[
            "R.......", "........", "........", "........", "........", "....B...",
            "...B.B..", "...BRB..",
        ])
        .unwrap();
        // (6,4) touches five blue stones; everything near (0,0) touches none.
        assert_eq!(
            propose_move(&board, Color::Red),
            Move::Place {
                from: pos(7, 4),
                to: pos(6, 4)
            }
        );
    }

    #[test]
    fn passes_without_moves() {
        let board = Board::from_rows(&[
            "RBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB", "BBBBBBBB",
            "BBBBBBB.",
        ])
        .unwrap();
        assert_eq!(propose_move(&board, Color::Red), Move::Pass);
        assert_eq!(
            propose_move(&board, Color::Blue),
            Move::Place {
                from: pos(5, 5),
                to: pos(7, 7)
            }
        );
    }

    #[test]
    fn proposal_is_always_legal() {
        let mut board = Board::with_layout(Layout::Corners);
        let mut color = Color::Red;
        for _ in 0..20 {
            let mv = propose_move(&board, color);
            assert!(board.play(color, mv).is_ok(), "{color} proposed illegal {mv}");
            color = color.opponent();
        }
    }
}
