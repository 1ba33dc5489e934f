//! The canonical 8×8 board and the move engine.
//!
//! Everything here is pure: the turn scheduler owns the [`Board`] and calls
//! [`Board::play`] once per submission. A move either duplicates a stone onto
//! an adjacent empty cell or relocates it two cells away along one of the
//! eight directions; afterwards every opponent stone touching the destination
//! is infected (flipped).

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use thiserror::Error;

use crate::error::AtaxxError;

/// Width and height of the board.
pub const BOARD_SIZE: usize = 8;

/// The eight neighbor offsets, `(row, col)`.
const NEIGHBORS: [(isize, isize); 8] = [
    (-1, -1),
    (-1, 0),
    (-1, 1),
    (0, -1),
    (0, 1),
    (1, -1),
    (1, 0),
    (1, 1),
];

// ── Color / Cell ─────────────────────────────────────────────────

/// A player color. Red moves first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Color {
    Red,
    Blue,
}

impl Color {
    /// Assignment order for registrants.
    pub const ALL: [Color; 2] = [Color::Red, Color::Blue];

    pub fn opponent(self) -> Self {
        match self {
            Color::Red => Color::Blue,
            Color::Blue => Color::Red,
        }
    }

    /// Character used for this color in board snapshots.
    pub fn symbol(self) -> char {
        match self {
            Color::Red => 'R',
            Color::Blue => 'B',
        }
    }
}

impl fmt::Display for Color {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Color::Red => write!(f, "red"),
            Color::Blue => write!(f, "blue"),
        }
    }
}

/// State of a single cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Cell {
    #[default]
    Empty,
    Stone(Color),
}

impl Cell {
    pub const EMPTY_SYMBOL: char = '.';

    pub fn symbol(self) -> char {
        match self {
            Cell::Empty => Self::EMPTY_SYMBOL,
            Cell::Stone(color) => color.symbol(),
        }
    }

    pub fn from_symbol(c: char) -> Option<Self> {
        match c {
            '.' => Some(Cell::Empty),
            'R' => Some(Cell::Stone(Color::Red)),
            'B' => Some(Cell::Stone(Color::Blue)),
            _ => None,
        }
    }

    pub fn color(self) -> Option<Color> {
        match self {
            Cell::Empty => None,
            Cell::Stone(color) => Some(color),
        }
    }

    pub fn is_empty(self) -> bool {
        matches!(self, Cell::Empty)
    }
}

// ── Pos ──────────────────────────────────────────────────────────

/// A 0-based `(row, col)` coordinate that is always on the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Pos {
    row: u8,
    col: u8,
}

impl Pos {
    /// Returns `None` when the coordinate falls off the board.
    pub fn new(row: usize, col: usize) -> Option<Self> {
        (row < BOARD_SIZE && col < BOARD_SIZE).then(|| Self {
            row: row as u8,
            col: col as u8,
        })
    }

    /// Parse a `[row, col]` pair as it appears on the wire.
    pub fn from_wire([row, col]: [i64; 2]) -> Option<Self> {
        let row = usize::try_from(row).ok()?;
        let col = usize::try_from(col).ok()?;
        Self::new(row, col)
    }

    pub fn to_wire(self) -> [i64; 2] {
        [self.row as i64, self.col as i64]
    }

    pub fn row(self) -> usize {
        self.row as usize
    }

    pub fn col(self) -> usize {
        self.col as usize
    }

    /// Shift by a signed offset, staying on the board.
    pub fn offset(self, dr: isize, dc: isize) -> Option<Self> {
        let row = self.row().checked_add_signed(dr)?;
        let col = self.col().checked_add_signed(dc)?;
        Self::new(row, col)
    }

    /// Chebyshev distance between two cells.
    pub fn distance(self, other: Pos) -> usize {
        self.row().abs_diff(other.row()).max(self.col().abs_diff(other.col()))
    }

    /// The up to eight cells touching this one.
    pub fn neighbors(self) -> impl Iterator<Item = Pos> {
        NEIGHBORS
            .iter()
            .filter_map(move |&(dr, dc)| self.offset(dr, dc))
    }
}

impl fmt::Display for Pos {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.row, self.col)
    }
}

// ── Moves ────────────────────────────────────────────────────────

/// A single turn's submission.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Move {
    Place { from: Pos, to: Pos },
    Pass,
}

impl Move {
    /// Build a move from wire coordinates. Identical source and destination
    /// is the pass sentinel.
    ///
    /// The sentinel is matched before bounds are checked, so an off-board
    /// pair such as `[99, 99] -> [99, 99]` is still a pass request.
    pub fn from_wire(from: [i64; 2], to: [i64; 2]) -> Result<Self, MoveError> {
        if from == to {
            return Ok(Move::Pass);
        }
        match (Pos::from_wire(from), Pos::from_wire(to)) {
            (Some(from), Some(to)) => Ok(Move::Place { from, to }),
            _ => Err(MoveError::OutOfBounds),
        }
    }
}

impl fmt::Display for Move {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Move::Place { from, to } => write!(f, "{from} -> {to}"),
            Move::Pass => write!(f, "pass"),
        }
    }
}

/// How a placement treats its source cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveKind {
    /// Distance 1: the source keeps its stone.
    Duplicate,
    /// Distance 2 along a straight or diagonal line: the source empties.
    Relocate,
}

impl MoveKind {
    /// Classify the step from `from` to `to`, or `None` if it is out of reach.
    pub fn between(from: Pos, to: Pos) -> Option<Self> {
        let dr = to.row() as isize - from.row() as isize;
        let dc = to.col() as isize - from.col() as isize;
        if NEIGHBORS.contains(&(dr, dc)) {
            Some(MoveKind::Duplicate)
        } else if dr % 2 == 0 && dc % 2 == 0 && NEIGHBORS.contains(&(dr / 2, dc / 2)) {
            Some(MoveKind::Relocate)
        } else {
            None
        }
    }
}

/// Result of an accepted placement.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Placement {
    pub kind: MoveKind,
    pub from: Pos,
    pub to: Pos,
    /// Opponent stones turned to the mover's color.
    pub flipped: Vec<Pos>,
}

/// Result of [`Board::play`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Played {
    Placed(Placement),
    Passed,
}

/// Why a submission was refused. The board is never modified on error.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum MoveError {
    #[error("coordinates out of bounds")]
    OutOfBounds,

    #[error("source {0} does not hold a {1} stone")]
    NotOwnStone(Pos, Color),

    #[error("destination {0} is occupied")]
    Occupied(Pos),

    #[error("destination {to} is out of reach from {from}")]
    OutOfReach { from: Pos, to: Pos },

    #[error("pass refused: a legal move is available")]
    PassWithMovesAvailable,
}

// ── Layout ───────────────────────────────────────────────────────

/// Opening position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Layout {
    /// Red on (3,3),(4,4); blue on (3,4),(4,3).
    #[default]
    Center,
    /// Red on (0,0),(7,7); blue on (0,7),(7,0).
    Corners,
}

impl Layout {
    fn stones(self) -> [(usize, usize, Color); 4] {
        let last = BOARD_SIZE - 1;
        match self {
            Layout::Center => [
                (3, 3, Color::Red),
                (4, 4, Color::Red),
                (3, 4, Color::Blue),
                (4, 3, Color::Blue),
            ],
            Layout::Corners => [
                (0, 0, Color::Red),
                (last, last, Color::Red),
                (0, last, Color::Blue),
                (last, 0, Color::Blue),
            ],
        }
    }
}

// ── Score ────────────────────────────────────────────────────────

/// Stone counts per color.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Score {
    pub red: usize,
    pub blue: usize,
}

/// Final result of a scored board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Winner(Color),
    Draw,
}

impl Score {
    pub fn of(&self, color: Color) -> usize {
        match color {
            Color::Red => self.red,
            Color::Blue => self.blue,
        }
    }

    pub fn outcome(&self) -> Outcome {
        use std::cmp::Ordering;
        match self.red.cmp(&self.blue) {
            Ordering::Greater => Outcome::Winner(Color::Red),
            Ordering::Less => Outcome::Winner(Color::Blue),
            Ordering::Equal => Outcome::Draw,
        }
    }
}

// ── Board ────────────────────────────────────────────────────────

#[derive(Clone, PartialEq, Eq, Default)]
pub struct Board {
    cells: [[Cell; BOARD_SIZE]; BOARD_SIZE],
}

impl Board {
    /// A board with no stones.
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn with_layout(layout: Layout) -> Self {
        let mut board = Self::empty();
        for (row, col, color) in layout.stones() {
            board.cells[row][col] = Cell::Stone(color);
        }
        board
    }

    /// Parse eight rows of eight cell symbols (`.`, `R`, `B`).
    pub fn from_rows<S: AsRef<str>>(rows: &[S]) -> Result<Self, AtaxxError> {
        if rows.len() != BOARD_SIZE {
            return Err(AtaxxError::InvalidBoard(format!(
                "expected {BOARD_SIZE} rows, got {}",
                rows.len()
            )));
        }
        let mut board = Self::empty();
        for (r, row) in rows.iter().enumerate() {
            let row = row.as_ref();
            if row.chars().count() != BOARD_SIZE {
                return Err(AtaxxError::InvalidBoard(format!(
                    "row {r} has {} cells, expected {BOARD_SIZE}",
                    row.chars().count()
                )));
            }
            for (c, symbol) in row.chars().enumerate() {
                board.cells[r][c] = Cell::from_symbol(symbol).ok_or_else(|| {
                    AtaxxError::InvalidBoard(format!("unknown cell symbol {symbol:?} at ({r}, {c})"))
                })?;
            }
        }
        Ok(board)
    }

    /// One string per row, as sent on the wire.
    pub fn rows(&self) -> Vec<String> {
        self.cells
            .iter()
            .map(|row| row.iter().map(|cell| cell.symbol()).collect())
            .collect()
    }

    pub fn get(&self, pos: Pos) -> Cell {
        self.cells[pos.row()][pos.col()]
    }

    pub fn set(&mut self, pos: Pos, cell: Cell) {
        self.cells[pos.row()][pos.col()] = cell;
    }

    /// Every cell coordinate, row-major.
    pub fn positions() -> impl Iterator<Item = Pos> {
        (0..BOARD_SIZE).flat_map(|r| (0..BOARD_SIZE).filter_map(move |c| Pos::new(r, c)))
    }

    pub fn count(&self, color: Color) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| cell.color() == Some(color))
            .count()
    }

    pub fn empty_cells(&self) -> usize {
        self.cells.iter().flatten().filter(|cell| cell.is_empty()).count()
    }

    pub fn score(&self) -> Score {
        Score {
            red: self.count(Color::Red),
            blue: self.count(Color::Blue),
        }
    }

    /// Number of opponent stones a placement on `to` would infect.
    pub fn count_flips(&self, color: Color, to: Pos) -> usize {
        let opponent = Cell::Stone(color.opponent());
        to.neighbors().filter(|&n| self.get(n) == opponent).count()
    }

    /// Validate a placement without touching the board.
    pub fn check(&self, color: Color, from: Pos, to: Pos) -> Result<MoveKind, MoveError> {
        if self.get(from) != Cell::Stone(color) {
            return Err(MoveError::NotOwnStone(from, color));
        }
        if !self.get(to).is_empty() {
            return Err(MoveError::Occupied(to));
        }
        MoveKind::between(from, to).ok_or(MoveError::OutOfReach { from, to })
    }

    /// Every legal placement for `color`, scanning sources row-major and
    /// listing duplicates before relocates for each source.
    pub fn legal_moves(&self, color: Color) -> Vec<Move> {
        let mut moves = Vec::new();
        for from in Self::positions().filter(|&p| self.get(p) == Cell::Stone(color)) {
            for scale in [1, 2] {
                for &(dr, dc) in &NEIGHBORS {
                    if let Some(to) = from.offset(dr * scale, dc * scale) {
                        if self.get(to).is_empty() {
                            moves.push(Move::Place { from, to });
                        }
                    }
                }
            }
        }
        moves
    }

    pub fn has_legal_move(&self, color: Color) -> bool {
        Self::positions()
            .filter(|&p| self.get(p) == Cell::Stone(color))
            .any(|from| {
                [1, 2].into_iter().any(|scale| {
                    NEIGHBORS.iter().any(|&(dr, dc)| {
                        from.offset(dr * scale, dc * scale)
                            .is_some_and(|to| self.get(to).is_empty())
                    })
                })
            })
    }

    /// Neither color can place a stone anywhere.
    pub fn is_terminal(&self) -> bool {
        Color::ALL.iter().all(|&color| !self.has_legal_move(color))
    }

    /// Validate and apply one submission for `color`.
    ///
    /// A pass is accepted only when `color` has no legal placement.
    pub fn play(&mut self, color: Color, mv: Move) -> Result<Played, MoveError> {
        match mv {
            Move::Pass => {
                if self.has_legal_move(color) {
                    Err(MoveError::PassWithMovesAvailable)
                } else {
                    Ok(Played::Passed)
                }
            }
            Move::Place { from, to } => {
                let kind = self.check(color, from, to)?;
                Ok(Played::Placed(self.place(color, from, to, kind)))
            }
        }
    }

    fn place(&mut self, color: Color, from: Pos, to: Pos, kind: MoveKind) -> Placement {
        if kind == MoveKind::Relocate {
            self.set(from, Cell::Empty);
        }
        self.set(to, Cell::Stone(color));

        let opponent = Cell::Stone(color.opponent());
        let flipped: Vec<Pos> = to.neighbors().filter(|&n| self.get(n) == opponent).collect();
        for &pos in &flipped {
            self.set(pos, Cell::Stone(color));
        }

        Placement {
            kind,
            from,
            to,
            flipped,
        }
    }
}

impl fmt::Display for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in self.rows() {
            writeln!(f, "{row}")?;
        }
        Ok(())
    }
}

impl fmt::Debug for Board {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.rows()).finish()
    }
}

impl Serialize for Board {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_seq(self.rows())
    }
}

impl<'de> Deserialize<'de> for Board {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let rows = Vec::<String>::deserialize(deserializer)?;
        Board::from_rows(&rows).map_err(serde::de::Error::custom)
    }
}

// ── Tests ────────────────────────────────────────────────────────
