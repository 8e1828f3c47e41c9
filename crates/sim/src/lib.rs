//! Noughts Game Core
//!
//! This crate contains the rules of the 3x3 grid game and the single
//! authoritative [`Game`] state. It is the only place where moves are
//! validated and applied.
//!
//! # Architecture Constraints
//!
//! The game core MUST NOT:
//! - Perform I/O operations (file, network, etc.)
//! - Know about connections, roles or transports
//! - Mutate state before a move has been fully validated
//!
//! The server crate owns identity binding (which connection plays which
//! [`Symbol`]) and decides what is broadcast from the returned [`MoveResult`].

#![deny(unsafe_code)]

use std::fmt;

// ============================================================================
// Constants
// ============================================================================

/// Grid side length.
pub const GRID_SIZE: usize = 3;

/// Number of cells on the grid.
pub const CELL_COUNT: usize = GRID_SIZE * GRID_SIZE;

/// Every line that wins the game, in evaluation priority order:
/// rows top to bottom, columns left to right, main diagonal, anti-diagonal.
const WINNING_LINES: [[(usize, usize); GRID_SIZE]; 8] = [
    [(0, 0), (0, 1), (0, 2)],
    [(1, 0), (1, 1), (1, 2)],
    [(2, 0), (2, 1), (2, 2)],
    [(0, 0), (1, 0), (2, 0)],
    [(0, 1), (1, 1), (2, 1)],
    [(0, 2), (1, 2), (2, 2)],
    [(0, 0), (1, 1), (2, 2)],
    [(0, 2), (1, 1), (2, 0)],
];

// ============================================================================
// Core Types
// ============================================================================

/// A player's mark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Symbol {
    X,
    O,
}

impl Symbol {
    /// The opposing symbol.
    pub fn other(self) -> Self {
        match self {
            Self::X => Self::O,
            Self::O => Self::X,
        }
    }

    pub fn as_char(self) -> char {
        match self {
            Self::X => 'X',
            Self::O => 'O',
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }
}

impl fmt::Display for Symbol {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Contents of a single grid cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Cell {
    #[default]
    Empty,
    Marked(Symbol),
}

impl Cell {
    pub fn is_empty(self) -> bool {
        matches!(self, Self::Empty)
    }

    pub fn symbol(self) -> Option<Symbol> {
        match self {
            Self::Empty => None,
            Self::Marked(symbol) => Some(symbol),
        }
    }

    /// Single-character rendering used on the wire (`' '`, `'X'`, `'O'`).
    pub fn as_char(self) -> char {
        match self {
            Self::Empty => ' ',
            Self::Marked(symbol) => symbol.as_char(),
        }
    }
}

impl From<Symbol> for Cell {
    fn from(symbol: Symbol) -> Self {
        Self::Marked(symbol)
    }
}

/// Game progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    InProgress,
    Won(Symbol),
    Tied,
}

impl Status {
    /// True once no further moves can be applied.
    pub fn is_terminal(self) -> bool {
        !matches!(self, Self::InProgress)
    }
}

// ============================================================================
// Grid
// ============================================================================

/// The 3x3 board.
///
/// A grid only changes through [`Game::apply_move`] and [`Game::reset`], so
/// the number of marked cells always equals the number of moves applied since
/// the last reset.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Grid {
    cells: [[Cell; GRID_SIZE]; GRID_SIZE],
}

impl Grid {
    /// An all-empty grid.
    pub fn new() -> Self {
        Self::default()
    }

    /// Cell at `(row, col)`, or `None` when out of bounds.
    pub fn get(&self, row: usize, col: usize) -> Option<Cell> {
        self.cells.get(row).and_then(|r| r.get(col)).copied()
    }

    /// Rows top to bottom.
    pub fn rows(&self) -> &[[Cell; GRID_SIZE]; GRID_SIZE] {
        &self.cells
    }

    pub fn marked_count(&self) -> usize {
        self.cells
            .iter()
            .flatten()
            .filter(|cell| !cell.is_empty())
            .count()
    }

    pub fn is_full(&self) -> bool {
        self.marked_count() == CELL_COUNT
    }

    /// Evaluate the terminal condition of this grid.
    ///
    /// Lines are checked before the full-board tie so that a winning move
    /// which also fills the board is reported as a win.
    pub fn evaluate(&self) -> Status {
        for line in &WINNING_LINES {
            let [a, b, c] = line.map(|(r, col)| self.cells[r][col]);
            if let Some(symbol) = a.symbol()
                && a == b
                && b == c
            {
                return Status::Won(symbol);
            }
        }

        if self.is_full() {
            Status::Tied
        } else {
            Status::InProgress
        }
    }

    fn set(&mut self, row: usize, col: usize, cell: Cell) {
        self.cells[row][col] = cell;
    }
}

// ============================================================================
// Move Result
// ============================================================================

/// Result of attempting a move.
///
/// Dropped variants leave the game untouched. They exist so the caller can log
/// why nothing was broadcast; clients are never told.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MoveResult {
    /// Move applied, game continues with `turn` to play.
    Continued { turn: Symbol },
    /// Move applied and ended the game.
    Finished(Status),
    /// Dropped: the game is already over.
    DroppedGameOver,
    /// Dropped: it is not this symbol's turn.
    DroppedOutOfTurn { turn: Symbol },
    /// Dropped: row or column outside `[0, 3)`.
    DroppedOutOfBounds { row: i64, col: i64 },
    /// Dropped: target cell already marked.
    DroppedOccupied { row: usize, col: usize },
}

// ============================================================================
// Game
// ============================================================================

/// The single authoritative game state: grid, whose turn it is, and status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Game {
    grid: Grid,
    turn: Symbol,
    status: Status,
}

impl Default for Game {
    fn default() -> Self {
        Self::new()
    }
}

impl Game {
    /// Fresh game: empty grid, X to play.
    pub fn new() -> Self {
        Self {
            grid: Grid::new(),
            turn: Symbol::X,
            status: Status::InProgress,
        }
    }

    pub fn grid(&self) -> &Grid {
        &self.grid
    }

    pub fn turn(&self) -> Symbol {
        self.turn
    }

    pub fn status(&self) -> Status {
        self.status
    }

    /// Moves applied since the last reset.
    pub fn move_count(&self) -> usize {
        self.grid.marked_count()
    }

    /// Try to place `symbol` at `(row, col)`.
    ///
    /// Checks, in order: game still in progress, symbol holds the turn,
    /// coordinates in bounds, cell empty. Nothing is mutated unless every
    /// check passes.
    pub fn apply_move(&mut self, symbol: Symbol, row: i64, col: i64) -> MoveResult {
        if self.status.is_terminal() {
            return MoveResult::DroppedGameOver;
        }

        if symbol != self.turn {
            return MoveResult::DroppedOutOfTurn { turn: self.turn };
        }

        let Some((r, c)) = to_index(row).zip(to_index(col)) else {
            return MoveResult::DroppedOutOfBounds { row, col };
        };

        if !self.grid.cells[r][c].is_empty() {
            return MoveResult::DroppedOccupied { row: r, col: c };
        }

        self.grid.set(r, c, symbol.into());

        match self.grid.evaluate() {
            Status::InProgress => {
                self.turn = self.turn.other();
                MoveResult::Continued { turn: self.turn }
            }
            terminal => {
                self.status = terminal;
                MoveResult::Finished(terminal)
            }
        }
    }

    /// Clear the grid, give X the turn, and resume play. Unconditional.
    pub fn reset(&mut self) {
        *self = Self::new();
    }
}

fn to_index(value: i64) -> Option<usize> {
    usize::try_from(value).ok().filter(|&v| v < GRID_SIZE)
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    /// Play moves alternately starting with X, asserting each one applies.
    fn play(game: &mut Game, moves: &[(i64, i64)]) -> MoveResult {
        let mut last = None;
        for &(row, col) in moves {
            let result = game.apply_move(game.turn(), row, col);
            assert!(
                matches!(result, MoveResult::Continued { .. } | MoveResult::Finished(_)),
                "move ({row}, {col}) rejected: {result:?}"
            );
            last = Some(result);
        }
        last.expect("at least one move")
    }

    #[test]
    fn test_new_game_is_empty_with_x_to_play() {
        let game = Game::new();
        assert_eq!(game.turn(), Symbol::X);
        assert_eq!(game.status(), Status::InProgress);
        assert_eq!(game.move_count(), 0);
        assert!(game.grid().rows().iter().flatten().all(|c| c.is_empty()));
    }

    #[test]
    fn test_valid_move_marks_cell_and_flips_turn() {
        let mut game = Game::new();
        let result = game.apply_move(Symbol::X, 0, 0);

        assert_eq!(result, MoveResult::Continued { turn: Symbol::O });
        assert_eq!(game.grid().get(0, 0), Some(Cell::Marked(Symbol::X)));
        assert_eq!(game.turn(), Symbol::O);
        assert_eq!(game.move_count(), 1);
    }

    // ========================================================================
    // Rejections
    // ========================================================================

    #[test]
    fn test_out_of_turn_rejected() {
        let mut game = Game::new();
        let before = game.clone();

        let result = game.apply_move(Symbol::O, 1, 1);

        assert_eq!(result, MoveResult::DroppedOutOfTurn { turn: Symbol::X });
        assert_eq!(game, before);
    }

    #[test]
    fn test_occupied_cell_rejected() {
        let mut game = Game::new();
        play(&mut game, &[(1, 1)]);
        let before = game.clone();

        let result = game.apply_move(Symbol::O, 1, 1);

        assert_eq!(result, MoveResult::DroppedOccupied { row: 1, col: 1 });
        assert_eq!(game, before);
    }

    #[test]
    fn test_out_of_bounds_rejected() {
        let mut game = Game::new();
        let before = game.clone();

        for (row, col) in [(-1, 0), (0, -1), (3, 0), (0, 3), (i64::MAX, 1), (i64::MIN, 2)] {
            let result = game.apply_move(Symbol::X, row, col);
            assert_eq!(result, MoveResult::DroppedOutOfBounds { row, col });
        }
        assert_eq!(game, before);
    }

    #[test]
    fn test_move_after_game_over_rejected() {
        let mut game = Game::new();
        play(&mut game, &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]);
        assert_eq!(game.status(), Status::Won(Symbol::X));
        let before = game.clone();

        // O would hold the turn if the game had continued; either symbol is refused.
        assert_eq!(game.apply_move(Symbol::O, 2, 2), MoveResult::DroppedGameOver);
        assert_eq!(game.apply_move(Symbol::X, 2, 2), MoveResult::DroppedGameOver);
        assert_eq!(game, before);
    }

    /// Turn-order is checked before bounds, bounds before occupancy.
    #[test]
    fn test_validation_order() {
        let mut game = Game::new();
        play(&mut game, &[(0, 0)]);

        assert_eq!(
            game.apply_move(Symbol::X, 9, 9),
            MoveResult::DroppedOutOfTurn { turn: Symbol::O }
        );
        assert_eq!(
            game.apply_move(Symbol::O, 9, 0),
            MoveResult::DroppedOutOfBounds { row: 9, col: 0 }
        );
    }

    // ========================================================================
    // Terminal detection
    // ========================================================================

    #[test]
    fn test_row_win() {
        let mut game = Game::new();
        let result = play(&mut game, &[(0, 0), (1, 1), (0, 1), (1, 2), (0, 2)]);

        assert_eq!(result, MoveResult::Finished(Status::Won(Symbol::X)));
        // Turn does not flip on a terminal move.
        assert_eq!(game.turn(), Symbol::X);
    }

    #[test]
    fn test_column_win_for_o() {
        let mut game = Game::new();
        let result = play(&mut game, &[(0, 0), (0, 1), (2, 2), (1, 1), (1, 0), (2, 1)]);
        assert_eq!(result, MoveResult::Finished(Status::Won(Symbol::O)));
    }

    #[test]
    fn test_both_diagonals() {
        let mut game = Game::new();
        let result = play(&mut game, &[(0, 0), (0, 1), (1, 1), (0, 2), (2, 2)]);
        assert_eq!(result, MoveResult::Finished(Status::Won(Symbol::X)));

        let mut game = Game::new();
        let result = play(&mut game, &[(0, 2), (0, 0), (1, 1), (0, 1), (2, 0)]);
        assert_eq!(result, MoveResult::Finished(Status::Won(Symbol::X)));
    }

    #[test]
    fn test_tie() {
        // X O X
        // X O O
        // O X X
        let mut game = Game::new();
        let result = play(
            &mut game,
            &[(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0), (2, 2)],
        );
        assert_eq!(result, MoveResult::Finished(Status::Tied));
        assert!(game.grid().is_full());
    }

    /// A ninth move that both fills the board and completes a line is a win.
    #[test]
    fn test_win_on_full_board_is_not_a_tie() {
        // O X O
        // O X X
        // X X O   <- X's ninth move at (2,1) completes column 1
        let mut game = Game::new();
        let result = play(
            &mut game,
            &[(0, 1), (0, 0), (1, 1), (0, 2), (1, 2), (1, 0), (2, 0), (2, 2), (2, 1)],
        );

        assert!(game.grid().is_full());
        assert_eq!(result, MoveResult::Finished(Status::Won(Symbol::X)));
    }

    #[test]
    fn test_evaluate_reports_line_owner() {
        let mut game = Game::new();
        play(&mut game, &[(0, 0), (1, 0), (0, 1), (2, 0), (0, 2)]);
        assert_eq!(game.grid().evaluate(), Status::Won(Symbol::X));
        assert_eq!(Grid::new().evaluate(), Status::InProgress);
    }

    // ========================================================================
    // Reset
    // ========================================================================

    #[test]
    fn test_reset_from_any_state() {
        let mut finished = Game::new();
        play(&mut finished, &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]);

        let mut mid_game = Game::new();
        play(&mut mid_game, &[(2, 2)]);

        for mut game in [finished, mid_game, Game::new()] {
            game.reset();
            assert_eq!(game.status(), Status::InProgress);
            assert_eq!(game.turn(), Symbol::X);
            assert_eq!(game.move_count(), 0);
            assert_eq!(game, Game::new());
        }
    }

    #[test]
    fn test_cell_chars() {
        assert_eq!(Cell::Empty.as_char(), ' ');
        assert_eq!(Cell::from(Symbol::X).as_char(), 'X');
        assert_eq!(Cell::from(Symbol::O).as_char(), 'O');
        assert_eq!(Symbol::X.other(), Symbol::O);
        assert_eq!(Symbol::O.to_string(), "O");
    }

    // ========================================================================
    // Properties
    // ========================================================================

    proptest! {
        /// After N applied non-terminal moves from a fresh game, X holds the
        /// turn when N is even and O when N is odd. Marked cells equal N.
        #[test]
        fn prop_turn_parity(order in Just((0..CELL_COUNT).collect::<Vec<_>>()).prop_shuffle()) {
            let mut game = Game::new();
            let mut applied = 0usize;

            for idx in order {
                let (row, col) = ((idx / GRID_SIZE) as i64, (idx % GRID_SIZE) as i64);
                match game.apply_move(game.turn(), row, col) {
                    MoveResult::Continued { turn } => {
                        applied += 1;
                        let expected = if applied % 2 == 0 { Symbol::X } else { Symbol::O };
                        prop_assert_eq!(turn, expected);
                        prop_assert_eq!(game.move_count(), applied);
                    }
                    MoveResult::Finished(_) => break,
                    other => prop_assert!(false, "unexpected drop {:?}", other),
                }
            }
        }

        /// Any move from any symbol never mutates a finished game.
        #[test]
        fn prop_no_moves_after_terminal(row in -2i64..5, col in -2i64..5, x in any::<bool>()) {
            let mut game = Game::new();
            play(&mut game, &[(0, 0), (1, 0), (0, 1), (1, 1), (0, 2)]);
            let before = game.clone();
            let symbol = if x { Symbol::X } else { Symbol::O };

            prop_assert_eq!(game.apply_move(symbol, row, col), MoveResult::DroppedGameOver);
            prop_assert_eq!(game, before);
        }
    }
}
