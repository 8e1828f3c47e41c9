//! Game session: the single authoritative [`Game`] and the messages its
//! changes produce.

use noughts_sim::{Game, MoveResult, Symbol};
use noughts_wire::{Mark, ServerMessage, Winner, board_of};

/// Broadcast when the second player joins.
pub const START_MESSAGE: &str = "Game started! X goes first.";

/// Sent to everyone but the requester on a player-initiated reset.
pub const RESET_BY_PLAYER_MESSAGE: &str = "Game reset by player.";

/// Reset notice after a player leaves.
pub fn player_disconnected_message(symbol: Symbol) -> String {
    format!("Player {symbol} disconnected. Game reset.")
}

/// Owns the one game instance.
#[derive(Debug, Default)]
pub struct GameSession {
    game: Game,
}

impl GameSession {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn game(&self) -> &Game {
        &self.game
    }

    /// Apply a move for `symbol`.
    ///
    /// Returns the `update` or `game_over` message to broadcast, or the drop
    /// reason when the move was refused (nothing changed).
    pub fn apply_move(
        &mut self,
        symbol: Symbol,
        row: i64,
        col: i64,
    ) -> Result<ServerMessage, MoveResult> {
        let result = self.game.apply_move(symbol, row, col);
        let board = board_of(self.game.grid());

        match result {
            MoveResult::Continued { turn } => Ok(ServerMessage::Update {
                board,
                current: turn.into(),
            }),
            MoveResult::Finished(status) => match Winner::from_status(status) {
                Some(winner) => Ok(ServerMessage::GameOver { winner, board }),
                None => Err(result),
            },
            dropped => Err(dropped),
        }
    }

    /// Unconditionally restart the game. Announcing it is the caller's job.
    pub fn reset(&mut self) {
        self.game.reset();
    }

    /// Player-initiated reset. Returns the notice for the other connections.
    pub fn request_reset(&mut self) -> ServerMessage {
        self.reset();
        ServerMessage::Reset {
            message: RESET_BY_PLAYER_MESSAGE.to_string(),
        }
    }

    /// `assign` for a newly admitted player.
    pub fn assign_message(&self, player: Symbol) -> ServerMessage {
        ServerMessage::Assign {
            player: player.into(),
            board: board_of(self.game.grid()),
            current: self.current(),
        }
    }

    /// `spectator` for a newly admitted spectator.
    pub fn spectator_message(&self) -> ServerMessage {
        ServerMessage::Spectator {
            board: board_of(self.game.grid()),
            current: self.current(),
        }
    }

    fn current(&self) -> Mark {
        self.game.turn().into()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use noughts_sim::Status;

    const EMPTY: [[char; 3]; 3] = [[' '; 3]; 3];

    #[test]
    fn test_move_produces_update() {
        let mut session = GameSession::new();
        let msg = session.apply_move(Symbol::X, 0, 0).expect("valid move");

        assert_eq!(
            msg,
            ServerMessage::Update {
                board: [['X', ' ', ' '], [' ', ' ', ' '], [' ', ' ', ' ']],
                current: Mark::O,
            }
        );
    }

    #[test]
    fn test_winning_move_produces_game_over() {
        let mut session = GameSession::new();
        for (symbol, row, col) in [
            (Symbol::X, 0, 0),
            (Symbol::O, 1, 1),
            (Symbol::X, 0, 1),
            (Symbol::O, 1, 2),
        ] {
            session.apply_move(symbol, row, col).expect("valid move");
        }

        let msg = session.apply_move(Symbol::X, 0, 2).expect("winning move");
        assert_eq!(
            msg,
            ServerMessage::GameOver {
                winner: Winner::X,
                board: [['X', 'X', 'X'], [' ', 'O', 'O'], [' ', ' ', ' ']],
            }
        );
        assert_eq!(session.game().status(), Status::Won(Symbol::X));
    }

    #[test]
    fn test_tie_reports_tie_winner() {
        let mut session = GameSession::new();
        let moves = [(0, 0), (0, 1), (0, 2), (1, 1), (1, 0), (1, 2), (2, 1), (2, 0)];
        for (row, col) in moves {
            let turn = session.game().turn();
            session.apply_move(turn, row, col).expect("valid move");
        }

        let msg = session.apply_move(Symbol::X, 2, 2).expect("last move");
        assert!(matches!(
            msg,
            ServerMessage::GameOver {
                winner: Winner::Tie,
                ..
            }
        ));
    }

    #[test]
    fn test_refused_move_returns_reason() {
        let mut session = GameSession::new();
        assert_eq!(
            session.apply_move(Symbol::O, 0, 0),
            Err(MoveResult::DroppedOutOfTurn { turn: Symbol::X })
        );
        assert_eq!(session.game().move_count(), 0);
    }

    #[test]
    fn test_request_reset_clears_and_announces() {
        let mut session = GameSession::new();
        session.apply_move(Symbol::X, 1, 1).expect("valid move");

        let msg = session.request_reset();

        assert_eq!(
            msg,
            ServerMessage::Reset {
                message: RESET_BY_PLAYER_MESSAGE.to_string()
            }
        );
        assert_eq!(session.game().move_count(), 0);
        assert_eq!(session.game().turn(), Symbol::X);
    }

    #[test]
    fn test_join_messages_carry_current_state() {
        let mut session = GameSession::new();
        assert_eq!(
            session.assign_message(Symbol::X),
            ServerMessage::Assign {
                player: Mark::X,
                board: EMPTY,
                current: Mark::X,
            }
        );

        session.apply_move(Symbol::X, 2, 2).expect("valid move");
        assert_eq!(
            session.spectator_message(),
            ServerMessage::Spectator {
                board: [[' ', ' ', ' '], [' ', ' ', ' '], [' ', ' ', 'X']],
                current: Mark::O,
            }
        );
    }

    #[test]
    fn test_disconnect_message_names_symbol() {
        assert_eq!(
            player_disconnected_message(Symbol::X),
            "Player X disconnected. Game reset."
        );
    }
}
