//! Noughts Wire Protocol Types
//!
//! This crate defines the messages exchanged between game clients and the
//! server, and the two codecs that carry them:
//!
//! - **JSON text frames**: field-keyed objects with a `type` tag. This is the
//!   default encoding and what browser clients speak.
//! - **Protobuf binary frames** (via prost): [`ClientEnvelope`] and
//!   [`ServerEnvelope`] wrap the same message set in a `oneof`.
//!
//! Inbound decoding never fails: anything that is not a well-formed `move` or
//! `reset` becomes [`Inbound::Unknown`], which the server drops silently.

#![deny(unsafe_code)]

use noughts_sim::{CELL_COUNT, GRID_SIZE, Grid, Status, Symbol};
use prost::Message;
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ============================================================================
// Errors
// ============================================================================

/// Failures encoding outbound messages or decoding them back into
/// [`ServerMessage`] on the receiving side.
#[derive(Debug, Error)]
pub enum WireError {
    #[error("invalid JSON message: {0}")]
    Json(#[from] serde_json::Error),

    #[error("failed to decode protobuf message: {0}")]
    Decode(#[from] prost::DecodeError),

    #[error("envelope carried no message")]
    EmptyEnvelope,

    #[error("board must have 9 cells, got {0}")]
    BoardSize(usize),

    #[error("invalid cell value {0:?}")]
    InvalidCell(String),

    #[error("invalid mark {0:?}")]
    InvalidMark(String),
}

// ============================================================================
// Shared Value Types
// ============================================================================

/// A player symbol as it appears on the wire (`"X"` or `"O"`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Mark {
    X,
    O,
}

impl From<Symbol> for Mark {
    fn from(symbol: Symbol) -> Self {
        match symbol {
            Symbol::X => Self::X,
            Symbol::O => Self::O,
        }
    }
}

impl Mark {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
        }
    }

    fn parse(value: &str) -> Result<Self, WireError> {
        match value {
            "X" => Ok(Self::X),
            "O" => Ok(Self::O),
            other => Err(WireError::InvalidMark(other.to_string())),
        }
    }
}

/// Result carried by `game_over`: a winning mark or `"Tie"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Winner {
    X,
    O,
    Tie,
}

impl Winner {
    /// Winner for a terminal status; `None` while the game is in progress.
    pub fn from_status(status: Status) -> Option<Self> {
        match status {
            Status::InProgress => None,
            Status::Won(Symbol::X) => Some(Self::X),
            Status::Won(Symbol::O) => Some(Self::O),
            Status::Tied => Some(Self::Tie),
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::X => "X",
            Self::O => "O",
            Self::Tie => "Tie",
        }
    }

    fn parse(value: &str) -> Result<Self, WireError> {
        match value {
            "X" => Ok(Self::X),
            "O" => Ok(Self::O),
            "Tie" => Ok(Self::Tie),
            other => Err(WireError::InvalidMark(other.to_string())),
        }
    }
}

/// Board as sent to clients: rows of single-character cells (`' '`, `'X'`, `'O'`).
///
/// Serialized in JSON as a 3x3 array of one-character strings.
pub type Board = [[char; GRID_SIZE]; GRID_SIZE];

/// Render a grid for the wire.
pub fn board_of(grid: &Grid) -> Board {
    grid.rows().map(|row| row.map(|cell| cell.as_char()))
}

// ============================================================================
// Inbound (client → server)
// ============================================================================

/// A decoded client message. The closed set the server dispatches on.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Inbound {
    /// Place the sender's mark. Coordinates are unvalidated.
    Move { row: i64, col: i64 },
    /// Restart the game.
    Reset,
    /// Unparseable, unknown type, or missing fields. Dropped by the server.
    Unknown,
}

#[derive(Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum JsonInbound {
    Move { row: i64, col: i64 },
    Reset,
}

impl Inbound {
    /// Decode a JSON text frame.
    pub fn from_json(text: &str) -> Self {
        match serde_json::from_str::<JsonInbound>(text.trim()) {
            Ok(JsonInbound::Move { row, col }) => Self::Move { row, col },
            Ok(JsonInbound::Reset) => Self::Reset,
            Err(_) => Self::Unknown,
        }
    }

    /// Decode a protobuf [`ClientEnvelope`].
    pub fn from_protobuf(bytes: &[u8]) -> Self {
        let Ok(envelope) = ClientEnvelope::decode(bytes) else {
            return Self::Unknown;
        };
        match envelope.kind {
            Some(client_envelope::Kind::Move(MoveProto {
                row: Some(row),
                col: Some(col),
            })) => Self::Move { row, col },
            Some(client_envelope::Kind::Reset(_)) => Self::Reset,
            _ => Self::Unknown,
        }
    }

    /// Decode whatever kind of frame arrived.
    pub fn from_frame(frame: &Frame) -> Self {
        match frame {
            Frame::Text(text) => Self::from_json(text),
            Frame::Binary(bytes) => Self::from_protobuf(bytes),
        }
    }
}

// ============================================================================
// Outbound (server → client)
// ============================================================================

/// Messages the server sends. JSON form is tagged by `type`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// Sent only to a newly connected player.
    Assign {
        player: Mark,
        board: Board,
        current: Mark,
    },
    /// Sent only to a newly connected spectator.
    Spectator { board: Board, current: Mark },
    /// Broadcast when the second player joins.
    Start { message: String },
    /// Broadcast after a non-terminal move.
    Update { board: Board, current: Mark },
    /// Broadcast after a terminal move.
    GameOver { winner: Winner, board: Board },
    /// Broadcast after a reset, with a human-readable reason.
    Reset { message: String },
}

impl ServerMessage {
    /// The `type` tag, for logging.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Assign { .. } => "assign",
            Self::Spectator { .. } => "spectator",
            Self::Start { .. } => "start",
            Self::Update { .. } => "update",
            Self::GameOver { .. } => "game_over",
            Self::Reset { .. } => "reset",
        }
    }
}

// ============================================================================
// Frames and Codecs
// ============================================================================

/// One discrete transport message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Frame {
    Text(String),
    Binary(Vec<u8>),
}

/// Outbound encoding used for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Codec {
    #[default]
    Json,
    Protobuf,
}

impl Codec {
    pub fn encode(self, message: &ServerMessage) -> Result<Frame, WireError> {
        match self {
            Self::Json => Ok(Frame::Text(serde_json::to_string(message)?)),
            Self::Protobuf => Ok(Frame::Binary(
                ServerEnvelope::from(message.clone()).encode_to_vec(),
            )),
        }
    }

    /// Decode a frame produced by [`Codec::encode`]. Used by clients and tests.
    pub fn decode(frame: &Frame) -> Result<ServerMessage, WireError> {
        match frame {
            Frame::Text(text) => Ok(serde_json::from_str(text)?),
            Frame::Binary(bytes) => ServerEnvelope::decode(bytes.as_slice())?.try_into(),
        }
    }
}

// ============================================================================
// Protobuf Messages
// ============================================================================

/// Move request. Both fields are required; absence decodes to `Unknown`.
#[derive(Clone, PartialEq, Message)]
pub struct MoveProto {
    #[prost(int64, optional, tag = "1")]
    pub row: Option<i64>,

    #[prost(int64, optional, tag = "2")]
    pub col: Option<i64>,
}

/// Reset request. No fields.
#[derive(Clone, PartialEq, Message)]
pub struct ResetRequestProto {}

/// Client → server envelope.
#[derive(Clone, PartialEq, Message)]
pub struct ClientEnvelope {
    #[prost(oneof = "client_envelope::Kind", tags = "1, 2")]
    pub kind: Option<client_envelope::Kind>,
}

pub mod client_envelope {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Move(super::MoveProto),
        #[prost(message, tag = "2")]
        Reset(super::ResetRequestProto),
    }
}

/// Board cells in row-major order, each `" "`, `"X"` or `"O"`.
#[derive(Clone, PartialEq, Message)]
pub struct BoardProto {
    #[prost(string, repeated, tag = "1")]
    pub cells: Vec<String>,
}

#[derive(Clone, PartialEq, Message)]
pub struct AssignProto {
    #[prost(string, tag = "1")]
    pub player: String,

    #[prost(message, optional, tag = "2")]
    pub board: Option<BoardProto>,

    #[prost(string, tag = "3")]
    pub current: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct SpectatorProto {
    #[prost(message, optional, tag = "1")]
    pub board: Option<BoardProto>,

    #[prost(string, tag = "2")]
    pub current: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct StartProto {
    #[prost(string, tag = "1")]
    pub message: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct UpdateProto {
    #[prost(message, optional, tag = "1")]
    pub board: Option<BoardProto>,

    #[prost(string, tag = "2")]
    pub current: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct GameOverProto {
    /// `"X"`, `"O"` or `"Tie"`.
    #[prost(string, tag = "1")]
    pub winner: String,

    #[prost(message, optional, tag = "2")]
    pub board: Option<BoardProto>,
}

#[derive(Clone, PartialEq, Message)]
pub struct ResetProto {
    #[prost(string, tag = "1")]
    pub message: String,
}

/// Server → client envelope.
#[derive(Clone, PartialEq, Message)]
pub struct ServerEnvelope {
    #[prost(oneof = "server_envelope::Kind", tags = "1, 2, 3, 4, 5, 6")]
    pub kind: Option<server_envelope::Kind>,
}

pub mod server_envelope {
    #[derive(Clone, PartialEq, prost::Oneof)]
    pub enum Kind {
        #[prost(message, tag = "1")]
        Assign(super::AssignProto),
        #[prost(message, tag = "2")]
        Spectator(super::SpectatorProto),
        #[prost(message, tag = "3")]
        Start(super::StartProto),
        #[prost(message, tag = "4")]
        Update(super::UpdateProto),
        #[prost(message, tag = "5")]
        GameOver(super::GameOverProto),
        #[prost(message, tag = "6")]
        Reset(super::ResetProto),
    }
}

// ============================================================================
// Conversion Traits
// ============================================================================

impl From<Board> for BoardProto {
    fn from(board: Board) -> Self {
        Self {
            cells: board.iter().flatten().map(char::to_string).collect(),
        }
    }
}

impl TryFrom<BoardProto> for Board {
    type Error = WireError;

    fn try_from(proto: BoardProto) -> Result<Self, Self::Error> {
        if proto.cells.len() != CELL_COUNT {
            return Err(WireError::BoardSize(proto.cells.len()));
        }
        let mut board = [[' '; GRID_SIZE]; GRID_SIZE];
        for (idx, cell) in proto.cells.into_iter().enumerate() {
            let value = match cell.as_str() {
                " " => ' ',
                "X" => 'X',
                "O" => 'O',
                _ => return Err(WireError::InvalidCell(cell)),
            };
            board[idx / GRID_SIZE][idx % GRID_SIZE] = value;
        }
        Ok(board)
    }
}

fn board_from(proto: Option<BoardProto>) -> Result<Board, WireError> {
    proto.unwrap_or_default().try_into()
}

impl From<ServerMessage> for ServerEnvelope {
    fn from(message: ServerMessage) -> Self {
        use server_envelope::Kind;

        let kind = match message {
            ServerMessage::Assign {
                player,
                board,
                current,
            } => Kind::Assign(AssignProto {
                player: player.as_str().to_string(),
                board: Some(board.into()),
                current: current.as_str().to_string(),
            }),
            ServerMessage::Spectator { board, current } => Kind::Spectator(SpectatorProto {
                board: Some(board.into()),
                current: current.as_str().to_string(),
            }),
            ServerMessage::Start { message } => Kind::Start(StartProto { message }),
            ServerMessage::Update { board, current } => Kind::Update(UpdateProto {
                board: Some(board.into()),
                current: current.as_str().to_string(),
            }),
            ServerMessage::GameOver { winner, board } => Kind::GameOver(GameOverProto {
                winner: winner.as_str().to_string(),
                board: Some(board.into()),
            }),
            ServerMessage::Reset { message } => Kind::Reset(ResetProto { message }),
        };

        Self { kind: Some(kind) }
    }
}

impl TryFrom<ServerEnvelope> for ServerMessage {
    type Error = WireError;

    fn try_from(envelope: ServerEnvelope) -> Result<Self, Self::Error> {
        use server_envelope::Kind;

        match envelope.kind.ok_or(WireError::EmptyEnvelope)? {
            Kind::Assign(p) => Ok(Self::Assign {
                player: Mark::parse(&p.player)?,
                board: board_from(p.board)?,
                current: Mark::parse(&p.current)?,
            }),
            Kind::Spectator(p) => Ok(Self::Spectator {
                board: board_from(p.board)?,
                current: Mark::parse(&p.current)?,
            }),
            Kind::Start(p) => Ok(Self::Start { message: p.message }),
            Kind::Update(p) => Ok(Self::Update {
                board: board_from(p.board)?,
                current: Mark::parse(&p.current)?,
            }),
            Kind::GameOver(p) => Ok(Self::GameOver {
                winner: Winner::parse(&p.winner)?,
                board: board_from(p.board)?,
            }),
            Kind::Reset(p) => Ok(Self::Reset { message: p.message }),
        }
    }
}

// ============================================================================
// Tests
// ============================================================================
