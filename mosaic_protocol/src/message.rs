// Protocol messages for client-server communication.
//
// One envelope enum covers the whole vocabulary. The payload shape is fully
// determined by the tag — no message ever carries a mismatched payload, and
// the serde representation (externally tagged JSON) keeps the envelope
// self-describing on the wire.
//
// Direction is a convention, not a type: clients send `Login`, `ChangeTile`,
// and (only as a last-gasp escalation on fatal failure) `Error`; the server
// sends `LoginSuccess`, `Board`, `TileChanged`, and `Error`. Anything else
// arriving at a client is a protocol violation.

use serde::{Deserialize, Serialize};

use crate::board::Board;
use crate::types::Tile;

/// The six-tag message envelope.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub enum Message {
    /// Client asks to join under a username. Sent exactly once per session.
    Login { username: String },
    /// Server acknowledges a login; the payload is shown to the user.
    LoginSuccess { info: String },
    /// Fatal complaint, either direction. The session ends after this.
    Error { reason: String },
    /// Full authoritative snapshot, sent once after login.
    Board { board: Board },
    /// Client proposes repainting one tile.
    ChangeTile { tile: Tile },
    /// Server confirms a tile change, to every client.
    TileChanged { tile: Tile },
}
