// mosaic_protocol — wire protocol for the Mosaic shared canvas.
//
// This crate defines the data model, message envelope, and framing used by
// the Mosaic server and its clients to communicate over TCP. It is shared
// between both sides and has no dependency on rendering or networking code.
//
// Module overview:
// - `types.rs`:    `TileColor` (the 16-entry palette with stable wire
//                  codes) and `Tile` (one cell: position, owner, color,
//                  timestamp).
// - `board.rs`:    `Board` — the dim×dim grid, blank allocation, overwrite
//                  semantics, validated snapshot deserialization.
// - `message.rs`:  The six-tag `Message` envelope.
// - `framing.rs`:  Length-delimited framing over any `Read`/`Write` stream:
//                  4-byte big-endian length prefix, then JSON payload.
//
// Design decisions:
// - **JSON serialization.** Self-describing, easy to eyeball in a packet
//   capture, and cheap at this protocol's message rate. Binary framing can
//   be swapped in later if bandwidth matters.
// - **Validated decoding.** Color codes and board snapshots are checked as
//   they deserialize; a malformed value fails at the wire boundary instead
//   of becoming half-valid state.
// - **No async runtime.** Uses `std::io::Read`/`Write` for framing,
//   compatible with blocking TCP streams and buffered wrappers.

pub mod board;
pub mod framing;
pub mod message;
pub mod types;

pub use board::Board;
pub use framing::{MAX_MESSAGE_SIZE, read_message, write_message};
pub use message::Message;
pub use types::{Tile, TileColor};

/// Default server port for callers bootstrapping a connection.
pub const DEFAULT_PORT: u16 = 7272;
