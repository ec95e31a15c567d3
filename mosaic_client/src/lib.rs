// mosaic_client — client protocol core for the Mosaic shared canvas.
//
// Many clients connect to one server; each can repaint single tiles, and
// every client observes every change. This crate is the client-side
// protocol handler: connection establishment, message dispatch over the
// persistent duplex stream, and synchronization of a local board with the
// authoritative server state. Rendering and bootstrap live elsewhere — the
// core only hands board snapshots and per-tile updates to an observer.
//
// Module overview:
// - `connection.rs`: `Connection` — the TCP stream, framed blocking
//                    send/receive, and the reader/writer split.
// - `board.rs`:      `ObservableBoard` — the shared local grid — and the
//                    `BoardObserver` capability the UI implements.
// - `session.rs`:    `Session` — login, the dedicated receive-loop thread,
//                    thread-safe `change_tile`, and `SessionExit`.
// - `error.rs`:      `ClientError` — the failure taxonomy.
//
// Concurrency model: one receive-loop thread per session (sole board
// mutator) plus any number of caller threads issuing `change_tile`, whose
// sends serialize through a writer lock. Every failure is terminal; the
// loop reports a `SessionExit` and the owner decides what to do with the
// process.

pub mod board;
pub mod connection;
pub mod error;
pub mod session;

pub use board::{BoardEvent, BoardObserver, ObservableBoard};
pub use connection::Connection;
pub use error::ClientError;
pub use session::{Session, SessionExit, SessionState};
