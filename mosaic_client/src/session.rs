// The client session: login, the receive loop, and tile-change requests.
//
// Architecture, mirroring the split in `connection.rs`:
// - `Session::login()` sends the one `Login` message on the calling thread,
//   then spawns the receive loop on a dedicated background thread.
// - The receive loop blocks on `ConnectionReader::receive()` and applies
//   every server message to the shared `ObservableBoard`. It never sends
//   application data; its only outbound traffic is a single best-effort
//   `Error` escalation when the stream dies under it.
// - Callers invoke `change_tile` from any thread. The writer half sits
//   behind a `Mutex`, so two concurrent sends can never interleave their
//   bytes on the wire — each envelope goes out whole.
//
// Failure policy is fail fast, don't limp: any I/O or decode failure, and
// any `Error` from the server, terminates the session. Nothing reconnects
// and nothing retries. The loop reports how it ended as a `SessionExit`
// value; the owner decides whether that ends the process.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{SystemTime, UNIX_EPOCH};

use mosaic_protocol::message::Message;
use mosaic_protocol::types::{Tile, TileColor};

use crate::board::ObservableBoard;
use crate::connection::{Connection, ConnectionReader, ConnectionWriter};
use crate::error::ClientError;

/// Protocol lifecycle of a session.
///
/// `LoggingIn` becomes `Synchronized` implicitly on the first board
/// snapshot — there is no explicit acknowledgement state. `Terminated` is
/// reached only through failure or a server `Error`; there is no graceful
/// client-initiated logout.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SessionState {
    Connecting,
    LoggingIn,
    Synchronized,
    Terminated,
}

/// Lock-free state cell shared between the session handle and the loop.
struct StateCell(AtomicU8);

impl StateCell {
    fn new(state: SessionState) -> Self {
        StateCell(AtomicU8::new(state as u8))
    }

    fn set(&self, state: SessionState) {
        self.0.store(state as u8, Ordering::SeqCst);
    }

    fn get(&self) -> SessionState {
        match self.0.load(Ordering::SeqCst) {
            0 => SessionState::Connecting,
            1 => SessionState::LoggingIn,
            2 => SessionState::Synchronized,
            _ => SessionState::Terminated,
        }
    }
}

/// How a session ended. The suggested process exit codes keep the two
/// failure families distinguishable to scripts driving a client binary:
/// 1 for a server-reported error, 2 for transport failure.
#[derive(Debug)]
pub enum SessionExit {
    /// The server sent `Error`; its reason, verbatim.
    ServerError(String),
    /// The stream died or produced undecodable bytes.
    Transport(ClientError),
}

impl SessionExit {
    pub fn exit_code(&self) -> i32 {
        match self {
            SessionExit::ServerError(_) => 1,
            SessionExit::Transport(_) => 2,
        }
    }
}

/// A logged-in client session. Owns the connection; shares the board with
/// the rendering layer.
pub struct Session {
    writer: Arc<Mutex<ConnectionWriter>>,
    board: Arc<ObservableBoard>,
    username: String,
    state: Arc<StateCell>,
    receive_thread: Option<JoinHandle<SessionExit>>,
}

impl Session {
    /// Send the one `Login` message and start the receive loop. The session
    /// owns `connection` from here on; `board` is shared with the caller's
    /// rendering layer.
    pub fn login(
        connection: Connection,
        board: Arc<ObservableBoard>,
        username: impl Into<String>,
    ) -> Result<Session, ClientError> {
        let username = username.into();
        let state = Arc::new(StateCell::new(SessionState::Connecting));

        let (reader, mut writer) = connection.into_split();
        writer.send(&Message::Login {
            username: username.clone(),
        })?;
        state.set(SessionState::LoggingIn);
        tracing::debug!("logged in as {:?}, starting receive loop", username);

        let writer = Arc::new(Mutex::new(writer));
        let receive_thread = {
            let writer = writer.clone();
            let board = board.clone();
            let state = state.clone();
            thread::spawn(move || receive_loop(reader, writer, board, state))
        };

        Ok(Session {
            writer,
            board,
            username,
            state,
            receive_thread: Some(receive_thread),
        })
    }

    /// Propose repainting one tile.
    ///
    /// Validates the color code locally first: an unknown code is rejected
    /// with `InvalidColor` and nothing is sent. Safe to call from any
    /// thread; sends are serialized through the session's writer lock.
    pub fn change_tile(&self, row: u16, col: u16, color_code: u8) -> Result<(), ClientError> {
        let color =
            TileColor::from_code(color_code).ok_or(ClientError::InvalidColor(color_code))?;
        let tile = Tile::new(row, col, self.username.clone(), color, now_millis());
        let mut writer = self.writer.lock().unwrap();
        writer.send(&Message::ChangeTile { tile })
    }

    pub fn state(&self) -> SessionState {
        self.state.get()
    }

    pub fn is_terminated(&self) -> bool {
        self.state.get() == SessionState::Terminated
    }

    pub fn username(&self) -> &str {
        &self.username
    }

    pub fn board(&self) -> &Arc<ObservableBoard> {
        &self.board
    }

    /// Block until the receive loop ends and report how.
    pub fn wait(mut self) -> SessionExit {
        self.receive_thread
            .take()
            .expect("receive loop already joined")
            .join()
            .expect("receive loop panicked")
    }
}

/// The unbounded receive loop. Runs on its own thread for the lifetime of
/// the session; every exit path shuts the connection down and moves the
/// state to `Terminated` before reporting.
fn receive_loop(
    mut reader: ConnectionReader,
    writer: Arc<Mutex<ConnectionWriter>>,
    board: Arc<ObservableBoard>,
    state: Arc<StateCell>,
) -> SessionExit {
    let exit = loop {
        match reader.receive() {
            Ok(Message::LoginSuccess { info }) => {
                println!("{info}");
            }
            Ok(Message::Board { board: snapshot }) => {
                // Full authoritative snapshot: allocate to the server's
                // dimension, then copy every cell row-major before the
                // session counts as synchronized.
                board.allocate(snapshot.dim());
                for tile in snapshot.tiles() {
                    board.set_up_tile(tile.clone());
                }
                state.set(SessionState::Synchronized);
                tracing::debug!("synchronized a {0}x{0} board", snapshot.dim());
                println!("{snapshot}");
            }
            Ok(Message::TileChanged { tile }) => {
                board.set_tile(tile);
            }
            Ok(Message::Error { reason }) => {
                eprintln!("server error: {reason}");
                break SessionExit::ServerError(reason);
            }
            Ok(Message::Login { .. }) => {
                break escalate(&writer, ClientError::UnexpectedMessage("Login"));
            }
            Ok(Message::ChangeTile { .. }) => {
                break escalate(&writer, ClientError::UnexpectedMessage("ChangeTile"));
            }
            Err(err) => {
                break escalate(&writer, err);
            }
        }
    };

    writer.lock().unwrap().shutdown();
    state.set(SessionState::Terminated);
    tracing::debug!("session terminated: {:?}", exit);
    exit
}

/// Fatal-path escalation: one best-effort outbound `Error` so the server
/// hears why this client is about to vanish. The send shares the session's
/// writer lock; contention doesn't matter, the session is shutting down.
fn escalate(writer: &Arc<Mutex<ConnectionWriter>>, err: ClientError) -> SessionExit {
    let notice = Message::Error {
        reason: format!("client transport failure: {err}"),
    };
    if let Err(send_err) = writer.lock().unwrap().send(&notice) {
        tracing::warn!("error escalation failed: {}", send_err);
    }
    SessionExit::Transport(err)
}

/// Wall-clock milliseconds since the Unix epoch, for tile timestamps.
#[expect(clippy::cast_possible_truncation)]
fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_or(0, |d| d.as_millis() as u64)
}
