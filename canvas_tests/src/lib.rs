// Test-only canvas server for client integration tests.
//
// `TestServer` speaks the server side of the protocol over real TCP so the
// client core can be exercised end-to-end: login handshake, full board
// sync, tile-change echo and broadcast, scripted error injection, and raw
// garbage for the fatal-decode path. It is test tooling, not a server
// product — the authoritative server is out of scope for this workspace.
//
// Architecture: thread-per-reader with a central `mpsc` channel, the same
// shape as the client it tests.
// - **Listener thread**: accepts TCP connections, forwards them as events.
// - **Reader threads** (one per client): framed reads, deserialize
//   `Message`, forward to the main thread. On error/EOF, report a
//   disconnect.
// - **Main thread**: owns the authoritative `Board` and every client's
//   write half. Handles the login handshake, applies `ChangeTile`,
//   broadcasts `TileChanged`, and services scripted pushes from the test.
//
// Every message a client sends (including the `Login` handshake and any
// `Error` escalation) is appended to a shared log the test can inspect.

use std::collections::BTreeMap;
use std::io::{self, BufReader, BufWriter};
use std::net::{SocketAddr, TcpListener, TcpStream};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, Sender};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::{Duration, Instant};

use mosaic_protocol::board::Board;
use mosaic_protocol::framing::{read_message, write_message};
use mosaic_protocol::message::Message;

/// Default timeout for blocking wait helpers.
pub const POLL_TIMEOUT: Duration = Duration::from_secs(5);

/// Sleep duration between poll attempts.
pub const POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Events funneled into the server's main thread.
enum ServerEvent {
    NewConnection {
        stream: TcpStream,
    },
    MessageFrom {
        client_id: u32,
        message: Message,
    },
    Disconnected {
        client_id: u32,
    },
    /// Scripted: send `message` to one client, bypassing server logic.
    Push {
        client_id: u32,
        message: Message,
    },
    /// Scripted: send a well-framed payload that is not a `Message`.
    PushGarbage {
        client_id: u32,
    },
}

/// Handle to a running test server.
pub struct TestServer {
    addr: SocketAddr,
    tx: Sender<ServerEvent>,
    received: Arc<Mutex<Vec<(u32, Message)>>>,
    initial_board: Board,
    keep_running: Arc<AtomicBool>,
    thread: Option<thread::JoinHandle<()>>,
}

impl TestServer {
    /// Start a server with an all-blank board of the given dimension.
    pub fn start(dim: u16) -> io::Result<TestServer> {
        TestServer::start_with_board(Board::blank(dim))
    }

    /// Start a server whose authoritative board is pre-populated — for
    /// exercising the full-sync path against a non-trivial snapshot.
    pub fn start_with_board(board: Board) -> io::Result<TestServer> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let addr = listener.local_addr()?;
        let keep_running = Arc::new(AtomicBool::new(true));
        let received = Arc::new(Mutex::new(Vec::new()));
        let (tx, rx) = mpsc::channel();

        // Listener thread: accepts new connections.
        listener.set_nonblocking(true)?;
        let keep_running_listener = keep_running.clone();
        let tx_listener = tx.clone();
        thread::spawn(move || {
            while keep_running_listener.load(Ordering::SeqCst) {
                match listener.accept() {
                    Ok((stream, _addr)) => {
                        stream.set_nonblocking(false).ok();
                        let _ = tx_listener.send(ServerEvent::NewConnection { stream });
                    }
                    Err(ref e) if e.kind() == io::ErrorKind::WouldBlock => {
                        thread::sleep(Duration::from_millis(10));
                    }
                    Err(_) => break,
                }
            }
        });

        let initial_board = board.clone();
        let thread = {
            let keep_running = keep_running.clone();
            let received = received.clone();
            let tx = tx.clone();
            thread::spawn(move || run_server(board, rx, tx, received, keep_running))
        };

        Ok(TestServer {
            addr,
            tx,
            received,
            initial_board,
            keep_running,
            thread: Some(thread),
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    /// The board the server was started with — what a freshly synchronized
    /// client must agree with.
    pub fn initial_board(&self) -> &Board {
        &self.initial_board
    }

    /// Script a server-initiated message to one client (clients are
    /// numbered from 0 in connection order).
    pub fn push(&self, client_id: u32, message: Message) {
        let _ = self.tx.send(ServerEvent::Push { client_id, message });
    }

    /// Script a framed-but-undecodable payload to one client.
    pub fn push_garbage(&self, client_id: u32) {
        let _ = self.tx.send(ServerEvent::PushGarbage { client_id });
    }

    /// Everything clients have sent, in arrival order.
    pub fn received(&self) -> Vec<(u32, Message)> {
        self.received.lock().unwrap().clone()
    }

    /// Block until the received log satisfies `pred`, or panic after
    /// `POLL_TIMEOUT`.
    pub fn wait_received<F>(&self, what: &str, pred: F)
    where
        F: Fn(&[(u32, Message)]) -> bool,
    {
        let start = Instant::now();
        loop {
            if pred(&self.received.lock().unwrap()) {
                return;
            }
            assert!(
                start.elapsed() < POLL_TIMEOUT,
                "timed out waiting for {what}; received: {:?}",
                self.received()
            );
            thread::sleep(POLL_INTERVAL);
        }
    }

    /// Shut the server down and join its threads.
    pub fn stop(mut self) {
        self.keep_running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.thread.take() {
            let _ = handle.join();
        }
    }
}

/// Main server loop: owns the board and all client write halves.
fn run_server(
    mut board: Board,
    rx: Receiver<ServerEvent>,
    tx: Sender<ServerEvent>,
    received: Arc<Mutex<Vec<(u32, Message)>>>,
    keep_running: Arc<AtomicBool>,
) {
    let mut clients: BTreeMap<u32, BufWriter<TcpStream>> = BTreeMap::new();
    let mut next_client_id = 0u32;

    while keep_running.load(Ordering::SeqCst) {
        match rx.recv_timeout(Duration::from_millis(50)) {
            Ok(event) => match event {
                ServerEvent::NewConnection { stream } => {
                    if let Some((id, writer)) = handshake(
                        stream,
                        &board,
                        next_client_id,
                        &received,
                        &tx,
                        &keep_running,
                    ) {
                        clients.insert(id, writer);
                        next_client_id += 1;
                    }
                }
                ServerEvent::MessageFrom { client_id, message } => {
                    if let Message::ChangeTile { tile } = &message {
                        board.set_tile(tile.clone());
                        let echo = Message::TileChanged { tile: tile.clone() };
                        for writer in clients.values_mut() {
                            let _ = send(writer, &echo);
                        }
                    }
                    received.lock().unwrap().push((client_id, message));
                }
                ServerEvent::Disconnected { client_id } => {
                    clients.remove(&client_id);
                }
                ServerEvent::Push { client_id, message } => {
                    if let Some(writer) = clients.get_mut(&client_id) {
                        let _ = send(writer, &message);
                    }
                }
                ServerEvent::PushGarbage { client_id } => {
                    if let Some(writer) = clients.get_mut(&client_id) {
                        let _ = write_message(writer, b"this is not a message");
                    }
                }
            },
            Err(mpsc::RecvTimeoutError::Timeout) => {}
            Err(mpsc::RecvTimeoutError::Disconnected) => break,
        }
    }
}

/// Handle a new connection: expect `Login` first, reply with
/// `LoginSuccess` and the full board snapshot, then spawn a reader thread.
/// Returns the client's id and write half, or `None` if the handshake
/// failed.
fn handshake(
    stream: TcpStream,
    board: &Board,
    client_id: u32,
    received: &Arc<Mutex<Vec<(u32, Message)>>>,
    tx: &Sender<ServerEvent>,
    keep_running: &Arc<AtomicBool>,
) -> Option<(u32, BufWriter<TcpStream>)> {
    stream
        .set_read_timeout(Some(Duration::from_secs(5)))
        .ok()?;
    let mut reader = BufReader::new(stream.try_clone().ok()?);

    let login_bytes = read_message(&mut reader).ok()?;
    let login: Message = serde_json::from_slice(&login_bytes).ok()?;
    let username = match &login {
        Message::Login { username } => username.clone(),
        _ => return None,
    };
    received.lock().unwrap().push((client_id, login));

    let mut writer = BufWriter::new(stream.try_clone().ok()?);
    send(
        &mut writer,
        &Message::LoginSuccess {
            info: format!("welcome, {username}"),
        },
    )
    .ok()?;
    send(
        &mut writer,
        &Message::Board {
            board: board.clone(),
        },
    )
    .ok()?;

    // Clear the handshake timeout for the long-lived reader loop.
    stream.set_read_timeout(None).ok();
    let tx_reader = tx.clone();
    let keep_running_reader = keep_running.clone();
    thread::spawn(move || {
        reader_loop(reader, client_id, tx_reader, keep_running_reader);
    });

    Some((client_id, writer))
}

/// Reader loop for one client. Runs in its own thread.
fn reader_loop(
    mut reader: BufReader<TcpStream>,
    client_id: u32,
    tx: Sender<ServerEvent>,
    keep_running: Arc<AtomicBool>,
) {
    while keep_running.load(Ordering::SeqCst) {
        match read_message(&mut reader) {
            Ok(bytes) => match serde_json::from_slice::<Message>(&bytes) {
                Ok(message) => {
                    let _ = tx.send(ServerEvent::MessageFrom { client_id, message });
                }
                Err(_) => {
                    let _ = tx.send(ServerEvent::Disconnected { client_id });
                    break;
                }
            },
            Err(_) => {
                let _ = tx.send(ServerEvent::Disconnected { client_id });
                break;
            }
        }
    }
}

/// Serialize a `Message` and write it with length-delimited framing.
fn send(writer: &mut BufWriter<TcpStream>, msg: &Message) -> io::Result<()> {
    let json = serde_json::to_vec(msg).map_err(io::Error::other)?;
    write_message(writer, &json)
}
