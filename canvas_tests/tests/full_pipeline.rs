// End-to-end tests for the client core against the scripted test server.
//
// Each test starts a `TestServer` on a random port, connects one or more
// real `Session`s over TCP, and drives the full protocol: login handshake,
// board synchronization, tile-change echo and broadcast, local input
// rejection, and the fail-fast termination paths.
//
// Board updates are observed through the `BoardEvent` channel observer —
// the same queue-of-updates shape a real rendering thread would consume.

use std::sync::Arc;
use std::sync::mpsc;
use std::thread;
use std::time::{Duration, Instant};

use canvas_tests::TestServer;
use mosaic_client::{
    BoardEvent, ClientError, Connection, ObservableBoard, Session, SessionExit, SessionState,
};
use mosaic_protocol::{Board, Message, Tile, TileColor};

/// Connect a session observing its board through a channel.
fn connect(server: &TestServer, username: &str) -> (Session, mpsc::Receiver<BoardEvent>) {
    let (tx, rx) = mpsc::channel();
    let board = Arc::new(ObservableBoard::new(tx));
    let connection = Connection::open(server.addr()).expect("connect failed");
    let session = Session::login(connection, board, username).expect("login failed");
    (session, rx)
}

/// Poll until `pred` holds, or panic after a deadline.
fn wait_until(what: &str, pred: impl Fn() -> bool) {
    let start = Instant::now();
    while !pred() {
        assert!(
            start.elapsed() < canvas_tests::POLL_TIMEOUT,
            "timed out waiting for {what}"
        );
        thread::sleep(canvas_tests::POLL_INTERVAL);
    }
}

fn wait_synchronized(session: &Session) {
    wait_until("session to synchronize", || {
        session.state() == SessionState::Synchronized
    });
}

/// Receive board events until one matches, or panic after a deadline.
fn expect_event(
    rx: &mpsc::Receiver<BoardEvent>,
    what: &str,
    pred: impl Fn(&BoardEvent) -> bool,
) -> BoardEvent {
    let deadline = Instant::now() + canvas_tests::POLL_TIMEOUT;
    loop {
        let remaining = deadline.saturating_duration_since(Instant::now());
        match rx.recv_timeout(remaining) {
            Ok(event) if pred(&event) => return event,
            Ok(_) => continue,
            Err(_) => panic!("timed out waiting for {what}"),
        }
    }
}

#[test]
fn end_to_end_paint_and_echo() {
    let server = TestServer::start(3).unwrap();
    let (session, rx) = connect(&server, "alice");

    // The handshake logs the Login first.
    server.wait_received("the login", |log| {
        log.iter()
            .any(|(id, msg)| *id == 0 && matches!(msg, Message::Login { username } if username == "alice"))
    });

    // Full sync: the observer learns the shape, then the session counts as
    // synchronized and the local board is 3x3, all blank.
    expect_event(&rx, "board allocation", |e| *e == BoardEvent::Allocated(3));
    wait_synchronized(&session);
    let board = session.board();
    assert_eq!(board.dim(), 3);
    for row in 0..3 {
        for col in 0..3 {
            assert_eq!(board.tile(row, col), Tile::blank(row, col));
        }
    }

    // Paint (1,1) with color code 4 (maroon). The server must observe one
    // whole ChangeTile carrying our username and a real timestamp.
    session.change_tile(1, 1, 4).unwrap();
    server.wait_received("the tile change", |log| {
        log.iter().any(|(_, msg)| {
            matches!(msg, Message::ChangeTile { tile }
                if tile.row == 1 && tile.col == 1
                    && tile.owner == "alice"
                    && tile.color == TileColor::Maroon
                    && tile.timestamp > 0)
        })
    });

    // The echo lands back on the local board and the observer sees it.
    let event = expect_event(&rx, "the tile echo", |e| {
        matches!(e, BoardEvent::TileChanged(tile) if tile.row == 1 && tile.col == 1)
    });
    let BoardEvent::TileChanged(tile) = event else {
        unreachable!()
    };
    assert_eq!(tile.owner, "alice");
    assert_eq!(tile.color, TileColor::Maroon);
    assert_eq!(board.tile(1, 1), tile);

    server.stop();
}

#[test]
fn full_sync_matches_prepopulated_board() {
    let mut board = Board::blank(4);
    board.set_tile(Tile::new(0, 3, "earlier", TileColor::Red, 100));
    board.set_tile(Tile::new(2, 1, "earlier", TileColor::Teal, 200));
    board.set_tile(Tile::new(3, 3, "someone", TileColor::Black, 300));
    let server = TestServer::start_with_board(board).unwrap();

    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    // Every local cell equals the corresponding snapshot cell.
    let local = session.board();
    assert_eq!(local.dim(), 4);
    for tile in server.initial_board().tiles() {
        assert_eq!(local.tile(tile.row, tile.col), *tile);
    }

    server.stop();
}

#[test]
fn second_client_observes_first_clients_change() {
    let server = TestServer::start(3).unwrap();
    let (alice, _alice_rx) = connect(&server, "alice");
    wait_synchronized(&alice);
    let (bob, bob_rx) = connect(&server, "bob");
    wait_synchronized(&bob);

    alice.change_tile(2, 2, 5).unwrap();

    let event = expect_event(&bob_rx, "alice's change at bob", |e| {
        matches!(e, BoardEvent::TileChanged(tile) if tile.row == 2 && tile.col == 2)
    });
    let BoardEvent::TileChanged(tile) = event else {
        unreachable!()
    };
    assert_eq!(tile.owner, "alice");
    assert_eq!(tile.color, TileColor::Red);
    assert_eq!(bob.board().tile(2, 2), tile);

    server.stop();
}

#[test]
fn invalid_color_is_rejected_locally() {
    let server = TestServer::start(2).unwrap();
    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    let err = session.change_tile(0, 0, 99).unwrap_err();
    assert!(matches!(err, ClientError::InvalidColor(99)), "got: {err:?}");

    // Nothing was sent and the session is unaffected.
    thread::sleep(Duration::from_millis(150));
    assert!(
        !server
            .received()
            .iter()
            .any(|(_, msg)| matches!(msg, Message::ChangeTile { .. })),
        "a rejected color must not produce an outbound message"
    );
    assert_eq!(session.state(), SessionState::Synchronized);

    // The session still works afterward.
    session.change_tile(0, 0, 15).unwrap();
    server.wait_received("the valid change", |log| {
        log.iter()
            .any(|(_, msg)| matches!(msg, Message::ChangeTile { tile } if tile.color == TileColor::Fuchsia))
    });

    server.stop();
}

#[test]
fn tile_changed_applies_unconditionally() {
    let server = TestServer::start(2).unwrap();
    let (session, rx) = connect(&server, "alice");
    wait_synchronized(&session);

    // A stale timestamp still overwrites: the transport is ordered and the
    // client performs no conflict resolution of its own.
    let newer = Tile::new(1, 0, "bob", TileColor::Blue, 2000);
    let stale = Tile::new(1, 0, "carol", TileColor::Lime, 1000);
    server.push(0, Message::TileChanged { tile: newer });
    expect_event(&rx, "first update", |e| {
        matches!(e, BoardEvent::TileChanged(t) if t.timestamp == 2000)
    });
    server.push(
        0,
        Message::TileChanged {
            tile: stale.clone(),
        },
    );
    expect_event(&rx, "second update", |e| {
        matches!(e, BoardEvent::TileChanged(t) if t.timestamp == 1000)
    });

    assert_eq!(session.board().tile(1, 0), stale);

    server.stop();
}

#[test]
fn server_error_terminates_session() {
    let server = TestServer::start(2).unwrap();
    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    server.push(
        0,
        Message::Error {
            reason: "the canvas is closed".into(),
        },
    );

    let exit = session.wait();
    match &exit {
        SessionExit::ServerError(reason) => assert_eq!(reason, "the canvas is closed"),
        other => panic!("expected ServerError, got {other:?}"),
    }
    assert_eq!(exit.exit_code(), 1);

    server.stop();
}

#[test]
fn malformed_stream_escalates_once_and_terminates() {
    let server = TestServer::start(2).unwrap();
    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    server.push_garbage(0);

    let exit = session.wait();
    match &exit {
        SessionExit::Transport(ClientError::Decode(_)) => {}
        other => panic!("expected a decode failure, got {other:?}"),
    }
    assert_eq!(exit.exit_code(), 2);

    // Exactly one best-effort Error escalation reaches the server, and
    // nothing else follows it.
    server.wait_received("the error escalation", |log| {
        log.iter().any(|(_, msg)| matches!(msg, Message::Error { .. }))
    });
    thread::sleep(Duration::from_millis(200));
    let errors = server
        .received()
        .iter()
        .filter(|(_, msg)| matches!(msg, Message::Error { .. }))
        .count();
    assert_eq!(errors, 1, "escalation must be sent exactly once");

    server.stop();
}

#[test]
fn unexpected_tag_is_a_protocol_violation() {
    let server = TestServer::start(2).unwrap();
    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    // A server must never send Login. The client treats it like a decode
    // failure: escalate once, terminate.
    server.push(
        0,
        Message::Login {
            username: "impostor".into(),
        },
    );

    let exit = session.wait();
    match &exit {
        SessionExit::Transport(ClientError::UnexpectedMessage("Login")) => {}
        other => panic!("expected UnexpectedMessage, got {other:?}"),
    }
    assert_eq!(exit.exit_code(), 2);

    server.stop();
}

#[test]
fn concurrent_change_tile_sends_are_atomic() {
    let server = TestServer::start(10).unwrap();
    let (session, _rx) = connect(&server, "alice");
    wait_synchronized(&session);

    // Four threads hammer the same session. If two sends ever interleaved
    // their bytes, the server's framed reader would hit garbage and drop
    // the stream — far fewer than 100 messages would arrive whole.
    let session = Arc::new(session);
    let mut workers = Vec::new();
    for t in 0..4u16 {
        let session = session.clone();
        workers.push(thread::spawn(move || {
            for i in 0..25u16 {
                let row = t * 2 + i / 10;
                let col = i % 10;
                let code = u8::try_from(i % 16).unwrap();
                session.change_tile(row, col, code).unwrap();
            }
        }));
    }
    for worker in workers {
        worker.join().unwrap();
    }

    server.wait_received("all 100 tile changes", |log| {
        log.iter()
            .filter(|(_, msg)| matches!(msg, Message::ChangeTile { .. }))
            .count()
            == 100
    });
    assert!(
        server
            .received()
            .iter()
            .all(|(_, msg)| !matches!(msg, Message::Error { .. })),
        "no stream may have been corrupted"
    );

    server.stop();
}

#[test]
fn connecting_to_a_dead_server_fails_fast() {
    // Grab a port the OS just released; nothing is listening there.
    let addr = {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        listener.local_addr().unwrap()
    };

    let err = Connection::open(addr).unwrap_err();
    assert!(matches!(err, ClientError::Io(_)), "got: {err:?}");
}
