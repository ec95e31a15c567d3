// Client error taxonomy.
//
// Four categories, matching how the session reacts:
// - `Io` / `Decode`: fatal while a session runs — the receive loop escalates
//   once and terminates. From `Connection::open`, `Io` means startup failed.
// - `InvalidColor`: recoverable local input rejection; nothing is sent.
// - `UnexpectedMessage`: a tag the server must not send; treated like a
//   decode failure.

use std::io;

#[derive(Debug, thiserror::Error)]
pub enum ClientError {
    #[error("io: {0}")]
    Io(#[from] io::Error),
    #[error("decode: {0}")]
    Decode(#[from] serde_json::Error),
    #[error("invalid color code {0} (expected 0-15)")]
    InvalidColor(u8),
    #[error("protocol violation: unexpected {0} from server")]
    UnexpectedMessage(&'static str),
}
