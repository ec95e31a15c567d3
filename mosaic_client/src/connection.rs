// The persistent duplex connection to the server.
//
// `Connection::open` resolves the address and establishes one TCP stream
// for the lifetime of the session. The stream is cloned into a buffered
// reader half and a buffered writer half so that the receive loop can block
// on reads while senders write independently.
//
// `send` is a full envelope per call — serialize, frame, flush — so a
// message is never visible to the peer half-written. `receive` blocks
// until a complete message arrives or the stream fails; no timeout is set,
// because the server either sends events or nothing, and every failure is
// terminal anyway (there is no reconnect).

use std::io::{BufReader, BufWriter};
use std::net::{Shutdown, TcpStream, ToSocketAddrs};

use mosaic_protocol::framing::{read_message, write_message};
use mosaic_protocol::message::Message;

use crate::error::ClientError;

/// A live duplex connection, before the session splits it.
#[derive(Debug)]
pub struct Connection {
    reader: ConnectionReader,
    writer: ConnectionWriter,
}

/// The read half. Owned by the receive loop.
#[derive(Debug)]
pub struct ConnectionReader {
    reader: BufReader<TcpStream>,
}

/// The write half. Owned by the session behind its send lock.
#[derive(Debug)]
pub struct ConnectionWriter {
    writer: BufWriter<TcpStream>,
}

impl Connection {
    /// Resolve `addr` and establish the stream. Failure here is fatal to
    /// client startup — the caller reports it and gives up; nothing retries.
    pub fn open(addr: impl ToSocketAddrs) -> Result<Self, ClientError> {
        let stream = TcpStream::connect(addr)?;
        let reader_stream = stream.try_clone()?;
        Ok(Connection {
            reader: ConnectionReader {
                reader: BufReader::new(reader_stream),
            },
            writer: ConnectionWriter {
                writer: BufWriter::new(stream),
            },
        })
    }

    pub fn send(&mut self, msg: &Message) -> Result<(), ClientError> {
        self.writer.send(msg)
    }

    pub fn receive(&mut self) -> Result<Message, ClientError> {
        self.reader.receive()
    }

    /// Split into the reader half (for the receive-loop thread) and the
    /// writer half (for the session's send lock).
    pub fn into_split(self) -> (ConnectionReader, ConnectionWriter) {
        (self.reader, self.writer)
    }
}

impl ConnectionReader {
    /// Block until one whole message arrives, then decode it.
    pub fn receive(&mut self) -> Result<Message, ClientError> {
        let bytes = read_message(&mut self.reader)?;
        let msg: Message = serde_json::from_slice(&bytes)?;
        tracing::debug!("received frame: {:?}", msg);
        Ok(msg)
    }
}

impl ConnectionWriter {
    /// Serialize, frame, and flush one whole message.
    pub fn send(&mut self, msg: &Message) -> Result<(), ClientError> {
        let json = serde_json::to_vec(msg)?;
        tracing::debug!("sending frame: {:?}", msg);
        write_message(&mut self.writer, &json)?;
        Ok(())
    }

    /// Close the underlying stream in both directions. The receive loop's
    /// blocked read returns with an error shortly after.
    pub fn shutdown(&self) {
        let _ = self.writer.get_ref().shutdown(Shutdown::Both);
    }
}
