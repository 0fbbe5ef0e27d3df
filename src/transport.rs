use std::{
    io::{ErrorKind, Read, Write},
    time::{Duration, Instant},
};

use bytes::BytesMut;
use tokio_util::codec::{Decoder, Encoder};
use tracing::{debug, trace};

use crate::{
    config::{Connector, Link},
    error::{Error, Result},
    protocol::codec::{strip_envelope, LineEncoder, ReadUntil, LINE_TERMINATOR, PROMPT, PROMPT_SEQUENCE},
};

const READ_CHUNK: usize = 256;

/// One open connection to the bridge, used for a single command exchange.
///
/// The link is closed when the session is dropped, whichever way the
/// exchange ends.
pub struct Session {
    link: Box<dyn Link>,
    buffer: BytesMut,
    read_timeout: Duration,
}

impl Session {
    pub fn open(connector: &dyn Connector, read_timeout: Duration) -> Result<Self> {
        Ok(Self {
            link: connector.connect()?,
            buffer: BytesMut::with_capacity(READ_CHUNK),
            read_timeout,
        })
    }

    /// Synchronize with the prompt, send `command` and return the response body
    /// with the prompt and `OK` sentinel removed.
    pub fn exchange(&mut self, command: &str) -> Result<String> {
        self.write_line("")?;

        let prompt = self.read_until(PROMPT)?;
        if &prompt[..] != PROMPT_SEQUENCE.as_bytes() {
            return Err(Error::protocol(format!("prompt not found, got {:?}", String::from_utf8_lossy(&prompt))));
        }

        debug!(command, "sending command");
        self.write_line(command)?;

        // the bridge echoes the command line back
        let echo = [command, LINE_TERMINATOR].concat();
        self.read_until(&echo)?;

        let response = self.read_until(PROMPT_SEQUENCE)?;
        if !response.is_ascii() {
            return Err(Error::protocol(format!("non-ascii response to {command:?}")));
        }

        let response = std::str::from_utf8(&response).map_err(|e| Error::protocol(e.to_string()))?;
        let body = strip_envelope(response);

        debug!(command, response = body, "received response");

        Ok(body.to_string())
    }

    fn write_line(&mut self, line: &str) -> Result<()> {
        let mut buf = BytesMut::new();
        LineEncoder.encode(line, &mut buf)?;

        trace!(bytes = ?&buf[..], "write");

        self.link
            .write_all(&buf)
            .and_then(|_| self.link.flush())
            .map_err(|e| self.io_error(e, "write to complete"))
    }

    /// Read until `delimiter` has been received, returning everything up to
    /// and including it.
    fn read_until(&mut self, delimiter: impl AsRef<[u8]>) -> Result<BytesMut> {
        let mut codec = ReadUntil::new(delimiter.as_ref());
        let started = Instant::now();
        let mut attempted = false;

        loop {
            if let Some(frame) = codec.decode(&mut self.buffer)? {
                trace!(bytes = ?&frame[..], "read");
                return Ok(frame);
            }

            // always give the link one read, whatever the deadline
            if attempted && started.elapsed() >= self.read_timeout {
                return Err(self.timeout(codec.delimiter()));
            }
            attempted = true;

            let mut chunk = [0; READ_CHUNK];
            match self.link.read(&mut chunk) {
                Ok(0) => {
                    return Err(Error::protocol(format!(
                        "link closed while waiting for {}",
                        escape(codec.delimiter())
                    )))
                }
                Ok(n) => self.buffer.extend_from_slice(&chunk[..n]),
                Err(e) if e.kind() == ErrorKind::Interrupted => continue,
                Err(e) if is_timeout(&e) => return Err(self.timeout(codec.delimiter())),
                Err(e) => return Err(Error::Transport(e)),
            }
        }
    }

    fn timeout(&self, delimiter: &[u8]) -> Error {
        Error::Timeout {
            waited: self.read_timeout,
            expected: escape(delimiter),
        }
    }

    fn io_error(&self, e: std::io::Error, expected: &str) -> Error {
        if is_timeout(&e) {
            Error::Timeout {
                waited: self.read_timeout,
                expected: expected.to_string(),
            }
        } else {
            Error::Transport(e)
        }
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        // closing happens when the link is dropped; a failed flush here is not
        // the caller's problem
        let _ = self.link.flush();
        trace!("closing bridge link");
    }
}

fn is_timeout(e: &std::io::Error) -> bool {
    matches!(e.kind(), ErrorKind::TimedOut | ErrorKind::WouldBlock)
}

fn escape(bytes: &[u8]) -> String {
    format!("{:?}", String::from_utf8_lossy(bytes))
}
