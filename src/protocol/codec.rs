use bytes::{BufMut, BytesMut};
use const_format::concatcp;
use tokio_util::codec::{Decoder, Encoder};

pub const LINE_TERMINATOR: &str = "\r\n";
pub const PROMPT: &str = ">";

/// Sent by the bridge at the end of every response, and in reply to an empty line.
pub const PROMPT_SEQUENCE: &str = concatcp!(LINE_TERMINATOR, PROMPT);

/// Appended by the bridge to the body of a successful response.
pub const OK_SENTINEL: &str = concatcp!("OK", LINE_TERMINATOR);

/// Splits off everything up to and including the first occurrence of a delimiter.
///
/// Bytes after the delimiter stay in the buffer for the next read.
pub struct ReadUntil {
    delimiter: Vec<u8>,
    searched: usize,
}

impl ReadUntil {
    pub fn new(delimiter: impl Into<Vec<u8>>) -> Self {
        Self {
            delimiter: delimiter.into(),
            searched: 0,
        }
    }

    pub fn delimiter(&self) -> &[u8] {
        &self.delimiter
    }
}

impl Decoder for ReadUntil {
    type Item = BytesMut;

    type Error = std::io::Error;

    fn decode(&mut self, src: &mut BytesMut) -> Result<Option<Self::Item>, Self::Error> {
        let len = self.delimiter.len();

        if src.len() < len {
            return Ok(None);
        }

        // resume where the previous call stopped, backing up in case the
        // delimiter straddles the old end of the buffer
        let start = self.searched.saturating_sub(len - 1);

        match src[start..].windows(len).position(|window| window == &self.delimiter[..]) {
            Some(idx) => {
                self.searched = 0;
                Ok(Some(src.split_to(start + idx + len)))
            }
            None => {
                self.searched = src.len();
                Ok(None)
            }
        }
    }
}

/// Encodes a command as a single terminated line.
pub struct LineEncoder;

impl Encoder<&str> for LineEncoder {
    type Error = std::io::Error;

    fn encode(&mut self, line: &str, dst: &mut BytesMut) -> Result<(), Self::Error> {
        dst.reserve(line.len() + LINE_TERMINATOR.len());
        dst.put(line.as_bytes());
        dst.put(LINE_TERMINATOR.as_bytes());

        Ok(())
    }
}

/// Remove the trailing prompt and the `OK` sentinel from a response.
pub fn strip_envelope(response: &str) -> &str {
    let response = response.strip_suffix(PROMPT).unwrap_or(response);
    response.strip_suffix(OK_SENTINEL).unwrap_or(response)
}
