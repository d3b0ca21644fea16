use std::str;

use bytes::{BufMut, BytesMut};
use tokio_util::codec::{Decoder, Encoder};
use twoway::find_bytes;

use super::ChannelError;

/// Replies longer than this are treated as a broken stream
pub const MAX_LINE_LENGTH: usize = 64 * 1024;

/// One line read back from the speaker
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Reply {
    /// Terminal token for an accepted command
    Done,
    /// Terminal token for a rejected command
    Error,
    /// Anything else the speaker printed before the terminal token
    Line(String),
}

impl From<&str> for Reply {
    fn from(line: &str) -> Self {
        match line {
            "done" => Reply::Done,
            "error" => Reply::Error,
            line => Reply::Line(line.to_string()),
        }
    }
}

/// Newline delimited commands out, classified reply lines in
#[derive(Debug)]
pub struct ControlCodec {
    max_length: usize,
}

impl ControlCodec {
    pub fn new() -> Self {
        Self::with_max_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_length(max_length: usize) -> Self {
        Self { max_length }
    }
}

impl Default for ControlCodec {
    fn default() -> Self {
        Self::new()
    }
}

impl Decoder for ControlCodec {
    type Item = Reply;
    type Error = ChannelError;

    // Blank lines are dropped, so every item handed back carries content
    fn decode(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, ChannelError> {
        loop {
            let end = match find_bytes(&buf[..], b"\n") {
                Some(end) => end,
                None if buf.len() > self.max_length => {
                    return Err(ChannelError::LineTooLong(self.max_length))
                }
                None => return Ok(None),
            };
            if end > self.max_length {
                return Err(ChannelError::LineTooLong(self.max_length));
            }
            let frame = buf.split_to(end + 1);
            let line = str::from_utf8(&frame[..end]).map_err(|_| ChannelError::InvalidUtf8)?;
            let line = line.trim();
            if !line.is_empty() {
                return Ok(Some(Reply::from(line)));
            }
        }
    }

    fn decode_eof(&mut self, buf: &mut BytesMut) -> Result<Option<Self::Item>, ChannelError> {
        match self.decode(buf)? {
            Some(reply) => Ok(Some(reply)),
            // A partial line at EOF can never be completed
            None if !buf.is_empty() => Err(ChannelError::Closed),
            None => Ok(None),
        }
    }
}

impl Encoder<String> for ControlCodec {
    type Error = ChannelError;

    fn encode(&mut self, command: String, buf: &mut BytesMut) -> Result<(), ChannelError> {
        if command.contains(|c: char| c == '\n' || c == '\r') {
            return Err(ChannelError::InvalidCommand(command));
        }
        buf.reserve(command.len() + 1);
        buf.put_slice(command.as_bytes());
        buf.put_u8(b'\n');
        Ok(())
    }
}
