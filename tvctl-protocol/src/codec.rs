//! Newline framing for the command and broadcast ports.

use crate::command::Command;
use crate::error::ProtocolError;
use crate::MAX_LINE_LENGTH;
use bytes::{BufMut, BytesMut};

/// Encodes requests and responses as newline-terminated lines.
pub struct Encoder;

impl Encoder {
    /// Encodes a command as its decimal wire code.
    pub fn encode_command(command: Command) -> BytesMut {
        Self::encode_line(&command.code().to_string())
    }

    /// Encodes a text line.
    ///
    /// Embedded line breaks are replaced with spaces so a response always
    /// occupies exactly one line on the wire.
    pub fn encode_line(text: &str) -> BytesMut {
        let mut buf = BytesMut::with_capacity(text.len() + 1);
        for (i, part) in text.split(|c| c == '\r' || c == '\n').enumerate() {
            if i > 0 {
                buf.put_u8(b' ');
            }
            buf.put_slice(part.as_bytes());
        }
        buf.put_u8(b'\n');
        buf
    }
}

/// Parses one request line into a command.
///
/// Surrounding whitespace is ignored; anything that is not a decimal integer
/// naming a known command is rejected.
pub fn parse_command(line: &str) -> Result<Command, ProtocolError> {
    let trimmed = line.trim();
    let code: i64 = trimmed
        .parse()
        .map_err(|_| ProtocolError::MalformedLine(trimmed.to_string()))?;
    Command::from_code(code)
}

/// Splits buffered input into lines.
pub struct Decoder {
    buffer: BytesMut,
    max_line_length: usize,
}

impl Decoder {
    pub fn new() -> Self {
        Self::with_max_line_length(MAX_LINE_LENGTH)
    }

    pub fn with_max_line_length(max_line_length: usize) -> Self {
        Self {
            buffer: BytesMut::with_capacity(1024),
            max_line_length,
        }
    }

    /// Appends data to the internal buffer.
    pub fn extend(&mut self, data: &[u8]) {
        self.buffer.extend_from_slice(data);
    }

    /// Attempts to take the next complete line from the buffer.
    ///
    /// The trailing `\n` (and `\r`, if present) is removed.
    pub fn decode_line(&mut self) -> Result<Option<String>, ProtocolError> {
        match self.buffer.iter().position(|&b| b == b'\n') {
            Some(pos) => {
                if pos > self.max_line_length {
                    return Err(ProtocolError::LineTooLong {
                        len: pos,
                        max: self.max_line_length,
                    });
                }
                let line = self.buffer.split_to(pos + 1);
                let mut content = &line[..pos];
                if let Some(stripped) = content.strip_suffix(b"\r") {
                    content = stripped;
                }
                let text = std::str::from_utf8(content).map_err(|_| ProtocolError::InvalidUtf8)?;
                Ok(Some(text.to_string()))
            }
            None if self.buffer.len() > self.max_line_length => Err(ProtocolError::LineTooLong {
                len: self.buffer.len(),
                max: self.max_line_length,
            }),
            None => Ok(None),
        }
    }

    /// Attempts to decode the next command from the buffer.
    pub fn decode_command(&mut self) -> Result<Option<Command>, ProtocolError> {
        match self.decode_line()? {
            Some(line) => parse_command(&line).map(Some),
            None => Ok(None),
        }
    }

    /// Returns the number of bytes currently buffered.
    pub fn buffered(&self) -> usize {
        self.buffer.len()
    }

    /// Clears the internal buffer.
    pub fn clear(&mut self) {
        self.buffer.clear();
    }
}

impl Default for Decoder {
    fn default() -> Self {
        Self::new()
    }
}
