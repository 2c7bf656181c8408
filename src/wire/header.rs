use std::io::{self, Read, Write};
use std::str::Utf8Error;

use crate::wire::constants::{
    COMMAND_SIZE, EXTENDED_HEADER_SUFFIX_SIZE, EXTENDED_LENGTH_MARKER, MESSAGE_HEADER_SIZE,
};
use crate::wire::primitive::{read_element, write_element};
use crate::wire::protocol::BitcoinNet;

/// Command announced in the outer header of an extended message.
pub const EXTENDED_COMMAND: &str = "extmsg";

/// Payloads are skipped in chunks of this size, so a forged length never
/// turns into one large allocation.
const DISCARD_CHUNK_SIZE: usize = 10 * 1024;

/// The envelope in front of every payload.
///
/// ```text
/// +------------+--------------+---------------+-------------+
/// | magic (4)  | command (12) | length (4 LE) | checksum(4) |
/// +------------+--------------+---------------+-------------+
/// ```
///
/// When the payload does not fit a 32-bit length the extended form is used:
/// the outer command is `extmsg`, the length is `0xffffffff`, the checksum is
/// zero, and the header is followed by the real command (12) and an 8-byte
/// payload length. No checksum is computed for extended messages.
///
/// Reference:
/// https://developer.bitcoin.org/reference/p2p_networking.html#message-headers
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MessageHeader {
    pub magic: BitcoinNet,
    /// The command of the payload, zero padded. For extended messages this is
    /// the inner command, not `extmsg`.
    pub command: [u8; COMMAND_SIZE],
    pub length: u32,
    pub checksum: [u8; 4],
    pub ext_length: Option<u64>,
}

/// Returns true if a payload of `len` bytes needs the extended header.
pub fn needs_extended_header(len: u64) -> bool {
    len >= u64::from(EXTENDED_LENGTH_MARKER)
}

/// Zero pads `command` into the fixed-size header field.
///
/// Callers check the length first; anything past 12 bytes is cut off.
pub fn pad_command(command: &str) -> [u8; COMMAND_SIZE] {
    let mut padded = [0u8; COMMAND_SIZE];
    let n = command.len().min(COMMAND_SIZE);
    padded[..n].copy_from_slice(&command.as_bytes()[..n]);
    padded
}

impl MessageHeader {
    /// Header for a payload of `payload_len` bytes, picking the extended
    /// form when the length does not fit in 32 bits. `checksum` is ignored
    /// for extended headers.
    pub fn new(magic: BitcoinNet, command: &str, payload_len: u64, checksum: [u8; 4]) -> Self {
        if needs_extended_header(payload_len) {
            return Self {
                magic,
                command: pad_command(command),
                length: EXTENDED_LENGTH_MARKER,
                checksum: [0; 4],
                ext_length: Some(payload_len),
            };
        }

        Self {
            magic,
            command: pad_command(command),
            length: payload_len as u32,
            checksum,
            ext_length: None,
        }
    }

    pub fn is_extended(&self) -> bool {
        self.ext_length.is_some()
    }

    /// The number of payload bytes that follow the header.
    pub fn payload_length(&self) -> u64 {
        self.ext_length.unwrap_or(u64::from(self.length))
    }

    /// The command with its zero padding stripped.
    ///
    /// Fails if the bytes are not valid UTF-8.
    pub fn command_str(&self) -> Result<&str, Utf8Error> {
        let end = self
            .command
            .iter()
            .rposition(|&b| b != 0)
            .map_or(0, |i| i + 1);
        std::str::from_utf8(&self.command[..end])
    }

    /// Bytes this header occupies on the wire.
    pub fn encoded_len(&self) -> usize {
        if self.is_extended() {
            MESSAGE_HEADER_SIZE + EXTENDED_HEADER_SUFFIX_SIZE
        } else {
            MESSAGE_HEADER_SIZE
        }
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_element(w, &self.magic.0)?;

        match self.ext_length {
            Some(ext_length) => {
                write_element(w, &pad_command(EXTENDED_COMMAND))?;
                write_element(w, &EXTENDED_LENGTH_MARKER)?;
                write_element(w, &[0u8; 4])?;
                write_element(w, &self.command)?;
                write_element(w, &ext_length)
            }
            None => {
                write_element(w, &self.command)?;
                write_element(w, &self.length)?;
                write_element(w, &self.checksum)
            }
        }
    }

    /// Reads a header, including the extended suffix when the outer header
    /// announces one.
    pub fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let magic = BitcoinNet(read_element(r)?);
        let command: [u8; COMMAND_SIZE] = read_element(r)?;
        let length: u32 = read_element(r)?;
        let checksum: [u8; 4] = read_element(r)?;

        let mut header = Self {
            magic,
            command,
            length,
            checksum,
            ext_length: None,
        };

        let is_sentinel = command == pad_command(EXTENDED_COMMAND)
            && length == EXTENDED_LENGTH_MARKER
            && checksum == [0; 4];
        if is_sentinel {
            header.command = read_element(r)?;
            header.ext_length = Some(read_element(r)?);
        }

        Ok(header)
    }
}

/// Reads and drops `n` bytes from `r`, at most 10 KiB at a time.
pub fn discard_input<R: Read + ?Sized>(r: &mut R, n: u64) -> io::Result<()> {
    let mut buf = [0u8; DISCARD_CHUNK_SIZE];
    let mut remaining = n;

    while remaining > 0 {
        let chunk = remaining.min(DISCARD_CHUNK_SIZE as u64) as usize;
        r.read_exact(&mut buf[..chunk])?;
        remaining -= chunk as u64;
    }

    Ok(())
}
