//! Message framing: header, checksum and payload dispatch.
//!
//! A frame on the wire is
//!
//! ```text
//! +------------+--------------+---------------+------------+
//! | magic (4)  | command (12) | length (4 LE) | checksum(4)|
//! +------------+--------------+---------------+------------+
//! | payload (length bytes)                            ...  |
//! +----------------------------------------------------------
//! ```
//!
//! with the extended header of [`MessageHeader`] for payloads that do not fit
//! a 32-bit length. The checksum is the first four bytes of
//! `SHA256(SHA256(payload))`.

use std::collections::HashMap;
use std::fmt::{self, Debug, Formatter};
use std::io::{Read, Write};

use tracing::{debug, trace, warn};

use crate::wire::constants::COMMAND_SIZE;
use crate::wire::error::{message_error, WireError};
use crate::wire::header::{discard_input, needs_extended_header, MessageHeader};
use crate::wire::limits::WireParams;
use crate::wire::message::{Command, Message};
use crate::wire::primitive::checksum;
use crate::wire::protocol::BitcoinNet;

/// A message read off the wire.
#[derive(Debug, Clone, PartialEq)]
pub struct Decoded {
    /// Header and payload bytes consumed from the reader.
    pub bytes_read: usize,
    pub message: Message,
    /// The raw payload. Empty when an external handler streamed it.
    pub payload: Vec<u8>,
}

/// Reads the payload of one command in place of the built-in decoder.
///
/// Called with the reader positioned at the start of the payload, the
/// payload length announced in the header and the number of header bytes
/// already read. The handler must consume exactly the payload and report the
/// total bytes read, header included.
pub type ExternalHandler =
    Box<dyn Fn(&mut dyn Read, u64, usize) -> Result<Decoded, WireError> + Send + Sync>;

/// Encodes and decodes framed messages for one network.
pub struct WireCodec {
    network: BitcoinNet,
    params: WireParams,
    handlers: HashMap<String, ExternalHandler>,
}

impl Debug for WireCodec {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut handlers: Vec<&str> = self.handlers.keys().map(String::as_str).collect();
        handlers.sort_unstable();

        f.debug_struct("WireCodec")
            .field("network", &self.network)
            .field("params", &self.params)
            .field("handlers", &handlers)
            .finish()
    }
}

impl WireCodec {
    /// A codec at the latest protocol version using the process-wide limits.
    pub fn new(network: BitcoinNet) -> Self {
        Self::with_params(network, WireParams::default())
    }

    pub fn with_params(network: BitcoinNet, params: WireParams) -> Self {
        Self {
            network,
            params,
            handlers: HashMap::new(),
        }
    }

    pub fn network(&self) -> BitcoinNet {
        self.network
    }

    pub fn params(&self) -> &WireParams {
        &self.params
    }

    /// Switches to the version negotiated in the handshake.
    pub fn set_protocol_version(&mut self, pver: u32) {
        self.params = self.params.at_version(pver);
    }

    /// Routes every incoming `command` to `handler` instead of buffering and
    /// decoding it. Replaces any handler already registered for `command`.
    pub fn register_external_handler<F>(&mut self, command: impl Into<String>, handler: F)
    where
        F: Fn(&mut dyn Read, u64, usize) -> Result<Decoded, WireError> + Send + Sync + 'static,
    {
        self.handlers.insert(command.into(), Box::new(handler));
    }

    pub fn write_message<W: Write + ?Sized>(&self, w: &mut W, msg: &Message) -> Result<(), WireError> {
        self.write_message_n(w, msg).map(|_| ())
    }

    /// Writes `msg` as one frame and returns the number of bytes written.
    ///
    /// Header and payload go out in a single write.
    pub fn write_message_n<W: Write + ?Sized>(
        &self,
        w: &mut W,
        msg: &Message,
    ) -> Result<usize, WireError> {
        let command = msg.command();
        if command.len() > COMMAND_SIZE {
            return Err(message_error(
                "write_message",
                format!("command [{command}] is too long [max {COMMAND_SIZE}]"),
            ));
        }

        let mut payload = Vec::new();
        msg.encode(&mut payload, &self.params)?;
        let len = payload.len() as u64;

        let max = self.params.limits.max_message_payload();
        if len > max {
            return Err(message_error(
                "write_message",
                format!("message payload is too large - encoded {len} bytes, but maximum message payload is {max} bytes"),
            ));
        }

        let max = msg.max_payload_length(&self.params);
        if len > max {
            return Err(message_error(
                "write_message",
                format!("message payload is too large - encoded {len} bytes, but maximum message payload size for messages of type [{command}] is {max}."),
            ));
        }

        let header = self.frame_header(command, len, &payload);

        let mut frame = Vec::with_capacity(header.encoded_len() + payload.len());
        header.encode(&mut frame)?;
        frame.extend_from_slice(&payload);

        w.write_all(&frame)?;

        debug!(
            "Sent {} message ({} byte payload, extended: {})",
            command,
            len,
            header.is_extended()
        );
        Ok(frame.len())
    }

    /// Extended frames carry a zero checksum; every other frame carries the
    /// checksum of `payload`.
    fn frame_header(&self, command: &str, len: u64, payload: &[u8]) -> MessageHeader {
        let sum = if needs_extended_header(len) {
            [0; 4]
        } else {
            checksum(payload)
        };
        MessageHeader::new(self.network, command, len, sum)
    }

    /// Reads one message and its raw payload.
    pub fn read_message<R: Read>(&self, r: &mut R) -> Result<(Message, Vec<u8>), WireError> {
        let decoded = self.read_message_n(r)?;
        Ok((decoded.message, decoded.payload))
    }

    /// Reads one frame and decodes its payload.
    ///
    /// A frame that is rejected after its header was read (wrong network,
    /// unknown command, too large for its type) is skipped in full, so the
    /// next call starts at the following frame.
    pub fn read_message_n<R: Read>(&self, r: &mut R) -> Result<Decoded, WireError> {
        let header = MessageHeader::decode(r)?;
        let mut n = header.encoded_len();
        let length = header.payload_length();

        let max = self.params.limits.max_message_payload();
        if length > max {
            return Err(message_error(
                "read_message",
                format!("message payload is too large - header indicates {length} bytes, but max message payload is {max} bytes."),
            ));
        }

        if header.magic != self.network {
            warn!("Discarding {} byte message from network {}", length, header.magic);
            discard_input(r, length)?;
            return Err(message_error(
                "read_message",
                format!("message from other network [{}]", header.magic),
            ));
        }

        let command = match header.command_str() {
            Ok(command) => command,
            Err(_) => {
                warn!("Discarding {} byte message with invalid command", length);
                discard_input(r, length)?;
                return Err(message_error(
                    "read_message",
                    format!("invalid command {:?}", header.command),
                ));
            }
        };

        let kind = match command.parse::<Command>() {
            Ok(kind) => kind,
            Err(unknown) => {
                warn!("Discarding {} byte message with unknown command [{}]", length, command);
                discard_input(r, length)?;
                return Err(message_error("read_message", unknown.to_string()));
            }
        };

        let max = kind.max_payload_length(&self.params);
        if length > max {
            warn!("Discarding {} byte {} message [max {}]", length, command, max);
            discard_input(r, length)?;
            return Err(message_error(
                "read_message",
                format!("payload exceeds max length - header indicates {length} bytes, but max payload size for messages of type [{command}] is {max}."),
            ));
        }

        if let Some(handler) = self.handlers.get(command) {
            trace!("Passing {} message ({} bytes) to external handler", command, length);
            return handler(r as &mut dyn Read, length, n);
        }

        let size = usize::try_from(length).map_err(|_| {
            message_error(
                "read_message",
                format!("payload of {length} bytes does not fit in memory on this platform"),
            )
        })?;
        let mut payload = vec![0u8; size];
        r.read_exact(&mut payload)?;
        n += payload.len();

        if !header.is_extended() {
            let sum = checksum(&payload);
            if sum != header.checksum {
                return Err(message_error(
                    "read_message",
                    format!(
                        "payload checksum failed - header indicates {:02x?}, but actual checksum is {:02x?}.",
                        header.checksum, sum
                    ),
                ));
            }
        }

        let message = kind.read_payload(&mut payload.as_slice(), &self.params)?;
        debug!(
            "Received {} message ({} byte payload, extended: {})",
            command,
            length,
            header.is_extended()
        );

        Ok(Decoded {
            bytes_read: n,
            message,
            payload,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::block::tests::genesis_header;
    use crate::wire::block::Block;
    use crate::wire::constants::{MESSAGE_HEADER_SIZE, PROTOCOL_VERSION};
    use crate::wire::limits::Limits;
    use crate::wire::message_network::{Ping, Protoconf, Reject, RejectCode, VerAck, Version};
    use crate::wire::net_address::NetAddress;
    use crate::wire::test_util::FixedWriter;
    use crate::wire::tx::{Tx, TxOut};
    use std::io::{Cursor, ErrorKind};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn codec() -> WireCodec {
        WireCodec::with_params(
            BitcoinNet::MAIN_NET,
            WireParams::with_limits(PROTOCOL_VERSION, Limits::default()),
        )
    }

    fn small_codec() -> WireCodec {
        // 2 MiB message ceiling, 1 MB blocks
        WireCodec::with_params(
            BitcoinNet::MAIN_NET,
            WireParams::with_limits(PROTOCOL_VERSION, Limits::new(1_000_000)),
        )
    }

    fn frame(network: BitcoinNet, command: &str, payload: &[u8]) -> Vec<u8> {
        let mut buf = vec![];
        MessageHeader::new(network, command, payload.len() as u64, checksum(payload))
            .encode(&mut buf)
            .unwrap();
        buf.extend_from_slice(payload);
        buf
    }

    fn encode(codec: &WireCodec, msg: impl Into<Message>) -> Vec<u8> {
        let mut buf = vec![];
        codec.write_message(&mut buf, &msg.into()).unwrap();
        buf
    }

    #[test]
    fn verack_frame_bytes() {
        let mut buf = vec![];
        let n = codec()
            .write_message_n(&mut buf, &Message::VerAck(VerAck))
            .unwrap();

        assert_eq!(n, MESSAGE_HEADER_SIZE);
        assert_eq!(
            hex::encode(&buf),
            "e3e1f3e876657261636b000000000000000000005df6e0e2"
        );
    }

    #[test]
    fn messages_round_trip() {
        let codec = codec();

        let mut tx = Tx::new(1);
        tx.add_tx_out(TxOut::new(5_000_000_000, vec![0x51]), &Limits::default())
            .unwrap();
        let mut block = Block::new(genesis_header());
        block.add_transaction(tx.clone(), &Limits::default()).unwrap();

        let version = Version::new(NetAddress::default(), NetAddress::default(), 42, 100);

        let messages: Vec<Message> = vec![
            VerAck.into(),
            Ping::new(0xdead_beef).into(),
            version.into(),
            tx.into(),
            block.into(),
            Protoconf::new(2 * 1024 * 1024, "Default").into(),
            Reject::new("tx", RejectCode::DUST, "dust").into(),
        ];

        for msg in messages {
            let mut buf = vec![];
            let written = codec.write_message_n(&mut buf, &msg).unwrap();
            assert_eq!(written, buf.len());

            let decoded = codec.read_message_n(&mut Cursor::new(&buf)).unwrap();
            assert_eq!(decoded.bytes_read, written, "{}", msg.command());
            assert_eq!(decoded.message, msg);
            assert_eq!(decoded.payload, buf[MESSAGE_HEADER_SIZE..]);
        }
    }

    #[test]
    fn read_message_returns_payload() {
        let codec = codec();
        let buf = encode(&codec, Ping::new(123123));

        let (msg, payload) = codec.read_message(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(msg, Message::Ping(Ping::new(123123)));
        assert_eq!(hex::encode(payload), "f3e0010000000000");
    }

    #[test]
    fn other_network_is_discarded() {
        let codec = codec();
        let mut stream = frame(BitcoinNet::TEST_NET, "ping", &[1, 2, 3, 4, 5, 6, 7, 8]);
        stream.extend(encode(&codec, VerAck));

        let mut cursor = Cursor::new(&stream);
        let err = codec.read_message_n(&mut cursor).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("message from other network"));

        let next = codec.read_message_n(&mut cursor).unwrap();
        assert_eq!(next.message, Message::VerAck(VerAck));
    }

    #[test]
    fn unknown_command_is_discarded() {
        let codec = codec();
        let mut stream = frame(BitcoinNet::MAIN_NET, "wtfmessage", &[1, 2, 3]);
        stream.extend(encode(&codec, Ping::new(9)));

        let mut cursor = Cursor::new(&stream);
        let err = codec.read_message_n(&mut cursor).unwrap_err();
        assert_eq!(err.to_string(), "read_message: unhandled command [wtfmessage]");

        let next = codec.read_message_n(&mut cursor).unwrap();
        assert_eq!(next.message, Message::Ping(Ping::new(9)));
    }

    #[test]
    fn invalid_utf8_command_is_discarded() {
        let codec = codec();
        let mut stream = frame(BitcoinNet::MAIN_NET, "ping", &[0; 8]);
        stream[4] = 0xff;
        stream.extend(encode(&codec, VerAck));

        let mut cursor = Cursor::new(&stream);
        let err = codec.read_message_n(&mut cursor).unwrap_err();
        assert!(err.to_string().contains("invalid command"));
        assert!(codec.read_message_n(&mut cursor).is_ok());
    }

    #[test]
    fn checksum_mismatch() {
        let codec = codec();
        let mut buf = encode(&codec, Ping::new(1));
        buf[20] ^= 0xff;

        let err = codec.read_message_n(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("payload checksum failed"));
    }

    #[test]
    fn payload_over_global_ceiling() {
        let codec = small_codec();
        let mut buf = vec![];
        MessageHeader::new(BitcoinNet::MAIN_NET, "block", 3 * 1024 * 1024, [0; 4])
            .encode(&mut buf)
            .unwrap();

        let err = codec.read_message_n(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.to_string().contains("max message payload is 2097152 bytes"));

        let reject = Reject::new("version", RejectCode::INVALID, "x".repeat(3 * 1024 * 1024));
        let err = codec
            .write_message(&mut Vec::new(), &reject.into())
            .unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn payload_over_type_limit() {
        let codec = codec();
        let mut stream = frame(BitcoinNet::MAIN_NET, "verack", &[0x00]);
        stream.extend(encode(&codec, Ping::new(3)));

        let mut cursor = Cursor::new(&stream);
        let err = codec.read_message_n(&mut cursor).unwrap_err();
        assert!(err.to_string().contains("[verack] is 0"));
        assert_eq!(
            codec.read_message_n(&mut cursor).unwrap().message,
            Message::Ping(Ping::new(3))
        );

        let codec = small_codec();
        let mut tx = Tx::new(1);
        tx.tx_out.push(TxOut::new(1, vec![0; 1_500_000]));
        let err = codec.write_message(&mut Vec::new(), &tx.into()).unwrap_err();
        assert!(err.to_string().contains("messages of type [tx]"));
    }

    #[test]
    fn short_writer_and_reader() {
        let codec = codec();
        let msg = Message::from(Ping::new(5));

        let mut w = FixedWriter::new(10);
        let err = codec.write_message(&mut w, &msg).unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::WriteZero));

        let buf = encode(&codec, Ping::new(5));
        let err = codec
            .read_message_n(&mut Cursor::new(&buf[..buf.len() - 2]))
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::UnexpectedEof));
    }

    #[test]
    fn external_handler_streams_payload() {
        let mut codec = codec();
        let calls = Arc::new(AtomicUsize::new(0));
        let seen = Arc::clone(&calls);

        codec.register_external_handler("block", move |r, len, n| {
            seen.fetch_add(1, Ordering::SeqCst);
            let mut sink = Vec::new();
            r.take(len).read_to_end(&mut sink)?;
            Ok(Decoded {
                bytes_read: n + sink.len(),
                message: Message::Block(Block::new(genesis_header())),
                payload: Vec::new(),
            })
        });

        let stream = frame(BitcoinNet::MAIN_NET, "block", &[0xAA; 100]);
        let decoded = codec.read_message_n(&mut Cursor::new(&stream)).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert_eq!(decoded.bytes_read, stream.len());
        assert!(decoded.payload.is_empty());

        // other commands still use the built-in decoder
        let buf = encode(&codec, VerAck);
        assert!(codec.read_message_n(&mut Cursor::new(&buf)).is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn extended_header_reaches_handler() {
        let limits = Limits::new(10_000_000_000);
        let mut codec = WireCodec::with_params(
            BitcoinNet::STN,
            WireParams::with_limits(PROTOCOL_VERSION, limits),
        );
        codec.register_external_handler("block", |_r, len, n| {
            assert_eq!(len, 1 << 32);
            assert_eq!(n, 44);
            Ok(Decoded {
                bytes_read: n,
                message: Message::Block(Block::default()),
                payload: Vec::new(),
            })
        });

        let mut buf = vec![];
        MessageHeader::new(BitcoinNet::STN, "block", 1 << 32, [0; 4])
            .encode(&mut buf)
            .unwrap();

        let decoded = codec.read_message_n(&mut Cursor::new(&buf)).unwrap();
        assert_eq!(decoded.message.kind(), Command::Block);
    }

    #[test]
    fn send_header_checksum_choice() {
        let codec = codec();
        let payload = [0x01, 0x02, 0x03];

        let plain = codec.frame_header("block", payload.len() as u64, &payload);
        assert!(!plain.is_extended());
        assert_eq!(plain.checksum, checksum(&payload));

        let extended = codec.frame_header("block", 1 << 32, &payload);
        assert!(extended.is_extended());
        assert_eq!(extended.checksum, [0; 4]);
        assert_eq!(extended.payload_length(), 1 << 32);
        assert_eq!(extended.command_str().unwrap(), "block");

        let mut buf = vec![];
        extended.encode(&mut buf).unwrap();
        assert_eq!(buf.len(), extended.encoded_len());
        assert_eq!(&buf[4..10], b"extmsg");
        assert_eq!(buf[20..24], [0; 4]);
    }

    #[cfg(target_pointer_width = "32")]
    #[test]
    fn extended_length_beyond_address_space() {
        let codec = WireCodec::with_params(
            BitcoinNet::MAIN_NET,
            WireParams::with_limits(PROTOCOL_VERSION, Limits::new(10_000_000_000)),
        );
        let mut buf = vec![];
        MessageHeader::new(BitcoinNet::MAIN_NET, "block", 1 << 32, [0; 4])
            .encode(&mut buf)
            .unwrap();

        let err = codec.read_message_n(&mut Cursor::new(&buf)).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("does not fit in memory"));
    }

    #[test]
    fn protocol_version_switch() {
        let mut codec = codec();
        codec.set_protocol_version(60000);
        assert_eq!(codec.params().pver, 60000);

        let buf = encode(&codec, Ping::new(7));
        assert_eq!(buf.len(), MESSAGE_HEADER_SIZE);

        let err = codec
            .write_message(&mut Vec::new(), &Message::from(Reject::default()))
            .unwrap_err();
        assert!(err.is_protocol());
        assert!(format!("{codec:?}").contains("WireCodec"));
    }
}
