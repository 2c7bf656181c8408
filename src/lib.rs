//! Codec for the Bitcoin SV peer-to-peer wire protocol.
//!
//! ```
//! use std::io::Cursor;
//! use bsv_wire::wire::message_network::Ping;
//! use bsv_wire::wire::{BitcoinNet, Message, WireCodec};
//!
//! let codec = WireCodec::new(BitcoinNet::MAIN_NET);
//!
//! let mut frame = Vec::new();
//! codec.write_message(&mut frame, &Ping::new(123123).into()).unwrap();
//!
//! let (msg, payload) = codec.read_message(&mut Cursor::new(frame)).unwrap();
//! assert_eq!(msg, Message::Ping(Ping::new(123123)));
//! assert_eq!(payload, [0xf3, 0xe0, 0x01, 0, 0, 0, 0, 0]);
//! ```
pub mod wire;
