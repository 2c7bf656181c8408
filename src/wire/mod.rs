//! Bitcoin SV P2P wire protocol.
//!
//! This module encodes and decodes peer-to-peer messages to and from any
//! byte stream.
//!
//! It implements:
//! - The 24-byte message header, and the extended header used for payloads
//!   of 4 GiB and more
//! - Checksum verification and size limits derived from the excessive block
//!   size
//! - A closed registry of every known command, each with its own payload type
//! - A hook for streaming selected commands through caller supplied handlers
//!
//! [`WireCodec`] is the entry point. Payload types implement [`Payload`] and
//! convert into the [`Message`] enum.
//!
//! Protocol reference:
//! https://developer.bitcoin.org/reference/p2p_networking.html
pub mod codec;
pub mod header;
pub mod message;

pub mod block;
pub mod inventory;
pub mod message_auth;
pub mod message_blockdata;
pub mod message_bloom;
pub mod message_filter;
pub mod message_network;
pub mod message_stream;
pub mod net_address;
pub mod tx;

pub mod bounded;
pub mod constants;
pub mod error;
pub mod limits;
pub mod primitive;
pub mod protocol;

#[cfg(test)]
mod test_util;

pub use codec::{Decoded, ExternalHandler, WireCodec};
pub use error::{UnknownCommand, WireError};
pub use header::MessageHeader;
pub use limits::{set_limits, Limits, MessageEncoding, WireParams};
pub use message::{make_empty_message, Command, Message, Payload};
pub use protocol::{BitcoinNet, Services};
