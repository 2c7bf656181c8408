/// Latest protocol version understood by this codec.
///
/// Sent in the `version` message during the handshake and used to gate the
/// presence and shape of message fields. Serialized as a little-endian
/// 32-bit integer.
///
/// Notable versions:
/// https://developer.bitcoin.org/reference/p2p_networking.html#protocol-versions
pub const PROTOCOL_VERSION: u32 = 70016;

/// Version that allowed more than one address per `addr` message.
pub const MULTIPLE_ADDRESS_VERSION: u32 = 209;

/// Version that added the timestamp to network addresses carried in `addr`.
pub const NET_ADDRESS_TIME_VERSION: u32 = 31402;

/// BIP 31: ping nonce and the `pong` message.
///
/// Defined as *after* this version, unlike every other threshold.
/// https://github.com/bitcoin/bips/blob/master/bip-0031.mediawiki
pub const BIP0031_VERSION: u32 = 60000;

/// BIP 35: the `mempool` message.
pub const BIP0035_VERSION: u32 = 60002;

/// BIP 37: bloom filtering (`filterload`, `filteradd`, `filterclear`,
/// `merkleblock`) and the relay flag in `version`.
pub const BIP0037_VERSION: u32 = 70001;

/// The `reject` message.
pub const REJECT_VERSION: u32 = 70002;

/// BIP 111: the `NODE_BLOOM` service bit.
pub const BIP0111_VERSION: u32 = 70011;

/// BIP 130: the `sendheaders` message.
pub const SEND_HEADERS_VERSION: u32 = 70012;

/// BIP 133: the `feefilter` message.
pub const FEE_FILTER_VERSION: u32 = 70013;

/// The `protoconf` message.
pub const PROTOCONF_VERSION: u32 = 70016;

/// Bytes in a message header: magic (4) + command (12) + length (4) + checksum (4).
pub const MESSAGE_HEADER_SIZE: usize = 24;

/// Bytes appended to the header of an extended message: inner command (12) +
/// payload length (8).
pub const EXTENDED_HEADER_SUFFIX_SIZE: usize = 20;

/// Fixed size of the command field. Shorter commands are zero padded.
pub const COMMAND_SIZE: usize = 12;

/// Length value announcing an extended message.
pub const EXTENDED_LENGTH_MARKER: u32 = 0xffff_ffff;

/// Largest encoding of a varint.
pub const MAX_VAR_INT_PAYLOAD: u64 = 9;

/// Largest user agent accepted in `version` (and reused for other short
/// strings such as stream policy names).
pub const MAX_USER_AGENT_LEN: u64 = 256;

/// Size of a double-SHA256 digest.
pub const HASH_SIZE: usize = 32;

/// Default excessive block size (32 MB), from which message ceilings derive.
pub const DEFAULT_EXCESSIVE_BLOCK_SIZE: u64 = 32_000_000;

/// The genesis block hash for mainnet, in wire (little-endian) byte order.
///
/// Human-readable (big-endian) form:
///
/// ```text
/// 000000000019d6689c085ae165831e934ff763ae46a2a6c172b3f1b60a8ce26f
/// ```
pub const GENESIS_BLOCK_HASH_MAINNET: [u8; 32] = [
    0x6f, 0xe2, 0x8c, 0x0a, 0xb6, 0xf1, 0xb3, 0x72, 0xc1, 0xa6, 0xa2, 0x46, 0xae, 0x63, 0xf7, 0x4f,
    0x93, 0x1e, 0x83, 0x65, 0xe1, 0x5a, 0x08, 0x9c, 0x68, 0xd6, 0x19, 0x00, 0x00, 0x00, 0x00, 0x00,
];

/// Merkle root of the mainnet genesis block, in wire byte order.
pub const GENESIS_MERKLE_ROOT_MAINNET: [u8; 32] = [
    0x3b, 0xa3, 0xed, 0xfd, 0x7a, 0x7b, 0x12, 0xb2, 0x7a, 0xc7, 0x2c, 0x3e, 0x67, 0x76, 0x8f, 0x61,
    0x7f, 0xc8, 0x1b, 0xc3, 0x88, 0x8a, 0x51, 0x32, 0x3a, 0x9f, 0xb8, 0xaa, 0x4b, 0x1e, 0x5e, 0x4a,
];
