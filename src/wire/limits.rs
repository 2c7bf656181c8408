//! Payload ceilings derived from the excessive block size, and the per-call
//! parameters every codec operation reads.

use std::sync::atomic::{AtomicU64, Ordering};

use crate::wire::constants::{DEFAULT_EXCESSIVE_BLOCK_SIZE, HASH_SIZE, PROTOCOL_VERSION};

/// Process-wide excessive block size used by [`Limits::global`].
static EXCESSIVE_BLOCK_SIZE: AtomicU64 = AtomicU64::new(DEFAULT_EXCESSIVE_BLOCK_SIZE);

/// Smallest possible transaction: version (4) + two zero varints (2) + lock
/// time (4).
const MIN_TX_PAYLOAD: u64 = 10;

/// Smallest possible transaction input: outpoint (32 + 4) + empty script
/// varint (1) + sequence (4).
const MIN_TX_IN_PAYLOAD: u64 = HASH_SIZE as u64 + 4 + 1 + 4;

/// Smallest possible transaction output: value (8) + empty script varint (1).
const MIN_TX_OUT_PAYLOAD: u64 = 9;

/// Sets the process-wide excessive block size.
///
/// Intended to be called once at startup; later calls replace the value
/// (last write wins). Codecs built from [`WireParams::new`] pick it up, codecs
/// built with explicit [`Limits`] are unaffected.
pub fn set_limits(excessive_block_size: u64) {
    EXCESSIVE_BLOCK_SIZE.store(excessive_block_size, Ordering::Release);
}

/// Message size limits, all derived from the excessive block size.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    pub excessive_block_size: u64,
}

impl Default for Limits {
    fn default() -> Self {
        Self::new(DEFAULT_EXCESSIVE_BLOCK_SIZE)
    }
}

impl Limits {
    pub const fn new(excessive_block_size: u64) -> Self {
        Self {
            excessive_block_size,
        }
    }

    /// Limits built from the value last passed to [`set_limits`].
    pub fn global() -> Self {
        Self::new(EXCESSIVE_BLOCK_SIZE.load(Ordering::Acquire))
    }

    /// Absolute ceiling for any message payload: `floor(ebs / 1e6) * 2 MiB`.
    pub fn max_message_payload(&self) -> u64 {
        (self.excessive_block_size / 1_000_000).saturating_mul(1024 * 1024 * 2)
    }

    /// Largest serialized block.
    pub fn max_block_payload(&self) -> u64 {
        self.excessive_block_size
    }

    /// Upper bound on the number of transactions a block can hold.
    pub fn max_tx_per_block(&self) -> u64 {
        self.max_block_payload() / MIN_TX_PAYLOAD + 1
    }

    /// Upper bound on merkle block flag bytes: one bit per transaction.
    pub fn max_flags_per_merkle_block(&self) -> u64 {
        self.max_tx_per_block() / 8
    }

    /// Upper bound on inputs of a single transaction.
    pub fn max_tx_in_per_message(&self) -> u64 {
        self.max_message_payload() / MIN_TX_IN_PAYLOAD + 1
    }

    /// Upper bound on outputs of a single transaction.
    pub fn max_tx_out_per_message(&self) -> u64 {
        self.max_message_payload() / MIN_TX_OUT_PAYLOAD + 1
    }
}

/// Wire encoding variant. Only the base encoding exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum MessageEncoding {
    #[default]
    Base,
}

/// Most recently specified encoding.
pub const LATEST_ENCODING: MessageEncoding = MessageEncoding::Base;

/// Inputs shared by every encode/decode call: the negotiated protocol version,
/// the encoding and the size limits in force.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WireParams {
    pub pver: u32,
    pub encoding: MessageEncoding,
    pub limits: Limits,
}

impl WireParams {
    /// Parameters for `pver` using the process-wide limits.
    pub fn new(pver: u32) -> Self {
        Self::with_limits(pver, Limits::global())
    }

    pub fn with_limits(pver: u32, limits: Limits) -> Self {
        Self {
            pver,
            encoding: LATEST_ENCODING,
            limits,
        }
    }

    /// Same limits and encoding at another protocol version.
    pub fn at_version(self, pver: u32) -> Self {
        Self { pver, ..self }
    }
}

impl Default for WireParams {
    fn default() -> Self {
        Self::new(PROTOCOL_VERSION)
    }
}
