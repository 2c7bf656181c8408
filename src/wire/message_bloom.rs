//! BIP 37 connection Bloom filtering.

use std::io::{Read, Write};

use crate::wire::block::BlockHeader;
use crate::wire::bounded::{check_count, push_bounded, read_list, write_count};
use crate::wire::constants::{BIP0037_VERSION, MAX_VAR_INT_PAYLOAD};
use crate::wire::error::{message_error, WireError};
use crate::wire::limits::{Limits, WireParams};
use crate::wire::message::Payload;
use crate::wire::primitive::{read_element, read_var_bytes, write_element, write_var_bytes};
use crate::wire::protocol::enforce_min_version;

/// Largest element `filteradd` may add.
pub const MAX_FILTER_ADD_DATA_SIZE: u64 = 520;

/// Largest filter `filterload` may install.
pub const MAX_FILTER_LOAD_FILTER_SIZE: u64 = 36_000;

/// Most hash functions a loaded filter may use.
pub const MAX_FILTER_LOAD_HASH_FUNCS: u32 = 50;

/// How a matching output updates the filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct BloomUpdateType(pub u8);

impl BloomUpdateType {
    pub const NONE: BloomUpdateType = BloomUpdateType(0);
    pub const ALL: BloomUpdateType = BloomUpdateType(1);
    /// Only for outputs paying to a public key or multisig script.
    pub const P2PUBKEY_ONLY: BloomUpdateType = BloomUpdateType(2);
}

/// Adds one element to the loaded filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterAdd {
    pub data: Vec<u8>,
}

impl FilterAdd {
    pub fn new(data: Vec<u8>) -> Self {
        Self { data }
    }
}

impl Payload for FilterAdd {
    const COMMAND: &'static str = "filteradd";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filteradd", "FilterAdd.encode")?;
        if self.data.len() as u64 > MAX_FILTER_ADD_DATA_SIZE {
            return Err(message_error(
                "FilterAdd.encode",
                format!(
                    "filteradd size too large for message [size {}, max {MAX_FILTER_ADD_DATA_SIZE}]",
                    self.data.len()
                ),
            ));
        }

        write_var_bytes(w, &self.data)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filteradd", "FilterAdd.decode")?;
        let data = read_var_bytes(r, MAX_FILTER_ADD_DATA_SIZE, "filteradd data")?;
        Ok(Self { data })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_VAR_INT_PAYLOAD + MAX_FILTER_ADD_DATA_SIZE
    }
}

/// Removes the loaded filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterClear;

impl Payload for FilterClear {
    const COMMAND: &'static str = "filterclear";

    fn encode<W: Write + ?Sized>(&self, _w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filterclear", "FilterClear.encode")
    }

    fn decode<R: Read + ?Sized>(_r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filterclear", "FilterClear.decode")?;
        Ok(FilterClear)
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        0
    }
}

/// Installs a Bloom filter on the connection.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct FilterLoad {
    pub filter: Vec<u8>,
    pub hash_funcs: u32,
    pub tweak: u32,
    pub flags: BloomUpdateType,
}

impl FilterLoad {
    pub fn new(filter: Vec<u8>, hash_funcs: u32, tweak: u32, flags: BloomUpdateType) -> Self {
        Self {
            filter,
            hash_funcs,
            tweak,
            flags,
        }
    }

    fn check_hash_funcs(&self, operation: &'static str) -> Result<(), WireError> {
        if self.hash_funcs > MAX_FILTER_LOAD_HASH_FUNCS {
            return Err(message_error(
                operation,
                format!(
                    "too many filter hash functions for message [count {}, max {MAX_FILTER_LOAD_HASH_FUNCS}]",
                    self.hash_funcs
                ),
            ));
        }
        Ok(())
    }
}

impl Payload for FilterLoad {
    const COMMAND: &'static str = "filterload";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filterload", "FilterLoad.encode")?;
        if self.filter.len() as u64 > MAX_FILTER_LOAD_FILTER_SIZE {
            return Err(message_error(
                "FilterLoad.encode",
                format!(
                    "filterload filter size too large for message [size {}, max {MAX_FILTER_LOAD_FILTER_SIZE}]",
                    self.filter.len()
                ),
            ));
        }
        self.check_hash_funcs("FilterLoad.encode")?;

        write_var_bytes(w, &self.filter)?;
        write_element(w, &self.hash_funcs)?;
        write_element(w, &self.tweak)?;
        write_element(w, &self.flags.0)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "filterload", "FilterLoad.decode")?;

        let msg = FilterLoad {
            filter: read_var_bytes(r, MAX_FILTER_LOAD_FILTER_SIZE, "filterload filter size")?,
            hash_funcs: read_element(r)?,
            tweak: read_element(r)?,
            flags: BloomUpdateType(read_element(r)?),
        };
        msg.check_hash_funcs("FilterLoad.decode")?;
        Ok(msg)
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        // filter + hash funcs + tweak + flags
        MAX_VAR_INT_PAYLOAD + MAX_FILTER_LOAD_FILTER_SIZE + 4 + 4 + 1
    }
}

/// A block header with the partial merkle tree proving which of its
/// transactions matched the filter.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct MerkleBlock {
    pub header: BlockHeader,
    /// Number of transactions in the block.
    pub transactions: u32,
    pub hashes: Vec<[u8; 32]>,
    pub flags: Vec<u8>,
}

impl MerkleBlock {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            ..Self::default()
        }
    }

    pub fn add_tx_hash(&mut self, hash: [u8; 32], limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.hashes,
            hash,
            limits.max_tx_per_block(),
            "MerkleBlock.add_tx_hash",
            "tx hashes",
        )
    }
}

impl Payload for MerkleBlock {
    const COMMAND: &'static str = "merkleblock";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "merkleblock", "MerkleBlock.encode")?;
        let limits = &params.limits;
        check_count(
            self.flags.len(),
            limits.max_flags_per_merkle_block(),
            "MerkleBlock.encode",
            "flag bytes",
        )?;

        self.header.encode(w)?;
        write_element(w, &self.transactions)?;
        write_count(
            w,
            self.hashes.len(),
            limits.max_tx_per_block(),
            "MerkleBlock.encode",
            "transaction hashes",
        )?;
        for hash in &self.hashes {
            write_element(w, hash)?;
        }
        write_var_bytes(w, &self.flags)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, BIP0037_VERSION, "merkleblock", "MerkleBlock.decode")?;
        let limits = &params.limits;

        let header = BlockHeader::decode(r)?;
        let transactions = read_element(r)?;
        let hashes = read_list(
            r,
            limits.max_tx_per_block(),
            "MerkleBlock.decode",
            "transaction hashes",
            |r| Ok(read_element(r)?),
        )?;
        let flags = read_var_bytes(r, limits.max_flags_per_merkle_block(), "merkle block flags size")?;

        Ok(Self {
            header,
            transactions,
            hashes,
            flags,
        })
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        params.limits.max_block_payload()
    }
}
