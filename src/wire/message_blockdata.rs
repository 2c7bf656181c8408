//! Inventory announcements and chain synchronisation requests.

use std::io::{Read, Write};

use crate::wire::block::{BlockHeader, BLOCK_HEADER_SIZE};
use crate::wire::bounded::{extend_bounded, push_bounded, read_list, write_count};
use crate::wire::constants::{BIP0035_VERSION, HASH_SIZE, MAX_VAR_INT_PAYLOAD};
use crate::wire::error::{message_error, WireError};
use crate::wire::inventory::{InvVect, INV_VECT_SIZE};
use crate::wire::limits::WireParams;
use crate::wire::message::Payload;
use crate::wire::primitive::{read_element, read_varint, write_element, write_varint};
use crate::wire::protocol::enforce_min_version;

/// Most inventory vectors one `inv`, `getdata` or `notfound` may carry.
pub const MAX_INV_PER_MSG: u64 = 50_000;

/// Most locator hashes one `getblocks` or `getheaders` may carry.
pub const MAX_BLOCK_LOCATORS_PER_MSG: u64 = 500;

/// Most headers one `headers` message may carry.
pub const MAX_BLOCK_HEADERS_PER_MSG: u64 = 2000;

macro_rules! inv_list_payload {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub inv_list: Vec<InvVect>,
        }

        impl $name {
            pub fn new() -> Self {
                Self::default()
            }

            pub fn add_inv_vect(&mut self, iv: InvVect) -> Result<(), WireError> {
                push_bounded(
                    &mut self.inv_list,
                    iv,
                    MAX_INV_PER_MSG,
                    concat!(stringify!($name), ".add_inv_vect"),
                    "inventory vectors",
                )
            }

            /// Adds all of `ivs`, or none if they do not fit.
            pub fn add_inv_vects(&mut self, ivs: Vec<InvVect>) -> Result<(), WireError> {
                extend_bounded(
                    &mut self.inv_list,
                    ivs,
                    MAX_INV_PER_MSG,
                    concat!(stringify!($name), ".add_inv_vects"),
                    "inventory vectors",
                )
            }
        }

        impl Payload for $name {
            const COMMAND: &'static str = $command;

            fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
                write_count(
                    w,
                    self.inv_list.len(),
                    MAX_INV_PER_MSG,
                    concat!(stringify!($name), ".encode"),
                    "inventory vectors",
                )?;
                for iv in &self.inv_list {
                    iv.encode(w)?;
                }
                Ok(())
            }

            fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
                let inv_list = read_list(
                    r,
                    MAX_INV_PER_MSG,
                    concat!(stringify!($name), ".decode"),
                    "inventory vectors",
                    |r| Ok(InvVect::decode(r)?),
                )?;
                Ok(Self { inv_list })
            }

            fn max_payload_length(_params: &WireParams) -> u64 {
                MAX_VAR_INT_PAYLOAD + MAX_INV_PER_MSG * INV_VECT_SIZE
            }
        }
    };
}

inv_list_payload!(
    /// Announces objects the sender has.
    Inv,
    "inv"
);

inv_list_payload!(
    /// Requests the objects named by the listed inventory vectors.
    GetData,
    "getdata"
);

inv_list_payload!(
    /// Answers a `getdata` for objects the sender does not have.
    NotFound,
    "notfound"
);

macro_rules! locator_payload {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub protocol_version: u32,
            /// Hashes of known blocks, newest first.
            pub block_locator_hashes: Vec<[u8; 32]>,
            /// Last block wanted; all zero means as many as allowed.
            pub hash_stop: [u8; 32],
        }

        impl $name {
            pub fn new(protocol_version: u32, hash_stop: [u8; 32]) -> Self {
                Self {
                    protocol_version,
                    block_locator_hashes: Vec::new(),
                    hash_stop,
                }
            }

            pub fn add_block_locator_hash(&mut self, hash: [u8; 32]) -> Result<(), WireError> {
                push_bounded(
                    &mut self.block_locator_hashes,
                    hash,
                    MAX_BLOCK_LOCATORS_PER_MSG,
                    concat!(stringify!($name), ".add_block_locator_hash"),
                    "block locator hashes",
                )
            }
        }

        impl Payload for $name {
            const COMMAND: &'static str = $command;

            fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
                write_element(w, &self.protocol_version)?;
                write_count(
                    w,
                    self.block_locator_hashes.len(),
                    MAX_BLOCK_LOCATORS_PER_MSG,
                    concat!(stringify!($name), ".encode"),
                    "block locator hashes",
                )?;
                for hash in &self.block_locator_hashes {
                    write_element(w, hash)?;
                }
                write_element(w, &self.hash_stop)?;
                Ok(())
            }

            fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
                let protocol_version = read_element(r)?;
                let block_locator_hashes = read_list(
                    r,
                    MAX_BLOCK_LOCATORS_PER_MSG,
                    concat!(stringify!($name), ".decode"),
                    "block locator hashes",
                    |r| Ok(read_element(r)?),
                )?;
                let hash_stop = read_element(r)?;

                Ok(Self {
                    protocol_version,
                    block_locator_hashes,
                    hash_stop,
                })
            }

            fn max_payload_length(_params: &WireParams) -> u64 {
                // version + count + locators + stop hash
                4 + MAX_VAR_INT_PAYLOAD
                    + MAX_BLOCK_LOCATORS_PER_MSG * HASH_SIZE as u64
                    + HASH_SIZE as u64
            }
        }
    };
}

locator_payload!(
    /// Asks for an `inv` of the blocks after the locator.
    GetBlocks,
    "getblocks"
);

locator_payload!(
    /// Asks for the `headers` after the locator.
    GetHeaders,
    "getheaders"
);

/// Block headers answering a `getheaders`.
///
/// Each header is followed by a transaction count that is always zero.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Headers {
    pub headers: Vec<BlockHeader>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_block_header(&mut self, header: BlockHeader) -> Result<(), WireError> {
        push_bounded(
            &mut self.headers,
            header,
            MAX_BLOCK_HEADERS_PER_MSG,
            "Headers.add_block_header",
            "block headers",
        )
    }
}

impl Payload for Headers {
    const COMMAND: &'static str = "headers";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_count(
            w,
            self.headers.len(),
            MAX_BLOCK_HEADERS_PER_MSG,
            "Headers.encode",
            "block headers",
        )?;
        for header in &self.headers {
            header.encode(w)?;
            write_varint(w, 0)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        let headers = read_list(
            r,
            MAX_BLOCK_HEADERS_PER_MSG,
            "Headers.decode",
            "block headers",
            |r| {
                let header = BlockHeader::decode(r)?;
                let tx_count = read_varint(r)?;
                if tx_count > 0 {
                    return Err(message_error(
                        "Headers.decode",
                        format!("block headers may not contain transactions [count {tx_count}]"),
                    ));
                }
                Ok(header)
            },
        )?;
        Ok(Self { headers })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_VAR_INT_PAYLOAD + MAX_BLOCK_HEADERS_PER_MSG * (BLOCK_HEADER_SIZE as u64 + 1)
    }
}

/// Asks for the transaction ids in the peer's memory pool (BIP 35).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct MemPool;

impl Payload for MemPool {
    const COMMAND: &'static str = "mempool";

    fn encode<W: Write + ?Sized>(&self, _w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, BIP0035_VERSION, "mempool", "MemPool.encode")
    }

    fn decode<R: Read + ?Sized>(_r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, BIP0035_VERSION, "mempool", "MemPool.decode")?;
        Ok(MemPool)
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        0
    }
}
