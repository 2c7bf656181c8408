use std::io::{self, Read, Write};

use crate::wire::bounded::{check_count, push_bounded, read_count};
use crate::wire::error::WireError;
use crate::wire::limits::{Limits, WireParams};
use crate::wire::message::Payload;
use crate::wire::primitive::{hash256, read_element, write_element, write_varint};
use crate::wire::tx::Tx;

/// Encoded size of a block header.
pub const BLOCK_HEADER_SIZE: usize = 80;

/// A block header (exactly 80 bytes on the wire).
///
/// Layout (little-endian fields):
///
/// ```text
/// 4  bytes  version
/// 32 bytes  previous block hash
/// 32 bytes  merkle root
/// 4  bytes  timestamp (Unix epoch)
/// 4  bytes  nBits (compact target encoding)
/// 4  bytes  nonce
/// ```
///
/// https://developer.bitcoin.org/reference/block_chain.html#block-headers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct BlockHeader {
    pub version: i32,
    pub prev_block: [u8; 32],
    pub merkle_root: [u8; 32],
    pub timestamp: u32,
    pub bits: u32,
    pub nonce: u32,
}

impl BlockHeader {
    pub fn new(
        version: i32,
        prev_block: [u8; 32],
        merkle_root: [u8; 32],
        bits: u32,
        nonce: u32,
    ) -> Self {
        Self {
            version,
            prev_block,
            merkle_root,
            timestamp: 0,
            bits,
            nonce,
        }
    }

    /// Double SHA-256 of the 80 header bytes, in wire (little-endian) byte
    /// order. Reverse it for the form block explorers display.
    pub fn block_hash(&self) -> [u8; 32] {
        let mut bytes = Vec::with_capacity(BLOCK_HEADER_SIZE);
        bytes.extend(&self.version.to_le_bytes());
        bytes.extend(&self.prev_block);
        bytes.extend(&self.merkle_root);
        bytes.extend(&self.timestamp.to_le_bytes());
        bytes.extend(&self.bits.to_le_bytes());
        bytes.extend(&self.nonce.to_le_bytes());

        hash256(&bytes)
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_element(w, &self.version)?;
        write_element(w, &self.prev_block)?;
        write_element(w, &self.merkle_root)?;
        write_element(w, &self.timestamp)?;
        write_element(w, &self.bits)?;
        write_element(w, &self.nonce)
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(Self {
            version: read_element(r)?,
            prev_block: read_element(r)?,
            merkle_root: read_element(r)?,
            timestamp: read_element(r)?,
            bits: read_element(r)?,
            nonce: read_element(r)?,
        })
    }
}

/// A full block as carried by the `block` message.
///
/// ```text
/// block_header      (80 bytes)
/// txn_count         (varint)
/// transactions[]
/// ```
///
/// https://developer.bitcoin.org/reference/block_chain.html#serialized-blocks
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Block {
    pub header: BlockHeader,
    pub transactions: Vec<Tx>,
}

impl Block {
    pub fn new(header: BlockHeader) -> Self {
        Self {
            header,
            transactions: Vec::new(),
        }
    }

    pub fn add_transaction(&mut self, tx: Tx, limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.transactions,
            tx,
            limits.max_tx_per_block(),
            "Block.add_transaction",
            "transactions",
        )
    }

    pub fn block_hash(&self) -> [u8; 32] {
        self.header.block_hash()
    }

    /// Ids of every transaction, in block order.
    pub fn tx_hashes(&self) -> Result<Vec<[u8; 32]>, WireError> {
        self.transactions.iter().map(Tx::tx_hash).collect()
    }
}

impl Payload for Block {
    const COMMAND: &'static str = "block";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        let limits = &params.limits;
        check_count(
            self.transactions.len(),
            limits.max_tx_per_block(),
            "Block.encode",
            "transactions",
        )?;

        self.header.encode(w)?;
        write_varint(w, self.transactions.len() as u64)?;
        for tx in &self.transactions {
            tx.write_to(w, limits)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let limits = &params.limits;
        let header = BlockHeader::decode(r)?;

        let count = read_count(r, limits.max_tx_per_block(), "Block.decode", "transactions")?;
        // Transactions vary in size, so storage grows with what actually arrives.
        let mut transactions = Vec::new();
        for _ in 0..count {
            transactions.push(Tx::read_from(r, limits)?);
        }

        Ok(Self {
            header,
            transactions,
        })
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        params.limits.max_block_payload()
    }
}
