//! Transactions in the legacy and the extended (BIP 239) format.
//!
//! Legacy layout:
//!
//! ```text
//! i32       version
//! varint    input count,  then inputs
//! varint    output count, then outputs
//! u32       lock time
//! ```
//!
//! The extended format inserts the marker `00 00 00 00 00 EF` after the
//! version and appends the spent output's value and locking script to every
//! input, so a receiver can validate without looking up the parents.
//!
//! https://github.com/bitcoin-sv/BIPs/blob/master/BIP-0239.mediawiki

use std::io::{Read, Write};

use crate::wire::bounded::{check_count, push_bounded, read_count, write_count};
use crate::wire::error::{message_error, WireError};
use crate::wire::limits::{Limits, WireParams};
use crate::wire::message::Payload;
use crate::wire::primitive::{
    hash256, read_element, read_var_bytes, write_element, write_var_bytes, write_varint,
};

/// Marker that follows the version of an extended transaction.
pub const EXTENDED_TX_MARKER: [u8; 6] = [0x00, 0x00, 0x00, 0x00, 0x00, 0xEF];

/// Sequence number that disables lock time for an input.
pub const MAX_TX_IN_SEQUENCE_NUM: u32 = 0xffff_ffff;

/// The output a transaction input spends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct OutPoint {
    pub hash: [u8; 32],
    pub index: u32,
}

impl OutPoint {
    pub fn new(hash: [u8; 32], index: u32) -> Self {
        Self { hash, index }
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), WireError> {
        write_element(w, &self.hash)?;
        write_element(w, &self.index)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R) -> Result<Self, WireError> {
        Ok(Self {
            hash: read_element(r)?,
            index: read_element(r)?,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxIn {
    pub previous_out_point: OutPoint,
    pub signature_script: Vec<u8>,
    pub sequence: u32,
}

impl TxIn {
    pub fn new(previous_out_point: OutPoint, signature_script: Vec<u8>) -> Self {
        Self {
            previous_out_point,
            signature_script,
            sequence: MAX_TX_IN_SEQUENCE_NUM,
        }
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), WireError> {
        self.previous_out_point.encode(w)?;
        write_var_bytes(w, &self.signature_script)?;
        write_element(w, &self.sequence)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, limits: &Limits) -> Result<Self, WireError> {
        let previous_out_point = OutPoint::decode(r)?;
        let signature_script =
            read_var_bytes(r, limits.max_message_payload(), "transaction input signature script")?;
        let sequence = read_element(r)?;

        Ok(Self {
            previous_out_point,
            signature_script,
            sequence,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct TxOut {
    /// Value in satoshis.
    pub value: i64,
    pub pk_script: Vec<u8>,
}

impl TxOut {
    pub fn new(value: i64, pk_script: Vec<u8>) -> Self {
        Self { value, pk_script }
    }

    fn encode<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), WireError> {
        write_element(w, &self.value)?;
        write_var_bytes(w, &self.pk_script)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, limits: &Limits) -> Result<Self, WireError> {
        let value = read_element(r)?;
        let pk_script =
            read_var_bytes(r, limits.max_message_payload(), "transaction output public key script")?;
        Ok(Self { value, pk_script })
    }
}

/// A transaction in the legacy format, as carried by `tx` and `block`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Tx {
    pub version: i32,
    pub tx_in: Vec<TxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
}

impl Tx {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn add_tx_in(&mut self, tx_in: TxIn, limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.tx_in,
            tx_in,
            limits.max_tx_in_per_message(),
            "Tx.add_tx_in",
            "transaction inputs",
        )
    }

    pub fn add_tx_out(&mut self, tx_out: TxOut, limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.tx_out,
            tx_out,
            limits.max_tx_out_per_message(),
            "Tx.add_tx_out",
            "transaction outputs",
        )
    }

    /// Transaction id: double SHA-256 of the legacy serialization, in wire
    /// byte order.
    pub fn tx_hash(&self) -> Result<[u8; 32], WireError> {
        let mut buf = Vec::with_capacity(self.serialize_size());
        self.write_unchecked(&mut buf)?;
        Ok(hash256(&buf))
    }

    /// Size of the legacy serialization in bytes.
    pub fn serialize_size(&self) -> usize {
        use crate::wire::primitive::varint_serialize_size as vs;

        let ins: usize = self
            .tx_in
            .iter()
            .map(|i| 36 + vs(i.signature_script.len() as u64) + i.signature_script.len() + 4)
            .sum();
        let outs: usize = self
            .tx_out
            .iter()
            .map(|o| 8 + vs(o.pk_script.len() as u64) + o.pk_script.len())
            .sum();

        4 + vs(self.tx_in.len() as u64) + ins + vs(self.tx_out.len() as u64) + outs + 4
    }

    pub(crate) fn write_to<W: Write + ?Sized>(
        &self,
        w: &mut W,
        limits: &Limits,
    ) -> Result<(), WireError> {
        check_count(
            self.tx_in.len(),
            limits.max_tx_in_per_message(),
            "Tx.encode",
            "transaction inputs",
        )?;
        check_count(
            self.tx_out.len(),
            limits.max_tx_out_per_message(),
            "Tx.encode",
            "transaction outputs",
        )?;
        self.write_unchecked(w)
    }

    fn write_unchecked<W: Write + ?Sized>(&self, w: &mut W) -> Result<(), WireError> {
        write_element(w, &self.version)?;

        write_varint(w, self.tx_in.len() as u64)?;
        for tx_in in &self.tx_in {
            tx_in.encode(w)?;
        }

        write_varint(w, self.tx_out.len() as u64)?;
        for tx_out in &self.tx_out {
            tx_out.encode(w)?;
        }

        write_element(w, &self.lock_time)?;
        Ok(())
    }

    pub(crate) fn read_from<R: Read + ?Sized>(r: &mut R, limits: &Limits) -> Result<Self, WireError> {
        let version = read_element(r)?;

        let count = read_count(r, limits.max_tx_in_per_message(), "Tx.decode", "transaction inputs")?;
        let mut tx_in = Vec::new();
        for _ in 0..count {
            tx_in.push(TxIn::decode(r, limits)?);
        }

        let count = read_count(r, limits.max_tx_out_per_message(), "Tx.decode", "transaction outputs")?;
        let mut tx_out = Vec::new();
        for _ in 0..count {
            tx_out.push(TxOut::decode(r, limits)?);
        }

        let lock_time = read_element(r)?;

        Ok(Self {
            version,
            tx_in,
            tx_out,
            lock_time,
        })
    }
}

impl Payload for Tx {
    const COMMAND: &'static str = "tx";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        self.write_to(w, &params.limits)
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        Self::read_from(r, &params.limits)
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        params.limits.max_block_payload()
    }
}

/// An input of an extended transaction: the legacy input plus the output it
/// spends.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedTxIn {
    pub tx_in: TxIn,
    pub previous_satoshis: u64,
    pub previous_locking_script: Vec<u8>,
}

/// A transaction in the extended format.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ExtendedTx {
    pub version: i32,
    pub tx_in: Vec<ExtendedTxIn>,
    pub tx_out: Vec<TxOut>,
    pub lock_time: u32,
}

impl ExtendedTx {
    pub fn new(version: i32) -> Self {
        Self {
            version,
            ..Self::default()
        }
    }

    pub fn add_tx_in(&mut self, tx_in: ExtendedTxIn, limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.tx_in,
            tx_in,
            limits.max_tx_in_per_message(),
            "ExtendedTx.add_tx_in",
            "transaction inputs",
        )
    }

    pub fn add_tx_out(&mut self, tx_out: TxOut, limits: &Limits) -> Result<(), WireError> {
        push_bounded(
            &mut self.tx_out,
            tx_out,
            limits.max_tx_out_per_message(),
            "ExtendedTx.add_tx_out",
            "transaction outputs",
        )
    }

    /// The same transaction without the previous output data.
    pub fn to_tx(&self) -> Tx {
        Tx {
            version: self.version,
            tx_in: self.tx_in.iter().map(|i| i.tx_in.clone()).collect(),
            tx_out: self.tx_out.clone(),
            lock_time: self.lock_time,
        }
    }

    /// The extended format does not change the transaction id.
    pub fn tx_hash(&self) -> Result<[u8; 32], WireError> {
        self.to_tx().tx_hash()
    }
}

impl Payload for ExtendedTx {
    const COMMAND: &'static str = "exttx";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        let limits = &params.limits;

        write_element(w, &self.version)?;
        write_element(w, &EXTENDED_TX_MARKER)?;

        write_count(
            w,
            self.tx_in.len(),
            limits.max_tx_in_per_message(),
            "ExtendedTx.encode",
            "transaction inputs",
        )?;
        for input in &self.tx_in {
            input.tx_in.encode(w)?;
            write_element(w, &input.previous_satoshis)?;
            write_var_bytes(w, &input.previous_locking_script)?;
        }

        write_count(
            w,
            self.tx_out.len(),
            limits.max_tx_out_per_message(),
            "ExtendedTx.encode",
            "transaction outputs",
        )?;
        for tx_out in &self.tx_out {
            tx_out.encode(w)?;
        }

        write_element(w, &self.lock_time)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let limits = &params.limits;

        let version = read_element(r)?;
        let marker: [u8; 6] = read_element(r)?;
        if marker != EXTENDED_TX_MARKER {
            return Err(message_error(
                "ExtendedTx.decode",
                format!("missing extended format marker, found {marker:02x?}"),
            ));
        }

        let count = read_count(
            r,
            limits.max_tx_in_per_message(),
            "ExtendedTx.decode",
            "transaction inputs",
        )?;
        let mut tx_in = Vec::new();
        for _ in 0..count {
            let legacy = TxIn::decode(r, limits)?;
            let previous_satoshis = read_element(r)?;
            let previous_locking_script =
                read_var_bytes(r, limits.max_message_payload(), "previous locking script")?;
            tx_in.push(ExtendedTxIn {
                tx_in: legacy,
                previous_satoshis,
                previous_locking_script,
            });
        }

        let count = read_count(
            r,
            limits.max_tx_out_per_message(),
            "ExtendedTx.decode",
            "transaction outputs",
        )?;
        let mut tx_out = Vec::new();
        for _ in 0..count {
            tx_out.push(TxOut::decode(r, limits)?);
        }

        let lock_time = read_element(r)?;

        Ok(Self {
            version,
            tx_in,
            tx_out,
            lock_time,
        })
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        params.limits.max_block_payload()
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::wire::constants::GENESIS_MERKLE_ROOT_MAINNET;
    use crate::wire::test_util::{FixedReader, FixedWriter};
    use std::io::{Cursor, ErrorKind};

    /// The mainnet genesis coinbase transaction.
    pub(crate) const GENESIS_COINBASE_HEX: &str = concat!(
        "01000000",
        "01",
        "0000000000000000000000000000000000000000000000000000000000000000",
        "ffffffff",
        "4d",
        "04ffff001d0104455468652054696d65732030332f4a616e2f32303039204368",
        "616e63656c6c6f72206f6e206272696e6b206f66207365636f6e64206261696c",
        "6f757420666f722062616e6b73",
        "ffffffff",
        "01",
        "00f2052a01000000",
        "43",
        "4104678afdb0fe5548271967f1a67130b7105cd6a828e03909a67962e0ea1f61",
        "deb649f6bc3f4cef38c4f35504e51ec112de5c384df7ba0b8d578a4c702b6bf1",
        "1d5fac",
        "00000000"
    );

    fn params() -> WireParams {
        WireParams::with_limits(crate::wire::constants::PROTOCOL_VERSION, Limits::default())
    }

    fn sample_tx() -> Tx {
        let limits = Limits::default();
        let mut tx = Tx::new(1);
        tx.add_tx_in(TxIn::new(OutPoint::new([0x11; 32], 3), vec![0x51]), &limits)
            .unwrap();
        tx.add_tx_out(TxOut::new(5_000_000_000, vec![0x76, 0xa9]), &limits)
            .unwrap();
        tx.lock_time = 100;
        tx
    }

    #[test]
    fn genesis_coinbase_decodes_and_hashes_to_merkle_root() {
        let bytes = hex::decode(GENESIS_COINBASE_HEX).unwrap();
        let mut cursor = Cursor::new(&bytes);
        let tx = Tx::decode(&mut cursor, &params()).unwrap();

        assert_eq!(cursor.position() as usize, bytes.len());
        assert_eq!(tx.version, 1);
        assert_eq!(tx.tx_in.len(), 1);
        assert_eq!(tx.tx_in[0].previous_out_point.index, 0xffff_ffff);
        assert_eq!(tx.tx_in[0].signature_script.len(), 0x4d);
        assert_eq!(tx.tx_out[0].value, 5_000_000_000);
        assert_eq!(tx.serialize_size(), bytes.len());
        assert_eq!(tx.tx_hash().unwrap(), GENESIS_MERKLE_ROOT_MAINNET);

        let mut buf = vec![];
        tx.encode(&mut buf, &params()).unwrap();
        assert_eq!(buf, bytes);
    }

    #[test]
    fn extended_format_round_trip_keeps_tx_id() {
        let tx = sample_tx();
        let mut ext = ExtendedTx::new(tx.version);
        ext.add_tx_in(
            ExtendedTxIn {
                tx_in: tx.tx_in[0].clone(),
                previous_satoshis: 6_000_000_000,
                previous_locking_script: vec![0xAC; 25],
            },
            &Limits::default(),
        )
        .unwrap();
        ext.add_tx_out(tx.tx_out[0].clone(), &Limits::default()).unwrap();
        ext.lock_time = tx.lock_time;

        let mut buf = vec![];
        ext.encode(&mut buf, &params()).unwrap();
        assert_eq!(&buf[4..10], &EXTENDED_TX_MARKER);

        let decoded = ExtendedTx::decode(&mut Cursor::new(&buf), &params()).unwrap();
        assert_eq!(decoded, ext);
        assert_eq!(decoded.to_tx(), tx);
        assert_eq!(decoded.tx_hash().unwrap(), tx.tx_hash().unwrap());
    }

    #[test]
    fn extended_decode_rejects_legacy_bytes() {
        let mut buf = vec![];
        sample_tx().encode(&mut buf, &params()).unwrap();

        let err = ExtendedTx::decode(&mut Cursor::new(&buf), &params()).unwrap_err();
        assert!(err.is_protocol());
    }

    #[test]
    fn input_count_over_limit_is_rejected() {
        let limits = Limits::new(1_000_000);
        let params = WireParams::with_limits(70016, limits);

        let mut buf = vec![];
        write_element(&mut buf, &1i32).unwrap();
        write_varint(&mut buf, limits.max_tx_in_per_message() + 1).unwrap();

        let err = Tx::decode(&mut Cursor::new(&buf), &params).unwrap_err();
        assert!(err.is_protocol());
        assert!(err.to_string().contains("transaction inputs"));
    }

    #[test]
    fn script_over_message_ceiling_is_rejected() {
        let limits = Limits::new(1_000_000);
        let params = WireParams::with_limits(70016, limits);

        let mut buf = vec![];
        write_element(&mut buf, &1i32).unwrap();
        buf.push(1);
        buf.extend_from_slice(&[0u8; 36]);
        write_varint(&mut buf, limits.max_message_payload() + 1).unwrap();

        let err = Tx::decode(&mut Cursor::new(&buf), &params).unwrap_err();
        assert!(err.to_string().contains("signature script"));
    }

    #[test]
    fn short_io_is_reported() {
        let tx = sample_tx();
        let mut buf = vec![];
        tx.encode(&mut buf, &params()).unwrap();

        for max in [0, 4, 5, 41, buf.len() - 1] {
            let err = tx.encode(&mut FixedWriter::new(max), &params()).unwrap_err();
            assert_eq!(err.io_kind(), Some(ErrorKind::WriteZero), "write max {max}");

            let err = Tx::decode(&mut FixedReader::new(max, &buf), &params()).unwrap_err();
            assert_eq!(err.io_kind(), Some(ErrorKind::UnexpectedEof), "read max {max}");
        }
    }
}
