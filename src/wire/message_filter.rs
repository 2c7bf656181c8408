//! BIP 157 committed filter requests and responses.

use std::fmt::{self, Display, Formatter};
use std::io::{Read, Write};

use crate::wire::bounded::{push_bounded, read_list, write_count};
use crate::wire::constants::{HASH_SIZE, MAX_VAR_INT_PAYLOAD};
use crate::wire::error::{message_error, WireError};
use crate::wire::limits::WireParams;
use crate::wire::message::Payload;
use crate::wire::primitive::{read_element, read_var_bytes, write_element, write_var_bytes};

/// Largest filter one `cfilter` may carry.
pub const MAX_CFILTER_DATA_SIZE: u64 = 256 * 1024;

/// Most filter hashes one `cfheaders` may carry.
pub const MAX_CF_HEADERS_PER_MSG: u64 = 2000;

/// Most checkpoints one `cfcheckpt` may carry.
pub const MAX_CF_CHECKPOINTS_PER_MSG: u64 = 100_000;

const HASH_LEN: u64 = HASH_SIZE as u64;

/// Kind of committed filter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct FilterType(pub u8);

impl FilterType {
    pub const BASIC: FilterType = FilterType(0);
}

impl Display for FilterType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            FilterType::BASIC => write!(f, "BASIC"),
            FilterType(other) => write!(f, "Unknown FilterType ({other})"),
        }
    }
}

macro_rules! range_request_payload {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, PartialEq, Eq, Default)]
        pub struct $name {
            pub filter_type: FilterType,
            pub start_height: u32,
            pub stop_hash: [u8; 32],
        }

        impl $name {
            pub fn new(filter_type: FilterType, start_height: u32, stop_hash: [u8; 32]) -> Self {
                Self {
                    filter_type,
                    start_height,
                    stop_hash,
                }
            }
        }

        impl Payload for $name {
            const COMMAND: &'static str = $command;

            fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
                write_element(w, &self.filter_type.0)?;
                write_element(w, &self.start_height)?;
                write_element(w, &self.stop_hash)?;
                Ok(())
            }

            fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
                Ok(Self {
                    filter_type: FilterType(read_element(r)?),
                    start_height: read_element(r)?,
                    stop_hash: read_element(r)?,
                })
            }

            fn max_payload_length(_params: &WireParams) -> u64 {
                // filter type + start height + stop hash
                1 + 4 + HASH_LEN
            }
        }
    };
}

range_request_payload!(
    /// Requests the filters of a range of blocks.
    GetCFilters,
    "getcfilters"
);

range_request_payload!(
    /// Requests the filter headers of a range of blocks.
    GetCFHeaders,
    "getcfheaders"
);

/// Requests evenly spaced filter header checkpoints up to `stop_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct GetCFCheckpt {
    pub filter_type: FilterType,
    pub stop_hash: [u8; 32],
}

impl GetCFCheckpt {
    pub fn new(filter_type: FilterType, stop_hash: [u8; 32]) -> Self {
        Self {
            filter_type,
            stop_hash,
        }
    }
}

impl Payload for GetCFCheckpt {
    const COMMAND: &'static str = "getcfcheckpt";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_element(w, &self.filter_type.0)?;
        write_element(w, &self.stop_hash)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            filter_type: FilterType(read_element(r)?),
            stop_hash: read_element(r)?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        1 + HASH_LEN
    }
}

/// The committed filter of one block.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CFilter {
    pub filter_type: FilterType,
    pub block_hash: [u8; 32],
    pub data: Vec<u8>,
}

impl CFilter {
    pub fn new(filter_type: FilterType, block_hash: [u8; 32], data: Vec<u8>) -> Self {
        Self {
            filter_type,
            block_hash,
            data,
        }
    }
}

impl Payload for CFilter {
    const COMMAND: &'static str = "cfilter";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        if self.data.len() as u64 > MAX_CFILTER_DATA_SIZE {
            return Err(message_error(
                "CFilter.encode",
                format!(
                    "cfilter size too large for message [size {}, max {MAX_CFILTER_DATA_SIZE}]",
                    self.data.len()
                ),
            ));
        }

        write_element(w, &self.filter_type.0)?;
        write_element(w, &self.block_hash)?;
        write_var_bytes(w, &self.data)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            filter_type: FilterType(read_element(r)?),
            block_hash: read_element(r)?,
            data: read_var_bytes(r, MAX_CFILTER_DATA_SIZE, "cfilter data")?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        1 + HASH_LEN + MAX_VAR_INT_PAYLOAD + MAX_CFILTER_DATA_SIZE
    }
}

/// Filter hashes for a range of blocks, chained from `prev_filter_header`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CFHeaders {
    pub filter_type: FilterType,
    pub stop_hash: [u8; 32],
    pub prev_filter_header: [u8; 32],
    pub filter_hashes: Vec<[u8; 32]>,
}

impl CFHeaders {
    pub fn new(filter_type: FilterType, stop_hash: [u8; 32], prev_filter_header: [u8; 32]) -> Self {
        Self {
            filter_type,
            stop_hash,
            prev_filter_header,
            filter_hashes: Vec::new(),
        }
    }

    pub fn add_cf_hash(&mut self, hash: [u8; 32]) -> Result<(), WireError> {
        push_bounded(
            &mut self.filter_hashes,
            hash,
            MAX_CF_HEADERS_PER_MSG,
            "CFHeaders.add_cf_hash",
            "cfheaders",
        )
    }
}

impl Payload for CFHeaders {
    const COMMAND: &'static str = "cfheaders";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_element(w, &self.filter_type.0)?;
        write_element(w, &self.stop_hash)?;
        write_element(w, &self.prev_filter_header)?;
        write_count(
            w,
            self.filter_hashes.len(),
            MAX_CF_HEADERS_PER_MSG,
            "CFHeaders.encode",
            "cfheaders",
        )?;
        for hash in &self.filter_hashes {
            write_element(w, hash)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        let filter_type = FilterType(read_element(r)?);
        let stop_hash = read_element(r)?;
        let prev_filter_header = read_element(r)?;
        let filter_hashes = read_list(
            r,
            MAX_CF_HEADERS_PER_MSG,
            "CFHeaders.decode",
            "cfheaders",
            |r| Ok(read_element(r)?),
        )?;

        Ok(Self {
            filter_type,
            stop_hash,
            prev_filter_header,
            filter_hashes,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        1 + HASH_LEN + HASH_LEN + MAX_VAR_INT_PAYLOAD + MAX_CF_HEADERS_PER_MSG * HASH_LEN
    }
}

/// Filter headers at fixed block intervals, up to `stop_hash`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CFCheckpt {
    pub filter_type: FilterType,
    pub stop_hash: [u8; 32],
    pub filter_headers: Vec<[u8; 32]>,
}

impl CFCheckpt {
    pub fn new(filter_type: FilterType, stop_hash: [u8; 32]) -> Self {
        Self {
            filter_type,
            stop_hash,
            filter_headers: Vec::new(),
        }
    }

    pub fn add_cf_header(&mut self, header: [u8; 32]) -> Result<(), WireError> {
        push_bounded(
            &mut self.filter_headers,
            header,
            MAX_CF_CHECKPOINTS_PER_MSG,
            "CFCheckpt.add_cf_header",
            "checkpoints",
        )
    }
}

impl Payload for CFCheckpt {
    const COMMAND: &'static str = "cfcheckpt";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_element(w, &self.filter_type.0)?;
        write_element(w, &self.stop_hash)?;
        write_count(
            w,
            self.filter_headers.len(),
            MAX_CF_CHECKPOINTS_PER_MSG,
            "CFCheckpt.encode",
            "checkpoints",
        )?;
        for header in &self.filter_headers {
            write_element(w, header)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        let filter_type = FilterType(read_element(r)?);
        let stop_hash = read_element(r)?;
        let filter_headers = read_list(
            r,
            MAX_CF_CHECKPOINTS_PER_MSG,
            "CFCheckpt.decode",
            "checkpoints",
            |r| Ok(read_element(r)?),
        )?;

        Ok(Self {
            filter_type,
            stop_hash,
            filter_headers,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        1 + HASH_LEN + MAX_VAR_INT_PAYLOAD + MAX_CF_CHECKPOINTS_PER_MSG * HASH_LEN
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::constants::{GENESIS_BLOCK_HASH_MAINNET, PROTOCOL_VERSION};
    use crate::wire::limits::Limits;
    use crate::wire::primitive::write_varint;
    use crate::wire::test_util::FixedReader;
    use std::io::{Cursor, ErrorKind};

    fn params() -> WireParams {
        WireParams::with_limits(PROTOCOL_VERSION, Limits::default())
    }

    fn round_trip<T: Payload + PartialEq + std::fmt::Debug>(msg: &T) -> Vec<u8> {
        let mut buf = vec![];
        msg.encode(&mut buf, &params()).unwrap();
        assert_eq!(&T::decode(&mut Cursor::new(&buf), &params()).unwrap(), msg);
        buf
    }

    #[test]
    fn get_cfilters_layout() {
        let msg = GetCFilters::new(FilterType::BASIC, 0x0102_0304, GENESIS_BLOCK_HASH_MAINNET);
        let buf = round_trip(&msg);
        assert_eq!(buf.len() as u64, GetCFilters::max_payload_length(&params()));
        assert_eq!(&buf[..5], &[0x00, 0x04, 0x03, 0x02, 0x01]);
    }

    #[test]
    fn get_cfheaders_and_checkpoint() {
        let headers = GetCFHeaders::new(FilterType::BASIC, 100, [0x11; 32]);
        assert_eq!(round_trip(&headers).len(), 37);

        let checkpt = GetCFCheckpt::new(FilterType::BASIC, [0x22; 32]);
        let buf = round_trip(&checkpt);
        assert_eq!(buf.len(), 33);

        let err = GetCFCheckpt::decode(&mut FixedReader::new(10, &buf), &params()).unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::UnexpectedEof));
    }

    #[test]
    fn cfilter_limits() {
        let msg = CFilter::new(FilterType::BASIC, [0x33; 32], vec![0xAA; 100]);
        assert_eq!(round_trip(&msg).len(), 1 + 32 + 1 + 100);

        let big = CFilter::new(FilterType::BASIC, [0; 32], vec![0; MAX_CFILTER_DATA_SIZE as usize + 1]);
        assert!(big.encode(&mut Vec::new(), &params()).unwrap_err().is_protocol());

        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&[0; 32]);
        write_varint(&mut bytes, MAX_CFILTER_DATA_SIZE + 1).unwrap();
        assert!(CFilter::decode(&mut Cursor::new(&bytes), &params())
            .unwrap_err()
            .is_protocol());
    }

    #[test]
    fn cfheaders_round_trip_and_limit() {
        let mut msg = CFHeaders::new(FilterType::BASIC, [0x01; 32], [0x02; 32]);
        msg.add_cf_hash([0x03; 32]).unwrap();
        msg.add_cf_hash([0x04; 32]).unwrap();
        assert_eq!(round_trip(&msg).len(), 1 + 32 + 32 + 1 + 64);

        for _ in 2..MAX_CF_HEADERS_PER_MSG {
            msg.add_cf_hash([0x05; 32]).unwrap();
        }
        assert!(msg.add_cf_hash([0x06; 32]).is_err());

        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&[0; 64]);
        write_varint(&mut bytes, MAX_CF_HEADERS_PER_MSG + 1).unwrap();
        assert!(CFHeaders::decode(&mut Cursor::new(&bytes), &params())
            .unwrap_err()
            .is_protocol());
    }

    #[test]
    fn cfcheckpt_round_trip_and_limit() {
        let mut msg = CFCheckpt::new(FilterType::BASIC, [0x01; 32]);
        msg.add_cf_header([0x02; 32]).unwrap();
        assert_eq!(round_trip(&msg).len(), 1 + 32 + 1 + 32);

        msg.filter_headers = vec![[0; 32]; MAX_CF_CHECKPOINTS_PER_MSG as usize + 1];
        assert!(msg.encode(&mut Vec::new(), &params()).is_err());

        let mut bytes = vec![0x00];
        bytes.extend_from_slice(&[0; 32]);
        write_varint(&mut bytes, MAX_CF_CHECKPOINTS_PER_MSG + 1).unwrap();
        assert!(CFCheckpt::decode(&mut Cursor::new(&bytes), &params())
            .unwrap_err()
            .is_protocol());
    }

    #[test]
    fn filter_type_display() {
        assert_eq!(FilterType::BASIC.to_string(), "BASIC");
        assert_eq!(FilterType(7).to_string(), "Unknown FilterType (7)");
    }
}
