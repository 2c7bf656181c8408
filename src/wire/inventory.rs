use std::fmt::{self, Display, Formatter};
use std::io::{self, Read, Write};

use crate::wire::constants::HASH_SIZE;
use crate::wire::primitive::{read_element, write_element};

/// Encoded size of an inventory vector: type (4) + hash (32).
pub const INV_VECT_SIZE: u64 = 4 + HASH_SIZE as u64;

/// Inventory object types used in `inv`, `getdata` and `notfound`.
///
/// Serialized as a little-endian `u32`. Unknown values are preserved.
///
/// https://developer.bitcoin.org/reference/p2p_networking.html#data-messages
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InvType(pub u32);

impl InvType {
    pub const ERROR: InvType = InvType(0);
    pub const TX: InvType = InvType(1);
    pub const BLOCK: InvType = InvType(2);
    /// BIP 37 filtered block, answered with a `merkleblock`.
    pub const FILTERED_BLOCK: InvType = InvType(3);
}

impl Display for InvType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            InvType::ERROR => write!(f, "ERROR"),
            InvType::TX => write!(f, "MSG_TX"),
            InvType::BLOCK => write!(f, "MSG_BLOCK"),
            InvType::FILTERED_BLOCK => write!(f, "MSG_FILTERED_BLOCK"),
            InvType(other) => write!(f, "Unknown InvType ({other})"),
        }
    }
}

/// A reference to an object by type and hash.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct InvVect {
    pub inv_type: InvType,
    pub hash: [u8; 32],
}

impl InvVect {
    pub fn new(inv_type: InvType, hash: [u8; 32]) -> Self {
        Self { inv_type, hash }
    }

    pub fn encode<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        write_element(w, &self.inv_type.0)?;
        write_element(w, &self.hash)
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let inv_type = InvType(read_element(r)?);
        let hash = read_element(r)?;
        Ok(Self { inv_type, hash })
    }
}
