//! Primitive field codec shared by every message.
//!
//! All multi-byte integers are little-endian on the wire; conversions between
//! host and wire order happen only here. Variable-length fields are prefixed
//! with a varint (Bitcoin's CompactSize):
//!
//! ```text
//! value < 0xfd          1 byte
//! value <= 0xffff       0xfd + u16
//! value <= 0xffffffff   0xfe + u32
//! otherwise             0xff + u64
//! ```
//!
//! Reference:
//! https://developer.bitcoin.org/reference/transactions.html#compactsize-unsigned-integers

use std::io::{self, Read, Write};

use byteorder::{LittleEndian, ReadBytesExt, WriteBytesExt};
use rand::rngs::OsRng;
use rand::RngCore;
use sha2::{Digest, Sha256};

use crate::wire::error::{message_error, WireError};
use crate::wire::limits::Limits;

/// A fixed-width field: integers, booleans and byte arrays.
///
/// The set of implementors is closed; anything else is composed from these.
pub trait Element: Sized {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()>;
    fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self>;
}

macro_rules! impl_int_element {
    ($ty:ty, $read:ident, $write:ident) => {
        impl Element for $ty {
            fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
                w.$write::<LittleEndian>(*self)
            }

            fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
                r.$read::<LittleEndian>()
            }
        }
    };
}

impl_int_element!(u16, read_u16, write_u16);
impl_int_element!(u32, read_u32, write_u32);
impl_int_element!(u64, read_u64, write_u64);
impl_int_element!(i32, read_i32, write_i32);
impl_int_element!(i64, read_i64, write_i64);

impl Element for u8 {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(*self)
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        r.read_u8()
    }
}

impl Element for bool {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_u8(u8::from(*self))
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        Ok(r.read_u8()? != 0)
    }
}

impl<const N: usize> Element for [u8; N] {
    fn write_to<W: Write + ?Sized>(&self, w: &mut W) -> io::Result<()> {
        w.write_all(self)
    }

    fn read_from<R: Read + ?Sized>(r: &mut R) -> io::Result<Self> {
        let mut buf = [0u8; N];
        r.read_exact(&mut buf)?;
        Ok(buf)
    }
}

pub fn write_element<W: Write + ?Sized, T: Element>(w: &mut W, value: &T) -> io::Result<()> {
    value.write_to(w)
}

pub fn read_element<R: Read + ?Sized, T: Element>(r: &mut R) -> io::Result<T> {
    T::read_from(r)
}

pub fn write_varint<W: Write + ?Sized>(w: &mut W, value: u64) -> io::Result<()> {
    match value {
        0..=0xFC => w.write_u8(value as u8),
        0xFD..=0xFFFF => {
            w.write_u8(0xFD)?;
            w.write_u16::<LittleEndian>(value as u16)
        }
        0x1_0000..=0xFFFF_FFFF => {
            w.write_u8(0xFE)?;
            w.write_u32::<LittleEndian>(value as u32)
        }
        _ => {
            w.write_u8(0xFF)?;
            w.write_u64::<LittleEndian>(value)
        }
    }
}

/// Reads a varint.
///
/// Non-minimal encodings (e.g. `0xff` followed by a small value) are accepted
/// as-is for compatibility with peers that produce them.
pub fn read_varint<R: Read + ?Sized>(r: &mut R) -> io::Result<u64> {
    match r.read_u8()? {
        0xFD => Ok(u64::from(r.read_u16::<LittleEndian>()?)),
        0xFE => Ok(u64::from(r.read_u32::<LittleEndian>()?)),
        0xFF => r.read_u64::<LittleEndian>(),
        n => Ok(u64::from(n)),
    }
}

/// Number of bytes `value` occupies as a varint.
pub fn varint_serialize_size(value: u64) -> usize {
    match value {
        0..=0xFC => 1,
        0xFD..=0xFFFF => 3,
        0x1_0000..=0xFFFF_FFFF => 5,
        _ => 9,
    }
}

pub fn write_var_string<W: Write + ?Sized>(w: &mut W, s: &str) -> io::Result<()> {
    write_var_bytes(w, s.as_bytes())
}

/// Reads a varint-prefixed string.
///
/// The declared length is checked against the absolute message ceiling before
/// any allocation. Bytes that are not valid UTF-8 are replaced with U+FFFD.
pub fn read_var_string<R: Read + ?Sized>(r: &mut R, limits: &Limits) -> Result<String, WireError> {
    let count = read_varint(r)?;
    let max = limits.max_message_payload();
    if count > max {
        return Err(message_error(
            "read_var_string",
            format!("variable length string is too long [count {count}, max {max}]"),
        ));
    }

    let mut buf = vec![0u8; count as usize];
    r.read_exact(&mut buf)?;
    Ok(String::from_utf8_lossy(&buf).into_owned())
}

pub fn write_var_bytes<W: Write + ?Sized>(w: &mut W, bytes: &[u8]) -> io::Result<()> {
    write_varint(w, bytes.len() as u64)?;
    w.write_all(bytes)
}

/// Reads a varint-prefixed byte blob of at most `max_allowed` bytes.
///
/// Every caller supplies a field specific ceiling so that a peer cannot force
/// a huge allocation by announcing an absurd length.
pub fn read_var_bytes<R: Read + ?Sized>(
    r: &mut R,
    max_allowed: u64,
    field_name: &str,
) -> Result<Vec<u8>, WireError> {
    let count = read_varint(r)?;
    if count > max_allowed {
        return Err(message_error(
            "read_var_bytes",
            format!("{field_name} is larger than the max allowed size [count {count}, max {max_allowed}]"),
        ));
    }

    let mut buf = vec![0u8; count as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Double SHA-256.
pub fn hash256(bytes: &[u8]) -> [u8; 32] {
    let digest = Sha256::digest(Sha256::digest(bytes));

    let mut result = [0u8; 32];
    result.copy_from_slice(&digest);
    result
}

/// First four bytes of [`hash256`], as used in message headers.
pub fn checksum(payload: &[u8]) -> [u8; 4] {
    let hash = hash256(payload);
    [hash[0], hash[1], hash[2], hash[3]]
}

/// Draws a random `u64` from the operating system's secure generator.
pub fn random_u64() -> Result<u64, WireError> {
    random_u64_from(&mut OsRng)
}

/// Draws a random `u64` from `rng`, failing if it cannot fill 8 bytes.
pub fn random_u64_from<G: RngCore + ?Sized>(rng: &mut G) -> Result<u64, WireError> {
    let mut buf = [0u8; 8];
    rng.try_fill_bytes(&mut buf)?;
    Ok(u64::from_le_bytes(buf))
}
