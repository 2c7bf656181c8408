//! Capacity checks shared by every message that carries a list.
//!
//! A peer controls the element count it announces, so the count is checked
//! against the message's maximum before anything is allocated. The same check
//! runs again on encode because the list fields are public and may have been
//! grown without going through the `add_*` methods.

use std::io::{Read, Write};

use crate::wire::error::{message_error, WireError};
use crate::wire::primitive::{read_varint, write_varint};

/// Fails if `additional` more items would push a list of `len` past `max`.
pub fn ensure_capacity(
    operation: &'static str,
    what: &str,
    len: usize,
    additional: usize,
    max: u64,
) -> Result<(), WireError> {
    if len as u64 + additional as u64 > max {
        return Err(message_error(
            operation,
            format!("too many {what} for message [max {max}]"),
        ));
    }
    Ok(())
}

/// Appends `item` to `list` if there is room for it.
pub fn push_bounded<T>(
    list: &mut Vec<T>,
    item: T,
    max: u64,
    operation: &'static str,
    what: &str,
) -> Result<(), WireError> {
    ensure_capacity(operation, what, list.len(), 1, max)?;
    list.push(item);
    Ok(())
}

/// Appends all of `items` to `list`, or none of them if they do not fit.
pub fn extend_bounded<T>(
    list: &mut Vec<T>,
    items: Vec<T>,
    max: u64,
    operation: &'static str,
    what: &str,
) -> Result<(), WireError> {
    ensure_capacity(operation, what, list.len(), items.len(), max)?;
    list.extend(items);
    Ok(())
}

/// Fails if a list of `len` items is longer than `max`.
pub fn check_count(
    len: usize,
    max: u64,
    operation: &'static str,
    what: &str,
) -> Result<(), WireError> {
    if len as u64 > max {
        return Err(message_error(
            operation,
            format!("too many {what} for message [count {len}, max {max}]"),
        ));
    }
    Ok(())
}

/// Re-validates `len` against `max` and writes it as the varint count.
pub fn write_count<W: Write + ?Sized>(
    w: &mut W,
    len: usize,
    max: u64,
    operation: &'static str,
    what: &str,
) -> Result<(), WireError> {
    check_count(len, max, operation, what)?;
    write_varint(w, len as u64)?;
    Ok(())
}

/// Reads a varint count and rejects it if it exceeds `max`.
pub fn read_count<R: Read + ?Sized>(
    r: &mut R,
    max: u64,
    operation: &'static str,
    what: &str,
) -> Result<usize, WireError> {
    let count = read_varint(r)?;
    if count > max {
        return Err(message_error(
            operation,
            format!("too many {what} for message [count {count}, max {max}]"),
        ));
    }
    Ok(count as usize)
}

/// Reads a count followed by exactly that many items.
///
/// Storage is sized from the count only after it passed the `max` check.
pub fn read_list<R, T, F>(
    r: &mut R,
    max: u64,
    operation: &'static str,
    what: &str,
    mut read_item: F,
) -> Result<Vec<T>, WireError>
where
    R: Read + ?Sized,
    F: FnMut(&mut R) -> Result<T, WireError>,
{
    let count = read_count(r, max, operation, what)?;
    let mut items = Vec::with_capacity(count);
    for _ in 0..count {
        items.push(read_item(r)?);
    }
    Ok(items)
}
