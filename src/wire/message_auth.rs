//! Peer authentication handshake: a random challenge answered by a signed
//! response.

use std::io::{Read, Write};

use rand::rngs::OsRng;
use rand::RngCore;

use crate::wire::error::{message_error, WireError};
use crate::wire::limits::WireParams;
use crate::wire::message::Payload;
use crate::wire::primitive::{random_u64, read_element, write_element};

/// Version written in every `authch`.
pub const AUTH_CHALLENGE_VERSION: i32 = 1;

/// Length of the challenge `AuthChallenge::random` generates, and the most
/// any challenge may carry.
pub const MAX_AUTH_CHALLENGE_SIZE: u32 = 32;

/// Size of a compressed secp256k1 public key.
pub const COMPRESSED_PUBKEY_SIZE: u32 = 33;

/// Largest DER encoded secp256k1 signature.
pub const MAX_DER_SIGNATURE_SIZE: u32 = 72;

/// Writes a `u32` length followed by `bytes`, refusing more than `max`.
fn write_sized<W: Write + ?Sized>(
    w: &mut W,
    bytes: &[u8],
    max: u32,
    operation: &'static str,
    field: &str,
) -> Result<(), WireError> {
    if bytes.len() as u64 > u64::from(max) {
        return Err(message_error(
            operation,
            format!("{field} too long [len {}, max {max}]", bytes.len()),
        ));
    }
    write_element(w, &(bytes.len() as u32))?;
    w.write_all(bytes)?;
    Ok(())
}

fn read_sized<R: Read + ?Sized>(
    r: &mut R,
    max: u32,
    operation: &'static str,
    field: &str,
) -> Result<Vec<u8>, WireError> {
    let len: u32 = read_element(r)?;
    if len > max {
        return Err(message_error(
            operation,
            format!("{field} too long [len {len}, max {max}]"),
        ));
    }

    let mut buf = vec![0u8; len as usize];
    r.read_exact(&mut buf)?;
    Ok(buf)
}

/// Random bytes the peer must sign to prove it holds a key.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthChallenge {
    pub version: i32,
    pub challenge: Vec<u8>,
}

impl AuthChallenge {
    pub fn new(challenge: impl Into<Vec<u8>>) -> Self {
        Self {
            version: AUTH_CHALLENGE_VERSION,
            challenge: challenge.into(),
        }
    }

    /// A challenge of [`MAX_AUTH_CHALLENGE_SIZE`] bytes from the operating
    /// system's secure generator.
    pub fn random() -> Result<Self, WireError> {
        let mut challenge = vec![0u8; MAX_AUTH_CHALLENGE_SIZE as usize];
        OsRng.try_fill_bytes(&mut challenge)?;
        Ok(Self::new(challenge))
    }
}

impl Payload for AuthChallenge {
    const COMMAND: &'static str = "authch";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_element(w, &self.version)?;
        write_sized(
            w,
            &self.challenge,
            MAX_AUTH_CHALLENGE_SIZE,
            "AuthChallenge.encode",
            "challenge",
        )
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            version: read_element(r)?,
            challenge: read_sized(r, MAX_AUTH_CHALLENGE_SIZE, "AuthChallenge.decode", "challenge")?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        4 + 4 + u64::from(MAX_AUTH_CHALLENGE_SIZE)
    }
}

/// The signed answer to an `authch`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AuthResponse {
    pub public_key: Vec<u8>,
    pub client_nonce: u64,
    pub signature: Vec<u8>,
}

impl AuthResponse {
    /// Builds a response with a fresh random client nonce.
    pub fn new(public_key: Vec<u8>, signature: Vec<u8>) -> Result<Self, WireError> {
        Ok(Self {
            public_key,
            client_nonce: random_u64()?,
            signature,
        })
    }
}

impl Payload for AuthResponse {
    const COMMAND: &'static str = "authresp";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_sized(
            w,
            &self.public_key,
            COMPRESSED_PUBKEY_SIZE,
            "AuthResponse.encode",
            "public key",
        )?;
        write_element(w, &self.client_nonce)?;
        write_sized(
            w,
            &self.signature,
            MAX_DER_SIGNATURE_SIZE,
            "AuthResponse.encode",
            "signature",
        )
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            public_key: read_sized(r, COMPRESSED_PUBKEY_SIZE, "AuthResponse.decode", "public key")?,
            client_nonce: read_element(r)?,
            signature: read_sized(r, MAX_DER_SIGNATURE_SIZE, "AuthResponse.decode", "signature")?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        u64::from(4 + COMPRESSED_PUBKEY_SIZE + 8 + 4 + MAX_DER_SIGNATURE_SIZE)
    }
}
