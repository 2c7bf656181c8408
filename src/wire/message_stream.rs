//! Multistream associations: extra TCP connections joined to an existing
//! peer connection.

use std::fmt::{self, Display, Formatter};
use std::io::{Read, Write};

use crate::wire::constants::{MAX_USER_AGENT_LEN, MAX_VAR_INT_PAYLOAD};
use crate::wire::error::{message_error, WireError};
use crate::wire::limits::WireParams;
use crate::wire::message::Payload;
use crate::wire::primitive::{
    read_element, read_var_bytes, read_var_string, write_element, write_var_bytes,
    write_var_string,
};

/// Longest association id. The usual form is a type byte and a 16 byte
/// UUID; the rest is room for other id formats.
pub const MAX_ASSOCIATION_ID_LEN: u64 = 129;

/// Role of a stream within an association.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct StreamType(pub u8);

impl StreamType {
    pub const UNKNOWN: StreamType = StreamType(0);
    pub const GENERAL: StreamType = StreamType(1);
    pub const DATA1: StreamType = StreamType(2);
    pub const DATA2: StreamType = StreamType(3);
    pub const DATA3: StreamType = StreamType(4);
    pub const DATA4: StreamType = StreamType(5);
}

impl Display for StreamType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            StreamType::UNKNOWN => write!(f, "UNKNOWN"),
            StreamType::GENERAL => write!(f, "GENERAL"),
            StreamType(n @ 2..=5) => write!(f, "DATA{}", n - 1),
            StreamType(other) => write!(f, "Unknown StreamType ({other})"),
        }
    }
}

fn check_association_id(id: &[u8], operation: &'static str) -> Result<(), WireError> {
    if id.len() as u64 > MAX_ASSOCIATION_ID_LEN {
        return Err(message_error(
            operation,
            format!(
                "association ID too long [len {}, max {MAX_ASSOCIATION_ID_LEN}]",
                id.len()
            ),
        ));
    }
    Ok(())
}

fn check_non_empty_id(id: &[u8], operation: &'static str) -> Result<(), WireError> {
    if id.is_empty() {
        return Err(message_error(operation, "association ID must not be empty"));
    }
    Ok(())
}

fn check_policy_name(name: &str, operation: &'static str) -> Result<(), WireError> {
    if name.len() as u64 > MAX_USER_AGENT_LEN {
        return Err(message_error(
            operation,
            format!(
                "stream policy name too long [len {}, max {MAX_USER_AGENT_LEN}]",
                name.len()
            ),
        ));
    }
    Ok(())
}

/// First message on a new connection, asking to join it to an existing
/// association as another stream.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct CreateStream {
    pub association_id: Vec<u8>,
    pub stream_type: StreamType,
    pub stream_policy_name: String,
}

impl CreateStream {
    /// Fails if the association id is empty or too long. The policy name is
    /// checked when the message is encoded.
    pub fn new(
        association_id: Vec<u8>,
        stream_type: StreamType,
        stream_policy_name: impl Into<String>,
    ) -> Result<Self, WireError> {
        check_non_empty_id(&association_id, "CreateStream.new")?;
        check_association_id(&association_id, "CreateStream.new")?;

        Ok(Self {
            association_id,
            stream_type,
            stream_policy_name: stream_policy_name.into(),
        })
    }
}

impl Payload for CreateStream {
    const COMMAND: &'static str = "createstrm";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        check_non_empty_id(&self.association_id, "CreateStream.encode")?;
        check_association_id(&self.association_id, "CreateStream.encode")?;
        check_policy_name(&self.stream_policy_name, "CreateStream.encode")?;

        write_var_bytes(w, &self.association_id)?;
        write_element(w, &self.stream_type.0)?;
        write_var_string(w, &self.stream_policy_name)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let association_id = read_var_bytes(r, MAX_ASSOCIATION_ID_LEN, "association ID")?;
        check_non_empty_id(&association_id, "CreateStream.decode")?;
        let stream_type = StreamType(read_element(r)?);
        let stream_policy_name = read_var_string(r, &params.limits)?;
        check_policy_name(&stream_policy_name, "CreateStream.decode")?;

        Ok(Self {
            association_id,
            stream_type,
            stream_policy_name,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_VAR_INT_PAYLOAD + MAX_ASSOCIATION_ID_LEN + 1 + MAX_VAR_INT_PAYLOAD + MAX_USER_AGENT_LEN
    }
}

/// Accepts a `createstrm`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StreamAck {
    pub association_id: Vec<u8>,
    pub stream_type: StreamType,
}

impl StreamAck {
    pub fn new(association_id: Vec<u8>, stream_type: StreamType) -> Self {
        Self {
            association_id,
            stream_type,
        }
    }
}

impl Payload for StreamAck {
    const COMMAND: &'static str = "streamack";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        check_association_id(&self.association_id, "StreamAck.encode")?;
        write_var_bytes(w, &self.association_id)?;
        write_element(w, &self.stream_type.0)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            association_id: read_var_bytes(r, MAX_ASSOCIATION_ID_LEN, "association ID")?,
            stream_type: StreamType(read_element(r)?),
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_VAR_INT_PAYLOAD + MAX_ASSOCIATION_ID_LEN + 1
    }
}
