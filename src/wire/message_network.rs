//! Connection-level messages: handshake, address exchange, keep-alive and
//! peer configuration.

use std::fmt::{self, Display, Formatter};
use std::io::{self, Cursor, Read, Write};
use std::time::{SystemTime, UNIX_EPOCH};

use crate::wire::bounded::{extend_bounded, push_bounded, read_list, write_count};
use crate::wire::constants::{
    BIP0031_VERSION, BIP0037_VERSION, FEE_FILTER_VERSION, MAX_USER_AGENT_LEN, MAX_VAR_INT_PAYLOAD,
    MULTIPLE_ADDRESS_VERSION, PROTOCOL_VERSION, PROTOCONF_VERSION, REJECT_VERSION,
    SEND_HEADERS_VERSION,
};
use crate::wire::error::{message_error, WireError};
use crate::wire::limits::WireParams;
use crate::wire::message::Payload;
use crate::wire::message_stream::MAX_ASSOCIATION_ID_LEN;
use crate::wire::net_address::NetAddress;
use crate::wire::primitive::{
    read_element, read_var_bytes, read_var_string, read_varint, write_element, write_var_bytes,
    write_var_string, write_varint,
};
use crate::wire::protocol::{enforce_after_version, enforce_min_version, Services};

/// Most addresses one `addr` message may carry.
pub const MAX_ADDR_PER_MSG: u64 = 1000;

/// Largest `protoconf` payload.
pub const MAX_PROTOCONF_PAYLOAD: u64 = 1024 * 1024;

/// Receive limit announced when a node does not configure one.
pub const DEFAULT_MAX_RECV_PAYLOAD_LENGTH: u32 = 2 * 1024 * 1024;

/// Stream policy announced when a node does not configure one.
pub const DEFAULT_STREAM_POLICY: &str = "Default";

fn validate_user_agent(user_agent: &str, operation: &'static str) -> Result<(), WireError> {
    if user_agent.len() as u64 > MAX_USER_AGENT_LEN {
        return Err(message_error(
            operation,
            format!(
                "user agent too long [len {}, max {MAX_USER_AGENT_LEN}]",
                user_agent.len()
            ),
        ));
    }
    Ok(())
}

/// Opens the handshake: the sender's version, services and chain height.
///
/// Fields after `addr_you` were added over time and are only read when the
/// payload still has bytes left.
///
/// https://developer.bitcoin.org/reference/p2p_networking.html#version
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Version {
    pub protocol_version: i32,
    pub services: Services,
    /// Seconds since the Unix epoch.
    pub timestamp: i64,
    /// Address of the receiving node as seen by the sender.
    pub addr_you: NetAddress,
    pub addr_me: NetAddress,
    /// Detects connections to self.
    pub nonce: u64,
    pub user_agent: String,
    /// Height of the sender's best chain.
    pub last_block: i32,
    /// BIP 37: ask the peer not to relay transactions until a filter is set.
    pub disable_relay_tx: bool,
    /// Groups several connections into one association. Empty when absent.
    pub association_id: Vec<u8>,
}

impl Version {
    pub fn new(me: NetAddress, you: NetAddress, nonce: u64, last_block: i32) -> Self {
        let timestamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map_or(0, |d| d.as_secs() as i64);

        Self {
            protocol_version: PROTOCOL_VERSION as i32,
            services: Services::NONE,
            timestamp,
            addr_you: you,
            addr_me: me,
            nonce,
            user_agent: String::new(),
            last_block,
            disable_relay_tx: false,
            association_id: Vec::new(),
        }
    }

    pub fn has_service(&self, service: Services) -> bool {
        self.services.contains(service)
    }

    pub fn add_service(&mut self, service: Services) {
        self.services = Services::new(self.services.bits() | service.bits());
    }

    /// Appends `/name:version(comment; ...)/` to the user agent.
    pub fn add_user_agent(
        &mut self,
        name: &str,
        version: &str,
        comments: &[&str],
    ) -> Result<(), WireError> {
        let mut new_agent = format!("{name}:{version}");
        if !comments.is_empty() {
            new_agent = format!("{new_agent}({})", comments.join("; "));
        }
        let user_agent = format!("{}{new_agent}/", self.user_agent_prefix());

        validate_user_agent(&user_agent, "Version.add_user_agent")?;
        self.user_agent = user_agent;
        Ok(())
    }

    fn user_agent_prefix(&self) -> String {
        if self.user_agent.is_empty() {
            "/".to_string()
        } else {
            self.user_agent.clone()
        }
    }
}

impl Payload for Version {
    const COMMAND: &'static str = "version";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        validate_user_agent(&self.user_agent, "Version.encode")?;
        if self.association_id.len() as u64 > MAX_ASSOCIATION_ID_LEN {
            return Err(message_error(
                "Version.encode",
                format!(
                    "association ID too long [len {}, max {MAX_ASSOCIATION_ID_LEN}]",
                    self.association_id.len()
                ),
            ));
        }

        let pver = params.pver;
        write_element(w, &self.protocol_version)?;
        write_element(w, &self.services.bits())?;
        write_element(w, &self.timestamp)?;
        self.addr_you.encode(w, pver, false)?;
        self.addr_me.encode(w, pver, false)?;
        write_element(w, &self.nonce)?;
        write_var_string(w, &self.user_agent)?;
        write_element(w, &self.last_block)?;

        if pver >= BIP0037_VERSION {
            write_element(w, &!self.disable_relay_tx)?;
            if !self.association_id.is_empty() {
                write_var_bytes(w, &self.association_id)?;
            }
        }
        Ok(())
    }

    /// Reads to the end of `r`; the codec hands over exactly one payload.
    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let mut payload = Vec::new();
        (&mut *r)
            .take(Self::max_payload_length(params))
            .read_to_end(&mut payload)?;
        let len = payload.len() as u64;
        let mut buf = Cursor::new(payload);
        let has_more = |buf: &Cursor<Vec<u8>>| buf.position() < len;

        let pver = params.pver;
        let mut msg = Version {
            protocol_version: read_element(&mut buf)?,
            services: Services::from(read_element::<_, u64>(&mut buf)?),
            timestamp: read_element(&mut buf)?,
            addr_you: NetAddress::decode(&mut buf, pver, false)?,
            ..Version::default()
        };

        if has_more(&buf) {
            msg.addr_me = NetAddress::decode(&mut buf, pver, false)?;
        }
        if has_more(&buf) {
            msg.nonce = read_element(&mut buf)?;
        }
        if has_more(&buf) {
            let user_agent = read_var_string(&mut buf, &params.limits)?;
            validate_user_agent(&user_agent, "Version.decode")?;
            msg.user_agent = user_agent;
        }
        if has_more(&buf) {
            msg.last_block = read_element(&mut buf)?;
        }
        if has_more(&buf) {
            let relay: bool = read_element(&mut buf)?;
            msg.disable_relay_tx = !relay;
        }
        if has_more(&buf) {
            msg.association_id = read_var_bytes(&mut buf, MAX_ASSOCIATION_ID_LEN, "association ID")?;
        }

        Ok(msg)
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        // version + services + timestamp + nonce + last block + relay
        33 + NetAddress::max_payload(params.pver) * 2
            + MAX_VAR_INT_PAYLOAD
            + MAX_USER_AGENT_LEN
            + MAX_VAR_INT_PAYLOAD
            + MAX_ASSOCIATION_ID_LEN
    }
}

macro_rules! empty_payload {
    ($(#[$doc:meta])* $name:ident, $command:literal) => {
        $(#[$doc])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
        pub struct $name;

        impl Payload for $name {
            const COMMAND: &'static str = $command;

            fn encode<W: Write + ?Sized>(&self, _w: &mut W, _params: &WireParams) -> Result<(), WireError> {
                Ok(())
            }

            fn decode<R: Read + ?Sized>(_r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
                Ok($name)
            }

            fn max_payload_length(_params: &WireParams) -> u64 {
                0
            }
        }
    };
}

empty_payload!(
    /// Acknowledges a `version` message.
    VerAck,
    "verack"
);

empty_payload!(
    /// Asks a peer for known active addresses.
    GetAddr,
    "getaddr"
);

/// Known active peers, answered to `getaddr` or sent unsolicited.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Addr {
    pub addr_list: Vec<NetAddress>,
}

impl Addr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_address(&mut self, na: NetAddress) -> Result<(), WireError> {
        push_bounded(
            &mut self.addr_list,
            na,
            MAX_ADDR_PER_MSG,
            "Addr.add_address",
            "addresses",
        )
    }

    /// Adds all of `addrs`, or none if they do not fit.
    pub fn add_addresses(&mut self, addrs: Vec<NetAddress>) -> Result<(), WireError> {
        extend_bounded(
            &mut self.addr_list,
            addrs,
            MAX_ADDR_PER_MSG,
            "Addr.add_addresses",
            "addresses",
        )
    }

    pub fn clear_addresses(&mut self) {
        self.addr_list.clear();
    }

    fn max_addresses(pver: u32) -> u64 {
        if pver < MULTIPLE_ADDRESS_VERSION {
            1
        } else {
            MAX_ADDR_PER_MSG
        }
    }
}

impl Payload for Addr {
    const COMMAND: &'static str = "addr";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        let pver = params.pver;
        write_count(
            w,
            self.addr_list.len(),
            Self::max_addresses(pver),
            "Addr.encode",
            "addresses",
        )?;
        for na in &self.addr_list {
            na.encode(w, pver, true)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let pver = params.pver;
        let addr_list = read_list(r, MAX_ADDR_PER_MSG, "Addr.decode", "addresses", |r| {
            Ok(NetAddress::decode(r, pver, true)?)
        })?;
        Ok(Self { addr_list })
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        MAX_VAR_INT_PAYLOAD + Self::max_addresses(params.pver) * NetAddress::max_payload(params.pver)
    }
}

/// Keep-alive. The nonce exists only after BIP 31.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Ping {
    pub nonce: u64,
}

impl Ping {
    pub fn new(nonce: u64) -> Self {
        Self { nonce }
    }
}

impl Payload for Ping {
    const COMMAND: &'static str = "ping";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        if params.pver > BIP0031_VERSION {
            write_element(w, &self.nonce)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        let mut msg = Self::default();
        if params.pver > BIP0031_VERSION {
            msg.nonce = read_element(r)?;
        }
        Ok(msg)
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        if params.pver > BIP0031_VERSION {
            8
        } else {
            0
        }
    }
}

/// Reply to a `ping`, echoing its nonce (BIP 31).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Pong {
    pub nonce: u64,
}

impl Pong {
    pub fn new(nonce: u64) -> Self {
        Self { nonce }
    }
}

impl Payload for Pong {
    const COMMAND: &'static str = "pong";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_after_version(params.pver, BIP0031_VERSION, "pong", "Pong.encode")?;
        write_element(w, &self.nonce)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_after_version(params.pver, BIP0031_VERSION, "pong", "Pong.decode")?;
        Ok(Self {
            nonce: read_element(r)?,
        })
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        if params.pver > BIP0031_VERSION {
            8
        } else {
            0
        }
    }
}

/// Reason code carried by `reject`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct RejectCode(pub u8);

impl RejectCode {
    pub const MALFORMED: RejectCode = RejectCode(0x01);
    pub const INVALID: RejectCode = RejectCode(0x10);
    pub const OBSOLETE: RejectCode = RejectCode(0x11);
    pub const DUPLICATE: RejectCode = RejectCode(0x12);
    pub const NONSTANDARD: RejectCode = RejectCode(0x40);
    pub const DUST: RejectCode = RejectCode(0x41);
    pub const INSUFFICIENT_FEE: RejectCode = RejectCode(0x42);
    pub const CHECKPOINT: RejectCode = RejectCode(0x43);
}

impl Display for RejectCode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match *self {
            RejectCode::MALFORMED => "REJECT_MALFORMED",
            RejectCode::INVALID => "REJECT_INVALID",
            RejectCode::OBSOLETE => "REJECT_OBSOLETE",
            RejectCode::DUPLICATE => "REJECT_DUPLICATE",
            RejectCode::NONSTANDARD => "REJECT_NONSTANDARD",
            RejectCode::DUST => "REJECT_DUST",
            RejectCode::INSUFFICIENT_FEE => "REJECT_INSUFFICIENTFEE",
            RejectCode::CHECKPOINT => "REJECT_CHECKPOINT",
            RejectCode(other) => return write!(f, "Unknown RejectCode ({other})"),
        };
        f.write_str(name)
    }
}

/// Tells a peer that one of its messages was rejected.
///
/// `hash` is only on the wire when the rejected command is `block` or `tx`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Reject {
    /// Command of the rejected message.
    pub cmd: String,
    pub code: RejectCode,
    pub reason: String,
    pub hash: [u8; 32],
}

impl Reject {
    pub fn new(cmd: impl Into<String>, code: RejectCode, reason: impl Into<String>) -> Self {
        Self {
            cmd: cmd.into(),
            code,
            reason: reason.into(),
            hash: [0; 32],
        }
    }

    fn carries_hash(&self) -> bool {
        self.cmd == "block" || self.cmd == "tx"
    }
}

impl Payload for Reject {
    const COMMAND: &'static str = "reject";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, REJECT_VERSION, "reject", "Reject.encode")?;

        write_var_string(w, &self.cmd)?;
        write_element(w, &self.code.0)?;
        write_var_string(w, &self.reason)?;
        if self.carries_hash() {
            write_element(w, &self.hash)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, REJECT_VERSION, "reject", "Reject.decode")?;

        let mut msg = Reject {
            cmd: read_var_string(r, &params.limits)?,
            code: RejectCode(read_element(r)?),
            reason: read_var_string(r, &params.limits)?,
            hash: [0; 32],
        };
        if msg.carries_hash() {
            msg.hash = read_element(r)?;
        }
        Ok(msg)
    }

    fn max_payload_length(params: &WireParams) -> u64 {
        if params.pver >= REJECT_VERSION {
            params.limits.max_message_payload()
        } else {
            0
        }
    }
}

/// Asks a peer to announce new blocks with `headers` instead of `inv`
/// (BIP 130).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendHeaders;

impl Payload for SendHeaders {
    const COMMAND: &'static str = "sendheaders";

    fn encode<W: Write + ?Sized>(&self, _w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, SEND_HEADERS_VERSION, "sendheaders", "SendHeaders.encode")
    }

    fn decode<R: Read + ?Sized>(_r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, SEND_HEADERS_VERSION, "sendheaders", "SendHeaders.decode")?;
        Ok(SendHeaders)
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        0
    }
}

/// Minimum fee rate, in satoshis per kilobyte, for transactions the sender
/// wants relayed (BIP 133).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeeFilter {
    pub min_fee: i64,
}

impl FeeFilter {
    pub fn new(min_fee: i64) -> Self {
        Self { min_fee }
    }
}

impl Payload for FeeFilter {
    const COMMAND: &'static str = "feefilter";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, FEE_FILTER_VERSION, "feefilter", "FeeFilter.encode")?;
        write_element(w, &self.min_fee)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, FEE_FILTER_VERSION, "feefilter", "FeeFilter.decode")?;
        Ok(Self {
            min_fee: read_element(r)?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        8
    }
}

/// Compact block relay negotiation (BIP 152).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SendCompact {
    pub send_compact: bool,
    pub version: u64,
}

impl SendCompact {
    pub fn new(send_compact: bool) -> Self {
        Self {
            send_compact,
            version: 1,
        }
    }
}

impl Payload for SendCompact {
    const COMMAND: &'static str = "sendcmpct";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, _params: &WireParams) -> Result<(), WireError> {
        write_element(w, &self.send_compact)?;
        write_element(w, &self.version)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, _params: &WireParams) -> Result<Self, WireError> {
        Ok(Self {
            send_compact: read_element(r)?,
            version: read_element(r)?,
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        9
    }
}

/// Announces the sender's receive limits and stream policies.
///
/// ```text
/// varint    number of fields
/// u32       max receive payload length   (fields >= 1)
/// varstr    stream policies              (fields >= 2)
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Protoconf {
    pub number_of_fields: u64,
    pub max_recv_payload_length: u32,
    /// Comma separated policy names, most preferred first.
    pub stream_policies: String,
}

impl Protoconf {
    pub fn new(max_recv_payload_length: u32, stream_policies: impl Into<String>) -> Self {
        Self {
            number_of_fields: 2,
            max_recv_payload_length,
            stream_policies: stream_policies.into(),
        }
    }
}

impl Payload for Protoconf {
    const COMMAND: &'static str = "protoconf";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, PROTOCONF_VERSION, "protoconf", "Protoconf.encode")?;

        write_varint(w, self.number_of_fields)?;
        if self.number_of_fields >= 1 {
            write_element(w, &self.max_recv_payload_length)?;
        }
        if self.number_of_fields >= 2 {
            write_var_string(w, &self.stream_policies)?;
        }
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, PROTOCONF_VERSION, "protoconf", "Protoconf.decode")?;

        let mut msg = Protoconf {
            number_of_fields: read_varint(r)?,
            ..Protoconf::default()
        };
        if msg.number_of_fields >= 1 {
            msg.max_recv_payload_length = read_element(r)?;
        }
        if msg.number_of_fields >= 2 {
            msg.stream_policies = read_var_string(r, &params.limits)?;
        }
        Ok(msg)
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_PROTOCONF_PAYLOAD
    }
}

/// Configuration message for peers using the extended message format.
///
/// Sent under the `protoconf` command with fixed-width fields. An empty
/// payload decodes to the default value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ExtMsg {
    pub number_of_fields: u64,
    pub max_recv_payload_length: u64,
}

impl ExtMsg {
    pub fn new(max_recv_payload_length: u64) -> Self {
        Self {
            number_of_fields: 1,
            max_recv_payload_length,
        }
    }
}

impl Payload for ExtMsg {
    const COMMAND: &'static str = "protoconf";

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError> {
        enforce_min_version(params.pver, PROTOCONF_VERSION, "extmsg", "ExtMsg.encode")?;
        write_element(w, &self.number_of_fields)?;
        write_element(w, &self.max_recv_payload_length)?;
        Ok(())
    }

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError> {
        enforce_min_version(params.pver, PROTOCONF_VERSION, "extmsg", "ExtMsg.decode")?;

        let mut first = [0u8; 8];
        if read_up_to(r, &mut first)? == 0 {
            return Ok(Self::default());
        }
        let mut rest = [0u8; 8];
        r.read_exact(&mut rest)?;

        Ok(Self {
            number_of_fields: u64::from_le_bytes(first),
            max_recv_payload_length: u64::from_le_bytes(rest),
        })
    }

    fn max_payload_length(_params: &WireParams) -> u64 {
        MAX_PROTOCONF_PAYLOAD
    }
}

/// Fills `buf` unless the stream ends first. Returns 0 only if it ended
/// before the first byte; a partial fill is an unexpected EOF.
fn read_up_to<R: Read + ?Sized>(r: &mut R, buf: &mut [u8]) -> io::Result<usize> {
    let mut filled = 0;
    while filled < buf.len() {
        match r.read(&mut buf[filled..]) {
            Ok(0) => break,
            Ok(n) => filled += n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => {}
            Err(e) => return Err(e),
        }
    }

    if filled != 0 && filled < buf.len() {
        return Err(io::Error::from(io::ErrorKind::UnexpectedEof));
    }
    Ok(filled)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::wire::constants::NET_ADDRESS_TIME_VERSION;
    use crate::wire::limits::Limits;
    use crate::wire::test_util::{FixedReader, FixedWriter};
    use std::io::ErrorKind;
    use std::net::SocketAddr;

    fn params(pver: u32) -> WireParams {
        WireParams::with_limits(pver, Limits::default())
    }

    fn encode<T: Payload>(msg: &T, pver: u32) -> Vec<u8> {
        let mut buf = vec![];
        msg.encode(&mut buf, &params(pver)).unwrap();
        buf
    }

    fn decode<T: Payload>(bytes: &[u8], pver: u32) -> Result<T, WireError> {
        T::decode(&mut Cursor::new(bytes), &params(pver))
    }

    fn addr(s: &str) -> NetAddress {
        let socket: SocketAddr = s.parse().unwrap();
        NetAddress::new(socket, Services::NODE_NETWORK).with_timestamp(0x495f_ab29)
    }

    fn sample_version() -> Version {
        let mut v = Version::new(addr("127.0.0.1:8333"), addr("10.0.0.1:8333"), 0x1234_5678_90ab_cdef, 820_000);
        v.timestamp = 1_700_000_000;
        v.add_service(Services::NODE_NETWORK);
        v.add_user_agent("bsv-wire", "0.1.0", &[]).unwrap();
        v.addr_me.timestamp = 0;
        v.addr_you.timestamp = 0;
        v
    }

    #[test]
    fn version_round_trip() {
        let v = sample_version();
        assert_eq!(v.user_agent, "/bsv-wire:0.1.0/");
        assert!(v.has_service(Services::NODE_NETWORK));

        let bytes = encode(&v, PROTOCOL_VERSION);
        assert!(bytes.len() as u64 <= Version::max_payload_length(&params(PROTOCOL_VERSION)));
        assert_eq!(decode::<Version>(&bytes, PROTOCOL_VERSION).unwrap(), v);
    }

    #[test]
    fn version_with_association_id_round_trip() {
        let mut v = sample_version();
        v.association_id = vec![0x01; 17];
        v.disable_relay_tx = true;

        let bytes = encode(&v, PROTOCOL_VERSION);
        assert_eq!(decode::<Version>(&bytes, PROTOCOL_VERSION).unwrap(), v);
    }

    #[test]
    fn version_optional_fields_absent() {
        let v = sample_version();
        let bytes = encode(&v, PROTOCOL_VERSION);

        // version, services, timestamp and addr_you only
        let decoded = decode::<Version>(&bytes[..46], PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded.addr_you, v.addr_you);
        assert_eq!(decoded.nonce, 0);
        assert!(decoded.user_agent.is_empty());
        assert!(!decoded.disable_relay_tx);

        // everything up to the relay flag
        let decoded = decode::<Version>(&bytes[..bytes.len() - 1], PROTOCOL_VERSION).unwrap();
        assert_eq!(decoded.last_block, 820_000);
        assert!(!decoded.disable_relay_tx);
    }

    #[test]
    fn version_relay_flag_only_after_bip37() {
        let v = sample_version();
        let new = encode(&v, BIP0037_VERSION);
        let old = encode(&v, BIP0037_VERSION - 1);
        assert_eq!(new.len(), old.len() + 1);
    }

    #[test]
    fn version_rejects_long_user_agent() {
        let mut v = sample_version();
        v.user_agent = "a".repeat(MAX_USER_AGENT_LEN as usize + 1);
        let err = v.encode(&mut Vec::new(), &params(PROTOCOL_VERSION)).unwrap_err();
        assert!(err.is_protocol());

        let mut short = sample_version();
        short.user_agent.clear();
        let mut bytes = encode(&short, PROTOCOL_VERSION);
        // splice an over-long user agent where the empty one was
        let ua_at = 4 + 8 + 8 + 26 + 26 + 8;
        let mut long_ua = vec![];
        write_var_string(&mut long_ua, &"a".repeat(300)).unwrap();
        bytes.splice(ua_at..ua_at + 1, long_ua);

        let err = decode::<Version>(&bytes, PROTOCOL_VERSION).unwrap_err();
        assert!(err.to_string().contains("user agent too long"));
    }

    #[test]
    fn version_add_user_agent_with_comments() {
        let mut v = Version::default();
        v.add_user_agent("node", "1.0", &[]).unwrap();
        v.add_user_agent("wire", "2.0", &["a", "b"]).unwrap();
        assert_eq!(v.user_agent, "/node:1.0/wire:2.0(a; b)/");

        let err = v
            .add_user_agent(&"x".repeat(300), "1", &[])
            .unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(v.user_agent, "/node:1.0/wire:2.0(a; b)/");
    }

    #[test]
    fn empty_messages_have_no_payload() {
        assert!(encode(&VerAck, PROTOCOL_VERSION).is_empty());
        assert!(encode(&GetAddr, PROTOCOL_VERSION).is_empty());
        assert_eq!(VerAck::max_payload_length(&params(PROTOCOL_VERSION)), 0);
        assert_eq!(decode::<GetAddr>(&[], 0).unwrap(), GetAddr);
    }

    #[test]
    fn addr_wire_layout() {
        let mut msg = Addr::new();
        msg.add_addresses(vec![addr("127.0.0.1:8333"), addr("192.168.0.1:8334")])
            .unwrap();

        let want = hex::decode(concat!(
            "02",
            "29ab5f49", "0100000000000000", "00000000000000000000ffff7f000001", "208d",
            "29ab5f49", "0100000000000000", "00000000000000000000ffffc0a80001", "208e",
        ))
        .unwrap();
        assert_eq!(encode(&msg, PROTOCOL_VERSION), want);
        assert_eq!(decode::<Addr>(&want, PROTOCOL_VERSION).unwrap(), msg);

        assert_eq!(encode(&Addr::new(), MULTIPLE_ADDRESS_VERSION - 1), [0x00]);
    }

    #[test]
    fn addr_max_payload_by_version() {
        assert_eq!(Addr::max_payload_length(&params(PROTOCOL_VERSION)), 9 + 1000 * 30);
        assert_eq!(Addr::max_payload_length(&params(NET_ADDRESS_TIME_VERSION - 1)), 9 + 1000 * 26);
        assert_eq!(Addr::max_payload_length(&params(MULTIPLE_ADDRESS_VERSION - 1)), 9 + 26);
    }

    #[test]
    fn addr_limits() {
        let mut msg = Addr::new();
        for i in 0..MAX_ADDR_PER_MSG {
            msg.add_address(addr(&format!("10.0.{}.{}:8333", i / 256, i % 256)))
                .unwrap();
        }
        assert!(msg.add_address(addr("1.2.3.4:1")).unwrap_err().is_protocol());
        assert!(msg.add_addresses(vec![addr("1.2.3.4:1")]).is_err());
        assert_eq!(msg.addr_list.len(), 1000);

        // list grown past the limit directly
        msg.addr_list.push(addr("1.2.3.4:1"));
        assert!(msg.encode(&mut Vec::new(), &params(PROTOCOL_VERSION)).is_err());

        // more than one address before multi-address support
        let mut two = Addr::new();
        two.add_addresses(vec![addr("1.1.1.1:1"), addr("2.2.2.2:2")]).unwrap();
        let err = two
            .encode(&mut Vec::new(), &params(MULTIPLE_ADDRESS_VERSION - 1))
            .unwrap_err();
        assert!(err.is_protocol());

        msg.clear_addresses();
        assert!(msg.addr_list.is_empty());
    }

    #[test]
    fn addr_decode_rejects_excess_count() {
        let mut bytes = vec![];
        write_varint(&mut bytes, MAX_ADDR_PER_MSG + 1).unwrap();
        assert!(decode::<Addr>(&bytes, PROTOCOL_VERSION).unwrap_err().is_protocol());
    }

    #[test]
    fn ping_nonce_after_bip31_only() {
        let ping = Ping::new(123123);
        assert_eq!(encode(&ping, PROTOCOL_VERSION), hex::decode("f3e0010000000000").unwrap());
        assert_eq!(decode::<Ping>(&encode(&ping, PROTOCOL_VERSION), PROTOCOL_VERSION).unwrap(), ping);
        assert_eq!(Ping::max_payload_length(&params(PROTOCOL_VERSION)), 8);

        assert!(encode(&ping, BIP0031_VERSION).is_empty());
        assert_eq!(Ping::max_payload_length(&params(BIP0031_VERSION)), 0);
        let decoded = decode::<Ping>(&encode(&ping, PROTOCOL_VERSION), BIP0031_VERSION).unwrap();
        assert_eq!(decoded.nonce, 0);
    }

    #[test]
    fn pong_encoding() {
        let pong = Pong::new(123123);
        let bytes = encode(&pong, PROTOCOL_VERSION);
        assert_eq!(bytes, [0xf3, 0xe0, 0x01, 0x00, 0x00, 0x00, 0x00, 0x00]);
        assert_eq!(decode::<Pong>(&bytes, PROTOCOL_VERSION).unwrap(), pong);
        assert_eq!(Pong::max_payload_length(&params(PROTOCOL_VERSION)), 8);
    }

    #[test]
    fn pong_rejected_at_bip31_version() {
        let pong = Pong::new(123123);
        let err = pong.encode(&mut Vec::new(), &params(BIP0031_VERSION)).unwrap_err();
        assert!(err.is_protocol());

        let bytes = encode(&pong, PROTOCOL_VERSION);
        let err = decode::<Pong>(&bytes, BIP0031_VERSION).unwrap_err();
        assert!(err.is_protocol());
        assert_eq!(Pong::max_payload_length(&params(BIP0031_VERSION)), 0);

        assert!(decode::<Pong>(&bytes, BIP0031_VERSION + 1).is_ok());
    }

    #[test]
    fn pong_short_io() {
        let pong = Pong::new(1);
        let err = pong.encode(&mut FixedWriter::new(0), &params(PROTOCOL_VERSION)).unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::WriteZero));

        let bytes = encode(&pong, PROTOCOL_VERSION);
        let err = Pong::decode(&mut FixedReader::new(4, &bytes), &params(PROTOCOL_VERSION)).unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::UnexpectedEof));
    }

    #[test]
    fn reject_code_display() {
        assert_eq!(RejectCode::MALFORMED.to_string(), "REJECT_MALFORMED");
        assert_eq!(RejectCode::INSUFFICIENT_FEE.to_string(), "REJECT_INSUFFICIENTFEE");
        assert_eq!(RejectCode::CHECKPOINT.to_string(), "REJECT_CHECKPOINT");
        assert_eq!(RejectCode(0xff).to_string(), "Unknown RejectCode (255)");
    }

    #[test]
    fn reject_hash_only_for_block_and_tx() {
        let mut block = Reject::new("block", RejectCode::DUPLICATE, "duplicate block");
        block.hash = crate::wire::constants::GENESIS_BLOCK_HASH_MAINNET;
        let bytes = encode(&block, PROTOCOL_VERSION);
        assert_eq!(bytes.len(), 1 + 5 + 1 + 1 + 15 + 32);
        assert_eq!(decode::<Reject>(&bytes, PROTOCOL_VERSION).unwrap(), block);

        let other = Reject::new("version", RejectCode::OBSOLETE, "too old");
        let bytes = encode(&other, PROTOCOL_VERSION);
        assert_eq!(bytes.len(), 1 + 7 + 1 + 1 + 7);
        assert_eq!(decode::<Reject>(&bytes, PROTOCOL_VERSION).unwrap(), other);
    }

    #[test]
    fn reject_version_gate() {
        let msg = Reject::new("tx", RejectCode::DUST, "dust");
        assert!(msg.encode(&mut Vec::new(), &params(REJECT_VERSION - 1)).is_err());
        assert!(decode::<Reject>(&encode(&msg, REJECT_VERSION), REJECT_VERSION - 1).is_err());
        assert_eq!(Reject::max_payload_length(&params(REJECT_VERSION - 1)), 0);
        assert_eq!(
            Reject::max_payload_length(&params(REJECT_VERSION)),
            Limits::default().max_message_payload()
        );
    }

    #[test]
    fn send_headers_version_gate() {
        assert!(encode(&SendHeaders, SEND_HEADERS_VERSION).is_empty());
        assert!(SendHeaders.encode(&mut Vec::new(), &params(SEND_HEADERS_VERSION - 1)).is_err());
        assert!(decode::<SendHeaders>(&[], SEND_HEADERS_VERSION - 1).is_err());
    }

    #[test]
    fn fee_filter() {
        let msg = FeeFilter::new(123123);
        let bytes = encode(&msg, PROTOCOL_VERSION);
        assert_eq!(bytes, hex::decode("f3e0010000000000").unwrap());
        assert_eq!(decode::<FeeFilter>(&bytes, PROTOCOL_VERSION).unwrap(), msg);
        assert!(decode::<FeeFilter>(&bytes, FEE_FILTER_VERSION - 1).is_err());
        assert!(msg.encode(&mut Vec::new(), &params(FEE_FILTER_VERSION - 1)).is_err());
    }

    #[test]
    fn send_compact_layout() {
        for send in [true, false] {
            let msg = SendCompact::new(send);
            let bytes = encode(&msg, PROTOCOL_VERSION);
            let mut want = vec![u8::from(send)];
            want.extend_from_slice(&[0x01, 0, 0, 0, 0, 0, 0, 0]);
            assert_eq!(bytes, want);
            assert_eq!(decode::<SendCompact>(&bytes, PROTOCOL_VERSION).unwrap(), msg);
        }

        let bytes = encode(&SendCompact::new(true), PROTOCOL_VERSION);
        let err = SendCompact::decode(&mut FixedReader::new(5, &bytes), &params(PROTOCOL_VERSION))
            .unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::UnexpectedEof));
    }

    #[test]
    fn protoconf_round_trip() {
        let msg = Protoconf::new(DEFAULT_MAX_RECV_PAYLOAD_LENGTH, DEFAULT_STREAM_POLICY);
        let bytes = encode(&msg, PROTOCOL_VERSION);
        assert_eq!(&bytes[..5], &[0x02, 0x00, 0x00, 0x20, 0x00]);
        assert_eq!(decode::<Protoconf>(&bytes, PROTOCOL_VERSION).unwrap(), msg);

        let one = Protoconf {
            number_of_fields: 1,
            max_recv_payload_length: 1000,
            stream_policies: String::new(),
        };
        assert_eq!(encode(&one, PROTOCOL_VERSION).len(), 5);
        assert_eq!(decode::<Protoconf>(&encode(&one, PROTOCOL_VERSION), PROTOCOL_VERSION).unwrap(), one);

        assert!(msg.encode(&mut Vec::new(), &params(PROTOCONF_VERSION - 1)).is_err());
        assert!(decode::<Protoconf>(&bytes, PROTOCONF_VERSION - 1).is_err());
    }

    #[test]
    fn ext_msg_layout() {
        let msg = ExtMsg::new(12345);
        assert_eq!(ExtMsg::COMMAND, "protoconf");
        assert_eq!(ExtMsg::max_payload_length(&params(PROTOCOL_VERSION)), MAX_PROTOCONF_PAYLOAD);

        let bytes = encode(&msg, PROTOCOL_VERSION);
        assert_eq!(hex::encode(&bytes), "01000000000000003930000000000000");
        assert_eq!(decode::<ExtMsg>(&bytes, PROTOCOL_VERSION).unwrap(), msg);
        assert_eq!(decode::<ExtMsg>(&[], PROTOCOL_VERSION).unwrap(), ExtMsg::default());

        assert!(decode::<ExtMsg>(&bytes[..3], PROTOCOL_VERSION)
            .unwrap_err()
            .io_kind()
            .is_some());
        assert!(msg.encode(&mut Vec::new(), &params(PROTOCONF_VERSION - 1)).is_err());
        assert!(decode::<ExtMsg>(&[], PROTOCONF_VERSION - 1).is_err());

        let err = msg.encode(&mut FixedWriter::new(0), &params(PROTOCOL_VERSION)).unwrap_err();
        assert_eq!(err.io_kind(), Some(ErrorKind::WriteZero));
    }
}
