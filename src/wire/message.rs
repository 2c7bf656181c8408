use std::fmt::{self, Display, Formatter};
use std::io::{Read, Write};
use std::str::FromStr;

use crate::wire::block::Block;
use crate::wire::error::{UnknownCommand, WireError};
use crate::wire::limits::WireParams;
use crate::wire::message_auth::{AuthChallenge, AuthResponse};
use crate::wire::message_blockdata::{
    GetBlocks, GetData, GetHeaders, Headers, Inv, MemPool, NotFound,
};
use crate::wire::message_bloom::{FilterAdd, FilterClear, FilterLoad, MerkleBlock};
use crate::wire::message_filter::{
    CFCheckpt, CFHeaders, CFilter, GetCFCheckpt, GetCFHeaders, GetCFilters,
};
use crate::wire::message_network::{
    Addr, ExtMsg, FeeFilter, GetAddr, Ping, Pong, Protoconf, Reject, SendCompact, SendHeaders,
    VerAck, Version,
};
use crate::wire::message_stream::{CreateStream, StreamAck};
use crate::wire::tx::{ExtendedTx, Tx};

/// A message payload with its own wire layout.
///
/// Implementors own the byte layout of the payload only; the envelope is
/// handled by [`WireCodec`](crate::wire::codec::WireCodec). The `Default`
/// value is the empty instance a payload is decoded into.
pub trait Payload: Sized + Default {
    /// Command written in the message header.
    const COMMAND: &'static str;

    fn encode<W: Write + ?Sized>(&self, w: &mut W, params: &WireParams) -> Result<(), WireError>;

    fn decode<R: Read + ?Sized>(r: &mut R, params: &WireParams) -> Result<Self, WireError>;

    /// Largest payload this message may have at `params.pver`.
    fn max_payload_length(params: &WireParams) -> u64;
}

/// Generates [`Command`], [`Message`] and the dispatch between them from a
/// single list of `Variant(PayloadType) => "registry key"` entries.
macro_rules! define_messages {
    ($($variant:ident($ty:ty) => $key:literal,)*) => {
        /// Every command the registry knows.
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
        pub enum Command {
            $($variant,)*
        }

        impl Command {
            pub const ALL: &'static [Command] = &[$(Command::$variant,)*];

            /// The command string this entry is registered under.
            pub fn as_str(self) -> &'static str {
                match self {
                    $(Command::$variant => $key,)*
                }
            }

            /// A message of this kind with every field at its default, ready to
            /// be filled in.
            pub fn empty_message(self) -> Message {
                match self {
                    $(Command::$variant => Message::$variant(<$ty>::default()),)*
                }
            }

            pub fn max_payload_length(self, params: &WireParams) -> u64 {
                match self {
                    $(Command::$variant => <$ty as Payload>::max_payload_length(params),)*
                }
            }

            /// Decodes a payload of this kind from `r`.
            pub fn read_payload<R: Read + ?Sized>(
                self,
                r: &mut R,
                params: &WireParams,
            ) -> Result<Message, WireError> {
                match self {
                    $(Command::$variant => Ok(Message::$variant(<$ty as Payload>::decode(r, params)?)),)*
                }
            }
        }

        impl FromStr for Command {
            type Err = UnknownCommand;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($key => Ok(Command::$variant),)*
                    other => Err(UnknownCommand(other.to_string())),
                }
            }
        }

        /// A decoded message of any known kind.
        #[derive(Debug, Clone, PartialEq)]
        pub enum Message {
            $($variant($ty),)*
        }

        impl Message {
            pub fn kind(&self) -> Command {
                match self {
                    $(Message::$variant(_) => Command::$variant,)*
                }
            }

            /// The command written in the header when this message is sent.
            pub fn command(&self) -> &'static str {
                match self {
                    $(Message::$variant(_) => <$ty as Payload>::COMMAND,)*
                }
            }

            pub fn encode<W: Write + ?Sized>(
                &self,
                w: &mut W,
                params: &WireParams,
            ) -> Result<(), WireError> {
                match self {
                    $(Message::$variant(m) => m.encode(w, params),)*
                }
            }

            pub fn max_payload_length(&self, params: &WireParams) -> u64 {
                self.kind().max_payload_length(params)
            }
        }

        $(
            impl From<$ty> for Message {
                fn from(m: $ty) -> Self {
                    Message::$variant(m)
                }
            }
        )*
    };
}

define_messages! {
    Version(Version) => "version",
    VerAck(VerAck) => "verack",
    GetAddr(GetAddr) => "getaddr",
    Addr(Addr) => "addr",
    GetBlocks(GetBlocks) => "getblocks",
    Inv(Inv) => "inv",
    GetData(GetData) => "getdata",
    NotFound(NotFound) => "notfound",
    Block(Block) => "block",
    Tx(Tx) => "tx",
    ExtendedTx(ExtendedTx) => "exttx",
    GetHeaders(GetHeaders) => "getheaders",
    Headers(Headers) => "headers",
    Ping(Ping) => "ping",
    Pong(Pong) => "pong",
    MemPool(MemPool) => "mempool",
    FilterAdd(FilterAdd) => "filteradd",
    FilterClear(FilterClear) => "filterclear",
    FilterLoad(FilterLoad) => "filterload",
    MerkleBlock(MerkleBlock) => "merkleblock",
    Reject(Reject) => "reject",
    SendHeaders(SendHeaders) => "sendheaders",
    FeeFilter(FeeFilter) => "feefilter",
    GetCFilters(GetCFilters) => "getcfilters",
    GetCFHeaders(GetCFHeaders) => "getcfheaders",
    GetCFCheckpt(GetCFCheckpt) => "getcfcheckpt",
    CFilter(CFilter) => "cfilter",
    CFHeaders(CFHeaders) => "cfheaders",
    CFCheckpt(CFCheckpt) => "cfcheckpt",
    Protoconf(Protoconf) => "protoconf",
    ExtMsg(ExtMsg) => "extmsg",
    SendCompact(SendCompact) => "sendcmpct",
    AuthChallenge(AuthChallenge) => "authch",
    AuthResponse(AuthResponse) => "authresp",
    CreateStream(CreateStream) => "createstrm",
    StreamAck(StreamAck) => "streamack",
}

impl Display for Command {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Looks up `command` in the registry and returns an empty message of that
/// kind.
pub fn make_empty_message(command: &str) -> Result<Message, UnknownCommand> {
    command.parse::<Command>().map(Command::empty_message)
}
