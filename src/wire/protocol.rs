//! Network identifiers, service flags and the protocol version gate.

use std::fmt::{self, Debug, Display, Formatter};

use crate::wire::error::{message_error, WireError};

/// Network magic carried in the first 4 bytes of every message header.
///
/// It identifies the network and acts as a message boundary marker in the
/// stream. Serialized little-endian, so mainnet `0xe8f3e1e3` appears on the
/// wire as `e3 e1 f3 e8`.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct BitcoinNet(pub u32);

impl BitcoinNet {
    pub const MAIN_NET: BitcoinNet = BitcoinNet(0xe8f3_e1e3);
    pub const TEST_NET: BitcoinNet = BitcoinNet(0xf4f3_e5f4);
    pub const REG_TEST: BitcoinNet = BitcoinNet(0xdab5_bffa);
    /// Scaling test network.
    pub const STN: BitcoinNet = BitcoinNet(0xf9c4_cefb);
}

impl Display for BitcoinNet {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match *self {
            BitcoinNet::MAIN_NET => write!(f, "MainNet"),
            BitcoinNet::TEST_NET => write!(f, "TestNet"),
            BitcoinNet::REG_TEST => write!(f, "RegTest"),
            BitcoinNet::STN => write!(f, "STN"),
            BitcoinNet(other) => write!(f, "Unknown BitcoinNet ({other})"),
        }
    }
}

/// Service flags advertised in `version` and network addresses.
///
/// The flags are forward-compatible: unknown bits are preserved.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct Services(u64);

impl Services {
    pub const fn new(bits: u64) -> Self {
        Self(bits)
    }

    pub const fn bits(self) -> u64 {
        self.0
    }

    /// Returns true if all bits in `other` are set.
    pub const fn contains(self, other: Services) -> bool {
        (self.0 & other.0) == other.0
    }

    pub const fn is_empty(self) -> bool {
        self.0 == 0
    }

    pub const NONE: Services = Services(0x00);

    /// Full node, can be asked for full blocks.
    pub const NODE_NETWORK: Services = Services(0x01);

    /// Answers `getutxo` (BIP 64).
    pub const NODE_GET_UTXO: Services = Services(0x02);

    /// Supports bloom-filtered connections (BIP 111).
    pub const NODE_BLOOM: Services = Services(0x04);

    pub const NODE_WITNESS: Services = Services(0x08);

    pub const NODE_XTHIN: Services = Services(0x10);

    pub const NODE_BITCOIN_CASH: Services = Services(0x20);

    pub const NODE_GRAPHENE: Services = Services(0x40);

    pub const NODE_WEAK_BLOCKS: Services = Services(0x80);

    /// Serves committed filters (BIP 157).
    pub const NODE_CF: Services = Services(0x100);

    pub const NODE_XTHINNER: Services = Services(0x200);

    /// Same as `NODE_NETWORK` but only guarantees the last 288 blocks (BIP 159).
    pub const NODE_NETWORK_LIMITED: Services = Services(0x400);

    const NAMED: [(Services, &'static str); 11] = [
        (Self::NODE_NETWORK, "NODE_NETWORK"),
        (Self::NODE_GET_UTXO, "NODE_GET_UTXO"),
        (Self::NODE_BLOOM, "NODE_BLOOM"),
        (Self::NODE_WITNESS, "NODE_WITNESS"),
        (Self::NODE_XTHIN, "NODE_XTHIN"),
        (Self::NODE_BITCOIN_CASH, "NODE_BITCOIN_CASH"),
        (Self::NODE_GRAPHENE, "NODE_GRAPHENE"),
        (Self::NODE_WEAK_BLOCKS, "NODE_WEAK_BLOCKS"),
        (Self::NODE_CF, "NODE_CF"),
        (Self::NODE_XTHINNER, "NODE_XTHINNER"),
        (Self::NODE_NETWORK_LIMITED, "NODE_NETWORK_LIMITED"),
    ];

    pub fn names(self) -> Vec<&'static str> {
        if self.is_empty() {
            return vec!["NONE"];
        }

        Self::NAMED
            .iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, name)| *name)
            .collect()
    }

    /// Bits not covered by any named flag.
    pub fn unknown_bits(self) -> u64 {
        Self::NAMED
            .iter()
            .fold(self.0, |bits, (flag, _)| bits & !flag.0)
    }
}

impl From<u64> for Services {
    fn from(value: u64) -> Self {
        Services::new(value)
    }
}

impl Debug for Services {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return write!(f, "Services(NONE)");
        }

        let mut names = self.names().join(" | ");
        let unknown = self.unknown_bits();
        if unknown != 0 {
            if !names.is_empty() {
                names.push_str(" | ");
            }
            names.push_str(&format!("0x{unknown:x}"));
        }

        write!(f, "Services({}) [0x{:016x}]", names, self.bits())
    }
}

/// Fails unless `pver` is at or after `threshold`.
///
/// Used by every message whose existence or layout starts at a given version.
pub fn enforce_min_version(
    pver: u32,
    threshold: u32,
    message: &str,
    operation: &'static str,
) -> Result<(), WireError> {
    if pver < threshold {
        return Err(message_error(
            operation,
            format!("{message} message invalid for protocol version {pver}"),
        ));
    }
    Ok(())
}

/// Fails unless `pver` is strictly after `threshold`.
///
/// BIP 31 was defined as *after* its reference version, so the ping nonce and
/// the `pong` message use this comparison instead of [`enforce_min_version`].
pub fn enforce_after_version(
    pver: u32,
    threshold: u32,
    message: &str,
    operation: &'static str,
) -> Result<(), WireError> {
    if pver <= threshold {
        return Err(message_error(
            operation,
            format!("{message} message invalid for protocol version {pver}"),
        ));
    }
    Ok(())
}
