use std::io::{self, Read, Write};
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

use byteorder::{BigEndian, ReadBytesExt, WriteBytesExt};

use crate::wire::constants::NET_ADDRESS_TIME_VERSION;
use crate::wire::primitive::{read_element, write_element};
use crate::wire::protocol::Services;

/// A peer address as carried in `version` and `addr` payloads.
///
/// Layout:
///
/// ```text
/// u32       timestamp   (addr only, protocol >= 31402)
/// u64       services
/// [u8; 16]  IPv6 address, IPv4 as ::ffff:a.b.c.d
/// u16       port        (big-endian)
/// ```
///
/// https://developer.bitcoin.org/reference/p2p_networking.html#addr
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NetAddress {
    /// Last time the address was seen, seconds since the Unix epoch.
    pub timestamp: u32,
    pub services: Services,
    pub ip: Ipv6Addr,
    pub port: u16,
}

impl Default for NetAddress {
    fn default() -> Self {
        Self {
            timestamp: 0,
            services: Services::NONE,
            ip: Ipv6Addr::UNSPECIFIED,
            port: 0,
        }
    }
}

impl NetAddress {
    pub fn new(addr: SocketAddr, services: Services) -> Self {
        let ip = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped(),
            IpAddr::V6(v6) => v6,
        };

        Self {
            timestamp: 0,
            services,
            ip,
            port: addr.port(),
        }
    }

    pub fn with_timestamp(mut self, timestamp: u32) -> Self {
        self.timestamp = timestamp;
        self
    }

    /// The address as a socket address, unwrapping IPv4-mapped addresses.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = match self.ip.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(self.ip),
        };
        SocketAddr::new(ip, self.port)
    }

    /// Encoded size at `pver` when the timestamp is included.
    pub fn max_payload(pver: u32) -> u64 {
        let ts = if pver >= NET_ADDRESS_TIME_VERSION { 4 } else { 0 };
        ts + 8 + 16 + 2
    }

    /// Writes the address; the timestamp only when `with_timestamp` is set
    /// and `pver` carries it.
    pub fn encode<W: Write + ?Sized>(
        &self,
        w: &mut W,
        pver: u32,
        with_timestamp: bool,
    ) -> io::Result<()> {
        if with_timestamp && pver >= NET_ADDRESS_TIME_VERSION {
            write_element(w, &self.timestamp)?;
        }
        write_element(w, &self.services.bits())?;
        write_element(w, &self.ip.octets())?;
        w.write_u16::<BigEndian>(self.port)
    }

    pub fn decode<R: Read + ?Sized>(r: &mut R, pver: u32, with_timestamp: bool) -> io::Result<Self> {
        let timestamp = if with_timestamp && pver >= NET_ADDRESS_TIME_VERSION {
            read_element(r)?
        } else {
            0
        };
        let services = Services::from(read_element::<_, u64>(r)?);
        let ip = Ipv6Addr::from(read_element::<_, [u8; 16]>(r)?);
        let port = r.read_u16::<BigEndian>()?;

        Ok(Self {
            timestamp,
            services,
            ip,
            port,
        })
    }
}
