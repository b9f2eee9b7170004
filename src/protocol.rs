use std::{
    convert::TryFrom,
    fmt,
    net::{IpAddr, Ipv4Addr, Ipv6Addr},
};

/// The only wire version this crate speaks.
pub const VERSION: u8 = 1;

/// Identity of a peer: the raw bytes of its IPv4 or IPv6 address.
///
/// Two addresses are equal only if their bytes are equal, so an IPv4 address
/// and its IPv4-mapped IPv6 form are different peers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeerAddress {
    V4([u8; 4]),
    V6([u8; 16]),
}

impl PeerAddress {
    /// Build an address from raw bytes, `None` unless there are exactly 4 or 16.
    pub fn from_bytes(bytes: &[u8]) -> Option<Self> {
        match bytes.len() {
            4 => {
                let mut octets = [0; 4];
                octets.copy_from_slice(bytes);
                Some(PeerAddress::V4(octets))
            }
            16 => {
                let mut octets = [0; 16];
                octets.copy_from_slice(bytes);
                Some(PeerAddress::V6(octets))
            }
            _ => None,
        }
    }

    pub fn as_bytes(&self) -> &[u8] {
        match self {
            PeerAddress::V4(octets) => &octets[..],
            PeerAddress::V6(octets) => &octets[..],
        }
    }

    /// Number of address bytes on the wire.
    pub fn wire_len(&self) -> usize {
        self.as_bytes().len()
    }

    pub fn ip(&self) -> IpAddr {
        match *self {
            PeerAddress::V4(octets) => IpAddr::V4(Ipv4Addr::from(octets)),
            PeerAddress::V6(octets) => IpAddr::V6(Ipv6Addr::from(octets)),
        }
    }
}

impl From<IpAddr> for PeerAddress {
    fn from(ip: IpAddr) -> Self {
        match ip {
            IpAddr::V4(ip) => PeerAddress::V4(ip.octets()),
            IpAddr::V6(ip) => PeerAddress::V6(ip.octets()),
        }
    }
}

impl From<Ipv4Addr> for PeerAddress {
    fn from(ip: Ipv4Addr) -> Self {
        PeerAddress::V4(ip.octets())
    }
}

impl From<Ipv6Addr> for PeerAddress {
    fn from(ip: Ipv6Addr) -> Self {
        PeerAddress::V6(ip.octets())
    }
}

impl From<PeerAddress> for IpAddr {
    fn from(addr: PeerAddress) -> Self {
        addr.ip()
    }
}

impl fmt::Display for PeerAddress {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(&self.ip(), f)
    }
}

/// The event carried for each entry of a packet.
///
/// This is not the stored membership state, a node only ever stores a peer as
/// online or offline. The status is what drives the transition between them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum PeerStatus {
    Offline = 0,
    Online = 1,
    New = 2,
    Failed = 3,
    Revived = 4,
}

impl PeerStatus {
    pub fn code(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for PeerStatus {
    type Error = u8;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(PeerStatus::Offline),
            1 => Ok(PeerStatus::Online),
            2 => Ok(PeerStatus::New),
            3 => Ok(PeerStatus::Failed),
            4 => Ok(PeerStatus::Revived),
            other => Err(other),
        }
    }
}

impl fmt::Display for PeerStatus {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{:?}", self)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Packet {
    version: u8,
    heartbeat: bool,
    entries: Vec<(PeerAddress, PeerStatus)>,
}

impl Packet {
    pub fn new(heartbeat: bool, entries: Vec<(PeerAddress, PeerStatus)>) -> Self {
        Packet {
            version: VERSION,
            heartbeat,
            entries,
        }
    }

    /// A periodic snapshot of the whole membership view.
    pub fn heartbeat(entries: Vec<(PeerAddress, PeerStatus)>) -> Self {
        Packet::new(true, entries)
    }

    /// A targeted notification about a single peer.
    pub fn single(addr: PeerAddress, status: PeerStatus) -> Self {
        Packet::new(false, vec![(addr, status)])
    }

    pub fn version(&self) -> u8 {
        self.version
    }

    pub fn is_heartbeat(&self) -> bool {
        self.heartbeat
    }

    pub fn entries(&self) -> &[(PeerAddress, PeerStatus)] {
        &self.entries
    }

    pub fn into_entries(self) -> Vec<(PeerAddress, PeerStatus)> {
        self.entries
    }
}
