//! The `ipaddr` extension type: an IPv4/IPv6 address with a prefix length.

use std::fmt::{Display, Formatter, Result as FmtResult};
use std::net::IpAddr as StdIpAddr;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::PolicyError;

const V4_WIDTH: u8 = 32;
const V6_WIDTH: u8 = 128;

/// An address plus prefix length. A bare address carries the full width
/// of its family (`/32` or `/128`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "IpAddrRepr", into = "IpAddrRepr")]
pub struct IpAddr {
    addr: StdIpAddr,
    prefix: u8,
}

/// Wire form of [`IpAddr`]; deserializing goes through [`IpAddr::new`].
#[derive(Serialize, Deserialize)]
struct IpAddrRepr {
    addr: StdIpAddr,
    prefix: u8,
}

impl TryFrom<IpAddrRepr> for IpAddr {
    type Error = PolicyError;

    fn try_from(repr: IpAddrRepr) -> Result<Self, Self::Error> {
        IpAddr::new(repr.addr, repr.prefix)
    }
}

impl From<IpAddr> for IpAddrRepr {
    fn from(ip: IpAddr) -> Self {
        IpAddrRepr {
            addr: ip.addr,
            prefix: ip.prefix,
        }
    }
}

impl IpAddr {
    pub fn new(addr: StdIpAddr, prefix: u8) -> Result<Self, PolicyError> {
        if prefix > width(&addr) {
            return Err(PolicyError::InvalidIpAddr(format!(
                "prefix /{prefix} is too long for {addr}"
            )));
        }
        Ok(IpAddr { addr, prefix })
    }

    pub fn addr(&self) -> StdIpAddr {
        self.addr
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn is_ipv4(&self) -> bool {
        self.addr.is_ipv4()
    }

    pub fn is_ipv6(&self) -> bool {
        self.addr.is_ipv6()
    }

    /// True when the whole range lies in 127.0.0.0/8 or is exactly ::1.
    pub fn is_loopback(&self) -> bool {
        let min_prefix = if self.is_ipv4() { 8 } else { V6_WIDTH };
        self.addr.is_loopback() && self.prefix >= min_prefix
    }

    /// True when the whole range lies in 224.0.0.0/4 or ff00::/8.
    pub fn is_multicast(&self) -> bool {
        let min_prefix = if self.is_ipv4() { 4 } else { 8 };
        self.addr.is_multicast() && self.prefix >= min_prefix
    }

    /// True when `self` lies inside `range`. Addresses of different
    /// families are never in range of each other.
    pub fn is_in_range(&self, range: &IpAddr) -> bool {
        if self.is_ipv4() != range.is_ipv4() || self.prefix < range.prefix {
            return false;
        }
        let width = width(&self.addr);
        masked(&self.addr, range.prefix, width) == masked(&range.addr, range.prefix, width)
    }
}

fn width(addr: &StdIpAddr) -> u8 {
    match addr {
        StdIpAddr::V4(_) => V4_WIDTH,
        StdIpAddr::V6(_) => V6_WIDTH,
    }
}

fn masked(addr: &StdIpAddr, prefix: u8, width: u8) -> u128 {
    let bits = match addr {
        StdIpAddr::V4(v4) => u128::from(u32::from(*v4)),
        StdIpAddr::V6(v6) => u128::from(*v6),
    };
    let host_bits = u32::from(width.saturating_sub(prefix));
    if host_bits >= 128 {
        0
    } else {
        bits >> host_bits
    }
}

impl FromStr for IpAddr {
    type Err = PolicyError;

    /// Parses `addr` or `addr/prefix` for either family.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = || PolicyError::InvalidIpAddr(s.to_string());
        let (addr, prefix) = match s.split_once('/') {
            Some((addr, prefix)) => (addr, Some(prefix)),
            None => (s, None),
        };
        let addr: StdIpAddr = addr.parse().map_err(|_| invalid())?;
        let prefix = match prefix {
            Some(p) if !p.is_empty() && p.bytes().all(|b| b.is_ascii_digit()) => {
                p.parse::<u8>().map_err(|_| invalid())?
            }
            Some(_) => return Err(invalid()),
            None => width(&addr),
        };
        IpAddr::new(addr, prefix)
    }
}

impl Display for IpAddr {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        if self.prefix == width(&self.addr) {
            write!(f, "{}", self.addr)
        } else {
            write!(f, "{}/{}", self.addr, self.prefix)
        }
    }
}
