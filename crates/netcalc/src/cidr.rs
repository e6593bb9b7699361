//! CIDR arithmetic on the 32-bit integer representation of IPv4 space.

use std::fmt;
use std::net::Ipv4Addr;

use serde::{Serialize, Serializer};

use crate::{AllocError, Result};

/// Longest possible IPv4 prefix (a single address).
pub const MAX_PREFIX: u8 = 32;

/// A validated network/prefix pair. The address is always a true network
/// address: every host bit below the prefix is zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct NetworkSpec {
    addr: u32,
    prefix: u8,
}

impl NetworkSpec {
    /// Build a spec from an address already aligned to `prefix`.
    /// Rejects prefixes outside 1..=32 and addresses with host bits set.
    pub fn new(addr: Ipv4Addr, prefix: u8) -> Result<Self> {
        if !(1..=MAX_PREFIX).contains(&prefix) {
            return Err(AllocError::Format(
                "CIDR must be between 1 and 32".to_string(),
            ));
        }
        let bits = u32::from(addr);
        if bits & !prefix_mask(prefix) != 0 {
            return Err(AllocError::Format(
                "must be a valid network address".to_string(),
            ));
        }
        Ok(Self { addr: bits, prefix })
    }

    pub fn address(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr)
    }

    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    pub fn mask(&self) -> Ipv4Addr {
        Ipv4Addr::from(prefix_mask(self.prefix))
    }

    pub fn broadcast(&self) -> Ipv4Addr {
        Ipv4Addr::from(self.addr | !prefix_mask(self.prefix))
    }

    /// Total address count, network and broadcast included.
    pub fn addresses(&self) -> u64 {
        1u64 << (MAX_PREFIX - self.prefix)
    }

    /// Usable host count: everything strictly between network and
    /// broadcast, zero for /31 and /32.
    pub fn usable_hosts(&self) -> u64 {
        let total = self.addresses();
        if total > 2 {
            total - 2
        } else {
            0
        }
    }

    /// True if `other`'s address range lies inside this network.
    pub fn contains(&self, other: &NetworkSpec) -> bool {
        other.prefix >= self.prefix
            && (u32::from(other.address()) & prefix_mask(self.prefix)) == self.addr
    }

    /// Lazily enumerate the `2^(new_prefix - prefix)` equal-size subnets
    /// of this network at `new_prefix`, in ascending address order.
    pub fn subnets(&self, new_prefix: u8) -> Result<Subnets> {
        if new_prefix < self.prefix || new_prefix > MAX_PREFIX {
            return Err(AllocError::Range(format!(
                "new prefix must be between {} and {}",
                self.prefix, MAX_PREFIX
            )));
        }
        let start = self.addr as u64;
        Ok(Subnets {
            cursor: start,
            end: start + self.addresses(),
            step: 1u64 << (MAX_PREFIX - new_prefix),
            prefix: new_prefix,
        })
    }
}

impl fmt::Display for NetworkSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.address(), self.prefix)
    }
}

/// Iterator over the subnets of a network at a fixed new prefix.
///
/// The cursor runs in u64 so the block ending at 255.255.255.255 does
/// not overflow.
pub struct Subnets {
    cursor: u64,
    end: u64,
    step: u64,
    prefix: u8,
}

impl Iterator for Subnets {
    type Item = NetworkSpec;

    fn next(&mut self) -> Option<NetworkSpec> {
        if self.cursor >= self.end {
            return None;
        }
        let spec = NetworkSpec {
            addr: self.cursor as u32,
            prefix: self.prefix,
        };
        self.cursor += self.step;
        Some(spec)
    }
}

fn prefix_mask(prefix: u8) -> u32 {
    // u64 shift so prefix 0 would not overflow the u32 shift count
    let right = (MAX_PREFIX - prefix) as u64;
    (((u32::MAX as u64) >> right) << right) as u32
}

/// Parse strict `a.b.c.d/p` notation into a [`NetworkSpec`].
///
/// Strict means: exactly four decimal octets, no leading zeros, octets
/// in 0..=255, prefix 1..=32, and the address equal to its own network
/// address (host bits all zero).
pub fn parse_network(text: &str) -> Result<NetworkSpec> {
    let format_err = || AllocError::Format("Invalid IP/CIDR format".to_string());

    let (ip_part, prefix_part) = text.split_once('/').ok_or_else(format_err)?;

    if prefix_part.is_empty()
        || prefix_part.len() > 2
        || !prefix_part.bytes().all(|b| b.is_ascii_digit())
    {
        return Err(format_err());
    }

    let octet_parts: Vec<&str> = ip_part.split('.').collect();
    if octet_parts.len() != 4 {
        return Err(format_err());
    }
    for part in &octet_parts {
        if part.is_empty() || part.len() > 3 || !part.bytes().all(|b| b.is_ascii_digit()) {
            return Err(format_err());
        }
        if part.len() > 1 && part.starts_with('0') {
            return Err(format_err());
        }
    }

    let prefix: u8 = prefix_part.parse().map_err(|_| format_err())?;
    if !(1..=MAX_PREFIX).contains(&prefix) {
        return Err(AllocError::Format(
            "CIDR must be between 1 and 32".to_string(),
        ));
    }

    let mut bits: u32 = 0;
    for part in &octet_parts {
        let octet: u16 = part.parse().map_err(|_| format_err())?;
        if octet > 255 {
            return Err(AllocError::Format(
                "IP octets must be between 0 and 255".to_string(),
            ));
        }
        bits = (bits << 8) | u32::from(octet);
    }

    NetworkSpec::new(Ipv4Addr::from(bits), prefix)
}

/// Prefix needed to carve `segment_count` equal subnets out of
/// `base_prefix`: `base + ceil(log2(count))`. A single segment adds no
/// bits. May exceed 32; callers treat that as a capacity failure.
pub fn required_prefix(base_prefix: u8, segment_count: u32) -> u8 {
    let extra = segment_count.max(1).next_power_of_two().trailing_zeros() as u8;
    base_prefix.saturating_add(extra)
}

/// One allocated subnet, ready for serialization. Addresses render as
/// dotted quads; `default_gateway`, `first_usable` and `last_usable`
/// fall back to the `"N/A"` sentinel when the subnet has no usable
/// hosts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SubnetResult {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_id: Option<u16>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub vlan_name: Option<String>,
    pub network_id: Ipv4Addr,
    pub subnet_mask: Ipv4Addr,
    pub broadcast: Ipv4Addr,
    #[serde(serialize_with = "addr_or_na")]
    pub default_gateway: Option<Ipv4Addr>,
    pub usable_hosts: u64,
    #[serde(serialize_with = "addr_or_na")]
    pub first_usable: Option<Ipv4Addr>,
    #[serde(serialize_with = "addr_or_na")]
    pub last_usable: Option<Ipv4Addr>,
}

impl SubnetResult {
    /// Derive the full description of one subnet. VLAN fields start
    /// empty; segment-mode allocation fills them in.
    pub fn describe(spec: &NetworkSpec) -> Self {
        let usable = spec.usable_hosts();
        let (first, last) = if usable > 0 {
            let net = u32::from(spec.address());
            let bcast = u32::from(spec.broadcast());
            (
                Some(Ipv4Addr::from(net + 1)),
                Some(Ipv4Addr::from(bcast - 1)),
            )
        } else {
            (None, None)
        };
        Self {
            vlan_id: None,
            vlan_name: None,
            network_id: spec.address(),
            subnet_mask: spec.mask(),
            broadcast: spec.broadcast(),
            default_gateway: first,
            usable_hosts: usable,
            first_usable: first,
            last_usable: last,
        }
    }
}

fn addr_or_na<S>(value: &Option<Ipv4Addr>, serializer: S) -> std::result::Result<S::Ok, S::Error>
where
    S: Serializer,
{
    match value {
        Some(addr) => serializer.collect_str(addr),
        None => serializer.serialize_str("N/A"),
    }
}
