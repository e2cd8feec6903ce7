//! IPv4 CIDR arithmetic.
//!
//! Provides the primitives every higher-level planning component is built on:
//! - Parse and validate `a.b.c.d/p` notation, normalizing host bits to zero.
//! - Test containment and overlap between two blocks.
//! - Subdivide a block into `2^n` equally sized, contiguous children.
//! - Compute the usable-host count of a block.
//!
//! # Examples
//!
//! ```
//! use cidrplan_cidr::Ipv4Cidr;
//!
//! let cidr = Ipv4Cidr::parse("10.0.0.0/24").unwrap();
//! assert_eq!(cidr.prefix(), 24);
//! assert_eq!(cidr.usable_ips(), 254);
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Errors raised by CIDR parsing and arithmetic.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum CidrError {
    /// Malformed `a.b.c.d/p` text.
    #[error("invalid CIDR notation: {0}")]
    InvalidCidrFormat(String),

    /// An octet (or the overall dotted-quad shape) is out of range.
    #[error("invalid IP address: {0}")]
    InvalidIp(String),

    /// Prefix length outside `[0, 32]`.
    #[error("invalid prefix length: {0} (must be 0-32)")]
    InvalidPrefix(u8),

    /// A logically impossible request, e.g. subdividing to a smaller prefix.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),
}

pub type Result<T> = std::result::Result<T, CidrError>;

/// An IPv4 CIDR block in canonical network form: the low `32 - prefix` bits
/// of `addr` are always zero.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Ipv4Cidr {
    addr: u32,
    prefix: u8,
}

impl Ipv4Cidr {
    /// Parse `a.b.c.d/p` notation. Host bits set in the address are accepted
    /// and silently normalized to zero; leading zeros that change how an
    /// octet string reads (e.g. `"01"`) are rejected as ambiguous.
    pub fn parse(text: &str) -> Result<Self> {
        let mut parts = text.splitn(2, '/');
        let ip_part = parts
            .next()
            .ok_or_else(|| CidrError::InvalidCidrFormat(text.to_string()))?;
        let prefix_part = parts
            .next()
            .ok_or_else(|| CidrError::InvalidCidrFormat(text.to_string()))?;

        let prefix: u8 = prefix_part
            .parse()
            .map_err(|_| CidrError::InvalidCidrFormat(text.to_string()))?;
        if prefix > 32 {
            return Err(CidrError::InvalidPrefix(prefix));
        }

        let addr = Self::parse_ipv4(ip_part)?;
        Ok(Self::new(addr, prefix).expect("prefix already validated"))
    }

    fn parse_ipv4(ip: &str) -> Result<u32> {
        let octet_strs: Vec<&str> = ip.split('.').collect();
        if octet_strs.len() != 4 {
            return Err(CidrError::InvalidIp(format!(
                "expected 4 octets, got {}",
                octet_strs.len()
            )));
        }

        let mut addr = 0u32;
        for octet_str in &octet_strs {
            if octet_str.is_empty() || (octet_str.len() > 1 && octet_str.starts_with('0')) {
                return Err(CidrError::InvalidIp(format!(
                    "invalid octet: {octet_str}"
                )));
            }
            let octet: u8 = octet_str
                .parse()
                .map_err(|_| CidrError::InvalidIp(format!("invalid octet: {octet_str}")))?;
            addr = (addr << 8) | octet as u32;
        }

        Ok(addr)
    }

    /// Build a CIDR from a raw network-order address and prefix length,
    /// masking any host bits set in `addr`.
    pub fn new(addr: u32, prefix: u8) -> Result<Self> {
        if prefix > 32 {
            return Err(CidrError::InvalidPrefix(prefix));
        }
        let mask = mask_for(prefix);
        Ok(Self {
            addr: addr & mask,
            prefix,
        })
    }

    /// Network address (host bits zero).
    pub fn addr(&self) -> u32 {
        self.addr
    }

    /// Alias for [`Ipv4Cidr::addr`]: the block's network address.
    pub fn network(&self) -> u32 {
        self.addr
    }

    /// Prefix length.
    pub fn prefix(&self) -> u8 {
        self.prefix
    }

    /// Network mask for this block's prefix.
    pub fn mask(&self) -> u32 {
        mask_for(self.prefix)
    }

    /// Highest address in the block.
    pub fn broadcast(&self) -> u32 {
        self.addr | !self.mask()
    }

    /// The block's inclusive `[start, end]` range.
    pub fn range(&self) -> IpRange {
        IpRange {
            start: self.addr,
            end: self.broadcast(),
        }
    }

    /// Number of addresses assignable to hosts.
    ///
    /// All addresses minus network and broadcast, except `/31` (2, both
    /// usable per RFC 3021) and `/32` (1, a host route).
    pub fn usable_ips(&self) -> u64 {
        match self.prefix {
            31 => 2,
            32 => 1,
            p => (1u64 << (32 - p)) - 2,
        }
    }

    /// Split this block into `2^(new_prefix - prefix)` equally sized
    /// children in ascending network-address order.
    ///
    /// Returns `[self]` unchanged when `new_prefix == prefix`.
    pub fn subdivide(&self, new_prefix: u8) -> Result<Vec<Ipv4Cidr>> {
        if new_prefix < self.prefix || new_prefix > 32 {
            return Err(CidrError::InvalidOperation(format!(
                "cannot subdivide /{} into /{new_prefix}",
                self.prefix
            )));
        }
        if new_prefix == self.prefix {
            return Ok(vec![*self]);
        }

        let child_size = 1u64 << (32 - new_prefix);
        let count = 1u64 << (new_prefix - self.prefix);
        let mut children = Vec::with_capacity(count as usize);
        for i in 0..count {
            let child_addr = (self.addr as u64 + i * child_size) as u32;
            children.push(Ipv4Cidr::new(child_addr, new_prefix).expect("prefix within range"));
        }
        Ok(children)
    }
}

fn mask_for(prefix: u8) -> u32 {
    if prefix == 0 {
        0
    } else {
        (!0u32) << (32 - prefix)
    }
}

impl fmt::Display for Ipv4Cidr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}.{}.{}.{}/{}",
            (self.addr >> 24) & 0xFF,
            (self.addr >> 16) & 0xFF,
            (self.addr >> 8) & 0xFF,
            self.addr & 0xFF,
            self.prefix
        )
    }
}

/// An inclusive `[start, end]` range of network-order 32-bit addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct IpRange {
    pub start: u32,
    pub end: u32,
}

impl IpRange {
    /// True iff this range and `other` share at least one address.
    pub fn overlaps(&self, other: &IpRange) -> bool {
        self.start <= other.end && other.start <= self.end
    }

    /// True iff `other` is fully contained within this range.
    pub fn contains(&self, other: &IpRange) -> bool {
        self.start <= other.start && other.end <= self.end
    }
}

/// True iff `a` and `b` share at least one address.
pub fn overlap(a: &Ipv4Cidr, b: &Ipv4Cidr) -> bool {
    a.range().overlaps(&b.range())
}

/// True iff `child` is fully contained within `parent`.
pub fn contains(parent: &Ipv4Cidr, child: &Ipv4Cidr) -> bool {
    parent.range().contains(&child.range())
}

/// Re-mask a CIDR's host bits to zero. A no-op for values already produced
/// by [`Ipv4Cidr::new`] or [`Ipv4Cidr::parse`], which are always canonical;
/// useful when constructing a value by hand from an untrusted `addr`.
pub fn normalize(c: Ipv4Cidr) -> Ipv4Cidr {
    Ipv4Cidr::new(c.addr, c.prefix).expect("prefix already valid")
}
