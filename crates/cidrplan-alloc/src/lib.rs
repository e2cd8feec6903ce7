//! Contiguous, boundary-aligned CIDR allocation.
//!
//! [`ContiguousAllocator`] hands out aligned sub-blocks from a fixed parent
//! block by advancing an internal cursor. Alignment on each requested
//! prefix's own boundary is what guarantees every block handed out is
//! disjoint from every other, even when requested prefixes are mixed within
//! one parent. No cross-check against prior allocations is needed at each
//! step, only a monotonic cursor.
//!
//! [`AllocationTracker`] is a secondary, append-only record of every block
//! emitted across an entire run, used for diagnostics and post-hoc overlap
//! checks; correctness of allocation does not depend on it.

use cidrplan_cidr::{overlap, Ipv4Cidr};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while allocating from a [`ContiguousAllocator`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AllocError {
    /// The parent block has no room left for the requested prefix.
    #[error(
        "insufficient address space: parent {parent} has no /{requested_prefix} left at cursor {cursor:#010x}"
    )]
    InsufficientAddressSpace {
        parent: Ipv4Cidr,
        requested_prefix: u8,
        cursor: u32,
    },

    /// The requested prefix is outside the parent's range (smaller than the
    /// parent's own prefix, or larger than 32).
    #[error("invalid prefix length /{requested} for parent {parent}")]
    InvalidPrefixLength { parent: Ipv4Cidr, requested: u8 },
}

pub type Result<T> = std::result::Result<T, AllocError>;

/// A structured, keyed context attached to an allocation failure, following
/// the error-context convention used throughout the planner (account,
/// provider, region, AZ, role). Allocators themselves stay context-free;
/// callers that know the path attach it when propagating the error.
pub type ErrorContext = BTreeMap<String, String>;

/// Hands out non-overlapping, boundary-aligned sub-blocks of `base` in
/// cursor order.
#[derive(Debug, Clone)]
pub struct ContiguousAllocator {
    base: Ipv4Cidr,
    cursor: u32,
    history: Vec<Ipv4Cidr>,
}

impl ContiguousAllocator {
    /// Create an allocator over the given parent block, cursor starting at
    /// the parent's network address.
    pub fn new(base: Ipv4Cidr) -> Self {
        Self {
            base,
            cursor: base.addr(),
            history: Vec::new(),
        }
    }

    /// Allocate the next `/prefix` block, aligned to its own boundary.
    ///
    /// Alignment discards any space between the current cursor and the next
    /// multiple of `2^(32-prefix)`; that gap is the price of guaranteeing
    /// every block is disjoint from every other by construction.
    pub fn allocate(&mut self, prefix: u8) -> Result<Ipv4Cidr> {
        if prefix < self.base.prefix() || prefix > 32 {
            return Err(AllocError::InvalidPrefixLength {
                parent: self.base,
                requested: prefix,
            });
        }

        let block_size = 1u64 << (32 - prefix);
        let aligned_cursor = align_up(self.cursor as u64, block_size);

        let base_size = 1u64 << (32 - self.base.prefix());
        let base_start = self.base.addr() as u64;
        if aligned_cursor + block_size > base_start + base_size {
            return Err(AllocError::InsufficientAddressSpace {
                parent: self.base,
                requested_prefix: prefix,
                cursor: self.cursor,
            });
        }

        let block = Ipv4Cidr::new(aligned_cursor as u32, prefix)
            .expect("prefix validated, address within u32 range");
        self.cursor = (aligned_cursor + block_size) as u32;
        self.history.push(block);
        Ok(block)
    }

    /// Reset the cursor to the parent's start and discard allocation
    /// history.
    pub fn reset(&mut self) {
        self.cursor = self.base.addr();
        self.history.clear();
    }

    /// The remaining space as a CIDR anchored at the current cursor and
    /// carrying the parent's own prefix (not a tight bound, just a cheap
    /// description of "from here to the parent's prefix grain").
    pub fn available_space(&self) -> Ipv4Cidr {
        Ipv4Cidr::new(self.cursor, self.base.prefix()).expect("base prefix already valid")
    }

    /// Every block allocated so far, in emission order.
    pub fn allocated(&self) -> &[Ipv4Cidr] {
        &self.history
    }

    /// The parent block this allocator carves from.
    pub fn base(&self) -> Ipv4Cidr {
        self.base
    }
}

fn align_up(value: u64, boundary: u64) -> u64 {
    if boundary == 0 {
        return value;
    }
    let remainder = value % boundary;
    if remainder == 0 {
        value
    } else {
        value + (boundary - remainder)
    }
}

/// Append-only record of every CIDR emitted during a single planning run.
///
/// On each insert the list is kept sorted by `(prefix ascending, textual
/// address ascending)`, giving a deterministic order for diagnostics
/// independent of emission order.
#[derive(Debug, Default, Clone)]
pub struct AllocationTracker {
    entries: Vec<Ipv4Cidr>,
}

impl AllocationTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a newly emitted CIDR.
    pub fn add(&mut self, cidr: Ipv4Cidr) {
        let pos = self
            .entries
            .partition_point(|existing| sort_key(existing) < sort_key(&cidr));
        self.entries.insert(pos, cidr);
    }

    /// True iff an exact match for `cidr` has already been recorded.
    pub fn has(&self, cidr: &Ipv4Cidr) -> bool {
        self.entries.contains(cidr)
    }

    /// True iff `cidr` overlaps any previously recorded CIDR.
    pub fn overlaps_any(&self, cidr: &Ipv4Cidr) -> bool {
        self.entries.iter().any(|existing| overlap(existing, cidr))
    }

    /// All recorded CIDRs in tracker order.
    pub fn entries(&self) -> &[Ipv4Cidr] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

fn sort_key(cidr: &Ipv4Cidr) -> (u8, String) {
    (cidr.prefix(), cidr.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocate_single_block_matches_parent() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/24").unwrap());
        let block = alloc.allocate(24).unwrap();
        assert_eq!(block.to_string(), "10.0.0.0/24");
        assert!(alloc.allocate(24).is_err());
    }

    #[test]
    fn allocate_sequential_same_size() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/24").unwrap());
        let a = alloc.allocate(26).unwrap();
        let b = alloc.allocate(26).unwrap();
        let c = alloc.allocate(26).unwrap();
        let d = alloc.allocate(26).unwrap();
        assert_eq!(a.to_string(), "10.0.0.0/26");
        assert_eq!(b.to_string(), "10.0.0.64/26");
        assert_eq!(c.to_string(), "10.0.0.128/26");
        assert_eq!(d.to_string(), "10.0.0.192/26");
        assert!(alloc.allocate(32).is_err());
    }

    #[test]
    fn allocate_mixed_prefixes_align_with_waste() {
        // spec.md boundary example: [/25, /27, /26] from a /24.
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/24").unwrap());
        let a = alloc.allocate(25).unwrap();
        let b = alloc.allocate(27).unwrap();
        let c = alloc.allocate(26).unwrap();
        assert_eq!(a.to_string(), "10.0.0.0/25");
        assert_eq!(b.to_string(), "10.0.0.128/27");
        assert_eq!(c.to_string(), "10.0.0.192/26");
    }

    #[test]
    fn allocate_insufficient_space() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/28").unwrap());
        assert!(alloc.allocate(16).is_err());
    }

    #[test]
    fn allocate_rejects_prefix_smaller_than_parent() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/24").unwrap());
        assert!(matches!(
            alloc.allocate(16),
            Err(AllocError::InvalidPrefixLength { .. })
        ));
    }

    #[test]
    fn reset_restores_cursor_and_history() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/24").unwrap());
        alloc.allocate(26).unwrap();
        alloc.allocate(26).unwrap();
        assert_eq!(alloc.allocated().len(), 2);
        alloc.reset();
        assert!(alloc.allocated().is_empty());
        assert_eq!(alloc.available_space().to_string(), "10.0.0.0/24");
    }

    #[test]
    fn zero_remaining_cursor_fails() {
        let mut alloc = ContiguousAllocator::new(Ipv4Cidr::parse("10.0.0.0/25").unwrap());
        alloc.allocate(25).unwrap();
        assert!(matches!(
            alloc.allocate(26),
            Err(AllocError::InsufficientAddressSpace { .. })
        ));
    }

    #[test]
    fn tracker_sorts_by_prefix_then_address() {
        let mut tracker = AllocationTracker::new();
        tracker.add(Ipv4Cidr::parse("10.0.1.0/24").unwrap());
        tracker.add(Ipv4Cidr::parse("10.0.0.0/16").unwrap());
        tracker.add(Ipv4Cidr::parse("10.0.0.0/24").unwrap());

        let rendered: Vec<String> = tracker.entries().iter().map(|c| c.to_string()).collect();
        assert_eq!(
            rendered,
            vec!["10.0.0.0/16", "10.0.0.0/24", "10.0.1.0/24"]
        );
    }

    #[test]
    fn tracker_detects_overlap() {
        let mut tracker = AllocationTracker::new();
        tracker.add(Ipv4Cidr::parse("10.0.0.0/16").unwrap());
        assert!(tracker.overlaps_any(&Ipv4Cidr::parse("10.0.1.0/24").unwrap()));
        assert!(!tracker.overlaps_any(&Ipv4Cidr::parse("10.1.0.0/24").unwrap()));
    }

    #[test]
    fn tracker_has_exact_match() {
        let mut tracker = AllocationTracker::new();
        let cidr = Ipv4Cidr::parse("10.0.0.0/24").unwrap();
        assert!(!tracker.has(&cidr));
        tracker.add(cidr);
        assert!(tracker.has(&cidr));
    }
}
