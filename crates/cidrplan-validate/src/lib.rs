//! Cross-cutting CIDR overlap checks.
//!
//! Two checks, run at opposite ends of a planning run:
//!
//! - [`check_cloud_overrides`] runs before allocation, over the normalized
//!   [`Config`]: every `accounts[*].clouds[*].baseCidr` the user supplied is
//!   checked pairwise for overlap, since those overrides intentionally
//!   escape the root block and so can't be caught by the allocator's own
//!   boundary alignment.
//! - [`validate_no_overlapping_allocations`] runs after allocation, over the
//!   emitted [`Allocation`] records: under the hierarchical allocator's own
//!   contracts this is tautologically true, so it exists to catch
//!   regressions and to validate externally supplied CSVs.
//!
//! This crate also owns the [`Allocation`] output record type, since it's
//! the type both checks are ultimately about.

use cidrplan_cidr::{overlap, Ipv4Cidr};
use cidrplan_config::Config;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// A single `(account, cloud, region, availability zone, subnet role)`
/// output record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Allocation {
    pub account_name: String,
    pub vpc_name: String,
    pub cloud_provider: String,
    pub region_name: String,
    pub availability_zone: String,
    pub region_cidr: Ipv4Cidr,
    pub vpc_cidr: Ipv4Cidr,
    pub az_cidr: Ipv4Cidr,
    pub subnet_cidr: Ipv4Cidr,
    pub subnet_role: String,
    pub usable_ips: u64,
}

/// Errors raised by either overlap check.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    /// Two CIDRs that must be disjoint overlap. `path_a`/`path_b` describe
    /// where each one came from (a config path before allocation, or an
    /// account/provider/region/AZ/role tuple after).
    #[error("CIDR overlap between {path_a} ({cidr_a}) and {path_b} ({cidr_b})")]
    CidrOverlap {
        path_a: String,
        cidr_a: Ipv4Cidr,
        path_b: String,
        cidr_b: Ipv4Cidr,
    },
}

pub type Result<T> = std::result::Result<T, ValidationError>;

/// Pairwise-check every `baseCidr` override present under `config`'s
/// accounts for mutual overlap, failing on the first pair found. Fewer than
/// two overrides present is trivially fine and short-circuits.
///
/// The top-level `baseCidr` is deliberately not checked against these
/// overrides: overrides are designed to escape the root space intentionally
/// (spec.md §4.6).
///
/// Returns diagnostic notes (not hard errors) about prefix-length
/// feasibility: if `prefixLengths.az + (max subnet prefix - min subnet
/// prefix) >= 32 - az`, some AZ may not have enough room for the widest
/// declared subnet role once aligned. This is surfaced here for visibility;
/// the hard failure, if any, comes later from the contiguous allocator.
pub fn check_cloud_overrides(config: &Config) -> Result<Vec<String>> {
    let mut overrides: Vec<(String, Ipv4Cidr)> = Vec::new();
    for account in &config.accounts {
        for (provider, cloud) in account.clouds.iter() {
            if let Some(cidr) = cloud.base_cidr {
                overrides.push((format!("accounts.{}.clouds.{provider}.baseCidr", account.name), cidr));
            }
        }
    }

    for i in 0..overrides.len() {
        for j in (i + 1)..overrides.len() {
            let (path_a, cidr_a) = &overrides[i];
            let (path_b, cidr_b) = &overrides[j];
            if overlap(cidr_a, cidr_b) {
                return Err(ValidationError::CidrOverlap {
                    path_a: path_a.clone(),
                    cidr_a: *cidr_a,
                    path_b: path_b.clone(),
                    cidr_b: *cidr_b,
                });
            }
        }
    }

    Ok(feasibility_notes(config))
}

fn feasibility_notes(config: &Config) -> Vec<String> {
    let mut notes = Vec::new();
    let prefixes: Vec<u8> = config.subnet_types.values().copied().collect();
    if let (Some(&max_p), Some(&min_p)) = (prefixes.iter().max(), prefixes.iter().min()) {
        let az = config.prefix_lengths.az;
        let spread = max_p.saturating_sub(min_p);
        if (az as u32 + spread as u32) >= (32 - az as u32) {
            notes.push(format!(
                "prefixLengths.az (/{az}) plus the subnet-type prefix spread ({spread}) leaves little headroom; \
                 allocation may fail with InsufficientAddressSpace for the widest role"
            ));
        }
    }
    notes
}

/// One detected pairwise overlap between two emitted allocations.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapPair {
    pub cidr1: Ipv4Cidr,
    pub cidr2: Ipv4Cidr,
    pub alloc1: Allocation,
    pub alloc2: Allocation,
}

/// The result of scanning a set of allocations for pairwise overlap.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapReport {
    pub valid: bool,
    pub overlaps: Vec<OverlapPair>,
}

/// Scan every unordered pair of `allocations` for `subnetCidr` overlap.
///
/// Under the hierarchical allocator's own contracts this is tautologically
/// true; it exists to catch regressions and to validate externally supplied
/// CSVs (spec.md §4.8).
pub fn validate_no_overlapping_allocations(allocations: &[Allocation]) -> OverlapReport {
    let mut overlaps = Vec::new();
    for i in 0..allocations.len() {
        for j in (i + 1)..allocations.len() {
            if overlap(&allocations[i].subnet_cidr, &allocations[j].subnet_cidr) {
                overlaps.push(OverlapPair {
                    cidr1: allocations[i].subnet_cidr,
                    cidr2: allocations[j].subnet_cidr,
                    alloc1: allocations[i].clone(),
                    alloc2: allocations[j].clone(),
                });
            }
        }
    }

    OverlapReport {
        valid: overlaps.is_empty(),
        overlaps,
    }
}

/// Like [`validate_no_overlapping_allocations`], but raises
/// [`ValidationError::CidrOverlap`] on the first overlap found instead of
/// collecting a full report.
pub fn validate_no_overlapping_allocations_strict(allocations: &[Allocation]) -> Result<()> {
    let report = validate_no_overlapping_allocations(allocations);
    if let Some(pair) = report.overlaps.into_iter().next() {
        return Err(ValidationError::CidrOverlap {
            path_a: allocation_path(&pair.alloc1),
            cidr_a: pair.cidr1,
            path_b: allocation_path(&pair.alloc2),
            cidr_b: pair.cidr2,
        });
    }
    Ok(())
}

fn allocation_path(a: &Allocation) -> String {
    format!(
        "{}.{}.{}.{}.{}",
        a.account_name, a.cloud_provider, a.region_name, a.availability_zone, a.subnet_role
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidrplan_config::{normalize, RawConfig};

    fn config_with_overrides(a: &str, b: &str) -> Config {
        let raw: RawConfig = serde_json::from_str(&format!(
            r#"{{
                "baseCidr": "10.0.0.0/8",
                "accounts": [
                    {{"name": "a", "clouds": {{"aws": {{"baseCidr": "{a}", "regions": ["us-east-1"]}}}}}},
                    {{"name": "b", "clouds": {{"aws": {{"baseCidr": "{b}", "regions": ["us-east-1"]}}}}}}
                ],
                "subnetTypes": {{"Public": 24}}
            }}"#
        ))
        .unwrap();
        normalize(raw).unwrap()
    }

    #[test]
    fn no_overrides_is_fine() {
        let raw: RawConfig = serde_json::from_str(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [{"name": "a", "clouds": {"aws": {"regions": ["us-east-1"]}}}],
                "subnetTypes": {"Public": 24}
            }"#,
        )
        .unwrap();
        let config = normalize(raw).unwrap();
        assert!(check_cloud_overrides(&config).is_ok());
    }

    #[test]
    fn disjoint_overrides_pass() {
        let config = config_with_overrides("10.5.0.0/16", "10.6.0.0/16");
        assert!(check_cloud_overrides(&config).is_ok());
    }

    #[test]
    fn overlapping_overrides_fail() {
        let config = config_with_overrides("10.5.0.0/16", "10.5.0.0/16");
        assert!(matches!(
            check_cloud_overrides(&config),
            Err(ValidationError::CidrOverlap { .. })
        ));
    }

    fn alloc(subnet: &str) -> Allocation {
        Allocation {
            account_name: "prod".to_string(),
            vpc_name: "prod-vpc".to_string(),
            cloud_provider: "aws".to_string(),
            region_name: "us-east-1".to_string(),
            availability_zone: "us-east-1a".to_string(),
            region_cidr: Ipv4Cidr::parse("10.0.0.0/20").unwrap(),
            vpc_cidr: Ipv4Cidr::parse("10.0.0.0/16").unwrap(),
            az_cidr: Ipv4Cidr::parse("10.0.0.0/24").unwrap(),
            subnet_cidr: Ipv4Cidr::parse(subnet).unwrap(),
            subnet_role: "Public".to_string(),
            usable_ips: 62,
        }
    }

    #[test]
    fn disjoint_allocations_are_valid() {
        let allocations = vec![alloc("10.0.0.0/26"), alloc("10.0.0.64/27")];
        let report = validate_no_overlapping_allocations(&allocations);
        assert!(report.valid);
        assert!(report.overlaps.is_empty());
    }

    #[test]
    fn overlapping_allocations_are_reported() {
        let allocations = vec![alloc("10.0.0.0/26"), alloc("10.0.0.0/27")];
        let report = validate_no_overlapping_allocations(&allocations);
        assert!(!report.valid);
        assert_eq!(report.overlaps.len(), 1);

        assert!(validate_no_overlapping_allocations_strict(&allocations).is_err());
    }
}
