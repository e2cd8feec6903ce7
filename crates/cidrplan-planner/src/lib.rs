//! Hierarchical CIDR planner.
//!
//! [`generate`] is the core orchestration: it walks the configured tree,
//! account, then cloud provider, then region, then availability zone, then
//! subnet role, carving a nested, non-overlapping sub-block at each level
//! via [`cidrplan_alloc::ContiguousAllocator`], and emits one
//! [`Allocation`] record per `(account, cloud, region, AZ, role)` leaf.
//!
//! Every loop iterates in declared order, every per-level allocator is
//! deterministic given its inputs, and the AZ directory is deterministic
//! given `(provider, region, count)`, so the emitted sequence is a pure
//! function of the normalized [`Config`]. Nothing here performs I/O or
//! retains state between calls: a `generate()` invocation owns its
//! allocators and tracker for its own duration only.

use cidrplan_alloc::{AllocError, AllocationTracker, ContiguousAllocator};
use cidrplan_config::Config;
use cidrplan_providers::{generate_az_names, Provider, DEFAULT_AZ_COUNT};
pub use cidrplan_validate::Allocation;
use cidrplan_validate::{check_cloud_overrides, ValidationError};
use std::collections::BTreeMap;
use thiserror::Error;

/// Errors raised while planning. Every variant carries a structured
/// `account`/`provider`/`region`/`az`/`role` context map describing where in
/// the tree the failure happened, per spec.md §7.
#[derive(Error, Debug)]
pub enum PlanError {
    /// An allocator ran out of room for a requested prefix.
    #[error("{source} (at {context:?})")]
    Alloc {
        #[source]
        source: AllocError,
        context: BTreeMap<String, String>,
    },

    /// The pre-allocation cloud-override overlap check failed.
    #[error(transparent)]
    Validate(#[from] ValidationError),
}

pub type Result<T> = std::result::Result<T, PlanError>;

struct PathContext<'a> {
    account: &'a str,
    provider: Option<&'a str>,
    region: Option<&'a str>,
    az: Option<&'a str>,
    role: Option<&'a str>,
}

impl PathContext<'_> {
    fn as_map(&self) -> BTreeMap<String, String> {
        let mut map = BTreeMap::new();
        map.insert("account".to_string(), self.account.to_string());
        if let Some(p) = self.provider {
            map.insert("provider".to_string(), p.to_string());
        }
        if let Some(r) = self.region {
            map.insert("region".to_string(), r.to_string());
        }
        if let Some(az) = self.az {
            map.insert("az".to_string(), az.to_string());
        }
        if let Some(role) = self.role {
            map.insert("role".to_string(), role.to_string());
        }
        map
    }

    fn wrap(&self, source: AllocError) -> PlanError {
        PlanError::Alloc {
            source,
            context: self.as_map(),
        }
    }
}

/// Walk `config`'s tree and emit the full, deterministic sequence of
/// [`Allocation`] records. Fails with [`PlanError::Validate`] if the
/// pre-allocation cloud-override overlap check fails, or
/// [`PlanError::Alloc`] if any level's allocator runs out of address space.
pub fn generate(config: &Config) -> Result<Vec<Allocation>> {
    check_cloud_overrides(config)?;

    let mut root = ContiguousAllocator::new(config.base_cidr);
    let mut tracker = AllocationTracker::new();
    let mut allocations = Vec::new();

    for account in &config.accounts {
        let account_ctx = PathContext {
            account: &account.name,
            provider: None,
            region: None,
            az: None,
            role: None,
        };

        let first_override = account
            .clouds
            .iter()
            .find_map(|(_, cloud)| cloud.base_cidr);

        let (account_cidr, override_in_use) = match first_override {
            Some(cidr) => (cidr, true),
            None => {
                let cidr = root
                    .allocate(config.prefix_lengths.account)
                    .map_err(|e| account_ctx.wrap(e))?;
                (cidr, false)
            }
        };
        let mut account_alloc = ContiguousAllocator::new(account_cidr);

        for (provider_name, cloud) in account.clouds.iter() {
            let provider = Provider::parse(provider_name);
            let vpc_cidr = if override_in_use {
                account_cidr
            } else if let Some(cidr) = cloud.base_cidr {
                // Unreachable under the current override semantics (a
                // present baseCidr anywhere in the account always sets
                // override_in_use), kept to mirror the documented
                // source algorithm exactly (see SPEC_FULL.md §5.1).
                cidr
            } else {
                account_cidr
            };

            for region_name in &cloud.regions {
                let region_ctx = PathContext {
                    account: &account.name,
                    provider: Some(provider_name),
                    region: Some(region_name),
                    az: None,
                    role: None,
                };

                let region_cidr = account_alloc
                    .allocate(config.prefix_lengths.region)
                    .map_err(|e| region_ctx.wrap(e))?;
                let mut region_alloc = ContiguousAllocator::new(region_cidr);

                let az_names = generate_az_names(&provider, region_name, DEFAULT_AZ_COUNT);

                for az_name in &az_names {
                    let az_ctx = PathContext {
                        account: &account.name,
                        provider: Some(provider_name),
                        region: Some(region_name),
                        az: Some(az_name),
                        role: None,
                    };

                    let az_cidr = region_alloc
                        .allocate(config.prefix_lengths.az)
                        .map_err(|e| az_ctx.wrap(e))?;
                    let mut az_alloc = ContiguousAllocator::new(az_cidr);

                    for (role_name, role_prefix) in config.subnet_types.iter() {
                        let role_ctx = PathContext {
                            account: &account.name,
                            provider: Some(provider_name),
                            region: Some(region_name),
                            az: Some(az_name),
                            role: Some(role_name),
                        };

                        let subnet_cidr = az_alloc
                            .allocate(*role_prefix)
                            .map_err(|e| role_ctx.wrap(e))?;

                        allocations.push(Allocation {
                            account_name: account.name.clone(),
                            vpc_name: format!("{}-vpc", account.name),
                            cloud_provider: provider_name.clone(),
                            region_name: region_name.clone(),
                            availability_zone: az_name.clone(),
                            region_cidr,
                            vpc_cidr,
                            az_cidr,
                            subnet_cidr,
                            subnet_role: role_name.clone(),
                            usable_ips: subnet_cidr.usable_ips(),
                        });
                        tracker.add(subnet_cidr);
                    }
                }
            }
        }
    }

    Ok(allocations)
}

/// Per-provider subnet and region counts produced by [`analyze`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ProviderBreakdown {
    pub regions: usize,
    pub subnets: usize,
}

/// Counts over a config without running full allocation. Cheap enough to
/// compute from structure alone, since `regions`/`subnets` don't depend on
/// actual CIDR placement.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct AnalysisSummary {
    pub regions: usize,
    pub subnets: usize,
    pub by_provider: BTreeMap<String, ProviderBreakdown>,
}

/// Count regions and subnets per spec.md §6.3 (`subnets = regions · 3 ·
/// |subnetTypes|`) without allocating any CIDRs.
pub fn analyze(config: &Config) -> AnalysisSummary {
    let mut summary = AnalysisSummary::default();
    let role_count = config.subnet_types.len();

    for account in &config.accounts {
        for (provider_name, cloud) in account.clouds.iter() {
            let entry = summary.by_provider.entry(provider_name.clone()).or_default();
            let region_count = cloud.regions.len();
            let subnet_count = region_count * DEFAULT_AZ_COUNT * role_count;

            entry.regions += region_count;
            entry.subnets += subnet_count;
            summary.regions += region_count;
            summary.subnets += subnet_count;
        }
    }

    summary
}

#[cfg(test)]
mod tests {
    use super::*;
    use cidrplan_config::{normalize, RawConfig};

    fn config_from(json: &str) -> Config {
        let raw: RawConfig = serde_json::from_str(json).unwrap();
        normalize(raw).unwrap()
    }

    /// S1 (minimal): one account, one aws region, two subnet roles.
    #[test]
    fn scenario_s1_minimal() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "prefixLengths": {"account": 16, "region": 20, "az": 24},
                "accounts": [{"name": "prod", "clouds": {"aws": {"regions": ["us-east-1"]}}}],
                "subnetTypes": [
                    {"name": "Public", "prefixLength": 26},
                    {"name": "Private", "prefixLength": 27}
                ]
            }"#,
        );

        let allocations = generate(&config).unwrap();
        assert_eq!(allocations.len(), 6);

        let first = &allocations[0];
        assert_eq!(first.cloud_provider, "aws");
        assert_eq!(first.account_name, "prod");
        assert_eq!(first.vpc_name, "prod-vpc");
        assert_eq!(first.region_name, "us-east-1");
        assert_eq!(first.availability_zone, "us-east-1a");
        assert_eq!(first.region_cidr.to_string(), "10.0.0.0/20");
        assert_eq!(first.vpc_cidr.to_string(), "10.0.0.0/16");
        assert_eq!(first.az_cidr.to_string(), "10.0.0.0/24");
        assert_eq!(first.subnet_cidr.to_string(), "10.0.0.0/26");
        assert_eq!(first.subnet_role, "Public");
        assert_eq!(first.usable_ips, 62);

        let second = &allocations[1];
        assert_eq!(second.availability_zone, "us-east-1a");
        assert_eq!(second.subnet_role, "Private");
        assert_eq!(second.subnet_cidr.to_string(), "10.0.0.64/27");
        assert_eq!(second.usable_ips, 30);

        let third = &allocations[2];
        assert_eq!(third.availability_zone, "us-east-1b");
        assert_eq!(third.subnet_cidr.to_string(), "10.0.1.0/26");
    }

    /// S2 (override): all vpcCidr values equal the cloud override.
    #[test]
    fn scenario_s2_override() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [{"name": "prod", "clouds": {"aws": {"baseCidr": "172.31.0.0/16", "regions": ["us-east-1"]}}}],
                "subnetTypes": {"Public": 26}
            }"#,
        );

        let allocations = generate(&config).unwrap();
        assert!(allocations.iter().all(|a| a.vpc_cidr.to_string() == "172.31.0.0/16"));
        assert_eq!(allocations[0].region_cidr.to_string(), "172.31.0.0/20");
    }

    /// S3 (multi-cloud shared): both clouds under one account share the
    /// account's single carved block as their vpcCidr.
    #[test]
    fn scenario_s3_multi_cloud_shared() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [{
                    "name": "prod",
                    "clouds": {
                        "aws": {"regions": ["us-east-1"]},
                        "azure": {"regions": ["eastus"]}
                    }
                }],
                "subnetTypes": {"Public": 26}
            }"#,
        );

        let allocations = generate(&config).unwrap();
        assert!(allocations.iter().all(|a| a.vpc_cidr.to_string() == "10.0.0.0/16"));
        let aws_regions: Vec<_> = allocations.iter().filter(|a| a.cloud_provider == "aws").collect();
        let azure_regions: Vec<_> = allocations
            .iter()
            .filter(|a| a.cloud_provider == "azure")
            .collect();
        assert!(!aws_regions.is_empty());
        assert!(!azure_regions.is_empty());
        // aws consumes its region block before azure consumes the next one.
        assert_ne!(aws_regions[0].region_cidr, azure_regions[0].region_cidr);
    }

    /// S4 (overlap rejection): two accounts with the same cloud override.
    #[test]
    fn scenario_s4_overlap_rejection() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [
                    {"name": "a", "clouds": {"aws": {"baseCidr": "10.5.0.0/16", "regions": ["us-east-1"]}}},
                    {"name": "b", "clouds": {"aws": {"baseCidr": "10.5.0.0/16", "regions": ["us-east-1"]}}}
                ],
                "subnetTypes": {"Public": 26}
            }"#,
        );

        assert!(matches!(generate(&config), Err(PlanError::Validate(_))));
    }

    /// S5 (mixed subnet sizes): aligned, disjoint, wasteful-but-correct.
    #[test]
    fn scenario_s5_mixed_subnet_sizes() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "prefixLengths": {"account": 16, "region": 20, "az": 22},
                "accounts": [{"name": "prod", "clouds": {"aws": {"regions": ["us-east-1"]}}}],
                "subnetTypes": [
                    {"name": "Public", "prefixLength": 24},
                    {"name": "Private", "prefixLength": 25},
                    {"name": "Data", "prefixLength": 26},
                    {"name": "Management", "prefixLength": 27}
                ]
            }"#,
        );

        let allocations = generate(&config).unwrap();
        let first_az: Vec<_> = allocations
            .iter()
            .filter(|a| a.availability_zone == "us-east-1a")
            .collect();
        assert_eq!(first_az.len(), 4);
        assert_eq!(first_az[0].subnet_cidr.to_string(), "10.0.0.0/24");
        assert_eq!(first_az[0].usable_ips, 254);
        assert_eq!(first_az[1].subnet_cidr.to_string(), "10.0.1.0/25");
        assert_eq!(first_az[1].usable_ips, 126);
        assert_eq!(first_az[2].subnet_cidr.to_string(), "10.0.1.128/26");
        assert_eq!(first_az[2].usable_ips, 62);
        assert_eq!(first_az[3].subnet_cidr.to_string(), "10.0.1.192/27");
        assert_eq!(first_az[3].usable_ips, 30);
    }

    /// S6 (insufficient space): two accounts asking for /16 from a /28.
    #[test]
    fn scenario_s6_insufficient_address_space() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/28",
                "accounts": [
                    {"name": "a", "clouds": {"aws": {"regions": ["us-east-1"]}}},
                    {"name": "b", "clouds": {"aws": {"regions": ["us-east-1"]}}}
                ],
                "subnetTypes": {"Public": 26}
            }"#,
        );

        assert!(matches!(generate(&config), Err(PlanError::Alloc { .. })));
    }

    #[test]
    fn invariant_containment_and_disjointness_hold() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [
                    {"name": "prod", "clouds": {"aws": {"regions": ["us-east-1", "us-west-2"]}}},
                    {"name": "staging", "clouds": {"azure": {"regions": ["eastus"]}}}
                ],
                "subnetTypes": {"Public": 26, "Private": 27}
            }"#,
        );

        let allocations = generate(&config).unwrap();

        for a in &allocations {
            assert!(cidrplan_cidr::contains(&a.vpc_cidr, &a.region_cidr));
            assert!(cidrplan_cidr::contains(&a.region_cidr, &a.az_cidr));
            assert!(cidrplan_cidr::contains(&a.az_cidr, &a.subnet_cidr));
        }

        for i in 0..allocations.len() {
            for j in (i + 1)..allocations.len() {
                assert!(!cidrplan_cidr::overlap(
                    &allocations[i].subnet_cidr,
                    &allocations[j].subnet_cidr
                ));
            }
        }

        let report = cidrplan_validate::validate_no_overlapping_allocations(&allocations);
        assert!(report.valid);
    }

    #[test]
    fn determinism_across_runs() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [{"name": "prod", "clouds": {"aws": {"regions": ["us-east-1"]}}}],
                "subnetTypes": {"Public": 26, "Private": 27}
            }"#,
        );

        let first = generate(&config).unwrap();
        let second = generate(&config).unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn analyze_counts_match_generation() {
        let config = config_from(
            r#"{
                "baseCidr": "10.0.0.0/8",
                "accounts": [{"name": "prod", "clouds": {"aws": {"regions": ["us-east-1", "us-west-2"]}}}],
                "subnetTypes": {"Public": 26, "Private": 27, "Data": 28}
            }"#,
        );

        let summary = analyze(&config);
        let allocations = generate(&config).unwrap();
        assert_eq!(summary.subnets, allocations.len());
        assert_eq!(summary.regions, 2);
        assert_eq!(summary.by_provider["aws"].subnets, allocations.len());
    }
}
