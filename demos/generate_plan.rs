//! End-to-end allocation example: normalize a config, generate allocations,
//! and validate the result has no overlaps.
//!
//! Run with: cargo run -p cidrplan-planner --example generate_plan

use cidrplan_config::{normalize, RawConfig};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cidrplan - Generate Plan Example\n");

    let json = r#"{
        "baseCidr": "10.0.0.0/8",
        "accounts": [
            {"name": "prod", "clouds": {"aws": {"regions": ["us-east-1", "us-west-2"]}}},
            {"name": "staging", "clouds": {"azure": {"regions": ["eastus"]}}}
        ],
        "subnetTypes": [
            {"name": "Public", "prefixLength": 26},
            {"name": "Private", "prefixLength": 27}
        ]
    }"#;

    let raw: RawConfig = serde_json::from_str(json)?;
    let config = normalize(raw)?;

    let allocations = cidrplan_planner::generate(&config)?;
    println!("{} allocations produced\n", allocations.len());

    for a in allocations.iter().take(6) {
        println!(
            "{:<6} {:<8} {:<10} {:<12} {:<8} {}",
            a.account_name, a.cloud_provider, a.region_name, a.availability_zone, a.subnet_role, a.subnet_cidr
        );
    }

    let report = cidrplan_validate::validate_no_overlapping_allocations(&allocations);
    println!("\nall disjoint? {}", report.valid);

    let summary = cidrplan_planner::analyze(&config);
    println!("analyze() predicted {} subnets, generate() produced {}", summary.subnets, allocations.len());

    Ok(())
}
