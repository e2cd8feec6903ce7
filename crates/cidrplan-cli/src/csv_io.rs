//! CSV reading and writing for [`Allocation`] records, per spec.md §6.2's
//! fixed column order.

use anyhow::{Context, Result};
use cidrplan_cidr::Ipv4Cidr;
use cidrplan_validate::Allocation;
use std::io::{Read, Write};

const HEADER: [&str; 11] = [
    "Cloud Provider",
    "Account Name",
    "VPC Name",
    "Region Name",
    "Availability Zone",
    "Region CIDR",
    "VPC CIDR",
    "AZ CIDR",
    "Subnet CIDR",
    "Subnet Role",
    "Usable IPs",
];

pub fn write_csv<W: Write>(writer: W, allocations: &[Allocation]) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(HEADER)?;
    for a in allocations {
        wtr.write_record([
            a.cloud_provider.as_str(),
            a.account_name.as_str(),
            a.vpc_name.as_str(),
            a.region_name.as_str(),
            a.availability_zone.as_str(),
            &a.region_cidr.to_string(),
            &a.vpc_cidr.to_string(),
            &a.az_cidr.to_string(),
            &a.subnet_cidr.to_string(),
            a.subnet_role.as_str(),
            &a.usable_ips.to_string(),
        ])?;
    }
    wtr.flush()?;
    Ok(())
}

/// Sort a generated sequence into the canonical CSV presentation order:
/// `(cloudProvider, accountName, regionName, availabilityZone, subnetRole)`.
/// The planner's own emission order is deterministic but reflects tree
/// walk order, not this lexical order; callers opt into this separately.
pub fn sort_canonical(allocations: &mut [Allocation]) {
    allocations.sort_by(|a, b| {
        (
            &a.cloud_provider,
            &a.account_name,
            &a.region_name,
            &a.availability_zone,
            &a.subnet_role,
        )
            .cmp(&(
                &b.cloud_provider,
                &b.account_name,
                &b.region_name,
                &b.availability_zone,
                &b.subnet_role,
            ))
    });
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<Allocation>> {
    let mut rdr = csv::ReaderBuilder::new().has_headers(true).from_reader(reader);
    let mut allocations = Vec::new();

    for record in rdr.records() {
        let record = record.context("reading CSV record")?;
        if record.len() != HEADER.len() {
            anyhow::bail!("expected {} columns, found {}", HEADER.len(), record.len());
        }

        allocations.push(Allocation {
            cloud_provider: record[0].to_string(),
            account_name: record[1].to_string(),
            vpc_name: record[2].to_string(),
            region_name: record[3].to_string(),
            availability_zone: record[4].to_string(),
            region_cidr: parse_cidr_field(&record[5])?,
            vpc_cidr: parse_cidr_field(&record[6])?,
            az_cidr: parse_cidr_field(&record[7])?,
            subnet_cidr: parse_cidr_field(&record[8])?,
            subnet_role: record[9].to_string(),
            usable_ips: record[10].parse().context("parsing Usable IPs column")?,
        });
    }

    Ok(allocations)
}

fn parse_cidr_field(field: &str) -> Result<Ipv4Cidr> {
    Ipv4Cidr::parse(field).map_err(|e| anyhow::anyhow!("{e}"))
}
