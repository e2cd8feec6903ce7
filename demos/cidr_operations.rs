//! CIDR operations example
//!
//! Run with: cargo run -p cidrplan-cidr --example cidr_operations

use cidrplan_cidr::Ipv4Cidr;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    println!("cidrplan - CIDR Operations Example\n");

    let cidr = Ipv4Cidr::parse("192.168.1.0/24")?;

    println!("CIDR: {cidr}");
    println!("─────────────────────────────");
    println!("Network:       {}", format_ip(cidr.network()));
    println!("Broadcast:     {}", format_ip(cidr.broadcast()));
    println!("Usable IPs:    {}", cidr.usable_ips());
    println!("Prefix length: /{}", cidr.prefix());

    let other = Ipv4Cidr::parse("192.168.1.128/25")?;
    println!("\nContainment and overlap:");
    println!("{other} contained in {cidr}? {}", cidrplan_cidr::contains(&cidr, &other));
    println!(
        "{cidr} overlaps 192.168.2.0/24? {}",
        cidrplan_cidr::overlap(&cidr, &Ipv4Cidr::parse("192.168.2.0/24")?)
    );

    println!("\nSubdividing into /26 blocks:");
    for sub in cidr.subdivide(26)? {
        println!("  {sub}");
    }

    Ok(())
}

fn format_ip(addr: u32) -> String {
    let bytes = addr.to_be_bytes();
    format!("{}.{}.{}.{}", bytes[0], bytes[1], bytes[2], bytes[3])
}
