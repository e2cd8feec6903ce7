use anyhow::{Context, Result};
use cidrplan_cli::{config_io, csv_io};

use clap::{Parser, Subcommand, ValueEnum};
use cidrplan_config::normalize;
use cidrplan_validate::Allocation;
use colored::Colorize;
use std::fs::File;
use std::io::Write;
use std::path::PathBuf;
use std::process::ExitCode;

/// Hierarchical IPv4 CIDR allocator for multi-cloud account/region/AZ trees
#[derive(Parser)]
#[command(name = "cidrplan")]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Output format
    #[arg(short, long, value_enum, default_value = "human", global = true)]
    format: OutputFormat,

    /// Enable verbose diagnostics on stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full allocation and emit one record per account/cloud/region/AZ/role
    Generate(GenerateArgs),
    /// Parse and structurally validate a config without allocating
    Validate(ValidateArgs),
    /// Report region/subnet counts without allocating any CIDRs
    Analyze(AnalyzeArgs),
    /// Re-check an already generated CSV for overlapping subnets
    ValidateAllocations(ValidateAllocationsArgs),
}

#[derive(Parser)]
struct GenerateArgs {
    /// Path to a JSON or YAML config file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Write the result here instead of stdout
    #[arg(short, long, value_name = "FILE")]
    output: Option<PathBuf>,

    /// Only emit allocations for this cloud provider
    #[arg(short, long)]
    provider: Option<String>,

    /// Override the config's top-level baseCidr
    #[arg(long, value_name = "CIDR")]
    base_cidr: Option<String>,

    /// Sort rows by (cloudProvider, accountName, regionName, availabilityZone, subnetRole)
    /// instead of emitting them in tree-walk order
    #[arg(long)]
    sort: bool,
}

#[derive(Parser)]
struct ValidateArgs {
    /// Path to a JSON or YAML config file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
}

#[derive(Parser)]
struct AnalyzeArgs {
    /// Path to a JSON or YAML config file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,
}

#[derive(Parser)]
struct ValidateAllocationsArgs {
    /// Path to a previously generated CSV
    #[arg(value_name = "CSV")]
    csv: PathBuf,
}

#[derive(Debug, Clone, Copy, ValueEnum)]
enum OutputFormat {
    /// Human-readable summary
    Human,
    /// JSON output (pretty-printed)
    Json,
    /// JSON output (compact)
    JsonCompact,
    /// CSV output (generate only)
    Csv,
}

/// Exit codes, distinguished per spec.md §7's error taxonomy so scripts can
/// branch on failure kind instead of parsing stderr.
mod exit_code {
    pub const SUCCESS: u8 = 0;
    pub const GENERIC_FAILURE: u8 = 1;
    pub const VALIDATION: u8 = 2;
    pub const OVERLAP: u8 = 3;
    pub const INSUFFICIENT_SPACE: u8 = 4;
    pub const IO: u8 = 5;
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    let result = match &cli.command {
        Commands::Generate(args) => handle_generate(args, cli.format, cli.verbose),
        Commands::Validate(args) => handle_validate(args, cli.format, cli.verbose),
        Commands::Analyze(args) => handle_analyze(args, cli.format, cli.verbose),
        Commands::ValidateAllocations(args) => handle_validate_allocations(args, cli.format, cli.verbose),
    };

    match result {
        Ok(()) => ExitCode::from(exit_code::SUCCESS),
        Err(err) => {
            eprintln!("{} {err:#}", "✗".red());
            ExitCode::from(classify_failure(&err))
        }
    }
}

fn classify_failure(err: &anyhow::Error) -> u8 {
    if let Some(e) = err.downcast_ref::<cidrplan_config::ConfigError>() {
        return match e {
            cidrplan_config::ConfigError::Cidr(_) => exit_code::VALIDATION,
            cidrplan_config::ConfigError::ValidationError { .. } => exit_code::VALIDATION,
        };
    }
    if err.downcast_ref::<cidrplan_validate::ValidationError>().is_some() {
        return exit_code::OVERLAP;
    }
    if let Some(e) = err.downcast_ref::<cidrplan_planner::PlanError>() {
        return match e {
            cidrplan_planner::PlanError::Alloc { .. } => exit_code::INSUFFICIENT_SPACE,
            cidrplan_planner::PlanError::Validate(_) => exit_code::OVERLAP,
        };
    }
    if err.downcast_ref::<std::io::Error>().is_some() {
        return exit_code::IO;
    }
    exit_code::GENERIC_FAILURE
}

fn load_config(path: &PathBuf, base_cidr: Option<&str>, verbose: bool) -> Result<cidrplan_config::Config> {
    if verbose {
        eprintln!("{} reading config from {}", "›".blue(), path.display());
    }
    let raw = config_io::read_raw_config(path)?;
    let raw = config_io::apply_base_cidr_override(raw, base_cidr);
    Ok(normalize(raw)?)
}

fn handle_generate(args: &GenerateArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config(&args.config, args.base_cidr.as_deref(), verbose)?;

    if verbose {
        eprintln!("{} generating allocations", "›".blue());
    }
    let mut allocations = cidrplan_planner::generate(&config)?;

    if let Some(provider) = &args.provider {
        allocations.retain(|a| &a.cloud_provider == provider);
    }
    if args.sort {
        csv_io::sort_canonical(&mut allocations);
    }

    if verbose {
        eprintln!("{} {} allocations produced", "›".blue(), allocations.len());
    }

    match &args.output {
        Some(path) => {
            let file = File::create(path).with_context(|| format!("creating {}", path.display()))?;
            write_allocations(file, &allocations, format)?;
        }
        None => write_allocations(std::io::stdout(), &allocations, format)?,
    }

    Ok(())
}

fn write_allocations<W: std::io::Write>(writer: W, allocations: &[Allocation], format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => csv_io::write_csv(writer, allocations),
        OutputFormat::Human => print_human_allocations(writer, allocations),
        OutputFormat::Json => print_json(writer, allocations, true),
        OutputFormat::JsonCompact => print_json(writer, allocations, false),
    }
}

fn print_human_allocations<W: std::io::Write>(mut writer: W, allocations: &[Allocation]) -> Result<()> {
    writeln!(writer, "{}", "Generated Allocations".bold().cyan())?;
    writeln!(writer, "{}", "─".repeat(70).dimmed())?;
    for a in allocations {
        writeln!(
            writer,
            "{:<8} {:<12} {:<14} {:<12} {:<10} {}",
            a.cloud_provider, a.account_name, a.region_name, a.availability_zone, a.subnet_role, a.subnet_cidr
        )?;
    }
    writeln!(writer, "{}", "─".repeat(70).dimmed())?;
    writeln!(writer, "{} allocations", allocations.len())?;
    Ok(())
}

fn print_json<W: std::io::Write>(mut writer: W, allocations: &[Allocation], pretty: bool) -> Result<()> {
    let text = if pretty {
        serde_json::to_string_pretty(allocations)?
    } else {
        serde_json::to_string(allocations)?
    };
    writeln!(writer, "{text}")?;
    Ok(())
}

fn handle_validate(args: &ValidateArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config(&args.config, None, verbose)?;
    let notes = cidrplan_validate::check_cloud_overrides(&config)?;

    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&notes)?);
        }
        _ => {
            println!("{}", "✓ config is structurally valid".green());
            for note in &notes {
                println!("  {} {note}", "⚠".yellow());
            }
        }
    }

    Ok(())
}

fn handle_analyze(args: &AnalyzeArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    let config = load_config(&args.config, None, verbose)?;
    let summary = cidrplan_planner::analyze(&config);

    match format {
        OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&summary_as_json(&summary))?),
        OutputFormat::JsonCompact => println!("{}", serde_json::to_string(&summary_as_json(&summary))?),
        _ => print_analysis_human(&summary),
    }

    Ok(())
}

fn summary_as_json(summary: &cidrplan_planner::AnalysisSummary) -> serde_json::Value {
    let by_provider: serde_json::Map<String, serde_json::Value> = summary
        .by_provider
        .iter()
        .map(|(provider, breakdown)| {
            (
                provider.clone(),
                serde_json::json!({ "regions": breakdown.regions, "subnets": breakdown.subnets }),
            )
        })
        .collect();

    serde_json::json!({
        "regions": summary.regions,
        "subnets": summary.subnets,
        "byProvider": by_provider,
    })
}

fn print_analysis_human(summary: &cidrplan_planner::AnalysisSummary) {
    println!();
    println!("{}", "Allocation Plan Summary".bold().cyan());
    println!("{}", "─".repeat(50).dimmed());
    println!("{:>15}: {}", "Regions".bold(), summary.regions);
    println!("{:>15}: {}", "Subnets".bold(), summary.subnets);
    println!();
    for (provider, breakdown) in &summary.by_provider {
        println!(
            "  {:<10} {:>4} regions, {:>5} subnets",
            provider, breakdown.regions, breakdown.subnets
        );
    }
    println!();
}

fn handle_validate_allocations(args: &ValidateAllocationsArgs, format: OutputFormat, verbose: bool) -> Result<()> {
    if verbose {
        eprintln!("{} reading allocations from {}", "›".blue(), args.csv.display());
    }
    let file = File::open(&args.csv).with_context(|| format!("opening {}", args.csv.display()))?;
    let allocations = csv_io::read_csv(file)?;

    let report = cidrplan_validate::validate_no_overlapping_allocations(&allocations);

    match format {
        OutputFormat::Json | OutputFormat::JsonCompact => {
            println!("{}", serde_json::to_string(&report.valid)?);
        }
        _ => {
            if report.valid {
                println!("{} no overlapping subnets among {} allocations", "✓".green(), allocations.len());
            } else {
                println!("{} {} overlapping pair(s) found", "✗".red(), report.overlaps.len());
                for pair in &report.overlaps {
                    println!("  {} {} vs {}", "⚠".yellow(), pair.cidr1, pair.cidr2);
                }
            }
        }
    }

    if !report.valid {
        let pair = &report.overlaps[0];
        anyhow::bail!(cidrplan_validate::ValidationError::CidrOverlap {
            path_a: format!("{}.{}", pair.alloc1.account_name, pair.alloc1.subnet_role),
            cidr_a: pair.cidr1,
            path_b: format!("{}.{}", pair.alloc2.account_name, pair.alloc2.subnet_role),
            cidr_b: pair.cidr2,
        });
    }

    Ok(())
}
