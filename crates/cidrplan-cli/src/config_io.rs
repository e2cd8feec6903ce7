//! Config file reading: detects JSON vs YAML by extension and decodes into
//! [`RawConfig`]. This is the external collaborator spec.md §1 calls out as
//! out of scope for the core. The core only ever consumes an already
//! decoded `RawConfig`.

use anyhow::{bail, Context, Result};
use cidrplan_config::RawConfig;
use std::path::Path;

pub fn read_raw_config(path: &Path) -> Result<RawConfig> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading config file {}", path.display()))?;

    match path.extension().and_then(|ext| ext.to_str()) {
        Some("json") => {
            serde_json::from_str(&text).with_context(|| format!("parsing {} as JSON", path.display()))
        }
        Some("yaml") | Some("yml") => {
            serde_yaml::from_str(&text).with_context(|| format!("parsing {} as YAML", path.display()))
        }
        Some(other) => bail!("unsupported config extension: .{other} (expected .json, .yaml, or .yml)"),
        None => bail!("config file {} has no extension to infer its format from", path.display()),
    }
}

/// Apply an optional `--base-cidr` override from the CLI before
/// normalization, replacing the config's own `baseCidr`.
pub fn apply_base_cidr_override(mut raw: RawConfig, override_cidr: Option<&str>) -> RawConfig {
    if let Some(cidr) = override_cidr {
        raw.base_cidr = cidr.to_string();
    }
    raw
}
