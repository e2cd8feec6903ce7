//! Provider-native availability zone naming.
//!
//! Each cloud provider names its availability zones differently. This crate
//! is a pure mapping from `(provider, region, count)` to an ordered list of
//! zone identifiers in that provider's own convention, plus a best-effort
//! heuristic for inferring a provider from a bare region string when a
//! config omits it.

use std::collections::HashMap;

/// A supported cloud provider, or an unrecognized one carried by name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Provider {
    Aws,
    Azure,
    Gcp,
    Unknown(String),
}

impl Provider {
    /// Parse a provider identifier as it appears in config (`"aws"`,
    /// `"azure"`, `"gcp"`, or anything else).
    pub fn parse(id: &str) -> Self {
        match id {
            "aws" => Provider::Aws,
            "azure" => Provider::Azure,
            "gcp" => Provider::Gcp,
            other => Provider::Unknown(other.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Provider::Aws => "aws",
            Provider::Azure => "azure",
            Provider::Gcp => "gcp",
            Provider::Unknown(s) => s,
        }
    }
}

const FALLBACK_LETTERS: &[char] = &[
    'a', 'b', 'c', 'd', 'e', 'f', 'g', 'h', 'i', 'j', 'k', 'l', 'm', 'n', 'o', 'p',
];

fn aws_region_letters(region: &str) -> &'static [char] {
    match region {
        "us-east-1" => &['a', 'b', 'c', 'd', 'e', 'f'],
        "us-east-2" => &['a', 'b', 'c'],
        "us-west-1" => &['a', 'b'],
        "us-west-2" => &['a', 'b', 'c', 'd'],
        "eu-west-1" => &['a', 'b', 'c'],
        "eu-central-1" => &['a', 'b', 'c'],
        "ap-southeast-1" => &['a', 'b', 'c'],
        "ap-southeast-2" => &['a', 'b', 'c'],
        "ap-northeast-1" => &['a', 'c', 'd'],
        _ => &[],
    }
}

fn gcp_region_letters(region: &str) -> &'static [char] {
    match region {
        "us-east1" => &['b', 'c', 'd'],
        "us-east4" => &['a', 'b', 'c'],
        "us-central1" => &['a', 'b', 'c', 'f'],
        "us-west1" => &['a', 'b', 'c'],
        "europe-west1" => &['b', 'c', 'd'],
        "europe-west4" => &['a', 'b', 'c'],
        "asia-east1" => &['a', 'b', 'c'],
        "asia-southeast1" => &['a', 'b', 'c'],
        _ => &[],
    }
}

/// Default number of AZs generated per region when the caller doesn't
/// specify otherwise.
pub const DEFAULT_AZ_COUNT: usize = 3;

/// Regions in Azure's zone-supporting list, used only to annotate a warning
/// when a region outside this list is asked for zone names; zone names are
/// still produced regardless.
const AZURE_ZONE_SUPPORTING_REGIONS: &[&str] =
    &["eastus", "eastus2", "westus2", "westeurope", "northeurope", "southeastasia"];

/// True iff `region` is known to support availability zones on Azure. Not
/// load-bearing for name generation, purely a diagnostic signal.
pub fn azure_supports_zones(region: &str) -> bool {
    AZURE_ZONE_SUPPORTING_REGIONS.contains(&region)
}

/// Generate `count` availability zone identifiers for `region` under
/// `provider`, in provider-native form.
pub fn generate_az_names(provider: &Provider, region: &str, count: usize) -> Vec<String> {
    match provider {
        Provider::Aws => {
            let letters = aws_region_letters(region);
            let letters = if letters.is_empty() {
                FALLBACK_LETTERS
            } else {
                letters
            };
            letters
                .iter()
                .take(count)
                .map(|l| format!("{region}{l}"))
                .collect()
        }
        Provider::Gcp => {
            let letters = gcp_region_letters(region);
            let letters = if letters.is_empty() {
                FALLBACK_LETTERS
            } else {
                letters
            };
            letters
                .iter()
                .take(count)
                .map(|l| format!("{region}-{l}"))
                .collect()
        }
        Provider::Azure => (1..=count).map(|i| format!("{region}-{i}")).collect(),
        Provider::Unknown(_) => (1..=count).map(|i| format!("{region}-az{i}")).collect(),
    }
}

/// Infer a provider from a bare region string when config omits one.
///
/// Heuristic, not authoritative (spec.md §9): AWS regions are three or more
/// hyphen-separated segments ending in a purely numeric segment
/// (`us-east-1`); GCP regions are a word, a hyphen, then a
/// letters-then-digits segment with no further hyphen (`us-east1`); Azure
/// regions are a single lowercase word with no hyphens (`eastus`). Ambiguous
/// names (`asia-east1` could plausibly be either gcp or a custom label) fall
/// to the first matching rule; callers that need certainty should supply an
/// explicit `clouds` key instead.
pub fn infer_provider(region: &str) -> Option<Provider> {
    if region.is_empty() || !region.chars().all(|c| c.is_ascii_lowercase() || c == '-' || c.is_ascii_digit()) {
        return None;
    }

    let segments: Vec<&str> = region.split('-').collect();

    if segments.len() >= 3 && segments.last().is_some_and(|s| !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())) {
        return Some(Provider::Aws);
    }

    if segments.len() == 2 {
        let last = segments[1];
        let split_at = last.find(|c: char| c.is_ascii_digit());
        if let Some(idx) = split_at {
            let (letters, digits) = last.split_at(idx);
            if !letters.is_empty() && !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                return Some(Provider::Gcp);
            }
        }
    }

    if segments.len() == 1 && !segments[0].is_empty() {
        return Some(Provider::Azure);
    }

    None
}

/// Cache of generated AZ name lists keyed by `(provider, region, count)`,
/// useful for callers that repeatedly ask for the same region (e.g. the
/// planner re-deriving names per account). Generation is cheap and pure, so
/// this exists purely to avoid redundant allocation, not for correctness.
#[derive(Debug, Default)]
pub struct AzDirectory {
    cache: HashMap<(Provider, String, usize), Vec<String>>,
}

impl AzDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn names(&mut self, provider: &Provider, region: &str, count: usize) -> Vec<String> {
        let key = (provider.clone(), region.to_string(), count);
        self.cache
            .entry(key)
            .or_insert_with(|| generate_az_names(provider, region, count))
            .clone()
    }
}
