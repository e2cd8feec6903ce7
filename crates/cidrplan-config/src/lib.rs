//! Canonical configuration model and raw-config normalization.
//!
//! [`RawConfig`] is the shape a decoded JSON or YAML document deserializes
//! into; reading the file and picking a format is a caller concern (the CLI
//! crate), not this one. [`normalize`] turns a `RawConfig` into the
//! canonical [`Config`] the planner consumes: trimming names, defaulting
//! prefix lengths, deriving `cloudProviders` when absent, and coercing
//! `subnetTypes` from either of its two accepted shapes into one ordered
//! value type.

use cidrplan_cidr::Ipv4Cidr;
use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::marker::PhantomData;
use thiserror::Error;

/// Errors raised while normalizing a [`RawConfig`] into a [`Config`].
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// A CIDR string in the config failed to parse.
    #[error("invalid CIDR in config: {0}")]
    Cidr(#[from] cidrplan_cidr::CidrError),

    /// A structural rule was violated; `path` names the offending field.
    #[error("validation failed at {path}: {message}")]
    ValidationError { path: String, message: String },
}

pub type Result<T> = std::result::Result<T, ConfigError>;

fn validation_error(path: impl Into<String>, message: impl Into<String>) -> ConfigError {
    ConfigError::ValidationError {
        path: path.into(),
        message: message.into(),
    }
}

/// A string-keyed map that preserves the order its entries were declared
/// in, in either a JSON/YAML map or a deserialized `Vec` of entries. This is
/// the "single ordered-map value type" both `subnetTypes` and
/// `account.clouds` collapse into. The source's "dynamic shape" and
/// "declaration order matters" requirements become one concrete type
/// instead of leaking through every downstream consumer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderedMap<V> {
    entries: Vec<(String, V)>,
}

impl<V> OrderedMap<V> {
    pub fn new() -> Self {
        Self { entries: Vec::new() }
    }

    pub fn push(&mut self, key: String, value: V) {
        self.entries.push((key, value));
    }

    pub fn get(&self, key: &str) -> Option<&V> {
        self.entries.iter().find(|(k, _)| k == key).map(|(_, v)| v)
    }

    pub fn iter(&self) -> impl Iterator<Item = &(String, V)> {
        self.entries.iter()
    }

    pub fn keys(&self) -> impl Iterator<Item = &String> {
        self.entries.iter().map(|(k, _)| k)
    }

    pub fn values(&self) -> impl Iterator<Item = &V> {
        self.entries.iter().map(|(_, v)| v)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<V> Default for OrderedMap<V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<'de, V: Deserialize<'de>> Deserialize<'de> for OrderedMap<V> {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        struct MapVisitor<V>(PhantomData<V>);

        impl<'de, V: Deserialize<'de>> Visitor<'de> for MapVisitor<V> {
            type Value = OrderedMap<V>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a map of string keys to values")
            }

            fn visit_map<A>(self, mut map: A) -> std::result::Result<Self::Value, A::Error>
            where
                A: MapAccess<'de>,
            {
                let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
                while let Some((k, v)) = map.next_entry::<String, V>()? {
                    entries.push((k, v));
                }
                Ok(OrderedMap { entries })
            }
        }

        deserializer.deserialize_map(MapVisitor(PhantomData))
    }
}

impl<V: Serialize> Serialize for OrderedMap<V> {
    fn serialize<S>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (k, v) in &self.entries {
            map.serialize_entry(k, v)?;
        }
        map.end()
    }
}

/// Optional per-level prefix-length overrides; unset fields default to
/// `16` (account), `20` (region), `24` (AZ).
#[derive(Debug, Clone, Copy, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawPrefixLengths {
    pub account: Option<u8>,
    pub region: Option<u8>,
    pub az: Option<u8>,
}

/// A single cloud's raw config: an optional CIDR override and its ordered
/// list of regions.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawCloudConfig {
    pub base_cidr: Option<String>,
    pub regions: Vec<String>,
}

/// A single account's raw config: a name and an ordered map from provider
/// key to that provider's config.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawAccount {
    pub name: String,
    pub clouds: OrderedMap<RawCloudConfig>,
}

/// One entry of the list-shaped `subnetTypes` form.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawSubnetTypeEntry {
    pub name: String,
    pub prefix_length: u8,
}

/// `subnetTypes` accepts either a map (`{name: prefixLength}`) or a list
/// (`[{name, prefixLength}, …]`); both normalize to the same ordered type.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(untagged)]
pub enum RawSubnetTypes {
    Map(OrderedMap<u8>),
    List(Vec<RawSubnetTypeEntry>),
}

/// Top-level raw config, the shape a decoded JSON or YAML document
/// deserializes into.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RawConfig {
    pub base_cidr: String,
    #[serde(default)]
    pub prefix_lengths: Option<RawPrefixLengths>,
    #[serde(default)]
    pub cloud_providers: Option<Vec<String>>,
    pub accounts: Vec<RawAccount>,
    pub subnet_types: RawSubnetTypes,
}

/// Canonical, normalized per-level prefix lengths.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PrefixLengths {
    pub account: u8,
    pub region: u8,
    pub az: u8,
}

impl Default for PrefixLengths {
    fn default() -> Self {
        Self {
            account: 16,
            region: 20,
            az: 24,
        }
    }
}

/// Canonical cloud config: a parsed override CIDR (if any) and the ordered
/// list of regions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CloudConfig {
    pub base_cidr: Option<Ipv4Cidr>,
    pub regions: Vec<String>,
}

/// Canonical account: a trimmed name and an ordered map of provider clouds.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Account {
    pub name: String,
    pub clouds: OrderedMap<CloudConfig>,
}

/// Canonical, ordered role-name-to-prefix-length mapping.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SubnetTypes(OrderedMap<u8>);

impl SubnetTypes {
    pub fn iter(&self) -> impl Iterator<Item = (&String, &u8)> {
        self.0.iter().map(|(k, v)| (k, v))
    }

    pub fn values(&self) -> impl Iterator<Item = &u8> {
        self.0.values()
    }

    pub fn get(&self, role: &str) -> Option<u8> {
        self.0.get(role).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// The canonical configuration the planner consumes. Immutable once
/// constructed by [`normalize`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub base_cidr: Ipv4Cidr,
    pub prefix_lengths: PrefixLengths,
    pub cloud_providers: Vec<String>,
    pub accounts: Vec<Account>,
    pub subnet_types: SubnetTypes,
}

/// Normalize a decoded [`RawConfig`] into the canonical [`Config`].
pub fn normalize(raw: RawConfig) -> Result<Config> {
    let base_cidr = Ipv4Cidr::parse(&raw.base_cidr)?;

    let prefix_lengths = normalize_prefix_lengths(raw.prefix_lengths)?;
    let subnet_types = normalize_subnet_types(raw.subnet_types)?;
    let accounts = normalize_accounts(raw.accounts)?;

    for (role, role_prefix) in subnet_types.iter() {
        if *role_prefix < prefix_lengths.az {
            return Err(validation_error(
                format!("subnetTypes.{role}"),
                format!(
                    "role prefix /{role_prefix} is larger (less specific) than the enclosing AZ prefix /{}",
                    prefix_lengths.az
                ),
            ));
        }
    }

    let cloud_providers = match raw.cloud_providers {
        Some(providers) => providers,
        None => derive_cloud_providers(&accounts),
    };

    Ok(Config {
        base_cidr,
        prefix_lengths,
        cloud_providers,
        accounts,
        subnet_types,
    })
}

fn normalize_prefix_lengths(raw: Option<RawPrefixLengths>) -> Result<PrefixLengths> {
    let defaults = PrefixLengths::default();
    let raw = raw.unwrap_or(RawPrefixLengths {
        account: None,
        region: None,
        az: None,
    });

    let account = raw.account.unwrap_or(defaults.account);
    let region = raw.region.unwrap_or(defaults.region);
    let az = raw.az.unwrap_or(defaults.az);

    for (field, value) in [("account", account), ("region", region), ("az", az)] {
        if !(1..=32).contains(&value) {
            return Err(validation_error(
                format!("prefixLengths.{field}"),
                format!("prefix length {value} out of range [1, 32]"),
            ));
        }
    }

    Ok(PrefixLengths { account, region, az })
}

fn normalize_subnet_types(raw: RawSubnetTypes) -> Result<SubnetTypes> {
    let mut ordered = OrderedMap::new();
    match raw {
        RawSubnetTypes::Map(map) => {
            for (name, prefix) in map.iter() {
                push_subnet_type(&mut ordered, name.clone(), *prefix)?;
            }
        }
        RawSubnetTypes::List(entries) => {
            for entry in entries {
                push_subnet_type(&mut ordered, entry.name, entry.prefix_length)?;
            }
        }
    }

    if ordered.is_empty() {
        return Err(validation_error("subnetTypes", "must declare at least one role"));
    }

    Ok(SubnetTypes(ordered))
}

fn push_subnet_type(ordered: &mut OrderedMap<u8>, name: String, prefix: u8) -> Result<()> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(validation_error("subnetTypes", "role name must not be empty"));
    }
    if !(1..=32).contains(&prefix) {
        return Err(validation_error(
            format!("subnetTypes.{trimmed}"),
            format!("prefix length {prefix} out of range [1, 32]"),
        ));
    }
    ordered.push(trimmed.to_string(), prefix);
    Ok(())
}

fn normalize_accounts(raw: Vec<RawAccount>) -> Result<Vec<Account>> {
    if raw.is_empty() {
        return Err(validation_error("accounts", "must declare at least one account"));
    }

    raw.into_iter()
        .enumerate()
        .map(|(i, account)| normalize_account(i, account))
        .collect()
}

fn normalize_account(index: usize, raw: RawAccount) -> Result<Account> {
    let trimmed = raw.name.trim();
    if trimmed.is_empty() {
        return Err(validation_error(
            format!("accounts[{index}].name"),
            "account name must not be empty after trimming",
        ));
    }

    let mut clouds = OrderedMap::new();
    for (provider, cloud) in raw.clouds.iter() {
        if cloud.regions.is_empty() {
            return Err(validation_error(
                format!("accounts[{index}].clouds.{provider}.regions"),
                "must declare at least one region",
            ));
        }
        let base_cidr = cloud
            .base_cidr
            .as_deref()
            .map(Ipv4Cidr::parse)
            .transpose()?;
        clouds.push(
            provider.clone(),
            CloudConfig {
                base_cidr,
                regions: cloud.regions.clone(),
            },
        );
    }

    Ok(Account {
        name: trimmed.to_string(),
        clouds,
    })
}

fn derive_cloud_providers(accounts: &[Account]) -> Vec<String> {
    let mut seen = Vec::new();
    for account in accounts {
        for provider in account.clouds.keys() {
            if !seen.contains(provider) {
                seen.push(provider.clone());
            }
        }
    }
    seen
}
