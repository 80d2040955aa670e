//! Source and merge configuration, loaded from a TOML or YAML document.
//!
//! Files ending in `.yaml`/`.yml` are read as YAML, anything else as TOML.
//! Both carry the same sections; keys the merge does not use (such as the
//! per-family download URLs `ipv4`/`ipv6`) are ignored.
//!
//! ```toml
//! [latlong.ipinfo]
//! format = "hex_tsv"
//! lat_col = 5
//! long_col = 6
//!
//! [country.rir]
//! format = "decimal_csv"
//!
//! [merge]
//! coord_priority = ["ipinfo"]
//! vote_priority = ["rir"]
//! coord_spread_threshold = 2.0
//! overrides = [{ match = ["rir", "ipinfo"] }]
//! ```
//!
//! Source order follows the document: `latlong` entries first, then `country`.
//! That order feeds vote ranking, so it must stay stable.

use serde::de::{Deserializer, MapAccess, Visitor};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};
use crate::range::SourceRole;

const DEFAULT_LAT_COL: usize = 5;
const DEFAULT_LONG_COL: usize = 6;
const DEFAULT_SPREAD_THRESHOLD: f64 = 2.0;

/// On-disk layout of a source file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceFormat {
    /// Tab-separated, hexadecimal addresses.
    #[default]
    HexTsv,
    /// Comma-separated, dotted/IPv6 text or decimal addresses.
    DecimalCsv,
}

impl SourceFormat {
    pub fn extension(self) -> &'static str {
        match self {
            Self::HexTsv => "tsv",
            Self::DecimalCsv => "csv",
        }
    }

    pub fn delimiter(self) -> u8 {
        match self {
            Self::HexTsv => b'\t',
            Self::DecimalCsv => b',',
        }
    }

    /// Whether fields may be wrapped in double quotes.
    pub fn quoted(self) -> bool {
        self == Self::DecimalCsv
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct SourceSpec {
    #[serde(default)]
    pub format: SourceFormat,
    #[serde(default = "default_lat_col")]
    pub lat_col: usize,
    #[serde(default = "default_long_col")]
    pub long_col: usize,
}

fn default_lat_col() -> usize {
    DEFAULT_LAT_COL
}

fn default_long_col() -> usize {
    DEFAULT_LONG_COL
}

impl Default for SourceSpec {
    fn default() -> Self {
        Self {
            format: SourceFormat::default(),
            lat_col: DEFAULT_LAT_COL,
            long_col: DEFAULT_LONG_COL,
        }
    }
}

/// A named source with its role.
#[derive(Debug, Clone, PartialEq)]
pub struct SourceEntry {
    pub name: String,
    pub role: SourceRole,
    pub spec: SourceSpec,
}

impl SourceEntry {
    /// `<data_dir>/<name>.<ext>`
    pub fn path_in(&self, data_dir: &Path) -> PathBuf {
        data_dir.join(format!("{}.{}", self.name, self.spec.format.extension()))
    }
}

/// Sources whose unanimous agreement forces a country.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
pub struct OverrideRule {
    #[serde(rename = "match", default)]
    pub sources: Vec<String>,
}

/// Resolver settings. `coord_priority` is always concrete here; when the
/// document omits it, it defaults to the `latlong` sources in order.
#[derive(Debug, Clone, PartialEq)]
pub struct MergeConfig {
    pub coord_priority: Vec<String>,
    pub vote_priority: Vec<String>,
    pub coord_spread_threshold: f64,
    pub overrides: Vec<OverrideRule>,
}

impl Default for MergeConfig {
    fn default() -> Self {
        Self {
            coord_priority: Vec::new(),
            vote_priority: Vec::new(),
            coord_spread_threshold: DEFAULT_SPREAD_THRESHOLD,
            overrides: Vec::new(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct RawMerge {
    #[serde(default)]
    coord_priority: Option<Vec<String>>,
    #[serde(default)]
    vote_priority: Vec<String>,
    #[serde(default = "default_threshold")]
    coord_spread_threshold: f64,
    #[serde(default)]
    overrides: Vec<OverrideRule>,
}

fn default_threshold() -> f64 {
    DEFAULT_SPREAD_THRESHOLD
}

impl Default for RawMerge {
    fn default() -> Self {
        Self {
            coord_priority: None,
            vote_priority: Vec::new(),
            coord_spread_threshold: DEFAULT_SPREAD_THRESHOLD,
            overrides: Vec::new(),
        }
    }
}

/// One role section, entries kept in document order. Settings stay
/// format-neutral until each entry is checked on its own.
#[derive(Debug, Default)]
struct Section(Vec<(String, serde_json::Value)>);

impl<'de> Deserialize<'de> for Section {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct SectionVisitor;

        impl<'de> Visitor<'de> for SectionVisitor {
            type Value = Section;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str("a table of named sources")
            }

            fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> std::result::Result<Section, A::Error> {
                let mut entries = Vec::new();
                while let Some(entry) = map.next_entry::<String, serde_json::Value>()? {
                    entries.push(entry);
                }
                Ok(Section(entries))
            }

            // `latlong:` with nothing under it in YAML
            fn visit_unit<E>(self) -> std::result::Result<Section, E> {
                Ok(Section::default())
            }
        }

        deserializer.deserialize_any(SectionVisitor)
    }
}

#[derive(Debug, Deserialize)]
struct RawConfig {
    #[serde(default)]
    latlong: Section,
    #[serde(default)]
    country: Section,
    #[serde(default)]
    merge: Option<RawMerge>,
}

/// Validated configuration for one merge run.
#[derive(Debug, Clone)]
pub struct SourcesConfig {
    pub sources: Vec<SourceEntry>,
    pub merge: MergeConfig,
}

impl SourcesConfig {
    pub fn load(path: &Path) -> Result<Self> {
        let text = fs::read_to_string(path).map_err(|e| {
            Error::Config(format!("cannot read {}: {}", path.display(), e))
        })?;
        match path.extension().and_then(|ext| ext.to_str()) {
            Some("yaml") | Some("yml") => Self::from_yaml_str(&text),
            _ => Self::from_toml_str(&text),
        }
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        Self::from_raw(toml::from_str(text)?)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self> {
        Self::from_raw(serde_yaml::from_str(text)?)
    }

    fn from_raw(raw: RawConfig) -> Result<Self> {
        let mut sources = Vec::new();
        for (role, section) in [(SourceRole::LatLong, raw.latlong), (SourceRole::CountryOnly, raw.country)] {
            for (name, value) in section.0 {
                let spec = if value.is_null() {
                    SourceSpec::default()
                } else {
                    serde_json::from_value(value)
                        .map_err(|e| Error::Config(format!("source '{}': {}", name, e)))?
                };
                sources.push(SourceEntry { name, role, spec });
            }
        }

        let raw_merge = raw.merge.unwrap_or_default();
        let coord_priority = raw_merge.coord_priority.unwrap_or_else(|| {
            sources
                .iter()
                .filter(|s| s.role == SourceRole::LatLong)
                .map(|s| s.name.clone())
                .collect()
        });

        let config = Self {
            sources,
            merge: MergeConfig {
                coord_priority,
                vote_priority: raw_merge.vote_priority,
                coord_spread_threshold: raw_merge.coord_spread_threshold,
                overrides: raw_merge.overrides,
            },
        };
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.sources.is_empty() {
            return Err(Error::Config(
                "no sources configured: need a [latlong] or [country] section".into(),
            ));
        }

        let mut seen = HashSet::new();
        for source in &self.sources {
            if !seen.insert(source.name.as_str()) {
                return Err(Error::Config(format!("duplicate source name '{}'", source.name)));
            }
            if source.role == SourceRole::LatLong && (source.spec.lat_col < 3 || source.spec.long_col < 3) {
                return Err(Error::Config(format!(
                    "source '{}': lat_col/long_col must not overlap columns 0-2 (start, end, country)",
                    source.name
                )));
            }
        }

        let threshold = self.merge.coord_spread_threshold;
        if !threshold.is_finite() || threshold < 0.0 {
            return Err(Error::Config(format!(
                "coord_spread_threshold must be a non-negative number, got {}",
                threshold
            )));
        }
        Ok(())
    }

    /// Names referenced by the merge section that match no configured source.
    /// These never match anything; they are reported, not rejected.
    pub fn unknown_references(&self) -> Vec<String> {
        let known: HashSet<&str> = self.sources.iter().map(|s| s.name.as_str()).collect();
        let merge = &self.merge;
        let mut unknown: Vec<String> = Vec::new();
        let referenced = merge
            .coord_priority
            .iter()
            .chain(&merge.vote_priority)
            .chain(merge.overrides.iter().flat_map(|r| &r.sources));
        for name in referenced {
            if !known.contains(name.as_str()) && !unknown.contains(name) {
                unknown.push(name.clone());
            }
        }
        unknown
    }
}
