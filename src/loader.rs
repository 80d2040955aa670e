//! Reads source files into finalized range tables.
//!
//! Both formats go through the `csv` reader: tab-separated without quoting,
//! comma-separated with optional double quotes. Malformed records are
//! logged with their line number and skipped. A missing file yields an
//! empty table. Only real I/O failures abort.

use csv::ByteRecord;
use serde::Serialize;
use std::fs::File;
use std::io::{ErrorKind, Read};
use std::path::Path;

use crate::address::{self, Address, AddressFamily};
use crate::config::{SourceEntry, SourceFormat, SourceSpec, SourcesConfig};
use crate::error::{LineError, Result};
use crate::range::{Coordinates, Observation, RangeTable, RangeTableBuilder, SourceRole};

const COUNTRY_COL: usize = 2;

/// Per-source load counters.
#[derive(Debug, Clone, Serialize)]
pub struct SourceStats {
    pub name: String,
    pub role: SourceRole,
    pub missing: bool,
    pub records: usize,
    pub ranges: usize,
    pub skipped: usize,
    pub overlaps: usize,
}

impl SourceStats {
    pub fn new(name: &str, role: SourceRole) -> Self {
        Self {
            name: name.to_string(),
            role,
            missing: false,
            records: 0,
            ranges: 0,
            skipped: 0,
            overlaps: 0,
        }
    }
}

/// A source ready for the sweep.
#[derive(Debug)]
pub struct LoadedSource {
    pub name: String,
    pub role: SourceRole,
    pub table: RangeTable,
    pub stats: SourceStats,
}

/// Load every configured source from `data_dir`, in configuration order.
pub fn load_all(config: &SourcesConfig, data_dir: &Path, family: AddressFamily) -> Result<Vec<LoadedSource>> {
    config
        .sources
        .iter()
        .map(|entry| load_source(entry, data_dir, family))
        .collect()
}

pub fn load_source(entry: &SourceEntry, data_dir: &Path, family: AddressFamily) -> Result<LoadedSource> {
    let path = entry.path_in(data_dir);
    let file = match File::open(&path) {
        Ok(f) => f,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            tracing::warn!(source = %entry.name, path = %path.display(), "source file missing, using empty table");
            let mut stats = SourceStats::new(&entry.name, entry.role);
            stats.missing = true;
            return Ok(LoadedSource {
                name: entry.name.clone(),
                role: entry.role,
                table: RangeTable::empty(),
                stats,
            });
        }
        Err(e) => return Err(e.into()),
    };

    let (table, stats) = read_table(file, &entry.name, entry.role, &entry.spec, family)?;
    tracing::info!(
        source = %entry.name,
        role = %entry.role,
        ranges = stats.ranges,
        skipped = stats.skipped,
        "loaded source"
    );
    Ok(LoadedSource {
        name: entry.name.clone(),
        role: entry.role,
        table,
        stats,
    })
}

/// Parse every record of `reader` into a finalized table.
pub fn read_table<R: Read>(
    reader: R,
    name: &str,
    role: SourceRole,
    spec: &SourceSpec,
    family: AddressFamily,
) -> Result<(RangeTable, SourceStats)> {
    let mut records = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .trim(csv::Trim::All)
        .quoting(spec.format.quoted())
        .delimiter(spec.format.delimiter())
        .from_reader(reader);

    let mut stats = SourceStats::new(name, role);
    let mut builder = RangeTableBuilder::new();
    let mut raw = ByteRecord::new();

    while records.read_byte_record(&mut raw)? {
        if raw.iter().all(|field| field.is_empty()) {
            continue;
        }
        stats.records += 1;

        let fields: std::result::Result<Vec<&str>, _> = raw.iter().map(std::str::from_utf8).collect();
        let parsed = match fields {
            Ok(fields) => parse_record(&fields, role, spec, family),
            Err(_) => Err(LineError::Encoding),
        };
        match parsed {
            Ok((start, end, payload)) => builder.add(start, end, payload),
            Err(e) => {
                stats.skipped += 1;
                let line = raw.position().map_or(0, |p| p.line());
                tracing::warn!(source = name, line, error = %e, "skipping malformed record");
            }
        }
    }

    stats.ranges = builder.len();
    let table = builder.finalize(name);
    stats.overlaps = table.overlaps();
    Ok((table, stats))
}

fn parse_record(
    fields: &[&str],
    role: SourceRole,
    spec: &SourceSpec,
    family: AddressFamily,
) -> std::result::Result<(Address, Address, Observation), LineError> {
    let needed = match role {
        SourceRole::LatLong => spec.lat_col.max(spec.long_col).max(COUNTRY_COL) + 1,
        SourceRole::CountryOnly => COUNTRY_COL + 1,
    };
    if fields.len() < needed {
        return Err(LineError::TooFewFields { expected: needed, found: fields.len() });
    }

    let parse = |field: &str| match spec.format {
        SourceFormat::HexTsv => address::parse_hex(field, family),
        SourceFormat::DecimalCsv => address::parse_text(field, family),
    };
    let start = parse(fields[0]).map_err(LineError::Address)?;
    let end = parse(fields[1]).map_err(LineError::Address)?;
    if start > end {
        return Err(LineError::Inverted {
            start: fields[0].to_string(),
            end: fields[1].to_string(),
        });
    }

    let country = fields[COUNTRY_COL].to_string();
    let payload = match role {
        SourceRole::CountryOnly => Observation::CountryOnly { country },
        SourceRole::LatLong => {
            let (lat, lon) = (fields[spec.lat_col], fields[spec.long_col]);
            match Coordinates::parse(lat, lon) {
                Some(coords) => Observation::WithCoords { country, coords },
                None => {
                    return Err(LineError::Coordinate {
                        value: format!("{},{}", lat, lon),
                        country,
                    })
                }
            }
        }
    };
    Ok((start, end, payload))
}
