//! Writes the merged table and the optional run report.

use chrono::{DateTime, Utc};
use serde::Serialize;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

use crate::address::{self, AddressFamily};
use crate::error::Result;
use crate::loader::SourceStats;
use crate::merge::{MergeStats, MergedTable};

/// One line per segment: `start_hex end_hex country lat lon`, tab-separated,
/// with the provenance label appended when `with_provenance` is set.
pub fn write_tsv<W: Write>(writer: W, merged: &MergedTable, with_provenance: bool) -> Result<()> {
    let mut out = BufWriter::new(writer);
    for s in &merged.segments {
        write!(
            out,
            "{}\t{}\t{}\t{}\t{}",
            address::to_hex(s.start),
            address::to_hex(s.end),
            s.country,
            s.coords.lat,
            s.coords.lon
        )?;
        if with_provenance {
            write!(out, "\t{}", s.provenance)?;
        }
        writeln!(out)?;
    }
    out.flush()?;
    Ok(())
}

pub fn write_tsv_file(path: &Path, merged: &MergedTable, with_provenance: bool) -> Result<()> {
    let file = File::create(path)?;
    write_tsv(file, merged, with_provenance)
}

/// Summary of a run, written as JSON.
#[derive(Debug, Clone, Serialize)]
pub struct MergeReport {
    pub generated_at: DateTime<Utc>,
    pub family: AddressFamily,
    pub sources: Vec<SourceStats>,
    #[serde(flatten)]
    pub merge: MergeStats,
}

impl MergeReport {
    pub fn new(family: AddressFamily, sources: Vec<SourceStats>, merge: MergeStats) -> Self {
        Self {
            generated_at: Utc::now(),
            family,
            sources,
            merge,
        }
    }

    pub fn write_to(&self, path: &Path) -> Result<()> {
        let file = File::create(path)?;
        let mut out = BufWriter::new(file);
        serde_json::to_writer_pretty(&mut out, self)?;
        writeln!(out)?;
        out.flush()?;
        Ok(())
    }
}
