//! End-to-end runs: configuration → loading → merge → output.

use std::path::{Path, PathBuf};

use crate::address::{self, Address, AddressFamily};
use crate::config::SourcesConfig;
use crate::error::Result;
use crate::loader::{self, LoadedSource};
use crate::merge::MergeEngine;
use crate::output::{self, MergeReport};

/// Everything a `merge` run needs.
#[derive(Debug, Clone)]
pub struct MergeRequest {
    pub config: PathBuf,
    pub family: AddressFamily,
    pub data_dir: PathBuf,
    pub output: PathBuf,
    pub with_provenance: bool,
    pub report: Option<PathBuf>,
}

/// Load configuration and every source. Fails only on fatal problems.
pub fn prepare(config_path: &Path, data_dir: &Path, family: AddressFamily) -> Result<(SourcesConfig, Vec<LoadedSource>)> {
    let config = SourcesConfig::load(config_path)?;
    for name in config.unknown_references() {
        tracing::warn!(source = %name, "merge settings reference an unknown source; it will never match");
    }

    tracing::info!(%family, sources = config.sources.len(), "loading sources");
    let sources = loader::load_all(&config, data_dir, family)?;
    Ok((config, sources))
}

pub fn run_merge(request: &MergeRequest) -> Result<MergeReport> {
    let (config, sources) = prepare(&request.config, &request.data_dir, request.family)?;

    let merged = MergeEngine::new(&sources, &config.merge).run();

    tracing::info!(path = %request.output.display(), segments = merged.segments.len(), "writing merged table");
    output::write_tsv_file(&request.output, &merged, request.with_provenance)?;

    let report = MergeReport::new(
        request.family,
        sources.into_iter().map(|s| s.stats).collect(),
        merged.stats,
    );
    if let Some(path) = &request.report {
        report.write_to(path)?;
        tracing::info!(path = %path.display(), "wrote run report");
    }
    Ok(report)
}

/// Resolve one address and render the audit trail as pretty JSON.
pub fn explain(config_path: &Path, data_dir: &Path, family: AddressFamily, addr: &str) -> Result<String> {
    let point = parse_cli_address(addr, family)?;
    let (config, sources) = prepare(config_path, data_dir, family)?;
    let explanation = MergeEngine::new(&sources, &config.merge).explain(point);
    Ok(serde_json::to_string_pretty(&explanation)?)
}

/// `0x`-prefixed hex, or any notation the text parser accepts.
pub fn parse_cli_address(addr: &str, family: AddressFamily) -> Result<Address> {
    let trimmed = addr.trim();
    if trimmed.starts_with("0x") || trimmed.starts_with("0X") {
        address::parse_hex(trimmed, family)
    } else {
        address::parse_text(trimmed, family)
    }
}
