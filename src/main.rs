use clap::{Parser, Subcommand};
use geoip_merge::address::AddressFamily;
use geoip_merge::logging;
use geoip_merge::pipeline::{self, MergeRequest};
use std::path::PathBuf;

/// geomerge — merges overlapping IP geolocation sources into one table
///
/// Reads every source named in the configuration from DATA_DIR
/// (`<name>.tsv` or `<name>.csv`), resolves disagreements per address
/// range, and writes `start_hex end_hex country lat lon` lines.
///
/// Examples:
///   geomerge merge sources.toml ipv4 data/ipv4 merged-ipv4.tsv
///   geomerge merge sources.toml ipv6 data/ipv6 merged-ipv6.tsv --report run.json
///   geomerge explain sources.toml ipv4 data/ipv4 8.8.8.8
#[derive(Parser)]
#[command(name = "geomerge", version, about, long_about = None)]
struct Cli {
    /// Log at debug level (RUST_LOG overrides).
    #[arg(long, short = 'v', global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Merge all sources and write the combined table.
    Merge {
        /// Source configuration (TOML, or YAML when named `.yaml`/`.yml`).
        config: PathBuf,
        /// Address family of the source files.
        #[arg(value_enum)]
        family: AddressFamily,
        /// Directory holding the downloaded source files.
        data_dir: PathBuf,
        /// Merged table to write.
        output: PathBuf,
        /// Append the decision label as a sixth column.
        #[arg(long)]
        provenance: bool,
        /// Write a JSON run report to this path.
        #[arg(long)]
        report: Option<PathBuf>,
    },
    /// Show every source's view of one address and how it was resolved.
    Explain {
        config: PathBuf,
        #[arg(value_enum)]
        family: AddressFamily,
        data_dir: PathBuf,
        /// Address as dotted/IPv6 text, decimal, or 0x-prefixed hex.
        address: String,
    },
}

fn main() {
    let cli = Cli::parse();
    logging::init(cli.verbose);

    match cli.command {
        Command::Merge { config, family, data_dir, output, provenance, report } => {
            let request = MergeRequest {
                config,
                family,
                data_dir,
                output,
                with_provenance: provenance,
                report,
            };
            match pipeline::run_merge(&request) {
                Ok(report) => {
                    eprintln!(
                        "Done! {} entries written to {}.",
                        report.merge.merged_segments,
                        request.output.display()
                    );
                }
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
        Command::Explain { config, family, data_dir, address } => {
            match pipeline::explain(&config, &data_dir, family, &address) {
                Ok(json) => println!("{}", json),
                Err(e) => {
                    eprintln!("Error: {}", e);
                    std::process::exit(1);
                }
            }
        }
    }
}
