use anyhow::Error;
use clap::Parser;
use geogrid::{
    init_logging, report,
    scan::{self, new_scan_id, parse_keywords, Mode, ScanId, ScanRequest, DEFAULT_KEYWORDS},
    store::{self, Store},
    summary::{Comparison, Summary},
};
use serde_json::json;
use std::fs;
use std::path::{Path, PathBuf};
use strum::{EnumString, IntoEnumIterator};

/// Track where a business ranks in Google search across a grid of locations.
#[derive(Parser)]
enum Command {
    /// Run a new scan and save it.
    Scan {
        #[clap(flatten)]
        request: ScanRequest,

        /// Read keywords from FILE, one per line, in addition to any given with --keyword.
        ///
        /// If no keywords are given at all, a default set of coffee shop keywords is used.
        #[clap(long, env = "GEOGRID_KEYWORDS_FILE", name = "FILE")]
        keywords_file: Option<PathBuf>,

        /// Also write results.csv, results.json, and a map for each kind of result to DIR.
        #[clap(short, long, env = "GEOGRID_OUT", name = "DIR")]
        out: Option<PathBuf>,

        #[clap(flatten)]
        apis: scan::Options,

        #[clap(flatten)]
        store: store::Options,
    },
    /// List saved scans, oldest first.
    List {
        #[clap(flatten)]
        store: store::Options,
    },
    /// Print visibility statistics for a saved scan.
    Summary {
        /// The scan to summarize. Defaults to the most recent scan.
        id: Option<ScanId>,

        #[clap(flatten)]
        store: store::Options,
    },
    /// Export the results of a saved scan.
    Export {
        id: ScanId,

        /// The format to export (csv, json, or map).
        #[clap(short, long, default_value = "csv")]
        format: Format,

        /// The kind of result to draw, when exporting a map (organic, local_pack, or maps).
        #[clap(short, long, default_value = "organic")]
        mode: Mode,

        /// Write to FILE instead of standard output.
        #[clap(short, long, name = "FILE")]
        out: Option<PathBuf>,

        #[clap(flatten)]
        store: store::Options,
    },
    /// Compare an earlier scan to a later one.
    Compare {
        before: ScanId,
        after: ScanId,

        #[clap(flatten)]
        store: store::Options,
    },
}

#[derive(Clone, Copy, Debug, EnumString)]
#[strum(ascii_case_insensitive)]
enum Format {
    Csv,
    Json,
    Map,
}

#[async_std::main]
async fn main() -> Result<(), Error> {
    init_logging();

    match Command::parse() {
        Command::Scan {
            mut request,
            keywords_file,
            out,
            apis,
            store,
        } => {
            if let Some(path) = keywords_file {
                let text = fs::read_to_string(&path).map_err(|err| {
                    Error::msg(format!("unable to read {}: {err}", path.display()))
                })?;
                request.keywords.extend(parse_keywords(&text));
            }
            if request.keywords.is_empty() {
                request.keywords = parse_keywords(DEFAULT_KEYWORDS);
            }

            let store = store.open()?;
            let scanner = apis.scanner()?;
            let scan = scanner
                .run(new_scan_id(), &request, |progress| {
                    tracing::info!(
                        "{}/{} checks ({:.0}%)",
                        progress.completed,
                        progress.total,
                        progress.fraction() * 100.0
                    );
                })
                .await?;
            store.save(&scan)?;

            if let Some(dir) = out {
                fs::create_dir_all(&dir)?;
                write(&dir.join("results.csv"), &report::csv(&scan.checks))?;
                write(&dir.join("results.json"), &report::json(&scan.checks)?)?;
                for mode in Mode::iter() {
                    write(
                        &dir.join(format!("map_{mode}.html")),
                        &report::map(&scan.checks, scan.center, mode),
                    )?;
                }
            }

            println!(
                "{:#}",
                json!({ "id": scan.id, "summary": Summary::of(&scan.checks) })
            );
        }
        Command::List { store } => {
            for info in store.open()?.list()? {
                println!(
                    "{}  {}  {} checks  {} ({})",
                    info.id,
                    info.started_at.format("%Y-%m-%d %H:%M"),
                    info.total_checks,
                    info.business,
                    info.address
                );
            }
        }
        Command::Summary { id, store } => {
            let store = store.open()?;
            let scan = match id {
                Some(id) => store.load(id)?,
                None => store.latest()?,
            }
            .ok_or_else(|| Error::msg("no such scan"))?;
            println!(
                "{:#}",
                json!({
                    "id": scan.id,
                    "business": scan.request.business,
                    "summary": Summary::of(&scan.checks),
                    "by_keyword": Summary::by_keyword(&scan.checks),
                })
            );
        }
        Command::Export {
            id,
            format,
            mode,
            out,
            store,
        } => {
            let scan = load(&store.open()?, id)?;
            let text = match format {
                Format::Csv => report::csv(&scan.checks),
                Format::Json => report::json(&scan.checks)?,
                Format::Map => report::map(&scan.checks, scan.center, mode),
            };
            match out {
                Some(path) => write(&path, &text)?,
                None => print!("{text}"),
            }
        }
        Command::Compare {
            before,
            after,
            store,
        } => {
            let store = store.open()?;
            let cmp = Comparison::between(&load(&store, before)?, &load(&store, after)?);
            println!("{}", serde_json::to_string_pretty(&cmp)?);
        }
    }

    Ok(())
}

fn load(store: &Store, id: ScanId) -> Result<scan::Scan, Error> {
    store
        .load(id)?
        .ok_or_else(|| Error::msg(format!("no such scan {id}")))
}

fn write(path: &Path, contents: &str) -> Result<(), Error> {
    fs::write(path, contents)
        .map_err(|err| Error::msg(format!("unable to write {}: {err}", path.display())))?;
    tracing::info!("wrote {}", path.display());
    Ok(())
}
