//! Scan history saved in the local file system.

use crate::scan::{Scan, ScanId};
use anyhow::Error;
use chrono::{DateTime, Utc};
use clap::Args;
use serde::{Deserialize, Serialize};
use std::fs::{self, File};
use std::io::{BufWriter, ErrorKind, Write};
use std::path::{Path, PathBuf};

/// Scan store options.
#[derive(Clone, Debug, Args)]
#[group(id = "store")]
pub struct Options {
    /// Directory where scans are saved.
    #[clap(
        long = "store",
        env = "GEOGRID_STORE",
        value_name = "DIR",
        default_value = "scans"
    )]
    pub dir: PathBuf,
}

impl Options {
    /// Open the store, creating it if necessary.
    pub fn open(&self) -> Result<Store, Error> {
        Store::open(&self.dir)
    }
}

/// A directory of saved scans, one JSON file per scan.
#[derive(Clone, Debug)]
pub struct Store {
    root: PathBuf,
}

/// Succinct information about a saved scan, without its checks.
#[derive(Clone, Debug, PartialEq, Deserialize, Serialize)]
pub struct ScanInfo {
    pub id: ScanId,
    pub business: String,
    pub address: String,
    pub started_at: DateTime<Utc>,
    pub total_checks: usize,
}

impl From<&Scan> for ScanInfo {
    fn from(scan: &Scan) -> Self {
        Self {
            id: scan.id,
            business: scan.request.business.clone(),
            address: scan.request.address.clone(),
            started_at: scan.started_at,
            total_checks: scan.checks.len(),
        }
    }
}

impl Store {
    /// Open a store rooted at `root`, creating the directory if it does not exist.
    pub fn open(root: impl AsRef<Path>) -> Result<Self, Error> {
        let root = root.as_ref().to_path_buf();
        fs::create_dir_all(&root).map_err(|err| {
            Error::msg(format!("unable to create store {}: {err}", root.display()))
        })?;
        Ok(Self { root })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    fn path(&self, id: ScanId) -> PathBuf {
        self.root.join(format!("{id}.json"))
    }

    /// Save a scan, replacing any previous version of it.
    pub fn save(&self, scan: &Scan) -> Result<(), Error> {
        let path = self.path(scan.id);
        // Write to a temporary file first so readers never see a partial scan.
        let tmp = path.with_extension("json.tmp");
        let res = write_json(&tmp, scan).and_then(|()| Ok(fs::rename(&tmp, &path)?));
        if let Err(err) = res {
            if let Err(cleanup) = fs::remove_file(&tmp) {
                if cleanup.kind() != ErrorKind::NotFound {
                    tracing::warn!("unable to remove {}: {cleanup}", tmp.display());
                }
            }
            return Err(Error::msg(format!(
                "unable to save scan {} to {}: {err}",
                scan.id,
                path.display()
            )));
        }
        tracing::info!("saved scan {} to {}", scan.id, path.display());
        Ok(())
    }

    /// Load a scan.
    ///
    /// # Returns
    ///
    /// The scan, or [`None`] if there is no scan with this ID.
    pub fn load(&self, id: ScanId) -> Result<Option<Scan>, Error> {
        let path = self.path(id);
        let file = match File::open(&path) {
            Ok(file) => file,
            Err(err) if err.kind() == ErrorKind::NotFound => return Ok(None),
            Err(err) => {
                return Err(Error::msg(format!(
                    "unable to open {}: {err}",
                    path.display()
                )))
            }
        };
        let scan = serde_json::from_reader(file)
            .map_err(|err| Error::msg(format!("scan {} is malformed: {err}", path.display())))?;
        Ok(Some(scan))
    }

    /// List saved scans, oldest first.
    pub fn list(&self) -> Result<Vec<ScanInfo>, Error> {
        let mut scans = self
            .root
            .read_dir()?
            .filter_map(|dirent| {
                let path = match dirent {
                    Ok(de) => de.path(),
                    Err(err) => {
                        tracing::error!("unable to read store {}: {err}", self.root.display());
                        return None;
                    }
                };
                if path.extension()? != "json" {
                    return None;
                }
                let id = match path.file_stem()?.to_str()?.parse::<ScanId>() {
                    Ok(id) => id,
                    Err(err) => {
                        tracing::warn!("skipping {}: {err}", path.display());
                        return None;
                    }
                };
                match self.load(id) {
                    Ok(scan) => scan.as_ref().map(ScanInfo::from),
                    Err(err) => {
                        tracing::error!("{err}");
                        None
                    }
                }
            })
            .collect::<Vec<_>>();
        scans.sort_by_key(|info| (info.started_at, info.id));
        Ok(scans)
    }

    /// The most recently started scan.
    pub fn latest(&self) -> Result<Option<Scan>, Error> {
        match self.list()?.last() {
            Some(info) => self.load(info.id),
            None => Ok(None),
        }
    }
}

fn write_json(path: &Path, scan: &Scan) -> Result<(), Error> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer(&mut writer, scan)?;
    writer.flush()?;
    Ok(())
}
