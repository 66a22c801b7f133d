//! Remote catalog sources.
//!
//! Catalog features may point at a tile-service descriptor on the web instead of a
//! local file. Those are downloaded once into the scratch directory and loaded from
//! there; [`TileCache`] decides which path a source resolves to.

use std::fs::File;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use std::time::Duration;

use ureq::Agent;

use crate::error::{CatalogError, Result};
use crate::host::RemoteFetcher;

/// Whether a source locator is a web address rather than a local path.
pub fn is_url(source: &str) -> bool {
    source.starts_with("http://") || source.starts_with("https://")
}

/// Last path segment of a source locator, for both `/` and `\` separators.
///
/// Trailing separators are ignored, so `http://host/wms/` names `wms`.
pub fn basename(source: &str) -> &str {
    let trimmed = source.trim_end_matches(['/', '\\']);
    trimmed.rsplit(['/', '\\']).next().unwrap_or(trimmed)
}

/// [`RemoteFetcher`] over HTTP(S).
#[derive(Debug, Clone)]
pub struct HttpFetcher {
    agent: Agent,
}

impl HttpFetcher {
    /// Every request (connect, headers and body) must finish within `timeout`.
    pub fn new(timeout: Duration) -> Self {
        let config = Agent::config_builder()
            .timeout_global(Some(timeout))
            .build();
        let agent: Agent = config.into();
        Self { agent }
    }
}

impl RemoteFetcher for HttpFetcher {
    fn exists(&self, url: &str) -> bool {
        match self.agent.get(url).call() {
            Ok(_) => true,
            Err(e) => {
                log::debug!("{} not reachable: {}", url, e);
                false
            }
        }
    }

    fn fetch_to(&self, url: &str, destination: &Path) -> std::result::Result<u64, String> {
        let response = self.agent.get(url).call().map_err(|e| e.to_string())?;
        let mut reader = response.into_body().into_reader();
        let mut file = File::create(destination).map_err(|e| e.to_string())?;
        std::io::copy(&mut reader, &mut file).map_err(|e| e.to_string())
    }
}

/// Maps catalog sources to local files, downloading remote ones on first use.
#[derive(Clone)]
pub struct TileCache {
    scratch_dir: PathBuf,
    fetcher: Rc<dyn RemoteFetcher>,
}

impl TileCache {
    pub fn new(scratch_dir: impl Into<PathBuf>, fetcher: Rc<dyn RemoteFetcher>) -> Self {
        Self {
            scratch_dir: scratch_dir.into(),
            fetcher,
        }
    }

    pub fn scratch_dir(&self) -> &Path {
        &self.scratch_dir
    }

    /// Local file for `source`.
    ///
    /// Local paths come back unchanged. A URL resolves to `scratch_dir/<basename>`,
    /// which is downloaded only when absent; a failed download leaves no file behind.
    pub fn resolve(&self, source: &str) -> Result<PathBuf> {
        if !is_url(source) {
            return Ok(PathBuf::from(source));
        }

        let local = self.scratch_dir.join(basename(source));
        if local.exists() {
            log::debug!("Using cached {:?} for {}", local, source);
            return Ok(local);
        }

        std::fs::create_dir_all(&self.scratch_dir).map_err(|source| CatalogError::Scratch {
            path: self.scratch_dir.clone(),
            source,
        })?;

        match self.fetcher.fetch_to(source, &local) {
            Ok(bytes) => {
                log::info!("Fetched {} ({} bytes) into {:?}", source, bytes, local);
                Ok(local)
            }
            Err(reason) => {
                log::error!("Failed to fetch {}: {}", source, reason);
                if local.exists() {
                    let _ = std::fs::remove_file(&local);
                }
                Err(CatalogError::fetch(source, reason))
            }
        }
    }
}

/// Existence check for attribute values during catalog detection.
#[derive(Clone)]
pub struct SourceProbe {
    fetcher: Rc<dyn RemoteFetcher>,
}

impl SourceProbe {
    pub fn new(fetcher: Rc<dyn RemoteFetcher>) -> Self {
        Self { fetcher }
    }

    /// A reachable URL or an existing local file.
    pub fn exists(&self, value: &str) -> bool {
        if is_url(value) {
            self.fetcher.exists(value)
        } else {
            Path::new(value).is_file()
        }
    }
}
