//! The dataset facade: search paths, auto-download and subject access
//!
//! A `Dataset` owns what the rest of the crate shares: the normalized layout,
//! the subject search paths, the atlas caches and the auto-download state.
//! Several datasets can live side by side; each has its own caches.

use crate::access::SubjectAccess;
use crate::atlas::AtlasCache;
use crate::config::DatasetConfig;
use crate::loader::{FetcherSlot, FileLoader};
use crate::search::SearchPaths;
use hcpdata_core::types::expand_user;
use hcpdata_core::{Decoder, Error, Result, StoreConnector, SubjectId};
use hcpdata_fetch::{AutoDownloadOptions, RemoteFetcher, RemoteRelease};
use hcpdata_layout::{render, subject_layout, FlatIndex};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

pub struct Dataset {
    layout: &'static FlatIndex,
    search_paths: SearchPaths,
    loader: Arc<FileLoader>,
    auto_download: FetcherSlot,
}

impl Dataset {
    /// Dataset over the HCP layout with no search paths and auto-download off
    pub fn new(decoder: Arc<dyn Decoder>) -> Result<Self> {
        Ok(Self::with_layout(decoder, subject_layout()?))
    }

    pub fn with_layout(decoder: Arc<dyn Decoder>, layout: &'static FlatIndex) -> Self {
        let auto_download: FetcherSlot = Arc::new(RwLock::new(None));
        let loader = FileLoader::new(
            decoder,
            Arc::new(AtlasCache::new()),
            Arc::clone(&auto_download),
        );
        Self {
            layout,
            search_paths: SearchPaths::new(),
            loader: Arc::new(loader),
            auto_download,
        }
    }

    /// Dataset with the configured search paths applied
    ///
    /// Auto-download needs a store connector and is enabled separately with
    /// [`Dataset::enable_auto_download`].
    pub fn from_config(config: &DatasetConfig, decoder: Arc<dyn Decoder>) -> Result<Self> {
        let dataset = Self::new(decoder)?;
        for path in &config.search_paths {
            if !dataset.add_search_path(path, None) {
                tracing::warn!("Search path {} was not (fully) added", path);
            }
        }
        Ok(dataset)
    }

    pub fn layout(&self) -> &'static FlatIndex {
        self.layout
    }

    pub fn atlas_cache(&self) -> &AtlasCache {
        self.loader.atlas()
    }

    pub fn add_search_path(&self, path: &str, index: Option<usize>) -> bool {
        self.search_paths.add(path, index)
    }

    pub fn clear_search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.clear()
    }

    pub fn search_paths(&self) -> Vec<PathBuf> {
        self.search_paths.paths()
    }

    fn fetcher(&self) -> Result<Option<Arc<RemoteFetcher>>> {
        Ok(self
            .auto_download
            .read()
            .map_err(|_| Error::configuration("auto-download lock poisoned"))?
            .clone())
    }

    /// Directory of a subject
    ///
    /// Searches the search paths in order. Failing that, a subject listed in
    /// the auto-download release gets a fresh empty directory under the
    /// auto-download subjects path.
    pub fn find_subject(&self, sid: SubjectId) -> Result<PathBuf> {
        if let Some(dir) = self.search_paths.find(sid)? {
            return Ok(dir);
        }
        match self.fetcher()? {
            Some(fetcher) if fetcher.is_enumerated(sid) => fetcher.provision(sid),
            _ => Err(Error::not_found(format!("could not find HCP subject {}", sid))),
        }
    }

    /// Lazy access to a subject found through [`Dataset::find_subject`]
    pub fn subject(&self, sid: SubjectId) -> Result<SubjectAccess> {
        let dir = self.find_subject(sid)?;
        self.subject_at(sid, dir)
    }

    /// Lazy access to a subject stored in an explicit directory
    pub fn subject_at(&self, sid: SubjectId, dir: impl Into<PathBuf>) -> Result<SubjectAccess> {
        SubjectAccess::build(sid, dir, self.layout, Arc::clone(&self.loader))
    }

    /// Lazy access from a subject directory path or a subject id string
    pub fn open(&self, subject: &str) -> Result<SubjectAccess> {
        let path = expand_user(subject);
        if path.is_dir() {
            let sid = SubjectId::from_path(&path)?;
            return self.subject_at(sid, path);
        }
        self.subject(subject.parse()?)
    }

    fn resolve_subjects_path(&self, configured: Option<&Path>) -> Result<PathBuf> {
        match configured {
            Some(path) => Ok(expand_user(&path.to_string_lossy())),
            None => self
                .search_paths
                .first_existing()
                .ok_or_else(|| Error::configuration("no subjects path given or found")),
        }
    }

    /// Download every file of a subject's layout
    ///
    /// Returns the local paths written. Existing files are handled according
    /// to `options.overwrite`.
    pub fn download(
        &self,
        sid: SubjectId,
        connector: &dyn StoreConnector,
        options: &AutoDownloadOptions,
    ) -> Result<Vec<PathBuf>> {
        let subjects_path = self.resolve_subjects_path(options.subjects_path.as_deref())?;
        let credentials = options.resolve_credentials()?;
        let store = connector.connect(credentials.key(), credentials.secret())?;
        let remote = RemoteRelease::connect(store, &options.database, &options.release)?;

        let relative: Vec<String> = self
            .layout
            .relative_paths()
            .map(|template| render(template, sid))
            .collect();
        let dir = subjects_path.join(sid.to_string());
        remote.download_subject(
            sid,
            relative.iter().map(String::as_str),
            &dir,
            options.overwrite,
        )
    }

    /// Start backfilling missing subject files from the remote release
    ///
    /// Replaces any previous auto-download state as a whole.
    pub fn enable_auto_download(
        &self,
        connector: &dyn StoreConnector,
        options: &AutoDownloadOptions,
    ) -> Result<()> {
        let subjects_path = self.resolve_subjects_path(options.subjects_path.as_deref())?;
        let fetcher = RemoteFetcher::enable(connector, options, subjects_path)?;
        tracing::info!(
            "Auto-download enabled for {} ({} subjects) into {}",
            fetcher.remote().base_key(),
            fetcher.subject_ids().len(),
            fetcher.subjects_path().display()
        );

        let mut slot = self
            .auto_download
            .write()
            .map_err(|_| Error::configuration("auto-download lock poisoned"))?;
        *slot = Some(Arc::new(fetcher));
        Ok(())
    }

    /// Stop auto-downloading; returns whether it was on
    pub fn disable_auto_download(&self) -> bool {
        let Ok(mut slot) = self.auto_download.write() else {
            return false;
        };
        let was_enabled = slot.take().is_some();
        if was_enabled {
            tracing::info!("Auto-download disabled");
        }
        was_enabled
    }

    pub fn auto_download_enabled(&self) -> bool {
        self.fetcher().map(|f| f.is_some()).unwrap_or(false)
    }
}
