//! Remote release access: key mapping, single-file fetch, bulk download
//!
//! Remote keys mirror the local subject directory exactly:
//! `<database>/<release>/<subject id>/<relative path>`.

use crate::listing_cache::ListingCache;
use crate::options::{AutoDownloadOptions, OverwritePolicy};
use hcpdata_core::{Error, ObjectStore, Result, StoreConnector, SubjectId};
use std::collections::BTreeSet;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use tempfile::NamedTempFile;

/// Join a `/`-separated relative path onto a local directory
pub fn local_path(dir: &Path, relative: &str) -> PathBuf {
    relative
        .split('/')
        .filter(|part| !part.is_empty())
        .fold(dir.to_path_buf(), |path, part| path.join(part))
}

/// Is a listing entry name a subject id? Six characters, nonzero lead digit
fn parse_listed_subject(key: &str) -> Option<SubjectId> {
    let name = key.trim_end_matches('/').rsplit('/').next()?;
    if name.len() != 6 || name.starts_with('0') {
        return None;
    }
    name.parse::<u32>().ok().and_then(|id| SubjectId::new(id).ok())
}

/// One release inside a remote bucket
#[derive(Clone)]
pub struct RemoteRelease {
    store: Arc<dyn ObjectStore>,
    database: String,
    release: String,
}

impl RemoteRelease {
    /// Attach to `database/release`, failing with NotFound if it does not exist
    pub fn connect(
        store: Arc<dyn ObjectStore>,
        database: impl Into<String>,
        release: impl Into<String>,
    ) -> Result<Self> {
        let remote = Self {
            store,
            database: database.into(),
            release: release.into(),
        };
        let base = remote.base_key();
        let found = remote
            .store
            .exists(&base)
            .map_err(|e| Error::transport(format!("cannot check {}: {}", base, e)))?;
        if !found {
            return Err(Error::not_found(format!(
                "database/release ({}) not found",
                base
            )));
        }
        Ok(remote)
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn release(&self) -> &str {
        &self.release
    }

    pub fn base_key(&self) -> String {
        format!("{}/{}", self.database, self.release)
    }

    pub fn subject_key(&self, sid: SubjectId) -> String {
        format!("{}/{}", self.base_key(), sid)
    }

    pub fn remote_key(&self, sid: SubjectId, relative: &str) -> String {
        format!("{}/{}", self.subject_key(sid), relative.trim_start_matches('/'))
    }

    pub fn subject_exists(&self, sid: SubjectId) -> Result<bool> {
        let key = self.subject_key(sid);
        self.store
            .exists(&key)
            .map_err(|e| Error::transport(format!("cannot check {}: {}", key, e)))
    }

    fn require_subject(&self, sid: SubjectId) -> Result<()> {
        if self.subject_exists(sid)? {
            Ok(())
        } else {
            Err(Error::not_found(format!(
                "subject {} not found in release {}",
                sid,
                self.base_key()
            )))
        }
    }

    /// Ids of every subject directory in the release
    pub fn enumerate_subjects(&self) -> Result<BTreeSet<SubjectId>> {
        let base = self.base_key();
        let keys = self
            .store
            .list(&base)
            .map_err(|e| Error::transport(format!("cannot list {}: {}", base, e)))?;
        let ids: BTreeSet<SubjectId> = keys
            .iter()
            .filter_map(|key| parse_listed_subject(key))
            .collect();
        tracing::debug!("Enumerated {} subjects in {}", ids.len(), base);
        Ok(ids)
    }

    /// Copy one file of a subject to `local`, creating parent directories
    pub fn fetch_file(&self, sid: SubjectId, relative: &str, local: &Path) -> Result<()> {
        self.require_subject(sid)?;
        self.copy(sid, relative, local)
    }

    /// Download into a temporary file next to `local`, then move it into place
    ///
    /// A failed transfer leaves nothing at `local`, so the next access fetches
    /// again instead of decoding a truncated file.
    fn copy(&self, sid: SubjectId, relative: &str, local: &Path) -> Result<()> {
        let parent = match local.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let key = self.remote_key(sid, relative);
        tracing::info!("Downloading {} to {}", key, local.display());
        let partial = NamedTempFile::new_in(parent)?;
        self.store
            .get(&key, partial.path())
            .map_err(|e| Error::transport(format!("failed to fetch {}: {}", key, e)))?;
        partial.persist(local).map_err(|e| Error::Io(e.error))?;
        Ok(())
    }

    /// Download every relative path of a subject into `local_dir`
    ///
    /// Returns the local paths actually written. A failure aborts the
    /// remaining downloads; files already written are left in place.
    pub fn download_subject<'a, I>(
        &self,
        sid: SubjectId,
        relative_paths: I,
        local_dir: &Path,
        overwrite: OverwritePolicy,
    ) -> Result<Vec<PathBuf>>
    where
        I: IntoIterator<Item = &'a str>,
    {
        self.require_subject(sid)?;

        let mut pulled = Vec::new();
        for relative in relative_paths {
            let local = local_path(local_dir, relative);
            if local.is_file() {
                match overwrite {
                    OverwritePolicy::Skip => continue,
                    OverwritePolicy::Overwrite => {}
                    OverwritePolicy::Error => {
                        return Err(Error::configuration(format!(
                            "refusing to overwrite existing file {}",
                            local.display()
                        )));
                    }
                }
            }
            self.copy(sid, relative, &local)?;
            pulled.push(local);
        }

        tracing::info!("Downloaded {} files for subject {}", pulled.len(), sid);
        Ok(pulled)
    }
}

/// Live auto-download state: a connected release plus its subject listing
///
/// Built as a whole by [`RemoteFetcher::enable`] and dropped as a whole when
/// auto-download is switched off.
pub struct RemoteFetcher {
    remote: RemoteRelease,
    subjects_path: PathBuf,
    overwrite: OverwritePolicy,
    subject_ids: BTreeSet<SubjectId>,
    fetch_lock: Mutex<()>,
}

impl RemoteFetcher {
    /// Connect, verify the release and enumerate its subjects
    ///
    /// `subjects_path` is where missing subject directories get created.
    pub fn enable(
        connector: &dyn StoreConnector,
        options: &AutoDownloadOptions,
        subjects_path: PathBuf,
    ) -> Result<Self> {
        let credentials = options.resolve_credentials()?;
        let store = connector.connect(credentials.key(), credentials.secret())?;
        let remote = RemoteRelease::connect(store, &options.database, &options.release)?;

        let cache = match &options.listing_cache {
            Some(path) => {
                let cache = ListingCache::open(path)?;
                cache.cleanup_expired()?;
                Some(cache)
            }
            None => None,
        };
        let release_key = remote.base_key();
        let cached = match &cache {
            Some(cache) => cache.get_subjects(&release_key)?,
            None => None,
        };
        let subject_ids = match cached {
            Some(ids) => ids,
            None => {
                let ids = remote.enumerate_subjects()?;
                if let Some(cache) = &cache {
                    cache.set_subjects(&release_key, &ids)?;
                }
                ids
            }
        };

        Ok(Self::from_parts(
            remote,
            subjects_path,
            options.overwrite,
            subject_ids,
        ))
    }

    pub fn from_parts(
        remote: RemoteRelease,
        subjects_path: PathBuf,
        overwrite: OverwritePolicy,
        subject_ids: BTreeSet<SubjectId>,
    ) -> Self {
        Self {
            remote,
            subjects_path,
            overwrite,
            subject_ids,
            fetch_lock: Mutex::new(()),
        }
    }

    pub fn remote(&self) -> &RemoteRelease {
        &self.remote
    }

    pub fn subjects_path(&self) -> &Path {
        &self.subjects_path
    }

    pub fn overwrite(&self) -> OverwritePolicy {
        self.overwrite
    }

    pub fn subject_ids(&self) -> &BTreeSet<SubjectId> {
        &self.subject_ids
    }

    pub fn is_enumerated(&self, sid: SubjectId) -> bool {
        self.subject_ids.contains(&sid)
    }

    /// Local directory for an enumerated subject, created empty if absent
    pub fn provision(&self, sid: SubjectId) -> Result<PathBuf> {
        if !self.is_enumerated(sid) {
            return Err(Error::not_found(format!(
                "subject {} is not in release {}",
                sid,
                self.remote.base_key()
            )));
        }
        let dir = self.subjects_path.join(sid.to_string());
        if !dir.is_dir() {
            fs::create_dir_all(&dir)?;
            tracing::info!("Provisioned subject directory {}", dir.display());
        }
        Ok(dir)
    }

    /// Make sure `local` exists, fetching it if needed
    ///
    /// Returns true if a download happened. Concurrent callers for the same
    /// file fetch it once.
    pub fn ensure_local(&self, sid: SubjectId, relative: &str, local: &Path) -> Result<bool> {
        if local.is_file() {
            return Ok(false);
        }
        if !self.is_enumerated(sid) {
            return Err(Error::not_found(format!("file {} not found", local.display())));
        }

        let _guard = self
            .fetch_lock
            .lock()
            .map_err(|_| Error::transport("fetch lock poisoned"))?;
        if local.is_file() {
            return Ok(false);
        }
        self.remote.fetch_file(sid, relative, local)?;
        Ok(true)
    }
}
