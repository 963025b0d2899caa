//! Dataset configuration, usually read once from the environment

use hcpdata_core::types::expand_user;
use hcpdata_fetch::{AutoDownloadOptions, OverwritePolicy, DEFAULT_DATABASE, DEFAULT_RELEASE};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Variables holding `:`-separated subject directory lists
const SUBJECTS_DIR_VARS: [&str; 2] = ["HCP_SUBJECTS_DIR", "HCPSUBJS_DIR"];

/// Variables naming an HCP root whose `subjects` directory is searched
const ROOT_VARS: [&str; 2] = ["HCP_ROOT", "HCP_DIR"];

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatasetConfig {
    /// Search path entries, each possibly a `:`-separated list
    pub search_paths: Vec<String>,
    pub auto_download: bool,
    pub database: String,
    pub release: String,
    /// Where auto-downloaded subjects go (None = first existing search path)
    pub auto_path: Option<PathBuf>,
    pub overwrite: OverwritePolicy,
    pub listing_cache: Option<PathBuf>,
}

impl Default for DatasetConfig {
    fn default() -> Self {
        Self {
            search_paths: Vec::new(),
            auto_download: false,
            database: DEFAULT_DATABASE.to_string(),
            release: DEFAULT_RELEASE.to_string(),
            auto_path: None,
            overwrite: OverwritePolicy::default(),
            listing_cache: None,
        }
    }
}

impl DatasetConfig {
    /// Read the `HCP_*` environment variables
    pub fn from_env() -> Self {
        Self::from_vars(|name| std::env::var(name).ok())
    }

    /// Build from an arbitrary variable lookup
    pub fn from_vars<F>(var: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        for name in SUBJECTS_DIR_VARS {
            if let Some(value) = var(name) {
                config.search_paths.push(value);
            }
        }
        for name in ROOT_VARS {
            if let Some(root) = var(name) {
                let subjects = expand_user(&root).join("subjects");
                if subjects.is_dir() {
                    config
                        .search_paths
                        .push(subjects.to_string_lossy().into_owned());
                }
            }
        }

        config.auto_download = var("HCP_AUTO_DOWNLOAD")
            .map(|v| matches!(v.to_lowercase().as_str(), "on" | "yes" | "true" | "1"))
            .unwrap_or(false);
        if let Some(release) = var("HCP_AUTO_RELEASE") {
            config.release = release;
        }
        if let Some(database) = var("HCP_AUTO_DATABASE") {
            config.database = database;
        }
        config.auto_path = var("HCP_AUTO_PATH").map(|p| expand_user(&p));
        config.listing_cache = var("HCP_LISTING_CACHE").map(|p| expand_user(&p));
        config
    }

    /// Auto-download options when auto-download is switched on
    pub fn auto_download_options(&self) -> Option<AutoDownloadOptions> {
        if !self.auto_download {
            return None;
        }
        Some(self.download_options())
    }

    /// Options for this configuration's release, regardless of the auto flag
    pub fn download_options(&self) -> AutoDownloadOptions {
        AutoDownloadOptions {
            database: self.database.clone(),
            release: self.release.clone(),
            subjects_path: self.auto_path.clone(),
            overwrite: self.overwrite,
            credentials: None,
            listing_cache: self.listing_cache.clone(),
        }
    }
}
