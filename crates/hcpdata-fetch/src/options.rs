//! Auto-download and bulk download options

use crate::credentials::Credentials;
use hcpdata_core::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::str::FromStr;

/// Release fetched when none is configured
pub const DEFAULT_RELEASE: &str = "HCP_1200";

/// Bucket holding the open-access releases
pub const DEFAULT_DATABASE: &str = "hcp-openaccess";

/// What to do when a file about to be downloaded already exists locally
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverwritePolicy {
    /// Keep the local file
    #[default]
    Skip,
    /// Replace the local file
    Overwrite,
    /// Fail the download
    Error,
}

impl FromStr for OverwritePolicy {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "skip" | "false" | "no" => Ok(OverwritePolicy::Skip),
            "overwrite" | "true" | "yes" => Ok(OverwritePolicy::Overwrite),
            "error" => Ok(OverwritePolicy::Error),
            other => Err(Error::configuration(format!(
                "unknown overwrite policy: {}",
                other
            ))),
        }
    }
}

/// Options for enabling auto-download or running a bulk download
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AutoDownloadOptions {
    /// Bucket name (default: hcp-openaccess)
    pub database: String,
    /// Release directory inside the bucket (default: HCP_1200)
    pub release: String,
    /// Where new subject directories are created (None = first existing search path)
    pub subjects_path: Option<PathBuf>,
    pub overwrite: OverwritePolicy,
    /// Explicit credentials (None = detect)
    pub credentials: Option<Credentials>,
    /// Persistent cache of the remote subject listing
    pub listing_cache: Option<PathBuf>,
}

impl Default for AutoDownloadOptions {
    fn default() -> Self {
        Self {
            database: DEFAULT_DATABASE.to_string(),
            release: DEFAULT_RELEASE.to_string(),
            subjects_path: None,
            overwrite: OverwritePolicy::default(),
            credentials: None,
            listing_cache: None,
        }
    }
}

impl AutoDownloadOptions {
    pub fn with_release(mut self, database: impl Into<String>, release: impl Into<String>) -> Self {
        self.database = database.into();
        self.release = release.into();
        self
    }

    pub fn with_subjects_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.subjects_path = Some(path.into());
        self
    }

    pub fn with_credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = Some(credentials);
        self
    }

    pub fn with_overwrite(mut self, overwrite: OverwritePolicy) -> Self {
        self.overwrite = overwrite;
        self
    }

    pub fn with_listing_cache(mut self, path: impl Into<PathBuf>) -> Self {
        self.listing_cache = Some(path.into());
        self
    }

    /// `database/release`, the key prefix every subject lives under
    pub fn release_key(&self) -> String {
        format!("{}/{}", self.database, self.release)
    }

    /// Explicit credentials, or whatever [`Credentials::detect`] finds
    pub fn resolve_credentials(&self) -> Result<Credentials> {
        match &self.credentials {
            Some(creds) => Ok(creds.clone()),
            None => Credentials::detect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let opts = AutoDownloadOptions::default();
        assert_eq!(opts.release_key(), "hcp-openaccess/HCP_1200");
        assert_eq!(opts.overwrite, OverwritePolicy::Skip);
        assert!(opts.subjects_path.is_none());
    }

    #[test]
    fn test_explicit_credentials_win() {
        let creds = Credentials::new("k", "s");
        let opts = AutoDownloadOptions::default().with_credentials(creds.clone());
        assert_eq!(opts.resolve_credentials().unwrap(), creds);
    }

    #[test]
    fn test_overwrite_policy_parse() {
        assert_eq!("Error".parse::<OverwritePolicy>().unwrap(), OverwritePolicy::Error);
        assert_eq!("true".parse::<OverwritePolicy>().unwrap(), OverwritePolicy::Overwrite);
        assert_eq!("skip".parse::<OverwritePolicy>().unwrap(), OverwritePolicy::Skip);
        assert!("sometimes".parse::<OverwritePolicy>().is_err());
    }
}
