//! Locating the key/secret pair for the remote release
//!
//! Credentials are only ever read, never written. The secret is redacted from
//! `Debug` output so options structs can be logged safely.

use hcpdata_core::types::expand_user;
use hcpdata_core::{Error, Result};
use std::fmt;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

/// Credential files are small; anything past this is ignored
const MAX_CREDENTIALS_FILE: u64 = 8 * 1024;

/// Source tags checked by [`Credentials::detect`], in order
const SOURCE_TAGS: [&str; 2] = ["hcp", "s3fs"];

/// Access key and secret for the object store
#[derive(Clone, PartialEq, Eq)]
pub struct Credentials {
    key: String,
    secret: String,
}

impl Credentials {
    pub fn new(key: impl Into<String>, secret: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            secret: secret.into(),
        }
    }

    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn secret(&self) -> &str {
        &self.secret
    }

    /// Parse a `<key>:<secret>` string
    pub fn parse(s: &str) -> Result<Self> {
        let parts: Vec<&str> = s.trim().split(':').collect();
        match parts.as_slice() {
            [key, secret] if !key.is_empty() && !secret.is_empty() => {
                Ok(Self::new(*key, *secret))
            }
            _ => Err(Error::credentials(
                "credentials must have the form <key>:<secret>",
            )),
        }
    }

    /// Load credentials stored as `<key>:<secret>` on a single line
    pub fn load(path: &Path) -> Result<Self> {
        let mut contents = String::new();
        File::open(path)?
            .take(MAX_CREDENTIALS_FILE)
            .read_to_string(&mut contents)?;
        Self::parse(&contents).map_err(|_| {
            Error::credentials(format!(
                "{} does not appear to be a credentials file",
                path.display()
            ))
        })
    }

    /// Interpret an argument as a credentials file name, else as `<key>:<secret>`
    pub fn coerce(arg: &str) -> Result<Self> {
        let path = expand_user(arg);
        if path.is_file() {
            if let Ok(creds) = Self::load(&path) {
                return Ok(creds);
            }
        }
        Self::parse(arg)
    }

    /// Detect credentials from the process environment and the home directory
    pub fn detect() -> Result<Self> {
        let home = std::env::var_os("HOME").map(PathBuf::from);
        Self::detect_from(|name| std::env::var(name).ok(), home.as_deref())
    }

    /// Detect credentials from an arbitrary variable lookup
    ///
    /// For each tag (`hcp`, then `s3fs`) the sources are tried in order:
    /// 1. `<TAG>_CREDENTIALS` holding `<key>:<secret>`
    /// 2. `<TAG>_KEY` together with `<TAG>_SECRET`
    /// 3. `~/.<tag>-credentials`, `~/.<tag>-passwd`, `~/.passwd-<tag>`
    pub fn detect_from<F>(var: F, home: Option<&Path>) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        for tag in SOURCE_TAGS {
            let utag = tag.to_uppercase();

            if let Some(value) = var(&format!("{}_CREDENTIALS", utag)) {
                return Self::coerce(&value);
            }

            if let (Some(key), Some(secret)) = (
                var(&format!("{}_KEY", utag)),
                var(&format!("{}_SECRET", utag)),
            ) {
                return Ok(Self::new(key, secret));
            }

            let Some(home) = home else {
                continue;
            };
            for name in [
                format!(".{}-credentials", tag),
                format!(".{}-passwd", tag),
                format!(".passwd-{}", tag),
            ] {
                let path = home.join(name);
                if !path.is_file() {
                    continue;
                }
                match Self::load(&path) {
                    Ok(creds) => {
                        tracing::debug!("Using credentials from {}", path.display());
                        return Ok(creds);
                    }
                    Err(e) => tracing::warn!("Ignoring credentials file: {}", e),
                }
            }
        }

        Err(Error::credentials(
            "no valid credentials for the HCP were detected",
        ))
    }
}

impl fmt::Debug for Credentials {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Credentials")
            .field("key", &self.key)
            .field("secret", &"<redacted>")
            .finish()
    }
}
