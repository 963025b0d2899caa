//! Collaborator traits
//!
//! Format decoding and the remote transport live outside this workspace; the
//! loader and fetcher only ever talk to them through these seams.

use crate::array::Value;
use crate::error::Result;
use std::path::Path;
use std::sync::Arc;

/// Decodes one local file into a [`Value`]
///
/// Implementations dispatch on the file extension (`.nii.gz`, `.surf.gii`,
/// `.shape.gii`, `.dscalar.nii`, ...) and report malformed content as
/// [`Error::Decode`](crate::Error::Decode).
pub trait Decoder: Send + Sync {
    fn decode(&self, path: &Path) -> Result<Value>;
}

/// Remote object store holding the released subject trees
pub trait ObjectStore: Send + Sync {
    /// Does a key (file or key prefix) exist?
    fn exists(&self, key: &str) -> Result<bool>;

    /// List the keys directly below `prefix`
    fn list(&self, prefix: &str) -> Result<Vec<String>>;

    /// Copy the object at `key` to `local`; the parent directory already exists
    fn get(&self, key: &str, local: &Path) -> Result<()>;
}

/// Opens an [`ObjectStore`] with a located key/secret pair
pub trait StoreConnector: Send + Sync {
    fn connect(&self, key: &str, secret: &str) -> Result<Arc<dyn ObjectStore>>;
}
