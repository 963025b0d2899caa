//! Remote access to released HCP subject data
//!
//! Provides:
//! - Locating the key/secret pair for the bucket
//! - Mapping subject-relative paths to remote keys and copying them down
//! - Bulk download of a subject with an overwrite policy
//! - Subject enumeration, optionally persisted in a listing cache
//! - A directory-backed object store for mounted or mirrored buckets
//!
//! The object store transport itself is a collaborator reached through
//! [`hcpdata_core::ObjectStore`].

pub mod credentials;
pub mod listing_cache;
pub mod options;
pub mod remote;
pub mod store;

pub use credentials::Credentials;
pub use listing_cache::ListingCache;
pub use options::{AutoDownloadOptions, OverwritePolicy, DEFAULT_DATABASE, DEFAULT_RELEASE};
pub use remote::{local_path, RemoteFetcher, RemoteRelease};
pub use store::DirectoryStore;
