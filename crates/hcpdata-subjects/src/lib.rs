//! # hcpdata Subjects
//!
//! Lazy, cached access to HCP subject directories.
//!
//! - **Dataset**: search paths, auto-download and subject lookup
//! - **SubjectAccess / HemiAccess**: per-subject trees of lazily loaded leaves
//! - **FileLoader**: fetch, decode, custom loaders and filters for one file
//! - **AtlasCache**: ROI masks and registration spheres shared across subjects
//! - **split_hemisphere**: unpacking combined bi-hemisphere CIFTI arrays
//!
//! Nothing is read from disk until a leaf is first accessed, and every file
//! is decoded at most once per subject.
//!
//! ## Example
//!
//! ```rust,no_run
//! use hcpdata_core::{Decoder, Result, Value};
//! use hcpdata_subjects::Dataset;
//! use std::path::Path;
//! use std::sync::Arc;
//!
//! struct MyDecoder;
//!
//! impl Decoder for MyDecoder {
//!     fn decode(&self, path: &Path) -> Result<Value> {
//!         unimplemented!("decode {}", path.display())
//!     }
//! }
//!
//! # fn main() -> Result<()> {
//! let dataset = Dataset::new(Arc::new(MyDecoder))?;
//! dataset.add_search_path("~/data/hcp/subjects", None);
//!
//! let subject = dataset.open("100307")?;
//! let _thickness = subject.hemi("lh_LR32k_MSMAll".parse()?)?.property("thickness")?;
//! # Ok(())
//! # }
//! ```

pub mod access;
pub mod atlas;
pub mod cifti;
pub mod config;
pub mod dataset;
pub mod lazy;
pub mod loader;
pub mod search;

#[cfg(test)]
mod testutil;

pub use access::{HemiAccess, SubjectAccess};
pub use atlas::{AtlasCache, RoiMasks, SphereKey, NATIVE_ATLAS};
pub use cifti::split_hemisphere;
pub use config::DatasetConfig;
pub use dataset::Dataset;
pub use lazy::{LazyCell, OnceMap};
pub use loader::{FetcherSlot, FileLoader, FileRequest};
pub use search::SearchPaths;
