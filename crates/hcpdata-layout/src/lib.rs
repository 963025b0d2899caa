//! # hcpdata Layout
//!
//! Declarative description of an HCP subject directory and the flat lookup
//! tables derived from it.
//!
//! - **SpecNode / LeafSpec**: the layout tree; a file may carry several
//!   logical views
//! - **LoaderId / FilterId**: closed registries of custom loaders and filters
//! - **FlatIndex**: images, per-hemisphere tables and per-file metadata
//! - **subject_layout**: the HCP table, normalized once per process
//!
//! ## Example
//!
//! ```rust
//! use hcpdata_layout::subject_layout;
//!
//! let layout = subject_layout().unwrap();
//! assert_eq!(layout.images()["T1"], "T1w/T1w_acpc_dc_restore.nii.gz");
//! ```

pub mod hcp;
pub mod index;
pub mod node;
pub mod registry;

pub use hcp::{hcp_layout, subject_layout};
pub use index::{render, FileMeta, FlatIndex, HemiTables, SUBJECT_PLACEHOLDER};
pub use node::{HemiSpec, LeafSpec, SpecNode};
pub use registry::{FilterId, LoaderId};
