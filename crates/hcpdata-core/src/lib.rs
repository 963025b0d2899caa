//! # hcpdata Core
//!
//! Core traits, types, and error handling for lazily loaded HCP subject data.
//!
//! This crate provides the foundational abstractions shared by the other crates:
//! - **SubjectId**: validated six-digit subject identifiers
//! - **HemiTag**: hemisphere plus mesh resolution plus surface alignment
//! - **Category**: the four kinds of leaf a subject directory exposes
//! - **Value**: decoded, immutable file contents (volumes, meshes, arrays)
//! - **Decoder / ObjectStore / StoreConnector**: the narrow seams to format IO and
//!   remote transport
//!
//! ## Example
//!
//! ```rust
//! use hcpdata_core::{HemiTag, SubjectId, Result};
//!
//! fn describe() -> Result<()> {
//!     let sid = SubjectId::new(100307)?;
//!     let tag: HemiTag = "lh_LR32k_MSMAll".parse()?;
//!     println!("{} / {}", sid, tag);
//!     Ok(())
//! }
//! ```

pub mod array;
pub mod error;
pub mod traits;
pub mod types;

// Re-export commonly used items
pub use array::{ArrayData, Mesh, NdArray, Value, Volume};
pub use error::{Error, Result};
pub use traits::{Decoder, ObjectStore, StoreConnector};
pub use types::{Alignment, Category, HemiTag, MeshResolution, Side, SubjectId};
