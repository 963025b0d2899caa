//! Named custom loaders and post-load filters
//!
//! The layout never embeds closures. Leaves refer to entries of these two
//! closed registries by name, so a layout stays printable and comparable.
//! Filters are pure and live here; loaders need the dataset's caches and are
//! dispatched by the subject loader.

use hcpdata_core::{Error, Result, Value};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Custom loaders a leaf may request instead of the default decode
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LoaderId {
    /// Both hemispheres' atlas ROI masks for the file's mesh resolution,
    /// yielded as a [`Value::MaskPair`]
    AtlasRoi,
    /// fs_LR sphere / flat meshes shared by all subjects
    AtlasSphere,
}

impl LoaderId {
    pub fn name(self) -> &'static str {
        match self {
            LoaderId::AtlasRoi => "atlas_roi",
            LoaderId::AtlasSphere => "atlas_sphere",
        }
    }
}

impl FromStr for LoaderId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "atlas_roi" => Ok(LoaderId::AtlasRoi),
            "atlas_sphere" => Ok(LoaderId::AtlasSphere),
            other => Err(Error::configuration(format!("unknown loader: {}", other))),
        }
    }
}

impl fmt::Display for LoaderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Pure transforms applied after loading
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FilterId {
    /// Flip the sign (HCP stores curvature with the opposite convention)
    Negate,
    /// Cast to a boolean mask
    ToBool,
    /// Keep the left mask of a mask pair
    LeftMask,
    /// Keep the right mask of a mask pair
    RightMask,
}

impl FilterId {
    pub fn name(self) -> &'static str {
        match self {
            FilterId::Negate => "negate",
            FilterId::ToBool => "to_bool",
            FilterId::LeftMask => "left_mask",
            FilterId::RightMask => "right_mask",
        }
    }

    /// Apply the filter, failing with a decode error on a value of the wrong shape
    pub fn apply(self, value: Value) -> Result<Value> {
        match (self, value) {
            (FilterId::Negate, Value::Array(a)) => Ok(Value::Array(a.negate()?)),
            (FilterId::ToBool, Value::Array(a)) => Ok(Value::Array(a.to_bool())),
            (FilterId::LeftMask, Value::MaskPair { left, .. }) => {
                Ok(Value::Array(left.to_bool()))
            }
            (FilterId::RightMask, Value::MaskPair { right, .. }) => {
                Ok(Value::Array(right.to_bool()))
            }
            (filter, other) => Err(Error::decode(format!(
                "filter {} cannot be applied to a {}",
                filter,
                other.kind()
            ))),
        }
    }
}

impl FromStr for FilterId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "negate" => Ok(FilterId::Negate),
            "to_bool" => Ok(FilterId::ToBool),
            "left_mask" => Ok(FilterId::LeftMask),
            "right_mask" => Ok(FilterId::RightMask),
            other => Err(Error::configuration(format!("unknown filter: {}", other))),
        }
    }
}

impl fmt::Display for FilterId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
