//! Atlas caches shared by every subject of a dataset
//!
//! The fs_LR atlas ROI masks and the fs_LR sphere / flat meshes are identical
//! across subjects, so they are loaded once per mesh and kept for the life of
//! the dataset. Native-mesh masks are subject specific and never cached.

use crate::lazy::OnceMap;
use hcpdata_core::{Error, NdArray, Result, Side, SubjectId, Value};
use std::sync::Arc;

/// Atlas label of the subject-specific native mesh
pub const NATIVE_ATLAS: &str = "native";

/// Left and right medial-wall masks of one mesh resolution
#[derive(Debug, Clone, PartialEq)]
pub struct RoiMasks {
    pub left: NdArray,
    pub right: NdArray,
}

impl RoiMasks {
    /// Masks are cast to bool, so any nonzero entry marks a vertex
    pub fn new(left: NdArray, right: NdArray) -> Self {
        Self {
            left: left.to_bool(),
            right: right.to_bool(),
        }
    }

    pub fn side(&self, side: Side) -> &NdArray {
        match side {
            Side::Left => &self.left,
            Side::Right => &self.right,
        }
    }

    pub fn to_value(&self) -> Value {
        Value::MaskPair {
            left: self.left.clone(),
            right: self.right.clone(),
        }
    }
}

/// Cache key of an atlas sphere or flat mesh
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SphereKey {
    pub side: Side,
    pub kind: String,
    pub atlas: String,
}

impl SphereKey {
    /// Parse `<sid>.<H>.<kind>.<atlas>.surf.gii`
    pub fn from_filename(filename: &str) -> Result<Self> {
        let bad = || Error::configuration(format!("bad filename for atlas sphere: {}", filename));
        let parts: Vec<&str> = filename.split('.').collect();
        let [sid, hemi, kind, atlas, "surf", "gii"] = parts.as_slice() else {
            return Err(bad());
        };
        sid.parse::<SubjectId>().map_err(|_| bad())?;
        let side = match *hemi {
            "L" => Side::Left,
            "R" => Side::Right,
            _ => return Err(bad()),
        };
        Ok(Self {
            side,
            kind: kind.to_string(),
            atlas: atlas.to_string(),
        })
    }
}

/// Atlas label of a mesh file: the third dot-separated field from the end
///
/// `100307.L.atlasroi.32k_fs_LR.shape.gii` and
/// `100307.thickness.32k_fs_LR.dscalar.nii` both give `32k_fs_LR`.
pub fn atlas_label(filename: &str) -> Result<&str> {
    let parts: Vec<&str> = filename.split('.').collect();
    if parts.len() < 4 {
        return Err(Error::configuration(format!(
            "cannot find the atlas of {}",
            filename
        )));
    }
    Ok(parts[parts.len() - 3])
}

#[derive(Default)]
pub struct AtlasCache {
    masks: OnceMap<String, RoiMasks>,
    spheres: OnceMap<SphereKey, Value>,
}

impl AtlasCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// ROI masks for `atlas`, loading them with `load` on first request
    pub fn roi_masks<F>(&self, atlas: &str, load: F) -> Result<Arc<RoiMasks>>
    where
        F: FnOnce() -> Result<RoiMasks>,
    {
        if atlas == NATIVE_ATLAS {
            return load().map(Arc::new);
        }
        self.masks.get_or_try_init(&atlas.to_string(), || {
            tracing::debug!("Loading atlas ROI masks for {}", atlas);
            load()
        })
    }

    /// Sphere or flat mesh for `key`, loading it with `load` on first request
    pub fn sphere<F>(&self, key: &SphereKey, load: F) -> Result<Arc<Value>>
    where
        F: FnOnce() -> Result<Value>,
    {
        self.spheres.get_or_try_init(key, || {
            tracing::debug!("Loading atlas {} {} for {:?}", key.atlas, key.kind, key.side);
            load()
        })
    }

    pub fn cached_masks(&self) -> usize {
        self.masks.len()
    }

    pub fn cached_spheres(&self) -> usize {
        self.spheres.len()
    }
}
