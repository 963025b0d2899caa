//! Core types for subject data access

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;

/// Smallest valid subject id
pub const MIN_SUBJECT_ID: u32 = 100_000;

/// Largest valid subject id
pub const MAX_SUBJECT_ID: u32 = 999_999;

/// A six-digit HCP subject identifier whose first digit is nonzero
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub struct SubjectId(u32);

impl SubjectId {
    /// Create a subject id, rejecting values outside `[100000, 999999]`
    pub fn new(id: u32) -> Result<Self> {
        if !(MIN_SUBJECT_ID..=MAX_SUBJECT_ID).contains(&id) {
            return Err(Error::invalid_subject(format!(
                "{} (subject ids must be 6-digit integers whose first digit is > 0)",
                id
            )));
        }
        Ok(Self(id))
    }

    /// Coerce a string into a subject id
    ///
    /// A string naming an existing directory (after `~` expansion) is reduced to
    /// its final path component first, so `/data/subjects/100307` yields `100307`.
    pub fn coerce(s: &str) -> Result<Self> {
        let expanded = expand_user(s);
        if expanded.is_dir() {
            return Self::from_path(&expanded);
        }
        s.parse()
    }

    /// Take the subject id from the final component of a directory path
    pub fn from_path(path: &Path) -> Result<Self> {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| {
                Error::invalid_subject(format!("no subject id in path {}", path.display()))
            })?;
        name.parse()
    }

    /// The numeric value
    pub fn get(self) -> u32 {
        self.0
    }
}

impl FromStr for SubjectId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let id: u32 = s
            .trim()
            .parse()
            .map_err(|_| Error::invalid_subject(format!("'{}' is not an integer", s)))?;
        Self::new(id)
    }
}

impl TryFrom<u32> for SubjectId {
    type Error = Error;

    fn try_from(id: u32) -> Result<Self> {
        Self::new(id)
    }
}

impl TryFrom<i64> for SubjectId {
    type Error = Error;

    fn try_from(id: i64) -> Result<Self> {
        let id = u32::try_from(id).map_err(|_| Error::invalid_subject(id.to_string()))?;
        Self::new(id)
    }
}

impl TryFrom<&str> for SubjectId {
    type Error = Error;

    fn try_from(s: &str) -> Result<Self> {
        Self::coerce(s)
    }
}

impl TryFrom<&Path> for SubjectId {
    type Error = Error;

    fn try_from(path: &Path) -> Result<Self> {
        Self::from_path(path)
    }
}

impl From<SubjectId> for u32 {
    fn from(sid: SubjectId) -> u32 {
        sid.0
    }
}

impl fmt::Display for SubjectId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Expand a leading `~` to `$HOME`
pub fn expand_user(path: &str) -> PathBuf {
    if path == "~" || path.starts_with("~/") {
        if let Ok(home) = std::env::var("HOME") {
            return PathBuf::from(format!("{}{}", home, &path[1..]));
        }
    }
    PathBuf::from(path)
}

/// Left or right cortical hemisphere
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Side {
    Left,
    Right,
}

impl Side {
    /// Prefix used in hemisphere tags (`lh` / `rh`)
    pub fn prefix(self) -> &'static str {
        match self {
            Side::Left => "lh",
            Side::Right => "rh",
        }
    }

    /// Letter used in HCP filenames (`L` / `R`)
    pub fn letter(self) -> &'static str {
        match self {
            Side::Left => "L",
            Side::Right => "R",
        }
    }
}

/// Mesh on which surface data is sampled
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum MeshResolution {
    /// Subject-specific native mesh
    Native,
    /// 32k fs_LR mesh in the subject's T1w space
    LowRes,
    /// 32k fs_LR mesh in MNI space
    LR32k,
    /// 164k fs_LR mesh in MNI space
    LR164k,
}

impl MeshResolution {
    /// Token used inside hemisphere tags
    pub fn token(self) -> &'static str {
        match self {
            MeshResolution::Native => "native",
            MeshResolution::LowRes => "lowres",
            MeshResolution::LR32k => "LR32k",
            MeshResolution::LR164k => "LR164k",
        }
    }

    /// Atlas label used in HCP filenames (`native`, `32k_fs_LR`, `164k_fs_LR`)
    pub fn atlas_label(self) -> &'static str {
        match self {
            MeshResolution::Native => "native",
            MeshResolution::LowRes | MeshResolution::LR32k => "32k_fs_LR",
            MeshResolution::LR164k => "164k_fs_LR",
        }
    }

    /// Native meshes differ per subject and are never shared across subjects
    pub fn is_native(self) -> bool {
        self == MeshResolution::Native
    }
}

/// Surface registration algorithm a hemisphere view is aligned with
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Alignment {
    MSMSulc,
    MSMAll,
}

impl Alignment {
    pub fn token(self) -> &'static str {
        match self {
            Alignment::MSMSulc => "MSMSulc",
            Alignment::MSMAll => "MSMAll",
        }
    }
}

/// Hemisphere tag such as `lh_LR32k_MSMAll`
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct HemiTag {
    pub side: Side,
    pub mesh: MeshResolution,
    pub alignment: Alignment,
}

impl HemiTag {
    pub const fn new(side: Side, mesh: MeshResolution, alignment: Alignment) -> Self {
        Self {
            side,
            mesh,
            alignment,
        }
    }

    /// Every tag the HCP layout knows about
    pub fn all() -> Vec<HemiTag> {
        let mut tags = Vec::with_capacity(16);
        for side in [Side::Left, Side::Right] {
            for mesh in [
                MeshResolution::Native,
                MeshResolution::LowRes,
                MeshResolution::LR32k,
                MeshResolution::LR164k,
            ] {
                for alignment in [Alignment::MSMSulc, Alignment::MSMAll] {
                    tags.push(HemiTag::new(side, mesh, alignment));
                }
            }
        }
        tags
    }
}

impl fmt::Display for HemiTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}_{}_{}",
            self.side.prefix(),
            self.mesh.token(),
            self.alignment.token()
        )
    }
}

impl FromStr for HemiTag {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let bad = || Error::configuration(format!("unrecognized hemisphere tag: {}", s));
        let mut parts = s.split('_');
        let (Some(side), Some(mesh), Some(alignment), None) =
            (parts.next(), parts.next(), parts.next(), parts.next())
        else {
            return Err(bad());
        };

        let side = match side {
            "lh" => Side::Left,
            "rh" => Side::Right,
            _ => return Err(bad()),
        };
        let mesh = match mesh {
            "native" => MeshResolution::Native,
            "lowres" => MeshResolution::LowRes,
            "LR32k" => MeshResolution::LR32k,
            "LR164k" => MeshResolution::LR164k,
            _ => return Err(bad()),
        };
        let alignment = match alignment {
            "MSMSulc" => Alignment::MSMSulc,
            "MSMAll" => Alignment::MSMAll,
            _ => return Err(bad()),
        };

        Ok(HemiTag::new(side, mesh, alignment))
    }
}

impl TryFrom<String> for HemiTag {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<HemiTag> for String {
    fn from(tag: HemiTag) -> String {
        tag.to_string()
    }
}

/// Kind of leaf in the subject directory layout
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Category {
    /// Volumetric image
    Image,
    /// Cortical surface mesh
    Surface,
    /// Spherical registration mesh
    Registration,
    /// Per-vertex property array
    Property,
}

impl Category {
    /// Singular name used in layout descriptions
    pub fn name(self) -> &'static str {
        match self {
            Category::Image => "image",
            Category::Surface => "surface",
            Category::Registration => "registration",
            Category::Property => "property",
        }
    }

    /// Whether leaves of this category belong to a hemisphere
    pub fn is_hemispheric(self) -> bool {
        self != Category::Image
    }
}

impl FromStr for Category {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "image" => Ok(Category::Image),
            "surface" => Ok(Category::Surface),
            "registration" => Ok(Category::Registration),
            "property" => Ok(Category::Property),
            other => Err(Error::configuration(format!(
                "unrecognized node type: {}",
                other
            ))),
        }
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
