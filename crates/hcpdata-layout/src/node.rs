//! Layout specification tree
//!
//! A layout is a tree of directories whose file entries carry one or more
//! leaf descriptions. Several leaves on one file are alternative logical views
//! of the same bytes (for example one native surface exposed under both the
//! MSMSulc and MSMAll hemisphere tags).

use crate::registry::{FilterId, LoaderId};
use hcpdata_core::{Category, HemiTag};

/// Hemisphere assignment of a leaf
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HemiSpec {
    /// Images belong to no hemisphere
    None,
    /// Data for exactly one hemisphere
    Single(HemiTag),
    /// One file packing both hemispheres, left block first
    Combined(HemiTag, HemiTag),
}

/// One logical view of a file
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LeafSpec {
    pub category: Category,
    pub name: String,
    pub hemi: HemiSpec,
    pub loader: Option<LoaderId>,
    pub filter: Option<FilterId>,
}

impl LeafSpec {
    pub fn new(category: Category, name: impl Into<String>, hemi: HemiSpec) -> Self {
        Self {
            category,
            name: name.into(),
            hemi,
            loader: None,
            filter: None,
        }
    }

    pub fn image(name: impl Into<String>) -> Self {
        Self::new(Category::Image, name, HemiSpec::None)
    }

    pub fn surface(name: impl Into<String>, hemi: HemiTag) -> Self {
        Self::new(Category::Surface, name, HemiSpec::Single(hemi))
    }

    pub fn registration(name: impl Into<String>, hemi: HemiTag) -> Self {
        Self::new(Category::Registration, name, HemiSpec::Single(hemi))
    }

    pub fn property(name: impl Into<String>, hemi: HemiTag) -> Self {
        Self::new(Category::Property, name, HemiSpec::Single(hemi))
    }

    /// Property stored in one bi-hemisphere file
    pub fn combined_property(name: impl Into<String>, left: HemiTag, right: HemiTag) -> Self {
        Self::new(Category::Property, name, HemiSpec::Combined(left, right))
    }

    /// Load with a named custom loader instead of the default decode
    pub fn load_with(mut self, loader: LoaderId) -> Self {
        self.loader = Some(loader);
        self
    }

    /// Apply a named filter after loading
    pub fn filter_with(mut self, filter: FilterId) -> Self {
        self.filter = Some(filter);
        self
    }
}

/// Node of the layout tree
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SpecNode {
    /// Named children, in declaration order
    Directory(Vec<(String, SpecNode)>),
    /// A file and the logical views it backs
    File(Vec<LeafSpec>),
}

impl SpecNode {
    pub fn dir<I, S>(entries: I) -> Self
    where
        I: IntoIterator<Item = (S, SpecNode)>,
        S: Into<String>,
    {
        SpecNode::Directory(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }

    /// File with a single logical view
    pub fn file(leaf: LeafSpec) -> Self {
        SpecNode::File(vec![leaf])
    }

    /// File backing several logical views
    pub fn views(leaves: Vec<LeafSpec>) -> Self {
        SpecNode::File(leaves)
    }

    /// Number of leaves below this node
    pub fn leaf_count(&self) -> usize {
        match self {
            SpecNode::Directory(children) => children.iter().map(|(_, c)| c.leaf_count()).sum(),
            SpecNode::File(leaves) => leaves.len(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcpdata_core::{Alignment, MeshResolution, Side};

    #[test]
    fn test_leaf_count_includes_every_view() {
        let sulc = HemiTag::new(Side::Left, MeshResolution::Native, Alignment::MSMSulc);
        let all = HemiTag::new(Side::Left, MeshResolution::Native, Alignment::MSMAll);
        let tree = SpecNode::dir([
            ("T1w.nii.gz", SpecNode::file(LeafSpec::image("T1"))),
            (
                "Native",
                SpecNode::dir([(
                    "{id}.L.white.native.surf.gii",
                    SpecNode::views(vec![
                        LeafSpec::surface("white", sulc),
                        LeafSpec::surface("white", all),
                    ]),
                )]),
            ),
            ("empty", SpecNode::dir(Vec::<(String, SpecNode)>::new())),
        ]);
        assert_eq!(tree.leaf_count(), 3);
        assert_eq!(SpecNode::views(Vec::new()).leaf_count(), 0);
    }
}
