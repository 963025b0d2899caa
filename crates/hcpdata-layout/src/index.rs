//! Flat lookup tables built from a layout tree
//!
//! [`FlatIndex::build`] walks a [`SpecNode`] tree once, depth first, and
//! produces:
//! - `images`: logical name → relative path template
//! - `hemis`: hemisphere tag → surfaces / registrations / properties tables
//! - `files`: relative path template → [`FileMeta`]
//!
//! Path templates carry the subject id as the `{id}` placeholder.

use crate::node::{HemiSpec, LeafSpec, SpecNode};
use crate::registry::{FilterId, LoaderId};
use hcpdata_core::{Category, Error, HemiTag, Result, Side, SubjectId};
use serde::Serialize;
use std::collections::BTreeMap;

/// Placeholder substituted with the subject id in path templates
pub const SUBJECT_PLACEHOLDER: &str = "{id}";

/// Substitute a subject id into a path template
pub fn render(template: &str, sid: SubjectId) -> String {
    template.replace(SUBJECT_PLACEHOLDER, &sid.to_string())
}

/// Everything the loader needs to know about one physical file
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FileMeta {
    pub category: Category,
    /// Hemispheres with at least one logical view of this file
    pub hemis: Vec<HemiTag>,
    /// The file packs both hemispheres and must be split before use
    pub combined: bool,
    pub loader: Option<LoaderId>,
    pub filter: Option<FilterId>,
}

/// Per-hemisphere logical name tables
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct HemiTables {
    pub surfaces: BTreeMap<String, String>,
    pub registrations: BTreeMap<String, String>,
    pub properties: BTreeMap<String, String>,
}

impl HemiTables {
    /// Table for a hemispheric category; images have none
    pub fn table(&self, category: Category) -> Option<&BTreeMap<String, String>> {
        match category {
            Category::Surface => Some(&self.surfaces),
            Category::Registration => Some(&self.registrations),
            Category::Property => Some(&self.properties),
            Category::Image => None,
        }
    }

    fn table_mut(&mut self, category: Category) -> Option<&mut BTreeMap<String, String>> {
        match category {
            Category::Surface => Some(&mut self.surfaces),
            Category::Registration => Some(&mut self.registrations),
            Category::Property => Some(&mut self.properties),
            Category::Image => None,
        }
    }

    pub fn len(&self) -> usize {
        self.surfaces.len() + self.registrations.len() + self.properties.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Normalized, immutable lookup tables for a layout
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct FlatIndex {
    images: BTreeMap<String, String>,
    hemis: BTreeMap<HemiTag, HemiTables>,
    files: BTreeMap<String, FileMeta>,
}

impl FlatIndex {
    /// Normalize a layout tree
    ///
    /// # Errors
    ///
    /// Returns [`Error::Configuration`] as soon as two leaves share a
    /// (category, hemisphere, logical name) triple, a leaf's hemisphere
    /// assignment does not fit its category, or the views of one file
    /// disagree about how it is loaded.
    pub fn build(root: &SpecNode) -> Result<Self> {
        let mut index = FlatIndex::default();
        match root {
            SpecNode::Directory(children) => {
                for (name, child) in children {
                    index.visit(child, name)?;
                }
            }
            SpecNode::File(_) => {
                return Err(Error::configuration(
                    "layout root must be a directory".to_string(),
                ));
            }
        }

        tracing::debug!(
            "Normalized layout: {} leaves into {} images, {} hemispheres, {} files",
            root.leaf_count(),
            index.images.len(),
            index.hemis.len(),
            index.files.len()
        );
        Ok(index)
    }

    fn visit(&mut self, node: &SpecNode, path: &str) -> Result<()> {
        match node {
            SpecNode::Directory(children) => {
                for (name, child) in children {
                    self.visit(child, &format!("{}/{}", path, name))?;
                }
                Ok(())
            }
            SpecNode::File(leaves) => {
                if leaves.is_empty() {
                    return Err(Error::configuration(format!(
                        "file {} has no logical views",
                        path
                    )));
                }
                for leaf in leaves {
                    self.add_leaf(leaf, path)?;
                }
                Ok(())
            }
        }
    }

    fn add_leaf(&mut self, leaf: &LeafSpec, path: &str) -> Result<()> {
        let (hemis, combined) = match (leaf.category, leaf.hemi) {
            (Category::Image, HemiSpec::None) => (Vec::new(), false),
            (Category::Image, _) => {
                return Err(Error::configuration(format!(
                    "image {} cannot carry a hemisphere",
                    leaf.name
                )));
            }
            (category, HemiSpec::None) => {
                return Err(Error::configuration(format!(
                    "{} {} needs a hemisphere",
                    category, leaf.name
                )));
            }
            (_, HemiSpec::Single(h)) => (vec![h], false),
            (_, HemiSpec::Combined(lh, rh)) => {
                if lh.side != Side::Left || rh.side != Side::Right {
                    return Err(Error::configuration(format!(
                        "combined file {} must list the left hemisphere first, then the right",
                        path
                    )));
                }
                (vec![lh, rh], true)
            }
        };

        if leaf.category == Category::Image {
            if self.images.contains_key(&leaf.name) {
                return Err(Error::configuration(format!(
                    "duplicate image in layout: {}",
                    leaf.name
                )));
            }
            self.images.insert(leaf.name.clone(), path.to_string());
        } else {
            for hemi in &hemis {
                let tables = self.hemis.entry(*hemi).or_default();
                let Some(table) = tables.table_mut(leaf.category) else {
                    return Err(Error::configuration(format!(
                        "unrecognized node type: {}",
                        leaf.category
                    )));
                };
                if table.contains_key(&leaf.name) {
                    return Err(Error::configuration(format!(
                        "duplicate {} {} in hemi {}",
                        leaf.category, leaf.name, hemi
                    )));
                }
                table.insert(leaf.name.clone(), path.to_string());
            }
        }

        self.merge_meta(leaf, path, hemis, combined)
    }

    fn merge_meta(
        &mut self,
        leaf: &LeafSpec,
        path: &str,
        hemis: Vec<HemiTag>,
        combined: bool,
    ) -> Result<()> {
        match self.files.get_mut(path) {
            None => {
                self.files.insert(
                    path.to_string(),
                    FileMeta {
                        category: leaf.category,
                        hemis,
                        combined,
                        loader: leaf.loader,
                        filter: leaf.filter,
                    },
                );
            }
            Some(meta) => {
                if meta.category != leaf.category
                    || meta.combined != combined
                    || meta.loader != leaf.loader
                    || meta.filter != leaf.filter
                {
                    return Err(Error::configuration(format!(
                        "views of {} disagree on how the file is loaded",
                        path
                    )));
                }
                for h in hemis {
                    if !meta.hemis.contains(&h) {
                        meta.hemis.push(h);
                    }
                }
            }
        }
        Ok(())
    }

    pub fn images(&self) -> &BTreeMap<String, String> {
        &self.images
    }

    pub fn hemis(&self) -> &BTreeMap<HemiTag, HemiTables> {
        &self.hemis
    }

    pub fn files(&self) -> &BTreeMap<String, FileMeta> {
        &self.files
    }

    pub fn meta(&self, template: &str) -> Option<&FileMeta> {
        self.files.get(template)
    }

    /// Every distinct relative path template
    pub fn relative_paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Path template behind a logical name
    pub fn lookup(&self, category: Category, hemi: Option<HemiTag>, name: &str) -> Option<&str> {
        match (category, hemi) {
            (Category::Image, _) => self.images.get(name),
            (category, Some(h)) => self.hemis.get(&h)?.table(category)?.get(name),
            (_, None) => None,
        }
        .map(String::as_str)
    }

    /// Pretty JSON rendering of the tables, for inspection
    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::configuration(e.to_string()))
    }
}
