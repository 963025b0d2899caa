//! Per-subject lazy access to every logical leaf
//!
//! Two layers of cells are built up front, neither of which does any IO:
//! - one cell per physical file, shared by every logical view of that file
//! - one cell per (hemisphere, category, logical name) or image name, which
//!   reads the file cell and splits combined bi-hemisphere data

use crate::cifti::split_hemisphere;
use crate::lazy::LazyCell;
use crate::loader::{FileLoader, FileRequest};
use hcpdata_core::{Category, Error, HemiTag, Result, SubjectId, Value};
use hcpdata_layout::{render, FileMeta, FlatIndex};
use std::collections::BTreeMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

type Cell = LazyCell<Value>;
type Cells = BTreeMap<String, Arc<Cell>>;

/// Logical cells of one hemisphere
#[derive(Debug, Default)]
struct HemiCells {
    surfaces: Cells,
    registrations: Cells,
    properties: Cells,
}

impl HemiCells {
    fn table(&self, category: Category) -> Option<&Cells> {
        match category {
            Category::Surface => Some(&self.surfaces),
            Category::Registration => Some(&self.registrations),
            Category::Property => Some(&self.properties),
            Category::Image => None,
        }
    }

    fn table_mut(&mut self, category: Category) -> Option<&mut Cells> {
        match category {
            Category::Surface => Some(&mut self.surfaces),
            Category::Registration => Some(&mut self.registrations),
            Category::Property => Some(&mut self.properties),
            Category::Image => None,
        }
    }
}

/// Lazily loaded view of one subject directory
pub struct SubjectAccess {
    sid: SubjectId,
    dir: PathBuf,
    /// Keyed by rendered relative path
    files: BTreeMap<String, Arc<Cell>>,
    images: Cells,
    hemis: BTreeMap<HemiTag, HemiCells>,
}

impl SubjectAccess {
    /// Build the cells for `sid` rooted at `dir`; nothing is read yet
    pub fn build(
        sid: SubjectId,
        dir: impl Into<PathBuf>,
        layout: &FlatIndex,
        loader: Arc<FileLoader>,
    ) -> Result<Self> {
        let dir = dir.into();

        let mut files = BTreeMap::new();
        for (template, meta) in layout.files() {
            let relative = render(template, sid);
            let cell = file_cell(sid, &dir, relative.clone(), meta.clone(), Arc::clone(&loader));
            files.insert(relative, Arc::new(cell));
        }

        let file_for = |template: &str| -> Result<(String, Arc<Cell>)> {
            let relative = render(template, sid);
            let cell = files.get(&relative).cloned().ok_or_else(|| {
                Error::configuration(format!("layout names unknown file {}", template))
            })?;
            Ok((relative, cell))
        };

        let mut images = Cells::new();
        for (name, template) in layout.images() {
            let (_, file) = file_for(template)?;
            images.insert(name.clone(), file);
        }

        let mut hemis = BTreeMap::new();
        for (tag, tables) in layout.hemis() {
            let mut cells = HemiCells::default();
            for category in [Category::Surface, Category::Registration, Category::Property] {
                let (Some(names), Some(out)) = (tables.table(category), cells.table_mut(category))
                else {
                    continue;
                };
                for (name, template) in names {
                    let (relative, file) = file_for(template)?;
                    let combined = layout.meta(template).map_or(false, |m| m.combined);
                    let cell = if combined {
                        Arc::new(split_cell(
                            sid,
                            &dir,
                            relative,
                            *tag,
                            layout.meta(template).cloned(),
                            file,
                            Arc::clone(&loader),
                        ))
                    } else {
                        file
                    };
                    out.insert(name.clone(), cell);
                }
            }
            hemis.insert(*tag, cells);
        }

        tracing::debug!(
            "Built access for subject {} at {} ({} files)",
            sid,
            dir.display(),
            files.len()
        );
        Ok(Self {
            sid,
            dir,
            files,
            images,
            hemis,
        })
    }

    pub fn sid(&self) -> SubjectId {
        self.sid
    }

    pub fn path(&self) -> &Path {
        &self.dir
    }

    /// Volume behind an image name
    pub fn image(&self, name: &str) -> Result<Arc<Value>> {
        self.images
            .get(name)
            .ok_or_else(|| Error::not_found(format!("no image named {}", name)))?
            .get()
    }

    pub fn hemi(&self, tag: HemiTag) -> Result<HemiAccess<'_>> {
        self.hemis
            .get(&tag)
            .map(|cells| HemiAccess { tag, cells })
            .ok_or_else(|| Error::not_found(format!("no hemisphere {}", tag)))
    }

    /// Any leaf by category; `hemi` is ignored for images
    pub fn get(&self, category: Category, hemi: Option<HemiTag>, name: &str) -> Result<Arc<Value>> {
        match (category, hemi) {
            (Category::Image, _) => self.image(name),
            (category, Some(tag)) => self.hemi(tag)?.get(category, name),
            (category, None) => Err(Error::configuration(format!(
                "{} {} needs a hemisphere",
                category, name
            ))),
        }
    }

    pub fn image_names(&self) -> impl Iterator<Item = &str> {
        self.images.keys().map(String::as_str)
    }

    pub fn hemi_tags(&self) -> impl Iterator<Item = HemiTag> + '_ {
        self.hemis.keys().copied()
    }

    /// Has the file at this rendered relative path been loaded?
    pub fn file_is_loaded(&self, relative: &str) -> bool {
        self.files.get(relative).map_or(false, |c| c.is_loaded())
    }

    /// Number of files loaded so far
    pub fn loaded_files(&self) -> usize {
        self.files.values().filter(|c| c.is_loaded()).count()
    }
}

impl fmt::Debug for SubjectAccess {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SubjectAccess")
            .field("sid", &self.sid)
            .field("dir", &self.dir)
            .field("files", &self.files.len())
            .field("loaded", &self.loaded_files())
            .finish()
    }
}

/// Logical leaves of one hemisphere of a subject
pub struct HemiAccess<'a> {
    tag: HemiTag,
    cells: &'a HemiCells,
}

impl<'a> HemiAccess<'a> {
    pub fn tag(&self) -> HemiTag {
        self.tag
    }

    pub fn get(&self, category: Category, name: &str) -> Result<Arc<Value>> {
        self.cells
            .table(category)
            .and_then(|t| t.get(name))
            .ok_or_else(|| {
                Error::not_found(format!("no {} named {} in {}", category, name, self.tag))
            })?
            .get()
    }

    pub fn surface(&self, name: &str) -> Result<Arc<Value>> {
        self.get(Category::Surface, name)
    }

    pub fn registration(&self, name: &str) -> Result<Arc<Value>> {
        self.get(Category::Registration, name)
    }

    pub fn property(&self, name: &str) -> Result<Arc<Value>> {
        self.get(Category::Property, name)
    }

    pub fn names(&self, category: Category) -> Vec<&'a str> {
        self.cells
            .table(category)
            .map(|t| t.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    pub fn is_loaded(&self, category: Category, name: &str) -> bool {
        self.cells
            .table(category)
            .and_then(|t| t.get(name))
            .map_or(false, |c| c.is_loaded())
    }
}

fn file_cell(
    sid: SubjectId,
    dir: &Path,
    relative: String,
    meta: FileMeta,
    loader: Arc<FileLoader>,
) -> Cell {
    let dir = dir.to_path_buf();
    LazyCell::new(move || {
        loader.load(&FileRequest {
            sid,
            subject_dir: &dir,
            relative: &relative,
            meta: &meta,
        })
    })
}

fn split_cell(
    sid: SubjectId,
    dir: &Path,
    relative: String,
    tag: HemiTag,
    meta: Option<FileMeta>,
    file: Arc<Cell>,
    loader: Arc<FileLoader>,
) -> Cell {
    let dir = dir.to_path_buf();
    LazyCell::new(move || {
        let Some(meta) = meta.as_ref() else {
            return Err(Error::configuration(format!("no metadata for {}", relative)));
        };
        let combined = file.get()?;
        let Some(array) = combined.as_array() else {
            return Err(Error::decode(format!(
                "combined file {} decoded to a {}",
                relative,
                combined.kind()
            )));
        };
        let masks = loader.roi_masks(&FileRequest {
            sid,
            subject_dir: &dir,
            relative: &relative,
            meta,
        })?;
        let hemi = split_hemisphere(array, &masks, tag.side)?;
        tracing::debug!("Split {} for {}", relative, tag);
        Ok(Arc::new(Value::Array(hemi)))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::atlas::AtlasCache;
    use crate::testutil::{init_tracing, write_array, write_mesh, write_volume, CountingDecoder};
    use hcpdata_layout::subject_layout;
    use std::sync::RwLock;
    use tempfile::TempDir;

    struct Fixture {
        _temp: TempDir,
        dir: PathBuf,
        decoder: Arc<CountingDecoder>,
        access: SubjectAccess,
    }

    fn fixture() -> Fixture {
        init_tracing();
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("100307");
        let decoder = Arc::new(CountingDecoder::new());
        let loader = Arc::new(FileLoader::new(
            decoder.clone(),
            Arc::new(AtlasCache::new()),
            Arc::new(RwLock::new(None)),
        ));
        let access = SubjectAccess::build(
            SubjectId::new(100307).unwrap(),
            &dir,
            subject_layout().unwrap(),
            loader,
        )
        .unwrap();
        Fixture {
            _temp: temp,
            dir,
            decoder,
            access,
        }
    }

    fn tag(s: &str) -> HemiTag {
        s.parse().unwrap()
    }

    #[test]
    fn test_construction_reads_nothing() {
        let fx = fixture();
        assert_eq!(fx.decoder.total(), 0);
        assert_eq!(fx.access.loaded_files(), 0);
        assert_eq!(fx.access.hemi_tags().count(), 16);
        assert!(fx.access.image_names().any(|n| n == "T1"));
    }

    #[test]
    fn test_image_loaded_once() {
        let fx = fixture();
        let path = fx.dir.join("T1w/T1w_acpc_dc_restore.nii.gz");
        write_volume(&path, &[1.0, 2.0]);

        let a = fx.access.image("T1").unwrap();
        let b = fx.access.image("T1").unwrap();
        assert!(Arc::ptr_eq(&a, &b));
        assert!(a.as_volume().is_some());
        assert_eq!(fx.decoder.calls(&path), 1);
        assert!(fx.access.file_is_loaded("T1w/T1w_acpc_dc_restore.nii.gz"));
    }

    #[test]
    fn test_missing_file_fails_only_its_leaf() {
        let fx = fixture();
        write_volume(&fx.dir.join("T1w/T2w_acpc_dc_restore.nii.gz"), &[3.0]);

        assert!(fx.access.image("T1").unwrap_err().is_not_found());
        assert!(fx.access.image("T2").is_ok());
        assert!(fx.access.image("no_such_image").unwrap_err().is_not_found());

        // the failure is not cached: once the file appears the leaf loads
        write_volume(&fx.dir.join("T1w/T1w_acpc_dc_restore.nii.gz"), &[1.0]);
        assert!(fx.access.image("T1").is_ok());
    }

    #[test]
    fn test_views_of_one_file_decode_once() {
        let fx = fixture();
        let path = fx.dir.join("T1w/Native/100307.L.pial.native.surf.gii");
        write_mesh(&path, 7);

        let sulc = fx.access.hemi(tag("lh_native_MSMSulc")).unwrap().surface("pial").unwrap();
        let all = fx.access.hemi(tag("lh_native_MSMAll")).unwrap().surface("pial").unwrap();
        assert!(Arc::ptr_eq(&sulc, &all));
        assert_eq!(sulc.as_mesh().unwrap().vertex_count(), 7);
        assert_eq!(fx.decoder.calls(&path), 1);
    }

    #[test]
    fn test_curvature_is_negated() {
        let fx = fixture();
        write_array(
            &fx.dir.join("MNINonLinear/Native/100307.R.curvature.native.shape.gii"),
            &[3],
            &[0.5, -0.25, 0.0],
        );
        let hemi = fx.access.hemi(tag("rh_native_MSMAll")).unwrap();
        let curv = hemi.property("curvature").unwrap();
        assert_eq!(curv.as_array().unwrap().as_floats().unwrap(), &[-0.5, 0.25, -0.0]);
        assert!(hemi.is_loaded(Category::Property, "curvature"));
        assert!(!hemi.is_loaded(Category::Property, "convexity"));
    }

    fn write_lr32k_masks(dir: &Path) {
        let base = dir.join("MNINonLinear/fsaverage_LR32k");
        write_array(
            &base.join("100307.L.atlasroi.32k_fs_LR.shape.gii"),
            &[4],
            &[1.0, 0.0, 1.0, 1.0],
        );
        write_array(
            &base.join("100307.R.atlasroi.32k_fs_LR.shape.gii"),
            &[3],
            &[0.0, 1.0, 1.0],
        );
    }

    #[test]
    fn test_combined_file_is_split() {
        let fx = fixture();
        write_lr32k_masks(&fx.dir);
        let combined = fx
            .dir
            .join("MNINonLinear/fsaverage_LR32k/100307.corrThickness_MSMAll.32k_fs_LR.dscalar.nii");
        write_array(&combined, &[1, 5], &[1.0, 2.0, 3.0, 4.0, 5.0]);

        let left = fx.access.hemi(tag("lh_LR32k_MSMAll")).unwrap().property("thickness").unwrap();
        let right = fx.access.hemi(tag("rh_LR32k_MSMAll")).unwrap().property("thickness").unwrap();
        assert_eq!(left.as_array().unwrap().as_floats().unwrap(), &[1.0, 0.0, 2.0, 3.0]);
        assert_eq!(right.as_array().unwrap().as_floats().unwrap(), &[0.0, 4.0, 5.0]);

        // one decode of the combined file, one per mask
        assert_eq!(fx.decoder.calls(&combined), 1);
        assert_eq!(fx.decoder.total(), 3);

        // the atlas leaf reuses the cached masks
        let atlas = fx.access.hemi(tag("rh_LR32k_MSMSulc")).unwrap().property("atlas").unwrap();
        assert_eq!(atlas.as_array().unwrap().as_bools().unwrap(), &[false, true, true]);
        assert_eq!(fx.decoder.total(), 3);
    }

    #[test]
    fn test_combined_orientation_error() {
        let fx = fixture();
        write_lr32k_masks(&fx.dir);
        write_array(
            &fx.dir.join("MNINonLinear/fsaverage_LR32k/100307.sulc_MSMAll.32k_fs_LR.dscalar.nii"),
            &[2, 3],
            &[0.0; 6],
        );
        let err = fx
            .access
            .get(Category::Property, Some(tag("lh_LR32k_MSMAll")), "convexity")
            .unwrap_err();
        assert!(matches!(err, Error::Orientation(_)));
    }

    #[test]
    fn test_unknown_names() {
        let fx = fixture();
        let hemi = fx.access.hemi(tag("lh_LR164k_MSMAll")).unwrap();
        assert!(hemi.property("nonexistent").unwrap_err().is_not_found());
        assert!(hemi.names(Category::Registration).contains(&"fs_LR"));
        assert!(matches!(
            fx.access.get(Category::Surface, None, "white"),
            Err(Error::Configuration(_))
        ));
    }
}
