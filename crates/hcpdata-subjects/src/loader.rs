//! Loading one subject file into a frozen value
//!
//! Steps for every file:
//! 1. fetch it from the remote release if it is missing and auto-download
//!    covers the subject, otherwise fail with NotFound
//! 2. run the file's custom loader, or decode by category
//! 3. apply the file's filter
//! 4. freeze the result behind an `Arc`

use crate::atlas::{atlas_label, AtlasCache, RoiMasks, SphereKey};
use hcpdata_core::{Category, Decoder, Error, NdArray, Result, SubjectId, Value};
use hcpdata_fetch::{local_path, RemoteFetcher};
use hcpdata_layout::{FileMeta, LoaderId};
use std::path::{Path, PathBuf};
use std::sync::{Arc, RwLock};

/// Auto-download state shared between a dataset and its loader
pub type FetcherSlot = Arc<RwLock<Option<Arc<RemoteFetcher>>>>;

/// One file of one subject
#[derive(Debug, Clone)]
pub struct FileRequest<'a> {
    pub sid: SubjectId,
    pub subject_dir: &'a Path,
    /// Subject-relative path with the id already substituted
    pub relative: &'a str,
    pub meta: &'a FileMeta,
}

impl FileRequest<'_> {
    pub fn local(&self) -> PathBuf {
        local_path(self.subject_dir, self.relative)
    }

    fn filename(&self) -> &str {
        self.relative.rsplit('/').next().unwrap_or(self.relative)
    }

    /// Same directory, different file name
    fn sibling(&self, filename: &str) -> String {
        match self.relative.rsplit_once('/') {
            Some((dir, _)) => format!("{}/{}", dir, filename),
            None => filename.to_string(),
        }
    }
}

pub struct FileLoader {
    decoder: Arc<dyn Decoder>,
    atlas: Arc<AtlasCache>,
    fetcher: FetcherSlot,
}

impl FileLoader {
    pub fn new(decoder: Arc<dyn Decoder>, atlas: Arc<AtlasCache>, fetcher: FetcherSlot) -> Self {
        Self {
            decoder,
            atlas,
            fetcher,
        }
    }

    pub fn atlas(&self) -> &AtlasCache {
        &self.atlas
    }

    /// Load, filter and freeze one file
    pub fn load(&self, req: &FileRequest<'_>) -> Result<Arc<Value>> {
        let value = match req.meta.loader {
            Some(LoaderId::AtlasRoi) => self.roi_masks(req)?.to_value(),
            Some(LoaderId::AtlasSphere) => {
                let key = SphereKey::from_filename(req.filename())?;
                let mesh = self.atlas.sphere(&key, || self.load_default(req))?;
                Value::clone(&mesh)
            }
            None => self.load_default(req)?,
        };

        let value = match req.meta.filter {
            Some(filter) => filter.apply(value)?,
            None => value,
        };
        tracing::debug!("Loaded {} for subject {}", req.relative, req.sid);
        Ok(Arc::new(value))
    }

    /// Both atlas ROI masks for the mesh of `req`, from the cache when possible
    pub fn roi_masks(&self, req: &FileRequest<'_>) -> Result<Arc<RoiMasks>> {
        let atlas = atlas_label(req.filename())?;
        self.atlas.roi_masks(atlas, || {
            let mask_meta = FileMeta {
                category: Category::Property,
                hemis: Vec::new(),
                combined: false,
                loader: None,
                filter: None,
            };
            let load_side = |h: &str| -> Result<NdArray> {
                let relative =
                    req.sibling(&format!("{}.{}.atlasroi.{}.shape.gii", req.sid, h, atlas));
                let mask_req = FileRequest {
                    sid: req.sid,
                    subject_dir: req.subject_dir,
                    relative: &relative,
                    meta: &mask_meta,
                };
                self.load_default(&mask_req)?.into_array()
            };
            Ok(RoiMasks::new(load_side("L")?, load_side("R")?))
        })
    }

    /// Fetch if needed, then decode by category
    fn load_default(&self, req: &FileRequest<'_>) -> Result<Value> {
        let path = req.local();
        self.ensure_local(req, &path)?;

        let value = self.decoder.decode(&path)?;
        if req.meta.combined {
            return Ok(Value::Array(value.into_array()?.squeeze()));
        }
        match req.meta.category {
            Category::Image => match value {
                Value::Volume(_) => Ok(value),
                other => Err(unexpected(&path, "volume", &other)),
            },
            Category::Surface | Category::Registration => match value {
                Value::Mesh(_) => Ok(value),
                other => Err(unexpected(&path, "mesh", &other)),
            },
            Category::Property => Ok(Value::Array(property_array(&path, value)?.squeeze())),
        }
    }

    fn ensure_local(&self, req: &FileRequest<'_>, path: &Path) -> Result<()> {
        if path.is_file() {
            return Ok(());
        }
        let fetcher = self
            .fetcher
            .read()
            .map_err(|_| Error::configuration("auto-download lock poisoned"))?
            .clone();
        match fetcher {
            Some(fetcher) if fetcher.is_enumerated(req.sid) => {
                fetcher.ensure_local(req.sid, req.relative, path)?;
                Ok(())
            }
            _ => Err(Error::not_found(format!("file {} not found", path.display()))),
        }
    }
}

/// GIFTI property files hold several data arrays; only the first is the map
fn property_array(path: &Path, value: Value) -> Result<NdArray> {
    match value {
        Value::Array(a) => Ok(a),
        Value::Arrays(arrays) => arrays.into_iter().next().ok_or_else(|| {
            Error::decode(format!("{} holds no data arrays", path.display()))
        }),
        other => Err(unexpected(path, "array", &other)),
    }
}

fn unexpected(path: &Path, wanted: &str, got: &Value) -> Error {
    Error::decode(format!(
        "{}: expected a {}, decoded a {}",
        path.display(),
        wanted,
        got.kind()
    ))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{write_array, write_mesh, CountingDecoder};
    use hcpdata_core::HemiTag;
    use hcpdata_layout::FilterId;
    use tempfile::TempDir;

    fn loader(decoder: &Arc<CountingDecoder>) -> FileLoader {
        FileLoader::new(
            decoder.clone(),
            Arc::new(AtlasCache::new()),
            Arc::new(RwLock::new(None)),
        )
    }

    fn meta(category: Category) -> FileMeta {
        FileMeta {
            category,
            hemis: Vec::new(),
            combined: false,
            loader: None,
            filter: None,
        }
    }

    fn sid() -> SubjectId {
        SubjectId::new(100307).unwrap()
    }

    #[test]
    fn test_property_takes_first_array_and_squeezes() {
        let temp = TempDir::new().unwrap();
        write_array(&temp.path().join("x.shape.gii"), &[3, 1], &[1.0, -2.0, 3.0]);
        let decoder = Arc::new(CountingDecoder::new());
        let meta = meta(Category::Property);
        let req = FileRequest {
            sid: sid(),
            subject_dir: temp.path(),
            relative: "x.shape.gii",
            meta: &meta,
        };
        let value = loader(&decoder).load(&req).unwrap();
        let array = value.as_array().unwrap();
        assert_eq!(array.shape(), &[3]);
        assert_eq!(array.as_floats().unwrap(), &[1.0, -2.0, 3.0]);
    }

    #[test]
    fn test_filter_applied() {
        let temp = TempDir::new().unwrap();
        write_array(&temp.path().join("c.shape.gii"), &[2], &[0.5, -1.0]);
        let decoder = Arc::new(CountingDecoder::new());
        let mut meta = meta(Category::Property);
        meta.filter = Some(FilterId::Negate);
        let req = FileRequest {
            sid: sid(),
            subject_dir: temp.path(),
            relative: "c.shape.gii",
            meta: &meta,
        };
        let value = loader(&decoder).load(&req).unwrap();
        assert_eq!(value.as_array().unwrap().as_floats().unwrap(), &[-0.5, 1.0]);
    }

    #[test]
    fn test_wrong_kind_is_decode_error() {
        let temp = TempDir::new().unwrap();
        write_mesh(&temp.path().join("white.surf.gii"), 4);
        let decoder = Arc::new(CountingDecoder::new());
        let meta = meta(Category::Image);
        let req = FileRequest {
            sid: sid(),
            subject_dir: temp.path(),
            relative: "white.surf.gii",
            meta: &meta,
        };
        assert!(matches!(
            loader(&decoder).load(&req),
            Err(Error::Decode(_))
        ));
    }

    #[test]
    fn test_missing_without_auto_download() {
        let temp = TempDir::new().unwrap();
        let decoder = Arc::new(CountingDecoder::new());
        let meta = meta(Category::Property);
        let req = FileRequest {
            sid: sid(),
            subject_dir: temp.path(),
            relative: "MNINonLinear/none.shape.gii",
            meta: &meta,
        };
        assert!(loader(&decoder).load(&req).unwrap_err().is_not_found());
        assert_eq!(decoder.total(), 0);
    }

    #[test]
    fn test_atlas_sphere_shared_across_subjects() {
        let temp = TempDir::new().unwrap();
        for id in ["100307", "100408"] {
            write_mesh(
                &temp.path().join(id).join(format!("{}.L.sphere.32k_fs_LR.surf.gii", id)),
                5,
            );
        }
        let decoder = Arc::new(CountingDecoder::new());
        let loader = loader(&decoder);
        let mut meta = meta(Category::Registration);
        meta.loader = Some(LoaderId::AtlasSphere);
        meta.hemis = vec!["lh_LR32k_MSMAll".parse::<HemiTag>().unwrap()];

        for id in [100307u32, 100408] {
            let sid = SubjectId::new(id).unwrap();
            let dir = temp.path().join(id.to_string());
            let relative = format!("{}.L.sphere.32k_fs_LR.surf.gii", id);
            let req = FileRequest {
                sid,
                subject_dir: &dir,
                relative: &relative,
                meta: &meta,
            };
            assert_eq!(loader.load(&req).unwrap().as_mesh().unwrap().vertex_count(), 5);
        }
        assert_eq!(decoder.total(), 1);
        assert_eq!(loader.atlas().cached_spheres(), 1);
    }

    #[test]
    fn test_atlas_roi_loader() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("MNINonLinear");
        write_array(&dir.join("100307.L.atlasroi.164k_fs_LR.shape.gii"), &[3], &[1.0, 0.0, 1.0]);
        write_array(&dir.join("100307.R.atlasroi.164k_fs_LR.shape.gii"), &[2], &[0.0, 1.0]);

        let decoder = Arc::new(CountingDecoder::new());
        let loader = loader(&decoder);
        let mut meta = meta(Category::Property);
        meta.loader = Some(LoaderId::AtlasRoi);
        meta.filter = Some(FilterId::RightMask);
        let req = FileRequest {
            sid: sid(),
            subject_dir: temp.path(),
            relative: "MNINonLinear/100307.R.atlasroi.164k_fs_LR.shape.gii",
            meta: &meta,
        };
        let right = loader.load(&req).unwrap();
        assert_eq!(right.as_array().unwrap().as_bools().unwrap(), &[false, true]);

        loader.load(&req).unwrap();
        assert_eq!(decoder.total(), 2);
        assert_eq!(loader.atlas().cached_masks(), 1);
    }
}
