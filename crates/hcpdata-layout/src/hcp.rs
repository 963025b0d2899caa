//! The HCP subject directory layout
//!
//! Covers the structural preprocessing outputs of an HCP release: volumes in
//! T1w and MNI space, native and fs_LR surfaces, registration spheres, and
//! per-vertex property maps. File names use `{id}` for the subject id.

use crate::index::FlatIndex;
use crate::node::{LeafSpec, SpecNode};
use crate::registry::{FilterId, LoaderId};
use hcpdata_core::{Alignment, Error, HemiTag, MeshResolution, Result, Side};
use std::sync::OnceLock;

/// (file stem, logical name) of the five standard surfaces
const SURFACES: [(&str, &str); 5] = [
    ("white", "white"),
    ("midthickness", "midgray"),
    ("pial", "pial"),
    ("inflated", "inflated"),
    ("very_inflated", "very_inflated"),
];

const LABELS: [(&str, &str); 3] = [
    ("BA", "brodmann_area"),
    ("aparc", "parcellation_2005"),
    ("aparc.a2009s", "parcellation"),
];

const MYELIN_164K: [(&str, &str); 5] = [
    ("MyelinMap", "myelin"),
    ("MyelinMap_BC", "myelin_bc"),
    ("SmoothedMyelinMap", "myelin_smooth"),
    ("SmoothedMyelinMap_BC", "myelin_smooth_bc"),
    ("RefMyelinMap", "myelin_ref"),
];

// No reference map is released on the 32k mesh
const MYELIN_32K: [(&str, &str); 4] = [
    ("MyelinMap", "myelin"),
    ("MyelinMap_BC", "myelin_bc"),
    ("SmoothedMyelinMap", "myelin_smooth"),
    ("SmoothedMyelinMap_BC", "myelin_smooth_bc"),
];

/// Morphology maps; curvature is stored sign-flipped
const MORPHOLOGY: [(&str, &str, bool); 4] = [
    ("curvature", "curvature", true),
    ("sulc", "convexity", false),
    ("corrThickness", "thickness", false),
    ("thickness", "thickness_uncorrected", false),
];

/// Bi-hemisphere MSMAll maps on the 164k mesh: (stem, name, negate)
const COMBINED_164K: [(&str, &str, bool); 7] = [
    ("ArealDistortion_MSMAll", "areal_distortion", false),
    ("MyelinMap_BC_MSMAll", "myelin_bc", false),
    ("SmoothedMyelinMap_BC_MSMAll", "myelin_smooth_bc", false),
    ("curvature_MSMAll", "curvature", true),
    ("sulc", "convexity", false),
    ("corrThickness", "thickness", false),
    ("thickness", "thickness_uncorrected", false),
];

const COMBINED_32K: [(&str, &str, bool); 7] = [
    ("ArealDistortion_MSMAll", "areal_distortion", false),
    ("MyelinMap_BC_MSMAll", "myelin_bc", false),
    ("SmoothedMyelinMap_BC_MSMAll", "myelin_smooth_bc", false),
    ("curvature_MSMAll", "curvature", true),
    ("sulc_MSMAll", "convexity", false),
    ("corrThickness_MSMAll", "thickness", false),
    ("thickness_MSMAll", "thickness_uncorrected", false),
];

const T1W_IMAGES: [(&str, &str); 14] = [
    ("BiasField_acpc_dc.nii.gz", "bias"),
    ("T1wDividedByT2w.nii.gz", "T1_to_T2_ratio_all"),
    ("T1wDividedByT2w_ribbon.nii.gz", "T1_to_T2_ratio"),
    ("T1w_acpc_dc_restore.nii.gz", "T1"),
    ("T1w_acpc_dc.nii.gz", "T1_unrestored"),
    ("T1w_acpc_dc_restore_brain.nii.gz", "brain"),
    ("T2w_acpc_dc_restore.nii.gz", "T2"),
    ("T2w_acpc_dc.nii.gz", "T2_unrestored"),
    ("T2w_acpc_dc_restore_brain.nii.gz", "T2_brain"),
    ("aparc+aseg.nii.gz", "parcellation2005"),
    ("aparc.a2009s+aseg.nii.gz", "parcellation"),
    ("brainmask_fs.nii.gz", "brainmask"),
    ("ribbon.nii.gz", "ribbon"),
    ("wmparc.nii.gz", "wm_parcellation"),
];

const MNI_IMAGES: [(&str, &str); 12] = [
    ("BiasField.nii.gz", "bias_warped"),
    ("T1w_restore.nii.gz", "T1_warped"),
    ("T1w.nii.gz", "T1_warped_unrestored"),
    ("T1w_restore_brain.nii.gz", "brain_warped"),
    ("T2w_restore.nii.gz", "T2_warped"),
    ("T2w.nii.gz", "T2_warped_unrestored"),
    ("T2w_restore_brain.nii.gz", "T2_brain_warped"),
    ("aparc+aseg.nii.gz", "parcellation2005_warped"),
    ("aparc.a2009s+aseg.nii.gz", "parcellation_warped"),
    ("brainmask_fs.nii.gz", "brainmask_warped"),
    ("ribbon.nii.gz", "ribbon_warped"),
    ("wmparc.nii.gz", "wm_parcellation_warped"),
];

const SIDES: [Side; 2] = [Side::Left, Side::Right];

/// Files of one directory in declaration order; repeated names collect views
#[derive(Default)]
struct Files {
    entries: Vec<(String, Vec<LeafSpec>)>,
    subdirs: Vec<(String, SpecNode)>,
}

impl Files {
    fn add(&mut self, file: String, leaf: LeafSpec) {
        match self.entries.iter_mut().find(|(name, _)| *name == file) {
            Some((_, leaves)) => leaves.push(leaf),
            None => self.entries.push((file, vec![leaf])),
        }
    }

    fn subdir(&mut self, name: &str, node: SpecNode) {
        self.subdirs.push((name.to_string(), node));
    }

    fn into_node(self) -> SpecNode {
        let mut children: Vec<(String, SpecNode)> = self
            .entries
            .into_iter()
            .map(|(name, leaves)| (name, SpecNode::views(leaves)))
            .collect();
        children.extend(self.subdirs);
        SpecNode::Directory(children)
    }
}

fn hemi_file(side: Side, stem: &str, atlas: &str, ext: &str) -> String {
    format!("{{id}}.{}.{}.{}.{}", side.letter(), stem, atlas, ext)
}

fn combined_file(stem: &str, atlas: &str) -> String {
    format!("{{id}}.{}.{}.dscalar.nii", stem, atlas)
}

fn mask_filter(side: Side) -> FilterId {
    match side {
        Side::Left => FilterId::LeftMask,
        Side::Right => FilterId::RightMask,
    }
}

fn tags(side: Side, mesh: MeshResolution) -> (HemiTag, HemiTag) {
    (
        HemiTag::new(side, mesh, Alignment::MSMSulc),
        HemiTag::new(side, mesh, Alignment::MSMAll),
    )
}

fn negated(leaf: LeafSpec, negate: bool) -> LeafSpec {
    if negate {
        leaf.filter_with(FilterId::Negate)
    } else {
        leaf
    }
}

fn images(files: &mut Files, table: &[(&str, &str)]) {
    for (file, name) in table {
        files.add(file.to_string(), LeafSpec::image(*name));
    }
}

/// Surfaces shared by both alignments (T1w/Native)
fn shared_surfaces(files: &mut Files, side: Side, mesh: MeshResolution, atlas: &str) {
    let (sulc, all) = tags(side, mesh);
    for (stem, name) in SURFACES {
        let file = hemi_file(side, stem, atlas, "surf.gii");
        files.add(file.clone(), LeafSpec::surface(name, sulc));
        files.add(file, LeafSpec::surface(name, all));
    }
}

/// MSMSulc surfaces plus their `_MSMAll` counterparts
fn aligned_surfaces(files: &mut Files, side: Side, mesh: MeshResolution, atlas: &str) {
    let (sulc, all) = tags(side, mesh);
    for (stem, name) in SURFACES {
        files.add(
            hemi_file(side, stem, atlas, "surf.gii"),
            LeafSpec::surface(name, sulc),
        );
        files.add(
            hemi_file(side, &format!("{}_MSMAll", stem), atlas, "surf.gii"),
            LeafSpec::surface(name, all),
        );
    }
}

/// Per-hemisphere files of an fs_LR mesh directory
fn fs_lr_hemi(files: &mut Files, side: Side, mesh: MeshResolution, myelin: &[(&str, &str)]) {
    let atlas = mesh.atlas_label();
    let (sulc, all) = tags(side, mesh);

    for tag in [sulc, all] {
        files.add(
            hemi_file(side, "ArealDistortion_FS", atlas, "shape.gii"),
            LeafSpec::property("areal_distortion_FS", tag),
        );
    }
    files.add(
        hemi_file(side, "ArealDistortion_MSMSulc", atlas, "shape.gii"),
        LeafSpec::property("areal_distortion", sulc),
    );
    for (stem, name) in myelin {
        files.add(
            hemi_file(side, stem, atlas, "func.gii"),
            LeafSpec::property(*name, sulc),
        );
    }
    for (stem, name, negate) in MORPHOLOGY {
        files.add(
            hemi_file(side, stem, atlas, "shape.gii"),
            negated(LeafSpec::property(name, sulc), negate),
        );
    }

    for tag in [sulc, all] {
        for (stem, name) in LABELS {
            files.add(
                hemi_file(side, stem, atlas, "label.gii"),
                LeafSpec::property(name, tag),
            );
        }
        files.add(
            hemi_file(side, "atlasroi", atlas, "shape.gii"),
            LeafSpec::property("atlas", tag)
                .load_with(LoaderId::AtlasRoi)
                .filter_with(mask_filter(side)),
        );
        files.add(
            hemi_file(side, "flat", atlas, "surf.gii"),
            LeafSpec::surface("flat", tag).load_with(LoaderId::AtlasSphere),
        );
        files.add(
            hemi_file(side, "sphere", atlas, "surf.gii"),
            LeafSpec::registration("fs_LR", tag).load_with(LoaderId::AtlasSphere),
        );
    }

    aligned_surfaces(files, side, mesh, atlas);
}

/// Bi-hemisphere MSMAll maps of an fs_LR mesh directory
fn fs_lr_combined(files: &mut Files, mesh: MeshResolution, table: &[(&str, &str, bool)]) {
    let lh = HemiTag::new(Side::Left, mesh, Alignment::MSMAll);
    let rh = HemiTag::new(Side::Right, mesh, Alignment::MSMAll);
    for (stem, name, negate) in table {
        files.add(
            combined_file(stem, mesh.atlas_label()),
            negated(LeafSpec::combined_property(*name, lh, rh), *negate),
        );
    }
}

/// Per-hemisphere maps and registrations on the native mesh in MNI space
fn native_hemi(files: &mut Files, side: Side) {
    let mesh = MeshResolution::Native;
    let atlas = mesh.atlas_label();
    let (sulc, all) = tags(side, mesh);

    for tag in [sulc, all] {
        files.add(
            hemi_file(side, "ArealDistortion_FS", atlas, "shape.gii"),
            LeafSpec::property("areal_distortion_FS", tag),
        );
        for (stem, name) in LABELS {
            files.add(
                hemi_file(side, stem, atlas, "label.gii"),
                LeafSpec::property(name, tag),
            );
        }
        files.add(
            hemi_file(side, "atlasroi", atlas, "shape.gii"),
            LeafSpec::property("atlas", tag),
        );
        for (stem, name, negate) in MORPHOLOGY {
            files.add(
                hemi_file(side, stem, atlas, "shape.gii"),
                negated(LeafSpec::property(name, tag), negate),
            );
        }
        files.add(
            hemi_file(side, "roi", atlas, "shape.gii"),
            LeafSpec::property("roi", tag).filter_with(FilterId::ToBool),
        );
        files.add(
            hemi_file(side, "sphere", atlas, "surf.gii"),
            LeafSpec::registration("native", tag),
        );
        files.add(
            hemi_file(side, "sphere.reg", atlas, "surf.gii"),
            LeafSpec::registration("fsaverage", tag),
        );
    }

    for (tag, alignment) in [(sulc, Alignment::MSMSulc), (all, Alignment::MSMAll)] {
        files.add(
            hemi_file(
                side,
                &format!("ArealDistortion_{}", alignment.token()),
                atlas,
                "shape.gii",
            ),
            LeafSpec::property("areal_distortion", tag),
        );
        files.add(
            hemi_file(
                side,
                &format!("sphere.{}", alignment.token()),
                atlas,
                "surf.gii",
            ),
            LeafSpec::registration("fs_LR", tag),
        );
    }

    for (stem, name) in MYELIN_164K {
        files.add(
            hemi_file(side, stem, atlas, "func.gii"),
            LeafSpec::property(name, sulc),
        );
    }
}

fn t1w_dir() -> SpecNode {
    let mut t1w = Files::default();
    images(&mut t1w, &T1W_IMAGES);

    let mut native = Files::default();
    let mut lowres = Files::default();
    for side in SIDES {
        shared_surfaces(&mut native, side, MeshResolution::Native, "native");
        aligned_surfaces(
            &mut lowres,
            side,
            MeshResolution::LowRes,
            MeshResolution::LowRes.atlas_label(),
        );
    }
    t1w.subdir("Native", native.into_node());
    t1w.subdir("fsaverage_LR32k", lowres.into_node());
    t1w.into_node()
}

fn mni_dir() -> SpecNode {
    let mut mni = Files::default();
    images(&mut mni, &MNI_IMAGES);
    for side in SIDES {
        fs_lr_hemi(&mut mni, side, MeshResolution::LR164k, &MYELIN_164K);
    }
    fs_lr_combined(&mut mni, MeshResolution::LR164k, &COMBINED_164K);

    let mut native = Files::default();
    for side in SIDES {
        native_hemi(&mut native, side);
    }

    let mut lr32k = Files::default();
    for side in SIDES {
        fs_lr_hemi(&mut lr32k, side, MeshResolution::LR32k, &MYELIN_32K);
    }
    fs_lr_combined(&mut lr32k, MeshResolution::LR32k, &COMBINED_32K);

    mni.subdir("Native", native.into_node());
    mni.subdir("fsaverage_LR32k", lr32k.into_node());
    mni.into_node()
}

/// The full HCP subject layout tree
pub fn hcp_layout() -> SpecNode {
    SpecNode::dir([("T1w", t1w_dir()), ("MNINonLinear", mni_dir())])
}

static SUBJECT_LAYOUT: OnceLock<std::result::Result<FlatIndex, String>> = OnceLock::new();

/// Normalized HCP layout, built on first use and shared by every subject
///
/// # Errors
///
/// Returns [`Error::Configuration`] if the built-in table is inconsistent.
pub fn subject_layout() -> Result<&'static FlatIndex> {
    SUBJECT_LAYOUT
        .get_or_init(|| FlatIndex::build(&hcp_layout()).map_err(|e| e.to_string()))
        .as_ref()
        .map_err(|msg| Error::configuration(msg.clone()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use hcpdata_core::Category;

    #[test]
    fn test_hcp_layout_normalizes() {
        let index = subject_layout().unwrap();
        assert_eq!(index.images().len(), T1W_IMAGES.len() + MNI_IMAGES.len());
        assert_eq!(index.hemis().len(), 16);
        for tag in HemiTag::all() {
            assert!(!index.hemis()[&tag].is_empty(), "no data for {}", tag);
        }
    }

    #[test]
    fn test_known_paths() {
        let index = subject_layout().unwrap();
        assert_eq!(index.images()["T1"], "T1w/T1w_acpc_dc_restore.nii.gz");
        assert_eq!(
            index.images()["brain_warped"],
            "MNINonLinear/T1w_restore_brain.nii.gz"
        );

        let tag: HemiTag = "lh_LR32k_MSMAll".parse().unwrap();
        assert_eq!(
            index.lookup(Category::Surface, Some(tag), "midgray"),
            Some("MNINonLinear/fsaverage_LR32k/{id}.L.midthickness_MSMAll.32k_fs_LR.surf.gii")
        );
        assert_eq!(
            index.lookup(Category::Property, Some(tag), "thickness"),
            Some("MNINonLinear/fsaverage_LR32k/{id}.corrThickness_MSMAll.32k_fs_LR.dscalar.nii")
        );

        let tag: HemiTag = "rh_native_MSMSulc".parse().unwrap();
        assert_eq!(
            index.lookup(Category::Registration, Some(tag), "fsaverage"),
            Some("MNINonLinear/Native/{id}.R.sphere.reg.native.surf.gii")
        );
    }

    #[test]
    fn test_native_surfaces_are_shared_between_alignments() {
        let index = subject_layout().unwrap();
        let sulc: HemiTag = "lh_native_MSMSulc".parse().unwrap();
        let all: HemiTag = "lh_native_MSMAll".parse().unwrap();
        let path = index.lookup(Category::Surface, Some(sulc), "pial").unwrap();
        assert_eq!(path, "T1w/Native/{id}.L.pial.native.surf.gii");
        assert_eq!(index.lookup(Category::Surface, Some(all), "pial"), Some(path));
        assert_eq!(index.meta(path).unwrap().hemis, vec![sulc, all]);
    }

    #[test]
    fn test_custom_loaders_and_filters() {
        let index = subject_layout().unwrap();
        let roi = index
            .meta("MNINonLinear/{id}.R.atlasroi.164k_fs_LR.shape.gii")
            .unwrap();
        assert_eq!(roi.loader, Some(LoaderId::AtlasRoi));
        assert_eq!(roi.filter, Some(FilterId::RightMask));

        let sphere = index
            .meta("MNINonLinear/fsaverage_LR32k/{id}.L.sphere.32k_fs_LR.surf.gii")
            .unwrap();
        assert_eq!(sphere.loader, Some(LoaderId::AtlasSphere));
        assert_eq!(sphere.category, Category::Registration);

        let curv = index
            .meta("MNINonLinear/{id}.curvature_MSMAll.164k_fs_LR.dscalar.nii")
            .unwrap();
        assert!(curv.combined);
        assert_eq!(curv.filter, Some(FilterId::Negate));

        let native_roi = index
            .meta("MNINonLinear/Native/{id}.L.atlasroi.native.shape.gii")
            .unwrap();
        assert_eq!(native_roi.loader, None);
    }

    #[test]
    fn test_combined_maps_only_under_msmall() {
        let index = subject_layout().unwrap();
        for meta in index.files().values().filter(|m| m.combined) {
            assert_eq!(meta.hemis.len(), 2);
            assert!(meta.hemis.iter().all(|h| h.alignment == Alignment::MSMAll));
        }
    }

    #[test]
    fn test_layout_json_lists_every_hemisphere() {
        let json = subject_layout().unwrap().to_json().unwrap();
        for tag in HemiTag::all() {
            assert!(json.contains(&tag.to_string()));
        }
    }
}
