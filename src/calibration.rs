//! Calibration override store (§4.3): a `joint_name -> partial params`
//! map persisted as JSON, applied on top of the loaded tree.

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::tree::doc::TreeDocNode;
use crate::tree::node::Calibration;
use crate::tree::KTree;

/// A partial override: keys absent mean "use the tree's declared value
/// or the type default" (§3).
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct OverrideParams {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_max: Option<f64>,
}

impl OverrideParams {
    fn merge_into(&self, base: &Calibration) -> Calibration {
        Calibration {
            coord: base.coord,
            axis_offset: self.axis_offset.unwrap_or(base.axis_offset),
            axis_scale: self.axis_scale.unwrap_or(base.axis_scale),
            slider_min: self.slider_min.unwrap_or(base.slider_min),
            slider_max: self.slider_max.unwrap_or(base.slider_max),
        }
    }

    fn merge_overwrite(&mut self, patch: &OverrideParams) {
        if let Some(v) = patch.axis_offset {
            self.axis_offset = Some(v);
        }
        if let Some(v) = patch.axis_scale {
            self.axis_scale = Some(v);
        }
        if let Some(v) = patch.slider_min {
            self.slider_min = Some(v);
        }
        if let Some(v) = patch.slider_max {
            self.slider_max = Some(v);
        }
    }
}

#[derive(Debug, Default)]
pub struct CalibrationStore {
    path: PathBuf,
    overrides: HashMap<String, OverrideParams>,
}

impl CalibrationStore {
    pub fn new(path: PathBuf) -> Self {
        CalibrationStore { path, overrides: HashMap::new() }
    }

    /// `Load()`: tolerant of a missing file; a parse error is logged
    /// and non-fatal (§4.3, §4.7).
    pub fn load(path: PathBuf) -> Self {
        let overrides = match fs::read_to_string(&path) {
            Ok(contents) => match serde_json::from_str(&contents) {
                Ok(map) => map,
                Err(err) => {
                    tracing::error!(error = %err, path = %path.display(), "calibration file parse error, starting empty");
                    HashMap::new()
                }
            },
            Err(_) => HashMap::new(),
        };
        CalibrationStore { path, overrides }
    }

    /// `Save()`: atomic overwrite, creating the parent directory if
    /// absent. A write failure is logged; the in-memory map stays
    /// authoritative (§4.3, §4.7).
    pub fn save(&self) {
        if let Some(parent) = self.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                tracing::error!(error = %err, "failed to create calibration directory");
                return;
            }
        }
        let json = match serde_json::to_string_pretty(&self.overrides) {
            Ok(j) => j,
            Err(err) => {
                tracing::error!(error = %err, "failed to serialize calibration overrides");
                return;
            }
        };
        let tmp = self.path.with_extension("json.tmp");
        if let Err(err) = fs::write(&tmp, json).and_then(|_| fs::rename(&tmp, &self.path)) {
            tracing::error!(error = %err, path = %self.path.display(), "failed to write calibration file");
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn overrides(&self) -> &HashMap<String, OverrideParams> {
        &self.overrides
    }

    /// `ApplyTo(tree)`: unknown names are ignored (§4.3).
    pub fn apply_to(&self, tree: &mut KTree) {
        for (name, params) in &self.overrides {
            if let Some(id) = tree.joint_id(name) {
                let base = tree.node(id).calibration.clone();
                let merged = params.merge_into(&base);
                tree.apply_calibration(name, &merged);
            }
        }
    }

    /// `SetZero(tree, name)`: `offset := -coord` (§4.3).
    pub fn set_zero(&mut self, tree: &mut KTree, name: &str) {
        let Some(coord) = tree.coord_of(name) else { return };
        let offset = -coord;
        let entry = self.overrides.entry(name.to_string()).or_default();
        entry.axis_offset = Some(offset);
        let base = tree.node(tree.joint_id(name).unwrap()).calibration.clone();
        tree.apply_calibration(name, &entry.merge_into(&base));
        self.save();
    }

    /// `SetOverride(tree, name, patch)`: partial merge (§4.3).
    pub fn set_override(&mut self, tree: &mut KTree, name: &str, patch: &OverrideParams) {
        let entry = self.overrides.entry(name.to_string()).or_default();
        entry.merge_overwrite(patch);
        if let Some(id) = tree.joint_id(name) {
            let base = tree.node(id).calibration.clone();
            tree.apply_calibration(name, &entry.merge_into(&base));
        }
        self.save();
    }

    /// `ClearAll(tree, original_doc)`: empty the map, persist, reload
    /// declared values (§4.3).
    pub fn clear_all(&mut self, tree: &mut KTree, original_doc: &TreeDocNode) {
        self.overrides.clear();
        self.save();
        for name in tree.joint_names() {
            if let Some(cal) = crate::tree::find_original_axis_params(original_doc, &name) {
                tree.apply_calibration(&name, &cal);
            }
        }
    }

    /// `ClearOne(tree, original_doc, name)`: remove one entry, persist,
    /// restore declared values for that joint (§4.3).
    pub fn clear_one(&mut self, tree: &mut KTree, original_doc: &TreeDocNode, name: &str) {
        self.overrides.remove(name);
        self.save();
        if let Some(cal) = crate::tree::find_original_axis_params(original_doc, name) {
            tree.apply_calibration(name, &cal);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tree::doc::WirePose;
    use serde_json::Value;

    fn rotator_doc() -> TreeDocNode {
        TreeDocNode {
            name: "J".into(),
            node_type: "rotator".into(),
            pose: WirePose { position: [0.0, 0.0, 0.0], orientation: [0.0, 0.0, 0.0, 1.0] },
            axis: Some([0.0, 0.0, 1.0]),
            axis_offset: None,
            axis_scale: None,
            slider_min: None,
            slider_max: None,
            model: Value::Null,
            children: vec![],
        }
    }

    fn temp_store_path(name: &str) -> PathBuf {
        std::env::temp_dir().join(format!("webkin_test_{}_{}.json", name, std::process::id()))
    }

    #[test]
    fn set_zero_is_idempotent_regardless_of_scale() {
        let doc = rotator_doc();
        let mut tree = crate::tree::load(&doc).unwrap();
        tree.set_joint_coord("J", 1.25);
        let mut store = CalibrationStore::new(temp_store_path("zero"));
        store.overrides.insert(
            "J".to_string(),
            OverrideParams { axis_scale: Some(4.0), ..Default::default() },
        );
        store.apply_to(&mut tree);
        store.set_zero(&mut tree, "J");
        tree.update_forward();
        let id = tree.joint_id("J").unwrap();
        assert_eq!(tree.node(id).calibration.effective(), 0.0);
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn override_merge_is_partial() {
        let doc = rotator_doc();
        let mut tree = crate::tree::load(&doc).unwrap();
        let mut store = CalibrationStore::new(temp_store_path("partial"));
        store.set_override(
            &mut tree,
            "J",
            &OverrideParams { axis_scale: Some(2.0), ..Default::default() },
        );
        let id = tree.joint_id("J").unwrap();
        assert_eq!(tree.node(id).calibration.axis_scale, 2.0);
        assert_eq!(tree.node(id).calibration.axis_offset, 0.0);
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn clear_all_restores_declared_values() {
        let doc = rotator_doc();
        let mut tree = crate::tree::load(&doc).unwrap();
        let mut store = CalibrationStore::new(temp_store_path("clear_all"));
        store.set_override(
            &mut tree,
            "J",
            &OverrideParams { axis_scale: Some(5.0), axis_offset: Some(1.0), ..Default::default() },
        );
        store.clear_all(&mut tree, &doc);
        let id = tree.joint_id("J").unwrap();
        assert_eq!(tree.node(id).calibration.axis_scale, 1.0);
        assert_eq!(tree.node(id).calibration.axis_offset, 0.0);
        assert!(store.overrides().is_empty());
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn clear_one_only_affects_named_joint() {
        let mut doc = rotator_doc();
        doc.name = "root".into();
        doc.node_type = "transform".into();
        doc.axis = None;
        doc.children = vec![rotator_doc()];
        let mut tree = crate::tree::load(&doc).unwrap();
        let mut store = CalibrationStore::new(temp_store_path("clear_one"));
        store.set_override(&mut tree, "J", &OverrideParams { axis_offset: Some(0.7), ..Default::default() });
        store.clear_one(&mut tree, &doc, "J");
        let id = tree.joint_id("J").unwrap();
        assert_eq!(tree.node(id).calibration.axis_offset, 0.0);
        assert!(!store.overrides().contains_key("J"));
        let _ = fs::remove_file(store.path());
    }

    #[test]
    fn load_tolerates_missing_file() {
        let store = CalibrationStore::load(temp_store_path("missing"));
        assert!(store.overrides().is_empty());
    }
}
