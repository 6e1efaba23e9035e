//! The wire-facing tree document (§6) and its conversion into a
//! `KTree`.

use std::collections::HashSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::{Result, WebkinError};
use crate::math::{Pose, Quat, Vec3};

use super::node::{Calibration, KNode, NodeKind};
use super::KTree;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WirePose {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl From<&WirePose> for Pose {
    fn from(w: &WirePose) -> Pose {
        let [x, y, z] = w.position;
        let [qx, qy, qz, qw] = w.orientation;
        Pose::new(Vec3::new(x, y, z), Quat::new(qx, qy, qz, qw).normalized())
    }
}

/// Recursive tree document node, matches §6's `Node` JSON shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeDocNode {
    pub name: String,
    #[serde(rename = "type")]
    pub node_type: String,
    pub pose: WirePose,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis: Option<[f64; 3]>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_offset: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub axis_scale: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_min: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub slider_max: Option<f64>,
    pub model: Value,
    #[serde(default)]
    pub children: Vec<TreeDocNode>,
}

/// A whole tree document is just its root node.
pub type TreeDoc = TreeDocNode;

fn node_kind(doc: &TreeDocNode) -> Result<NodeKind> {
    match doc.node_type.as_str() {
        "transform" => Ok(NodeKind::Transform),
        "rotator" => {
            let [x, y, z] = doc
                .axis
                .ok_or_else(|| WebkinError::MalformedTree(format!("{}: rotator missing axis", doc.name)))?;
            Ok(NodeKind::Rotator { axis: Vec3::new(x, y, z) })
        }
        "actuator" => {
            let [x, y, z] = doc
                .axis
                .ok_or_else(|| WebkinError::MalformedTree(format!("{}: actuator missing axis", doc.name)))?;
            Ok(NodeKind::Actuator { axis: Vec3::new(x, y, z) })
        }
        other => Err(WebkinError::MalformedTree(format!("{}: unknown type {:?}", doc.name, other))),
    }
}

/// `Load(doc)`: parse a tree document into an `Arena<KNode>` plus the
/// `joints: name -> NodeId` lookup map (§4.2).
pub fn load(doc: &TreeDocNode) -> Result<KTree> {
    let mut tree = KTree::empty();
    let mut seen = HashSet::new();
    build(doc, None, &mut tree, &mut seen)?;
    Ok(tree)
}

fn build(
    doc: &TreeDocNode,
    parent: Option<super::arena::NodeId>,
    tree: &mut KTree,
    seen: &mut HashSet<String>,
) -> Result<()> {
    if !seen.insert(doc.name.clone()) {
        return Err(WebkinError::DuplicateName(doc.name.clone()));
    }
    let kind = node_kind(doc)?;
    let mut node = KNode::new(doc.name.clone(), kind, Pose::from(&doc.pose), doc.model.clone());
    if let Some(v) = doc.axis_offset {
        node.calibration.axis_offset = v;
    }
    if let Some(v) = doc.axis_scale {
        node.calibration.axis_scale = v;
    }
    if let Some(v) = doc.slider_min {
        node.calibration.slider_min = v;
    }
    if let Some(v) = doc.slider_max {
        node.calibration.slider_max = v;
    }
    let is_joint = node.kind.is_joint();
    let name = node.name.clone();
    let id = tree.arena.create_node(node);
    if let Some(parent_id) = parent {
        tree.arena.set_parent_child(parent_id, id);
    } else {
        tree.root = Some(id);
    }
    if is_joint {
        tree.joints.insert(name, id);
    }
    for child in &doc.children {
        build(child, Some(id), tree, seen)?;
    }
    Ok(())
}

/// `FindOriginalAxisParams(doc, name)`: pure lookup over the original
/// document, used to restore declared values after an override delete
/// (§4.2). Returns `None` if the joint no longer exists in the document.
pub fn find_original_axis_params(doc: &TreeDocNode, name: &str) -> Option<Calibration> {
    if doc.name == name {
        let kind = node_kind(doc).ok()?;
        if !kind.is_joint() {
            return None;
        }
        let mut cal = Calibration::defaults_for(&kind);
        if let Some(v) = doc.axis_offset {
            cal.axis_offset = v;
        }
        if let Some(v) = doc.axis_scale {
            cal.axis_scale = v;
        }
        if let Some(v) = doc.slider_min {
            cal.slider_min = v;
        }
        if let Some(v) = doc.slider_max {
            cal.slider_max = v;
        }
        return Some(cal);
    }
    doc.children.iter().find_map(|c| find_original_axis_params(c, name))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_doc() -> TreeDocNode {
        TreeDocNode {
            name: "root".into(),
            node_type: "transform".into(),
            pose: WirePose { position: [0.0, 0.0, 0.0], orientation: [0.0, 0.0, 0.0, 1.0] },
            axis: None,
            axis_offset: None,
            axis_scale: None,
            slider_min: None,
            slider_max: None,
            model: Value::Null,
            children: vec![TreeDocNode {
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
            }],
        }
    }

    #[test]
    fn load_builds_joint_map() {
        let doc = sample_doc();
        let tree = load(&doc).unwrap();
        assert!(tree.joints.contains_key("J"));
        assert_eq!(tree.arena.len(), 2);
    }

    #[test]
    fn duplicate_names_rejected() {
        let mut doc = sample_doc();
        doc.children.push(doc.children[0].clone());
        assert!(matches!(load(&doc), Err(WebkinError::DuplicateName(_))));
    }

    #[test]
    fn unknown_type_rejected() {
        let mut doc = sample_doc();
        doc.children[0].node_type = "bogus".into();
        assert!(matches!(load(&doc), Err(WebkinError::MalformedTree(_))));
    }

    #[test]
    fn find_original_axis_params_roundtrips_declared_values() {
        let mut doc = sample_doc();
        doc.children[0].axis_offset = Some(0.25);
        let params = find_original_axis_params(&doc, "J").unwrap();
        assert_eq!(params.axis_offset, 0.25);
        assert_eq!(params.axis_scale, 1.0);
    }
}
