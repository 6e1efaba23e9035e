//! The kinematic tree engine (§4.2).

pub mod arena;
pub mod doc;
pub mod node;

use std::collections::HashMap;

use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;

use arena::{Arena, NodeId};
use node::{Calibration, KNode};

pub use doc::{find_original_axis_params, load, TreeDoc, TreeDocNode};
pub use node::NodeKind;

/// Per-node pose+model pair sent to clients (§6 `scene_init`/
/// `scene_update` `nodes` map).
#[derive(Debug, Clone, Serialize)]
pub struct NodeSnapshot {
    pub pose: WirePoseOut,
    pub model: Value,
}

#[derive(Debug, Clone, Serialize)]
pub struct WirePoseOut {
    pub position: [f64; 3],
    pub orientation: [f64; 4],
}

impl From<crate::math::Pose> for WirePoseOut {
    fn from(p: crate::math::Pose) -> Self {
        WirePoseOut {
            position: [p.position.x, p.position.y, p.position.z],
            orientation: [p.orientation.x, p.orientation.y, p.orientation.z, p.orientation.w],
        }
    }
}

/// Per-joint info sent to clients (§6 `jointsInfo`).
#[derive(Debug, Clone, Serialize)]
pub struct JointInfo {
    #[serde(rename = "type")]
    pub type_tag: &'static str,
    pub slider_min: f64,
    pub slider_max: f64,
    pub axis_scale: f64,
    pub axis_offset: f64,
}

/// The authoritative kinematic tree: an arena of `KNode` plus a
/// `name -> NodeId` joint lookup map (§4.2, §9).
#[derive(Debug)]
pub struct KTree {
    pub(crate) arena: Arena<KNode>,
    pub(crate) root: Option<NodeId>,
    pub(crate) joints: HashMap<String, NodeId>,
}

impl KTree {
    pub(crate) fn empty() -> Self {
        KTree { arena: Arena::new(), root: None, joints: HashMap::new() }
    }

    pub fn node(&self, id: NodeId) -> &KNode {
        self.arena.get(id)
    }

    pub fn root_id(&self) -> Option<NodeId> {
        self.root
    }

    pub fn joint_id(&self, name: &str) -> Option<NodeId> {
        self.joints.get(name).copied()
    }

    pub fn joint_names(&self) -> Vec<String> {
        self.joints.keys().cloned().collect()
    }

    /// `SetJointCoord`: unknown names are silently ignored (§4.2).
    pub fn set_joint_coord(&mut self, name: &str, value: f64) {
        if let Some(&id) = self.joints.get(name) {
            self.arena.get_mut(id).data.calibration.coord = value;
        }
    }

    /// `SetJointCoords`: batched form of `set_joint_coord` (§4.2).
    pub fn set_joint_coords(&mut self, values: &HashMap<String, f64>) {
        for (name, value) in values {
            self.set_joint_coord(name, *value);
        }
    }

    /// `UpdateForward`: one recursive descent from root, writing
    /// `global_pose` on every node in child-order (§4.2, §3 invariant 4).
    pub fn update_forward(&mut self) {
        let Some(root) = self.root else { return };
        let mut order = Vec::new();
        self.arena.walk_preorder(root, |id| order.push(id));
        for id in order {
            let parent_pose = match self.arena.get(id).parent {
                Some(p) => self.arena.get(p).data.global_pose,
                None => crate::math::Pose::IDENTITY,
            };
            let node = &mut self.arena.get_mut(id).data;
            node.global_pose = parent_pose.compose(node.local_pose).compose(node.joint_transform());
        }
    }

    /// `SceneSnapshot`: `{name -> {pose, model}}` for every node, in
    /// traversal order (§4.2). An `IndexMap` is used rather than a
    /// `HashMap` because key order here is user-meaningful (§4.2,
    /// scenario S4) and `serde_json` would otherwise serialize a
    /// `HashMap` in hash-bucket order, not insertion order.
    pub fn scene_snapshot(&self) -> IndexMap<String, NodeSnapshot> {
        let Some(root) = self.root else { return IndexMap::new() };
        let mut out = IndexMap::with_capacity(self.arena.len());
        self.arena.walk_preorder(root, |id| {
            let node = &self.arena.get(id).data;
            out.insert(
                node.name.clone(),
                NodeSnapshot { pose: node.global_pose.into(), model: node.model.clone() },
            );
        });
        out
    }

    /// `JointsInfo`: `{name -> {type, slider_min, slider_max, axis_scale,
    /// axis_offset}}` for every joint (§4.2).
    pub fn joints_info(&self) -> HashMap<String, JointInfo> {
        self.joints
            .iter()
            .map(|(name, &id)| {
                let node = &self.arena.get(id).data;
                let cal = &node.calibration;
                (
                    name.clone(),
                    JointInfo {
                        type_tag: node.kind.type_tag(),
                        slider_min: cal.slider_min,
                        slider_max: cal.slider_max,
                        axis_scale: cal.axis_scale,
                        axis_offset: cal.axis_offset,
                    },
                )
            })
            .collect()
    }

    /// Applies a full calibration record to the named joint; used by
    /// the calibration store (unknown names ignored by the caller's
    /// lookup, mirroring `set_joint_coord`).
    pub fn apply_calibration(&mut self, name: &str, cal: &Calibration) {
        if let Some(&id) = self.joints.get(name) {
            let current = &mut self.arena.get_mut(id).data.calibration;
            current.axis_offset = cal.axis_offset;
            current.axis_scale = cal.axis_scale;
            current.slider_min = cal.slider_min;
            current.slider_max = cal.slider_max;
        }
    }

    pub fn coord_of(&self, name: &str) -> Option<f64> {
        self.joints.get(name).map(|&id| self.arena.get(id).data.calibration.coord)
    }
}
