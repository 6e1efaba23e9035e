//! The scene coordinator (§4.5): one mutex guards `tree`, `tree_doc`,
//! `overrides`, `clients`, `z_up`. Every mutating operation acquires the
//! lock for its entire duration: apply mutation, re-run forward
//! kinematics, build the outbound message, broadcast.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;

use indexmap::IndexMap;
use serde::Serialize;

use crate::calibration::{CalibrationStore, OverrideParams};
use crate::tree::{self, JointInfo, KTree, NodeSnapshot, TreeDoc};

/// A registered WebSocket client: an id plus a bounded outbound sender.
/// The coordinator never blocks on a slow client (§5: "sends must be
/// non-blocking or bounded").
pub struct ConnectionHandle {
    pub id: u64,
    sender: tokio::sync::mpsc::UnboundedSender<String>,
}

impl ConnectionHandle {
    fn send(&self, frame: &str) {
        // An unbounded channel never blocks the critical section; a
        // disconnected receiver simply drops the frame, and the HTTP
        // runtime's connection task removes the dead handle on its own
        // next send failure (§4.5, §4.7).
        let _ = self.sender.send(frame.to_string());
    }
}

#[derive(Serialize)]
#[serde(tag = "type")]
enum SceneFrame<'a> {
    #[serde(rename = "scene_init")]
    Init {
        nodes: &'a IndexMap<String, NodeSnapshot>,
        joints: Vec<String>,
        #[serde(rename = "jointsInfo")]
        joints_info: &'a HashMap<String, JointInfo>,
        #[serde(rename = "zUp")]
        z_up: bool,
    },
    #[serde(rename = "scene_update")]
    Update {
        nodes: &'a IndexMap<String, NodeSnapshot>,
        #[serde(rename = "jointsInfo")]
        joints_info: &'a HashMap<String, JointInfo>,
    },
}

struct SceneState {
    tree: KTree,
    tree_doc: TreeDoc,
    overrides: CalibrationStore,
    clients: HashMap<u64, ConnectionHandle>,
    z_up: bool,
}

/// Single entry point holding the authoritative mutable state (§4.5).
pub struct Coordinator {
    state: Mutex<SceneState>,
    next_client_id: AtomicU64,
}

impl Coordinator {
    pub fn new(doc: TreeDoc, overrides: CalibrationStore, z_up: bool) -> crate::error::Result<Self> {
        let mut tree = tree::load(&doc)?;
        overrides.apply_to(&mut tree);
        tree.update_forward();
        Ok(Coordinator {
            state: Mutex::new(SceneState { tree, tree_doc: doc, overrides, clients: HashMap::new(), z_up }),
            next_client_id: AtomicU64::new(0),
        })
    }

    /// Replaces the tree under the lock (`LoadTree`): rebuilds the
    /// joint map and applies known overrides before the first forward
    /// pass (§3 Lifecycle), then broadcasts `scene_init` to everyone,
    /// including already-connected clients.
    pub fn load_tree(&self, doc: TreeDoc) -> crate::error::Result<()> {
        let mut state = self.state.lock().unwrap();
        let mut tree = tree::load(&doc)?;
        state.overrides.apply_to(&mut tree);
        tree.update_forward();
        state.tree = tree;
        state.tree_doc = doc;
        Self::broadcast_init(&state);
        Ok(())
    }

    /// `SetJointCoords` followed by a forward pass and a `scene_update`
    /// broadcast (§4.5).
    pub fn set_joints(&self, joints: &HashMap<String, f64>) {
        let mut state = self.state.lock().unwrap();
        state.tree.set_joint_coords(joints);
        state.tree.update_forward();
        Self::broadcast_update(&state);
    }

    pub fn set_zero(&self, name: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.tree.joint_id(name).is_none() {
            return false;
        }
        let (tree, overrides) = (&mut state.tree, &mut state.overrides);
        overrides.set_zero(tree, name);
        state.tree.update_forward();
        Self::broadcast_update(&state);
        true
    }

    pub fn set_override(&self, name: &str, patch: &OverrideParams) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.tree.joint_id(name).is_none() {
            return false;
        }
        let (tree, overrides) = (&mut state.tree, &mut state.overrides);
        overrides.set_override(tree, name, patch);
        state.tree.update_forward();
        Self::broadcast_update(&state);
        true
    }

    pub fn clear_all_overrides(&self) {
        let mut state = self.state.lock().unwrap();
        let doc = state.tree_doc.clone();
        let (tree, overrides) = (&mut state.tree, &mut state.overrides);
        overrides.clear_all(tree, &doc);
        state.tree.update_forward();
        Self::broadcast_update(&state);
    }

    pub fn clear_one_override(&self, name: &str) -> bool {
        let mut state = self.state.lock().unwrap();
        if state.tree.joint_id(name).is_none() {
            return false;
        }
        let doc = state.tree_doc.clone();
        let (tree, overrides) = (&mut state.tree, &mut state.overrides);
        overrides.clear_one(tree, &doc, name);
        state.tree.update_forward();
        Self::broadcast_update(&state);
        true
    }

    pub fn overrides_snapshot(&self) -> HashMap<String, OverrideParams> {
        self.state.lock().unwrap().overrides.overrides().clone()
    }

    pub fn tree_doc(&self) -> TreeDoc {
        self.state.lock().unwrap().tree_doc.clone()
    }

    pub fn scene_snapshot(&self) -> IndexMap<String, NodeSnapshot> {
        self.state.lock().unwrap().tree.scene_snapshot()
    }

    /// Registers a client and sends it `scene_init` reflecting whatever
    /// state is current at the moment the lock is acquired -- never a
    /// torn intermediate state (§5 "Ordering guarantees").
    pub fn register_client(&self, sender: tokio::sync::mpsc::UnboundedSender<String>) -> u64 {
        let id = self.next_client_id.fetch_add(1, Ordering::SeqCst);
        let mut state = self.state.lock().unwrap();
        let handle = ConnectionHandle { id, sender };
        let frame = Self::init_frame(&state);
        handle.send(&frame);
        state.clients.insert(id, handle);
        id
    }

    pub fn unregister_client(&self, id: u64) {
        self.state.lock().unwrap().clients.remove(&id);
    }

    fn init_frame(state: &SceneState) -> String {
        let nodes = state.tree.scene_snapshot();
        let joints_info = state.tree.joints_info();
        let frame = SceneFrame::Init {
            nodes: &nodes,
            joints: state.tree.joint_names(),
            joints_info: &joints_info,
            z_up: state.z_up,
        };
        serde_json::to_string(&frame).unwrap_or_default()
    }

    fn broadcast_init(state: &SceneState) {
        let frame = Self::init_frame(state);
        for client in state.clients.values() {
            client.send(&frame);
        }
    }

    fn broadcast_update(state: &SceneState) {
        let nodes = state.tree.scene_snapshot();
        let joints_info = state.tree.joints_info();
        let frame = SceneFrame::Update { nodes: &nodes, joints_info: &joints_info };
        let Ok(text) = serde_json::to_string(&frame) else { return };
        for client in state.clients.values() {
            client.send(&text);
        }
    }
}
