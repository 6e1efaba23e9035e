//! Two transports, one contract (§4.4, §9).

pub mod crow;
pub mod mqtt;

use std::collections::HashMap;

use crate::error::Result;
use crate::tree::TreeDoc;

/// Invoked on a dedicated transport thread whenever a fresh tree
/// document arrives.
pub type OnTree = Box<dyn Fn(TreeDoc) + Send + Sync>;

/// Invoked on a dedicated transport thread whenever joint coordinates
/// arrive. The coordinator's callbacks take the scene lock themselves
/// (§4.4: "must be re-entrant-safe").
pub type OnJoints = Box<dyn Fn(HashMap<String, f64>) + Send + Sync>;

/// Uniform adapter contract implemented by both the MQTT and Crow
/// transports (§4.4).
pub trait Ingest: Send {
    fn init(&mut self, on_tree: OnTree, on_joints: OnJoints) -> Result<()>;
    fn connect(&mut self) -> Result<()>;
    fn disconnect(&mut self);
    fn is_connected(&self) -> bool;
}
