//! Node variants and the per-joint calibration math (§3, §4.2).

use serde_json::Value;

use crate::math::{Pose, Quat, Vec3};

/// The closed set of node variants (§3). A tagged union with one
/// `joint_transform` discriminator, per §9's design note, rather than
/// inheritance.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeKind {
    Transform,
    Rotator { axis: Vec3 },
    Actuator { axis: Vec3 },
}

impl NodeKind {
    pub fn type_tag(&self) -> &'static str {
        match self {
            NodeKind::Transform => "transform",
            NodeKind::Rotator { .. } => "rotator",
            NodeKind::Actuator { .. } => "actuator",
        }
    }

    pub fn is_joint(&self) -> bool {
        !matches!(self, NodeKind::Transform)
    }

    fn default_slider_min(&self) -> f64 {
        match self {
            NodeKind::Rotator { .. } => -180.0,
            NodeKind::Actuator { .. } => -1000.0,
            NodeKind::Transform => 0.0,
        }
    }

    fn default_slider_max(&self) -> f64 {
        match self {
            NodeKind::Rotator { .. } => 180.0,
            NodeKind::Actuator { .. } => 1000.0,
            NodeKind::Transform => 0.0,
        }
    }
}

/// Calibration parameters carried by joint nodes; ignored by
/// `Transform` nodes (§3).
#[derive(Debug, Clone, PartialEq)]
pub struct Calibration {
    pub coord: f64,
    pub axis_offset: f64,
    pub axis_scale: f64,
    pub slider_min: f64,
    pub slider_max: f64,
}

impl Calibration {
    pub fn defaults_for(kind: &NodeKind) -> Self {
        Calibration {
            coord: 0.0,
            axis_offset: 0.0,
            axis_scale: 1.0,
            slider_min: kind.default_slider_min(),
            slider_max: kind.default_slider_max(),
        }
    }

    /// `theta_eff = (coord + axis_offset) * axis_scale` (§3).
    pub fn effective(&self) -> f64 {
        (self.coord + self.axis_offset) * self.axis_scale
    }
}

#[derive(Debug, Clone)]
pub struct KNode {
    pub name: String,
    pub kind: NodeKind,
    pub local_pose: Pose,
    pub model: Value,
    pub calibration: Calibration,
    /// Forward-pass output; valid only after `UpdateForward` completes
    /// (§3 tree invariant 4).
    pub global_pose: Pose,
}

impl KNode {
    pub fn new(name: String, kind: NodeKind, local_pose: Pose, model: Value) -> Self {
        let calibration = Calibration::defaults_for(&kind);
        KNode { name, kind, local_pose, model, calibration, global_pose: Pose::IDENTITY }
    }

    /// The joint's own contribution, identity for non-joint nodes (§3).
    pub fn joint_transform(&self) -> Pose {
        match &self.kind {
            NodeKind::Transform => Pose::IDENTITY,
            NodeKind::Rotator { axis } => {
                Pose::new(Vec3::ZERO, Quat::from_axis_angle(*axis, self.calibration.effective()))
            }
            NodeKind::Actuator { axis } => {
                Pose::new(*axis * self.calibration.effective(), Quat::IDENTITY)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn effective_value_is_offset_then_scale() {
        let mut cal = Calibration::defaults_for(&NodeKind::Rotator { axis: Vec3::new(0.0, 0.0, 1.0) });
        cal.coord = 1.0;
        cal.axis_offset = 0.5;
        cal.axis_scale = 2.0;
        assert_eq!(cal.effective(), 3.0);
    }

    #[test]
    fn non_joint_defaults_are_zero() {
        let cal = Calibration::defaults_for(&NodeKind::Transform);
        assert_eq!(cal.slider_min, 0.0);
        assert_eq!(cal.slider_max, 0.0);
    }
}
