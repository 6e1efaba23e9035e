//! REST handlers (§6). Each handler mutates via the `Coordinator`
//! (which takes the scene lock internally) and returns a small JSON
//! status.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::Json;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::calibration::OverrideParams;
use crate::coordinator::Coordinator;
use crate::error::WebkinError;
use crate::tree::{NodeSnapshot, TreeDoc};

type Coord = State<Arc<Coordinator>>;

/// Maps a `WebkinError` to the `(status, {"error": ...})` shape every
/// handler below returns on failure (§6 status codes, §7 error table).
fn error_response(status: StatusCode, err: WebkinError) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "error": err.to_string() })))
}

pub async fn get_tree(State(coordinator): Coord) -> Json<TreeDoc> {
    Json(coordinator.tree_doc())
}

pub async fn post_tree(
    State(coordinator): Coord,
    Json(doc): Json<TreeDoc>,
) -> (StatusCode, Json<Value>) {
    match coordinator.load_tree(doc) {
        Ok(()) => (StatusCode::OK, Json(json!({ "status": "ok" }))),
        Err(err) => {
            tracing::warn!(error = %err, "malformed tree document, keeping previous tree");
            (StatusCode::BAD_REQUEST, Json(json!({ "error": err.to_string() })))
        }
    }
}

pub async fn get_scene(State(coordinator): Coord) -> Json<IndexMap<String, NodeSnapshot>> {
    Json(coordinator.scene_snapshot())
}

pub async fn post_joints(
    State(coordinator): Coord,
    Json(joints): Json<HashMap<String, f64>>,
) -> (StatusCode, Json<Value>) {
    coordinator.set_joints(&joints);
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

#[derive(Deserialize)]
pub struct JointNameBody {
    pub joint_name: Option<String>,
}

pub async fn post_set_zero(
    State(coordinator): Coord,
    Json(body): Json<JointNameBody>,
) -> (StatusCode, Json<Value>) {
    let Some(name) = body.joint_name else {
        return error_response(StatusCode::BAD_REQUEST, WebkinError::MissingJointName);
    };
    if coordinator.set_zero(&name) {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        error_response(StatusCode::NOT_FOUND, WebkinError::UnknownJoint(name))
    }
}

#[derive(Deserialize)]
pub struct AxisOverrideBody {
    pub joint_name: Option<String>,
    #[serde(flatten)]
    pub params: OverrideParams,
}

pub async fn post_axis_override(
    State(coordinator): Coord,
    Json(body): Json<AxisOverrideBody>,
) -> (StatusCode, Json<Value>) {
    let Some(name) = body.joint_name else {
        return error_response(StatusCode::BAD_REQUEST, WebkinError::MissingJointName);
    };
    if coordinator.set_override(&name, &body.params) {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        error_response(StatusCode::NOT_FOUND, WebkinError::UnknownJoint(name))
    }
}

#[derive(Serialize)]
pub struct OverridesResponse {
    pub overrides: HashMap<String, OverrideParams>,
}

pub async fn get_axis_overrides(State(coordinator): Coord) -> Json<OverridesResponse> {
    Json(OverridesResponse { overrides: coordinator.overrides_snapshot() })
}

pub async fn delete_axis_overrides(State(coordinator): Coord) -> (StatusCode, Json<Value>) {
    coordinator.clear_all_overrides();
    (StatusCode::OK, Json(json!({ "status": "ok" })))
}

pub async fn delete_axis_override_one(
    State(coordinator): Coord,
    Path(name): Path<String>,
) -> (StatusCode, Json<Value>) {
    if coordinator.clear_one_override(&name) {
        (StatusCode::OK, Json(json!({ "status": "ok" })))
    } else {
        error_response(StatusCode::NOT_FOUND, WebkinError::UnknownJoint(name))
    }
}
