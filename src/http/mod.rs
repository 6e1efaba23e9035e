//! HTTP/WebSocket surface (§4.6): REST endpoints, client registry, and
//! broadcast. Framing, TLS, and static-asset serving are `HttpRuntime`
//! concerns (§1); this module is the thin real integration over axum
//! that routes §6's endpoint table onto the `Coordinator`.

pub mod rest;
pub mod ws;

use std::sync::Arc;

use axum::routing::{delete, get, post};
use axum::Router;

use crate::coordinator::Coordinator;

pub fn router(coordinator: Arc<Coordinator>) -> Router {
    Router::new()
        .route("/api/tree", get(rest::get_tree).post(rest::post_tree))
        .route("/api/scene", get(rest::get_scene))
        .route("/api/joints", post(rest::post_joints))
        .route("/api/offset/set_zero", post(rest::post_set_zero))
        .route("/api/axis/override", post(rest::post_axis_override))
        .route("/api/axis/overrides", get(rest::get_axis_overrides).delete(rest::delete_axis_overrides))
        .route("/api/axis/overrides/{name}", delete(rest::delete_axis_override_one))
        .route("/ws", get(ws::ws_handler))
        .with_state(coordinator)
}
