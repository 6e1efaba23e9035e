//! webkin: real-time kinematic-tree visualization server.
//!
//! Module map mirrors the dependency order of the design: math kernel,
//! kinematic tree, calibration store, bundle loader, ingest adapters,
//! scene coordinator, HTTP/WebSocket surface.

pub mod bundle;
pub mod calibration;
pub mod config;
pub mod coordinator;
pub mod error;
pub mod http;
pub mod ingest;
pub mod math;
pub mod tree;

pub use coordinator::Coordinator;
pub use error::{Result, WebkinError};
pub use tree::{KTree, TreeDoc};
