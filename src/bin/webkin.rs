//! Process wiring: parse config, init tracing, load the bundle (or fall
//! back to a minimal tree), construct the `Coordinator`, start the
//! configured ingest adapter, serve HTTP/WebSocket, shut down cleanly
//! on SIGINT/SIGTERM (§5, §6).

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use clap::Parser;

use webkin::calibration::CalibrationStore;
use webkin::config::{Config, Transport};
use webkin::coordinator::Coordinator;
use webkin::ingest::crow::{CrowConfig, CrowIngest};
use webkin::ingest::mqtt::{MqttConfig, MqttIngest};
use webkin::ingest::Ingest;

#[tokio::main]
async fn main() {
    let config = Config::parse();

    let filter = if config.debug { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::new(filter))
        .init();

    // `_bundle` is held for the rest of `main` -- its temp directory is
    // tied to this loader instance and is removed on drop (§5).
    let mut _bundle = None;
    let doc = match config.bundle_path() {
        Some(path) => match webkin::bundle::load_bundle(&path) {
            Ok(bundle) => {
                let doc = bundle.doc.clone();
                _bundle = Some(bundle);
                doc
            }
            Err(err) => {
                tracing::warn!(error = %err, "bundle load failed, starting with fallback tree");
                webkin::bundle::fallback_tree_doc()
            }
        },
        None => {
            tracing::warn!("no bundle configured (--k3d / K3D_FILE), starting with fallback tree");
            webkin::bundle::fallback_tree_doc()
        }
    };

    let overrides = CalibrationStore::load(config.overrides_path());
    let coordinator = match Coordinator::new(doc, overrides, config.z_up_effective()) {
        Ok(c) => Arc::new(c),
        Err(err) => {
            // Only an unrecoverable listen-socket bind is fatal (§4.7);
            // a structurally malformed tree document falls back to the
            // same minimal tree a missing/unreadable bundle would.
            tracing::warn!(error = %err, "malformed initial tree document, starting with fallback tree");
            let fallback_overrides = CalibrationStore::load(config.overrides_path());
            match Coordinator::new(webkin::bundle::fallback_tree_doc(), fallback_overrides, config.z_up_effective()) {
                Ok(c) => Arc::new(c),
                Err(err) => {
                    tracing::error!(error = %err, "fallback tree failed to build, this should never happen");
                    std::process::exit(1);
                }
            }
        }
    };

    let ingest: Option<Arc<Mutex<dyn Ingest>>> = match config.transport() {
        Some(Transport::Mqtt) => {
            let mut adapter = MqttIngest::new(MqttConfig {
                broker_host: config.mqtt_broker.clone(),
                broker_port: config.mqtt_port,
                joints_topic: config.joints_topic.clone(),
                tree_topic: config.tree_topic.clone(),
            });
            start_ingest(&mut adapter, coordinator.clone());
            Some(Arc::new(Mutex::new(adapter)))
        }
        Some(Transport::Crow) => {
            let mut adapter = CrowIngest::new(CrowConfig {
                crowker_addr: config.crowker.clone(),
                joints_topic: config.joints_topic.clone(),
                tree_topic: config.tree_topic.clone(),
            });
            start_ingest(&mut adapter, coordinator.clone());
            Some(Arc::new(Mutex::new(adapter)))
        }
        None => {
            tracing::warn!("no transport selected (--mqtt / --crow); server will only reflect REST/WS input");
            None
        }
    };

    let app = webkin::http::router(coordinator.clone());
    let addr = format!("{}:{}", config.host, config.port);
    let listener = match tokio::net::TcpListener::bind(&addr).await {
        Ok(l) => l,
        Err(err) => {
            tracing::error!(error = %err, addr, "failed to bind listening socket");
            std::process::exit(1);
        }
    };
    tracing::info!(addr, "webkin listening");

    let serve = axum::serve(listener, app);
    tokio::select! {
        result = serve => {
            if let Err(err) = result {
                tracing::error!(error = %err, "http server exited with error");
            }
        }
        _ = shutdown_signal() => {
            tracing::info!("shutdown signal received");
        }
    }

    if let Some(ingest) = ingest {
        ingest.lock().unwrap().disconnect();
    }
}

fn start_ingest(adapter: &mut dyn Ingest, coordinator: Arc<Coordinator>) {
    let tree_coordinator = coordinator.clone();
    let on_tree: webkin::ingest::OnTree = Box::new(move |doc| {
        if let Err(err) = tree_coordinator.load_tree(doc) {
            tracing::warn!(error = %err, "malformed tree document from transport, keeping previous tree");
        }
    });
    let joints_coordinator = coordinator;
    let on_joints: webkin::ingest::OnJoints = Box::new(move |joints: HashMap<String, f64>| {
        joints_coordinator.set_joints(&joints);
    });

    if let Err(err) = adapter.init(on_tree, on_joints) {
        tracing::warn!(error = %err, "ingest adapter failed to initialize, continuing without it");
        return;
    }
    if let Err(err) = adapter.connect() {
        tracing::warn!(error = %err, "ingest adapter failed to connect, continuing");
    }
}

async fn shutdown_signal() {
    use tokio::signal;
    let ctrl_c = async {
        signal::ctrl_c().await.ok();
    };
    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler")
            .recv()
            .await;
    };
    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
