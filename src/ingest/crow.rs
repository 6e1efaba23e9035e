//! Variant B: datagram pub/sub adapter ("Crow") (§4.4).
//!
//! Opens a UDP endpoint, attaches to an executor thread, and creates
//! two subscribers with tunable QoS: the tree topic uses reliable
//! delivery with a keepalive re-subscribe to survive broker restarts;
//! the joint topic uses unreliable delivery because updates are
//! frequent and lossy is acceptable.

use std::net::UdpSocket;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::{Duration, Instant};

use serde::{Deserialize, Serialize};

use super::{Ingest, OnJoints, OnTree};
use crate::error::Result;

const TREE_ACK_PERIOD: Duration = Duration::from_millis(100);
const JOINTS_ACK_PERIOD: Duration = Duration::from_millis(50);
const KEEPALIVE_PERIOD: Duration = Duration::from_secs(2);

#[derive(Clone, Copy, Debug)]
pub enum Qos {
    /// Lossy, no acknowledgement (joint updates: frequent, loss tolerable).
    BestEffort,
    /// Acknowledged, re-subscribed on keepalive (tree: rare, must arrive).
    Reliable,
}

pub struct CrowConfig {
    pub crowker_addr: String,
    pub joints_topic: String,
    pub tree_topic: String,
}

#[derive(Serialize, Deserialize)]
struct Envelope {
    topic: String,
    #[serde(default)]
    payload: serde_json::Value,
}

#[derive(Serialize)]
struct Subscribe<'a> {
    op: &'a str,
    topic: &'a str,
    qos: u8,
    ack_ms: u64,
}

pub struct CrowIngest {
    config: CrowConfig,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    recv_handle: Option<JoinHandle<()>>,
    keepalive_handle: Option<JoinHandle<()>>,
}

impl CrowIngest {
    pub fn new(config: CrowConfig) -> Self {
        CrowIngest {
            config,
            running: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(false)),
            recv_handle: None,
            keepalive_handle: None,
        }
    }

    fn subscribe(socket: &UdpSocket, addr: &str, topic: &str, qos: Qos) {
        let (qos_n, ack_ms) = match qos {
            Qos::Reliable => (1u8, TREE_ACK_PERIOD.as_millis() as u64),
            Qos::BestEffort => (0u8, JOINTS_ACK_PERIOD.as_millis() as u64),
        };
        let msg = Subscribe { op: "subscribe", topic, qos: qos_n, ack_ms };
        if let Ok(bytes) = serde_json::to_vec(&msg) {
            if let Err(err) = socket.send_to(&bytes, addr) {
                tracing::warn!(error = %err, topic, "crow subscribe send failed, continuing");
            }
        }
    }
}

impl Ingest for CrowIngest {
    fn init(&mut self, on_tree: OnTree, on_joints: OnJoints) -> Result<()> {
        let socket = UdpSocket::bind("0.0.0.0:0")?;
        socket.set_read_timeout(Some(Duration::from_millis(200)))?;
        socket.set_nonblocking(false)?;

        let addr = self.config.crowker_addr.clone();
        let tree_topic = self.config.tree_topic.clone();
        let joints_topic = self.config.joints_topic.clone();

        Self::subscribe(&socket, &addr, &tree_topic, Qos::Reliable);
        Self::subscribe(&socket, &addr, &joints_topic, Qos::BestEffort);

        let running = self.running.clone();
        let connected = self.connected.clone();
        running.store(true, Ordering::SeqCst);

        let recv_socket = socket.try_clone()?;
        let recv_tree_topic = tree_topic.clone();
        let recv_joints_topic = joints_topic.clone();
        let recv_running = running.clone();
        let recv_connected = connected.clone();
        self.recv_handle = Some(std::thread::spawn(move || {
            let mut buf = [0u8; 65536];
            while recv_running.load(Ordering::SeqCst) {
                match recv_socket.recv_from(&mut buf) {
                    Ok((len, _peer)) => {
                        recv_connected.store(true, Ordering::SeqCst);
                        match serde_json::from_slice::<Envelope>(&buf[..len]) {
                            Ok(env) if env.topic == recv_tree_topic => {
                                match serde_json::from_value(env.payload) {
                                    Ok(doc) => on_tree(doc),
                                    Err(err) => tracing::warn!(error = %err, "dropping malformed tree payload"),
                                }
                            }
                            Ok(env) if env.topic == recv_joints_topic => {
                                match serde_json::from_value(env.payload) {
                                    Ok(joints) => on_joints(joints),
                                    Err(err) => tracing::warn!(error = %err, "dropping malformed joints payload"),
                                }
                            }
                            Ok(_) => {}
                            Err(err) => tracing::warn!(error = %err, "dropping unparsable crow datagram"),
                        }
                    }
                    Err(ref e) if e.kind() == std::io::ErrorKind::WouldBlock || e.kind() == std::io::ErrorKind::TimedOut => {}
                    Err(err) => {
                        tracing::warn!(error = %err, "crow recv error, continuing");
                    }
                }
            }
        }));

        let keepalive_socket = socket;
        let keepalive_running = running.clone();
        let keepalive_addr = addr;
        self.keepalive_handle = Some(std::thread::spawn(move || {
            let mut last = Instant::now();
            while keepalive_running.load(Ordering::SeqCst) {
                if last.elapsed() >= KEEPALIVE_PERIOD {
                    Self::subscribe(&keepalive_socket, &keepalive_addr, &tree_topic, Qos::Reliable);
                    last = Instant::now();
                }
                std::thread::sleep(Duration::from_millis(50));
            }
        }));

        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        Ok(())
    }

    fn disconnect(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(handle) = self.recv_handle.take() {
            let _ = handle.join();
        }
        if let Some(handle) = self.keepalive_handle.take() {
            let _ = handle.join();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
