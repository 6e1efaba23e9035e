//! Variant A: topic broker adapter (§4.4).
//!
//! Subscribes to both topics on one connection; dispatch by topic
//! equality. The background loop polls the broker until `disconnect()`
//! clears the running flag, which then joins the thread. Connection
//! failure is non-fatal: log and continue (§4.4, §4.7).

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use rumqttc::{Client, Event, MqttOptions, Packet, QoS};

use super::{Ingest, OnJoints, OnTree};
use crate::error::Result;

pub struct MqttConfig {
    pub broker_host: String,
    pub broker_port: u16,
    pub joints_topic: String,
    pub tree_topic: String,
}

pub struct MqttIngest {
    config: MqttConfig,
    client: Option<Client>,
    running: Arc<AtomicBool>,
    connected: Arc<AtomicBool>,
    handle: Option<JoinHandle<()>>,
}

impl MqttIngest {
    pub fn new(config: MqttConfig) -> Self {
        MqttIngest {
            config,
            client: None,
            running: Arc::new(AtomicBool::new(false)),
            connected: Arc::new(AtomicBool::new(false)),
            handle: None,
        }
    }
}

impl Ingest for MqttIngest {
    fn init(&mut self, on_tree: OnTree, on_joints: OnJoints) -> Result<()> {
        let mut options =
            MqttOptions::new("webkin", self.config.broker_host.clone(), self.config.broker_port);
        options.set_keep_alive(Duration::from_secs(5));
        let (client, mut connection) = Client::new(options, 64);

        if let Err(err) = client.subscribe(&self.config.tree_topic, QoS::AtLeastOnce) {
            tracing::warn!(error = %err, "mqtt subscribe to tree topic failed, continuing");
        }
        if let Err(err) = client.subscribe(&self.config.joints_topic, QoS::AtMostOnce) {
            tracing::warn!(error = %err, "mqtt subscribe to joints topic failed, continuing");
        }

        let running = self.running.clone();
        let connected = self.connected.clone();
        let tree_topic = self.config.tree_topic.clone();
        let joints_topic = self.config.joints_topic.clone();
        running.store(true, Ordering::SeqCst);

        self.handle = Some(std::thread::spawn(move || {
            for notification in connection.iter() {
                if !running.load(Ordering::SeqCst) {
                    break;
                }
                match notification {
                    Ok(Event::Incoming(Packet::ConnAck(_))) => {
                        connected.store(true, Ordering::SeqCst);
                        tracing::info!("mqtt connected");
                    }
                    Ok(Event::Incoming(Packet::Publish(publish))) => {
                        if publish.topic == tree_topic {
                            match serde_json::from_slice(&publish.payload) {
                                Ok(doc) => on_tree(doc),
                                Err(err) => {
                                    tracing::warn!(error = %err, "dropping malformed tree payload")
                                }
                            }
                        } else if publish.topic == joints_topic {
                            match serde_json::from_slice(&publish.payload) {
                                Ok(joints) => on_joints(joints),
                                Err(err) => {
                                    tracing::warn!(error = %err, "dropping malformed joints payload")
                                }
                            }
                        }
                    }
                    Ok(_) => {}
                    Err(err) => {
                        connected.store(false, Ordering::SeqCst);
                        tracing::warn!(error = %err, "mqtt connection error, continuing");
                    }
                }
            }
        }));

        self.client = Some(client);
        Ok(())
    }

    fn connect(&mut self) -> Result<()> {
        // The background loop drives the actual connect/reconnect cycle;
        // reaching here with `init` already called means the subscription
        // request is in flight.
        Ok(())
    }

    fn disconnect(&mut self) {
        self.running.store(false, Ordering::SeqCst);
        if let Some(client) = self.client.take() {
            let _ = client.disconnect();
        }
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
        self.connected.store(false, Ordering::SeqCst);
    }

    fn is_connected(&self) -> bool {
        self.connected.load(Ordering::SeqCst)
    }
}
