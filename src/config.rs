//! CLI flags and environment fallbacks (§6).

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Transport {
    Mqtt,
    Crow,
}

#[derive(Debug, Parser)]
#[command(name = "webkin", about = "Real-time kinematic-tree visualization server")]
pub struct Config {
    #[arg(long, default_value = "0.0.0.0")]
    pub host: String,

    #[arg(long, default_value_t = 8080)]
    pub port: u16,

    #[arg(long)]
    pub z_up: bool,

    /// Path to a bundled scene archive, falls back to `K3D_FILE`.
    #[arg(long, value_name = "path")]
    pub k3d: Option<PathBuf>,

    #[arg(long)]
    pub mqtt: bool,

    #[arg(long)]
    pub crow: bool,

    #[arg(long, default_value = "localhost")]
    pub mqtt_broker: String,

    #[arg(long, default_value_t = 1883)]
    pub mqtt_port: u16,

    #[arg(long, default_value = "webkin/joints")]
    pub joints_topic: String,

    #[arg(long, default_value = "webkin/tree")]
    pub tree_topic: String,

    #[arg(long, default_value = "127.0.0.1:7000")]
    pub crowker: String,

    #[arg(long)]
    pub debug: bool,
}

impl Config {
    pub fn transport(&self) -> Option<Transport> {
        if self.mqtt {
            Some(Transport::Mqtt)
        } else if self.crow {
            Some(Transport::Crow)
        } else {
            None
        }
    }

    /// `K3D_FILE` env var is consulted when `--k3d` is absent.
    pub fn bundle_path(&self) -> Option<PathBuf> {
        self.k3d.clone().or_else(|| std::env::var("K3D_FILE").ok().map(PathBuf::from))
    }

    /// `Z_UP` env var (`"1"`/`"true"`) ORs into `--z-up`.
    pub fn z_up_effective(&self) -> bool {
        self.z_up
            || matches!(
                std::env::var("Z_UP").ok().as_deref(),
                Some("1") | Some("true") | Some("TRUE")
            )
    }

    /// `<config>/webkin/axis_overrides.json`, per `XDG_CONFIG_HOME` or
    /// `HOME`.
    pub fn overrides_path(&self) -> PathBuf {
        let base = std::env::var("XDG_CONFIG_HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".config")
            });
        base.join("webkin").join("axis_overrides.json")
    }
}
