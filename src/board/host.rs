//! Detection of the machine this process runs on.
//!
//! Computed once at startup and passed to whoever needs it; nothing here is
//! cached in global state.

use serde::{Deserialize, Serialize};
use std::fs;
use std::net::{IpAddr, Ipv4Addr, UdpSocket};
use sysinfo::System;

/// Daemon host used when nothing better is known.
pub const FALLBACK_LAN_HOST: &str = "192.168.178.67";

/// Host number the development Pi has in the local /24 network.
const LAN_PI_HOST_NUMBER: u8 = 67;

/// Where this process runs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct HostEnvironment {
    /// Running on a Raspberry Pi itself
    pub on_pi: bool,
    /// Board model as reported by the device tree, if any
    pub model: Option<String>,
    /// Host name
    pub hostname: String,
    /// Operating system name
    pub os_name: String,
    /// Primary IPv4 address, if one could be determined
    pub local_ipv4: Option<Ipv4Addr>,
}

impl HostEnvironment {
    /// Inspect the running system.
    pub fn detect() -> Self {
        let model = read_device_tree_model();
        let on_pi = model
            .as_deref()
            .map(|m| m.contains("Raspberry Pi"))
            .unwrap_or(false);

        Self {
            on_pi,
            model,
            hostname: System::host_name().unwrap_or_else(|| "unknown".to_string()),
            os_name: System::name().unwrap_or_else(|| "unknown".to_string()),
            local_ipv4: primary_ipv4(),
        }
    }

    /// An environment for a process running on a Pi.
    pub fn on_pi() -> Self {
        Self {
            on_pi: true,
            model: Some("Raspberry Pi".to_string()),
            hostname: "raspberrypi".to_string(),
            os_name: "Linux".to_string(),
            local_ipv4: None,
        }
    }

    /// An environment for a workstation with the given LAN address.
    pub fn workstation(local_ipv4: Option<Ipv4Addr>) -> Self {
        Self {
            on_pi: false,
            model: None,
            hostname: "workstation".to_string(),
            os_name: "Linux".to_string(),
            local_ipv4,
        }
    }

    /// Default pigpiod host: loopback on the Pi, otherwise the `.67` host of
    /// the local /24 network.
    pub fn default_daemon_host(&self) -> String {
        if self.on_pi {
            return Ipv4Addr::LOCALHOST.to_string();
        }
        match self.local_ipv4 {
            Some(ip) if !ip.is_loopback() && !ip.is_unspecified() => {
                let [a, b, c, _] = ip.octets();
                Ipv4Addr::new(a, b, c, LAN_PI_HOST_NUMBER).to_string()
            }
            _ => FALLBACK_LAN_HOST.to_string(),
        }
    }
}

fn read_device_tree_model() -> Option<String> {
    let raw = fs::read("/proc/device-tree/model").ok()?;
    let model = String::from_utf8_lossy(&raw)
        .trim_end_matches('\0')
        .trim()
        .to_string();
    if model.is_empty() {
        None
    } else {
        Some(model)
    }
}

/// Address of the interface carrying the default route.
///
/// Connecting a UDP socket sends nothing; it only makes the kernel pick a
/// source address.
fn primary_ipv4() -> Option<Ipv4Addr> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).ok()?;
    socket.connect((Ipv4Addr::new(192, 0, 2, 1), 9)).ok()?;
    match socket.local_addr().ok()?.ip() {
        IpAddr::V4(ip) if !ip.is_unspecified() => Some(ip),
        _ => None,
    }
}
