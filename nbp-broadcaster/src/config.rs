//! Construction parameters for broadcasters

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Identity and pacing shared by every transport
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BroadcasterConfig {
    /// Name announced by METADATA packets
    pub device_name: String,

    /// First header field of every KPI packet
    pub protocol_version: String,

    /// Minimum gap between throttled sends (seconds)
    pub min_update_interval_s: f64,
}

impl Default for BroadcasterConfig {
    fn default() -> Self {
        Self {
            device_name: "NbpDevice".to_string(),
            protocol_version: "NBP1".to_string(),
            min_update_interval_s: 0.2,
        }
    }
}

impl BroadcasterConfig {
    pub fn min_update_interval(&self) -> Duration {
        Duration::try_from_secs_f64(self.min_update_interval_s).unwrap_or(Duration::ZERO)
    }
}

/// Transport-specific addressing
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum TransportConfig {
    Serial(SerialConfig),
    Tcp(TcpConfig),
    Bluetooth(BluetoothConfig),
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct SerialConfig {
    pub device: String,
    pub baud_rate: u32,
    pub timeout_ms: u64,
}

impl Default for SerialConfig {
    fn default() -> Self {
        Self {
            device: "/dev/rfcomm0".to_string(),
            baud_rate: 115200,
            timeout_ms: 100,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TcpConfig {
    pub bind: String,
    pub port: u16,
    /// Bounded wait for a pending client per iteration
    pub accept_timeout_ms: u64,
}

impl Default for TcpConfig {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1".to_string(),
            port: 35000,
            accept_timeout_ms: 1000,
        }
    }
}

impl TcpConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.bind, self.port)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct BluetoothConfig {
    pub service_uuid: String,
    /// Advertised service name (None = device name)
    pub service_name: Option<String>,
    /// RFCOMM channel (None = any free channel)
    pub channel: Option<u16>,
    pub accept_timeout_ms: u64,
}

impl Default for BluetoothConfig {
    fn default() -> Self {
        Self {
            service_uuid: "94f39d29-7d6d-437d-973b-fba39e49d4ee".to_string(),
            service_name: None,
            channel: None,
            accept_timeout_ms: 1000,
        }
    }
}

impl TransportConfig {
    pub fn label(&self) -> String {
        match self {
            TransportConfig::Serial(c) => format!("serial {}", c.device),
            TransportConfig::Tcp(c) => format!("tcp {}", c.address()),
            TransportConfig::Bluetooth(c) => format!("bluetooth {}", c.service_uuid),
        }
    }
}
