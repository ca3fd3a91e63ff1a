//! Numeric Broadcast Protocol (NBP) KPI broadcaster
//!
//! Producers push [`Snapshot`]s of named telemetry values into a queue. One
//! broadcaster per transport merges them into a latest-value store and
//! periodically writes the state to the single connected consumer, throttled
//! to a minimum update interval.
//!
//! # Features
//!
//! - Line-oriented text protocol (`*NBP1,UPDATE,<ts>` ... `#`)
//! - Dirty tracking: UPDATE packets carry only what changed since the last send
//! - Consumer can ask for the full state at any time with `!ALL`
//! - Transports: TCP server, serial device, Bluetooth RFCOMM (feature `bluetooth`)
//! - Automatic reconnect; state survives disconnects
//!
//! # Packet Types
//!
//! - `ALL` - every known KPI
//! - `UPDATE` - KPIs changed since the last send (full set if none)
//! - `METADATA` - `@NAME:<device>` announcement
//!
//! # Example Usage
//!
//! ```no_run
//! use nbp_broadcaster::{start, BroadcasterConfig, Kpi, Snapshot, TcpConfig, TransportConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = BroadcasterConfig::default();
//!     let handle = start(&config, &TransportConfig::Tcp(TcpConfig::default())).await?;
//!
//!     handle.send(Snapshot::metadata(0.0))?;
//!     handle.send(Snapshot::update(
//!         0.1,
//!         vec![Kpi::with_unit("RPM", "rpm", 3000), Kpi::new("Gear", 3)],
//!     ))?;
//!
//!     handle.close().await;
//!     Ok(())
//! }
//! ```

pub mod broadcaster;
pub mod config;
pub mod driver;
pub mod error;
pub mod kpi;
pub mod packet;
pub mod store;
pub mod throttle;
pub mod transport;

// Re-exports
pub use broadcaster::{start, BroadcasterHandle, NbpBroadcaster};
pub use config::{BluetoothConfig, BroadcasterConfig, SerialConfig, TcpConfig, TransportConfig};
pub use driver::{ConnectionDriver, DriveReport, LinkState};
pub use error::{BroadcasterError, Result};
pub use kpi::{DeviceIdentity, Kpi, KpiValue, PacketKind, Snapshot};
pub use store::KpiStore;
pub use throttle::Throttle;
