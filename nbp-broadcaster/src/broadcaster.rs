use std::time::Duration;
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};
use tokio::task::JoinHandle;

use crate::config::{BroadcasterConfig, TransportConfig};
use crate::driver::{ConnectionDriver, DriveContext, DriveReport, LinkState};
use crate::error::{BroadcasterError, Result};
use crate::kpi::{DeviceIdentity, Snapshot};
use crate::store::KpiStore;
use crate::throttle::Throttle;
use crate::transport::{SerialTransport, TcpTransport, Transport};

/// Queue-driven KPI broadcaster for one transport.
///
/// Owns its store and throttle; only the task running [`NbpBroadcaster::run`]
/// touches them.
pub struct NbpBroadcaster<T: Transport> {
    identity: DeviceIdentity,
    store: KpiStore,
    throttle: Throttle,
    packet_time: f64,
    driver: ConnectionDriver<T>,
}

impl<T: Transport> NbpBroadcaster<T> {
    pub fn new(config: &BroadcasterConfig, transport: T) -> Self {
        Self {
            identity: DeviceIdentity::new(&config.device_name, &config.protocol_version),
            store: KpiStore::new(),
            throttle: Throttle::new(config.min_update_interval()),
            packet_time: 0.0,
            driver: ConnectionDriver::new(transport),
        }
    }

    /// Merge one snapshot and run one connection iteration with its kind
    pub async fn process(&mut self, snapshot: Snapshot) -> DriveReport {
        self.store.merge(&snapshot);
        self.packet_time = snapshot.timestamp;

        let ctx = DriveContext {
            identity: &self.identity,
            store: &mut self.store,
            throttle: &mut self.throttle,
            timestamp: self.packet_time,
            kind: &snapshot.kind,
        };
        self.driver.drive(ctx).await
    }

    /// Consume snapshots until every sender is dropped
    pub async fn run(mut self, mut queue: UnboundedReceiver<Snapshot>) {
        tracing::info!(
            "Broadcaster '{}' started on {}",
            self.identity.device_name,
            self.driver.transport().describe()
        );

        while let Some(snapshot) = queue.recv().await {
            self.process(snapshot).await;
        }

        self.driver.disconnect().await;
        tracing::info!("Broadcaster queue closed, {} stopped", self.driver.transport().describe());
    }

    pub fn store(&self) -> &KpiStore {
        &self.store
    }

    pub fn link_state(&self) -> LinkState {
        self.driver.state()
    }

    pub fn identity(&self) -> &DeviceIdentity {
        &self.identity
    }
}

impl<T> NbpBroadcaster<T>
where
    T: Transport + 'static,
{
    /// Start the loop on its own task
    pub fn spawn(self) -> BroadcasterHandle {
        let (sender, queue) = mpsc::unbounded_channel();
        let task = tokio::spawn(self.run(queue));
        BroadcasterHandle { sender, task }
    }
}

/// Producer side of a running broadcaster
pub struct BroadcasterHandle {
    sender: UnboundedSender<Snapshot>,
    task: JoinHandle<()>,
}

impl BroadcasterHandle {
    /// Enqueue a snapshot; never blocks
    pub fn send(&self, snapshot: Snapshot) -> Result<()> {
        self.sender.send(snapshot).map_err(|_| BroadcasterError::QueueClosed)
    }

    /// Extra producer endpoint, usable from any thread
    pub fn sender(&self) -> UnboundedSender<Snapshot> {
        self.sender.clone()
    }

    pub fn is_finished(&self) -> bool {
        self.task.is_finished()
    }

    /// Close the queue and wait for the loop to drain it
    pub async fn close(self) {
        let Self { sender, task } = self;
        drop(sender);
        if let Err(e) = task.await {
            tracing::error!("Broadcaster task failed: {}", e);
        }
    }

    /// Stop immediately, dropping queued snapshots
    pub async fn shutdown(self) {
        self.task.abort();
        if let Err(e) = self.task.await {
            if !e.is_cancelled() {
                tracing::error!("Broadcaster task failed: {}", e);
            }
        }
    }
}

/// Build the configured transport and spawn a broadcaster on it
pub async fn start(config: &BroadcasterConfig, transport: &TransportConfig) -> Result<BroadcasterHandle> {
    match transport {
        TransportConfig::Tcp(tcp) => {
            let transport =
                TcpTransport::bind(&tcp.address(), Duration::from_millis(tcp.accept_timeout_ms)).await?;
            Ok(NbpBroadcaster::new(config, transport).spawn())
        }
        TransportConfig::Serial(serial) => {
            let transport = SerialTransport::new(&serial.device, serial.baud_rate)
                .with_timeout(Duration::from_millis(serial.timeout_ms));
            Ok(NbpBroadcaster::new(config, transport).spawn())
        }
        #[cfg(all(feature = "bluetooth", target_os = "linux"))]
        TransportConfig::Bluetooth(bt) => {
            let name = bt.service_name.as_deref().unwrap_or(&config.device_name);
            let transport = crate::transport::BluetoothTransport::register(
                &bt.service_uuid,
                name,
                bt.channel,
                Duration::from_millis(bt.accept_timeout_ms),
            )
            .await?;
            Ok(NbpBroadcaster::new(config, transport).spawn())
        }
        #[cfg(not(all(feature = "bluetooth", target_os = "linux")))]
        TransportConfig::Bluetooth(_) => Err(BroadcasterError::invalid_config(
            "bluetooth transport requires the `bluetooth` feature on Linux",
        )),
    }
}
