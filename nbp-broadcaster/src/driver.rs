//! Connection lifecycle shared by every transport
//!
//! ```text
//! Disconnected --accept--> Connected --I/O failure--> Disconnected
//! ```
//!
//! Each call to [`ConnectionDriver::drive`] performs one iteration: connect
//! if needed, answer a pending `!ALL`, then attempt one throttled send.
//!
//! A session opened after an earlier one ended starts out of sync: its first
//! UPDATE goes out as a full ALL packet.

use tokio::time::Instant;

use crate::error::{BroadcasterError, Result};
use crate::kpi::{DeviceIdentity, PacketKind};
use crate::packet::{build_packet, is_request_all};
use crate::store::KpiStore;
use crate::throttle::Throttle;
use crate::transport::{Connection, Transport};

/// Externally visible connection state
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LinkState {
    Disconnected,
    Connected,
}

/// Everything one iteration reads or updates besides the connection
pub struct DriveContext<'a> {
    pub identity: &'a DeviceIdentity,
    pub store: &'a mut KpiStore,
    pub throttle: &'a mut Throttle,
    pub timestamp: f64,
    pub kind: &'a PacketKind,
}

/// What happened during one iteration
#[derive(Debug, Default)]
pub struct DriveReport {
    /// Session was established during this iteration
    pub connected: bool,
    pub answered_request: bool,
    pub sent: Option<PacketKind>,
    /// The gate was closed, nothing was attempted
    pub throttled: bool,
    pub fault: Option<BroadcasterError>,
}

/// Owns the transport and the current session, if any
pub struct ConnectionDriver<T: Transport> {
    transport: T,
    connection: Option<T::Connection>,
    /// Consumer has not seen the full state since the last session ended
    resync: bool,
}

impl<T: Transport> ConnectionDriver<T> {
    pub fn new(transport: T) -> Self {
        Self {
            transport,
            connection: None,
            resync: false,
        }
    }

    pub fn state(&self) -> LinkState {
        if self.connection.is_some() {
            LinkState::Connected
        } else {
            LinkState::Disconnected
        }
    }

    pub fn is_connected(&self) -> bool {
        self.connection.is_some()
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    /// Run one lifecycle iteration. Errors never escape; they are logged and
    /// reported in the returned [`DriveReport`].
    pub async fn drive(&mut self, ctx: DriveContext<'_>) -> DriveReport {
        let mut report = DriveReport::default();

        if self.connection.is_none() {
            match self.connect().await {
                Ok(()) => report.connected = true,
                Err(e) => {
                    report.fault = Some(e);
                    return report;
                }
            }
        }

        if let Err(e) = self.serve(ctx, &mut report).await {
            if e.is_io_failure() {
                tracing::warn!("{} I/O failure, closing connection: {}", self.transport.describe(), e);
                self.disconnect().await;
            } else {
                tracing::warn!("{}", e);
            }
            report.fault = Some(e);
        }

        report
    }

    async fn connect(&mut self) -> Result<()> {
        tracing::trace!("{} waiting for connection", self.transport.describe());

        match self.transport.accept().await {
            Ok(conn) => {
                tracing::info!("Connection from {} open", conn.peer());
                self.connection = Some(conn);
                Ok(())
            }
            Err(e) if e.is_transient() => {
                tracing::debug!("{} not connected - waiting for connection ({})", self.transport.describe(), e);
                Err(e)
            }
            Err(e) => {
                tracing::warn!("{} accept failed: {}", self.transport.describe(), e);
                Err(e)
            }
        }
    }

    async fn serve(&mut self, ctx: DriveContext<'_>, report: &mut DriveReport) -> Result<()> {
        let Some(conn) = self.connection.as_mut() else {
            return Ok(());
        };

        if !conn.is_ready() {
            return Err(BroadcasterError::ConnectionClosed);
        }

        if let Some(inbound) = conn.read_nonblocking().await? {
            tracing::debug!("Received from {}: {}", conn.peer(), String::from_utf8_lossy(&inbound).trim());

            if is_request_all(&inbound) {
                tracing::info!("ALL packet requested by {}. Sending", conn.peer());
                let packet = build_packet(ctx.identity, &PacketKind::All, ctx.timestamp, ctx.store)?;
                tracing::debug!("Sending requested ALL packet:\n{}", String::from_utf8_lossy(&packet));

                conn.write(&packet).await?;
                self.resync = false;
                report.answered_request = true;
            }
        }

        if !ctx.throttle.ready(Instant::now()) {
            tracing::trace!("Not enough time has passed since the last send");
            report.throttled = true;
            return Ok(());
        }

        let kind = match ctx.kind {
            PacketKind::Update if self.resync => &PacketKind::All,
            other => other,
        };
        let packet = build_packet(ctx.identity, kind, ctx.timestamp, ctx.store)?;
        tracing::debug!("Sending {} packet:\n{}", kind, String::from_utf8_lossy(&packet));

        conn.write(&packet).await?;
        ctx.throttle.record(Instant::now());

        if matches!(kind, PacketKind::All | PacketKind::Update) {
            ctx.store.clear_dirty();
            self.resync = false;
        }
        report.sent = Some(kind.clone());

        Ok(())
    }

    /// Drop the current session; the store is left alone
    pub async fn disconnect(&mut self) {
        if let Some(mut conn) = self.connection.take() {
            self.resync = true;
            conn.close().await;
            tracing::info!("Connection to {} closed", conn.peer());
        }
    }
}
