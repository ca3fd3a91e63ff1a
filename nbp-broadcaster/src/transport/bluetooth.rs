//! Bluetooth RFCOMM server advertised as a Serial Port Profile

use bluer::rfcomm::{Profile, ProfileHandle, Role, Stream};
use bluer::Session;
use futures::StreamExt;
use std::time::Duration;
use uuid::Uuid;

use super::{StreamConnection, Transport, DEFAULT_READ_POLL};
use crate::error::{BroadcasterError, Result};

/// Serial Port Profile service class
pub const SERIAL_PORT_UUID: Uuid = Uuid::from_u128(0x00001101_0000_1000_8000_00805f9b34fb);

/// RFCOMM server accepting one consumer at a time
pub struct BluetoothTransport {
    // Keeps the D-Bus connection alive for the profile registration
    _session: Session,
    profile: ProfileHandle,
    service_uuid: Uuid,
    accept_timeout: Duration,
}

impl BluetoothTransport {
    /// Power the default adapter and register the service.
    ///
    /// `channel` of `None` lets BlueZ pick a free RFCOMM channel.
    pub async fn register(
        service_uuid: &str,
        service_name: &str,
        channel: Option<u16>,
        accept_timeout: Duration,
    ) -> Result<Self> {
        let service_uuid = Uuid::parse_str(service_uuid)
            .map_err(|e| BroadcasterError::invalid_config(format!("service uuid {}: {}", service_uuid, e)))?;

        let session = Session::new().await?;
        let adapter = session.default_adapter().await?;
        adapter.set_powered(true).await?;

        let profile = Profile {
            uuid: service_uuid,
            name: Some(service_name.to_string()),
            service: Some(SERIAL_PORT_UUID),
            role: Some(Role::Server),
            channel,
            require_authentication: Some(false),
            require_authorization: Some(false),
            ..Default::default()
        };
        let profile = session.register_profile(profile).await?;

        tracing::info!(
            "Advertising RFCOMM service '{}' ({}) on adapter {}",
            service_name,
            service_uuid,
            adapter.name()
        );

        Ok(Self {
            _session: session,
            profile,
            service_uuid,
            accept_timeout,
        })
    }
}

impl Transport for BluetoothTransport {
    type Connection = StreamConnection<Stream>;

    async fn accept(&mut self) -> Result<Self::Connection> {
        let request = match tokio::time::timeout(self.accept_timeout, self.profile.next()).await {
            Err(_elapsed) => {
                return Err(BroadcasterError::unavailable("no pending RFCOMM connection"));
            }
            Ok(None) => {
                return Err(std::io::Error::new(
                    std::io::ErrorKind::BrokenPipe,
                    "RFCOMM profile registration ended",
                )
                .into());
            }
            Ok(Some(request)) => request,
        };

        let peer = request.device().to_string();
        let stream = request.accept()?;
        Ok(StreamConnection::new(stream, peer, DEFAULT_READ_POLL))
    }

    fn describe(&self) -> String {
        format!("rfcomm://{}", self.service_uuid)
    }
}
