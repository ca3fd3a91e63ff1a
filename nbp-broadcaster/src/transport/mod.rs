//! Transport capability used by the connection driver
//!
//! A [`Transport`] hands out at most one [`Connection`] at a time. Adapters:
//! - [`TcpTransport`] - TCP listener, one client at a time
//! - [`SerialTransport`] - serial device opened on demand
//! - `BluetoothTransport` - RFCOMM Serial Port Profile server (feature `bluetooth`)

use std::future::Future;
use std::time::Duration;
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::{BroadcasterError, Result};

mod serial;
mod tcp;

#[cfg(all(feature = "bluetooth", target_os = "linux"))]
mod bluetooth;

#[cfg(test)]
pub(crate) mod mock;

pub use serial::{SerialConnection, SerialTransport};
pub use tcp::TcpTransport;

#[cfg(all(feature = "bluetooth", target_os = "linux"))]
pub use bluetooth::BluetoothTransport;

/// Size of one inbound read
pub const READ_CHUNK: usize = 1024;

/// Default wait for inbound bytes on a connected stream
pub const DEFAULT_READ_POLL: Duration = Duration::from_millis(5);

/// Source of consumer connections
pub trait Transport: Send {
    type Connection: Connection;

    /// Try to establish a session.
    ///
    /// Returns [`BroadcasterError::TransportUnavailable`] when nothing is
    /// ready within the adapter's bounded wait.
    fn accept(&mut self) -> impl Future<Output = Result<Self::Connection>> + Send;

    /// Human-readable endpoint for logs
    fn describe(&self) -> String;
}

/// One connected consumer session
pub trait Connection: Send {
    /// Inbound bytes if any arrived, `None` when there is nothing to read
    fn read_nonblocking(&mut self) -> impl Future<Output = Result<Option<Vec<u8>>>> + Send;

    fn write(&mut self, bytes: &[u8]) -> impl Future<Output = Result<()>> + Send;

    fn close(&mut self) -> impl Future<Output = ()> + Send;

    /// Checked before any I/O on the session
    fn is_ready(&self) -> bool {
        true
    }

    fn peer(&self) -> &str;
}

/// Connection over any async byte stream (TCP, RFCOMM)
pub struct StreamConnection<S> {
    stream: S,
    peer: String,
    read_poll: Duration,
}

impl<S> StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    pub fn new(stream: S, peer: impl Into<String>, read_poll: Duration) -> Self {
        Self {
            stream,
            peer: peer.into(),
            read_poll,
        }
    }
}

impl<S> Connection for StreamConnection<S>
where
    S: AsyncRead + AsyncWrite + Unpin + Send,
{
    async fn read_nonblocking(&mut self) -> Result<Option<Vec<u8>>> {
        let mut buffer = [0u8; READ_CHUNK];
        match tokio::time::timeout(self.read_poll, self.stream.read(&mut buffer)).await {
            Err(_elapsed) => Ok(None),
            Ok(Ok(0)) => Err(BroadcasterError::ConnectionClosed),
            Ok(Ok(n)) => Ok(Some(buffer[..n].to_vec())),
            Ok(Err(e)) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(None),
            Ok(Err(e)) => Err(e.into()),
        }
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        self.stream.write_all(bytes).await?;
        self.stream.flush().await?;
        Ok(())
    }

    async fn close(&mut self) {
        if let Err(e) = self.stream.shutdown().await {
            tracing::debug!("Shutdown of {} failed: {}", self.peer, e);
        }
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}
