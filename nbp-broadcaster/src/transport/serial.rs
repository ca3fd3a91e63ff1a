//! Serial transport (UART, or an RFCOMM tty such as `/dev/rfcomm0`)

use serialport::SerialPort;
use std::io::{Read, Write};
use std::time::Duration;

use super::{Connection, Transport, READ_CHUNK};
use crate::error::{BroadcasterError, Result};

/// Serial device opened on demand
pub struct SerialTransport {
    path: String,
    baud_rate: u32,
    timeout: Duration,
}

impl SerialTransport {
    /// # Arguments
    /// * `path` - Serial port path (e.g., "/dev/rfcomm0")
    /// * `baud_rate` - Baud rate (e.g., 115200)
    pub fn new(path: impl Into<String>, baud_rate: u32) -> Self {
        Self {
            path: path.into(),
            baud_rate,
            timeout: Duration::from_millis(100),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }
}

impl Transport for SerialTransport {
    type Connection = SerialConnection;

    async fn accept(&mut self) -> Result<SerialConnection> {
        let builder = serialport::new(&self.path, self.baud_rate).timeout(self.timeout);
        let port = tokio::task::spawn_blocking(move || builder.open())
            .await
            .map_err(join_error)?
            .map_err(|e| BroadcasterError::unavailable(format!("{}: {}", self.path, e)))?;

        tracing::info!("Opened serial port: {} at {} baud", self.path, self.baud_rate);
        Ok(SerialConnection {
            port: Some(port),
            path: self.path.clone(),
        })
    }

    fn describe(&self) -> String {
        format!("serial://{}", self.path)
    }
}

fn join_error(e: tokio::task::JoinError) -> BroadcasterError {
    BroadcasterError::Io(std::io::Error::other(e))
}

/// Open serial port session.
///
/// Port calls block for up to the port timeout, so each one runs on the
/// blocking pool with the port moved in and handed back afterwards.
pub struct SerialConnection {
    /// `None` only if a blocking call panicked; the session is then dead
    port: Option<Box<dyn SerialPort>>,
    path: String,
}

impl SerialConnection {
    async fn with_port<F, R>(&mut self, op: F) -> Result<R>
    where
        F: FnOnce(&mut Box<dyn SerialPort>) -> Result<R> + Send + 'static,
        R: Send + 'static,
    {
        let mut port = self.port.take().ok_or(BroadcasterError::ConnectionClosed)?;
        let (port, result) = tokio::task::spawn_blocking(move || {
            let result = op(&mut port);
            (port, result)
        })
        .await
        .map_err(join_error)?;

        self.port = Some(port);
        result
    }
}

impl Connection for SerialConnection {
    async fn read_nonblocking(&mut self) -> Result<Option<Vec<u8>>> {
        self.with_port(|port| {
            let waiting = port.bytes_to_read()? as usize;
            if waiting == 0 {
                return Ok(None);
            }

            let mut buffer = vec![0u8; waiting.min(READ_CHUNK)];
            match port.read(&mut buffer) {
                Ok(n) => {
                    buffer.truncate(n);
                    Ok(Some(buffer))
                }
                Err(e) if e.kind() == std::io::ErrorKind::TimedOut => Ok(None),
                Err(e) => Err(e.into()),
            }
        })
        .await
    }

    async fn write(&mut self, bytes: &[u8]) -> Result<()> {
        let bytes = bytes.to_vec();
        self.with_port(move |port| {
            port.write_all(&bytes)?;
            port.flush()?;
            Ok(())
        })
        .await
    }

    async fn close(&mut self) {
        // Port closes on drop
        tracing::debug!("Closing serial port {}", self.path);
    }

    /// The "bytes available" query fails once the device is gone
    fn is_ready(&self) -> bool {
        self.port.as_ref().is_some_and(|port| port.bytes_to_read().is_ok())
    }

    fn peer(&self) -> &str {
        &self.path
    }
}
