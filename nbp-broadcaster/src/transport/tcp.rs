use std::net::SocketAddr;
use std::time::Duration;
use tokio::net::{TcpListener, TcpStream};

use super::{StreamConnection, Transport, DEFAULT_READ_POLL};
use crate::error::{BroadcasterError, Result};

/// TCP server accepting one consumer at a time
pub struct TcpTransport {
    listener: TcpListener,
    local_addr: SocketAddr,
    accept_timeout: Duration,
    read_poll: Duration,
}

impl TcpTransport {
    /// Bind and listen on `addr`
    pub async fn bind(addr: &str, accept_timeout: Duration) -> Result<Self> {
        tracing::info!("Binding to {}", addr);
        let listener = TcpListener::bind(addr).await?;
        let local_addr = listener.local_addr()?;

        Ok(Self {
            listener,
            local_addr,
            accept_timeout,
            read_poll: DEFAULT_READ_POLL,
        })
    }

    pub fn with_read_poll(mut self, read_poll: Duration) -> Self {
        self.read_poll = read_poll;
        self
    }

    /// Address actually bound (resolves port 0)
    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }
}

impl Transport for TcpTransport {
    type Connection = StreamConnection<TcpStream>;

    async fn accept(&mut self) -> Result<Self::Connection> {
        match tokio::time::timeout(self.accept_timeout, self.listener.accept()).await {
            Ok(Ok((stream, peer))) => {
                stream.set_nodelay(true)?;
                Ok(StreamConnection::new(stream, peer.to_string(), self.read_poll))
            }
            Ok(Err(e)) => Err(e.into()),
            Err(_elapsed) => Err(BroadcasterError::unavailable(format!(
                "no pending connection on {}",
                self.local_addr
            ))),
        }
    }

    fn describe(&self) -> String {
        format!("tcp://{}", self.local_addr)
    }
}
