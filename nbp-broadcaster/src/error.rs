use thiserror::Error;

#[derive(Error, Debug)]
pub enum BroadcasterError {
    /// Nothing to connect to yet (device absent, no pending client).
    #[error("Transport unavailable: {0}")]
    TransportUnavailable(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Connection closed by peer")]
    ConnectionClosed,

    #[error("Serial port error: {0}")]
    Serial(#[from] serialport::Error),

    #[error("Bluetooth error: {0}")]
    Bluetooth(String),

    #[error("Unrecognized packet kind: {0}")]
    UnrecognizedKind(String),

    #[error("Serialization error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("Broadcaster queue closed")]
    QueueClosed,
}

impl BroadcasterError {
    pub fn unavailable<S: Into<String>>(msg: S) -> Self {
        Self::TransportUnavailable(msg.into())
    }

    pub fn invalid_config<S: Into<String>>(msg: S) -> Self {
        Self::InvalidConfig(msg.into())
    }

    /// Expected "not ready yet" condition, retried on the next iteration.
    pub fn is_transient(&self) -> bool {
        matches!(self, Self::TransportUnavailable(_))
    }

    /// Failure that ends the current connected session.
    pub fn is_io_failure(&self) -> bool {
        match self {
            Self::Io(_) | Self::ConnectionClosed | Self::Serial(_) | Self::Bluetooth(_) => true,
            _ => false,
        }
    }
}

#[cfg(all(feature = "bluetooth", target_os = "linux"))]
impl From<bluer::Error> for BroadcasterError {
    fn from(e: bluer::Error) -> Self {
        Self::Bluetooth(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, BroadcasterError>;
