//! Error types for the connection lifecycle and the notification stream.

use std::fmt;
use std::time::Duration;
use thiserror::Error;
use uuid::Uuid;

/// Failures of a single connection attempt or a single sample.
///
/// None of these are fatal to the process: the state machine recovers to
/// `Idle`, and malformed samples are dropped.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LinkError {
    #[error("no matching peripheral advertised within {0:?}")]
    ScanTimeout(Duration),

    #[error("scan failed: {0}")]
    ScanFailed(String),

    #[error("transport link failure: {0}")]
    TransportLinkFailure(String),

    #[error("peripheral profile mismatch: {0} not found")]
    ServiceOrCharacteristicMissing(MissingAttribute),

    #[error("notification payload must be 4 bytes, got {0}")]
    PayloadDecodeError(usize),
}

/// The GATT attribute that was expected but absent on the peripheral.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MissingAttribute {
    Service(Uuid),
    Characteristic(Uuid),
    Descriptor(Uuid),
}

impl fmt::Display for MissingAttribute {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Service(uuid) => write!(f, "service {uuid}"),
            Self::Characteristic(uuid) => write!(f, "characteristic {uuid}"),
            Self::Descriptor(uuid) => write!(f, "descriptor {uuid}"),
        }
    }
}

/// Synchronous failure of a radio request.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("bluetooth LE is not available on this host")]
    Unavailable,

    #[error("no peripheral is connected")]
    NotConnected,

    #[error("radio request failed: {0}")]
    Request(String),
}

#[cfg(windows)]
impl From<windows::core::Error> for TransportError {
    fn from(err: windows::core::Error) -> Self {
        Self::Request(err.message().to_string())
    }
}
