//! Events flowing into and out of the core.
//!
//! Every callback source (scanner, GATT transport, user intent, scan timer)
//! is funnelled into one [`LinkEvent`] channel and consumed sequentially.
//! The core reports what happened to the host through [`StatusEvent`].

use crate::domain::haptics::HapticDecision;
use crate::domain::models::{Advertisement, ConnectionState, DiscoveredService, PeripheralHandle};
use crate::error::LinkError;
use std::fmt;

/// Identifies one scan session. Events tagged with a stale id are discarded.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScanSessionId(pub u64);

impl fmt::Display for ScanSessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Inbound event consumed by the driver loop.
#[derive(Debug, Clone)]
pub enum LinkEvent {
    ConnectRequested,
    DisconnectRequested,
    /// Tear everything down and end the driver loop.
    Shutdown,
    Scan(ScanEvent),
    Transport(TransportEvent),
}

#[derive(Debug, Clone)]
pub enum ScanEvent {
    AdvertisementReceived {
        session: ScanSessionId,
        advertisement: Advertisement,
    },
    TimedOut {
        session: ScanSessionId,
    },
    Failed {
        session: ScanSessionId,
        reason: String,
    },
}

#[derive(Debug, Clone)]
pub enum TransportEvent {
    LinkEstablished,
    /// A connect attempt or an active link failed.
    LinkFailed(String),
    /// The link is down, whether lost or torn down on request.
    Disconnected,
    ServicesResolved(Vec<DiscoveredService>),
    DescriptorWritten,
    Notification(Vec<u8>),
}

/// Outbound event for the host shell.
#[derive(Debug, Clone, PartialEq)]
pub enum StatusEvent {
    StateChanged {
        from: ConnectionState,
        to: ConnectionState,
    },
    ScanStarted,
    PeripheralFound(PeripheralHandle),
    Connected,
    ServicesDiscovered,
    Disconnected,
    ConnectionFailed(LinkError),
    DataAvailable(Vec<u8>),
    PayloadRejected(usize),
    HapticFired(HapticDecision),
}
