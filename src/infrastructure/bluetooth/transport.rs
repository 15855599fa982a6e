//! Radio Transport Seams
//!
//! The core never talks to a Bluetooth stack directly. It issues requests
//! through these traits; the platform adapter reports the outcome later as
//! [`LinkEvent`](crate::domain::events::LinkEvent)s on the inbound channel.
//! A request that fails synchronously returns [`TransportError`].

use crate::domain::events::ScanSessionId;
use crate::domain::models::PeripheralHandle;
use crate::error::TransportError;
use uuid::Uuid;

/// Advertisement scanning. Only the scan controller drives this.
pub trait ScanRadio: Send {
    /// Start an aggressive scan filtered on `service_id`. Advertisements must
    /// be reported tagged with `session`.
    fn start_scan(&mut self, session: ScanSessionId, service_id: Uuid)
        -> Result<(), TransportError>;

    fn stop_scan(&mut self) -> Result<(), TransportError>;
}

/// GATT client operations on the single peripheral.
pub trait GattTransport: Send {
    /// Open a GATT client to `peripheral`. Reports `LinkEstablished` or `LinkFailed`.
    fn connect(&mut self, peripheral: &PeripheralHandle) -> Result<(), TransportError>;

    /// Reports `ServicesResolved`.
    fn discover_services(&mut self) -> Result<(), TransportError>;

    /// Route notifications of the characteristic to the inbound channel.
    fn enable_notifications(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
    ) -> Result<(), TransportError>;

    /// Reports `DescriptorWritten` once the peripheral acknowledges.
    fn write_descriptor(
        &mut self,
        service: Uuid,
        characteristic: Uuid,
        descriptor: Uuid,
        value: &[u8],
    ) -> Result<(), TransportError>;

    /// Drop the link. Reports `Disconnected`.
    fn disconnect(&mut self) -> Result<(), TransportError>;

    /// Release the GATT client and everything registered on it.
    fn close(&mut self);
}
