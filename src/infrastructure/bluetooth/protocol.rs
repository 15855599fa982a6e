//! Vibrowtion Peripheral Protocol
//!
//! GATT identifiers of the classification peripheral and the wire format of
//! its notifications.

use crate::domain::models::PeripheralIdentity;
use crate::error::LinkError;
use std::time::Duration;
use uuid::Uuid;

/// Classification service, advertised by the peripheral and used as scan filter.
pub const SERVICE_UUID: Uuid = Uuid::from_u128(0x12566370_6212_4683_a567_037441918442);

/// Classification characteristic, notifies one sample per update.
pub const CHARACTERISTIC_UUID: Uuid = Uuid::from_u128(0x12566370_6212_4683_b567_037441918442);

/// Standard Client Characteristic Configuration descriptor (0x2902).
pub const CCCD_UUID: Uuid = Uuid::from_u128(0x00002902_0000_1000_8000_00805f9b34fb);

/// CCCD value that turns notifications on.
pub const ENABLE_NOTIFICATION_VALUE: [u8; 2] = [0x01, 0x00];

/// Hard limit on a single scan.
pub const SCAN_TIMEOUT: Duration = Duration::from_secs(10);

pub const PERIPHERAL: PeripheralIdentity = PeripheralIdentity {
    service_id: SERVICE_UUID,
    characteristic_id: CHARACTERISTIC_UUID,
    notification_descriptor_id: CCCD_UUID,
};

impl Default for PeripheralIdentity {
    fn default() -> Self {
        PERIPHERAL
    }
}

/// Decode one notification payload into a classification code.
///
/// # Payload Structure (4 bytes)
///
/// ```text
/// [0-3] : Classification code (i32 little-endian)
/// ```
pub fn decode_sample(payload: &[u8]) -> Result<i32, LinkError> {
    let bytes: [u8; 4] = payload
        .try_into()
        .map_err(|_| LinkError::PayloadDecodeError(payload.len()))?;
    Ok(i32::from_le_bytes(bytes))
}
