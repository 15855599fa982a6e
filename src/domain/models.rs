use std::fmt;
use uuid::Uuid;

/// GATT identifiers of the peripheral we pair with. Fixed for the life of the process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PeripheralIdentity {
    pub service_id: Uuid,
    pub characteristic_id: Uuid,
    pub notification_descriptor_id: Uuid,
}

/// Opaque Bluetooth device address as reported by the radio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PeripheralAddress(pub u64);

impl fmt::Display for PeripheralAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let b = self.0.to_be_bytes();
        write!(
            f,
            "{:02X}:{:02X}:{:02X}:{:02X}:{:02X}:{:02X}",
            b[2], b[3], b[4], b[5], b[6], b[7]
        )
    }
}

/// A peripheral accepted by the scanner.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PeripheralHandle {
    pub address: PeripheralAddress,
    pub name: Option<String>,
    pub rssi: Option<i16>,
}

/// A single advertisement seen during a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Advertisement {
    pub address: PeripheralAddress,
    pub local_name: Option<String>,
    pub service_uuids: Vec<Uuid>,
    pub rssi: Option<i16>,
}

impl Advertisement {
    pub fn advertises(&self, service_id: Uuid) -> bool {
        self.service_uuids.contains(&service_id)
    }

    pub fn into_handle(self) -> PeripheralHandle {
        PeripheralHandle {
            address: self.address,
            name: self.local_name.filter(|n| !n.is_empty()),
            rssi: self.rssi,
        }
    }
}

/// Service found during GATT discovery, with its characteristics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredService {
    pub uuid: Uuid,
    pub characteristics: Vec<DiscoveredCharacteristic>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiscoveredCharacteristic {
    pub uuid: Uuid,
    pub descriptors: Vec<Uuid>,
}

/// Lifecycle of the single peripheral link.
///
/// ```text
/// Idle ──► Scanning ──► Connecting ──► DiscoveringServices ──► Subscribing ──► Connected
///  ▲          │             │                  │                    │              │
///  │          │             │                  └───────┬────────────┘              │
///  │          │             │                          ▼                           │
///  ├──────────┘             │                    Disconnecting ◄───────────────────┘
///  ├────────────────────────┘                          │
///  └───────────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum ConnectionState {
    #[default]
    Idle,
    Scanning,
    Connecting,
    DiscoveringServices,
    Subscribing,
    Connected,
    Disconnecting,
}

impl ConnectionState {
    /// Whether `next` is a legal edge out of this state.
    pub fn can_transition_to(self, next: ConnectionState) -> bool {
        use ConnectionState::*;
        matches!(
            (self, next),
            (Idle, Scanning)
                | (Scanning, Connecting)
                | (Scanning, Idle)
                | (Connecting, DiscoveringServices)
                | (Connecting, Idle)
                | (DiscoveringServices, Subscribing)
                | (DiscoveringServices, Disconnecting)
                | (Subscribing, Connected)
                | (Subscribing, Disconnecting)
                | (Connected, Disconnecting)
                | (Disconnecting, Idle)
        )
    }

    /// States in which a GATT link exists or is being set up.
    pub fn has_link(self) -> bool {
        matches!(
            self,
            Self::Connecting | Self::DiscoveringServices | Self::Subscribing | Self::Connected
        )
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::Idle => "Idle",
            Self::Scanning => "Scanning",
            Self::Connecting => "Connecting",
            Self::DiscoveringServices => "DiscoveringServices",
            Self::Subscribing => "Subscribing",
            Self::Connected => "Connected",
            Self::Disconnecting => "Disconnecting",
        }
    }
}

impl fmt::Display for ConnectionState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}
