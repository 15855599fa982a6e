//! Bluetooth Module
//!
//! Drives the BLE link to the classifier peripheral and turns its
//! notifications into haptic pulses.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                      HapticLink                          │
//! │   (single consumer of the inbound LinkEvent channel)     │
//! └─────────────────────┬───────────────────────────────────┘
//!                       │
//!         ┌─────────────┼─────────────┐
//!         │             │             │
//!         ▼             ▼             ▼
//! ┌───────────┐  ┌────────────┐  ┌──────────┐
//! │  Scanner  │  │ Connection │  │ Protocol │
//! │           │  │            │  │          │
//! │ - timed   │  │ - states   │  │ - UUIDs  │
//! │   scans   │  │ - GATT     │  │ - payload│
//! │           │  │   setup    │  │   decode │
//! └─────┬─────┘  └─────┬──────┘  └──────────┘
//!       │              │
//!       ▼              ▼
//! ┌─────────────────────────────┐
//! │  Transport (radio adapter)  │
//! └─────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`protocol`] - Peripheral identity, timing constants, payload decoding
//! - [`transport`] - Radio seams implemented by platform adapters
//! - [`scanner`] - Time-bounded advertisement scans
//! - [`connection`] - Connection lifecycle and GATT subscription
//! - [`service`] - Event loop and public handle
//! - `winrt` - Windows radio adapter (Windows only)

pub mod connection;
pub mod protocol;
pub mod scanner;
pub mod service;
pub mod transport;
#[cfg(windows)]
pub mod winrt;

pub use service::{start, HapticLinkHandle, LinkOptions, RadioParts};

use crate::domain::events::LinkEvent;
use crate::error::TransportError;
use tokio::sync::mpsc;

/// Open the host's Bluetooth radio.
#[cfg(windows)]
pub fn platform_radio(events: mpsc::UnboundedSender<LinkEvent>) -> Result<RadioParts, TransportError> {
    winrt::radio(events)
}

/// Open the host's Bluetooth radio.
///
/// Only the WinRT stack is wired up; other hosts report no radio.
#[cfg(not(windows))]
pub fn platform_radio(_events: mpsc::UnboundedSender<LinkEvent>) -> Result<RadioParts, TransportError> {
    Err(TransportError::Unavailable)
}
