//! Platform-facing adapters: Bluetooth, logging and haptic output.

pub mod bluetooth;
pub mod haptics;
pub mod logging;
