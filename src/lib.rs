//! Vibrowtion host core
//!
//! Pairs with a single BLE peripheral that streams classification codes and
//! turns that stream into haptic feedback.
//!
//! ## Architecture
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────┐
//! │                       HapticLink                          │
//! │   (single consumer loop over one inbound event channel)   │
//! └──────────────┬─────────────────────────┬─────────────────┘
//!                │                         │
//!                ▼                         ▼
//! ┌──────────────────────────┐   ┌───────────────────────────┐
//! │  ConnectionStateMachine  │   │  ClassificationSmoother   │
//! │  └─ ScanController       │   │  └─ HapticDriver          │
//! └──────────────────────────┘   └───────────────────────────┘
//! ```

pub mod domain;
pub mod error;
pub mod infrastructure;
