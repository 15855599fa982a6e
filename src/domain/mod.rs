//! Pure domain logic: data model, events, smoothing, haptic mapping and settings.

pub mod classification;
pub mod events;
pub mod haptics;
pub mod models;
pub mod settings;
