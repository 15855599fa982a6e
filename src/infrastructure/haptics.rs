//! Haptic output for hosts without a vibration motor.

use crate::domain::haptics::HapticOutput;
use tracing::info;

/// Logs each waveform request instead of driving a motor.
#[derive(Debug, Default)]
pub struct TracingHapticOutput {
    fired: u64,
}

impl TracingHapticOutput {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fired(&self) -> u64 {
        self.fired
    }
}

impl HapticOutput for TracingHapticOutput {
    fn fire(&mut self, duration_ms: u32, amplitude: u8) {
        self.fired += 1;
        info!(
            target: "vibrowtion::haptics",
            "Vibrate one-shot {}ms at amplitude {} (#{})",
            duration_ms, amplitude, self.fired
        );
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::haptics::{HapticDecision, HapticDriver};

    #[test]
    fn test_counts_requests() {
        let mut driver = HapticDriver::new(TracingHapticOutput::new());
        driver.fire(HapticDecision::Strong);
        driver.fire(HapticDecision::None);
        driver.fire(HapticDecision::Weak);
        assert_eq!(driver.output().fired(), 2);
    }
}
