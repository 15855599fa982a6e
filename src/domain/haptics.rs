use std::time::Duration;
use tracing::debug;

/// Outcome of one smoothing cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum HapticDecision {
    /// Dominant code 1: long, full-strength pulse.
    Strong,
    /// Dominant code 2: short, half-strength pulse.
    Weak,
    #[default]
    None,
}

/// A one-shot vibration request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Waveform {
    pub duration: Duration,
    pub amplitude: u8,
}

impl HapticDecision {
    pub fn waveform(self) -> Option<Waveform> {
        match self {
            Self::Strong => Some(Waveform {
                duration: Duration::from_millis(500),
                amplitude: 255,
            }),
            Self::Weak => Some(Waveform {
                duration: Duration::from_millis(250),
                amplitude: 127,
            }),
            Self::None => None,
        }
    }
}

/// Vibration motor of the host device.
///
/// Requests are fire-and-forget: implementations must not block until the
/// waveform has finished playing.
pub trait HapticOutput: Send {
    fn fire(&mut self, duration_ms: u32, amplitude: u8);
}

/// Maps decisions onto the haptic output.
pub struct HapticDriver<O> {
    output: O,
}

impl<O: HapticOutput> HapticDriver<O> {
    pub fn new(output: O) -> Self {
        Self { output }
    }

    /// Issue the waveform for `decision`. Returns whether anything was fired.
    pub fn fire(&mut self, decision: HapticDecision) -> bool {
        let Some(waveform) = decision.waveform() else {
            return false;
        };
        let duration_ms = u32::try_from(waveform.duration.as_millis()).unwrap_or(u32::MAX);
        debug!(
            "Firing {:?} haptic: {}ms @ {}",
            decision, duration_ms, waveform.amplitude
        );
        self.output.fire(duration_ms, waveform.amplitude);
        true
    }

    pub fn output(&self) -> &O {
        &self.output
    }
}
