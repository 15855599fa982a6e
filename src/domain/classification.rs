use crate::domain::haptics::HapticDecision;
use tracing::trace;

/// Number of samples collected before a decision is taken.
pub const WINDOW_LEN: usize = 6;

/// Code voted for a strong pulse, and the votes it needs in window A.
const STRONG_CODE: i32 = 1;
const STRONG_VOTES: usize = 4;

/// Code voted for a weak pulse, and the votes it needs in window B.
const WEAK_CODE: i32 = 2;
const WEAK_VOTES: usize = 4;

/// Turns the jittery per-sample classification stream into haptic decisions.
///
/// Samples are collected in batches of [`WINDOW_LEN`]. When a batch is full
/// two overlapping windows are voted on and the whole batch is discarded,
/// so no sample takes part in more than one decision.
///
/// ```text
///  index:    n-6  n-5  n-4  n-3  n-2  n-1
///  window A: [─────────────────────]          5 wide, count(1) >= 4 -> Strong
///  window B: [────────────────]               4 wide, count(2) >= 4 -> Weak
/// ```
#[derive(Debug, Default)]
pub struct ClassificationSmoother {
    buffer: Vec<i32>,
}

impl ClassificationSmoother {
    pub fn new() -> Self {
        Self {
            buffer: Vec::with_capacity(WINDOW_LEN),
        }
    }

    /// Append one sample. Yields a decision only on the push that fills the batch.
    pub fn push(&mut self, sample: i32) -> HapticDecision {
        self.buffer.push(sample);
        let n = self.buffer.len();
        trace!("Classification sample {} ({}/{})", sample, n, WINDOW_LEN);

        if n < WINDOW_LEN {
            return HapticDecision::None;
        }

        let window_a = &self.buffer[n - 6..n - 1];
        let window_b = &self.buffer[n - 6..n - 2];

        let decision = if votes(window_a, STRONG_CODE) >= STRONG_VOTES {
            HapticDecision::Strong
        } else if votes(window_b, WEAK_CODE) >= WEAK_VOTES {
            HapticDecision::Weak
        } else {
            HapticDecision::None
        };

        self.buffer.clear();
        decision
    }

    /// Samples collected towards the next decision.
    pub fn pending(&self) -> usize {
        self.buffer.len()
    }

    /// Drop any partial batch.
    pub fn reset(&mut self) {
        self.buffer.clear();
    }
}

fn votes(window: &[i32], code: i32) -> usize {
    window.iter().filter(|&&s| s == code).count()
}
