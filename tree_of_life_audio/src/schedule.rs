// Timer queue for deferred voice work.
//
// The engine never sleeps. Delayed triggers (arpeggio and roll styles) and
// voice disposals are scheduled here at an absolute time in milliseconds on
// the engine clock, and fired as the clock advances. Entries are ordered by
// `(at_ms, sequence)`, so timers due at the same instant fire in the order
// they were scheduled.
//
// Timers are never cancelled. A timer that fires for a voice already
// disposed (by a stop-all sweep, say) is a no-op in the engine.

use crate::voice::VoiceId;
use std::cmp::Ordering;
use std::collections::BinaryHeap;

#[derive(Clone, Debug)]
pub struct ScheduledTimer {
    pub at_ms: u64,
    /// Tiebreak within one instant. Lower fires first.
    pub sequence: u64,
    pub kind: TimerKind,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TimerKind {
    /// Start a voice's attack-release.
    TriggerVoice { voice: VoiceId, duration_ms: u64 },
    /// Dispose a voice once its release tail has finished.
    DisposeVoice { voice: VoiceId },
}

impl TimerKind {
    pub fn voice(&self) -> VoiceId {
        match self {
            TimerKind::TriggerVoice { voice, .. } | TimerKind::DisposeVoice { voice } => *voice,
        }
    }
}

// Min-heap on (at_ms, sequence) over Rust's max-heap.
impl PartialEq for ScheduledTimer {
    fn eq(&self, other: &Self) -> bool {
        self.at_ms == other.at_ms && self.sequence == other.sequence
    }
}

impl Eq for ScheduledTimer {}

impl PartialOrd for ScheduledTimer {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for ScheduledTimer {
    fn cmp(&self, other: &Self) -> Ordering {
        other
            .at_ms
            .cmp(&self.at_ms)
            .then_with(|| other.sequence.cmp(&self.sequence))
    }
}

#[derive(Clone, Debug, Default)]
pub struct TimerQueue {
    heap: BinaryHeap<ScheduledTimer>,
    next_sequence: u64,
}

impl TimerQueue {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn schedule(&mut self, at_ms: u64, kind: TimerKind) {
        let sequence = self.next_sequence;
        self.next_sequence += 1;
        self.heap.push(ScheduledTimer {
            at_ms,
            sequence,
            kind,
        });
    }

    pub fn peek_time(&self) -> Option<u64> {
        self.heap.peek().map(|t| t.at_ms)
    }

    /// Pop the next timer if it is due at or before `now_ms`.
    pub fn pop_if_ready(&mut self, now_ms: u64) -> Option<ScheduledTimer> {
        if self.heap.peek().is_some_and(|t| t.at_ms <= now_ms) {
            self.heap.pop()
        } else {
            None
        }
    }

    /// Pending timers in no particular order.
    pub fn iter(&self) -> impl Iterator<Item = &ScheduledTimer> {
        self.heap.iter()
    }

    pub fn len(&self) -> usize {
        self.heap.len()
    }

    pub fn is_empty(&self) -> bool {
        self.heap.is_empty()
    }
}
