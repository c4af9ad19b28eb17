//! Playback acknowledgment tracking.
//!
//! Every assistant chunk sent to telephony is followed by a named mark; the
//! telephony side echoes the mark back once that audio has been played. The
//! tracker holds the marks still in flight, oldest first.

use std::collections::VecDeque;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Name carried by every mark the relay emits.
pub const RESPONSE_PART_MARK: &str = "responsePart";

/// Default bound on marks awaiting acknowledgment.
pub const DEFAULT_MAX_PENDING_MARKS: usize = 1024;

/// What to do with a new mark when the queue is full.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MarkOverflowPolicy {
    /// Evict the oldest pending mark to make room
    #[default]
    DropOldest,
    /// Forward the audio but emit no mark for it
    SkipMark,
}

impl MarkOverflowPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DropOldest => "drop_oldest",
            Self::SkipMark => "skip_mark",
        }
    }
}

impl fmt::Display for MarkOverflowPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for MarkOverflowPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace('-', "_").as_str() {
            "drop_oldest" => Ok(Self::DropOldest),
            "skip_mark" => Ok(Self::SkipMark),
            other => Err(format!(
                "Invalid mark overflow policy '{other}': expected 'drop_oldest' or 'skip_mark'"
            )),
        }
    }
}

/// Outcome of [`MarkTracker::push`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MarkPush {
    /// Mark queued; send it
    Queued,
    /// Mark queued after evicting the contained oldest mark; send it
    Evicted(String),
    /// Queue full under `SkipMark`; do not send a mark
    Skipped,
}

impl MarkPush {
    /// Whether the caller should emit the mark message.
    pub fn should_send(&self) -> bool {
        !matches!(self, MarkPush::Skipped)
    }
}

/// FIFO of marks sent to telephony and not yet acknowledged.
#[derive(Debug, Clone, Default)]
pub struct MarkTracker {
    pending: VecDeque<String>,
    capacity: Option<usize>,
    policy: MarkOverflowPolicy,
}

impl MarkTracker {
    /// Unbounded tracker.
    pub fn new() -> Self {
        Self::default()
    }

    /// Tracker bounded to `capacity` marks. `None` or `Some(0)` is unbounded.
    pub fn with_capacity(capacity: Option<usize>, policy: MarkOverflowPolicy) -> Self {
        Self {
            pending: VecDeque::new(),
            capacity: capacity.filter(|c| *c > 0),
            policy,
        }
    }

    pub fn push(&mut self, name: impl Into<String>) -> MarkPush {
        let full = self
            .capacity
            .is_some_and(|capacity| self.pending.len() >= capacity);

        if !full {
            self.pending.push_back(name.into());
            return MarkPush::Queued;
        }

        match self.policy {
            MarkOverflowPolicy::SkipMark => MarkPush::Skipped,
            MarkOverflowPolicy::DropOldest => {
                let evicted = self.pending.pop_front();
                self.pending.push_back(name.into());
                match evicted {
                    Some(oldest) => MarkPush::Evicted(oldest),
                    None => MarkPush::Queued,
                }
            }
        }
    }

    /// Pop the oldest pending mark. No-op on an empty queue.
    pub fn acknowledge(&mut self) -> Option<String> {
        self.pending.pop_front()
    }

    pub fn clear(&mut self) {
        self.pending.clear();
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    pub fn capacity(&self) -> Option<usize> {
        self.capacity
    }

    pub fn policy(&self) -> MarkOverflowPolicy {
        self.policy
    }
}
