//! Request-generation tokens.
//!
//! Requests are never cancelled when superseded, so every fetch is tagged with a
//! monotonically increasing generation for its kind. Only the response carrying the
//! most recently issued generation may touch the view state; anything older is stale.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FetchKind {
    List,
    Detail,
    Recommendations,
    Ingest,
}

impl FetchKind {
    fn index(self) -> usize {
        match self {
            FetchKind::List => 0,
            FetchKind::Detail => 1,
            FetchKind::Recommendations => 2,
            FetchKind::Ingest => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Generation(u64);

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

#[derive(Debug, Clone, Copy, Default)]
struct Slot {
    issued: u64,
    in_flight: bool,
}

/// Per-kind generation counters plus an in-flight marker for the latest issue.
#[derive(Debug, Clone, Default)]
pub struct RequestTracker {
    slots: [Slot; 4],
}

impl RequestTracker {
    /// Issue a new generation for `kind`, superseding whatever was in flight.
    pub fn issue(&mut self, kind: FetchKind) -> Generation {
        let slot = &mut self.slots[kind.index()];
        slot.issued += 1;
        slot.in_flight = true;
        Generation(slot.issued)
    }

    pub fn is_current(&self, kind: FetchKind, generation: Generation) -> bool {
        let slot = &self.slots[kind.index()];
        slot.in_flight && slot.issued == generation.0
    }

    /// Mark `generation` as settled. Returns false for stale or already-settled generations.
    pub fn settle(&mut self, kind: FetchKind, generation: Generation) -> bool {
        if !self.is_current(kind, generation) {
            return false;
        }
        self.slots[kind.index()].in_flight = false;
        true
    }

    /// Supersede any in-flight request of `kind` without issuing a new one.
    pub fn invalidate(&mut self, kind: FetchKind) {
        let slot = &mut self.slots[kind.index()];
        if slot.in_flight {
            slot.issued += 1;
            slot.in_flight = false;
        }
    }

    pub fn in_flight(&self, kind: FetchKind) -> bool {
        self.slots[kind.index()].in_flight
    }

    pub fn any_in_flight(&self) -> bool {
        self.slots.iter().any(|s| s.in_flight)
    }
}
