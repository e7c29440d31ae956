use super::EventType;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Number of envelopes per [`EventType`]
///
/// Every known type is present, types which have not been seen are reported as zero.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EventCounts(BTreeMap<EventType, usize>);

impl Default for EventCounts {
    fn default() -> Self {
        Self(EventType::ALL.iter().map(|t| (*t, 0)).collect())
    }
}

impl EventCounts {
    /// Records one more envelope of the given type and returns its zero-based per-type position
    pub fn record(&mut self, event_type: EventType) -> usize {
        let count = self.0.entry(event_type).or_insert(0);
        *count += 1;
        *count - 1
    }

    /// Number of envelopes of the given type
    pub fn get(&self, event_type: EventType) -> usize {
        self.0.get(&event_type).copied().unwrap_or(0)
    }

    /// Total number of envelopes
    pub fn total(&self) -> usize {
        self.0.values().sum()
    }
}
