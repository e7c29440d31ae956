use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{SystemTime, UNIX_EPOCH};

/// Identifier assigned to every reading once when it is published
///
/// It is derived from the wall clock in nanoseconds and used by consumers to detect duplicates.
pub type TraceId = u64;

/// Source of strictly increasing [`TraceIds`](TraceId)
///
/// Returns the current time in nanoseconds unless that value has already been handed out
/// (or the clock went backwards), in which case the previous value plus one is used.
#[derive(Debug, Default)]
pub struct TraceIdGenerator {
    last: AtomicU64,
}

impl TraceIdGenerator {
    /// Creates a new generator
    pub fn new() -> Self {
        Self::default()
    }

    /// Generates the next identifier
    pub fn next_id(&self) -> TraceId {
        let now = now_nanos();
        let advance = |last: TraceId| now.max(last.saturating_add(1));

        match self
            .last
            .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |last| Some(advance(last)))
        {
            Ok(previous) | Err(previous) => advance(previous),
        }
    }
}

fn now_nanos() -> TraceId {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as TraceId)
        .unwrap_or_default()
}

#[cfg(test)]
mod does {
    use super::*;

    #[test]
    fn generate_strictly_increasing_identifiers() {
        let generator = TraceIdGenerator::new();
        let ids: Vec<TraceId> = (0..1_000).map(|_| generator.next_id()).collect();

        assert!(ids.windows(2).all(|pair| pair[0] < pair[1]));
    }

    #[test]
    fn derive_identifiers_from_wall_clock() {
        let before = now_nanos();
        let id = TraceIdGenerator::new().next_id();

        assert!(id >= before);
    }
}
