//! Least-loaded-worker selection, shared by `assign` and `failover_dead`.

use std::collections::HashMap;

use chrono::{DateTime, Duration as ChronoDuration, Utc};

/// Anything the load-balancer needs to know about a worker. Kept separate
/// from the registry's internal `CollectorRecord` so this module doesn't
/// need to see (or lock) the registry directly.
pub(crate) trait LoadSnapshot {
    fn is_live(&self, max_idle: ChronoDuration, now: DateTime<Utc>) -> bool;
    fn load(&self) -> usize;
    fn last_heartbeat(&self) -> Option<DateTime<Utc>>;
}

/// Picks the live worker with the fewest assigned tasks, breaking ties by
/// earliest `last_heartbeat`. `Iterator::min_by` keeps the first minimal
/// element it sees on ties, so workers are considered in the registry's
/// iteration order and the first (oldest-registered, in practice) candidate
/// wins a tie rather than an arbitrary one.
pub(crate) fn choose_least_loaded<T>(
    workers: &HashMap<String, T>,
    max_idle: ChronoDuration,
    now: DateTime<Utc>,
) -> Option<String>
where
    T: LoadSnapshot,
{
    workers
        .iter()
        .filter(|(_, w)| w.is_live(max_idle, now))
        .min_by(|(_, a), (_, b)| {
            a.load()
                .cmp(&b.load())
                .then_with(|| a.last_heartbeat().cmp(&b.last_heartbeat()))
        })
        .map(|(name, _)| name.clone())
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Fake {
        load: usize,
        last_heartbeat: Option<DateTime<Utc>>,
        live: bool,
    }

    impl LoadSnapshot for Fake {
        fn is_live(&self, _max_idle: ChronoDuration, _now: DateTime<Utc>) -> bool {
            self.live
        }
        fn load(&self) -> usize {
            self.load
        }
        fn last_heartbeat(&self) -> Option<DateTime<Utc>> {
            self.last_heartbeat
        }
    }

    #[test]
    fn picks_fewest_loaded_live_worker() {
        let now = Utc::now();
        let mut workers = HashMap::new();
        workers.insert("a".to_string(), Fake { load: 3, last_heartbeat: Some(now), live: true });
        workers.insert("b".to_string(), Fake { load: 1, last_heartbeat: Some(now), live: true });
        workers.insert("c".to_string(), Fake { load: 0, last_heartbeat: Some(now), live: false });

        let chosen = choose_least_loaded(&workers, ChronoDuration::seconds(30), now);
        assert_eq!(chosen, Some("b".to_string()));
    }

    #[test]
    fn ties_break_on_earliest_heartbeat() {
        let now = Utc::now();
        let earlier = now - ChronoDuration::seconds(10);
        let mut workers = HashMap::new();
        workers.insert("newer".to_string(), Fake { load: 1, last_heartbeat: Some(now), live: true });
        workers.insert("older".to_string(), Fake { load: 1, last_heartbeat: Some(earlier), live: true });

        let chosen = choose_least_loaded(&workers, ChronoDuration::seconds(30), now);
        assert_eq!(chosen, Some("older".to_string()));
    }

    #[test]
    fn no_live_workers_returns_none() {
        let now = Utc::now();
        let mut workers = HashMap::new();
        workers.insert("a".to_string(), Fake { load: 0, last_heartbeat: None, live: false });
        assert_eq!(choose_least_loaded(&workers, ChronoDuration::seconds(30), now), None);
    }
}
