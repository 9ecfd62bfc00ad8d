use moka::sync::Cache;
use std::sync::Arc;
use std::time::Duration;
use uuid::Uuid;

use crate::services::pipeline::AnalysisRun;

/// In-memory store of completed analysis runs, bounded by entry count and
/// evicting runs that have not been read within the idle window.
#[derive(Clone)]
pub struct SessionStore {
    runs: Cache<Uuid, Arc<AnalysisRun>>,
}

impl SessionStore {
    pub fn new(capacity: u64, time_to_idle: Duration) -> Self {
        Self {
            runs: Cache::builder()
                .max_capacity(capacity)
                .time_to_idle(time_to_idle)
                .build(),
        }
    }

    pub fn insert(&self, run: AnalysisRun) -> Arc<AnalysisRun> {
        let run = Arc::new(run);
        self.runs.insert(run.id, Arc::clone(&run));
        tracing::debug!("Stored analysis {}", run.id);
        run
    }

    pub fn get(&self, id: &Uuid) -> Option<Arc<AnalysisRun>> {
        self.runs.get(id)
    }

    pub fn remove(&self, id: &Uuid) -> Option<Arc<AnalysisRun>> {
        self.runs.remove(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AnalysisOptions;
    use crate::models::{Column, Table};
    use crate::services::pipeline::analyze;

    fn run() -> AnalysisRun {
        let raw = Table::new(vec![Column::raw("v", vec!["1".into(), "2".into()])]).unwrap();
        analyze(&raw, &AnalysisOptions::default()).unwrap()
    }

    #[test]
    fn test_insert_get_remove() {
        let store = SessionStore::new(8, Duration::from_secs(60));
        let stored = store.insert(run());
        let id = stored.id;

        let fetched = store.get(&id).unwrap();
        assert!(Arc::ptr_eq(&stored, &fetched));

        assert!(store.remove(&id).is_some());
        assert!(store.get(&id).is_none());
        assert!(store.remove(&id).is_none());
    }

    #[test]
    fn test_unknown_id_is_absent() {
        let store = SessionStore::new(8, Duration::from_secs(60));
        assert!(store.get(&Uuid::new_v4()).is_none());
    }
}
