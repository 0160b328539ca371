use serde_json::{Map, Value};
use std::collections::VecDeque;
use std::sync::Arc;
use tokio::sync::RwLock;

use chatlens::Chatlens;

use crate::config::Config;

/// Exports kept for download before the oldest is dropped
pub const MAX_EXPORTS: usize = 16;

/// Shared application state passed to all handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub chatlens: Chatlens,
    pub exports: Arc<RwLock<ExportStore>>,
    pub settings: Arc<RwLock<Map<String, Value>>>,
}

impl AppState {
    pub fn new(config: Config, chatlens: Chatlens) -> Self {
        Self {
            config: Arc::new(config),
            chatlens,
            exports: Arc::new(RwLock::new(ExportStore::new(MAX_EXPORTS))),
            settings: Arc::new(RwLock::new(Map::new())),
        }
    }
}

/// Export documents held in memory, oldest evicted first.
#[derive(Debug)]
pub struct ExportStore {
    capacity: usize,
    documents: VecDeque<(String, Value)>,
}

impl ExportStore {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            documents: VecDeque::new(),
        }
    }

    pub fn insert(&mut self, document: Value) -> String {
        let id = uuid::Uuid::new_v4().to_string();
        while self.documents.len() >= self.capacity {
            self.documents.pop_front();
        }
        self.documents.push_back((id.clone(), document));
        id
    }

    pub fn get(&self, id: &str) -> Option<&Value> {
        self.documents.iter().find(|(key, _)| key == id).map(|(_, doc)| doc)
    }

    pub fn len(&self) -> usize {
        self.documents.len()
    }

    pub fn is_empty(&self) -> bool {
        self.documents.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_oldest_export_is_evicted() {
        let mut store = ExportStore::new(2);
        let first = store.insert(json!({"n": 1}));
        let second = store.insert(json!({"n": 2}));
        let third = store.insert(json!({"n": 3}));

        assert_eq!(store.len(), 2);
        assert!(store.get(&first).is_none());
        assert_eq!(store.get(&second), Some(&json!({"n": 2})));
        assert_eq!(store.get(&third), Some(&json!({"n": 3})));
    }
}
