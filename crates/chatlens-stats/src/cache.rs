use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use chatlens_types::{Room, StatisticsSnapshot, Watermark};

use crate::engine::StatisticsEngine;

/// Latest snapshot per room, valid only for the watermark it was computed at.
#[derive(Default)]
pub struct SnapshotCache {
    entries: RwLock<HashMap<String, Arc<StatisticsSnapshot>>>,
}

impl SnapshotCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cached snapshot if it was computed at `watermark`
    pub async fn get(&self, room_id: &str, watermark: Watermark) -> Option<Arc<StatisticsSnapshot>> {
        self.entries
            .read()
            .await
            .get(room_id)
            .filter(|s| s.watermark == watermark)
            .cloned()
    }

    pub async fn insert(&self, snapshot: StatisticsSnapshot) -> Arc<StatisticsSnapshot> {
        let snapshot = Arc::new(snapshot);
        let mut entries = self.entries.write().await;
        // Never replace a newer snapshot with an older one.
        let newer_cached = entries
            .get(&snapshot.room_id)
            .is_some_and(|s| s.watermark.revision > snapshot.watermark.revision);
        if !newer_cached {
            entries.insert(snapshot.room_id.clone(), snapshot.clone());
        }
        snapshot
    }

    /// Snapshot for the room as given, computing it on a miss.
    pub async fn get_or_compute(&self, engine: &StatisticsEngine, room: &Room) -> Arc<StatisticsSnapshot> {
        if let Some(hit) = self.get(&room.id, room.watermark()).await {
            tracing::debug!(room_id = %room.id, "Snapshot cache hit");
            return hit;
        }
        self.insert(engine.compute(room)).await
    }

    pub async fn invalidate(&self, room_id: &str) {
        self.entries.write().await.remove(room_id);
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}
