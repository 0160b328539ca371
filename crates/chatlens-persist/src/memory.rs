use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

use chatlens_types::{FileMeta, IngestedFile, ParsedMessage, Room, RoomSummary, Watermark};

use crate::error::{Result, StoreError};
use crate::store::{sort_summaries, validate_ingest, IngestOutcome, RoomStore, RoomTarget};

/// One room behind its own lock. `None` marks a room deleted while a
/// caller still held the slot.
struct RoomSlot {
    name: String,
    room: RwLock<Option<Room>>,
}

/// In-process room store.
///
/// Lock order: the room map is released before a slot lock is taken, and a
/// slot lock is always taken before the file index.
#[derive(Default)]
pub struct MemoryRoomStore {
    rooms: RwLock<HashMap<String, Arc<RoomSlot>>>,
    files: RwLock<HashMap<String, IngestedFile>>,
}

impl MemoryRoomStore {
    pub fn new() -> Self {
        Self::default()
    }

    async fn slot(&self, room_id: &str) -> Result<Arc<RoomSlot>> {
        self.rooms
            .read()
            .await
            .get(room_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))
    }

    /// Resolve the target to a slot, creating the room when needed.
    async fn resolve(&self, target: &RoomTarget, file: &FileMeta) -> Result<(Arc<RoomSlot>, bool)> {
        if let Some(id) = &target.room_id {
            return Ok((self.slot(id).await?, false));
        }

        let name = target.room_name(file);
        let mut rooms = self.rooms.write().await;
        if let Some(slot) = rooms.values().find(|s| s.name == name) {
            return Ok((slot.clone(), false));
        }

        let room = Room::new(name.clone());
        let id = room.id.clone();
        let slot = Arc::new(RoomSlot {
            name,
            room: RwLock::new(Some(room)),
        });
        rooms.insert(id.clone(), slot.clone());
        tracing::info!(room_id = %id, "Created room");
        Ok((slot, true))
    }

    async fn duplicate_outcome(&self, existing: IngestedFile) -> Result<IngestOutcome> {
        let room = self.get(&existing.room_id).await?;
        Ok(IngestOutcome {
            room: room.summary(),
            file: existing,
            new_messages: 0,
            duplicate: true,
            created: false,
        })
    }

    /// Drop a room created by an ingest that turned out to be a duplicate.
    async fn discard_created(&self, room_id: &str) {
        self.rooms.write().await.remove(room_id);
    }
}

#[async_trait]
impl RoomStore for MemoryRoomStore {
    async fn ingest(
        &self,
        target: RoomTarget,
        messages: Vec<ParsedMessage>,
        file: FileMeta,
    ) -> Result<IngestOutcome> {
        validate_ingest(&messages, &file)?;

        let known = self.files.read().await.get(&file.id).cloned();
        if let Some(existing) = known {
            tracing::debug!(file_id = %file.id, "File already ingested");
            return self.duplicate_outcome(existing).await;
        }

        let (slot, created) = self.resolve(&target, &file).await?;
        let mut guard = slot.room.write().await;
        let room = guard
            .as_mut()
            .ok_or_else(|| StoreError::NotFound(target.room_id.clone().unwrap_or_default()))?;

        let mut files = self.files.write().await;
        if let Some(existing) = files.get(&file.id).cloned() {
            // Lost a race with a concurrent upload of the same bytes.
            let room_id = room.id.clone();
            let empty = room.messages.is_empty();
            drop(files);
            if created && empty {
                *guard = None;
                drop(guard);
                self.discard_created(&room_id).await;
            } else {
                drop(guard);
            }
            return self.duplicate_outcome(existing).await;
        }

        let new_messages = room.append(&file.id, messages);
        let record = IngestedFile::from_meta(file, room.id.clone());
        files.insert(record.id.clone(), record.clone());

        tracing::info!(
            room_id = %room.id,
            file_id = %record.id,
            new_messages,
            total = room.message_count(),
            "Ingested file"
        );

        Ok(IngestOutcome {
            room: room.summary(),
            file: record,
            new_messages,
            duplicate: false,
            created,
        })
    }

    async fn get(&self, room_id: &str) -> Result<Room> {
        let slot = self.slot(room_id).await?;
        let guard = slot.room.read().await;
        guard
            .clone()
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))
    }

    async fn list(&self) -> Result<Vec<RoomSummary>> {
        let slots: Vec<Arc<RoomSlot>> = self.rooms.read().await.values().cloned().collect();
        let mut summaries = Vec::with_capacity(slots.len());
        for slot in slots {
            if let Some(room) = slot.room.read().await.as_ref() {
                summaries.push(room.summary());
            }
        }
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, room_id: &str) -> Result<()> {
        let slot = self
            .rooms
            .write()
            .await
            .remove(room_id)
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))?;

        let mut guard = slot.room.write().await;
        let removed = guard.take();
        let mut files = self.files.write().await;
        files.retain(|_, f| f.room_id != room_id);

        tracing::info!(
            room_id = %room_id,
            messages = removed.as_ref().map(|r| r.message_count()).unwrap_or(0),
            "Deleted room"
        );
        Ok(())
    }

    async fn files(&self, room_id: &str) -> Result<Vec<IngestedFile>> {
        let slot = self.slot(room_id).await?;
        let guard = slot.room.read().await;
        if guard.is_none() {
            return Err(StoreError::NotFound(room_id.to_string()));
        }
        let mut files: Vec<IngestedFile> = self
            .files
            .read()
            .await
            .values()
            .filter(|f| f.room_id == room_id)
            .cloned()
            .collect();
        files.sort_by(|a, b| a.ingested_at.cmp(&b.ingested_at));
        Ok(files)
    }

    async fn watermark(&self, room_id: &str) -> Result<Watermark> {
        let slot = self.slot(room_id).await?;
        let guard = slot.room.read().await;
        guard
            .as_ref()
            .map(Room::watermark)
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}
