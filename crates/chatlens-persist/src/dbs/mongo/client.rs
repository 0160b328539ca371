use async_trait::async_trait;
use mongodb::{bson::doc, Client};

use chatlens_types::{FileMeta, IngestedFile, Message, ParsedMessage, Room, RoomSummary, Watermark};

use crate::dbs::mongo::locks::KeyedLocks;
use crate::dbs::mongo::models::{MongoFile, MongoMessage, MongoRoom};
use crate::dbs::mongo::repositories::{MongoFileRepository, MongoMessageRepository, MongoRoomRepository};
use crate::error::{Result, StoreError};
use crate::store::{sort_summaries, validate_ingest, IngestOutcome, MessageQuery, RoomStore, RoomTarget};

/// MongoDB room store using the `rooms`, `messages` and `files` collections.
///
/// Writes to one room, and reads of a whole room, are serialized in-process.
/// An ingest that fails after resolving its room deletes the messages it
/// inserted and any room it created, so a room never shows a partially
/// applied file.
pub struct MongoRoomStore {
    client: Client,
    database: String,
    rooms: MongoRoomRepository,
    messages: MongoMessageRepository,
    files: MongoFileRepository,
    locks: KeyedLocks,
}

impl MongoRoomStore {
    /// Connect to MongoDB and create the store
    pub async fn connect(mongodb_uri: &str, database: &str) -> Result<Self> {
        let client = Client::with_uri_str(mongodb_uri)
            .await
            .map_err(|e| StoreError::StorageFault(format!("connection failed: {}", e)))?;

        Ok(Self {
            rooms: MongoRoomRepository::new(&client, database),
            messages: MongoMessageRepository::new(&client, database),
            files: MongoFileRepository::new(&client, database),
            database: database.to_string(),
            locks: KeyedLocks::default(),
            client,
        })
    }

    async fn resolve(&self, target: &RoomTarget, file: &FileMeta) -> Result<(MongoRoom, bool)> {
        if let Some(id) = &target.room_id {
            let room = self
                .rooms
                .get(id)
                .await?
                .ok_or_else(|| StoreError::NotFound(id.clone()))?;
            return Ok((room, false));
        }

        let name = target.room_name(file);
        let _name_guard = self.locks.lock(&format!("name:{}", name)).await;
        if let Some(room) = self.rooms.find_by_name(&name).await? {
            return Ok((room, false));
        }

        let doc = MongoRoom::from(&Room::new(name));
        self.rooms.insert(&doc).await?;
        tracing::info!(room_id = %doc.id, "Created room");
        Ok((doc, true))
    }

    async fn duplicate_outcome(&self, existing: IngestedFile) -> Result<IngestOutcome> {
        let room = self
            .rooms
            .get(&existing.room_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(existing.room_id.clone()))?;
        Ok(IngestOutcome {
            room: room.summary(),
            file: existing,
            new_messages: 0,
            duplicate: true,
            created: false,
        })
    }

    /// Writes one file into a room. Must be called with the room lock held.
    ///
    /// Message ids are pushed to `inserted` as soon as they are written so
    /// the caller can roll them back whatever the outcome.
    async fn apply(
        &self,
        room_id: &str,
        messages: Vec<ParsedMessage>,
        file: FileMeta,
        inserted: &mut Vec<String>,
    ) -> Result<Applied> {
        // Re-checked under the room lock; another upload may have won.
        if let Some(existing) = self.files.get(&file.id).await? {
            return Ok(Applied::Duplicate(existing.into()));
        }

        let current = self
            .rooms
            .get(room_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))?;
        let previous_count = current.message_count;
        let previous_last = current.last_message_at;

        let mut room = current.into_room(Vec::new());
        let new_messages = room.append(&file.id, messages);
        let record = IngestedFile::from_meta(file, room.id.clone());

        let mut doc = MongoRoom::from(&room);
        doc.message_count = previous_count + new_messages as i64;
        doc.last_message_at = doc.last_message_at.max(previous_last);

        let docs: Vec<MongoMessage> = room.messages.iter().map(MongoMessage::from).collect();
        inserted.extend(docs.iter().map(|m| m.id.clone()));
        self.messages.insert_many(&docs).await?;

        if let Err(e) = self.files.insert(&MongoFile::from(&record)).await {
            // A concurrent upload of the same bytes into another room won the insert.
            return match self.files.get(&record.id).await? {
                Some(existing) => Ok(Applied::Duplicate(existing.into())),
                None => Err(e),
            };
        }

        match self.rooms.replace(&doc).await {
            Ok(true) => Ok(Applied::Ingested { doc, record, new_messages }),
            outcome => {
                if let Err(e) = self.files.delete(&record.id).await {
                    tracing::error!(file_id = %record.id, error = %e, "Failed to remove file record");
                }
                Err(match outcome {
                    Err(e) => StoreError::StorageFault(format!("room update failed: {}", e)),
                    _ => StoreError::NotFound(room.id.clone()),
                })
            }
        }
    }

    /// Undo the message inserts of a failed ingest and drop a room that the
    /// same ingest created and left empty.
    async fn rollback(&self, room_id: &str, inserted: &[String], created: bool) {
        match self.messages.delete_ids(inserted).await {
            Ok(removed) => tracing::warn!(room_id = %room_id, removed, "Rolled back ingest"),
            Err(e) => tracing::error!(room_id = %room_id, error = %e, "Rollback failed"),
        }

        if !created {
            return;
        }
        let empty = match self.rooms.get(room_id).await {
            Ok(Some(room)) => room.message_count == 0,
            Ok(None) => false,
            Err(e) => {
                tracing::error!(room_id = %room_id, error = %e, "Could not check created room");
                false
            }
        };
        if empty {
            if let Err(e) = self.rooms.delete(room_id).await {
                tracing::error!(room_id = %room_id, error = %e, "Failed to remove created room");
            }
        }
    }
}

enum Applied {
    Ingested {
        doc: MongoRoom,
        record: IngestedFile,
        new_messages: usize,
    },
    Duplicate(IngestedFile),
}

#[async_trait]
impl RoomStore for MongoRoomStore {
    async fn ingest(
        &self,
        target: RoomTarget,
        messages: Vec<ParsedMessage>,
        file: FileMeta,
    ) -> Result<IngestOutcome> {
        validate_ingest(&messages, &file)?;

        if let Some(existing) = self.files.get(&file.id).await? {
            tracing::debug!(file_id = %file.id, "File already ingested");
            return self.duplicate_outcome(existing.into()).await;
        }

        let (resolved, created) = self.resolve(&target, &file).await?;
        let _guard = self.locks.lock(&resolved.id).await;

        let mut inserted = Vec::new();
        let applied = self.apply(&resolved.id, messages, file, &mut inserted).await;

        match applied {
            Ok(Applied::Ingested { doc, record, new_messages }) => {
                tracing::info!(
                    room_id = %doc.id,
                    file_id = %record.id,
                    new_messages,
                    total = doc.message_count,
                    "Ingested file"
                );
                Ok(IngestOutcome {
                    room: doc.summary(),
                    file: record,
                    new_messages,
                    duplicate: false,
                    created,
                })
            }
            Ok(Applied::Duplicate(existing)) => {
                self.rollback(&resolved.id, &inserted, created).await;
                self.duplicate_outcome(existing).await
            }
            Err(e) => {
                self.rollback(&resolved.id, &inserted, created).await;
                Err(e)
            }
        }
    }

    async fn get(&self, room_id: &str) -> Result<Room> {
        // Ingest writes messages before the room document.
        let _guard = self.locks.lock(room_id).await;
        let doc = self
            .rooms
            .get(room_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))?;
        let mut messages: Vec<Message> = self
            .messages
            .for_room(room_id)
            .await?
            .into_iter()
            .map(Message::from)
            .collect();
        messages.sort_by(|a, b| (a.timestamp, a.sequence).cmp(&(b.timestamp, b.sequence)));
        Ok(doc.into_room(messages))
    }

    async fn messages(&self, room_id: &str, query: &MessageQuery) -> Result<Vec<Message>> {
        let _guard = self.locks.lock(room_id).await;
        if self.rooms.get(room_id).await?.is_none() {
            return Err(StoreError::NotFound(room_id.to_string()));
        }
        let mut messages: Vec<Message> = self
            .messages
            .by_authors(room_id, &query.authors)
            .await?
            .into_iter()
            .map(Message::from)
            .collect();
        messages.sort_by(|a, b| (a.timestamp, a.sequence).cmp(&(b.timestamp, b.sequence)));
        Ok(query.apply(messages))
    }

    async fn list(&self) -> Result<Vec<RoomSummary>> {
        let mut summaries: Vec<RoomSummary> = self.rooms.list().await?.iter().map(MongoRoom::summary).collect();
        sort_summaries(&mut summaries);
        Ok(summaries)
    }

    async fn delete(&self, room_id: &str) -> Result<()> {
        let _guard = self.locks.lock(room_id).await;
        if !self.rooms.delete(room_id).await? {
            return Err(StoreError::NotFound(room_id.to_string()));
        }
        let messages = self.messages.delete_for_room(room_id).await?;
        let files = self.files.delete_for_room(room_id).await?;
        tracing::info!(room_id = %room_id, messages, files, "Deleted room");
        Ok(())
    }

    async fn files(&self, room_id: &str) -> Result<Vec<IngestedFile>> {
        if self.rooms.get(room_id).await?.is_none() {
            return Err(StoreError::NotFound(room_id.to_string()));
        }
        Ok(self
            .files
            .for_room(room_id)
            .await?
            .into_iter()
            .map(IngestedFile::from)
            .collect())
    }

    async fn watermark(&self, room_id: &str) -> Result<Watermark> {
        let doc = self
            .rooms
            .get(room_id)
            .await?
            .ok_or_else(|| StoreError::NotFound(room_id.to_string()))?;
        Ok(Watermark {
            message_count: doc.message_count.max(0) as usize,
            revision: doc.revision.max(0) as u64,
        })
    }

    async fn ping(&self) -> Result<()> {
        self.client
            .database(&self.database)
            .run_command(doc! { "ping": 1 })
            .await?;
        Ok(())
    }

    fn backend(&self) -> &'static str {
        "mongodb"
    }
}
