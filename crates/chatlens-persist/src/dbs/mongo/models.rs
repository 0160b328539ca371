use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};

use chatlens_types::{IngestedFile, Message, Room, RoomSummary};

/// Room document without its messages, which live in `messages`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoRoom {
    #[serde(rename = "_id")]
    pub id: String,
    pub name: String,
    pub participants: Vec<String>,
    pub source_file_ids: Vec<String>,
    pub message_count: i64,
    pub next_sequence: i64,
    pub revision: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_message_at: Option<NaiveDateTime>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoMessage {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_id: String,
    pub author: String,
    pub text: String,
    pub timestamp: NaiveDateTime,
    pub sequence: i64,
    pub source_file_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MongoFile {
    #[serde(rename = "_id")]
    pub id: String,
    pub room_id: String,
    pub original_name: String,
    pub byte_size: i64,
    pub parsed_message_count: i64,
    pub ingested_at: DateTime<Utc>,
}

// Conversions between the shared model and the stored documents

impl From<&Room> for MongoRoom {
    fn from(room: &Room) -> Self {
        Self {
            id: room.id.clone(),
            name: room.name.clone(),
            participants: room.participants.iter().cloned().collect(),
            source_file_ids: room.source_file_ids.iter().cloned().collect(),
            message_count: room.message_count() as i64,
            next_sequence: room.next_sequence as i64,
            revision: room.revision as i64,
            last_message_at: room.last_message_at(),
            created_at: room.created_at,
            updated_at: room.updated_at,
        }
    }
}

impl MongoRoom {
    pub fn into_room(self, messages: Vec<Message>) -> Room {
        Room {
            id: self.id,
            name: self.name,
            participants: self.participants.into_iter().collect(),
            messages,
            source_file_ids: self.source_file_ids.into_iter().collect(),
            next_sequence: self.next_sequence.max(0) as u64,
            revision: self.revision.max(0) as u64,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            message_count: self.message_count.max(0) as usize,
            participant_count: self.participants.len(),
            participants: self.participants.clone(),
            file_count: self.source_file_ids.len(),
            last_message_at: self.last_message_at,
            last_message: RoomSummary::day_label(self.last_message_at),
            created_at: self.created_at,
            updated_at: self.updated_at,
            revision: self.revision.max(0) as u64,
        }
    }
}

impl From<&Message> for MongoMessage {
    fn from(msg: &Message) -> Self {
        Self {
            id: msg.id.clone(),
            room_id: msg.room_id.clone(),
            author: msg.author.clone(),
            text: msg.text.clone(),
            timestamp: msg.timestamp,
            sequence: msg.sequence as i64,
            source_file_id: msg.source_file_id.clone(),
        }
    }
}

impl From<MongoMessage> for Message {
    fn from(msg: MongoMessage) -> Self {
        Self {
            id: msg.id,
            room_id: msg.room_id,
            author: msg.author,
            text: msg.text,
            timestamp: msg.timestamp,
            sequence: msg.sequence.max(0) as u64,
            source_file_id: msg.source_file_id,
        }
    }
}

impl From<&IngestedFile> for MongoFile {
    fn from(file: &IngestedFile) -> Self {
        Self {
            id: file.id.clone(),
            room_id: file.room_id.clone(),
            original_name: file.original_name.clone(),
            byte_size: file.byte_size as i64,
            parsed_message_count: file.parsed_message_count as i64,
            ingested_at: file.ingested_at,
        }
    }
}

impl From<MongoFile> for IngestedFile {
    fn from(file: MongoFile) -> Self {
        Self {
            id: file.id,
            room_id: file.room_id,
            original_name: file.original_name,
            byte_size: file.byte_size.max(0) as u64,
            parsed_message_count: file.parsed_message_count.max(0) as usize,
            ingested_at: file.ingested_at,
        }
    }
}
