use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// A message as produced by the log parser, before it belongs to a room.
///
/// `sequence` is a zero-based counter over the messages parsed from one file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedMessage {
    pub author: String,
    pub text: String,
    pub timestamp: NaiveDateTime,
    pub sequence: u64,
}

/// A stored chat message. Immutable once created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Message {
    pub id: String,
    pub room_id: String,
    pub author: String,
    pub text: String,
    /// Wall-clock time as written in the export (no timezone)
    pub timestamp: NaiveDateTime,
    /// Room-wide append counter
    pub sequence: u64,
    pub source_file_id: String,
}

/// Point in room history used to detect stale snapshots.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    pub message_count: usize,
    pub revision: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Room {
    pub id: String,
    pub name: String,
    pub participants: BTreeSet<String>,
    pub messages: Vec<Message>,
    pub source_file_ids: BTreeSet<String>,
    pub next_sequence: u64,
    pub revision: u64,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Room {
    pub fn new(name: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: uuid::Uuid::new_v4().to_string(),
            name: name.into(),
            participants: BTreeSet::new(),
            messages: Vec::new(),
            source_file_ids: BTreeSet::new(),
            next_sequence: 0,
            revision: 0,
            created_at: now,
            updated_at: now,
        }
    }

    pub fn message_count(&self) -> usize {
        self.messages.len()
    }

    pub fn watermark(&self) -> Watermark {
        Watermark {
            message_count: self.messages.len(),
            revision: self.revision,
        }
    }

    pub fn last_message_at(&self) -> Option<NaiveDateTime> {
        self.messages.iter().map(|m| m.timestamp).max()
    }

    /// Merge the messages of one uploaded file into the room.
    ///
    /// Sequence numbers continue the room counter in file order, messages
    /// stay sorted by `(timestamp, sequence)` and `participants` is rebuilt
    /// from the merged set. Returns the number of messages appended.
    pub fn append(&mut self, file_id: &str, parsed: Vec<ParsedMessage>) -> usize {
        let appended = parsed.len();
        let base = self.next_sequence;

        for (offset, p) in parsed.into_iter().enumerate() {
            self.participants.insert(p.author.clone());
            self.messages.push(Message {
                id: uuid::Uuid::new_v4().to_string(),
                room_id: self.id.clone(),
                author: p.author,
                text: p.text,
                timestamp: p.timestamp,
                sequence: base + offset as u64,
                source_file_id: file_id.to_string(),
            });
        }

        self.messages
            .sort_by(|a, b| (a.timestamp, a.sequence).cmp(&(b.timestamp, b.sequence)));
        self.next_sequence = base + appended as u64;
        self.source_file_ids.insert(file_id.to_string());
        self.revision += 1;
        self.updated_at = Utc::now();

        appended
    }

    pub fn summary(&self) -> RoomSummary {
        RoomSummary {
            id: self.id.clone(),
            name: self.name.clone(),
            message_count: self.messages.len(),
            participant_count: self.participants.len(),
            participants: self.participants.iter().cloned().collect(),
            file_count: self.source_file_ids.len(),
            last_message_at: self.last_message_at(),
            last_message: RoomSummary::day_label(self.last_message_at()),
            created_at: self.created_at,
            updated_at: self.updated_at,
            revision: self.revision,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSummary {
    pub id: String,
    pub name: String,
    pub message_count: usize,
    pub participant_count: usize,
    pub participants: Vec<String>,
    pub file_count: usize,
    pub last_message_at: Option<NaiveDateTime>,
    /// Day of the last message as `YYYY-MM-DD`, the form room lists show
    #[serde(default)]
    pub last_message: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub revision: u64,
}

impl RoomSummary {
    pub fn day_label(at: Option<NaiveDateTime>) -> Option<String> {
        at.map(|t| t.format("%Y-%m-%d").to_string())
    }
}

/// Upload metadata handed to the store alongside parsed messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct FileMeta {
    /// Content hash of the uploaded bytes
    pub id: String,
    pub original_name: String,
    pub byte_size: u64,
    pub parsed_message_count: usize,
}

/// Audit record of one successful upload. Never mutated.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct IngestedFile {
    pub id: String,
    pub room_id: String,
    pub original_name: String,
    pub byte_size: u64,
    pub parsed_message_count: usize,
    pub ingested_at: DateTime<Utc>,
}

impl IngestedFile {
    pub fn from_meta(meta: FileMeta, room_id: impl Into<String>) -> Self {
        Self {
            id: meta.id,
            room_id: room_id.into(),
            original_name: meta.original_name,
            byte_size: meta.byte_size,
            parsed_message_count: meta.parsed_message_count,
            ingested_at: Utc::now(),
        }
    }
}
