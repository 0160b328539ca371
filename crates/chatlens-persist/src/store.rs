use async_trait::async_trait;
use chrono::NaiveDateTime;
use std::path::Path;

use chatlens_types::{FileMeta, IngestedFile, Message, ParsedMessage, Room, RoomSummary, Watermark};

use crate::error::{Result, StoreError};

/// Where an upload should land.
///
/// An explicit `room_id` wins and must exist. Otherwise a room whose name
/// equals `name_hint` is reused, or a new room is created.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RoomTarget {
    pub room_id: Option<String>,
    pub name_hint: Option<String>,
}

impl RoomTarget {
    pub fn new(room_id: Option<String>, name_hint: Option<String>) -> Self {
        let clean = |v: Option<String>| v.map(|s| s.trim().to_string()).filter(|s| !s.is_empty());
        Self {
            room_id: clean(room_id),
            name_hint: clean(name_hint),
        }
    }

    pub fn by_id(room_id: impl Into<String>) -> Self {
        Self::new(Some(room_id.into()), None)
    }

    pub fn by_name(name: impl Into<String>) -> Self {
        Self::new(None, Some(name.into()))
    }

    /// Name for a room created by this target.
    pub fn room_name(&self, file: &FileMeta) -> String {
        if let Some(name) = &self.name_hint {
            return name.clone();
        }
        Path::new(&file.original_name)
            .file_stem()
            .and_then(|s| s.to_str())
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or("Untitled room")
            .to_string()
    }
}

/// Message filter within one room. Empty fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MessageQuery {
    /// Case-insensitive substrings; any one must occur in the text
    pub keywords: Vec<String>,
    /// Exact author names; the author must be one of them
    pub authors: Vec<String>,
    pub from: Option<NaiveDateTime>,
    /// Inclusive
    pub to: Option<NaiveDateTime>,
    pub limit: Option<usize>,
}

impl MessageQuery {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn keyword(mut self, keyword: impl Into<String>) -> Self {
        self.keywords.push(keyword.into());
        self
    }

    pub fn author(mut self, author: impl Into<String>) -> Self {
        self.authors.push(author.into());
        self
    }

    pub fn since(mut self, from: NaiveDateTime) -> Self {
        self.from = Some(from);
        self
    }

    pub fn until(mut self, to: NaiveDateTime) -> Self {
        self.to = Some(to);
        self
    }

    pub fn limit(mut self, limit: usize) -> Self {
        self.limit = Some(limit);
        self
    }

    pub fn matches(&self, message: &Message) -> bool {
        if self.from.is_some_and(|from| message.timestamp < from) {
            return false;
        }
        if self.to.is_some_and(|to| message.timestamp > to) {
            return false;
        }
        if !self.authors.is_empty() && !self.authors.iter().any(|a| a == &message.author) {
            return false;
        }

        let mut keywords = self
            .keywords
            .iter()
            .map(|k| k.trim())
            .filter(|k| !k.is_empty())
            .peekable();
        if keywords.peek().is_none() {
            return true;
        }
        let text = message.text.to_lowercase();
        keywords.any(|k| text.contains(&k.to_lowercase()))
    }

    /// Keep matching messages in their given order, up to `limit`.
    pub fn apply(&self, messages: impl IntoIterator<Item = Message>) -> Vec<Message> {
        messages
            .into_iter()
            .filter(|m| self.matches(m))
            .take(self.limit.unwrap_or(usize::MAX))
            .collect()
    }
}

#[derive(Debug, Clone)]
pub struct IngestOutcome {
    pub room: RoomSummary,
    pub file: IngestedFile,
    pub new_messages: usize,
    /// The file id was already recorded; nothing changed
    pub duplicate: bool,
    pub created: bool,
}

/// Storage contract for rooms, their messages and upload records.
///
/// All mutations of one room are serialized. Reads return a consistent
/// copy and never observe a half-applied ingest.
#[async_trait]
pub trait RoomStore: Send + Sync {
    /// Merge parsed messages into the target room, all-or-nothing per file.
    /// Re-ingesting a known file id is a no-op reported as `duplicate`.
    async fn ingest(
        &self,
        target: RoomTarget,
        messages: Vec<ParsedMessage>,
        file: FileMeta,
    ) -> Result<IngestOutcome>;

    async fn get(&self, room_id: &str) -> Result<Room>;

    /// Messages of one room matching `query`, in room order.
    async fn messages(&self, room_id: &str, query: &MessageQuery) -> Result<Vec<Message>> {
        let room = self.get(room_id).await?;
        Ok(query.apply(room.messages))
    }

    /// Summaries ordered by most recent message, newest first
    async fn list(&self) -> Result<Vec<RoomSummary>>;

    /// Remove the room with its messages and file records.
    /// Returns `NotFound` when the room does not exist.
    async fn delete(&self, room_id: &str) -> Result<()>;

    async fn files(&self, room_id: &str) -> Result<Vec<IngestedFile>>;

    async fn watermark(&self, room_id: &str) -> Result<Watermark>;

    /// Backend health check
    async fn ping(&self) -> Result<()> {
        Ok(())
    }

    fn backend(&self) -> &'static str;
}

pub(crate) fn validate_ingest(messages: &[ParsedMessage], file: &FileMeta) -> Result<()> {
    if file.id.trim().is_empty() {
        return Err(StoreError::InvalidInput("file id must not be empty".to_string()));
    }
    if messages.is_empty() {
        return Err(StoreError::InvalidInput("no messages to ingest".to_string()));
    }
    if messages.iter().any(|m| m.author.trim().is_empty()) {
        return Err(StoreError::InvalidInput("message author must not be empty".to_string()));
    }
    Ok(())
}

/// Newest last message first; rooms without messages sort last.
pub(crate) fn sort_summaries(summaries: &mut [RoomSummary]) {
    summaries.sort_by(|a, b| {
        b.last_message_at
            .cmp(&a.last_message_at)
            .then_with(|| b.updated_at.cmp(&a.updated_at))
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn meta(name: &str) -> FileMeta {
        FileMeta {
            id: "abc".to_string(),
            original_name: name.to_string(),
            byte_size: 10,
            parsed_message_count: 1,
        }
    }

    fn message(author: &str, text: &str, hour: u32) -> Message {
        Message {
            id: format!("{}-{}", author, hour),
            room_id: "room".to_string(),
            author: author.to_string(),
            text: text.to_string(),
            timestamp: chrono::NaiveDate::from_ymd_opt(2024, 5, 1)
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap(),
            sequence: hour as u64,
            source_file_id: "abc".to_string(),
        }
    }

    #[test]
    fn test_empty_query_matches_everything() {
        assert!(MessageQuery::new().matches(&message("Alice", "hi", 9)));
        assert!(MessageQuery::new().keyword("  ").matches(&message("Alice", "hi", 9)));
    }

    #[test]
    fn test_query_filters_combine() {
        let at = |h| message("Alice", "x", h).timestamp;
        let query = MessageQuery::new()
            .keyword("Deploy")
            .keyword("배포")
            .author("Alice")
            .since(at(9))
            .until(at(12));

        assert!(query.matches(&message("Alice", "deploy today", 9)));
        assert!(query.matches(&message("Alice", "내일 배포", 12)));
        assert!(!query.matches(&message("Bob", "deploy today", 10)));
        assert!(!query.matches(&message("Alice", "lunch", 10)));
        assert!(!query.matches(&message("Alice", "deploy", 13)));
    }

    #[test]
    fn test_apply_respects_limit() {
        let messages = (1..=5).map(|h| message("Alice", "hi", h));
        let kept = MessageQuery::new().limit(2).apply(messages);
        assert_eq!(kept.iter().map(|m| m.sequence).collect::<Vec<_>>(), vec![1, 2]);
    }

    #[test]
    fn test_target_trims_blank_values() {
        let target = RoomTarget::new(Some("  ".to_string()), Some(" 가족방 ".to_string()));
        assert_eq!(target.room_id, None);
        assert_eq!(target.name_hint.as_deref(), Some("가족방"));
    }

    #[test]
    fn test_room_name_falls_back_to_file_stem() {
        let target = RoomTarget::default();
        assert_eq!(target.room_name(&meta("KakaoTalk_Chat_Team.txt")), "KakaoTalk_Chat_Team");
        assert_eq!(target.room_name(&meta(".txt")), ".txt");
        assert_eq!(RoomTarget::by_name("Team").room_name(&meta("x.txt")), "Team");
    }
}
