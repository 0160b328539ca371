//! Shared fixtures and store contract checks, run against every backend.
#![allow(dead_code)]

use std::collections::BTreeSet;
use std::sync::Arc;

use chatlens_persist::{MessageQuery, RoomStore, RoomTarget, StoreError};
use chatlens_types::{FileMeta, ParsedMessage};
use chrono::{NaiveDate, NaiveDateTime};

pub fn at(day: u32, hour: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 1, day)
        .unwrap()
        .and_hms_opt(hour, 0, 0)
        .unwrap()
}

pub fn parsed(author: &str, ts: NaiveDateTime, seq: u64) -> ParsedMessage {
    ParsedMessage {
        author: author.to_string(),
        text: format!("{} says hi", author),
        timestamp: ts,
        sequence: seq,
    }
}

pub fn said(author: &str, text: &str, ts: NaiveDateTime, seq: u64) -> ParsedMessage {
    ParsedMessage {
        text: text.to_string(),
        ..parsed(author, ts, seq)
    }
}

pub fn meta(id: &str, count: usize) -> FileMeta {
    FileMeta {
        id: id.to_string(),
        original_name: "KakaoTalk_Chat.txt".to_string(),
        byte_size: 128,
        parsed_message_count: count,
    }
}

pub async fn ingest_then_reingest_is_noop(store: Arc<dyn RoomStore>) {
    let messages = vec![parsed("Alice", at(1, 9), 0), parsed("Bob", at(1, 10), 1)];
    let first = store
        .ingest(RoomTarget::by_name("Team"), messages.clone(), meta("same", 2))
        .await
        .unwrap();
    assert!(first.created);
    assert_eq!(first.new_messages, 2);

    let second = store
        .ingest(RoomTarget::by_name("Team"), messages, meta("same", 2))
        .await
        .unwrap();
    assert!(second.duplicate);
    assert_eq!(second.room.id, first.room.id);

    let room = store.get(&first.room.id).await.unwrap();
    assert_eq!(room.messages.len(), 2);
    assert_eq!(room.participants, BTreeSet::from(["Alice".to_string(), "Bob".to_string()]));
    assert_eq!(room.revision, 1);
    assert_eq!(store.files(&first.room.id).await.unwrap().len(), 1);
}

pub async fn delete_removes_everything(store: Arc<dyn RoomStore>) {
    let outcome = store
        .ingest(RoomTarget::by_name("Gone"), vec![parsed("A", at(1, 1), 0)], meta("f-del", 1))
        .await
        .unwrap();
    let id = outcome.room.id;

    store.delete(&id).await.unwrap();

    assert!(matches!(store.get(&id).await, Err(StoreError::NotFound(_))));
    assert!(matches!(store.files(&id).await, Err(StoreError::NotFound(_))));
    assert!(store.list().await.unwrap().is_empty());
    assert!(store.delete(&id).await.unwrap_err().is_not_found());
}

pub async fn unknown_room_id_is_not_found(store: Arc<dyn RoomStore>) {
    let err = store
        .ingest(RoomTarget::by_id("missing"), vec![parsed("A", at(1, 1), 0)], meta("f-missing", 1))
        .await
        .unwrap_err();
    assert!(err.is_not_found());
    assert!(store.list().await.unwrap().is_empty());
}

pub async fn message_query_filters_one_room(store: Arc<dyn RoomStore>) {
    let outcome = store
        .ingest(
            RoomTarget::by_name("search"),
            vec![
                said("Alice", "내일 배포 예정", at(1, 9), 0),
                said("Bob", "Deploy checklist", at(2, 10), 1),
                said("Alice", "점심 뭐 먹죠", at(3, 12), 2),
                said("Carol", "배포 완료", at(4, 18), 3),
            ],
            meta("f-search", 4),
        )
        .await
        .unwrap();
    let id = outcome.room.id;

    let all = store.messages(&id, &MessageQuery::new()).await.unwrap();
    assert_eq!(all.len(), 4);

    let deploys = store
        .messages(&id, &MessageQuery::new().keyword("배포").keyword("deploy"))
        .await
        .unwrap();
    let authors: Vec<&str> = deploys.iter().map(|m| m.author.as_str()).collect();
    assert_eq!(authors, vec!["Alice", "Bob", "Carol"]);

    let alice_early = store
        .messages(&id, &MessageQuery::new().author("Alice").until(at(2, 0)))
        .await
        .unwrap();
    assert_eq!(alice_early.len(), 1);
    assert_eq!(alice_early[0].text, "내일 배포 예정");

    let window = store
        .messages(&id, &MessageQuery::new().since(at(2, 0)).until(at(4, 0)).limit(5))
        .await
        .unwrap();
    assert_eq!(window.len(), 2);

    assert!(store
        .messages("missing", &MessageQuery::new())
        .await
        .unwrap_err()
        .is_not_found());
}

/// Whole-room reads taken while ingests run always agree with themselves.
pub async fn reads_are_consistent_during_ingest(store: Arc<dyn RoomStore>) {
    let seed = store
        .ingest(RoomTarget::by_name("busy"), vec![parsed("seed", at(1, 0), 0)], meta("busy-seed", 1))
        .await
        .unwrap();
    let room_id = seed.room.id.clone();

    let writer = {
        let store = store.clone();
        let room_id = room_id.clone();
        tokio::spawn(async move {
            for i in 0..12u32 {
                let author = format!("user{}", i);
                let messages = vec![parsed(&author, at(2, i), 0), parsed(&author, at(3, i), 1)];
                store
                    .ingest(RoomTarget::by_id(room_id.clone()), messages, meta(&format!("busy-{}", i), 2))
                    .await
                    .unwrap();
            }
        })
    };

    while !writer.is_finished() {
        let room = store.get(&room_id).await.unwrap();
        let authors: BTreeSet<String> = room.messages.iter().map(|m| m.author.clone()).collect();
        assert_eq!(room.participants, authors);
        assert_eq!(room.messages.len() % 2, 1);
        tokio::task::yield_now().await;
    }
    writer.await.unwrap();

    let room = store.get(&room_id).await.unwrap();
    assert_eq!(room.messages.len(), 25);
    assert_eq!(room.participants.len(), 13);
}
