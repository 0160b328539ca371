use chatlens_stats::{SnapshotCache, StatisticsEngine, StatsConfig};
use chatlens_types::{ParsedMessage, Room};
use chrono::{Duration, NaiveDate, NaiveDateTime};

fn base() -> NaiveDateTime {
    // A Monday
    NaiveDate::from_ymd_opt(2024, 1, 15).unwrap().and_hms_opt(0, 0, 0).unwrap()
}

fn msg(author: &str, text: &str, ts: NaiveDateTime) -> ParsedMessage {
    ParsedMessage {
        author: author.to_string(),
        text: text.to_string(),
        timestamp: ts,
        sequence: 0,
    }
}

fn room_with(messages: Vec<ParsedMessage>) -> Room {
    let mut room = Room::new("stats");
    room.append("file", messages);
    room
}

#[test]
fn test_hundred_messages_across_the_day() {
    let messages = (0..100)
        .map(|i| msg("A", "hello", base() + Duration::minutes(i * 14)))
        .collect();
    let snapshot = StatisticsEngine::default().compute(&room_with(messages));

    assert_eq!(snapshot.hourly_histogram.iter().sum::<u64>(), 100);
    assert_eq!(snapshot.message_count, 100);
    assert_eq!(snapshot.per_participant_counts["A"], 100);
}

#[test]
fn test_hour_buckets() {
    let messages = [8, 8, 20, 20, 20]
        .iter()
        .map(|h| msg("A", "x", base() + Duration::hours(*h)))
        .collect();
    let snapshot = StatisticsEngine::default().compute(&room_with(messages));

    assert_eq!(snapshot.hourly_histogram[8], 2);
    assert_eq!(snapshot.hourly_histogram[20], 3);
    let others: u64 = snapshot
        .hourly_histogram
        .iter()
        .enumerate()
        .filter(|(h, _)| *h != 8 && *h != 20)
        .map(|(_, c)| *c)
        .sum();
    assert_eq!(others, 0);
    assert_eq!(snapshot.peak_hours(1), vec![(20, 3)]);
}

#[test]
fn test_empty_room() {
    let snapshot = StatisticsEngine::default().compute(&Room::new("empty"));

    assert_eq!(snapshot.message_count, 0);
    assert_eq!(snapshot.sentiment_distribution.total(), 0.0);
    assert!(snapshot.top_keywords.is_empty());
    assert!(snapshot.participants.is_empty());
}

#[test]
fn test_sentiment_fractions_sum_to_one() {
    for n in [1usize, 2, 3, 7, 11, 50] {
        let messages = (0..n)
            .map(|i| {
                let text = match i % 3 {
                    0 => "정말 좋아요",
                    1 => "너무 짜증나",
                    _ => "점심 뭐 먹어",
                };
                msg("A", text, base() + Duration::minutes(i as i64))
            })
            .collect();
        let snapshot = StatisticsEngine::default().compute(&room_with(messages));
        let total = snapshot.sentiment_distribution.total();
        assert!((total - 1.0).abs() <= 0.01, "n={} total={}", n, total);
    }
}

#[test]
fn test_keywords_and_participants() {
    let messages = vec![
        msg("철수", "회의 자료 공유합니다", base() + Duration::hours(9)),
        msg("영희", "회의 몇 시에 해요?", base() + Duration::hours(9) + Duration::minutes(5)),
        msg("철수", "회의는 3시 ㅋㅋㅋㅋ", base() + Duration::hours(10)),
        msg("철수", "자료 확인 부탁", base() + Duration::days(1) + Duration::hours(10)),
    ];
    let snapshot = StatisticsEngine::default().compute(&room_with(messages));

    assert_eq!(snapshot.top_keywords[0].term, "회의");
    assert_eq!(snapshot.top_keywords[0].count, 2);
    assert_eq!(snapshot.top_keywords[1].term, "자료");
    assert!(snapshot.top_keywords.iter().all(|k| k.term != "ㅋㅋ"));

    assert_eq!(snapshot.weekday_histogram[0], 3);
    assert_eq!(snapshot.weekday_histogram[1], 1);

    let lead = &snapshot.participants[0];
    assert_eq!(lead.author, "철수");
    assert_eq!(lead.message_count, 3);
    assert_eq!(lead.most_active_hour, 10);
    assert_eq!(lead.first_message_at, base() + Duration::hours(9));
}

#[test]
fn test_custom_config() {
    let config = StatsConfig {
        top_keywords: 1,
        extra_stopwords: vec!["Rust".to_string()],
        ..StatsConfig::default()
    };
    let messages = vec![
        msg("A", "rust rust tokio", base()),
        msg("A", "tokio axum", base()),
    ];
    let snapshot = StatisticsEngine::new(config).compute(&room_with(messages));
    assert_eq!(snapshot.top_keywords.len(), 1);
    assert_eq!(snapshot.top_keywords[0].term, "tokio");
}

#[test]
fn test_snapshot_serializes_watermark() {
    let snapshot = StatisticsEngine::default().compute(&room_with(vec![msg("A", "hi", base())]));
    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["watermark"]["messageCount"], 1);
    assert_eq!(json["watermark"]["revision"], 1);
    assert_eq!(json["hourlyHistogram"].as_array().unwrap().len(), 24);
}

#[tokio::test]
async fn test_cache_is_keyed_by_watermark() {
    let engine = StatisticsEngine::default();
    let cache = SnapshotCache::new();
    let mut room = room_with(vec![msg("A", "hi", base())]);

    let first = cache.get_or_compute(&engine, &room).await;
    let again = cache.get_or_compute(&engine, &room).await;
    assert!(std::sync::Arc::ptr_eq(&first, &again));

    room.append("second", vec![msg("B", "hey", base() + Duration::hours(1))]);
    assert!(cache.get(&room.id, room.watermark()).await.is_none());

    let fresh = cache.get_or_compute(&engine, &room).await;
    assert_eq!(fresh.message_count, 2);
    assert_eq!(cache.len().await, 1);

    cache.invalidate(&room.id).await;
    assert!(cache.is_empty().await);
}
