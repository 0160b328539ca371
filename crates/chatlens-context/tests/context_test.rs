use chatlens_context::{ContextConfig, ContextStrategy, DefaultContextStrategy};
use chatlens_llm::Message;
use chatlens_stats::StatisticsEngine;
use chatlens_types::{AnalysisType, ParsedMessage, Room};
use chrono::{Duration, NaiveDate};

fn room(n: usize) -> Room {
    let base = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
    let messages = (0..n)
        .map(|i| ParsedMessage {
            author: if i % 2 == 0 { "철수" } else { "영희" }.to_string(),
            text: format!("메시지 번호 {} 입니다. 오늘 회의 자료 확인 부탁드려요", i),
            timestamp: base + Duration::minutes(i as i64),
            sequence: i as u64,
        })
        .collect();
    let mut room = Room::new("프로젝트방");
    room.append("file", messages);
    room
}

fn user_text(messages: &[Message]) -> &str {
    messages.iter().find(|m| matches!(m, Message::Human { .. })).unwrap().content()
}

#[test]
fn test_small_room_fits_entirely() {
    let room = room(10);
    let snapshot = StatisticsEngine::default().compute(&room);
    let strategy = DefaultContextStrategy::new(ContextConfig::default()).unwrap();

    let window = strategy.build(&room, &snapshot, AnalysisType::Comprehensive).unwrap();

    assert_eq!(window.included_messages, 10);
    assert_eq!(window.omitted_messages, 0);
    assert!(window.system_prompt.contains("Korean"));

    let text = user_text(&window.messages);
    assert!(text.contains("- Messages: 10"));
    assert!(text.contains("[2024-03-01 09:00] 철수: 메시지 번호 0"));
    assert!(!text.contains("omitted"));
}

#[test]
fn test_message_cap_keeps_latest() {
    let room = room(50);
    let snapshot = StatisticsEngine::default().compute(&room);
    let config = ContextConfig {
        max_messages: 20,
        ..ContextConfig::default()
    };
    let strategy = DefaultContextStrategy::new(config).unwrap();

    let window = strategy.build(&room, &snapshot, AnalysisType::Topics).unwrap();

    assert_eq!(window.included_messages, 20);
    assert_eq!(window.omitted_messages, 30);
    let text = user_text(&window.messages);
    assert!(text.contains("(30 earlier messages omitted)"));
    assert!(text.contains("메시지 번호 49"));
    assert!(!text.contains("메시지 번호 29 "));
}

#[test]
fn test_token_budget_is_respected() {
    let room = room(400);
    let snapshot = StatisticsEngine::default().compute(&room);
    let config = ContextConfig {
        max_context_tokens: 1500,
        ..ContextConfig::default()
    };
    let strategy = DefaultContextStrategy::new(config).unwrap();

    let window = strategy.build(&room, &snapshot, AnalysisType::Sentiment).unwrap();

    assert!(window.prompt_tokens <= 1500, "{} tokens", window.prompt_tokens);
    assert!(window.included_messages > 0);
    assert_eq!(window.included_messages + window.omitted_messages, 400);
    assert!(user_text(&window.messages).contains("메시지 번호 399"));
}

#[test]
fn test_into_messages_puts_system_first() {
    let room = room(3);
    let snapshot = StatisticsEngine::default().compute(&room);
    let strategy = DefaultContextStrategy::new(ContextConfig::default()).unwrap();

    let messages = strategy
        .build(&room, &snapshot, AnalysisType::Keywords)
        .unwrap()
        .into_messages();

    assert_eq!(messages.len(), 2);
    assert!(matches!(messages[0], Message::System { .. }));
    assert!(messages[1].content().contains("10 most frequently"));
}
