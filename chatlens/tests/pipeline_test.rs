use async_trait::async_trait;
use chrono::NaiveDate;
use std::sync::Arc;
use tokio_test::{assert_err, assert_ok};

use chatlens::llm::{ChatRequest, ChatResponse, OpenAIConfig, ProviderConfig};
use chatlens::prelude::*;
use chatlens::{ChatClient, IngestError, ParseError, ParserConfig, StoreError};

struct EchoClient;

#[async_trait]
impl ChatClient for EchoClient {
    async fn chat(&self, request: ChatRequest) -> chatlens::llm::Result<ChatResponse> {
        Ok(ChatResponse {
            content: Some(format!("{} messages analysed", request.messages.len())),
            usage: None,
            finish_reason: Some("stop".to_string()),
            model: Some(request.model),
        })
    }

    async fn validate_key(&self) -> chatlens::llm::Result<()> {
        Ok(())
    }
}

const EXPORT: &str = "\
팀 채팅방 님과 카카오톡 대화
저장한 날짜 : 2024-03-05 21:10

--------------- 2024년 3월 4일 월요일 ---------------
[Alice] [오전 8:01] 좋은 아침입니다
[Bob] [오전 8:30] 오늘 회의 몇 시죠?
[Alice] [오후 8:00] 회의록 올렸어요
첨부 파일 확인 부탁드립니다
[Carol] [오후 8:15] 감사합니다 최고예요
[Bob] [오후 8:45] 좋아요
";

async fn chatlens() -> Chatlens {
    ChatlensBuilder::new()
        .chat_client(Arc::new(EchoClient))
        .parser_config(ParserConfig::default().with_fallback_date(NaiveDate::from_ymd_opt(2024, 3, 4).unwrap()))
        .max_upload_bytes(64 * 1024)
        .build()
        .await
        .unwrap()
}

#[tokio::test]
async fn test_upload_creates_room_from_file_name() {
    let chatlens = chatlens().await;
    let report = assert_ok!(
        chatlens
            .ingestion()
            .ingest("KakaoTalk_팀.txt", EXPORT.as_bytes(), RoomTarget::default())
            .await
    );

    assert_eq!(report.parsed_messages, 5);
    assert_eq!(report.continuation_lines, 1);
    assert!(report.outcome.created);
    assert_eq!(report.outcome.room.name, "KakaoTalk_팀");
    assert_eq!(report.outcome.room.participants, vec!["Alice", "Bob", "Carol"]);

    let room = chatlens.store().get(&report.outcome.room.id).await.unwrap();
    assert_eq!(room.messages[2].text, "회의록 올렸어요\n첨부 파일 확인 부탁드립니다");
}

#[tokio::test]
async fn test_same_bytes_twice_is_a_no_op() {
    let chatlens = chatlens().await;
    let first = chatlens
        .ingestion()
        .ingest("chat.txt", EXPORT.as_bytes(), RoomTarget::by_name("Team"))
        .await
        .unwrap();
    let second = chatlens
        .ingestion()
        .ingest("renamed.txt", EXPORT.as_bytes(), RoomTarget::by_name("Team"))
        .await
        .unwrap();

    assert!(second.outcome.duplicate);
    assert_eq!(second.outcome.new_messages, 0);
    assert_eq!(second.outcome.file.id, first.outcome.file.id);
    assert_eq!(second.outcome.room.message_count, 5);
}

#[tokio::test]
async fn test_snapshot_follows_new_uploads() {
    let chatlens = chatlens().await;
    let report = chatlens
        .ingestion()
        .ingest("chat.txt", EXPORT.as_bytes(), RoomTarget::by_name("Team"))
        .await
        .unwrap();
    let room_id = report.outcome.room.id;

    let snapshot = chatlens.snapshot(&room_id).await.unwrap();
    assert_eq!(snapshot.hourly_histogram[8], 2);
    assert_eq!(snapshot.hourly_histogram[20], 3);
    assert_eq!(snapshot.hourly_histogram.iter().sum::<u64>(), 5);

    let cached = chatlens.snapshot(&room_id).await.unwrap();
    assert!(Arc::ptr_eq(&snapshot, &cached));

    let more = "[Dave] [오후 11:59] 늦었네요\n";
    chatlens
        .ingestion()
        .ingest("late.txt", more.as_bytes(), RoomTarget::by_id(room_id.clone()))
        .await
        .unwrap();

    let fresh = chatlens.snapshot(&room_id).await.unwrap();
    assert_eq!(fresh.message_count, 6);
    assert_eq!(fresh.watermark.revision, 2);
    assert_eq!(fresh.per_participant_counts.get("Dave"), Some(&1));
}

#[tokio::test]
async fn test_rejected_uploads_leave_no_trace() {
    let chatlens = chatlens().await;
    let ingestion = chatlens.ingestion();

    let err = assert_err!(ingestion.ingest("notes.md", EXPORT.as_bytes(), RoomTarget::default()).await);
    assert!(matches!(err, IngestError::InvalidInput(_)));

    let err = assert_err!(
        ingestion
            .ingest("diary.txt", "Dear diary\nnothing here".as_bytes(), RoomTarget::default())
            .await
    );
    assert!(matches!(err, IngestError::Parse(ParseError::UnrecognizedFormat { .. })));

    let err = assert_err!(
        ingestion
            .ingest("chat.txt", EXPORT.as_bytes(), RoomTarget::by_id("missing"))
            .await
    );
    assert!(matches!(err, IngestError::Store(StoreError::NotFound(_))));

    assert!(chatlens.store().list().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_analysis_and_room_deletion() {
    let chatlens = chatlens().await;
    let report = chatlens
        .ingestion()
        .ingest("chat.txt", EXPORT.as_bytes(), RoomTarget::default())
        .await
        .unwrap();
    let room_id = report.outcome.room.id;

    let request = chatlens.coordinator().submit(&room_id, AnalysisType::Topics).await.unwrap();
    let done = chatlens.coordinator().wait(&request.id).await.unwrap();
    assert_eq!(done.status, AnalysisStatus::Succeeded);
    assert_eq!(done.result_text.as_deref(), Some("2 messages analysed"));

    assert_ok!(chatlens.delete_room(&room_id).await);
    assert!(chatlens.store().get(&room_id).await.unwrap_err().is_not_found());
    assert!(chatlens.delete_room(&room_id).await.unwrap_err().is_not_found());
    assert!(chatlens.snapshot(&room_id).await.is_err());
}

#[tokio::test]
async fn test_provider_config_builds_the_client() {
    let mut server = mockito::Server::new_async().await;
    let models = server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-provider")
        .with_status(200)
        .with_body(r#"{"data": []}"#)
        .create_async()
        .await;

    let chatlens = ChatlensBuilder::new()
        .openai_key("sk-ignored")
        .provider(ProviderConfig::OpenAI(
            OpenAIConfig::new("sk-provider").with_base_url(server.url()),
        ))
        .build()
        .await
        .unwrap();

    assert_ok!(chatlens.client().validate_key().await);
    models.assert_async().await;
}

#[tokio::test]
async fn test_build_without_key_or_client_fails() {
    assert!(ChatlensBuilder::new().build().await.is_err());
    assert_ok!(ChatlensBuilder::new().openai_key("sk-test").build().await);
}
