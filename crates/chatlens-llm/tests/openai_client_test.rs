use chatlens_llm::{ChatClient, ChatOptions, ChatRequest, LlmError, Message, OpenAIClient};
use mockito::Matcher;
use std::time::Duration;

fn client(server: &mockito::Server) -> OpenAIClient {
    OpenAIClient::builder()
        .api_key("sk-test")
        .base_url(server.url())
        .timeout(Duration::from_secs(5))
        .build()
        .unwrap()
}

fn request() -> ChatRequest {
    ChatRequest::new("gpt-4o-mini", vec![Message::system("analyze"), Message::human("log")])
        .with_options(ChatOptions::new().temperature(0.7).max_tokens(2000))
}

#[tokio::test]
async fn test_chat_success() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .match_body(Matcher::PartialJson(serde_json::json!({
            "model": "gpt-4o-mini",
            "max_tokens": 2000
        })))
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            serde_json::json!({
                "id": "chatcmpl-1",
                "object": "chat.completion",
                "created": 1,
                "model": "gpt-4o-mini",
                "choices": [{
                    "index": 0,
                    "message": {"role": "assistant", "content": "분석 결과"},
                    "finish_reason": "stop"
                }],
                "usage": {"prompt_tokens": 10, "completion_tokens": 5, "total_tokens": 15}
            })
            .to_string(),
        )
        .create_async()
        .await;

    let response = client(&server).chat(request()).await.unwrap();

    mock.assert_async().await;
    assert_eq!(response.content.as_deref(), Some("분석 결과"));
    assert_eq!(response.finish_reason.as_deref(), Some("stop"));
    assert_eq!(response.usage.unwrap().total_tokens, 15);
}

#[tokio::test]
async fn test_chat_error_statuses_are_classified() {
    let cases = [
        (401, "auth"),
        (400, "invalid-input"),
        (429, "provider-rejected"),
        (503, "provider-rejected"),
        (504, "timeout"),
    ];

    for (status, reason) in cases {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("POST", "/chat/completions")
            .with_status(status)
            .with_body(r#"{"error":{"message":"nope"}}"#)
            .create_async()
            .await;

        let err = client(&server).chat(request()).await.unwrap_err();
        assert_eq!(err.reason(), reason, "status {}", status);
    }
}

#[tokio::test]
async fn test_malformed_body_is_provider_rejected() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(200)
        .with_body("not json")
        .create_async()
        .await;

    let err = client(&server).chat(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::ProviderRejected(_)));
}

#[tokio::test]
async fn test_unreachable_host_is_network_error() {
    let client = OpenAIClient::builder()
        .api_key("sk-test")
        .base_url("http://127.0.0.1:1")
        .timeout(Duration::from_secs(2))
        .build()
        .unwrap();

    let err = client.chat(request()).await.unwrap_err();
    assert!(matches!(err, LlmError::Network(_) | LlmError::Timeout(_)), "{:?}", err);
}

#[tokio::test]
async fn test_validate_key() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-good")
        .with_status(200)
        .with_body(r#"{"data":[]}"#)
        .create_async()
        .await;
    server
        .mock("GET", "/models")
        .match_header("authorization", "Bearer sk-bad")
        .with_status(401)
        .create_async()
        .await;

    let good = OpenAIClient::builder().api_key("sk-good").base_url(server.url()).build().unwrap();
    let bad = OpenAIClient::builder().api_key("sk-bad").base_url(server.url()).build().unwrap();

    assert!(good.validate_key().await.is_ok());
    assert!(matches!(bad.validate_key().await, Err(LlmError::Auth(_))));
}
