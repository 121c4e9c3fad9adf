//! Provider trait tests: mockall mocks and an HTTP round trip against mockito

use async_trait::async_trait;
use mockall::mock;
use agentseek_provider::{ChatParams, ChatResponse, Message, OpenAiProvider, Provider, ProviderError};

mock! {
    pub Provider {}

    #[async_trait]
    impl Provider for Provider {
        async fn chat(&self, params: ChatParams) -> Result<ChatResponse, ProviderError>;
        fn default_model(&self) -> String;
        fn is_configured(&self) -> bool;
    }
}

#[tokio::test]
async fn test_mock_provider_chat_returns_success() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Ok(ChatResponse::text("Hello from mock!")));

    let response = mock.chat(ChatParams::default()).await.unwrap();
    assert_eq!(response.answer(), "Hello from mock!");
}

#[tokio::test]
async fn test_mock_provider_sees_transcript() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .withf(|params| params.messages.len() == 2 && params.messages[1].role == "user")
        .returning(|_| Ok(ChatResponse::text("ok")));

    let params = ChatParams {
        messages: vec![Message::system("sys"), Message::user("Do something")],
        ..Default::default()
    };
    assert!(mock.chat(params).await.is_ok());
}

#[tokio::test]
async fn test_mock_provider_chat_returns_error() {
    let mut mock = MockProvider::new();
    mock.expect_chat()
        .times(1)
        .returning(|_| Err(ProviderError::Api("Mock API error".to_string())));

    match mock.chat(ChatParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "Mock API error"),
        _ => panic!("Expected Api error"),
    }
}

#[tokio::test]
async fn test_openai_provider_round_trip() {
    let mut server = mockito::Server::new_async().await;
    let mock = server
        .mock("POST", "/chat/completions")
        .match_header("authorization", "Bearer sk-test")
        .with_status(200)
        .with_header("content-type", "application/json")
        .with_body(
            r#"{"choices":[{"message":{"role":"assistant","content":"<think>plan</think>Hi!"},"finish_reason":"stop"}]}"#,
        )
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), Some("m".to_string()));
    let params = ChatParams {
        messages: vec![Message::user("hello")],
        ..Default::default()
    };
    let response = provider.chat(params).await.unwrap();

    assert_eq!(response.answer(), "Hi!");
    assert_eq!(response.reasoning.as_deref(), Some("plan"));
    mock.assert_async().await;
}

#[tokio::test]
async fn test_openai_provider_rate_limited() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(429)
        .with_body(r#"{"error":{"message":"slow down"}}"#)
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    let result = provider.chat(ChatParams::default()).await;
    assert!(matches!(result, Err(ProviderError::RateLimited)));
}

#[tokio::test]
async fn test_openai_provider_api_error() {
    let mut server = mockito::Server::new_async().await;
    server
        .mock("POST", "/chat/completions")
        .with_status(400)
        .with_body(r#"{"error":{"message":"unknown model"}}"#)
        .create_async()
        .await;

    let provider = OpenAiProvider::new("sk-test", Some(server.url()), None);
    match provider.chat(ChatParams::default()).await {
        Err(ProviderError::Api(msg)) => assert_eq!(msg, "unknown model"),
        other => panic!("Expected Api error, got {:?}", other.map(|r| r.content)),
    }
}

#[tokio::test]
async fn test_openai_provider_without_key_fails_fast() {
    let provider = OpenAiProvider::new("", Some("http://127.0.0.1:1".to_string()), None);
    let result = provider.chat(ChatParams::default()).await;
    assert!(matches!(result, Err(ProviderError::NoApiKey)));
}
