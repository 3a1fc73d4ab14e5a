mod common;

use common::{StubResponse, StubServer};
use lookout_core::{ChangedFile, LlmConfig, LookoutConfig, LookoutError, PullRequest, ReviewResult};
use lookout_review::llm::{ChatModel, LlmClient};
use lookout_review::reviewer::Reviewer;

fn llm(server: &StubServer) -> LlmClient {
    let config = LlmConfig {
        model: "gpt-4o-mini".into(),
        api_key: Some("sk-test".into()),
        base_url: Some(format!("{}/v1", server.base_url)),
        ..LlmConfig::default()
    };
    LlmClient::new(&config).unwrap()
}

fn completion(content: &str) -> serde_json::Value {
    serde_json::json!({
        "id": "chatcmpl-1",
        "object": "chat.completion",
        "choices": [{"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}],
        "usage": {"prompt_tokens": 120, "completion_tokens": 30, "total_tokens": 150}
    })
}

#[tokio::test]
async fn completion_request_carries_model_and_single_user_message() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(200, completion("{}"))]);

    let reply = llm(&server).complete("Review this").await.unwrap();
    assert_eq!(reply.content, "{}");
    assert_eq!(reply.usage.unwrap().total_tokens, 150);

    let request = &server.requests()[0];
    assert_eq!(request.method, "POST");
    assert_eq!(request.path, "/v1/chat/completions");
    assert_eq!(request.headers["authorization"], "Bearer sk-test");
    let body = request.json();
    assert_eq!(body["model"], "gpt-4o-mini");
    assert_eq!(body["messages"].as_array().unwrap().len(), 1);
    assert_eq!(body["messages"][0]["role"], "user");
    assert_eq!(body["messages"][0]["content"], "Review this");
    assert_eq!(body["response_format"]["type"], "json_object");
}

#[tokio::test]
async fn server_error_is_an_llm_error() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(
        500,
        serde_json::json!({"error": {"message": "overloaded"}}),
    )]);

    let err = llm(&server).complete("x").await.unwrap_err();
    match err {
        LookoutError::Llm(message) => assert!(message.contains("500"), "{message}"),
        other => panic!("expected LLM error, got {other:?}"),
    }
}

#[tokio::test]
async fn reviewer_returns_neutral_result_on_server_error() {
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(503, serde_json::json!({}))]);
    let model = llm(&server);
    let config = LookoutConfig::default();

    let files = vec![ChangedFile::with_patch("src/lib.rs", "@@ -1 +1,2 @@\n a\n+b")];
    let result = Reviewer::new(&model, &config)
        .review(&PullRequest::default(), &files)
        .await;

    assert!(!result.approve);
    assert!(result.comments.is_empty());
    assert!(result.suggestions.is_empty());
    assert_eq!(result, ReviewResult::failed());
}

#[tokio::test]
async fn reviewer_attaches_usage_to_parsed_review() {
    let answer = r#"```json
{"feedback": "Fine.", "approve": true, "comments": [{"file_path": "src/lib.rs", "line_number": 2, "comment": "ok"}]}
```"#;
    let mut server = StubServer::bind().await;
    server.serve(vec![StubResponse::json(200, completion(answer))]);
    let model = llm(&server);
    let config = LookoutConfig::default();

    let files = vec![ChangedFile::with_patch("src/lib.rs", "@@ -1 +1,2 @@\n a\n+b")];
    let result = Reviewer::new(&model, &config)
        .review(&PullRequest::default(), &files)
        .await;

    assert!(result.approve);
    assert_eq!(result.comments.len(), 1);
    assert_eq!(result.usage.map(|u| u.prompt_tokens), Some(120));
}
