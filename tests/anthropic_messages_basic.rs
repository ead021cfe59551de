use futures_util::StreamExt;
use one_llm::client::SendPromptOptions;
use one_llm::types::{Message, UnifiedRequest};
use one_llm::{LLMClient, ProviderKind};
use serde_json::json;
use wiremock::matchers::{body_partial_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn options(server: &MockServer) -> SendPromptOptions {
    SendPromptOptions::new("claude-3-5-haiku-latest")
        .with_provider(ProviderKind::Anthropic)
        .with_api_key("ant-key")
        .with_base_url(server.uri())
}

#[tokio::test]
async fn run_hoists_system_and_maps_usage() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(header("x-api-key", "ant-key"))
        .and(header("anthropic-version", "2023-06-01"))
        .and(body_partial_json(json!({
            "model": "claude-3-5-haiku-latest",
            "system": "S",
            "messages": [{"role": "user", "content": "U"}],
            "max_tokens": 1024,
            "stream": false
        })))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": "msg_1",
            "type": "message",
            "role": "assistant",
            "model": "claude-3-5-haiku-20241022",
            "content": [{"type": "text", "text": "Hello! I am Claude."}],
            "stop_reason": "end_turn",
            "usage": {"input_tokens": 10, "output_tokens": 5}
        })))
        .expect(1)
        .mount(&server)
        .await;

    let request = UnifiedRequest::new(
        vec![Message::system("S"), Message::user("U")],
        "claude-3-5-haiku-latest",
    )
    .with_provider(ProviderKind::Anthropic)
    .with_api_key("ant-key")
    .with_base_url(server.uri());
    let result = LLMClient::default_client()
        .expect("client")
        .run(request)
        .await
        .expect("result");

    assert_eq!(result.text, "Hello! I am Claude.");
    assert_eq!(result.finish_reason.as_deref(), Some("end_turn"));
    let usage = result.usage.expect("usage");
    assert_eq!((usage.prompt_tokens, usage.completion_tokens, usage.total_tokens), (10, 5, 15));
}

#[tokio::test]
async fn get_json_parses_text_block() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/messages"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "content": [{"type": "text", "text": "{\"city\":\"Lisbon\"}"}]
        })))
        .mount(&server)
        .await;

    let value: serde_json::Value = LLMClient::default_client()
        .expect("client")
        .send_prompt("Where?", options(&server))
        .get_json()
        .await
        .expect("json");

    assert_eq!(value, json!({"city": "Lisbon"}));
}

#[tokio::test]
async fn get_stream_emits_content_block_deltas() {
    let server = MockServer::start().await;
    let body = concat!(
        "event: message_start\n",
        "data: {\"type\":\"message_start\",\"message\":{\"id\":\"msg_1\",\"usage\":{\"input_tokens\":3}}}\n\n",
        "event: content_block_start\n",
        "data: {\"type\":\"content_block_start\",\"index\":0,\"content_block\":{\"type\":\"text\",\"text\":\"\"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"Olá, \"}}\n\n",
        "event: content_block_delta\n",
        "data: {\"type\":\"content_block_delta\",\"index\":0,\"delta\":{\"type\":\"text_delta\",\"text\":\"mundo\"}}\n\n",
        "event: message_delta\n",
        "data: {\"type\":\"message_delta\",\"delta\":{\"stop_reason\":\"end_turn\"}}\n\n",
        "event: message_stop\n",
        "data: {\"type\":\"message_stop\"}\n\n",
    );
    Mock::given(method("POST"))
        .and(path("/messages"))
        .and(body_partial_json(json!({"stream": true})))
        .respond_with(ResponseTemplate::new(200).set_body_raw(body, "text/event-stream"))
        .mount(&server)
        .await;

    let client = LLMClient::default_client().expect("client");
    let stream = client
        .send_prompt("Greet", options(&server))
        .get_stream()
        .await
        .expect("stream");
    let text: String = stream
        .map(|item| item.expect("fragment"))
        .collect::<Vec<_>>()
        .await
        .concat();

    assert_eq!(text, "Olá, mundo");
}
