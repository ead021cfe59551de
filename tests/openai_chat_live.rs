use std::env;

use dotenvy::dotenv;
use futures_util::StreamExt;
use one_llm::client::SendPromptOptions;
use one_llm::{LLMClient, ProviderKind};

fn load_env_var(key: &str) -> Option<String> {
    env::var(key).ok().filter(|value| !value.trim().is_empty())
}

#[tokio::test]
#[ignore = "requires GROQ_API_KEY and network access"]
async fn groq_live_text_and_stream() {
    let _ = dotenv();
    if load_env_var(ProviderKind::Groq.env_var()).is_none() {
        eprintln!("skipping: GROQ_API_KEY not set");
        return;
    }
    let model = load_env_var("GROQ_MODEL").unwrap_or_else(|| "llama-3.1-8b-instant".to_string());
    let client = LLMClient::default_client().expect("client");
    let prompt = client.send_prompt(
        "Please introduce Rust language in one sentence.",
        SendPromptOptions::new(model).with_provider(ProviderKind::Groq),
    );

    let text = prompt.get_text().await.expect("text response");
    assert!(!text.trim().is_empty(), "response text should not be empty");

    let mut stream = prompt.get_stream().await.expect("stream response");
    let mut streamed = String::new();
    while let Some(fragment) = stream.next().await {
        streamed.push_str(&fragment.expect("fragment"));
    }
    assert!(!streamed.trim().is_empty(), "streamed text should not be empty");
}
