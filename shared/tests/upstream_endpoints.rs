use std::sync::Arc;
use std::time::Duration;

use httpmock::prelude::*;
use openai::chat::{ChatCompletionMessage, ChatCompletionMessageRole};
use reqwest::Client;
use serde_json::json;
use serial_test::serial;
use shared::error::UpstreamError;
use shared::gemini_client::GeminiClient;
use shared::messaging::{deliver, DeliveryOutcome, RetryPolicy};
use shared::openai_client::{self, OpenAiChatClient};
use shared::speech_client::SpeechClient;
use shared::upstream::{
    AudioEncoding, Capability, GenerativeModel, InlineImage, MessageSender, Transcriber,
};
use shared::whatsapp_client::WhatsAppClient;
use tokio::runtime::Builder;

fn runtime() -> anyhow::Result<tokio::runtime::Runtime> {
    Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(anyhow::Error::new)
}

#[serial]
#[test]
fn gemini_concatenates_candidate_parts() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/models/gemini-test:generateContent")
                    .query_param("key", "g-key")
                    .json_body_partial(r#"{"contents":[{"parts":[{"text":"describe"},{"inlineData":{"mimeType":"image/png","data":"AQID"}}]}]}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"candidates": [{"content": {"parts": [
                        {"text": "```json\n{\"caption\":"},
                        {"text": " \"Blue vase\"}\n```"}
                    ]}}]}));
            })
            .await;

        let client = GeminiClient::new(Client::new(), &server.base_url(), "g-key", "gemini-test");
        let image = InlineImage {
            mime_type: "image/png".into(),
            data: vec![1, 2, 3],
        };
        let text = client.generate("describe", Some(&image)).await?;
        assert_eq!(text, "```json\n{\"caption\": \"Blue vase\"}\n```");

        mock.assert_async().await;
        Ok(())
    })
}

#[serial]
#[test]
fn gemini_error_status_is_reported() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/models/gemini-test:generateContent");
                then.status(429).body("quota exceeded");
            })
            .await;

        let client = GeminiClient::new(Client::new(), &server.base_url(), "g-key", "gemini-test");
        let err = client.generate("hi", None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Http(429)));
        Ok(())
    })
}

#[serial]
#[test]
fn chat_endpoint_returns_content() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/v1/chat/completions")
                    .header("authorization", "Bearer o-key")
                    .json_body_partial(r#"{"model":"gpt-chat"}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"choices":[{"message":{"role":"assistant","content":"Sure! {\"score\":1}"}}]}"#);
            })
            .await;

        let messages = vec![ChatCompletionMessage {
            role: ChatCompletionMessageRole::User,
            content: Some("Hallo".to_string()),
            ..Default::default()
        }];
        let answer = openai_client::call_openai_chat(
            &Client::new(),
            &server.base_url(),
            "o-key",
            "gpt-chat",
            messages,
        )
        .await?;
        assert_eq!(answer, "Sure! {\"score\":1}");

        mock.assert_async().await;
        Ok(())
    })
}

#[serial]
#[test]
fn chat_backend_with_blank_answer_is_empty() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        server
            .mock_async(|when, then| {
                when.method(POST).path("/v1/chat/completions");
                then.status(200)
                    .header("content-type", "application/json")
                    .body(r#"{"choices":[{"message":{"role":"assistant","content":"   "}}]}"#);
            })
            .await;

        let client = OpenAiChatClient::new(Client::new(), &server.base_url(), "o-key", "gpt-chat");
        let err = client.generate("hi", None).await.unwrap_err();
        assert!(matches!(err, UpstreamError::Empty));
        Ok(())
    })
}

#[serial]
#[test]
fn speech_joins_segments_and_sends_encoding() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/speech:recognize")
                    .query_param("key", "s-key")
                    .json_body_partial(r#"{"config":{"encoding":"OGG_OPUS","languageCode":"en-IN"},"audio":{"content":"AAE="}}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"results": [
                        {"alternatives": [{"transcript": "I make pottery", "confidence": 0.9}]},
                        {"alternatives": [{"transcript": " in Jaipur ", "confidence": 0.7}]}
                    ]}));
            })
            .await;

        let client = SpeechClient::new(Client::new(), &server.base_url(), "s-key", "en-IN");
        let t = client.transcribe(&[0, 1], AudioEncoding::OggOpus).await?;
        assert_eq!(t.text, "I make pottery in Jaipur");
        assert_eq!(t.segment_confidences, vec![0.9, 0.7]);

        mock.assert_async().await;
        Ok(())
    })
}

#[serial]
#[test]
fn whatsapp_returns_message_id() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST)
                    .path("/12345/messages")
                    .header("authorization", "Bearer w-token")
                    .json_body_partial(r#"{"messaging_product":"whatsapp","to":"919876543210","type":"text","text":{"body":"Order ready"}}"#);
                then.status(200)
                    .header("content-type", "application/json")
                    .json_body(json!({"messages": [{"id": "wamid.ABC"}]}));
            })
            .await;

        let client = WhatsAppClient::new(Client::new(), &server.base_url(), "w-token", "12345");
        let id = client.send_text("919876543210", "Order ready").await?;
        assert_eq!(id, "wamid.ABC");

        mock.assert_async().await;
        Ok(())
    })
}

#[serial]
#[test]
fn whatsapp_delivery_retries_then_falls_back_to_link() -> anyhow::Result<()> {
    runtime()?.block_on(async {
        let server = MockServer::start_async().await;
        let mock = server
            .mock_async(|when, then| {
                when.method(POST).path("/12345/messages");
                then.status(500).body("internal");
            })
            .await;

        let sender: Arc<dyn MessageSender> = Arc::new(WhatsAppClient::new(
            Client::new(),
            &server.base_url(),
            "w-token",
            "12345",
        ));
        let policy = RetryPolicy {
            attempts: 3,
            base_delay: Duration::from_millis(5),
        };
        let out = deliver(&Capability::Configured(sender), "+91 98765 43210", "Order ready", policy).await?;
        assert_eq!(
            out,
            DeliveryOutcome::ManualAction {
                link: "https://wa.me/919876543210?text=Order%20ready".into(),
                attempts: 3,
                reason: "http error: 500".into(),
            }
        );

        mock.assert_hits_async(3).await;
        Ok(())
    })
}
