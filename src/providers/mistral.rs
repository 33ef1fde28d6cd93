use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use std::path::Path;
use tracing::{debug, warn};

use crate::config::Config;
use crate::image::ImageContent;
use crate::model::Credential;
use crate::providers::http_errors::transport_error_message;
use crate::response::ResponsePayload;

pub const ENCODE_FAILURE_MESSAGE: &str = "Failed to encode image";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'static str,
    content: MessageContent<'a>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum MessageContent<'a> {
    Text(&'a str),
    Parts(Vec<ContentPart<'a>>),
}

#[derive(Debug, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
enum ContentPart<'a> {
    Text { text: &'a str },
    ImageUrl { image_url: String },
}

fn chat_url(base_url: &str) -> String {
    format!("{}/v1/chat/completions", base_url.trim_end_matches('/'))
}

fn user_message(content: MessageContent<'_>) -> ChatMessage<'_> {
    ChatMessage {
        role: "user",
        content,
    }
}

fn text_request_body<'a>(text: &'a str, model: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![user_message(MessageContent::Text(text))],
    }
}

fn image_request_body<'a>(text: &'a str, image: &ImageContent, model: &'a str) -> ChatRequest<'a> {
    ChatRequest {
        model,
        messages: vec![user_message(MessageContent::Parts(vec![
            ContentPart::Text { text },
            ContentPart::ImageUrl {
                image_url: image.data_url(),
            },
        ]))],
    }
}

#[derive(Debug, Clone)]
pub struct CompletionEndpoint {
    client: Client,
    api_url: String,
    credential: Credential,
    timeout_secs: u64,
}

impl CompletionEndpoint {
    pub fn new(client: Client, cfg: &Config) -> Self {
        Self {
            client,
            api_url: chat_url(&cfg.model_base_url),
            credential: cfg.api_key.clone(),
            timeout_secs: cfg.model_timeout_secs,
        }
    }

    async fn post(&self, body: &ChatRequest<'_>, kind: &str) -> ResponsePayload {
        debug!(
            api_url = %self.api_url,
            model = %body.model,
            kind,
            "sending chat completion request"
        );

        let response = match self
            .client
            .post(&self.api_url)
            .bearer_auth(self.credential.expose())
            .json(body)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                warn!(
                    api_url = %self.api_url,
                    model = %body.model,
                    kind,
                    error = %err,
                    "chat completion request failed"
                );
                return ResponsePayload::failure(transport_error_message(
                    &err,
                    &self.api_url,
                    self.timeout_secs,
                ));
            }
        };

        let status = response.status();
        if !status.is_success() {
            let response_body = response
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response body>".to_string());
            warn!(
                api_url = %self.api_url,
                model = %body.model,
                kind,
                status = %status,
                response_body_len = response_body.len(),
                "model API returned non-success status"
            );
            return ResponsePayload::failure(format!(
                "Model request failed with status {}: {}",
                status, response_body
            ));
        }

        match response.json::<Value>().await {
            Ok(parsed) => {
                let payload = ResponsePayload::from_json(parsed);
                debug!(
                    model = %body.model,
                    kind,
                    failure = payload.is_failure(),
                    "received chat completion response"
                );
                payload
            }
            Err(err) => {
                warn!(model = %body.model, kind, error = %err, "unreadable model response");
                ResponsePayload::failure(format!("Failed to parse model chat response: {err}"))
            }
        }
    }
}

pub struct TextRequest {
    endpoint: CompletionEndpoint,
}

impl TextRequest {
    pub fn new(endpoint: CompletionEndpoint) -> Self {
        Self { endpoint }
    }

    pub async fn send(&self, text: &str, model: &str) -> ResponsePayload {
        let body = text_request_body(text, model);
        self.endpoint.post(&body, "text").await
    }
}

pub struct ImageRequest {
    endpoint: CompletionEndpoint,
}

impl ImageRequest {
    pub fn new(endpoint: CompletionEndpoint) -> Self {
        Self { endpoint }
    }

    pub async fn send(&self, text: &str, image_path: &Path, model: &str) -> ResponsePayload {
        let image = match ImageContent::from_path(image_path) {
            Ok(image) => image,
            Err(_) => return ResponsePayload::failure(ENCODE_FAILURE_MESSAGE),
        };

        let body = image_request_body(text, &image, model);
        self.endpoint.post(&body, "image").await
    }
}

#[cfg(test)]
mod tests {
    use mockito::Matcher;
    use serde_json::json;
    use std::fs;
    use std::net::TcpListener;
    use std::path::{Path, PathBuf};
    use std::time::{SystemTime, UNIX_EPOCH};

    use super::{
        CompletionEndpoint, ENCODE_FAILURE_MESSAGE, ImageRequest, TextRequest, chat_url,
        image_request_body, text_request_body,
    };
    use crate::config::Config;
    use crate::image::ImageContent;
    use crate::model::{Credential, ModelCatalog};
    use crate::response::ResponsePayload;

    const COMPLETIONS_PATH: &str = "/v1/chat/completions";

    fn test_config(base_url: &str) -> Config {
        Config {
            api_key: Credential::new("test-key"),
            model_base_url: base_url.to_string(),
            model_timeout_secs: 5,
            catalog: ModelCatalog::new(
                vec!["mistral-small-latest".to_string()],
                vec!["pixtral-12b-2409".to_string()],
            ),
        }
    }

    fn endpoint(base_url: &str) -> CompletionEndpoint {
        CompletionEndpoint::new(reqwest::Client::new(), &test_config(base_url))
    }

    fn completion_body(content: &str) -> String {
        json!({
            "id": "cmpl-1",
            "object": "chat.completion",
            "created": 1_700_000_000,
            "model": "mistral-small-latest",
            "choices": [{
                "index": 0,
                "message": {"role": "assistant", "content": content},
                "finish_reason": "stop"
            }]
        })
        .to_string()
    }

    fn temp_image(bytes: &[u8]) -> PathBuf {
        let stamp = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .expect("system clock should be after unix epoch")
            .as_nanos();
        let path = std::env::temp_dir().join(format!(
            "mistral-chat-request-{stamp}-{}.jpg",
            std::process::id()
        ));
        fs::write(&path, bytes).expect("failed to write temp image");
        path
    }

    #[test]
    fn chat_url_trims_trailing_slash() {
        assert_eq!(
            chat_url("https://api.mistral.ai/"),
            "https://api.mistral.ai/v1/chat/completions"
        );
    }

    #[test]
    fn text_body_has_single_user_message() {
        let body = serde_json::to_value(text_request_body("Hello", "mistral-large-latest"))
            .expect("body should serialise");
        assert_eq!(
            body,
            json!({
                "model": "mistral-large-latest",
                "messages": [{"role": "user", "content": "Hello"}]
            })
        );
    }

    #[test]
    fn image_body_has_text_and_data_url_parts() {
        let image = ImageContent {
            mime_type: "image/jpeg",
            data: "QUJD".to_string(),
        };
        let body = serde_json::to_value(image_request_body("Describe", &image, "pixtral-12b-2409"))
            .expect("body should serialise");
        assert_eq!(
            body,
            json!({
                "model": "pixtral-12b-2409",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "Describe"},
                        {"type": "image_url", "image_url": "data:image/jpeg;base64,QUJD"}
                    ]
                }]
            })
        );
    }

    #[tokio::test]
    async fn text_request_posts_authenticated_json_and_passes_body_through() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .match_header("authorization", "Bearer test-key")
            .match_header("content-type", "application/json")
            .match_body(Matcher::Json(json!({
                "model": "mistral-small-latest",
                "messages": [{"role": "user", "content": "Hi"}]
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion_body("Hello there"))
            .create_async()
            .await;

        let payload = TextRequest::new(endpoint(&server.url()))
            .send("Hi", "mistral-small-latest")
            .await;

        mock.assert_async().await;
        assert_eq!(payload.answer(), Some("Hello there"));
    }

    #[tokio::test]
    async fn text_request_maps_error_status_to_failure() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(401)
            .with_body("Unauthorized")
            .create_async()
            .await;

        let payload = TextRequest::new(endpoint(&server.url()))
            .send("Hi", "mistral-small-latest")
            .await;

        mock.assert_async().await;
        let error = payload.error().expect("payload should be a failure");
        assert!(error.contains("status 401"), "unexpected error: {error}");
        assert!(error.contains("Unauthorized"), "unexpected error: {error}");
    }

    #[tokio::test]
    async fn text_request_maps_error_shaped_body_to_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(200)
            .with_body(json!({"error": "model overloaded"}).to_string())
            .create_async()
            .await;

        let payload = TextRequest::new(endpoint(&server.url()))
            .send("Hi", "mistral-small-latest")
            .await;

        assert_eq!(payload, ResponsePayload::failure("model overloaded"));
    }

    #[tokio::test]
    async fn text_request_maps_invalid_json_to_failure() {
        let mut server = mockito::Server::new_async().await;
        let _mock = server
            .mock("POST", COMPLETIONS_PATH)
            .with_status(200)
            .with_body("not json")
            .create_async()
            .await;

        let payload = TextRequest::new(endpoint(&server.url()))
            .send("Hi", "mistral-small-latest")
            .await;

        let error = payload.error().expect("payload should be a failure");
        assert!(
            error.starts_with("Failed to parse model chat response"),
            "unexpected error: {error}"
        );
    }

    #[tokio::test]
    async fn text_request_recovers_connection_errors_into_failure() {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind should succeed");
        let addr = listener.local_addr().expect("address should be available");
        drop(listener);

        let payload = TextRequest::new(endpoint(&format!("http://{addr}")))
            .send("Hi", "mistral-small-latest")
            .await;

        let error = payload.error().expect("payload should be a failure");
        assert!(
            error.contains("Connection refused by model API"),
            "unexpected error: {error}"
        );
    }

    #[tokio::test]
    async fn image_request_sends_data_url() {
        let path = temp_image(b"\xff\xd8\xff");
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .match_header("authorization", "Bearer test-key")
            .match_body(Matcher::Json(json!({
                "model": "pixtral-12b-2409",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "What is this?"},
                        {"type": "image_url", "image_url": "data:image/jpeg;base64,/9j/"}
                    ]
                }]
            })))
            .with_status(200)
            .with_body(completion_body("A cat"))
            .create_async()
            .await;

        let payload = ImageRequest::new(endpoint(&server.url()))
            .send("What is this?", &path, "pixtral-12b-2409")
            .await;

        mock.assert_async().await;
        assert_eq!(payload.answer(), Some("A cat"));
        let _ = fs::remove_file(&path);
    }

    #[tokio::test]
    async fn image_request_with_missing_file_skips_network() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("POST", COMPLETIONS_PATH)
            .expect(0)
            .create_async()
            .await;

        let payload = ImageRequest::new(endpoint(&server.url()))
            .send("hi", Path::new("missing.jpg"), "pixtral-12b-2409")
            .await;

        mock.assert_async().await;
        assert_eq!(payload, ResponsePayload::failure(ENCODE_FAILURE_MESSAGE));
        assert_eq!(
            serde_json::to_value(&payload).expect("payload should serialise"),
            json!({"error": "Failed to encode image"})
        );
    }
}
