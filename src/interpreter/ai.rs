//! HTTP client for the AI-assisted interpretation path
//!
//! Talks to any OpenAI-compatible chat completions endpoint and turns the
//! model's reply into `SearchFilters`.

use crate::filters::SearchFilters;
use crate::interpreter::config::AiConfig;
use crate::interpreter::error::InterpretError;
use crate::interpreter::prompt;
use reqwest::{Client as ReqwestClient, RequestBuilder};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error, instrument};

/// Chat completion request
#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<Message<'a>>,
    temperature: f64,
    max_tokens: u32,
}

/// Chat message
#[derive(Debug, Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

/// Chat completion response
#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: ResponseMessage,
}

#[derive(Debug, Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Filters and explanation produced by the model
#[derive(Debug, Clone, PartialEq)]
pub struct AiInterpretation {
    pub filters: SearchFilters,
    pub explanation: String,
}

/// Client for the configured AI provider
#[derive(Clone)]
pub struct AiClient {
    client: ReqwestClient,
    config: AiConfig,
}

impl AiClient {
    /// Create a new client; the configured timeout bounds every request
    pub fn new(config: AiConfig) -> Result<Self, InterpretError> {
        let client = ReqwestClient::builder().timeout(config.timeout).build()?;

        Ok(Self { client, config })
    }

    /// Ask the model to interpret `prompt`
    #[instrument(skip(self), fields(model = %self.config.model), level = "debug")]
    pub async fn interpret(
        &self,
        prompt: &str,
        current_year: i32,
    ) -> Result<AiInterpretation, InterpretError> {
        let system = prompt::system_prompt(current_year);
        let body = ChatRequest {
            model: &self.config.model,
            messages: vec![
                Message {
                    role: "system",
                    content: &system,
                },
                Message {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: self.config.temperature,
            max_tokens: self.config.max_tokens,
        };

        let mut request = self.client.post(self.config.endpoint()).json(&body);
        if let Some(api_key) = &self.config.api_key {
            request = request.bearer_auth(api_key);
        }

        debug!("Sending chat completion request");
        let response: ChatResponse = self.execute_request(request).await?;

        let content = response
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| InterpretError::Malformed("Empty response from AI".to_string()))?;

        parse_reply(&content, prompt)
    }

    /// Execute an HTTP request and handle the response
    async fn execute_request(&self, request: RequestBuilder) -> Result<ChatResponse, InterpretError> {
        let response = request.send().await.map_err(transport_error)?;

        let status = response.status();
        let response_text = response.text().await.map_err(transport_error)?;

        if status.is_success() {
            serde_json::from_str(&response_text).map_err(|e| {
                error!("Failed to parse response: {}", e);
                InterpretError::Malformed(format!("Failed to parse response: {}", e))
            })
        } else {
            error!("AI provider error: {} - {}", status, response_text);
            Err(InterpretError::Api {
                status: status.as_u16(),
                message: response_text,
            })
        }
    }
}

fn transport_error(err: reqwest::Error) -> InterpretError {
    if err.is_timeout() {
        InterpretError::Timeout
    } else {
        InterpretError::Http(err)
    }
}

/// Turn the model's message content into filters.
///
/// Tolerates a surrounding markdown code fence. Anything that is not a JSON
/// object is `Malformed`; individual bad fields are simply dropped.
pub fn parse_reply(content: &str, prompt: &str) -> Result<AiInterpretation, InterpretError> {
    let payload = strip_code_fence(content);

    let value: Value = serde_json::from_str(payload)
        .map_err(|e| InterpretError::Malformed(format!("Reply is not JSON: {}", e)))?;

    let filters = SearchFilters::from_value(&value)
        .ok_or_else(|| InterpretError::Malformed("Reply is not a JSON object".to_string()))?;

    let explanation = value
        .as_object()
        .and_then(|object| {
            object
                .iter()
                .find(|(key, _)| key.eq_ignore_ascii_case("explanation"))
                .and_then(|(_, value)| value.as_str())
        })
        .map(str::trim)
        .filter(|text| !text.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| format!("Searched for: {}", prompt.trim()));

    Ok(AiInterpretation {
        filters,
        explanation,
    })
}

/// Remove a leading ```` ``` ```` fence line and a trailing fence
fn strip_code_fence(content: &str) -> &str {
    let mut text = content.trim();

    if text.starts_with("```") {
        text = match text.find('\n') {
            Some(newline) => &text[newline + 1..],
            None => text.trim_start_matches('`'),
        };
        text = text.trim_end();
        if let Some(stripped) = text.strip_suffix("```") {
            text = stripped;
        }
    }

    text.trim()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filters::SortBy;
    use mockito::Matcher;
    use serde_json::json;
    use std::time::Duration;
    use tokio::net::TcpListener;

    fn completion(content: &str) -> String {
        json!({
            "id": "chatcmpl-1",
            "object": "chat.completion",
            "choices": [
                {"index": 0, "message": {"role": "assistant", "content": content}, "finish_reason": "stop"}
            ]
        })
        .to_string()
    }

    fn client_for(server: &mockito::ServerGuard, api_key: Option<&str>) -> AiClient {
        let mut builder = AiConfig::builder(format!("{}/v1", server.url()), "test-model");
        if let Some(key) = api_key {
            builder = builder.api_key(key);
        }
        AiClient::new(builder.build().unwrap()).unwrap()
    }

    #[test]
    fn test_strip_code_fence() {
        assert_eq!(strip_code_fence("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("```\n{\"a\":1}```"), "{\"a\":1}");
        assert_eq!(strip_code_fence("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn test_parse_reply_lenient_fields() {
        let reply = r#"{
            "keywords": ["horror", "  "],
            "Author": "Stephen King",
            "category": "",
            "publishYearMin": "1980",
            "availableOnly": "yes",
            "sortBy": "YEAR",
            "limit": 80,
            "explanation": "Horror by Stephen King."
        }"#;

        let parsed = parse_reply(reply, "scary stephen king").unwrap();
        assert_eq!(parsed.filters.author.as_deref(), Some("Stephen King"));
        assert_eq!(parsed.filters.category, None);
        assert_eq!(parsed.filters.publish_year_min, Some(1980));
        assert_eq!(parsed.filters.available_only, None);
        assert_eq!(parsed.filters.sort_by, Some(SortBy::Year));
        assert_eq!(parsed.filters.effective_limit(), 50);
        assert_eq!(parsed.explanation, "Horror by Stephen King.");
    }

    #[test]
    fn test_parse_reply_defaults_explanation() {
        let parsed = parse_reply("{\"keywords\": [\"dune\"]}", " dune ").unwrap();
        assert_eq!(parsed.explanation, "Searched for: dune");
    }

    #[test]
    fn test_parse_reply_rejects_non_objects() {
        assert!(matches!(
            parse_reply("Sure! Here are some books.", "x"),
            Err(InterpretError::Malformed(_))
        ));
        assert!(matches!(
            parse_reply("[1, 2, 3]", "x"),
            Err(InterpretError::Malformed(_))
        ));
    }

    #[tokio::test]
    async fn test_interpret_success() {
        let mut server = mockito::Server::new_async().await;

        let content = "```json\n{\"category\": \"Cooking\", \"keywords\": [\"french\"], \"explanation\": \"French cooking.\"}\n```";
        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", "Bearer sk-test")
            .match_body(Matcher::PartialJson(json!({
                "model": "test-model",
                "temperature": 0.1,
                "max_tokens": 512
            })))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(completion(content))
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let result = client.interpret("french food books", 2025).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.filters.category.as_deref(), Some("Cooking"));
        assert_eq!(result.filters.keywords, Some(vec!["french".to_string()]));
        assert_eq!(result.explanation, "French cooking.");
    }

    #[tokio::test]
    async fn test_interpret_without_key_sends_no_auth() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .match_header("authorization", Matcher::Missing)
            .with_status(200)
            .with_body(completion("{\"title\": \"Dune\"}"))
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.interpret("dune", 2025).await.unwrap();

        mock.assert_async().await;
        assert_eq!(result.filters.title.as_deref(), Some("Dune"));
    }

    #[tokio::test]
    async fn test_interpret_api_error() {
        let mut server = mockito::Server::new_async().await;

        let mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(503)
            .with_body("{\"error\": \"overloaded\"}")
            .create_async()
            .await;

        let client = client_for(&server, Some("sk-test"));
        let result = client.interpret("anything", 2025).await;

        mock.assert_async().await;
        assert!(matches!(result, Err(InterpretError::Api { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_interpret_no_choices() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(json!({"choices": []}).to_string())
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.interpret("anything", 2025).await;
        assert!(matches!(result, Err(InterpretError::Malformed(_))));
    }

    #[tokio::test]
    async fn test_interpret_blank_content() {
        let mut server = mockito::Server::new_async().await;

        let _mock = server
            .mock("POST", "/v1/chat/completions")
            .with_status(200)
            .with_body(completion("   "))
            .create_async()
            .await;

        let client = client_for(&server, None);
        let result = client.interpret("anything", 2025).await;
        assert!(matches!(result, Err(InterpretError::Malformed(_))));
    }

    /// Accepts connections and never answers them
    async fn silent_server() -> String {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            let mut held = Vec::new();
            while let Ok((socket, _)) = listener.accept().await {
                held.push(socket);
            }
        });
        format!("http://{}", addr)
    }

    #[tokio::test]
    async fn test_interpret_times_out() {
        let config = AiConfig::builder(silent_server().await, "test-model")
            .timeout(Duration::from_millis(300))
            .build()
            .unwrap();
        let client = AiClient::new(config).unwrap();

        let result = client.interpret("anything", 2025).await;
        assert!(matches!(result, Err(InterpretError::Timeout)));
    }
}
