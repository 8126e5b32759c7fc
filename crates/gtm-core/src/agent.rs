//! Client for the sales-agent webhook
//!
//! The webhook does all retrieval and model work; this side sends one
//! question and maps whatever comes back into an [`AgentResponse`].

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use serde_json::Value;
use thiserror::Error;

use crate::state::{Cost, Source};

/// Shown when the webhook answers without an answer.
pub const NO_RESPONSE: &str = "No response received.";

#[derive(Debug, Error)]
pub enum AgentError {
    #[error("webhook returned HTTP {0}")]
    RequestFailed(u16),

    #[error("webhook request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("webhook returned an unreadable body: {0}")]
    Decode(#[from] serde_json::Error),
}

impl AgentError {
    /// HTTP status, when the webhook got far enough to send one.
    pub fn status(&self) -> Option<u16> {
        match self {
            AgentError::RequestFailed(status) => Some(*status),
            AgentError::Transport(e) => e.status().map(|s| s.as_u16()),
            AgentError::Decode(_) => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct AgentResponse {
    pub answer: String,
    pub sources: Vec<Source>,
    pub cost: Option<Cost>,
}

/// Anything that can answer a question about the call corpus
#[async_trait]
pub trait Agent: Send + Sync {
    async fn ask_question(&self, question: &str) -> Result<AgentResponse, AgentError>;
}

#[derive(Serialize)]
struct QuestionRequest<'a> {
    question: &'a str,
}

#[derive(Clone)]
pub struct WebhookClient {
    client: Client,
    url: String,
}

impl WebhookClient {
    pub fn new(url: &str) -> Self {
        Self {
            client: Client::new(),
            url: url.to_string(),
        }
    }

    pub fn url(&self) -> &str {
        &self.url
    }

    async fn post_question(&self, question: &str) -> Result<AgentResponse, AgentError> {
        // .json() sets Content-Type: application/json
        let response = self
            .client
            .post(&self.url)
            .json(&QuestionRequest { question })
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(AgentError::RequestFailed(status.as_u16()));
        }

        let body = response.bytes().await?;
        let data: Value = serde_json::from_slice(&body)?;
        Ok(parse_response(&data))
    }
}

#[async_trait]
impl Agent for WebhookClient {
    async fn ask_question(&self, question: &str) -> Result<AgentResponse, AgentError> {
        let start = std::time::Instant::now();
        tracing::debug!(url = %self.url, "Sending question to webhook");

        let result = self.post_question(question).await;

        let duration_ms = start.elapsed().as_millis();
        match &result {
            Ok(response) => tracing::info!(
                duration_ms = %duration_ms,
                sources = response.sources.len(),
                has_cost = response.cost.is_some(),
                "Webhook answered"
            ),
            Err(e) => tracing::error!(
                duration_ms = %duration_ms,
                status = ?e.status(),
                error = %e,
                "Webhook request failed"
            ),
        }
        result
    }
}

/// Map a webhook body into a response, defaulting anything missing.
///
/// `answer` wins over `response`; empty strings fall through. Source entries
/// without a title are skipped. Cost fields are read one by one, so a single
/// odd field leaves the rest intact.
pub fn parse_response(data: &Value) -> AgentResponse {
    let answer = ["answer", "response"]
        .iter()
        .filter_map(|key| data.get(key).and_then(Value::as_str))
        .find(|text| !text.is_empty())
        .unwrap_or(NO_RESPONSE)
        .to_string();

    let sources = data
        .get("sources")
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(|item| serde_json::from_value::<Source>(item.clone()).ok())
                .collect()
        })
        .unwrap_or_default();

    let cost = data.get("cost").and_then(parse_cost);

    AgentResponse {
        answer,
        sources,
        cost,
    }
}

/// `None` unless `value` is an object. Token counts may arrive as floats and
/// are truncated; fields of any other type are skipped.
fn parse_cost(value: &Value) -> Option<Cost> {
    let fields = value.as_object()?;
    let tokens = |key: &str| {
        let field = fields.get(key)?;
        field.as_u64().or_else(|| {
            field
                .as_f64()
                .filter(|n| n.is_finite() && *n >= 0.0)
                .map(|n| n.trunc() as u64)
        })
    };
    let amount = |key: &str| fields.get(key).and_then(Value::as_f64);

    Some(Cost {
        input_tokens: tokens("input_tokens"),
        output_tokens: tokens("output_tokens"),
        input_cost: amount("input_cost"),
        output_cost: amount("output_cost"),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use tokio::io::{AsyncReadExt, AsyncWriteExt};
    use tokio::net::TcpListener;

    /// Serve one canned HTTP response on a local port and return the URL plus
    /// a handle yielding the raw request that was received.
    async fn serve_once(
        status_line: &'static str,
        body: &'static str,
    ) -> (String, tokio::task::JoinHandle<String>) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let handle = tokio::spawn(async move {
            let (mut socket, _) = listener.accept().await.unwrap();
            let mut request = Vec::new();
            let mut buf = [0u8; 4096];

            // Read headers, then the body per Content-Length.
            loop {
                let n = socket.read(&mut buf).await.unwrap();
                if n == 0 {
                    break;
                }
                request.extend_from_slice(&buf[..n]);
                let text = String::from_utf8_lossy(&request).to_string();
                if let Some(header_end) = text.find("\r\n\r\n") {
                    let content_length = text[..header_end]
                        .lines()
                        .find_map(|line| {
                            let (name, value) = line.split_once(':')?;
                            name.eq_ignore_ascii_case("content-length")
                                .then(|| value.trim().parse::<usize>().ok())
                                .flatten()
                        })
                        .unwrap_or(0);
                    if request.len() >= header_end + 4 + content_length {
                        break;
                    }
                }
            }

            let response = format!(
                "{}\r\nContent-Type: application/json\r\nContent-Length: {}\r\nConnection: close\r\n\r\n{}",
                status_line,
                body.len(),
                body
            );
            socket.write_all(response.as_bytes()).await.unwrap();
            socket.shutdown().await.ok();
            String::from_utf8_lossy(&request).to_string()
        });

        (format!("http://{}/webhook/sales-agent", addr), handle)
    }

    #[test]
    fn test_parse_prefers_answer() {
        let parsed = parse_response(&json!({"answer": "A", "response": "B"}));
        assert_eq!(parsed.answer, "A");
    }

    #[test]
    fn test_parse_falls_back_to_response() {
        let parsed = parse_response(&json!({"response": "B"}));
        assert_eq!(parsed.answer, "B");

        let parsed = parse_response(&json!({"answer": "", "response": "B"}));
        assert_eq!(parsed.answer, "B");
    }

    #[test]
    fn test_parse_placeholder_when_missing() {
        let parsed = parse_response(&json!({}));
        assert_eq!(parsed.answer, NO_RESPONSE);
        assert!(parsed.sources.is_empty());
        assert!(parsed.cost.is_none());

        let parsed = parse_response(&json!([{"answer": "wrapped"}]));
        assert_eq!(parsed.answer, NO_RESPONSE);
    }

    #[test]
    fn test_parse_sources_and_cost() {
        let parsed = parse_response(&json!({
            "answer": "ok",
            "sources": [
                {"title": "Acme discovery", "url": "https://example.com/1", "type": "call"},
                {"title": "Globex demo"},
                {"url": "https://example.com/no-title"}
            ],
            "cost": {"input_tokens": 1000, "output_tokens": 500}
        }));
        assert_eq!(parsed.sources.len(), 2);
        assert_eq!(parsed.sources[0].kind.as_deref(), Some("call"));
        assert_eq!(parsed.sources[1].url, None);
        let cost = parsed.cost.unwrap();
        assert_eq!(cost.input_tokens, Some(1000));
        assert_eq!(cost.input_cost, None);
    }

    #[test]
    fn test_parse_cost_mixed_number_types() {
        let parsed = parse_response(&json!({
            "answer": "ok",
            "cost": {"input_tokens": 1000.0, "output_tokens": 500, "input_cost": 0.01}
        }));
        let cost = parsed.cost.unwrap();
        assert_eq!(cost.input_tokens, Some(1000));
        assert_eq!(cost.output_tokens, Some(500));
        assert_eq!(cost.input_cost, Some(0.01));
        assert_eq!(cost.output_cost, None);
    }

    #[test]
    fn test_parse_cost_skips_bad_fields() {
        let parsed = parse_response(&json!({
            "answer": "ok",
            "cost": {"input_tokens": 1000, "output_tokens": "lots", "input_cost": "0.01", "output_cost": 0.02}
        }));
        let cost = parsed.cost.unwrap();
        assert_eq!(cost.input_tokens, Some(1000));
        assert_eq!(cost.output_tokens, None);
        assert_eq!(cost.input_cost, None);
        assert_eq!(cost.output_cost, Some(0.02));

        let parsed = parse_response(&json!({"answer": "ok", "cost": "free"}));
        assert!(parsed.cost.is_none());
    }

    #[test]
    fn test_parse_null_fields() {
        let parsed = parse_response(&json!({"answer": "ok", "sources": null, "cost": null}));
        assert!(parsed.sources.is_empty());
        assert!(parsed.cost.is_none());
    }

    #[tokio::test]
    async fn test_webhook_success() {
        let (url, server) = serve_once(
            "HTTP/1.1 200 OK",
            r#"{"answer": "**Pricing**\n- too high", "sources": [{"title": "Acme"}]}"#,
        )
        .await;

        let client = WebhookClient::new(&url);
        let response = client.ask_question("What objections came up?").await.unwrap();
        assert_eq!(response.answer, "**Pricing**\n- too high");
        assert_eq!(response.sources.len(), 1);

        let request = server.await.unwrap();
        assert!(request.starts_with("POST /webhook/sales-agent"));
        assert!(request.to_lowercase().contains("content-type: application/json"));
        assert!(request.contains(r#"{"question":"What objections came up?"}"#));
    }

    #[tokio::test]
    async fn test_webhook_non_success_status() {
        let (url, server) = serve_once("HTTP/1.1 500 Internal Server Error", "{}").await;

        let client = WebhookClient::new(&url);
        let err = client.ask_question("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::RequestFailed(500)));
        assert_eq!(err.status(), Some(500));
        server.await.unwrap();
    }

    #[tokio::test]
    async fn test_webhook_bad_body() {
        let (url, server) = serve_once("HTTP/1.1 200 OK", "not json").await;

        let client = WebhookClient::new(&url);
        let err = client.ask_question("anything").await.unwrap_err();
        assert!(matches!(err, AgentError::Decode(_)));
        server.await.unwrap();
    }
}
