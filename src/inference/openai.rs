//! OpenAI chat-completions transport with strict structured output.

use std::time::Duration;

use serde::Deserialize;
use serde_json::{json, Value};
use tracing::debug;

use super::{InferenceError, ModelProvider, ModelRequest};
use crate::document::ApiCredential;

/// Longest provider error body kept in an error message.
const MAX_ERROR_BODY_CHARS: usize = 500;

/// Blocking client for `{endpoint}/chat/completions`.
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: reqwest::blocking::Client,
    url: String,
    timeout: Duration,
}

impl OpenAiProvider {
    /// Creates a provider for the API rooted at `endpoint`. Every call is
    /// bounded by `timeout`.
    ///
    /// # Errors
    ///
    /// Returns [`InferenceError::Client`] if the HTTP client cannot be built.
    pub fn new(endpoint: &str, timeout: Duration) -> Result<Self, InferenceError> {
        let client = reqwest::blocking::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| InferenceError::Client(e.to_string()))?;
        Ok(Self {
            client,
            url: format!("{}/chat/completions", endpoint.trim_end_matches('/')),
            timeout,
        })
    }

    /// The full completions URL requests are sent to.
    #[must_use]
    pub fn url(&self) -> &str {
        &self.url
    }

    fn transport_error(&self, error: &reqwest::Error) -> InferenceError {
        if error.is_timeout() {
            InferenceError::Timeout(self.timeout.as_secs())
        } else {
            InferenceError::Transport(error.to_string())
        }
    }
}

impl ModelProvider for OpenAiProvider {
    fn complete(
        &self,
        request: &ModelRequest,
        credential: &ApiCredential,
    ) -> Result<String, InferenceError> {
        debug!(url = %self.url, model = %request.model, "sending completion request");
        let response = self
            .client
            .post(&self.url)
            .bearer_auth(credential.expose())
            .json(&build_request_body(request))
            .send()
            .map_err(|e| self.transport_error(&e))?;

        let status = response.status().as_u16();
        let body = response.text().map_err(|e| self.transport_error(&e))?;
        if !(200..300).contains(&status) {
            return Err(classify_status(status, &body));
        }
        parse_completion(&body)
    }
}

/// Request body: one user turn and a strict `json_schema` response format.
pub(crate) fn build_request_body(request: &ModelRequest) -> Value {
    json!({
        "model": request.model,
        "messages": [
            { "role": "user", "content": request.prompt }
        ],
        "response_format": {
            "type": "json_schema",
            "json_schema": {
                "name": request.schema_name,
                "schema": request.schema,
                "strict": true
            }
        }
    })
}

/// Maps a non-success status to an error.
pub(crate) fn classify_status(status: u16, body: &str) -> InferenceError {
    let message = provider_message(body);
    match status {
        401 | 403 => InferenceError::Authentication(message),
        429 => InferenceError::RateLimited,
        _ => InferenceError::Provider {
            status,
            body: message,
        },
    }
}

#[derive(Deserialize)]
struct Completion {
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Deserialize)]
struct Message {
    content: Option<String>,
    refusal: Option<String>,
}

/// Extracts the message text of the first choice.
pub(crate) fn parse_completion(body: &str) -> Result<String, InferenceError> {
    let completion: Completion =
        serde_json::from_str(body).map_err(|e| InferenceError::InvalidEnvelope(e.to_string()))?;
    let message = completion
        .choices
        .into_iter()
        .next()
        .map(|choice| choice.message)
        .ok_or_else(|| InferenceError::InvalidEnvelope("no choices in response".into()))?;

    if let Some(refusal) = message.refusal.filter(|r| !r.is_empty()) {
        return Err(InferenceError::Refusal(refusal));
    }
    message
        .content
        .ok_or_else(|| InferenceError::InvalidEnvelope("message has no content".into()))
}

/// `error.message` of an API error body, else the body itself (shortened).
fn provider_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| v["error"]["message"].as_str().map(str::to_string))
        .unwrap_or_else(|| crate::text::truncate_chars(body.trim(), MAX_ERROR_BODY_CHARS).to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_request_body_shape() {
        let request = ModelRequest {
            model: "gpt-4o".into(),
            prompt: "find selectors".into(),
            schema_name: "selector_set".into(),
            schema: json!({"type": "object"}),
        };
        let body = build_request_body(&request);
        assert_eq!(body["model"], "gpt-4o");
        assert_eq!(body["messages"].as_array().unwrap().len(), 1);
        assert_eq!(body["messages"][0]["role"], "user");
        assert_eq!(body["messages"][0]["content"], "find selectors");
        assert_eq!(body["response_format"]["type"], "json_schema");
        assert_eq!(body["response_format"]["json_schema"]["strict"], true);
        assert_eq!(body["response_format"]["json_schema"]["name"], "selector_set");
    }

    #[test]
    fn test_parse_completion() {
        let body = r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"{\"a\":1}","refusal":null}}]}"#;
        assert_eq!(parse_completion(body).unwrap(), r#"{"a":1}"#);
    }

    #[test]
    fn test_parse_refusal_and_bad_envelopes() {
        let refusal = r#"{"choices":[{"message":{"content":null,"refusal":"I can't help"}}]}"#;
        assert_eq!(
            parse_completion(refusal),
            Err(InferenceError::Refusal("I can't help".into()))
        );
        assert!(matches!(
            parse_completion(r#"{"choices":[]}"#),
            Err(InferenceError::InvalidEnvelope(_))
        ));
        assert!(matches!(
            parse_completion("<html>bad gateway</html>"),
            Err(InferenceError::InvalidEnvelope(_))
        ));
    }

    #[test]
    fn test_status_classification() {
        let body = r#"{"error":{"message":"Incorrect API key provided","type":"invalid_request_error"}}"#;
        assert_eq!(
            classify_status(401, body),
            InferenceError::Authentication("Incorrect API key provided".into())
        );
        assert_eq!(classify_status(429, ""), InferenceError::RateLimited);
        assert_eq!(
            classify_status(502, "bad gateway"),
            InferenceError::Provider {
                status: 502,
                body: "bad gateway".into()
            }
        );
    }

    #[test]
    fn test_url_joining() {
        let provider = OpenAiProvider::new("https://api.openai.com/v1/", Duration::from_secs(5)).unwrap();
        assert_eq!(provider.url(), "https://api.openai.com/v1/chat/completions");
    }

    #[test]
    fn test_unreachable_endpoint_is_transport_error() {
        let provider = OpenAiProvider::new("http://127.0.0.1:9/v1", Duration::from_secs(2)).unwrap();
        let request = ModelRequest {
            model: "gpt-4o".into(),
            prompt: "p".into(),
            schema_name: "s".into(),
            schema: json!({}),
        };
        let key = ApiCredential::new("sk-test").unwrap();
        let err = provider.complete(&request, &key).unwrap_err();
        assert!(matches!(
            err,
            InferenceError::Transport(_) | InferenceError::Timeout(_)
        ));
    }
}
