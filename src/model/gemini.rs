// Google Gemini `generateContent` client.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, CONTENT_TYPE};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::{Duration, Instant};

use super::{ChatTurn, ModelClient, ModelError, ModelResult, Role};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-2.5-pro-exp-03-25";

pub struct GeminiClient {
    client: Client,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiClient {
    pub fn new(
        endpoint: impl Into<String>,
        model: impl Into<String>,
        api_key: impl Into<String>,
        timeout: Duration,
    ) -> ModelResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            model: model.into(),
            api_key: api_key.into(),
        })
    }

    fn generate_url(&self) -> String {
        let base = self.endpoint.trim_end_matches('/');
        format!("{}/models/{}:generateContent", base, self.model)
    }

    fn headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        if let Ok(key) = HeaderValue::from_str(&self.api_key) {
            headers.insert("x-goog-api-key", key);
        }
        headers
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Content {
    #[serde(default)]
    role: String,
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Debug, Serialize, Deserialize)]
struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct GenerateResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ErrorEnvelope {
    error: ErrorDetail,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    code: Option<u16>,
    message: String,
    status: Option<String>,
}

fn to_gemini_role(role: Role) -> &'static str {
    match role {
        Role::User => "user",
        Role::Assistant => "model",
    }
}

fn build_request(turns: &[ChatTurn]) -> GenerateRequest {
    GenerateRequest {
        contents: turns
            .iter()
            .map(|turn| Content {
                role: to_gemini_role(turn.role).to_string(),
                parts: vec![Part {
                    text: Some(turn.text.clone()),
                }],
            })
            .collect(),
    }
}

fn classify_error(status: StatusCode, body: &str, model: &str) -> ModelError {
    let Ok(envelope) = serde_json::from_str::<ErrorEnvelope>(body) else {
        if status == StatusCode::TOO_MANY_REQUESTS {
            return ModelError::RateLimited(status.to_string());
        }
        return ModelError::Api(format!("HTTP {status}: {}", body.trim()));
    };

    let error = envelope.error;
    let code = error.code.unwrap_or(status.as_u16());
    match error.status.as_deref().unwrap_or("") {
        "RESOURCE_EXHAUSTED" => ModelError::RateLimited(error.message),
        "UNAUTHENTICATED" | "PERMISSION_DENIED" => ModelError::AuthFailed(error.message),
        "NOT_FOUND" => ModelError::ModelNotFound(model.to_string()),
        _ if code == 429 => ModelError::RateLimited(error.message),
        _ if code == 401 || code == 403 => ModelError::AuthFailed(error.message),
        _ => ModelError::Api(format!("HTTP {code}: {}", error.message)),
    }
}

fn extract_text(response: GenerateResponse) -> ModelResult<String> {
    let Some(candidate) = response.candidates.into_iter().next() else {
        let reason = response
            .prompt_feedback
            .and_then(|feedback| feedback.block_reason)
            .unwrap_or_else(|| "no candidates".to_string());
        return Err(ModelError::EmptyResponse(reason));
    };

    let text: String = candidate
        .content
        .map(|content| content.parts)
        .unwrap_or_default()
        .into_iter()
        .filter_map(|part| part.text)
        .collect();

    if text.trim().is_empty() {
        let reason = candidate
            .finish_reason
            .unwrap_or_else(|| "empty candidate".to_string());
        return Err(ModelError::EmptyResponse(reason));
    }
    Ok(text)
}

#[async_trait]
impl ModelClient for GeminiClient {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, turns: &[ChatTurn]) -> ModelResult<String> {
        let request = build_request(turns);
        let started = Instant::now();

        let response = self
            .client
            .post(self.generate_url())
            .headers(self.headers())
            .json(&request)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        tracing::debug!(
            model = %self.model,
            status = status.as_u16(),
            latency_ms = started.elapsed().as_millis() as u64,
            bytes = body.len(),
            "gemini response received"
        );

        if !status.is_success() {
            return Err(classify_error(status, &body, &self.model));
        }

        let parsed: GenerateResponse = serde_json::from_str(&body)?;
        extract_text(parsed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client() -> GeminiClient {
        GeminiClient::new(
            "https://example.test/v1beta/",
            "gemini-test",
            "test-key",
            Duration::from_secs(5),
        )
        .expect("client should build")
    }

    #[test]
    fn generate_url_trims_trailing_slash() {
        assert_eq!(
            client().generate_url(),
            "https://example.test/v1beta/models/gemini-test:generateContent"
        );
    }

    #[test]
    fn api_key_travels_in_a_header_not_the_url() {
        let client = client();
        assert!(!client.generate_url().contains("test-key"));
        assert_eq!(
            client.headers().get("x-goog-api-key").and_then(|v| v.to_str().ok()),
            Some("test-key")
        );
    }

    #[test]
    fn request_maps_roles() {
        let request = build_request(&[ChatTurn::user("make a page"), ChatTurn::assistant("{}")]);
        let value = serde_json::to_value(&request).expect("request should serialize");
        assert_eq!(value["contents"][0]["role"], "user");
        assert_eq!(value["contents"][1]["role"], "model");
        assert_eq!(value["contents"][0]["parts"][0]["text"], "make a page");
    }

    #[test]
    fn text_parts_are_concatenated() {
        let response: GenerateResponse = serde_json::from_str(
            r#"{"candidates":[{"content":{"role":"model","parts":[{"text":"{\"a\":"},{"text":"1}"}]},"finishReason":"STOP"}]}"#,
        )
        .expect("fixture should parse");
        assert_eq!(extract_text(response).unwrap(), "{\"a\":1}");
    }

    #[test]
    fn blocked_prompt_is_an_empty_response() {
        let response: GenerateResponse =
            serde_json::from_str(r#"{"promptFeedback":{"blockReason":"SAFETY"}}"#)
                .expect("fixture should parse");
        let error = extract_text(response).expect_err("no candidates should fail");
        assert!(matches!(error, ModelError::EmptyResponse(reason) if reason == "SAFETY"));
    }

    #[test]
    fn classifies_rate_limit_and_auth_errors() {
        let exhausted = r#"{"error":{"code":429,"message":"Quota exceeded","status":"RESOURCE_EXHAUSTED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, exhausted, "m"),
            ModelError::RateLimited(message) if message == "Quota exceeded"
        ));

        let bad_key = r#"{"error":{"code":400,"message":"API key not valid","status":"UNAUTHENTICATED"}}"#;
        assert!(matches!(
            classify_error(StatusCode::BAD_REQUEST, bad_key, "m"),
            ModelError::AuthFailed(_)
        ));

        let missing = r#"{"error":{"code":404,"message":"models/x is not found","status":"NOT_FOUND"}}"#;
        assert!(matches!(
            classify_error(StatusCode::NOT_FOUND, missing, "gemini-x"),
            ModelError::ModelNotFound(model) if model == "gemini-x"
        ));
    }

    #[test]
    fn unparseable_error_bodies_keep_the_status() {
        assert!(matches!(
            classify_error(StatusCode::TOO_MANY_REQUESTS, "slow down", "m"),
            ModelError::RateLimited(_)
        ));
        let error = classify_error(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>", "m");
        assert!(error.to_string().contains("502"));
    }
}
