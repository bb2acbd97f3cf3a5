//! Optional generated explanations for learner mistakes.
//!
//! Explanations are best effort: every call is time boxed and a failure only
//! drops the explanation from the reply.

use std::time::Duration;

use async_trait::async_trait;
use lesson_core::{Language, ReasonCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExplainError {
    #[error("network error: {0}")]
    Network(String),

    #[error("explainer error (HTTP {status}): {message}")]
    Backend { status: u16, message: String },

    #[error("explainer timed out after {0}ms")]
    Timeout(u64),

    #[error("explainer returned an empty explanation")]
    Empty,
}

/// What the explainer is told about a mistake.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExplainRequest {
    pub language: Language,
    pub prompt: String,
    pub expected_answer: String,
    pub user_answer: String,
    pub concept_tag: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reason: Option<ReasonCode>,
}

#[async_trait]
pub trait Explainer: Send + Sync {
    fn name(&self) -> &str;

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ExplainError>;
}

/// Run `explainer` with a deadline. Blank explanations count as failures.
pub async fn explain_with_timeout(
    explainer: &dyn Explainer,
    request: &ExplainRequest,
    timeout: Duration,
) -> Result<String, ExplainError> {
    let text = tokio::time::timeout(timeout, explainer.explain(request))
        .await
        .map_err(|_| ExplainError::Timeout(timeout.as_millis() as u64))??;

    let text = text.trim();
    if text.is_empty() {
        return Err(ExplainError::Empty);
    }
    Ok(text.to_string())
}

/// Explainer backed by a JSON HTTP endpoint.
///
/// POSTs an `ExplainRequest` and expects `{"explanation": "..."}` back.
pub struct HttpExplainer {
    url: String,
    client: reqwest::Client,
    timeout: Duration,
}

#[derive(Deserialize)]
struct ExplainResponse {
    #[serde(default)]
    explanation: String,
}

impl HttpExplainer {
    pub fn new(url: &str, timeout: Duration) -> Result<Self, ExplainError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ExplainError::Network(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            url: url.to_string(),
            client,
            timeout,
        })
    }
}

#[async_trait]
impl Explainer for HttpExplainer {
    fn name(&self) -> &str {
        "http"
    }

    async fn explain(&self, request: &ExplainRequest) -> Result<String, ExplainError> {
        let response = self
            .client
            .post(&self.url)
            .json(request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ExplainError::Timeout(self.timeout.as_millis() as u64)
                } else {
                    ExplainError::Network(e.to_string())
                }
            })?;

        let status = response.status().as_u16();
        if status >= 400 {
            let body = response.text().await.unwrap_or_default();
            return Err(ExplainError::Backend {
                status,
                message: body,
            });
        }

        let body: ExplainResponse = response.json().await.map_err(|e| ExplainError::Backend {
            status,
            message: format!("failed to parse response: {e}"),
        })?;

        Ok(body.explanation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn request() -> ExplainRequest {
        ExplainRequest {
            language: Language::German,
            prompt: "The table".to_string(),
            expected_answer: "der Tisch".to_string(),
            user_answer: "die Tisch".to_string(),
            concept_tag: "articles".to_string(),
            reason: Some(ReasonCode::Article),
        }
    }

    #[tokio::test]
    async fn successful_explanation() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/explain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "explanation": "Tisch is masculine, so it takes der."
            })))
            .mount(&server)
            .await;

        let explainer =
            HttpExplainer::new(&format!("{}/explain", server.uri()), Duration::from_secs(5)).unwrap();
        let text = explain_with_timeout(&explainer, &request(), Duration::from_secs(5))
            .await
            .unwrap();
        assert_eq!(text, "Tisch is masculine, so it takes der.");
    }

    #[tokio::test]
    async fn backend_error() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/explain"))
            .respond_with(ResponseTemplate::new(503).set_body_string("overloaded"))
            .mount(&server)
            .await;

        let explainer =
            HttpExplainer::new(&format!("{}/explain", server.uri()), Duration::from_secs(5)).unwrap();
        let err = explainer.explain(&request()).await.unwrap_err();
        match err {
            ExplainError::Backend { status, message } => {
                assert_eq!(status, 503);
                assert_eq!(message, "overloaded");
            }
            other => panic!("expected backend error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn empty_explanation_is_rejected() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/explain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "explanation": "   "
            })))
            .mount(&server)
            .await;

        let explainer =
            HttpExplainer::new(&format!("{}/explain", server.uri()), Duration::from_secs(5)).unwrap();
        let err = explain_with_timeout(&explainer, &request(), Duration::from_secs(5))
            .await
            .unwrap_err();
        assert!(matches!(err, ExplainError::Empty));
    }

    #[tokio::test]
    async fn slow_backend_times_out() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/explain"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"explanation": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let explainer =
            HttpExplainer::new(&format!("{}/explain", server.uri()), Duration::from_secs(5)).unwrap();
        let err = explain_with_timeout(&explainer, &request(), Duration::from_millis(50))
            .await
            .unwrap_err();
        assert!(matches!(err, ExplainError::Timeout(50)));
    }

    #[tokio::test]
    async fn client_timeout_reports_configured_budget() {
        let server = MockServer::start().await;

        Mock::given(method("POST"))
            .and(path("/explain"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"explanation": "late"}))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;

        let explainer =
            HttpExplainer::new(&format!("{}/explain", server.uri()), Duration::from_millis(50)).unwrap();
        let err = explainer.explain(&request()).await.unwrap_err();
        assert!(matches!(err, ExplainError::Timeout(50)), "got {err:?}");
    }
}
