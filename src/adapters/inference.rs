//! HTTP inference client.
//!
//! Posts `{evidence_reference, prompt, model_id}` as JSON to a configured
//! analysis endpoint and parses the response leniently: the service is
//! untrusted input, so missing or mistyped fields degrade to empty findings
//! rather than an error. Only transport and non-2xx failures are errors.

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::{InferenceClient, InferenceRequest, InferenceResponse};

/// JSON-over-HTTP inference collaborator.
pub struct HttpInferenceClient {
    endpoint: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl HttpInferenceClient {
    /// Create a client for the given analysis endpoint.
    pub fn new(endpoint: impl Into<String>, api_key: Option<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            api_key,
            client: reqwest::Client::new(),
        }
    }

    /// Pull the findings array out of a response body, tolerating the
    /// synonymous container names different services use.
    fn extract_findings(body: &Value) -> Vec<Value> {
        for key in ["findings", "events", "detections", "results"] {
            if let Some(arr) = body.get(key).and_then(Value::as_array) {
                return arr.clone();
            }
        }
        Vec::new()
    }

    fn extract_summary(body: &Value) -> Option<String> {
        for key in ["summary", "description", "answer", "text"] {
            if let Some(s) = body.get(key).and_then(Value::as_str) {
                if !s.trim().is_empty() {
                    return Some(s.trim().to_string());
                }
            }
        }
        None
    }
}

#[async_trait]
impl InferenceClient for HttpInferenceClient {
    fn name(&self) -> &str {
        "http"
    }

    async fn analyze(&self, request: &InferenceRequest) -> Result<InferenceResponse> {
        let payload = serde_json::json!({
            "evidence_reference": request.evidence_reference,
            "prompt": request.prompt,
            "model_id": request.model_id,
        });

        let mut builder = self.client.post(&self.endpoint).json(&payload);
        if let Some(ref key) = self.api_key {
            builder = builder.bearer_auth(key);
        }

        let response = builder
            .send()
            .await
            .context("Failed to reach inference endpoint")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            anyhow::bail!(
                "Inference endpoint returned {}: {}",
                status,
                body.chars().take(200).collect::<String>()
            );
        }

        let body: Value = response
            .json()
            .await
            .context("Inference response is not valid JSON")?;

        let findings = Self::extract_findings(&body);
        let summary = Self::extract_summary(&body);
        debug!(count = findings.len(), "Inference response parsed");

        Ok(InferenceResponse { findings, summary })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_extract_findings_synonyms() {
        let body = json!({"events": [{"start": 1}, {"start": 2}]});
        assert_eq!(HttpInferenceClient::extract_findings(&body).len(), 2);

        let body = json!({"findings": []});
        assert!(HttpInferenceClient::extract_findings(&body).is_empty());

        let body = json!({"unrelated": true});
        assert!(HttpInferenceClient::extract_findings(&body).is_empty());
    }

    #[test]
    fn test_extract_summary_priority_and_blank() {
        let body = json!({"summary": "two events", "text": "ignored"});
        assert_eq!(
            HttpInferenceClient::extract_summary(&body).as_deref(),
            Some("two events")
        );

        let body = json!({"summary": "   ", "answer": "fallback"});
        assert_eq!(
            HttpInferenceClient::extract_summary(&body).as_deref(),
            Some("fallback")
        );

        assert!(HttpInferenceClient::extract_summary(&json!({})).is_none());
    }
}
