use std::time::Duration;

use serde_json::{json, Value};
use tracing::debug;

use nrve_core::{LanguageModel, NrveError, NrveResult};

pub const DEFAULT_ENDPOINT: &str = "https://generativelanguage.googleapis.com/v1beta";
pub const DEFAULT_MODEL: &str = "gemini-1.5-flash";

/// Google Gemini `generateContent` over blocking HTTP.
pub struct GeminiModel {
    agent: ureq::Agent,
    endpoint: String,
    model: String,
    api_key: String,
}

impl GeminiModel {
    pub fn new(api_key: String, model: String, endpoint: String, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new().timeout(timeout).build();
        Self {
            agent,
            endpoint: endpoint.trim_end_matches('/').to_string(),
            model,
            api_key,
        }
    }

    fn url(&self) -> String {
        format!("{}/models/{}:generateContent", self.endpoint, self.model)
    }
}

impl LanguageModel for GeminiModel {
    fn generate(&self, prompt: &str) -> NrveResult<String> {
        let body = json!({
            "contents": [{ "parts": [{ "text": prompt }] }]
        });

        debug!(model = %self.model, chars = prompt.len(), "generateContent");
        let raw = self
            .agent
            .post(&self.url())
            .set("x-goog-api-key", &self.api_key)
            .send_json(body)
            .map_err(|e| NrveError::Upstream(e.to_string()))?
            .into_string()
            .map_err(|e| NrveError::Upstream(format!("reading response body: {e}")))?;

        parse_response(&raw)
    }

    fn name(&self) -> &str {
        &self.model
    }
}

fn parse_response(raw: &str) -> NrveResult<String> {
    let resp: Value = serde_json::from_str(raw)?;
    extract_text(&resp).ok_or_else(|| NrveError::Upstream("response had no text".into()))
}

/// Concatenate the text parts of the first candidate.
fn extract_text(resp: &Value) -> Option<String> {
    let parts = resp
        .get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .as_array()?;
    let text: String = parts
        .iter()
        .filter_map(|p| p.get("text").and_then(|t| t.as_str()))
        .collect();
    Some(text)
}
