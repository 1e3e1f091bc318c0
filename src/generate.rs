//! Script generation through the Gemini `generateContent` API.
//!
//! Callers only ever see a script or an empty string: every failure is
//! logged and collapses to "no result".

use serde::{Deserialize, Serialize};

pub const DEFAULT_SCENARIO: &str = "A funny first date conversation";
pub const DEFAULT_GEMINI_MODEL: &str = "gemini-3-flash-preview";
pub const MODEL_ENV: &str = "CHATMOCK_GEMINI_MODEL";
pub const API_KEY_ENVS: [&str; 2] = ["GEMINI_API_KEY", "API_KEY"];
pub const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ScriptRequest {
    pub sender: String,
    pub receiver: String,
    pub scenario: String,
}

impl ScriptRequest {
    pub fn new(sender: impl Into<String>, receiver: impl Into<String>, scenario: Option<&str>) -> Self {
        let scenario = scenario
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_SCENARIO);
        Self {
            sender: sender.into(),
            receiver: receiver.into(),
            scenario: scenario.to_owned(),
        }
    }
}

pub fn build_prompt(request: &ScriptRequest) -> String {
    let ScriptRequest {
        sender,
        receiver,
        scenario,
    } = request;
    format!(
        "Generate a short fake chat script between {sender} and {receiver}.\n\
         Scenario: {scenario}.\n\
         Use the syntax:\n\
         > for {sender} (sender)\n\
         < for {receiver} (receiver)\n\
         Example:\n\
         > Hey, how are you?\n\
         < I'm good!\n\
         Only return the script lines, no extra text."
    )
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Part {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub text: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Content {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub role: Option<String>,
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationConfig {
    pub temperature: f32,
    pub top_p: f32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    pub contents: Vec<Content>,
    pub generation_config: GenerationConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct Candidate {
    #[serde(default)]
    pub content: Option<Content>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

pub fn request_body(request: &ScriptRequest) -> GenerateRequest {
    GenerateRequest {
        contents: vec![Content {
            role: Some("user".to_owned()),
            parts: vec![Part {
                text: Some(build_prompt(request)),
            }],
        }],
        generation_config: GenerationConfig {
            temperature: 0.8,
            top_p: 0.95,
        },
    }
}

/// Text of the first candidate with code fences removed, trimmed. Empty
/// when the response carries no text.
pub fn response_text(response: &GenerateResponse) -> String {
    let text = response
        .candidates
        .first()
        .and_then(|candidate| candidate.content.as_ref())
        .map(|content| {
            content
                .parts
                .iter()
                .filter_map(|part| part.text.as_deref())
                .collect::<String>()
        })
        .unwrap_or_default();
    strip_markdown_code_fences(&text)
}

pub fn strip_markdown_code_fences(input: &str) -> String {
    let trimmed = input.trim();
    if let Some(rest) = trimmed.strip_prefix("```") {
        let without_lang = rest
            .split_once('\n')
            .map_or("", |(_, body)| body)
            .trim_end();
        return without_lang.trim_end_matches("```").trim().to_owned();
    }
    trimmed.to_owned()
}

pub fn api_key_from_env() -> Option<String> {
    API_KEY_ENVS
        .iter()
        .filter_map(|name| std::env::var(name).ok())
        .find(|value| !value.trim().is_empty())
}

pub fn model_from_env() -> String {
    std::env::var(MODEL_ENV)
        .ok()
        .filter(|value| !value.trim().is_empty())
        .unwrap_or_else(|| DEFAULT_GEMINI_MODEL.to_owned())
}

#[cfg(feature = "generate")]
pub use client::GeminiClient;

#[cfg(feature = "generate")]
mod client {
    use anyhow::{anyhow, Context, Result};
    use reqwest::Client;

    use super::{
        api_key_from_env, model_from_env, request_body, response_text, GenerateResponse,
        ScriptRequest, GEMINI_API_BASE,
    };

    #[derive(Debug, Clone)]
    pub struct GeminiClient {
        http: Client,
        api_key: Option<String>,
        model: String,
    }

    impl GeminiClient {
        pub fn new(http: Client, api_key: Option<String>, model: Option<String>) -> Self {
            let model = model
                .and_then(|value| (!value.trim().is_empty()).then_some(value))
                .unwrap_or_else(model_from_env);
            Self {
                http,
                api_key,
                model,
            }
        }

        pub fn from_env(http: Client) -> Self {
            Self::new(http, api_key_from_env(), None)
        }

        pub fn model(&self) -> &str {
            &self.model
        }

        /// Generated script, or an empty string on any failure.
        pub async fn generate_script(&self, request: &ScriptRequest) -> String {
            match self.try_generate(request).await {
                Ok(script) => script,
                Err(error) => {
                    tracing::error!("script generation failed: {error:#}");
                    String::new()
                }
            }
        }

        async fn try_generate(&self, request: &ScriptRequest) -> Result<String> {
            let api_key = self
                .api_key
                .as_deref()
                .ok_or_else(|| anyhow!("GEMINI_API_KEY (or API_KEY) is not set"))?;
            let url = format!("{GEMINI_API_BASE}/{}:generateContent", self.model);

            let response: GenerateResponse = self
                .http
                .post(url)
                .header("x-goog-api-key", api_key)
                .json(&request_body(request))
                .send()
                .await
                .context("failed to call Gemini API")?
                .error_for_status()
                .context("Gemini API returned an error status")?
                .json()
                .await
                .context("failed to decode Gemini response")?;

            let script = response_text(&response);
            tracing::debug!(model = %self.model, chars = script.len(), "generated script");
            Ok(script)
        }
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::{
        build_prompt, request_body, response_text, strip_markdown_code_fences, GenerateResponse,
        ScriptRequest, DEFAULT_SCENARIO,
    };

    #[test]
    fn blank_scenario_falls_back_to_the_default() {
        assert_eq!(ScriptRequest::new("A", "B", Some("  ")).scenario, DEFAULT_SCENARIO);
        assert_eq!(ScriptRequest::new("A", "B", None).scenario, DEFAULT_SCENARIO);
        assert_eq!(
            ScriptRequest::new("A", "B", Some("Moving day")).scenario,
            "Moving day"
        );
    }

    #[test]
    fn prompt_names_both_parties_and_the_markers() {
        let prompt = build_prompt(&ScriptRequest::new("Alex", "Jordan", Some("Lost keys")));
        assert!(prompt.contains("between Alex and Jordan"));
        assert!(prompt.contains("Scenario: Lost keys."));
        assert!(prompt.contains("> for Alex (sender)"));
        assert!(prompt.contains("< for Jordan (receiver)"));
    }

    #[test]
    fn request_uses_gemini_field_names() {
        let body = serde_json::to_value(request_body(&ScriptRequest::new("A", "B", None)))
            .expect("serializable");
        assert_eq!(body["generationConfig"]["topP"], json!(0.95_f32));
        assert_eq!(body["generationConfig"]["temperature"], json!(0.8_f32));
        assert!(body["contents"][0]["parts"][0]["text"]
            .as_str()
            .is_some_and(|text| text.contains("between A and B")));
    }

    #[test]
    fn response_text_joins_parts_and_strips_fences() {
        let response: GenerateResponse = serde_json::from_value(json!({
            "candidates": [{
                "content": { "role": "model", "parts": [
                    { "text": "```text\n> Hey\n" },
                    { "text": "< Hi!\n```" }
                ]}
            }]
        }))
        .expect("decodable");
        assert_eq!(response_text(&response), "> Hey\n< Hi!");
    }

    #[test]
    fn missing_candidates_mean_no_result() {
        assert_eq!(response_text(&GenerateResponse::default()), "");
        let blocked: GenerateResponse =
            serde_json::from_value(json!({ "candidates": [{}] })).expect("decodable");
        assert_eq!(response_text(&blocked), "");
    }

    #[test]
    fn unfenced_text_is_only_trimmed() {
        assert_eq!(strip_markdown_code_fences("  > a\n< b \n"), "> a\n< b");
    }

    #[cfg(feature = "generate")]
    #[tokio::test]
    async fn missing_key_collapses_to_an_empty_script() {
        let client = super::GeminiClient::new(reqwest::Client::new(), None, Some("test-model".to_owned()));
        assert_eq!(client.model(), "test-model");
        let script = client
            .generate_script(&ScriptRequest::new("A", "B", None))
            .await;
        assert!(script.is_empty());
    }
}
