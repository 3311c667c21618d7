//! Native Gemini provider.
//!
//! Auth priority: config key → GEMINI_API_KEY → GOOGLE_API_KEY.
//!
//! Thinking model support: Gemini 2.5 models return parts tagged `thought: true`.
//! This provider filters those out and only returns the final non-thought text.

use async_trait::async_trait;
use reqwest::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::debug;

use crate::config::ProviderConfig;
use crate::error::{BibleError, Result};

use super::{parse_provider_error, ChatOptions, LLMProvider, LLMResponse, Message, Usage};

/// Gemini v1beta REST API base.
const GEMINI_API_BASE: &str = "https://generativelanguage.googleapis.com/v1beta";

/// Finish reasons that mean the candidate was withheld.
const BLOCKING_FINISH_REASONS: &[&str] =
    &["SAFETY", "RECITATION", "BLOCKLIST", "PROHIBITED_CONTENT"];

// ── Auth ─────────────────────────────────────────────────────────────────────

/// API key for the Gemini REST API, sent as the `?key=` query parameter.
pub enum GeminiAuth {
    ApiKey(String),
}

impl std::fmt::Debug for GeminiAuth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ApiKey(_) => f.write_str("GeminiAuth::ApiKey([REDACTED])"),
        }
    }
}

impl GeminiAuth {
    /// Resolve an API key: explicit config value first, then environment.
    pub fn resolve(explicit_key: Option<&str>, env_key: Option<&str>) -> Option<Self> {
        explicit_key
            .filter(|k| !k.is_empty())
            .or_else(|| env_key.filter(|k| !k.is_empty()))
            .map(|k| Self::ApiKey(k.to_string()))
    }
}

// ── Provider ──────────────────────────────────────────────────────────────────

/// Gemini provider speaking the `generateContent` REST API directly.
pub struct GeminiProvider {
    auth: GeminiAuth,
    model: String,
    base_url: String,
    client: Client,
}

impl std::fmt::Debug for GeminiProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GeminiProvider")
            .field("auth", &self.auth)
            .field("model", &self.model)
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GeminiProvider {
    /// Build a provider that authenticates with an API key.
    pub fn new_with_key(api_key: &str, model: &str, timeout: Duration) -> Result<Self> {
        Ok(Self {
            auth: GeminiAuth::ApiKey(api_key.to_string()),
            model: model.to_string(),
            base_url: GEMINI_API_BASE.to_string(),
            client: Self::build_client(timeout)?,
        })
    }

    /// Build from config, resolving the key from config then environment.
    ///
    /// Fails with [`BibleError::Config`] when no key is available.
    pub fn from_config(config: &ProviderConfig) -> Result<Self> {
        let env_key = std::env::var("GEMINI_API_KEY")
            .or_else(|_| std::env::var("GOOGLE_API_KEY"))
            .ok();
        let auth = GeminiAuth::resolve(config.api_key.as_deref(), env_key.as_deref())
            .ok_or_else(|| {
                BibleError::Config(
                    "no Gemini API key configured (set GEMINI_API_KEY or provider.api_key)"
                        .to_string(),
                )
            })?;

        Ok(Self {
            auth,
            model: config.model.clone(),
            base_url: GEMINI_API_BASE.to_string(),
            client: Self::build_client(Duration::from_secs(config.timeout_secs))?,
        })
    }

    /// Point the provider at a different API root (proxies, tests).
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.base_url = base_url.trim_end_matches('/').to_string();
        self
    }

    fn build_client(timeout: Duration) -> Result<Client> {
        Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| BibleError::Config(format!("failed to build HTTP client: {}", e)))
    }

    /// Build a `generateContent` request body from a slice of [`Message`]s.
    fn build_messages_body(&self, messages: &[Message], options: &ChatOptions) -> Value {
        let contents: Vec<Value> = messages
            .iter()
            .map(|m| {
                json!({
                    "role": "user",
                    "parts": [{ "text": &m.content }]
                })
            })
            .collect();

        let mut generation_config = json!({});
        if let Some(max_tokens) = options.max_tokens {
            generation_config["maxOutputTokens"] = json!(max_tokens);
        }
        if let Some(temp) = options.temperature {
            generation_config["temperature"] = json!(temp);
        }
        if options.json_mode {
            generation_config["responseMimeType"] = json!("application/json");
        }

        json!({
            "contents": contents,
            "generationConfig": generation_config
        })
    }

    /// Why a 2xx response carries no usable candidate, if it was withheld.
    ///
    /// Covers a prompt-level `blockReason` and a first candidate stopped for
    /// safety, recitation or blocklist reasons.
    pub fn block_reason(response: &Value) -> Option<String> {
        if let Some(reason) = response["promptFeedback"]["blockReason"].as_str() {
            return Some(format!("prompt blocked: {}", reason));
        }
        let finish = response["candidates"][0]["finishReason"].as_str()?;
        BLOCKING_FINISH_REASONS
            .contains(&finish)
            .then(|| format!("candidate withheld: {}", finish))
    }

    /// Extract final answer text from a Gemini API response.
    ///
    /// Parts tagged `"thought": true` are intermediate reasoning and are
    /// skipped. If only thought parts exist, their text is returned instead.
    pub fn extract_text(response: &Value) -> Option<String> {
        let parts = response["candidates"][0]["content"]["parts"].as_array()?;

        let final_parts: Vec<&str> = parts
            .iter()
            .filter(|p| !p["thought"].as_bool().unwrap_or(false))
            .filter_map(|p| p["text"].as_str())
            .collect();

        if !final_parts.is_empty() {
            return Some(final_parts.join(""));
        }

        let thought_parts: Vec<&str> = parts.iter().filter_map(|p| p["text"].as_str()).collect();

        if !thought_parts.is_empty() {
            Some(thought_parts.join(""))
        } else {
            None
        }
    }

    /// Parse token usage from a Gemini response if available.
    fn extract_usage(response: &Value) -> Option<Usage> {
        let meta = response.get("usageMetadata")?;
        let prompt = meta["promptTokenCount"].as_u64()? as u32;
        let completion = meta["candidatesTokenCount"].as_u64()? as u32;
        Some(Usage::new(prompt, completion))
    }

    fn api_url(&self, model: &str) -> String {
        format!("{}/models/{}:generateContent", self.base_url, model)
    }

    fn apply_auth(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.auth {
            GeminiAuth::ApiKey(key) => request.query(&[("key", key.as_str())]),
        }
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn chat(
        &self,
        messages: Vec<Message>,
        model: Option<&str>,
        options: ChatOptions,
    ) -> Result<LLMResponse> {
        let model = model.unwrap_or(&self.model);
        let body = self.build_messages_body(&messages, &options);

        debug!(model = model, json_mode = options.json_mode, "Gemini request");

        let request = self
            .client
            .post(self.api_url(model))
            .header("Content-Type", "application/json")
            .json(&body);

        let response = self
            .apply_auth(request)
            .send()
            .await
            .map_err(|e| BibleError::Provider(format!("Gemini request failed: {}", e)))?;

        if response.status().is_success() {
            let json: Value = response.json().await.map_err(|e| {
                BibleError::Provider(format!("Failed to parse Gemini response: {}", e))
            })?;

            if let Some(reason) = Self::block_reason(&json) {
                return Err(BibleError::Provider(format!("Gemini {}", reason)));
            }
            let content = Self::extract_text(&json)
                .filter(|text| !text.trim().is_empty())
                .ok_or_else(|| BibleError::Provider("Gemini returned no text".to_string()))?;
            let mut llm_response = LLMResponse::text(&content);
            if let Some(u) = Self::extract_usage(&json) {
                llm_response = llm_response.with_usage(u);
            }
            return Ok(llm_response);
        }

        let status = response.status().as_u16();
        let error_text = response.text().await.unwrap_or_default();

        let body_msg = serde_json::from_str::<Value>(&error_text)
            .ok()
            .and_then(|v| v["error"]["message"].as_str().map(String::from))
            .unwrap_or(error_text);

        Err(BibleError::from(parse_provider_error(status, &body_msg)))
    }

    fn default_model(&self) -> &str {
        &self.model
    }

    fn name(&self) -> &str {
        "gemini"
    }
}

// ── Tests ─────────────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;
    use axum::extract::Query;
    use axum::http::StatusCode;
    use axum::routing::post;
    use axum::{Json, Router};
    use std::collections::HashMap;

    fn provider() -> GeminiProvider {
        GeminiProvider::new_with_key("test-key", "gemini-1.5-flash", Duration::from_secs(5))
            .unwrap()
    }

    /// Serve `router` on an ephemeral port and return its base URL.
    async fn serve(router: Router) -> String {
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });
        format!("http://{}", addr)
    }

    #[test]
    fn test_auth_resolution_prefers_explicit_key() {
        let auth = GeminiAuth::resolve(Some("explicit-key"), Some("env-key"));
        assert!(matches!(auth, Some(GeminiAuth::ApiKey(k)) if k == "explicit-key"));
    }

    #[test]
    fn test_auth_resolution_falls_back_to_env() {
        let auth = GeminiAuth::resolve(Some(""), Some("env-key"));
        assert!(matches!(auth, Some(GeminiAuth::ApiKey(k)) if k == "env-key"));
    }

    #[test]
    fn test_auth_resolution_returns_none_with_no_credentials() {
        assert!(GeminiAuth::resolve(None, None).is_none());
    }

    #[test]
    fn test_auth_debug_is_redacted() {
        let auth = GeminiAuth::ApiKey("secret".into());
        assert!(!format!("{:?}", auth).contains("secret"));
    }

    #[test]
    fn test_extract_text_skips_thought_parts() {
        let response = json!({
            "candidates": [{
                "content": {
                    "parts": [
                        { "text": "thinking...", "thought": true },
                        { "text": "{\"paraphrase\":\"x\"}" }
                    ]
                }
            }]
        });
        let text = GeminiProvider::extract_text(&response);
        assert_eq!(text.as_deref(), Some("{\"paraphrase\":\"x\"}"));
    }

    #[test]
    fn test_extract_text_falls_back_to_thought_if_no_final() {
        let response = json!({
            "candidates": [{ "content": { "parts": [{ "text": "only thought", "thought": true }] } }]
        });
        let text = GeminiProvider::extract_text(&response);
        assert_eq!(text.as_deref(), Some("only thought"));
    }

    #[test]
    fn test_extract_text_returns_none_without_candidates() {
        let response = json!({ "promptFeedback": { "blockReason": "SAFETY" } });
        assert!(GeminiProvider::extract_text(&response).is_none());
    }

    #[test]
    fn test_extract_usage_parses_token_counts() {
        let response = json!({
            "usageMetadata": { "promptTokenCount": 10, "candidatesTokenCount": 5 }
        });
        let usage = GeminiProvider::extract_usage(&response).unwrap();
        assert_eq!(usage.prompt_tokens, 10);
        assert_eq!(usage.completion_tokens, 5);
        assert_eq!(usage.total_tokens, 15);
    }

    #[test]
    fn test_build_body_json_mode_sets_mime_type() {
        let body = provider().build_messages_body(
            &[Message::user("Hi")],
            &ChatOptions::json().with_max_tokens(100),
        );
        assert_eq!(
            body["generationConfig"]["responseMimeType"],
            "application/json"
        );
        assert_eq!(body["generationConfig"]["maxOutputTokens"], 100);
        assert_eq!(body["contents"][0]["role"], "user");
        assert_eq!(body["contents"][0]["parts"][0]["text"], "Hi");
    }

    #[test]
    fn test_build_body_plain_mode_has_no_mime_type() {
        let body = provider().build_messages_body(&[Message::user("Hello")], &ChatOptions::default());
        assert_eq!(body["contents"].as_array().unwrap().len(), 1);
        assert!(body["generationConfig"].get("responseMimeType").is_none());
    }

    #[test]
    fn test_block_reason_detects_prompt_feedback() {
        let response = json!({ "candidates": [], "promptFeedback": { "blockReason": "SAFETY" } });
        let reason = GeminiProvider::block_reason(&response).unwrap();
        assert!(reason.contains("SAFETY"));
    }

    #[test]
    fn test_block_reason_detects_withheld_candidate() {
        let response = json!({ "candidates": [{ "finishReason": "RECITATION" }] });
        assert!(GeminiProvider::block_reason(&response).is_some());

        let response = json!({
            "candidates": [{ "finishReason": "STOP", "content": { "parts": [{ "text": "{}" }] } }]
        });
        assert!(GeminiProvider::block_reason(&response).is_none());
    }

    #[test]
    fn test_api_url_format() {
        let url = provider().api_url("gemini-1.5-flash");
        assert!(url.starts_with(GEMINI_API_BASE));
        assert!(url.ends_with("/models/gemini-1.5-flash:generateContent"));
    }

    #[test]
    fn test_with_base_url_trims_trailing_slash() {
        let p = provider().with_base_url("http://localhost:1234/");
        assert_eq!(
            p.api_url("m"),
            "http://localhost:1234/models/m:generateContent"
        );
    }

    #[test]
    fn test_from_config_uses_config_key_and_model() {
        let cfg = ProviderConfig {
            api_key: Some("cfg-key".into()),
            model: "gemini-2.0-flash".into(),
            ..ProviderConfig::default()
        };
        let p = GeminiProvider::from_config(&cfg).unwrap();
        assert_eq!(p.default_model(), "gemini-2.0-flash");
        assert_eq!(p.name(), "gemini");
    }

    #[tokio::test]
    async fn test_chat_against_local_server() {
        let router = Router::new().route(
            "/models/{model}",
            post(
                |Query(q): Query<HashMap<String, String>>, Json(body): Json<Value>| async move {
                    assert_eq!(q.get("key").map(String::as_str), Some("test-key"));
                    assert_eq!(
                        body["generationConfig"]["responseMimeType"],
                        "application/json"
                    );
                    Json(json!({
                        "candidates": [{ "content": { "parts": [{ "text": "{\"story\":\"s\"}" }] } }],
                        "usageMetadata": { "promptTokenCount": 3, "candidatesTokenCount": 4 }
                    }))
                },
            ),
        );
        let base = serve(router).await;
        let p = provider().with_base_url(&base);

        let resp = p
            .chat(vec![Message::user("prompt")], None, ChatOptions::json())
            .await
            .unwrap();
        assert_eq!(resp.content, "{\"story\":\"s\"}");
        assert_eq!(resp.usage.unwrap().total_tokens, 7);
    }

    #[tokio::test]
    async fn test_chat_maps_error_status() {
        let router = Router::new().route(
            "/models/{model}",
            post(|| async {
                (
                    StatusCode::TOO_MANY_REQUESTS,
                    Json(json!({ "error": { "message": "Resource has been exhausted" } })),
                )
            }),
        );
        let base = serve(router).await;
        let p = provider().with_base_url(&base);

        let err = p
            .chat(vec![Message::user("prompt")], None, ChatOptions::json())
            .await
            .unwrap_err();
        let msg = err.to_string();
        assert!(matches!(err, BibleError::Provider(_)));
        assert!(msg.contains("rate limited"));
        assert!(msg.contains("Resource has been exhausted"));
    }

    #[tokio::test]
    async fn test_chat_connection_refused_is_provider_error() {
        let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();
        drop(listener);

        let p = provider().with_base_url(&format!("http://{}", addr));
        let err = p
            .chat(vec![Message::user("prompt")], None, ChatOptions::default())
            .await
            .unwrap_err();
        assert!(matches!(err, BibleError::Provider(_)));
    }

    async fn serve_reply(reply: Value) -> GeminiProvider {
        let router = Router::new().route(
            "/models/{model}",
            post(move || {
                let reply = reply.clone();
                async move { Json(reply) }
            }),
        );
        let base = serve(router).await;
        provider().with_base_url(&base)
    }

    #[tokio::test]
    async fn test_chat_blocked_prompt_is_provider_error() {
        let p = serve_reply(json!({
            "candidates": [],
            "promptFeedback": { "blockReason": "SAFETY" }
        }))
        .await;

        let err = p
            .chat(vec![Message::user("prompt")], None, ChatOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(err, BibleError::Provider(_)));
        assert!(err.to_string().contains("SAFETY"));
    }

    #[tokio::test]
    async fn test_chat_empty_text_is_provider_error() {
        let p = serve_reply(json!({
            "candidates": [{ "content": { "parts": [{ "text": "  " }] }, "finishReason": "STOP" }]
        }))
        .await;

        let err = p
            .chat(vec![Message::user("prompt")], None, ChatOptions::json())
            .await
            .unwrap_err();
        assert!(matches!(err, BibleError::Provider(_)));
    }
}
