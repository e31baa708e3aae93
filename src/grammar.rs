use crate::config::GrammarSettings;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Grammar requests are small; the service answers well within this
const GRAMMAR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Error)]
pub enum GrammarError {
    #[error("grammar request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("grammar service error: {0}")]
    Service(String),
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchContext {
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchRule {
    #[serde(default)]
    pub id: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Replacement {
    pub value: String,
}

/// One finding reported by the grammar service
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GrammarMatch {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub offset: usize,
    #[serde(default)]
    pub length: usize,
    #[serde(default)]
    pub context: MatchContext,
    #[serde(default)]
    pub rule: MatchRule,
    #[serde(default)]
    pub replacements: Vec<Replacement>,
}

#[derive(Debug, Deserialize)]
struct CheckResponse {
    #[serde(default)]
    matches: Vec<GrammarMatch>,
}

/// Spelling and grammar checking service
#[async_trait]
pub trait GrammarChecker: Send + Sync {
    async fn check(&self, text: &str) -> Result<Vec<GrammarMatch>, GrammarError>;
}

/// Client for a LanguageTool-compatible `/v2/check` endpoint
pub struct LanguageToolClient {
    client: reqwest::Client,
    endpoint: String,
    language: String,
}

impl LanguageToolClient {
    pub fn new(settings: &GrammarSettings) -> Result<Self, GrammarError> {
        let client = reqwest::Client::builder().timeout(GRAMMAR_TIMEOUT).build()?;
        Ok(Self {
            client,
            endpoint: settings.endpoint.clone(),
            language: settings.language.clone(),
        })
    }
}

#[async_trait]
impl GrammarChecker for LanguageToolClient {
    async fn check(&self, text: &str) -> Result<Vec<GrammarMatch>, GrammarError> {
        let response = self
            .client
            .post(&self.endpoint)
            .form(&[("text", text), ("language", self.language.as_str())])
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            return Err(GrammarError::Service(format!("status {}", status.as_u16())));
        }

        let body: CheckResponse = response.json().await?;
        ::log::debug!("Grammar service returned {} matches", body.matches.len());
        Ok(body.matches)
    }
}

/// First `limit` characters of a text, respecting char boundaries
pub fn sample(text: &str, limit: usize) -> &str {
    match text.char_indices().nth(limit) {
        Some((idx, _)) => &text[..idx],
        None => text,
    }
}
