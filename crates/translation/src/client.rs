use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::MtError;

/// External-collaborator seam for machine translation. A room's
/// translation worker is generic over this trait so tests can swap in a
/// deterministic fake.
#[async_trait]
pub trait MtClient: Send + Sync {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, MtError>;

    /// Language codes the service currently supports as translation
    /// targets, fetched once at startup and cached by the caller.
    async fn supported_languages(&self) -> Result<Vec<String>, MtError>;
}

#[derive(Debug, Serialize)]
struct TranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
}

#[derive(Debug, Deserialize)]
struct TranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

#[derive(Debug, Deserialize)]
struct LanguageEntry {
    code: String,
}

/// HTTP client for a LibreTranslate-compatible MT sidecar.
pub struct LibreTranslateClient {
    http: reqwest::Client,
    base_url: String,
    languages_path: String,
}

impl LibreTranslateClient {
    pub fn new(host: &str, port: u16, languages_path: impl Into<String>) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: format!("http://{host}:{port}"),
            languages_path: languages_path.into(),
        }
    }
}

#[async_trait]
impl MtClient for LibreTranslateClient {
    async fn translate(&self, text: &str, source: &str, target: &str) -> Result<String, MtError> {
        let response = self
            .http
            .post(format!("{}/translate", self.base_url))
            .json(&TranslateRequest {
                q: text,
                source,
                target,
                format: "text",
            })
            .send()
            .await?
            .error_for_status()?
            .json::<TranslateResponse>()
            .await?;
        Ok(response.translated_text)
    }

    async fn supported_languages(&self) -> Result<Vec<String>, MtError> {
        let entries = self
            .http
            .get(format!("{}{}", self.base_url, self.languages_path))
            .send()
            .await?
            .error_for_status()?
            .json::<Vec<LanguageEntry>>()
            .await?;
        if entries.is_empty() {
            return Err(MtError::BadResponse);
        }
        Ok(entries.into_iter().map(|e| e.code).collect())
    }
}
