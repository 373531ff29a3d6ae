use async_trait::async_trait;

use transcast_translation::{MtClient, MtError};

/// Deterministic stand-in for a LibreTranslate sidecar: "translates" by
/// tagging the source text with the target language, never talks to the
/// network.
pub struct FakeMtClient {
    languages: Vec<String>,
}

impl FakeMtClient {
    pub fn new(languages: impl IntoIterator<Item = &'static str>) -> Self {
        Self {
            languages: languages.into_iter().map(String::from).collect(),
        }
    }
}

#[async_trait]
impl MtClient for FakeMtClient {
    async fn translate(&self, text: &str, _source: &str, target: &str) -> Result<String, MtError> {
        Ok(format!("[{target}] {text}"))
    }

    async fn supported_languages(&self) -> Result<Vec<String>, MtError> {
        Ok(self.languages.clone())
    }
}
