//! DeepL API backend (`/v2/translate`).

use async_trait::async_trait;
use reqwest::header::AUTHORIZATION;
use serde::{Deserialize, Serialize};

use super::{
    ProviderError, Translator,
    http::{classify_status, malformed, transport_error},
};
use crate::language::{CodeMap, LanguageCode};

pub const PRO_ENDPOINT: &str = "https://api.deepl.com/v2/translate";
pub const FREE_ENDPOINT: &str = "https://api-free.deepl.com/v2/translate";

pub struct DeepL {
    client: reqwest::Client,
    endpoint: String,
    auth_key: String,
    codes: CodeMap,
}

#[derive(Serialize)]
struct TranslateRequest<'a> {
    text: [&'a str; 1],
    source_lang: String,
    target_lang: String,
}

#[derive(Deserialize)]
struct TranslateResponse {
    translations: Vec<Translation>,
}

#[derive(Deserialize)]
struct Translation {
    text: String,
}

impl DeepL {
    /// Keys ending in `:fx` belong to the free plan and use its own host.
    pub fn new(client: reqwest::Client, auth_key: String) -> Self {
        let endpoint = if auth_key.ends_with(":fx") {
            FREE_ENDPOINT
        } else {
            PRO_ENDPOINT
        };
        DeepL {
            client,
            endpoint: endpoint.to_string(),
            auth_key,
            codes: CodeMap::new(&[
                ("en", "EN-US"),
                ("en-GB", "EN-GB"),
                ("pt", "PT-PT"),
                ("pt-PT", "PT-PT"),
                ("pt-BR", "PT-BR"),
                ("zh-Hans", "ZH-HANS"),
                ("zh-Hant", "ZH-HANT"),
                ("zh-HK", "ZH-HANT"),
                ("no", "NB"),
            ]),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Target codes carry a region or script where DeepL requires one.
    pub fn target_code(&self, code: &LanguageCode) -> String {
        self.codes.to_provider(code).to_ascii_uppercase()
    }

    /// Source codes are bare languages.
    pub fn source_code(&self, code: &LanguageCode) -> String {
        code.base().to_ascii_uppercase()
    }
}

#[async_trait]
impl Translator for DeepL {
    fn name(&self) -> &str {
        "deepl"
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let request = TranslateRequest {
            text: [text],
            source_lang: self.source_code(source),
            target_lang: self.target_code(target),
        };

        let response = self
            .client
            .post(&self.endpoint)
            .header(AUTHORIZATION, format!("DeepL-Auth-Key {}", self.auth_key))
            .json(&request)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &headers, &body));
        }

        let parsed: TranslateResponse =
            serde_json::from_str(&body).map_err(|e| malformed("DeepL", e))?;
        parsed
            .translations
            .into_iter()
            .next()
            .map(|translation| translation.text)
            .ok_or_else(|| malformed("DeepL", "empty translations array"))
    }
}
