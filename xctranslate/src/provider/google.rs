//! Google Translate backend using the public `translate_a/single` endpoint.
//!
//! The response is a nested JSON array; the first element holds one
//! `[translated, original, ...]` segment per sentence.

use async_trait::async_trait;
use serde_json::Value;

use super::{
    ProviderError, Translator,
    http::{classify_status, malformed, transport_error},
};
use crate::language::{CodeMap, LanguageCode};

pub const DEFAULT_ENDPOINT: &str = "https://translate.googleapis.com/translate_a/single";

pub struct Google {
    client: reqwest::Client,
    endpoint: String,
    codes: CodeMap,
}

impl Google {
    pub fn new(client: reqwest::Client) -> Self {
        Google {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            codes: CodeMap::new(&[
                ("zh-Hans", "zh-CN"),
                ("zh-Hant", "zh-TW"),
                ("pt-BR", "pt"),
                ("pt-PT", "pt"),
            ]),
        }
    }

    pub fn with_endpoint(mut self, endpoint: &str) -> Self {
        self.endpoint = endpoint.to_string();
        self
    }

    pub fn codes(&self) -> &CodeMap {
        &self.codes
    }
}

#[async_trait]
impl Translator for Google {
    fn name(&self) -> &str {
        "google"
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let sl = self.codes.to_provider(source);
        let tl = self.codes.to_provider(target);
        let response = self
            .client
            .get(&self.endpoint)
            .query(&[
                ("client", "gtx"),
                ("sl", sl.as_str()),
                ("tl", tl.as_str()),
                ("dt", "t"),
                ("q", text),
            ])
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &headers, &body));
        }

        let payload: Value = serde_json::from_str(&body).map_err(|e| malformed("Google", e))?;
        parse_response(&payload)
    }
}

fn parse_response(payload: &Value) -> Result<String, ProviderError> {
    let segments = payload
        .get(0)
        .and_then(Value::as_array)
        .ok_or_else(|| malformed("Google", "missing sentence segments"))?;

    let translated: String = segments
        .iter()
        .filter_map(|segment| segment.get(0).and_then(Value::as_str))
        .collect();
    Ok(translated)
}
