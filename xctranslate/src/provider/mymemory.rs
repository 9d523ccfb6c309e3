//! MyMemory (`api.mymemory.translated.net`) backend.
//!
//! The service answers HTTP 200 for most failures and reports the real
//! outcome in `responseStatus`, which is sometimes a number and sometimes a
//! string. Quota exhaustion shows up either as status 403, as
//! `quotaFinished: true`, or as a warning placed in the translated text.

use async_trait::async_trait;
use serde_json::Value;

use super::{
    ProviderError, Translator,
    http::{classify_status, malformed, transport_error},
};
use crate::language::{CodeMap, LanguageCode};

pub const DEFAULT_ENDPOINT: &str = "https://api.mymemory.translated.net/get";

pub struct MyMemory {
    client: reqwest::Client,
    endpoint: String,
    email: Option<String>,
    codes: CodeMap,
}

impl MyMemory {
    pub fn new(client: reqwest::Client, email: Option<String>) -> Self {
        MyMemory {
            client,
            endpoint: DEFAULT_ENDPOINT.to_string(),
            email: email.filter(|email| !email.trim().is_empty()),
            codes: CodeMap::new(&[
                ("zh-Hans", "zh-CN"),
                ("zh-Hant", "zh-TW"),
                ("zh-HK", "zh-TW"),
                ("no", "nb"),
                ("tl", "fil"),
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
impl Translator for MyMemory {
    fn name(&self) -> &str {
        "mymemory"
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let langpair = format!(
            "{}|{}",
            self.codes.to_provider(source),
            self.codes.to_provider(target)
        );
        let mut query = vec![("q", text), ("langpair", langpair.as_str())];
        if let Some(email) = &self.email {
            query.push(("de", email.as_str()));
        }

        let response = self
            .client
            .get(&self.endpoint)
            .query(&query)
            .send()
            .await
            .map_err(transport_error)?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = response.text().await.map_err(transport_error)?;
        if !status.is_success() {
            return Err(classify_status(status, &headers, &body));
        }

        let payload: Value =
            serde_json::from_str(&body).map_err(|e| malformed("MyMemory", e))?;
        parse_response(&payload)
    }
}

fn response_status(payload: &Value) -> Option<u16> {
    match payload.get("responseStatus")? {
        Value::Number(n) => n.as_u64().and_then(|n| u16::try_from(n).ok()),
        Value::String(s) => s.trim().parse().ok(),
        _ => None,
    }
}

fn parse_response(payload: &Value) -> Result<String, ProviderError> {
    let details = payload
        .get("responseDetails")
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    let translated = payload
        .pointer("/responseData/translatedText")
        .and_then(Value::as_str);

    if payload.get("quotaFinished").and_then(Value::as_bool) == Some(true) {
        return Err(ProviderError::QuotaExceeded(details));
    }
    if let Some(text) = translated {
        if text.contains("MYMEMORY WARNING") {
            return Err(ProviderError::QuotaExceeded(text.to_string()));
        }
        if text.contains("QUERY LENGTH LIMIT EXCEEDED") {
            return Err(ProviderError::Rejected(text.to_string()));
        }
    }

    match response_status(payload) {
        Some(200) => translated
            .map(decode_entities)
            .ok_or_else(|| malformed("MyMemory", "missing responseData.translatedText")),
        Some(403) if details.to_ascii_uppercase().contains("INVALID") => {
            Err(ProviderError::Rejected(details))
        }
        Some(403) => Err(ProviderError::QuotaExceeded(details)),
        Some(429) => Err(ProviderError::Throttled { retry_after: None }),
        Some(code) if (400..500).contains(&code) => Err(ProviderError::Rejected(format!(
            "responseStatus {}: {}",
            code, details
        ))),
        Some(code) => Err(ProviderError::Transient(format!(
            "responseStatus {}: {}",
            code, details
        ))),
        None => Err(malformed("MyMemory", "missing responseStatus")),
    }
}

/// Decodes the handful of HTML entities MyMemory puts into results.
fn decode_entities(text: &str) -> String {
    if !text.contains('&') {
        return text.to_string();
    }
    let mut out = String::with_capacity(text.len());
    let mut rest = text;
    while let Some(start) = rest.find('&') {
        out.push_str(&rest[..start]);
        let tail = &rest[start..];
        let decoded = tail
            .find(';')
            .filter(|end| *end <= 10)
            .and_then(|end| decode_entity(&tail[1..end]).map(|c| (c, end)));
        match decoded {
            Some((c, end)) => {
                out.push(c);
                rest = &tail[end + 1..];
            }
            None => {
                out.push('&');
                rest = &tail[1..];
            }
        }
    }
    out.push_str(rest);
    out
}

fn decode_entity(name: &str) -> Option<char> {
    match name {
        "amp" => Some('&'),
        "lt" => Some('<'),
        "gt" => Some('>'),
        "quot" => Some('"'),
        "apos" => Some('\''),
        "nbsp" => Some('\u{a0}'),
        _ => {
            let number = name.strip_prefix('#')?;
            let code = match number.strip_prefix(['x', 'X']) {
                Some(hex) => u32::from_str_radix(hex, 16).ok()?,
                None => number.parse().ok()?,
            };
            char::from_u32(code)
        }
    }
}
