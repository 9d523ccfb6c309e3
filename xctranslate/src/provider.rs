//! Translation provider adapters.
//!
//! A [`Translator`] turns one string from a source language into a target
//! language. Backends ([`MyMemory`], [`Google`], [`DeepL`]) make exactly one
//! HTTP request per call and classify what went wrong. [`RetryingTranslator`]
//! wraps any backend with bounded retries, exponential backoff, a throttle
//! cooldown and a minimum spacing between calls.
//!
//! Backends are pure request/response: they never see the catalog.

use std::{fmt::Display, str::FromStr, sync::Arc, time::Duration};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tokio::{sync::Mutex, time::Instant};
use tracing::{debug, warn};

use crate::{error::Error, language::LanguageCode};

mod deepl;
mod google;
mod http;
mod mymemory;

pub use deepl::DeepL;
pub use google::Google;
pub use mymemory::MyMemory;

/// Why a provider call did not produce a translation.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProviderError {
    /// Timeouts, connection failures, 5xx responses, malformed bodies.
    #[error("transient provider failure: {0}")]
    Transient(String),

    /// The backend asked us to slow down.
    #[error("throttled by provider (retry after {retry_after:?})")]
    Throttled { retry_after: Option<Duration> },

    /// The backend refused this request; retrying will not help.
    #[error("request rejected: {0}")]
    Rejected(String),

    /// The daily or account quota is used up. Ends the run.
    #[error("provider quota exceeded: {0}")]
    QuotaExceeded(String),

    /// Every attempt failed. Carries the text that was being translated.
    #[error("gave up on {text:?} after {attempts} attempts: {last_error}")]
    Exhausted {
        text: String,
        attempts: u32,
        last_error: String,
    },
}

impl ProviderError {
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            ProviderError::Transient(_) | ProviderError::Throttled { .. }
        )
    }
}

/// A translation backend.
#[async_trait]
pub trait Translator: Send + Sync {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError>;
}

#[async_trait]
impl<T: Translator + ?Sized> Translator for Arc<T> {
    fn name(&self) -> &str {
        (**self).name()
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        (**self).translate(text, source, target).await
    }
}

/// Retry, backoff and pacing parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Total attempts per text, including the first one.
    pub max_attempts: u32,
    /// Delay before the second attempt; doubles for each later one.
    pub base_backoff: Duration,
    pub max_backoff: Duration,
    /// Pause after a throttle response when the backend gives no hint.
    pub throttle_cooldown: Duration,
    /// Minimum gap between the starts of two successive calls.
    pub min_interval: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        RetryPolicy {
            max_attempts: 3,
            base_backoff: Duration::from_secs(1),
            max_backoff: Duration::from_secs(32),
            throttle_cooldown: Duration::from_secs(60),
            min_interval: Duration::from_millis(100),
        }
    }
}

impl RetryPolicy {
    /// Backoff before retry number `retry` (1-based): 1s, 2s, 4s, ... capped.
    pub fn backoff(&self, retry: u32) -> Duration {
        let factor = 1u32 << retry.saturating_sub(1).min(16);
        self.base_backoff
            .saturating_mul(factor)
            .min(self.max_backoff)
    }
}

/// Wraps a backend with retries and rate limiting.
///
/// Pacing state is shared by every clone of the wrapper's `Arc`, so parallel
/// workers still respect the minimum interval and any throttle cooldown.
pub struct RetryingTranslator<T> {
    inner: T,
    policy: RetryPolicy,
    next_call: Mutex<Option<Instant>>,
}

impl<T: Translator> RetryingTranslator<T> {
    pub fn new(inner: T, policy: RetryPolicy) -> Self {
        RetryingTranslator {
            inner,
            policy,
            next_call: Mutex::new(None),
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Waits until the next call is allowed and reserves the following slot.
    async fn wait_turn(&self) {
        let mut next_call = self.next_call.lock().await;
        if let Some(at) = *next_call {
            if at > Instant::now() {
                tokio::time::sleep_until(at).await;
            }
        }
        *next_call = Some(Instant::now() + self.policy.min_interval);
    }

    /// Pushes the next allowed call back by `cooldown`.
    async fn cool_down(&self, cooldown: Duration) {
        let mut next_call = self.next_call.lock().await;
        let until = Instant::now() + cooldown;
        if next_call.is_none_or(|at| at < until) {
            *next_call = Some(until);
        }
    }
}

#[async_trait]
impl<T: Translator> Translator for RetryingTranslator<T> {
    fn name(&self) -> &str {
        self.inner.name()
    }

    async fn translate(
        &self,
        text: &str,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Result<String, ProviderError> {
        let attempts = self.policy.max_attempts.max(1);
        let mut last_error = None;

        for attempt in 1..=attempts {
            if attempt > 1 && !matches!(last_error, Some(ProviderError::Throttled { .. })) {
                let delay = self.policy.backoff(attempt - 1);
                debug!("Retry attempt {} for {}, waiting {:?}", attempt, target, delay);
                tokio::time::sleep(delay).await;
            }
            self.wait_turn().await;

            match self.inner.translate(text, source, target).await {
                Ok(translated) => return Ok(translated),
                Err(e) if e.is_retryable() => {
                    warn!(
                        "{} request failed (attempt {}/{}): {}",
                        self.inner.name(),
                        attempt,
                        attempts,
                        e
                    );
                    if let ProviderError::Throttled { retry_after } = &e {
                        let cooldown = retry_after.unwrap_or(self.policy.throttle_cooldown);
                        warn!("Throttled by {}, cooling down for {:?}", self.inner.name(), cooldown);
                        self.cool_down(cooldown).await;
                    }
                    last_error = Some(e);
                }
                Err(e) => return Err(e),
            }
        }

        Err(ProviderError::Exhausted {
            text: text.to_string(),
            attempts,
            last_error: last_error
                .map(|e| e.to_string())
                .unwrap_or_else(|| "no attempt made".to_string()),
        })
    }
}

/// Which backend to talk to.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ProviderKind {
    #[default]
    MyMemory,
    Google,
    DeepL,
}

impl ProviderKind {
    /// Spacing that keeps each public endpoint from blocking us.
    pub fn default_min_interval(self) -> Duration {
        match self {
            ProviderKind::MyMemory => Duration::from_millis(1200),
            ProviderKind::Google => Duration::from_millis(300),
            ProviderKind::DeepL => Duration::from_millis(100),
        }
    }
}

impl Display for ProviderKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ProviderKind::MyMemory => write!(f, "mymemory"),
            ProviderKind::Google => write!(f, "google"),
            ProviderKind::DeepL => write!(f, "deepl"),
        }
    }
}

impl FromStr for ProviderKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "mymemory" => Ok(ProviderKind::MyMemory),
            "google" => Ok(ProviderKind::Google),
            "deepl" => Ok(ProviderKind::DeepL),
            _ => Err(format!(
                "Unknown provider: {}. Expected one of: mymemory, google, deepl",
                s
            )),
        }
    }
}

/// Everything needed to construct a backend.
#[derive(Debug, Clone)]
pub struct ProviderSettings {
    pub kind: ProviderKind,
    /// Overrides the backend's public endpoint (self-hosted or test servers).
    pub endpoint: Option<String>,
    /// DeepL authentication key.
    pub api_key: Option<String>,
    /// Contact address for MyMemory's higher anonymous quota.
    pub email: Option<String>,
    /// Per-call timeout.
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl ProviderSettings {
    pub fn new(kind: ProviderKind) -> Self {
        ProviderSettings {
            kind,
            endpoint: None,
            api_key: None,
            email: None,
            timeout: Duration::from_secs(10),
            retry: RetryPolicy {
                min_interval: kind.default_min_interval(),
                ..RetryPolicy::default()
            },
        }
    }
}

/// Builds the configured backend wrapped in a [`RetryingTranslator`].
pub fn build(settings: &ProviderSettings) -> Result<Arc<dyn Translator>, Error> {
    let client = http::build_client(settings.timeout)?;
    let translator: Arc<dyn Translator> = match settings.kind {
        ProviderKind::MyMemory => {
            let mut backend = MyMemory::new(client, settings.email.clone());
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(RetryingTranslator::new(backend, settings.retry.clone()))
        }
        ProviderKind::Google => {
            let mut backend = Google::new(client);
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(RetryingTranslator::new(backend, settings.retry.clone()))
        }
        ProviderKind::DeepL => {
            let key = settings
                .api_key
                .clone()
                .filter(|key| !key.trim().is_empty())
                .ok_or_else(|| {
                    Error::Provider("DeepL requires an auth key (set DEEPL_AUTH_KEY)".to_string())
                })?;
            let mut backend = DeepL::new(client, key);
            if let Some(endpoint) = &settings.endpoint {
                backend = backend.with_endpoint(endpoint);
            }
            Arc::new(RetryingTranslator::new(backend, settings.retry.clone()))
        }
    };
    Ok(translator)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::{
        collections::VecDeque,
        sync::atomic::{AtomicU32, Ordering},
    };

    struct Scripted {
        replies: std::sync::Mutex<VecDeque<Result<String, ProviderError>>>,
        calls: AtomicU32,
        started: std::sync::Mutex<Vec<Instant>>,
    }

    impl Scripted {
        fn new(replies: Vec<Result<String, ProviderError>>) -> Self {
            Scripted {
                replies: std::sync::Mutex::new(replies.into()),
                calls: AtomicU32::new(0),
                started: std::sync::Mutex::new(Vec::new()),
            }
        }
    }

    #[async_trait]
    impl Translator for Scripted {
        fn name(&self) -> &str {
            "scripted"
        }

        async fn translate(
            &self,
            text: &str,
            _source: &LanguageCode,
            _target: &LanguageCode,
        ) -> Result<String, ProviderError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.started.lock().unwrap().push(Instant::now());
            self.replies
                .lock()
                .unwrap()
                .pop_front()
                .unwrap_or_else(|| Ok(text.to_string()))
        }
    }

    fn langs() -> (LanguageCode, LanguageCode) {
        (
            LanguageCode::parse("en").unwrap(),
            LanguageCode::parse("de").unwrap(),
        )
    }

    fn policy() -> RetryPolicy {
        RetryPolicy {
            min_interval: Duration::ZERO,
            ..RetryPolicy::default()
        }
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.backoff(1), Duration::from_secs(1));
        assert_eq!(policy.backoff(2), Duration::from_secs(2));
        assert_eq!(policy.backoff(3), Duration::from_secs(4));
        assert_eq!(policy.backoff(10), Duration::from_secs(32));
    }

    #[test]
    fn test_provider_kind_parsing() {
        assert_eq!("MyMemory".parse::<ProviderKind>().unwrap(), ProviderKind::MyMemory);
        assert_eq!("deepl".parse::<ProviderKind>().unwrap(), ProviderKind::DeepL);
        assert!("bing".parse::<ProviderKind>().is_err());
        assert_eq!(ProviderKind::Google.to_string(), "google");
    }

    #[test]
    fn test_deepl_requires_key() {
        let settings = ProviderSettings::new(ProviderKind::DeepL);
        assert!(matches!(build(&settings), Err(Error::Provider(_))));
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failures_are_retried_with_backoff() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(vec![
                Err(ProviderError::Transient("timeout".into())),
                Err(ProviderError::Transient("502".into())),
                Ok("Hallo".into()),
            ]),
            policy(),
        );

        let start = Instant::now();
        let result = translator.translate("Hello", &en, &de).await;
        assert_eq!(result, Ok("Hallo".to_string()));
        assert_eq!(translator.inner.calls.load(Ordering::SeqCst), 3);
        // 1s before the second attempt, 2s before the third.
        assert!(start.elapsed() >= Duration::from_secs(3));
    }

    #[tokio::test(start_paused = true)]
    async fn test_exhausted_carries_original_text() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(vec![
                Err(ProviderError::Transient("a".into())),
                Err(ProviderError::Transient("b".into())),
                Err(ProviderError::Transient("c".into())),
            ]),
            policy(),
        );

        match translator.translate("Hello", &en, &de).await {
            Err(ProviderError::Exhausted {
                text,
                attempts,
                last_error,
            }) => {
                assert_eq!(text, "Hello");
                assert_eq!(attempts, 3);
                assert!(last_error.contains('c'));
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_rejected_and_quota_are_not_retried() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(vec![Err(ProviderError::Rejected("too long".into()))]),
            policy(),
        );
        assert!(matches!(
            translator.translate("Hello", &en, &de).await,
            Err(ProviderError::Rejected(_))
        ));
        assert_eq!(translator.inner.calls.load(Ordering::SeqCst), 1);

        let translator = RetryingTranslator::new(
            Scripted::new(vec![Err(ProviderError::QuotaExceeded("daily".into()))]),
            policy(),
        );
        assert!(matches!(
            translator.translate("Hello", &en, &de).await,
            Err(ProviderError::QuotaExceeded(_))
        ));
        assert_eq!(translator.inner.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_throttle_delays_next_call() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(vec![
                Err(ProviderError::Throttled { retry_after: None }),
                Ok("Hallo".into()),
            ]),
            policy(),
        );

        translator.translate("Hello", &en, &de).await.unwrap();
        let started = translator.inner.started.lock().unwrap().clone();
        assert_eq!(started.len(), 2);
        assert!(started[1] - started[0] >= Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_retry_after_overrides_cooldown() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(vec![
                Err(ProviderError::Throttled {
                    retry_after: Some(Duration::from_secs(5)),
                }),
                Ok("Hallo".into()),
            ]),
            policy(),
        );

        translator.translate("Hello", &en, &de).await.unwrap();
        let started = translator.inner.started.lock().unwrap().clone();
        let gap = started[1] - started[0];
        assert!(gap >= Duration::from_secs(5));
        assert!(gap < Duration::from_secs(60));
    }

    #[tokio::test(start_paused = true)]
    async fn test_min_interval_spaces_calls() {
        let (en, de) = langs();
        let translator = RetryingTranslator::new(
            Scripted::new(Vec::new()),
            RetryPolicy {
                min_interval: Duration::from_millis(500),
                ..RetryPolicy::default()
            },
        );

        for text in ["One", "Two", "Three"] {
            translator.translate(text, &en, &de).await.unwrap();
        }
        let started = translator.inner.started.lock().unwrap().clone();
        for pair in started.windows(2) {
            assert!(pair[1] - pair[0] >= Duration::from_millis(500));
        }
    }
}
