//! The translation run loop.
//!
//! A run walks the catalog in insertion order for one target language.
//! Each entry is classified; passthrough entries are merged at once and the
//! rest are sent to the provider, with up to `workers` calls in flight.
//! Workers only compute translations: every merge and every checkpoint
//! happens here, on the coordinating loop, so saves never race merges.
//!
//! Provider failures never abort a run. The entry gets the source text as a
//! `needs_review` placeholder and the loop moves on. Only store failures are
//! fatal. The catalog is saved at the end of every run, including
//! interrupted and budget-limited ones.

use std::{fmt::Display, sync::Arc};

use serde::Serialize;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::{
    classify::{Classifier, ClassifierConfig, Decision},
    coverage::{self, Coverage},
    error::Error,
    interrupt::Interrupt,
    language::LanguageCode,
    placeholder::signatures_match,
    provider::{ProviderError, Translator},
    store::CatalogStore,
    types::{Catalog, StringUnit},
};

pub const DEFAULT_CHECKPOINT_EVERY: usize = 25;

/// Parameters of one run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub language: LanguageCode,
    /// Overrides the catalog's `sourceLanguage`.
    pub source_language: Option<LanguageCode>,
    /// Save after this many merged entries.
    pub checkpoint_every: usize,
    /// Maximum number of provider dispatches.
    pub max_translations: Option<usize>,
    /// Provider calls kept in flight.
    pub workers: usize,
}

impl RunConfig {
    pub fn new(language: LanguageCode) -> Self {
        RunConfig {
            language,
            source_language: None,
            checkpoint_every: DEFAULT_CHECKPOINT_EVERY,
            max_translations: None,
            workers: 1,
        }
    }
}

/// Tallies for one run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct RunState {
    /// Entries classified.
    pub scanned: usize,
    /// Already translated for the target language.
    pub skipped: usize,
    /// "Don't Translate" entries and untranslated variations.
    pub excluded: usize,
    /// Entries written as `translated`, passthroughs included.
    pub translated: usize,
    /// Subset of `translated` copied without a provider call.
    pub passed_through: usize,
    /// Entries that fell back to `needs_review`.
    pub failed: usize,
    /// Provider calls started.
    pub dispatched: usize,
    /// Periodic saves, not counting the final one.
    pub checkpoints: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StopReason {
    Completed,
    BudgetReached,
    Interrupted,
    QuotaExceeded,
}

impl Display for StopReason {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let text = match self {
            StopReason::Completed => "completed",
            StopReason::BudgetReached => "translation budget reached",
            StopReason::Interrupted => "interrupted",
            StopReason::QuotaExceeded => "provider quota exceeded",
        };
        write!(f, "{}", text)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunReport {
    pub language: String,
    pub state: RunState,
    pub stop: StopReason,
    pub coverage: Coverage,
}

impl Display for RunReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}: {} translated ({} passed through), {} failed, {} skipped, {} excluded [{}]",
            self.language,
            self.state.translated,
            self.state.passed_through,
            self.state.failed,
            self.state.skipped,
            self.state.excluded,
            self.stop
        )
    }
}

/// Classification of every entry, without touching the provider or store.
#[derive(Debug, Clone, PartialEq)]
pub struct Plan {
    pub language: String,
    pub decisions: Vec<(String, Decision)>,
}

impl Plan {
    pub fn needs_translation(&self) -> usize {
        self.count(|d| matches!(d, Decision::NeedsTranslation { .. }))
    }

    pub fn passthrough(&self) -> usize {
        self.count(|d| matches!(d, Decision::PassThrough { .. }))
    }

    pub fn already_done(&self) -> usize {
        self.count(|d| matches!(d, Decision::AlreadyDone))
    }

    pub fn excluded(&self) -> usize {
        self.count(|d| matches!(d, Decision::Excluded(_)))
    }

    fn count(&self, predicate: impl Fn(&Decision) -> bool) -> usize {
        self.decisions.iter().filter(|(_, d)| predicate(d)).count()
    }
}

type Outcome = (String, String, Result<String, ProviderError>);

/// Owns the in-memory catalog for the duration of one or more runs.
pub struct Driver<S> {
    catalog: Catalog,
    store: S,
    translator: Arc<dyn Translator>,
    classifier: Classifier,
    interrupt: Interrupt,
}

impl<S: CatalogStore> Driver<S> {
    pub fn new(catalog: Catalog, store: S, translator: Arc<dyn Translator>) -> Self {
        Driver {
            catalog,
            store,
            translator,
            classifier: Classifier::default(),
            interrupt: Interrupt::new(),
        }
    }

    pub fn with_classifier(mut self, config: ClassifierConfig) -> Self {
        self.classifier = Classifier::new(config);
        self
    }

    pub fn with_interrupt(mut self, interrupt: Interrupt) -> Self {
        self.interrupt = interrupt;
        self
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn into_catalog(self) -> Catalog {
        self.catalog
    }

    /// Classifies every entry for `config.language`.
    pub fn plan(&self, config: &RunConfig) -> Result<Plan, Error> {
        plan(&self.catalog, &self.classifier, config)
    }

    /// Runs the pipeline once for `config.language`.
    pub async fn run(&mut self, config: &RunConfig) -> Result<RunReport, Error> {
        if config.checkpoint_every == 0 {
            return Err(Error::config_error("checkpoint interval must be at least 1"));
        }
        let (source, target, target_key) = resolve_languages(&self.catalog, config)?;
        let workers = config.workers.max(1);
        info!(
            "Translating {} -> {} with {} ({} worker{})",
            source,
            target_key,
            self.translator.name(),
            workers,
            if workers == 1 { "" } else { "s" }
        );

        let keys: Vec<String> = self.catalog.strings.keys().cloned().collect();
        let interrupt = self.interrupt.clone();
        let mut state = RunState::default();
        let mut since_checkpoint = 0usize;
        let mut stop: Option<StopReason> = None;
        let mut in_flight: JoinSet<Outcome> = JoinSet::new();
        let mut next = 0usize;

        loop {
            while stop.is_none() && in_flight.len() < workers && next < keys.len() {
                if interrupt.is_tripped() {
                    stop = Some(StopReason::Interrupted);
                    break;
                }
                let key = &keys[next];
                let Some(entry) = self.catalog.entry(key) else {
                    next += 1;
                    continue;
                };
                let decision = self.classifier.classify(key, entry, &source, &target);

                if let Decision::NeedsTranslation { .. } = decision {
                    if config
                        .max_translations
                        .is_some_and(|max| state.dispatched >= max)
                    {
                        stop = Some(StopReason::BudgetReached);
                        break;
                    }
                }
                next += 1;
                state.scanned += 1;

                match decision {
                    Decision::AlreadyDone => state.skipped += 1,
                    Decision::Excluded(reason) => {
                        debug!("Excluded {:?}: {:?}", key, reason);
                        state.excluded += 1;
                    }
                    Decision::PassThrough { text, reason } => {
                        debug!("Passing through {:?} ({})", key, reason.as_str());
                        self.merge(&target_key, key, StringUnit::translated(text));
                        state.translated += 1;
                        state.passed_through += 1;
                        self.note_mutation(&mut state, &mut since_checkpoint, config)?;
                    }
                    Decision::NeedsTranslation { text } => {
                        let translator = Arc::clone(&self.translator);
                        let (source, target, key) = (source.clone(), target.clone(), key.clone());
                        in_flight.spawn(async move {
                            let result = translator.translate(&text, &source, &target).await;
                            (key, text, result)
                        });
                        state.dispatched += 1;
                    }
                }
            }

            if in_flight.is_empty() {
                break;
            }

            let joined = tokio::select! {
                _ = interrupt.cancelled() => {
                    warn!("Interrupted, abandoning {} in-flight request(s)", in_flight.len());
                    stop = Some(StopReason::Interrupted);
                    in_flight.shutdown().await;
                    break;
                }
                joined = in_flight.join_next() => joined,
            };

            match joined {
                Some(Ok((key, text, result))) => {
                    if self.merge_outcome(&target_key, &key, text, result, &mut state, &mut stop) {
                        self.note_mutation(&mut state, &mut since_checkpoint, config)?;
                    }
                }
                Some(Err(e)) => warn!("Translation task failed: {}", e),
                None => break,
            }
        }

        self.store.save(&self.catalog)?;

        let stop = stop.unwrap_or(StopReason::Completed);
        let report = RunReport {
            language: target_key.clone(),
            coverage: coverage::report(&self.catalog, &target_key),
            state,
            stop,
        };
        info!("{}", report);
        info!("{}", report.coverage);
        Ok(report)
    }

    /// Applies one provider outcome. Returns whether the catalog changed.
    fn merge_outcome(
        &mut self,
        target_key: &str,
        key: &str,
        source_text: String,
        result: Result<String, ProviderError>,
        state: &mut RunState,
        stop: &mut Option<StopReason>,
    ) -> bool {
        match result {
            Ok(translated) if translated.trim().is_empty() => {
                warn!("Empty translation for {:?}, keeping source text for review", key);
                self.merge(target_key, key, StringUnit::needs_review(source_text));
                state.failed += 1;
            }
            Ok(translated) if !signatures_match(&source_text, &translated) => {
                warn!(
                    "Placeholder mismatch for {:?} ({:?}), keeping source text for review",
                    key, translated
                );
                self.merge(target_key, key, StringUnit::needs_review(source_text));
                state.failed += 1;
            }
            Ok(translated) => {
                debug!("Translated {:?} -> {:?}", key, translated);
                self.merge(target_key, key, StringUnit::translated(translated));
                state.translated += 1;
            }
            Err(ProviderError::QuotaExceeded(detail)) => {
                if stop.is_none() {
                    warn!("Provider quota exceeded ({}), stopping", detail);
                    *stop = Some(StopReason::QuotaExceeded);
                }
                return false;
            }
            Err(e) => {
                warn!("Translation failed for {:?}: {}", key, e);
                self.merge(target_key, key, StringUnit::needs_review(source_text));
                state.failed += 1;
            }
        }
        true
    }

    fn merge(&mut self, target_key: &str, key: &str, unit: StringUnit) {
        if let Some(entry) = self.catalog.entry_mut(key) {
            entry.set_unit(target_key, unit);
        }
    }

    fn note_mutation(
        &mut self,
        state: &mut RunState,
        since_checkpoint: &mut usize,
        config: &RunConfig,
    ) -> Result<(), Error> {
        *since_checkpoint += 1;
        if *since_checkpoint >= config.checkpoint_every {
            self.store.save(&self.catalog)?;
            state.checkpoints += 1;
            *since_checkpoint = 0;
            info!(
                "Checkpoint {}: {} translated, {} failed so far",
                state.checkpoints, state.translated, state.failed
            );
        }
        Ok(())
    }
}

/// Classifies every entry of `catalog` for `config.language` without
/// touching the provider or the store.
pub fn plan(
    catalog: &Catalog,
    classifier: &Classifier,
    config: &RunConfig,
) -> Result<Plan, Error> {
    let (source, target, target_key) = resolve_languages(catalog, config)?;
    let decisions = catalog
        .strings
        .iter()
        .map(|(key, entry)| {
            let decision = classifier.classify(key, entry, &source, &target);
            (key.clone(), decision)
        })
        .collect();
    Ok(Plan {
        language: target_key,
        decisions,
    })
}

/// Source and target codes, plus the spelling the catalog already uses for
/// the target.
fn resolve_languages(
    catalog: &Catalog,
    config: &RunConfig,
) -> Result<(LanguageCode, LanguageCode, String), Error> {
    let source = match &config.source_language {
        Some(code) => code.clone(),
        None => LanguageCode::parse(&catalog.source_language)?,
    };
    let target = config.language.clone();
    if source == target {
        return Err(Error::config_error(format!(
            "target language {} is the source language",
            target
        )));
    }
    let target_key = catalog
        .resolve_language(target.as_str())
        .unwrap_or_else(|| target.as_str().to_string());
    Ok((source, target, target_key))
}
