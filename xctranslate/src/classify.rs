//! Per-entry translation decisions.
//!
//! The classifier is the only gate between the catalog and the provider. It
//! never lets empty or placeholder-only text through: sending `%@` to a
//! machine translator risks getting back `% @` or `%Ã`, which breaks string
//! formatting at runtime.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::{
    language::LanguageCode,
    placeholder::{extract_placeholders, strip_placeholders},
    types::{Entry, UnitState},
};

/// Tunable passthrough rules.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Exact strings that are always copied verbatim (separators, bullets).
    pub symbol_denylist: BTreeSet<String>,

    /// Brand and technical terms copied verbatim, compared after trimming.
    pub verbatim_terms: BTreeSet<String>,

    /// Keys starting with any of these (`app.name`) are copied verbatim
    /// whatever their text.
    pub verbatim_key_prefixes: Vec<String>,

    /// Keywords for the "short technical string" heuristic. Only active when
    /// `verbatim_keyword_max_chars` is also set.
    pub verbatim_keywords: Vec<String>,

    pub verbatim_keyword_max_chars: Option<usize>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            symbol_denylist: ["—", "–", "-", "·", "•", "●", "…", "+", "=", "/", "*", "|"]
                .into_iter()
                .map(String::from)
                .collect(),
            verbatim_terms: BTreeSet::new(),
            verbatim_key_prefixes: Vec::new(),
            verbatim_keywords: Vec::new(),
            verbatim_keyword_max_chars: None,
        }
    }
}

/// What to do with one entry for one target language.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    /// The target unit is already `translated`.
    AlreadyDone,
    /// Copy `text` verbatim and mark it translated. No provider call.
    PassThrough {
        text: String,
        reason: PassThroughReason,
    },
    /// Send `text` to the provider.
    NeedsTranslation { text: String },
    /// Not handled by this pipeline; the entry is left untouched.
    Excluded(ExclusionReason),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PassThroughReason {
    Empty,
    Denylisted,
    VerbatimTerm,
    VerbatimKey,
    Placeholder,
    SymbolsOnly,
    SingleCharacter,
    Keyword,
}

impl PassThroughReason {
    pub fn as_str(self) -> &'static str {
        match self {
            PassThroughReason::Empty => "empty",
            PassThroughReason::Denylisted => "denylisted symbol",
            PassThroughReason::VerbatimTerm => "verbatim term",
            PassThroughReason::VerbatimKey => "verbatim key",
            PassThroughReason::Placeholder => "placeholder",
            PassThroughReason::SymbolsOnly => "symbols only",
            PassThroughReason::SingleCharacter => "single character",
            PassThroughReason::Keyword => "technical keyword",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ExclusionReason {
    /// `shouldTranslate` is `false`.
    DoNotTranslate,
    /// Plural or device variations; one provider call cannot fill them.
    Variations,
}

#[derive(Debug, Clone, Default)]
pub struct Classifier {
    config: ClassifierConfig,
}

impl Classifier {
    pub fn new(config: ClassifierConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ClassifierConfig {
        &self.config
    }

    pub fn classify(
        &self,
        key: &str,
        entry: &Entry,
        source: &LanguageCode,
        target: &LanguageCode,
    ) -> Decision {
        if !entry.is_translatable() {
            return Decision::Excluded(ExclusionReason::DoNotTranslate);
        }

        if let Some(localization) = entry.localization(target.as_str()) {
            if localization.state() == Some(UnitState::Translated) {
                return Decision::AlreadyDone;
            }
            if localization.string_unit.is_none() && localization.has_variations() {
                return Decision::Excluded(ExclusionReason::Variations);
            }
        }

        let text = entry.source_text(key, source.as_str());
        let reason = if self.is_verbatim_key(key) {
            Some(PassThroughReason::VerbatimKey)
        } else {
            self.passthrough_reason(text)
        };
        match reason {
            Some(reason) => Decision::PassThrough {
                text: text.to_string(),
                reason,
            },
            None => Decision::NeedsTranslation {
                text: text.to_string(),
            },
        }
    }

    fn is_verbatim_key(&self, key: &str) -> bool {
        self.config
            .verbatim_key_prefixes
            .iter()
            .any(|prefix| !prefix.is_empty() && key.starts_with(prefix.as_str()))
    }

    /// Why `text` should be copied instead of translated, if it should.
    pub fn passthrough_reason(&self, text: &str) -> Option<PassThroughReason> {
        let trimmed = text.trim();
        if trimmed.is_empty() {
            return Some(PassThroughReason::Empty);
        }
        if self.config.symbol_denylist.contains(text)
            || self.config.symbol_denylist.contains(trimmed)
        {
            return Some(PassThroughReason::Denylisted);
        }
        if self.config.verbatim_terms.contains(trimmed) {
            return Some(PassThroughReason::VerbatimTerm);
        }

        let remainder = strip_placeholders(trimmed);
        if remainder.trim().is_empty() && !extract_placeholders(trimmed).is_empty() {
            return Some(PassThroughReason::Placeholder);
        }
        if !remainder.chars().any(char::is_alphabetic) {
            return Some(PassThroughReason::SymbolsOnly);
        }
        if trimmed.chars().count() == 1 {
            return Some(PassThroughReason::SingleCharacter);
        }

        if let Some(max_chars) = self.config.verbatim_keyword_max_chars {
            let short = trimmed.chars().count() < max_chars;
            if short
                && self
                    .config
                    .verbatim_keywords
                    .iter()
                    .any(|keyword| trimmed.contains(keyword.as_str()))
            {
                return Some(PassThroughReason::Keyword);
            }
        }
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::StringUnit;
    use serde_json::json;

    fn code(s: &str) -> LanguageCode {
        LanguageCode::parse(s).unwrap()
    }

    fn classify(key: &str, entry: &Entry) -> Decision {
        Classifier::default().classify(key, entry, &code("en"), &code("de"))
    }

    #[test]
    fn test_already_translated_is_done() {
        let mut entry = Entry::default();
        entry.set_unit("de", StringUnit::translated("Abbrechen"));
        assert_eq!(classify("Cancel", &entry), Decision::AlreadyDone);
    }

    #[test]
    fn test_needs_review_is_retried() {
        let mut entry = Entry::default();
        entry.set_unit("de", StringUnit::needs_review("Cancel"));
        assert_eq!(
            classify("Cancel", &entry),
            Decision::NeedsTranslation {
                text: "Cancel".to_string()
            }
        );
    }

    #[test]
    fn test_source_unit_wins_over_key() {
        let mut entry = Entry::default();
        entry.set_unit("en", StringUnit::translated("Sign in"));
        assert_eq!(
            classify("login.button", &entry),
            Decision::NeedsTranslation {
                text: "Sign in".to_string()
            }
        );
    }

    #[test]
    fn test_placeholders_pass_through() {
        for key in ["%@", "%d", "%1$@", "%lld", "%1$@ %2$@"] {
            match classify(key, &Entry::default()) {
                Decision::PassThrough { text, reason } => {
                    assert_eq!(text, key);
                    assert_eq!(reason, PassThroughReason::Placeholder);
                }
                other => panic!("{key:?} classified as {other:?}"),
            }
        }
    }

    #[test]
    fn test_symbols_pass_through() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.passthrough_reason("—"),
            Some(PassThroughReason::Denylisted)
        );
        assert_eq!(
            classifier.passthrough_reason("·"),
            Some(PassThroughReason::Denylisted)
        );
        assert_eq!(
            classifier.passthrough_reason("%@ · %@"),
            Some(PassThroughReason::SymbolsOnly)
        );
        assert_eq!(
            classifier.passthrough_reason("(%lld)"),
            Some(PassThroughReason::SymbolsOnly)
        );
        assert_eq!(
            classifier.passthrough_reason("2024"),
            Some(PassThroughReason::SymbolsOnly)
        );
    }

    #[test]
    fn test_empty_and_whitespace_pass_through() {
        let classifier = Classifier::default();
        assert_eq!(
            classifier.passthrough_reason(""),
            Some(PassThroughReason::Empty)
        );
        assert_eq!(
            classifier.passthrough_reason(" \n"),
            Some(PassThroughReason::Empty)
        );
    }

    #[test]
    fn test_single_character() {
        assert_eq!(
            Classifier::default().passthrough_reason("A"),
            Some(PassThroughReason::SingleCharacter)
        );
    }

    #[test]
    fn test_verbatim_terms() {
        let mut config = ClassifierConfig::default();
        config.verbatim_terms.insert("OpenAI".to_string());
        let classifier = Classifier::new(config);
        assert_eq!(
            classifier.passthrough_reason(" OpenAI "),
            Some(PassThroughReason::VerbatimTerm)
        );
        assert_eq!(classifier.passthrough_reason("OpenAI settings"), None);
    }

    #[test]
    fn test_verbatim_key_prefixes() {
        let config = ClassifierConfig {
            verbatim_key_prefixes: vec!["app.name".to_string(), String::new()],
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config);
        let mut entry = Entry::default();
        entry.set_unit("en", StringUnit::translated("Roots Planner"));

        assert_eq!(
            classifier.classify("app.name.full", &entry, &code("en"), &code("de")),
            Decision::PassThrough {
                text: "Roots Planner".to_string(),
                reason: PassThroughReason::VerbatimKey,
            }
        );
        // An empty prefix matches nothing.
        assert_eq!(
            classifier.classify("settings.title", &entry, &code("en"), &code("de")),
            Decision::NeedsTranslation {
                text: "Roots Planner".to_string(),
            }
        );
        assert_eq!(
            classify("app.name.full", &entry),
            Decision::NeedsTranslation {
                text: "Roots Planner".to_string(),
            }
        );
    }

    #[test]
    fn test_keyword_heuristic_disabled_by_default() {
        let config = ClassifierConfig {
            verbatim_keywords: vec!["API".to_string()],
            ..ClassifierConfig::default()
        };
        assert_eq!(Classifier::new(config).passthrough_reason("API key"), None);
    }

    #[test]
    fn test_keyword_heuristic_respects_length() {
        let config = ClassifierConfig {
            verbatim_keywords: vec!["API".to_string()],
            verbatim_keyword_max_chars: Some(30),
            ..ClassifierConfig::default()
        };
        let classifier = Classifier::new(config);
        assert_eq!(
            classifier.passthrough_reason("API key"),
            Some(PassThroughReason::Keyword)
        );
        assert_eq!(
            classifier.passthrough_reason("Paste the API key you created in the dashboard"),
            None
        );
    }

    #[test]
    fn test_do_not_translate_is_excluded() {
        let entry: Entry = serde_json::from_value(json!({ "shouldTranslate": false })).unwrap();
        assert_eq!(
            classify("Roots", &entry),
            Decision::Excluded(ExclusionReason::DoNotTranslate)
        );
    }

    #[test]
    fn test_untranslated_variations_are_excluded() {
        let entry: Entry = serde_json::from_value(json!({
            "localizations": {
                "de": { "variations": { "plural": {
                    "other": { "stringUnit": { "state": "new", "value": "" } }
                } } }
            }
        }))
        .unwrap();
        assert_eq!(
            classify("%lld files", &entry),
            Decision::Excluded(ExclusionReason::Variations)
        );
    }

    #[test]
    fn test_config_deserializes_with_defaults() {
        let config: ClassifierConfig =
            serde_json::from_value(json!({ "verbatim_terms": ["Roots"] })).unwrap();
        assert!(config.verbatim_terms.contains("Roots"));
        assert!(config.symbol_denylist.contains("—"));
    }
}
