//! Core types for Xcode string catalogs (`.xcstrings`).
//!
//! Only the fields the pipeline reasons about are modeled. Everything else
//! (plural `variations`, `substitutions`, unknown metadata added by newer
//! Xcode releases) lands in an `extra` bag and is written back verbatim.

use std::{fmt::Display, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::language::same_code;

/// Unmodeled JSON fields, kept in their original order.
pub type Extra = Map<String, Value>;

/// A complete string catalog.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Catalog {
    /// Language the keys and source units are written in (e.g. "en").
    pub source_language: String,

    /// All entries, in file order.
    pub strings: IndexMap<String, Entry>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Catalog {
    pub fn new(source_language: impl Into<String>) -> Self {
        Catalog {
            source_language: source_language.into(),
            strings: IndexMap::new(),
            version: Some("1.0".to_string()),
            extra: Extra::new(),
        }
    }

    pub fn entry(&self, key: &str) -> Option<&Entry> {
        self.strings.get(key)
    }

    pub fn entry_mut(&mut self, key: &str) -> Option<&mut Entry> {
        self.strings.get_mut(key)
    }

    /// Inserts an entry, keeping the position of an existing key.
    pub fn insert(&mut self, key: impl Into<String>, entry: Entry) {
        self.strings.insert(key.into(), entry);
    }

    /// Every language code that appears in at least one entry, in first-seen
    /// order. The source language is listed first even if no entry carries an
    /// explicit unit for it.
    pub fn languages(&self) -> Vec<String> {
        let mut seen: Vec<String> = vec![self.source_language.clone()];
        for entry in self.strings.values() {
            for code in entry.localizations.keys() {
                if !seen.iter().any(|known| same_code(known, code)) {
                    seen.push(code.clone());
                }
            }
        }
        seen
    }

    /// Finds the spelling the catalog already uses for `code`, if any.
    pub fn resolve_language(&self, code: &str) -> Option<String> {
        self.languages()
            .into_iter()
            .find(|known| same_code(known, code))
    }
}

/// One key's record across all languages.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Entry {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub extraction_state: Option<ExtractionState>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_comment_auto_generated: Option<bool>,

    #[serde(default, skip_serializing_if = "IndexMap::is_empty")]
    pub localizations: IndexMap<String, Localization>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub should_translate: Option<bool>,

    #[serde(flatten)]
    pub extra: Extra,
}

impl Entry {
    /// `false` when Xcode marked the key as "Don't Translate".
    pub fn is_translatable(&self) -> bool {
        self.should_translate != Some(false)
    }

    /// Looks up the localization for `language`, tolerating spelling
    /// variants such as `zh_Hans` vs `zh-Hans`.
    pub fn localization(&self, language: &str) -> Option<&Localization> {
        self.localizations.get(language).or_else(|| {
            self.localizations
                .iter()
                .find(|(code, _)| same_code(code, language))
                .map(|(_, localization)| localization)
        })
    }

    pub fn unit(&self, language: &str) -> Option<&StringUnit> {
        self.localization(language)
            .and_then(|localization| localization.string_unit.as_ref())
    }

    /// Text to translate from: the source-language unit's value when present,
    /// otherwise the key itself.
    pub fn source_text<'a>(&'a self, key: &'a str, source_language: &str) -> &'a str {
        match self.unit(source_language) {
            Some(unit) => unit.value.as_str(),
            None => key,
        }
    }

    /// Writes `unit` for `language`. An existing localization keeps its other
    /// fields and its key spelling.
    pub fn set_unit(&mut self, language: &str, unit: StringUnit) {
        let existing = self
            .localizations
            .keys()
            .find(|code| same_code(code, language))
            .cloned();
        match existing {
            Some(code) => {
                if let Some(localization) = self.localizations.get_mut(&code) {
                    localization.string_unit = Some(unit);
                }
            }
            None => {
                self.localizations
                    .insert(language.to_string(), Localization::from(unit));
            }
        }
    }
}

/// One language's data inside an entry.
#[derive(Debug, Clone, Default, PartialEq, Deserialize, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Localization {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub string_unit: Option<StringUnit>,

    /// `variations`, `substitutions` and anything else.
    #[serde(flatten)]
    pub extra: Extra,
}

impl From<StringUnit> for Localization {
    fn from(string_unit: StringUnit) -> Self {
        Localization {
            string_unit: Some(string_unit),
            extra: Extra::new(),
        }
    }
}

impl Localization {
    pub fn has_variations(&self) -> bool {
        self.extra.contains_key("variations")
    }

    /// Effective state. For plural/device variations this is the least
    /// advanced state among all nested units.
    pub fn state(&self) -> Option<UnitState> {
        if let Some(unit) = &self.string_unit {
            return Some(unit.state.clone());
        }
        let mut states = Vec::new();
        if let Some(variations) = self.extra.get("variations") {
            collect_nested_states(variations, &mut states);
        }
        states.into_iter().min_by_key(UnitState::rank)
    }
}

fn collect_nested_states(value: &Value, out: &mut Vec<UnitState>) {
    match value {
        Value::Object(map) => {
            if let Some(state) = map
                .get("stringUnit")
                .and_then(|unit| unit.get("state"))
                .and_then(Value::as_str)
            {
                out.push(UnitState::from(state.to_string()));
            }
            for (key, nested) in map {
                if key != "stringUnit" {
                    collect_nested_states(nested, out);
                }
            }
        }
        Value::Array(items) => items.iter().for_each(|item| collect_nested_states(item, out)),
        _ => {}
    }
}

/// The `{ state, value }` pair for one language.
#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct StringUnit {
    pub state: UnitState,
    pub value: String,

    #[serde(flatten)]
    pub extra: Extra,
}

impl StringUnit {
    pub fn new(state: UnitState, value: impl Into<String>) -> Self {
        Self {
            state,
            value: value.into(),
            extra: Extra::new(),
        }
    }

    pub fn translated(value: impl Into<String>) -> Self {
        Self::new(UnitState::Translated, value)
    }

    pub fn needs_review(value: impl Into<String>) -> Self {
        Self::new(UnitState::NeedsReview, value)
    }
}

/// Translation state of a unit.
///
/// Unknown states are kept as [`UnitState::Other`] so they survive a
/// load/save cycle unchanged.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum UnitState {
    /// No translation attempt yet.
    New,
    /// Provisional value that still has to be revisited.
    NeedsReview,
    /// Accepted, final value.
    Translated,
    /// The source string changed after this unit was translated.
    Stale,
    Other(String),
}

impl UnitState {
    pub fn as_str(&self) -> &str {
        match self {
            UnitState::New => "new",
            UnitState::NeedsReview => "needs_review",
            UnitState::Translated => "translated",
            UnitState::Stale => "stale",
            UnitState::Other(raw) => raw,
        }
    }

    /// Progress rank used to pick the least advanced state.
    fn rank(&self) -> u8 {
        match self {
            UnitState::New | UnitState::Other(_) => 0,
            UnitState::NeedsReview | UnitState::Stale => 1,
            UnitState::Translated => 2,
        }
    }
}

impl From<String> for UnitState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "new" => UnitState::New,
            "needs_review" => UnitState::NeedsReview,
            "translated" => UnitState::Translated,
            "stale" => UnitState::Stale,
            _ => UnitState::Other(raw),
        }
    }
}

impl From<UnitState> for String {
    fn from(state: UnitState) -> Self {
        match state {
            UnitState::Other(raw) => raw,
            known => known.as_str().to_string(),
        }
    }
}

impl Display for UnitState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for UnitState {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match UnitState::from(s.to_ascii_lowercase()) {
            UnitState::Other(_) => Err(format!("Unknown unit state: {}", s)),
            state => Ok(state),
        }
    }
}

/// How Xcode discovered a key.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
#[serde(from = "String", into = "String")]
pub enum ExtractionState {
    Manual,
    Stale,
    ExtractedWithValue,
    Migrated,
    Other(String),
}

impl From<String> for ExtractionState {
    fn from(raw: String) -> Self {
        match raw.as_str() {
            "manual" => ExtractionState::Manual,
            "stale" => ExtractionState::Stale,
            "extracted_with_value" => ExtractionState::ExtractedWithValue,
            "migrated" => ExtractionState::Migrated,
            _ => ExtractionState::Other(raw),
        }
    }
}

impl From<ExtractionState> for String {
    fn from(state: ExtractionState) -> Self {
        state.to_string()
    }
}

impl Display for ExtractionState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExtractionState::Manual => write!(f, "manual"),
            ExtractionState::Stale => write!(f, "stale"),
            ExtractionState::ExtractedWithValue => write!(f, "extracted_with_value"),
            ExtractionState::Migrated => write!(f, "migrated"),
            ExtractionState::Other(raw) => write!(f, "{}", raw),
        }
    }
}
