//! Language codes.
//!
//! Catalogs, users and translation backends all spell locales differently
//! (`zh-Hans`, `zh_hans`, `zh-CN`). [`LanguageCode`] holds the canonical
//! BCP 47 spelling, and [`CodeMap`] translates between catalog codes and a
//! backend's own dialect.

use std::{fmt::Display, str::FromStr};

use serde::{Deserialize, Serialize};
use unic_langid::LanguageIdentifier;

use crate::error::Error;

/// A canonical BCP 47 language code, e.g. `de`, `pt-BR`, `zh-Hant`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct LanguageCode(String);

impl LanguageCode {
    /// Parses and canonicalizes a code. Underscores are accepted as
    /// separators and casing is normalized (`zh_hant` -> `zh-Hant`).
    pub fn parse(code: &str) -> Result<Self, Error> {
        canonicalize(code)
            .map(LanguageCode)
            .ok_or_else(|| Error::InvalidLanguage(code.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The primary language subtag (`pt` for `pt-BR`).
    pub fn base(&self) -> &str {
        self.0.split('-').next().unwrap_or(&self.0)
    }

    /// English display name, falling back to the code itself.
    pub fn display_name(&self) -> String {
        display_name(&self.0)
            .map(str::to_string)
            .unwrap_or_else(|| self.0.clone())
    }

    pub fn matches(&self, other: &str) -> bool {
        same_code(&self.0, other)
    }
}

impl FromStr for LanguageCode {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        LanguageCode::parse(s)
    }
}

impl TryFrom<String> for LanguageCode {
    type Error = Error;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        LanguageCode::parse(&value)
    }
}

impl From<LanguageCode> for String {
    fn from(code: LanguageCode) -> Self {
        code.0
    }
}

impl Display for LanguageCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Returns the canonical spelling of `code`, or `None` if it is not a valid
/// language identifier.
pub fn canonicalize(code: &str) -> Option<String> {
    let trimmed = code.trim();
    if trimmed.is_empty() {
        return None;
    }
    trimmed
        .parse::<LanguageIdentifier>()
        .ok()
        .map(|id| id.to_string())
}

/// Whether two spellings refer to the same locale.
pub fn same_code(a: &str, b: &str) -> bool {
    if a == b {
        return true;
    }
    match (canonicalize(a), canonicalize(b)) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Default target set: the App Store localizations worth shipping.
pub const APP_STORE_LANGUAGES: &[&str] = &[
    "ar", "bg", "bn", "ca", "cs", "da", "de", "el", "en", "es", "et", "fa", "fi", "fr", "he",
    "hi", "hr", "hu", "id", "is", "it", "ja", "ka", "kn", "ko", "lt", "lv", "mk", "ms", "nl",
    "no", "pl", "pt-BR", "pt-PT", "ro", "ru", "sk", "sl", "sq", "sr", "sv", "sw", "ta", "te",
    "th", "tl", "tr", "uk", "ur", "vi", "zh-HK", "zh-Hans", "zh-Hant",
];

/// Display names for the languages commonly shipped on the App Store.
const DISPLAY_NAMES: &[(&str, &str)] = &[
    ("ar", "Arabic"),
    ("az", "Azerbaijani"),
    ("bg", "Bulgarian"),
    ("bn", "Bengali"),
    ("ca", "Catalan"),
    ("cs", "Czech"),
    ("da", "Danish"),
    ("de", "German"),
    ("el", "Greek"),
    ("en", "English"),
    ("en-GB", "English (UK)"),
    ("es", "Spanish"),
    ("es-MX", "Spanish (Mexico)"),
    ("et", "Estonian"),
    ("fa", "Persian"),
    ("fi", "Finnish"),
    ("fil", "Filipino"),
    ("fr", "French"),
    ("fr-CA", "French (Canada)"),
    ("he", "Hebrew"),
    ("hi", "Hindi"),
    ("hr", "Croatian"),
    ("hu", "Hungarian"),
    ("hy", "Armenian"),
    ("id", "Indonesian"),
    ("is", "Icelandic"),
    ("it", "Italian"),
    ("ja", "Japanese"),
    ("ka", "Georgian"),
    ("kk", "Kazakh"),
    ("kn", "Kannada"),
    ("ko", "Korean"),
    ("lt", "Lithuanian"),
    ("lv", "Latvian"),
    ("mk", "Macedonian"),
    ("ml", "Malayalam"),
    ("mr", "Marathi"),
    ("ms", "Malay"),
    ("nb", "Norwegian Bokmål"),
    ("nl", "Dutch"),
    ("no", "Norwegian"),
    ("pl", "Polish"),
    ("pt", "Portuguese"),
    ("pt-BR", "Portuguese (Brazil)"),
    ("pt-PT", "Portuguese (Portugal)"),
    ("ro", "Romanian"),
    ("ru", "Russian"),
    ("sk", "Slovak"),
    ("sl", "Slovenian"),
    ("sq", "Albanian"),
    ("sr", "Serbian"),
    ("sv", "Swedish"),
    ("sw", "Swahili"),
    ("ta", "Tamil"),
    ("te", "Telugu"),
    ("th", "Thai"),
    ("tl", "Tagalog"),
    ("tr", "Turkish"),
    ("uk", "Ukrainian"),
    ("ur", "Urdu"),
    ("vi", "Vietnamese"),
    ("zh-HK", "Chinese (Hong Kong)"),
    ("zh-Hans", "Chinese (Simplified)"),
    ("zh-Hant", "Chinese (Traditional)"),
];

pub fn display_name(code: &str) -> Option<&'static str> {
    DISPLAY_NAMES
        .iter()
        .find(|(known, _)| same_code(known, code))
        .map(|(_, name)| *name)
}

/// Bidirectional mapping between catalog codes and a backend's dialect.
///
/// Forward mapping is total: codes without an explicit pair are sent as-is.
/// Several catalog codes may share one backend code (`zh-Hant` and `zh-HK`
/// both become `zh-TW` for some services), so the reverse direction yields
/// every catalog code behind a backend code.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CodeMap {
    pairs: Vec<(String, String)>,
}

impl CodeMap {
    pub fn new(pairs: &[(&str, &str)]) -> Self {
        CodeMap {
            pairs: pairs
                .iter()
                .map(|(catalog, provider)| (catalog.to_string(), provider.to_string()))
                .collect(),
        }
    }

    pub fn with_pair(mut self, catalog: &str, provider: &str) -> Self {
        self.pairs.push((catalog.to_string(), provider.to_string()));
        self
    }

    pub fn to_provider(&self, code: &LanguageCode) -> String {
        self.pairs
            .iter()
            .find(|(catalog, _)| code.matches(catalog))
            .map(|(_, provider)| provider.clone())
            .unwrap_or_else(|| code.as_str().to_string())
    }

    pub fn from_provider(&self, provider_code: &str) -> Vec<LanguageCode> {
        let mapped: Vec<LanguageCode> = self
            .pairs
            .iter()
            .filter(|(_, provider)| provider.eq_ignore_ascii_case(provider_code))
            .filter_map(|(catalog, _)| LanguageCode::parse(catalog).ok())
            .collect();
        if !mapped.is_empty() {
            return mapped;
        }
        LanguageCode::parse(provider_code).into_iter().collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_canonicalizes_spelling() {
        assert_eq!(LanguageCode::parse("zh_hant").unwrap().as_str(), "zh-Hant");
        assert_eq!(LanguageCode::parse("PT-br").unwrap().as_str(), "pt-BR");
        assert_eq!(LanguageCode::parse(" de ").unwrap().as_str(), "de");
    }

    #[test]
    fn test_parse_rejects_garbage() {
        assert!(LanguageCode::parse("").is_err());
        assert!(LanguageCode::parse("not a code").is_err());
        assert!(LanguageCode::parse("12").is_err());
    }

    #[test]
    fn test_base_language() {
        assert_eq!(LanguageCode::parse("pt-BR").unwrap().base(), "pt");
        assert_eq!(LanguageCode::parse("fil").unwrap().base(), "fil");
    }

    #[test]
    fn test_same_code() {
        assert!(same_code("zh-Hans", "zh_hans"));
        assert!(same_code("en-gb", "en-GB"));
        assert!(!same_code("zh-Hans", "zh-Hant"));
        assert!(!same_code("pt", "pt-BR"));
    }

    #[test]
    fn test_display_name() {
        assert_eq!(LanguageCode::parse("de").unwrap().display_name(), "German");
        assert_eq!(
            LanguageCode::parse("zh_hk").unwrap().display_name(),
            "Chinese (Hong Kong)"
        );
        assert_eq!(LanguageCode::parse("yo").unwrap().display_name(), "yo");
    }

    #[test]
    fn test_app_store_languages_are_valid_and_named() {
        for code in APP_STORE_LANGUAGES {
            let parsed = LanguageCode::parse(code).unwrap();
            assert_eq!(parsed.as_str(), *code);
            assert!(display_name(code).is_some(), "{code} has no display name");
        }
    }

    #[test]
    fn test_code_map_round_trip() {
        let map = CodeMap::new(&[("zh-Hans", "zh-CN"), ("zh-Hant", "zh-TW"), ("zh-HK", "zh-TW")]);
        let hans = LanguageCode::parse("zh-Hans").unwrap();
        let de = LanguageCode::parse("de").unwrap();

        assert_eq!(map.to_provider(&hans), "zh-CN");
        assert_eq!(map.to_provider(&de), "de");

        assert_eq!(map.from_provider("zh-cn"), vec![hans]);
        let traditional = map.from_provider("zh-TW");
        assert_eq!(traditional.len(), 2);
        assert!(traditional.iter().any(|code| code.as_str() == "zh-Hant"));
        assert!(traditional.iter().any(|code| code.as_str() == "zh-HK"));
        assert_eq!(map.from_provider("de"), vec![de]);
    }

    #[test]
    fn test_serde_uses_canonical_form() {
        let code: LanguageCode = serde_json::from_str("\"zh_hans\"").unwrap();
        assert_eq!(serde_json::to_string(&code).unwrap(), "\"zh-Hans\"");
        assert!(serde_json::from_str::<LanguageCode>("\"??\"").is_err());
    }
}
