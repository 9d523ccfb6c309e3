//! Placeholder parsing and comparison utilities.
//!
//! Goals:
//! - Recognize printf-style format tokens as Foundation understands them
//!   (`%@`, `%d`, `%1$@`, `%lld`, `%.2f`, ...), ignoring escaped `%%`.
//! - Strip tokens so the classifier can tell whether anything translatable
//!   is left.
//! - Build a placeholder "signature" so a translated string can be checked
//!   against its source before it is accepted.

use lazy_static::lazy_static;
use regex::Regex;

lazy_static! {
    // `%%` is matched first so it is never mistaken for a token. The space
    // flag is left out on purpose: "50% off" is prose, not `% o`.
    static ref PLACEHOLDER_REGEX: Regex = Regex::new(
        r"%%|%(?:(\d+)\$)?[-+#0']*(?:\d+|\*)?(?:\.(?:\d+|\*))?(hh|h|ll|l|q|z|t|j|L)?([@dDiuUxXoOfFeEgGaAcCsSp])"
    )
    .unwrap();
}

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord)]
pub struct PlaceholderToken {
    pub index: Option<usize>,
    pub length: String,
    pub kind: char,
}

impl PlaceholderToken {
    pub fn to_signature(&self) -> String {
        match self.index {
            Some(i) => format!("{}${}{}", i, self.length, self.kind),
            None => format!("{}{}", self.length, self.kind),
        }
    }
}

/// Extracts placeholder tokens from a string in occurrence order.
pub fn extract_placeholders(input: &str) -> Vec<PlaceholderToken> {
    PLACEHOLDER_REGEX
        .captures_iter(input)
        .filter(|caps| caps.get(0).map(|m| m.as_str()) != Some("%%"))
        .filter_map(|caps| {
            let kind = caps.get(3)?.as_str().chars().next()?;
            Some(PlaceholderToken {
                index: caps.get(1).and_then(|m| m.as_str().parse().ok()),
                length: caps
                    .get(2)
                    .map(|m| m.as_str().to_string())
                    .unwrap_or_default(),
                kind,
            })
        })
        .collect()
}

/// Removes every placeholder token and escaped percent sign.
pub fn strip_placeholders(input: &str) -> String {
    PLACEHOLDER_REGEX.replace_all(input, "").into_owned()
}

/// True when the string is nothing but format tokens and whitespace.
pub fn is_placeholder_only(input: &str) -> bool {
    !extract_placeholders(input).is_empty() && strip_placeholders(input).trim().is_empty()
}

/// Order-insensitive signature of the tokens in `input`.
pub fn signature(input: &str) -> Vec<String> {
    let mut tokens: Vec<String> = extract_placeholders(input)
        .iter()
        .map(PlaceholderToken::to_signature)
        .collect();
    tokens.sort();
    tokens
}

/// Whether `translated` carries exactly the placeholders of `source`.
pub fn signatures_match(source: &str, translated: &str) -> bool {
    signature(source) == signature(translated)
}
