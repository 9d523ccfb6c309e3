//! Per-language completion statistics.

use std::fmt::Display;

use serde::Serialize;

use crate::{
    language::{LanguageCode, same_code},
    types::{Catalog, UnitState},
};

/// Completion numbers for one language.
///
/// `translated + needs_review + new == total`. Entries marked "Don't
/// Translate" are counted in `excluded` and left out of `total`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Coverage {
    pub language: String,
    pub total: usize,
    pub translated: usize,
    pub needs_review: usize,
    pub new: usize,
    pub excluded: usize,
    pub percentage: f64,
}

impl Coverage {
    pub fn is_complete(&self) -> bool {
        self.translated == self.total
    }

    pub fn remaining(&self) -> usize {
        self.total - self.translated
    }
}

impl Display for Coverage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = LanguageCode::parse(&self.language)
            .map(|code| code.display_name())
            .unwrap_or_else(|_| self.language.clone());
        write!(
            f,
            "{} ({}): {}/{} ({:.1}%)",
            name, self.language, self.translated, self.total, self.percentage
        )
    }
}

/// Coverage of `language` in `catalog`.
///
/// A missing unit counts as `new`, except in the source language where the
/// key itself is the text. `stale` and unrecognized states count as
/// `needs_review`.
pub fn report(catalog: &Catalog, language: &str) -> Coverage {
    let is_source = same_code(&catalog.source_language, language);
    let mut coverage = Coverage {
        language: language.to_string(),
        total: 0,
        translated: 0,
        needs_review: 0,
        new: 0,
        excluded: 0,
        percentage: 0.0,
    };

    for entry in catalog.strings.values() {
        if !entry.is_translatable() {
            coverage.excluded += 1;
            continue;
        }
        coverage.total += 1;
        match entry.localization(language).and_then(|l| l.state()) {
            Some(UnitState::Translated) => coverage.translated += 1,
            Some(UnitState::New) => coverage.new += 1,
            Some(UnitState::NeedsReview | UnitState::Stale | UnitState::Other(_)) => {
                coverage.needs_review += 1
            }
            None if is_source => coverage.translated += 1,
            None => coverage.new += 1,
        }
    }

    coverage.percentage = if coverage.total == 0 {
        100.0
    } else {
        coverage.translated as f64 * 100.0 / coverage.total as f64
    };
    coverage
}

/// Coverage for every target language: those already in the catalog, in
/// first-seen order, then any of `targets` the catalog does not carry yet.
/// A configured language with no units at all reports as entirely `new`.
pub fn report_all(catalog: &Catalog, targets: &[String]) -> Vec<Coverage> {
    let mut languages = catalog.languages();
    for code in targets {
        if !languages.iter().any(|known| same_code(known, code)) {
            languages.push(code.clone());
        }
    }
    languages
        .into_iter()
        .filter(|code| !same_code(code, &catalog.source_language))
        .map(|code| report(catalog, &code))
        .collect()
}

/// The incomplete target language with the fewest translated entries.
/// Ties go to the alphabetically first code.
pub fn least_complete(catalog: &Catalog, targets: &[String]) -> Option<Coverage> {
    incomplete(catalog, targets).into_iter().next()
}

/// Every incomplete target language, least complete first.
pub fn incomplete(catalog: &Catalog, targets: &[String]) -> Vec<Coverage> {
    let mut pending: Vec<Coverage> = report_all(catalog, targets)
        .into_iter()
        .filter(|coverage| !coverage.is_complete())
        .collect();
    pending.sort_by(|a, b| {
        a.translated
            .cmp(&b.translated)
            .then_with(|| a.language.cmp(&b.language))
    });
    pending
}
