#![forbid(unsafe_code)]
//! Incremental, resumable machine translation for Xcode string catalogs.
//!
//! `xctranslate` loads a `.xcstrings` catalog, decides per entry whether a
//! target language still needs work, copies trivial strings verbatim, sends
//! the rest to a translation backend, and saves progress at a bounded
//! cadence so a run can be stopped and resumed at any point.
//!
//! # Quick Start
//!
//! ```rust,no_run
//! use xctranslate::{
//!     Driver, FileStore, LanguageCode, ProviderKind, ProviderSettings, RunConfig, provider,
//! };
//!
//! # async fn run() -> Result<(), xctranslate::Error> {
//! let (store, catalog) = FileStore::open("Localizable.xcstrings")?;
//! let translator = provider::build(&ProviderSettings::new(ProviderKind::MyMemory))?;
//!
//! let mut driver = Driver::new(catalog, store, translator);
//! let report = driver.run(&RunConfig::new(LanguageCode::parse("de")?)).await?;
//! println!("{}", report.coverage);
//! # Ok(())
//! # }
//! ```
//!
//! # Guarantees
//!
//! - Entries already `translated` are never sent to a provider again.
//! - Empty and placeholder-only strings (`%@`, `%lld`, ...) never reach a
//!   provider; they are copied verbatim.
//! - A failed translation leaves the source text as a `needs_review`
//!   placeholder; the run goes on.
//! - Unknown fields, entry order and file layout survive a load/save cycle.

pub mod classify;
pub mod coverage;
pub mod driver;
pub mod error;
pub mod interrupt;
pub mod language;
pub mod placeholder;
pub mod provider;
pub mod store;
pub mod types;

// Re-export most used types for easy consumption
pub use crate::{
    classify::{Classifier, ClassifierConfig, Decision, ExclusionReason, PassThroughReason},
    coverage::{Coverage, least_complete, report, report_all},
    driver::{Driver, Plan, RunConfig, RunReport, RunState, StopReason},
    error::Error,
    interrupt::Interrupt,
    language::{CodeMap, LanguageCode},
    provider::{
        ProviderError, ProviderKind, ProviderSettings, RetryPolicy, RetryingTranslator, Translator,
    },
    store::{CatalogStore, FileStore, Layout},
    types::{Catalog, Entry, Localization, StringUnit, UnitState},
};
