//! CLI library for testing purposes

pub mod config;
pub mod logging;
pub mod status;
pub mod translate;
pub mod validation;

pub use config::Config;
pub use status::{StatusOptions, run_status_command};
pub use translate::{TranslateOptions, run_translate_command};
