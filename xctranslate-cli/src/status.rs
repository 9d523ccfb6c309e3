use serde_json::json;
use xctranslate::{Catalog, Coverage, coverage, store};

use crate::validation::{validate_catalog_path, validate_language_code};

pub struct StatusOptions {
    pub catalog: String,
    pub lang: Option<String>,
    /// Configured target languages reported even when the catalog lacks them.
    pub languages: Vec<String>,
    pub json: bool,
}

pub fn run_status_command(opts: StatusOptions) -> Result<(), String> {
    validate_catalog_path(&opts.catalog)?;
    if let Some(lang) = &opts.lang {
        validate_language_code(lang)?;
    }
    for lang in &opts.languages {
        validate_language_code(lang)?;
    }

    let catalog = store::load(&opts.catalog).map_err(|e| e.to_string())?;
    let reports = collect(&catalog, opts.lang.as_deref(), &opts.languages);

    if opts.json {
        let body = json!({
            "summary": {
                "catalog": opts.catalog,
                "source_language": catalog.source_language,
                "keys": catalog.strings.len(),
                "languages": reports.len(),
            },
            "languages": reports,
        });
        let text = serde_json::to_string_pretty(&body)
            .map_err(|e| format!("Failed to render status: {}", e))?;
        println!("{}", text);
        return Ok(());
    }

    println!("=== Status ===");
    println!("Catalog: {}", opts.catalog);
    println!("Source language: {}", catalog.source_language);
    println!("Keys: {}", catalog.strings.len());
    println!("Languages: {}", reports.len());
    if !reports.is_empty() {
        println!();
    }
    for report in &reports {
        print_coverage(report);
    }
    if opts.lang.is_none() {
        match coverage::least_complete(&catalog, &opts.languages) {
            Some(least) => println!("\nLeast complete: {}", least.language),
            None if !reports.is_empty() => println!("\nAll languages are fully translated."),
            None => {}
        }
    }
    Ok(())
}

/// Coverage for `lang`, or for every target language.
fn collect(catalog: &Catalog, lang: Option<&str>, languages: &[String]) -> Vec<Coverage> {
    match lang {
        Some(lang) => {
            let key = catalog
                .resolve_language(lang)
                .unwrap_or_else(|| lang.to_string());
            vec![coverage::report(catalog, &key)]
        }
        None => coverage::report_all(catalog, languages),
    }
}

pub fn print_coverage(report: &Coverage) {
    println!("{}", report);
    if report.needs_review > 0 || report.new > 0 || report.excluded > 0 {
        println!(
            "  needs review: {}, new: {}, excluded: {}",
            report.needs_review, report.new, report.excluded
        );
    }
}
