use xctranslate::{
    Catalog, Classifier, Decision, Driver, FileStore, Interrupt, LanguageCode, ProviderKind,
    RunConfig, StopReason, coverage,
    driver::{self, DEFAULT_CHECKPOINT_EVERY},
    language::same_code,
    provider,
};

use tracing::warn;

use crate::{
    config::Config,
    status::print_coverage,
    validation::{validate_catalog_path, validate_language_code, validate_positive},
};

/// Options for the translate command
#[derive(Debug, Default)]
pub struct TranslateOptions {
    pub catalog: Option<String>,
    pub lang: Option<String>,
    pub all: bool,
    pub max: Option<usize>,
    pub checkpoint_every: Option<usize>,
    pub workers: Option<usize>,
    pub provider: Option<ProviderKind>,
    pub source_lang: Option<String>,
    pub dry_run: bool,
}

pub async fn run_translate_command(
    opts: TranslateOptions,
    config: &Config,
    interrupt: Interrupt,
) -> Result<(), String> {
    let catalog_path = config.catalog_path(opts.catalog.as_deref());
    let catalog_display = catalog_path.display().to_string();
    validate_catalog_path(&catalog_display)?;

    if let Some(lang) = &opts.lang {
        validate_language_code(lang)?;
    }
    let source_lang = opts
        .source_lang
        .clone()
        .or_else(|| config.source_language.clone());
    let source = match &source_lang {
        Some(code) => {
            validate_language_code(code)?;
            Some(LanguageCode::parse(code).map_err(|e| e.to_string())?)
        }
        None => None,
    };
    let checkpoint_every = opts
        .checkpoint_every
        .or(config.checkpoint_every)
        .unwrap_or(DEFAULT_CHECKPOINT_EVERY);
    validate_positive("--checkpoint-every", checkpoint_every)?;
    let workers = opts.workers.or(config.workers).unwrap_or(1);
    validate_positive("--workers", workers)?;
    let mut budget = opts.max.or(config.max_translations);

    let (store, catalog) = FileStore::open(&catalog_path).map_err(|e| e.to_string())?;
    let targets = config.target_languages();
    for lang in &targets {
        validate_language_code(lang)?;
    }
    let languages = select_languages(&catalog, &opts, &targets, source.as_ref())?;
    if languages.is_empty() {
        println!("All languages are fully translated.");
        return Ok(());
    }

    let run_config = |language: LanguageCode, budget: Option<usize>| RunConfig {
        language,
        source_language: source.clone(),
        checkpoint_every,
        max_translations: budget,
        workers,
    };

    if opts.dry_run {
        let classifier = Classifier::new(config.classifier.clone());
        for language in languages {
            let plan = driver::plan(&catalog, &classifier, &run_config(language, budget))
                .map_err(|e| e.to_string())?;
            print_plan(&plan);
        }
        return Ok(());
    }

    let translator = provider::build(&config.provider_settings(opts.provider))
        .map_err(|e| e.to_string())?;
    let mut driver = Driver::new(catalog, store, translator)
        .with_classifier(config.classifier.clone())
        .with_interrupt(interrupt);

    for language in languages {
        if budget == Some(0) {
            println!("Translation budget used up; stopping.");
            break;
        }
        let report = driver
            .run(&run_config(language, budget))
            .await
            .map_err(|e| e.to_string())?;
        println!("{}", report);
        print_coverage(&report.coverage);

        budget = budget.map(|left| left.saturating_sub(report.state.dispatched));
        match report.stop {
            StopReason::Interrupted => {
                println!("Interrupted; progress saved to {}", catalog_display);
                break;
            }
            StopReason::QuotaExceeded => {
                println!("Provider quota exceeded; progress saved to {}", catalog_display);
                break;
            }
            StopReason::BudgetReached | StopReason::Completed => {}
        }
    }
    Ok(())
}

/// Target languages for this invocation, in the order they will run.
///
/// Catalog localization keys that are not language codes (a legacy `Base`)
/// are skipped.
fn select_languages(
    catalog: &Catalog,
    opts: &TranslateOptions,
    targets: &[String],
    source: Option<&LanguageCode>,
) -> Result<Vec<LanguageCode>, String> {
    if let Some(lang) = &opts.lang {
        return Ok(vec![LanguageCode::parse(lang).map_err(|e| e.to_string())?]);
    }

    let pending = coverage::incomplete(catalog, targets)
        .into_iter()
        .filter(|report| source.is_none_or(|source| !same_code(source.as_str(), &report.language)))
        .filter_map(|report| match LanguageCode::parse(&report.language) {
            Ok(code) => Some(code),
            Err(e) => {
                warn!("Skipping catalog language {:?}: {}", report.language, e);
                None
            }
        });
    let languages = if opts.all {
        pending.collect()
    } else {
        pending.take(1).collect()
    };
    Ok(languages)
}

fn print_plan(plan: &driver::Plan) {
    println!("=== Plan: {} ===", plan.language);
    println!("Needs translation: {}", plan.needs_translation());
    println!("Passed through: {}", plan.passthrough());
    println!("Already translated: {}", plan.already_done());
    println!("Excluded: {}", plan.excluded());
    for (key, decision) in &plan.decisions {
        match decision {
            Decision::NeedsTranslation { .. } => println!("  translate     {}", key),
            Decision::PassThrough { reason, .. } => {
                println!("  pass-through  {} ({})", key, reason.as_str())
            }
            Decision::AlreadyDone | Decision::Excluded(_) => {}
        }
    }
}
