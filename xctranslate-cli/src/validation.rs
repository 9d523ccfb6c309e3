use std::path::Path;
use unic_langid::LanguageIdentifier;

/// Validate that the catalog path exists and looks like a string catalog
pub fn validate_catalog_path(path: &str) -> Result<(), String> {
    validate_file_path(path)?;

    let has_extension = Path::new(path)
        .extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("xcstrings"))
        .unwrap_or(false);
    if !has_extension {
        return Err(format!(
            "Not a string catalog: {}. Expected a .xcstrings file",
            path
        ));
    }

    Ok(())
}

/// Validate file path exists and is readable
pub fn validate_file_path(path: &str) -> Result<(), String> {
    let path_obj = Path::new(path);

    if !path_obj.exists() {
        return Err(format!("File does not exist: {}", path));
    }

    if !path_obj.is_file() {
        return Err(format!("Path is not a file: {}", path));
    }

    Ok(())
}

/// Validate language code format using unic-langid (same as lib crate)
pub fn validate_language_code(lang: &str) -> Result<(), String> {
    if lang.is_empty() {
        return Err("Language code cannot be empty".to_string());
    }

    match lang.parse::<LanguageIdentifier>() {
        Ok(lang_id) => {
            // "und" parses but names no language
            if lang_id.language.is_empty() {
                return Err(format!(
                    "Invalid language code format: {}. Expected valid BCP 47 language identifier",
                    lang
                ));
            }
            Ok(())
        }
        Err(_) => Err(format!(
            "Invalid language code format: {}. Expected valid BCP 47 language identifier",
            lang
        )),
    }
}

/// Validate a count flag such as `--workers` or `--checkpoint-every`
pub fn validate_positive(name: &str, value: usize) -> Result<(), String> {
    if value == 0 {
        return Err(format!("{} must be at least 1", name));
    }
    Ok(())
}
