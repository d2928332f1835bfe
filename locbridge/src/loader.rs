//! Discovery and parsing of `translations/app/<lang>.json` files.

use std::{
    fs::File,
    io::Read,
    path::{Path, PathBuf},
};

use tracing::{debug, warn};

use crate::{
    error::Error,
    types::{Platform, TranslationDocument, TranslationSource},
};

/// Loads every `*.json` file directly under `dir`, sorted by file name.
///
/// A missing directory is an error; an empty one yields no sources.
pub fn load_translations<P: AsRef<Path>>(dir: P) -> Result<Vec<TranslationSource>, Error> {
    let dir = dir.as_ref();
    if !dir.is_dir() {
        return Err(Error::MissingTranslations(dir.to_path_buf()));
    }

    let mut sources = discover(dir)?
        .into_iter()
        .map(|path| load_translation(&path))
        .collect::<Result<Vec<_>, _>>()?;
    sources.sort_by(|a, b| a.path.cmp(&b.path));

    if sources.is_empty() {
        warn!("No translation files found in {}", dir.display());
    }
    Ok(sources)
}

/// Parses one translation file; the file stem becomes the base language.
pub fn load_translation<P: AsRef<Path>>(path: P) -> Result<TranslationSource, Error> {
    let path = path.as_ref();
    let base_language = path
        .file_stem()
        .and_then(|s| s.to_str())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidLocale(path.display().to_string()))?;
    validate_locale(&base_language)?;

    let content = read_decoded(path).map_err(|e| Error::reading(path, e))?;
    let document: TranslationDocument =
        serde_json::from_str(&content).map_err(|e| Error::reading(path, e))?;

    for platform in [Platform::Android, Platform::Ios] {
        let explicit = match platform {
            Platform::Android => document.locale.android.as_deref(),
            Platform::Ios => document.locale.ios.as_deref(),
        };
        for locale in explicit.unwrap_or_default() {
            validate_locale(locale)?;
        }
    }

    debug!(
        "Loaded {} ({} app, {} android, {} ios strings)",
        path.display(),
        document.app.len(),
        document.config_android.len(),
        document.config_ios.len()
    );

    Ok(TranslationSource {
        base_language,
        path: path.to_path_buf(),
        document,
    })
}

/// Rejects locale codes that cannot safely become a directory name.
pub fn validate_locale(code: &str) -> Result<(), Error> {
    let invalid = code.is_empty()
        || code == "."
        || code.contains("..")
        || code
            .chars()
            .any(|c| c == '/' || c == '\\' || c.is_whitespace() || c.is_control());
    if invalid {
        return Err(Error::InvalidLocale(code.to_string()));
    }
    Ok(())
}

fn discover(dir: &Path) -> Result<Vec<PathBuf>, Error> {
    let dir_str = dir
        .to_str()
        .ok_or_else(|| Error::InvalidResource(format!("non UTF-8 path {}", dir.display())))?;
    let pattern = format!("{}/*.json", glob::Pattern::escape(dir_str.trim_end_matches('/')));

    let mut paths = Vec::new();
    for entry in glob::glob(&pattern).map_err(|e| Error::InvalidResource(e.to_string()))? {
        let path = entry.map_err(|e| Error::Io(e.into()))?;
        if path.is_file() {
            paths.push(path);
        }
    }
    Ok(paths)
}

// Auto-detect BOM, decode to UTF-8; passthrough UTF-8.
fn read_decoded(path: &Path) -> Result<String, Error> {
    let file = File::open(path)?;
    let mut decoder = encoding_rs_io::DecodeReaderBytesBuilder::new()
        .bom_override(true)
        .build(file);
    let mut decoded = String::new();
    decoder.read_to_string(&mut decoded)?;
    Ok(decoded)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::TempDir;

    #[test]
    fn test_loads_sorted_sources_with_base_language() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("fr.json"), r#"{ "app": { "hi": "Salut" } }"#).unwrap();
        fs::write(temp_dir.path().join("en.json"), r#"{ "app": { "hi": "Hi" } }"#).unwrap();
        fs::write(temp_dir.path().join("notes.txt"), "ignored").unwrap();

        let sources = load_translations(temp_dir.path()).unwrap();
        let langs: Vec<_> = sources.iter().map(|s| s.base_language.as_str()).collect();
        assert_eq!(langs, vec!["en", "fr"]);
        assert_eq!(sources[1].document.app["hi"], "Salut");
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let temp_dir = TempDir::new().unwrap();
        let result = load_translations(temp_dir.path().join("nope"));
        assert!(matches!(result, Err(Error::MissingTranslations(_))));
    }

    #[test]
    fn test_empty_directory_yields_nothing() {
        let temp_dir = TempDir::new().unwrap();
        assert!(load_translations(temp_dir.path()).unwrap().is_empty());
    }

    #[test]
    fn test_malformed_json_names_the_file() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("de.json"), "{ \"app\": ").unwrap();
        let err = load_translations(temp_dir.path()).unwrap_err();
        assert!(err.to_string().contains("de.json"));
    }

    #[test]
    fn test_utf8_bom_is_accepted() {
        let temp_dir = TempDir::new().unwrap();
        let mut bytes = vec![0xEF, 0xBB, 0xBF];
        bytes.extend_from_slice(r#"{ "app": { "hi": "Hallo" } }"#.as_bytes());
        fs::write(temp_dir.path().join("de.json"), bytes).unwrap();
        let sources = load_translations(temp_dir.path()).unwrap();
        assert_eq!(sources[0].document.app["hi"], "Hallo");
    }

    #[test]
    fn test_path_like_locale_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(
            temp_dir.path().join("en.json"),
            r#"{ "locale": { "ios": ["../evil"] }, "app": {} }"#,
        )
        .unwrap();
        let err = load_translations(temp_dir.path()).unwrap_err();
        assert!(matches!(err, Error::InvalidLocale(code) if code == "../evil"));
    }

    #[test]
    fn test_validate_locale() {
        assert!(validate_locale("en").is_ok());
        assert!(validate_locale("pt-BR").is_ok());
        assert!(validate_locale("zh-rCN").is_ok());
        assert!(validate_locale("").is_err());
        assert!(validate_locale("a/b").is_err());
        assert!(validate_locale("en us").is_err());
    }
}
