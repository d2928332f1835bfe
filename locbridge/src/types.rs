//! Core types shared by the loader and both platform converters.

use std::{fmt::Display, path::PathBuf, str::FromStr};

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::error::Error;

/// Ordered key → localized value map. Keeps the order keys had in the JSON file.
pub type StringMap = IndexMap<String, String>;

/// A target platform of the hook.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Platform {
    Android,
    Ios,
}

impl Display for Platform {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Platform::Android => write!(f, "android"),
            Platform::Ios => write!(f, "ios"),
        }
    }
}

impl FromStr for Platform {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "android" => Ok(Platform::Android),
            "ios" => Ok(Platform::Ios),
            other => Err(Error::InvalidResource(format!(
                "unknown platform `{}` (expected `android` or `ios`)",
                other
            ))),
        }
    }
}

/// Per-platform locale lists declared by a translation file.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct LocaleTargets {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub android: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ios: Option<Vec<String>>,
}

/// One `translations/app/<lang>.json` document.
///
/// ```json
/// {
///     "locale": { "android": ["en"], "ios": ["en", "en-GB"] },
///     "app": { "greeting": "Hello %1$@" },
///     "config_android": { "app_name": "Demo" },
///     "config_ios": { "CFBundleDisplayName": "Demo" }
/// }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize, Serialize)]
pub struct TranslationDocument {
    #[serde(default)]
    pub locale: LocaleTargets,

    /// Strings shared by every platform.
    #[serde(default)]
    pub app: StringMap,

    /// Android-only strings, merged over `app`.
    #[serde(default)]
    pub config_android: StringMap,

    /// iOS-only strings, rendered into `InfoPlist.strings`.
    #[serde(default)]
    pub config_ios: StringMap,
}

impl TranslationDocument {
    /// The strings the Android converter merges: `app` with `config_android` on top.
    pub fn android_strings(&self) -> StringMap {
        let mut merged = self.app.clone();
        for (key, value) in &self.config_android {
            merged.insert(key.clone(), value.clone());
        }
        merged
    }
}

/// A parsed translation file together with the language its name encodes.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TranslationSource {
    /// Language taken from the file stem, `en` for `en.json`.
    pub base_language: String,
    pub path: PathBuf,
    pub document: TranslationDocument,
}

impl TranslationSource {
    /// Locales this file renders into on `platform`.
    ///
    /// An explicit `locale.<platform>` list wins, even when empty; otherwise the
    /// file's base language is used.
    pub fn locales(&self, platform: Platform) -> Vec<String> {
        let explicit = match platform {
            Platform::Android => self.document.locale.android.as_ref(),
            Platform::Ios => self.document.locale.ios.as_ref(),
        };
        match explicit {
            Some(locales) => locales.clone(),
            None => vec![self.base_language.clone()],
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn source(json: &str) -> TranslationSource {
        TranslationSource {
            base_language: "en".to_string(),
            path: PathBuf::from("translations/app/en.json"),
            document: serde_json::from_str(json).unwrap(),
        }
    }

    #[test]
    fn test_config_android_overrides_app() {
        let doc: TranslationDocument = serde_json::from_str(
            r#"{
                "app": { "title": "Shared", "greeting": "Hello" },
                "config_android": { "title": "Android title", "extra": "Only Android" }
            }"#,
        )
        .unwrap();
        let merged = doc.android_strings();
        let pairs: Vec<_> = merged.iter().map(|(k, v)| (k.as_str(), v.as_str())).collect();
        assert_eq!(
            pairs,
            vec![
                ("title", "Android title"),
                ("greeting", "Hello"),
                ("extra", "Only Android"),
            ]
        );
    }

    #[test]
    fn test_locales_default_to_base_language() {
        let src = source(r#"{ "app": { "a": "b" } }"#);
        assert_eq!(src.locales(Platform::Android), vec!["en"]);
        assert_eq!(src.locales(Platform::Ios), vec!["en"]);
    }

    #[test]
    fn test_explicit_locales_per_platform() {
        let src = source(r#"{ "locale": { "ios": ["en", "fr"] }, "app": {} }"#);
        assert_eq!(src.locales(Platform::Ios), vec!["en", "fr"]);
        assert_eq!(src.locales(Platform::Android), vec!["en"]);
    }

    #[test]
    fn test_explicit_empty_locale_list_renders_nowhere() {
        let src = source(r#"{ "locale": { "android": [] } }"#);
        assert!(src.locales(Platform::Android).is_empty());
    }

    #[test]
    fn test_non_string_values_are_rejected() {
        let result = serde_json::from_str::<TranslationDocument>(r#"{ "app": { "count": 3 } }"#);
        assert!(result.is_err());
    }

    #[test]
    fn test_platform_from_str() {
        assert_eq!("Android".parse::<Platform>().unwrap(), Platform::Android);
        assert_eq!("ios".parse::<Platform>().unwrap(), Platform::Ios);
        assert!("windows".parse::<Platform>().is_err());
        assert_eq!(Platform::Ios.to_string(), "ios");
    }
}
