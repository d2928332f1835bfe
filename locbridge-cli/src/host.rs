//! Discovery of the host project: which platforms exist, the iOS app name and
//! where the Android resources live. Produces the [`HookConfig`] the library runs on.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result, bail};
use locbridge::{AndroidTarget, HookConfig, IosTarget, Platform, ProjectFileCache};
use quick_xml::{Reader, events::Event};
use serde::Deserialize;
use tracing::{debug, info, warn};

/// Config file picked up from the project root when `--config` is not given.
pub const CONFIG_FILE_NAME: &str = "locbridge.toml";

/// Settings from `locbridge.toml` or the command line. Unset fields fall back
/// to what can be discovered in the project.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct Settings {
    pub platforms: Option<Vec<Platform>>,
    pub app_name: Option<String>,
    pub android_res: Option<PathBuf>,
    pub default_locale: Option<String>,
    pub translations: Option<PathBuf>,
}

impl Settings {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn from_toml_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path)
            .with_context(|| format!("failed to read config file {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("invalid config file {}", path.display()))
    }

    /// Loads `explicit` if given, else `<root>/locbridge.toml` when present.
    pub fn discover(root: &Path, explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::from_toml_file(resolve(root, path));
        }
        let default_path = root.join(CONFIG_FILE_NAME);
        if default_path.is_file() {
            debug!("Using config file {}", default_path.display());
            Self::from_toml_file(default_path)
        } else {
            Ok(Settings::default())
        }
    }

    /// Fields set in `overrides` win over `self`.
    pub fn overridden_by(self, overrides: Settings) -> Settings {
        Settings {
            platforms: overrides.platforms.or(self.platforms),
            app_name: overrides.app_name.or(self.app_name),
            android_res: overrides.android_res.or(self.android_res),
            default_locale: overrides.default_locale.or(self.default_locale),
            translations: overrides.translations.or(self.translations),
        }
    }
}

/// Platforms set up under `<root>/platforms/`, iOS first.
pub fn discover_platforms(root: &Path) -> Result<Vec<Platform>> {
    let dir = root.join("platforms");
    if !dir.is_dir() {
        return Ok(Vec::new());
    }

    let mut found = Vec::new();
    for entry in fs::read_dir(&dir).with_context(|| format!("failed to list {}", dir.display()))? {
        let entry = entry?;
        if !entry.file_type()?.is_dir() {
            continue;
        }
        match entry.file_name().to_str().map(str::parse::<Platform>) {
            Some(Ok(platform)) => found.push(platform),
            _ => debug!("Ignoring platform directory {:?}", entry.file_name()),
        }
    }
    found.sort_by_key(|platform| match platform {
        Platform::Ios => 0,
        Platform::Android => 1,
    });
    found.dedup();
    Ok(found)
}

/// Reads the app name from the `<name>` element of a `config.xml`.
pub fn read_app_name(config_xml: &Path) -> Result<String> {
    let content = fs::read_to_string(config_xml)
        .with_context(|| format!("failed to read {}", config_xml.display()))?;
    app_name_from_xml(&content)
        .with_context(|| format!("no app name found in {}", config_xml.display()))
}

fn app_name_from_xml(content: &str) -> Result<String> {
    let mut reader = Reader::from_str(content);
    let mut depth = 0usize;
    let mut in_name = false;
    let mut name = String::new();

    loop {
        match reader.read_event()? {
            Event::Start(e) => {
                depth += 1;
                // `<name>` directly under the root `<widget>`.
                in_name = depth == 2 && e.local_name().as_ref() == b"name";
            }
            Event::Text(t) if in_name => name.push_str(&t.unescape()?),
            Event::CData(t) if in_name => name.push_str(&String::from_utf8_lossy(&t)),
            Event::End(_) => {
                if in_name {
                    break;
                }
                depth = depth.saturating_sub(1);
            }
            Event::Eof => break,
            _ => {}
        }
    }

    let name = name.trim();
    if name.is_empty() {
        bail!("missing <name> element");
    }
    Ok(name.to_string())
}

/// `platforms/android/app/src/main/res` when it exists (Cordova Android 7+),
/// else the older `platforms/android/res`.
pub fn default_android_res(root: &Path) -> PathBuf {
    let modern = root.join("platforms/android/app/src/main/res");
    if modern.is_dir() {
        modern
    } else {
        root.join("platforms/android/res")
    }
}

/// Builds the hook configuration for `root` from resolved settings.
pub fn build_config(root: &Path, settings: &Settings) -> Result<HookConfig> {
    let mut config = HookConfig::new(root);
    if let Some(dir) = &settings.translations {
        config = config.with_translations_dir(resolve(root, dir));
    }
    if let Some(locale) = &settings.default_locale {
        config = config.with_default_locale(locale.clone());
    }

    let platforms = match &settings.platforms {
        Some(platforms) => platforms.clone(),
        None => discover_platforms(root)?,
    };
    if platforms.is_empty() {
        warn!("No platforms found under {}", root.join("platforms").display());
    }

    for platform in platforms {
        match platform {
            Platform::Android => {
                let res_dir = match &settings.android_res {
                    Some(dir) => resolve(root, dir),
                    None => default_android_res(root),
                };
                config = config.with_android(AndroidTarget { res_dir });
            }
            Platform::Ios => {
                let app_name = match &settings.app_name {
                    Some(name) => name.clone(),
                    None => read_app_name(&root.join("config.xml"))?,
                };
                config = config.with_ios(IosTarget::for_app(root.join("platforms/ios"), &app_name));
            }
        }
    }
    Ok(config)
}

/// Reports project-file changes so the host reloads its cached copy.
#[derive(Debug, Default)]
pub struct LoggingProjectCache;

impl ProjectFileCache for LoggingProjectCache {
    fn invalidate(&self, platform_dir: &Path) {
        info!(
            "Xcode project under {} changed; reload any cached copy",
            platform_dir.display()
        );
    }
}

fn resolve(root: &Path, path: &Path) -> PathBuf {
    if path.is_absolute() {
        path.to_path_buf()
    } else {
        root.join(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_app_name_from_config_xml() {
        let xml = r#"<?xml version='1.0' encoding='utf-8'?>
<widget id="com.example.demo" version="1.0.0" xmlns="http://www.w3.org/ns/widgets">
    <name>Hello &amp; Welcome</name>
    <description>Sample</description>
    <platform name="ios">
        <name>Not this one</name>
    </platform>
</widget>"#;
        assert_eq!(app_name_from_xml(xml).unwrap(), "Hello & Welcome");
    }

    #[test]
    fn test_app_name_missing() {
        let xml = "<widget><description>Sample</description></widget>";
        assert!(app_name_from_xml(xml).is_err());
    }

    #[test]
    fn test_settings_override() {
        let file = Settings::from_toml_str(
            r#"
            platforms = ["android"]
            app_name = "From File"
            default_locale = "de"
            "#,
        )
        .unwrap();
        let flags = Settings {
            app_name: Some("From Flag".to_string()),
            ..Settings::default()
        };
        let merged = file.overridden_by(flags);
        assert_eq!(merged.app_name.as_deref(), Some("From Flag"));
        assert_eq!(merged.default_locale.as_deref(), Some("de"));
        assert_eq!(merged.platforms, Some(vec![Platform::Android]));
    }

    #[test]
    fn test_unknown_config_keys_are_rejected() {
        assert!(Settings::from_toml_str("colour = \"blue\"").is_err());
    }

    #[test]
    fn test_discover_platforms() {
        let root = TempDir::new().unwrap();
        assert!(discover_platforms(root.path()).unwrap().is_empty());

        for dir in ["android", "ios", "browser"] {
            fs::create_dir_all(root.path().join("platforms").join(dir)).unwrap();
        }
        fs::write(root.path().join("platforms/platforms.json"), "{}").unwrap();
        assert_eq!(
            discover_platforms(root.path()).unwrap(),
            vec![Platform::Ios, Platform::Android]
        );
    }

    #[test]
    fn test_default_android_res() {
        let root = TempDir::new().unwrap();
        assert_eq!(
            default_android_res(root.path()),
            root.path().join("platforms/android/res")
        );
        let modern = root.path().join("platforms/android/app/src/main/res");
        fs::create_dir_all(&modern).unwrap();
        assert_eq!(default_android_res(root.path()), modern);
    }

    #[test]
    fn test_build_config_relative_paths() {
        let root = TempDir::new().unwrap();
        let settings = Settings {
            platforms: Some(vec![Platform::Android, Platform::Ios]),
            app_name: Some("Demo".to_string()),
            android_res: Some(PathBuf::from("custom/res")),
            translations: Some(PathBuf::from("i18n")),
            default_locale: None,
        };
        let config = build_config(root.path(), &settings).unwrap();
        assert_eq!(config.translations_dir, root.path().join("i18n"));
        assert_eq!(config.default_locale, "en");
        assert_eq!(config.android.unwrap().res_dir, root.path().join("custom/res"));
        assert_eq!(
            config.ios.unwrap().project_dir,
            root.path().join("platforms/ios/Demo")
        );
    }
}
