//! Explicit hook configuration.
//!
//! Everything the converters need to know about the host project is carried in
//! a [`HookConfig`] value built by the caller. Nothing is discovered or cached
//! behind the caller's back.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::types::Platform;

/// Directory, relative to the project root, holding `<lang>.json` files.
pub const DEFAULT_TRANSLATIONS_DIR: &str = "translations/app";

/// Locale written to the unsuffixed `values/` directory on Android.
pub const DEFAULT_LOCALE: &str = "en";

/// Android target: where the `values*/` directories live.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct AndroidTarget {
    pub res_dir: PathBuf,
}

/// iOS target: the platform directory, the app's source folder and its project file.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize, Serialize)]
pub struct IosTarget {
    /// `platforms/ios`
    pub platform_dir: PathBuf,
    /// `platforms/ios/<App Name>`; `.lproj` folders go under its `Resources/`.
    pub project_dir: PathBuf,
    /// `platforms/ios/<App Name>.xcodeproj/project.pbxproj`
    pub pbxproj: PathBuf,
}

impl IosTarget {
    /// Derives the conventional layout for an app called `app_name`.
    pub fn for_app(platform_dir: impl Into<PathBuf>, app_name: &str) -> Self {
        let platform_dir = platform_dir.into();
        IosTarget {
            project_dir: platform_dir.join(app_name),
            pbxproj: platform_dir
                .join(format!("{}.xcodeproj", app_name))
                .join("project.pbxproj"),
            platform_dir,
        }
    }

    /// Directory holding the `<locale>.lproj` folders.
    pub fn resources_dir(&self) -> PathBuf {
        self.project_dir.join("Resources")
    }
}

/// Everything one hook run needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HookConfig {
    pub project_root: PathBuf,
    pub translations_dir: PathBuf,
    pub default_locale: String,
    pub android: Option<AndroidTarget>,
    pub ios: Option<IosTarget>,
}

impl HookConfig {
    /// A configuration with no platform targets and the default translation layout.
    pub fn new(project_root: impl AsRef<Path>) -> Self {
        let project_root = project_root.as_ref().to_path_buf();
        HookConfig {
            translations_dir: project_root.join(DEFAULT_TRANSLATIONS_DIR),
            project_root,
            default_locale: DEFAULT_LOCALE.to_string(),
            android: None,
            ios: None,
        }
    }

    pub fn with_android(mut self, target: AndroidTarget) -> Self {
        self.android = Some(target);
        self
    }

    pub fn with_ios(mut self, target: IosTarget) -> Self {
        self.ios = Some(target);
        self
    }

    pub fn with_default_locale(mut self, locale: impl Into<String>) -> Self {
        self.default_locale = locale.into();
        self
    }

    pub fn with_translations_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.translations_dir = dir.into();
        self
    }

    /// Platforms with a configured target, in the order the dispatcher reports them.
    pub fn platforms(&self) -> Vec<Platform> {
        let mut platforms = Vec::new();
        if self.ios.is_some() {
            platforms.push(Platform::Ios);
        }
        if self.android.is_some() {
            platforms.push(Platform::Android);
        }
        platforms
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ios_target_layout() {
        let target = IosTarget::for_app("/work/platforms/ios", "Hello World");
        assert_eq!(target.project_dir, PathBuf::from("/work/platforms/ios/Hello World"));
        assert_eq!(
            target.pbxproj,
            PathBuf::from("/work/platforms/ios/Hello World.xcodeproj/project.pbxproj")
        );
        assert_eq!(
            target.resources_dir(),
            PathBuf::from("/work/platforms/ios/Hello World/Resources")
        );
    }

    #[test]
    fn test_defaults() {
        let config = HookConfig::new("/work");
        assert_eq!(config.translations_dir, PathBuf::from("/work/translations/app"));
        assert_eq!(config.default_locale, "en");
        assert!(config.platforms().is_empty());
    }

    #[test]
    fn test_platforms_follow_targets() {
        let config = HookConfig::new("/work")
            .with_android(AndroidTarget {
                res_dir: PathBuf::from("/work/platforms/android/res"),
            })
            .with_ios(IosTarget::for_app("/work/platforms/ios", "App"));
        assert_eq!(config.platforms(), vec![Platform::Ios, Platform::Android]);
    }
}
