//! Runs the configured platform converters over one set of translations.

use tracing::{debug, info};

use crate::{
    android::{self, WrittenStrings},
    config::HookConfig,
    error::Error,
    ios::{self, IosReport},
    loader,
    types::TranslationSource,
    xcode::ProjectFileCache,
};

/// What one hook run wrote, per platform. `None` when the platform was not configured.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HookReport {
    pub sources: usize,
    pub android: Option<Vec<WrittenStrings>>,
    pub ios: Option<IosReport>,
}

impl HookReport {
    /// Number of resource files written across both platforms.
    pub fn files_written(&self) -> usize {
        self.android.as_ref().map_or(0, Vec::len)
            + self.ios.as_ref().map_or(0, |report| report.files.len())
    }
}

/// Loads the translations once and renders them for every configured platform.
///
/// iOS and Android run concurrently and both run to completion. When both
/// fail, the iOS error is returned.
pub fn run_hook(config: &HookConfig, cache: &dyn ProjectFileCache) -> Result<HookReport, Error> {
    let sources = loader::load_translations(&config.translations_dir)?;
    debug!(
        "Loaded {} translation file(s) from {}",
        sources.len(),
        config.translations_dir.display()
    );

    let report = run_with_sources(config, &sources, cache)?;
    info!(
        "Localization hook finished: {} file(s) written",
        report.files_written()
    );
    Ok(report)
}

/// Same as [`run_hook`] with translations that were already loaded.
pub fn run_with_sources(
    config: &HookConfig,
    sources: &[TranslationSource],
    cache: &dyn ProjectFileCache,
) -> Result<HookReport, Error> {
    let (ios, android) = rayon::join(
        || {
            config
                .ios
                .as_ref()
                .map(|target| ios::convert(target, sources, cache))
                .transpose()
        },
        || {
            config
                .android
                .as_ref()
                .map(|target| android::convert(target, &config.default_locale, sources))
                .transpose()
        },
    );

    let ios = ios?;
    let android = android?;
    Ok(HookReport {
        sources: sources.len(),
        android,
        ios,
    })
}
