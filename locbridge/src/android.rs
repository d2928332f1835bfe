//! Android converter: merges translations into `values[-<qualifier>]/strings.xml`.

use std::{
    fs,
    path::{Path, PathBuf},
};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info, warn};
use unic_langid::LanguageIdentifier;

use crate::{
    config::AndroidTarget,
    error::Error,
    formats::android_strings::{Document, MergeStats},
    traits::Parser,
    transform::Pipeline,
    types::{Platform, StringMap, TranslationSource},
};

/// One `strings.xml` the converter wrote.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenStrings {
    pub locale: String,
    pub path: PathBuf,
    pub stats: MergeStats,
}

/// Android resource qualifier for a locale code.
///
/// `fr` -> `fr`, `pt-BR` -> `pt-rBR`, `zh-Hans-CN` -> `b+zh+Hans+CN`.
/// Codes that are not BCP-47 (such as `zh-rCN`, already a qualifier) pass through.
pub fn android_qualifier(locale: &str) -> String {
    let Ok(langid) = locale.parse::<LanguageIdentifier>() else {
        return locale.to_string();
    };

    let language = langid.language.as_str().to_string();
    if langid.script.is_some() || langid.variants().len() > 0 {
        let mut parts = vec!["b".to_string(), language];
        if let Some(script) = langid.script {
            parts.push(script.as_str().to_string());
        }
        if let Some(region) = langid.region {
            parts.push(region.as_str().to_string());
        }
        parts.extend(langid.variants().map(|v| v.as_str().to_string()));
        return parts.join("+");
    }
    match langid.region {
        Some(region) => format!("{}-r{}", language, region.as_str()),
        None => language,
    }
}

/// `values/` for the default locale, `values-<qualifier>/` otherwise.
pub fn values_dir(res_dir: &Path, locale: &str, default_locale: &str) -> PathBuf {
    if locale == default_locale {
        res_dir.join("values")
    } else {
        res_dir.join(format!("values-{}", android_qualifier(locale)))
    }
}

/// Strings bound for one `strings.xml`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LocaleJob {
    /// First locale code that resolved to `dir`.
    pub locale: String,
    pub dir: PathBuf,
    pub strings: StringMap,
}

/// Groups the strings of every source by output directory.
///
/// Codes resolving to the same `values*/` folder (`pt-BR` and `pt-rBR`) share
/// one job, so no two jobs touch the same file. Files later in `sources` win on
/// conflicting keys.
pub fn jobs_by_directory(
    res_dir: &Path,
    default_locale: &str,
    sources: &[TranslationSource],
) -> Vec<LocaleJob> {
    let mut by_dir: IndexMap<PathBuf, LocaleJob> = IndexMap::new();
    for source in sources {
        let strings = source.document.android_strings();
        for locale in source.locales(Platform::Android) {
            let dir = values_dir(res_dir, &locale, default_locale);
            let job = by_dir.entry(dir.clone()).or_insert_with(|| LocaleJob {
                locale: locale.clone(),
                dir,
                strings: StringMap::new(),
            });
            if job.locale != locale {
                debug!(
                    "{} and {} both resolve to {}",
                    job.locale,
                    locale,
                    job.dir.display()
                );
            }
            for (key, value) in &strings {
                job.strings.insert(key.clone(), value.clone());
            }
        }
    }
    by_dir.into_values().collect()
}

/// Merges one job into its `strings.xml`, creating the file if needed.
///
/// Returns `None` without touching the disk when there is nothing to merge.
pub fn merge_job(job: &LocaleJob, pipeline: &Pipeline) -> Result<Option<WrittenStrings>, Error> {
    if job.strings.is_empty() {
        debug!("No Android strings for {}; skipping", job.locale);
        return Ok(None);
    }

    let path = job.dir.join("strings.xml");
    let mut document = if path.is_file() {
        Document::read_from(&path)?
    } else {
        Document::new()
    };
    let stats = document.merge(&job.strings, pipeline);

    fs::create_dir_all(&job.dir).map_err(|e| Error::writing(&job.dir, e))?;
    document.write_to(&path)?;
    info!("Saved: {}", path.display());

    Ok(Some(WrittenStrings {
        locale: job.locale.clone(),
        path,
        stats,
    }))
}

/// Renders every translation source into the Android resources directory.
///
/// Output directories are processed in parallel; all of them run to
/// completion and the call fails if any of them failed.
pub fn convert(
    target: &AndroidTarget,
    default_locale: &str,
    sources: &[TranslationSource],
) -> Result<Vec<WrittenStrings>, Error> {
    if !target.res_dir.is_dir() {
        warn!(
            "Android res directory {} does not exist yet; creating it",
            target.res_dir.display()
        );
    }

    let pipeline = Pipeline::android();
    let jobs = jobs_by_directory(&target.res_dir, default_locale, sources);

    let results: Vec<Result<Option<WrittenStrings>, Error>> = jobs
        .par_iter()
        .map(|job| merge_job(job, &pipeline))
        .collect();

    let mut written = Vec::new();
    for result in results {
        if let Some(file) = result? {
            written.push(file);
        }
    }
    Ok(written)
}
