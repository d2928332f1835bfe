//! iOS converter: `Localizable.strings` / `InfoPlist.strings` per locale, then
//! one pass over the Xcode project to register them.

use std::{fs, path::PathBuf};

use indexmap::IndexMap;
use rayon::prelude::*;
use tracing::{debug, info};

use crate::{
    config::IosTarget,
    error::Error,
    formats::strings::Format,
    transform::Pipeline,
    types::{Platform, StringMap, TranslationSource},
    xcode::{self, LocalizationGroups, ProjectFileCache, RegistrationReport},
};

pub const LOCALIZABLE_STRINGS: &str = "Localizable.strings";
pub const INFO_PLIST_STRINGS: &str = "InfoPlist.strings";

/// The two string maps one locale renders.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LocaleStrings {
    /// `app`, for `Localizable.strings`.
    pub app: StringMap,
    /// `config_ios`, for `InfoPlist.strings`.
    pub info_plist: StringMap,
}

/// A `.strings` file written for one locale.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WrittenFile {
    pub locale: String,
    pub group: &'static str,
    /// Relative to the `Resources` folder, e.g. `fr.lproj/Localizable.strings`.
    pub relative_path: String,
    pub path: PathBuf,
}

/// Result of a full iOS run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct IosReport {
    pub files: Vec<WrittenFile>,
    pub registration: RegistrationReport,
}

/// Collects per-locale strings; files later in `sources` win on conflicting keys.
pub fn strings_by_locale(sources: &[TranslationSource]) -> IndexMap<String, LocaleStrings> {
    let mut by_locale: IndexMap<String, LocaleStrings> = IndexMap::new();
    for source in sources {
        for locale in source.locales(Platform::Ios) {
            let entry = by_locale.entry(locale).or_default();
            for (key, value) in &source.document.app {
                entry.app.insert(key.clone(), value.clone());
            }
            for (key, value) in &source.document.config_ios {
                entry.info_plist.insert(key.clone(), value.clone());
            }
        }
    }
    by_locale
}

/// Writes the `.strings` files of one locale. Empty maps write nothing.
pub fn write_locale(
    target: &IosTarget,
    locale: &str,
    strings: &LocaleStrings,
    pipeline: &Pipeline,
) -> Result<Vec<WrittenFile>, Error> {
    let lproj = format!("{}.lproj", locale);
    let dir = target.resources_dir().join(&lproj);
    let mut written = Vec::new();

    for (group, map) in [
        (INFO_PLIST_STRINGS, &strings.info_plist),
        (LOCALIZABLE_STRINGS, &strings.app),
    ] {
        if map.is_empty() {
            debug!("No {} entries for {}; skipping", group, locale);
            continue;
        }

        fs::create_dir_all(&dir).map_err(|e| Error::writing(&dir, e))?;
        let path = dir.join(group);
        let bytes = Format::from_map(locale, map, pipeline).to_utf8_bytes()?;
        fs::write(&path, bytes).map_err(|e| Error::writing(&path, e))?;
        info!("Saved: {}", path.display());

        written.push(WrittenFile {
            locale: locale.to_string(),
            group,
            relative_path: format!("{}/{}", lproj, group),
            path,
        });
    }
    Ok(written)
}

/// Writes every locale's `.strings` files in parallel.
pub fn write_strings(
    target: &IosTarget,
    sources: &[TranslationSource],
) -> Result<Vec<WrittenFile>, Error> {
    let pipeline = Pipeline::apple_strings();
    let jobs: Vec<(String, LocaleStrings)> = strings_by_locale(sources).into_iter().collect();

    let results: Vec<Result<Vec<WrittenFile>, Error>> = jobs
        .par_iter()
        .map(|(locale, strings)| write_locale(target, locale, strings, &pipeline))
        .collect();

    let mut files = Vec::new();
    for result in results {
        files.extend(result?);
    }
    Ok(files)
}

/// Groups written files by variant group, in the order they were written.
pub fn localization_groups(files: &[WrittenFile]) -> LocalizationGroups {
    let mut groups = LocalizationGroups::default();
    for group in [LOCALIZABLE_STRINGS, INFO_PLIST_STRINGS] {
        for file in files.iter().filter(|file| file.group == group) {
            groups.add(group, file.relative_path.clone());
        }
    }
    groups
}

/// Writes all `.strings` files, then registers them in the Xcode project.
///
/// The project file is only touched after every string file was written.
pub fn convert(
    target: &IosTarget,
    sources: &[TranslationSource],
    cache: &dyn ProjectFileCache,
) -> Result<IosReport, Error> {
    let files = write_strings(target, sources)?;
    let groups = localization_groups(&files);

    let registration = if groups.is_empty() {
        debug!("No .strings files written; leaving the Xcode project alone");
        RegistrationReport::default()
    } else {
        xcode::update_project_file(&target.pbxproj, &target.platform_dir, &groups, cache)?
    };

    Ok(IosReport {
        files,
        registration,
    })
}
