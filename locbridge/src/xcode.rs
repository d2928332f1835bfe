//! Xcode project editing: localization variant groups for `.strings` files.

use std::{
    io::{BufRead, Write},
    path::Path,
};

use tracing::{debug, info, warn};

use crate::{
    error::Error,
    formats::pbxproj::{Dict, Plist, Text, Value},
    traits::Parser,
};

/// Something that holds a cached copy of the project file and must drop it
/// once the file changed on disk.
pub trait ProjectFileCache: Send + Sync {
    fn invalidate(&self, platform_dir: &Path);
}

/// For hosts that keep no cache.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoProjectCache;

impl ProjectFileCache for NoProjectCache {
    fn invalidate(&self, _platform_dir: &Path) {}
}

/// A parsed `project.pbxproj`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Project {
    plist: Plist,
}

impl Parser for Project {
    fn from_reader<R: BufRead>(mut reader: R) -> Result<Self, Error> {
        let mut source = String::new();
        reader.read_to_string(&mut source)?;
        let plist = Plist::parse(&source)?;
        if plist.root.get("objects").and_then(Value::as_dict).is_none() {
            return Err(Error::InvalidProject("missing `objects` dictionary".to_string()));
        }
        Ok(Project { plist })
    }

    fn to_writer<W: Write>(&self, mut writer: W) -> Result<(), Error> {
        writer.write_all(self.plist.render().as_bytes())?;
        Ok(())
    }
}

impl Project {
    pub fn plist(&self) -> &Plist {
        &self.plist
    }

    pub fn objects(&self) -> &Dict {
        self.plist
            .root
            .get("objects")
            .and_then(Value::as_dict)
            .expect("checked when the project was parsed")
    }

    fn objects_mut(&mut self) -> &mut Dict {
        self.plist
            .root
            .get_mut("objects")
            .and_then(Value::as_dict_mut)
            .expect("checked when the project was parsed")
    }

    pub fn object(&self, id: &str) -> Option<&Dict> {
        self.objects().get(id).and_then(Value::as_dict)
    }

    fn object_mut(&mut self, id: &str) -> Option<&mut Dict> {
        self.objects_mut().get_mut(id).and_then(Value::as_dict_mut)
    }

    /// Objects of one `isa`, in file order.
    pub fn objects_of<'a>(&'a self, isa: &'a str) -> impl Iterator<Item = (&'a str, &'a Dict)> {
        self.objects().iter().filter_map(move |(id, entry)| {
            let dict = entry.value.as_dict()?;
            (dict.get_str("isa").as_deref() == Some(isa)).then_some((id, dict))
        })
    }

    /// Id of the `PBXProject` object named by `rootObject`.
    pub fn root_object_id(&self) -> Result<String, Error> {
        self.plist
            .root
            .get("rootObject")
            .and_then(Value::as_text)
            .map(|text| text.value())
            .ok_or_else(|| Error::InvalidProject("missing `rootObject`".to_string()))
    }

    pub fn find_variant_group(&self, name: &str) -> Option<String> {
        self.objects_of("PBXVariantGroup")
            .find(|(_, group)| group.get_str("name").as_deref() == Some(name))
            .map(|(id, _)| id.to_string())
    }

    /// The `PBXGroup` named `Resources`, if the project has one.
    pub fn resources_group(&self) -> Option<String> {
        self.objects_of("PBXGroup")
            .find(|(_, group)| group.get_str("name").as_deref() == Some("Resources"))
            .map(|(id, _)| id.to_string())
    }

    /// Prefix that makes a path under `Resources/` relative to the variant group.
    ///
    /// A `Resources` group with its own `path` already points into the folder;
    /// otherwise paths resolve against the parent folder.
    pub fn resource_path_prefix(&self) -> &'static str {
        let has_path = self
            .resources_group()
            .and_then(|id| self.object(&id).map(|group| group.contains_key("path")))
            .unwrap_or(false);
        if has_path { "" } else { "Resources/" }
    }

    /// Whether any `PBXFileReference` already points at `path`.
    pub fn has_file_reference(&self, path: &str) -> bool {
        let wanted = normalize_reference(path);
        self.objects_of("PBXFileReference").any(|(_, file)| {
            file.get_str("path")
                .is_some_and(|existing| normalize_reference(&existing) == wanted)
        })
    }

    /// Creates a `PBXVariantGroup`, files it under `Resources` and adds it to
    /// the resources build phase. Returns the group id.
    pub fn add_localization_variant_group(&mut self, name: &str) -> Result<String, Error> {
        let group_id = self.generate_id();
        let group = Dict::new()
            .with("isa", Value::text("PBXVariantGroup"))
            .with("children", Value::Array(Vec::new()))
            .with("name", Value::text(name))
            .with("sourceTree", Value::text("<group>"));
        self.objects_mut().insert(
            Text::new(&group_id).with_comment(name),
            Value::Dict(group),
        );

        let parent = match self.resources_group() {
            Some(id) => id,
            None => self.main_group_id()?,
        };
        self.push_child(&parent, "children", Text::new(&group_id).with_comment(name))?;

        let build_comment = format!("{} in Resources", name);
        match self.resources_build_phase() {
            Some(phase_id) => {
                let build_file_id = self.generate_id();
                let build_file = Dict::new()
                    .with("isa", Value::text("PBXBuildFile"))
                    .with(
                        "fileRef",
                        Value::Text(Text::new(&group_id).with_comment(name)),
                    );
                self.objects_mut().insert(
                    Text::new(&build_file_id).with_comment(build_comment.as_str()),
                    Value::Dict(build_file),
                );
                self.push_child(
                    &phase_id,
                    "files",
                    Text::new(&build_file_id).with_comment(build_comment.as_str()),
                )?;
            }
            None => warn!("No resources build phase; `{}` is not copied into the bundle", name),
        }

        debug!("Created variant group {} ({})", name, group_id);
        Ok(group_id)
    }

    /// Adds a `.strings` variant for `locale` to a variant group. Returns the
    /// new file reference id.
    pub fn add_variant_file(
        &mut self,
        group_id: &str,
        locale: &str,
        path: &str,
    ) -> Result<String, Error> {
        if self.object(group_id).is_none() {
            return Err(Error::InvalidProject(format!(
                "variant group {} does not exist",
                group_id
            )));
        }

        let file_id = self.generate_id();
        let file = Dict::new()
            .with("isa", Value::text("PBXFileReference"))
            .with("lastKnownFileType", Value::text("text.plist.strings"))
            .with("name", Value::text(locale))
            .with("path", Value::text(path))
            .with("sourceTree", Value::text("<group>"));
        self.objects_mut()
            .insert(Text::new(&file_id).with_comment(locale), Value::Dict(file));
        self.push_child(group_id, "children", Text::new(&file_id).with_comment(locale))?;
        Ok(file_id)
    }

    /// Adds `locale` to the project's `knownRegions`. Returns whether it was missing.
    pub fn add_known_region(&mut self, locale: &str) -> Result<bool, Error> {
        let root_id = self.root_object_id()?;
        let project = self
            .object_mut(&root_id)
            .ok_or_else(|| Error::InvalidProject(format!("root object {} not found", root_id)))?;

        if !project.contains_key("knownRegions") {
            project.insert(Text::new("knownRegions"), Value::Array(Vec::new()));
        }
        let regions = project
            .get_mut("knownRegions")
            .and_then(Value::as_array_mut)
            .ok_or_else(|| Error::InvalidProject("`knownRegions` is not a list".to_string()))?;

        let known = regions
            .iter()
            .filter_map(Value::as_text)
            .any(|region| region.value() == locale);
        if !known {
            regions.push(Value::text(locale));
        }
        Ok(!known)
    }

    fn main_group_id(&self) -> Result<String, Error> {
        let root_id = self.root_object_id()?;
        self.object(&root_id)
            .and_then(|project| project.get_str("mainGroup"))
            .ok_or_else(|| Error::InvalidProject("project has no main group".to_string()))
    }

    // Resources phase of the first target, else the first one in the file.
    fn resources_build_phase(&self) -> Option<String> {
        let is_resources = |id: &str| -> bool {
            self.object(id)
                .and_then(|phase| phase.get_str("isa"))
                .as_deref()
                == Some("PBXResourcesBuildPhase")
        };

        let first_target = self
            .root_object_id()
            .ok()
            .and_then(|root| self.object(&root))
            .and_then(|project| project.get("targets"))
            .and_then(Value::as_array)
            .and_then(|targets| targets.first())
            .and_then(Value::as_text)
            .map(Text::value);

        let from_target = first_target
            .and_then(|target| self.object(&target))
            .and_then(|target| target.get("buildPhases"))
            .and_then(Value::as_array)
            .and_then(|phases| {
                phases
                    .iter()
                    .filter_map(Value::as_text)
                    .map(Text::value)
                    .find(|id| is_resources(id.as_str()))
            });

        from_target.or_else(|| {
            self.objects_of("PBXResourcesBuildPhase")
                .next()
                .map(|(id, _)| id.to_string())
        })
    }

    fn push_child(&mut self, owner_id: &str, list: &str, child: Text) -> Result<(), Error> {
        let owner = self
            .object_mut(owner_id)
            .ok_or_else(|| Error::InvalidProject(format!("object {} not found", owner_id)))?;
        if !owner.contains_key(list) {
            owner.insert(Text::new(list), Value::Array(Vec::new()));
        }
        owner
            .get_mut(list)
            .and_then(Value::as_array_mut)
            .ok_or_else(|| Error::InvalidProject(format!("`{}` of {} is not a list", list, owner_id)))?
            .push(Value::Text(child));
        Ok(())
    }

    /// A fresh 24 hex digit object id.
    fn generate_id(&self) -> String {
        loop {
            let id = uuid::Uuid::new_v4().simple().to_string().to_uppercase()[..24].to_string();
            if !self.objects().contains_key(&id) {
                return id;
            }
        }
    }
}

/// Strips quotes, `./` and a leading `Resources/` so equivalent references compare equal.
pub fn normalize_reference(path: &str) -> String {
    let trimmed = path.trim().trim_matches(|c| c == '"' || c == '\'');
    let trimmed = trimmed.strip_prefix("./").unwrap_or(trimmed);
    trimmed
        .strip_prefix("Resources/")
        .unwrap_or(trimmed)
        .to_string()
}

/// `.strings` files written during one run, per variant group name.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct LocalizationGroups {
    /// `(group name, relative paths like "fr.lproj/Localizable.strings")`
    pub groups: Vec<(String, Vec<String>)>,
}

impl LocalizationGroups {
    pub fn add(&mut self, group: &str, path: String) {
        match self.groups.iter_mut().find(|(name, _)| name == group) {
            Some((_, paths)) => {
                if !paths.contains(&path) {
                    paths.push(path);
                }
            }
            None => self.groups.push((group.to_string(), vec![path])),
        }
    }

    pub fn paths(&self, group: &str) -> &[String] {
        self.groups
            .iter()
            .find(|(name, _)| name == group)
            .map(|(_, paths)| paths.as_slice())
            .unwrap_or_default()
    }

    pub fn is_empty(&self) -> bool {
        self.groups.iter().all(|(_, paths)| paths.is_empty())
    }
}

/// What [`register_localizations`] changed.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct RegistrationReport {
    pub created_groups: Vec<String>,
    pub added_files: Vec<String>,
    pub added_regions: Vec<String>,
}

impl RegistrationReport {
    pub fn is_unchanged(&self) -> bool {
        self.created_groups.is_empty()
            && self.added_files.is_empty()
            && self.added_regions.is_empty()
    }
}

/// Registers every written `.strings` file in its variant group.
///
/// Files already referenced by the project are left alone, so running this
/// twice with the same input changes nothing the second time.
pub fn register_localizations(
    project: &mut Project,
    written: &LocalizationGroups,
) -> Result<RegistrationReport, Error> {
    let mut report = RegistrationReport::default();
    let prefix = project.resource_path_prefix();

    for (group_name, paths) in &written.groups {
        if paths.is_empty() {
            continue;
        }

        let group_id = match project.find_variant_group(group_name) {
            Some(id) => id,
            None => {
                let id = project.add_localization_variant_group(group_name)?;
                report.created_groups.push(group_name.clone());
                id
            }
        };

        for path in paths {
            let locale = locale_of(path)?;
            if !project.has_file_reference(path) {
                project.add_variant_file(&group_id, locale, &format!("{}{}", prefix, path))?;
                report.added_files.push(path.clone());
            }
            if project.add_known_region(locale)? {
                report.added_regions.push(locale.to_string());
            }
        }
    }
    Ok(report)
}

/// Reads the project file, registers `written`, writes it back once and
/// invalidates the host's cached copy.
pub fn update_project_file(
    pbxproj: &Path,
    platform_dir: &Path,
    written: &LocalizationGroups,
    cache: &dyn ProjectFileCache,
) -> Result<RegistrationReport, Error> {
    let mut project = Project::read_from(pbxproj)?;
    let report = register_localizations(&mut project, written)?;
    project.write_to(pbxproj)?;
    info!("New pbx project written with localization groups: {}", pbxproj.display());

    cache.invalidate(platform_dir);
    Ok(report)
}

// `fr.lproj/Localizable.strings` -> `fr`
fn locale_of(path: &str) -> Result<&str, Error> {
    path.split('/')
        .find_map(|segment| segment.strip_suffix(".lproj"))
        .filter(|locale| !locale.is_empty())
        .ok_or_else(|| Error::InvalidResource(format!("`{}` is not inside a .lproj folder", path)))
}
