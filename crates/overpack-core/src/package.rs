use crate::code::CodeEntry;
use crate::component::{Component, ComponentId, ComponentLoadError, ConfigurationComponent};
use crate::options::{LoadMode, LoadOptions, SaveOptions};
use crate::CoreError;
use overpack_schema::{EntryDescriptor, EntryKind, Manifest, ManifestError, MANIFEST_PATH};
use overpack_store::{
    verify_archive, Archive, ArchiveEntry, ArchiveFormat, IntegrityFailure, IntegrityIssue,
};
use rayon::prelude::*;
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::path::Path;
use thiserror::Error;
use tracing::{debug, info, warn};

/// One entry that could not be loaded.
#[derive(Debug, Error)]
pub enum LoadFailure {
    #[error("integrity error: {0}")]
    Integrity(#[from] IntegrityFailure),
    #[error(transparent)]
    Component(#[from] ComponentLoadError),
}

impl LoadFailure {
    /// Archive path of the failing entry.
    pub fn path(&self) -> &str {
        match self {
            Self::Integrity(f) => &f.path,
            Self::Component(e) => &e.path,
        }
    }
}

/// Every failure met during one load, in manifest order with orphans last.
#[derive(Debug, Default)]
pub struct LoadFailures(Vec<LoadFailure>);

impl LoadFailures {
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, LoadFailure> {
        self.0.iter()
    }

    pub fn into_vec(self) -> Vec<LoadFailure> {
        self.0
    }
}

impl fmt::Display for LoadFailures {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} entr", self.0.len())?;
        f.write_str(if self.0.len() == 1 { "y" } else { "ies" })?;
        f.write_str(" failed to load")?;
        for failure in &self.0 {
            write!(f, "\n  {failure}")?;
        }
        Ok(())
    }
}

impl<'a> IntoIterator for &'a LoadFailures {
    type Item = &'a LoadFailure;
    type IntoIter = std::slice::Iter<'a, LoadFailure>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

/// Result of `Package::load_with`. `failures` is empty for strict loads.
#[derive(Debug)]
pub struct LoadOutcome {
    pub package: Package,
    pub failures: LoadFailures,
}

enum Loaded {
    Component(Component),
    Code(CodeEntry),
}

fn decode_entry(descriptor: &EntryDescriptor, bytes: &[u8]) -> Result<Loaded, ComponentLoadError> {
    match descriptor.kind {
        EntryKind::Code => Ok(Loaded::Code(CodeEntry::from_entry(descriptor, bytes))),
        EntryKind::Configuration | EntryKind::Data => {
            Component::from_entry(descriptor, bytes).map(Loaded::Component)
        }
    }
}

/// A manifest together with the components and code entries it declares.
///
/// Every mutator keeps the manifest and the payload set in step: each
/// manifest entry has exactly one owner and every owner has an entry.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Package {
    manifest: Manifest,
    components: Vec<Component>,
    codes: Vec<CodeEntry>,
    format: ArchiveFormat,
}

impl Package {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load strictly: any failing entry aborts with the full failure list.
    pub fn load(path: &Path) -> Result<Self, CoreError> {
        Self::load_with(path, &LoadOptions::default()).map(|outcome| outcome.package)
    }

    pub fn load_with(path: &Path, options: &LoadOptions) -> Result<LoadOutcome, CoreError> {
        info!("loading package {}", path.display());
        let archive = Archive::open(path)?;
        let manifest_bytes = archive
            .get(MANIFEST_PATH)
            .ok_or_else(|| ManifestError::NotFound(MANIFEST_PATH.to_owned()))?;
        let mut manifest = Manifest::parse(manifest_bytes)?;

        let report = verify_archive(&archive, &manifest);
        debug!(
            "integrity: {} checked, {} passed, {} failed",
            report.checked,
            report.passed,
            report.failed.len()
        );

        // Entries that failed integrity are not decoded.
        let decode = |descriptor: &EntryDescriptor| -> Option<Result<Loaded, ComponentLoadError>> {
            if report.entry_failed(descriptor.index) {
                return None;
            }
            let bytes = archive.get(&descriptor.path)?;
            Some(decode_entry(descriptor, bytes))
        };
        let decoded: Vec<Option<Result<Loaded, ComponentLoadError>>> = if options.parallel {
            manifest.entries().par_iter().map(decode).collect()
        } else {
            manifest.iter().map(decode).collect()
        };

        let mut integrity: HashMap<usize, IntegrityFailure> = HashMap::new();
        let mut orphans = Vec::new();
        for failure in report.failed {
            match failure.index {
                Some(index) => {
                    integrity.insert(index, failure);
                }
                None => orphans.push(LoadFailure::Integrity(failure)),
            }
        }

        let mut failures = Vec::new();
        let mut loaded_paths = HashSet::new();
        let mut components = Vec::new();
        let mut codes = Vec::new();
        for (index, result) in decoded.into_iter().enumerate() {
            match result {
                Some(Ok(Loaded::Component(component))) => {
                    loaded_paths.insert(component.path().to_string());
                    components.push(component);
                }
                Some(Ok(Loaded::Code(code))) => {
                    loaded_paths.insert(code.path.to_string());
                    codes.push(code);
                }
                Some(Err(e)) => failures.push(LoadFailure::Component(e)),
                None => {
                    if let Some(failure) = integrity.remove(&index) {
                        failures.push(LoadFailure::Integrity(failure));
                    }
                }
            }
        }
        failures.extend(orphans);

        if !failures.is_empty() {
            match options.mode {
                LoadMode::Strict => return Err(CoreError::Load(LoadFailures(failures))),
                LoadMode::Lenient => {
                    for failure in &failures {
                        warn!("skipping entry {}: {failure}", failure.path());
                    }
                    manifest.retain(|entry| loaded_paths.contains(entry.path.as_str()));
                }
            }
        }

        info!(
            "loaded {} components and {} code entries from {}",
            components.len(),
            codes.len(),
            path.display()
        );
        let package = Self {
            manifest,
            components,
            codes,
            format: archive.format(),
        };
        for drifted in package.drifted_components() {
            warn!(
                "component {} is not in canonical form and will be normalized on save",
                drifted.id()
            );
        }
        Ok(LoadOutcome {
            package,
            failures: LoadFailures(failures),
        })
    }

    /// Write the package in the format it was loaded from.
    pub fn save(&self, path: &Path) -> Result<(), CoreError> {
        self.save_as(path, self.format)
    }

    pub fn save_with(&self, path: &Path, options: &SaveOptions) -> Result<(), CoreError> {
        self.save_as(path, options.format.unwrap_or(self.format))
    }

    /// Re-derive every descriptor from the current payloads and write the
    /// manifest entry followed by the payloads in manifest order.
    pub fn save_as(&self, path: &Path, format: ArchiveFormat) -> Result<(), CoreError> {
        info!("saving package to {} as {format:?}", path.display());
        let (manifest, payloads) = self.derive_entries()?;

        let mut entries = Vec::with_capacity(payloads.len() + 1);
        entries.push(ArchiveEntry::new(MANIFEST_PATH, manifest.serialize()?));
        entries.extend(payloads);
        Archive::write(path, format, &entries)?;

        info!("saved {} entries to {}", manifest.len(), path.display());
        Ok(())
    }

    fn derive_entries(&self) -> Result<(Manifest, Vec<ArchiveEntry>), CoreError> {
        let mut failures = Vec::new();
        let mut owners: HashMap<String, (EntryDescriptor, Vec<u8>)> = HashMap::new();
        let derived = self
            .components
            .iter()
            .map(|c| (c.descriptor(), c.to_entry()))
            .chain(self.codes.iter().map(|c| (c.descriptor(), c.payload.clone())));
        for (descriptor, payload) in derived {
            let path = descriptor.path.to_string();
            if owners.contains_key(&path) {
                failures.push(IntegrityFailure {
                    index: None,
                    path,
                    issue: IntegrityIssue::DuplicatePath,
                });
            } else {
                owners.insert(path, (descriptor, payload));
            }
        }

        let mut descriptors = Vec::with_capacity(self.manifest.len());
        let mut payloads = Vec::with_capacity(self.manifest.len());
        for entry in &self.manifest {
            match owners.remove(entry.path.as_str()) {
                Some((descriptor, payload)) => {
                    payloads.push(ArchiveEntry::new(entry.path.as_str(), payload));
                    descriptors.push(descriptor);
                }
                None => failures.push(IntegrityFailure {
                    index: Some(entry.index),
                    path: entry.path.to_string(),
                    issue: IntegrityIssue::MissingPayload,
                }),
            }
        }
        let mut orphans: Vec<String> = owners.into_keys().collect();
        orphans.sort();
        failures.extend(orphans.into_iter().map(|path| IntegrityFailure {
            index: None,
            path,
            issue: IntegrityIssue::Orphan,
        }));

        if !failures.is_empty() {
            return Err(CoreError::Integrity(failures));
        }
        Ok((Manifest::from_entries(descriptors)?, payloads))
    }

    pub fn add_component(&mut self, component: impl Into<Component>) -> Result<(), CoreError> {
        let component = component.into();
        let id = component.id();
        if self.position_of(&id).is_some() {
            return Err(CoreError::DuplicateComponent(id));
        }
        self.claim_path(component.path())?;
        self.manifest.push(component.descriptor())?;
        debug!("added component {id} at {}", component.path());
        self.components.push(component);
        Ok(())
    }

    pub fn remove_component(&mut self, id: &ComponentId) -> Result<Component, CoreError> {
        let position = self
            .position_of(id)
            .ok_or_else(|| CoreError::ComponentNotFound(id.clone()))?;
        let component = self.components.remove(position);
        self.manifest.remove(component.path());
        debug!("removed component {id}");
        Ok(component)
    }

    /// Swap in `new` for the component `id`, keeping its manifest position.
    pub fn replace_component(
        &mut self,
        id: &ComponentId,
        new: impl Into<Component>,
    ) -> Result<Component, CoreError> {
        let new = new.into();
        let position = self
            .position_of(id)
            .ok_or_else(|| CoreError::ComponentNotFound(id.clone()))?;
        let new_id = new.id();
        if new_id != *id && self.position_of(&new_id).is_some() {
            return Err(CoreError::DuplicateComponent(new_id));
        }
        let old_path = self.components[position].path().clone();
        if *new.path() != old_path {
            self.claim_path(new.path())?;
        }
        let slot = self
            .manifest
            .position(&old_path)
            .ok_or_else(|| ManifestError::NotFound(old_path.to_string()))?;
        self.manifest.replace(slot, new.descriptor())?;
        debug!("replaced component {id} with {new_id}");
        Ok(std::mem::replace(&mut self.components[position], new))
    }

    /// Apply `edit` to a copy of the component and swap the result in.
    pub fn edit_component<F>(&mut self, id: &ComponentId, edit: F) -> Result<(), CoreError>
    where
        F: FnOnce(&mut Component),
    {
        let mut edited = self
            .component(id)
            .cloned()
            .ok_or_else(|| CoreError::ComponentNotFound(id.clone()))?;
        edit(&mut edited);
        self.replace_component(id, edited)?;
        Ok(())
    }

    pub fn add_code(&mut self, code: CodeEntry) -> Result<(), CoreError> {
        self.claim_path(&code.path)?;
        self.manifest.push(code.descriptor())?;
        debug!("added code entry {}", code.path);
        self.codes.push(code);
        Ok(())
    }

    pub fn remove_code(&mut self, path: &str) -> Result<CodeEntry, CoreError> {
        let position = self
            .codes
            .iter()
            .position(|c| c.path == path)
            .ok_or_else(|| CoreError::CodeNotFound(path.to_owned()))?;
        let code = self.codes.remove(position);
        self.manifest.remove(path);
        debug!("removed code entry {path}");
        Ok(code)
    }

    pub fn manifest(&self) -> &Manifest {
        &self.manifest
    }

    pub fn components(&self) -> &[Component] {
        &self.components
    }

    pub fn component(&self, id: &ComponentId) -> Option<&Component> {
        self.position_of(id).map(|i| &self.components[i])
    }

    pub fn codes(&self) -> &[CodeEntry] {
        &self.codes
    }

    pub fn code(&self, path: &str) -> Option<&CodeEntry> {
        self.codes.iter().find(|c| c.path == path)
    }

    /// Container format used by `save`.
    pub fn format(&self) -> ArchiveFormat {
        self.format
    }

    pub fn set_format(&mut self, format: ArchiveFormat) {
        self.format = format;
    }

    /// Configuration components whose loaded text was not canonical.
    pub fn drifted_components(&self) -> impl Iterator<Item = &ConfigurationComponent> {
        self.components
            .iter()
            .filter_map(Component::as_configuration)
            .filter(|c| c.has_drift())
    }

    fn position_of(&self, id: &ComponentId) -> Option<usize> {
        self.components
            .iter()
            .position(|c| c.component_type() == id.component_type && c.name() == id.name)
    }

    fn claim_path(&self, path: &str) -> Result<(), CoreError> {
        if path == MANIFEST_PATH || self.manifest.get(path).is_some() {
            return Err(CoreError::DuplicatePath(path.to_owned()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::component::DataComponent;
    use overpack_mdl::{parse, Value};

    fn config(name: &str, body: &str) -> ConfigurationComponent {
        ConfigurationComponent::new("Object", name, parse(body).unwrap())
    }

    fn sample() -> Package {
        let mut pkg = Package::new();
        pkg.add_component(config("a", "label = \"A\"\n")).unwrap();
        pkg.add_component(DataComponent::new("Table", "b", "x,y\n"))
            .unwrap();
        pkg.add_code(CodeEntry::new("Main.java", "java", "class Main {}"))
            .unwrap();
        pkg.add_component(config("c", "label = \"C\"\n")).unwrap();
        pkg
    }

    #[test]
    fn mutators_keep_manifest_in_step() {
        let pkg = sample();
        let paths: Vec<&str> = pkg.manifest().iter().map(|e| e.path.as_str()).collect();
        assert_eq!(
            paths,
            [
                "components/Object.a.mdl",
                "components/Table.b.dat",
                "code/Main.java",
                "components/Object.c.mdl",
            ]
        );
        assert_eq!(pkg.components().len(), 3);
        assert_eq!(pkg.codes().len(), 1);
        pkg.manifest().validate().unwrap();
    }

    #[test]
    fn duplicate_identity_rejected() {
        let mut pkg = sample();
        let dup = config("a", "x = 1\n").with_path("elsewhere.mdl");
        assert!(matches!(
            pkg.add_component(dup),
            Err(CoreError::DuplicateComponent(_))
        ));
        assert_eq!(pkg.manifest().len(), 4);
    }

    #[test]
    fn duplicate_path_rejected() {
        let mut pkg = sample();
        let clash = config("z", "x = 1\n").with_path("code/Main.java");
        assert!(matches!(
            pkg.add_component(clash),
            Err(CoreError::DuplicatePath(_))
        ));
        let code = CodeEntry::new("x", "java", "").with_path(MANIFEST_PATH);
        assert!(matches!(
            pkg.add_code(code),
            Err(CoreError::DuplicatePath(_))
        ));
    }

    #[test]
    fn remove_component_renumbers_manifest() {
        let mut pkg = sample();
        let removed = pkg
            .remove_component(&ComponentId::new("Table", "b"))
            .unwrap();
        assert_eq!(removed.name(), "b");
        assert_eq!(pkg.manifest().len(), 3);
        assert_eq!(pkg.manifest().entries()[2].index, 2);
        assert!(pkg.manifest().get("components/Table.b.dat").is_none());

        let err = pkg
            .remove_component(&ComponentId::new("Table", "b"))
            .unwrap_err();
        assert!(matches!(err, CoreError::ComponentNotFound(_)));
    }

    #[test]
    fn replace_component_keeps_position() {
        let mut pkg = sample();
        let id = ComponentId::new("Object", "a");
        let replacement = config("a", "label = \"Alpha\"\n");
        pkg.replace_component(&id, replacement).unwrap();

        let entry = &pkg.manifest().entries()[0];
        assert_eq!(entry.path, "components/Object.a.mdl");
        assert!(entry.matches(b"label = \"Alpha\"\n"));
    }

    #[test]
    fn replace_with_existing_identity_rejected() {
        let mut pkg = sample();
        let err = pkg
            .replace_component(&ComponentId::new("Object", "a"), config("c", "x = 1\n"))
            .unwrap_err();
        assert!(matches!(err, CoreError::DuplicateComponent(_)));
    }

    #[test]
    fn edit_component_refreshes_descriptor() {
        let mut pkg = sample();
        let id = ComponentId::new("Object", "c");
        pkg.edit_component(&id, |c| {
            if let Some(config) = c.as_configuration_mut() {
                *config.document.lookup_value_mut(&["label"]).unwrap() = Value::string("Gamma");
            }
        })
        .unwrap();

        let entry = pkg.manifest().get("components/Object.c.mdl").unwrap();
        assert!(entry.matches(b"label = \"Gamma\"\n"));
        assert_eq!(entry.index, 3);
    }

    #[test]
    fn remove_code() {
        let mut pkg = sample();
        let code = pkg.remove_code("code/Main.java").unwrap();
        assert_eq!(code.kind, "java");
        assert!(pkg.code("code/Main.java").is_none());
        assert!(matches!(
            pkg.remove_code("code/Main.java"),
            Err(CoreError::CodeNotFound(_))
        ));
    }

    #[test]
    fn save_and_load_roundtrip() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.vpk");
        let pkg = sample();
        pkg.save(&path).unwrap();

        let loaded = Package::load(&path).unwrap();
        assert_eq!(loaded, pkg);
        assert_eq!(loaded.format(), ArchiveFormat::Zip);
    }

    #[test]
    fn save_with_overrides_format() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("pkg.tar");
        let options = SaveOptions {
            format: Some(ArchiveFormat::Tar),
        };
        sample().save_with(&path, &options).unwrap();
        assert_eq!(Package::load(&path).unwrap().format(), ArchiveFormat::Tar);
    }

    #[test]
    fn load_failures_display_lists_each_entry() {
        let failures = LoadFailures(vec![LoadFailure::Integrity(IntegrityFailure {
            index: Some(1),
            path: "components/2.mdl".to_owned(),
            issue: IntegrityIssue::MissingPayload,
        })]);
        let text = failures.to_string();
        assert!(text.starts_with("1 entry failed to load"));
        assert!(text.contains("components/2.mdl"));
    }
}
