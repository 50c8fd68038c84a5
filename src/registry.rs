//! Schema Registry
//!
//! Discovers naming schema documents under a schema source, groups them by
//! family, and resolves family/version lookups. Parsed documents, compiled
//! schemas and compiled regexes are cached per registry instance; a fresh
//! registry starts with empty caches and [`SchemaRegistry::clear_cache`]
//! drops all of them at once.

use std::collections::{BTreeMap, HashSet};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use include_dir::{include_dir, Dir};
use serde::Serialize;
use walkdir::WalkDir;

use crate::cache::{Memo, PatternCache, Slot};
use crate::config::RegistryConfig;
use crate::error::{RegistryError, SchemaLoadError};
use crate::field::FieldConstraint;
use crate::matcher::CompiledSchema;
use crate::schema::{family_from_schema_id, SchemaDocument, SchemaKey, SchemaLocation, STATUS_CURRENT};
use crate::version::SchemaVersion;

/// Schema documents compiled into the binary
pub static BUNDLED_SCHEMAS: Dir<'static> = include_dir!("$CARGO_MANIFEST_DIR/schemas");

/// Substring a file name must contain to be treated as a naming schema
pub const DEFAULT_FILE_MARKER: &str = "filename_v";

/// Number of schema paths listed in a no-match error
pub const DEFAULT_PREVIEW_LIMIT: usize = 8;

/// Where schema documents are read from
#[derive(Debug, Clone)]
pub enum SchemaSource {
    /// A directory scanned recursively
    Directory(PathBuf),
    /// A directory tree embedded with `include_dir!`
    Embedded(&'static Dir<'static>),
}

impl SchemaSource {
    /// Human-readable root, used in error messages
    pub fn label(&self) -> String {
        match self {
            SchemaSource::Directory(root) => root.display().to_string(),
            SchemaSource::Embedded(_) => "<bundled schemas>".to_string(),
        }
    }

    /// Candidate schema documents, sorted by path
    fn scan(&self, marker: &str) -> Vec<SchemaLocation> {
        let mut locations = match self {
            SchemaSource::Directory(root) => WalkDir::new(root)
                .into_iter()
                .filter_map(|e| e.ok())
                .filter(|e| e.file_type().is_file())
                .filter(|e| is_schema_file(e.path(), marker))
                .map(|e| SchemaLocation::File(e.path().to_path_buf()))
                .collect::<Vec<_>>(),
            SchemaSource::Embedded(dir) => {
                let mut paths = Vec::new();
                collect_embedded_files(dir, marker, &mut paths);
                paths.into_iter().map(SchemaLocation::Bundled).collect()
            }
        };
        locations.sort();
        locations
    }

    fn read(&self, location: &SchemaLocation) -> Result<String, SchemaLoadError> {
        match (self, location) {
            (SchemaSource::Embedded(dir), SchemaLocation::Bundled(path)) => dir
                .get_file(path)
                .and_then(|file| file.contents_utf8())
                .map(str::to_string)
                .ok_or_else(|| SchemaLoadError::NotBundled {
                    location: location.to_string(),
                }),
            (_, location) => {
                fs::read_to_string(location.path()).map_err(|source| SchemaLoadError::Io {
                    location: location.to_string(),
                    source,
                })
            }
        }
    }

    /// Location for a caller-supplied path
    ///
    /// Relative paths are taken relative to the source root unless they
    /// already start with it.
    pub fn resolve(&self, path: &Path) -> SchemaLocation {
        match self {
            SchemaSource::Directory(root) if path.is_relative() && !path.starts_with(root) => {
                SchemaLocation::File(root.join(path))
            }
            SchemaSource::Directory(_) => SchemaLocation::File(path.to_path_buf()),
            SchemaSource::Embedded(_) => SchemaLocation::Bundled(path.to_path_buf()),
        }
    }

    /// Path of `location` relative to the source root
    pub fn relative(&self, location: &SchemaLocation) -> String {
        match (self, location) {
            (SchemaSource::Directory(root), SchemaLocation::File(path)) => path
                .strip_prefix(root)
                .unwrap_or(path)
                .display()
                .to_string(),
            (_, location) => location.path().display().to_string(),
        }
    }
}

fn is_schema_file(path: &Path, marker: &str) -> bool {
    path.file_name()
        .and_then(|n| n.to_str())
        .map(|n| n.contains(marker) && n.ends_with(".json"))
        .unwrap_or(false)
}

fn collect_embedded_files(dir: &Dir<'static>, marker: &str, paths: &mut Vec<PathBuf>) {
    for file in dir.files() {
        if is_schema_file(file.path(), marker) {
            paths.push(file.path().to_path_buf());
        }
    }
    for subdir in dir.dirs() {
        collect_embedded_files(subdir, marker, paths);
    }
}

/// One version of a family
#[derive(Debug, Clone, Serialize)]
pub struct VersionEntry {
    pub location: SchemaLocation,
    pub status: String,
}

/// Everything discovery knows about one family
#[derive(Debug, Clone, Serialize)]
pub struct FamilyInfo {
    pub family: String,
    /// Filename prefixes that hint at this family
    pub tokens: Vec<String>,
    pub versions: BTreeMap<SchemaVersion, VersionEntry>,
    pub current_version: SchemaVersion,
    pub current_location: SchemaLocation,
}

impl FamilyInfo {
    /// Version entry matching `version` (`v` prefix and semver equality tolerated)
    pub fn version(&self, version: &str) -> Option<(&SchemaVersion, &VersionEntry)> {
        self.versions.iter().find(|(v, _)| v.matches(version))
    }

    fn available(&self) -> Vec<String> {
        self.versions.keys().map(ToString::to_string).collect()
    }
}

/// Hint tokens for a family: itself, plus `SENTINEL-<n><suffix>` for `S<n><suffix>`
pub fn family_tokens(family: &str) -> Vec<String> {
    let mut tokens = vec![family.to_string()];
    if let Some(rest) = family.strip_prefix('S') {
        let digits: String = rest.chars().take_while(|c| c.is_ascii_digit()).collect();
        let suffix = &rest[digits.len()..];
        if !digits.is_empty() && suffix.chars().all(|c| c.is_ascii_uppercase()) {
            tokens.push(format!("SENTINEL-{}{}", digits, suffix));
        }
    }
    tokens
}

/// Result of scanning a schema source
#[derive(Debug, Clone, Default)]
pub struct Discovery {
    /// Every candidate document, sorted, including unreadable ones
    pub locations: Vec<SchemaLocation>,
    /// Families in discovery order
    pub families: Vec<FamilyInfo>,
}

impl Discovery {
    pub fn family(&self, family: &str) -> Option<&FamilyInfo> {
        let family = family.trim().to_uppercase();
        self.families.iter().find(|info| info.family == family)
    }

    /// First family, in discovery order, one of whose tokens prefixes `name`
    pub fn guess_family(&self, name: &str) -> Option<&FamilyInfo> {
        let upper = name.to_uppercase();
        self.families
            .iter()
            .find(|info| info.tokens.iter().any(|token| upper.starts_with(token.as_str())))
    }

    /// Family and version a discovered location belongs to
    pub fn lookup(&self, location: &SchemaLocation) -> Option<(&FamilyInfo, &SchemaVersion, &VersionEntry)> {
        self.families.iter().find_map(|info| {
            info.versions
                .iter()
                .find(|(_, entry)| &entry.location == location)
                .map(|(version, entry)| (info, version, entry))
        })
    }
}

/// A loaded and compiled schema
#[derive(Debug, Clone)]
pub struct LoadedSchema {
    pub location: SchemaLocation,
    pub document: Arc<SchemaDocument>,
    pub compiled: Arc<CompiledSchema>,
}

/// Summary row of [`SchemaRegistry::list_versions`]
#[derive(Debug, Clone, Serialize)]
pub struct VersionSummary {
    pub version: String,
    pub status: String,
    pub current: bool,
    pub path: String,
}

/// Field metadata in a schema description
#[derive(Debug, Clone, Serialize)]
pub struct FieldDescription {
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub kind: Option<String>,
    #[serde(rename = "enum", skip_serializing_if = "Option::is_none")]
    pub values: Option<Vec<String>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pattern: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

/// Metadata returned by [`SchemaRegistry::describe`]
#[derive(Debug, Clone, Serialize)]
pub struct SchemaDescription {
    pub family: String,
    pub schema_id: String,
    pub schema_version: String,
    pub status: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub template: String,
    pub fields: BTreeMap<String, FieldDescription>,
    pub examples: Vec<String>,
    pub path: String,
}

/// A fuzzy family search hit
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FamilyMatch {
    pub family: String,
    pub score: i64,
}

/// Naming schema registry over one schema source
#[derive(Debug)]
pub struct SchemaRegistry {
    source: SchemaSource,
    file_marker: String,
    preview_limit: usize,
    discovery: Slot<Arc<Discovery>>,
    documents: Memo<SchemaLocation, Arc<SchemaDocument>>,
    compiled: Memo<SchemaKey, Arc<CompiledSchema>>,
    patterns: PatternCache,
}

impl SchemaRegistry {
    pub fn new(source: SchemaSource) -> Self {
        Self {
            source,
            file_marker: DEFAULT_FILE_MARKER.to_string(),
            preview_limit: DEFAULT_PREVIEW_LIMIT,
            discovery: Slot::new(),
            documents: Memo::new(),
            compiled: Memo::new(),
            patterns: PatternCache::new(),
        }
    }

    /// Registry over a schema directory
    pub fn open(root: impl AsRef<Path>) -> Self {
        Self::new(SchemaSource::Directory(root.as_ref().to_path_buf()))
    }

    /// Registry over the schemas shipped with the crate
    pub fn bundled() -> Self {
        Self::new(SchemaSource::Embedded(&BUNDLED_SCHEMAS))
    }

    /// Registry as described by configuration; no schema root means bundled
    pub fn from_config(config: &RegistryConfig) -> Self {
        let registry = match &config.schema_root {
            Some(root) => Self::open(root),
            None => Self::bundled(),
        };
        registry
            .with_file_marker(&config.file_marker)
            .with_preview_limit(config.preview_limit)
    }

    pub fn with_file_marker(mut self, marker: impl Into<String>) -> Self {
        self.file_marker = marker.into();
        self
    }

    pub fn with_preview_limit(mut self, limit: usize) -> Self {
        self.preview_limit = limit;
        self
    }

    pub fn source(&self) -> &SchemaSource {
        &self.source
    }

    pub fn preview_limit(&self) -> usize {
        self.preview_limit
    }

    pub fn patterns(&self) -> &PatternCache {
        &self.patterns
    }

    /// Scan the source and group documents by family (cached)
    pub fn discover(&self) -> Result<Arc<Discovery>, RegistryError> {
        self.discovery
            .get_or_try_init(|| self.scan_families().map(Arc::new))
    }

    fn scan_families(&self) -> Result<Discovery, RegistryError> {
        let mut locations = self.source.scan(&self.file_marker);
        let mut families: Vec<FamilyInfo> = Vec::new();
        let mut grouped: Vec<(String, BTreeMap<SchemaVersion, VersionEntry>)> = Vec::new();
        let mut duplicates = HashSet::new();

        for location in &locations {
            let doc = match self.load(location) {
                Ok(doc) => doc,
                Err(e) => {
                    tracing::warn!("Skipping unreadable schema: {}", e);
                    continue;
                }
            };
            let family = family_from_schema_id(&doc.schema_id);
            let version = doc.version();

            let index = match grouped.iter().position(|(name, _)| *name == family) {
                Some(index) => index,
                None => {
                    grouped.push((family.clone(), BTreeMap::new()));
                    grouped.len() - 1
                }
            };
            let versions = &mut grouped[index].1;
            if let Some(existing) = versions.get(&version) {
                tracing::warn!(
                    "Ignoring {}: {} {} is already defined by {}",
                    location,
                    family,
                    version,
                    existing.location
                );
                duplicates.insert(location.clone());
                continue;
            }
            versions.insert(
                version,
                VersionEntry {
                    location: location.clone(),
                    status: doc.status.clone(),
                },
            );
        }

        for (family, versions) in grouped {
            let current: Vec<(&SchemaVersion, &VersionEntry)> = versions
                .iter()
                .filter(|(_, entry)| entry.status == STATUS_CURRENT)
                .collect();
            let (current_version, current_location) = match current.as_slice() {
                [(version, entry)] => ((*version).clone(), entry.location.clone()),
                [] => {
                    return Err(RegistryError::NoCurrentVersion {
                        family,
                        available: versions.keys().map(ToString::to_string).collect(),
                    })
                }
                many => {
                    return Err(RegistryError::MultipleCurrentVersions {
                        family,
                        versions: many.iter().map(|(v, _)| v.to_string()).collect(),
                    })
                }
            };
            families.push(FamilyInfo {
                tokens: family_tokens(&family),
                family,
                versions,
                current_version,
                current_location,
            });
        }

        locations.retain(|location| !duplicates.contains(location));
        tracing::debug!(
            "Discovered {} schema file(s) in {} famil(ies) under {}",
            locations.len(),
            families.len(),
            self.source.label()
        );

        Ok(Discovery {
            locations,
            families,
        })
    }

    /// Read and parse one document (cached)
    pub fn load(&self, location: &SchemaLocation) -> Result<Arc<SchemaDocument>, SchemaLoadError> {
        self.documents.get_or_try_insert_with(location, || {
            tracing::debug!("Loading schema {}", location);
            let text = self.source.read(location)?;
            SchemaDocument::from_json_str(&text, location).map(Arc::new)
        })
    }

    /// Compile a loaded document (cached by schema identity)
    ///
    /// A document sharing its identity with a differently templated one is
    /// compiled on its own and never cached.
    pub fn compile(
        &self,
        location: &SchemaLocation,
        doc: &SchemaDocument,
    ) -> Result<Arc<CompiledSchema>, SchemaLoadError> {
        let compiled = self.compiled.get_or_try_insert_with(&doc.key(), || {
            CompiledSchema::compile(doc, location, &self.patterns).map(Arc::new)
        })?;
        if compiled.template.source() == doc.template {
            return Ok(compiled);
        }
        tracing::warn!(
            "{} shares identity {} {} with a different template; compiling it uncached",
            location,
            doc.family(),
            doc.schema_version
        );
        CompiledSchema::compile(doc, location, &self.patterns).map(Arc::new)
    }

    /// Load and compile the document at `location`
    pub fn open_schema(&self, location: &SchemaLocation) -> Result<LoadedSchema, SchemaLoadError> {
        let document = self.load(location)?;
        let compiled = self.compile(location, &document)?;
        Ok(LoadedSchema {
            location: location.clone(),
            document,
            compiled,
        })
    }

    /// Location of `family` at `version`, or at its current version
    pub fn get(&self, family: &str, version: Option<&str>) -> Result<SchemaLocation, RegistryError> {
        let discovery = self.discover()?;
        let info = discovery
            .family(family)
            .ok_or_else(|| unknown_family(&discovery, family))?;

        match version {
            None => Ok(info.current_location.clone()),
            Some(version) => info
                .version(version)
                .map(|(_, entry)| entry.location.clone())
                .ok_or_else(|| RegistryError::UnknownVersion {
                    family: info.family.clone(),
                    version: version.to_string(),
                    available: info.available(),
                }),
        }
    }

    /// Known family names, sorted
    pub fn list_families(&self) -> Result<Vec<String>, RegistryError> {
        let discovery = self.discover()?;
        let mut families: Vec<String> = discovery.families.iter().map(|f| f.family.clone()).collect();
        families.sort();
        Ok(families)
    }

    /// Versions of `family`, oldest first
    pub fn list_versions(&self, family: &str) -> Result<Vec<VersionSummary>, RegistryError> {
        let discovery = self.discover()?;
        let info = discovery
            .family(family)
            .ok_or_else(|| unknown_family(&discovery, family))?;

        Ok(info
            .versions
            .iter()
            .map(|(version, entry)| VersionSummary {
                version: version.to_string(),
                status: entry.status.clone(),
                current: *version == info.current_version,
                path: self.source.relative(&entry.location),
            })
            .collect())
    }

    /// Metadata and field descriptions of one schema
    pub fn describe(&self, family: &str, version: Option<&str>) -> crate::Result<SchemaDescription> {
        let location = self.get(family, version)?;
        let doc = self.load(&location)?;

        let fields = doc
            .fields
            .iter()
            .map(|(name, spec)| {
                let (values, pattern) = match &spec.constraint {
                    FieldConstraint::Enum(values) => (Some(values.clone()), None),
                    FieldConstraint::Pattern(p) => (None, Some(p.clone())),
                    FieldConstraint::Unconstrained => (None, None),
                };
                (
                    name.clone(),
                    FieldDescription {
                        kind: spec.kind.clone(),
                        values,
                        pattern,
                        description: spec.description.clone(),
                    },
                )
            })
            .collect();

        Ok(SchemaDescription {
            family: doc.family(),
            schema_id: doc.schema_id.clone(),
            schema_version: doc.schema_version.clone(),
            status: doc.status.clone(),
            description: doc.description.clone(),
            template: doc.template.clone(),
            fields,
            examples: doc.examples.clone(),
            path: self.source.relative(&location),
        })
    }

    /// Families whose name fuzzily matches `query`, best first
    pub fn search_families(&self, query: &str, limit: usize) -> Result<Vec<FamilyMatch>, RegistryError> {
        let discovery = self.discover()?;
        Ok(fuzzy_families(&discovery, query, limit))
    }

    /// Drop every cached discovery result, document, compiled schema and regex
    pub fn clear_cache(&self) {
        self.discovery.clear();
        self.documents.clear();
        self.compiled.clear();
        self.patterns.clear();
        tracing::debug!("Cleared schema caches for {}", self.source.label());
    }

    /// Number of documents currently cached
    pub fn cached_documents(&self) -> usize {
        self.documents.len()
    }

    /// Number of compiled schemas currently cached
    pub fn cached_schemas(&self) -> usize {
        self.compiled.len()
    }
}

fn unknown_family(discovery: &Discovery, family: &str) -> RegistryError {
    RegistryError::UnknownFamily {
        family: family.to_string(),
        suggestions: fuzzy_families(discovery, family, 3)
            .into_iter()
            .map(|m| m.family)
            .collect(),
    }
}

fn fuzzy_families(discovery: &Discovery, query: &str, limit: usize) -> Vec<FamilyMatch> {
    use fuzzy_matcher::skim::SkimMatcherV2;
    use fuzzy_matcher::FuzzyMatcher;

    let matcher = SkimMatcherV2::default();
    let query = query.trim().to_uppercase();
    let mut results: Vec<FamilyMatch> = discovery
        .families
        .iter()
        .filter_map(|info| {
            matcher.fuzzy_match(&info.family, &query).map(|score| FamilyMatch {
                family: info.family.clone(),
                score,
            })
        })
        .collect();

    results.sort_by(|a, b| b.score.cmp(&a.score).then_with(|| a.family.cmp(&b.family)));
    results.truncate(limit);
    results
}
