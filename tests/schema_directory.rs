//! Schema Directory Tests
//!
//! Registry behaviour over schema trees written to a temporary directory.

use std::fs;
use std::path::Path;

use eo_naming::config::RegistryConfig;
use eo_naming::{Fields, NamingConfig, NamingEngine, NamingError, NoopEnricher, RegistryError, SchemaRef, SchemaRegistry};
use tempfile::tempdir;

fn write_doc(root: &Path, rel: &str, doc: serde_json::Value) {
    let path = root.join(rel);
    fs::create_dir_all(path.parent().unwrap()).unwrap();
    fs::write(path, serde_json::to_string_pretty(&doc).unwrap()).unwrap();
}

fn numbered(id: &str, version: &str, status: &str, suffix: &str) -> serde_json::Value {
    serde_json::json!({
        "schema_id": id,
        "schema_version": version,
        "status": status,
        "template": format!("{{id}}.{}", suffix),
        "fields": {"id": {"pattern": "[0-9]+"}},
        "examples": [format!("123.{}", suffix)]
    })
}

fn engine(root: &Path) -> NamingEngine {
    NamingEngine::with_enricher(SchemaRegistry::open(root), NoopEnricher)
}

// =============================================================================
// Discovery
// =============================================================================

#[test]
fn test_only_marked_files_are_discovered() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "a/tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));
    write_doc(dir.path(), "a/notes.json", numbered("x:y:notes", "1.0.0", "current", "txt"));

    let engine = engine(dir.path());
    assert_eq!(engine.list_families().unwrap(), vec!["TIF"]);
}

#[test]
fn test_duplicate_identity_is_ignored() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "a/tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));
    write_doc(dir.path(), "b/tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));

    let registry = SchemaRegistry::open(dir.path());
    let discovery = registry.discover().unwrap();
    assert_eq!(discovery.locations.len(), 1);

    let versions = registry.list_versions("TIF").unwrap();
    assert_eq!(versions.len(), 1);
    assert_eq!(versions[0].path, "a/tif_filename_v1_0_0.json");
}

#[test]
fn test_family_needs_exactly_one_current_version() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));
    write_doc(dir.path(), "tif_filename_v2_0_0.json", numbered("x:y:tif", "2.0.0", "current", "tif"));

    match engine(dir.path()).list_families().unwrap_err() {
        NamingError::Registry(RegistryError::MultipleCurrentVersions { family, versions }) => {
            assert_eq!(family, "TIF");
            assert_eq!(versions, vec!["1.0.0", "2.0.0"]);
        }
        other => panic!("Expected MultipleCurrentVersions, got {:?}", other),
    }

    let dir = tempdir().unwrap();
    write_doc(dir.path(), "tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "deprecated", "tif"));
    match engine(dir.path()).parse_auto("123.tif").unwrap_err() {
        NamingError::Registry(RegistryError::NoCurrentVersion { family, available }) => {
            assert_eq!(family, "TIF");
            assert_eq!(available, vec!["1.0.0"]);
        }
        other => panic!("Expected NoCurrentVersion, got {:?}", other),
    }
}

#[test]
fn test_empty_directory_has_no_schemas() {
    let dir = tempdir().unwrap();
    match engine(dir.path()).parse_auto("123.tif").unwrap_err() {
        NamingError::Registry(RegistryError::NoSchemas { .. }) => {}
        other => panic!("Expected NoSchemas, got {:?}", other),
    }
}

#[test]
fn test_unknown_family_suggests_close_names() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "tif_filename_v1_0_0.json", numbered("x:y:geotif", "1.0.0", "current", "tif"));

    let err = engine(dir.path())
        .parse("123.tif", &SchemaRef::family("GTIF"))
        .unwrap_err();
    match err {
        NamingError::Registry(RegistryError::UnknownFamily { family, suggestions }) => {
            assert_eq!(family, "GTIF");
            assert_eq!(suggestions, vec!["GEOTIF"]);
        }
        other => panic!("Expected UnknownFamily, got {:?}", other),
    }
}

// =============================================================================
// Failed Parses
// =============================================================================

#[test]
fn test_no_match_reports_scan_summary() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "nc_filename_v1_0_0.json", numbered("x:y:nc", "1.0.0", "current", "nc"));
    write_doc(dir.path(), "tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));
    fs::write(dir.path().join("broken_filename_v1_0_0.json"), "{ not json").unwrap();

    let registry = SchemaRegistry::open(dir.path()).with_preview_limit(2);
    let engine = NamingEngine::with_enricher(registry, NoopEnricher);

    // every field is satisfied; only the literal suffix differs
    match engine.parse_auto("123.jpg").unwrap_err() {
        NamingError::NoMatch(no_match) => {
            assert_eq!(no_match.scanned, 3);
            assert_eq!(
                no_match.preview,
                vec!["broken_filename_v1_0_0.json", "nc_filename_v1_0_0.json"]
            );
            assert!(no_match.first_load_error.is_some());
            assert!(no_match.to_string().contains("123.jpg"));
        }
        other => panic!("Expected NoMatch, got {:?}", other),
    }
}

#[test]
fn test_explicit_schema_without_near_miss() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "tif_filename_v1_0_0.json", numbered("x:y:tif", "1.0.0", "current", "tif"));

    let err = engine(dir.path())
        .parse("123.jpg", &SchemaRef::family("TIF"))
        .unwrap_err();
    let miss = err.near_miss().expect("expected a parse error");
    assert_eq!(miss.field, "filename");
    assert_eq!(miss.value, "123.jpg");
    assert_eq!(miss.expected, "pattern defined by schema x:y:tif");
}

// =============================================================================
// Caching
// =============================================================================

#[test]
fn test_edits_are_seen_after_clearing_cache() {
    let dir = tempdir().unwrap();
    let rel = "tif_filename_v1_0_0.json";
    write_doc(dir.path(), rel, numbered("x:y:tif", "1.0.0", "current", "tif"));

    let engine = engine(dir.path());
    let id: Fields = [("id".to_string(), "123".to_string())].into_iter().collect();
    let tif = SchemaRef::family("TIF");
    assert!(engine.parse_auto("123.tif").is_ok());
    assert_eq!(engine.assemble(&id, &tif).unwrap(), "123.tif");

    write_doc(dir.path(), rel, numbered("x:y:tif", "1.0.0", "current", "nc"));
    assert!(engine.parse_auto("123.nc").is_err());
    assert!(engine.parse_auto("123.tif").is_ok());
    assert_eq!(engine.assemble(&id, &tif).unwrap(), "123.tif");
    assert_eq!(engine.assemble_auto(&id).unwrap(), "123.tif");

    engine.clear_cache();
    assert_eq!(engine.registry().cached_schemas(), 0);
    let parsed = engine.parse_auto("123.nc").unwrap();
    assert_eq!(parsed.fields["id"], "123");
    assert!(engine.parse_auto("123.tif").is_err());
    assert_eq!(engine.assemble(&id, &tif).unwrap(), "123.nc");
    assert_eq!(engine.assemble_auto(&id).unwrap(), "123.nc");
}

// =============================================================================
// Configuration
// =============================================================================

#[test]
fn test_engine_from_config_uses_schema_root() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "x/nc_filename_v3_1_0.json", numbered("x:y:nc", "3.1.0", "current", "nc"));

    let config = NamingConfig {
        registry: RegistryConfig {
            schema_root: Some(dir.path().to_path_buf()),
            ..RegistryConfig::default()
        },
    };
    let engine = NamingEngine::from_config(&config);

    assert_eq!(engine.list_families().unwrap(), vec!["NC"]);
    let parsed = engine.parse_auto("42.nc").unwrap();
    assert_eq!(parsed.version.as_deref(), Some("3.1.0"));
    assert_eq!(engine.validate_examples().unwrap().examples, 1);
}

#[test]
fn test_custom_file_marker() {
    let dir = tempdir().unwrap();
    write_doc(dir.path(), "tif_naming_v1.json", numbered("x:y:tif", "1.0.0", "current", "tif"));

    let default = SchemaRegistry::open(dir.path());
    assert!(default.list_families().unwrap().is_empty());

    let custom = SchemaRegistry::open(dir.path()).with_file_marker("_naming_v");
    assert_eq!(custom.list_families().unwrap(), vec!["TIF"]);
}
