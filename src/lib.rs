//! EO Naming
//!
//! A naming-grammar engine for Earth-observation product filenames.
//!
//! Each naming convention is a versioned JSON schema document: a small
//! template grammar, per-field constraints and example filenames. The engine
//! matches filenames against the schema set, explains near misses field by
//! field, and renders filenames back from structured fields.
//!
//! ## Features
//!
//! - **Template DSL**: `{field}` placeholders and nestable `[...]` optional segments
//! - **Versioned families**: one `current` version per family, older ones addressable
//! - **Near-miss diagnostics**: the first field a filename diverges at, with the offending token
//! - **Auto-selection**: assemble without naming a schema
//!
//! ## Schema layout
//!
//! ```text
//! schemas/
//! ├── copernicus/
//! │   ├── clms/hrwsi/fsc_filename_v1_0_0.json
//! │   └── cz/cz_filename_v0_0_0.json
//! ├── sentinel/
//! │   ├── s2/s2_filename_v1_0_0.json
//! │   └── s2/s2_filename_v0_9_0.json
//! └── usgs/landsat/landsat_filename_v2_0_0.json
//! ```

pub mod assembler;
pub mod cache;
pub mod config;
pub mod diagnostics;
pub mod engine;
pub mod enrich;
pub mod error;
pub mod field;
pub mod matcher;
pub mod parser;
pub mod pattern;
pub mod registry;
pub mod schema;
pub mod template;
pub mod validator;
pub mod version;

pub use config::NamingConfig;
pub use diagnostics::NearMiss;
pub use engine::NamingEngine;
pub use enrich::{FieldEnricher, NoopEnricher, StacMapEnricher};
pub use error::{AssemblyError, NamingError, NoMatchError, ParseError, RegistryError, Result, SchemaLoadError};
pub use field::{FieldConstraint, FieldSpec};
pub use matcher::{CompiledSchema, Fields};
pub use parser::{ParseResult, SchemaRef};
pub use registry::{SchemaRegistry, SchemaSource};
pub use schema::{SchemaDocument, SchemaLocation};
pub use template::{compile_template, CompiledTemplate, Template};
pub use validator::ValidationReport;
pub use version::SchemaVersion;
