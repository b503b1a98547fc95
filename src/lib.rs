//! Schemaforge
//!
//! A schema-transformation toolchain: GraphQL-SDL domain-model fragments
//! are composed into one in-memory schema model, optionally transformed
//! (naming conversion, selection filtering, root-type filtering,
//! instance-tag expansion) and exported to downstream artifacts.
//!
//! ## Pipeline
//!
//! ```text
//! fragments ─┐
//!            ├─ compose (merge → naming → selection → root filter → expand)
//! built-in ──┘         │
//!                      ▼
//!              composed SchemaModel
//!                      │
//!      ┌──────┬────────┼─────────┬────────┬────────┐
//!      ▼      ▼        ▼         ▼        ▼        ▼
//!     sdl   proto  jsonschema  shacl    skos    vspec
//!                      │
//!                      ▼
//!          identifier / history registries
//! ```
//!
//! Exporters are pure functions of the composed model; the registries
//! consume it read-only to produce deterministic field IDs and versioned
//! concept histories.

pub mod builtin;
pub mod compose;
pub mod directive;
pub mod error;
pub mod export;
pub mod model;
pub mod parser;
pub mod registry;
pub mod search;

pub use compose::{compose, Composed, ComposeOptions, NamingConfig, SelectionDocument};
pub use error::{Result, SchemaError};
pub use export::Exporter;
pub use model::{FieldDefinition, SchemaModel, TypeDefinition, TypeKind};
pub use parser::{load_fragments, parse_fragment, Fragment};
