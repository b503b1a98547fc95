//! Error types for the schema toolchain

use thiserror::Error;

/// Result type for schema operations
pub type Result<T> = std::result::Result<T, SchemaError>;

/// Schema toolchain errors
#[derive(Error, Debug)]
pub enum SchemaError {
    #[error("Parse error in {file}: {message}")]
    Parse { file: String, message: String },

    #[error("Duplicate type '{name}' defined in '{first}' and '{second}'")]
    DuplicateType {
        name: String,
        first: String,
        second: String,
    },

    #[error("Field '{field}' references unknown type '{referenced}'")]
    UnresolvedReference { field: String, referenced: String },

    #[error("Root type '{0}' not found in schema")]
    UnknownRootType(String),

    #[error("Selected field '{field}' does not exist on type '{parent}'")]
    UnknownSelection { parent: String, field: String },

    #[error("Selection document has no query operation")]
    MissingOperation,

    #[error("Invalid naming config: {0}")]
    InvalidNamingConfig(String),

    #[error("Invalid directive on '{element}': {message}")]
    InvalidDirective { element: String, message: String },

    #[error("Invalid instance tag '{marker}': {message}")]
    InvalidInstanceTag { marker: String, message: String },

    #[error("Expansion of '{field}' would create type '{name}' which already exists")]
    ExpansionCollision { field: String, name: String },

    #[error("{exporter} exporter cannot represent {construct} (field '{field}')")]
    Unsupported {
        exporter: &'static str,
        construct: String,
        field: String,
    },

    #[error("Duplicate generated ID {id} for '{name}'")]
    DuplicateId { id: String, name: String },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}
