//! Exporters
//!
//! Each target format implements [`Exporter`] over the composed model.
//! Exporters are pure: they borrow the model read-only, so independent
//! targets can run in any order (or, later, in parallel) from the same
//! composition result.

pub mod jsonschema;
pub mod proto;
pub mod rdf;
pub mod sdl;
pub mod shacl;
pub mod skos;
pub mod vspec;

use crate::compose::Composed;
use crate::error::{Result, SchemaError};
use crate::model::FieldDefinition;

/// A target-format exporter
pub trait Exporter {
    /// Short target name used in CLI output and error messages
    fn name(&self) -> &'static str;

    /// Render the composed model to the target document
    fn export(&self, composed: &Composed) -> Result<String>;
}

/// Classification of the scalar vocabulary every exporter must cover
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScalarKind {
    String,
    Id,
    Boolean,
    Int,
    Int8,
    UInt8,
    Int16,
    UInt16,
    UInt32,
    Int64,
    UInt64,
    Float,
}

impl ScalarKind {
    /// Classify a scalar type name; `None` for non-scalars.
    pub fn of(name: &str) -> Option<ScalarKind> {
        Some(match name {
            "String" => ScalarKind::String,
            "ID" => ScalarKind::Id,
            "Boolean" => ScalarKind::Boolean,
            "Int" => ScalarKind::Int,
            "Int8" => ScalarKind::Int8,
            "UInt8" => ScalarKind::UInt8,
            "Int16" => ScalarKind::Int16,
            "UInt16" => ScalarKind::UInt16,
            "UInt32" => ScalarKind::UInt32,
            "Int64" => ScalarKind::Int64,
            "UInt64" => ScalarKind::UInt64,
            "Float" => ScalarKind::Float,
            _ => return None,
        })
    }

    pub fn is_integer(&self) -> bool {
        matches!(
            self,
            ScalarKind::Int
                | ScalarKind::Int8
                | ScalarKind::UInt8
                | ScalarKind::Int16
                | ScalarKind::UInt16
                | ScalarKind::UInt32
                | ScalarKind::Int64
                | ScalarKind::UInt64
        )
    }

    pub fn is_numeric(&self) -> bool {
        self.is_integer() || matches!(self, ScalarKind::Float)
    }
}

/// Reject the nested-list construct no target format can represent.
pub fn reject_nested_list(
    exporter: &'static str,
    parent: &str,
    field: &FieldDefinition,
) -> Result<()> {
    if field.ty.list.map(|w| w.nested).unwrap_or(false) {
        return Err(SchemaError::Unsupported {
            exporter,
            construct: "a list of lists".to_string(),
            field: format!("{}.{}", parent, field.name),
        });
    }
    Ok(())
}

/// Format a numeric bound without a spurious fractional part, so
/// `@range(min: 0, max: 300)` stays `0`/`300` in every target.
pub fn format_bound(value: f64) -> String {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        format!("{}", value as i64)
    } else {
        value.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_scalar_kind_covers_spec_vocabulary() {
        for name in [
            "String", "ID", "Boolean", "Int", "Int8", "UInt8", "Int16", "UInt16",
            "UInt32", "Int64", "UInt64", "Float",
        ] {
            assert!(ScalarKind::of(name).is_some(), "{name}");
        }
        assert!(ScalarKind::of("Vehicle").is_none());
    }

    #[test]
    fn test_format_bound_integers_stay_integers() {
        assert_eq!(format_bound(0.0), "0");
        assert_eq!(format_bound(300.0), "300");
        assert_eq!(format_bound(0.5), "0.5");
    }
}
