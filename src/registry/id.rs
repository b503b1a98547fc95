//! Deterministic field identifiers
//!
//! Every enum type and every scalar/enum-valued leaf field hashes to a
//! fixed-width FNV-1 32-bit ID over its qualified name, datatype, unit,
//! allowed values and bounds. Two fields hash alike only if their whole
//! contract is alike, so a changed range or unit yields a new ID.

use indexmap::IndexMap;

use crate::error::{Result, SchemaError};
use crate::export::vspec::display_unit;
use crate::export::{format_bound, ScalarKind};
use crate::model::{FieldDefinition, SchemaModel, TypeDefinition, TypeKind, ROOT_TYPE_NAMES};

/// The hashed contract of one schema element
#[derive(Debug, Clone, PartialEq)]
pub struct IdSpec {
    /// Fully qualified name (`Type.field` or the enum name)
    pub name: String,
    pub data_type: String,
    pub unit: String,
    /// Sorted allowed values for enum-typed elements
    pub allowed: String,
    pub minimum: Option<f64>,
    pub maximum: Option<f64>,
}

impl IdSpec {
    fn from_enum(def: &TypeDefinition) -> IdSpec {
        let mut values = def.value_names();
        values.sort_unstable();
        IdSpec {
            name: def.name.clone(),
            data_type: "string".to_string(),
            unit: String::new(),
            allowed: format!("[{}]", values.join(", ")),
            minimum: None,
            maximum: None,
        }
    }

    fn from_field(model: &SchemaModel, parent: &str, field: &FieldDefinition) -> Option<IdSpec> {
        let data_type = match ScalarKind::of(&field.ty.name) {
            Some(kind) => scalar_name(kind).to_string(),
            None => match model.get(&field.ty.name).map(|t| t.kind) {
                Some(TypeKind::Enum) => "string".to_string(),
                // Object-valued fields are branches, not leaves.
                _ => return None,
            },
        };

        let allowed = model
            .get(&field.ty.name)
            .filter(|t| t.kind == TypeKind::Enum)
            .map(|t| {
                let mut values = t.value_names();
                values.sort_unstable();
                format!("[{}]", values.join(", "))
            })
            .unwrap_or_default();

        let unit = field
            .arguments
            .iter()
            .find(|arg| arg.name == "unit")
            .and_then(|arg| arg.default.as_deref())
            .and_then(display_unit)
            .unwrap_or_default()
            .to_string();

        let range = field.directives.range();
        Some(IdSpec {
            name: format!("{}.{}", parent, field.name),
            data_type,
            unit,
            allowed,
            minimum: range.and_then(|r| r.min),
            maximum: range.and_then(|r| r.max),
        })
    }

    /// The byte string fed to the hash.
    pub fn identifier(&self, strict: bool) -> Vec<u8> {
        let rendered = format!(
            "{}: unit: {}, datatype: {}, allowed: {}min: {}max: {}",
            self.name,
            self.unit,
            self.data_type,
            self.allowed,
            self.minimum.map(format_bound).unwrap_or_default(),
            self.maximum.map(format_bound).unwrap_or_default(),
        );
        if strict {
            rendered.into_bytes()
        } else {
            rendered.to_lowercase().into_bytes()
        }
    }

    /// Hash the spec to its `0x`-prefixed fixed-width ID.
    pub fn id(&self, strict: bool) -> String {
        format!("0x{:08X}", fnv1_32(&self.identifier(strict)))
    }
}

/// 32-bit Fowler-Noll-Vo (FNV-1) hash
fn fnv1_32(bytes: &[u8]) -> u32 {
    let mut hash: u32 = 2_166_136_261;
    for byte in bytes {
        hash = hash.wrapping_mul(16_777_619);
        hash ^= u32::from(*byte);
    }
    hash
}

fn scalar_name(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String | ScalarKind::Id => "string",
        ScalarKind::Boolean => "boolean",
        ScalarKind::Int => "int32",
        ScalarKind::Int8 => "int8",
        ScalarKind::UInt8 => "uint8",
        ScalarKind::Int16 => "int16",
        ScalarKind::UInt16 => "uint16",
        ScalarKind::UInt32 => "uint32",
        ScalarKind::Int64 => "int64",
        ScalarKind::UInt64 => "uint64",
        ScalarKind::Float => "float",
    }
}

/// Generate IDs for every enum and leaf field, in model order.
/// A hash collision between two different specs is fatal.
pub fn generate_ids(model: &SchemaModel, strict: bool) -> Result<IndexMap<String, String>> {
    let mut ids: IndexMap<String, String> = IndexMap::new();
    let mut seen: std::collections::HashMap<String, String> = std::collections::HashMap::new();

    let mut record = |spec: IdSpec| -> Result<()> {
        let id = spec.id(strict);
        if let Some(previous) = seen.get(&id) {
            return Err(SchemaError::DuplicateId {
                id,
                name: format!("{}' (already used by '{}')", spec.name, previous),
            });
        }
        seen.insert(id.clone(), spec.name.clone());
        ids.insert(spec.name, id);
        Ok(())
    };

    for def in model.iter() {
        if ROOT_TYPE_NAMES.contains(&def.name.as_str()) {
            continue;
        }
        match def.kind {
            TypeKind::Enum => record(IdSpec::from_enum(def))?,
            TypeKind::Object => {
                for field in def.fields.values() {
                    if field.name.eq_ignore_ascii_case("id") {
                        continue;
                    }
                    if let Some(spec) = IdSpec::from_field(model, &def.name, field) {
                        record(spec)?;
                    }
                }
            }
            _ => {}
        }
    }
    Ok(ids)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ComposeOptions};
    use crate::parser::parse_fragment;

    fn compose_model(sdl: &str) -> SchemaModel {
        let fragment = parse_fragment("test.graphql", sdl).unwrap();
        compose(&[fragment], &ComposeOptions::default()).unwrap().model
    }

    #[test]
    fn test_ids_are_deterministic_and_well_formed() {
        let model = compose_model(
            "type Vehicle { speed: Float @range(min: 0, max: 300) vin: String }",
        );
        let first = generate_ids(&model, false).unwrap();
        let second = generate_ids(&model, false).unwrap();
        assert_eq!(first, second);

        let id = &first["Vehicle.speed"];
        assert!(id.starts_with("0x"));
        assert_eq!(id.len(), 10);
    }

    #[test]
    fn test_leaf_fields_only() {
        let model = compose_model(
            "type Vehicle { cabin: Cabin speed: Float } type Cabin { doorCount: Int }",
        );
        let ids = generate_ids(&model, false).unwrap();
        assert!(ids.contains_key("Vehicle.speed"));
        assert!(ids.contains_key("Cabin.doorCount"));
        assert!(!ids.contains_key("Vehicle.cabin"));
    }

    #[test]
    fn test_contract_changes_change_the_id() {
        let base = compose_model("type Vehicle { speed: Float }");
        let ranged = compose_model("type Vehicle { speed: Float @range(min: 0, max: 300) }");
        let base_ids = generate_ids(&base, false).unwrap();
        let ranged_ids = generate_ids(&ranged, false).unwrap();
        assert_ne!(base_ids["Vehicle.speed"], ranged_ids["Vehicle.speed"]);
    }

    #[test]
    fn test_strict_mode_is_case_sensitive() {
        let spec = IdSpec {
            name: "Vehicle.Speed".to_string(),
            data_type: "float".to_string(),
            unit: String::new(),
            allowed: String::new(),
            minimum: None,
            maximum: None,
        };
        let lower = IdSpec {
            name: "vehicle.speed".to_string(),
            ..spec.clone()
        };
        assert_eq!(spec.id(false), lower.id(false));
        assert_ne!(spec.id(true), lower.id(true));
    }

    #[test]
    fn test_enum_ids_cover_values() {
        let model = compose_model("enum GearEnum { PARK DRIVE }");
        let ids = generate_ids(&model, false).unwrap();
        assert!(ids.contains_key("GearEnum"));
    }
}
