//! Naming convention configuration and case conversion
//!
//! The naming config is a YAML mapping from element kind (and context) to
//! a case format. It is validated eagerly, before any schema file is read,
//! so a bad config never surfaces mid-pipeline. Conversion is idempotent:
//! a name already in the target case comes back unchanged.

use serde::{Deserialize, Serialize};

use crate::error::{Result, SchemaError};
use crate::model::{
    SchemaModel, TypeKind, BUILTIN_SCALARS, INSTANCE_TAG_FIELD, ROOT_TYPE_NAMES,
};

/// Recognized case formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CaseFormat {
    #[serde(rename = "camelCase")]
    Camel,
    #[serde(rename = "PascalCase")]
    Pascal,
    #[serde(rename = "snake_case")]
    Snake,
    #[serde(rename = "kebab-case")]
    Kebab,
    #[serde(rename = "MACROCASE")]
    Macro,
    #[serde(rename = "COBOL-CASE")]
    Cobol,
    #[serde(rename = "flatcase")]
    Flat,
    #[serde(rename = "TitleCase")]
    Title,
}

impl CaseFormat {
    /// Convert a name to this case format.
    pub fn convert(&self, name: &str) -> String {
        let words = split_words(name);
        if words.is_empty() {
            return name.to_string();
        }
        match self {
            CaseFormat::Camel => {
                let mut out = words[0].to_ascii_lowercase();
                for word in &words[1..] {
                    out.push_str(&capitalize(word));
                }
                out
            }
            CaseFormat::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            CaseFormat::Snake => words
                .iter()
                .map(|w| w.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join("_"),
            CaseFormat::Kebab => words
                .iter()
                .map(|w| w.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join("-"),
            CaseFormat::Macro => words
                .iter()
                .map(|w| w.to_ascii_uppercase())
                .collect::<Vec<_>>()
                .join("_"),
            CaseFormat::Cobol => words
                .iter()
                .map(|w| w.to_ascii_uppercase())
                .collect::<Vec<_>>()
                .join("-"),
            CaseFormat::Flat => words
                .iter()
                .map(|w| w.to_ascii_lowercase())
                .collect::<Vec<_>>()
                .join(""),
            CaseFormat::Title => words
                .iter()
                .map(|w| {
                    let mut chars = w.chars();
                    match chars.next() {
                        Some(first) => {
                            first.to_ascii_uppercase().to_string() + chars.as_str()
                        }
                        None => String::new(),
                    }
                })
                .collect(),
        }
    }
}

/// Split an identifier into words at `_`, `-`, spaces and case boundaries.
/// An uppercase run followed by a lowercase letter splits before its last
/// character, so `ABSWarning` becomes `["ABS", "Warning"]`.
fn split_words(name: &str) -> Vec<String> {
    let mut words: Vec<String> = Vec::new();
    let mut current = String::new();
    let chars: Vec<char> = name.chars().collect();

    for (i, &c) in chars.iter().enumerate() {
        if c == '_' || c == '-' || c == ' ' {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            continue;
        }
        if c.is_ascii_uppercase() && !current.is_empty() {
            let prev = chars[i - 1];
            let next_is_lower = chars.get(i + 1).is_some_and(|n| n.is_ascii_lowercase());
            if prev.is_ascii_lowercase() || prev.is_ascii_digit() {
                words.push(std::mem::take(&mut current));
            } else if prev.is_ascii_uppercase() && next_is_lower {
                words.push(std::mem::take(&mut current));
            }
        }
        current.push(c);
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    match chars.next() {
        Some(first) => {
            first.to_ascii_uppercase().to_string() + &chars.as_str().to_ascii_lowercase()
        }
        None => String::new(),
    }
}

/// Case formats for type names, by kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct TypeNaming {
    pub object: Option<CaseFormat>,
    pub interface: Option<CaseFormat>,
    pub input: Option<CaseFormat>,
    pub scalar: Option<CaseFormat>,
    pub union: Option<CaseFormat>,
    #[serde(rename = "enum")]
    pub enumeration: Option<CaseFormat>,
}

/// Case formats for field names, by parent type kind
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FieldNaming {
    pub object: Option<CaseFormat>,
    pub interface: Option<CaseFormat>,
    pub input: Option<CaseFormat>,
}

/// Case formats for argument names
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct ArgumentNaming {
    pub field: Option<CaseFormat>,
}

/// The full naming convention configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct NamingConfig {
    #[serde(rename = "type")]
    pub types: Option<TypeNaming>,
    pub field: Option<FieldNaming>,
    pub argument: Option<ArgumentNaming>,
    #[serde(rename = "enumValue")]
    pub enum_value: Option<CaseFormat>,
    #[serde(rename = "instanceTag")]
    pub instance_tag: Option<CaseFormat>,
}

impl NamingConfig {
    /// Deserialize and validate a YAML naming config.
    pub fn from_yaml(source: &str) -> Result<Self> {
        if source.trim().is_empty() {
            return Ok(Self::default());
        }
        let config: NamingConfig = serde_yaml::from_str(source)
            .map_err(|e| SchemaError::InvalidNamingConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Pairing rule: renaming enum values changes the segments that
    /// instance-tag expansion turns into field names, so `enumValue`
    /// requires `instanceTag` to be configured as well.
    pub fn validate(&self) -> Result<()> {
        if self.enum_value.is_some() && self.instance_tag.is_none() {
            return Err(SchemaError::InvalidNamingConfig(
                "if 'enumValue' is present, 'instanceTag' must also be present".to_string(),
            ));
        }
        Ok(())
    }

    fn type_format(&self, kind: TypeKind) -> Option<CaseFormat> {
        let types = self.types.as_ref()?;
        match kind {
            TypeKind::Object => types.object,
            TypeKind::Interface => types.interface,
            TypeKind::Input => types.input,
            TypeKind::Scalar => types.scalar,
            TypeKind::Union => types.union,
            TypeKind::Enum => types.enumeration,
        }
    }

    fn field_format(&self, parent_kind: TypeKind) -> Option<CaseFormat> {
        let field = self.field.as_ref()?;
        match parent_kind {
            TypeKind::Object => field.object,
            TypeKind::Interface => field.interface,
            TypeKind::Input => field.input,
            _ => None,
        }
    }

    fn argument_format(&self) -> Option<CaseFormat> {
        self.argument.as_ref()?.field
    }

    /// Case to apply to instance-tag path segments during expansion.
    pub fn instance_tag_format(&self) -> Option<CaseFormat> {
        self.instance_tag
    }
}

/// Apply the naming configuration to the model in place.
///
/// Type renames are computed first so every reference (field types,
/// argument types, union members, interface lists) can be rewritten in
/// one pass. Two types converging on the same name is a config error.
pub fn apply_naming(model: &mut SchemaModel, config: &NamingConfig) -> Result<()> {
    let mut renames: Vec<(String, String)> = Vec::new();
    for def in model.iter() {
        if ROOT_TYPE_NAMES.contains(&def.name.as_str())
            || BUILTIN_SCALARS.contains(&def.name.as_str())
        {
            continue;
        }
        if let Some(format) = config.type_format(def.kind) {
            let renamed = format.convert(&def.name);
            if renamed != def.name {
                renames.push((def.name.clone(), renamed));
            }
        }
    }

    let mut target_names: std::collections::HashSet<String> = model
        .types
        .keys()
        .filter(|name| !renames.iter().any(|(old, _)| &old == name))
        .cloned()
        .collect();
    for (old, new) in &renames {
        if !target_names.insert(new.clone()) {
            return Err(SchemaError::InvalidNamingConfig(format!(
                "renaming '{}' to '{}' collides with an existing type",
                old, new
            )));
        }
    }

    let rename_map: std::collections::HashMap<String, String> =
        renames.into_iter().collect();
    let lookup = |name: &str| -> Option<String> { rename_map.get(name).cloned() };

    let mut rebuilt = indexmap::IndexMap::with_capacity(model.types.len());
    for (_, mut def) in std::mem::take(&mut model.types) {
        if let Some(new_name) = lookup(&def.name) {
            def.name = new_name;
        }
        for field in def.fields.values_mut() {
            if let Some(new_name) = lookup(&field.ty.name) {
                field.ty.name = new_name;
            }
            for arg in &mut field.arguments {
                if let Some(new_name) = lookup(&arg.ty.name) {
                    arg.ty.name = new_name;
                }
            }
        }
        for member in &mut def.members {
            if let Some(new_name) = lookup(member) {
                *member = new_name;
            }
        }
        for iface in &mut def.implements {
            if let Some(new_name) = lookup(iface) {
                *iface = new_name;
            }
        }
        rebuilt.insert(def.name.clone(), def);
    }
    model.types = rebuilt;

    // Field, argument and enum-value renames are local to each type.
    for def in model.types.values_mut() {
        if let Some(format) = config.field_format(def.kind) {
            let mut fields = indexmap::IndexMap::with_capacity(def.fields.len());
            for (_, mut field) in std::mem::take(&mut def.fields) {
                // The instanceTag link field is a structural name the
                // expander matches literally; it is never converted.
                if field.name != INSTANCE_TAG_FIELD {
                    field.name = format.convert(&field.name);
                }
                fields.insert(field.name.clone(), field);
            }
            def.fields = fields;
        }
        if let Some(format) = config.argument_format() {
            for field in def.fields.values_mut() {
                for arg in &mut field.arguments {
                    arg.name = format.convert(&arg.name);
                }
            }
        }
        if def.kind == TypeKind::Enum {
            if let Some(format) = config.enum_value {
                for value in &mut def.values {
                    value.name = format.convert(&value.name);
                }
            }
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::{FieldDefinition, TypeDefinition, TypeRef};

    #[test]
    fn test_case_conversions() {
        assert_eq!(CaseFormat::Camel.convert("average_speed"), "averageSpeed");
        assert_eq!(CaseFormat::Pascal.convert("average_speed"), "AverageSpeed");
        assert_eq!(CaseFormat::Snake.convert("AverageSpeed"), "average_speed");
        assert_eq!(CaseFormat::Kebab.convert("AverageSpeed"), "average-speed");
        assert_eq!(CaseFormat::Macro.convert("averageSpeed"), "AVERAGE_SPEED");
        assert_eq!(CaseFormat::Cobol.convert("averageSpeed"), "AVERAGE-SPEED");
        assert_eq!(CaseFormat::Flat.convert("AverageSpeed"), "averagespeed");
        assert_eq!(CaseFormat::Title.convert("average_speed"), "AverageSpeed");
    }

    #[test]
    fn test_acronym_word_split() {
        assert_eq!(
            CaseFormat::Snake.convert("ABSWarning"),
            "abs_warning"
        );
        assert_eq!(CaseFormat::Camel.convert("ABS"), "abs");
    }

    #[test]
    fn test_conversion_is_idempotent() {
        for format in [
            CaseFormat::Camel,
            CaseFormat::Pascal,
            CaseFormat::Snake,
            CaseFormat::Kebab,
            CaseFormat::Macro,
            CaseFormat::Cobol,
            CaseFormat::Flat,
        ] {
            for name in ["averageSpeed", "Average_speed", "DOOR-POSITION", "row2"] {
                let once = format.convert(name);
                assert_eq!(format.convert(&once), once, "{format:?} on {name}");
            }
        }
    }

    #[test]
    fn test_enum_value_requires_instance_tag() {
        let err = NamingConfig::from_yaml("enumValue: MACROCASE\n").unwrap_err();
        assert!(matches!(err, SchemaError::InvalidNamingConfig(_)));

        let ok = NamingConfig::from_yaml("enumValue: MACROCASE\ninstanceTag: MACROCASE\n");
        assert!(ok.is_ok());
    }

    #[test]
    fn test_unknown_config_key_rejected() {
        let err = NamingConfig::from_yaml("typo:\n  object: PascalCase\n");
        assert!(err.is_err());
    }

    #[test]
    fn test_apply_renames_types_and_references() {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("vehicle_cabin", TypeKind::Object).with_field(
                FieldDefinition::new("DoorCount", TypeRef::named("Int")),
            ),
        );
        model.insert(
            TypeDefinition::new("vehicle", TypeKind::Object).with_field(
                FieldDefinition::new("cabin", TypeRef::named("vehicle_cabin")),
            ),
        );

        let config = NamingConfig::from_yaml(
            "type:\n  object: PascalCase\nfield:\n  object: camelCase\n",
        )
        .unwrap();
        apply_naming(&mut model, &config).unwrap();

        assert!(model.contains("VehicleCabin"));
        assert!(!model.contains("vehicle_cabin"));
        let vehicle = model.get("Vehicle").unwrap();
        assert_eq!(vehicle.fields["cabin"].ty.name, "VehicleCabin");
        let cabin = model.get("VehicleCabin").unwrap();
        assert!(cabin.fields.contains_key("doorCount"));
    }

    #[test]
    fn test_apply_preserves_instance_tag_field_name() {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Door", TypeKind::Object).with_field(FieldDefinition::new(
                INSTANCE_TAG_FIELD,
                TypeRef::named("DoorPosition"),
            )),
        );
        model.insert(TypeDefinition::new("DoorPosition", TypeKind::Object));

        let config =
            NamingConfig::from_yaml("field:\n  object: snake_case\n").unwrap();
        apply_naming(&mut model, &config).unwrap();
        assert!(model.get("Door").unwrap().fields.contains_key(INSTANCE_TAG_FIELD));
    }
}
