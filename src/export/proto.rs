//! Protocol Buffers exporter
//!
//! Emits proto3 text. Enums are wrapped in a carrier message with an
//! `UNSPECIFIED = 0` sentinel so every enum field has a defined default;
//! nullability becomes the `optional` keyword plus a `buf.validate`
//! required rule; constraint directives lower to `buf.validate` field
//! options. Field numbers follow model iteration order and restart for
//! every emitted message; numbering stability across regenerations is an
//! explicit non-goal.

use std::collections::BTreeSet;
use std::fmt::Write as _;

use crate::compose::Composed;
use crate::error::{Result, SchemaError};
use crate::export::{format_bound, reject_nested_list, Exporter, ScalarKind};
use crate::model::{FieldDefinition, SchemaModel, TypeDefinition, TypeKind};

const EXPORTER: &str = "proto";

const RESERVED_KEYWORDS: [&str; 13] = [
    "message", "enum", "service", "rpc", "option", "import", "package", "syntax",
    "reserved", "oneof", "repeated", "optional", "required",
];

/// Exporter for the binary-message schema
#[derive(Debug, Default)]
pub struct ProtoExporter {
    /// `package` declaration, if any
    pub package: Option<String>,
    /// Root types to inline; flatten mode is active when non-empty
    pub flatten_roots: Vec<String>,
    /// Name of the flattened root message
    pub message_name: Option<String>,
}

impl Exporter for ProtoExporter {
    fn name(&self) -> &'static str {
        EXPORTER
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        let model = &composed.model;

        let mut enums: Vec<&TypeDefinition> = Vec::new();
        let mut unions: Vec<&TypeDefinition> = Vec::new();
        let mut messages: Vec<&TypeDefinition> = Vec::new();
        for def in model.iter() {
            match def.kind {
                TypeKind::Enum => enums.push(def),
                TypeKind::Union => unions.push(def),
                TypeKind::Object | TypeKind::Interface => {
                    if !def.is_instance_tag_marker() {
                        messages.push(def);
                    }
                }
                TypeKind::Scalar | TypeKind::Input => {}
            }
        }

        let mut body = String::new();
        let mut has_options = false;

        let flatten = !self.flatten_roots.is_empty();
        if flatten {
            let (flat_fields, referenced) = self.flatten(model)?;
            let root_set: BTreeSet<&str> =
                self.flatten_roots.iter().map(String::as_str).collect();
            enums.retain(|def| referenced.contains(&def.name));
            unions.retain(|def| referenced.contains(&def.name));
            messages.retain(|def| {
                referenced.contains(&def.name) && !root_set.contains(def.name.as_str())
            });

            for def in &enums {
                emit_enum(&mut body, def);
            }
            for def in &unions {
                emit_union(&mut body, def);
            }
            for def in &messages {
                has_options |= emit_message(&mut body, model, def)?;
            }

            let name = self.message_name.as_deref().unwrap_or("Message");
            let _ = writeln!(body, "message {} {{", name);
            for line in flat_fields {
                has_options |= line.contains("buf.validate");
                body.push_str(&line);
                body.push('\n');
            }
            body.push_str("}\n\n");
        } else {
            for def in &enums {
                emit_enum(&mut body, def);
            }
            for def in &unions {
                emit_union(&mut body, def);
            }
            for def in &messages {
                has_options |= emit_message(&mut body, model, def)?;
            }
        }

        let mut out = String::from("syntax = \"proto3\";\n\n");
        if let Some(package) = &self.package {
            let _ = writeln!(out, "package {};\n", package);
        }
        if has_options {
            out.push_str("import \"buf/validate/validate.proto\";\n\n");
        }
        out.push_str(body.trim_end());
        out.push('\n');
        Ok(out)
    }
}

impl ProtoExporter {
    /// Build the flattened field list and the set of type names that must
    /// still be emitted as standalone definitions (list elements, unions
    /// and everything they reach).
    fn flatten(&self, model: &SchemaModel) -> Result<(Vec<String>, BTreeSet<String>)> {
        let mut fields: Vec<String> = Vec::new();
        let mut referenced: BTreeSet<String> = BTreeSet::new();
        let mut number = 1usize;

        for root in &self.flatten_roots {
            let def = model
                .get(root)
                .ok_or_else(|| SchemaError::UnknownRootType(root.clone()))?;
            self.flatten_type(model, def, root, &mut fields, &mut referenced, &mut number)?;
        }
        Ok((fields, referenced))
    }

    fn flatten_type(
        &self,
        model: &SchemaModel,
        def: &TypeDefinition,
        prefix: &str,
        fields: &mut Vec<String>,
        referenced: &mut BTreeSet<String>,
        number: &mut usize,
    ) -> Result<()> {
        for field in def.fields.values() {
            reject_nested_list(EXPORTER, &def.name, field)?;
            let flattened = format!("{}_{}", prefix, field.name);
            let target = model.get(&field.ty.name);
            let is_object = target
                .map(|t| matches!(t.kind, TypeKind::Object | TypeKind::Interface))
                .unwrap_or(false);

            if is_object && !field.ty.is_list() {
                let target = target.ok_or_else(|| SchemaError::UnknownRootType(
                    field.ty.name.clone(),
                ))?;
                self.flatten_type(model, target, &flattened, fields, referenced, number)?;
                continue;
            }

            // List elements and unions keep their own definitions.
            if let Some(target) = target {
                if matches!(
                    target.kind,
                    TypeKind::Object | TypeKind::Interface | TypeKind::Union | TypeKind::Enum
                ) {
                    collect_closure(model, &target.name, referenced);
                }
            }

            let rendered = render_field(model, field, &flattened, *number)?;
            fields.push(format!("  {}", rendered));
            *number += 1;
        }
        Ok(())
    }
}

/// Record `name` and every type it transitively references.
fn collect_closure(model: &SchemaModel, name: &str, referenced: &mut BTreeSet<String>) {
    if !referenced.insert(name.to_string()) {
        return;
    }
    let Some(def) = model.get(name) else {
        return;
    };
    for field in def.fields.values() {
        collect_closure(model, &field.ty.name, referenced);
    }
    for member in &def.members {
        collect_closure(model, member, referenced);
    }
    for iface in &def.implements {
        collect_closure(model, iface, referenced);
    }
}

fn emit_enum(out: &mut String, def: &TypeDefinition) {
    if let Some(description) = &def.description {
        emit_comment(out, description, "");
    }
    let _ = writeln!(out, "message {} {{", def.name);
    out.push_str("  enum Enum {\n");
    out.push_str("    UNSPECIFIED = 0;\n");
    for (index, value) in def.values.iter().enumerate() {
        if let Some(description) = &value.description {
            emit_comment(out, description, "    ");
        }
        let _ = writeln!(out, "    {} = {};", value.name, index + 1);
    }
    out.push_str("  }\n}\n\n");
}

fn emit_union(out: &mut String, def: &TypeDefinition) {
    if let Some(description) = &def.description {
        emit_comment(out, description, "");
    }
    let _ = writeln!(out, "message {} {{", def.name);
    out.push_str("  oneof value {\n");
    for (index, member) in def.members.iter().enumerate() {
        let _ = writeln!(
            out,
            "    {} {} = {};",
            member,
            escape_name(&member.to_ascii_lowercase()),
            index + 1
        );
    }
    out.push_str("  }\n}\n\n");
}

/// Emit one message; returns whether any field carries validate options.
fn emit_message(out: &mut String, model: &SchemaModel, def: &TypeDefinition) -> Result<bool> {
    if let Some(description) = &def.description {
        emit_comment(out, description, "");
    }
    let _ = writeln!(out, "message {} {{", def.name);
    let mut has_options = false;
    for (number, field) in def.fields.values().enumerate() {
        reject_nested_list(EXPORTER, &def.name, field)?;
        if let Some(description) = &field.description {
            emit_comment(out, description, "  ");
        }
        let rendered = render_field(model, field, &field.name, number + 1)?;
        has_options |= rendered.contains("buf.validate");
        let _ = writeln!(out, "  {}", rendered);
    }
    out.push_str("}\n\n");
    Ok(has_options)
}

fn emit_comment(out: &mut String, text: &str, indent: &str) {
    for line in text.lines() {
        let _ = writeln!(out, "{}// {}", indent, line);
    }
}

fn render_field(
    model: &SchemaModel,
    field: &FieldDefinition,
    rendered_name: &str,
    number: usize,
) -> Result<String> {
    let base = base_type(model, &field.ty.name);
    let mut declaration = if field.ty.is_list() {
        format!("repeated {}", base)
    } else if field.ty.nullable {
        format!("optional {}", base)
    } else {
        base.clone()
    };

    let _ = write!(declaration, " {} = {}", escape_name(rendered_name), number);

    let options = field_options(model, field, &base)?;
    if !options.is_empty() {
        let _ = write!(declaration, " [{}]", options.join(", "));
    }
    declaration.push(';');
    Ok(declaration)
}

fn base_type(model: &SchemaModel, name: &str) -> String {
    if let Some(kind) = ScalarKind::of(name) {
        return proto_scalar(kind).to_string();
    }
    match model.get(name).map(|t| t.kind) {
        Some(TypeKind::Enum) => format!("{}.Enum", name),
        // Custom scalars outside the fixed table degrade to string.
        Some(TypeKind::Scalar) => "string".to_string(),
        _ => name.to_string(),
    }
}

fn proto_scalar(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String | ScalarKind::Id => "string",
        ScalarKind::Boolean => "bool",
        ScalarKind::Int | ScalarKind::Int8 | ScalarKind::Int16 => "int32",
        ScalarKind::UInt8 | ScalarKind::UInt16 | ScalarKind::UInt32 => "uint32",
        ScalarKind::Int64 => "int64",
        ScalarKind::UInt64 => "uint64",
        ScalarKind::Float => "float",
    }
}

fn field_options(
    model: &SchemaModel,
    field: &FieldDefinition,
    proto_type: &str,
) -> Result<Vec<String>> {
    let mut rules: Vec<String> = Vec::new();
    let mut repeated_rules: Vec<String> = Vec::new();

    if !field.ty.nullable && !field.ty.is_list() {
        rules.push("(buf.validate.field).required = true".to_string());
    }

    if field.directives.has_no_duplicates() {
        let elementwise = ScalarKind::of(&field.ty.name).is_some()
            || model
                .get(&field.ty.name)
                .map(|t| t.kind == TypeKind::Enum)
                .unwrap_or(false);
        if elementwise {
            repeated_rules.push("unique: true".to_string());
        }
    }

    if let Some(cardinality) = field.directives.cardinality() {
        if let Some(min) = cardinality.min {
            repeated_rules.push(format!("min_items: {}", min));
        }
        if let Some(max) = cardinality.max {
            repeated_rules.push(format!("max_items: {}", max));
        }
    }

    if let Some(range) = field.directives.range() {
        if let Some(validation_type) = validation_type(proto_type) {
            let mut bounds = Vec::new();
            if let Some(min) = range.min {
                bounds.push(format!("gte: {}", format_bound(min)));
            }
            if let Some(max) = range.max {
                bounds.push(format!("lte: {}", format_bound(max)));
            }
            if !bounds.is_empty() {
                if field.ty.is_list() {
                    repeated_rules.push(format!(
                        "items: {{{}: {{{}}}}}",
                        validation_type,
                        bounds.join(", ")
                    ));
                } else {
                    rules.push(format!(
                        "(buf.validate.field).{} = {{{}}}",
                        validation_type,
                        bounds.join(", ")
                    ));
                }
            }
        }
    }

    if !repeated_rules.is_empty() {
        rules.push(format!(
            "(buf.validate.field).repeated = {{{}}}",
            repeated_rules.join(", ")
        ));
    }
    Ok(rules)
}

fn validation_type(proto_type: &str) -> Option<&'static str> {
    match proto_type {
        "int32" => Some("int32"),
        "uint32" => Some("uint32"),
        "int64" => Some("int64"),
        "uint64" => Some("uint64"),
        "float" => Some("float"),
        "double" => Some("double"),
        _ => None,
    }
}

fn escape_name(name: &str) -> String {
    if RESERVED_KEYWORDS.contains(&name) {
        format!("_{}_", name)
    } else {
        name.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ComposeOptions};
    use crate::parser::parse_fragment;

    fn compose_sdl(sdl: &str) -> Composed {
        let fragment = parse_fragment("test.graphql", sdl).unwrap();
        compose(&[fragment], &ComposeOptions::default()).unwrap()
    }

    #[test]
    fn test_nullability_markers() {
        let composed = compose_sdl(
            "type Cabin { temperature: Float speed: Int! doors: [String] }",
        );
        let out = ProtoExporter::default().export(&composed).unwrap();
        assert!(out.contains("optional float temperature = 1;"));
        assert!(out.contains("int32 speed = 2 [(buf.validate.field).required = true];"));
        assert!(out.contains("repeated string doors = 3;"));
    }

    #[test]
    fn test_enum_gets_sentinel() {
        let composed = compose_sdl("enum GearEnum { PARK DRIVE } type T { gear: GearEnum }");
        let out = ProtoExporter::default().export(&composed).unwrap();
        assert!(out.contains("message GearEnum {"));
        assert!(out.contains("UNSPECIFIED = 0;"));
        assert!(out.contains("PARK = 1;"));
        assert!(out.contains("DRIVE = 2;"));
        assert!(out.contains("optional GearEnum.Enum gear = 1;"));
    }

    #[test]
    fn test_constraint_directives_lower_to_validate_rules() {
        let composed = compose_sdl(
            r#"type Cabin {
                speed: Int @range(min: 0, max: 300)
                labels: [String] @noDuplicates @cardinality(min: 1, max: 8)
            }"#,
        );
        let out = ProtoExporter::default().export(&composed).unwrap();
        assert!(out.contains("(buf.validate.field).int32 = {gte: 0, lte: 300}"));
        assert!(out.contains("unique: true"));
        assert!(out.contains("min_items: 1"));
        assert!(out.contains("max_items: 8"));
        assert!(out.contains("import \"buf/validate/validate.proto\";"));
    }

    #[test]
    fn test_union_becomes_oneof() {
        let composed = compose_sdl(
            "type Gasoline { octane: Int } type Electric { kwh: Float } union Powertrain = Gasoline | Electric type Car { power: Powertrain }",
        );
        let out = ProtoExporter::default().export(&composed).unwrap();
        assert!(out.contains("message Powertrain {"));
        assert!(out.contains("oneof value {"));
        assert!(out.contains("Gasoline gasoline = 1;"));
    }

    #[test]
    fn test_nested_list_is_fatal() {
        let composed = compose_sdl("type Grid { cells: [[Int]] }");
        let err = ProtoExporter::default().export(&composed).unwrap_err();
        match err {
            SchemaError::Unsupported { exporter, field, .. } => {
                assert_eq!(exporter, "proto");
                assert_eq!(field, "Grid.cells");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_flatten_mode_prefixes_and_renumbers() {
        let composed = compose_sdl(
            r#"
            type Vehicle { cabin: Cabin speed: Float }
            type Cabin { doorCount: Int temperature: Float }
            "#,
        );
        let exporter = ProtoExporter {
            flatten_roots: vec!["Vehicle".to_string()],
            message_name: Some("VehicleState".to_string()),
            ..Default::default()
        };
        let out = exporter.export(&composed).unwrap();
        assert!(out.contains("message VehicleState {"));
        assert!(out.contains("optional int32 Vehicle_cabin_doorCount = 1;"));
        assert!(out.contains("optional float Vehicle_cabin_temperature = 2;"));
        assert!(out.contains("optional float Vehicle_speed = 3;"));
        // The fully flattened types disappear as standalone messages.
        assert!(!out.contains("message Cabin {"));
        assert!(!out.contains("message Vehicle {"));
    }

    #[test]
    fn test_reserved_field_name_escaped() {
        let composed = compose_sdl("type T { oneof: Int }");
        let out = ProtoExporter::default().export(&composed).unwrap();
        assert!(out.contains("optional int32 _oneof_ = 1;"));
    }

    #[test]
    fn test_package_header() {
        let composed = compose_sdl("type T { x: Int }");
        let exporter = ProtoExporter {
            package: Some("vehicle.v1".to_string()),
            ..Default::default()
        };
        let out = exporter.export(&composed).unwrap();
        assert!(out.starts_with("syntax = \"proto3\";\n\npackage vehicle.v1;\n"));
    }
}
