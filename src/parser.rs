//! SDL fragment parsing
//!
//! Each input file becomes one [`Fragment`]: a provenance label plus the
//! type definitions it declares. Parsing performs no cross-type
//! resolution; that happens after the composer has merged all fragments.

use std::path::{Path, PathBuf};

use async_graphql_parser::types::{
    BaseType, ConstDirective, ServiceDocument, Type, TypeKind as AstTypeKind,
    TypeSystemDefinition,
};
use async_graphql_parser::{parse_schema, Positioned};
use async_graphql_value::ConstValue;
use indexmap::IndexMap;
use tracing::debug;
use walkdir::WalkDir;

use crate::directive::{Directive, DirectiveSet, LiteralValue};
use crate::error::{Result, SchemaError};
use crate::model::{
    Argument, EnumValue, FieldDefinition, ListWrapper, TypeDefinition, TypeKind, TypeRef,
};

/// One parsed schema source with its provenance label
#[derive(Debug, Clone)]
pub struct Fragment {
    /// Provenance label, normally the source file name
    pub label: String,
    /// Type definitions in declaration order
    pub types: Vec<TypeDefinition>,
}

/// Parse SDL text into a fragment.
pub fn parse_fragment(label: &str, source: &str) -> Result<Fragment> {
    let document = parse_schema(source).map_err(|e| {
        let location = e
            .positions()
            .next()
            .map(|pos| format!("line {} column {}: ", pos.line, pos.column))
            .unwrap_or_default();
        SchemaError::Parse {
            file: label.to_string(),
            message: format!("{}{}", location, e),
        }
    })?;

    let types = convert_document(label, document)?;
    debug!(fragment = label, types = types.len(), "parsed fragment");
    Ok(Fragment {
        label: label.to_string(),
        types,
    })
}

/// Resolve files and directories into fragments, one per `.graphql` file.
///
/// Directory contents are visited in sorted order so fragment order (and
/// therefore every downstream artifact) is deterministic.
pub fn load_fragments(paths: &[PathBuf]) -> Result<Vec<Fragment>> {
    let mut files: Vec<PathBuf> = Vec::new();
    for path in paths {
        if path.is_dir() {
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| SchemaError::Parse {
                    file: path.display().to_string(),
                    message: e.to_string(),
                })?;
                if entry.file_type().is_file()
                    && entry.path().extension().is_some_and(|ext| ext == "graphql")
                {
                    files.push(entry.path().to_path_buf());
                }
            }
        } else {
            files.push(path.clone());
        }
    }

    let mut fragments = Vec::with_capacity(files.len());
    for file in files {
        let source = std::fs::read_to_string(&file)?;
        fragments.push(parse_fragment(&file_label(&file), &source)?);
    }
    Ok(fragments)
}

fn file_label(path: &Path) -> String {
    path.file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string())
}

fn convert_document(label: &str, document: ServiceDocument) -> Result<Vec<TypeDefinition>> {
    let mut types = Vec::new();
    for definition in document.definitions {
        match definition {
            TypeSystemDefinition::Type(def) => {
                let def = def.node;
                if def.extend {
                    return Err(SchemaError::Parse {
                        file: label.to_string(),
                        message: format!("type extensions are not supported ('{}')", def.name.node),
                    });
                }
                types.push(convert_type(def)?);
            }
            // Directive definitions are fixed by the recognized vocabulary
            // and schema definitions carry no model content; both are
            // accepted in input for compatibility and dropped here.
            TypeSystemDefinition::Directive(_) | TypeSystemDefinition::Schema(_) => {}
        }
    }
    Ok(types)
}

fn convert_type(
    def: async_graphql_parser::types::TypeDefinition,
) -> Result<TypeDefinition> {
    let name = def.name.node.to_string();
    let directives = convert_directives(&def.directives, &name)?;
    let description = def.description.map(|d| d.node);

    let mut out = match def.kind {
        AstTypeKind::Scalar => TypeDefinition::new(&name, TypeKind::Scalar),
        AstTypeKind::Object(object) => {
            let mut td = TypeDefinition::new(&name, TypeKind::Object);
            td.implements = object
                .implements
                .iter()
                .map(|n| n.node.to_string())
                .collect();
            for field in object.fields {
                let field = convert_field(&name, field.node)?;
                td.fields.insert(field.name.clone(), field);
            }
            td
        }
        AstTypeKind::Interface(interface) => {
            let mut td = TypeDefinition::new(&name, TypeKind::Interface);
            td.implements = interface
                .implements
                .iter()
                .map(|n| n.node.to_string())
                .collect();
            for field in interface.fields {
                let field = convert_field(&name, field.node)?;
                td.fields.insert(field.name.clone(), field);
            }
            td
        }
        AstTypeKind::Union(union) => {
            let mut td = TypeDefinition::new(&name, TypeKind::Union);
            td.members = union.members.iter().map(|n| n.node.to_string()).collect();
            td
        }
        AstTypeKind::Enum(enumeration) => {
            let mut td = TypeDefinition::new(&name, TypeKind::Enum);
            for value in enumeration.values {
                let value = value.node;
                let value_name = value.value.node.to_string();
                td.values.push(EnumValue {
                    directives: convert_directives(
                        &value.directives,
                        &format!("{}.{}", name, value_name),
                    )?,
                    description: value.description.map(|d| d.node),
                    name: value_name,
                });
            }
            td
        }
        AstTypeKind::InputObject(input) => {
            let mut td = TypeDefinition::new(&name, TypeKind::Input);
            for field in input.fields {
                let field = field.node;
                let field_name = field.name.node.to_string();
                let element = format!("{}.{}", name, field_name);
                let mut fd = FieldDefinition::new(&field_name, convert_type_ref(&field.ty.node));
                fd.directives = convert_directives(&field.directives, &element)?;
                fd.description = field.description.map(|d| d.node);
                td.fields.insert(field_name, fd);
            }
            td
        }
    };

    out.directives = directives;
    out.description = description;
    Ok(out)
}

fn convert_field(
    parent: &str,
    field: async_graphql_parser::types::FieldDefinition,
) -> Result<FieldDefinition> {
    let name = field.name.node.to_string();
    let element = format!("{}.{}", parent, name);

    let mut arguments = Vec::with_capacity(field.arguments.len());
    for arg in field.arguments {
        let arg = arg.node;
        arguments.push(Argument {
            name: arg.name.node.to_string(),
            ty: convert_type_ref(&arg.ty.node),
            default: arg.default_value.map(|v| v.node.to_string()),
        });
    }

    Ok(FieldDefinition {
        ty: convert_type_ref(&field.ty.node),
        arguments,
        directives: convert_directives(&field.directives, &element)?,
        description: field.description.map(|d| d.node),
        name,
    })
}

fn convert_type_ref(ty: &Type) -> TypeRef {
    match &ty.base {
        BaseType::Named(name) => TypeRef {
            name: name.to_string(),
            nullable: ty.nullable,
            list: None,
        },
        BaseType::List(inner) => {
            // Unwrap to the innermost named type, recording whether more
            // than one list layer was present.
            let mut nested = false;
            let mut inner_nullable = inner.nullable;
            let mut current: &Type = inner;
            while let BaseType::List(deeper) = &current.base {
                nested = true;
                inner_nullable = deeper.nullable;
                current = deeper;
            }
            let name = match &current.base {
                BaseType::Named(name) => name.to_string(),
                BaseType::List(_) => unreachable!("loop unwraps all list layers"),
            };
            TypeRef {
                name,
                nullable: ty.nullable,
                list: Some(ListWrapper {
                    inner_nullable,
                    nested,
                }),
            }
        }
    }
}

fn convert_directives(
    directives: &[Positioned<ConstDirective>],
    element: &str,
) -> Result<DirectiveSet> {
    let mut out = Vec::with_capacity(directives.len());
    for directive in directives {
        let directive = &directive.node;
        let name = directive.name.node.as_str();
        let mut arguments: IndexMap<String, LiteralValue> = IndexMap::new();
        for (arg_name, value) in &directive.arguments {
            arguments.insert(
                arg_name.node.to_string(),
                convert_literal(&value.node, name, element)?,
            );
        }
        out.push(Directive::from_parts(name, arguments, element)?);
    }
    Ok(DirectiveSet::new(out))
}

fn convert_literal(value: &ConstValue, directive: &str, element: &str) -> Result<LiteralValue> {
    match value {
        ConstValue::String(s) => Ok(LiteralValue::String(s.clone())),
        ConstValue::Boolean(b) => Ok(LiteralValue::Bool(*b)),
        ConstValue::Enum(name) => Ok(LiteralValue::String(name.to_string())),
        ConstValue::Number(n) => {
            if let Some(i) = n.as_i64() {
                Ok(LiteralValue::Int(i))
            } else if let Some(f) = n.as_f64() {
                Ok(LiteralValue::Float(f))
            } else {
                Err(SchemaError::InvalidDirective {
                    element: element.to_string(),
                    message: format!("@{} has a non-representable number", directive),
                })
            }
        }
        other => Err(SchemaError::InvalidDirective {
            element: element.to_string(),
            message: format!("@{} argument {} is not a literal", directive, other),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;

    const SAMPLE: &str = r#"
        "A door of the cabin"
        type Door {
          isLocked: Boolean
          position: Int @range(min: 0, max: 100)
          instanceTag: DoorPosition
        }

        type DoorPosition @instanceTag {
          row: RowEnum!
          side: SideEnum!
        }

        enum RowEnum { ROW1 ROW2 }
        enum SideEnum { DRIVERSIDE PASSENGERSIDE }

        type Cabin {
          doors: [Door] @noDuplicates @cardinality(min: 2, max: 4)
          temperature(unit: TemperatureUnitEnum = DEG_C): Float
        }

        enum TemperatureUnitEnum { DEG_C DEG_F }
    "#;

    #[test]
    fn test_parse_sample_fragment() {
        let fragment = parse_fragment("cabin.graphql", SAMPLE).unwrap();
        assert_eq!(fragment.types.len(), 6);

        let door = &fragment.types[0];
        assert_eq!(door.name, "Door");
        assert_eq!(door.kind, TypeKind::Object);
        assert_eq!(door.description.as_deref(), Some("A door of the cabin"));
        let position = &door.fields["position"];
        let range = position.directives.range().unwrap();
        assert_eq!(range.min, Some(0.0));
        assert_eq!(range.max, Some(100.0));

        let marker = &fragment.types[1];
        assert!(marker.is_instance_tag_marker());

        let cabin = &fragment.types[4];
        let doors = &cabin.fields["doors"];
        assert!(doors.ty.is_list());
        assert!(doors.directives.has_no_duplicates());
        let cardinality = doors.directives.cardinality().unwrap();
        assert_eq!((cardinality.min, cardinality.max), (Some(2), Some(4)));

        let temperature = &cabin.fields["temperature"];
        assert_eq!(temperature.arguments.len(), 1);
        assert_eq!(temperature.arguments[0].default.as_deref(), Some("DEG_C"));
    }

    #[test]
    fn test_parse_error_carries_file_and_location() {
        let err = parse_fragment("broken.graphql", "type {").unwrap_err();
        match err {
            SchemaError::Parse { file, message } => {
                assert_eq!(file, "broken.graphql");
                assert!(message.contains("line"), "missing location: {message}");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_nested_list_recorded() {
        let fragment =
            parse_fragment("matrix.graphql", "type Grid { cells: [[Int]] }").unwrap();
        let grid = &fragment.types[0];
        let cells = &grid.fields["cells"];
        assert!(cells.ty.list.map(|w| w.nested).unwrap_or(false));
    }

    #[test]
    fn test_unknown_directive_is_preserved() {
        let fragment =
            parse_fragment("x.graphql", "type X { y: Int @vendor(level: 3) }").unwrap();
        let field = &fragment.types[0].fields["y"];
        let unknown = field
            .directives
            .iter()
            .find(|d| matches!(d, Directive::Unknown { .. }))
            .unwrap();
        assert_eq!(unknown.to_sdl(), "@vendor(level: 3)");
    }
}
