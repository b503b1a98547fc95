//! Instance-tag expansion
//!
//! Rewrites list fields whose element type carries an `instanceTag` link
//! into a cartesian-product tree of synthetic types, one level per
//! classification dimension. For `Cabin.doors: [Door]` with a marker
//! `DoorPosition { row: RowEnum, side: SideEnum }` the result is
//!
//! ```text
//! Cabin.Door: Door_Row!          (field renamed to the singular type name)
//! Door_Row   { ROW1: Door_Side!, ROW2: Door_Side! }
//! Door_Side  { DRIVERSIDE: Door!, PASSENGERSIDE: Door! }
//! Door       (instanceTag field stripped)
//! ```
//!
//! The marker type itself is consumed; its dimension enums stay in the
//! model untouched.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::compose::naming::{CaseFormat, NamingConfig};
use crate::error::{Result, SchemaError};
use crate::model::{
    FieldDefinition, SchemaModel, TypeDefinition, TypeKind, TypeRef, INSTANCE_TAG_FIELD,
};

/// What the expansion did, for exporters that need to tell synthetic
/// types and expanded fields apart (the flat exporter in particular).
#[derive(Debug, Clone, Default)]
pub struct ExpansionMeta {
    /// Names of the synthetic intermediate types
    pub intermediate_types: HashSet<String>,
    /// (parent type, new field name) → expansion record
    pub expanded_fields: HashMap<(String, String), ExpandedField>,
}

/// Expansion record for one rewritten field
#[derive(Debug, Clone)]
pub struct ExpandedField {
    /// The list field's name before the rewrite
    pub original_name: String,
    /// The stripped element type at the leaves
    pub element_type: String,
    /// The outermost synthetic type the field now points at
    pub outer_type: String,
    /// Dot-joined tag paths, one per leaf (`ROW1.DRIVERSIDE`, ...)
    pub instances: Vec<String>,
}

/// One classification dimension of a marker type
struct Dimension {
    name: String,
    values: Vec<String>,
}

/// Expand every instance-tagged list field in the model.
pub fn expand_instances(
    model: &mut SchemaModel,
    naming: Option<&NamingConfig>,
) -> Result<ExpansionMeta> {
    let tag_case = naming.and_then(|n| n.instance_tag_format());

    // Candidate list fields, in model order: (parent, field, element, marker).
    let mut candidates: Vec<(String, String, String, String)> = Vec::new();
    for def in model.iter() {
        if !matches!(def.kind, TypeKind::Object | TypeKind::Interface) {
            continue;
        }
        if def.is_instance_tag_marker() {
            continue;
        }
        for field in def.fields.values() {
            if !field.ty.is_list() {
                continue;
            }
            let Some(element) = model.get(&field.ty.name) else {
                continue;
            };
            if let Some(marker) = model.instance_tag_marker(element) {
                candidates.push((
                    def.name.clone(),
                    field.name.clone(),
                    element.name.clone(),
                    marker.name.clone(),
                ));
            }
        }
    }

    let mut meta = ExpansionMeta::default();
    // element type → (outer synthetic type, instances); chains are shared
    // between parents that list the same element type.
    let mut chains: HashMap<String, (String, Vec<String>)> = HashMap::new();
    let mut consumed_markers: HashSet<String> = HashSet::new();

    for (parent_name, field_name, element_name, marker_name) in candidates {
        let qualified = format!("{}.{}", parent_name, field_name);

        if !chains.contains_key(&element_name) {
            let dimensions = marker_dimensions(model, &marker_name, tag_case)?;
            let (outer, synthetic) =
                build_chain(model, &element_name, &dimensions, &qualified)?;
            for def in synthetic {
                meta.intermediate_types.insert(def.name.clone());
                model.insert(def);
            }
            let instances = tag_paths(&dimensions);
            chains.insert(element_name.clone(), (outer, instances));
            consumed_markers.insert(marker_name.clone());

            // The element sheds its marker link.
            if let Some(element) = model.get_mut(&element_name) {
                element.fields.shift_remove(INSTANCE_TAG_FIELD);
            }
        }

        let (outer, instances) = chains[&element_name].clone();
        let singular = singularize(&element_name);

        let parent = model
            .get_mut(&parent_name)
            .ok_or_else(|| SchemaError::UnknownRootType(parent_name.clone()))?;
        let mut rebuilt = indexmap::IndexMap::with_capacity(parent.fields.len());
        for (name, field) in std::mem::take(&mut parent.fields) {
            if name == field_name {
                let mut replacement =
                    FieldDefinition::new(&singular, TypeRef::non_null(&outer));
                replacement.description = field.description.clone();
                // List-shaped constraints no longer apply to the tree.
                for directive in field.directives.iter() {
                    if !matches!(
                        directive,
                        crate::directive::Directive::Cardinality(_)
                            | crate::directive::Directive::NoDuplicates
                    ) {
                        replacement.directives.push(directive.clone());
                    }
                }
                rebuilt.insert(replacement.name.clone(), replacement);
            } else {
                rebuilt.insert(name, field);
            }
        }
        parent.fields = rebuilt;

        debug!(
            parent = %parent_name,
            field = %field_name,
            leaves = instances.len(),
            "expanded instance-tagged field"
        );
        meta.expanded_fields.insert(
            (parent_name.clone(), singular.clone()),
            ExpandedField {
                original_name: field_name,
                element_type: element_name.clone(),
                outer_type: outer,
                instances,
            },
        );
    }

    for marker in consumed_markers {
        model.remove(&marker);
    }

    Ok(meta)
}

/// Read and validate the marker's ordered dimensions.
fn marker_dimensions(
    model: &SchemaModel,
    marker_name: &str,
    tag_case: Option<CaseFormat>,
) -> Result<Vec<Dimension>> {
    let marker = model
        .get(marker_name)
        .ok_or_else(|| SchemaError::UnknownRootType(marker_name.to_string()))?;

    if marker.fields.is_empty() {
        return Err(SchemaError::InvalidInstanceTag {
            marker: marker_name.to_string(),
            message: "marker has no dimension fields".to_string(),
        });
    }

    let mut dimensions = Vec::with_capacity(marker.fields.len());
    for field in marker.fields.values() {
        let dimension = model.get(&field.ty.name).filter(|t| t.kind == TypeKind::Enum);
        let Some(dimension) = dimension else {
            return Err(SchemaError::InvalidInstanceTag {
                marker: marker_name.to_string(),
                message: format!("dimension field '{}' is not an enum", field.name),
            });
        };
        if dimension.values.is_empty() {
            return Err(SchemaError::InvalidInstanceTag {
                marker: marker_name.to_string(),
                message: format!("dimension enum '{}' has no values", dimension.name),
            });
        }
        let values = dimension
            .values
            .iter()
            .map(|v| match tag_case {
                Some(case) => case.convert(&v.name),
                None => v.name.clone(),
            })
            .collect();
        dimensions.push(Dimension {
            name: field.name.clone(),
            values,
        });
    }
    Ok(dimensions)
}

/// Build the synthetic chain, innermost dimension first. Returns the
/// outermost type name and the new definitions in creation order.
fn build_chain(
    model: &SchemaModel,
    element: &str,
    dimensions: &[Dimension],
    qualified_field: &str,
) -> Result<(String, Vec<TypeDefinition>)> {
    let mut synthetic: Vec<TypeDefinition> = Vec::with_capacity(dimensions.len());
    let mut next_type = element.to_string();

    for dimension in dimensions.iter().rev() {
        let name = format!("{}_{}", element, CaseFormat::Pascal.convert(&dimension.name));
        if model.contains(&name) || synthetic.iter().any(|t| t.name == name) {
            return Err(SchemaError::ExpansionCollision {
                field: qualified_field.to_string(),
                name,
            });
        }
        let mut def = TypeDefinition::new(&name, TypeKind::Object);
        for value in &dimension.values {
            def.fields.insert(
                value.clone(),
                FieldDefinition::new(value, TypeRef::non_null(&next_type)),
            );
        }
        next_type = name;
        synthetic.push(def);
    }

    synthetic.reverse();
    Ok((next_type, synthetic))
}

/// Cartesian product of dimension values as dot-joined tag paths.
fn tag_paths(dimensions: &[Dimension]) -> Vec<String> {
    let mut paths: Vec<String> = vec![String::new()];
    for dimension in dimensions {
        let mut next = Vec::with_capacity(paths.len() * dimension.values.len());
        for path in &paths {
            for value in &dimension.values {
                if path.is_empty() {
                    next.push(value.clone());
                } else {
                    next.push(format!("{}.{}", path, value));
                }
            }
        }
        paths = next;
    }
    paths
}

/// Singular form of an expanded list field: one trailing `s` stripped.
/// Known limitation: irregular plurals come out wrong (`axes` → `axe`).
fn singularize(name: &str) -> String {
    name.strip_suffix('s').unwrap_or(name).to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;
    use crate::model::EnumValue;

    fn enum_type(name: &str, values: &[&str]) -> TypeDefinition {
        let mut def = TypeDefinition::new(name, TypeKind::Enum);
        for value in values {
            def.values.push(EnumValue {
                name: value.to_string(),
                description: None,
                directives: Default::default(),
            });
        }
        def
    }

    fn cabin_model() -> SchemaModel {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Cabin", TypeKind::Object).with_field(
                FieldDefinition::new("doors", TypeRef::list_of("Door", true, true)),
            ),
        );
        model.insert(
            TypeDefinition::new("Door", TypeKind::Object)
                .with_field(FieldDefinition::new("isLocked", TypeRef::named("Boolean")))
                .with_field(FieldDefinition::new(
                    INSTANCE_TAG_FIELD,
                    TypeRef::named("DoorPosition"),
                )),
        );
        let mut marker = TypeDefinition::new("DoorPosition", TypeKind::Object)
            .with_field(FieldDefinition::new("row", TypeRef::non_null("RowEnum")))
            .with_field(FieldDefinition::new("side", TypeRef::non_null("SideEnum")));
        marker.directives.push(Directive::InstanceTag);
        model.insert(marker);
        model.insert(enum_type("RowEnum", &["ROW1", "ROW2"]));
        model.insert(enum_type("SideEnum", &["DRIVERSIDE", "PASSENGERSIDE"]));
        model
    }

    #[test]
    fn test_two_dimension_expansion() {
        let mut model = cabin_model();
        let meta = expand_instances(&mut model, None).unwrap();

        // Field renamed to the singular type name and made required.
        let cabin = model.get("Cabin").unwrap();
        assert!(!cabin.fields.contains_key("doors"));
        let door_field = &cabin.fields["Door"];
        assert_eq!(door_field.ty.name, "Door_Row");
        assert!(!door_field.ty.nullable);
        assert!(!door_field.ty.is_list());

        // Outer level: rows pointing at the side level.
        let row = model.get("Door_Row").unwrap();
        assert_eq!(row.fields.len(), 2);
        assert_eq!(row.fields["ROW1"].ty.name, "Door_Side");
        assert!(!row.fields["ROW1"].ty.nullable);

        // Inner level: sides pointing at the stripped element.
        let side = model.get("Door_Side").unwrap();
        assert_eq!(side.fields.len(), 2);
        assert_eq!(side.fields["DRIVERSIDE"].ty.name, "Door");

        // Marker consumed, element stripped, enums retained.
        assert!(!model.contains("DoorPosition"));
        assert!(!model.get("Door").unwrap().fields.contains_key(INSTANCE_TAG_FIELD));
        assert!(model.contains("RowEnum"));
        assert!(model.contains("SideEnum"));

        let expanded = &meta.expanded_fields[&("Cabin".to_string(), "Door".to_string())];
        assert_eq!(expanded.original_name, "doors");
        assert_eq!(
            expanded.instances,
            vec![
                "ROW1.DRIVERSIDE",
                "ROW1.PASSENGERSIDE",
                "ROW2.DRIVERSIDE",
                "ROW2.PASSENGERSIDE"
            ]
        );
    }

    #[test]
    fn test_leaf_and_intermediate_counts() {
        // Dimensions of size 2 and 3: 6 leaves, 2 + 2*3 = 8 intermediate
        // fields spread over 2 synthetic levels.
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Cabin", TypeKind::Object).with_field(
                FieldDefinition::new("seats", TypeRef::list_of("Seat", true, true)),
            ),
        );
        model.insert(
            TypeDefinition::new("Seat", TypeKind::Object).with_field(FieldDefinition::new(
                INSTANCE_TAG_FIELD,
                TypeRef::named("SeatPosition"),
            )),
        );
        let mut marker = TypeDefinition::new("SeatPosition", TypeKind::Object)
            .with_field(FieldDefinition::new("row", TypeRef::non_null("RowEnum")))
            .with_field(FieldDefinition::new("column", TypeRef::non_null("ColumnEnum")));
        marker.directives.push(Directive::InstanceTag);
        model.insert(marker);
        model.insert(enum_type("RowEnum", &["ROW1", "ROW2"]));
        model.insert(enum_type("ColumnEnum", &["LEFT", "CENTER", "RIGHT"]));

        let meta = expand_instances(&mut model, None).unwrap();
        assert_eq!(meta.intermediate_types.len(), 2);

        let outer = model.get("Seat_Row").unwrap();
        let inner = model.get("Seat_Column").unwrap();
        assert_eq!(outer.fields.len(), 2);
        assert_eq!(inner.fields.len(), 3);

        // Leaves of the tree: every inner field of every outer branch.
        let leaves = outer.fields.len() * inner.fields.len();
        assert_eq!(leaves, 6);
        let expanded = &meta.expanded_fields[&("Cabin".to_string(), "Seat".to_string())];
        assert_eq!(expanded.instances.len(), 6);
    }

    #[test]
    fn test_untagged_lists_left_alone() {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Garage", TypeKind::Object).with_field(
                FieldDefinition::new("tools", TypeRef::list_of("Tool", true, true)),
            ),
        );
        model.insert(
            TypeDefinition::new("Tool", TypeKind::Object)
                .with_field(FieldDefinition::new("name", TypeRef::named("String"))),
        );
        let meta = expand_instances(&mut model, None).unwrap();
        assert!(meta.expanded_fields.is_empty());
        assert!(model.get("Garage").unwrap().fields.contains_key("tools"));
    }

    #[test]
    fn test_marker_without_dimensions_is_fatal() {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Cabin", TypeKind::Object).with_field(
                FieldDefinition::new("doors", TypeRef::list_of("Door", true, true)),
            ),
        );
        model.insert(
            TypeDefinition::new("Door", TypeKind::Object).with_field(FieldDefinition::new(
                INSTANCE_TAG_FIELD,
                TypeRef::named("DoorPosition"),
            )),
        );
        let mut marker = TypeDefinition::new("DoorPosition", TypeKind::Object);
        marker.directives.push(Directive::InstanceTag);
        model.insert(marker);

        let err = expand_instances(&mut model, None).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidInstanceTag { .. }));
    }

    #[test]
    fn test_empty_dimension_enum_is_fatal() {
        let mut model = cabin_model();
        model.get_mut("SideEnum").unwrap().values.clear();
        let err = expand_instances(&mut model, None).unwrap_err();
        match err {
            SchemaError::InvalidInstanceTag { message, .. } => {
                assert!(message.contains("SideEnum"));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_synthetic_name_collision_is_fatal() {
        let mut model = cabin_model();
        // A pre-existing type at the synthetic name must never be
        // silently renamed around.
        model.insert(TypeDefinition::new("Door_Row", TypeKind::Object));
        let err = expand_instances(&mut model, None).unwrap_err();
        match err {
            SchemaError::ExpansionCollision { field, name } => {
                assert_eq!(field, "Cabin.doors");
                assert_eq!(name, "Door_Row");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_instance_tag_case_applied_to_segments() {
        let mut model = cabin_model();
        let config = NamingConfig::from_yaml(
            "enumValue: camelCase\ninstanceTag: camelCase\n",
        )
        .unwrap();
        let meta = expand_instances(&mut model, Some(&config)).unwrap();
        let expanded = &meta.expanded_fields[&("Cabin".to_string(), "Door".to_string())];
        assert!(expanded.instances.contains(&"row1.driverside".to_string()));
        assert!(model.get("Door_Row").unwrap().fields.contains_key("row1"));
    }
}
