//! Flat signal-schema exporter
//!
//! Emits a YAML mapping of dotted signal paths: object types become
//! `type: branch` entries, scalar and enum fields become leaves carrying
//! datatype, bounds, unit and metadata. Nested object fields contribute
//! path segments which are reconstructed into fully-qualified keys, so
//! `Cabin.doorCount` under a `Vehicle.cabin` relation is emitted as
//! `Vehicle.Cabin.doorCount`.

use std::collections::{BTreeMap, HashMap, HashSet};

use serde_yaml::{Mapping, Value};
use tracing::debug;

use crate::compose::Composed;
use crate::error::Result;
use crate::export::{reject_nested_list, Exporter, ScalarKind};
use crate::model::{
    FieldDefinition, SchemaModel, TypeDefinition, TypeKind, INSTANCE_TAG_FIELD,
    ROOT_TYPE_NAMES,
};

const EXPORTER: &str = "vspec";

/// Unit-enum symbol → display unit
const UNITS: [(&str, &str); 15] = [
    ("MILLIM", "mm"),
    ("CENTIM", "cm"),
    ("M", "m"),
    ("KILOM", "km"),
    ("IN", "inch"),
    ("KILOM_PER_HR", "km/h"),
    ("M_PER_SEC", "m/s"),
    ("DEG_C", "celsius"),
    ("MILLISEC", "ms"),
    ("SEC", "s"),
    ("MIN", "min"),
    ("HR", "h"),
    ("DEG", "degrees"),
    ("W", "W"),
    ("KILOW", "kW"),
];

/// Display form of a unit-enum symbol, if known.
pub fn display_unit(symbol: &str) -> Option<&'static str> {
    UNITS
        .iter()
        .find(|(key, _)| *key == symbol)
        .map(|(_, unit)| *unit)
}

/// Exporter for the flat key-value schema
#[derive(Debug, Default)]
pub struct VspecExporter;

impl Exporter for VspecExporter {
    fn name(&self) -> &'static str {
        EXPORTER
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        let model = &composed.model;
        let intermediates = &composed.expansion.intermediate_types;

        let mut entries: BTreeMap<String, Value> = BTreeMap::new();
        let mut nested: Vec<(String, String)> = Vec::new();

        for def in model.object_types() {
            if ROOT_TYPE_NAMES.contains(&def.name.as_str())
                || def.is_instance_tag_marker()
                || intermediates.contains(&def.name)
            {
                debug!(name = %def.name, "skipping non-branch type");
                continue;
            }

            entries
                .entry(def.name.clone())
                .or_insert_with(|| branch_entry(def.description.as_deref(), None));

            for field in def.fields.values() {
                reject_nested_list(EXPORTER, &def.name, field)?;
                if let Some((key, value)) =
                    self.field_entry(model, composed, def, field, &mut nested)
                {
                    entries.insert(key, value);
                }
            }
        }

        let paths = reconstruct_paths(&nested);
        let mut rekeyed: BTreeMap<String, Value> = BTreeMap::new();
        for (key, value) in entries {
            let first = key.split('.').next().unwrap_or(&key);
            let prefixed = paths
                .iter()
                .find(|path| path.split('.').next_back() == Some(first))
                .map(|path| {
                    let parents: Vec<&str> =
                        path.split('.').take(path.split('.').count() - 1).collect();
                    if parents.is_empty() {
                        key.clone()
                    } else {
                        format!("{}.{}", parents.join("."), key)
                    }
                })
                .unwrap_or(key);
            rekeyed.insert(prefixed, value);
        }

        Ok(serde_yaml::to_string(&rekeyed)?)
    }
}

impl VspecExporter {
    fn field_entry(
        &self,
        model: &SchemaModel,
        composed: &Composed,
        parent: &TypeDefinition,
        field: &FieldDefinition,
        nested: &mut Vec<(String, String)>,
    ) -> Option<(String, Value)> {
        let qualified = format!("{}.{}", parent.name, field.name);

        if let Some(scalar) = ScalarKind::of(&field.ty.name) {
            return Some((qualified, scalar_leaf(field, scalar)));
        }

        let target = model.get(&field.ty.name)?;
        match target.kind {
            TypeKind::Enum => Some((qualified, enum_leaf(field, target))),
            TypeKind::Object => {
                if field.name == INSTANCE_TAG_FIELD && target.is_instance_tag_marker() {
                    return None;
                }
                // Expanded fields point at a synthetic tree; the branch is
                // the stripped element type, with its instances recorded.
                let expansion = composed
                    .expansion
                    .expanded_fields
                    .get(&(parent.name.clone(), field.name.clone()));
                let (resolved, instances) = match expansion {
                    Some(expanded) => (
                        expanded.element_type.clone(),
                        Some(expanded.instances.clone()),
                    ),
                    None => (target.name.clone(), None),
                };
                let resolved_def = model.get(&resolved)?;
                if resolved_def.is_instance_tag_marker() {
                    return None;
                }
                nested.push((parent.name.clone(), resolved.clone()));
                Some((
                    resolved,
                    branch_entry(resolved_def.description.as_deref(), instances),
                ))
            }
            _ => {
                debug!(field = %qualified, "skipping field with unsupported output type");
                None
            }
        }
    }
}

fn branch_entry(description: Option<&str>, instances: Option<Vec<String>>) -> Value {
    let mut map = Mapping::new();
    map.insert(Value::from("type"), Value::from("branch"));
    if let Some(description) = description {
        map.insert(Value::from("description"), Value::from(description));
    }
    if let Some(instances) = instances {
        map.insert(
            Value::from("instances"),
            Value::from(instances.into_iter().map(Value::from).collect::<Vec<_>>()),
        );
    }
    Value::from(map)
}

fn scalar_leaf(field: &FieldDefinition, scalar: ScalarKind) -> Value {
    let datatype = vspec_datatype(scalar);
    let mut map = Mapping::new();
    map.insert(
        Value::from("description"),
        Value::from(field.description.as_deref().unwrap_or_default()),
    );
    map.insert(Value::from("datatype"), Value::from(datatype));

    if let Some(range) = field.directives.range() {
        if let Some(min) = range.min {
            map.insert(Value::from("min"), bound_value(min, scalar));
        }
        if let Some(max) = range.max {
            map.insert(Value::from("max"), bound_value(max, scalar));
        }
    }

    if let Some(unit) = field
        .arguments
        .iter()
        .find(|arg| arg.name == "unit")
        .and_then(|arg| arg.default.as_deref())
        .and_then(display_unit)
    {
        map.insert(Value::from("unit"), Value::from(unit));
    }

    if let Some((comment, vss_type)) = field.directives.metadata() {
        if let Some(comment) = comment {
            map.insert(Value::from("comment"), Value::from(comment));
        }
        if let Some(vss_type) = vss_type {
            map.insert(Value::from("type"), Value::from(vss_type));
        }
    }
    Value::from(map)
}

fn enum_leaf(field: &FieldDefinition, target: &TypeDefinition) -> Value {
    let mut map = Mapping::new();
    map.insert(
        Value::from("description"),
        Value::from(field.description.as_deref().unwrap_or_default()),
    );
    map.insert(Value::from("datatype"), Value::from("string"));
    map.insert(
        Value::from("allowed"),
        Value::from(
            target
                .values
                .iter()
                .map(|v| Value::from(v.name.as_str()))
                .collect::<Vec<_>>(),
        ),
    );
    let vss_type = field
        .directives
        .metadata()
        .and_then(|(_, vss_type)| vss_type)
        .unwrap_or("attribute");
    map.insert(Value::from("type"), Value::from(vss_type));
    Value::from(map)
}

fn bound_value(value: f64, scalar: ScalarKind) -> Value {
    if scalar.is_integer() {
        Value::from(value as i64)
    } else {
        Value::from(value)
    }
}

fn vspec_datatype(scalar: ScalarKind) -> &'static str {
    match scalar {
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

/// Turn parent/child relations into unique dotted paths rooted at types
/// that never appear as children.
fn reconstruct_paths(nested: &[(String, String)]) -> Vec<String> {
    let mut graph: HashMap<&str, Vec<&str>> = HashMap::new();
    for (parent, child) in nested {
        graph.entry(parent).or_default().push(child);
    }

    let parents: HashSet<&str> = nested.iter().map(|(p, _)| p.as_str()).collect();
    let children: HashSet<&str> = nested.iter().map(|(_, c)| c.as_str()).collect();
    let mut roots: Vec<&str> = parents.difference(&children).copied().collect();
    roots.sort();

    let mut paths: HashSet<String> = HashSet::new();
    fn build(
        graph: &HashMap<&str, Vec<&str>>,
        current: &str,
        path: &mut Vec<String>,
        paths: &mut HashSet<String>,
    ) {
        paths.insert(path.join("."));
        if let Some(next) = graph.get(current) {
            for child in next {
                if path.iter().any(|seen| seen == child) {
                    continue;
                }
                path.push(child.to_string());
                build(graph, child, path, paths);
                path.pop();
            }
        }
    }
    for root in roots {
        build(&graph, root, &mut vec![root.to_string()], &mut paths);
    }

    let mut sorted: Vec<String> = paths.into_iter().collect();
    // Deeper paths win when several end in the same segment.
    sorted.sort_by(|a, b| {
        b.split('.')
            .count()
            .cmp(&a.split('.').count())
            .then_with(|| a.cmp(b))
    });
    sorted
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ComposeOptions};
    use crate::parser::parse_fragment;

    fn export_sdl(sdl: &str, expand: bool) -> String {
        let fragment = parse_fragment("test.graphql", sdl).unwrap();
        let composed = compose(
            &[fragment],
            &ComposeOptions {
                expand_instances: expand,
                ..Default::default()
            },
        )
        .unwrap();
        VspecExporter.export(&composed).unwrap()
    }

    #[test]
    fn test_branches_and_leaves() {
        let out = export_sdl(
            r#"
            "The vehicle"
            type Vehicle {
              cabin: Cabin
              "speed over ground"
              averageSpeed(unit: VelocityUnitEnum = KILOM_PER_HR): Float @range(min: 0, max: 300)
            }
            type Cabin { doorCount: Int @metadata(comment: "physical doors", vssType: "sensor") }
            "#,
            false,
        );
        let parsed: BTreeMap<String, Value> = serde_yaml::from_str(&out).unwrap();

        assert_eq!(parsed["Vehicle"]["type"], Value::from("branch"));
        assert_eq!(parsed["Vehicle.Cabin"]["type"], Value::from("branch"));
        let speed = &parsed["Vehicle.averageSpeed"];
        assert_eq!(speed["datatype"], Value::from("float"));
        assert_eq!(speed["unit"], Value::from("km/h"));
        assert_eq!(speed["min"], Value::from(0.0));
        assert_eq!(speed["max"], Value::from(300.0));

        let doors = &parsed["Vehicle.Cabin.doorCount"];
        assert_eq!(doors["datatype"], Value::from("int32"));
        assert_eq!(doors["comment"], Value::from("physical doors"));
        assert_eq!(doors["type"], Value::from("sensor"));
    }

    #[test]
    fn test_enum_leaf_allowed_values() {
        let out = export_sdl(
            "enum GearEnum { PARK DRIVE } type Transmission { gear: GearEnum }",
            false,
        );
        let parsed: BTreeMap<String, Value> = serde_yaml::from_str(&out).unwrap();
        let gear = &parsed["Transmission.gear"];
        assert_eq!(gear["datatype"], Value::from("string"));
        assert_eq!(
            gear["allowed"],
            Value::from(vec![Value::from("PARK"), Value::from("DRIVE")])
        );
        assert_eq!(gear["type"], Value::from("attribute"));
    }

    #[test]
    fn test_expanded_field_keeps_element_branch_with_instances() {
        let out = export_sdl(
            r#"
            type Cabin { doors: [Door] }
            type Door { isLocked: Boolean instanceTag: DoorPosition }
            type DoorPosition @instanceTag { row: TwoRowsEnum! side: TwoSidesEnum! }
            "#,
            true,
        );
        let parsed: BTreeMap<String, Value> = serde_yaml::from_str(&out).unwrap();

        // The synthetic tree types are invisible; the element branch
        // carries the expanded instances.
        assert!(parsed.keys().all(|key| !key.contains("Door_Row")));
        let door = &parsed["Cabin.Door"];
        assert_eq!(door["type"], Value::from("branch"));
        let instances = door["instances"].as_sequence().unwrap();
        assert_eq!(instances.len(), 4);
        assert_eq!(instances[0], Value::from("ROW1.DRIVERSIDE"));
        assert_eq!(parsed["Cabin.Door.isLocked"]["datatype"], Value::from("boolean"));
    }
}
