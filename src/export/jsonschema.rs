//! JSON Schema exporter
//!
//! Emits a draft 2020-12 document with every type under `$defs` and
//! object fields referencing each other through `$ref`. Non-null fields
//! land in `required`; strict mode additionally turns every nullable
//! position into an explicit union with `null`.

use serde_json::{json, Map, Value};
use tracing::warn;

use crate::compose::Composed;
use crate::error::Result;
use crate::export::{reject_nested_list, Exporter, ScalarKind};
use crate::model::{
    FieldDefinition, SchemaModel, TypeDefinition, TypeKind, INSTANCE_TAG_FIELD,
};

const EXPORTER: &str = "jsonschema";

/// Exporter for the structural-validation schema
#[derive(Debug, Default)]
pub struct JsonSchemaExporter {
    /// Emit `title`/`$ref` for this root and restrict to its closure
    pub root_type: Option<String>,
    /// Explicit null unions for nullable positions
    pub strict: bool,
}

impl Exporter for JsonSchemaExporter {
    fn name(&self) -> &'static str {
        EXPORTER
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        let model = &composed.model;
        let mut document = Map::new();
        document.insert(
            "$schema".to_string(),
            json!("https://json-schema.org/draft/2020-12/schema"),
        );

        let names: Vec<String> = match &self.root_type {
            Some(root) => {
                document.insert("title".to_string(), json!(root));
                document.insert("$ref".to_string(), json!(format!("#/$defs/{}", root)));
                reachable_from(model, root)
            }
            None => {
                document.insert("type".to_string(), json!("object"));
                document.insert("title".to_string(), json!("Schema"));
                model.type_names()
            }
        };

        let mut defs = Map::new();
        for name in names {
            let Some(def) = model.get(&name) else {
                continue;
            };
            if let Some(value) = self.transform_type(model, def)? {
                defs.insert(name, value);
            }
        }
        document.insert("$defs".to_string(), Value::Object(defs));

        let mut rendered = serde_json::to_string_pretty(&Value::Object(document))?;
        rendered.push('\n');
        Ok(rendered)
    }
}

impl JsonSchemaExporter {
    fn transform_type(
        &self,
        model: &SchemaModel,
        def: &TypeDefinition,
    ) -> Result<Option<Value>> {
        match def.kind {
            TypeKind::Object | TypeKind::Interface => {
                if def.is_instance_tag_marker() {
                    warn!(name = %def.name, "skipping instance-tag marker type");
                    return Ok(None);
                }
                Ok(Some(self.transform_object(model, def)?))
            }
            TypeKind::Enum => {
                let mut out = Map::new();
                out.insert("type".to_string(), json!("string"));
                out.insert(
                    "enum".to_string(),
                    json!(def.value_names()),
                );
                if let Some(description) = &def.description {
                    out.insert("description".to_string(), json!(description));
                }
                Ok(Some(Value::Object(out)))
            }
            TypeKind::Union => {
                let variants: Vec<Value> = def
                    .members
                    .iter()
                    .map(|member| json!({ "$ref": format!("#/$defs/{}", member) }))
                    .collect();
                let mut out = Map::new();
                out.insert("oneOf".to_string(), Value::Array(variants));
                if let Some(description) = &def.description {
                    out.insert("description".to_string(), json!(description));
                }
                Ok(Some(Value::Object(out)))
            }
            // Custom scalars flatten into their fields' type mapping.
            TypeKind::Scalar | TypeKind::Input => Ok(None),
        }
    }

    fn transform_object(&self, model: &SchemaModel, def: &TypeDefinition) -> Result<Value> {
        let mut out = Map::new();
        out.insert("additionalProperties".to_string(), json!(false));
        let mut properties = Map::new();
        let mut required: Vec<String> = Vec::new();

        for field in def.fields.values() {
            // The marker link disappears with expansion; when the model is
            // exported unexpanded it is dropped here, matching the marker
            // types themselves being absent from $defs.
            if field.name == INSTANCE_TAG_FIELD
                && model
                    .get(&field.ty.name)
                    .map(|t| t.is_instance_tag_marker())
                    .unwrap_or(false)
            {
                continue;
            }
            reject_nested_list(EXPORTER, &def.name, field)?;

            if !field.ty.nullable {
                required.push(field.name.clone());
            }
            properties.insert(field.name.clone(), self.transform_field(model, field)?);
        }

        out.insert("properties".to_string(), Value::Object(properties));
        out.insert("type".to_string(), json!("object"));
        if let Some(description) = &def.description {
            out.insert("description".to_string(), json!(description));
        }
        if !required.is_empty() {
            out.insert("required".to_string(), json!(required));
        }
        Ok(Value::Object(out))
    }

    fn transform_field(&self, model: &SchemaModel, field: &FieldDefinition) -> Result<Value> {
        let mut value = self.type_definition(model, field);

        if let Value::Object(out) = &mut value {
            if let Some(description) = &field.description {
                out.insert("description".to_string(), json!(description));
            }
            for (key, extension) in directive_extensions(field) {
                out.insert(key, extension);
            }
        }
        Ok(value)
    }

    fn type_definition(&self, model: &SchemaModel, field: &FieldDefinition) -> Value {
        let item = self.base_definition(model, &field.ty.name);

        match field.ty.list {
            Some(wrapper) => {
                let items = if wrapper.inner_nullable && self.strict {
                    nullable_variant(item)
                } else {
                    item
                };
                let array = json!({ "type": "array", "items": items });
                if field.ty.nullable && self.strict {
                    nullable_variant(array)
                } else {
                    array
                }
            }
            None => {
                if field.ty.nullable && self.strict {
                    nullable_variant(item)
                } else {
                    item
                }
            }
        }
    }

    fn base_definition(&self, model: &SchemaModel, name: &str) -> Value {
        if let Some(kind) = ScalarKind::of(name) {
            return json!({ "type": json_scalar(kind) });
        }
        match model.get(name).map(|t| t.kind) {
            Some(TypeKind::Scalar) | None => json!({ "type": "string" }),
            Some(_) => json!({ "$ref": format!("#/$defs/{}", name) }),
        }
    }
}

fn nullable_variant(value: Value) -> Value {
    match &value {
        Value::Object(map) if map.contains_key("type") && map.len() == 1 => {
            if let Some(Value::String(ty)) = map.get("type") {
                return json!({ "type": [ty, "null"] });
            }
            json!({ "oneOf": [value, { "type": "null" }] })
        }
        _ => json!({ "oneOf": [value, { "type": "null" }] }),
    }
}

fn json_scalar(kind: ScalarKind) -> &'static str {
    match kind {
        ScalarKind::String | ScalarKind::Id => "string",
        ScalarKind::Boolean => "boolean",
        ScalarKind::Float => "number",
        _ => "integer",
    }
}

fn directive_extensions(field: &FieldDefinition) -> Vec<(String, Value)> {
    let mut extensions = Vec::new();

    if field.directives.has_no_duplicates() {
        extensions.push(("uniqueItems".to_string(), json!(true)));
    }
    if let Some(cardinality) = field.directives.cardinality() {
        if let Some(min) = cardinality.min {
            extensions.push(("minItems".to_string(), json!(min)));
        }
        if let Some(max) = cardinality.max {
            extensions.push(("maxItems".to_string(), json!(max)));
        }
    }
    if let Some(range) = field.directives.range() {
        if let Some(min) = range.min {
            extensions.push(("minimum".to_string(), json_number(min)));
        }
        if let Some(max) = range.max {
            extensions.push(("maximum".to_string(), json_number(max)));
        }
    }
    if let Some((comment, vss_type)) = field.directives.metadata() {
        if let Some(comment) = comment {
            extensions.push(("$comment".to_string(), json!(comment)));
        }
        if let Some(vss_type) = vss_type {
            extensions.push(("x-metadata".to_string(), json!({ "vssType": vss_type })));
        }
    }
    extensions
}

/// Integer-valued bounds stay JSON integers.
fn json_number(value: f64) -> Value {
    if value.fract() == 0.0 && value.abs() < 1e15 {
        json!(value as i64)
    } else {
        json!(value)
    }
}

/// Read-only reachability walk, skipping marker internals.
fn reachable_from(model: &SchemaModel, root: &str) -> Vec<String> {
    let mut seen: indexmap::IndexSet<String> = indexmap::IndexSet::new();
    let mut stack = vec![root.to_string()];
    while let Some(name) = stack.pop() {
        if !seen.insert(name.clone()) {
            continue;
        }
        let Some(def) = model.get(&name) else {
            continue;
        };
        if def.is_instance_tag_marker() {
            continue;
        }
        for field in def.fields.values() {
            stack.push(field.ty.name.clone());
            for arg in &field.arguments {
                stack.push(arg.ty.name.clone());
            }
        }
        stack.extend(def.members.iter().cloned());
        stack.extend(def.implements.iter().cloned());
    }
    // Model order keeps the output stable regardless of walk order.
    model
        .type_names()
        .into_iter()
        .filter(|name| seen.contains(name))
        .collect()
}
