//! Concept URI registry
//!
//! Builds a JSON-LD document assigning a URI to every object, field and
//! enum concept in the model, with `hasField`/`hasNestedObject` relations
//! between them. Cross-references (`id` fields) are excluded.

use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::model::{SchemaModel, TypeKind, INSTANCE_TAG_FIELD, ROOT_TYPE_NAMES};

/// One node in the concept graph
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptUriNode {
    #[serde(rename = "@id")]
    pub id: String,
    #[serde(rename = "@type")]
    pub node_type: String,
    #[serde(rename = "hasField", skip_serializing_if = "Option::is_none")]
    pub has_field: Option<Vec<String>>,
    #[serde(rename = "hasNestedObject", skip_serializing_if = "Option::is_none")]
    pub has_nested_object: Option<String>,
}

impl ConceptUriNode {
    /// Concept name: the part after the prefix separator.
    pub fn concept_name(&self) -> &str {
        self.id.rsplit(':').next().unwrap_or(&self.id)
    }

    /// Field and enum concepts carry realization history.
    pub fn should_have_history(&self) -> bool {
        matches!(self.node_type.as_str(), "Field" | "Enum")
    }
}

/// The JSON-LD concept document
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConceptUriDocument {
    #[serde(rename = "@context")]
    pub context: serde_json::Value,
    #[serde(rename = "@graph")]
    pub graph: Vec<ConceptUriNode>,
}

impl ConceptUriDocument {
    pub fn namespace(&self) -> String {
        self.context
            .get("ns")
            .and_then(|v| v.as_str())
            .unwrap_or_default()
            .to_string()
    }
}

/// JSON-LD context shared by the concept and history documents.
pub fn jsonld_context(namespace: &str, include_history: bool) -> serde_json::Value {
    let mut context = json!({
        "ns": namespace,
        "type": "@type",
        "hasField": { "@id": format!("{}hasField", namespace), "@type": "@id" },
        "hasNestedObject": { "@id": format!("{}hasNestedObject", namespace), "@type": "@id" },
        "Object": format!("{}Object", namespace),
        "Enum": format!("{}Enum", namespace),
        "Field": format!("{}Field", namespace),
        "ObjectField": format!("{}ObjectField", namespace),
    });
    if include_history {
        context["specHistory"] = json!({
            "@id": format!("{}specHistory", namespace),
            "@container": "@list",
        });
    }
    context
}

/// Build the concept URI document for a composed model.
pub fn build_concept_uris(
    model: &SchemaModel,
    namespace: &str,
    prefix: &str,
) -> ConceptUriDocument {
    let uri = |name: &str| format!("{}:{}", prefix, name);

    let mut objects: Vec<ConceptUriNode> = Vec::new();
    let mut fields: Vec<ConceptUriNode> = Vec::new();
    let mut enums: Vec<ConceptUriNode> = Vec::new();
    let mut nested: Vec<ConceptUriNode> = Vec::new();

    for def in model.iter() {
        if ROOT_TYPE_NAMES.contains(&def.name.as_str()) {
            continue;
        }
        match def.kind {
            TypeKind::Enum => enums.push(ConceptUriNode {
                id: uri(&def.name),
                node_type: "Enum".to_string(),
                has_field: None,
                has_nested_object: None,
            }),
            TypeKind::Object => {
                if def.is_instance_tag_marker() {
                    continue;
                }
                let mut own_fields: Vec<String> = Vec::new();
                for field in def.fields.values() {
                    if field.name.eq_ignore_ascii_case("id")
                        || field.name == INSTANCE_TAG_FIELD
                    {
                        continue;
                    }
                    let qualified = format!("{}.{}", def.name, field.name);
                    let is_object_valued = model
                        .get(&field.ty.name)
                        .map(|t| t.kind == TypeKind::Object)
                        .unwrap_or(false);
                    if is_object_valued {
                        nested.push(ConceptUriNode {
                            id: uri(&qualified),
                            node_type: "ObjectField".to_string(),
                            has_field: None,
                            has_nested_object: Some(uri(&field.ty.name)),
                        });
                    } else {
                        own_fields.push(uri(&qualified));
                        fields.push(ConceptUriNode {
                            id: uri(&qualified),
                            node_type: "Field".to_string(),
                            has_field: None,
                            has_nested_object: None,
                        });
                    }
                }
                objects.push(ConceptUriNode {
                    id: uri(&def.name),
                    node_type: "Object".to_string(),
                    has_field: (!own_fields.is_empty()).then_some(own_fields),
                    has_nested_object: None,
                });
            }
            _ => {}
        }
    }

    let mut graph = objects;
    graph.extend(fields);
    graph.extend(enums);
    graph.extend(nested);

    ConceptUriDocument {
        context: jsonld_context(namespace, false),
        graph,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compose::{compose, ComposeOptions};
    use crate::parser::parse_fragment;

    fn build(sdl: &str) -> ConceptUriDocument {
        let fragment = parse_fragment("test.graphql", sdl).unwrap();
        let composed = compose(&[fragment], &ComposeOptions::default()).unwrap();
        build_concept_uris(&composed.model, "https://example.org/vhal#", "vhal")
    }

    #[test]
    fn test_node_kinds() {
        let document = build(
            r#"
            type Vehicle { cabin: Cabin averageSpeed: Float id: ID }
            type Cabin { doorCount: Int }
            enum GearEnum { PARK DRIVE }
            "#,
        );

        let find = |id: &str| document.graph.iter().find(|n| n.id == id);

        let vehicle = find("vhal:Vehicle").unwrap();
        assert_eq!(vehicle.node_type, "Object");
        assert_eq!(
            vehicle.has_field.as_deref(),
            Some(&["vhal:Vehicle.averageSpeed".to_string()][..])
        );

        let speed = find("vhal:Vehicle.averageSpeed").unwrap();
        assert_eq!(speed.node_type, "Field");
        assert!(speed.should_have_history());
        assert_eq!(speed.concept_name(), "Vehicle.averageSpeed");

        let nested = find("vhal:Vehicle.cabin").unwrap();
        assert_eq!(nested.node_type, "ObjectField");
        assert_eq!(nested.has_nested_object.as_deref(), Some("vhal:Cabin"));
        assert!(!nested.should_have_history());

        let gear = find("vhal:GearEnum").unwrap();
        assert_eq!(gear.node_type, "Enum");
        assert!(gear.should_have_history());

        // id fields carry no concept.
        assert!(find("vhal:Vehicle.id").is_none());
    }

    #[test]
    fn test_jsonld_serialization_uses_aliases() {
        let document = build("type Vehicle { speed: Float }");
        let rendered = serde_json::to_string_pretty(&document).unwrap();
        assert!(rendered.contains("\"@context\""));
        assert!(rendered.contains("\"@graph\""));
        assert!(rendered.contains("\"@id\": \"vhal:Vehicle\""));
        assert!(rendered.contains("\"@type\": \"Object\""));
    }
}
