//! Composed-schema SDL printer
//!
//! Re-emits the composed model as SDL text, directives included, so the
//! output of `compose` is itself a valid input fragment. Definitions of
//! the recognized directives are printed only when something uses them.

use std::collections::BTreeSet;

use crate::compose::Composed;
use crate::error::Result;
use crate::export::Exporter;
use crate::model::{SchemaModel, TypeDefinition, TypeKind};

/// Exporter for the composed schema text
#[derive(Debug, Default)]
pub struct SdlExporter;

impl Exporter for SdlExporter {
    fn name(&self) -> &'static str {
        "sdl"
    }

    fn export(&self, composed: &Composed) -> Result<String> {
        Ok(print_schema(&composed.model))
    }
}

/// SDL definitions of the recognized directive vocabulary
const DIRECTIVE_DEFINITIONS: [(&str, &str); 7] = [
    (
        "cardinality",
        "directive @cardinality(min: Int, max: Int) on FIELD_DEFINITION",
    ),
    (
        "deprecated",
        "directive @deprecated(reason: String) on FIELD_DEFINITION | ENUM_VALUE",
    ),
    ("instanceTag", "directive @instanceTag on OBJECT"),
    (
        "metadata",
        "directive @metadata(comment: String, vssType: String) on FIELD_DEFINITION | OBJECT",
    ),
    (
        "noDuplicates",
        "directive @noDuplicates on FIELD_DEFINITION",
    ),
    (
        "range",
        "directive @range(min: Float, max: Float) on FIELD_DEFINITION",
    ),
    (
        "reference",
        "directive @reference(source: String!) on OBJECT | ENUM | SCALAR | UNION | INTERFACE | INPUT_OBJECT",
    ),
];

/// Render the whole model as SDL.
pub fn print_schema(model: &SchemaModel) -> String {
    let mut out = String::new();

    let used = used_directives(model);
    for (name, definition) in DIRECTIVE_DEFINITIONS {
        if used.contains(name) {
            out.push_str(definition);
            out.push('\n');
        }
    }
    if !used.is_empty() {
        out.push('\n');
    }

    let mut first = true;
    for def in model.iter() {
        if !first {
            out.push('\n');
        }
        first = false;
        print_type(&mut out, def);
    }
    out
}

fn used_directives(model: &SchemaModel) -> BTreeSet<String> {
    let mut used = BTreeSet::new();
    let known: BTreeSet<&str> = DIRECTIVE_DEFINITIONS.iter().map(|(n, _)| *n).collect();
    let mut record = |name: &str| {
        if known.contains(name) {
            used.insert(name.to_string());
        }
    };
    for def in model.iter() {
        for directive in def.directives.iter() {
            record(directive.name());
        }
        for field in def.fields.values() {
            for directive in field.directives.iter() {
                record(directive.name());
            }
        }
        for value in &def.values {
            for directive in value.directives.iter() {
                record(directive.name());
            }
        }
    }
    used
}

fn print_type(out: &mut String, def: &TypeDefinition) {
    print_description(out, def.description.as_deref(), "");

    let keyword = match def.kind {
        TypeKind::Object => "type",
        TypeKind::Interface => "interface",
        TypeKind::Union => "union",
        TypeKind::Enum => "enum",
        TypeKind::Scalar => "scalar",
        TypeKind::Input => "input",
    };
    out.push_str(keyword);
    out.push(' ');
    out.push_str(&def.name);

    if !def.implements.is_empty() {
        out.push_str(" implements ");
        out.push_str(&def.implements.join(" & "));
    }

    for directive in def.directives.iter() {
        out.push(' ');
        out.push_str(&directive.to_sdl());
    }

    match def.kind {
        TypeKind::Scalar => {
            out.push('\n');
        }
        TypeKind::Union => {
            out.push_str(" = ");
            out.push_str(&def.members.join(" | "));
            out.push('\n');
        }
        TypeKind::Enum => {
            out.push_str(" {\n");
            for value in &def.values {
                print_description(out, value.description.as_deref(), "  ");
                out.push_str("  ");
                out.push_str(&value.name);
                for directive in value.directives.iter() {
                    out.push(' ');
                    out.push_str(&directive.to_sdl());
                }
                out.push('\n');
            }
            out.push_str("}\n");
        }
        TypeKind::Object | TypeKind::Interface | TypeKind::Input => {
            out.push_str(" {\n");
            for field in def.fields.values() {
                print_description(out, field.description.as_deref(), "  ");
                out.push_str("  ");
                out.push_str(&field.name);
                if !field.arguments.is_empty() {
                    let rendered: Vec<String> = field
                        .arguments
                        .iter()
                        .map(|arg| {
                            let mut s = format!("{}: {}", arg.name, arg.ty.to_sdl());
                            if let Some(default) = &arg.default {
                                s.push_str(" = ");
                                s.push_str(default);
                            }
                            s
                        })
                        .collect();
                    out.push('(');
                    out.push_str(&rendered.join(", "));
                    out.push(')');
                }
                out.push_str(": ");
                out.push_str(&field.ty.to_sdl());
                for directive in field.directives.iter() {
                    out.push(' ');
                    out.push_str(&directive.to_sdl());
                }
                out.push('\n');
            }
            out.push_str("}\n");
        }
    }
}

fn print_description(out: &mut String, description: Option<&str>, indent: &str) {
    let Some(description) = description else {
        return;
    };
    if description.contains('\n') || description.contains('"') {
        out.push_str(indent);
        out.push_str("\"\"\"\n");
        for line in description.lines() {
            out.push_str(indent);
            out.push_str(line);
            out.push('\n');
        }
        out.push_str(indent);
        out.push_str("\"\"\"\n");
    } else {
        out.push_str(indent);
        out.push('"');
        out.push_str(description);
        out.push_str("\"\n");
    }
}
