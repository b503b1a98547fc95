//! In-memory schema model
//!
//! Types are stored in an insertion-ordered arena keyed by name. Fields
//! reference their output types by name only, so forward references and
//! cycles across fragments cost nothing at parse time; a post-merge
//! resolution pass ([`SchemaModel::resolve_references`]) turns the whole
//! model valid or fails with the offending field.

use indexmap::IndexMap;
use serde::{Deserialize, Serialize};

use crate::directive::{Cardinality, DirectiveSet};
use crate::error::{Result, SchemaError};

/// Name of the field that links an element type to its instance-tag marker
pub const INSTANCE_TAG_FIELD: &str = "instanceTag";

/// Names reserved for operation root types
pub const ROOT_TYPE_NAMES: [&str; 3] = ["Query", "Mutation", "Subscription"];

/// Built-in scalar names that exist without a definition
pub const BUILTIN_SCALARS: [&str; 5] = ["String", "Int", "Float", "Boolean", "ID"];

/// Kind of a named type
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TypeKind {
    Object,
    Interface,
    Union,
    Enum,
    Scalar,
    Input,
}

/// A field's type reference: base name plus nullability and list modifiers
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TypeRef {
    /// Referenced type name (resolved lazily against the model)
    pub name: String,
    /// Whether the outer value may be null
    pub nullable: bool,
    /// List wrapper, if any
    pub list: Option<ListWrapper>,
}

/// Modifier for list-valued fields
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ListWrapper {
    /// Whether elements inside the list may be null
    pub inner_nullable: bool,
    /// Lists of lists are representable in the model but rejected by
    /// every exporter; parser records the depth so they can report it.
    pub nested: bool,
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: true,
            list: None,
        }
    }

    pub fn non_null(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            nullable: false,
            list: None,
        }
    }

    pub fn list_of(name: impl Into<String>, nullable: bool, inner_nullable: bool) -> Self {
        Self {
            name: name.into(),
            nullable,
            list: Some(ListWrapper {
                inner_nullable,
                nested: false,
            }),
        }
    }

    pub fn is_list(&self) -> bool {
        self.list.is_some()
    }

    /// Render back to SDL, e.g. `[Door!]!`
    pub fn to_sdl(&self) -> String {
        let mut out = match self.list {
            Some(wrapper) => {
                let inner = if wrapper.inner_nullable {
                    self.name.clone()
                } else {
                    format!("{}!", self.name)
                };
                format!("[{}]", inner)
            }
            None => self.name.clone(),
        };
        if !self.nullable {
            out.push('!');
        }
        out
    }
}

/// One argument of a field
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Argument {
    pub name: String,
    pub ty: TypeRef,
    /// Default value rendered as SDL source (enum symbols stay bare)
    pub default: Option<String>,
}

/// One field of an object/interface/input type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldDefinition {
    pub name: String,
    pub ty: TypeRef,
    pub arguments: Vec<Argument>,
    pub directives: DirectiveSet,
    pub description: Option<String>,
}

impl FieldDefinition {
    pub fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            arguments: Vec::new(),
            directives: DirectiveSet::default(),
            description: None,
        }
    }
}

/// One value of an enum type
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EnumValue {
    pub name: String,
    pub description: Option<String>,
    pub directives: DirectiveSet,
}

/// A named type in the schema model
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeDefinition {
    pub name: String,
    pub kind: TypeKind,
    /// Ordered fields (object/interface/input kinds)
    pub fields: IndexMap<String, FieldDefinition>,
    /// Ordered values (enum kind)
    pub values: Vec<EnumValue>,
    /// Union member type names (union kind)
    pub members: Vec<String>,
    /// Implemented interface names (object kind)
    pub implements: Vec<String>,
    pub directives: DirectiveSet,
    pub description: Option<String>,
}

impl TypeDefinition {
    pub fn new(name: impl Into<String>, kind: TypeKind) -> Self {
        Self {
            name: name.into(),
            kind,
            fields: IndexMap::new(),
            values: Vec::new(),
            members: Vec::new(),
            implements: Vec::new(),
            directives: DirectiveSet::default(),
            description: None,
        }
    }

    pub fn with_field(mut self, field: FieldDefinition) -> Self {
        self.fields.insert(field.name.clone(), field);
        self
    }

    /// Whether this type is an instance-tag marker
    pub fn is_instance_tag_marker(&self) -> bool {
        self.kind == TypeKind::Object && self.directives.has_instance_tag()
    }

    pub fn value_names(&self) -> Vec<&str> {
        self.values.iter().map(|v| v.name.as_str()).collect()
    }
}

/// How a field combines nullability, list wrapping and @noDuplicates.
///
/// Mirrors the six shapes expressible in the SDL plus the two set cases
/// labeled with the directive.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldCase {
    /// `field: T`
    Default,
    /// `field: T!`
    NonNull,
    /// `field: [T]`
    List,
    /// `field: [T]!`
    NonNullList,
    /// `field: [T!]`
    ListNonNull,
    /// `field: [T!]!`
    NonNullListNonNull,
    /// `field: [T] @noDuplicates`
    Set,
    /// `field: [T!] @noDuplicates`
    SetNonNull,
}

impl FieldCase {
    pub fn of(field: &FieldDefinition) -> FieldCase {
        let base = match (&field.ty.list, field.ty.nullable) {
            (None, true) => FieldCase::Default,
            (None, false) => FieldCase::NonNull,
            (Some(w), true) if w.inner_nullable => FieldCase::List,
            (Some(_), true) => FieldCase::ListNonNull,
            (Some(w), false) if w.inner_nullable => FieldCase::NonNullList,
            (Some(_), false) => FieldCase::NonNullListNonNull,
        };
        if field.directives.has_no_duplicates() {
            match base {
                FieldCase::List => FieldCase::Set,
                FieldCase::ListNonNull => FieldCase::SetNonNull,
                other => other,
            }
        } else {
            base
        }
    }

    /// Implied cardinality of the value itself (min/max occurrences)
    pub fn value_cardinality(&self) -> Cardinality {
        match self {
            FieldCase::Default => Cardinality {
                min: Some(0),
                max: Some(1),
            },
            FieldCase::NonNull => Cardinality {
                min: Some(1),
                max: Some(1),
            },
            FieldCase::List | FieldCase::NonNullList | FieldCase::Set => Cardinality {
                min: Some(0),
                max: None,
            },
            FieldCase::ListNonNull
            | FieldCase::NonNullListNonNull
            | FieldCase::SetNonNull => Cardinality {
                min: Some(1),
                max: None,
            },
        }
    }

    pub fn is_list(&self) -> bool {
        !matches!(self, FieldCase::Default | FieldCase::NonNull)
    }
}

/// The composed schema model: an ordered arena of named types
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SchemaModel {
    pub types: IndexMap<String, TypeDefinition>,
}

impl SchemaModel {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.get(name)
    }

    pub fn get_mut(&mut self, name: &str) -> Option<&mut TypeDefinition> {
        self.types.get_mut(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.types.contains_key(name)
    }

    pub fn insert(&mut self, def: TypeDefinition) {
        self.types.insert(def.name.clone(), def);
    }

    pub fn remove(&mut self, name: &str) -> Option<TypeDefinition> {
        self.types.shift_remove(name)
    }

    pub fn len(&self) -> usize {
        self.types.len()
    }

    pub fn is_empty(&self) -> bool {
        self.types.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values()
    }

    pub fn type_names(&self) -> Vec<String> {
        self.types.keys().cloned().collect()
    }

    /// All object types, in model order
    pub fn object_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values().filter(|t| t.kind == TypeKind::Object)
    }

    /// All enum types, in model order
    pub fn enum_types(&self) -> impl Iterator<Item = &TypeDefinition> {
        self.types.values().filter(|t| t.kind == TypeKind::Enum)
    }

    /// Whether `name` refers to a built-in scalar or a declared type
    pub fn knows(&self, name: &str) -> bool {
        BUILTIN_SCALARS.contains(&name) || self.types.contains_key(name)
    }

    /// Resolve the marker type behind an element type's `instanceTag`
    /// field, if the field exists and points at a valid marker.
    pub fn instance_tag_marker(&self, element: &TypeDefinition) -> Option<&TypeDefinition> {
        let field = element.fields.get(INSTANCE_TAG_FIELD)?;
        let target = self.types.get(&field.ty.name)?;
        target.is_instance_tag_marker().then_some(target)
    }

    /// Verify every field/argument/member reference resolves.
    ///
    /// Run after merging and after every transformation stage that moves
    /// types; exporters may assume it has passed.
    pub fn resolve_references(&self) -> Result<()> {
        let unresolved = |field: String, referenced: &str| SchemaError::UnresolvedReference {
            field,
            referenced: referenced.to_string(),
        };

        for def in self.types.values() {
            for field in def.fields.values() {
                if !self.knows(&field.ty.name) {
                    return Err(unresolved(
                        format!("{}.{}", def.name, field.name),
                        &field.ty.name,
                    ));
                }
                for arg in &field.arguments {
                    if !self.knows(&arg.ty.name) {
                        return Err(unresolved(
                            format!("{}.{}({})", def.name, field.name, arg.name),
                            &arg.ty.name,
                        ));
                    }
                }
            }
            for member in &def.members {
                if !self.knows(member) {
                    return Err(unresolved(def.name.clone(), member));
                }
            }
            for iface in &def.implements {
                if !self.knows(iface) {
                    return Err(unresolved(def.name.clone(), iface));
                }
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::directive::Directive;

    #[test]
    fn test_type_ref_sdl() {
        assert_eq!(TypeRef::named("Door").to_sdl(), "Door");
        assert_eq!(TypeRef::non_null("Door").to_sdl(), "Door!");
        assert_eq!(TypeRef::list_of("Door", true, true).to_sdl(), "[Door]");
        assert_eq!(TypeRef::list_of("Door", false, false).to_sdl(), "[Door!]!");
    }

    #[test]
    fn test_field_case_classification() {
        let mut field = FieldDefinition::new("doors", TypeRef::list_of("Door", true, true));
        assert_eq!(FieldCase::of(&field), FieldCase::List);

        field.directives.push(Directive::NoDuplicates);
        assert_eq!(FieldCase::of(&field), FieldCase::Set);

        let non_null = FieldDefinition::new("speed", TypeRef::non_null("Float"));
        assert_eq!(FieldCase::of(&non_null), FieldCase::NonNull);
        assert_eq!(
            FieldCase::of(&non_null).value_cardinality().min,
            Some(1)
        );
    }

    #[test]
    fn test_resolve_references_reports_field() {
        let mut model = SchemaModel::new();
        model.insert(
            TypeDefinition::new("Vehicle", TypeKind::Object)
                .with_field(FieldDefinition::new("cabin", TypeRef::named("Cabin"))),
        );
        let err = model.resolve_references().unwrap_err();
        match err {
            SchemaError::UnresolvedReference { field, referenced } => {
                assert_eq!(field, "Vehicle.cabin");
                assert_eq!(referenced, "Cabin");
            }
            other => panic!("unexpected error: {other}"),
        }

        model.insert(TypeDefinition::new("Cabin", TypeKind::Object));
        assert!(model.resolve_references().is_ok());
    }

    #[test]
    fn test_instance_tag_marker_lookup() {
        let mut model = SchemaModel::new();
        let mut marker = TypeDefinition::new("DoorPosition", TypeKind::Object);
        marker.directives.push(Directive::InstanceTag);
        marker = marker.with_field(FieldDefinition::new("row", TypeRef::non_null("RowEnum")));
        model.insert(marker);
        model.insert(
            TypeDefinition::new("Door", TypeKind::Object).with_field(FieldDefinition::new(
                INSTANCE_TAG_FIELD,
                TypeRef::named("DoorPosition"),
            )),
        );

        let door = model.get("Door").unwrap();
        let marker = model.instance_tag_marker(door).unwrap();
        assert_eq!(marker.name, "DoorPosition");
    }
}
