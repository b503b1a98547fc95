//! Built-in spec fragment
//!
//! Common scalars, shared enums and reference unit vocabularies are
//! embedded at compile time and merged ahead of every user fragment as an
//! explicit standard-library fragment labeled `spec`. Types declared here
//! are the "common types" the composer lets user fragments shadow.

use std::collections::HashSet;

use include_dir::{include_dir, Dir};

use crate::error::{Result, SchemaError};
use crate::parser::{parse_fragment, Fragment};

static SPEC_DIR: Dir<'_> = include_dir!("$CARGO_MANIFEST_DIR/src/spec");

/// Provenance label of the built-in fragment
pub const BUILTIN_LABEL: &str = "spec";

/// Parse the embedded spec files into a single fragment.
pub fn builtin_fragment() -> Result<Fragment> {
    let mut files: Vec<&include_dir::File<'_>> = SPEC_DIR.files().collect();
    files.sort_by_key(|f| f.path().to_path_buf());

    let mut types = Vec::new();
    for file in files {
        let source = file.contents_utf8().ok_or_else(|| SchemaError::Parse {
            file: file.path().display().to_string(),
            message: "embedded spec file is not valid UTF-8".to_string(),
        })?;
        let fragment = parse_fragment(BUILTIN_LABEL, source)?;
        types.extend(fragment.types);
    }

    Ok(Fragment {
        label: BUILTIN_LABEL.to_string(),
        types,
    })
}

/// Names of the built-in common types (the shadowable set).
pub fn common_type_names() -> Result<HashSet<String>> {
    Ok(builtin_fragment()?
        .types
        .into_iter()
        .map(|t| t.name)
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builtin_fragment_parses() {
        let fragment = builtin_fragment().unwrap();
        assert_eq!(fragment.label, BUILTIN_LABEL);
        let names: Vec<&str> = fragment.types.iter().map(|t| t.name.as_str()).collect();
        assert!(names.contains(&"Int8"));
        assert!(names.contains(&"UInt64"));
        assert!(names.contains(&"TemperatureUnitEnum"));
        assert!(names.contains(&"TwoRowsEnum"));
    }

    #[test]
    fn test_common_type_names_cover_scalars_and_units() {
        let names = common_type_names().unwrap();
        assert!(names.contains("UInt8"));
        assert!(names.contains("LengthUnitEnum"));
    }
}
