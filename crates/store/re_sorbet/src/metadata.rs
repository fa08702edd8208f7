use std::borrow::Cow;
use std::collections::HashMap;

use arrow::datatypes::Field as ArrowField;

/// Arrow metadata for a column/field.
pub type ArrowFieldMetadata = HashMap<String, String>;

/// The field-level metadata keys understood by Rerun.
pub mod keys {
    pub const KIND: &str = "rerun.kind";
    pub const ENTITY_PATH: &str = "rerun.entity_path";
    pub const INDEX_NAME: &str = "rerun.index_name";
    pub const ARCHETYPE: &str = "rerun.archetype";
    pub const COMPONENT: &str = "rerun.component";
    pub const COMPONENT_TYPE: &str = "rerun.component_type";
    pub const IS_STATIC: &str = "rerun.is_static";
    pub const IS_INDICATOR: &str = "rerun.is_indicator";
}

/// Make it more ergonomic to work with arrow metadata.
pub trait MetadataExt {
    fn get_opt(&self, key: &str) -> Option<Cow<'_, str>>;

    /// If the key exists and is NOT `false`.
    fn get_bool(&self, key: &str) -> bool {
        self.get_opt(key)
            .map(|value| !matches!(value.to_lowercase().as_str(), "false" | "no"))
            .unwrap_or(false)
    }
}

impl MetadataExt for HashMap<String, String> {
    fn get_opt(&self, key: &str) -> Option<Cow<'_, str>> {
        self.get(key).map(|value| value.as_str().into())
    }
}

impl MetadataExt for ArrowField {
    fn get_opt(&self, key: &str) -> Option<Cow<'_, str>> {
        self.metadata().get(key).map(|v| v.as_str().into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bools() {
        let metadata: ArrowFieldMetadata = [
            ("a".to_owned(), "true".to_owned()),
            ("b".to_owned(), "No".to_owned()),
            ("c".to_owned(), String::new()),
        ]
        .into_iter()
        .collect();

        assert!(metadata.get_bool("a"));
        assert!(!metadata.get_bool("b"));
        assert!(metadata.get_bool("c"));
        assert!(!metadata.get_bool("d"));
    }
}
