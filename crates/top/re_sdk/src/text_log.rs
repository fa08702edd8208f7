use std::sync::Arc;

use arrow::array::StringArray;

use re_types_core::{
    Archetype, ArchetypeName, AsComponents, ComponentDescriptor, SerializedComponentBatch,
};

/// Where the SDK logs its own warnings, so that they show up next to the data.
pub const WARNINGS_ENTITY_PATH: &str = "rerun";

/// A log entry in a text log, as shown by the viewer's text log view.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TextLog {
    pub text: String,
    pub level: String,
}

impl TextLog {
    pub fn warn(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            level: "WARN".to_owned(),
        }
    }

    pub fn descriptor_text() -> ComponentDescriptor {
        ComponentDescriptor::partial("TextLog:text")
            .with_archetype(Self::name())
            .with_component_type("rerun.components.Text".into())
    }

    pub fn descriptor_level() -> ComponentDescriptor {
        ComponentDescriptor::partial("TextLog:level")
            .with_archetype(Self::name())
            .with_component_type("rerun.components.TextLogLevel".into())
    }
}

impl Archetype for TextLog {
    #[inline]
    fn name() -> ArchetypeName {
        "rerun.archetypes.TextLog".into()
    }
}

impl AsComponents for TextLog {
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        vec![
            Self::indicator(),
            SerializedComponentBatch::new(
                Arc::new(StringArray::from(vec![self.text.as_str()])),
                Self::descriptor_text(),
            ),
            SerializedComponentBatch::new(
                Arc::new(StringArray::from(vec![self.level.as_str()])),
                Self::descriptor_level(),
            ),
        ]
    }
}
