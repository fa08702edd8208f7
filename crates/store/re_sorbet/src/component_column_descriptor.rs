use arrow::datatypes::{DataType as ArrowDatatype, Field as ArrowField};

use re_log_types::EntityPath;
use re_types_core::{ComponentDescriptor, ComponentType};

use crate::{MetadataExt as _, keys};

/// The component type assigned to data columns that don't specify one.
pub const UNKNOWN_COMPONENT_TYPE: &str = "Unknown";

/// Describes a data/component column, such as `Position3D`, in a tabular batch.
///
/// This is an [`ArrowField`] that contains specific meta-data.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ComponentColumnDescriptor {
    /// The Arrow datatype of the column, always a list.
    pub store_datatype: ArrowDatatype,

    /// The path of the entity.
    ///
    /// If this is missing from the metadata, it is read from the column name (`entity:component`),
    /// or set to `/`.
    pub entity_path: EntityPath,

    /// Archetype, component identifier and component type.
    ///
    /// The component type defaults to [`UNKNOWN_COMPONENT_TYPE`] if missing from the metadata.
    pub descriptor: ComponentDescriptor,

    /// Whether this column represents static data.
    pub is_static: bool,

    /// Whether this column represents an indicator component.
    pub is_indicator: bool,
}

impl std::fmt::Display for ComponentColumnDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}:{}", self.entity_path, self.descriptor)
    }
}

impl ComponentColumnDescriptor {
    pub fn from_arrow_field(field: &ArrowField) -> Self {
        let entity_path = if let Some(entity_path) = field.get_opt(keys::ENTITY_PATH) {
            EntityPath::parse_forgiving(&entity_path)
        } else if let Some((entity_path, _)) = field.name().split_once(':') {
            EntityPath::parse_forgiving(entity_path)
        } else {
            EntityPath::root()
        };

        let component = field
            .get_opt(keys::COMPONENT)
            .map_or_else(|| field.name().clone(), |component| component.into_owned());

        let component_type = field.get_opt(keys::COMPONENT_TYPE).map_or_else(
            || {
                re_log::debug_once!(
                    "Column {:?} has no `{}`, using {UNKNOWN_COMPONENT_TYPE:?}",
                    field.name(),
                    keys::COMPONENT_TYPE
                );
                ComponentType::new(UNKNOWN_COMPONENT_TYPE)
            },
            |component_type| ComponentType::from(component_type.as_ref()),
        );

        let mut descriptor =
            ComponentDescriptor::partial(component.as_str()).with_component_type(component_type);
        if let Some(archetype) = field.get_opt(keys::ARCHETYPE) {
            descriptor = descriptor.with_archetype(archetype.as_ref().into());
        }

        Self {
            store_datatype: field.data_type().clone(),
            entity_path,
            descriptor,
            is_static: field.get_bool(keys::IS_STATIC),
            is_indicator: field.get_bool(keys::IS_INDICATOR),
        }
    }

    /// The datatype of a single instance.
    pub fn returned_datatype(&self) -> Option<&ArrowDatatype> {
        match &self.store_datatype {
            ArrowDatatype::List(field) | ArrowDatatype::LargeList(field) => Some(field.data_type()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn list_field(name: &str, metadata: &[(&str, &str)]) -> ArrowField {
        ArrowField::new(
            name,
            ArrowDatatype::List(Arc::new(ArrowField::new_list_field(
                ArrowDatatype::Float32,
                true,
            ))),
            true,
        )
        .with_metadata(
            metadata
                .iter()
                .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
                .collect(),
        )
    }

    #[test]
    fn full_metadata() {
        let descr = ComponentColumnDescriptor::from_arrow_field(&list_field(
            "whatever",
            &[
                (keys::KIND, "data"),
                (keys::ENTITY_PATH, "/points"),
                (keys::ARCHETYPE, "rerun.archetypes.Points3D"),
                (keys::COMPONENT, "Points3D:radii"),
                (keys::COMPONENT_TYPE, "rerun.components.Radius"),
            ],
        ));

        assert_eq!(descr.entity_path, EntityPath::from("points"));
        assert_eq!(
            descr.descriptor,
            ComponentDescriptor::partial("Points3D:radii")
                .with_archetype("rerun.archetypes.Points3D".into())
                .with_component_type("rerun.components.Radius".into())
        );
        assert_eq!(descr.returned_datatype(), Some(&ArrowDatatype::Float32));
        assert!(!descr.is_static);
    }

    #[test]
    fn fallbacks() {
        let descr = ComponentColumnDescriptor::from_arrow_field(&list_field("robot/arm:pose", &[]));
        assert_eq!(descr.entity_path, EntityPath::from("robot/arm"));
        assert_eq!(descr.descriptor.component.as_str(), "robot/arm:pose");
        assert_eq!(
            descr.descriptor.component_type,
            Some(ComponentType::new(UNKNOWN_COMPONENT_TYPE))
        );
        assert_eq!(descr.descriptor.archetype, None);

        let descr = ComponentColumnDescriptor::from_arrow_field(&list_field("pose", &[]));
        assert!(descr.entity_path.is_root());
    }
}
