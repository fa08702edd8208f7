use std::borrow::Cow;

use crate::{ArchetypeName, ComponentIdentifier, ComponentType};

/// A [`ComponentDescriptor`] fully describes the semantics of a column of data.
///
/// Every component is uniquely identified by its [`ComponentDescriptor`].
/// Two descriptors are equal iff all three fields are equal; this is what the type registry
/// is keyed on.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct ComponentDescriptor {
    /// Optional name of the `Archetype` associated with this data.
    ///
    /// `None` if the data wasn't logged through an archetype.
    ///
    /// Example: `rerun.archetypes.Points3D`.
    pub archetype: Option<ArchetypeName>,

    /// Uniquely identifies this component within an entity.
    ///
    /// Example: `Points3D:positions`.
    pub component: ComponentIdentifier,

    /// Optional semantic type associated with this data.
    ///
    /// Example: `rerun.components.Position3D`.
    pub component_type: Option<ComponentType>,
}

impl std::fmt::Display for ComponentDescriptor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full_name())
    }
}

impl From<ComponentDescriptor> for Cow<'static, ComponentDescriptor> {
    #[inline]
    fn from(descr: ComponentDescriptor) -> Self {
        Cow::Owned(descr)
    }
}

impl<'d> From<&'d ComponentDescriptor> for Cow<'d, ComponentDescriptor> {
    #[inline]
    fn from(descr: &'d ComponentDescriptor) -> Self {
        Cow::Borrowed(descr)
    }
}

impl ComponentDescriptor {
    /// A descriptor with only a component identifier, e.g. for ad-hoc data.
    #[inline]
    pub fn partial(component: impl Into<ComponentIdentifier>) -> Self {
        Self {
            archetype: None,
            component: component.into(),
            component_type: None,
        }
    }

    /// The descriptor of the indicator component of the given archetype.
    pub fn indicator(archetype: ArchetypeName) -> Self {
        let component = format!("{archetype}Indicator");
        Self {
            archetype: Some(archetype),
            component: component.into(),
            component_type: None,
        }
    }

    /// Short and usually unique, used in UI.
    #[inline]
    pub fn display_name(&self) -> &str {
        self.component.field_name()
    }

    /// Returns the fully-qualified name, e.g.
    /// `rerun.archetypes.Points3D:rerun.components.Position3D#Points3D:positions`.
    pub fn full_name(&self) -> String {
        let Self {
            archetype,
            component,
            component_type,
        } = self;

        match (archetype, component_type) {
            (None, None) => component.to_string(),
            (Some(archetype), None) => format!("{archetype}:{component}"),
            (None, Some(component_type)) => format!("{component_type}#{component}"),
            (Some(archetype), Some(component_type)) => {
                format!("{archetype}:{component_type}#{component}")
            }
        }
    }

    /// Is this an indicator component for an archetype?
    #[inline]
    pub fn is_indicator_component(&self) -> bool {
        self.component.ends_with("Indicator")
    }

    /// Unconditionally sets [`Self::archetype`] to the given one.
    #[inline]
    pub fn with_archetype(mut self, archetype: ArchetypeName) -> Self {
        self.archetype = Some(archetype);
        self
    }

    /// Unconditionally sets [`Self::component_type`] to the given one.
    #[inline]
    pub fn with_component_type(mut self, component_type: ComponentType) -> Self {
        self.component_type = Some(component_type);
        self
    }

    /// Sets [`Self::archetype`] to the given one iff it's not already set.
    #[inline]
    pub fn or_with_archetype(mut self, archetype: impl FnOnce() -> ArchetypeName) -> Self {
        if self.archetype.is_none() {
            self.archetype = Some(archetype());
        }
        self
    }

    /// Sets [`Self::component_type`] to the given one iff it's not already set.
    #[inline]
    pub fn or_with_component_type(
        mut self,
        component_type: impl FnOnce() -> ComponentType,
    ) -> Self {
        if self.component_type.is_none() {
            self.component_type = Some(component_type());
        }
        self
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    #[test]
    fn equality_covers_all_fields() {
        let a = ComponentDescriptor::partial("confidence");
        let b = a.clone().with_component_type("rerun.components.Scalar".into());
        let c = a
            .clone()
            .with_archetype("rerun.archetypes.Points3D".into());

        assert_ne!(a, b);
        assert_ne!(a, c);
        assert_eq!(b.clone(), b);

        let registry: HashMap<_, _> = [(a.clone(), 1), (b.clone(), 2)].into_iter().collect();
        assert_eq!(registry[&a], 1);
        assert_eq!(registry[&b], 2);
        assert!(!registry.contains_key(&c));
    }

    #[test]
    fn or_with_keeps_existing() {
        let descr = ComponentDescriptor::partial("Points3D:positions")
            .with_component_type("rerun.components.Position3D".into())
            .or_with_component_type(|| "rerun.components.Color".into())
            .or_with_archetype(|| "rerun.archetypes.Points3D".into());

        assert_eq!(
            descr.component_type,
            Some(ComponentType::from("rerun.components.Position3D"))
        );
        assert_eq!(descr.display_name(), "positions");
        assert_eq!(
            descr.full_name(),
            "rerun.archetypes.Points3D:rerun.components.Position3D#Points3D:positions"
        );
    }

    #[test]
    fn indicators() {
        let descr = ComponentDescriptor::indicator("rerun.archetypes.Points3D".into());
        assert!(descr.is_indicator_component());
        assert_eq!(descr.component.as_str(), "rerun.archetypes.Points3DIndicator");
        assert!(!ComponentDescriptor::partial("color").is_indicator_component());
    }
}
