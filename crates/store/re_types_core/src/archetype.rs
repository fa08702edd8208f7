use crate::{AsComponents, ComponentDescriptor, SerializedComponentBatch};

// ---

/// Declares a cheaply cloneable string newtype used as a name/identifier.
macro_rules! declare_name_type {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
        #[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
        pub struct $name(std::sync::Arc<str>);

        impl $name {
            #[inline]
            pub fn new(name: &str) -> Self {
                Self(name.into())
            }

            #[inline]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl std::ops::Deref for $name {
            type Target = str;

            #[inline]
            fn deref(&self) -> &str {
                &self.0
            }
        }

        impl From<&str> for $name {
            #[inline]
            fn from(name: &str) -> Self {
                Self::new(name)
            }
        }

        impl From<String> for $name {
            #[inline]
            fn from(name: String) -> Self {
                Self(name.into())
            }
        }

        impl std::fmt::Display for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl std::fmt::Debug for $name {
            #[inline]
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                self.0.fmt(f)
            }
        }
    };
}

declare_name_type!(
    /// The fully-qualified name of an archetype, e.g. `rerun.archetypes.Points3D`.
    ArchetypeName
);

declare_name_type!(
    /// The fully-qualified type of a component, e.g. `rerun.components.Position3D`.
    ///
    /// Many components can share the same type (e.g. the `positions` and `centers` of
    /// different archetypes are both `rerun.components.Position3D`).
    ComponentType
);

declare_name_type!(
    /// Uniquely identifies a component within an entity, e.g. `Points3D:positions`.
    ///
    /// This is what the row logger de-duplicates on.
    ComponentIdentifier
);

/// Strips the namespace of a fully-qualified name: `rerun.archetypes.Points3D` -> `Points3D`.
fn short_name(full_name: &str) -> &str {
    full_name.rsplit('.').next().unwrap_or(full_name)
}

impl ArchetypeName {
    /// Omits the namespace, e.g. `rerun.archetypes.Points3D` becomes `Points3D`.
    #[inline]
    pub fn short_name(&self) -> &str {
        short_name(self.as_str())
    }
}

impl ComponentType {
    /// Omits the namespace, e.g. `rerun.components.Position3D` becomes `Position3D`.
    #[inline]
    pub fn short_name(&self) -> &str {
        short_name(self.as_str())
    }
}

impl ComponentIdentifier {
    /// The field part of an `Archetype:field` identifier, or the whole identifier otherwise.
    #[inline]
    pub fn field_name(&self) -> &str {
        self.as_str()
            .split_once(':')
            .map_or(self.as_str(), |(_, field)| field)
    }
}

// ---

/// An archetype is a high-level construct that represents a set of components that usually
/// play well with each other (i.e. they compose nicely).
///
/// Generated archetypes implement this; all this crate relies upon is the contract:
/// a name, and a set of described batches via [`AsComponents`].
pub trait Archetype: AsComponents {
    /// The fully-qualified name of this archetype, e.g. `rerun.archetypes.Points3D`.
    fn name() -> ArchetypeName;

    /// A zero-payload batch marking an entity as having been logged with this archetype.
    #[inline]
    fn indicator() -> SerializedComponentBatch {
        SerializedComponentBatch::indicator(Self::name())
    }

    /// The descriptor of the indicator component of this archetype.
    #[inline]
    fn indicator_descriptor() -> ComponentDescriptor {
        ComponentDescriptor::indicator(Self::name())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn short_names() {
        assert_eq!(
            ArchetypeName::from("rerun.archetypes.Points3D").short_name(),
            "Points3D"
        );
        assert_eq!(ComponentType::from("Scalar").short_name(), "Scalar");
        assert_eq!(
            ComponentIdentifier::from("Points3D:positions").field_name(),
            "positions"
        );
        assert_eq!(ComponentIdentifier::from("confidence").field_name(), "confidence");
    }
}
