//! The core types and traits that power Rerun's data model.
//!
//! The [`AsComponents`] trait is the core of this crate and is a good starting point to get
//! familiar with the code: anything that can be logged exposes itself as a set of
//! [`SerializedComponentBatch`]es, each identified by a [`ComponentDescriptor`].
//!
//! Rerun (and the underlying Arrow data framework) is designed to work with large arrays of
//! components, as opposed to single instances.
//! A [`SerializedComponentBatch`] is such an array, ready for row-oriented logging.
//! A [`SerializedComponentColumn`] is the same data, partitioned into many rows for
//! column-oriented logging.
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

mod archetype;
mod component_column;
mod component_descriptor;
mod loggable_batch;
mod result;

pub use self::{
    archetype::{Archetype, ArchetypeName, ComponentIdentifier, ComponentType},
    component_column::{PartitionError, SerializedComponentColumn},
    component_descriptor::ComponentDescriptor,
    loggable_batch::{ComponentBatch, SerializedComponentBatch},
    result::{SerializationError, SerializationResult},
};

pub mod external {
    pub use arrow;
}

// ---

/// Describes the interface for interpreting an object as a bundle of components.
///
/// ## Custom bundles
///
/// While, in most cases, component bundles are code generated from IDL definitions,
/// it is possible to manually extend existing bundles, or even implement fully custom ones.
/// The only requirement is to describe how the bundle can be interpreted as a set of
/// [`SerializedComponentBatch`]es: arrays of components that are ready to be logged.
///
/// Bundles that couldn't serialize some of their fields leave them out of
/// [`AsComponents::as_serialized_batches`], and report why through
/// [`AsComponents::serialization_errors`]. The logger decides whether these are fatal.
pub trait AsComponents {
    /// Exposes the object's contents as a set of [`SerializedComponentBatch`]es.
    ///
    /// This is the main mechanism for easily extending builtin archetypes or even writing
    /// fully custom ones.
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch>;

    /// The fields that were left out because they failed to serialize.
    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        Vec::new()
    }
}

#[expect(dead_code)]
fn assert_as_components_object_safe() {
    let _: &dyn AsComponents;
}

impl AsComponents for SerializedComponentBatch {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        vec![self.clone()]
    }
}

impl AsComponents for dyn ComponentBatch {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.serialized().into_iter().collect()
    }
}

impl<AS: AsComponents + ?Sized> AsComponents for &AS {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        (**self).as_serialized_batches()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        (**self).serialization_errors()
    }
}

impl<AS: AsComponents + ?Sized> AsComponents for Box<AS> {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        (**self).as_serialized_batches()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        (**self).serialization_errors()
    }
}

impl<AS: AsComponents> AsComponents for [AS] {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.iter()
            .flat_map(|as_components| as_components.as_serialized_batches())
            .collect()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        self.iter()
            .flat_map(|as_components| as_components.serialization_errors())
            .collect()
    }
}

impl<AS: AsComponents, const N: usize> AsComponents for [AS; N] {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.as_slice().as_serialized_batches()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        self.as_slice().serialization_errors()
    }
}

impl<AS: AsComponents> AsComponents for Vec<AS> {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.as_slice().as_serialized_batches()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        self.as_slice().serialization_errors()
    }
}
