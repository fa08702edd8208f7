use std::borrow::Cow;
use std::sync::Arc;

use arrow::array::{ArrayRef, NullArray};
use arrow::datatypes::{DataType, Field};

use crate::{
    ArchetypeName, ComponentDescriptor, ComponentType, PartitionError, SerializationResult,
    SerializedComponentColumn,
};

// ---

/// A [`ComponentBatch`] represents an array's worth of component instances, ready to be
/// serialized.
///
/// [`ComponentBatch`] is carefully designed to be erasable ("object-safe"), so that it is possible
/// to build heterogeneous collections of [`ComponentBatch`]s (e.g. `Vec<dyn ComponentBatch>`).
pub trait ComponentBatch {
    /// Serializes the batch into an Arrow array.
    fn to_arrow(&self) -> SerializationResult<ArrayRef>;

    /// Returns the complete [`ComponentDescriptor`] for this [`ComponentBatch`].
    ///
    /// Every component batch is uniquely identified by its [`ComponentDescriptor`].
    fn descriptor(&self) -> Cow<'_, ComponentDescriptor>;

    /// Serializes the contents of this [`ComponentBatch`].
    ///
    /// # Fallibility
    ///
    /// There are very few ways in which serialization can fail, all of which are very rare to hit
    /// in practice.
    /// One such example is trying to serialize data with more than 2^31 elements into a
    /// `ListArray`.
    ///
    /// For that reason, this method favors a nice user experience over error handling: errors will
    /// merely be logged, not returned.
    ///
    /// See also [`ComponentBatch::try_serialized`].
    #[inline]
    fn serialized(&self) -> Option<SerializedComponentBatch> {
        match self.try_serialized() {
            Ok(batch) => Some(batch),
            Err(err) => {
                re_log::error!(
                    "failed to serialize data for {}: {err}",
                    self.descriptor().component
                );
                None
            }
        }
    }

    /// Serializes the contents of this [`ComponentBatch`].
    ///
    /// See [`ComponentBatch::serialized`] for the infallible flavor.
    #[inline]
    fn try_serialized(&self) -> SerializationResult<SerializedComponentBatch> {
        Ok(SerializedComponentBatch::new(
            self.to_arrow()?,
            self.descriptor().into_owned(),
        ))
    }
}

#[expect(dead_code)]
fn assert_component_batch_object_safe() {
    let _: &dyn ComponentBatch;
}

// ---

/// The key identifying an arrow extension type in field-level metadata.
const EXTENSION_NAME_KEY: &str = "ARROW:extension:name";

/// The serialized contents of a [`ComponentBatch`] with associated [`ComponentDescriptor`].
///
/// This is what gets logged:
/// * See [`ComponentBatch`] to easily serialize component data.
/// * See [`crate::AsComponents`] for logging serialized data.
///
/// The length of the array is the number of instances it represents.
/// A length-1 batch logged alongside longer ones is a splat: it applies to every instance.
///
/// Cheap to clone: the array is shared.
#[derive(Debug, Clone)]
pub struct SerializedComponentBatch {
    pub array: ArrayRef,

    pub descriptor: ComponentDescriptor,

    /// Set if the array is to be interpreted as an arrow extension type.
    ///
    /// Arrow-rs has no extension arrays: the extension lives on the field.
    pub extension_name: Option<String>,
}

impl PartialEq for SerializedComponentBatch {
    #[inline]
    fn eq(&self, other: &Self) -> bool {
        let Self {
            array,
            descriptor,
            extension_name,
        } = self;

        // Descriptor first!
        *descriptor == other.descriptor
            && *extension_name == other.extension_name
            && **array == *other.array
    }
}

impl ComponentBatch for SerializedComponentBatch {
    #[inline]
    fn to_arrow(&self) -> SerializationResult<ArrayRef> {
        Ok(self.array.clone())
    }

    #[inline]
    fn descriptor(&self) -> Cow<'_, ComponentDescriptor> {
        Cow::Borrowed(&self.descriptor)
    }

    #[inline]
    fn try_serialized(&self) -> SerializationResult<SerializedComponentBatch> {
        Ok(self.clone())
    }
}

impl SerializedComponentBatch {
    #[inline]
    pub fn new(array: ArrayRef, descriptor: ComponentDescriptor) -> Self {
        Self {
            array,
            descriptor,
            extension_name: None,
        }
    }

    /// A single-instance, zero-payload marker for the given archetype.
    #[inline]
    pub fn indicator(archetype: ArchetypeName) -> Self {
        Self::new(
            Arc::new(NullArray::new(1)),
            ComponentDescriptor::indicator(archetype),
        )
    }

    /// The underlying array. Pure, no side effects.
    #[inline]
    pub fn as_array(&self) -> &ArrayRef {
        &self.array
    }

    #[inline]
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn component_type(&self) -> Option<&ComponentType> {
        self.descriptor.component_type.as_ref()
    }

    /// The arrow datatype of the elements, ignoring any extension wrapper.
    #[inline]
    pub fn datatype(&self) -> &DataType {
        self.array.data_type()
    }

    /// The element type identifier: the component type if known, the arrow datatype otherwise.
    pub fn type_name(&self) -> String {
        match (self.component_type(), &self.extension_name) {
            (Some(component_type), _) => component_type.to_string(),
            (None, Some(extension_name)) => extension_name.clone(),
            (None, None) => self.datatype().to_string(),
        }
    }

    /// Number of instances.
    #[inline]
    pub fn len(&self) -> usize {
        self.array.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.array.is_empty()
    }

    /// Marks the array as being of the given arrow extension type.
    #[inline]
    pub fn with_extension_name(mut self, extension_name: impl Into<String>) -> Self {
        self.extension_name = Some(extension_name.into());
        self
    }

    /// Drops the extension wrapper, if any, leaving the bare storage representation.
    #[inline]
    pub fn into_storage(self) -> Self {
        Self {
            extension_name: None,
            ..self
        }
    }

    /// The arrow field describing this batch, including extension metadata if any.
    pub fn field(&self) -> Field {
        let nullable = true;
        let field = Field::new(
            self.descriptor.component.to_string(),
            self.datatype().clone(),
            nullable,
        );
        match &self.extension_name {
            Some(name) => field.with_metadata(
                [(EXTENSION_NAME_KEY.to_owned(), name.clone())]
                    .into_iter()
                    .collect(),
            ),
            None => field,
        }
    }

    #[inline]
    pub fn with_descriptor_override(self, descriptor: ComponentDescriptor) -> Self {
        Self { descriptor, ..self }
    }

    /// Unconditionally sets the descriptor's `archetype` to the given one.
    #[inline]
    pub fn with_archetype(mut self, archetype: ArchetypeName) -> Self {
        self.descriptor = self.descriptor.with_archetype(archetype);
        self
    }

    /// Sets the descriptor's `archetype` to the given one iff it's not already set.
    #[inline]
    pub fn or_with_archetype(mut self, archetype: impl FnOnce() -> ArchetypeName) -> Self {
        self.descriptor = self.descriptor.or_with_archetype(archetype);
        self
    }

    /// Partitions the batch into `lengths.len()` rows, for column-oriented logging.
    ///
    /// When `lengths` is `None`, every instance becomes its own row.
    /// Fails right away if the lengths don't add up to the number of instances.
    #[inline]
    pub fn partition(
        self,
        lengths: Option<Vec<i32>>,
    ) -> Result<SerializedComponentColumn, PartitionError> {
        match lengths {
            Some(lengths) => SerializedComponentColumn::new(self, lengths),
            None => SerializedComponentColumn::new_unit(self),
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Float32Array, UInt8Array};

    use super::*;

    #[test]
    fn type_names() {
        let batch = SerializedComponentBatch::new(
            Arc::new(Float32Array::from(vec![1.0, 2.0])),
            ComponentDescriptor::partial("radii"),
        );
        assert_eq!(batch.type_name(), "Float32");
        assert_eq!(batch.len(), 2);

        let batch = batch
            .with_descriptor_override(
                ComponentDescriptor::partial("radii")
                    .with_component_type("rerun.components.Radius".into()),
            )
            .with_extension_name("rerun.datatypes.Float32");
        assert_eq!(batch.type_name(), "rerun.components.Radius");
        assert_eq!(
            batch.field().metadata().get(EXTENSION_NAME_KEY).map(String::as_str),
            Some("rerun.datatypes.Float32")
        );

        let bare = batch.into_storage();
        assert!(bare.extension_name.is_none());
        assert!(bare.field().metadata().is_empty());
    }

    #[test]
    fn equality() {
        let a = SerializedComponentBatch::new(
            Arc::new(UInt8Array::from(vec![1, 2])),
            ComponentDescriptor::partial("a"),
        );
        let b = SerializedComponentBatch::new(
            Arc::new(UInt8Array::from(vec![1, 3])),
            ComponentDescriptor::partial("a"),
        );
        assert_eq!(a, a.clone());
        assert_ne!(a, b);
        assert_ne!(a, a.clone().with_descriptor_override(ComponentDescriptor::partial("b")));
    }
}
