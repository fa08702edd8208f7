//! Logging arbitrary data without a schema.

use std::sync::Arc;

use arrow::array::{Array as _, ArrayRef};
use arrow::datatypes::DataType;
use indexmap::IndexMap;

use re_types_core::{
    ArchetypeName, AsComponents, ComponentDescriptor, ComponentIdentifier, ComponentType,
    SerializationError, SerializedComponentBatch,
};

use crate::coercion::{CoercionError, coerce_to_array};
use crate::{RegisteredType, TypeRegistry, Value};

#[derive(thiserror::Error, Debug, Clone)]
pub enum AnyValueError {
    #[error(
        "cannot convert {descriptor} without explicit type: \
        the value is empty and the component has never been logged before"
    )]
    Untyped { descriptor: ComponentDescriptor },

    #[error(
        "{descriptor}: value is inconsistent with previous type provided ({datatype}): {source}"
    )]
    Inconsistent {
        descriptor: ComponentDescriptor,
        datatype: DataType,
        source: CoercionError,
    },

    #[error("{descriptor}: {source}")]
    Coercion {
        descriptor: ComponentDescriptor,
        source: CoercionError,
    },
}

/// A component batch built out of a loosely typed [`Value`].
///
/// The first value successfully logged for a given [`ComponentDescriptor`] pins its type in the
/// [`TypeRegistry`]; later values are coerced to that same type, so that the resulting column
/// never changes type.
///
/// An empty value logged before anything pinned a type can't be typed at all.
/// Depending on `drop_untyped_nones`, this either produces no batch ([`Self::is_valid`] is false)
/// or an [`AnyValueError::Untyped`].
#[derive(Clone, Debug)]
pub struct AnyBatchValue {
    descriptor: ComponentDescriptor,
    batch: Option<SerializedComponentBatch>,
}

impl AnyBatchValue {
    pub fn new(
        registry: &TypeRegistry,
        descriptor: ComponentDescriptor,
        value: impl Into<Value>,
        drop_untyped_nones: bool,
    ) -> Result<Self, AnyValueError> {
        let value = value.into();
        let batch = coerce(registry, &descriptor, &value, drop_untyped_nones)?
            .map(|array| SerializedComponentBatch::new(array, descriptor.clone()));
        Ok(Self { descriptor, batch })
    }

    /// Did this produce an array?
    ///
    /// Callers must check this before adding the batch to a bundle.
    #[inline]
    pub fn is_valid(&self) -> bool {
        self.batch.is_some()
    }

    #[inline]
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.descriptor
    }

    #[inline]
    pub fn batch(&self) -> Option<&SerializedComponentBatch> {
        self.batch.as_ref()
    }

    #[inline]
    pub fn into_batch(self) -> Option<SerializedComponentBatch> {
        self.batch
    }
}

impl From<AnyBatchValue> for Option<SerializedComponentBatch> {
    #[inline]
    fn from(value: AnyBatchValue) -> Self {
        value.batch
    }
}

impl AsComponents for AnyBatchValue {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.batch.iter().cloned().collect()
    }
}

fn coerce(
    registry: &TypeRegistry,
    descriptor: &ComponentDescriptor,
    value: &Value,
    drop_untyped_nones: bool,
) -> Result<Option<ArrayRef>, AnyValueError> {
    // Already typed: nothing to coerce, nothing to pin.
    if let Value::Arrow(array) = value {
        return Ok(Some(array.clone()));
    }

    if let Some(pinned) = registry.get(descriptor) {
        return coerce_to_pinned(descriptor, value, &pinned).map(Some);
    }

    if value.is_empty() {
        return if drop_untyped_nones {
            re_log::debug!("Dropping empty value for {descriptor}: no type known yet");
            Ok(None)
        } else {
            Err(AnyValueError::Untyped {
                descriptor: descriptor.clone(),
            })
        };
    }

    let array = coerce_to_array(value, None).map_err(|source| AnyValueError::Coercion {
        descriptor: descriptor.clone(),
        source,
    })?;

    let pinned = registry.pin(descriptor, RegisteredType::new(array.data_type().clone()));
    if &pinned.arrow == array.data_type() {
        Ok(Some(array))
    } else {
        // Somebody else pinned a different type in the meantime: theirs wins.
        coerce_to_pinned(descriptor, value, &pinned).map(Some)
    }
}

fn coerce_to_pinned(
    descriptor: &ComponentDescriptor,
    value: &Value,
    pinned: &RegisteredType,
) -> Result<ArrayRef, AnyValueError> {
    coerce_to_array(value, Some(&pinned.arrow)).map_err(|source| AnyValueError::Inconsistent {
        descriptor: descriptor.clone(),
        datatype: pinned.arrow.clone(),
        source,
    })
}

// ---

/// A helper for logging a dynamically defined archetype.
///
/// Every component gets tagged with the archetype name.
///
/// Values that fail to convert are left out, and reported when the archetype is logged:
/// as an error or a warning, depending on the [`crate::ErrorPolicy`] of the recording.
///
/// ```
/// # let rec = re_sdk::RecordingStream::disabled();
/// let values = rec
///     .dynamic_archetype("MyExample")
///     .with_component("confidence", vec![1.2, 3.4, 5.6])
///     .with_component("description", "Bla bla bla…");
/// rec.log("detections", &values)?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Clone)]
pub struct DynamicArchetype {
    archetype_name: Option<ArchetypeName>,
    registry: Arc<TypeRegistry>,
    drop_untyped_nones: bool,
    batches: IndexMap<ComponentIdentifier, SerializedComponentBatch>,
    errors: Vec<AnyValueError>,
}

impl DynamicArchetype {
    /// Specifies an archetype name for this dynamically generated archetype.
    ///
    /// Uses the global [`TypeRegistry`]: prefer [`crate::RecordingStream::dynamic_archetype`],
    /// which uses the registry of the recording.
    #[inline]
    pub fn new(archetype_name: impl Into<ArchetypeName>) -> Self {
        Self {
            archetype_name: Some(archetype_name.into()),
            ..Self::new_without_archetype()
        }
    }

    // Only crate public to reduce code duplication.
    pub(crate) fn new_without_archetype() -> Self {
        Self {
            archetype_name: None,
            registry: TypeRegistry::global(),
            drop_untyped_nones: true,
            batches: Default::default(),
            errors: Vec::new(),
        }
    }

    /// Pins types in this registry instead of the global one.
    #[inline]
    pub fn with_registry(mut self, registry: Arc<TypeRegistry>) -> Self {
        self.registry = registry;
        self
    }

    /// Whether empty values of components that were never typed are silently dropped
    /// (the default), or an error.
    #[inline]
    pub fn with_drop_untyped_nones(mut self, drop_untyped_nones: bool) -> Self {
        self.drop_untyped_nones = drop_untyped_nones;
        self
    }

    fn descriptor(&self, component: ComponentIdentifier) -> ComponentDescriptor {
        let descriptor = ComponentDescriptor::partial(component);
        match &self.archetype_name {
            Some(archetype_name) => descriptor.with_archetype(archetype_name.clone()),
            None => descriptor,
        }
    }

    fn insert(&mut self, batch: AnyBatchValue) {
        if let Some(batch) = batch.into_batch() {
            self.batches.insert(batch.descriptor.component.clone(), batch);
        }
    }

    /// Adds a field of loosely typed data.
    ///
    /// Values that can't be converted are left out, and reported when this is logged.
    /// Use [`Self::try_with_component`] to handle the error yourself.
    #[inline]
    pub fn with_component(mut self, field: impl AsRef<str>, value: impl Into<Value>) -> Self {
        if let Err(err) = self.try_insert(field.as_ref().into(), None, value.into()) {
            self.defer(err);
        }
        self
    }

    /// Adds a field of loosely typed data, failing if it can't be converted.
    pub fn try_with_component(
        mut self,
        field: impl AsRef<str>,
        value: impl Into<Value>,
    ) -> Result<Self, AnyValueError> {
        self.try_insert(field.as_ref().into(), None, value.into())?;
        Ok(self)
    }

    /// Adds a field of arbitrary, already typed data.
    #[inline]
    pub fn with_component_from_data(mut self, field: impl AsRef<str>, array: ArrayRef) -> Self {
        let descriptor = self.descriptor(field.as_ref().into());
        self.batches.insert(
            descriptor.component.clone(),
            SerializedComponentBatch::new(array, descriptor),
        );
        self
    }

    /// Adds a field of loosely typed data, tagged with a component type.
    ///
    /// Values that can't be converted are left out, and reported when this is logged.
    pub fn with_component_override(
        mut self,
        field: impl AsRef<str>,
        component_type: impl Into<ComponentType>,
        value: impl Into<Value>,
    ) -> Self {
        let component_type = Some(component_type.into());
        if let Err(err) = self.try_insert(field.as_ref().into(), component_type, value.into()) {
            self.defer(err);
        }
        self
    }

    fn defer(&mut self, err: AnyValueError) {
        re_log::debug!("Left out of the bundle until it's logged: {err}");
        self.errors.push(err);
    }

    fn try_insert(
        &mut self,
        component: ComponentIdentifier,
        component_type: Option<ComponentType>,
        value: Value,
    ) -> Result<(), AnyValueError> {
        let mut descriptor = self.descriptor(component);
        descriptor.component_type = component_type;
        let batch = AnyBatchValue::new(&self.registry, descriptor, value, self.drop_untyped_nones)?;
        self.insert(batch);
        Ok(())
    }

    /// Is there anything to log?
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.batches.is_empty()
    }

    /// The values that couldn't be converted so far.
    #[inline]
    pub fn errors(&self) -> &[AnyValueError] {
        &self.errors
    }
}

impl AsComponents for DynamicArchetype {
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.batches.values().cloned().collect()
    }

    fn serialization_errors(&self) -> Vec<SerializationError> {
        self.errors
            .iter()
            .cloned()
            .map(SerializationError::conversion)
            .collect()
    }
}

// ---

/// A helper for logging arbitrary data, not tied to any archetype.
///
/// ```
/// # let rec = re_sdk::RecordingStream::disabled();
/// let values = rec
///     .any_values()
///     .with_component("confidence", vec![1.2, 3.4, 5.6])
///     .with_component("homepage", "https://www.rerun.io");
/// ```
#[derive(Clone)]
pub struct AnyValues(DynamicArchetype);

/// Uses the global [`TypeRegistry`]: prefer [`crate::RecordingStream::any_values`], which uses
/// the registry of the recording.
impl Default for AnyValues {
    fn default() -> Self {
        Self(DynamicArchetype::new_without_archetype())
    }
}

impl AnyValues {
    #[inline]
    pub fn with_registry(self, registry: Arc<TypeRegistry>) -> Self {
        Self(self.0.with_registry(registry))
    }

    #[inline]
    pub fn with_drop_untyped_nones(self, drop_untyped_nones: bool) -> Self {
        Self(self.0.with_drop_untyped_nones(drop_untyped_nones))
    }

    /// See [`DynamicArchetype::with_component`].
    #[inline]
    pub fn with_component(self, field: impl AsRef<str>, value: impl Into<Value>) -> Self {
        Self(self.0.with_component(field, value))
    }

    /// See [`DynamicArchetype::try_with_component`].
    #[inline]
    pub fn try_with_component(
        self,
        field: impl AsRef<str>,
        value: impl Into<Value>,
    ) -> Result<Self, AnyValueError> {
        self.0.try_with_component(field, value).map(Self)
    }

    /// See [`DynamicArchetype::with_component_from_data`].
    #[inline]
    pub fn with_component_from_data(self, field: impl AsRef<str>, array: ArrayRef) -> Self {
        Self(self.0.with_component_from_data(field, array))
    }

    /// See [`DynamicArchetype::with_component_override`].
    #[inline]
    pub fn with_component_override(
        self,
        field: impl AsRef<str>,
        component_type: impl Into<ComponentType>,
        value: impl Into<Value>,
    ) -> Self {
        Self(self.0.with_component_override(field, component_type, value))
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// See [`DynamicArchetype::errors`].
    #[inline]
    pub fn errors(&self) -> &[AnyValueError] {
        self.0.errors()
    }
}

impl AsComponents for AnyValues {
    #[inline]
    fn as_serialized_batches(&self) -> Vec<SerializedComponentBatch> {
        self.0.as_serialized_batches()
    }

    #[inline]
    fn serialization_errors(&self) -> Vec<SerializationError> {
        self.0.serialization_errors()
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use arrow::array::StringArray;

    use super::*;

    #[test]
    fn type_stability() {
        let registry = TypeRegistry::new();
        let descriptor = ComponentDescriptor::partial("conf");

        let first =
            AnyBatchValue::new(&registry, descriptor.clone(), vec![1.2, 3.4], true).unwrap();
        assert!(first.is_valid());
        assert_eq!(
            registry.get(&descriptor).map(|ty| ty.arrow),
            Some(DataType::Float64)
        );

        // Compatible values are coerced to the pinned type.
        let second =
            AnyBatchValue::new(&registry, descriptor.clone(), vec![5, 6, 7], true).unwrap();
        let batch = second.batch().unwrap();
        assert_eq!(batch.datatype(), &DataType::Float64);
        assert_eq!(batch.len(), 3);

        let err = AnyBatchValue::new(&registry, descriptor.clone(), "oops", true).unwrap_err();
        assert!(matches!(err, AnyValueError::Inconsistent { .. }));
        assert!(
            err.to_string().contains("inconsistent with previous type provided (Float64)"),
            "{err}"
        );
    }

    #[test]
    fn untyped_nones() {
        let registry = TypeRegistry::new();
        let descriptor = ComponentDescriptor::partial("maybe");

        let dropped = AnyBatchValue::new(&registry, descriptor.clone(), Value::Null, true).unwrap();
        assert!(!dropped.is_valid());
        assert!(dropped.as_serialized_batches().is_empty());

        let err = AnyBatchValue::new(&registry, descriptor.clone(), Vec::<i32>::new(), false)
            .unwrap_err();
        assert!(matches!(err, AnyValueError::Untyped { .. }), "{err}");
        assert!(registry.is_empty());

        // Once typed, an empty value is an empty array of that type.
        AnyBatchValue::new(&registry, descriptor.clone(), "typed", true).unwrap();
        let empty = AnyBatchValue::new(&registry, descriptor, Value::Null, true).unwrap();
        let batch = empty.batch().unwrap();
        assert_eq!(batch.datatype(), &DataType::Utf8);
        assert!(batch.is_empty());
    }

    #[test]
    fn arrow_values_pass_through() {
        let registry = TypeRegistry::new();
        let array: ArrayRef = Arc::new(StringArray::from(vec!["a", "b"]));
        let value = AnyBatchValue::new(
            &registry,
            ComponentDescriptor::partial("labels"),
            array.clone(),
            true,
        )
        .unwrap();
        assert!(Arc::ptr_eq(value.batch().unwrap().as_array(), &array));
        assert!(registry.is_empty());
    }

    #[test]
    fn dynamic_archetype() {
        let registry = Arc::new(TypeRegistry::new());
        let values = DynamicArchetype::new("MyExample")
            .with_registry(registry.clone())
            .with_component("confidence", vec![1.2, 3.4, 5.6])
            .with_component_override("homepage", "user.url", "https://www.rerun.io")
            .with_component_from_data(
                "description",
                Arc::new(StringArray::from(vec!["Bla bla bla…"])),
            );

        let actual = values
            .as_serialized_batches()
            .into_iter()
            .map(|batch| batch.descriptor)
            .collect::<BTreeSet<_>>();

        similar_asserts::assert_eq!(
            actual,
            [
                ComponentDescriptor::partial("confidence").with_archetype("MyExample".into()),
                ComponentDescriptor::partial("homepage")
                    .with_component_type("user.url".into())
                    .with_archetype("MyExample".into()),
                ComponentDescriptor::partial("description").with_archetype("MyExample".into()),
            ]
            .into_iter()
            .collect()
        );
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn lenient_and_strict_builders() {
        let registry = Arc::new(TypeRegistry::new());
        let values = AnyValues::default()
            .with_registry(registry.clone())
            .with_component("conf", vec![1.2, 3.4])
            .with_component("conf", "oops");

        // The second value was left out, the first one survived.
        let batches = values.as_serialized_batches();
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].len(), 2);

        // The failure is kept around for the logger to report.
        assert_eq!(values.errors().len(), 1);
        let errors = values.serialization_errors();
        assert_eq!(errors.len(), 1);
        assert!(errors[0].to_string().contains("previous type"), "{}", errors[0]);

        let err = AnyValues::default()
            .with_registry(registry)
            .try_with_component("conf", "oops")
            .err()
            .unwrap();
        assert!(err.to_string().contains("previous type"), "{err}");
    }
}
