//! Merging many component bundles into a single row.

use std::sync::Arc;

use arrow::array::{Array as _, ArrayRef, UInt64Array};
use indexmap::IndexMap;
use indexmap::map::Entry;

use re_types_core::{
    AsComponents, ComponentDescriptor, ComponentIdentifier, SerializationError,
    SerializedComponentBatch,
};

/// The component injected alongside splats, marking the row as a broadcast.
pub const INSTANCE_KEY: &str = "rerun.components.InstanceKey";

/// The value of the [`INSTANCE_KEY`] splat.
pub const INSTANCE_KEY_SPLAT: u64 = u64::MAX;

/// Anything that can be logged as (part of) a row.
pub enum BundleLike<'a> {
    /// An archetype, or any other self-describing bundle of components.
    Described(&'a dyn AsComponents),

    /// Loose batches. `None`s are batches that failed to convert, and have been reported as such.
    Raw(Vec<Option<SerializedComponentBatch>>),
}

impl BundleLike<'_> {
    fn into_batches(self) -> Vec<Option<SerializedComponentBatch>> {
        match self {
            Self::Described(as_components) => as_components
                .as_serialized_batches()
                .into_iter()
                .map(Some)
                .collect(),
            Self::Raw(batches) => batches,
        }
    }
}

impl<'a, AS: AsComponents> From<&'a AS> for BundleLike<'a> {
    #[inline]
    fn from(as_components: &'a AS) -> Self {
        Self::Described(as_components)
    }
}

impl From<Vec<Option<SerializedComponentBatch>>> for BundleLike<'_> {
    #[inline]
    fn from(batches: Vec<Option<SerializedComponentBatch>>) -> Self {
        Self::Raw(batches)
    }
}

impl From<Vec<SerializedComponentBatch>> for BundleLike<'_> {
    #[inline]
    fn from(batches: Vec<SerializedComponentBatch>) -> Self {
        Self::Raw(batches.into_iter().map(Some).collect())
    }
}

impl From<SerializedComponentBatch> for BundleLike<'_> {
    #[inline]
    fn from(batch: SerializedComponentBatch) -> Self {
        Self::Raw(vec![Some(batch)])
    }
}

/// Options for row-oriented logging.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct LogOptions {
    /// Static data has no time, and shadows any temporal data of the same component.
    pub is_static: bool,

    /// Defaults to the length of the longest batch.
    pub num_instances: Option<usize>,

    /// Overrides the stream's default [`crate::ErrorPolicy`] for this call.
    pub strict: Option<bool>,
}

impl LogOptions {
    #[inline]
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn with_static(mut self, is_static: bool) -> Self {
        self.is_static = is_static;
        self
    }

    #[inline]
    pub fn with_num_instances(mut self, num_instances: usize) -> Self {
        self.num_instances = Some(num_instances);
        self
    }

    #[inline]
    pub fn with_strict(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }
}

/// The result of merging bundles: what gets written, and what to complain about.
#[derive(Debug, Default)]
pub(crate) struct MergedRow {
    /// Length-1 arrays applying to every instance, plus the [`INSTANCE_KEY`] sentinel.
    pub splats: IndexMap<ComponentDescriptor, ArrayRef>,

    /// Everything else.
    pub instanced: IndexMap<ComponentDescriptor, ArrayRef>,

    /// Every later occurrence of an already seen component, in order.
    pub duplicates: Vec<ComponentIdentifier>,

    /// Fields the bundles failed to build, reported by the bundles themselves.
    pub errors: Vec<SerializationError>,
}

/// Flattens `bundles` into one row.
///
/// The first occurrence of a component wins: a bundle's own components can't be overridden by
/// some other bundle further down the list.
pub(crate) fn merge_row(bundles: Vec<BundleLike<'_>>, num_instances: Option<usize>) -> MergedRow {
    let mut merged = MergedRow::default();

    let mut batches: IndexMap<ComponentIdentifier, SerializedComponentBatch> = IndexMap::new();
    let mut bundle_batches = Vec::new();
    for bundle in bundles {
        if let BundleLike::Described(as_components) = &bundle {
            merged.errors.extend(as_components.serialization_errors());
        }
        bundle_batches.extend(bundle.into_batches().into_iter().flatten());
    }

    for batch in bundle_batches {
        match batches.entry(batch.descriptor.component.clone()) {
            Entry::Occupied(entry) => merged.duplicates.push(entry.key().clone()),
            Entry::Vacant(entry) => {
                entry.insert(batch.into_storage());
            }
        }
    }

    let num_instances = num_instances
        .unwrap_or_else(|| batches.values().map(|batch| batch.len()).max().unwrap_or(0));

    for batch in batches.into_values() {
        let SerializedComponentBatch {
            array, descriptor, ..
        } = batch;

        if array.len() == 1 && num_instances > 1 {
            merged.splats.insert(descriptor, array);
        } else {
            merged.instanced.insert(descriptor, array);
        }
    }

    if !merged.splats.is_empty() {
        merged
            .splats
            .entry(instance_key_descriptor())
            .or_insert_with(|| Arc::new(UInt64Array::from(vec![INSTANCE_KEY_SPLAT])) as ArrayRef);
    }

    merged
}

pub(crate) fn instance_key_descriptor() -> ComponentDescriptor {
    ComponentDescriptor::partial(INSTANCE_KEY).with_component_type(INSTANCE_KEY.into())
}
