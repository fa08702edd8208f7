use std::sync::Arc;

use arrow::array::{Array as _, ListArray};
use arrow::buffer::NullBuffer;
use arrow::error::ArrowError;

use re_arrow_util::{list_array_lengths, wrap_in_list_array};

use crate::{ComponentDescriptor, ComponentIdentifier, SerializedComponentBatch};

/// Errors that can occur when partitioning a [`SerializedComponentBatch`] into rows.
#[derive(thiserror::Error, Debug, Clone)]
pub enum PartitionError {
    #[error(
        "partition lengths for {component} add up to {sum}, but the batch has {expected} instances"
    )]
    LengthMismatch {
        component: ComponentIdentifier,
        expected: usize,
        sum: i64,
    },

    #[error("partition lengths for {component} must be non-negative, got {length}")]
    NegativeLength {
        component: ComponentIdentifier,
        length: i32,
    },

    #[error(transparent)]
    Arrow(#[from] Arc<ArrowError>),
}

impl From<ArrowError> for PartitionError {
    #[inline]
    fn from(err: ArrowError) -> Self {
        Self::Arrow(Arc::new(err))
    }
}

/// A [`SerializedComponentBatch`] partitioned into rows, ready for column-oriented logging.
///
/// `lengths[i]` is the number of instances in row `i`; the lengths always add up to the
/// length of the underlying batch.
///
/// Repartitioning never touches the underlying batch: it yields a new column.
#[derive(Debug, Clone, PartialEq)]
pub struct SerializedComponentColumn {
    batch: SerializedComponentBatch,
    lengths: Vec<i32>,

    /// Rows that are null as a whole, as opposed to empty.
    nulls: Option<NullBuffer>,
}

impl SerializedComponentColumn {
    pub fn new(batch: SerializedComponentBatch, lengths: Vec<i32>) -> Result<Self, PartitionError> {
        let component = &batch.descriptor.component;

        if let Some(&length) = lengths.iter().find(|&&length| length < 0) {
            return Err(PartitionError::NegativeLength {
                component: component.clone(),
                length,
            });
        }

        let sum: i64 = lengths.iter().map(|&length| length as i64).sum();
        if sum != batch.len() as i64 {
            return Err(PartitionError::LengthMismatch {
                component: component.clone(),
                expected: batch.len(),
                sum,
            });
        }

        Ok(Self {
            batch,
            lengths,
            nulls: None,
        })
    }

    /// One row per instance.
    pub fn new_unit(batch: SerializedComponentBatch) -> Result<Self, PartitionError> {
        let num_instances = i32::try_from(batch.len()).map_err(|_err| {
            ArrowError::InvalidArgumentError(format!(
                "{} has too many instances ({}) to be partitioned",
                batch.descriptor.component,
                batch.len()
            ))
        })?;
        Self::new(batch, vec![1; num_instances as usize])
    }

    /// Interprets an existing list array as a column: each list is a row.
    ///
    /// Null lists are kept as null rows.
    pub fn from_list_array(
        list_array: &ListArray,
        descriptor: ComponentDescriptor,
    ) -> Result<Self, PartitionError> {
        let offsets = list_array.value_offsets();
        let (start, end) = match (offsets.first(), offsets.last()) {
            (Some(&start), Some(&end)) => (start as usize, end as usize),
            _ => (0, 0),
        };
        let values = list_array.values().slice(start, end - start);

        let mut column = Self::new(
            SerializedComponentBatch::new(values, descriptor),
            list_array_lengths(list_array),
        )?;
        column.nulls = list_array.nulls().cloned();
        Ok(column)
    }

    /// Returns a new column over the same batch, partitioned differently.
    pub fn partitioned(
        &self,
        lengths: impl IntoIterator<Item = i32>,
    ) -> Result<Self, PartitionError> {
        Self::new(self.batch.clone(), lengths.into_iter().collect())
    }

    #[inline]
    pub fn batch(&self) -> &SerializedComponentBatch {
        &self.batch
    }

    #[inline]
    pub fn descriptor(&self) -> &ComponentDescriptor {
        &self.batch.descriptor
    }

    #[inline]
    pub fn lengths(&self) -> &[i32] {
        &self.lengths
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.lengths.len()
    }

    /// The list array to be sent: one list per row, over the bare storage of the batch.
    pub fn to_list_array(&self) -> Result<ListArray, PartitionError> {
        Ok(wrap_in_list_array(
            self.batch.array.clone(),
            &self.lengths,
            self.nulls.clone(),
        )?)
    }
}

#[cfg(test)]
mod tests {
    use arrow::array::{Float64Array, Int64Array};
    use arrow::datatypes::Field;
    use re_arrow_util::offsets_from_lengths;

    use super::*;

    fn batch(values: Vec<f64>) -> SerializedComponentBatch {
        SerializedComponentBatch::new(
            Arc::new(Float64Array::from(values)),
            ComponentDescriptor::partial("confidence"),
        )
    }

    #[test]
    fn lengths_must_add_up() {
        let err = batch(vec![1.0, 2.0, 3.0])
            .partition(Some(vec![1, 1]))
            .unwrap_err();
        assert!(matches!(
            err,
            PartitionError::LengthMismatch {
                expected: 3,
                sum: 2,
                ..
            }
        ));

        let err = batch(vec![1.0]).partition(Some(vec![2, -1])).unwrap_err();
        assert!(matches!(err, PartitionError::NegativeLength { length: -1, .. }));

        let column = batch(vec![1.0, 2.0, 3.0])
            .partition(Some(vec![2, 0, 1]))
            .unwrap();
        assert_eq!(column.lengths(), &[2, 0, 1]);
        assert_eq!(column.num_rows(), 3);
    }

    #[test]
    fn unit_partition_round_trip() {
        let original = batch(vec![1.0, 2.0, 3.0, 4.0]);
        let column = original.clone().partition(None).unwrap();
        assert_eq!(column.lengths(), &[1, 1, 1, 1]);

        let list_array = column.to_list_array().unwrap();
        assert_eq!(list_array.len(), 4);

        let back =
            SerializedComponentColumn::from_list_array(&list_array, original.descriptor.clone())
                .unwrap();
        assert_eq!(back.batch(), &original);
        assert_eq!(back.lengths(), column.lengths());
    }

    #[test]
    fn repartition_is_copy() {
        let column = batch(vec![1.0, 2.0, 3.0]).partition(None).unwrap();
        let repartitioned = column.partitioned([3]).unwrap();

        assert_eq!(repartitioned.lengths(), &[3]);
        assert_eq!(column.lengths(), &[1, 1, 1]);
        assert_eq!(column.batch(), repartitioned.batch());

        assert!(column.partitioned([1, 1]).is_err());
    }

    #[test]
    fn from_sliced_list_array() {
        let values = Arc::new(Int64Array::from(vec![0, 1, 2, 3, 4, 5]));
        let list_array = ListArray::new(
            Arc::new(Field::new_list_field(arrow::datatypes::DataType::Int64, true)),
            offsets_from_lengths(&[1, 2, 3]).unwrap(),
            values,
            None,
        );
        let sliced = list_array.slice(1, 2);

        let column =
            SerializedComponentColumn::from_list_array(&sliced, ComponentDescriptor::partial("x"))
                .unwrap();
        assert_eq!(column.lengths(), &[2, 3]);
        assert_eq!(column.batch().len(), 5);
    }
}
