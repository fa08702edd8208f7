use std::sync::Arc;

use arrow::array::{
    Array, ArrayRef, FixedSizeListArray, LargeListArray, ListArray, StructArray, UnionArray,
    new_empty_array,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::datatypes::{DataType, Field, UnionMode};
use arrow::error::ArrowError;
use itertools::Itertools as _;

// ---------------------------------------------------------------------------------

/// Downcast an arrow array to another array, without having to go via `Any`.
pub trait ArrowArrayDowncastRef<'a>: 'a {
    /// Downcast an arrow array to another array, without having to go via `Any`.
    fn downcast_array_ref<T: Array + 'static>(self) -> Option<&'a T>;

    /// Similar to `downcast_array_ref`, but returns an error in case the downcast
    /// returns `None`.
    fn try_downcast_array_ref<T: Array + 'static>(self) -> Result<&'a T, ArrowError>;
}

impl<'a> ArrowArrayDowncastRef<'a> for &'a dyn Array {
    fn downcast_array_ref<T: Array + 'static>(self) -> Option<&'a T> {
        self.as_any().downcast_ref()
    }

    fn try_downcast_array_ref<T: Array + 'static>(self) -> Result<&'a T, ArrowError> {
        self.downcast_array_ref::<T>().ok_or_else(|| {
            ArrowError::CastError(format!(
                "Failed to downcast array of type {} to {}",
                self.data_type(),
                std::any::type_name::<T>(),
            ))
        })
    }
}

impl<'a> ArrowArrayDowncastRef<'a> for &'a ArrayRef {
    fn downcast_array_ref<T: Array + 'static>(self) -> Option<&'a T> {
        self.as_any().downcast_ref()
    }

    fn try_downcast_array_ref<T: Array + 'static>(self) -> Result<&'a T, ArrowError> {
        self.as_ref().try_downcast_array_ref::<T>()
    }
}

// ---------------------------------------------------------------------------------

#[inline]
pub fn into_arrow_ref(array: impl Array + 'static) -> ArrayRef {
    Arc::new(array)
}

/// Creates a zero-length array of exactly the given datatype.
///
/// Unlike [`arrow::array::new_empty_array`], nested types (structs, unions, lists) are built
/// field by field, so that deeply nested layouts (e.g. a struct of dense unions of lists) keep
/// their full child datatypes instead of collapsing to something merely compatible.
pub fn new_empty_array_deep(datatype: &DataType) -> ArrayRef {
    match datatype {
        DataType::Struct(fields) => {
            let children = fields
                .iter()
                .map(|field| new_empty_array_deep(field.data_type()))
                .collect_vec();
            into_arrow_ref(StructArray::new(fields.clone(), children, None))
        }

        DataType::Union(fields, mode) => {
            let children = fields
                .iter()
                .map(|(_, field)| new_empty_array_deep(field.data_type()))
                .collect_vec();
            let offsets = match mode {
                UnionMode::Dense => Some(ScalarBuffer::<i32>::from(Vec::new())),
                UnionMode::Sparse => None,
            };

            match UnionArray::try_new(
                fields.clone(),
                ScalarBuffer::<i8>::from(Vec::new()),
                offsets,
                children,
            ) {
                Ok(array) => into_arrow_ref(array),
                Err(err) => {
                    re_log::debug_panic!("failed to build empty union array: {err}");
                    new_empty_array(datatype)
                }
            }
        }

        DataType::List(field) => into_arrow_ref(ListArray::new(
            field.clone(),
            OffsetBuffer::new_empty(),
            new_empty_array_deep(field.data_type()),
            None,
        )),

        DataType::LargeList(field) => into_arrow_ref(LargeListArray::new(
            field.clone(),
            OffsetBuffer::new_empty(),
            new_empty_array_deep(field.data_type()),
            None,
        )),

        DataType::FixedSizeList(field, size) => into_arrow_ref(FixedSizeListArray::new(
            field.clone(),
            *size,
            new_empty_array_deep(field.data_type()),
            None,
        )),

        // Leaves, maps, dictionaries, run-ends etc: arrow already gets those exactly right.
        _ => new_empty_array(datatype),
    }
}

/// Builds list offsets out of per-row lengths.
///
/// Fails on negative lengths and on `i32` overflow rather than panicking like
/// [`OffsetBuffer::from_lengths`] does.
pub fn offsets_from_lengths(lengths: &[i32]) -> Result<OffsetBuffer<i32>, ArrowError> {
    let mut offsets = Vec::with_capacity(lengths.len() + 1);
    offsets.push(0_i32);

    let mut total = 0_i32;
    for &len in lengths {
        if len < 0 {
            return Err(ArrowError::InvalidArgumentError(format!(
                "list lengths must be non-negative, got {len}"
            )));
        }
        total = total.checked_add(len).ok_or_else(|| {
            ArrowError::InvalidArgumentError("list offsets overflow i32".to_owned())
        })?;
        offsets.push(total);
    }

    Ok(OffsetBuffer::new(ScalarBuffer::from(offsets)))
}

/// The length of every entry of the given list array, nulls counting as zero.
pub fn list_array_lengths(list_array: &ListArray) -> Vec<i32> {
    list_array
        .offsets()
        .windows(2)
        .map(|window| window[1] - window[0])
        .collect()
}

/// Convert `[A, B, C, D, E]` with lengths `[2, 0, 3]` into `[[A, B], [], [C, D, E]]`.
///
/// Zero-copy: the resulting list shares the input array as its values.
/// Entries marked as null in `nulls` must have a length of zero.
pub fn wrap_in_list_array(
    array: ArrayRef,
    lengths: &[i32],
    nulls: Option<NullBuffer>,
) -> Result<ListArray, ArrowError> {
    let offsets = offsets_from_lengths(lengths)?;

    let nullable = true;
    let field = Arc::new(Field::new_list_field(array.data_type().clone(), nullable));

    ListArray::try_new(field, offsets, array, nulls)
}

/// A list array of `len` null entries, whose values are of the given `child_datatype`.
pub fn new_null_list_array(child_datatype: &DataType, len: usize) -> ListArray {
    let nullable = true;
    ListArray::new_null(
        Arc::new(Field::new_list_field(child_datatype.clone(), nullable)),
        len,
    )
}

/// Applies a [`arrow::compute::concat`] kernel to the given `arrays`.
///
/// Early outs where it makes sense (e.g. `arrays.len() == 1`).
///
/// Returns an error if the arrays don't share the exact same datatype.
pub fn concat_arrays(arrays: &[&dyn Array]) -> arrow::error::Result<ArrayRef> {
    if let [array] = arrays {
        return Ok(array.slice(0, array.len()));
    }
    arrow::compute::concat(arrays)
}

// ---------------------------------------------------------------------------------
