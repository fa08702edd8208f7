//! Turning loosely typed [`Value`]s into arrow arrays.
//!
//! Coercion tries an ordered list of strategies, cheapest first.
//! The failure of every strategy but the last one just means "try the next one":
//! only the generic fallback's error is surfaced.

use std::borrow::Cow;
use std::sync::Arc;

use arrow::array::{
    Array as _, ArrayRef, BinaryArray, BooleanArray, FixedSizeListArray, LargeBinaryArray,
    LargeListArray, LargeStringArray, ListArray, NullArray, PrimitiveArray, StringArray,
};
use arrow::buffer::{NullBuffer, OffsetBuffer, ScalarBuffer};
use arrow::compute::{CastOptions, cast_with_options};
use arrow::datatypes::{
    DataType, Float16Type, Float32Type, Float64Type, Int8Type, Int16Type, Int32Type, Int64Type,
    UInt8Type, UInt16Type, UInt32Type, UInt64Type,
};

use itertools::Itertools as _;

use re_arrow_util::{ArrowArrayDowncastRef as _, new_empty_array_deep, offsets_from_lengths};

use crate::{NativeType, Tensor, Value};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum CoercionError {
    /// The strategy doesn't handle this kind of value; the next one will be tried.
    #[error("the {strategy} strategy does not apply to a {kind} value")]
    NotApplicable {
        strategy: &'static str,
        kind: &'static str,
    },

    #[error("cannot convert value to {target}: {reason}")]
    CannotConvert { target: String, reason: String },
}

impl CoercionError {
    fn cannot_convert(target: Option<&DataType>, reason: impl Into<String>) -> Self {
        Self::CannotConvert {
            target: target.map_or_else(|| "an arrow array".to_owned(), ToString::to_string),
            reason: reason.into(),
        }
    }
}

type Strategy = fn(&Value, Option<&DataType>) -> Result<ArrayRef, CoercionError>;

/// Tried in order, first success wins. [`from_any`] comes last.
const STRATEGIES: [(&str, Strategy); 3] = [
    ("tensor", from_tensor),
    ("string", from_string),
    ("scalar", from_scalar),
];

static NULL: Value = Value::Null;

/// Converts `value` into an arrow array, of type `target` if given, inferred otherwise.
///
/// * Already typed arrays are passed through, cast if they don't match `target`.
/// * `None` or an empty list with a `target` yields an empty array of exactly that type.
/// * Scalars become length-1 arrays; strings and bytes are a single element, never split.
pub fn coerce_to_array(
    value: &Value,
    target: Option<&DataType>,
) -> Result<ArrayRef, CoercionError> {
    if let Value::Arrow(array) = value {
        return match target {
            Some(target) if array.data_type() != target => {
                cast_array(array, target)
                    .map_err(|reason| CoercionError::cannot_convert(Some(target), reason))
            }
            _ => Ok(array.clone()),
        };
    }

    if let Some(target) = target {
        let is_none = match value {
            Value::Null => true,
            Value::List(values) => values.is_empty(),
            _ => false,
        };
        if is_none {
            return Ok(new_empty_array_deep(target));
        }
    }

    for (name, strategy) in STRATEGIES {
        match strategy(value, target) {
            Ok(array) => return Ok(array),
            Err(err) => re_log::trace!("{name} coercion failed: {err}"),
        }
    }

    from_any(value, target)
}

/// Zero-copy: the tensor's buffer becomes the array's buffer, flattened.
fn from_tensor(value: &Value, target: Option<&DataType>) -> Result<ArrayRef, CoercionError> {
    let Value::Tensor(tensor) = value else {
        return Err(CoercionError::NotApplicable {
            strategy: "tensor",
            kind: value.kind(),
        });
    };

    let array = tensor_to_array(tensor)
        .map_err(|reason| CoercionError::cannot_convert(target, reason))?;

    match target {
        Some(target) if array.data_type() != target => {
            if target.is_nested() {
                return Err(CoercionError::cannot_convert(
                    Some(target),
                    "tensors are flattened, use a flat target type",
                ));
            }
            cast_array(&array, target)
                .map_err(|reason| CoercionError::cannot_convert(Some(target), reason))
        }
        _ => Ok(array),
    }
}

/// Strings and bytes are iterable, but must never be split into characters.
fn from_string(value: &Value, target: Option<&DataType>) -> Result<ArrayRef, CoercionError> {
    let unsupported = |target: &DataType| {
        CoercionError::cannot_convert(Some(target), format!("a {} is not a {target}", value.kind()))
    };

    let array: ArrayRef = match (value, target) {
        (Value::Str(s), None | Some(DataType::Utf8)) => {
            Arc::new(StringArray::from(vec![s.as_str()]))
        }
        (Value::Str(s), Some(DataType::LargeUtf8)) => {
            Arc::new(LargeStringArray::from(vec![s.as_str()]))
        }
        (Value::Str(s), Some(DataType::Binary)) => Arc::new(BinaryArray::from(vec![s.as_bytes()])),
        (Value::Str(s), Some(DataType::LargeBinary)) => {
            Arc::new(LargeBinaryArray::from(vec![s.as_bytes()]))
        }

        (Value::Bytes(b), None | Some(DataType::Binary)) => {
            Arc::new(BinaryArray::from(vec![b.as_slice()]))
        }
        (Value::Bytes(b), Some(DataType::LargeBinary)) => {
            Arc::new(LargeBinaryArray::from(vec![b.as_slice()]))
        }
        (Value::Bytes(b), Some(target @ (DataType::Utf8 | DataType::LargeUtf8))) => {
            let s = std::str::from_utf8(b).map_err(|err| {
                CoercionError::cannot_convert(Some(target), format!("invalid UTF-8: {err}"))
            })?;
            if target == &DataType::Utf8 {
                Arc::new(StringArray::from(vec![s]))
            } else {
                Arc::new(LargeStringArray::from(vec![s]))
            }
        }

        (Value::Str(_) | Value::Bytes(_), Some(target)) => return Err(unsupported(target)),

        _ => {
            return Err(CoercionError::NotApplicable {
                strategy: "string",
                kind: value.kind(),
            });
        }
    };

    Ok(array)
}

/// Lifts a single scalar into a length-1 array.
fn from_scalar(value: &Value, target: Option<&DataType>) -> Result<ArrayRef, CoercionError> {
    let inferred = match value {
        Value::Bool(_) => DataType::Boolean,
        Value::Int(_) => DataType::Int64,
        Value::UInt(_) => DataType::UInt64,
        Value::Float(_) => DataType::Float64,
        _ => {
            return Err(CoercionError::NotApplicable {
                strategy: "scalar",
                kind: value.kind(),
            });
        }
    };

    let datatype = target.unwrap_or(&inferred);
    build_array(&[value], datatype)
        .map_err(|reason| CoercionError::cannot_convert(Some(datatype), reason))
}

/// The generic fallback: infers a common type for (possibly nested) lists, the way a numeric
/// array library would, then builds the array.
///
/// Scalars that made it this far are treated as one-element lists.
fn from_any(value: &Value, target: Option<&DataType>) -> Result<ArrayRef, CoercionError> {
    let values: Cow<'_, [Value]> = match value {
        Value::List(values) => Cow::Borrowed(values.as_slice()),
        Value::Tensor(tensor) => Cow::Owned(
            tensor_to_values(tensor)
                .map_err(|reason| CoercionError::cannot_convert(target, reason))?,
        ),
        value => Cow::Borrowed(std::slice::from_ref(value)),
    };
    let values = values.iter().collect_vec();

    let datatype = match target {
        Some(target) => target.clone(),
        None => infer_datatype(&values)
            .map_err(|reason| CoercionError::cannot_convert(None, reason))?,
    };

    build_array(&values, &datatype)
        .map_err(|reason| CoercionError::cannot_convert(Some(&datatype), reason))
}

fn cast_array(array: &ArrayRef, target: &DataType) -> Result<ArrayRef, String> {
    let options = CastOptions {
        safe: false, // error out rather than silently introduce nulls
        ..Default::default()
    };
    cast_with_options(array, target, &options).map_err(|err| err.to_string())
}

// --- Tensors ---

fn tensor_to_array(tensor: &Tensor) -> Result<ArrayRef, String> {
    let len = tensor.num_elements();
    let width = tensor
        .native_type
        .byte_width()
        .ok_or_else(|| format!("{} tensors are not supported", tensor.native_type))?;
    if tensor.buffer.len() != len * width {
        return Err(format!(
            "tensor of shape {:?} needs {} bytes, but its buffer has {}",
            tensor.shape,
            len * width,
            tensor.buffer.len()
        ));
    }

    macro_rules! zero_copy {
        ($arrow_type:ty) => {{
            type Native = <$arrow_type as arrow::datatypes::ArrowPrimitiveType>::Native;
            if tensor.buffer.as_ptr().align_offset(std::mem::align_of::<Native>()) != 0 {
                return Err("tensor buffer is not aligned".to_owned());
            }
            let values = ScalarBuffer::<Native>::new(tensor.buffer.clone(), 0, len);
            Arc::new(PrimitiveArray::<$arrow_type>::new(values, None)) as ArrayRef
        }};
    }

    Ok(match tensor.native_type {
        NativeType::Int8 => zero_copy!(Int8Type),
        NativeType::Int16 => zero_copy!(Int16Type),
        NativeType::Int32 => zero_copy!(Int32Type),
        NativeType::Int64 => zero_copy!(Int64Type),
        NativeType::UInt8 => zero_copy!(UInt8Type),
        NativeType::UInt16 => zero_copy!(UInt16Type),
        NativeType::UInt32 => zero_copy!(UInt32Type),
        NativeType::UInt64 => zero_copy!(UInt64Type),
        NativeType::Float16 => zero_copy!(Float16Type),
        NativeType::Float32 => zero_copy!(Float32Type),
        NativeType::Float64 => zero_copy!(Float64Type),
        NativeType::Bool | NativeType::Utf8 | NativeType::Binary => {
            return Err(format!("{} tensors are not supported", tensor.native_type));
        }
    })
}

/// Nested lists following the tensor's shape, outermost dimension first.
fn tensor_to_values(tensor: &Tensor) -> Result<Vec<Value>, String> {
    let array = tensor_to_array(tensor)?;

    macro_rules! collect {
        ($arrow_type:ty, $variant:ident) => {
            array
                .downcast_array_ref::<PrimitiveArray<$arrow_type>>()
                .ok_or_else(|| format!("expected a {} array", array.data_type()))?
                .values()
                .iter()
                .map(|&v| Value::$variant(v.into()))
                .collect_vec()
        };
    }

    let mut values = match tensor.native_type {
        NativeType::Int8 => collect!(Int8Type, Int),
        NativeType::Int16 => collect!(Int16Type, Int),
        NativeType::Int32 => collect!(Int32Type, Int),
        NativeType::Int64 => collect!(Int64Type, Int),
        NativeType::UInt8 => collect!(UInt8Type, UInt),
        NativeType::UInt16 => collect!(UInt16Type, UInt),
        NativeType::UInt32 => collect!(UInt32Type, UInt),
        NativeType::UInt64 => collect!(UInt64Type, UInt),
        NativeType::Float16 => collect!(Float16Type, Float),
        NativeType::Float32 => collect!(Float32Type, Float),
        NativeType::Float64 => collect!(Float64Type, Float),
        NativeType::Bool | NativeType::Utf8 | NativeType::Binary => {
            return Err(format!("{} tensors are not supported", tensor.native_type));
        }
    };

    // Fold the innermost dimensions into lists, keeping the outermost one as the array length.
    for &dim in tensor.shape.iter().skip(1).rev() {
        if dim == 0 {
            return Err(format!("cannot reshape a tensor of shape {:?}", tensor.shape));
        }
        values = values
            .into_iter()
            .chunks(dim)
            .into_iter()
            .map(|chunk| Value::List(chunk.collect()))
            .collect();
    }

    Ok(values)
}

// --- Inference ---

/// Numeric kinds, in promotion order.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
enum Numeric {
    Bool,
    Int,
    UInt,
    Float,
}

#[derive(Clone, Debug, PartialEq, Eq)]
enum Inferred {
    /// Only nulls so far.
    Unknown,
    Numeric(Numeric),
    Utf8,
    Binary,
    List(Box<Self>),
}

impl Inferred {
    fn of(value: &Value) -> Result<Self, String> {
        Ok(match value {
            Value::Null => Self::Unknown,
            Value::Bool(_) => Self::Numeric(Numeric::Bool),
            Value::Int(_) => Self::Numeric(Numeric::Int),
            Value::UInt(_) => Self::Numeric(Numeric::UInt),
            Value::Float(_) => Self::Numeric(Numeric::Float),
            Value::Str(_) => Self::Utf8,
            Value::Bytes(_) => Self::Binary,
            Value::List(values) => Self::List(Box::new(
                values
                    .iter()
                    .try_fold(Self::Unknown, |acc, value| acc.merge(Self::of(value)?))?,
            )),
            Value::Tensor(_) | Value::Arrow(_) => {
                return Err(format!("a {} cannot be nested in a list", value.kind()));
            }
        })
    }

    fn merge(self, other: Self) -> Result<Self, String> {
        match (self, other) {
            (Self::Unknown, other) | (other, Self::Unknown) => Ok(other),
            (Self::Numeric(a), Self::Numeric(b)) => Ok(Self::Numeric(a.max(b))),
            (Self::Utf8, Self::Utf8) => Ok(Self::Utf8),
            (Self::Binary, Self::Binary) => Ok(Self::Binary),
            (Self::List(a), Self::List(b)) => Ok(Self::List(Box::new(a.merge(*b)?))),
            (a, b) => Err(format!("cannot mix {} and {} values", a.name(), b.name())),
        }
    }

    fn name(&self) -> &'static str {
        match self {
            Self::Unknown => "null",
            Self::Numeric(Numeric::Bool) => "bool",
            Self::Numeric(Numeric::Int) => "int",
            Self::Numeric(Numeric::UInt) => "unsigned int",
            Self::Numeric(Numeric::Float) => "float",
            Self::Utf8 => "string",
            Self::Binary => "bytes",
            Self::List(_) => "list",
        }
    }

    fn into_datatype(self) -> Result<DataType, String> {
        Ok(match self {
            Self::Unknown => return Err("cannot infer a type from null values only".to_owned()),
            Self::Numeric(Numeric::Bool) => DataType::Boolean,
            Self::Numeric(Numeric::Int) => DataType::Int64,
            Self::Numeric(Numeric::UInt) => DataType::UInt64,
            Self::Numeric(Numeric::Float) => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Binary => DataType::Binary,
            Self::List(inner) => DataType::new_list(inner.into_datatype()?, true),
        })
    }
}

fn infer_datatype(values: &[&Value]) -> Result<DataType, String> {
    values
        .iter()
        .try_fold(Inferred::Unknown, |acc, value| acc.merge(Inferred::of(value)?))?
        .into_datatype()
}

// --- Building ---

fn to_i64(value: &Value) -> Result<i64, String> {
    match value {
        Value::Bool(b) => Ok(i64::from(*b)),
        Value::Int(i) => Ok(*i),
        Value::UInt(u) => i64::try_from(*u).map_err(|_err| format!("{u} does not fit in an i64")),
        Value::Float(f) if f.fract() == 0.0 && (i64::MIN as f64..i64::MAX as f64).contains(f) => {
            Ok(*f as i64)
        }
        Value::Float(f) => Err(format!("float {f} is not an integer")),
        value => Err(format!("a {} is not an integer", value.kind())),
    }
}

fn to_u64(value: &Value) -> Result<u64, String> {
    match value {
        Value::Int(i) => u64::try_from(*i).map_err(|_err| format!("{i} is negative")),
        Value::UInt(u) => Ok(*u),
        value => {
            let i = to_i64(value)?;
            u64::try_from(i).map_err(|_err| format!("{i} is negative"))
        }
    }
}

fn to_f64(value: &Value) -> Result<f64, String> {
    match value {
        Value::Bool(b) => Ok(f64::from(u8::from(*b))),
        Value::Int(i) => Ok(*i as f64),
        Value::UInt(u) => Ok(*u as f64),
        Value::Float(f) => Ok(*f),
        value => Err(format!("a {} is not a number", value.kind())),
    }
}

fn narrow<T: TryFrom<i64>>(value: &Value, name: &str) -> Result<T, String> {
    let i = to_i64(value)?;
    T::try_from(i).map_err(|_err| format!("{i} does not fit in an {name}"))
}

fn narrow_unsigned<T: TryFrom<u64>>(value: &Value, name: &str) -> Result<T, String> {
    let u = to_u64(value)?;
    T::try_from(u).map_err(|_err| format!("{u} does not fit in a {name}"))
}

fn to_str(value: &Value) -> Result<&str, String> {
    match value {
        Value::Str(s) => Ok(s),
        Value::Bytes(b) => std::str::from_utf8(b).map_err(|err| format!("invalid UTF-8: {err}")),
        value => Err(format!("a {} is not a string", value.kind())),
    }
}

fn to_bytes(value: &Value) -> Result<&[u8], String> {
    match value {
        Value::Str(s) => Ok(s.as_bytes()),
        Value::Bytes(b) => Ok(b),
        value => Err(format!("a {} is not bytes", value.kind())),
    }
}

/// The list lengths, the flattened children, and the validity of each list.
type SplitLists<'a> = (Vec<usize>, Vec<&'a Value>, Option<NullBuffer>);

fn split_lists<'a>(
    values: &[&'a Value],
    fixed_size: Option<usize>,
) -> Result<SplitLists<'a>, String> {
    let mut lengths = Vec::with_capacity(values.len());
    let mut children = Vec::new();
    let mut validity = Vec::with_capacity(values.len());

    for &value in values {
        match value {
            Value::Null => {
                let len = fixed_size.unwrap_or(0);
                lengths.push(len);
                children.extend(std::iter::repeat_n(&NULL, len));
                validity.push(false);
            }
            Value::List(items) => {
                if let Some(size) = fixed_size
                    && items.len() != size
                {
                    return Err(format!("expected lists of length {size}, got {}", items.len()));
                }
                lengths.push(items.len());
                children.extend(items.iter());
                validity.push(true);
            }
            value => return Err(format!("a {} is not a list", value.kind())),
        }
    }

    let nulls = validity.contains(&false).then(|| NullBuffer::from(validity));
    Ok((lengths, children, nulls))
}

/// Builds an array of type `datatype` out of `values`, recursing into nested lists.
fn build_array(values: &[&Value], datatype: &DataType) -> Result<ArrayRef, String> {
    macro_rules! primitive {
        ($arrow_type:ty, $convert:expr) => {{
            let array = values
                .iter()
                .map(|&value| match value {
                    Value::Null => Ok(None),
                    value => ($convert)(value).map(Some),
                })
                .collect::<Result<PrimitiveArray<$arrow_type>, String>>()?;
            Arc::new(array) as ArrayRef
        }};
    }

    macro_rules! collect {
        ($array_type:ty, $convert:expr) => {{
            let array = values
                .iter()
                .map(|&value| match value {
                    Value::Null => Ok(None),
                    value => ($convert)(value).map(Some),
                })
                .collect::<Result<$array_type, String>>()?;
            Arc::new(array) as ArrayRef
        }};
    }

    let array = match datatype {
        DataType::Null => {
            if let Some(value) = values.iter().find(|&&value| !matches!(value, Value::Null)) {
                return Err(format!("a {} is not null", value.kind()));
            }
            Arc::new(NullArray::new(values.len())) as ArrayRef
        }

        DataType::Boolean => collect!(BooleanArray, |value: &Value| match value {
            Value::Bool(b) => Ok(*b),
            value => Err(format!("a {} is not a bool", value.kind())),
        }),

        DataType::Int8 => primitive!(Int8Type, |v| narrow::<i8>(v, "i8")),
        DataType::Int16 => primitive!(Int16Type, |v| narrow::<i16>(v, "i16")),
        DataType::Int32 => primitive!(Int32Type, |v| narrow::<i32>(v, "i32")),
        DataType::Int64 => primitive!(Int64Type, to_i64),
        DataType::UInt8 => primitive!(UInt8Type, |v| narrow_unsigned::<u8>(v, "u8")),
        DataType::UInt16 => primitive!(UInt16Type, |v| narrow_unsigned::<u16>(v, "u16")),
        DataType::UInt32 => primitive!(UInt32Type, |v| narrow_unsigned::<u32>(v, "u32")),
        DataType::UInt64 => primitive!(UInt64Type, to_u64),
        DataType::Float16 => primitive!(Float16Type, |v| to_f64(v).map(half::f16::from_f64)),
        DataType::Float32 => primitive!(Float32Type, |v| to_f64(v).map(|f| f as f32)),
        DataType::Float64 => primitive!(Float64Type, to_f64),

        DataType::Utf8 => collect!(StringArray, to_str),
        DataType::LargeUtf8 => collect!(LargeStringArray, to_str),
        DataType::Binary => collect!(BinaryArray, to_bytes),
        DataType::LargeBinary => collect!(LargeBinaryArray, to_bytes),

        DataType::List(field) => {
            let (lengths, children, nulls) = split_lists(values, None)?;
            let lengths = lengths
                .into_iter()
                .map(i32::try_from)
                .collect::<Result<Vec<_>, _>>()
                .map_err(|err| err.to_string())?;
            let child = build_array(&children, field.data_type())?;
            let offsets = offsets_from_lengths(&lengths).map_err(|err| err.to_string())?;
            Arc::new(
                ListArray::try_new(field.clone(), offsets, child, nulls)
                    .map_err(|err| err.to_string())?,
            )
        }

        DataType::LargeList(field) => {
            let (lengths, children, nulls) = split_lists(values, None)?;
            let child = build_array(&children, field.data_type())?;
            Arc::new(
                LargeListArray::try_new(
                    field.clone(),
                    OffsetBuffer::from_lengths(lengths),
                    child,
                    nulls,
                )
                .map_err(|err| err.to_string())?,
            )
        }

        DataType::FixedSizeList(field, size) => {
            let fixed_size = usize::try_from(*size).map_err(|err| err.to_string())?;
            let (_, children, nulls) = split_lists(values, Some(fixed_size))?;
            let child = build_array(&children, field.data_type())?;
            Arc::new(
                FixedSizeListArray::try_new(field.clone(), *size, child, nulls)
                    .map_err(|err| err.to_string())?,
            )
        }

        datatype => return Err(format!("{datatype} cannot be built from native values")),
    };

    Ok(array)
}

#[cfg(test)]
mod tests {
    use arrow::array::{Float64Array, Int64Array, UInt8Array};
    use arrow::datatypes::{Field, UnionFields, UnionMode};

    use super::*;

    #[test]
    fn scalars_and_strings() {
        let array = coerce_to_array(&Value::from(42), None).unwrap();
        assert_eq!(array.data_type(), &DataType::Int64);
        assert_eq!(array.len(), 1);

        let array = coerce_to_array(&Value::from("hello"), None).unwrap();
        assert_eq!(array.data_type(), &DataType::Utf8);
        assert_eq!(array.len(), 1);

        let array = coerce_to_array(&Value::from(3), Some(&DataType::Float32)).unwrap();
        assert_eq!(array.data_type(), &DataType::Float32);

        let array = coerce_to_array(&Value::bytes(b"abc".to_vec()), None).unwrap();
        assert_eq!(array.data_type(), &DataType::Binary);
        assert_eq!(array.len(), 1);
    }

    #[test]
    fn lists_are_inferred() {
        let array = coerce_to_array(&Value::from(vec![1.2, 3.4]), None).unwrap();
        similar_asserts::assert_eq!(
            array.downcast_array_ref::<Float64Array>().unwrap(),
            &Float64Array::from(vec![1.2, 3.4])
        );

        // Ints promote to floats.
        let array = coerce_to_array(
            &Value::List(vec![Value::from(1), Value::from(2.5), Value::Null]),
            None,
        )
        .unwrap();
        assert_eq!(array.data_type(), &DataType::Float64);
        assert_eq!(array.null_count(), 1);

        let array = coerce_to_array(&Value::from(vec![vec![1, 2], vec![3]]), None).unwrap();
        assert_eq!(array.data_type(), &DataType::new_list(DataType::Int64, true));
        assert_eq!(array.len(), 2);

        let err = coerce_to_array(&Value::List(vec![Value::from(1), Value::from("a")]), None)
            .unwrap_err();
        assert!(matches!(err, CoercionError::CannotConvert { .. }), "{err}");
    }

    #[test]
    fn forced_types() {
        let array = coerce_to_array(&Value::from(vec![1.0, 2.0]), Some(&DataType::Int32)).unwrap();
        assert_eq!(array.data_type(), &DataType::Int32);

        let err = coerce_to_array(&Value::from(vec![1.5]), Some(&DataType::Int32)).unwrap_err();
        assert!(err.to_string().starts_with("cannot convert value to Int32"), "{err}");

        let err = coerce_to_array(&Value::from(vec![-1]), Some(&DataType::UInt8)).unwrap_err();
        assert!(err.to_string().contains("negative"), "{err}");

        let err = coerce_to_array(&Value::from("oops"), Some(&DataType::Float64)).unwrap_err();
        assert!(err.to_string().starts_with("cannot convert value to Float64"), "{err}");
    }

    #[test]
    fn empty_with_target() {
        let union = DataType::Union(
            UnionFields::new(
                [0, 1],
                [
                    Field::new("a", DataType::Int32, true),
                    Field::new(
                        "b",
                        DataType::Struct(vec![Field::new("c", DataType::Utf8, true)].into()),
                        true,
                    ),
                ],
            ),
            UnionMode::Dense,
        );
        let target = DataType::new_list(union, true);

        for value in [Value::Null, Value::List(vec![])] {
            let array = coerce_to_array(&value, Some(&target)).unwrap();
            assert_eq!(array.data_type(), &target);
            assert_eq!(array.len(), 0);
        }

        // Without a target, there's nothing to infer from.
        assert!(coerce_to_array(&Value::Null, None).is_err());
    }

    #[test]
    fn tensors() {
        let tensor = Tensor::new(vec![1_u8, 2, 3, 4, 5, 6], [2_usize, 3]);
        let array = coerce_to_array(&Value::from(tensor.clone()), None).unwrap();
        similar_asserts::assert_eq!(
            array.downcast_array_ref::<UInt8Array>().unwrap(),
            &UInt8Array::from(vec![1, 2, 3, 4, 5, 6])
        );

        let array = coerce_to_array(&Value::from(tensor.clone()), Some(&DataType::Int64)).unwrap();
        similar_asserts::assert_eq!(
            array.downcast_array_ref::<Int64Array>().unwrap(),
            &Int64Array::from(vec![1, 2, 3, 4, 5, 6])
        );

        // Nested targets go through the fallback, which follows the shape.
        let target =
            DataType::FixedSizeList(Arc::new(Field::new_list_field(DataType::UInt8, true)), 3);
        let array = coerce_to_array(&Value::from(tensor), Some(&target)).unwrap();
        assert_eq!(array.data_type(), &target);
        assert_eq!(array.len(), 2);

        let broken = Tensor {
            buffer: arrow::buffer::Buffer::from_vec(vec![1_u8, 2]),
            native_type: NativeType::UInt8,
            shape: vec![3],
        };
        assert!(coerce_to_array(&Value::from(broken), None).is_err());
    }

    #[test]
    fn arrow_passthrough() {
        let array: ArrayRef = Arc::new(Int64Array::from(vec![1, 2]));
        let same = coerce_to_array(&Value::from(array.clone()), None).unwrap();
        assert!(Arc::ptr_eq(&array, &same));

        let cast = coerce_to_array(&Value::from(array), Some(&DataType::Float64)).unwrap();
        assert_eq!(cast.data_type(), &DataType::Float64);
    }
}
