//! Loosely typed values, as handed to us by callers that don't have a schema.

use arrow::array::{Array as _, ArrayRef};
use arrow::buffer::Buffer;
use arrow::datatypes::{ArrowNativeType, DataType};

/// The element type of a native value, after inference.
///
/// This is what gets pinned in the [`crate::TypeRegistry`] next to the arrow datatype.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NativeType {
    Bool,
    Int8,
    Int16,
    Int32,
    Int64,
    UInt8,
    UInt16,
    UInt32,
    UInt64,
    Float16,
    Float32,
    Float64,
    Utf8,
    Binary,
}

impl NativeType {
    /// The arrow datatype of a flat array of this type.
    pub fn datatype(self) -> DataType {
        match self {
            Self::Bool => DataType::Boolean,
            Self::Int8 => DataType::Int8,
            Self::Int16 => DataType::Int16,
            Self::Int32 => DataType::Int32,
            Self::Int64 => DataType::Int64,
            Self::UInt8 => DataType::UInt8,
            Self::UInt16 => DataType::UInt16,
            Self::UInt32 => DataType::UInt32,
            Self::UInt64 => DataType::UInt64,
            Self::Float16 => DataType::Float16,
            Self::Float32 => DataType::Float32,
            Self::Float64 => DataType::Float64,
            Self::Utf8 => DataType::Utf8,
            Self::Binary => DataType::Binary,
        }
    }

    /// The innermost element type of an arrow datatype, looking through lists.
    ///
    /// `None` for datatypes that native values can't be coerced into, e.g. structs.
    pub fn of_datatype(datatype: &DataType) -> Option<Self> {
        Some(match datatype {
            DataType::Boolean => Self::Bool,
            DataType::Int8 => Self::Int8,
            DataType::Int16 => Self::Int16,
            DataType::Int32 => Self::Int32,
            DataType::Int64 => Self::Int64,
            DataType::UInt8 => Self::UInt8,
            DataType::UInt16 => Self::UInt16,
            DataType::UInt32 => Self::UInt32,
            DataType::UInt64 => Self::UInt64,
            DataType::Float16 => Self::Float16,
            DataType::Float32 => Self::Float32,
            DataType::Float64 => Self::Float64,
            DataType::Utf8 | DataType::LargeUtf8 => Self::Utf8,
            DataType::Binary | DataType::LargeBinary => Self::Binary,
            DataType::List(field)
            | DataType::LargeList(field)
            | DataType::FixedSizeList(field, _) => return Self::of_datatype(field.data_type()),
            _ => return None,
        })
    }

    /// Size in bytes of one element, for fixed-width types.
    pub fn byte_width(self) -> Option<usize> {
        match self {
            Self::Bool | Self::Utf8 | Self::Binary => None,
            Self::Int8 | Self::UInt8 => Some(1),
            Self::Int16 | Self::UInt16 | Self::Float16 => Some(2),
            Self::Int32 | Self::UInt32 | Self::Float32 => Some(4),
            Self::Int64 | Self::UInt64 | Self::Float64 => Some(8),
        }
    }
}

impl std::fmt::Display for NativeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.datatype())
    }
}

// ---

/// Element types that can back a [`Tensor`].
pub trait TensorElement: ArrowNativeType {
    const NATIVE_TYPE: NativeType;
}

macro_rules! impl_tensor_element {
    ($($ty:ty => $native:ident),* $(,)?) => {
        $(impl TensorElement for $ty {
            const NATIVE_TYPE: NativeType = NativeType::$native;
        })*
    };
}

impl_tensor_element! {
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => UInt8,
    u16 => UInt16,
    u32 => UInt32,
    u64 => UInt64,
    half::f16 => Float16,
    f32 => Float32,
    f64 => Float64,
}

/// A dense, row-major buffer of fixed-width elements.
///
/// This is the zero-copy path: the buffer is handed to arrow as-is, flattened.
#[derive(Clone, Debug, PartialEq)]
pub struct Tensor {
    pub buffer: Buffer,
    pub native_type: NativeType,
    pub shape: Vec<usize>,
}

impl Tensor {
    pub fn new<T: TensorElement>(values: Vec<T>, shape: impl Into<Vec<usize>>) -> Self {
        Self {
            buffer: Buffer::from_vec(values),
            native_type: T::NATIVE_TYPE,
            shape: shape.into(),
        }
    }

    /// A 1D tensor.
    pub fn from_vec<T: TensorElement>(values: Vec<T>) -> Self {
        let len = values.len();
        Self::new(values, [len])
    }

    /// Number of elements, according to the shape.
    pub fn num_elements(&self) -> usize {
        self.shape.iter().product()
    }
}

// ---

/// A loosely typed value, to be coerced into an arrow array.
///
/// Build these with `.into()`:
/// ```
/// # use re_sdk::Value;
/// let confidence: Value = vec![1.2, 3.4].into();
/// let label: Value = "hello".into();
/// let nested: Value = vec![vec![1, 2], vec![3]].into();
/// ```
#[derive(Clone, Debug)]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Str(String),
    Bytes(Vec<u8>),
    List(Vec<Self>),
    Tensor(Tensor),

    /// Already typed: used as-is.
    Arrow(ArrayRef),
}

impl Value {
    pub fn bytes(bytes: impl Into<Vec<u8>>) -> Self {
        Self::Bytes(bytes.into())
    }

    /// Is this `None`, or a sized value of length zero?
    ///
    /// Note that an empty string counts as empty.
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Null => true,
            Self::Bool(_) | Self::Int(_) | Self::UInt(_) | Self::Float(_) => false,
            Self::Str(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
            Self::List(values) => values.is_empty(),
            Self::Tensor(tensor) => tensor.num_elements() == 0,
            Self::Arrow(array) => array.is_empty(),
        }
    }

    /// A short description of what kind of value this is, for error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "unsigned int",
            Self::Float(_) => "float",
            Self::Str(_) => "string",
            Self::Bytes(_) => "bytes",
            Self::List(_) => "list",
            Self::Tensor(_) => "tensor",
            Self::Arrow(_) => "arrow array",
        }
    }
}

macro_rules! impl_from_scalar {
    ($variant:ident: $($ty:ty),*) => {
        $(impl From<$ty> for Value {
            #[inline]
            fn from(value: $ty) -> Self {
                Self::$variant(value.into())
            }
        })*
    };
}

impl_from_scalar!(Bool: bool);
impl_from_scalar!(Int: i8, i16, i32, i64);
impl_from_scalar!(UInt: u8, u16, u32, u64);
impl_from_scalar!(Float: f32, f64);
impl_from_scalar!(Str: &str, String);

impl From<half::f16> for Value {
    #[inline]
    fn from(value: half::f16) -> Self {
        Self::Float(value.to_f64())
    }
}

impl From<Tensor> for Value {
    #[inline]
    fn from(tensor: Tensor) -> Self {
        Self::Tensor(tensor)
    }
}

impl From<ArrayRef> for Value {
    #[inline]
    fn from(array: ArrayRef) -> Self {
        Self::Arrow(array)
    }
}

impl<T: Into<Self>> From<Option<T>> for Value {
    #[inline]
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

impl<T: Into<Self>> From<Vec<T>> for Value {
    #[inline]
    fn from(values: Vec<T>) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}

impl<T: Into<Self> + Clone> From<&[T]> for Value {
    #[inline]
    fn from(values: &[T]) -> Self {
        Self::List(values.iter().cloned().map(Into::into).collect())
    }
}

impl<T: Into<Self>, const N: usize> From<[T; N]> for Value {
    #[inline]
    fn from(values: [T; N]) -> Self {
        Self::List(values.into_iter().map(Into::into).collect())
    }
}
