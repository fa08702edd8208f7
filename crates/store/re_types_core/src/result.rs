use std::sync::Arc;

/// Errors that can occur when serializing component data.
#[derive(thiserror::Error, Debug, Clone)]
pub enum SerializationError {
    #[error("Failed to serialize {location:?}")]
    Context {
        location: String,
        source: Box<Self>,
    },

    #[error("{fqname} doesn't support serialization: {reason}")]
    NotImplemented { fqname: String, reason: String },

    /// E.g. too many values (overflows i32).
    #[error(transparent)]
    ArrowError(#[from] Arc<arrow::error::ArrowError>),

    /// Loosely typed data that couldn't be converted to arrow.
    #[error("{0}")]
    Conversion(Arc<dyn std::error::Error + Send + Sync + 'static>),
}

impl From<arrow::error::ArrowError> for SerializationError {
    #[inline]
    fn from(err: arrow::error::ArrowError) -> Self {
        Self::ArrowError(Arc::new(err))
    }
}

impl SerializationError {
    #[inline]
    pub fn not_implemented(fqname: impl AsRef<str>, reason: impl AsRef<str>) -> Self {
        Self::NotImplemented {
            fqname: fqname.as_ref().to_owned(),
            reason: reason.as_ref().to_owned(),
        }
    }

    #[inline]
    pub fn conversion(err: impl std::error::Error + Send + Sync + 'static) -> Self {
        Self::Conversion(Arc::new(err))
    }

    /// Wraps the error with the location (e.g. the component) it happened at.
    #[inline]
    pub fn with_context(self, location: impl std::fmt::Display) -> Self {
        Self::Context {
            location: location.to_string(),
            source: Box::new(self),
        }
    }
}

pub type SerializationResult<T> = ::std::result::Result<T, SerializationError>;
