use arrow::datatypes::{DataType as ArrowDatatype, Field as ArrowField};

use crate::{ColumnKind, ComponentColumnDescriptor, IndexColumnDescriptor, UnknownColumnKind};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ColumnError {
    #[error(transparent)]
    UnknownColumnKind(#[from] UnknownColumnKind),

    #[error("Data column {column:?} must be a list array, got {datatype}")]
    NotAList {
        column: String,
        datatype: ArrowDatatype,
    },
}

/// Describes a column of a tabular batch, decoded from its field metadata.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum ColumnDescriptor {
    Time(IndexColumnDescriptor),
    Component(ComponentColumnDescriptor),
}

impl ColumnDescriptor {
    /// Returns `None` for control columns, which carry no data to log.
    pub fn try_from_arrow_field(field: &ArrowField) -> Result<Option<Self>, ColumnError> {
        match ColumnKind::try_from(field)? {
            ColumnKind::Control => Ok(None),

            ColumnKind::Index => Ok(Some(Self::Time(IndexColumnDescriptor::from_arrow_field(
                field,
            )))),

            ColumnKind::Component => {
                if !matches!(field.data_type(), ArrowDatatype::List(_)) {
                    return Err(ColumnError::NotAList {
                        column: field.name().clone(),
                        datatype: field.data_type().clone(),
                    });
                }
                Ok(Some(Self::Component(
                    ComponentColumnDescriptor::from_arrow_field(field),
                )))
            }
        }
    }
}
