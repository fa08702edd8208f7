use arrow::datatypes::Field as ArrowField;

use crate::{MetadataExt as _, keys};

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
#[error("Unknown `{}`: {kind:?}", keys::KIND)]
pub struct UnknownColumnKind {
    pub kind: String,
}

/// The type of column in a tabular batch.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ColumnKind {
    /// Bookkeeping, ignored when logging.
    Control,

    /// A timeline.
    Index,

    /// Component data.
    Component,
}

impl std::fmt::Display for ColumnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Control => write!(f, "control"),
            Self::Index => write!(f, "index"),
            Self::Component => write!(f, "data"),
        }
    }
}

impl TryFrom<&str> for ColumnKind {
    type Error = UnknownColumnKind;

    fn try_from(kind: &str) -> Result<Self, Self::Error> {
        match kind {
            "control" | "row_id" => Ok(Self::Control),
            "index" | "time" => Ok(Self::Index),
            "component" | "data" => Ok(Self::Component),
            _ => Err(UnknownColumnKind {
                kind: kind.to_owned(),
            }),
        }
    }
}

impl TryFrom<&ArrowField> for ColumnKind {
    type Error = UnknownColumnKind;

    /// Columns without a `rerun.kind` are data columns.
    fn try_from(field: &ArrowField) -> Result<Self, Self::Error> {
        match field.get_opt(keys::KIND) {
            Some(kind) => Self::try_from(kind.as_ref()),
            None => Ok(Self::Component),
        }
    }
}

#[cfg(test)]
mod tests {
    use arrow::datatypes::DataType;

    use super::*;

    fn field(kind: Option<&str>) -> ArrowField {
        let field = ArrowField::new("col", DataType::Int64, true);
        match kind {
            Some(kind) => field.with_metadata(
                [(keys::KIND.to_owned(), kind.to_owned())]
                    .into_iter()
                    .collect(),
            ),
            None => field,
        }
    }

    #[test]
    fn kinds() {
        assert_eq!(ColumnKind::try_from(&field(Some("index"))), Ok(ColumnKind::Index));
        assert_eq!(ColumnKind::try_from(&field(Some("time"))), Ok(ColumnKind::Index));
        assert_eq!(ColumnKind::try_from(&field(Some("data"))), Ok(ColumnKind::Component));
        assert_eq!(ColumnKind::try_from(&field(Some("row_id"))), Ok(ColumnKind::Control));
        assert_eq!(ColumnKind::try_from(&field(None)), Ok(ColumnKind::Component));
        assert!(ColumnKind::try_from(&field(Some("nope"))).is_err());
    }
}
