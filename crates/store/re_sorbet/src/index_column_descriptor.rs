use arrow::datatypes::{DataType as ArrowDatatype, Field as ArrowField};

use re_log_types::TimelineName;

use crate::{MetadataExt as _, keys};

/// Describes a time column, such as `frame_nr`, in a tabular batch.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct IndexColumnDescriptor {
    /// `rerun.index_name` if set, the column name otherwise.
    pub timeline: TimelineName,

    pub datatype: ArrowDatatype,
}

impl IndexColumnDescriptor {
    pub fn from_arrow_field(field: &ArrowField) -> Self {
        let timeline = field
            .get_opt(keys::INDEX_NAME)
            .map_or_else(|| TimelineName::new(field.name()), |name| TimelineName::new(&name));

        Self {
            timeline,
            datatype: field.data_type().clone(),
        }
    }
}
