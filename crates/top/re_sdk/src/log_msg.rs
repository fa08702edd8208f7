//! What the SDK hands over to a [`crate::sink::LogSink`].

use arrow::array::{Array as _, ArrayRef, ListArray};
use indexmap::IndexMap;

use re_log_types::{EntityPath, TimeColumn, TimePoint, TimelineName};
use re_types_core::ComponentDescriptor;

/// A single write to the store.
#[derive(Clone, Debug)]
pub enum LogMsg {
    /// Row-oriented: one row of components at a single point in time.
    Row(RowWrite),

    /// Column-oriented: many rows at once, each with its own time.
    Columns(ColumnWrite),
}

impl LogMsg {
    #[inline]
    pub fn entity_path(&self) -> &EntityPath {
        match self {
            Self::Row(row) => &row.entity_path,
            Self::Columns(columns) => &columns.entity_path,
        }
    }

    #[inline]
    pub fn as_row(&self) -> Option<&RowWrite> {
        match self {
            Self::Row(row) => Some(row),
            Self::Columns(_) => None,
        }
    }

    #[inline]
    pub fn as_columns(&self) -> Option<&ColumnWrite> {
        match self {
            Self::Row(_) => None,
            Self::Columns(columns) => Some(columns),
        }
    }
}

impl From<RowWrite> for LogMsg {
    #[inline]
    fn from(row: RowWrite) -> Self {
        Self::Row(row)
    }
}

impl From<ColumnWrite> for LogMsg {
    #[inline]
    fn from(columns: ColumnWrite) -> Self {
        Self::Columns(columns)
    }
}

// ---

/// One row of data for a single entity.
///
/// Every array is either of length `num_instances`, or a splat of length 1.
#[derive(Clone, Debug)]
pub struct RowWrite {
    pub entity_path: EntityPath,

    /// Empty for static data.
    pub timepoint: TimePoint,

    pub is_static: bool,

    pub components: IndexMap<ComponentDescriptor, ArrayRef>,
}

impl RowWrite {
    /// The length of the longest array.
    pub fn num_instances(&self) -> usize {
        self.components.values().map(|array| array.len()).max().unwrap_or(0)
    }

    #[inline]
    pub fn get(&self, component: &str) -> Option<&ArrayRef> {
        self.components
            .iter()
            .find_map(|(descr, array)| (descr.component.as_str() == component).then_some(array))
    }
}

/// Many rows of data for a single entity.
///
/// All time columns and component columns have the same number of rows.
#[derive(Clone, Debug)]
pub struct ColumnWrite {
    pub entity_path: EntityPath,
    pub timelines: IndexMap<TimelineName, TimeColumn>,
    pub components: IndexMap<ComponentDescriptor, ListArray>,
}

impl ColumnWrite {
    pub fn num_rows(&self) -> usize {
        self.timelines
            .values()
            .map(TimeColumn::num_rows)
            .chain(self.components.values().map(|list| list.len()))
            .next()
            .unwrap_or(0)
    }

    #[inline]
    pub fn get(&self, component: &str) -> Option<&ListArray> {
        self.components
            .iter()
            .find_map(|(descr, list)| (descr.component.as_str() == component).then_some(list))
    }
}
