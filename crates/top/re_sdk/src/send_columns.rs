//! Column-oriented logging: many rows at once, with explicit time columns.

use arrow::array::{Array as _, AsArray as _, RecordBatch};
use arrow::datatypes::DataType;
use arrow::error::ArrowError;
use indexmap::{IndexMap, IndexSet};

use re_log_types::{EntityPath, TimeColumn, TimeColumnError, TimelineName};
use re_sorbet::{ColumnDescriptor, ColumnError};
use re_types_core::{
    ArchetypeName, ComponentDescriptor, PartitionError, SerializedComponentBatch,
    SerializedComponentColumn,
};

use crate::{ColumnWrite, LogMsg, RecordingStream, RecordingStreamResult};

/// A component input of [`RecordingStream::send_columns`].
#[derive(Debug, Clone)]
pub enum ColumnInput {
    /// A flat batch: one instance per row.
    Batch(SerializedComponentBatch),

    /// An already partitioned column.
    Column(SerializedComponentColumn),

    /// The indicator of an archetype, as many rows as there are in the submission.
    Indicator(ArchetypeName),
}

impl From<SerializedComponentBatch> for ColumnInput {
    #[inline]
    fn from(batch: SerializedComponentBatch) -> Self {
        Self::Batch(batch)
    }
}

impl From<SerializedComponentColumn> for ColumnInput {
    #[inline]
    fn from(column: SerializedComponentColumn) -> Self {
        Self::Column(column)
    }
}

impl From<ArchetypeName> for ColumnInput {
    #[inline]
    fn from(archetype: ArchetypeName) -> Self {
        Self::Indicator(archetype)
    }
}

/// Names a column of a submission in error messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnName {
    Timeline(TimelineName),
    Component(ComponentDescriptor),
}

impl std::fmt::Display for ColumnName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Timeline(timeline) => write!(f, "timeline '{timeline}'"),
            Self::Component(descr) => write!(f, "component '{}'", descr.component),
        }
    }
}

#[derive(thiserror::Error, Debug, Clone)]
pub enum SendColumnsError {
    #[error("{column} has length {len}, but {expected_from} has length {expected}")]
    LengthMismatch {
        column: ColumnName,
        len: usize,
        expected_from: ColumnName,
        expected: usize,
    },

    #[error(transparent)]
    Partition(#[from] PartitionError),

    #[error(transparent)]
    Column(#[from] ColumnError),

    #[error(transparent)]
    TimeColumn(#[from] TimeColumnError),
}

/// The number of rows of a submission, as set by its first column.
#[derive(Default)]
struct ExpectedLength(Option<(ColumnName, usize)>);

impl ExpectedLength {
    fn check(&mut self, column: ColumnName, len: usize) -> Result<(), SendColumnsError> {
        match &self.0 {
            None => {
                self.0 = Some((column, len));
                Ok(())
            }
            Some((_, expected)) if *expected == len => Ok(()),
            Some((expected_from, expected)) => Err(SendColumnsError::LengthMismatch {
                column,
                len,
                expected_from: expected_from.clone(),
                expected: *expected,
            }),
        }
    }

    fn get(&self) -> usize {
        self.0.as_ref().map_or(0, |(_, len)| *len)
    }
}

impl RecordingStream {
    /// Lower-level logging API to provide data spanning multiple timepoints.
    ///
    /// Unlike the regular `log` API, which is row-oriented, this API lets you submit the data
    /// in a columnar form. The lengths of all of the [`TimeColumn`]s and the number of rows of
    /// all the component columns must match.
    /// Flat batches are partitioned into one instance per row.
    ///
    /// Only the given timelines are set: there is no implicit `log_time` or `log_tick`.
    ///
    /// Any failing column is either returned as an error or dropped with a warning, depending
    /// on the [`crate::ErrorPolicy`].
    pub fn send_columns(
        &self,
        ent_path: impl Into<EntityPath>,
        indexes: impl IntoIterator<Item = TimeColumn>,
        columns: impl IntoIterator<Item = impl Into<ColumnInput>>,
        strict: Option<bool>,
    ) -> RecordingStreamResult<()> {
        if !self.is_enabled() {
            return Ok(()); // silently drop the message
        }

        let entity_path = ent_path.into();
        let policy = self.error_policy(strict);

        let mut expected = ExpectedLength::default();

        let mut timelines: IndexMap<TimelineName, TimeColumn> = IndexMap::new();
        for time_column in indexes {
            let timeline = time_column.name().clone();
            if timelines.contains_key(&timeline) {
                self.send_duplicate_warning(&ColumnName::Timeline(timeline), &entity_path);
                continue;
            }
            match expected.check(ColumnName::Timeline(timeline.clone()), time_column.num_rows()) {
                Ok(()) => {
                    timelines.insert(timeline, time_column);
                }
                Err(err) => self.handle_error(policy, err)?,
            }
        }

        let mut components = IndexMap::new();
        let mut indicators = Vec::new();
        for column in columns {
            let column = match column.into() {
                ColumnInput::Indicator(archetype) => {
                    indicators.push(archetype);
                    continue;
                }
                ColumnInput::Batch(batch) => batch.into_storage().partition(None),
                ColumnInput::Column(column) => Ok(column),
            };

            let list_array = column.and_then(|column| {
                let list_array = column.to_list_array()?;
                Ok((column.descriptor().clone(), list_array))
            });
            let (descriptor, list_array) = match list_array {
                Ok(list_array) => list_array,
                Err(err) => {
                    self.handle_error(policy, SendColumnsError::from(err))?;
                    continue;
                }
            };

            if components.contains_key(&descriptor) {
                self.send_duplicate_warning(&ColumnName::Component(descriptor), &entity_path);
                continue;
            }
            match expected.check(ColumnName::Component(descriptor.clone()), list_array.len()) {
                Ok(()) => {
                    components.insert(descriptor, list_array);
                }
                Err(err) => self.handle_error(policy, err)?,
            }
        }

        let num_rows = expected.get();
        for archetype in indicators {
            let descriptor = ComponentDescriptor::indicator(archetype);
            if components.contains_key(&descriptor) {
                self.send_duplicate_warning(&ColumnName::Component(descriptor), &entity_path);
                continue;
            }
            components.insert(
                descriptor,
                re_arrow_util::new_null_list_array(&DataType::Null, num_rows),
            );
        }

        if components.is_empty() {
            re_log::debug!(
                "send_columns() to {entity_path} without any component, nothing to send"
            );
            return Ok(());
        }

        self.record_msg(LogMsg::Columns(ColumnWrite {
            entity_path,
            timelines,
            components,
        }));

        Ok(())
    }

    /// Log a tabular batch whose columns carry Rerun metadata.
    ///
    /// Index columns become timelines, data columns are regrouped per entity, and control
    /// columns are ignored. Each entity is then sent with [`Self::send_columns`], together
    /// with every index column and the indicators of the archetypes seen for that entity.
    pub fn send_record_batch(
        &self,
        batch: &RecordBatch,
        strict: Option<bool>,
    ) -> RecordingStreamResult<()> {
        if !self.is_enabled() {
            return Ok(()); // silently drop the message
        }

        let policy = self.error_policy(strict);

        #[derive(Default)]
        struct EntityColumns {
            columns: Vec<ColumnInput>,
            archetypes: IndexSet<ArchetypeName>,
        }

        let mut indexes = Vec::new();
        let mut entities: IndexMap<EntityPath, EntityColumns> = IndexMap::new();

        let schema = batch.schema();
        for (field, array) in schema.fields().iter().zip(batch.columns()) {
            let descriptor = match ColumnDescriptor::try_from_arrow_field(field) {
                Ok(Some(descriptor)) => descriptor,
                Ok(None) => continue,
                Err(err) => {
                    self.handle_error(policy, SendColumnsError::from(err))?;
                    continue;
                }
            };

            match descriptor {
                ColumnDescriptor::Time(index) => {
                    match TimeColumn::read_array(index.timeline, array.as_ref()) {
                        Ok(time_column) => indexes.push(time_column),
                        Err(err) => self.handle_error(policy, SendColumnsError::from(err))?,
                    }
                }

                ColumnDescriptor::Component(component) => {
                    let entity = entities.entry(component.entity_path.clone()).or_default();
                    if let Some(archetype) = &component.descriptor.archetype {
                        entity.archetypes.insert(archetype.clone());
                    }

                    // Indicators are recreated from the archetypes.
                    if component.is_indicator || component.descriptor.is_indicator_component() {
                        continue;
                    }

                    let Some(list_array) = array.as_list_opt::<i32>() else {
                        let err = ColumnError::NotAList {
                            column: field.name().clone(),
                            datatype: array.data_type().clone(),
                        };
                        self.handle_error(policy, SendColumnsError::from(err))?;
                        continue;
                    };

                    match SerializedComponentColumn::from_list_array(
                        list_array,
                        component.descriptor,
                    ) {
                        Ok(column) => entity.columns.push(column.into()),
                        Err(err) => self.handle_error(policy, SendColumnsError::from(err))?,
                    }
                }
            }
        }

        for (entity_path, entity) in entities {
            let EntityColumns {
                mut columns,
                archetypes,
            } = entity;
            columns.extend(archetypes.into_iter().map(ColumnInput::Indicator));

            self.send_columns(entity_path, indexes.iter().cloned(), columns, strict)?;
        }

        Ok(())
    }

    /// The first column of a given name wins, the same way it does for rows.
    fn send_duplicate_warning(&self, column: &ColumnName, entity_path: &EntityPath) {
        self.send_warning(&format!(
            "The {column} was included multiple times when sending columns to {entity_path}. \
            Only the first one is kept."
        ));
    }

    /// Calls [`Self::send_record_batch`] for every batch, e.g. of an
    /// [`arrow::record_batch::RecordBatchReader`].
    pub fn send_dataframe(
        &self,
        batches: impl IntoIterator<Item = Result<RecordBatch, ArrowError>>,
        strict: Option<bool>,
    ) -> RecordingStreamResult<()> {
        for batch in batches {
            self.send_record_batch(&batch?, strict)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::{Float64Array, ListArray};

    use super::*;
    use crate::{RecordingStreamBuilder, TypeRegistry, sink::MemorySinkStorage};

    fn memory(strict: bool) -> (RecordingStream, MemorySinkStorage) {
        RecordingStreamBuilder::new("rerun_example_send_columns")
            .enabled(true)
            .strict_mode(strict)
            .type_registry(Arc::new(TypeRegistry::new()))
            .memory()
            .unwrap()
    }

    fn scalars(values: Vec<f64>) -> SerializedComponentBatch {
        SerializedComponentBatch::new(
            Arc::new(Float64Array::from(values)),
            ComponentDescriptor::partial("scalars"),
        )
    }

    #[test]
    fn flat_batches_are_unit_partitioned() {
        let (rec, storage) = memory(true);

        rec.send_columns(
            "plot",
            [TimeColumn::new_sequence("step", [0, 1, 2])],
            [ColumnInput::from(scalars(vec![1.0, 2.0, 3.0]))],
            None,
        )
        .unwrap();

        let msgs = storage.take();
        assert_eq!(msgs.len(), 1);
        let columns = msgs[0].as_columns().unwrap();
        assert_eq!(columns.num_rows(), 3);
        assert_eq!(
            columns.timelines.keys().collect::<Vec<_>>(),
            vec![&TimelineName::new("step")]
        );

        let list: &ListArray = columns.get("scalars").unwrap();
        assert_eq!(re_arrow_util::list_array_lengths(list), vec![1, 1, 1]);
    }

    #[test]
    fn partitioned_columns_and_indicators() {
        let (rec, storage) = memory(true);

        let column = scalars(vec![1.0, 2.0, 3.0])
            .partition(Some(vec![2, 0, 1]))
            .unwrap();
        rec.send_columns(
            "plot",
            [TimeColumn::new_sequence("step", [0, 1, 2])],
            [
                ColumnInput::from(column),
                ColumnInput::from(ArchetypeName::new("rerun.archetypes.Scalars")),
            ],
            None,
        )
        .unwrap();

        let msgs = storage.take();
        let columns = msgs[0].as_columns().unwrap();
        let list = columns.get("scalars").unwrap();
        assert_eq!(re_arrow_util::list_array_lengths(list), vec![2, 0, 1]);

        let indicator = columns.get("rerun.archetypes.ScalarsIndicator").unwrap();
        assert_eq!(indicator.len(), 3);
        assert_eq!(indicator.null_count(), 3);
    }

    #[test]
    fn indicator_without_length() {
        let (rec, storage) = memory(true);
        rec.send_columns(
            "plot",
            std::iter::empty(),
            [ColumnInput::from(ArchetypeName::new("rerun.archetypes.Scalars"))],
            None,
        )
        .unwrap();

        let msgs = storage.take();
        let columns = msgs[0].as_columns().unwrap();
        assert_eq!(columns.num_rows(), 0);
    }

    #[test]
    fn nothing_to_send() {
        let (rec, storage) = memory(true);
        rec.send_columns(
            "plot",
            [TimeColumn::new_sequence("step", [0, 1, 2])],
            Vec::<ColumnInput>::new(),
            None,
        )
        .unwrap();
        assert!(storage.is_empty());
    }

    #[test]
    fn lenient_drops_bad_columns() {
        let (rec, storage) = memory(false);

        rec.send_columns(
            "plot",
            [
                TimeColumn::new_sequence("step", [0, 1, 2]),
                TimeColumn::new_sequence("frame", [0, 1, 2, 3]),
            ],
            [ColumnInput::from(scalars(vec![1.0, 2.0, 3.0]))],
            None,
        )
        .unwrap();

        let msgs = storage.take();
        assert_eq!(msgs.len(), 2);
        assert!(msgs[0].as_row().is_some(), "the warning comes first");

        let columns = msgs[1].as_columns().unwrap();
        assert_eq!(
            columns.timelines.keys().collect::<Vec<_>>(),
            vec![&TimelineName::new("step")]
        );
        assert!(columns.get("scalars").is_some());
    }

    #[test]
    fn first_column_wins() {
        let (rec, storage) = memory(true);

        rec.send_columns(
            "plot",
            [
                TimeColumn::new_sequence("step", [0, 1, 2]),
                TimeColumn::new_sequence("step", [5, 6]),
            ],
            [
                ColumnInput::from(scalars(vec![1.0, 2.0, 3.0])),
                ColumnInput::from(scalars(vec![7.0, 8.0, 9.0])),
                ColumnInput::from(ArchetypeName::new("rerun.archetypes.Scalars")),
                ColumnInput::from(ArchetypeName::new("rerun.archetypes.Scalars")),
            ],
            None,
        )
        .unwrap();

        let msgs = storage.take();
        let warnings = msgs.iter().filter(|msg| msg.as_row().is_some()).count();
        assert_eq!(warnings, 3, "duplicates are warnings, even in strict mode");

        let columns = msgs.iter().find_map(|msg| msg.as_columns()).unwrap();
        assert_eq!(columns.num_rows(), 3);
        assert_eq!(columns.components.len(), 2);

        let values = columns.get("scalars").unwrap().values().clone();
        assert_eq!(
            values.as_any().downcast_ref::<Float64Array>(),
            Some(&Float64Array::from(vec![1.0, 2.0, 3.0]))
        );
    }
}
