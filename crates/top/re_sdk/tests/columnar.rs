use std::collections::HashMap;
use std::sync::Arc;

use arrow::array::{Array, ArrayRef, BinaryArray, Float64Array, Int64Array, RecordBatch};
use arrow::datatypes::{DataType, Field, Schema};

use re_sdk::external::re_sorbet::keys;
use re_sdk::sink::MemorySinkStorage;
use re_sdk::{
    ColumnInput, ColumnWrite, ComponentDescriptor, EntityPath, RecordingStream,
    RecordingStreamBuilder, SerializedComponentBatch, TimeColumn, TimelineName, TypeRegistry,
};

fn memory(strict: bool) -> anyhow::Result<(RecordingStream, MemorySinkStorage)> {
    Ok(RecordingStreamBuilder::new("rerun_example_columnar")
        .enabled(true)
        .strict_mode(strict)
        .type_registry(Arc::new(TypeRegistry::new()))
        .memory()?)
}

fn columns(storage: &MemorySinkStorage) -> Vec<ColumnWrite> {
    storage
        .take()
        .into_iter()
        .filter_map(|msg| msg.as_columns().cloned())
        .collect()
}

fn scalars(values: Vec<f64>) -> SerializedComponentBatch {
    SerializedComponentBatch::new(
        Arc::new(Float64Array::from(values)),
        ComponentDescriptor::partial("scalars"),
    )
}

#[test]
fn time_columns_must_agree() -> anyhow::Result<()> {
    let (rec, storage) = memory(true)?;

    let err = rec
        .send_columns(
            "plot",
            [
                TimeColumn::new_sequence("step", [0, 1, 2]),
                TimeColumn::new_sequence("frame", [0, 1, 2, 3]),
            ],
            [ColumnInput::from(scalars(vec![1.0, 2.0, 3.0]))],
            None,
        )
        .err()
        .map(|err| err.to_string())
        .unwrap_or_default();
    assert!(err.contains("timeline 'frame' has length 4"), "{err}");
    assert!(err.contains("timeline 'step' has length 3"), "{err}");
    assert!(storage.is_empty());

    rec.send_columns(
        "plot",
        [
            TimeColumn::new_sequence("step", [0, 1, 2]),
            TimeColumn::new_duration_secs("elapsed", [0.0, 0.5, 1.0]),
        ],
        [ColumnInput::from(scalars(vec![1.0, 2.0, 3.0]))],
        None,
    )?;

    let columns = columns(&storage);
    assert_eq!(columns.len(), 1);
    similar_asserts::assert_eq!(
        columns[0].timelines.keys().cloned().collect::<Vec<_>>(),
        vec![TimelineName::new("step"), TimelineName::new("elapsed")]
    );

    Ok(())
}

#[test]
fn component_columns_must_agree() -> anyhow::Result<()> {
    let (rec, _storage) = memory(true)?;

    let err = rec
        .send_columns(
            "plot",
            [TimeColumn::new_sequence("step", [0, 1, 2])],
            [ColumnInput::from(scalars(vec![1.0, 2.0]))],
            None,
        )
        .err()
        .map(|err| err.to_string())
        .unwrap_or_default();
    assert!(err.contains("component 'scalars' has length 2"), "{err}");

    Ok(())
}

#[test]
fn unit_partition_round_trip() -> anyhow::Result<()> {
    let (rec, storage) = memory(true)?;

    let original = scalars(vec![0.5, 1.5, 2.5, 3.5]);
    rec.send_columns(
        "plot",
        [TimeColumn::new_sequence("step", [0, 1, 2, 3])],
        [ColumnInput::from(original.clone())],
        None,
    )?;

    let columns = columns(&storage);
    let list = columns[0].get("scalars").expect("scalars were sent");
    assert_eq!(list.len(), 4);

    // Concatenating the rows gives back the original data.
    let rows: Vec<ArrayRef> = (0..list.len()).map(|i| list.value(i)).collect();
    let rows: Vec<&dyn Array> = rows.iter().map(|row| row.as_ref()).collect();
    let concatenated = re_sdk::external::re_arrow_util::concat_arrays(&rows)?;
    let values = concatenated
        .as_any()
        .downcast_ref::<Float64Array>()
        .map(|array| array.values().to_vec());
    assert_eq!(values, Some(vec![0.5, 1.5, 2.5, 3.5]));

    Ok(())
}

fn data_field(name: &str, metadata: &[(&str, &str)]) -> Field {
    Field::new(name, DataType::new_list(DataType::Float64, true), true).with_metadata(
        metadata
            .iter()
            .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
            .collect::<HashMap<_, _>>(),
    )
}

fn list_column(values: Vec<f64>) -> anyhow::Result<ArrayRef> {
    let lengths = vec![1; values.len()];
    Ok(Arc::new(re_sdk::external::re_arrow_util::wrap_in_list_array(
        Arc::new(Float64Array::from(values)),
        &lengths,
        None,
    )?))
}

#[test]
fn record_batches_are_regrouped_per_entity() -> anyhow::Result<()> {
    let (rec, storage) = memory(true)?;

    let schema = Schema::new(vec![
        Field::new("row_id", DataType::Binary, false)
            .with_metadata([(keys::KIND.to_owned(), "control".to_owned())].into()),
        Field::new("frame", DataType::Int64, false)
            .with_metadata([(keys::KIND.to_owned(), "index".to_owned())].into()),
        data_field(
            "arm:angle",
            &[
                (keys::KIND, "data"),
                (keys::ARCHETYPE, "rerun.archetypes.Scalars"),
                (keys::COMPONENT, "Scalars:scalars"),
                (keys::COMPONENT_TYPE, "rerun.components.Scalar"),
            ],
        ),
        data_field("gripper:force", &[]),
        data_field(
            "whatever",
            &[
                (keys::ENTITY_PATH, "/arm"),
                (keys::COMPONENT, "speed"),
            ],
        ),
    ]);

    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(BinaryArray::from(vec![b"a".as_slice(), b"b", b"c"])),
            Arc::new(Int64Array::from(vec![10, 11, 12])),
            list_column(vec![0.1, 0.2, 0.3])?,
            list_column(vec![5.0, 6.0, 7.0])?,
            list_column(vec![1.0, 1.0, 1.0])?,
        ],
    )?;

    rec.send_record_batch(&batch, None)?;

    let columns = columns(&storage);
    similar_asserts::assert_eq!(
        columns.iter().map(|c| c.entity_path.clone()).collect::<Vec<_>>(),
        vec![EntityPath::from("arm"), EntityPath::from("gripper")]
    );

    let arm = &columns[0];
    similar_asserts::assert_eq!(
        arm.components
            .keys()
            .map(|descr| descr.component.as_str())
            .collect::<Vec<_>>(),
        vec!["Scalars:scalars", "speed", "rerun.archetypes.ScalarsIndicator"]
    );
    assert_eq!(arm.num_rows(), 3);
    assert_eq!(
        arm.timelines.keys().cloned().collect::<Vec<_>>(),
        vec![TimelineName::new("frame")]
    );

    let gripper = &columns[1];
    let (descr, _) = gripper
        .components
        .first()
        .expect("gripper has one component");
    assert_eq!(descr.component.as_str(), "gripper:force");
    assert_eq!(
        descr.component_type.as_ref().map(|ty| ty.as_str()),
        Some(re_sdk::external::re_sorbet::UNKNOWN_COMPONENT_TYPE)
    );

    Ok(())
}

#[test]
fn record_batches_need_list_columns() -> anyhow::Result<()> {
    let (rec, storage) = memory(false)?;

    let schema = Schema::new(vec![
        Field::new("frame", DataType::Int64, false)
            .with_metadata([(keys::KIND.to_owned(), "index".to_owned())].into()),
        Field::new("flat", DataType::Float64, false),
        data_field("points:radii", &[]),
    ]);
    let batch = RecordBatch::try_new(
        Arc::new(schema),
        vec![
            Arc::new(Int64Array::from(vec![0, 1])),
            Arc::new(Float64Array::from(vec![1.0, 2.0])),
            list_column(vec![0.5, 0.7])?,
        ],
    )?;

    // Lenient: the flat column is dropped with a warning, the rest goes through.
    rec.send_record_batch(&batch, None)?;
    let columns = columns(&storage);
    assert_eq!(columns.len(), 1);
    assert!(columns[0].get("points:radii").is_some());

    assert!(rec.send_record_batch(&batch, Some(true)).is_err());

    Ok(())
}
