use std::collections::BTreeMap;
use std::sync::Arc;

use arrow::array::{
    ArrayRef, DurationMicrosecondArray, DurationMillisecondArray, DurationNanosecondArray,
    DurationSecondArray, Int32Array, Int64Array, TimestampMicrosecondArray,
    TimestampMillisecondArray, TimestampNanosecondArray, TimestampSecondArray, UInt32Array,
    UInt64Array,
};
use arrow::buffer::ScalarBuffer;
use arrow::datatypes::{DataType, TimeUnit};
use itertools::Itertools as _;

// ---

/// The name of a timeline. Often something like `"log_time"` or `"frame_nr"`.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimelineName(Arc<str>);

impl TimelineName {
    #[inline]
    pub fn new(name: &str) -> Self {
        Self(name.into())
    }

    /// The name of the timeline the SDK fills in with the wall-clock time of each log call.
    #[inline]
    pub fn log_time() -> Self {
        Self::new("log_time")
    }

    /// The name of the timeline the SDK fills in with a counter of log calls.
    #[inline]
    pub fn log_tick() -> Self {
        Self::new("log_tick")
    }

    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl From<&str> for TimelineName {
    #[inline]
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

impl From<String> for TimelineName {
    #[inline]
    fn from(name: String) -> Self {
        Self(name.into())
    }
}

impl std::fmt::Display for TimelineName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

// ---

/// The type of a [`Timeline`].
#[derive(Clone, Copy, Debug, Hash, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub enum TimeType {
    /// Used e.g. for frames in a film.
    Sequence,

    /// Duration measured in nanoseconds.
    DurationNs,

    /// Nanoseconds since unix epoch (1970-01-01 00:00:00 UTC).
    TimestampNs,
}

impl std::fmt::Display for TimeType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Sequence => f.write_str("sequence"),
            Self::DurationNs => f.write_str("duration"),
            Self::TimestampNs => f.write_str("timestamp"),
        }
    }
}

impl TimeType {
    /// The arrow datatype used to store time values of this type.
    pub fn datatype(self) -> DataType {
        match self {
            Self::Sequence => DataType::Int64,
            Self::DurationNs => DataType::Duration(TimeUnit::Nanosecond),
            Self::TimestampNs => DataType::Timestamp(TimeUnit::Nanosecond, None),
        }
    }

    /// Wraps raw time values in an arrow array of the matching datatype.
    pub fn make_arrow_array(self, times: ScalarBuffer<i64>) -> ArrayRef {
        match self {
            Self::Sequence => Arc::new(Int64Array::new(times, None)),
            Self::DurationNs => Arc::new(DurationNanosecondArray::new(times, None)),
            Self::TimestampNs => Arc::new(TimestampNanosecondArray::new(times, None)),
        }
    }
}

// ---

/// A time frame/space, e.g. `log_time` or `frame_nr`, coupled with the type of time it keeps.
#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct Timeline {
    name: TimelineName,
    typ: TimeType,
}

impl Timeline {
    #[inline]
    pub fn new(name: impl Into<TimelineName>, typ: TimeType) -> Self {
        Self {
            name: name.into(),
            typ,
        }
    }

    #[inline]
    pub fn new_sequence(name: impl Into<TimelineName>) -> Self {
        Self::new(name, TimeType::Sequence)
    }

    #[inline]
    pub fn new_duration(name: impl Into<TimelineName>) -> Self {
        Self::new(name, TimeType::DurationNs)
    }

    #[inline]
    pub fn new_timestamp(name: impl Into<TimelineName>) -> Self {
        Self::new(name, TimeType::TimestampNs)
    }

    /// The implicit wall-clock timeline of row-oriented logging.
    #[inline]
    pub fn log_time() -> Self {
        Self::new(TimelineName::log_time(), TimeType::TimestampNs)
    }

    /// The implicit log-call counter of row-oriented logging.
    #[inline]
    pub fn log_tick() -> Self {
        Self::new(TimelineName::log_tick(), TimeType::Sequence)
    }

    #[inline]
    pub fn name(&self) -> &TimelineName {
        &self.name
    }

    #[inline]
    pub fn typ(&self) -> TimeType {
        self.typ
    }
}

// ---

/// A single time value on some timeline, together with the type of that timeline.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimeCell {
    pub typ: TimeType,
    pub value: i64,
}

impl TimeCell {
    #[inline]
    pub fn new(typ: TimeType, value: i64) -> Self {
        Self { typ, value }
    }

    #[inline]
    pub fn from_sequence(value: i64) -> Self {
        Self::new(TimeType::Sequence, value)
    }

    #[inline]
    pub fn from_duration_nanos(nanos: i64) -> Self {
        Self::new(TimeType::DurationNs, nanos)
    }

    #[inline]
    pub fn from_timestamp_nanos_since_epoch(nanos: i64) -> Self {
        Self::new(TimeType::TimestampNs, nanos)
    }

    #[inline]
    pub fn from_duration_secs(seconds: f64) -> Self {
        Self::from_duration_nanos(secs_to_nanos(seconds))
    }

    #[inline]
    pub fn from_timestamp_secs_since_epoch(seconds: f64) -> Self {
        Self::from_timestamp_nanos_since_epoch(secs_to_nanos(seconds))
    }

    /// The current wall-clock time.
    pub fn timestamp_now() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .map_or(0, |since_epoch| {
                i64::try_from(since_epoch.as_nanos()).unwrap_or(i64::MAX)
            });
        Self::from_timestamp_nanos_since_epoch(nanos)
    }
}

/// A point in time on any number of timelines.
///
/// Static data has an empty [`TimePoint`].
#[derive(Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Deserialize, serde::Serialize))]
pub struct TimePoint(BTreeMap<TimelineName, TimeCell>);

impl TimePoint {
    #[inline]
    pub fn get(&self, timeline: &TimelineName) -> Option<&TimeCell> {
        self.0.get(timeline)
    }

    #[inline]
    pub fn insert(
        &mut self,
        timeline: impl Into<TimelineName>,
        cell: TimeCell,
    ) -> Option<TimeCell> {
        self.0.insert(timeline.into(), cell)
    }

    #[inline]
    pub fn remove(&mut self, timeline: &TimelineName) -> Option<TimeCell> {
        self.0.remove(timeline)
    }

    #[inline]
    pub fn with(mut self, timeline: impl Into<TimelineName>, cell: TimeCell) -> Self {
        self.insert(timeline, cell);
        self
    }

    #[inline]
    pub fn is_static(&self) -> bool {
        self.0.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&TimelineName, &TimeCell)> {
        self.0.iter()
    }

    #[inline]
    pub fn timeline_names(&self) -> impl ExactSizeIterator<Item = &TimelineName> {
        self.0.keys()
    }
}

// ---

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum TimeColumnError {
    #[error(
        "Timeline '{timeline}' has unsupported datatype {datatype}, \
        expected an integer, timestamp or duration array"
    )]
    UnsupportedDatatype { timeline: String, datatype: DataType },

    #[error("Timeline '{timeline}' contains nulls, which is not supported")]
    ContainsNulls { timeline: String },

    #[error("Timeline '{timeline}' contains the value {value}, which doesn't fit in an i64")]
    OutOfRange { timeline: String, value: u64 },
}

/// A column of time values for columnar logging.
///
/// All time columns and component columns of one submission must have the same length.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimeColumn {
    timeline: Timeline,
    times: ScalarBuffer<i64>,
}

impl TimeColumn {
    #[inline]
    pub fn new(timeline: Timeline, times: impl Into<ScalarBuffer<i64>>) -> Self {
        Self {
            timeline,
            times: times.into(),
        }
    }

    /// Creates a new [`TimeColumn`] of sequence type.
    pub fn new_sequence(
        name: impl Into<TimelineName>,
        times: impl IntoIterator<Item = impl Into<i64>>,
    ) -> Self {
        let times = times.into_iter().map(Into::into).collect_vec();
        Self::new(Timeline::new_sequence(name), times)
    }

    /// Creates a new [`TimeColumn`] of duration type, in seconds.
    pub fn new_duration_secs(
        name: impl Into<TimelineName>,
        seconds: impl IntoIterator<Item = impl Into<f64>>,
    ) -> Self {
        let times = seconds
            .into_iter()
            .map(|seconds| secs_to_nanos(seconds.into()))
            .collect_vec();
        Self::new(Timeline::new_duration(name), times)
    }

    /// Creates a new [`TimeColumn`] of duration type, in nanoseconds.
    pub fn new_duration_nanos(
        name: impl Into<TimelineName>,
        nanos: impl IntoIterator<Item = impl Into<i64>>,
    ) -> Self {
        let times = nanos.into_iter().map(Into::into).collect_vec();
        Self::new(Timeline::new_duration(name), times)
    }

    /// Creates a new [`TimeColumn`] of timestamp type, in seconds since unix epoch.
    pub fn new_timestamp_secs_since_epoch(
        name: impl Into<TimelineName>,
        seconds: impl IntoIterator<Item = impl Into<f64>>,
    ) -> Self {
        let times = seconds
            .into_iter()
            .map(|seconds| secs_to_nanos(seconds.into()))
            .collect_vec();
        Self::new(Timeline::new_timestamp(name), times)
    }

    /// Creates a new [`TimeColumn`] of timestamp type, in nanoseconds since unix epoch.
    pub fn new_timestamp_nanos_since_epoch(
        name: impl Into<TimelineName>,
        nanos: impl IntoIterator<Item = impl Into<i64>>,
    ) -> Self {
        let times = nanos.into_iter().map(Into::into).collect_vec();
        Self::new(Timeline::new_timestamp(name), times)
    }

    /// Interprets an arbitrary arrow array as a time column.
    ///
    /// * Signed and unsigned integers become sequences.
    /// * Timestamps become timestamps, durations become durations, in any unit (converted to
    ///   nanoseconds).
    pub fn read_array(
        name: impl Into<TimelineName>,
        array: &dyn arrow::array::Array,
    ) -> Result<Self, TimeColumnError> {
        let name = name.into();

        if array.null_count() > 0 {
            return Err(TimeColumnError::ContainsNulls {
                timeline: name.to_string(),
            });
        }

        let unsupported = || TimeColumnError::UnsupportedDatatype {
            timeline: name.to_string(),
            datatype: array.data_type().clone(),
        };

        macro_rules! scaled {
            ($array_type:ty, $scale:expr) => {{
                let array = array
                    .as_any()
                    .downcast_ref::<$array_type>()
                    .ok_or_else(unsupported)?;
                array
                    .values()
                    .iter()
                    .map(|&v| i64::from(v).saturating_mul($scale))
                    .collect_vec()
            }};
        }

        let (typ, times): (TimeType, Vec<i64>) = match array.data_type() {
            DataType::Int64 => (TimeType::Sequence, scaled!(Int64Array, 1)),
            DataType::Int32 => (TimeType::Sequence, scaled!(Int32Array, 1)),
            DataType::UInt32 => (TimeType::Sequence, scaled!(UInt32Array, 1)),
            DataType::UInt64 => {
                let array = array
                    .as_any()
                    .downcast_ref::<UInt64Array>()
                    .ok_or_else(unsupported)?;
                let times = array
                    .values()
                    .iter()
                    .map(|&v| {
                        i64::try_from(v).map_err(|_err| TimeColumnError::OutOfRange {
                            timeline: name.to_string(),
                            value: v,
                        })
                    })
                    .collect::<Result<Vec<_>, _>>()?;
                (TimeType::Sequence, times)
            }

            DataType::Timestamp(unit, _) => {
                let times = match unit {
                    TimeUnit::Second => scaled!(TimestampSecondArray, 1_000_000_000),
                    TimeUnit::Millisecond => scaled!(TimestampMillisecondArray, 1_000_000),
                    TimeUnit::Microsecond => scaled!(TimestampMicrosecondArray, 1_000),
                    TimeUnit::Nanosecond => scaled!(TimestampNanosecondArray, 1),
                };
                (TimeType::TimestampNs, times)
            }

            DataType::Duration(unit) => {
                let times = match unit {
                    TimeUnit::Second => scaled!(DurationSecondArray, 1_000_000_000),
                    TimeUnit::Millisecond => scaled!(DurationMillisecondArray, 1_000_000),
                    TimeUnit::Microsecond => scaled!(DurationMicrosecondArray, 1_000),
                    TimeUnit::Nanosecond => scaled!(DurationNanosecondArray, 1),
                };
                (TimeType::DurationNs, times)
            }

            _ => return Err(unsupported()),
        };

        Ok(Self::new(Timeline::new(name, typ), times))
    }

    #[inline]
    pub fn timeline(&self) -> &Timeline {
        &self.timeline
    }

    #[inline]
    pub fn name(&self) -> &TimelineName {
        self.timeline.name()
    }

    #[inline]
    pub fn num_rows(&self) -> usize {
        self.times.len()
    }

    #[inline]
    pub fn times_raw(&self) -> &[i64] {
        &self.times
    }

    /// The times as an arrow array whose datatype reflects the [`TimeType`].
    #[inline]
    pub fn times_array(&self) -> ArrayRef {
        self.timeline.typ().make_arrow_array(self.times.clone())
    }
}

fn secs_to_nanos(seconds: f64) -> i64 {
    let nanos = (1e9 * seconds).round();
    if nanos.is_nan() || nanos <= i64::MIN as f64 || i64::MAX as f64 <= nanos {
        re_log::warn_once!("Time value of {seconds} seconds is out of range and will be clamped");
    }
    // `as` saturates, and maps NaN to zero.
    nanos as i64
}
