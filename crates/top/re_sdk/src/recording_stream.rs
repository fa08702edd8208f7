use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicI64, AtomicU64, Ordering};

use ahash::HashMap;
use parking_lot::RwLock;

use re_log_types::{EntityPath, TimeCell, TimePoint, TimelineName};
use re_types_core::{AsComponents, SerializationError, SerializedComponentBatch};

use crate::bundle::{BundleLike, LogOptions, merge_row};
use crate::sink::{BufferedSink, LogSink, MemorySink, MemorySinkStorage};
use crate::text_log::{TextLog, WARNINGS_ENTITY_PATH};
use crate::{
    AnyValueError, AnyValues, DynamicArchetype, ErrorPolicy, LogMsg, RowWrite, SendColumnsError,
    StrictModeGuard, TypeRegistry,
};

/// Errors that can occur when creating/manipulating a [`RecordingStream`].
#[derive(thiserror::Error, Debug)]
pub enum RecordingStreamError {
    /// Error within the underlying serializer.
    #[error("Failed to serialize component data: {0}")]
    Serialization(#[from] SerializationError),

    /// A loosely typed value couldn't be converted.
    #[error(transparent)]
    AnyValue(#[from] AnyValueError),

    /// Invalid columnar data.
    #[error(transparent)]
    SendColumns(#[from] SendColumnsError),

    /// Failure to read tabular data.
    #[error("Failed to read record batch: {0}")]
    Arrow(#[from] arrow::error::ArrowError),
}

/// Results that can occur when creating/manipulating a [`RecordingStream`].
pub type RecordingStreamResult<T> = Result<T, RecordingStreamError>;

// ---

/// Construct a [`RecordingStream`].
///
/// ```
/// # use re_sdk::RecordingStreamBuilder;
/// let (rec, storage) = RecordingStreamBuilder::new("rerun_example_app").memory()?;
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug)]
pub struct RecordingStreamBuilder {
    application_id: String,

    default_enabled: bool,
    enabled: Option<bool>,

    strict: Option<bool>,
    type_registry: Option<Arc<TypeRegistry>>,
}

impl RecordingStreamBuilder {
    /// Create a new [`RecordingStreamBuilder`] with the given application id.
    ///
    /// The application id is usually the name of your app.
    pub fn new(application_id: impl Into<String>) -> Self {
        Self {
            application_id: application_id.into(),

            default_enabled: true,
            enabled: None,

            strict: None,
            type_registry: None,
        }
    }

    /// Set whether or not Rerun is enabled by default.
    ///
    /// If the `RERUN` environment variable is set, it will override this.
    ///
    /// Set also: [`Self::enabled`].
    #[inline]
    pub fn default_enabled(mut self, default_enabled: bool) -> Self {
        self.default_enabled = default_enabled;
        self
    }

    /// Set whether or not Rerun is enabled.
    ///
    /// Setting this will ignore the `RERUN` environment variable.
    ///
    /// Set also: [`Self::default_enabled`].
    #[inline]
    pub fn enabled(mut self, enabled: bool) -> Self {
        self.enabled = Some(enabled);
        self
    }

    /// Whether usage errors are returned to the caller ([`ErrorPolicy::Strict`]) or turned into
    /// warnings ([`ErrorPolicy::Lenient`]).
    ///
    /// Setting this will ignore the `RERUN_STRICT` environment variable.
    #[inline]
    pub fn strict_mode(mut self, strict: bool) -> Self {
        self.strict = Some(strict);
        self
    }

    /// Pin the types of dynamic components in this registry instead of the global one.
    #[inline]
    pub fn type_registry(mut self, type_registry: Arc<TypeRegistry>) -> Self {
        self.type_registry = Some(type_registry);
        self
    }

    /// Creates a new [`RecordingStream`] that starts in a buffering state (RAM).
    ///
    /// ## Example
    ///
    /// ```
    /// let rec = re_sdk::RecordingStreamBuilder::new("rerun_example_app").buffered()?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn buffered(self) -> RecordingStreamResult<RecordingStream> {
        self.sink(Box::new(BufferedSink::new()))
    }

    /// Creates a new [`RecordingStream`] that is pre-configured to stream the data through to a
    /// [`MemorySink`].
    ///
    /// ## Example
    ///
    /// ```
    /// # fn log_data(_: &re_sdk::RecordingStream) { }
    ///
    /// let (rec, storage) = re_sdk::RecordingStreamBuilder::new("rerun_example_app").memory()?;
    ///
    /// log_data(&rec);
    ///
    /// let data = storage.take();
    ///
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn memory(self) -> RecordingStreamResult<(RecordingStream, MemorySinkStorage)> {
        let sink = MemorySink::new();
        let storage = sink.buffer();
        let rec = self.sink(Box::new(sink))?;
        Ok((rec, storage))
    }

    /// Creates a new [`RecordingStream`] that sends everything to the given sink.
    pub fn sink(self, sink: Box<dyn LogSink>) -> RecordingStreamResult<RecordingStream> {
        let enabled = self.is_enabled();
        if enabled {
            let strict = self.strict.unwrap_or_else(crate::decide_strict_mode);
            let type_registry = self.type_registry.unwrap_or_else(TypeRegistry::global);
            Ok(RecordingStream::new(
                self.application_id,
                strict,
                type_registry,
                sink,
            ))
        } else {
            re_log::debug!("Rerun disabled - recording stream created as a no-op");
            Ok(RecordingStream::disabled())
        }
    }

    /// Internal check for whether or not logging is enabled using explicit/default settings
    /// & env var.
    fn is_enabled(&self) -> bool {
        self.enabled
            .unwrap_or_else(|| crate::decide_logging_enabled(self.default_enabled))
    }
}

// ----------------------------------------------------------------------------

/// A [`RecordingStream`] handles everything related to logging data into Rerun.
///
/// You can construct a new [`RecordingStream`] using [`RecordingStreamBuilder`].
///
/// ## Sinks
///
/// Data is logged into Rerun via [`LogSink`]s.
///
/// The underlying [`LogSink`] of a [`RecordingStream`] can be changed at any point during its
/// lifetime by calling [`RecordingStream::set_sink`] or [`RecordingStream::memory`].
///
/// ## Errors
///
/// Usage and conversion errors are handled according to an [`ErrorPolicy`]: either returned
/// to the caller, or logged as warnings (in the process log, and in the recording at the
/// `rerun` entity) while the surviving data goes through.
///
/// ## Multithreading
///
/// [`RecordingStream`] can be cheaply cloned and used freely across any number of threads.
/// Every call runs to completion on the calling thread.
/// The time set via `set_time_*` is per-thread.
#[derive(Clone)]
pub struct RecordingStream {
    inner: Arc<Option<RecordingStreamInner>>,
}

struct RecordingStreamInner {
    /// Unique within the process, keys the thread-local time.
    id: u64,

    application_id: String,

    sink: RwLock<Box<dyn LogSink>>,

    tick: AtomicI64,

    /// The default policy, see [`RecordingStream::strict_mode_scope`].
    strict: Arc<AtomicBool>,

    type_registry: Arc<TypeRegistry>,
}

impl fmt::Debug for RecordingStreamInner {
    #[inline]
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingStreamInner")
            .field("application_id", &self.application_id)
            .field("strict", &self.strict.load(Ordering::Relaxed))
            .finish_non_exhaustive()
    }
}

impl RecordingStream {
    fn new(
        application_id: String,
        strict: bool,
        type_registry: Arc<TypeRegistry>,
        sink: Box<dyn LogSink>,
    ) -> Self {
        static NEXT_ID: AtomicU64 = AtomicU64::new(0);

        re_log::debug!("Creating recording stream for {application_id:?} (strict: {strict})");

        Self {
            inner: Arc::new(Some(RecordingStreamInner {
                id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
                application_id,
                sink: RwLock::new(sink),
                tick: AtomicI64::new(0),
                strict: Arc::new(AtomicBool::new(strict)),
                type_registry,
            })),
        }
    }

    /// Creates a new no-op [`RecordingStream`] that drops all logging messages, doesn't allocate
    /// any memory and doesn't spawn any threads.
    ///
    /// [`Self::is_enabled`] will return `false`.
    pub fn disabled() -> Self {
        Self {
            inner: Arc::new(None),
        }
    }

    /// Passes a reference to the [`RecordingStreamInner`], if it exists.
    #[inline]
    fn with<F: FnOnce(&RecordingStreamInner) -> R, R>(&self, f: F) -> Option<R> {
        (*self.inner).as_ref().map(f)
    }

    /// Check if logging is enabled on this `RecordingStream`.
    ///
    /// If not, all recording calls will be ignored.
    #[inline]
    pub fn is_enabled(&self) -> bool {
        self.with(|_| true).unwrap_or(false)
    }

    #[inline]
    pub fn application_id(&self) -> Option<String> {
        self.with(|inner| inner.application_id.clone())
    }

    /// The registry dynamic components of this recording get their types pinned in.
    pub fn type_registry(&self) -> Arc<TypeRegistry> {
        self.with(|inner| inner.type_registry.clone())
            .unwrap_or_else(TypeRegistry::global)
    }

    /// An empty [`AnyValues`], pinning its types in [`Self::type_registry`].
    #[inline]
    pub fn any_values(&self) -> AnyValues {
        AnyValues::default().with_registry(self.type_registry())
    }

    /// An empty [`DynamicArchetype`], pinning its types in [`Self::type_registry`].
    #[inline]
    pub fn dynamic_archetype(
        &self,
        archetype_name: impl Into<crate::ArchetypeName>,
    ) -> DynamicArchetype {
        DynamicArchetype::new(archetype_name).with_registry(self.type_registry())
    }
}

// --- Error policy ---

impl RecordingStream {
    /// The policy for a call, given its `strict` override.
    pub fn error_policy(&self, strict: Option<bool>) -> ErrorPolicy {
        let strict = strict.unwrap_or_else(|| {
            self.with(|inner| inner.strict.load(Ordering::Relaxed))
                .unwrap_or(false)
        });
        ErrorPolicy::from_strict(strict)
    }

    /// Changes the default [`ErrorPolicy`] of this recording until the returned guard is dropped.
    ///
    /// ```
    /// # let rec = re_sdk::RecordingStream::disabled();
    /// {
    ///     let _strict = rec.strict_mode_scope(true);
    ///     // errors are returned in here…
    /// }
    /// // …and back to whatever they were here.
    /// ```
    pub fn strict_mode_scope(&self, strict: bool) -> StrictModeGuard {
        let flag = self
            .with(|inner| inner.strict.clone())
            .unwrap_or_else(|| Arc::new(AtomicBool::new(false)));
        StrictModeGuard::new(flag, strict)
    }

    /// Returns the error under [`ErrorPolicy::Strict`], warns about it otherwise.
    pub(crate) fn handle_error(
        &self,
        policy: ErrorPolicy,
        err: impl Into<RecordingStreamError>,
    ) -> RecordingStreamResult<()> {
        let err = err.into();
        match policy {
            ErrorPolicy::Strict => Err(err),
            ErrorPolicy::Lenient => {
                self.send_warning(&err.to_string());
                Ok(())
            }
        }
    }

    /// Warns both in the process log and in the recording itself.
    pub(crate) fn send_warning(&self, text: &str) {
        re_log::warn!("{text}");

        let f = |inner: &RecordingStreamInner| {
            let tick = inner.tick.fetch_add(1, Ordering::Relaxed);
            let timepoint = self
                .now()
                .with(TimelineName::log_tick(), TimeCell::from_sequence(tick));

            let components = TextLog::warn(text)
                .as_serialized_batches()
                .into_iter()
                .map(|batch| (batch.descriptor, batch.array))
                .collect();

            inner.sink.read().send(LogMsg::Row(RowWrite {
                entity_path: EntityPath::from(WARNINGS_ENTITY_PATH),
                timepoint,
                is_static: false,
                components,
            }));
        };

        self.with(f);
    }
}

// --- Row-oriented logging ---

impl RecordingStream {
    /// Log data to Rerun.
    ///
    /// This is the main entry point for logging data to rerun. It can be used to log anything
    /// that implements the [`AsComponents`], such as any archetype, a [`crate::DynamicArchetype`],
    /// or [`crate::AnyValues`].
    ///
    /// The data will be timestamped automatically based on the [`RecordingStream`]'s internal
    /// clock.
    /// See [`RecordingStream::set_time_sequence`] etc for more information.
    ///
    /// See also: [`Self::log_static`] for logging static data.
    #[inline]
    pub fn log<AS: ?Sized + AsComponents>(
        &self,
        ent_path: impl Into<EntityPath>,
        as_components: &AS,
    ) -> RecordingStreamResult<()> {
        self.log_with_options(ent_path, as_components, LogOptions::default())
    }

    /// Log data to Rerun, without any time.
    ///
    /// Static data has no time associated with it, exists on all timelines, and unconditionally
    /// shadows any temporal data of the same type.
    #[inline]
    pub fn log_static<AS: ?Sized + AsComponents>(
        &self,
        ent_path: impl Into<EntityPath>,
        as_components: &AS,
    ) -> RecordingStreamResult<()> {
        self.log_with_options(ent_path, as_components, LogOptions::default().with_static(true))
    }

    /// Like [`Self::log`], with explicit [`LogOptions`].
    ///
    /// The fields `as_components` failed to build are reported first, according to the
    /// [`ErrorPolicy`] of this call.
    pub fn log_with_options<AS: ?Sized + AsComponents>(
        &self,
        ent_path: impl Into<EntityPath>,
        as_components: &AS,
        options: LogOptions,
    ) -> RecordingStreamResult<()> {
        if !self.is_enabled() {
            return Ok(()); // silently drop the message
        }

        let policy = self.error_policy(options.strict);
        for err in as_components.serialization_errors() {
            self.handle_error(policy, err)?;
        }

        self.log_components(ent_path, as_components.as_serialized_batches(), options)
    }

    /// Logs a set of [`SerializedComponentBatch`]es as a single row.
    #[inline]
    pub fn log_components(
        &self,
        ent_path: impl Into<EntityPath>,
        batches: impl IntoIterator<Item = SerializedComponentBatch>,
        options: LogOptions,
    ) -> RecordingStreamResult<()> {
        let batches: Vec<_> = batches.into_iter().collect();
        self.log_bundles(ent_path, [BundleLike::from(batches)], options)
    }

    /// Merges many bundles into a single row, and logs it.
    ///
    /// * If a component shows up more than once, the first one wins and the others are dropped
    ///   with a warning.
    /// * Length-1 batches in a row of more than one instance are splats: they apply to every
    ///   instance. They are sent before the rest of the row, at the same time.
    /// * Fields that the bundles failed to build are reported according to the [`ErrorPolicy`].
    pub fn log_bundles<'a>(
        &self,
        ent_path: impl Into<EntityPath>,
        bundles: impl IntoIterator<Item = BundleLike<'a>>,
        options: LogOptions,
    ) -> RecordingStreamResult<()> {
        if !self.is_enabled() {
            return Ok(()); // silently drop the message
        }

        let entity_path = ent_path.into();
        let policy = self.error_policy(options.strict);

        let merged = merge_row(bundles.into_iter().collect(), options.num_instances);

        for err in merged.errors {
            self.handle_error(policy, err)?;
        }
        for component in &merged.duplicates {
            self.send_warning(&format!(
                "Component {component} was included multiple times when logging to {entity_path}. \
                Only the first one is kept."
            ));
        }

        let timepoint = if options.is_static {
            TimePoint::default()
        } else {
            self.now_with_tick()
        };

        // Splats go first: the instanced data must be the last write for these instances.
        for components in [merged.splats, merged.instanced] {
            if components.is_empty() {
                continue;
            }
            self.record_msg(LogMsg::Row(RowWrite {
                entity_path: entity_path.clone(),
                timepoint: timepoint.clone(),
                is_static: options.is_static,
                components,
            }));
        }

        Ok(())
    }
}

// --- Sinks ---

impl RecordingStream {
    /// Records an arbitrary [`LogMsg`], as-is.
    #[inline]
    pub fn record_msg(&self, msg: LogMsg) {
        let f = move |inner: &RecordingStreamInner| {
            inner.sink.read().send(msg);
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to record_msg() ignored");
        }
    }

    /// Swaps the underlying sink for a new one.
    ///
    /// The current sink is flushed, and its backlog, if there's any, is forwarded to the new sink.
    pub fn set_sink(&self, sink: Box<dyn LogSink>) {
        let f = move |inner: &RecordingStreamInner| {
            let mut current = inner.sink.write();
            current.flush_blocking();
            let backlog = current.drain_backlog();
            sink.send_all(backlog);
            *current = sink;
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to set_sink() ignored");
        }
    }

    /// Swaps the underlying sink for a [`MemorySink`] and returns the associated
    /// [`MemorySinkStorage`].
    pub fn memory(&self) -> MemorySinkStorage {
        let sink = MemorySink::new();
        let storage = sink.buffer();
        self.set_sink(Box::new(sink));
        storage
    }

    /// Drains the backlog of the current sink, if it keeps one (e.g. [`BufferedSink`]).
    pub fn drain_backlog(&self) -> Vec<LogMsg> {
        self.with(|inner| inner.sink.read().drain_backlog())
            .unwrap_or_default()
    }

    /// Blocks until the sink has flushed everything that was sent so far.
    pub fn flush_blocking(&self) {
        let f = |inner: &RecordingStreamInner| inner.sink.read().flush_blocking();
        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to flush_blocking() ignored");
        }
    }
}

impl fmt::Debug for RecordingStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.inner.as_ref() {
            Some(inner) => write!(f, "RecordingStream {{ {inner:?} }}"),
            None => write!(f, "RecordingStream {{ disabled }}"),
        }
    }
}

// --- Stateful time ---

/// Thread-local data.
#[derive(Default)]
struct ThreadInfo {
    /// The current time per-thread per-recording, which can be set by users.
    timepoints: HashMap<u64, TimePoint>,
}

impl ThreadInfo {
    fn thread_now(rid: u64) -> TimePoint {
        Self::with(|ti| ti.now(rid))
    }

    fn set_thread_time(rid: u64, timeline: TimelineName, cell: TimeCell) {
        Self::with(|ti| ti.set_time(rid, timeline, cell));
    }

    fn unset_thread_time(rid: u64, timeline: &TimelineName) {
        Self::with(|ti| ti.unset_time(rid, timeline));
    }

    fn reset_thread_time(rid: u64) {
        Self::with(|ti| ti.reset_time(rid));
    }

    /// Get access to the thread-local [`ThreadInfo`].
    fn with<R>(f: impl FnOnce(&mut Self) -> R) -> R {
        use std::cell::RefCell;
        thread_local! {
            static THREAD_INFO: RefCell<Option<ThreadInfo>> = const { RefCell::new(None) };
        }

        THREAD_INFO.with(|thread_info| {
            let mut thread_info = thread_info.borrow_mut();
            let thread_info = thread_info.get_or_insert_with(Self::default);
            f(thread_info)
        })
    }

    fn now(&self, rid: u64) -> TimePoint {
        let mut timepoint = self.timepoints.get(&rid).cloned().unwrap_or_default();
        timepoint.insert(TimelineName::log_time(), TimeCell::timestamp_now());
        timepoint
    }

    fn set_time(&mut self, rid: u64, timeline: TimelineName, cell: TimeCell) {
        self.timepoints
            .entry(rid)
            .or_default()
            .insert(timeline, cell);
    }

    fn unset_time(&mut self, rid: u64, timeline: &TimelineName) {
        if let Some(timepoint) = self.timepoints.get_mut(&rid) {
            timepoint.remove(timeline);
        }
    }

    fn reset_time(&mut self, rid: u64) {
        if let Some(timepoint) = self.timepoints.get_mut(&rid) {
            *timepoint = TimePoint::default();
        }
    }
}

impl RecordingStream {
    /// Returns the current time of the recording on the current thread.
    ///
    /// Always includes the `log_time` timeline.
    pub fn now(&self) -> TimePoint {
        let f = move |inner: &RecordingStreamInner| ThreadInfo::thread_now(inner.id);
        if let Some(res) = self.with(f) {
            res
        } else {
            re_log::warn_once!("Recording disabled - call to now() ignored");
            TimePoint::default()
        }
    }

    /// [`Self::now`], plus the next `log_tick`.
    fn now_with_tick(&self) -> TimePoint {
        let tick = self
            .with(|inner| inner.tick.fetch_add(1, Ordering::Relaxed))
            .unwrap_or_default();
        self.now()
            .with(TimelineName::log_tick(), TimeCell::from_sequence(tick))
    }

    /// Set the current time of the recording, for the current calling thread.
    ///
    /// Used for all subsequent logging performed from this same thread, until the next call
    /// to one of the index/time setting methods.
    ///
    /// There is no requirement of monotonicity. You can move the time backwards if you like.
    pub fn set_timepoint(&self, timepoint: impl Into<TimePoint>) {
        let f = move |inner: &RecordingStreamInner| {
            let timepoint = timepoint.into();
            for (timeline, time) in timepoint.iter() {
                ThreadInfo::set_thread_time(inner.id, timeline.clone(), *time);
            }
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to set_timepoint() ignored");
        }
    }

    /// Set the current value of one of the timelines.
    ///
    /// Used for all subsequent logging performed from this same thread, until the next call
    /// to one of the index/time setting methods.
    ///
    /// There is no requirement of monotonicity. You can move the time backwards if you like.
    ///
    /// See also:
    /// - [`Self::set_timepoint`]
    /// - [`Self::set_time_sequence`]
    /// - [`Self::set_duration_secs`]
    /// - [`Self::disable_timeline`]
    /// - [`Self::reset_time`]
    pub fn set_time(&self, timeline: impl Into<TimelineName>, cell: TimeCell) {
        let f = move |inner: &RecordingStreamInner| {
            ThreadInfo::set_thread_time(inner.id, timeline.into(), cell);
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to set_time() ignored");
        }
    }

    /// Short for `set_time(timeline, TimeCell::from_sequence(sequence))`.
    ///
    /// For example: `rec.set_time_sequence("frame_nr", frame_nr)`.
    /// You can remove a timeline again using `rec.disable_timeline("frame_nr")`.
    #[inline]
    pub fn set_time_sequence(&self, timeline: impl Into<TimelineName>, sequence: impl Into<i64>) {
        self.set_time(timeline, TimeCell::from_sequence(sequence.into()));
    }

    /// Short for `set_time(timeline, TimeCell::from_duration_secs(secs))`.
    #[inline]
    pub fn set_duration_secs(&self, timeline: impl Into<TimelineName>, secs: impl Into<f64>) {
        self.set_time(timeline, TimeCell::from_duration_secs(secs.into()));
    }

    /// Set a timestamp as seconds since Unix epoch (1970-01-01 00:00:00 UTC).
    #[inline]
    pub fn set_timestamp_secs_since_epoch(
        &self,
        timeline: impl Into<TimelineName>,
        secs: impl Into<f64>,
    ) {
        self.set_time(
            timeline,
            TimeCell::from_timestamp_secs_since_epoch(secs.into()),
        );
    }

    /// Set a timestamp as nanoseconds since Unix epoch.
    #[inline]
    pub fn set_timestamp_nanos(&self, timeline: impl Into<TimelineName>, nanos: impl Into<i64>) {
        self.set_time(
            timeline,
            TimeCell::from_timestamp_nanos_since_epoch(nanos.into()),
        );
    }

    /// Clears out the current time of the recording for the specified timeline, for the
    /// current calling thread.
    pub fn disable_timeline(&self, timeline: impl Into<TimelineName>) {
        let f = move |inner: &RecordingStreamInner| {
            let timeline = timeline.into();
            ThreadInfo::unset_thread_time(inner.id, &timeline);
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to disable_timeline() ignored");
        }
    }

    /// Clears out the current time of the recording, for the current calling thread.
    pub fn reset_time(&self) {
        let f = move |inner: &RecordingStreamInner| {
            ThreadInfo::reset_thread_time(inner.id);
        };

        if self.with(f).is_none() {
            re_log::warn_once!("Recording disabled - call to reset_time() ignored");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use arrow::array::Float32Array;

    use super::*;

    fn memory(strict: bool) -> (RecordingStream, MemorySinkStorage) {
        RecordingStreamBuilder::new("rerun_example_test")
            .enabled(true)
            .strict_mode(strict)
            .type_registry(Arc::new(TypeRegistry::new()))
            .memory()
            .unwrap()
    }

    fn rows(storage: &MemorySinkStorage) -> Vec<RowWrite> {
        storage
            .take()
            .into_iter()
            .filter_map(|msg| msg.as_row().cloned())
            .collect()
    }

    #[test]
    fn impl_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<RecordingStream>();
    }

    #[test]
    fn disabled() {
        let rec = RecordingStreamBuilder::new("rerun_example_disabled")
            .enabled(false)
            .buffered()
            .unwrap();
        assert!(!rec.is_enabled());

        let batch = SerializedComponentBatch::new(
            Arc::new(Float32Array::from(vec![1.0])),
            re_types_core::ComponentDescriptor::partial("scalar"),
        );
        rec.log("a", &batch).unwrap();
        assert!(rec.drain_backlog().is_empty());
    }

    #[test]
    fn timelines() {
        let (rec, storage) = memory(false);
        let batch = SerializedComponentBatch::new(
            Arc::new(Float32Array::from(vec![1.0])),
            re_types_core::ComponentDescriptor::partial("scalar"),
        );

        rec.set_time_sequence("frame", 42);
        rec.log("a", &batch).unwrap();
        rec.disable_timeline("frame");
        rec.log("a", &batch).unwrap();
        rec.log_static("a", &batch).unwrap();

        let rows = rows(&storage);
        assert_eq!(rows.len(), 3);

        let frame = TimelineName::new("frame");
        assert_eq!(rows[0].timepoint.get(&frame), Some(&TimeCell::from_sequence(42)));
        assert!(rows[0].timepoint.get(&TimelineName::log_time()).is_some());
        assert_eq!(
            rows[0].timepoint.get(&TimelineName::log_tick()),
            Some(&TimeCell::from_sequence(0))
        );

        assert_eq!(rows[1].timepoint.get(&frame), None);
        assert_eq!(
            rows[1].timepoint.get(&TimelineName::log_tick()),
            Some(&TimeCell::from_sequence(1))
        );

        assert!(rows[2].is_static);
        assert!(rows[2].timepoint.is_static());
    }

    #[test]
    fn time_is_per_recording() {
        let (rec1, storage1) = memory(false);
        let (rec2, storage2) = memory(false);
        let batch = SerializedComponentBatch::new(
            Arc::new(Float32Array::from(vec![1.0])),
            re_types_core::ComponentDescriptor::partial("scalar"),
        );

        rec1.set_time_sequence("frame", 1);
        rec1.log("a", &batch).unwrap();
        rec2.log("a", &batch).unwrap();

        let frame = TimelineName::new("frame");
        assert!(rows(&storage1)[0].timepoint.get(&frame).is_some());
        assert!(rows(&storage2)[0].timepoint.get(&frame).is_none());
    }

    #[test]
    fn strict_mode_scope() {
        let (rec, storage) = memory(false);

        // Pins "conf" to floats.
        rec.log("e", &rec.any_values().with_component("conf", vec![1.2]))
            .unwrap();
        storage.take();

        let bad = rec.any_values().with_component("conf", "oops");
        assert_eq!(bad.errors().len(), 1);

        assert_eq!(rec.error_policy(None), ErrorPolicy::Lenient);
        {
            let _guard = rec.strict_mode_scope(true);
            assert_eq!(rec.error_policy(None), ErrorPolicy::Strict);
            assert!(rec.log("e", &bad).is_err());
            assert!(storage.is_empty());
        }
        assert_eq!(rec.error_policy(None), ErrorPolicy::Lenient);
        assert_eq!(rec.error_policy(Some(true)), ErrorPolicy::Strict);

        // Lenient: one warning, nothing else to log.
        rec.log("e", &bad).unwrap();
        let rows = rows(&storage);
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].entity_path, EntityPath::from(WARNINGS_ENTITY_PATH));
    }

    #[test]
    fn builders_use_the_stream_registry() {
        let (rec, _storage) = memory(true);
        assert!(rec.type_registry().is_empty());

        rec.log("e", &rec.any_values().with_component("x", vec![1.0]))
            .unwrap();
        rec.log(
            "e",
            &rec.dynamic_archetype("Sensor")
                .with_component("reading", vec![2.0]),
        )
        .unwrap();
        assert_eq!(rec.type_registry().len(), 2);
    }

    #[test]
    fn set_sink_forwards_backlog() {
        let rec = RecordingStreamBuilder::new("rerun_example_backlog")
            .enabled(true)
            .buffered()
            .unwrap();
        let batch = SerializedComponentBatch::new(
            Arc::new(Float32Array::from(vec![1.0])),
            re_types_core::ComponentDescriptor::partial("scalar"),
        );
        rec.log("a", &batch).unwrap();

        let storage = rec.memory();
        assert_eq!(storage.len(), 1);
        rec.log("a", &batch).unwrap();
        assert_eq!(storage.len(), 2);
    }
}
