//! The Rerun logging SDK: turning loosely typed data into typed, columnar component batches.
//!
//! The main entry point is [`RecordingStream`]:
//! * [`RecordingStream::log`] and friends merge any number of component bundles into a single
//!   row, stamped with the current time of the calling thread.
//! * [`RecordingStream::send_columns`] and [`RecordingStream::send_record_batch`] submit many
//!   rows at once, with explicit time columns.
//!
//! Loosely typed values ([`Value`]) are coerced into arrow arrays, and the arrow type used the
//! first time a component is logged is remembered in a [`TypeRegistry`], so that a component
//! keeps the same type for the whole recording. See [`AnyValues`] and [`DynamicArchetype`].
//!
//! Usage errors are either returned to the caller or logged as warnings, depending on the
//! [`ErrorPolicy`].
//!
//! ## Feature flags
#![doc = document_features::document_features!()]
//!

// ----------------
// Private modules:

mod any_values;
mod bundle;
mod coercion;
mod error_policy;
mod log_msg;
mod log_sink;
mod recording_stream;
mod send_columns;
mod text_log;
mod type_registry;
mod value;

// -------------
// Public items:

pub use self::any_values::{AnyBatchValue, AnyValueError, AnyValues, DynamicArchetype};
pub use self::bundle::{BundleLike, INSTANCE_KEY, INSTANCE_KEY_SPLAT, LogOptions};
pub use self::coercion::{CoercionError, coerce_to_array};
pub use self::error_policy::{ErrorPolicy, StrictModeGuard};
pub use self::log_msg::{ColumnWrite, LogMsg, RowWrite};
pub use self::recording_stream::{
    RecordingStream, RecordingStreamBuilder, RecordingStreamError, RecordingStreamResult,
};
pub use self::send_columns::{ColumnInput, ColumnName, SendColumnsError};
pub use self::text_log::{TextLog, WARNINGS_ENTITY_PATH};
pub use self::type_registry::{RegisteredType, TypeRegistry};
pub use self::value::{NativeType, Tensor, TensorElement, Value};

pub use re_log_types::{
    EntityPath, TimeCell, TimeColumn, TimePoint, TimeType, Timeline, TimelineName,
};
pub use re_types_core::{
    Archetype, ArchetypeName, AsComponents, ComponentBatch, ComponentDescriptor,
    ComponentIdentifier, ComponentType, SerializedComponentBatch, SerializedComponentColumn,
};

#[cfg(feature = "setup_logging")]
pub use re_log::setup_logging;

/// Different destinations for log messages.
pub mod sink {
    pub use crate::log_sink::{BufferedSink, LogSink, MemorySink, MemorySinkStorage};
}

/// Re-exports of other crates.
pub mod external {
    pub use arrow;
    pub use re_arrow_util;
    pub use re_log;
    pub use re_log_types;
    pub use re_sorbet;
    pub use re_types_core;
}

// -----
// Misc:

const RERUN_ENV_VAR: &str = "RERUN";

const RERUN_STRICT_ENV_VAR: &str = "RERUN_STRICT";

/// Helper to get the value of a boolean environment variable.
fn get_bool_env(name: &str) -> Option<bool> {
    std::env::var(name)
        .ok()
        .and_then(|s| match s.to_lowercase().as_str() {
            "0" | "false" | "off" => Some(false),
            "1" | "true" | "on" => Some(true),
            _ => {
                re_log::warn!(
                    "Invalid value for environment variable {name}={s:?}. \
                    Expected 'on' or 'off'. It will be ignored"
                );
                None
            }
        })
}

/// Checks the `RERUN` environment variable. If not found, returns the argument.
///
/// Also adds some helpful logging.
pub fn decide_logging_enabled(default_enabled: bool) -> bool {
    // We use `info_once` so that we can call this function
    // multiple times without spamming the log.
    match get_bool_env(RERUN_ENV_VAR) {
        Some(true) => {
            re_log::info_once!(
                "Rerun Logging is enabled by the '{RERUN_ENV_VAR}' environment variable."
            );
            true
        }
        Some(false) => {
            re_log::info_once!(
                "Rerun Logging is disabled by the '{RERUN_ENV_VAR}' environment variable."
            );
            false
        }
        None => {
            if !default_enabled {
                re_log::info_once!(
                    "Rerun Logging has been disabled. \
                    Turn it on with the '{RERUN_ENV_VAR}' environment variable."
                );
            }
            default_enabled
        }
    }
}

/// Checks the `RERUN_STRICT` environment variable. Lenient if not set.
pub fn decide_strict_mode() -> bool {
    let strict = get_bool_env(RERUN_STRICT_ENV_VAR).unwrap_or(false);
    if strict {
        re_log::debug_once!(
            "Strict mode enabled by the '{RERUN_STRICT_ENV_VAR}' environment variable."
        );
    }
    strict
}
