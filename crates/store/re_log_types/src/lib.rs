//! The basic building blocks of a Rerun recording.
//!
//! * [`EntityPath`]: what some logged data is attached to.
//! * [`Timeline`]/[`TimePoint`]: when, for row-oriented logging.
//! * [`TimeColumn`]: when, for column-oriented logging.

mod path;
mod time;

pub use self::path::{EntityPath, EntityPathPart};
pub use self::time::{
    TimeCell, TimeColumn, TimeColumnError, TimePoint, TimeType, Timeline, TimelineName,
};
