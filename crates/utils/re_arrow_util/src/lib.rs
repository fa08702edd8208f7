//! Helpers for working with arrow

mod arrays;

pub use self::arrays::*;
