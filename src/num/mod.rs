//! Arbitrary-precision numbers, extended bounds, and intervals.

pub mod interval;
pub mod number;

pub use self::interval::{Bound, Interval};
pub use self::number::Number;
