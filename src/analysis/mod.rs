//! Implementations and traits for static analysis over Kestrel IL.

pub mod fixed_point;
pub mod stats;
pub mod wto;
pub mod zones;

pub use self::fixed_point::{
    run_forward_analyzer, run_forward_analyzer_options, Domain, InvariantTable,
};
pub use self::wto::{Component, Cycle, Nesting, Wto};
