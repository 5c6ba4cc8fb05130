//! A `Variable` names a storage location in the analyzed program.

use serde::{Deserialize, Serialize};
use std::fmt;

/// A program variable, identified by name.
///
/// Variables are program-wide: two variables with the same name refer to the
/// same storage location.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Variable {
    name: String,
}

impl Variable {
    /// Create a new `Variable` with the given name.
    pub fn new<S>(name: S) -> Variable
    where
        S: Into<String>,
    {
        Variable { name: name.into() }
    }

    /// Create a new `Variable` for a numbered register.
    pub fn register(index: usize) -> Variable {
        Variable {
            name: format!("r{}", index),
        }
    }

    /// Gets the name of the `Variable`.
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Display for Variable {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name)
    }
}
