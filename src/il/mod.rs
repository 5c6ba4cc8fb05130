//! Kestrel Intermediate Language

pub mod block;
pub mod constraint;
pub mod control_flow_graph;
pub mod expression;
pub mod instruction;
pub mod variable;

pub use self::block::*;
pub use self::constraint::*;
pub use self::control_flow_graph::*;
pub use self::expression::*;
pub use self::instruction::*;
pub use self::variable::*;

use crate::num::Number;

/// A convenience function to create a new variable.
///
/// This is the preferred way to create a `Variable`.
pub fn var<S>(name: S) -> Variable
where
    S: Into<String>,
{
    Variable::new(name)
}

/// A convenience function to create a new single-variable expression.
///
/// This is the preferred way to create a variable `LinearExpression`.
pub fn expr_var<S>(name: S) -> LinearExpression
where
    S: Into<String>,
{
    LinearExpression::from(Variable::new(name))
}

/// A convenience function to create a new constant expression.
///
/// This is the preferred way to create a constant `LinearExpression`.
pub fn expr_const(value: i64) -> LinearExpression {
    LinearExpression::from(Number::from(value))
}
