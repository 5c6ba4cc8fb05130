//! A `Constraint` is a linear constraint over program variables.

use crate::il::LinearExpression;
use crate::num::Number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The relation a constraint places on its expression. All kinds constrain
/// the expression against zero.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ConstraintKind {
    /// `expression == 0`
    Equality,
    /// `expression <= 0`
    Inequality,
    /// `expression < 0`
    StrictInequality,
    /// `expression != 0`
    Disequation,
}

/// A linear constraint `expression OP 0`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Constraint {
    expression: LinearExpression,
    kind: ConstraintKind,
    signed: bool,
}

impl Constraint {
    pub fn new(expression: LinearExpression, kind: ConstraintKind, signed: bool) -> Constraint {
        Constraint {
            expression,
            kind,
            signed,
        }
    }

    /// `lhs <= rhs` over signed integers.
    pub fn le(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::Inequality, true)
    }

    /// `lhs < rhs` over signed integers.
    pub fn lt(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::StrictInequality, true)
    }

    /// `lhs >= rhs` over signed integers.
    pub fn ge(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::le(rhs, lhs)
    }

    /// `lhs > rhs` over signed integers.
    pub fn gt(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::lt(rhs, lhs)
    }

    /// `lhs == rhs`.
    pub fn eq(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::Equality, true)
    }

    /// `lhs != rhs`.
    pub fn ne(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::Disequation, true)
    }

    /// `lhs <= rhs` over unsigned integers.
    pub fn unsigned_le(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::Inequality, false)
    }

    /// `lhs < rhs` over unsigned integers.
    pub fn unsigned_lt(lhs: LinearExpression, rhs: LinearExpression) -> Constraint {
        Constraint::new(lhs - rhs, ConstraintKind::StrictInequality, false)
    }

    pub fn expression(&self) -> &LinearExpression {
        &self.expression
    }

    pub fn kind(&self) -> ConstraintKind {
        self.kind
    }

    pub fn is_signed(&self) -> bool {
        self.signed
    }

    pub fn is_inequality(&self) -> bool {
        self.kind == ConstraintKind::Inequality
    }

    pub fn is_strict_inequality(&self) -> bool {
        self.kind == ConstraintKind::StrictInequality
    }

    pub fn is_equality(&self) -> bool {
        self.kind == ConstraintKind::Equality
    }

    pub fn is_disequation(&self) -> bool {
        self.kind == ConstraintKind::Disequation
    }

    /// True if this constraint has no variables and trivially holds.
    pub fn is_tautology(&self) -> bool {
        if !self.expression.is_constant() {
            return false;
        }
        let c = self.expression.constant();
        match self.kind {
            ConstraintKind::Equality => c.is_zero(),
            ConstraintKind::Inequality => !c.is_positive(),
            ConstraintKind::StrictInequality => c.is_negative(),
            ConstraintKind::Disequation => !c.is_zero(),
        }
    }

    /// True if this constraint has no variables and trivially fails.
    pub fn is_contradiction(&self) -> bool {
        self.expression.is_constant() && !self.is_tautology()
    }

    /// Rewrite a strict inequality `e < 0` as `e + 1 <= 0`. Returns `None`
    /// for other constraint kinds.
    pub fn strict_to_non_strict(&self) -> Option<Constraint> {
        if !self.is_strict_inequality() {
            return None;
        }
        Some(Constraint::new(
            self.expression.clone().add_constant(Number::one()),
            ConstraintKind::Inequality,
            self.signed,
        ))
    }
}

impl fmt::Display for Constraint {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let op = match self.kind {
            ConstraintKind::Equality => "==",
            ConstraintKind::Inequality => "<=",
            ConstraintKind::StrictInequality => "<",
            ConstraintKind::Disequation => "!=",
        };
        let sign = if self.signed { "" } else { " (unsigned)" };
        write!(f, "{} {} 0{}", self.expression, op, sign)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_const, expr_var};

    #[test]
    fn test_tautology_and_contradiction() {
        assert!(Constraint::le(expr_const(1), expr_const(2)).is_tautology());
        assert!(Constraint::le(expr_const(2), expr_const(1)).is_contradiction());
        assert!(Constraint::lt(expr_const(1), expr_const(1)).is_contradiction());
        assert!(Constraint::eq(expr_const(3), expr_const(3)).is_tautology());
        assert!(!Constraint::le(expr_var("x"), expr_const(1)).is_tautology());
    }

    #[test]
    fn test_strict_to_non_strict() {
        let strict = Constraint::lt(expr_var("x"), expr_const(0));
        let non_strict = strict.strict_to_non_strict().unwrap();
        assert!(non_strict.is_inequality());
        // x < 0 becomes x + 1 <= 0
        assert_eq!(*non_strict.expression().constant(), Number::one());

        assert!(Constraint::eq(expr_var("x"), expr_const(0))
            .strict_to_non_strict()
            .is_none());
    }
}
