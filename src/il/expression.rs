//! A `LinearExpression` is an integer linear combination of variables.

use crate::il::Variable;
use crate::num::Number;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::ops::{Add, Neg, Sub};

/// A linear expression `k + c0*x0 + c1*x1 + ...`.
///
/// Zero coefficients are never stored, and terms iterate in variable order.
#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct LinearExpression {
    constant: Number,
    terms: BTreeMap<Variable, Number>,
}

impl LinearExpression {
    /// The constant term of this expression.
    pub fn constant(&self) -> &Number {
        &self.constant
    }

    /// The variable terms of this expression, as `(variable, coefficient)`
    /// pairs in variable order.
    pub fn terms(&self) -> impl Iterator<Item = (&Variable, &Number)> {
        self.terms.iter()
    }

    /// True if this expression has no variable terms.
    pub fn is_constant(&self) -> bool {
        self.terms.is_empty()
    }

    /// The coefficient of `variable` in this expression, zero if absent.
    pub fn coefficient(&self, variable: &Variable) -> Number {
        self.terms
            .get(variable)
            .cloned()
            .unwrap_or_else(Number::zero)
    }

    /// Add `coefficient * variable` to this expression.
    pub fn add_term(mut self, variable: Variable, coefficient: Number) -> LinearExpression {
        let merged = self.coefficient(&variable) + coefficient;
        if merged.is_zero() {
            self.terms.remove(&variable);
        } else {
            self.terms.insert(variable, merged);
        }
        self
    }

    /// Add a constant to this expression.
    pub fn add_constant(mut self, constant: Number) -> LinearExpression {
        self.constant = self.constant + constant;
        self
    }

    /// Multiply this expression by a constant.
    pub fn mul_constant(mut self, factor: &Number) -> LinearExpression {
        if factor.is_zero() {
            return LinearExpression::default();
        }
        self.constant = &self.constant * factor;
        for coefficient in self.terms.values_mut() {
            *coefficient = &*coefficient * factor;
        }
        self
    }
}

impl From<Number> for LinearExpression {
    fn from(constant: Number) -> LinearExpression {
        LinearExpression {
            constant,
            terms: BTreeMap::new(),
        }
    }
}

impl From<Variable> for LinearExpression {
    fn from(variable: Variable) -> LinearExpression {
        LinearExpression::default().add_term(variable, Number::one())
    }
}

impl Add for LinearExpression {
    type Output = LinearExpression;

    fn add(self, rhs: LinearExpression) -> LinearExpression {
        let mut expression = self.add_constant(rhs.constant);
        for (variable, coefficient) in rhs.terms {
            expression = expression.add_term(variable, coefficient);
        }
        expression
    }
}

impl Sub for LinearExpression {
    type Output = LinearExpression;

    fn sub(self, rhs: LinearExpression) -> LinearExpression {
        self + (-rhs)
    }
}

impl Neg for LinearExpression {
    type Output = LinearExpression;

    fn neg(self) -> LinearExpression {
        LinearExpression {
            constant: -self.constant,
            terms: self
                .terms
                .into_iter()
                .map(|(variable, coefficient)| (variable, -coefficient))
                .collect(),
        }
    }
}

impl fmt::Display for LinearExpression {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for (variable, coefficient) in &self.terms {
            if first {
                if *coefficient == Number::from(-1) {
                    write!(f, "-{}", variable)?;
                } else if coefficient.is_negative() || *coefficient != Number::one() {
                    write!(f, "{}*{}", coefficient, variable)?;
                } else {
                    write!(f, "{}", variable)?;
                }
                first = false;
            } else if coefficient.is_negative() {
                if *coefficient == Number::from(-1) {
                    write!(f, " - {}", variable)?;
                } else {
                    write!(f, " - {}*{}", coefficient.abs(), variable)?;
                }
            } else if *coefficient == Number::one() {
                write!(f, " + {}", variable)?;
            } else {
                write!(f, " + {}*{}", coefficient, variable)?;
            }
        }
        if first {
            write!(f, "{}", self.constant)
        } else if self.constant.is_negative() {
            write!(f, " - {}", self.constant.abs())
        } else if !self.constant.is_zero() {
            write!(f, " + {}", self.constant)
        } else {
            Ok(())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_const, expr_var};

    #[test]
    fn test_term_normalization() {
        let e = expr_var("x") + expr_var("x");
        assert_eq!(e.coefficient(&Variable::new("x")), Number::from(2));

        let e = expr_var("x") - expr_var("x");
        assert!(e.is_constant());
        assert!(e.terms().next().is_none());
    }

    #[test]
    fn test_mul_constant() {
        let e = (expr_var("x") + expr_const(3)).mul_constant(&Number::from(2));
        assert_eq!(e.coefficient(&Variable::new("x")), Number::from(2));
        assert_eq!(*e.constant(), Number::from(6));

        let e = (expr_var("x") + expr_const(3)).mul_constant(&Number::zero());
        assert!(e.is_constant());
        assert!(e.constant().is_zero());
    }

    #[test]
    fn test_display() {
        let e = expr_var("x") - expr_var("y") + expr_const(-4);
        assert_eq!(format!("{}", e), "x - y - 4");
    }
}
