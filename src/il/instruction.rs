//! An `Instruction` is one statement of a basic block.

use crate::il::{Constraint, LinearExpression, Variable};
use crate::num::Number;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Arithmetic binary operators.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum ArithOp {
    Add,
    Sub,
    Mul,
    SDiv,
    UDiv,
    SRem,
    URem,
}

/// Bitwise binary operators.
#[derive(Clone, Copy, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum BitwiseOp {
    And,
    Or,
    Xor,
    Shl,
    LShr,
    AShr,
}

/// The right-hand operand of a binary operation: a variable or an immediate.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operand {
    Variable(Variable),
    Number(Number),
}

impl From<Variable> for Operand {
    fn from(variable: Variable) -> Operand {
        Operand::Variable(variable)
    }
}

impl From<Number> for Operand {
    fn from(number: Number) -> Operand {
        Operand::Number(number)
    }
}

impl From<i64> for Operand {
    fn from(value: i64) -> Operand {
        Operand::Number(Number::from(value))
    }
}

impl fmt::Display for Operand {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operand::Variable(v) => v.fmt(f),
            Operand::Number(n) => n.fmt(f),
        }
    }
}

/// The operations Kestrel instructions can perform.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub enum Operation {
    /// Assign the value of a linear expression to a variable.
    Assign {
        dst: Variable,
        src: LinearExpression,
    },
    /// Apply an arithmetic binary operator.
    ApplyArith {
        op: ArithOp,
        dst: Variable,
        lhs: Variable,
        rhs: Operand,
    },
    /// Apply a bitwise binary operator.
    ApplyBitwise {
        op: BitwiseOp,
        dst: Variable,
        lhs: Variable,
        rhs: Operand,
    },
    /// Constrain the state with a branch condition.
    Assume(Constraint),
    /// An explicated assertion. It constrains the state exactly like
    /// `Assume`; checking it is a downstream concern.
    Assert(Constraint),
    /// Forget everything known about a variable.
    Havoc(Variable),
    /// Do nothing.
    Nop,
}

impl Operation {
    /// The variable this operation writes, if any.
    pub fn variable_written(&self) -> Option<&Variable> {
        match self {
            Operation::Assign { dst, .. }
            | Operation::ApplyArith { dst, .. }
            | Operation::ApplyBitwise { dst, .. }
            | Operation::Havoc(dst) => Some(dst),
            Operation::Assume(_) | Operation::Assert(_) | Operation::Nop => None,
        }
    }
}

impl fmt::Display for Operation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Operation::Assign { dst, src } => write!(f, "{} = {}", dst, src),
            Operation::ApplyArith { op, dst, lhs, rhs } => {
                let op = match op {
                    ArithOp::Add => "+",
                    ArithOp::Sub => "-",
                    ArithOp::Mul => "*",
                    ArithOp::SDiv => "/s",
                    ArithOp::UDiv => "/u",
                    ArithOp::SRem => "%s",
                    ArithOp::URem => "%u",
                };
                write!(f, "{} = {} {} {}", dst, lhs, op, rhs)
            }
            Operation::ApplyBitwise { op, dst, lhs, rhs } => {
                let op = match op {
                    BitwiseOp::And => "&",
                    BitwiseOp::Or => "|",
                    BitwiseOp::Xor => "^",
                    BitwiseOp::Shl => "<<",
                    BitwiseOp::LShr => ">>u",
                    BitwiseOp::AShr => ">>s",
                };
                write!(f, "{} = {} {} {}", dst, lhs, op, rhs)
            }
            Operation::Assume(constraint) => write!(f, "assume {}", constraint),
            Operation::Assert(constraint) => write!(f, "assert {}", constraint),
            Operation::Havoc(variable) => write!(f, "havoc {}", variable),
            Operation::Nop => write!(f, "nop"),
        }
    }
}

/// An operation together with its block-local index.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Instruction {
    operation: Operation,
    index: usize,
    comment: Option<String>,
}

impl Instruction {
    pub fn new(index: usize, operation: Operation) -> Instruction {
        Instruction {
            operation,
            index,
            comment: None,
        }
    }

    pub fn operation(&self) -> &Operation {
        &self.operation
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn comment(&self) -> Option<&str> {
        self.comment.as_deref()
    }

    pub fn set_comment<S>(&mut self, comment: S)
    where
        S: Into<String>,
    {
        self.comment = Some(comment.into());
    }

    /// Clone this instruction and set a new index.
    pub(crate) fn clone_new_index(&self, index: usize) -> Instruction {
        Instruction {
            operation: self.operation.clone(),
            index,
            comment: self.comment.clone(),
        }
    }
}

impl fmt::Display for Instruction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match &self.comment {
            Some(comment) => write!(f, "{:02} {} // {}", self.index, self.operation, comment),
            None => write!(f, "{:02} {}", self.index, self.operation),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_const, var};

    #[test]
    fn test_variable_written() {
        let assign = Operation::Assign {
            dst: var("x"),
            src: expr_const(1),
        };
        assert_eq!(assign.variable_written(), Some(&var("x")));
        assert_eq!(Operation::Nop.variable_written(), None);

        let assume = Operation::Assume(Constraint::le(expr_const(0), expr_const(1)));
        assert_eq!(assume.variable_written(), None);
    }

    #[test]
    fn test_display() {
        let mut instruction = Instruction::new(
            0,
            Operation::Assign {
                dst: var("x"),
                src: expr_const(5),
            },
        );
        assert_eq!(format!("{}", instruction), "00 x = 5");
        instruction.set_comment("init");
        assert_eq!(format!("{}", instruction), "00 x = 5 // init");
    }
}
