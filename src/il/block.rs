//! A `Block` is a linear sequence of `Instruction`.
//!
//! A `Block` belongs to a `ControlFlowGraph`, which keys it by `Label` and
//! keeps the predecessor and successor sets of all blocks symmetric.
//!
//! When building a series of `Instruction`, we normally do so by calling the
//! relevant method directly on the block where we wish to add the
//! `Instruction`.
//!
//! To create a `Block`, call `ControlFlowGraph::insert`.

use crate::il::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::fmt;

/// An opaque, totally ordered identifier for a basic block.
#[derive(
    Clone, Copy, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize,
)]
pub struct Label(usize);

impl Label {
    pub fn new(index: usize) -> Label {
        Label(index)
    }

    pub fn index(&self) -> usize {
        self.0
    }
}

impl fmt::Display for Label {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A basic block in Kestrel IL.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Block {
    /// The label of the block, immutable after creation.
    label: Label,
    /// An internal counter for the next block-unique instruction.
    next_instruction_index: usize,
    /// The instructions for this block.
    instructions: Vec<Instruction>,
    /// The labels of this block's predecessors.
    predecessors: BTreeSet<Label>,
    /// The labels of this block's successors.
    successors: BTreeSet<Label>,
}

impl Block {
    pub(crate) fn new(label: Label) -> Block {
        Block {
            label,
            next_instruction_index: 0,
            instructions: Vec::new(),
            predecessors: BTreeSet::new(),
            successors: BTreeSet::new(),
        }
    }

    fn new_instruction_index(&mut self) -> usize {
        let instruction_index = self.next_instruction_index;
        self.next_instruction_index = instruction_index + 1;
        instruction_index
    }

    fn push(&mut self, instruction: Instruction) {
        self.instructions.push(instruction);
    }

    /// Returns the label of this `Block`.
    pub fn label(&self) -> Label {
        self.label
    }

    /// Returns instructions for this `Block`.
    pub fn instructions(&self) -> &[Instruction] {
        &self.instructions
    }

    /// Returns a mutable reference to the instructions for this `Block`.
    pub fn instructions_mut(&mut self) -> &mut Vec<Instruction> {
        &mut self.instructions
    }

    /// Returns true if this `Block` is empty, meaning it has no `Instruction`.
    pub fn is_empty(&self) -> bool {
        self.instructions.is_empty()
    }

    /// The labels of this block's predecessors.
    pub fn predecessors(&self) -> &BTreeSet<Label> {
        &self.predecessors
    }

    /// The labels of this block's successors.
    pub fn successors(&self) -> &BTreeSet<Label> {
        &self.successors
    }

    pub fn in_degree(&self) -> usize {
        self.predecessors.len()
    }

    pub fn out_degree(&self) -> usize {
        self.successors.len()
    }

    pub(crate) fn insert_successor(&mut self, label: Label) {
        self.successors.insert(label);
    }

    pub(crate) fn insert_predecessor(&mut self, label: Label) {
        self.predecessors.insert(label);
    }

    pub(crate) fn remove_successor(&mut self, label: Label) {
        self.successors.remove(&label);
    }

    pub(crate) fn remove_predecessor(&mut self, label: Label) {
        self.predecessors.remove(&label);
    }

    /// Appends instructions to this `Block`.
    ///
    /// Instruction indices are updated accordingly.
    pub fn append(&mut self, instructions: Vec<Instruction>) {
        for instruction in instructions {
            let index = self.new_instruction_index();
            self.instructions.push(instruction.clone_new_index(index));
        }
    }

    /// Adds an assignment to the end of this block.
    pub fn assign<E>(&mut self, dst: Variable, src: E)
    where
        E: Into<LinearExpression>,
    {
        let index = self.new_instruction_index();
        self.push(Instruction::new(
            index,
            Operation::Assign {
                dst,
                src: src.into(),
            },
        ));
    }

    /// Adds an arithmetic binary operation to the end of this block.
    pub fn apply_arith<O>(&mut self, op: ArithOp, dst: Variable, lhs: Variable, rhs: O)
    where
        O: Into<Operand>,
    {
        let index = self.new_instruction_index();
        self.push(Instruction::new(
            index,
            Operation::ApplyArith {
                op,
                dst,
                lhs,
                rhs: rhs.into(),
            },
        ));
    }

    /// Adds a bitwise binary operation to the end of this block.
    pub fn apply_bitwise<O>(&mut self, op: BitwiseOp, dst: Variable, lhs: Variable, rhs: O)
    where
        O: Into<Operand>,
    {
        let index = self.new_instruction_index();
        self.push(Instruction::new(
            index,
            Operation::ApplyBitwise {
                op,
                dst,
                lhs,
                rhs: rhs.into(),
            },
        ));
    }

    /// Adds an assumption to the end of this block.
    pub fn assume(&mut self, constraint: Constraint) {
        let index = self.new_instruction_index();
        self.push(Instruction::new(index, Operation::Assume(constraint)));
    }

    /// Adds an explicated assertion to the end of this block.
    pub fn assertion(&mut self, constraint: Constraint) {
        let index = self.new_instruction_index();
        self.push(Instruction::new(index, Operation::Assert(constraint)));
    }

    /// Adds a havoc operation to the end of this block.
    pub fn havoc(&mut self, dst: Variable) {
        let index = self.new_instruction_index();
        self.push(Instruction::new(index, Operation::Havoc(dst)));
    }

    /// Adds a nop operation to the end of this block.
    pub fn nop(&mut self) {
        let index = self.new_instruction_index();
        self.push(Instruction::new(index, Operation::Nop));
    }
}

impl fmt::Display for Block {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "[ Block: {} ]", self.label)?;
        for instruction in self.instructions() {
            writeln!(f, "{}", instruction)?;
        }
        Ok(())
    }
}
