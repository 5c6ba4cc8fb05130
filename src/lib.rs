//! Kestrel: A Bytecode Analysis Framework in Rust.
//!
//! Kestrel is a framework in rust for implementing formal analyses over
//! bytecode programs. A quick synopsis of Kestrel's modules:
//!
//! * **analysis** - A weak-topological-order fixpoint engine with interleaved
//! widening/narrowing, and a relational zones domain (split difference-bound
//! matrices) to run it with.
//! * **il** - Kestrel's Intermediate Language: variables, linear expressions
//! and constraints, instructions, basic blocks, and the control flow graph.
//! * **num** - Arbitrary-precision numbers, extended bounds, and intervals.
//!
//! The usual entry point is `analysis::run_forward_analyzer`, which takes a
//! control flow graph and returns per-block pre- and post-invariants:
//!
//! ```
//! use kestrel::analysis::{self, zones::SplitDbm};
//! use kestrel::il;
//!
//! # fn example() -> Result<(), kestrel::Error> {
//! let entry = il::Label::new(0);
//! let exit = il::Label::new(1);
//! let mut cfg = il::ControlFlowGraph::new(entry, exit);
//! cfg.block_mut(entry)?.assign(il::var("x"), il::expr_const(5));
//! cfg.add_edge(entry, exit);
//!
//! let (_pre, post) = analysis::run_forward_analyzer::<SplitDbm>(&cfg)?;
//! println!("{}", post[&exit]);
//! # Ok(())
//! # }
//! ```

pub mod analysis;
pub mod error;
pub mod il;
pub mod num;

pub use crate::error::Error;
