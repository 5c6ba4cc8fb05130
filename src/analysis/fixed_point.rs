//! A fixed-point engine for forward abstract interpretation.
//!
//! The engine walks the weak topological order of a control flow graph and
//! interleaves widening and narrowing at loop heads: every cycle is iterated
//! with an increasing (widening) phase until a post-fixpoint is reached,
//! then refined with a decreasing (narrowing) phase. Nested cycles are
//! stabilized from the innermost outwards.

use crate::analysis::wto::{Component, Cycle, Wto};
use crate::il;
use crate::Error;
use std::collections::BTreeMap;
use std::fmt::{Debug, Display};

/// Number of join iterations on a loop head before widening kicks in.
const DEFAULT_WIDENING_DELAY: usize = 1;

/// An abstract domain the fixpoint engine can drive.
///
/// Lattice operations consume the left operand; join/meet/widen/narrow
/// produce new values and leave the right operand valid.
pub trait Domain: Clone + Debug + Display {
    /// The infeasible state.
    fn bottom() -> Self;

    /// The state modelling the program's initial input assumptions.
    fn setup_entry() -> Self;

    /// Partial order: does `other` over-approximate `self`?
    fn le(&self, other: &Self) -> bool;

    fn join(self, other: &Self) -> Self;

    fn meet(self, other: &Self) -> Self;

    /// Extrapolation; guarantees termination of increasing iteration.
    fn widen(self, other: &Self) -> Self;

    /// Refinement of a post-widening result. A no-op narrowing is sound.
    fn narrow(self, other: &Self) -> Self;

    /// Applies a single instruction to the state.
    fn transfer(self, instruction: &il::Instruction) -> Self;
}

/// Per-block invariants computed by the fixpoint.
pub type InvariantTable<D> = BTreeMap<il::Label, D>;

/// Runs the forward analyzer over a control flow graph, returning the pre-
/// and post-invariant tables.
pub fn run_forward_analyzer<D: Domain>(
    cfg: &il::ControlFlowGraph,
) -> Result<(InvariantTable<D>, InvariantTable<D>), Error> {
    run_forward_analyzer_options(cfg, DEFAULT_WIDENING_DELAY)
}

/// Runs the forward analyzer with an explicit widening delay.
pub fn run_forward_analyzer_options<D: Domain>(
    cfg: &il::ControlFlowGraph,
    widening_delay: usize,
) -> Result<(InvariantTable<D>, InvariantTable<D>), Error> {
    let wto = Wto::new(cfg)?;

    let mut iterator = InterleavedFixedPointIterator::new(cfg, widening_delay);
    for component in wto.components() {
        iterator.visit_component(&wto, component)?;
    }
    Ok((iterator.pre, iterator.post))
}

struct InterleavedFixedPointIterator<'c, D: Domain> {
    cfg: &'c il::ControlFlowGraph,
    pre: InvariantTable<D>,
    post: InvariantTable<D>,
    // number of iterations until triggering widening
    widening_delay: usize,
    // used to skip the analysis until the entry is found
    skip: bool,
}

impl<'c, D: Domain> InterleavedFixedPointIterator<'c, D> {
    fn new(cfg: &'c il::ControlFlowGraph, widening_delay: usize) -> Self {
        let mut pre = InvariantTable::new();
        let mut post = InvariantTable::new();
        for label in cfg.labels() {
            pre.insert(label, D::bottom());
            post.insert(label, D::bottom());
        }
        pre.insert(cfg.entry(), D::setup_entry());
        InterleavedFixedPointIterator {
            cfg,
            pre,
            post,
            widening_delay,
            skip: true,
        }
    }

    fn get_pre(&self, label: il::Label) -> D {
        self.pre.get(&label).cloned().unwrap_or_else(D::bottom)
    }

    fn get_post(&self, label: il::Label) -> D {
        self.post.get(&label).cloned().unwrap_or_else(D::bottom)
    }

    fn set_pre(&mut self, label: il::Label, state: D) {
        self.pre.insert(label, state);
    }

    fn transform_to_post(&mut self, label: il::Label, pre: D) -> Result<(), Error> {
        let mut state = pre;
        for instruction in self.cfg.block(label)?.instructions() {
            state = state.transfer(instruction);
        }
        self.post.insert(label, state);
        Ok(())
    }

    fn join_all_prevs(&self, label: il::Label) -> Result<D, Error> {
        let mut result = D::bottom();
        for prev in self.cfg.predecessors(label)? {
            result = result.join(&self.get_post(*prev));
        }
        Ok(result)
    }

    fn extrapolate(&self, iteration: usize, before: D, after: &D) -> D {
        if iteration <= self.widening_delay {
            before.join(after)
        } else {
            before.widen(after)
        }
    }

    fn refine(iteration: usize, before: D, after: &D) -> D {
        if iteration == 1 {
            before.meet(after)
        } else {
            before.narrow(after)
        }
    }

    fn visit_component(&mut self, wto: &Wto, component: &Component) -> Result<(), Error> {
        match component {
            Component::Vertex(label) => self.visit_vertex(*label),
            Component::Cycle(cycle) => self.visit_cycle(wto, cycle),
        }
    }

    fn visit_vertex(&mut self, label: il::Label) -> Result<(), Error> {
        // decide whether to skip the vertex or not
        if self.skip && label == self.cfg.entry() {
            self.skip = false;
        }
        if self.skip {
            return Ok(());
        }

        let pre = if label == self.cfg.entry() {
            self.get_pre(label)
        } else {
            self.join_all_prevs(label)?
        };

        self.set_pre(label, pre.clone());
        self.transform_to_post(label, pre)
    }

    fn visit_cycle(&mut self, wto: &Wto, cycle: &Cycle) -> Result<(), Error> {
        let head = cycle.head();

        // We only skip the analysis of a cycle if the entry is not a
        // component of it, nested components included.
        let mut entry_in_this_cycle = false;
        if self.skip {
            entry_in_this_cycle = cycle.contains(self.cfg.entry());
            self.skip = !entry_in_this_cycle;
            if self.skip {
                return Ok(());
            }
        }

        let mut pre = if entry_in_this_cycle {
            self.get_pre(self.cfg.entry())
        } else {
            // Seed with the out-of-cycle predecessors of the head: back
            // edges from inside the loop are strictly deeper in the nesting
            // and excluded.
            let cycle_nesting = wto.nesting(head);
            let mut pre = D::bottom();
            for prev in self.cfg.predecessors(head)? {
                if !wto.nesting(*prev).is_deeper_than(&cycle_nesting) {
                    pre = pre.join(&self.get_post(*prev));
                }
            }
            pre
        };

        // Increasing iteration sequence with widening.
        let mut iteration: usize = 1;
        loop {
            cycle.increment_fixpo_visits();

            self.set_pre(head, pre.clone());
            self.transform_to_post(head, pre.clone())?;
            for component in cycle.components() {
                self.visit_component(wto, component)?;
            }

            let new_pre = self.join_all_prevs(head)?;
            if new_pre.le(&pre) {
                // Post-fixpoint reached.
                self.set_pre(head, new_pre.clone());
                pre = new_pre;
                break;
            } else {
                pre = self.extrapolate(iteration, pre, &new_pre);
            }
            iteration += 1;
        }

        // Decreasing iteration sequence with narrowing.
        let mut iteration: usize = 1;
        loop {
            self.transform_to_post(head, pre.clone())?;
            for component in cycle.components() {
                self.visit_component(wto, component)?;
            }

            let new_pre = self.join_all_prevs(head)?;
            if pre.le(&new_pre) {
                // No more refinement possible.
                break;
            } else {
                pre = Self::refine(iteration, pre, &new_pre);
                self.set_pre(head, pre.clone());
            }
            iteration += 1;
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::zones::SplitDbm;
    use crate::il::{expr_const, expr_var, var, Constraint, ControlFlowGraph, Label};
    use crate::num::{Bound, Interval, Number};

    fn label(index: usize) -> Label {
        Label::new(index)
    }

    #[test]
    fn test_straight_line() {
        // entry -> B -> exit with x := 5; y := x + 3
        let mut cfg = ControlFlowGraph::new(label(0), label(2));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        let block = cfg.block_mut(label(1)).unwrap();
        block.assign(var("x"), expr_const(5));
        block.assign(var("y"), expr_var("x") + expr_const(3));

        let (pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        let exit_post = &post[&label(2)];
        assert!(!exit_post.is_bottom());
        assert_eq!(
            exit_post.get_interval(&var("x")),
            Interval::number(Number::from(5))
        );
        assert_eq!(
            exit_post.get_interval(&var("y")),
            Interval::number(Number::from(8))
        );

        assert!(pre[&label(0)].is_top());
    }

    #[test]
    fn test_loop_with_widening() {
        // entry -> H, H -> B, B -> H, H -> exit
        // i := 0 at the entry, i := i + 1 in the body.
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        cfg.add_edge(label(2), label(1));
        cfg.add_edge(label(1), label(3));

        cfg.block_mut(label(0)).unwrap().assign(var("i"), expr_const(0));
        cfg.block_mut(label(2))
            .unwrap()
            .assign(var("i"), expr_var("i") + expr_const(1));

        let (pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        // i >= 0 with no finite upper bound, at the head and at the exit
        let head_pre = &pre[&label(1)];
        let head_i = head_pre.get_interval(&var("i"));
        assert_eq!(*head_i.lb(), Bound::from(0));
        assert_eq!(*head_i.ub(), Bound::PlusInfinity);

        let exit_post = &post[&label(3)];
        assert!(!exit_post.is_bottom());
        let exit_i = exit_post.get_interval(&var("i"));
        assert_eq!(*exit_i.lb(), Bound::from(0));
        assert_eq!(*exit_i.ub(), Bound::PlusInfinity);
    }

    #[test]
    fn test_branch_join_loses_relation() {
        //        +-> 1 (x=1, y=2) -+
        // 0 ----+                   +--> 3
        //        +-> 2 (x=2, y=1) -+
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(0), label(2));
        cfg.add_edge(label(1), label(3));
        cfg.add_edge(label(2), label(3));

        let b1 = cfg.block_mut(label(1)).unwrap();
        b1.assign(var("x"), expr_const(1));
        b1.assign(var("y"), expr_const(2));
        let b2 = cfg.block_mut(label(2)).unwrap();
        b2.assign(var("x"), expr_const(2));
        b2.assign(var("y"), expr_const(1));

        let (_pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        let merged = &post[&label(3)];
        assert_eq!(merged.get_interval(&var("x")), Interval::new(1, 2));
        assert_eq!(merged.get_interval(&var("y")), Interval::new(1, 2));
        // x + y = 3 is not expressible in a difference-bound domain
        assert!(merged.get_interval(&var("x")).singleton().is_none());
    }

    #[test]
    fn test_assume_guards_branches() {
        // 0: x := 7
        // 1: assume x <= 5   -> 3 (unreachable)
        // 2: assume x >= 6   -> 3
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(0), label(2));
        cfg.add_edge(label(1), label(3));
        cfg.add_edge(label(2), label(3));

        cfg.block_mut(label(0)).unwrap().assign(var("x"), expr_const(7));
        cfg.block_mut(label(1))
            .unwrap()
            .assume(Constraint::le(expr_var("x"), expr_const(5)));
        cfg.block_mut(label(2))
            .unwrap()
            .assume(Constraint::ge(expr_var("x"), expr_const(6)));

        let (_pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        assert!(post[&label(1)].is_bottom());
        assert!(!post[&label(2)].is_bottom());
        assert_eq!(
            post[&label(3)].get_interval(&var("x")),
            Interval::number(Number::from(7))
        );
    }

    #[test]
    fn test_cleanup_preserves_invariants() {
        // A graph with an unreachable diamond hanging off the side; pruning
        // it must not change the invariants of surviving blocks.
        let mut cfg = ControlFlowGraph::new(label(0), label(1));
        cfg.add_edge(label(0), label(1));
        cfg.block_mut(label(0)).unwrap().assign(var("x"), expr_const(3));
        // unreachable: 4 -> 5 -> 1
        cfg.add_edge(label(4), label(5));
        cfg.add_edge(label(5), label(1));

        let (pre_before, post_before) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        cfg.remove_unreachable_blocks().unwrap();
        cfg.remove_useless_blocks().unwrap();
        let (pre_after, post_after) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();

        for label in cfg.labels() {
            assert!(pre_before[&label].le(&pre_after[&label]));
            assert!(pre_after[&label].le(&pre_before[&label]));
            assert!(post_before[&label].le(&post_after[&label]));
            assert!(post_after[&label].le(&post_before[&label]));
        }
    }

    #[test]
    fn test_simplify_preserves_post_states() {
        let mut cfg = ControlFlowGraph::new(label(0), label(2));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        cfg.block_mut(label(0)).unwrap().assign(var("x"), expr_const(1));
        cfg.block_mut(label(1))
            .unwrap()
            .assign(var("y"), expr_var("x") + expr_const(1));
        cfg.block_mut(label(2))
            .unwrap()
            .assign(var("z"), expr_var("y") + expr_const(1));

        let (_pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();
        let original_exit = post[&label(2)].clone();

        cfg.simplify().unwrap();
        assert_eq!(cfg.labels(), vec![label(0)]);

        let (_pre, post) = run_forward_analyzer::<SplitDbm>(&cfg).unwrap();
        let merged = &post[&label(0)];
        assert!(merged.le(&original_exit));
        assert!(original_exit.le(merged));
    }

    #[test]
    fn test_widening_delay_still_terminates() {
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        cfg.add_edge(label(2), label(1));
        cfg.add_edge(label(1), label(3));

        cfg.block_mut(label(0)).unwrap().assign(var("i"), expr_const(0));
        cfg.block_mut(label(2))
            .unwrap()
            .assign(var("i"), expr_var("i") + expr_const(1));

        let (_pre, post) = run_forward_analyzer_options::<SplitDbm>(&cfg, 3).unwrap();
        let exit_i = post[&label(3)].get_interval(&var("i"));
        assert_eq!(*exit_i.lb(), Bound::from(0));
    }
}
