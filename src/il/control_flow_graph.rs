//! A `ControlFlowGraph` is a directed graph of `Block` keyed by `Label`.
//!
//! # Entry and Exit
//! A `ControlFlowGraph` always has an entry and an exit block; both are
//! created on construction and can never be removed. The graph maintains the
//! edge symmetry invariant: `b` is a successor of `a` exactly when `a` is a
//! predecessor of `b`.

use crate::il::*;
use crate::Error;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

#[derive(Clone, Debug, Deserialize, Eq, PartialEq, Serialize)]
pub struct ControlFlowGraph {
    // The entry label for the graph.
    entry: Label,
    // The exit label for the graph.
    exit: Label,
    // Every block in the graph, keyed by label.
    blocks: BTreeMap<Label, Block>,
}

impl ControlFlowGraph {
    /// Creates a new `ControlFlowGraph` with blocks for the given entry and
    /// exit labels.
    pub fn new(entry: Label, exit: Label) -> ControlFlowGraph {
        let mut blocks = BTreeMap::new();
        blocks.insert(entry, Block::new(entry));
        blocks.insert(exit, Block::new(exit));
        ControlFlowGraph {
            entry,
            exit,
            blocks,
        }
    }

    /// The entry label for this `ControlFlowGraph`.
    pub fn entry(&self) -> Label {
        self.entry
    }

    /// The exit label for this `ControlFlowGraph`.
    pub fn exit(&self) -> Label {
        self.exit
    }

    /// Ensures a block with the given label exists, creating it if necessary.
    pub fn insert(&mut self, label: Label) -> &mut Block {
        self.blocks.entry(label).or_insert_with(|| Block::new(label))
    }

    /// Get a `Block` by label.
    pub fn block(&self, label: Label) -> Result<&Block, Error> {
        self.blocks.get(&label).ok_or(Error::BlockNotFound(label))
    }

    /// Get a mutable reference to a `Block` by label.
    pub fn block_mut(&mut self, label: Label) -> Result<&mut Block, Error> {
        self.blocks
            .get_mut(&label)
            .ok_or(Error::BlockNotFound(label))
    }

    /// Get every `Block` in this `ControlFlowGraph`, in label order.
    pub fn blocks(&self) -> impl Iterator<Item = &Block> {
        self.blocks.values()
    }

    /// All labels in this `ControlFlowGraph`, sorted.
    pub fn labels(&self) -> Vec<Label> {
        self.blocks.keys().cloned().collect()
    }

    pub fn num_blocks(&self) -> usize {
        self.blocks.len()
    }

    /// The successor labels of a block.
    pub fn successors(&self, label: Label) -> Result<&BTreeSet<Label>, Error> {
        Ok(self.block(label)?.successors())
    }

    /// The predecessor labels of a block.
    pub fn predecessors(&self, label: Label) -> Result<&BTreeSet<Label>, Error> {
        Ok(self.block(label)?.predecessors())
    }

    /// Records an edge from `head` to `tail`, creating blocks as needed.
    /// Idempotent.
    pub fn add_edge(&mut self, head: Label, tail: Label) {
        self.insert(head).insert_successor(tail);
        self.insert(tail).insert_predecessor(head);
    }

    /// Removes the edge from `head` to `tail` if it exists. Idempotent.
    pub fn remove_edge(&mut self, head: Label, tail: Label) {
        if let Some(block) = self.blocks.get_mut(&head) {
            block.remove_successor(tail);
        }
        if let Some(block) = self.blocks.get_mut(&tail) {
            block.remove_predecessor(head);
        }
    }

    /// Deletes a block and all of its edges.
    ///
    /// The entry and exit blocks cannot be removed.
    pub fn remove(&mut self, label: Label) -> Result<(), Error> {
        if label == self.entry || label == self.exit {
            return Err(Error::CannotRemoveBlock(label));
        }

        let block = self.blocks.get(&label).ok_or(Error::BlockNotFound(label))?;
        let predecessors: Vec<Label> = block.predecessors().iter().cloned().collect();
        let successors: Vec<Label> = block.successors().iter().cloned().collect();

        for predecessor in predecessors {
            self.remove_edge(predecessor, label);
        }
        for successor in successors {
            self.remove_edge(label, successor);
        }

        self.blocks.remove(&label);
        Ok(())
    }

    /// Depth-first traversal from the entry block. `f` is invoked once per
    /// reachable block, in pre-order; successors are visited in label order.
    pub fn dfs<F>(&self, mut f: F)
    where
        F: FnMut(&Block),
    {
        let mut visited = BTreeSet::new();
        self.dfs_rec(self.entry, &mut visited, &mut f);
    }

    fn dfs_rec<F>(&self, label: Label, visited: &mut BTreeSet<Label>, f: &mut F)
    where
        F: FnMut(&Block),
    {
        if !visited.insert(label) {
            return;
        }
        if let Some(block) = self.blocks.get(&label) {
            f(block);
            for successor in block.successors().iter().cloned().collect::<Vec<Label>>() {
                self.dfs_rec(successor, visited, f);
            }
        }
    }

    // Labels reachable from `start` by following successor edges.
    fn mark_alive_forward(&self, start: Label, alive: &mut BTreeSet<Label>) {
        if !alive.insert(start) {
            return;
        }
        if let Some(block) = self.blocks.get(&start) {
            for successor in block.successors().iter().cloned().collect::<Vec<Label>>() {
                self.mark_alive_forward(successor, alive);
            }
        }
    }

    // Labels reachable from `start` by following predecessor edges. This is
    // the reverse-view traversal: flipping successors and predecessors and
    // starting from the exit walks the reversed graph from its entry.
    fn mark_alive_backward(&self, start: Label, alive: &mut BTreeSet<Label>) {
        if !alive.insert(start) {
            return;
        }
        if let Some(block) = self.blocks.get(&start) {
            for predecessor in block.predecessors().iter().cloned().collect::<Vec<Label>>() {
                self.mark_alive_backward(predecessor, alive);
            }
        }
    }

    /// Removes all blocks that are not forward-reachable from the entry.
    ///
    /// Fails without modifying the graph if the exit would be removed.
    pub fn remove_unreachable_blocks(&mut self) -> Result<(), Error> {
        let mut alive = BTreeSet::new();
        self.mark_alive_forward(self.entry, &mut alive);

        if !alive.contains(&self.exit) {
            return Err(Error::ExitUnreachable);
        }

        for label in self.labels() {
            if !alive.contains(&label) {
                self.remove(label)?;
            }
        }
        Ok(())
    }

    /// Removes all blocks that cannot reach the exit.
    ///
    /// Fails without modifying the graph if the entry itself cannot reach the
    /// exit.
    pub fn remove_useless_blocks(&mut self) -> Result<(), Error> {
        let mut useful = BTreeSet::new();
        self.mark_alive_backward(self.exit, &mut useful);

        if !useful.contains(&self.entry) {
            return Err(Error::ExitUnreachable);
        }

        for label in self.labels() {
            if !useful.contains(&label) {
                self.remove(label)?;
            }
        }
        Ok(())
    }

    /// Merge `Block`s.
    ///
    /// When a block has only one successor, and that successor has only one
    /// predecessor, we merge both into one block. If the merged-away block
    /// was the exit, the surviving block becomes the new exit.
    pub fn simplify(&mut self) -> Result<(), Error> {
        let mut worklist: BTreeSet<Label> = self.labels().into_iter().collect();
        while let Some(label) = worklist.iter().next().cloned() {
            worklist.remove(&label);

            // This block will itself be merged into its parent; skip it and
            // let the parent pick up the chain.
            if self.block(label)?.in_degree() == 1 {
                let parent = self.single_predecessor(label)?;
                if self.block(parent)?.out_degree() == 1 && parent != label {
                    continue;
                }
            }

            while self.block(label)?.out_degree() == 1 {
                let next = self.single_successor(label)?;

                if next == label || next == self.entry || self.block(next)?.in_degree() != 1 {
                    break;
                }

                worklist.remove(&next);

                if next == self.exit {
                    self.exit = label;
                }

                let moved = std::mem::replace(self.block_mut(next)?.instructions_mut(), Vec::new());
                self.block_mut(label)?.append(moved);

                self.remove_edge(label, next);
                let children: Vec<Label> = self.block(next)?.successors().iter().cloned().collect();
                for child in children {
                    self.remove_edge(next, child);
                    self.add_edge(label, child);
                }

                self.remove(next)?;
            }
        }
        Ok(())
    }

    // Helpers

    fn single_successor(&self, label: Label) -> Result<Label, Error> {
        self.block(label)?
            .successors()
            .iter()
            .next()
            .cloned()
            .ok_or_else(|| Error::Analysis(format!("block {} has no successor", label)))
    }

    fn single_predecessor(&self, label: Label) -> Result<Label, Error> {
        self.block(label)?
            .predecessors()
            .iter()
            .next()
            .cloned()
            .ok_or_else(|| Error::Analysis(format!("block {} has no predecessor", label)))
    }
}

impl fmt::Display for ControlFlowGraph {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for block in self.blocks() {
            writeln!(f, "{}", block)?;
            for successor in block.successors() {
                writeln!(f, "edge {} -> {}", block.label(), successor)?;
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_const, var};

    fn label(index: usize) -> Label {
        Label::new(index)
    }

    #[test]
    fn test_edge_symmetry() {
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(3));

        assert!(cfg.successors(label(0)).unwrap().contains(&label(1)));
        assert!(cfg.predecessors(label(1)).unwrap().contains(&label(0)));

        cfg.remove_edge(label(0), label(1));
        assert!(!cfg.successors(label(0)).unwrap().contains(&label(1)));
        assert!(!cfg.predecessors(label(1)).unwrap().contains(&label(0)));

        // idempotent
        cfg.remove_edge(label(0), label(1));
        cfg.add_edge(label(1), label(3));
        assert_eq!(cfg.block(label(3)).unwrap().in_degree(), 1);
    }

    #[test]
    fn test_cannot_remove_entry_or_exit() {
        let mut cfg = ControlFlowGraph::new(label(0), label(1));
        assert!(cfg.remove(label(0)).is_err());
        assert!(cfg.remove(label(1)).is_err());
    }

    #[test]
    fn test_remove_block_detaches_edges() {
        let mut cfg = ControlFlowGraph::new(label(0), label(2));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));

        cfg.remove(label(1)).unwrap();
        assert!(cfg.block(label(1)).is_err());
        assert!(cfg.successors(label(0)).unwrap().is_empty());
        assert!(cfg.predecessors(label(2)).unwrap().is_empty());
    }

    #[test]
    fn test_dfs_pre_order() {
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(0), label(2));
        cfg.add_edge(label(1), label(3));
        cfg.add_edge(label(2), label(3));

        let mut order = Vec::new();
        cfg.dfs(|block| order.push(block.label()));
        assert_eq!(order, vec![label(0), label(1), label(3), label(2)]);
    }

    #[test]
    fn test_remove_unreachable_blocks() {
        let mut cfg = ControlFlowGraph::new(label(0), label(1));
        cfg.add_edge(label(0), label(1));
        // C -> D dangle off the graph, unreachable from the entry
        cfg.add_edge(label(2), label(3));
        cfg.add_edge(label(3), label(1));

        cfg.remove_unreachable_blocks().unwrap();

        assert_eq!(cfg.labels(), vec![label(0), label(1)]);
    }

    #[test]
    fn test_remove_unreachable_blocks_requires_live_exit() {
        let mut cfg = ControlFlowGraph::new(label(0), label(1));
        // no edge from entry to exit
        cfg.add_edge(label(0), label(2));
        assert_eq!(cfg.remove_unreachable_blocks(), Err(Error::ExitUnreachable));
    }

    #[test]
    fn test_remove_useless_blocks() {
        let mut cfg = ControlFlowGraph::new(label(0), label(1));
        cfg.add_edge(label(0), label(1));
        // a dead end that cannot reach the exit
        cfg.add_edge(label(0), label(2));

        cfg.remove_useless_blocks().unwrap();
        assert_eq!(cfg.labels(), vec![label(0), label(1)]);
    }

    #[test]
    fn test_simplify_merges_chain() {
        let mut cfg = ControlFlowGraph::new(label(0), label(2));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));

        cfg.block_mut(label(0)).unwrap().assign(var("x"), expr_const(1));
        cfg.block_mut(label(1)).unwrap().assign(var("y"), expr_const(2));
        cfg.block_mut(label(2)).unwrap().assign(var("z"), expr_const(3));

        cfg.simplify().unwrap();

        // everything collapses into the entry block, which becomes the exit
        assert_eq!(cfg.labels(), vec![label(0)]);
        assert_eq!(cfg.exit(), label(0));
        let block = cfg.block(label(0)).unwrap();
        assert_eq!(block.instructions().len(), 3);
        assert_eq!(
            block
                .instructions()
                .iter()
                .map(|i| i.index())
                .collect::<Vec<usize>>(),
            vec![0, 1, 2]
        );
    }

    #[test]
    fn test_simplify_keeps_branches() {
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(0), label(2));
        cfg.add_edge(label(1), label(3));
        cfg.add_edge(label(2), label(3));

        cfg.simplify().unwrap();

        // the diamond has no in/out-degree-1 chain to merge
        assert_eq!(cfg.num_blocks(), 4);
    }
}
