//! A directed graph with integer edge weights.
//!
//! This is the constraint store of the zones domain. Vertices are dense
//! non-negative ids; freed ids are recycled by `new_vertex`. An edge
//! `u -> v` with weight `w` encodes the constraint `v - u <= w`. Vertex `0`
//! is reserved by the domain as the zero/origin vertex, so edges to and from
//! it encode unary bounds.

use crate::num::number::Weight;
use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

pub type VertId = usize;

#[derive(Clone, Debug, Default, Deserialize, Eq, PartialEq, Serialize)]
pub struct WeightGraph {
    // Per-vertex successor map, keyed by destination, holding the weight.
    succs: Vec<BTreeMap<VertId, Weight>>,
    // Per-vertex predecessor set. Weights live in `succs` only.
    preds: Vec<BTreeSet<VertId>>,
    // Recycled vertex ids.
    free: Vec<VertId>,
    is_free: Vec<bool>,
}

impl WeightGraph {
    pub fn new() -> WeightGraph {
        WeightGraph::default()
    }

    /// The number of vertex slots, including freed ones.
    pub fn size(&self) -> usize {
        self.succs.len()
    }

    /// Allocates a vertex, recycling a freed id if one is available.
    pub fn new_vertex(&mut self) -> VertId {
        if let Some(vert) = self.free.pop() {
            self.is_free[vert] = false;
            vert
        } else {
            self.succs.push(BTreeMap::new());
            self.preds.push(BTreeSet::new());
            self.is_free.push(false);
            self.succs.len() - 1
        }
    }

    /// Grows the graph so ids `0..size` are all live vertices.
    pub fn grow_to(&mut self, size: usize) {
        while self.succs.len() < size {
            self.succs.push(BTreeMap::new());
            self.preds.push(BTreeSet::new());
            self.is_free.push(false);
        }
    }

    pub fn is_vertex(&self, vert: VertId) -> bool {
        vert < self.size() && !self.is_free[vert]
    }

    /// Removes all edges of a vertex and recycles its id.
    pub fn forget(&mut self, vert: VertId) {
        if !self.is_vertex(vert) {
            return;
        }
        let successors: Vec<VertId> = self.succs[vert].keys().cloned().collect();
        for successor in successors {
            self.preds[successor].remove(&vert);
        }
        let predecessors: Vec<VertId> = self.preds[vert].iter().cloned().collect();
        for predecessor in predecessors {
            self.succs[predecessor].remove(&vert);
        }
        self.succs[vert].clear();
        self.preds[vert].clear();
        self.is_free[vert] = true;
        self.free.push(vert);
    }

    /// All live vertex ids, in increasing order.
    pub fn verts(&self) -> impl Iterator<Item = VertId> + '_ {
        (0..self.size()).filter(move |&v| !self.is_free[v])
    }

    pub fn lookup(&self, src: VertId, dst: VertId) -> Option<Weight> {
        self.succs.get(src)?.get(&dst).cloned()
    }

    pub fn elem(&self, src: VertId, dst: VertId) -> bool {
        self.lookup(src, dst).is_some()
    }

    /// Inserts or overwrites the edge `src -> dst`.
    pub fn set_edge(&mut self, src: VertId, weight: Weight, dst: VertId) {
        self.succs[src].insert(dst, weight);
        self.preds[dst].insert(src);
    }

    /// Inserts the edge `src -> dst`. The edge must not already exist.
    pub fn add_edge(&mut self, src: VertId, weight: Weight, dst: VertId) {
        self.set_edge(src, weight, dst);
    }

    /// Inserts the edge `src -> dst`, keeping the minimum weight if the edge
    /// already exists.
    pub fn update_edge(&mut self, src: VertId, weight: Weight, dst: VertId) {
        match self.lookup(src, dst) {
            Some(existing) if existing <= weight => {}
            _ => self.set_edge(src, weight, dst),
        }
    }

    pub fn remove_edge(&mut self, src: VertId, dst: VertId) {
        if src < self.size() {
            self.succs[src].remove(&dst);
            self.preds[dst].remove(&src);
        }
    }

    /// Successors of `vert` with edge weights, in id order.
    pub fn succs_of(&self, vert: VertId) -> impl Iterator<Item = (VertId, Weight)> + '_ {
        self.succs[vert].iter().map(|(&dst, &weight)| (dst, weight))
    }

    /// Predecessors of `vert` with edge weights, in id order.
    pub fn preds_of(&self, vert: VertId) -> impl Iterator<Item = (VertId, Weight)> + '_ {
        self.preds[vert]
            .iter()
            .map(move |&src| (src, self.succs[src][&vert]))
    }

    pub fn out_degree(&self, vert: VertId) -> usize {
        self.succs[vert].len()
    }

    pub fn in_degree(&self, vert: VertId) -> usize {
        self.preds[vert].len()
    }

    pub fn num_edges(&self) -> usize {
        self.succs.iter().map(|successors| successors.len()).sum()
    }
}

/// A borrowed view of a `WeightGraph` that hides one vertex, typically the
/// zero vertex. The view never outlives the operation that created it.
pub struct SubGraph<'g> {
    graph: &'g WeightGraph,
    excluded: VertId,
}

impl<'g> SubGraph<'g> {
    pub fn new(graph: &'g WeightGraph, excluded: VertId) -> SubGraph<'g> {
        SubGraph { graph, excluded }
    }

    pub fn verts(&self) -> impl Iterator<Item = VertId> + '_ {
        let excluded = self.excluded;
        self.graph.verts().filter(move |&v| v != excluded)
    }

    pub fn lookup(&self, src: VertId, dst: VertId) -> Option<Weight> {
        if src == self.excluded || dst == self.excluded {
            return None;
        }
        self.graph.lookup(src, dst)
    }

    pub fn succs_of(&self, vert: VertId) -> impl Iterator<Item = (VertId, Weight)> + '_ {
        let excluded = self.excluded;
        self.graph
            .succs_of(vert)
            .filter(move |&(dst, _)| dst != excluded)
    }

    pub fn preds_of(&self, vert: VertId) -> impl Iterator<Item = (VertId, Weight)> + '_ {
        let excluded = self.excluded;
        self.graph
            .preds_of(vert)
            .filter(move |&(src, _)| src != excluded)
    }
}

/// A borrowed view of a `WeightGraph` through a vertex renaming.
///
/// View id `i` maps to parent id `perm[i]`; `None` entries are vertices with
/// no counterpart in the parent, and have no edges. The view never outlives
/// the operation that created it.
pub struct PermView<'g> {
    graph: &'g WeightGraph,
    perm: Vec<Option<VertId>>,
    inv: FxHashMap<VertId, VertId>,
}

impl<'g> PermView<'g> {
    pub fn new(graph: &'g WeightGraph, perm: Vec<Option<VertId>>) -> PermView<'g> {
        let mut inv = FxHashMap::default();
        for (view_id, parent_id) in perm.iter().enumerate() {
            if let Some(parent_id) = parent_id {
                inv.insert(*parent_id, view_id);
            }
        }
        PermView { graph, perm, inv }
    }

    pub fn size(&self) -> usize {
        self.perm.len()
    }

    pub fn lookup(&self, src: VertId, dst: VertId) -> Option<Weight> {
        let src = (*self.perm.get(src)?)?;
        let dst = (*self.perm.get(dst)?)?;
        self.graph.lookup(src, dst)
    }

    pub fn succs_of(&self, vert: VertId) -> Vec<(VertId, Weight)> {
        match self.perm.get(vert) {
            Some(Some(parent)) => self
                .graph
                .succs_of(*parent)
                .filter_map(|(dst, weight)| self.inv.get(&dst).map(|&view| (view, weight)))
                .collect(),
            _ => Vec::new(),
        }
    }

    pub fn preds_of(&self, vert: VertId) -> Vec<(VertId, Weight)> {
        match self.perm.get(vert) {
            Some(Some(parent)) => self
                .graph
                .preds_of(*parent)
                .filter_map(|(src, weight)| self.inv.get(&src).map(|&view| (view, weight)))
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Copies the view into an owned graph of the same size.
    pub fn materialize(&self) -> WeightGraph {
        let mut graph = WeightGraph::new();
        graph.grow_to(self.size());
        for src in 0..self.size() {
            for (dst, weight) in self.succs_of(src) {
                graph.add_edge(src, weight, dst);
            }
        }
        graph
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_vertex_recycling() {
        let mut g = WeightGraph::new();
        let v0 = g.new_vertex();
        let v1 = g.new_vertex();
        let v2 = g.new_vertex();
        assert_eq!((v0, v1, v2), (0, 1, 2));

        g.add_edge(v1, 5, v2);
        g.forget(v1);
        assert!(!g.is_vertex(v1));
        assert!(g.lookup(v1, v2).is_none());
        assert_eq!(g.in_degree(v2), 0);

        // freed slot is reused
        assert_eq!(g.new_vertex(), v1);
        assert_eq!(g.verts().collect::<Vec<VertId>>(), vec![0, 1, 2]);
    }

    #[test]
    fn test_update_edge_keeps_minimum() {
        let mut g = WeightGraph::new();
        g.grow_to(2);
        g.update_edge(0, 5, 1);
        g.update_edge(0, 7, 1);
        assert_eq!(g.lookup(0, 1), Some(5));
        g.update_edge(0, 3, 1);
        assert_eq!(g.lookup(0, 1), Some(3));
    }

    #[test]
    fn test_sub_graph_hides_vertex() {
        let mut g = WeightGraph::new();
        g.grow_to(3);
        g.add_edge(0, 1, 1);
        g.add_edge(1, 2, 2);
        g.add_edge(2, 3, 0);

        let sub = SubGraph::new(&g, 0);
        assert_eq!(sub.verts().collect::<Vec<VertId>>(), vec![1, 2]);
        assert_eq!(sub.lookup(1, 2), Some(2));
        assert_eq!(sub.lookup(0, 1), None);
        assert_eq!(sub.succs_of(2).count(), 0);
        assert_eq!(sub.preds_of(1).count(), 0);
    }

    #[test]
    fn test_perm_view_renames() {
        let mut g = WeightGraph::new();
        g.grow_to(4);
        g.add_edge(2, 7, 3);

        // view: 0 -> 0, 1 -> 2, 2 -> 3
        let view = PermView::new(&g, vec![Some(0), Some(2), Some(3)]);
        assert_eq!(view.lookup(1, 2), Some(7));
        assert_eq!(view.succs_of(1), vec![(2, 7)]);
        assert_eq!(view.preds_of(2), vec![(1, 7)]);

        let materialized = view.materialize();
        assert_eq!(materialized.lookup(1, 2), Some(7));
        assert_eq!(materialized.num_edges(), 1);
    }
}
