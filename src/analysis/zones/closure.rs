//! Shortest-path closure primitives for the zones domain.
//!
//! All routines work with a potential function: a per-vertex price such that
//! every edge `u -> v` with weight `w` satisfies
//! `potential[u] + w - potential[v] >= 0`. Reweighted edge costs are then
//! non-negative, so closure can run Dijkstra instead of Bellman-Ford.

use super::weight_graph::{VertId, WeightGraph};
use crate::num::number::Weight;
use rustc_hash::FxHashMap;
use std::cmp::Reverse;
use std::collections::{BTreeSet, BinaryHeap};

/// Edges produced by a closure pass, applied later with `apply_delta`.
pub type EdgeVec = Vec<(VertId, VertId, Weight)>;

// Weight sums saturate towards the weak side: an edge weight that saturates
// high merely encodes a constraint with no information.
fn wadd(a: Weight, b: Weight) -> Weight {
    a.saturating_add(b)
}

fn wsub(a: Weight, b: Weight) -> Weight {
    a.saturating_sub(b)
}

pub fn apply_delta(graph: &mut WeightGraph, delta: &EdgeVec) {
    for &(src, dst, weight) in delta {
        graph.update_edge(src, weight, dst);
    }
}

/// Pointwise minimum of the edges of two graphs over `0..size`.
pub fn meet_graphs(gx: &WeightGraph, gy: &WeightGraph, size: usize) -> WeightGraph {
    let mut graph = WeightGraph::new();
    graph.grow_to(size);
    for src in gx.verts() {
        for (dst, weight) in gx.succs_of(src) {
            graph.update_edge(src, weight, dst);
        }
    }
    for src in gy.verts() {
        for (dst, weight) in gy.succs_of(src) {
            graph.update_edge(src, weight, dst);
        }
    }
    graph
}

/// Pointwise maximum of the edges common to two graphs.
pub fn join_graphs(gx: &WeightGraph, gy: &WeightGraph, size: usize) -> WeightGraph {
    let mut graph = WeightGraph::new();
    graph.grow_to(size);
    for src in gx.verts() {
        for (dst, wx) in gx.succs_of(src) {
            if let Some(wy) = gy.lookup(src, dst) {
                graph.add_edge(src, wx.max(wy), dst);
            }
        }
    }
    graph
}

/// Widening: keep an edge of `gx` only if `gy` entails it with the same or a
/// tighter weight. Source vertices of dropped edges are marked unstable,
/// since their outgoing closure may now be broken.
pub fn widen_graphs(
    gx: &WeightGraph,
    gy: &WeightGraph,
    size: usize,
    unstable: &mut BTreeSet<VertId>,
) -> WeightGraph {
    let mut graph = WeightGraph::new();
    graph.grow_to(size);
    for src in gx.verts() {
        for (dst, wx) in gx.succs_of(src) {
            match gy.lookup(src, dst) {
                Some(wy) if wy <= wx => graph.add_edge(src, wx, dst),
                _ => {
                    unstable.insert(src);
                }
            }
        }
    }
    graph
}

/// Finds a feasible potential function for `graph`, warm-starting from the
/// given potentials. Returns `false` when the graph has a negative cycle,
/// i.e. the constraint system is infeasible.
pub fn select_potentials(graph: &WeightGraph, potential: &mut [Weight]) -> bool {
    // Bellman-Ford. The warm start usually converges in one or two rounds.
    for _ in 0..=graph.size() {
        let mut changed = false;
        for src in graph.verts() {
            for (dst, weight) in graph.succs_of(src) {
                let candidate = wadd(potential[src], weight);
                if candidate < potential[dst] {
                    potential[dst] = candidate;
                    changed = true;
                }
            }
        }
        if !changed {
            return true;
        }
    }
    false
}

/// Restores potential feasibility after the edge `src -> dst` was tightened.
/// Returns `false` when the change created a negative cycle.
pub fn repair_potential(
    graph: &WeightGraph,
    potential: &mut [Weight],
    src: VertId,
    dst: VertId,
) -> bool {
    let weight = match graph.lookup(src, dst) {
        Some(weight) => weight,
        None => return true,
    };
    if src == dst {
        return weight >= 0;
    }
    if wadd(potential[src], weight) >= potential[dst] {
        return true;
    }

    // Dijkstra over the improvements: dist[v] is the (negative) change to
    // potential[v] required by the new edge.
    let mut dist: FxHashMap<VertId, Weight> = FxHashMap::default();
    let mut heap: BinaryHeap<Reverse<(Weight, VertId)>> = BinaryHeap::new();

    let initial = wsub(wadd(potential[src], weight), potential[dst]);
    dist.insert(dst, initial);
    heap.push(Reverse((initial, dst)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if dist.get(&u) != Some(&d) {
            continue;
        }
        if u == src {
            // The repair propagated back to the edge source: negative cycle.
            return false;
        }
        for (v, w) in graph.succs_of(u) {
            let reduced = wsub(wadd(potential[u], w), potential[v]);
            let candidate = wadd(d, reduced);
            if candidate < dist.get(&v).cloned().unwrap_or(0) {
                dist.insert(v, candidate);
                heap.push(Reverse((candidate, v)));
            }
        }
    }

    for (v, d) in dist {
        potential[v] = wadd(potential[v], d);
    }
    true
}

// Dijkstra from `source` in reduced costs; returns true path weights for
// every other reached vertex. `exclude` hides a vertex entirely.
fn shortest_paths(
    graph: &WeightGraph,
    potential: &[Weight],
    exclude: Option<VertId>,
    source: VertId,
) -> FxHashMap<VertId, Weight> {
    let mut dist: FxHashMap<VertId, Weight> = FxHashMap::default();
    let mut heap: BinaryHeap<Reverse<(Weight, VertId)>> = BinaryHeap::new();
    dist.insert(source, 0);
    heap.push(Reverse((0, source)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if dist.get(&u) != Some(&d) {
            continue;
        }
        for (v, w) in graph.succs_of(u) {
            if Some(v) == exclude {
                continue;
            }
            let reduced = wsub(wadd(potential[u], w), potential[v]);
            let candidate = wadd(d, reduced);
            match dist.get(&v) {
                Some(&best) if best <= candidate => {}
                _ => {
                    dist.insert(v, candidate);
                    heap.push(Reverse((candidate, v)));
                }
            }
        }
    }

    // Translate reduced distances back to true path weights.
    dist.retain(|&v, _| v != source);
    for (v, d) in dist.iter_mut() {
        *d = wadd(wsub(*d, potential[source]), potential[*v]);
    }
    dist
}

// The same, walking predecessor edges: true weights of paths ending at
// `sink`.
fn shortest_paths_rev(
    graph: &WeightGraph,
    potential: &[Weight],
    exclude: Option<VertId>,
    sink: VertId,
) -> FxHashMap<VertId, Weight> {
    let mut dist: FxHashMap<VertId, Weight> = FxHashMap::default();
    let mut heap: BinaryHeap<Reverse<(Weight, VertId)>> = BinaryHeap::new();
    dist.insert(sink, 0);
    heap.push(Reverse((0, sink)));

    while let Some(Reverse((d, u))) = heap.pop() {
        if dist.get(&u) != Some(&d) {
            continue;
        }
        for (v, w) in graph.preds_of(u) {
            if Some(v) == exclude {
                continue;
            }
            // Reversed edge v -> u reweighted from the sink side.
            let reduced = wsub(wadd(potential[v], w), potential[u]);
            let candidate = wadd(d, reduced);
            match dist.get(&v) {
                Some(&best) if best <= candidate => {}
                _ => {
                    dist.insert(v, candidate);
                    heap.push(Reverse((candidate, v)));
                }
            }
        }
    }

    dist.retain(|&v, _| v != sink);
    for (v, d) in dist.iter_mut() {
        *d = wadd(wsub(*d, potential[*v]), potential[sink]);
    }
    dist
}

/// Closure after a single vertex gained fresh edges: materializes the
/// shortest paths leaving and entering `vert`. With `vert = 0` and no
/// exclusion this recovers unary bounds through the zero vertex.
pub fn close_after_assign(
    graph: &WeightGraph,
    potential: &[Weight],
    exclude: Option<VertId>,
    vert: VertId,
    delta: &mut EdgeVec,
) {
    for (dst, weight) in shortest_paths(graph, potential, exclude, vert) {
        match graph.lookup(vert, dst) {
            Some(existing) if existing <= weight => {}
            _ => delta.push((vert, dst, weight)),
        }
    }
    for (src, weight) in shortest_paths_rev(graph, potential, exclude, vert) {
        match graph.lookup(src, vert) {
            Some(existing) if existing <= weight => {}
            _ => delta.push((src, vert, weight)),
        }
    }
}

/// Restores closure of the sub-graph that excludes `exclude` after a meet,
/// by materializing all-pairs shortest paths.
pub fn close_after_meet(
    graph: &WeightGraph,
    potential: &[Weight],
    exclude: Option<VertId>,
    delta: &mut EdgeVec,
) {
    for src in graph.verts() {
        if Some(src) == exclude {
            continue;
        }
        for (dst, weight) in shortest_paths(graph, potential, exclude, src) {
            match graph.lookup(src, dst) {
                Some(existing) if existing <= weight => {}
                _ => delta.push((src, dst, weight)),
            }
        }
    }
}

/// Restores closure after widening: only paths leaving an unstable vertex
/// may have lost their witnessing shortcut.
pub fn close_after_widen(
    graph: &WeightGraph,
    potential: &[Weight],
    exclude: Option<VertId>,
    unstable: &BTreeSet<VertId>,
    delta: &mut EdgeVec,
) {
    for &src in unstable {
        if !graph.is_vertex(src) || Some(src) == exclude {
            continue;
        }
        for (dst, weight) in shortest_paths(graph, potential, exclude, src) {
            match graph.lookup(src, dst) {
                Some(existing) if existing <= weight => {}
                _ => delta.push((src, dst, weight)),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn graph(size: usize, edges: &[(VertId, Weight, VertId)]) -> WeightGraph {
        let mut g = WeightGraph::new();
        g.grow_to(size);
        for &(src, weight, dst) in edges {
            g.add_edge(src, weight, dst);
        }
        g
    }

    #[test]
    fn test_select_potentials() {
        let g = graph(3, &[(0, 1, 1), (1, -3, 2), (2, 3, 0)]);
        let mut potential = vec![0; 3];
        assert!(select_potentials(&g, &mut potential));
        for src in g.verts() {
            for (dst, w) in g.succs_of(src) {
                assert!(potential[src] + w >= potential[dst]);
            }
        }
    }

    #[test]
    fn test_select_potentials_negative_cycle() {
        let g = graph(2, &[(0, -1, 1), (1, -1, 0)]);
        let mut potential = vec![0; 2];
        assert!(!select_potentials(&g, &mut potential));
    }

    #[test]
    fn test_repair_potential() {
        let mut g = graph(3, &[(0, 2, 1), (1, 2, 2)]);
        let mut potential = vec![0, 2, 4];

        // tighten 0 -> 1, feasibility must be restored
        g.set_edge(0, -5, 1);
        assert!(repair_potential(&g, &mut potential, 0, 1));
        for src in g.verts() {
            for (dst, w) in g.succs_of(src) {
                assert!(potential[src] + w >= potential[dst]);
            }
        }

        // closing the cycle with a large enough weight stays feasible
        g.set_edge(1, 6, 0);
        assert!(repair_potential(&g, &mut potential, 1, 0));

        // tightening it below the opposing edge creates a negative cycle
        g.set_edge(1, 2, 0);
        assert!(!repair_potential(&g, &mut potential, 1, 0));
    }

    #[test]
    fn test_close_after_meet_materializes_paths() {
        let g = graph(4, &[(1, 1, 2), (2, 1, 3)]);
        let mut potential = vec![0; 4];
        assert!(select_potentials(&g, &mut potential));

        let mut delta = EdgeVec::new();
        close_after_meet(&g, &potential, Some(0), &mut delta);
        let mut g = g;
        apply_delta(&mut g, &delta);

        assert_eq!(g.lookup(1, 3), Some(2));
    }
}
