//! Weak topological ordering of a control flow graph.
//!
//! A weak topological order is a hierarchically nested sequence of
//! components, each either a single vertex or a cycle whose head is a loop
//! head and whose members are sub-components. It identifies the loop heads
//! and their nesting, which is what drives interleaved widening/narrowing in
//! the fixpoint iterator.
//!
//! This is Bourdoncle's recursive SCC-based construction ("Efficient chaotic
//! iteration strategies with widenings", 1993).

use crate::il::{ControlFlowGraph, Label};
use crate::Error;
use rustc_hash::FxHashMap;
use std::cell::Cell;
use std::fmt;

/// A component of a weak topological order: a vertex, or a cycle headed by a
/// loop head.
#[derive(Clone, Debug)]
pub enum Component {
    Vertex(Label),
    Cycle(Cycle),
}

/// A cycle `(head, C1, C2, ...)` of a weak topological order.
#[derive(Clone, Debug)]
pub struct Cycle {
    head: Label,
    components: Vec<Component>,
    // How many times the fixpoint visited this cycle; diagnostics only.
    fixpo_visits: Cell<usize>,
}

impl Cycle {
    pub fn head(&self) -> Label {
        self.head
    }

    /// The sub-components of this cycle, in iteration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// True if `label` is the head of this cycle or a member of any nested
    /// component.
    pub fn contains(&self, label: Label) -> bool {
        if self.head == label {
            return true;
        }
        self.components.iter().any(|component| match component {
            Component::Vertex(vertex) => *vertex == label,
            Component::Cycle(cycle) => cycle.contains(label),
        })
    }

    pub fn increment_fixpo_visits(&self) {
        self.fixpo_visits.set(self.fixpo_visits.get() + 1);
    }

    pub fn fixpo_visits(&self) -> usize {
        self.fixpo_visits.get()
    }
}

/// The cycle heads enclosing a label, outermost first. A head is not
/// considered to enclose itself.
#[derive(Clone, Debug, Default, Eq, PartialEq)]
pub struct Nesting {
    heads: Vec<Label>,
}

impl Nesting {
    pub fn heads(&self) -> &[Label] {
        &self.heads
    }

    /// Nestings compare by prefix: `a` is deeper than `b` exactly when `b`
    /// is a strict prefix of `a`.
    pub fn is_deeper_than(&self, other: &Nesting) -> bool {
        if self.heads.len() <= other.heads.len() {
            return false;
        }
        self.heads[..other.heads.len()] == other.heads[..]
    }
}

/// A weak topological order of a control flow graph.
#[derive(Clone, Debug)]
pub struct Wto {
    components: Vec<Component>,
    nesting: FxHashMap<Label, Nesting>,
}

impl Wto {
    pub fn new(cfg: &ControlFlowGraph) -> Result<Wto, Error> {
        let mut builder = WtoBuilder {
            cfg,
            dfn: FxHashMap::default(),
            stack: Vec::new(),
            next: 0,
        };
        let mut components = Vec::new();
        builder.visit(cfg.entry(), &mut components)?;

        let mut nesting = FxHashMap::default();
        let mut path = Vec::new();
        fill_nesting(&mut nesting, &components, &mut path);

        Ok(Wto {
            components,
            nesting,
        })
    }

    /// The top-level components, in iteration order.
    pub fn components(&self) -> &[Component] {
        &self.components
    }

    /// The nesting of a label. Labels outside every cycle have an empty
    /// nesting.
    pub fn nesting(&self, label: Label) -> Nesting {
        self.nesting.get(&label).cloned().unwrap_or_default()
    }
}

fn fill_nesting(
    nesting: &mut FxHashMap<Label, Nesting>,
    components: &[Component],
    path: &mut Vec<Label>,
) {
    for component in components {
        match component {
            Component::Vertex(label) => {
                nesting.insert(
                    *label,
                    Nesting {
                        heads: path.clone(),
                    },
                );
            }
            Component::Cycle(cycle) => {
                nesting.insert(
                    cycle.head(),
                    Nesting {
                        heads: path.clone(),
                    },
                );
                path.push(cycle.head());
                fill_nesting(nesting, cycle.components(), path);
                path.pop();
            }
        }
    }
}

// Depth-first numbers: 0 is unvisited, usize::MAX is fully processed.
struct WtoBuilder<'a> {
    cfg: &'a ControlFlowGraph,
    dfn: FxHashMap<Label, usize>,
    stack: Vec<Label>,
    next: usize,
}

impl<'a> WtoBuilder<'a> {
    fn dfn(&self, label: Label) -> usize {
        self.dfn.get(&label).cloned().unwrap_or(0)
    }

    fn visit(&mut self, vertex: Label, partition: &mut Vec<Component>) -> Result<usize, Error> {
        self.stack.push(vertex);
        self.next += 1;
        let number = self.next;
        self.dfn.insert(vertex, number);

        let mut head = number;
        let mut in_loop = false;

        let successors: Vec<Label> = self.cfg.successors(vertex)?.iter().cloned().collect();
        for successor in successors {
            let min = if self.dfn(successor) == 0 {
                self.visit(successor, partition)?
            } else {
                self.dfn(successor)
            };
            if min <= head {
                head = min;
                in_loop = true;
            }
        }

        if head == self.dfn(vertex) {
            self.dfn.insert(vertex, usize::MAX);
            let mut element = self.stack.pop();
            if in_loop {
                while element != Some(vertex) {
                    if let Some(e) = element {
                        self.dfn.insert(e, 0);
                    }
                    element = self.stack.pop();
                }
                let cycle = self.component(vertex)?;
                partition.insert(0, Component::Cycle(cycle));
            } else {
                partition.insert(0, Component::Vertex(vertex));
            }
        }
        Ok(head)
    }

    fn component(&mut self, vertex: Label) -> Result<Cycle, Error> {
        let mut partition = Vec::new();
        let successors: Vec<Label> = self.cfg.successors(vertex)?.iter().cloned().collect();
        for successor in successors {
            if self.dfn(successor) == 0 {
                self.visit(successor, &mut partition)?;
            }
        }
        Ok(Cycle {
            head: vertex,
            components: partition,
            fixpo_visits: Cell::new(0),
        })
    }
}

impl fmt::Display for Component {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Component::Vertex(label) => write!(f, "{}", label),
            Component::Cycle(cycle) => {
                write!(f, "({}", cycle.head())?;
                for component in cycle.components() {
                    write!(f, " {}", component)?;
                }
                write!(f, ")")
            }
        }
    }
}

impl fmt::Display for Wto {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut first = true;
        for component in &self.components {
            if !first {
                write!(f, " ")?;
            }
            first = false;
            write!(f, "{}", component)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn label(index: usize) -> Label {
        Label::new(index)
    }

    #[test]
    fn test_straight_line() {
        let mut cfg = ControlFlowGraph::new(label(0), label(2));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));

        let wto = Wto::new(&cfg).unwrap();
        assert_eq!(format!("{}", wto), "0 1 2");
    }

    #[test]
    fn test_simple_loop() {
        // 0 -> 1, 1 -> 2, 2 -> 1, 1 -> 3
        let mut cfg = ControlFlowGraph::new(label(0), label(3));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        cfg.add_edge(label(2), label(1));
        cfg.add_edge(label(1), label(3));

        let wto = Wto::new(&cfg).unwrap();
        assert_eq!(format!("{}", wto), "0 (1 2) 3");

        match &wto.components()[1] {
            Component::Cycle(cycle) => {
                assert_eq!(cycle.head(), label(1));
                assert!(cycle.contains(label(2)));
                assert!(!cycle.contains(label(3)));
            }
            component => panic!("expected a cycle, got {}", component),
        }
    }

    #[test]
    fn test_nested_loops() {
        // 0 -> 1, 1 -> 2, 2 -> 3, 3 -> 2 (inner), 3 -> 1 (outer), 3 -> 4
        let mut cfg = ControlFlowGraph::new(label(0), label(4));
        cfg.add_edge(label(0), label(1));
        cfg.add_edge(label(1), label(2));
        cfg.add_edge(label(2), label(3));
        cfg.add_edge(label(3), label(2));
        cfg.add_edge(label(3), label(1));
        cfg.add_edge(label(3), label(4));

        let wto = Wto::new(&cfg).unwrap();
        assert_eq!(format!("{}", wto), "0 (1 (2 3)) 4");

        // nesting is outermost-first and excludes the label's own head
        assert!(wto.nesting(label(1)).heads().is_empty());
        assert_eq!(wto.nesting(label(2)).heads(), &[label(1)][..]);
        assert_eq!(wto.nesting(label(3)).heads(), &[label(1), label(2)][..]);
        assert!(wto.nesting(label(4)).heads().is_empty());

        assert!(wto.nesting(label(3)).is_deeper_than(&wto.nesting(label(2))));
        assert!(wto.nesting(label(2)).is_deeper_than(&wto.nesting(label(1))));
        assert!(!wto.nesting(label(1)).is_deeper_than(&wto.nesting(label(2))));
        assert!(!wto.nesting(label(4)).is_deeper_than(&wto.nesting(label(1))));
    }
}
