//! A relational zones domain over split difference-bound matrices.
//!
//! The domain represents conjunctions of constraints of the form
//! `x - y <= k` together with unary bounds `x <= k` and `x >= k`. The
//! constraint store is a `WeightGraph`: an edge `u -> v` with weight `w`
//! encodes `v - u <= w`, where each vertex stands for the variable it maps
//! to and vertex 0 stands for the constant zero. The graph is kept in
//! shortest-path-closed form, repaired incrementally through a feasible
//! potential function; closure is deferred only across widenings, which mark
//! the affected vertices unstable until the next `normalize`.

pub mod closure;
pub mod weight_graph;

use self::closure::EdgeVec;
use self::weight_graph::{PermView, SubGraph, VertId, WeightGraph};
use crate::analysis::fixed_point::Domain;
use crate::analysis::stats;
use crate::il::{
    ArithOp, BitwiseOp, Constraint, ConstraintKind, Instruction, LinearExpression, Operand,
    Operation, Variable,
};
use crate::num::number::Weight;
use crate::num::{Bound, Interval, Number};
use crate::Error;
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

// A difference constraint `x - y <= k`, as `((x, y), k)`.
type DiffCst = ((Variable, Variable), Weight);

#[derive(Clone, Debug, Deserialize, Serialize)]
pub struct SplitDbm {
    // variable -> vertex id
    vert_map: BTreeMap<Variable, VertId>,
    // vertex id -> variable; `None` is an unused slot (always at index 0)
    rev_map: Vec<Option<Variable>>,
    g: WeightGraph,
    // A feasible price function: potential[u] + w >= potential[v] for every
    // edge u -> v with weight w.
    potential: Vec<Weight>,
    // Vertices whose outgoing closure may be broken; non-empty only between
    // a widening and the next `normalize`.
    unstable: BTreeSet<VertId>,
    bottom: bool,
}

impl SplitDbm {
    /// The state with no constraints.
    pub fn top() -> SplitDbm {
        let mut g = WeightGraph::new();
        let zero = g.new_vertex();
        debug_assert_eq!(zero, 0);
        SplitDbm {
            vert_map: BTreeMap::new(),
            rev_map: vec![None],
            g,
            potential: vec![0],
            unstable: BTreeSet::new(),
            bottom: false,
        }
    }

    /// The infeasible state.
    pub fn bottom() -> SplitDbm {
        let mut dbm = SplitDbm::top();
        dbm.bottom = true;
        dbm
    }

    pub fn is_bottom(&self) -> bool {
        self.bottom
    }

    pub fn is_top(&self) -> bool {
        !self.bottom && self.g.num_edges() == 0
    }

    fn set_to_bottom(&mut self) {
        *self = SplitDbm::bottom();
    }

    fn get_vert(&mut self, x: &Variable) -> VertId {
        if let Some(&vert) = self.vert_map.get(x) {
            return vert;
        }
        let vert = self.g.new_vertex();
        if vert < self.rev_map.len() {
            self.potential[vert] = 0;
            self.rev_map[vert] = Some(x.clone());
        } else {
            self.potential.push(0);
            self.rev_map.push(Some(x.clone()));
        }
        self.vert_map.insert(x.clone(), vert);
        debug_assert!(vert != 0);
        vert
    }

    /// The unary bounds currently known for `x`.
    pub fn get_interval(&self, x: &Variable) -> Interval {
        if self.bottom {
            return Interval::bottom();
        }
        match self.vert_map.get(x) {
            Some(&vert) => {
                let lb = match self.g.lookup(vert, 0) {
                    Some(w) => Bound::Finite(-Number::from(w)),
                    None => Bound::MinusInfinity,
                };
                let ub = match self.g.lookup(0, vert) {
                    Some(w) => Bound::Finite(Number::from(w)),
                    None => Bound::PlusInfinity,
                };
                Interval::new(lb, ub)
            }
            None => Interval::top(),
        }
    }

    /// Interval evaluation of a linear expression under the current bounds.
    pub fn eval_interval(&self, e: &LinearExpression) -> Interval {
        let mut result = Interval::number(e.constant().clone());
        for (variable, coefficient) in e.terms() {
            let term = Interval::number(coefficient.clone()).mul(&self.get_interval(variable));
            result = result.add(&term);
        }
        result
    }

    // A feasible potential estimate for the value of `e`, relative to the
    // zero vertex. `None` on overflow.
    fn eval_expression(&self, e: &LinearExpression) -> Option<Weight> {
        let mut value = e.constant().to_weight()?;
        for (variable, coefficient) in e.terms() {
            let coefficient = coefficient.to_weight()?;
            let pot = match self.vert_map.get(variable) {
                Some(&vert) => self.potential[vert].checked_sub(self.potential[0])?,
                None => 0,
            };
            value = value.checked_add(coefficient.checked_mul(pot)?)?;
        }
        Some(value)
    }

    fn operand_interval(&self, operand: &Operand) -> Interval {
        match operand {
            Operand::Variable(variable) => self.get_interval(variable),
            Operand::Number(number) => Interval::number(number.clone()),
        }
    }

    /// Re-establishes closure after a widening. Always maintained in normal
    /// form otherwise.
    pub fn normalize(&mut self) {
        if self.unstable.is_empty() {
            return;
        }
        stats::count("zones.normalize");
        let mut delta = EdgeVec::new();
        closure::close_after_widen(&self.g, &self.potential, Some(0), &self.unstable, &mut delta);
        closure::apply_delta(&mut self.g, &delta);
        // Recover variable bounds through the zero vertex.
        delta.clear();
        closure::close_after_assign(&self.g, &self.potential, None, 0, &mut delta);
        closure::apply_delta(&mut self.g, &delta);
        self.unstable.clear();
    }

    /// Removes a variable from the state.
    pub fn forget(&mut self, x: &Variable) {
        if self.bottom {
            return;
        }
        self.normalize();
        if let Some(vert) = self.vert_map.remove(x) {
            self.g.forget(vert);
            self.rev_map[vert] = None;
        }
    }

    pub fn forget_all<'v, I>(&mut self, variables: I)
    where
        I: IntoIterator<Item = &'v Variable>,
    {
        if self.is_bottom() || self.is_top() {
            return;
        }
        for variable in variables {
            self.forget(variable);
        }
    }

    /// Inclusion check: does every state of `self` satisfy `other`?
    pub fn le(&self, other: &SplitDbm) -> bool {
        stats::count("zones.leq");
        let _timer = stats::ScopedTimer::new("zones.leq");

        // Cover the trivial cases without touching the graphs.
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        if other.is_top() {
            return true;
        }
        if self.is_top() {
            return false;
        }

        let mut x = self.clone();
        x.normalize();

        if x.vert_map.len() < other.vert_map.len() {
            return false;
        }

        // Set up a renaming from `other`'s vertices onto `x`'s. A variable
        // constrained in `other` but missing here rules inclusion out.
        let mut renaming: Vec<Option<VertId>> = vec![None; other.g.size()];
        renaming[0] = Some(0);
        for (variable, &overt) in &other.vert_map {
            if other.g.out_degree(overt) == 0 && other.g.in_degree(overt) == 0 {
                continue;
            }
            match x.vert_map.get(variable) {
                Some(&xvert) => renaming[overt] = Some(xvert),
                None => return false,
            }
        }

        for ox in other.g.verts() {
            if other.g.out_degree(ox) == 0 {
                continue;
            }
            let xs = match renaming[ox] {
                Some(vert) => vert,
                None => return false,
            };
            for (oy, ow) in other.g.succs_of(ox) {
                let xd = match renaming[oy] {
                    Some(vert) => vert,
                    None => return false,
                };
                if let Some(wx) = x.g.lookup(xs, xd) {
                    if wx <= ow {
                        continue;
                    }
                }
                // Fall back on witnessing the edge through the zero vertex.
                let wx0 = match x.g.lookup(xs, 0) {
                    Some(w) => w,
                    None => return false,
                };
                let w0y = match x.g.lookup(0, xd) {
                    Some(w) => w,
                    None => return false,
                };
                if wx0.saturating_add(w0y) > ow {
                    return false;
                }
            }
        }
        true
    }

    /// Least upper bound.
    pub fn join(self, other: &SplitDbm) -> SplitDbm {
        stats::count("zones.join");
        let _timer = stats::ScopedTimer::new("zones.join");

        if self.is_bottom() || other.is_top() {
            return other.clone();
        }
        if other.is_bottom() || self.is_top() {
            return self;
        }

        let mut x = self;
        x.normalize();
        let mut y = other.clone();
        y.normalize();

        // Figure out the common renaming, initializing the resulting
        // potentials as we go.
        let mut perm_x: Vec<Option<VertId>> = vec![Some(0)];
        let mut perm_y: Vec<Option<VertId>> = vec![Some(0)];
        let mut pot_rx: Vec<Weight> = vec![0];
        let mut pot_ry: Vec<Weight> = vec![0];
        let mut out_vmap: BTreeMap<Variable, VertId> = BTreeMap::new();
        let mut out_revmap: Vec<Option<Variable>> = vec![None];

        for (variable, &xn) in &x.vert_map {
            if let Some(&yn) = y.vert_map.get(variable) {
                out_vmap.insert(variable.clone(), perm_x.len());
                out_revmap.push(Some(variable.clone()));
                pot_rx.push(x.potential[xn].saturating_sub(x.potential[0]));
                pot_ry.push(y.potential[yn].saturating_sub(y.potential[0]));
                perm_x.push(Some(xn));
                perm_y.push(Some(yn));
            }
        }
        let size = perm_x.len();

        let gx = PermView::new(&x.g, perm_x).materialize();
        let gy = PermView::new(&y.g, perm_y).materialize();

        // Deferred relations of y that x can witness through its unary
        // bounds.
        let mut g_ix_ry = WeightGraph::new();
        g_ix_ry.grow_to(size);
        for s in 1..size {
            for (d, _) in gy.succs_of(s) {
                if d == 0 {
                    continue;
                }
                if let (Some(ws), Some(wd)) = (gx.lookup(s, 0), gx.lookup(0, d)) {
                    g_ix_ry.add_edge(s, ws.saturating_add(wd), d);
                }
            }
        }
        // Apply the deferred relations, and re-close.
        let mut g_rx = closure::meet_graphs(&gx, &g_ix_ry, size);
        let mut delta = EdgeVec::new();
        closure::close_after_meet(&g_rx, &pot_rx, Some(0), &mut delta);
        closure::apply_delta(&mut g_rx, &delta);

        // Symmetrically for x against y.
        let mut g_rx_iy = WeightGraph::new();
        g_rx_iy.grow_to(size);
        for s in 1..size {
            for (d, _) in gx.succs_of(s) {
                if d == 0 {
                    continue;
                }
                if let (Some(ws), Some(wd)) = (gy.lookup(s, 0), gy.lookup(0, d)) {
                    g_rx_iy.add_edge(s, ws.saturating_add(wd), d);
                }
            }
        }
        let mut g_ry = closure::meet_graphs(&gy, &g_rx_iy, size);
        delta.clear();
        closure::close_after_meet(&g_ry, &pot_ry, Some(0), &mut delta);
        closure::apply_delta(&mut g_ry, &delta);

        // Both operands are now closed, so their pointwise maximum is the
        // graph join and remains closed.
        let mut join_g = closure::join_graphs(&g_rx, &g_ry, size);

        // Reapply the missing independent relations: bounds that moved in
        // opposite directions between the operands still entail a difference
        // constraint on either side.
        let mut lb_up: Vec<VertId> = Vec::new();
        let mut lb_down: Vec<VertId> = Vec::new();
        let mut ub_up: Vec<VertId> = Vec::new();
        let mut ub_down: Vec<VertId> = Vec::new();
        for v in 1..size {
            if let (Some(wx), Some(wy)) = (gx.lookup(0, v), gy.lookup(0, v)) {
                if wx < wy {
                    ub_up.push(v);
                }
                if wy < wx {
                    ub_down.push(v);
                }
            }
            if let (Some(wx), Some(wy)) = (gx.lookup(v, 0), gy.lookup(v, 0)) {
                if wx < wy {
                    lb_down.push(v);
                }
                if wy < wx {
                    lb_up.push(v);
                }
            }
        }

        for &s in lb_up.iter() {
            if let (Some(dx_s), Some(dy_s)) = (gx.lookup(s, 0), gy.lookup(s, 0)) {
                for &d in ub_up.iter() {
                    if s == d {
                        continue;
                    }
                    if let (Some(xd), Some(yd)) = (gx.lookup(0, d), gy.lookup(0, d)) {
                        let weight = dx_s.saturating_add(xd).max(dy_s.saturating_add(yd));
                        join_g.update_edge(s, weight, d);
                    }
                }
            }
        }
        for &s in lb_down.iter() {
            if let (Some(dx_s), Some(dy_s)) = (gx.lookup(s, 0), gy.lookup(s, 0)) {
                for &d in ub_down.iter() {
                    if s == d {
                        continue;
                    }
                    if let (Some(xd), Some(yd)) = (gx.lookup(0, d), gy.lookup(0, d)) {
                        let weight = dx_s.saturating_add(xd).max(dy_s.saturating_add(yd));
                        join_g.update_edge(s, weight, d);
                    }
                }
            }
        }

        // Garbage-collect vertices with no surviving edges.
        for v in 1..size {
            if join_g.out_degree(v) == 0 && join_g.in_degree(v) == 0 {
                join_g.forget(v);
                if let Some(variable) = out_revmap[v].take() {
                    out_vmap.remove(&variable);
                }
            }
        }

        let result = SplitDbm {
            vert_map: out_vmap,
            rev_map: out_revmap,
            g: join_g,
            potential: pot_rx,
            unstable: BTreeSet::new(),
            bottom: false,
        };
        debug!("join result: {}", result);
        result
    }

    /// Widening: keep only the constraints of `self` that `other` entails
    /// with the same or a tighter weight. Closure is deferred to the next
    /// `normalize` through the unstable set.
    pub fn widen(self, other: &SplitDbm) -> SplitDbm {
        stats::count("zones.widen");
        let _timer = stats::ScopedTimer::new("zones.widen");

        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self;
        }

        let x = self;
        let mut y = other.clone();
        y.normalize();

        let mut perm_x: Vec<Option<VertId>> = vec![Some(0)];
        let mut perm_y: Vec<Option<VertId>> = vec![Some(0)];
        let mut widen_pot: Vec<Weight> = vec![0];
        let mut out_vmap: BTreeMap<Variable, VertId> = BTreeMap::new();
        let mut out_revmap: Vec<Option<Variable>> = vec![None];

        for (variable, &xn) in &x.vert_map {
            if let Some(&yn) = y.vert_map.get(variable) {
                out_vmap.insert(variable.clone(), perm_x.len());
                out_revmap.push(Some(variable.clone()));
                widen_pot.push(x.potential[xn].saturating_sub(x.potential[0]));
                perm_x.push(Some(xn));
                perm_y.push(Some(yn));
            }
        }
        let size = perm_x.len();

        // Carry over vertices that were already unstable in x, under the new
        // numbering.
        let mut widen_unstable: BTreeSet<VertId> = BTreeSet::new();
        for (view, parent) in perm_x.iter().enumerate() {
            if let Some(parent) = parent {
                if x.unstable.contains(parent) {
                    widen_unstable.insert(view);
                }
            }
        }

        let gx = PermView::new(&x.g, perm_x).materialize();
        let gy = PermView::new(&y.g, perm_y).materialize();
        let widen_g = closure::widen_graphs(&gx, &gy, size, &mut widen_unstable);

        SplitDbm {
            vert_map: out_vmap,
            rev_map: out_revmap,
            g: widen_g,
            potential: widen_pot,
            unstable: widen_unstable,
            bottom: false,
        }
    }

    /// Greatest lower bound.
    pub fn meet(self, other: &SplitDbm) -> SplitDbm {
        stats::count("zones.meet");
        let _timer = stats::ScopedTimer::new("zones.meet");

        if self.is_bottom() || other.is_bottom() {
            return SplitDbm::bottom();
        }
        if self.is_top() {
            return other.clone();
        }
        if other.is_top() {
            return self;
        }

        let mut x = self;
        x.normalize();
        let mut y = other.clone();
        y.normalize();

        // Map the left operand onto a contiguous range, then fill in the
        // variables only the right operand knows.
        let mut meet_verts: BTreeMap<Variable, VertId> = BTreeMap::new();
        let mut meet_rev: Vec<Option<Variable>> = vec![None];
        let mut perm_x: Vec<Option<VertId>> = vec![Some(0)];
        let mut perm_y: Vec<Option<VertId>> = vec![Some(0)];
        let mut meet_pi: Vec<Weight> = vec![0];

        for (variable, &xn) in &x.vert_map {
            meet_verts.insert(variable.clone(), perm_x.len());
            meet_rev.push(Some(variable.clone()));
            meet_pi.push(x.potential[xn].saturating_sub(x.potential[0]));
            perm_x.push(Some(xn));
            perm_y.push(None);
        }
        for (variable, &yn) in &y.vert_map {
            match meet_verts.get(variable) {
                Some(&vv) => perm_y[vv] = Some(yn),
                None => {
                    meet_verts.insert(variable.clone(), perm_y.len());
                    meet_rev.push(Some(variable.clone()));
                    meet_pi.push(y.potential[yn].saturating_sub(y.potential[0]));
                    perm_y.push(Some(yn));
                    perm_x.push(None);
                }
            }
        }
        let size = perm_x.len();

        let gx = PermView::new(&x.g, perm_x).materialize();
        let gy = PermView::new(&y.g, perm_y).materialize();
        let mut meet_g = closure::meet_graphs(&gx, &gy, size);

        // We've warm-started the potentials with the operand potentials.
        if !closure::select_potentials(&meet_g, &mut meet_pi) {
            // Potentials cannot be selected: the state is infeasible.
            return SplitDbm::bottom();
        }

        let mut delta = EdgeVec::new();
        closure::close_after_meet(&meet_g, &meet_pi, Some(0), &mut delta);
        closure::apply_delta(&mut meet_g, &delta);
        // Recover updated bounds.
        delta.clear();
        closure::close_after_assign(&meet_g, &meet_pi, None, 0, &mut delta);
        closure::apply_delta(&mut meet_g, &delta);

        SplitDbm {
            vert_map: meet_verts,
            rev_map: meet_rev,
            g: meet_g,
            potential: meet_pi,
            unstable: BTreeSet::new(),
            bottom: false,
        }
    }

    /// Narrowing. A no-op refinement is sound.
    pub fn narrow(self, other: &SplitDbm) -> SplitDbm {
        stats::count("zones.narrow");
        if self.is_bottom() || other.is_bottom() {
            return SplitDbm::bottom();
        }
        if self.is_top() {
            return other.clone();
        }
        let mut x = self;
        x.normalize();
        x
    }

    // Incremental triangle closure around the edge `ii -> jj`, on the
    // sub-graph that excludes the zero vertex.
    fn close_over_edge(&mut self, ii: VertId, jj: VertId) {
        debug_assert!(ii != 0 && jj != 0);
        let c = match self.g.lookup(ii, jj) {
            Some(c) => c,
            None => return,
        };

        // Predecessor edges s -> ii whose path through the new edge improves
        // s -> jj.
        let mut src_dec: Vec<(VertId, Weight)> = Vec::new();
        let preds: Vec<(VertId, Weight)> = SubGraph::new(&self.g, 0).preds_of(ii).collect();
        for (se, p1) in preds {
            if se == jj {
                continue;
            }
            let wt_sij = p1.saturating_add(c);
            if let Some(w) = self.g.lookup(se, jj) {
                if w <= wt_sij {
                    continue;
                }
            }
            self.g.update_edge(se, wt_sij, jj);
            src_dec.push((se, p1));
        }

        // Successor edges jj -> de whose path through the new edge improves
        // ii -> de.
        let mut dest_dec: Vec<(VertId, Weight)> = Vec::new();
        let succs: Vec<(VertId, Weight)> = SubGraph::new(&self.g, 0).succs_of(jj).collect();
        for (de, p2) in succs {
            if de == ii {
                continue;
            }
            let wt_ijd = c.saturating_add(p2);
            if let Some(w) = self.g.lookup(ii, de) {
                if w <= wt_ijd {
                    continue;
                }
            }
            self.g.update_edge(ii, wt_ijd, de);
            dest_dec.push((de, p2));
        }

        // Cross products of the improved subpaths.
        for &(se, p1) in &src_dec {
            for &(de, p2) in &dest_dec {
                if se == de {
                    continue;
                }
                let weight = p1.saturating_add(c).saturating_add(p2);
                self.g.update_edge(se, weight, de);
            }
        }
    }

    // Derives difference constraints `v - x <= k` entailed by the assignment
    // `x := exp`, for the upper-bound direction when `extract_upper_bounds`
    // and the lower-bound direction otherwise.
    fn diffcsts_of_assign(
        &self,
        exp: &LinearExpression,
        extract_upper_bounds: bool,
    ) -> Vec<(Variable, Weight)> {
        let mut unbounded_var: Option<Variable> = None;
        let mut terms: Vec<(Variable, Weight)> = Vec::new();

        let mut residual = match exp.constant().to_weight() {
            Some(w) => w,
            None => return Vec::new(),
        };

        for (y, n) in exp.terms() {
            let coeff = match n.to_weight() {
                Some(c) => c,
                None => continue,
            };
            if coeff < 0 {
                // Can't do anything with negative coefficients unless the
                // variable is bounded on the opposite side.
                let y_val = if extract_upper_bounds {
                    self.get_interval(y).lb().clone()
                } else {
                    self.get_interval(y).ub().clone()
                };
                let y_val = match y_val.number() {
                    Some(v) => v.clone(),
                    None => return Vec::new(),
                };
                let yw = match y_val.to_weight() {
                    Some(w) => w,
                    None => continue,
                };
                residual = match yw.checked_mul(coeff).and_then(|p| residual.checked_add(p)) {
                    Some(r) => r,
                    None => continue,
                };
            } else {
                let y_val = if extract_upper_bounds {
                    self.get_interval(y).ub().clone()
                } else {
                    self.get_interval(y).lb().clone()
                };
                match y_val.number() {
                    None => {
                        if unbounded_var.is_some() || coeff != 1 {
                            return Vec::new();
                        }
                        unbounded_var = Some(y.clone());
                    }
                    Some(v) => {
                        let yw = match v.to_weight() {
                            Some(w) => w,
                            None => continue,
                        };
                        residual = match yw.checked_mul(coeff).and_then(|p| residual.checked_add(p))
                        {
                            Some(r) => r,
                            None => continue,
                        };
                        terms.push((y.clone(), yw));
                    }
                }
            }
        }

        let mut diff_csts = Vec::new();
        match unbounded_var {
            // There is exactly one unbounded variable with unit coefficient.
            Some(u) => diff_csts.push((u, residual)),
            None => {
                for (v, n) in terms {
                    if let Some(w) = residual.checked_sub(n) {
                        diff_csts.push((v, w));
                    }
                }
            }
        }
        diff_csts
    }

    // Derives the simple facts entailed by `exp <= 0`: unary lower and upper
    // bounds, and two-variable difference constraints.
    fn diffcsts_of_lin_leq(
        &self,
        exp: &LinearExpression,
    ) -> (Vec<DiffCst>, Vec<(Variable, Weight)>, Vec<(Variable, Weight)>) {
        let empty = (Vec::new(), Vec::new(), Vec::new());
        let mut csts: Vec<DiffCst> = Vec::new();
        let mut lbs: Vec<(Variable, Weight)> = Vec::new();
        let mut ubs: Vec<(Variable, Weight)> = Vec::new();

        let mut exp_ub = match exp.constant().to_weight().and_then(|w| w.checked_neg()) {
            Some(w) => w,
            None => return empty,
        };
        // Reject a constant at the edge of the weight range: later
        // derivations negate it.
        if (exp.constant().clone() - &Number::one()).to_weight().is_none() {
            return empty;
        }

        let mut unbounded_lbvar: Option<(Variable, Weight)> = None;
        let mut unbounded_ubvar: Option<(Variable, Weight)> = None;
        let mut pos_terms: Vec<((Weight, Variable), Weight)> = Vec::new();
        let mut neg_terms: Vec<((Weight, Variable), Weight)> = Vec::new();

        for (y, n) in exp.terms() {
            let coeff = match n.to_weight() {
                Some(c) => c,
                None => continue,
            };
            if coeff > 0 {
                let y_lb = self.get_interval(y).lb().clone();
                match y_lb.number() {
                    None => {
                        if unbounded_lbvar.is_some() {
                            return empty;
                        }
                        unbounded_lbvar = Some((y.clone(), coeff));
                    }
                    Some(lb) => {
                        let ymin = match lb.to_weight() {
                            Some(w) => w,
                            None => continue,
                        };
                        exp_ub = match ymin
                            .checked_mul(coeff)
                            .and_then(|p| exp_ub.checked_sub(p))
                        {
                            Some(w) => w,
                            None => return empty,
                        };
                        pos_terms.push(((coeff, y.clone()), ymin));
                    }
                }
            } else {
                let y_ub = self.get_interval(y).ub().clone();
                match y_ub.number() {
                    None => {
                        if unbounded_ubvar.is_some() {
                            return empty;
                        }
                        unbounded_ubvar = Some((y.clone(), -coeff));
                    }
                    Some(ub) => {
                        let ymax = match ub.to_weight() {
                            Some(w) => w,
                            None => continue,
                        };
                        exp_ub = match ymax
                            .checked_mul(coeff)
                            .and_then(|p| exp_ub.checked_sub(p))
                        {
                            Some(w) => w,
                            None => return empty,
                        };
                        neg_terms.push(((-coeff, y.clone()), ymax));
                    }
                }
            }
        }

        match (unbounded_lbvar, unbounded_ubvar) {
            (Some((x, xcoeff)), Some((y, ycoeff))) => {
                if xcoeff != 1 || ycoeff != 1 {
                    return empty;
                }
                csts.push(((x, y), exp_ub));
            }
            (Some((x, xcoeff)), None) => {
                if xcoeff == 1 {
                    for ((_, nv), nk) in &neg_terms {
                        if let Some(w) = exp_ub.checked_sub(*nk) {
                            csts.push(((x.clone(), nv.clone()), w));
                        }
                    }
                }
                ubs.push((x, exp_ub / xcoeff));
            }
            (None, Some((y, ycoeff))) => {
                if ycoeff == 1 {
                    for ((_, pv), pk) in &pos_terms {
                        if let Some(w) = exp_ub.checked_add(*pk) {
                            csts.push(((pv.clone(), y.clone()), w));
                        }
                    }
                }
                if let Some(neg) = exp_ub.checked_neg() {
                    lbs.push((y, neg / ycoeff));
                }
            }
            (None, None) => {
                for ((_, nv), nk) in &neg_terms {
                    for ((_, pv), pk) in &pos_terms {
                        if let Some(w) =
                            exp_ub.checked_sub(*nk).and_then(|w| w.checked_add(*pk))
                        {
                            csts.push(((pv.clone(), nv.clone()), w));
                        }
                    }
                }
                for ((ncoeff, nv), nk) in &neg_terms {
                    if let Some(w) = exp_ub
                        .checked_neg()
                        .map(|neg| neg / ncoeff)
                        .and_then(|w| w.checked_add(*nk))
                    {
                        lbs.push((nv.clone(), w));
                    }
                }
                for ((pcoeff, pv), pk) in &pos_terms {
                    if let Some(w) = (exp_ub / pcoeff).checked_add(*pk) {
                        ubs.push((pv.clone(), w));
                    }
                }
            }
        }
        (csts, lbs, ubs)
    }

    // Adds the facts of `exp <= 0` to the graph. Returns false when the
    // constraint system became infeasible; the state is already bottom then.
    fn add_linear_leq(&mut self, exp: &LinearExpression) -> bool {
        let (csts, lbs, ubs) = self.diffcsts_of_lin_leq(exp);

        for (variable, n) in lbs {
            debug!("{} >= {}", variable, n);
            let neg_n = match n.checked_neg() {
                Some(w) => w,
                None => continue,
            };
            let vert = self.get_vert(&variable);
            if let Some(w) = self.g.lookup(vert, 0) {
                if w <= neg_n {
                    continue;
                }
            }
            self.g.set_edge(vert, neg_n, 0);
            if !closure::repair_potential(&self.g, &mut self.potential, vert, 0) {
                self.set_to_bottom();
                return false;
            }
        }
        for (variable, n) in ubs {
            debug!("{} <= {}", variable, n);
            let vert = self.get_vert(&variable);
            if let Some(w) = self.g.lookup(0, vert) {
                if w <= n {
                    continue;
                }
            }
            self.g.set_edge(0, n, vert);
            if !closure::repair_potential(&self.g, &mut self.potential, 0, vert) {
                self.set_to_bottom();
                return false;
            }
        }
        for ((x, y), k) in csts {
            debug!("{} - {} <= {}", x, y, k);
            let src = self.get_vert(&y);
            let dst = self.get_vert(&x);
            self.g.update_edge(src, k, dst);
            if !closure::repair_potential(&self.g, &mut self.potential, src, dst) {
                self.set_to_bottom();
                return false;
            }
            self.close_over_edge(src, dst);
        }

        // Collect bounds through the zero vertex.
        let mut delta = EdgeVec::new();
        closure::close_after_assign(&self.g, &self.potential, None, 0, &mut delta);
        closure::apply_delta(&mut self.g, &delta);
        true
    }

    fn add_disequation(&mut self, e: &LinearExpression) {
        let pivots: Vec<(Variable, Number)> = e
            .terms()
            .map(|(variable, coefficient)| (variable.clone(), coefficient.clone()))
            .collect();
        for (x, n) in pivots {
            // The pivot can only be trimmed when the rest of the expression
            // is a known constant that its coefficient divides.
            let residual = e.clone().add_term(x.clone(), -n.clone());
            if let Some(r) = self.eval_interval(&residual).singleton() {
                let target = -r.clone();
                if (&target % &n).is_zero() {
                    let value = &target / &n;
                    self.add_univar_disequation(&x, &value);
                }
            }
            if self.bottom {
                return;
            }
        }
    }

    fn add_univar_disequation(&mut self, x: &Variable, n: &Number) {
        let i = self.get_interval(x);
        let new_i = i.trim_diseq(n);
        if new_i.is_bottom() {
            self.set_to_bottom();
            return;
        }
        if new_i.is_top() || !new_i.le(&i) {
            return;
        }

        let vert = self.get_vert(x);
        if let Some(lb) = new_i.lb().number() {
            if let Some(lb_val) = (-lb).to_weight() {
                if let Some(w) = self.g.lookup(vert, 0) {
                    if lb_val < w {
                        self.g.set_edge(vert, lb_val, 0);
                        if !closure::repair_potential(&self.g, &mut self.potential, vert, 0) {
                            self.set_to_bottom();
                            return;
                        }
                        // Update the bounds of related variables.
                        let preds: Vec<(VertId, Weight)> =
                            SubGraph::new(&self.g, 0).preds_of(vert).collect();
                        for (s, w_sv) in preds {
                            self.g.update_edge(s, w_sv.saturating_add(lb_val), 0);
                            if !closure::repair_potential(&self.g, &mut self.potential, s, 0) {
                                self.set_to_bottom();
                                return;
                            }
                        }
                    }
                }
            }
        }
        if let Some(ub) = new_i.ub().number() {
            if let Some(ub_val) = ub.to_weight() {
                if let Some(w) = self.g.lookup(0, vert) {
                    if ub_val < w {
                        self.g.set_edge(0, ub_val, vert);
                        if !closure::repair_potential(&self.g, &mut self.potential, 0, vert) {
                            self.set_to_bottom();
                            return;
                        }
                        let succs: Vec<(VertId, Weight)> =
                            SubGraph::new(&self.g, 0).succs_of(vert).collect();
                        for (d, w_vd) in succs {
                            self.g.update_edge(0, w_vd.saturating_add(ub_val), d);
                            if !closure::repair_potential(&self.g, &mut self.potential, 0, d) {
                                self.set_to_bottom();
                                return;
                            }
                        }
                    }
                }
            }
        }
    }

    /// Constrains the state with a linear constraint.
    pub fn add_constraint(&mut self, cst: &Constraint) {
        stats::count("zones.add_constraint");

        // We do nothing with unsigned inequalities.
        if !cst.is_signed() && (cst.is_inequality() || cst.is_strict_inequality()) {
            warn!("unsigned inequality {} skipped by the zones domain", cst);
            return;
        }

        if self.bottom {
            return;
        }
        self.normalize();

        if cst.is_tautology() {
            return;
        }
        if cst.is_contradiction() {
            self.set_to_bottom();
            return;
        }

        match cst.kind() {
            ConstraintKind::Inequality => {
                if !self.add_linear_leq(cst.expression()) {
                    self.set_to_bottom();
                }
            }
            ConstraintKind::StrictInequality => {
                if let Some(non_strict) = cst.strict_to_non_strict() {
                    if !self.add_linear_leq(non_strict.expression()) {
                        self.set_to_bottom();
                    }
                }
            }
            ConstraintKind::Equality => {
                let e = cst.expression();
                if !self.add_linear_leq(e) || !self.add_linear_leq(&-e.clone()) {
                    self.set_to_bottom();
                }
            }
            ConstraintKind::Disequation => self.add_disequation(cst.expression()),
        }
    }

    /// The assignment `x := e`.
    pub fn assign(&mut self, x: &Variable, e: &LinearExpression) {
        stats::count("zones.assign");
        let _timer = stats::ScopedTimer::new("zones.assign");

        if self.bottom {
            return;
        }
        debug!("assign {} := {}", x, e);
        self.normalize();

        let x_int = self.eval_interval(e);

        let mut lb_w: Option<Weight> = None;
        let mut ub_w: Option<Weight> = None;
        if let Some(lb) = x_int.lb().number() {
            match (-lb).to_weight() {
                Some(w) => lb_w = Some(w),
                None => {
                    self.forget(x);
                    return;
                }
            }
        }
        if let Some(ub) = x_int.ub().number() {
            match ub.to_weight() {
                Some(w) => ub_w = Some(w),
                None => {
                    self.forget(x);
                    return;
                }
            }
        }

        // If the right-hand side is a constant, just assign the interval.
        if let Some(n) = x_int.singleton() {
            let n = n.clone();
            self.set(x, &Interval::number(n));
            return;
        }

        // Construct difference constraints from the assignment.
        let diffs_lb = self.diffcsts_of_assign(e, false);
        let diffs_ub = self.diffcsts_of_assign(e, true);
        if diffs_lb.is_empty() && diffs_ub.is_empty() {
            self.set(x, &x_int);
            return;
        }

        let e_val = match self.eval_expression(e) {
            Some(v) => v,
            None => {
                self.forget(x);
                return;
            }
        };

        // Allocate a fresh vertex for the new x.
        let vert = self.g.new_vertex();
        if vert < self.rev_map.len() {
            self.potential[vert] = self.potential[0].saturating_add(e_val);
            self.rev_map[vert] = Some(x.clone());
        } else {
            self.potential.push(self.potential[0].saturating_add(e_val));
            self.rev_map.push(Some(x.clone()));
        }

        let mut delta = EdgeVec::new();
        for (variable, n) in &diffs_lb {
            let v = self.get_vert(variable);
            if let Some(w) = n.checked_neg() {
                delta.push((vert, v, w));
            }
        }
        for (variable, n) in &diffs_ub {
            let v = self.get_vert(variable);
            delta.push((v, vert, *n));
        }

        // Safe to apply directly: x's fresh vertex had no edges.
        closure::apply_delta(&mut self.g, &delta);
        delta.clear();
        closure::close_after_assign(&self.g, &self.potential, Some(0), vert, &mut delta);
        closure::apply_delta(&mut self.g, &delta);

        if let Some(lb_w) = lb_w {
            self.g.update_edge(vert, lb_w, 0);
        }
        if let Some(ub_w) = ub_w {
            self.g.update_edge(0, ub_w, vert);
        }

        // Clear the old x vertex and remap.
        self.forget(x);
        self.vert_map.insert(x.clone(), vert);
    }

    /// Replaces everything known about `x` with the given interval.
    pub fn set(&mut self, x: &Variable, intv: &Interval) {
        stats::count("zones.set");

        if self.bottom {
            return;
        }
        if intv.is_bottom() {
            self.set_to_bottom();
            return;
        }
        self.forget(x);
        if intv.is_top() {
            return;
        }

        let vert = self.get_vert(x);
        if let Some(ub) = intv.ub().number() {
            let w = match ub.to_weight() {
                Some(w) => w,
                None => return,
            };
            self.potential[vert] = self.potential[0].saturating_add(w);
            self.g.set_edge(0, w, vert);
        }
        if let Some(lb) = intv.lb().number() {
            let w = match lb.to_weight() {
                Some(w) => w,
                None => return,
            };
            self.potential[vert] = self.potential[0].saturating_add(w);
            self.g.set_edge(vert, -w, 0);
        }
    }

    /// Applies an arithmetic binary operator.
    pub fn apply_arith(&mut self, op: ArithOp, x: &Variable, y: &Variable, z: &Operand) {
        stats::count("zones.apply");

        if self.bottom {
            return;
        }
        self.normalize();

        match op {
            // Addition and subtraction are exact through `assign`.
            ArithOp::Add => {
                let e = LinearExpression::from(y.clone()) + operand_expression(z);
                self.assign(x, &e);
            }
            ArithOp::Sub => {
                let e = LinearExpression::from(y.clone()) - operand_expression(z);
                self.assign(x, &e);
            }
            ArithOp::Mul => match z {
                Operand::Number(k) => {
                    let e = LinearExpression::from(y.clone()).mul_constant(k);
                    self.assign(x, &e);
                }
                Operand::Variable(zv) => {
                    let xi = self.get_interval(y).mul(&self.get_interval(zv));
                    self.set(x, &xi);
                }
            },
            // For the rest of the operations, we fall back on intervals.
            ArithOp::SDiv => {
                let xi = self.get_interval(y).sdiv(&self.operand_interval(z));
                self.set(x, &xi);
            }
            ArithOp::UDiv => {
                let xi = self.get_interval(y).udiv(&self.operand_interval(z));
                self.set(x, &xi);
            }
            ArithOp::SRem => {
                let xi = self.get_interval(y).srem(&self.operand_interval(z));
                self.set(x, &xi);
            }
            ArithOp::URem => {
                let xi = self.get_interval(y).urem(&self.operand_interval(z));
                self.set(x, &xi);
            }
        }
    }

    /// Applies a bitwise binary operator by converting to intervals.
    pub fn apply_bitwise(&mut self, op: BitwiseOp, x: &Variable, y: &Variable, z: &Operand) {
        stats::count("zones.apply");

        if self.bottom {
            return;
        }
        self.normalize();
        if let Operand::Variable(_) = z {
            self.forget(x);
        }

        let yi = self.get_interval(y);
        let zi = self.operand_interval(z);
        let xi = match op {
            BitwiseOp::And => yi.and(&zi),
            BitwiseOp::Or => yi.or(&zi),
            BitwiseOp::Xor => yi.xor(&zi),
            BitwiseOp::Shl => yi.shl(&zi),
            BitwiseOp::LShr => yi.lshr(&zi),
            BitwiseOp::AShr => yi.ashr(&zi),
        };
        self.set(x, &xi);
    }

    /// Parallel rename: `from[i]` becomes `to[i]`. Vertex ids are preserved.
    pub fn rename(&mut self, from: &[Variable], to: &[Variable]) -> Result<(), Error> {
        stats::count("zones.rename");
        if from.len() != to.len() {
            return Err(Error::RenameLengthMismatch);
        }
        if self.is_top() || self.is_bottom() {
            return Ok(());
        }

        let old_map = std::mem::take(&mut self.vert_map);
        let mut new_map = BTreeMap::new();
        for (variable, vert) in old_map {
            match from.iter().position(|f| *f == variable) {
                Some(pos) => {
                    let new_variable = to[pos].clone();
                    self.rev_map[vert] = Some(new_variable.clone());
                    new_map.insert(new_variable, vert);
                }
                None => {
                    new_map.insert(variable, vert);
                }
            }
        }
        self.vert_map = new_map;
        Ok(())
    }
}

fn operand_expression(operand: &Operand) -> LinearExpression {
    match operand {
        Operand::Variable(variable) => LinearExpression::from(variable.clone()),
        Operand::Number(number) => LinearExpression::from(number.clone()),
    }
}

impl Domain for SplitDbm {
    fn bottom() -> Self {
        SplitDbm::bottom()
    }

    fn setup_entry() -> Self {
        SplitDbm::top()
    }

    fn le(&self, other: &Self) -> bool {
        SplitDbm::le(self, other)
    }

    fn join(self, other: &Self) -> Self {
        SplitDbm::join(self, other)
    }

    fn meet(self, other: &Self) -> Self {
        SplitDbm::meet(self, other)
    }

    fn widen(self, other: &Self) -> Self {
        SplitDbm::widen(self, other)
    }

    fn narrow(self, other: &Self) -> Self {
        SplitDbm::narrow(self, other)
    }

    fn transfer(mut self, instruction: &Instruction) -> Self {
        match instruction.operation() {
            Operation::Assign { dst, src } => self.assign(dst, src),
            Operation::ApplyArith { op, dst, lhs, rhs } => self.apply_arith(*op, dst, lhs, rhs),
            Operation::ApplyBitwise { op, dst, lhs, rhs } => {
                self.apply_bitwise(*op, dst, lhs, rhs)
            }
            Operation::Assume(constraint) | Operation::Assert(constraint) => {
                self.add_constraint(constraint)
            }
            Operation::Havoc(variable) => self.forget(variable),
            Operation::Nop => {}
        }
        self
    }
}

impl fmt::Display for SplitDbm {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        let mut dom = self.clone();
        dom.normalize();

        if dom.is_bottom() {
            return write!(f, "_|_");
        }
        if dom.is_top() {
            return write!(f, "{{}}");
        }

        write!(f, "{{")?;
        let mut first = true;
        for (variable, _) in &dom.vert_map {
            let intv = dom.get_interval(variable);
            if intv.is_top() {
                continue;
            }
            if !first {
                write!(f, ", ")?;
            }
            first = false;
            write!(f, "{} -> {}", variable, intv)?;
        }
        for (vs, &s) in &dom.vert_map {
            for (d, w) in dom.g.succs_of(s) {
                if d == 0 {
                    continue;
                }
                if let Some(vd) = &dom.rev_map[d] {
                    if !first {
                        write!(f, ", ")?;
                    }
                    first = false;
                    write!(f, "{}-{}<={}", vd, vs, w)?;
                }
            }
        }
        write!(f, "}}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::il::{expr_const, expr_var, var};

    // x - y <= k
    fn diff_le(x: &str, y: &str, k: i64) -> Constraint {
        Constraint::le(expr_var(x) - expr_var(y), expr_const(k))
    }

    fn assert_closed_and_feasible(dbm: &SplitDbm) {
        assert!(dbm.unstable.is_empty());
        for u in dbm.g.verts() {
            for (v, w) in dbm.g.succs_of(u) {
                assert!(
                    dbm.potential[u] + w >= dbm.potential[v],
                    "potential infeasible for {} -> {}",
                    u,
                    v
                );
                for (t, w2) in dbm.g.succs_of(v) {
                    if t == u {
                        continue;
                    }
                    let shortcut = dbm.g.lookup(u, t).expect("closure: missing shortcut");
                    assert!(shortcut <= w + w2, "closure violated: {} -> {} -> {}", u, v, t);
                }
            }
        }
    }

    #[test]
    fn test_straight_line_assignments() {
        let mut dbm = SplitDbm::top();
        dbm.assign(&var("x"), &expr_const(5));
        dbm.assign(&var("y"), &(expr_var("x") + expr_const(3)));

        assert_eq!(
            dbm.get_interval(&var("x")),
            Interval::number(Number::from(5))
        );
        assert_eq!(
            dbm.get_interval(&var("y")),
            Interval::number(Number::from(8))
        );
    }

    #[test]
    fn test_assign_keeps_relation() {
        let mut dbm = SplitDbm::top();
        // x in [0, 10], y := x + 1: the relation y - x <= 1 must survive
        dbm.set(&var("x"), &Interval::new(0, 10));
        dbm.assign(&var("y"), &(expr_var("x") + expr_const(1)));

        let mut relation = SplitDbm::top();
        relation.add_constraint(&diff_le("y", "x", 1));
        relation.add_constraint(&diff_le("x", "y", -1));
        assert!(dbm.le(&relation));

        assert_eq!(dbm.get_interval(&var("y")), Interval::new(1, 11));
    }

    #[test]
    fn test_constraint_infeasibility() {
        let mut dbm = SplitDbm::top();
        dbm.add_constraint(&diff_le("x", "y", -1));
        assert!(!dbm.is_bottom());
        dbm.add_constraint(&diff_le("y", "x", -1));
        assert!(dbm.is_bottom());
    }

    #[test]
    fn test_constraint_closure() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(0, 5));
        dbm.add_constraint(&diff_le("y", "x", 2));
        dbm.add_constraint(&diff_le("z", "y", 3));
        assert!(!dbm.is_bottom());

        // z - x <= 5 must have been materialized by incremental closure
        let mut want = SplitDbm::top();
        want.add_constraint(&diff_le("z", "x", 5));
        assert!(dbm.le(&want));

        assert_closed_and_feasible(&dbm);
    }

    #[test]
    fn test_join_loses_equality_keeps_octagon_facts() {
        let mut s1 = SplitDbm::top();
        s1.assign(&var("x"), &expr_const(1));
        s1.assign(&var("y"), &expr_const(2));

        let mut s2 = SplitDbm::top();
        s2.assign(&var("x"), &expr_const(2));
        s2.assign(&var("y"), &expr_const(1));

        let j = s1.join(&s2);
        assert!(!j.is_bottom());

        assert_eq!(j.get_interval(&var("x")), Interval::new(1, 2));
        assert_eq!(j.get_interval(&var("y")), Interval::new(1, 2));

        // The difference bounds survive the join...
        let mut want = SplitDbm::top();
        want.add_constraint(&diff_le("x", "y", 1));
        want.add_constraint(&diff_le("y", "x", 1));
        assert!(j.le(&want));

        // ...but x + y = 3 is not expressible: x = 1 must remain possible
        assert!(j.get_interval(&var("x")).singleton().is_none());
    }

    #[test]
    fn test_join_upper_bounds_both_operands() {
        let mut a = SplitDbm::top();
        a.set(&var("x"), &Interval::new(0, 5));
        a.add_constraint(&diff_le("y", "x", 0));

        let mut b = SplitDbm::top();
        b.set(&var("x"), &Interval::new(3, 9));
        b.add_constraint(&diff_le("y", "x", 2));

        let j = a.clone().join(&b);
        assert!(a.le(&j));
        assert!(b.le(&j));
    }

    #[test]
    fn test_meet_lower_bounds_both_operands() {
        let mut a = SplitDbm::top();
        a.set(&var("x"), &Interval::new(0, 5));

        let mut b = SplitDbm::top();
        b.set(&var("x"), &Interval::new(3, 9));

        let m = a.clone().meet(&b);
        assert!(m.le(&a));
        assert!(m.le(&b));
        assert_eq!(m.get_interval(&var("x")), Interval::new(3, 5));
    }

    #[test]
    fn test_meet_detects_infeasibility() {
        let mut a = SplitDbm::top();
        a.add_constraint(&diff_le("x", "y", -1));

        let mut b = SplitDbm::top();
        b.add_constraint(&diff_le("y", "x", -1));

        assert!(a.meet(&b).is_bottom());
    }

    #[test]
    fn test_widen_upper_bounds_join_and_stabilizes() {
        let mut a = SplitDbm::top();
        a.set(&var("x"), &Interval::new(0, 1));

        let mut b = SplitDbm::top();
        b.set(&var("x"), &Interval::new(0, 2));

        let j = a.clone().join(&b);
        let w = a.clone().widen(&b);
        assert!(j.le(&w));

        // the unstable upper bound was extrapolated away
        let mut w_norm = w.clone();
        w_norm.normalize();
        let intv = w_norm.get_interval(&var("x"));
        assert_eq!(*intv.lb(), crate::num::Bound::from(0));
        assert_eq!(*intv.ub(), crate::num::Bound::PlusInfinity);

        // a second widening against the same operand changes nothing more
        let mut w2 = w_norm.clone().widen(&b);
        w2.normalize();
        assert!(w2.le(&w_norm));
        assert!(w_norm.le(&w2));
    }

    #[test]
    fn test_disequation_trims_bound() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(1, 5));
        dbm.add_constraint(&Constraint::ne(expr_var("x"), expr_const(1)));
        assert_eq!(dbm.get_interval(&var("x")), Interval::new(2, 5));

        // no tight bound: x != 3 alone has no effect
        let mut dbm = SplitDbm::top();
        dbm.add_constraint(&Constraint::ne(expr_var("x"), expr_const(3)));
        assert!(dbm.get_interval(&var("x")).is_top());

        // trimming to nothing is bottom
        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(3, 3));
        dbm.add_constraint(&Constraint::ne(expr_var("x"), expr_const(3)));
        assert!(dbm.is_bottom());
    }

    #[test]
    fn test_unsigned_inequality_is_skipped() {
        let mut dbm = SplitDbm::top();
        dbm.add_constraint(&Constraint::unsigned_le(expr_var("x"), expr_const(-1)));
        assert!(dbm.is_top());
    }

    #[test]
    fn test_apply_arith() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("y"), &Interval::new(4, 6));
        dbm.apply_arith(
            ArithOp::Add,
            &var("x"),
            &var("y"),
            &Operand::from(Number::from(10)),
        );
        assert_eq!(dbm.get_interval(&var("x")), Interval::new(14, 16));

        dbm.apply_arith(
            ArithOp::Mul,
            &var("z"),
            &var("y"),
            &Operand::from(Number::from(2)),
        );
        assert_eq!(dbm.get_interval(&var("z")), Interval::new(8, 12));

        dbm.apply_arith(
            ArithOp::SDiv,
            &var("q"),
            &var("y"),
            &Operand::from(Number::from(2)),
        );
        assert_eq!(dbm.get_interval(&var("q")), Interval::new(2, 3));
    }

    #[test]
    fn test_apply_bitwise_drops_to_intervals() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("y"), &Interval::new(0, 12));
        dbm.apply_bitwise(
            BitwiseOp::And,
            &var("x"),
            &var("y"),
            &Operand::from(Number::from(7)),
        );
        assert_eq!(dbm.get_interval(&var("x")), Interval::new(0, 7));
    }

    #[test]
    fn test_havoc_forgets() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(1, 2));
        dbm.forget(&var("x"));
        assert!(dbm.get_interval(&var("x")).is_top());
        assert!(dbm.is_top());

        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(1, 2));
        dbm.set(&var("y"), &Interval::new(3, 4));
        let variables = vec![var("x"), var("y")];
        dbm.forget_all(&variables);
        assert!(dbm.is_top());
    }

    #[test]
    fn test_rename_round_trip() {
        let mut dbm = SplitDbm::top();
        dbm.set(&var("x"), &Interval::new(1, 2));
        dbm.add_constraint(&diff_le("y", "x", 0));

        let from = vec![var("x"), var("y")];
        let to = vec![var("a"), var("b")];
        dbm.rename(&from, &to).unwrap();
        assert_eq!(dbm.get_interval(&var("a")), Interval::new(1, 2));
        assert!(dbm.get_interval(&var("x")).is_top());

        dbm.rename(&to, &from).unwrap();
        assert_eq!(dbm.get_interval(&var("x")), Interval::new(1, 2));

        assert!(dbm
            .rename(&from, &[var("only-one")])
            .is_err());
    }

    #[test]
    fn test_le_unary_fallback() {
        // a knows x in [0, 3] and y in [0, 3] but no direct x/y edge;
        // the inclusion against y - x <= 10 is witnessed through vertex 0.
        let mut a = SplitDbm::top();
        a.set(&var("x"), &Interval::new(0, 3));
        a.set(&var("y"), &Interval::new(0, 3));

        let mut b = SplitDbm::top();
        b.add_constraint(&diff_le("y", "x", 10));
        assert!(a.le(&b));

        let mut c = SplitDbm::top();
        c.add_constraint(&diff_le("y", "x", 2));
        assert!(!a.le(&c));
    }

    #[test]
    fn test_display() {
        let mut dbm = SplitDbm::top();
        assert_eq!(format!("{}", dbm), "{}");
        dbm.set(&var("x"), &Interval::new(1, 2));
        let rendered = format!("{}", dbm);
        assert!(rendered.contains("x -> [1, 2]"));
        assert_eq!(format!("{}", SplitDbm::bottom()), "_|_");
    }
}
