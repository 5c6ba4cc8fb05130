//! Closed intervals over extended integers.
//!
//! A `Bound` is a `Number` extended with plus and minus infinity. An
//! `Interval` is a pair of bounds, and forms the usual lattice: bottom when
//! the lower bound exceeds the upper bound, top when both bounds are
//! infinite.

use crate::num::Number;
use serde::{Deserialize, Serialize};
use std::cmp;
use std::fmt;

/// An extended integer: a `Number`, or one of the two infinities.
///
/// The derived ordering is `MinusInfinity < Finite(_) < PlusInfinity`.
#[derive(Clone, Debug, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub enum Bound {
    MinusInfinity,
    Finite(Number),
    PlusInfinity,
}

impl Bound {
    pub fn is_finite(&self) -> bool {
        matches!(self, Bound::Finite(_))
    }

    pub fn is_infinite(&self) -> bool {
        !self.is_finite()
    }

    /// The underlying number, if this bound is finite.
    pub fn number(&self) -> Option<&Number> {
        match self {
            Bound::Finite(n) => Some(n),
            _ => None,
        }
    }

    fn is_zero(&self) -> bool {
        match self {
            Bound::Finite(n) => n.is_zero(),
            _ => false,
        }
    }

    fn is_negative(&self) -> bool {
        match self {
            Bound::MinusInfinity => true,
            Bound::Finite(n) => n.is_negative(),
            Bound::PlusInfinity => false,
        }
    }

    pub fn add(&self, rhs: &Bound) -> Bound {
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a + b),
            (Bound::MinusInfinity, _) => Bound::MinusInfinity,
            (Bound::PlusInfinity, _) => Bound::PlusInfinity,
            (_, b) => b.clone(),
        }
    }

    pub fn neg(&self) -> Bound {
        match self {
            Bound::MinusInfinity => Bound::PlusInfinity,
            Bound::Finite(n) => Bound::Finite(-n),
            Bound::PlusInfinity => Bound::MinusInfinity,
        }
    }

    pub fn sub(&self, rhs: &Bound) -> Bound {
        self.add(&rhs.neg())
    }

    /// Multiplication with the convention that zero dominates infinity.
    pub fn mul(&self, rhs: &Bound) -> Bound {
        if self.is_zero() || rhs.is_zero() {
            return Bound::Finite(Number::zero());
        }
        match (self, rhs) {
            (Bound::Finite(a), Bound::Finite(b)) => Bound::Finite(a * b),
            _ => {
                if self.is_negative() != rhs.is_negative() {
                    Bound::MinusInfinity
                } else {
                    Bound::PlusInfinity
                }
            }
        }
    }
}

impl From<Number> for Bound {
    fn from(n: Number) -> Bound {
        Bound::Finite(n)
    }
}

impl From<i64> for Bound {
    fn from(n: i64) -> Bound {
        Bound::Finite(Number::from(n))
    }
}

impl fmt::Display for Bound {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Bound::MinusInfinity => write!(f, "-oo"),
            Bound::Finite(n) => n.fmt(f),
            Bound::PlusInfinity => write!(f, "+oo"),
        }
    }
}

/// A closed interval `[lb, ub]` over extended integers.
#[derive(Clone, Debug, Deserialize, Eq, Hash, PartialEq, Serialize)]
pub struct Interval {
    lb: Bound,
    ub: Bound,
}

impl Interval {
    pub fn new<L: Into<Bound>, U: Into<Bound>>(lb: L, ub: U) -> Interval {
        Interval {
            lb: lb.into(),
            ub: ub.into(),
        }
    }

    /// The singleton interval `[n, n]`.
    pub fn number(n: Number) -> Interval {
        Interval {
            lb: Bound::Finite(n.clone()),
            ub: Bound::Finite(n),
        }
    }

    pub fn top() -> Interval {
        Interval {
            lb: Bound::MinusInfinity,
            ub: Bound::PlusInfinity,
        }
    }

    pub fn bottom() -> Interval {
        Interval {
            lb: Bound::PlusInfinity,
            ub: Bound::MinusInfinity,
        }
    }

    pub fn is_bottom(&self) -> bool {
        self.lb > self.ub
    }

    pub fn is_top(&self) -> bool {
        self.lb == Bound::MinusInfinity && self.ub == Bound::PlusInfinity
    }

    pub fn lb(&self) -> &Bound {
        &self.lb
    }

    pub fn ub(&self) -> &Bound {
        &self.ub
    }

    /// The sole member of this interval, if there is exactly one.
    pub fn singleton(&self) -> Option<&Number> {
        match (&self.lb, &self.ub) {
            (Bound::Finite(a), Bound::Finite(b)) if a == b => Some(a),
            _ => None,
        }
    }

    pub fn le(&self, other: &Interval) -> bool {
        if self.is_bottom() {
            return true;
        }
        if other.is_bottom() {
            return false;
        }
        other.lb <= self.lb && self.ub <= other.ub
    }

    pub fn join(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Interval {
            lb: cmp::min(&self.lb, &other.lb).clone(),
            ub: cmp::max(&self.ub, &other.ub).clone(),
        }
    }

    pub fn meet(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lb: cmp::max(&self.lb, &other.lb).clone(),
            ub: cmp::min(&self.ub, &other.ub).clone(),
        }
    }

    /// Widening: unstable bounds are extrapolated to infinity.
    pub fn widen(&self, other: &Interval) -> Interval {
        if self.is_bottom() {
            return other.clone();
        }
        if other.is_bottom() {
            return self.clone();
        }
        Interval {
            lb: if other.lb < self.lb {
                Bound::MinusInfinity
            } else {
                self.lb.clone()
            },
            ub: if other.ub > self.ub {
                Bound::PlusInfinity
            } else {
                self.ub.clone()
            },
        }
    }

    /// Narrowing: infinite bounds are refined from the other operand.
    pub fn narrow(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lb: if self.lb == Bound::MinusInfinity {
                other.lb.clone()
            } else {
                self.lb.clone()
            },
            ub: if self.ub == Bound::PlusInfinity {
                other.ub.clone()
            } else {
                self.ub.clone()
            },
        }
    }

    pub fn add(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lb: self.lb.add(&other.lb),
            ub: self.ub.add(&other.ub),
        }
    }

    pub fn sub(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lb: self.lb.sub(&other.ub),
            ub: self.ub.sub(&other.lb),
        }
    }

    pub fn neg(&self) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        Interval {
            lb: self.ub.neg(),
            ub: self.lb.neg(),
        }
    }

    pub fn mul(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        let candidates = [
            self.lb.mul(&other.lb),
            self.lb.mul(&other.ub),
            self.ub.mul(&other.lb),
            self.ub.mul(&other.ub),
        ];
        Interval {
            lb: candidates.iter().min().unwrap().clone(),
            ub: candidates.iter().max().unwrap().clone(),
        }
    }

    /// Signed division, truncated towards zero.
    pub fn sdiv(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        // A divisor interval straddling zero gives no information.
        if other.straddles_zero() {
            return Interval::top();
        }
        match (
            self.lb.number(),
            self.ub.number(),
            other.lb.number(),
            other.ub.number(),
        ) {
            (Some(a), Some(b), Some(c), Some(d)) => {
                let candidates = [a / c, a / d, b / c, b / d];
                let lb = candidates.iter().min().unwrap().clone();
                let ub = candidates.iter().max().unwrap().clone();
                Interval::new(lb, ub)
            }
            _ => Interval::top(),
        }
    }

    /// Unsigned division. Only informative when both operands are known
    /// non-negative.
    pub fn udiv(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if self.is_non_negative() && other.is_non_negative() {
            self.sdiv(other)
        } else {
            Interval::top()
        }
    }

    /// Signed remainder; the sign follows the dividend.
    pub fn srem(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if other.straddles_zero() {
            return Interval::top();
        }
        let magnitude = match (other.lb.number(), other.ub.number()) {
            (Some(c), Some(d)) => cmp::max(c.abs(), d.abs()) - &Number::one(),
            _ => return Interval::top(),
        };
        let bound = Bound::Finite(magnitude);
        if self.is_non_negative() {
            Interval {
                lb: Bound::Finite(Number::zero()),
                ub: cmp::min(self.ub.clone(), bound),
            }
        } else if self.is_non_positive() {
            Interval {
                lb: cmp::max(self.lb.clone(), bound.neg()),
                ub: Bound::Finite(Number::zero()),
            }
        } else {
            Interval {
                lb: bound.neg(),
                ub: bound,
            }
        }
    }

    /// Unsigned remainder. Only informative when both operands are known
    /// non-negative.
    pub fn urem(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if !self.is_non_negative() || !other.is_non_negative() {
            return Interval::top();
        }
        match other.ub.number() {
            Some(d) if !d.is_zero() => {
                let bound = Bound::Finite(d - &Number::one());
                Interval {
                    lb: Bound::Finite(Number::zero()),
                    ub: cmp::min(self.ub.clone(), bound),
                }
            }
            _ => Interval {
                lb: Bound::Finite(Number::zero()),
                ub: self.ub.clone(),
            },
        }
    }

    pub fn and(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if let (Some(a), Some(b)) = (self.singleton(), other.singleton()) {
            return Interval::number(a.bitand(b));
        }
        if self.is_non_negative() && other.is_non_negative() {
            Interval {
                lb: Bound::Finite(Number::zero()),
                ub: cmp::min(self.ub.clone(), other.ub.clone()),
            }
        } else {
            Interval::top()
        }
    }

    pub fn or(&self, other: &Interval) -> Interval {
        self.bitwise_upcast(other, Number::bitor)
    }

    pub fn xor(&self, other: &Interval) -> Interval {
        self.bitwise_upcast(other, Number::bitxor)
    }

    pub fn shl(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if let Some(k) = other.shift_amount() {
            let factor = Interval::number(Number::one().shl(k));
            return self.mul(&factor);
        }
        if self.is_non_negative() && other.is_non_negative() {
            Interval {
                lb: Bound::Finite(Number::zero()),
                ub: Bound::PlusInfinity,
            }
        } else {
            Interval::top()
        }
    }

    pub fn lshr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if !self.is_non_negative() {
            return Interval::top();
        }
        if let Some(k) = other.shift_amount() {
            return self.shr_by(k);
        }
        if other.is_non_negative() {
            Interval {
                lb: Bound::Finite(Number::zero()),
                ub: self.ub.clone(),
            }
        } else {
            Interval::top()
        }
    }

    pub fn ashr(&self, other: &Interval) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if let Some(k) = other.shift_amount() {
            return self.shr_by(k);
        }
        Interval::top()
    }

    /// Disequation trimming: shave an endpoint that is exactly `n`.
    pub fn trim_diseq(&self, n: &Number) -> Interval {
        if self.is_bottom() {
            return Interval::bottom();
        }
        let mut lb = self.lb.clone();
        let mut ub = self.ub.clone();
        if lb == Bound::Finite(n.clone()) {
            lb = Bound::Finite(n + &Number::one());
        }
        if ub == Bound::Finite(n.clone()) {
            ub = Bound::Finite(n - &Number::one());
        }
        Interval { lb, ub }
    }

    fn is_non_negative(&self) -> bool {
        !self.lb.is_negative()
    }

    fn is_non_positive(&self) -> bool {
        self.ub.is_negative() || self.ub.is_zero()
    }

    fn straddles_zero(&self) -> bool {
        self.lb.is_negative() && !self.ub.is_negative()
            || self.lb.is_zero()
            || self.ub.is_zero()
    }

    // A non-negative shift amount known exactly.
    fn shift_amount(&self) -> Option<usize> {
        let n = self.singleton()?;
        if n.is_negative() {
            return None;
        }
        n.to_weight().map(|w| w as usize)
    }

    fn shr_by(&self, k: usize) -> Interval {
        let lb = match &self.lb {
            Bound::Finite(n) => Bound::Finite(n.shr(k)),
            b => b.clone(),
        };
        let ub = match &self.ub {
            Bound::Finite(n) => Bound::Finite(n.shr(k)),
            b => b.clone(),
        };
        Interval { lb, ub }
    }

    // Sound envelope for OR/XOR: the result of either operation on
    // non-negative operands fits below the next all-ones value.
    fn bitwise_upcast(
        &self,
        other: &Interval,
        op: fn(&Number, &Number) -> Number,
    ) -> Interval {
        if self.is_bottom() || other.is_bottom() {
            return Interval::bottom();
        }
        if let (Some(a), Some(b)) = (self.singleton(), other.singleton()) {
            return Interval::number(op(a, b));
        }
        if self.is_non_negative() && other.is_non_negative() {
            match (self.ub.number(), other.ub.number()) {
                (Some(a), Some(b)) => {
                    let bits = cmp::max(a.bits(), b.bits());
                    let all_ones = Number::one().shl(bits as usize) - &Number::one();
                    Interval::new(Number::zero(), all_ones)
                }
                _ => Interval {
                    lb: Bound::Finite(Number::zero()),
                    ub: Bound::PlusInfinity,
                },
            }
        } else {
            Interval::top()
        }
    }
}

impl fmt::Display for Interval {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.is_bottom() {
            write!(f, "_|_")
        } else {
            write!(f, "[{}, {}]", self.lb, self.ub)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn itv(lb: i64, ub: i64) -> Interval {
        Interval::new(lb, ub)
    }

    #[test]
    fn test_lattice() {
        let a = itv(0, 5);
        let b = itv(3, 10);

        assert_eq!(a.join(&b), itv(0, 10));
        assert_eq!(a.meet(&b), itv(3, 5));
        assert!(a.le(&a.join(&b)));
        assert!(b.le(&a.join(&b)));
        assert!(a.meet(&b).le(&a));
        assert!(a.meet(&b).le(&b));

        assert!(itv(5, 3).is_bottom());
        assert!(Interval::bottom().le(&a));
        assert!(a.le(&Interval::top()));
    }

    #[test]
    fn test_widen_narrow() {
        let a = itv(0, 5);
        let b = itv(0, 10);

        let w = a.widen(&b);
        assert_eq!(*w.lb(), Bound::from(0));
        assert_eq!(*w.ub(), Bound::PlusInfinity);
        assert!(a.join(&b).le(&w));

        // widening stabilizes: a second application changes nothing
        assert_eq!(w.widen(&b), w);

        let n = w.narrow(&b);
        assert_eq!(n, itv(0, 10));
    }

    #[test]
    fn test_arithmetic() {
        assert_eq!(itv(1, 2).add(&itv(10, 20)), itv(11, 22));
        assert_eq!(itv(1, 2).sub(&itv(10, 20)), itv(-19, -8));
        assert_eq!(itv(-2, 3).mul(&itv(4, 5)), itv(-10, 15));
        assert_eq!(itv(-7, 7).sdiv(&itv(2, 3)), itv(-3, 3));
        assert!(itv(1, 2).sdiv(&itv(-1, 1)).is_top());
    }

    #[test]
    fn test_mul_zero_and_infinity() {
        let zero = Interval::number(Number::zero());
        assert_eq!(zero.mul(&Interval::top()), zero);
    }

    #[test]
    fn test_bitwise() {
        assert_eq!(
            Interval::number(Number::from(12)).and(&Interval::number(Number::from(10))),
            Interval::number(Number::from(8))
        );
        assert_eq!(itv(0, 12).and(&itv(0, 10)), itv(0, 10));
        assert_eq!(itv(0, 5).or(&itv(0, 9)), itv(0, 15));
        assert_eq!(itv(1, 3).shl(&itv(2, 2)), itv(4, 12));
        assert_eq!(itv(4, 12).lshr(&itv(2, 2)), itv(1, 3));
    }

    #[test]
    fn test_trim_diseq() {
        assert_eq!(itv(1, 5).trim_diseq(&Number::from(1)), itv(2, 5));
        assert_eq!(itv(1, 5).trim_diseq(&Number::from(5)), itv(1, 4));
        assert_eq!(itv(1, 5).trim_diseq(&Number::from(3)), itv(1, 5));
        assert!(itv(3, 3).trim_diseq(&Number::from(3)).is_bottom());
        assert_eq!(
            Interval::top().trim_diseq(&Number::from(3)),
            Interval::top()
        );
    }
}
