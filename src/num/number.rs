//! A `Number` is an arbitrary-precision integer.

use num_bigint::BigInt;
use num_traits::{One, Signed, ToPrimitive, Zero};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Rem, Sub};

/// The fixed-width weight type used for graph edges in the zones domain.
pub type Weight = i64;

#[derive(Clone, Debug, Default, Deserialize, Eq, Hash, Ord, PartialEq, PartialOrd, Serialize)]
pub struct Number(BigInt);

impl Number {
    pub fn zero() -> Number {
        Number(BigInt::zero())
    }

    pub fn one() -> Number {
        Number(BigInt::one())
    }

    pub fn is_zero(&self) -> bool {
        self.0.is_zero()
    }

    pub fn is_negative(&self) -> bool {
        self.0.is_negative()
    }

    pub fn is_positive(&self) -> bool {
        self.0.is_positive()
    }

    pub fn abs(&self) -> Number {
        Number(self.0.abs())
    }

    /// Convert this `Number` to a fixed-width edge weight.
    ///
    /// Returns `None` on overflow. `Weight::MIN` is rejected as well, so a
    /// converted weight can always be negated.
    pub fn to_weight(&self) -> Option<Weight> {
        match self.0.to_i64() {
            Some(w) if w != Weight::MIN => Some(w),
            _ => None,
        }
    }

    /// Shift left by `bits`, i.e. multiply by two to the `bits`.
    pub fn shl(&self, bits: usize) -> Number {
        Number(self.0.clone() << bits)
    }

    /// Shift right by `bits`, rounding towards negative infinity.
    pub fn shr(&self, bits: usize) -> Number {
        Number(self.0.clone() >> bits)
    }

    /// The number of bits required to represent the magnitude of this number.
    pub fn bits(&self) -> u64 {
        self.0.bits()
    }

    pub fn bitand(&self, rhs: &Number) -> Number {
        Number(self.0.clone() & rhs.0.clone())
    }

    pub fn bitor(&self, rhs: &Number) -> Number {
        Number(self.0.clone() | rhs.0.clone())
    }

    pub fn bitxor(&self, rhs: &Number) -> Number {
        Number(self.0.clone() ^ rhs.0.clone())
    }
}

impl From<Weight> for Number {
    fn from(value: Weight) -> Number {
        Number(BigInt::from(value))
    }
}

impl From<i32> for Number {
    fn from(value: i32) -> Number {
        Number(BigInt::from(value))
    }
}

impl From<u64> for Number {
    fn from(value: u64) -> Number {
        Number(BigInt::from(value))
    }
}

impl From<usize> for Number {
    fn from(value: usize) -> Number {
        Number(BigInt::from(value))
    }
}

impl Add for Number {
    type Output = Number;
    fn add(self, rhs: Number) -> Number {
        Number(self.0 + rhs.0)
    }
}

impl<'a> Add<&'a Number> for Number {
    type Output = Number;
    fn add(self, rhs: &Number) -> Number {
        Number(self.0 + rhs.0.clone())
    }
}

impl<'a, 'b> Add<&'b Number> for &'a Number {
    type Output = Number;
    fn add(self, rhs: &Number) -> Number {
        Number(self.0.clone() + rhs.0.clone())
    }
}

impl Sub for Number {
    type Output = Number;
    fn sub(self, rhs: Number) -> Number {
        Number(self.0 - rhs.0)
    }
}

impl<'a> Sub<&'a Number> for Number {
    type Output = Number;
    fn sub(self, rhs: &Number) -> Number {
        Number(self.0 - rhs.0.clone())
    }
}

impl<'a, 'b> Sub<&'b Number> for &'a Number {
    type Output = Number;
    fn sub(self, rhs: &Number) -> Number {
        Number(self.0.clone() - rhs.0.clone())
    }
}

impl Mul for Number {
    type Output = Number;
    fn mul(self, rhs: Number) -> Number {
        Number(self.0 * rhs.0)
    }
}

impl<'a, 'b> Mul<&'b Number> for &'a Number {
    type Output = Number;
    fn mul(self, rhs: &Number) -> Number {
        Number(self.0.clone() * rhs.0.clone())
    }
}

// Truncated towards zero, like machine division.
impl<'a, 'b> Div<&'b Number> for &'a Number {
    type Output = Number;
    fn div(self, rhs: &Number) -> Number {
        Number(self.0.clone() / rhs.0.clone())
    }
}

// Sign follows the dividend, like machine remainder.
impl<'a, 'b> Rem<&'b Number> for &'a Number {
    type Output = Number;
    fn rem(self, rhs: &Number) -> Number {
        Number(self.0.clone() % rhs.0.clone())
    }
}

impl Neg for Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number(-self.0)
    }
}

impl<'a> Neg for &'a Number {
    type Output = Number;
    fn neg(self) -> Number {
        Number(-self.0.clone())
    }
}

impl fmt::Display for Number {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_weight() {
        assert_eq!(Number::from(42).to_weight(), Some(42));
        assert_eq!(Number::from(-7).to_weight(), Some(-7));
        assert_eq!(Number::from(Weight::MAX).to_weight(), Some(Weight::MAX));

        // MIN is rejected so negation never overflows
        assert_eq!(Number::from(Weight::MIN).to_weight(), None);

        let too_big = Number::from(Weight::MAX) + Number::one();
        assert_eq!(too_big.to_weight(), None);
    }

    #[test]
    fn test_truncated_division() {
        let a = Number::from(-7);
        let b = Number::from(2);
        assert_eq!(&a / &b, Number::from(-3));
        assert_eq!(&a % &b, Number::from(-1));
    }
}
