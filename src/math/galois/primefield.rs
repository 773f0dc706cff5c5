//! prime field is a field of prime order

use crate::math::{
    abel::{AbelianMonoid, Inv},
    gauss::{modular::MontyForm, Uint, LIMBS},
};
use std::fmt;
use std::ops::{Add, AddAssign, Mul, MulAssign, Neg, Sub, SubAssign};

/// represents a number in prime field
///
/// Elements carry their modulus parameters, so values made under different
/// moduli can coexist; mixing them in one expression is a caller error.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PrimeField(pub(crate) MontyForm<LIMBS>);

impl PrimeField {
    /// get the modulus of this number
    pub fn modulus(&self) -> Uint {
        self.0.params().modulus().get()
    }

    /// get the integer representation of this number
    pub fn rep(&self) -> Uint {
        self.0.retrieve()
    }

    pub fn zero(&self) -> Self {
        Self(MontyForm::zero(*self.0.params()))
    }

    pub fn is_zero(&self) -> bool {
        *self == self.zero()
    }

    /// get minus one
    pub fn minus_one(&self) -> Self {
        -self.one()
    }

    pub fn square(&self) -> Self {
        Self(self.0.square())
    }
}

impl fmt::Display for PrimeField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.rep())
    }
}

/// derives negation from MontyForm
impl Neg for PrimeField {
    type Output = Self;

    #[inline]
    #[track_caller]
    fn neg(self) -> Self::Output {
        Self(self.0.neg())
    }
}

/// derives binary operators from MontyForm
macro_rules! derive_binary_ops {
    ($($Op:ident :: $op:ident)+) => {$(
        impl $Op<Self> for PrimeField {
            type Output = Self;

            #[inline]
            #[track_caller]
            fn $op(self, other: Self) -> Self::Output {
                Self(self.0.$op(other.0))
            }
        }

        impl $Op<&Self> for PrimeField {
            type Output = Self;

            #[inline]
            #[track_caller]
            fn $op(self, other: &Self) -> Self::Output {
                $Op::$op(self, *other)
            }
        }
    )+};
}

derive_binary_ops!(Add::add Sub::sub Mul::mul);

/// derives binary assignment operators from MontyForm
macro_rules! derive_binary_assign_ops {
    ($($Op:ident :: $op:ident)+) => {$(
        impl $Op<Self> for PrimeField {
            #[inline]
            #[track_caller]
            fn $op(&mut self, other: Self) {
                self.0.$op(other.0);
            }
        }

        impl $Op<&Self> for PrimeField {
            #[inline]
            #[track_caller]
            fn $op(&mut self, other: &Self) {
                $Op::$op(self, *other);
            }
        }
    )+};
}

derive_binary_assign_ops!(AddAssign::add_assign SubAssign::sub_assign MulAssign::mul_assign);

impl AbelianMonoid for PrimeField {
    fn one(&self) -> Self {
        Self(MontyForm::one(*self.0.params()))
    }

    fn pow(&self, exponent: &Uint) -> Self {
        Self(self.0.pow(exponent))
    }
}

/// inverts by Fermat's little theorem
impl Inv for PrimeField {
    fn inv(&self) -> Option<Self> {
        if self.is_zero() {
            return None;
        }
        let exponent = self.modulus().wrapping_sub(&Uint::from_u64(2));
        Some(self.pow(&exponent))
    }
}

#[test]
fn test_field_ops() {
    use crate::math::PrimeModulus;

    let modulus = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    let a = modulus.make_u64(90);
    let b = modulus.make_u64(10);
    assert_eq!(a + b, modulus.make_u64(3));
    assert_eq!(b - a, modulus.make_u64(17));
    assert_eq!(a * b, modulus.make_u64(27));
    assert_eq!(-b, modulus.make_u64(87));
    assert_eq!(b.minus_one(), modulus.make_u64(96));
    assert_eq!(b.inv().map(|inv| inv * b), Some(modulus.one()));
    assert_eq!(modulus.zero().inv(), None);
    assert_eq!(a.rep(), Uint::from_u64(90));
    assert_eq!(modulus.make_u64(97 + 4), modulus.make_u64(4));

    let mut c = a;
    c *= b;
    c += &b;
    c -= a;
    assert_eq!(c, modulus.make_u64((27 + 10 + 97 - 90) % 97));
}
