//! commutative monoid arithmetic and exponentiation chains

use super::gauss::{bit, bit_length, Uint};
use std::convert::Infallible;
use std::ops::{Mul, MulAssign};

/// supports multiplicative inverse operation
pub trait Inv: Sized {
    /// `None` for elements without an inverse
    fn inv(&self) -> Option<Self>;
}

/// provides functionality to Abelian multiplication monoid
pub trait AbelianMonoid:
    'static
    + Clone
    + Copy
    + Eq
    + Send
    + Sized
    + Sync
    + Mul<Self, Output = Self>
    + MulAssign<Self>
    + for<'a> Mul<&'a Self, Output = Self>
    + for<'a> MulAssign<&'a Self>
{
    fn one(&self) -> Self;
    fn pow(&self, exponent: &Uint) -> Self;
}

/// a multiplication step of an exponentiation chain
///
/// Implementations that talk to other parties suspend inside `multiply`; the
/// chain itself never runs two steps at once.
pub trait Multiplier<T> {
    type Error;

    /// the multiplicative identity in the representation of `T`
    fn one(&self) -> T;

    fn multiply(&mut self, lhs: &T, rhs: &T) -> Result<T, Self::Error>;
}

/// raises `base` to `exponent` by least-significant-bit-first square-and-multiply
///
/// Performs `popcount(exponent)` multiplications and `bit_length(exponent) - 1`
/// squarings, each strictly after the previous one.
pub fn square_and_multiply<T, M: Multiplier<T>>(
    multiplier: &mut M,
    base: T,
    exponent: &Uint,
) -> Result<T, M::Error> {
    let length = bit_length(exponent);
    let mut result = multiplier.one();
    let mut accumulator = base;
    for index in 0..length {
        if bit(exponent, index) {
            result = multiplier.multiply(&result, &accumulator)?;
        }
        if index + 1 < length {
            accumulator = multiplier.multiply(&accumulator, &accumulator)?;
        }
    }
    Ok(result)
}

/// number of multiplications [`square_and_multiply`] spends on `exponent`
pub fn chain_cost(exponent: &Uint) -> usize {
    super::gauss::popcount(exponent) + bit_length(exponent).saturating_sub(1)
}

/// multiplies plaintext values locally
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Cleartext<F> {
    one: F,
}

impl<F: AbelianMonoid> Cleartext<F> {
    /// takes the identity from any element of the same structure
    pub fn new(sample: &F) -> Self {
        Self { one: sample.one() }
    }

    /// runs the shared exponentiation chain in the clear
    pub fn pow(&mut self, base: F, exponent: &Uint) -> F {
        match square_and_multiply(self, base, exponent) {
            Ok(value) => value,
            Err(never) => match never {},
        }
    }
}

impl<F: AbelianMonoid> Multiplier<F> for Cleartext<F> {
    type Error = Infallible;

    fn one(&self) -> F {
        self.one
    }

    fn multiply(&mut self, lhs: &F, rhs: &F) -> Result<F, Infallible> {
        Ok(*lhs * rhs)
    }
}

#[test]
fn test_square_and_multiply_matches_pow() {
    use crate::math::PrimeModulus;

    let modulus = PrimeModulus::bls12_381_scalar();
    let mut clear = Cleartext::new(&modulus.one());
    for _ in 0..8 {
        let base = modulus.random_make();
        let exponent = modulus.random_make().rep();
        assert_eq!(clear.pow(base, &exponent), base.pow(&exponent));
    }
    let base = modulus.make_u64(5);
    assert_eq!(clear.pow(base, &Uint::ZERO), modulus.one());
    assert_eq!(clear.pow(base, &Uint::ONE), base);
}

#[test]
fn test_chain_cost() {
    struct Counting(usize);

    impl Multiplier<u64> for Counting {
        type Error = Infallible;

        fn one(&self) -> u64 {
            1
        }

        fn multiply(&mut self, lhs: &u64, rhs: &u64) -> Result<u64, Infallible> {
            self.0 += 1;
            Ok(lhs.wrapping_mul(*rhs))
        }
    }

    let exponent = Uint::from_u64(0b1101);
    let mut counting = Counting(0);
    assert_eq!(square_and_multiply(&mut counting, 3, &exponent), Ok(3u64.pow(13)));
    assert_eq!(counting.0, chain_cost(&exponent));
    assert_eq!(counting.0, 3 + 3);
}
