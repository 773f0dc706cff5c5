//! capabilities the PRF core borrows from a secret-sharing runtime

use super::error::{Error, Result};
use super::SessionId;
use crate::math::{Multiplier, PrimeField, PrimeModulus};

/// one party's share of a value nobody knows in full
///
/// Linear operations are local and free.
pub trait SecretValue: Clone {
    fn add(&self, other: &Self) -> Self;
    fn sub(&self, other: &Self) -> Self;
    fn scale(&self, factor: &PrimeField) -> Self;
}

/// the interactive half of a secret-sharing scheme
///
/// `multiply` and `open` each take one round with the other parties and block
/// until it completes or fails.
pub trait MpcRuntime {
    type Share: SecretValue;

    fn modulus(&self) -> &PrimeModulus;

    /// a sharing of a public constant
    fn constant(&self, value: &PrimeField) -> Self::Share;

    fn multiply(&mut self, lhs: &Self::Share, rhs: &Self::Share) -> Result<Self::Share>;

    fn open(&mut self, share: &Self::Share) -> Result<PrimeField>;
}

/// supplier of material dealt ahead of a run
pub trait Preprocessing: MpcRuntime {
    fn key_share(&mut self, session: SessionId) -> Result<Self::Share>;

    /// secret multiplications this party can still perform
    fn multiplications_left(&self) -> usize;
}

/// feeds a runtime's multiplications into an exponentiation chain
pub(crate) struct Interactive<'a, R>(pub(crate) &'a mut R);

impl<R: MpcRuntime> Multiplier<R::Share> for Interactive<'_, R> {
    type Error = Error;

    fn one(&self) -> R::Share {
        let one = self.0.modulus().one();
        self.0.constant(&one)
    }

    fn multiply(&mut self, lhs: &R::Share, rhs: &R::Share) -> Result<R::Share> {
        self.0.multiply(lhs, rhs)
    }
}
