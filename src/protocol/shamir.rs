//! secret sharing algorithms

use super::runtime::SecretValue;
use crate::math::PrimeField;
use crate::protocol::error::Result;
use std::fmt;

/// (t, n) - secret sharing server over a prime field
pub trait SSServer {
    /// number of shares `split` produces
    fn parties(&self) -> usize;

    /// one share per party, in party order
    fn split(&self, secret: &PrimeField) -> Vec<PrimeField>;

    /// reconstructs from the shares that arrived; `shares[i]` belongs to party `i`
    fn recover(&self, shares: &[Option<PrimeField>]) -> Result<PrimeField>;
}

/// this party's share of a secret-shared field element
#[derive(Copy, Clone, PartialEq, Eq)]
pub struct Share(pub(crate) PrimeField);

impl Share {
    /// wraps a share value received from a dealer
    pub fn new(value: PrimeField) -> Self {
        Self(value)
    }
}

impl fmt::Debug for Share {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Share([redacted])")
    }
}

impl SecretValue for Share {
    fn add(&self, other: &Self) -> Self {
        Self(self.0 + other.0)
    }

    fn sub(&self, other: &Self) -> Self {
        Self(self.0 - other.0)
    }

    fn scale(&self, factor: &PrimeField) -> Self {
        Self(self.0 * factor)
    }
}

pub mod functionality;
pub mod threshold;
