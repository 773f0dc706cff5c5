//! Shamir's threshold scheme over a prime field

use super::SSServer;
use crate::math::{Inv, Polynomial, PrimeField, PrimeModulus};
use crate::protocol::error::{ConfigErrorKind, MPCErrorKind, Result};
use tracing::error;

/// shares are evaluations of a random degree-`threshold` polynomial at `1..=parties`
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct ThresholdScheme {
    modulus: PrimeModulus,
    threshold: usize,
    parties: usize,
}

impl ThresholdScheme {
    pub fn new(modulus: PrimeModulus, threshold: usize, parties: usize) -> Result<Self> {
        if parties == 0 || threshold >= parties {
            error!("invalid ({}, {}) threshold scheme", threshold, parties);
            Err(ConfigErrorKind::InvalidThreshold { threshold, parties })?;
        }
        Ok(Self {
            modulus,
            threshold,
            parties,
        })
    }

    pub fn threshold(&self) -> usize {
        self.threshold
    }

    pub fn modulus(&self) -> &PrimeModulus {
        &self.modulus
    }

    /// evaluation point of party `id`
    fn point(&self, id: usize) -> PrimeField {
        self.modulus.make_u64(id as u64 + 1)
    }

    /// Lagrange basis over `points`, evaluated at `at`
    fn lagrange(&self, points: &[PrimeField], at: &PrimeField) -> Result<Vec<PrimeField>> {
        points
            .iter()
            .enumerate()
            .map(|(j, xj)| {
                let (numerator, denominator) = points
                    .iter()
                    .enumerate()
                    .filter(|(m, _)| *m != j)
                    .fold((self.modulus.one(), self.modulus.one()), |(n, d), (_, xm)| {
                        (n * (*at - xm), d * (*xj - xm))
                    });
                let inverse = denominator
                    .inv()
                    .ok_or(MPCErrorKind::InconsistentShares)?;
                Ok(numerator * inverse)
            })
            .collect()
    }
}

impl SSServer for ThresholdScheme {
    fn parties(&self) -> usize {
        self.parties
    }

    fn split(&self, secret: &PrimeField) -> Vec<PrimeField> {
        let mut coeffs = Vec::with_capacity(self.threshold + 1);
        coeffs.push(*secret);
        coeffs.extend((0..self.threshold).map(|_| self.modulus.random_make()));
        let polynomial = Polynomial::from_coefficients(coeffs);
        (0..self.parties)
            .map(|id| polynomial.evaluate(&self.point(id)))
            .collect()
    }

    /// interpolates from the first `threshold + 1` shares and checks the rest
    fn recover(&self, shares: &[Option<PrimeField>]) -> Result<PrimeField> {
        let present: Vec<(PrimeField, PrimeField)> = shares
            .iter()
            .take(self.parties)
            .enumerate()
            .filter_map(|(id, share)| share.map(|value| (self.point(id), value)))
            .collect();
        if present.len() <= self.threshold {
            error!(
                "{} shares present, {} needed to reconstruct",
                present.len(),
                self.threshold + 1
            );
            Err(MPCErrorKind::InsufficientShares)?;
        }
        let (basis, extra) = present.split_at(self.threshold + 1);
        let points: Vec<_> = basis.iter().map(|(x, _)| *x).collect();
        let interpolate = |at: &PrimeField| -> Result<PrimeField> {
            let weights = self.lagrange(&points, at)?;
            Ok(basis
                .iter()
                .zip(weights)
                .fold(self.modulus.zero(), |acc, ((_, y), w)| acc + *y * w))
        };
        let secret = interpolate(&self.modulus.zero())?;
        for (x, y) in extra {
            if interpolate(x)? != *y {
                error!("share at point {} is off the interpolated polynomial", x);
                Err(MPCErrorKind::InconsistentShares)?;
            }
        }
        Ok(secret)
    }
}

#[test]
fn test_split_and_recover() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 1, 4).unwrap();
    let secret = modulus.random_make();
    let shares: Vec<_> = scheme.split(&secret).into_iter().map(Some).collect();
    assert_eq!(scheme.recover(&shares).unwrap(), secret);

    // any t + 1 shares suffice
    let mut partial = shares.clone();
    partial[0] = None;
    partial[2] = None;
    assert_eq!(scheme.recover(&partial).unwrap(), secret);

    partial[1] = None;
    assert_eq!(
        scheme.recover(&partial),
        Err(Error::MPCError(MPCErrorKind::InsufficientShares))
    );
}

#[test]
fn test_detects_inconsistent_share() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 1, 4).unwrap();
    let secret = modulus.make_u64(1234);
    let mut shares: Vec<_> = scheme.split(&secret).into_iter().map(Some).collect();
    shares[3] = Some(modulus.random_make());
    assert_eq!(
        scheme.recover(&shares),
        Err(Error::MPCError(MPCErrorKind::InconsistentShares))
    );
}

#[test]
fn test_shares_are_linear() {
    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 2, 5).unwrap();
    let (a, b) = (modulus.make_u64(40), modulus.make_u64(2));
    let c = modulus.make_u64(7);
    let combined: Vec<_> = scheme
        .split(&a)
        .into_iter()
        .zip(scheme.split(&b))
        .map(|(x, y)| Some(x * c + y + c))
        .collect();
    assert_eq!(scheme.recover(&combined).unwrap(), modulus.make_u64(40 * 7 + 2 + 7));
    assert!(ThresholdScheme::new(modulus, 5, 5).is_err());
}
