//! demonstrates the functionality of secret sharing algorithm
//! Panic! NEVER use this protocol because it's unsafe.
//!
//! Every party holds the secret itself, so shares multiply locally and open
//! without talking to anyone. It serves as the plaintext reference the
//! interactive runtimes are checked against.

use super::{SSServer, Share};
use crate::math::{PrimeField, PrimeModulus};
use crate::protocol::error::{MPCErrorKind, Result};
use crate::protocol::runtime::{MpcRuntime, Preprocessing};
use crate::protocol::SessionId;
use std::collections::BTreeMap;
use tracing::error;

/// replicates the secret to every party and recovers by majority vote
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct Server {
    threshold: usize,
    parties: usize,
}

impl Server {
    pub fn new(threshold: usize, parties: usize) -> Self {
        Self { threshold, parties }
    }
}

impl SSServer for Server {
    fn parties(&self) -> usize {
        self.parties
    }

    fn split(&self, secret: &PrimeField) -> Vec<PrimeField> {
        vec![*secret; self.parties]
    }

    fn recover(&self, shares: &[Option<PrimeField>]) -> Result<PrimeField> {
        let mut lead = None;
        let mut vote = 0;
        for &share in shares.iter().filter(|share| share.is_some()) {
            if share == lead {
                vote += 1;
            } else if vote == 0 {
                lead = share;
                vote = 1;
            } else {
                vote -= 1;
            }
        }
        let support = shares.iter().filter(|&&share| share == lead).count();
        let present = shares.iter().filter(|share| share.is_some()).count();
        match lead {
            Some(secret) if support > self.threshold && 2 * support > present => Ok(secret),
            _ => {
                error!("no value is backed by more than {} shares", self.threshold);
                Err(MPCErrorKind::InsufficientShares.into())
            }
        }
    }
}

/// plaintext runtime: a share is the value it stands for
#[derive(Clone, Debug)]
pub struct Runtime {
    modulus: PrimeModulus,
    keys: BTreeMap<SessionId, PrimeField>,
    budget: Option<usize>,
    multiplications: usize,
}

impl Runtime {
    pub fn new(modulus: PrimeModulus) -> Self {
        Self {
            modulus,
            keys: BTreeMap::new(),
            budget: None,
            multiplications: 0,
        }
    }

    /// hands out `key` itself as the key share of `session`
    pub fn with_key(mut self, session: SessionId, key: PrimeField) -> Self {
        self.keys.insert(session, key);
        self
    }

    /// caps the number of multiplications, as a dealer's triple count would
    pub fn with_budget(mut self, budget: usize) -> Self {
        self.budget = Some(budget);
        self
    }

    /// multiplications performed so far
    pub fn multiplications(&self) -> usize {
        self.multiplications
    }
}

impl MpcRuntime for Runtime {
    type Share = Share;

    fn modulus(&self) -> &PrimeModulus {
        &self.modulus
    }

    fn constant(&self, value: &PrimeField) -> Share {
        Share(*value)
    }

    fn multiply(&mut self, lhs: &Share, rhs: &Share) -> Result<Share> {
        if self.multiplications_left() == 0 {
            error!("multiplication budget of {:?} spent", self.budget);
            Err(MPCErrorKind::PreprocessingExhausted {
                needed: self.multiplications + 1,
                available: self.multiplications,
            })?;
        }
        self.multiplications += 1;
        Ok(Share(lhs.0 * rhs.0))
    }

    fn open(&mut self, share: &Share) -> Result<PrimeField> {
        Ok(share.0)
    }
}

impl Preprocessing for Runtime {
    fn key_share(&mut self, session: SessionId) -> Result<Share> {
        match self.keys.get(&session) {
            Some(key) => Ok(Share(*key)),
            None => {
                error!("no key registered for session {}", session);
                Err(MPCErrorKind::MissingKeyShare { session }.into())
            }
        }
    }

    fn multiplications_left(&self) -> usize {
        self.budget
            .map_or(usize::MAX, |budget| budget.saturating_sub(self.multiplications))
    }
}

#[test]
fn test_correctness() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let server = Server::new(2, 5);
    let secret = modulus.random_make();
    let mut shares: Vec<Option<PrimeField>> = server.split(&secret).into_iter().map(Some).collect();
    shares[0] = None;
    shares[1].replace(modulus.random_make());
    assert_eq!(secret, server.recover(&shares).unwrap());
    shares[2].replace(modulus.random_make());
    assert_eq!(
        Error::MPCError(MPCErrorKind::InsufficientShares),
        server.recover(&shares).unwrap_err()
    );
}

#[test]
fn test_runtime_budget() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let mut runtime = Runtime::new(modulus).with_key(7, modulus.make_u64(3)).with_budget(1);
    let key = runtime.key_share(7).unwrap();
    let square = runtime.multiply(&key, &key).unwrap();
    assert_eq!(runtime.open(&square).unwrap(), modulus.make_u64(9));
    assert_eq!(runtime.multiplications_left(), 0);
    assert!(matches!(
        runtime.multiply(&key, &key),
        Err(Error::MPCError(MPCErrorKind::PreprocessingExhausted { .. }))
    ));
    assert_eq!(
        runtime.key_share(8).unwrap_err(),
        Error::MPCError(MPCErrorKind::MissingKeyShare { session: 8 })
    );
}
