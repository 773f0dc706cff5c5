//! offline material: key shares and Beaver triples
//!
//! A trusted dealer samples every secret and hands each party its shares. The
//! online phase consumes one triple per secret multiplication.

use super::error::{InputErrorKind, MPCErrorKind, Result};
use super::shamir::{SSServer, Share};
use super::SessionId;
use crate::math::{PrimeField, PrimeModulus, Uint};
use crate::store::Store;
use std::collections::{BTreeMap, VecDeque};
use tracing::{debug, error, info};

/// one party's shares of random `a`, `b` and `c = a * b`
#[derive(Copy, Clone, Debug, PartialEq, Eq)]
pub struct Triple {
    pub a: Share,
    pub b: Share,
    pub c: Share,
}

/// everything one party receives from the dealer
#[derive(Clone, Debug)]
pub struct Preprocessed {
    modulus: PrimeModulus,
    party: usize,
    keys: BTreeMap<SessionId, PrimeField>,
    triples: VecDeque<Triple>,
}

impl Preprocessed {
    pub fn party(&self) -> usize {
        self.party
    }

    pub fn modulus(&self) -> &PrimeModulus {
        &self.modulus
    }

    /// sessions this party holds a key share for
    pub fn sessions(&self) -> impl Iterator<Item = SessionId> + '_ {
        self.keys.keys().copied()
    }

    pub fn key_share(&self, session: SessionId) -> Result<Share> {
        match self.keys.get(&session) {
            Some(key) => Ok(Share(*key)),
            None => {
                error!("party {} holds no key share for session {}", self.party, session);
                Err(MPCErrorKind::MissingKeyShare { session }.into())
            }
        }
    }

    /// removes the oldest unused triple
    pub fn next_triple(&mut self) -> Result<Triple> {
        match self.triples.pop_front() {
            Some(triple) => Ok(triple),
            None => {
                error!("party {} ran out of multiplication triples", self.party);
                Err(MPCErrorKind::PreprocessingExhausted {
                    needed: 1,
                    available: 0,
                }
                .into())
            }
        }
    }

    pub fn triples_left(&self) -> usize {
        self.triples.len()
    }

    /// writes the material under fixed keys of `store`
    pub fn save(&self, store: &mut impl Store) -> Result<()> {
        store.set("modulus", &self.modulus.modulus())?;
        store.set("party", &(self.party as u64))?;
        store.set("sessions", &self.keys.keys().copied().collect::<Vec<u64>>())?;
        for (session, key) in &self.keys {
            store.set(&format!("key/{}", session), &key.rep())?;
        }
        let triples: Vec<Uint> = self
            .triples
            .iter()
            .flat_map(|t| [t.a.0.rep(), t.b.0.rep(), t.c.0.rep()])
            .collect();
        store.set("triples", &triples)?;
        debug!(
            "party {} saved {} key shares and {} triples",
            self.party,
            self.keys.len(),
            self.triples.len()
        );
        Ok(())
    }

    /// reads material written by [`Preprocessed::save`] for the same modulus
    pub fn load(store: &impl Store, modulus: &PrimeModulus) -> Result<Self> {
        if store.get::<Uint>("modulus")? != modulus.modulus() {
            error!("stored preprocessing belongs to another modulus");
            Err(InputErrorKind::ModulusMismatch)?;
        }
        let party = store.get::<u64>("party")? as usize;
        let mut keys = BTreeMap::new();
        for session in store.get::<Vec<u64>>("sessions")? {
            let key = store.get::<Uint>(&format!("key/{}", session))?;
            keys.insert(session, decode(modulus, &key)?);
        }
        let flat = store.get::<Vec<Uint>>("triples")?;
        if flat.len() % 3 != 0 {
            error!("stored triples hold {} values", flat.len());
            Err(InputErrorKind::OutOfRange)?;
        }
        let triples = flat
            .chunks(3)
            .map(|chunk| {
                Ok(Triple {
                    a: Share(decode(modulus, &chunk[0])?),
                    b: Share(decode(modulus, &chunk[1])?),
                    c: Share(decode(modulus, &chunk[2])?),
                })
            })
            .collect::<Result<VecDeque<_>>>()?;
        Ok(Self {
            modulus: *modulus,
            party,
            keys,
            triples,
        })
    }
}

/// canonical integer back into the field, rejecting values at or above `p`
pub(crate) fn decode(modulus: &PrimeModulus, value: &Uint) -> Result<PrimeField> {
    modulus.from_bytes(value.to_be_bytes().as_ref())
}

/// trusted dealer that shares keys and triples under a secret sharing scheme
pub struct Dealer<S> {
    modulus: PrimeModulus,
    scheme: S,
}

impl<S: SSServer> Dealer<S> {
    pub fn new(modulus: PrimeModulus, scheme: S) -> Self {
        Self { modulus, scheme }
    }

    /// shares every `(session, key)` and `triples` fresh triples, one bundle per party
    pub fn deal(&self, keys: &[(SessionId, PrimeField)], triples: usize) -> Vec<Preprocessed> {
        let parties = self.scheme.parties();
        let mut bundles: Vec<Preprocessed> = (0..parties)
            .map(|party| Preprocessed {
                modulus: self.modulus,
                party,
                keys: BTreeMap::new(),
                triples: VecDeque::with_capacity(triples),
            })
            .collect();
        for (session, key) in keys {
            for (bundle, share) in bundles.iter_mut().zip(self.scheme.split(key)) {
                bundle.keys.insert(*session, share);
            }
        }
        for _ in 0..triples {
            let a = self.modulus.random_make();
            let b = self.modulus.random_make();
            let shares = self
                .scheme
                .split(&a)
                .into_iter()
                .zip(self.scheme.split(&b))
                .zip(self.scheme.split(&(a * b)));
            for (bundle, ((a, b), c)) in bundles.iter_mut().zip(shares) {
                bundle.triples.push_back(Triple {
                    a: Share(a),
                    b: Share(b),
                    c: Share(c),
                });
            }
        }
        info!(
            "dealt {} key shares and {} triples to {} parties",
            keys.len(),
            triples,
            parties
        );
        bundles
    }
}

#[cfg(test)]
fn check_dealt_material<S: SSServer + Copy>(modulus: PrimeModulus, scheme: S) -> Vec<Preprocessed> {
    let key = modulus.make_u64(77);
    let mut bundles = Dealer::new(modulus, scheme).deal(&[(9, key)], 2);
    assert_eq!(bundles.len(), scheme.parties());

    let keys: Vec<_> = bundles
        .iter()
        .map(|bundle| Some(bundle.key_share(9).unwrap().0))
        .collect();
    assert_eq!(scheme.recover(&keys).unwrap(), key);

    for _ in 0..2 {
        let triples: Vec<_> = bundles.iter_mut().map(|b| b.next_triple().unwrap()).collect();
        let open = |pick: fn(&Triple) -> Share| {
            let shares: Vec<_> = triples.iter().map(|t| Some(pick(t).0)).collect();
            scheme.recover(&shares).unwrap()
        };
        assert_eq!(open(|t| t.a) * open(|t| t.b), open(|t| t.c));
    }
    assert_eq!(bundles[0].triples_left(), 0);
    assert!(bundles[0].next_triple().is_err());
    assert!(bundles[1].key_share(10).is_err());
    bundles
}

#[test]
fn test_dealt_triples_multiply() {
    use super::shamir::threshold::ThresholdScheme;

    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 1, 3).unwrap();
    let bundles = check_dealt_material(modulus, scheme);
    // any two Shamir shares of the key differ
    assert_ne!(bundles[0].keys[&9], bundles[1].keys[&9]);
}

#[test]
fn test_ideal_dealer_replicates() {
    use super::error::Error;
    use super::shamir::functionality::Server;

    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = Server::new(1, 3);
    let bundles = check_dealt_material(modulus, scheme);
    assert!(bundles.iter().all(|bundle| bundle.keys[&9] == modulus.make_u64(77)));

    // one forged share is outvoted, a lone share is not enough
    let key = modulus.make_u64(77);
    let forged = [Some(key), Some(modulus.one()), Some(key)];
    assert_eq!(scheme.recover(&forged), Ok(key));
    assert_eq!(
        scheme.recover(&[Some(key), None, None]),
        Err(Error::MPCError(MPCErrorKind::InsufficientShares))
    );
}

#[test]
fn test_material_survives_the_disk_store() {
    use super::error::Error;
    use super::shamir::threshold::ThresholdScheme;
    use crate::store::disk::DiskStore;

    let modulus = PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 1, 4).unwrap();
    let bundles = Dealer::new(modulus, scheme).deal(&[(1, modulus.make_u64(5)), (2, modulus.random_make())], 3);
    let dir = std::env::temp_dir().join(format!("custody-preprocessing-{}", std::process::id()));
    {
        let mut store = DiskStore::new(&dir, "party-2").unwrap();
        bundles[2].save(&mut store).unwrap();
        store.flush().unwrap();
    }
    let store = DiskStore::new(&dir, "party-2").unwrap();
    let mut loaded = Preprocessed::load(&store, &modulus).unwrap();
    assert_eq!(loaded.party(), 2);
    assert_eq!(loaded.sessions().collect::<Vec<_>>(), vec![1, 2]);
    assert_eq!(loaded.key_share(2).unwrap(), bundles[2].key_share(2).unwrap());
    assert_eq!(loaded.triples_left(), 3);
    assert_eq!(loaded.next_triple().unwrap(), bundles[2].triples[0]);

    let other = PrimeModulus::secp256k1_scalar();
    assert_eq!(
        Preprocessed::load(&store, &other).unwrap_err(),
        Error::InputError(InputErrorKind::ModulusMismatch)
    );
    std::fs::remove_dir_all(&dir).unwrap();
}
