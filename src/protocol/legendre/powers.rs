//! offline powers of the shared key

use crate::math::{PrimeModulus, Uint};
use crate::protocol::error::Result;
use crate::protocol::preprocessing::decode;
use crate::protocol::runtime::MpcRuntime;
use crate::protocol::shamir::Share;
use crate::protocol::SessionId;
use crate::store::Store;
use tracing::{debug, instrument};

/// shares of `K^1, K^2, ...`; entry `i` holds `K^(i + 1)`
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PowerSequence<S> {
    powers: Vec<S>,
}

impl<S> PowerSequence<S> {
    pub fn from_shares(powers: Vec<S>) -> Self {
        Self { powers }
    }

    pub fn len(&self) -> usize {
        self.powers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.powers.is_empty()
    }

    /// share of `K^(index + 1)`
    pub fn get(&self, index: usize) -> Option<&S> {
        self.powers.get(index)
    }

    pub fn iter(&self) -> impl Iterator<Item = &S> {
        self.powers.iter()
    }
}

impl<S: Clone> PowerSequence<S> {
    /// the first `len` powers, or all of them if there are fewer
    pub fn prefix(&self, len: usize) -> Self {
        Self {
            powers: self.powers[..len.min(self.powers.len())].to_vec(),
        }
    }
}

impl PowerSequence<Share> {
    pub fn save(&self, store: &mut impl Store, session: SessionId) -> Result<()> {
        let values: Vec<Uint> = self.powers.iter().map(|share| share.0.rep()).collect();
        store.set(&format!("powers/{}", session), &values)
    }

    pub fn load(store: &impl Store, modulus: &PrimeModulus, session: SessionId) -> Result<Self> {
        let powers = store
            .get::<Vec<Uint>>(&format!("powers/{}", session))?
            .iter()
            .map(|value| decode(modulus, value).map(Share))
            .collect::<Result<Vec<_>>>()?;
        Ok(Self { powers })
    }
}

/// multiplies a running value by `key` `count` times, one round per step
#[instrument(skip_all, fields(count = count))]
pub fn precompute_powers<R: MpcRuntime>(
    runtime: &mut R,
    key: &R::Share,
    count: usize,
) -> Result<PowerSequence<R::Share>> {
    let one = runtime.modulus().one();
    let mut running = runtime.constant(&one);
    let mut powers = Vec::with_capacity(count);
    for _ in 0..count {
        running = runtime.multiply(&running, key)?;
        powers.push(running.clone());
    }
    debug!("computed {} key powers", count);
    Ok(PowerSequence { powers })
}

#[test]
fn test_precompute_powers() {
    use crate::protocol::shamir::functionality::Runtime;

    let modulus = PrimeModulus::bls12_381_scalar();
    let key = modulus.make_u64(3);
    let mut runtime = Runtime::new(modulus);
    let powers = precompute_powers(&mut runtime, &Share(key), 5).unwrap();
    let values: Vec<_> = powers.iter().map(|share| share.0).collect();
    let expected: Vec<_> = [3, 9, 27, 81, 243].iter().map(|&v| modulus.make_u64(v)).collect();
    assert_eq!(values, expected);
    assert_eq!(runtime.multiplications(), 5);

    assert_eq!(powers.prefix(2).len(), 2);
    assert_eq!(powers.prefix(9), powers);
    assert!(precompute_powers(&mut runtime, &Share(key), 0).unwrap().is_empty());
}

#[test]
fn test_powers_persist_per_session() {
    use crate::store::disk::DiskStore;

    let modulus = PrimeModulus::bls12_381_scalar();
    let powers = PowerSequence::from_shares((0..4).map(|_| Share(modulus.random_make())).collect());
    let dir = std::env::temp_dir().join(format!("custody-powers-{}", std::process::id()));
    let mut store = DiskStore::new(&dir, "powers").unwrap();
    powers.save(&mut store, 11).unwrap();
    assert_eq!(PowerSequence::load(&store, &modulus, 11).unwrap(), powers);
    assert!(PowerSequence::load(&store, &modulus, 12).is_err());
    drop(store);
    std::fs::remove_dir_all(&dir).unwrap();
}
