//! proof of custody: a party's full run from key share to opened PRF value

use super::beaver::BeaverRuntime;
use super::error::{Error, InputErrorKind, MPCErrorKind, Result};
use super::legendre::powers::{precompute_powers, PowerSequence};
use super::legendre::{exponentiation_cost, Evaluator};
use super::party::MultiParty;
use super::preprocessing::Dealer;
use super::runtime::Preprocessing;
use super::SessionId;
use crate::config::CustodyConfig;
use crate::dataset::PublicDataset;
use crate::math::{PolynomialEngine, PrimeField, Strategy};
use std::io;
use std::thread;
use std::time::Instant;
use tracing::{error, info, instrument};

/// drives one party through the offline, online and opening phases
pub struct Prover<'a, R> {
    runtime: &'a mut R,
    evaluator: Evaluator,
}

impl<'a, R: Preprocessing> Prover<'a, R> {
    pub fn new(runtime: &'a mut R, strategy: Strategy) -> Self {
        let engine = PolynomialEngine::new(*runtime.modulus(), strategy);
        Self {
            runtime,
            evaluator: Evaluator::new(engine),
        }
    }

    /// secret multiplications a run over `blocks` blocks consumes
    pub fn required_multiplications(&self, blocks: usize) -> usize {
        blocks + exponentiation_cost(self.runtime.modulus())
    }

    fn reserve(&self, needed: usize) -> Result<()> {
        let available = self.runtime.multiplications_left();
        if available < needed {
            error!("run needs {} multiplications, {} available", needed, available);
            Err(MPCErrorKind::PreprocessingExhausted { needed, available })?;
        }
        Ok(())
    }

    /// computes the key powers for up to `blocks` blocks
    #[instrument(skip(self))]
    pub fn offline(&mut self, session: SessionId, blocks: usize) -> Result<PowerSequence<R::Share>> {
        self.reserve(blocks)?;
        let key = self.runtime.key_share(session)?;
        let start = Instant::now();
        let powers = precompute_powers(self.runtime, &key, blocks)?;
        info!("offline phase took {:?}", start.elapsed());
        Ok(powers)
    }

    /// evaluates the PRF share over `dataset` with powers from [`Prover::offline`]
    #[instrument(skip_all, fields(blocks = dataset.len()))]
    pub fn online(
        &mut self,
        powers: &PowerSequence<R::Share>,
        dataset: &PublicDataset,
    ) -> Result<R::Share> {
        if powers.len() < dataset.len() {
            error!("{} powers cannot cover {} blocks", powers.len(), dataset.len());
            Err(InputErrorKind::ShortPowerSequence {
                needed: dataset.len(),
                available: powers.len(),
            })?;
        }
        self.reserve(exponentiation_cost(self.runtime.modulus()))?;
        let start = Instant::now();
        let share = self.evaluator.evaluate(self.runtime, powers, dataset)?;
        info!("online phase took {:?}", start.elapsed());
        Ok(share)
    }

    pub fn open(&mut self, share: &R::Share) -> Result<PrimeField> {
        let start = Instant::now();
        let output = self.runtime.open(share)?;
        info!("opening took {:?}", start.elapsed());
        Ok(output)
    }

    /// all three phases; fails before any interaction if preprocessing falls short
    pub fn prove(&mut self, session: SessionId, dataset: &PublicDataset) -> Result<PrimeField> {
        self.reserve(self.required_multiplications(dataset.len()))?;
        let powers = self.offline(session, dataset.len())?;
        let share = self.online(&powers, dataset)?;
        self.open(&share)
    }
}

/// session id [`simulate`] deals the key under
pub const SIMULATION_SESSION: SessionId = 0;

/// runs `config.parties` parties as threads of this process, each with its own
/// Beaver runtime over an in-memory mesh, and collects every party's result
pub fn simulate(
    config: &CustodyConfig,
    key: &PrimeField,
    dataset: &PublicDataset,
) -> Result<Vec<Result<PrimeField>>> {
    config.validate()?;
    let modulus = config.modulus();
    if !modulus.owns(key) || !dataset.iter().all(|x| modulus.owns(x)) {
        error!("key or dataset built under a different modulus");
        Err(InputErrorKind::ModulusMismatch)?;
    }
    let scheme = config.scheme()?;
    let triples = dataset.len() + exponentiation_cost(&modulus);
    let bundles = Dealer::new(modulus, scheme).deal(&[(SIMULATION_SESSION, *key)], triples);
    let strategy = config.strategy();
    info!(
        "simulating {} parties, threshold {}, {} blocks",
        config.parties,
        config.threshold,
        dataset.len()
    );
    let results = thread::scope(|scope| {
        let handles: Vec<_> = MultiParty::local_mesh(config.parties)
            .into_iter()
            .zip(bundles)
            .map(|(party, material)| {
                scope.spawn(move || -> Result<PrimeField> {
                    let mut runtime = BeaverRuntime::new(party, scheme, material)?;
                    Prover::new(&mut runtime, strategy).prove(SIMULATION_SESSION, dataset)
                })
            })
            .collect();
        handles
            .into_iter()
            .map(|handle| {
                handle.join().unwrap_or_else(|_| {
                    error!("a party thread panicked");
                    Err(Error::from(io::Error::from(io::ErrorKind::Other)))
                })
            })
            .collect::<Vec<_>>()
    });
    Ok(results)
}

#[test]
fn test_plaintext_prover() {
    use super::shamir::functionality::Runtime;

    let modulus = crate::math::PrimeModulus::bls12_381_scalar();
    let key = modulus.make_u64(77);
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97, 33, 44, 83]).unwrap();
    let mut runtime = Runtime::new(modulus).with_key(3, key);
    let mut prover = Prover::new(&mut runtime, Strategy::Incremental);
    assert_eq!(prover.required_multiplications(6), 6 + 386);

    // powers for more blocks than the challenge has are fine
    let powers = prover.offline(3, 10).unwrap();
    let share = prover.online(&powers, &dataset).unwrap();
    assert_eq!(prover.open(&share).unwrap(), modulus.one());
    assert_eq!(runtime.multiplications(), 10 + 386);
}

#[test]
fn test_exhausted_preprocessing_fails_before_interaction() {
    use super::shamir::functionality::Runtime;

    let modulus = crate::math::PrimeModulus::bls12_381_scalar();
    let key = modulus.make_u64(77);
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97]).unwrap();
    let mut runtime = Runtime::new(modulus).with_key(0, key).with_budget(3 + 385);
    let result = Prover::new(&mut runtime, Strategy::default()).prove(0, &dataset);
    assert_eq!(
        result,
        Err(Error::MPCError(MPCErrorKind::PreprocessingExhausted {
            needed: 389,
            available: 388
        }))
    );
    assert_eq!(runtime.multiplications(), 0);

    let mut runtime = Runtime::new(modulus).with_budget(1000);
    assert_eq!(
        Prover::new(&mut runtime, Strategy::default()).prove(0, &dataset),
        Err(Error::MPCError(MPCErrorKind::MissingKeyShare { session: 0 }))
    );
}

#[test]
fn test_simulated_group_agrees_and_verifies() {
    use super::legendre::verify::Verifier;

    let config = CustodyConfig::default();
    let modulus = config.modulus();
    let key = modulus.random_make();
    let dataset = PublicDataset::from_bytes(&modulus, b"a custody payload split into blocks", 4).unwrap();
    let results = simulate(&config, &key, &dataset).unwrap();
    assert_eq!(results.len(), 4);
    let output = results[0].unwrap();
    assert!(results.iter().all(|result| *result == Ok(output)));
    assert!(modulus.classify(&output).is_some());
    Verifier::new(modulus).check(&output, &key, &dataset).unwrap();

    let scenario = PublicDataset::from_u64s(&modulus, &[21, 88, 97, 33, 44, 83]).unwrap();
    let results = simulate(&config, &modulus.make_u64(77), &scenario).unwrap();
    assert!(results.iter().all(|result| *result == Ok(modulus.one())));
}

#[test]
fn test_lone_party_lacks_quorum() {
    use super::shamir::threshold::ThresholdScheme;

    let modulus = crate::math::PrimeModulus::bls12_381_scalar();
    let scheme = ThresholdScheme::new(modulus, 1, 4).unwrap();
    let dataset = PublicDataset::from_u64s(&modulus, &[5, 6]).unwrap();
    let bundles = Dealer::new(modulus, scheme).deal(&[(0, modulus.make_u64(9))], 2 + 386);
    let mut parties = MultiParty::local_mesh(4);
    let mut bundles = bundles.into_iter();
    let party = parties.remove(0);
    let material = bundles.next().unwrap();
    // everyone else is gone before the first round
    drop(parties);
    let mut runtime = BeaverRuntime::new(party, scheme, material).unwrap();
    assert_eq!(
        Prover::new(&mut runtime, Strategy::default()).prove(0, &dataset),
        Err(Error::MPCError(MPCErrorKind::InsufficientShares))
    );
}

#[test]
fn test_rejects_foreign_key() {
    let config = CustodyConfig::default();
    let other = crate::math::PrimeModulus::secp256k1_scalar();
    let dataset = PublicDataset::from_u64s(&config.modulus(), &[1]).unwrap();
    assert_eq!(
        simulate(&config, &other.make_u64(1), &dataset),
        Err(Error::InputError(InputErrorKind::ModulusMismatch))
    );
}
