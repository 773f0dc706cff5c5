//! Legendre PRF evaluation over a secret-shared key
//!
//! The parties hold shares of `K, K^2, ..., K^B` from the offline phase. Online,
//! they synthesize the public polynomial `∏ (z + Xi)`, fold it against the
//! powers into a sharing of `y = ∏ (K + Xi)` without interaction, and raise
//! `y` to `(p - 1) / 2` with one secret multiplication per chain step.

use super::error::{InputErrorKind, Result};
use super::runtime::{Interactive, MpcRuntime, SecretValue};
use crate::dataset::PublicDataset;
use crate::math::abel::chain_cost;
use crate::math::{square_and_multiply, Polynomial, PolynomialEngine, PrimeModulus};
use powers::PowerSequence;
use tracing::{debug, error, instrument};

pub mod powers;
pub mod verify;

/// local linear combination of the key powers with the polynomial coefficients
///
/// With `d0..dB` the coefficients from the leading term down, power `i` (a
/// share of `K^(i + 1)`) pairs with `d(B-1-i)` and `dB` enters as a constant.
/// Extra powers are ignored.
pub fn combine<R: MpcRuntime>(
    runtime: &R,
    powers: &PowerSequence<R::Share>,
    polynomial: &Polynomial,
) -> Result<R::Share> {
    let degree = polynomial.degree();
    if powers.len() < degree {
        error!("{} key powers for a degree {} polynomial", powers.len(), degree);
        Err(InputErrorKind::ShortPowerSequence {
            needed: degree,
            available: powers.len(),
        })?;
    }
    let d = polynomial.descending();
    Ok(powers
        .iter()
        .take(degree)
        .enumerate()
        .fold(runtime.constant(&d[degree]), |acc, (i, power)| {
            acc.add(&power.scale(&d[degree - 1 - i]))
        }))
}

/// raises `y` to the Legendre exponent of the runtime's modulus
pub fn exponentiate<R: MpcRuntime>(runtime: &mut R, y: R::Share) -> Result<R::Share> {
    let exponent = runtime.modulus().legendre_exponent();
    square_and_multiply(&mut Interactive(runtime), y, &exponent)
}

/// secret multiplications [`exponentiate`] spends under `modulus`
pub fn exponentiation_cost(modulus: &PrimeModulus) -> usize {
    chain_cost(&modulus.legendre_exponent())
}

/// runs the online phase: synthesize, combine, exponentiate
#[derive(Copy, Clone, Debug)]
pub struct Evaluator {
    engine: PolynomialEngine,
}

impl Evaluator {
    pub fn new(engine: PolynomialEngine) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &PolynomialEngine {
        &self.engine
    }

    /// the unopened PRF output share for `dataset`
    #[instrument(skip_all, fields(blocks = dataset.len()))]
    pub fn evaluate<R: MpcRuntime>(
        &self,
        runtime: &mut R,
        powers: &PowerSequence<R::Share>,
        dataset: &PublicDataset,
    ) -> Result<R::Share> {
        if self.engine.modulus() != runtime.modulus() {
            error!("polynomial engine and runtime use different moduli");
            Err(InputErrorKind::ModulusMismatch)?;
        }
        let polynomial = self.engine.from_roots(dataset.as_slice())?;
        let y = combine(runtime, powers, &polynomial)?;
        debug!("combined {} powers into the product share", dataset.len());
        exponentiate(runtime, y)
    }
}

#[cfg(test)]
fn plaintext_powers(
    key: &crate::math::PrimeField,
    count: usize,
) -> PowerSequence<super::shamir::Share> {
    use super::shamir::Share;

    let mut running = *key;
    let mut powers = Vec::with_capacity(count);
    for _ in 0..count {
        powers.push(Share(running));
        running = running * key;
    }
    PowerSequence::from_shares(powers)
}

#[test]
fn test_combine_by_hand() {
    use super::shamir::functionality::Runtime;
    use crate::math::{Strategy, Uint};

    let modulus = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    let runtime = Runtime::new(modulus);
    let engine = PolynomialEngine::new(modulus, Strategy::Incremental);
    let key = modulus.make_u64(5);
    // (z + 2)(z + 3) = z^2 + 5z + 6, so y = 6 + 5 * 5 + 1 * 25 = 56 = 7 * 8
    let polynomial = engine
        .from_roots(&[modulus.make_u64(2), modulus.make_u64(3)])
        .unwrap();
    let y = combine(&runtime, &plaintext_powers(&key, 2), &polynomial).unwrap();
    assert_eq!(y.0, modulus.make_u64(56));

    // (z + 2)(z + 3)(z + 4): 24 + 26 * 5 + 9 * 25 + 125 = 504 = 7 * 8 * 9
    let polynomial = engine
        .from_roots(&[2, 3, 4].map(|v| modulus.make_u64(v)))
        .unwrap();
    let y = combine(&runtime, &plaintext_powers(&key, 5), &polynomial).unwrap();
    assert_eq!(y.0, modulus.make_u64(504 % 97));
}

#[test]
fn test_combine_matches_product() {
    use super::shamir::functionality::Runtime;
    use crate::math::Strategy;

    let modulus = PrimeModulus::bls12_381_scalar();
    let runtime = Runtime::new(modulus);
    for count in [1usize, 2, 7, 70] {
        let key = modulus.random_make();
        let roots: Vec<_> = (0..count).map(|_| modulus.random_make()).collect();
        let product = roots.iter().fold(modulus.one(), |acc, x| acc * (key + x));
        for strategy in [Strategy::Incremental, Strategy::Ntt] {
            let polynomial = PolynomialEngine::new(modulus, strategy)
                .from_roots(&roots)
                .unwrap();
            let y = combine(&runtime, &plaintext_powers(&key, count), &polynomial).unwrap();
            assert_eq!(y.0, product);
        }
    }
}

#[test]
fn test_short_power_sequence() {
    use super::error::Error;
    use super::shamir::functionality::Runtime;

    let modulus = PrimeModulus::bls12_381_scalar();
    let mut runtime = Runtime::new(modulus);
    let evaluator = Evaluator::new(PolynomialEngine::new(modulus, Default::default()));
    let dataset = PublicDataset::from_u64s(&modulus, &[1, 2, 3, 4]).unwrap();
    let powers = plaintext_powers(&modulus.make_u64(9), 4);
    assert_eq!(
        evaluator.evaluate(&mut runtime, &powers.prefix(3), &dataset),
        Err(Error::InputError(InputErrorKind::ShortPowerSequence {
            needed: 4,
            available: 3
        }))
    );
    assert_eq!(runtime.multiplications(), 0);
}

#[test]
fn test_scenarios() {
    use super::shamir::functionality::Runtime;
    use crate::math::AbelianMonoid;
    use verify::Verifier;

    let modulus = PrimeModulus::bls12_381_scalar();
    let evaluator = Evaluator::new(PolynomialEngine::new(modulus, Default::default()));
    let verifier = Verifier::new(modulus);

    let key = modulus.make_u64(77);
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97, 33, 44, 83]).unwrap();
    assert_eq!(
        evaluator.engine().from_roots(dataset.as_slice()).unwrap().degree(),
        6
    );
    let mut runtime = Runtime::new(modulus);
    let output = evaluator
        .evaluate(&mut runtime, &plaintext_powers(&key, 6), &dataset)
        .unwrap();
    assert_eq!(output.0, modulus.one());
    assert!(verifier.verify(&output.0, &key, &dataset));
    assert_eq!(runtime.multiplications(), exponentiation_cost(&modulus));
    assert_eq!(exponentiation_cost(&modulus), 386);

    // a single block reduces to legendre(K + X1)
    let single = PublicDataset::from_u64s(&modulus, &[21]).unwrap();
    let output = evaluator
        .evaluate(&mut runtime, &plaintext_powers(&key, 1), &single)
        .unwrap();
    let expected = (key + modulus.make_u64(21)).pow(&modulus.legendre_exponent());
    assert_eq!(output.0, expected);
    assert!(modulus.classify(&output.0).is_some());
}

#[test]
fn test_output_is_a_symbol_and_ignores_order() {
    use super::shamir::functionality::Runtime;

    let modulus = PrimeModulus::bls12_381_scalar();
    let evaluator = Evaluator::new(PolynomialEngine::new(modulus, Default::default()));
    let mut runtime = Runtime::new(modulus);
    for _ in 0..4 {
        let key = modulus.random_make();
        let values: Vec<_> = (0..9).map(|_| modulus.random_make()).collect();
        let mut reversed = values.clone();
        reversed.reverse();
        let powers = plaintext_powers(&key, 9);
        let forward = evaluator
            .evaluate(&mut runtime, &powers, &PublicDataset::new(&modulus, values).unwrap())
            .unwrap();
        let backward = evaluator
            .evaluate(&mut runtime, &powers, &PublicDataset::new(&modulus, reversed).unwrap())
            .unwrap();
        assert_eq!(forward, backward);
        assert!(modulus.classify(&forward.0).is_some());
    }

    // K = -X2 zeroes the product and the symbol
    let key = -modulus.make_u64(88);
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97]).unwrap();
    let output = evaluator
        .evaluate(&mut runtime, &plaintext_powers(&key, 3), &dataset)
        .unwrap();
    assert!(output.0.is_zero());
}
