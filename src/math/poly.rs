//! polynomials over a prime field and their synthesis from roots

use super::{abel::AbelianMonoid, fermat::PrimeModulus, galois::primefield::PrimeField};
use crate::protocol::error::{InputErrorKind, Result};
use tracing::{debug, error};

pub(crate) mod ntt;

/// public polynomial, coefficients stored from the constant term upwards
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct Polynomial {
    coeffs: Vec<PrimeField>,
}

impl Polynomial {
    /// wraps coefficients `c0, c1, ...`; the caller keeps them non-empty
    pub fn from_coefficients(coeffs: Vec<PrimeField>) -> Self {
        Self { coeffs }
    }

    /// `z + root`
    pub fn linear(root: PrimeField) -> Self {
        Self {
            coeffs: vec![root, root.one()],
        }
    }

    pub fn degree(&self) -> usize {
        self.coeffs.len().saturating_sub(1)
    }

    /// coefficients `c0..cB`, `c0` being the constant term
    pub fn coefficients(&self) -> &[PrimeField] {
        &self.coeffs
    }

    /// coefficients `d0..dB` with `dj` multiplying `z^(B-j)`
    pub fn descending(&self) -> Vec<PrimeField> {
        self.coeffs.iter().rev().copied().collect()
    }

    /// evaluates at `z` using Horner's method
    pub fn evaluate(&self, z: &PrimeField) -> PrimeField {
        let mut coeffs = self.coeffs.iter().rev();
        let Some(&leading) = coeffs.next() else {
            return z.zero();
        };
        coeffs.fold(leading, |acc, c| acc * z + c)
    }

    /// multiplies in place by `z + root`
    fn mul_linear(&mut self, root: &PrimeField) {
        let mut next = vec![root.zero(); self.coeffs.len() + 1];
        for (j, c) in self.coeffs.iter().enumerate() {
            next[j + 1] += c;
            next[j] += *c * root;
        }
        self.coeffs = next;
    }
}

/// how [`PolynomialEngine`] turns roots into coefficients
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub enum Strategy {
    /// one root at a time, quadratic but with a small constant
    Incremental,
    /// halves multiplied by NTT convolution
    Ntt,
    /// incremental up to `cutoff` roots, NTT above
    Auto { cutoff: usize },
}

impl Default for Strategy {
    fn default() -> Self {
        Strategy::Auto { cutoff: 64 }
    }
}

/// synthesizes `∏ (z + Xi)` from the public dataset
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PolynomialEngine {
    modulus: PrimeModulus,
    strategy: Strategy,
}

impl PolynomialEngine {
    pub fn new(modulus: PrimeModulus, strategy: Strategy) -> Self {
        Self { modulus, strategy }
    }

    pub fn modulus(&self) -> &PrimeModulus {
        &self.modulus
    }

    pub fn strategy(&self) -> Strategy {
        self.strategy
    }

    /// coefficients of `∏ (z + root)`, degree `roots.len()`
    pub fn from_roots(&self, roots: &[PrimeField]) -> Result<Polynomial> {
        self.check_roots(roots)?;
        let polynomial = match self.strategy {
            Strategy::Incremental => self.incremental(roots),
            Strategy::Ntt => self.divide_and_conquer(roots)?,
            Strategy::Auto { cutoff } if roots.len() <= cutoff => self.incremental(roots),
            Strategy::Auto { .. } => self.divide_and_conquer(roots)?,
        };
        debug!(
            "synthesized degree {} polynomial with {:?}",
            polynomial.degree(),
            self.strategy
        );
        Ok(polynomial)
    }

    /// multiplies the running polynomial by each `z + Xi` in turn
    pub fn incremental(&self, roots: &[PrimeField]) -> Polynomial {
        let mut polynomial = Polynomial::from_coefficients(vec![self.modulus.one()]);
        roots.iter().for_each(|root| polynomial.mul_linear(root));
        polynomial
    }

    /// splits the roots in halves and multiplies the halves by NTT
    pub fn divide_and_conquer(&self, roots: &[PrimeField]) -> Result<Polynomial> {
        if roots.is_empty() {
            return Ok(Polynomial::from_coefficients(vec![self.modulus.one()]));
        }
        // the top-level product needs the largest transform
        self.modulus
            .root_of_unity((roots.len() + 1).next_power_of_two())?;
        self.split(roots).map(Polynomial::from_coefficients)
    }

    fn split(&self, roots: &[PrimeField]) -> Result<Vec<PrimeField>> {
        if let [root] = roots {
            return Ok(Polynomial::linear(*root).coeffs);
        }
        let (left, right) = roots.split_at((roots.len() + 1) / 2);
        let left = self.split(left)?;
        let right = self.split(right)?;
        ntt::convolve(&self.modulus, &left, &right)
    }

    fn check_roots(&self, roots: &[PrimeField]) -> Result<()> {
        if roots.is_empty() {
            error!("cannot synthesize a polynomial without roots");
            Err(InputErrorKind::EmptyDataset)?;
        }
        if !roots.iter().all(|root| self.modulus.owns(root)) {
            error!("roots were made under a different modulus");
            Err(InputErrorKind::ModulusMismatch)?;
        }
        Ok(())
    }
}

#[test]
fn test_small_polynomial_by_hand() {
    use crate::math::Uint;

    let modulus = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    let engine = PolynomialEngine::new(modulus, Strategy::Incremental);
    let roots: Vec<_> = [2, 3, 5].iter().map(|&v| modulus.make_u64(v)).collect();
    // (z + 2)(z + 3)(z + 5) = 30 + 31z + 10z^2 + z^3
    let polynomial = engine.from_roots(&roots).unwrap();
    let expected: Vec<_> = [30, 31, 10, 1].iter().map(|&v| modulus.make_u64(v)).collect();
    assert_eq!(polynomial.coefficients(), expected.as_slice());
    assert_eq!(polynomial.descending()[0], modulus.one());
    assert_eq!(polynomial.descending()[3], modulus.make_u64(30));
    assert_eq!(polynomial.evaluate(&modulus.make_u64(1)), modulus.make_u64(72));

    let single = engine.from_roots(&roots[..1]).unwrap();
    assert_eq!(single, Polynomial::linear(roots[0]));
}

#[test]
fn test_strategies_agree_and_vanish_at_negated_roots() {
    let modulus = PrimeModulus::bls12_381_scalar();
    let incremental = PolynomialEngine::new(modulus, Strategy::Incremental);
    let ntt = PolynomialEngine::new(modulus, Strategy::Ntt);
    for count in [1usize, 2, 3, 5, 8, 13, 31, 64, 100] {
        let roots: Vec<_> = (0..count).map(|_| modulus.random_make()).collect();
        let a = incremental.from_roots(&roots).unwrap();
        let b = ntt.from_roots(&roots).unwrap();
        assert_eq!(a, b, "strategies disagree for {} roots", count);
        assert_eq!(a.degree(), count);
        assert_eq!(*a.coefficients().last().unwrap(), modulus.one());
        for root in &roots {
            assert!(a.evaluate(&-*root).is_zero());
        }
    }
}

#[test]
fn test_missing_root_of_unity_is_a_configuration_error() {
    use crate::protocol::error::{ConfigErrorKind, Error};

    let modulus = PrimeModulus::secp256k1_scalar();
    let roots: Vec<_> = (0..100).map(|_| modulus.random_make()).collect();
    let auto = PolynomialEngine::new(modulus, Strategy::default());
    assert_eq!(
        auto.from_roots(&roots),
        Err(Error::ConfigError(ConfigErrorKind::MissingRootOfUnity { size: 128 }))
    );
    let incremental = PolynomialEngine::new(modulus, Strategy::Incremental);
    assert_eq!(incremental.from_roots(&roots).unwrap().degree(), 100);
    // small inputs fit the 2^6 transforms the field offers
    let ntt = PolynomialEngine::new(modulus, Strategy::Ntt);
    assert_eq!(
        ntt.from_roots(&roots[..40]).unwrap(),
        incremental.from_roots(&roots[..40]).unwrap()
    );
}

#[test]
fn test_auto_switches_strategy_past_the_cutoff() {
    use crate::protocol::error::{ConfigErrorKind, Error};

    // secp256k1 transforms stop at 64 points, which 64 roots already exceed
    let modulus = PrimeModulus::secp256k1_scalar();
    let roots: Vec<_> = (0..65).map(|_| modulus.random_make()).collect();
    let auto = PolynomialEngine::new(modulus, Strategy::Auto { cutoff: 64 });
    let ntt = PolynomialEngine::new(modulus, Strategy::Ntt);
    assert!(ntt.from_roots(&roots[..64]).is_err());
    assert_eq!(auto.from_roots(&roots[..64]).unwrap().degree(), 64);
    assert_eq!(
        auto.from_roots(&roots),
        Err(Error::ConfigError(ConfigErrorKind::MissingRootOfUnity { size: 128 }))
    );

    let modulus = PrimeModulus::bls12_381_scalar();
    let roots: Vec<_> = (0..9).map(|_| modulus.random_make()).collect();
    let auto = PolynomialEngine::new(modulus, Strategy::Auto { cutoff: 8 });
    let incremental = PolynomialEngine::new(modulus, Strategy::Incremental);
    for len in [8, 9] {
        assert_eq!(
            auto.from_roots(&roots[..len]).unwrap(),
            incremental.from_roots(&roots[..len]).unwrap()
        );
    }
}

#[test]
fn test_rejects_empty_and_foreign_roots() {
    use crate::math::Uint;
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let engine = PolynomialEngine::new(modulus, Strategy::default());
    assert_eq!(
        engine.from_roots(&[]),
        Err(Error::InputError(InputErrorKind::EmptyDataset))
    );
    let other = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    assert_eq!(
        engine.from_roots(&[other.make_u64(3)]),
        Err(Error::InputError(InputErrorKind::ModulusMismatch))
    );
}
