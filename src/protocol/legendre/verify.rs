//! cleartext recomputation of the PRF by a key holder

use crate::dataset::PublicDataset;
use crate::math::{Cleartext, PrimeField, PrimeModulus};
use crate::protocol::error::{MPCErrorKind, Result};
use tracing::error;

pub struct Verifier {
    modulus: PrimeModulus,
}

impl Verifier {
    pub fn new(modulus: PrimeModulus) -> Self {
        Self { modulus }
    }

    /// `(∏ (key + Xi))^((p - 1) / 2)` through the same chain the parties run
    pub fn expected(&self, key: &PrimeField, dataset: &PublicDataset) -> PrimeField {
        let product = dataset
            .iter()
            .fold(self.modulus.one(), |acc, x| acc * (*key + x));
        Cleartext::new(&self.modulus.one()).pow(product, &self.modulus.legendre_exponent())
    }

    pub fn verify(&self, output: &PrimeField, key: &PrimeField, dataset: &PublicDataset) -> bool {
        *output == self.expected(key, dataset)
    }

    /// like [`Verifier::verify`], failing with `VerificationMismatch`
    pub fn check(&self, output: &PrimeField, key: &PrimeField, dataset: &PublicDataset) -> Result<()> {
        if !self.verify(output, key, dataset) {
            error!("opened value {} does not match the recomputation", output);
            Err(MPCErrorKind::VerificationMismatch)?;
        }
        Ok(())
    }
}

#[test]
fn test_verifier() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let verifier = Verifier::new(modulus);
    let key = modulus.make_u64(77);
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97, 33, 44, 83]).unwrap();
    // 98 * 165 * 174 * 110 * 121 * 160 is a square modulo r
    assert_eq!(verifier.expected(&key, &dataset), modulus.one());
    assert!(verifier.check(&modulus.one(), &key, &dataset).is_ok());
    assert_eq!(
        verifier.check(&modulus.one().minus_one(), &key, &dataset),
        Err(Error::MPCError(MPCErrorKind::VerificationMismatch))
    );

    // K = -X1 zeroes the product
    let zeroing = -modulus.make_u64(21);
    assert!(verifier.verify(&modulus.zero(), &zeroing, &dataset));
}
