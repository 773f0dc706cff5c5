//! public data blocks a custody proof is computed over

use crate::math::{PrimeField, PrimeModulus};
use crate::protocol::error::{InputErrorKind, Result};
use blake2::{Blake2b512, Digest};
use tracing::error;

/// domain separator for hashing data blocks into the field
const BLOCK_DOMAIN: &[u8] = b"legendre-custody/block/v1";

/// ordered, non-empty sequence of public field elements `X1..XB`
///
/// The order fixes the polynomial coefficients every party derives, so all
/// parties must build the dataset from identical input.
#[derive(Clone, Debug, Eq, PartialEq)]
pub struct PublicDataset {
    elements: Vec<PrimeField>,
}

impl PublicDataset {
    pub fn new(modulus: &PrimeModulus, elements: Vec<PrimeField>) -> Result<Self> {
        if elements.is_empty() {
            error!("a custody challenge needs at least one block");
            Err(InputErrorKind::EmptyDataset)?;
        }
        if !elements.iter().all(|element| modulus.owns(element)) {
            error!("dataset mixes elements of another modulus");
            Err(InputErrorKind::ModulusMismatch)?;
        }
        Ok(Self { elements })
    }

    pub fn from_u64s(modulus: &PrimeModulus, values: &[u64]) -> Result<Self> {
        Self::new(modulus, values.iter().map(|&v| modulus.make_u64(v)).collect())
    }

    /// maps every block to `BLAKE2b-512(domain || index || block) mod p`
    pub fn from_blocks<B: AsRef<[u8]>>(modulus: &PrimeModulus, blocks: &[B]) -> Result<Self> {
        let elements = blocks
            .iter()
            .enumerate()
            .map(|(index, block)| {
                let digest = Blake2b512::new()
                    .chain_update(BLOCK_DOMAIN)
                    .chain_update((index as u64).to_le_bytes())
                    .chain_update(block.as_ref())
                    .finalize();
                let mut wide = [0u8; 64];
                wide.copy_from_slice(&digest);
                modulus.from_wide_bytes(&wide)
            })
            .collect();
        Self::new(modulus, elements)
    }

    /// cuts `data` into `block_size` chunks, the last one possibly shorter
    pub fn from_bytes(modulus: &PrimeModulus, data: &[u8], block_size: usize) -> Result<Self> {
        if block_size == 0 {
            Err(InputErrorKind::EmptyDataset)?;
        }
        let blocks: Vec<&[u8]> = data.chunks(block_size).collect();
        Self::from_blocks(modulus, &blocks)
    }

    /// number of blocks `B`
    pub fn len(&self) -> usize {
        self.elements.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elements.is_empty()
    }

    pub fn as_slice(&self) -> &[PrimeField] {
        &self.elements
    }

    pub fn iter(&self) -> impl Iterator<Item = &PrimeField> {
        self.elements.iter()
    }
}

#[test]
fn test_dataset_construction() {
    use crate::protocol::error::Error;

    let modulus = PrimeModulus::bls12_381_scalar();
    let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97]).unwrap();
    assert_eq!(dataset.len(), 3);
    assert_eq!(dataset.as_slice()[1], modulus.make_u64(88));
    assert_eq!(
        PublicDataset::from_u64s(&modulus, &[]),
        Err(Error::InputError(InputErrorKind::EmptyDataset))
    );
}

#[test]
fn test_block_hashing_is_deterministic_and_positional() {
    let modulus = PrimeModulus::bls12_381_scalar();
    let data = b"custody payload that spans a few blocks";
    let a = PublicDataset::from_bytes(&modulus, data, 8).unwrap();
    let b = PublicDataset::from_bytes(&modulus, data, 8).unwrap();
    assert_eq!(a, b);
    assert_eq!(a.len(), 5);

    let same = PublicDataset::from_blocks(&modulus, &[b"x".as_slice(), b"x".as_slice()]).unwrap();
    assert_ne!(same.as_slice()[0], same.as_slice()[1]);
}
