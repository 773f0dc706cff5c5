//! secret-shared Legendre PRF evaluation for proof of custody
//!
//! A group of parties holding a threshold sharing of a key `K` computes
//! `legendre_p((K + X1) * ... * (K + XB))` over a public dataset `X` without
//! reconstructing `K`:
//! ```
//! use custody::{
//!     dataset::PublicDataset,
//!     math::PrimeModulus,
//!     protocol::{custody::Prover, legendre::verify::Verifier, shamir::functionality::Runtime},
//! };
//!
//! let modulus = PrimeModulus::bls12_381_scalar();
//! let key = modulus.make_u64(77);
//! let dataset = PublicDataset::from_u64s(&modulus, &[21, 88, 97, 33, 44, 83]).unwrap();
//! let mut runtime = Runtime::new(modulus).with_key(0, key);
//! let mut prover = Prover::new(&mut runtime, Default::default());
//! let output = prover.prove(0, &dataset).unwrap();
//! assert!(Verifier::new(modulus).verify(&output, &key, &dataset));
//! ```

pub mod config;
pub mod dataset;
pub mod math;
pub mod protocol;
pub mod store;

pub use protocol::error::{Error, Result};
