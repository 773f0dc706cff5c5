//! prime number arithmetic

use super::{
    abel::AbelianMonoid,
    galois::primefield::PrimeField,
    gauss::{
        bit,
        modular::{MontyForm, MontyParams},
        Odd, RandomMod, Uint, LIMBS,
    },
};
use crate::protocol::error::{ConfigErrorKind, InputErrorKind, Result};
use rand::rngs::OsRng;
use tracing::error;

/// order of the BLS12-381 scalar subgroup
const BLS12_381_SCALAR: &str = "73eda753299d7d483339d80809a1d80553bda402fffe5bfeffffffff00000001";

/// order of the secp256k1 group
const SECP256K1_SCALAR: &str = "fffffffffffffffffffffffffffffffebaaedce6af48a03bbfd25e8cd0364141";

/// smallest quadratic non-residue of both built-in moduli
const BUILTIN_NONRESIDUE: u64 = 5;

/// candidates tried when looking for a quadratic non-residue
const NONRESIDUE_SEARCH_BOUND: u64 = 1 << 12;

/// represents an odd prime modulus for PrimeField, plus the data the NTT needs
/// Example:
/// ```
/// use custody::math::PrimeModulus;
///
/// let modulus = PrimeModulus::bls12_381_scalar();
/// let x = modulus.random_make();
/// let y = modulus.random_make();
/// println!("{} + {} = {}", x, y, x + y);
/// println!("{} * {} = {}", x, y, x * y);
/// ```
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
pub struct PrimeModulus {
    params: MontyParams<LIMBS>,
    two_adicity: u32,
    nonresidue: Uint,
}

/// value of `a^((p-1)/2)` read as a symbol
#[derive(Copy, Clone, Debug, Eq, PartialEq, Hash)]
pub enum LegendreSymbol {
    Zero,
    Residue,
    NonResidue,
}

pub trait PseudoPrimalityTester {
    const MAX_ITERTIME: usize = 64;

    fn check(a: MontyForm<LIMBS>) -> bool;

    fn is_prime(n: &Uint) -> bool {
        if *n < Uint::from_u64(5) || !bit(n, 0) {
            return false;
        }
        let params = MontyParams::new(Odd::new(*n).unwrap());
        let upper = n.wrapping_sub(&Uint::from_u64(2));
        let mut checked = 0;
        while checked < Self::MAX_ITERTIME {
            let base = Uint::random_mod(&mut OsRng, params.modulus().as_nz_ref());
            if base < Uint::from_u64(2) || base > upper {
                continue;
            }
            if !Self::check(MontyForm::new(&base, params)) {
                return false;
            }
            checked += 1;
        }
        true
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MillerRabinTester;

impl PseudoPrimalityTester for MillerRabinTester {
    fn check(a: MontyForm<LIMBS>) -> bool {
        let params = *a.params();
        let t = params.modulus().get().wrapping_sub(&Uint::ONE);
        let h = t.trailing_zeros();
        let p1 = MontyForm::one(params);
        let m1 = -p1;
        let t = t >> h;
        let mut b = a.pow(&t);
        if b == p1 {
            return true;
        }
        for _ in 0..h {
            if b == m1 {
                return true;
            }
            if b == p1 {
                return false;
            }
            b = b * b;
        }
        false
    }
}

impl PrimeModulus {
    /// the scalar field the custody PRF is defined over
    pub fn bls12_381_scalar() -> Self {
        Self::with_nonresidue(Uint::from_be_hex(BLS12_381_SCALAR), BUILTIN_NONRESIDUE)
    }

    /// a 256-bit field whose NTT sizes stop at 64
    pub fn secp256k1_scalar() -> Self {
        Self::with_nonresidue(Uint::from_be_hex(SECP256K1_SCALAR), BUILTIN_NONRESIDUE)
    }

    /// checks `modulus` for primality and derives its NTT data
    pub fn try_from(modulus: Uint) -> Result<Self> {
        if !MillerRabinTester::is_prime(&modulus) {
            error!("rejecting modulus {}: not an odd prime above 3", modulus);
            Err(ConfigErrorKind::CompositeModulus)?;
        }
        let euler = modulus.wrapping_sub(&Uint::ONE) >> 1;
        let params = MontyParams::new(Odd::new(modulus).unwrap());
        let minus_one = -MontyForm::one(params);
        let nonresidue = (2..NONRESIDUE_SEARCH_BOUND)
            .find(|&candidate| {
                MontyForm::new(&Uint::from_u64(candidate), params).pow(&euler) == minus_one
            })
            .ok_or_else(|| {
                error!("no quadratic non-residue below {}", NONRESIDUE_SEARCH_BOUND);
                ConfigErrorKind::NoNonResidue
            })?;
        Ok(Self::with_nonresidue(modulus, nonresidue))
    }

    fn with_nonresidue(modulus: Uint, nonresidue: u64) -> Self {
        Self {
            params: MontyParams::new(Odd::new(modulus).unwrap()),
            two_adicity: modulus.wrapping_sub(&Uint::ONE).trailing_zeros(),
            nonresidue: Uint::from_u64(nonresidue),
        }
    }

    /// the prime `p`
    pub fn modulus(&self) -> Uint {
        self.params.modulus().get()
    }

    /// largest `s` with `2^s | p - 1`
    pub fn two_adicity(&self) -> u32 {
        self.two_adicity
    }

    /// the exponent `(p - 1) / 2` of Euler's criterion
    pub fn legendre_exponent(&self) -> Uint {
        self.modulus().wrapping_sub(&Uint::ONE) >> 1
    }

    /// constructs a number in PrimeField of this modulus, reducing `value`
    pub fn make(&self, value: &Uint) -> PrimeField {
        PrimeField(MontyForm::new(value, self.params))
    }

    pub fn make_u64(&self, value: u64) -> PrimeField {
        self.make(&Uint::from_u64(value))
    }

    pub fn zero(&self) -> PrimeField {
        PrimeField(MontyForm::zero(self.params))
    }

    pub fn one(&self) -> PrimeField {
        PrimeField(MontyForm::one(self.params))
    }

    /// decodes a canonical big-endian encoding
    pub fn from_bytes(&self, bytes: &[u8]) -> Result<PrimeField> {
        if bytes.len() != Uint::BYTES {
            Err(InputErrorKind::OutOfRange)?;
        }
        let value = Uint::from_be_slice(bytes);
        if value >= self.modulus() {
            Err(InputErrorKind::OutOfRange)?;
        }
        Ok(self.make(&value))
    }

    /// reduces a 512-bit big-endian integer, such as a wide hash digest
    pub fn from_wide_bytes(&self, bytes: &[u8; 2 * Uint::BYTES]) -> PrimeField {
        let (high, low) = bytes.split_at(Uint::BYTES);
        let shift = self.make(&Uint::MAX) + self.one();
        self.make(&Uint::from_be_slice(high)) * shift + self.make(&Uint::from_be_slice(low))
    }

    /// constructs a random number in PrimeField of this modulus
    pub fn random_make(&self) -> PrimeField {
        self.make(&Uint::random_mod(&mut OsRng, self.params.modulus().as_nz_ref()))
    }

    /// primitive root of unity of order `size`, a power of two
    pub fn root_of_unity(&self, size: usize) -> Result<PrimeField> {
        let log_size = size.trailing_zeros();
        if !size.is_power_of_two() || log_size > self.two_adicity {
            error!(
                "modulus {} has two-adicity {}, cannot transform size {}",
                self.modulus(),
                self.two_adicity,
                size
            );
            Err(ConfigErrorKind::MissingRootOfUnity { size })?;
        }
        let exponent = self.modulus().wrapping_sub(&Uint::ONE) >> log_size;
        Ok(self.make(&self.nonresidue).pow(&exponent))
    }

    /// reads an opened PRF value, `None` if it is not a Legendre symbol
    pub fn classify(&self, value: &PrimeField) -> Option<LegendreSymbol> {
        if value.is_zero() {
            Some(LegendreSymbol::Zero)
        } else if *value == self.one() {
            Some(LegendreSymbol::Residue)
        } else if *value == -self.one() {
            Some(LegendreSymbol::NonResidue)
        } else {
            None
        }
    }

    /// whether `value` was made under this modulus
    pub fn owns(&self, value: &PrimeField) -> bool {
        value.modulus() == self.modulus()
    }

    pub(crate) fn encode(value: &PrimeField) -> [u8; Uint::BYTES] {
        let mut bytes = [0u8; Uint::BYTES];
        bytes.copy_from_slice(value.rep().to_be_bytes().as_ref());
        bytes
    }
}

#[test]
fn test_builtin_moduli() {
    let bls = PrimeModulus::bls12_381_scalar();
    assert_eq!(bls.two_adicity(), 32);
    assert_eq!(bls.modulus().bits(), 255);
    assert!(MillerRabinTester::is_prime(&bls.modulus()));
    let secp = PrimeModulus::secp256k1_scalar();
    assert_eq!(secp.two_adicity(), 6);
    assert_eq!(PrimeModulus::try_from(bls.modulus()).unwrap(), bls);
    assert_eq!(PrimeModulus::try_from(secp.modulus()).unwrap(), secp);
}

#[test]
fn test_rejects_composite() {
    use crate::protocol::error::Error;
    for composite in [1u64, 4, 9, 91, 561] {
        assert_eq!(
            PrimeModulus::try_from(Uint::from_u64(composite)),
            Err(Error::ConfigError(ConfigErrorKind::CompositeModulus))
        );
    }
    let small = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    assert_eq!(small.two_adicity(), 5);
    assert_eq!(small.legendre_exponent(), Uint::from_u64(48));
}

#[test]
fn test_root_of_unity() {
    let modulus = PrimeModulus::bls12_381_scalar();
    for size in [1usize, 2, 8, 1 << 10] {
        let omega = modulus.root_of_unity(size).unwrap();
        assert_eq!(omega.pow(&Uint::from_u64(size as u64)), modulus.one());
        if size > 1 {
            assert_ne!(omega.pow(&Uint::from_u64(size as u64 / 2)), modulus.one());
        }
    }
    assert!(modulus.root_of_unity(6).is_err());
    let secp = PrimeModulus::secp256k1_scalar();
    assert!(secp.root_of_unity(64).is_ok());
    assert_eq!(
        secp.root_of_unity(128),
        Err(crate::protocol::error::Error::ConfigError(
            ConfigErrorKind::MissingRootOfUnity { size: 128 }
        ))
    );
}

#[test]
fn test_classify_and_wide_reduction() {
    let modulus = PrimeModulus::try_from(Uint::from_u64(97)).unwrap();
    assert_eq!(modulus.classify(&modulus.zero()), Some(LegendreSymbol::Zero));
    assert_eq!(modulus.classify(&modulus.one()), Some(LegendreSymbol::Residue));
    assert_eq!(modulus.classify(&modulus.make_u64(96)), Some(LegendreSymbol::NonResidue));
    assert_eq!(modulus.classify(&modulus.make_u64(3)), None);

    // 2^256 + 5
    let mut wide = [0u8; 64];
    wide[31] = 1;
    wide[63] = 5;
    let expected = modulus.make(&Uint::MAX) + modulus.make_u64(6);
    assert_eq!(modulus.from_wide_bytes(&wide), expected);
    assert!(modulus.from_bytes(&PrimeModulus::encode(&modulus.make_u64(42))).is_ok());
    assert!(modulus.from_bytes(&Uint::from_u64(97).to_be_bytes()).is_err());
}

#[test]
fn test_random_make_stays_below_modulus() {
    let modulus = PrimeModulus::try_from(Uint::from_u64(7)).unwrap();
    let mut seen = [false; 7];
    for _ in 0..500 {
        let value = modulus.random_make().rep();
        assert!(value < Uint::from_u64(7));
        seen[value.as_words()[0] as usize] = true;
    }
    assert!(seen.iter().all(|&hit| hit));
    assert!(MillerRabinTester::is_prime(&Uint::from_u64(7)));
    assert!(!MillerRabinTester::is_prime(&Uint::from_u64(15)));
}
