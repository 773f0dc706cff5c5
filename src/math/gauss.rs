//! big integer backend

pub use crypto_bigint::{modular, Odd, RandomMod, U256};

/// width of every modulus handled by this crate
pub type Uint = U256;

/// number of machine words in a [`Uint`]
pub const LIMBS: usize = U256::LIMBS;

/// number of significant bits in `value`
pub fn bit_length(value: &Uint) -> usize {
    value.bits() as usize
}

/// bit `index` of `value`, counted from the least significant end
pub fn bit(value: &Uint, index: usize) -> bool {
    index < Uint::BITS as usize && value.bit_vartime(index as u32)
}

/// number of set bits in `value`
pub fn popcount(value: &Uint) -> usize {
    value
        .as_words()
        .iter()
        .map(|word| word.count_ones() as usize)
        .sum()
}

#[test]
fn test_bit_helpers() {
    let value = Uint::from_u64(0b1011_0000);
    assert_eq!(bit_length(&value), 8);
    assert_eq!(popcount(&value), 3);
    assert!(bit(&value, 4));
    assert!(!bit(&value, 6));
    assert!(!bit(&value, 300));
    assert_eq!(bit_length(&Uint::ZERO), 0);
    assert_eq!(bit_length(&Uint::MAX), 256);
}
