//! number-theoretic transform over a prime field

use crate::math::{
    abel::{AbelianMonoid, Inv},
    fermat::PrimeModulus,
    galois::primefield::PrimeField,
    gauss::Uint,
};
use crate::protocol::error::Result;

/// evaluates `values` (coefficients, low to high) at the powers of `omega`
///
/// `values.len()` must be a power of two and `omega` a primitive root of
/// unity of that order.
pub(crate) fn transform(values: &mut [PrimeField], omega: &PrimeField) {
    let n = values.len();
    debug_assert!(n.is_power_of_two());
    if n < 2 {
        return;
    }
    let log_n = n.trailing_zeros();
    for i in 0..n {
        let j = i.reverse_bits() >> (usize::BITS - log_n);
        if i < j {
            values.swap(i, j);
        }
    }

    // twiddles[k] has order n >> k
    let mut twiddles = Vec::with_capacity(log_n as usize);
    let mut w = *omega;
    for _ in 0..log_n {
        twiddles.push(w);
        w = w.square();
    }

    let one = omega.one();
    let mut len = 2;
    let mut level = log_n as usize;
    while len <= n {
        let step = twiddles[level - 1];
        let half = len / 2;
        for start in (0..n).step_by(len) {
            let mut w = one;
            for j in start..start + half {
                let u = values[j];
                let v = values[j + half] * w;
                values[j] = u + v;
                values[j + half] = u - v;
                w *= step;
            }
        }
        level -= 1;
        len <<= 1;
    }
}

/// inverse of [`transform`]
pub(crate) fn inverse_transform(
    modulus: &PrimeModulus,
    values: &mut [PrimeField],
    omega: &PrimeField,
) {
    let n = values.len();
    if n < 2 {
        return;
    }
    let omega_inv = omega.pow(&Uint::from_u64(n as u64 - 1));
    transform(values, &omega_inv);
    // n divides p - 1, so it is invertible
    if let Some(n_inv) = modulus.make_u64(n as u64).inv() {
        values.iter_mut().for_each(|v| *v *= n_inv);
    }
}

/// multiplies two coefficient vectors by evaluation and interpolation
pub(crate) fn convolve(
    modulus: &PrimeModulus,
    lhs: &[PrimeField],
    rhs: &[PrimeField],
) -> Result<Vec<PrimeField>> {
    let needed = lhs.len() + rhs.len() - 1;
    let size = needed.next_power_of_two();
    let omega = modulus.root_of_unity(size)?;
    let mut a = vec![modulus.zero(); size];
    let mut b = vec![modulus.zero(); size];
    a[..lhs.len()].copy_from_slice(lhs);
    b[..rhs.len()].copy_from_slice(rhs);
    transform(&mut a, &omega);
    transform(&mut b, &omega);
    a.iter_mut().zip(&b).for_each(|(x, y)| *x *= y);
    inverse_transform(modulus, &mut a, &omega);
    a.truncate(needed);
    Ok(a)
}

#[test]
fn test_transform_roundtrip_and_convolution() {
    let modulus = PrimeModulus::bls12_381_scalar();
    let omega = modulus.root_of_unity(8).unwrap();
    let original: Vec<_> = (1..=8).map(|v| modulus.make_u64(v)).collect();
    let mut values = original.clone();
    transform(&mut values, &omega);
    // first evaluation point is 1, so it is the coefficient sum
    assert_eq!(values[0], modulus.make_u64(36));
    inverse_transform(&modulus, &mut values, &omega);
    assert_eq!(values, original);

    // (1 + 2z)(3 + z + z^2) = 3 + 7z + 3z^2 + 2z^3
    let lhs = [modulus.make_u64(1), modulus.make_u64(2)];
    let rhs = [modulus.make_u64(3), modulus.make_u64(1), modulus.make_u64(1)];
    let product = convolve(&modulus, &lhs, &rhs).unwrap();
    let expected: Vec<_> = [3, 7, 3, 2].iter().map(|&v| modulus.make_u64(v)).collect();
    assert_eq!(product, expected);
}
