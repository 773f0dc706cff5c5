//! provides basic math functions

pub mod abel;
pub mod fermat;
pub mod galois;
pub mod gauss;
pub mod poly;

pub use abel::{square_and_multiply, AbelianMonoid, Cleartext, Inv, Multiplier};
pub use fermat::{LegendreSymbol, PrimeModulus};
pub use galois::primefield::PrimeField;
pub use gauss::Uint;
pub use poly::{Polynomial, PolynomialEngine, Strategy};
