//! finite field arithmetic

pub mod primefield;
