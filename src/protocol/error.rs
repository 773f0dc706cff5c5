//! errors during protocol execution

use thiserror::Error as ThisError;
use tracing::error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ThisError)]
pub enum Error {
    #[error("i/o failure: {0:?}")]
    IOError(std::io::ErrorKind),
    #[error("protocol failure: {0}")]
    MPCError(MPCErrorKind),
    #[error("configuration error: {0}")]
    ConfigError(ConfigErrorKind),
    #[error("invalid input: {0}")]
    InputError(InputErrorKind),
}

/// failures of an interactive run
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ThisError)]
#[non_exhaustive]
pub enum MPCErrorKind {
    #[error("fewer shares than the reconstruction threshold")]
    InsufficientShares,
    #[error("shares beyond the threshold disagree with the reconstruction")]
    InconsistentShares,
    #[error("peer {peer} answered round {got}, expected round {expected}")]
    RoundMismatch { peer: usize, expected: u64, got: u64 },
    #[error("peer {peer} sent a malformed message")]
    MalformedMessage { peer: usize },
    #[error("preprocessing exhausted: {needed} needed, {available} available")]
    PreprocessingExhausted { needed: usize, available: usize },
    #[error("no key share for session {session}")]
    MissingKeyShare { session: u64 },
    #[error("opened value does not match the cleartext recomputation")]
    VerificationMismatch,
}

/// failures caused by the field or run parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ThisError)]
#[non_exhaustive]
pub enum ConfigErrorKind {
    #[error("modulus is not an odd prime greater than 3")]
    CompositeModulus,
    #[error("no quadratic non-residue below the search bound")]
    NoNonResidue,
    #[error("field has no primitive root of unity of order {size}")]
    MissingRootOfUnity { size: usize },
    #[error("threshold {threshold} is not below party count {parties}")]
    InvalidThreshold { threshold: usize, parties: usize },
    #[error("configuration document is malformed")]
    MalformedConfig,
}

/// violated preconditions on caller-supplied data
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, ThisError)]
#[non_exhaustive]
pub enum InputErrorKind {
    #[error("dataset is empty")]
    EmptyDataset,
    #[error("power sequence holds {available} powers, {needed} needed")]
    ShortPowerSequence { needed: usize, available: usize },
    #[error("element belongs to a different modulus")]
    ModulusMismatch,
    #[error("encoded integer is not below the modulus")]
    OutOfRange,
}

impl From<MPCErrorKind> for Error {
    fn from(kind: MPCErrorKind) -> Self {
        Error::MPCError(kind)
    }
}

impl From<ConfigErrorKind> for Error {
    fn from(kind: ConfigErrorKind) -> Self {
        Error::ConfigError(kind)
    }
}

impl From<InputErrorKind> for Error {
    fn from(kind: InputErrorKind) -> Self {
        Error::InputError(kind)
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::IOError(err.kind())
    }
}

impl From<serde_json::Error> for Error {
    fn from(err: serde_json::Error) -> Self {
        error!("cannot decode json document: {}", err);
        match err.io_error_kind() {
            Some(kind) => Error::IOError(kind),
            None => Error::ConfigError(ConfigErrorKind::MalformedConfig),
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;
