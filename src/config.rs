//! run parameters of a custody group

use crate::math::{PolynomialEngine, PrimeModulus, Strategy};
use crate::protocol::error::{ConfigErrorKind, Result};
use crate::protocol::shamir::threshold::ThresholdScheme;
use serde::{Deserialize, Serialize};
use std::path::Path;
use tracing::{debug, error};

/// prime field the PRF runs over
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
pub enum FieldChoice {
    #[default]
    #[serde(rename = "bls12_381")]
    Bls12_381,
    #[serde(rename = "secp256k1")]
    Secp256k1,
}

/// polynomial synthesis strategy, see [`Strategy`]
#[derive(Copy, Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StrategyChoice {
    Incremental,
    Ntt,
    #[default]
    Auto,
}

/// Example:
/// ```
/// use custody::config::{CustodyConfig, FieldChoice};
///
/// let config = CustodyConfig::from_json_str(r#"{"parties": 7, "threshold": 2}"#).unwrap();
/// assert_eq!(config.field, FieldChoice::Bls12_381);
/// assert_eq!(config.scheme().unwrap().threshold(), 2);
/// ```
#[derive(Clone, Debug, Eq, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CustodyConfig {
    pub parties: usize,
    pub threshold: usize,
    pub field: FieldChoice,
    pub strategy: StrategyChoice,
    /// largest dataset synthesized incrementally under `auto`
    pub ntt_cutoff: usize,
}

impl Default for CustodyConfig {
    fn default() -> Self {
        Self {
            parties: 4,
            threshold: 1,
            field: FieldChoice::default(),
            strategy: StrategyChoice::default(),
            ntt_cutoff: 64,
        }
    }
}

impl CustodyConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        debug!("loaded {:?}", config);
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        Self::from_json_str(&std::fs::read_to_string(path)?)
    }

    /// a threshold scheme needs `parties >= 1` and `threshold < parties`
    pub fn validate(&self) -> Result<()> {
        if self.parties == 0 || self.threshold >= self.parties {
            error!(
                "threshold {} does not fit {} parties",
                self.threshold, self.parties
            );
            Err(ConfigErrorKind::InvalidThreshold {
                threshold: self.threshold,
                parties: self.parties,
            })?;
        }
        Ok(())
    }

    pub fn modulus(&self) -> PrimeModulus {
        match self.field {
            FieldChoice::Bls12_381 => PrimeModulus::bls12_381_scalar(),
            FieldChoice::Secp256k1 => PrimeModulus::secp256k1_scalar(),
        }
    }

    pub fn strategy(&self) -> Strategy {
        match self.strategy {
            StrategyChoice::Incremental => Strategy::Incremental,
            StrategyChoice::Ntt => Strategy::Ntt,
            StrategyChoice::Auto => Strategy::Auto {
                cutoff: self.ntt_cutoff,
            },
        }
    }

    pub fn engine(&self) -> PolynomialEngine {
        PolynomialEngine::new(self.modulus(), self.strategy())
    }

    pub fn scheme(&self) -> Result<ThresholdScheme> {
        ThresholdScheme::new(self.modulus(), self.threshold, self.parties)
    }
}

#[test]
fn test_defaults() {
    use crate::protocol::shamir::SSServer;

    let config = CustodyConfig::from_json_str("{}").unwrap();
    assert_eq!(config, CustodyConfig::default());
    assert_eq!(config.strategy(), Strategy::Auto { cutoff: 64 });
    assert_eq!(config.modulus(), PrimeModulus::bls12_381_scalar());
    let scheme = config.scheme().unwrap();
    assert_eq!((scheme.parties(), scheme.threshold()), (4, 1));
}

#[test]
fn test_parses_every_field() {
    let config = CustodyConfig::from_json_str(
        r#"{"parties": 5, "threshold": 2, "field": "secp256k1", "strategy": "ntt", "ntt_cutoff": 8}"#,
    )
    .unwrap();
    assert_eq!(config.field, FieldChoice::Secp256k1);
    assert_eq!(config.engine().strategy(), Strategy::Ntt);
    assert_eq!(config.engine().modulus(), &PrimeModulus::secp256k1_scalar());

    let roundtrip = serde_json::to_string(&config).unwrap();
    assert_eq!(CustodyConfig::from_json_str(&roundtrip).unwrap(), config);
}

#[test]
fn test_rejects_bad_documents() {
    use crate::protocol::error::Error;

    let malformed = Err(Error::ConfigError(ConfigErrorKind::MalformedConfig));
    assert_eq!(CustodyConfig::from_json_str(r#"{"field": "p97"}"#), malformed);
    assert_eq!(CustodyConfig::from_json_str(r#"{"partys": 3}"#), malformed);
    assert_eq!(CustodyConfig::from_json_str("not json"), malformed);
    assert_eq!(
        CustodyConfig::from_json_str(r#"{"parties": 3, "threshold": 3}"#),
        Err(Error::ConfigError(ConfigErrorKind::InvalidThreshold {
            threshold: 3,
            parties: 3
        }))
    );
    assert!(CustodyConfig::from_file("/nonexistent/custody.json").is_err());
}
