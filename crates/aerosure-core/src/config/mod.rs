//! Application configuration.
//!
//! Every protocol constant is a named, overridable field with a compiled
//! default, loadable from TOML:
//!
//! ```toml
//! [registry]
//! funding_threshold = 10
//! oracle_registration_fee = 1
//! oracle_index_count = 3
//! index_universe = 10
//!
//! [consensus]
//! min_responses = 3
//!
//! [admission]
//! bootstrap_count = 4
//! quorum_numerator = 1
//! quorum_denominator = 2
//! registrar = "registrar"
//! ```
//!
//! Configuration is validated at load time; nonsense values (a zero quorum
//! denominator, an empty index universe) return errors rather than failing
//! somewhere deep inside an engine.

use serde::{Deserialize, Serialize};

/// Top-level configuration aggregating all subsystem sections.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub registry: RegistryConfig,

    #[serde(default)]
    pub consensus: ConsensusConfig,

    #[serde(default)]
    pub admission: AdmissionConfig,
}

impl AppConfig {
    /// Parses a TOML document into a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first parse or validation failure.
    pub fn from_toml_str(raw: &str) -> Result<Self, String> {
        let config: AppConfig = toml::from_str(raw).map_err(|e| e.to_string())?;
        config.validate()?;
        Ok(config)
    }

    /// Checks cross-field sanity of the configuration.
    ///
    /// # Errors
    ///
    /// Returns a description of the first violated constraint.
    pub fn validate(&self) -> Result<(), String> {
        if self.registry.oracle_index_count == 0 {
            return Err("registry.oracle_index_count must be at least 1".to_string());
        }
        if self.registry.index_universe == 0 {
            return Err("registry.index_universe must be at least 1".to_string());
        }
        if self.consensus.min_responses == 0 {
            return Err("consensus.min_responses must be at least 1".to_string());
        }
        if self.admission.quorum_denominator == 0 {
            return Err("admission.quorum_denominator must not be zero".to_string());
        }
        if self.admission.quorum_numerator > self.admission.quorum_denominator {
            return Err("admission quorum fraction must not exceed 1".to_string());
        }
        if self.admission.registrar.is_empty() {
            return Err("admission.registrar must not be empty".to_string());
        }
        Ok(())
    }
}

/// Participant registry settings: fees, funding, and index assignment shape.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegistryConfig {
    /// Minimum funding an airline must provide before it may vote (default: 10).
    #[serde(default = "default_funding_threshold")]
    pub funding_threshold: u64,

    /// Fee an oracle must pay on registration (default: 1).
    #[serde(default = "default_oracle_registration_fee")]
    pub oracle_registration_fee: u64,

    /// Number of indexes assigned to each oracle (default: 3).
    #[serde(default = "default_oracle_index_count")]
    pub oracle_index_count: usize,

    /// Size of the index universe; indexes are drawn from `[0, universe)`
    /// (default: 10).
    #[serde(default = "default_index_universe")]
    pub index_universe: u8,
}

fn default_funding_threshold() -> u64 {
    10
}

fn default_oracle_registration_fee() -> u64 {
    1
}

fn default_oracle_index_count() -> usize {
    3
}

fn default_index_universe() -> u8 {
    10
}

impl Default for RegistryConfig {
    fn default() -> Self {
        Self {
            funding_threshold: default_funding_threshold(),
            oracle_registration_fee: default_oracle_registration_fee(),
            oracle_index_count: default_oracle_index_count(),
            index_universe: default_index_universe(),
        }
    }
}

/// Flight status consensus settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConsensusConfig {
    /// Matching responses required to finalize a status request (default: 3).
    #[serde(default = "default_min_responses")]
    pub min_responses: usize,
}

fn default_min_responses() -> usize {
    3
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        Self { min_responses: default_min_responses() }
    }
}

/// Airline admission voting settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdmissionConfig {
    /// Registered-airline count below which a single authorized caller admits
    /// a candidate unilaterally (default: 4).
    #[serde(default = "default_bootstrap_count")]
    pub bootstrap_count: usize,

    /// Numerator of the quorum fraction (default: 1).
    #[serde(default = "default_quorum_numerator")]
    pub quorum_numerator: usize,

    /// Denominator of the quorum fraction (default: 2, i.e. >= 50%).
    #[serde(default = "default_quorum_denominator")]
    pub quorum_denominator: usize,

    /// Identity privileged to bootstrap the very first airline
    /// (default: `"registrar"`).
    #[serde(default = "default_registrar")]
    pub registrar: String,
}

fn default_bootstrap_count() -> usize {
    4
}

fn default_quorum_numerator() -> usize {
    1
}

fn default_quorum_denominator() -> usize {
    2
}

fn default_registrar() -> String {
    "registrar".to_string()
}

impl Default for AdmissionConfig {
    fn default() -> Self {
        Self {
            bootstrap_count: default_bootstrap_count(),
            quorum_numerator: default_quorum_numerator(),
            quorum_denominator: default_quorum_denominator(),
            registrar: default_registrar(),
        }
    }
}
