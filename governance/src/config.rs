//! Ledger configuration with TOML file support.

use serde::{Deserialize, Serialize};
use std::str::FromStr;

use tally_crypto::Eip712Domain;
use tally_types::{Address, Clock, ClockMode, VotesParams};
use tally_utils::LogFormat;

use crate::error::VotesError;
use crate::ledger::VotesLedger;

/// Configuration for a voting-power ledger.
///
/// Can be loaded from a TOML file via [`VotesConfig::from_toml_file`] or
/// built programmatically (e.g. for tests). Every field has a default, so an
/// empty file is a valid configuration.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VotesConfig {
    /// Unit checkpoints are indexed by: "blocknumber" or "timestamp".
    #[serde(default)]
    pub clock_mode: ClockMode,

    /// Maximum number of secondary delegatees per account.
    #[serde(default = "default_max_delegatees")]
    pub max_delegatees: usize,

    /// Total supply is capped at `2^max_supply_bits - 1`.
    #[serde(default = "default_max_supply_bits")]
    pub max_supply_bits: u32,

    /// Signing domain name.
    #[serde(default = "default_domain_name")]
    pub domain_name: String,

    /// Signing domain version.
    #[serde(default = "default_domain_version")]
    pub domain_version: String,

    #[serde(default = "default_chain_id")]
    pub chain_id: u64,

    /// Hex address the signing domain is bound to.
    #[serde(default = "default_verifying_contract")]
    pub verifying_contract: String,

    /// Log format: "human" or "json".
    #[serde(default = "default_log_format")]
    pub log_format: String,

    /// Log level filter: "trace", "debug", "info", "warn", "error".
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

// ── Serde default helpers ──────────────────────────────────────────────

fn default_max_delegatees() -> usize {
    VotesParams::DEFAULT_MAX_DELEGATEES
}

fn default_max_supply_bits() -> u32 {
    128
}

fn default_domain_name() -> String {
    "Tally".to_string()
}

fn default_domain_version() -> String {
    "1".to_string()
}

fn default_chain_id() -> u64 {
    1
}

fn default_verifying_contract() -> String {
    Address::ZERO.to_string()
}

fn default_log_format() -> String {
    "human".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

// ── Impl ───────────────────────────────────────────────────────────────

impl VotesConfig {
    /// Load configuration from a TOML file.
    pub fn from_toml_file(path: &str) -> Result<Self, VotesError> {
        let content =
            std::fs::read_to_string(path).map_err(|e| VotesError::Config(e.to_string()))?;
        Self::from_toml_str(&content)
    }

    /// Parse configuration from a TOML string.
    pub fn from_toml_str(s: &str) -> Result<Self, VotesError> {
        toml::from_str(s).map_err(|e| VotesError::Config(e.to_string()))
    }

    /// Serialize the configuration to a TOML string.
    pub fn to_toml_string(&self) -> Result<String, VotesError> {
        toml::to_string_pretty(self).map_err(|e| VotesError::Config(e.to_string()))
    }

    pub fn to_params(&self) -> Result<VotesParams, VotesError> {
        if self.max_delegatees == 0 {
            return Err(VotesError::Config("max_delegatees must be at least 1".into()));
        }
        if self.max_supply_bits == 0 || self.max_supply_bits > 128 {
            return Err(VotesError::Config(format!(
                "max_supply_bits must be in 1..=128, got {}",
                self.max_supply_bits
            )));
        }
        Ok(VotesParams {
            clock_mode: self.clock_mode,
            max_delegatees: self.max_delegatees,
            max_supply: VotesParams::supply_cap_for_bits(self.max_supply_bits),
        })
    }

    pub fn domain(&self) -> Result<Eip712Domain, VotesError> {
        let verifying_contract = Address::from_str(&self.verifying_contract)
            .map_err(|e| VotesError::Config(e.to_string()))?;
        Ok(Eip712Domain {
            name: self.domain_name.clone(),
            version: self.domain_version.clone(),
            chain_id: self.chain_id,
            verifying_contract,
        })
    }

    pub fn log_format(&self) -> Result<LogFormat, VotesError> {
        LogFormat::from_str(&self.log_format).map_err(VotesError::Config)
    }

    /// Install the global tracing subscriber described by this config.
    /// Fails if one is already installed.
    pub fn init_logging(&self) -> Result<(), VotesError> {
        tally_utils::try_init_logging(self.log_format()?, &self.log_level)
            .map_err(|e| VotesError::Config(e.to_string()))
    }
}

impl Default for VotesConfig {
    fn default() -> Self {
        Self {
            clock_mode: ClockMode::default(),
            max_delegatees: default_max_delegatees(),
            max_supply_bits: default_max_supply_bits(),
            domain_name: default_domain_name(),
            domain_version: default_domain_version(),
            chain_id: default_chain_id(),
            verifying_contract: default_verifying_contract(),
            log_format: default_log_format(),
            log_level: default_log_level(),
        }
    }
}

impl<C: Clock> VotesLedger<C> {
    /// Build an empty ledger from configuration.
    pub fn from_config(config: &VotesConfig, clock: C) -> Result<Self, VotesError> {
        Self::new(config.to_params()?, config.domain()?, clock)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tally_nullables::NullClock;

    #[test]
    fn empty_file_yields_defaults() {
        let config = VotesConfig::from_toml_str("").unwrap();
        assert_eq!(config, VotesConfig::default());
        let params = config.to_params().unwrap();
        assert_eq!(params.max_delegatees, 32);
        assert_eq!(params.max_supply, u128::MAX);
        assert_eq!(params.clock_mode, ClockMode::BlockNumber);
    }

    #[test]
    fn parses_overrides() {
        let config = VotesConfig::from_toml_str(
            r#"
            clock_mode = "timestamp"
            max_delegatees = 4
            max_supply_bits = 96
            chain_id = 11155111
            log_format = "json"
            "#,
        )
        .unwrap();
        let params = config.to_params().unwrap();
        assert_eq!(params.clock_mode, ClockMode::Timestamp);
        assert_eq!(params.max_delegatees, 4);
        assert_eq!(params.max_supply, (1u128 << 96) - 1);
        assert_eq!(config.domain().unwrap().chain_id, 11155111);
        assert_eq!(config.log_format().unwrap(), LogFormat::Json);
    }

    #[test]
    fn toml_round_trip() {
        let mut config = VotesConfig::default();
        config.domain_name = "Governor".into();
        let text = config.to_toml_string().unwrap();
        assert_eq!(VotesConfig::from_toml_str(&text).unwrap(), config);
    }

    #[test]
    fn rejects_bad_values() {
        let mut config = VotesConfig::default();
        config.max_supply_bits = 129;
        assert!(matches!(config.to_params(), Err(VotesError::Config(_))));
        let mut config = VotesConfig::default();
        config.verifying_contract = "0x1234".into();
        assert!(matches!(config.domain(), Err(VotesError::Config(_))));
        let mut config = VotesConfig::default();
        config.log_format = "xml".into();
        assert!(config.log_format().is_err());
    }

    #[test]
    fn loads_from_file() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "max_delegatees = 3").unwrap();
        let config = VotesConfig::from_toml_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.max_delegatees, 3);
        assert!(VotesConfig::from_toml_file("/nonexistent/tally.toml").is_err());
    }

    #[test]
    fn builds_ledger_in_configured_mode() {
        let config = VotesConfig::default();
        assert!(VotesLedger::from_config(&config, NullClock::new(1)).is_ok());
        let mut config = VotesConfig::default();
        config.clock_mode = ClockMode::Timestamp;
        assert!(matches!(
            VotesLedger::from_config(&config, NullClock::new(1)),
            Err(VotesError::ClockModeMismatch { .. })
        ));
    }
}
