//! Configuration management for the CCTX core
//!
//! Loads configuration from TOML files with environment variable substitution.
//! Every section has production defaults, so an empty document is a valid
//! configuration once the hub chain id is set.

use alloy_primitives::U256;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::{Path, PathBuf};

/// Root configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub hub: HubConfig,
    pub fees: FeeConfig,
    pub migration: MigrationConfig,
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct HubConfig {
    /// Chain id of the hub chain
    pub chain_id: i64,
    /// Additional chain ids that are treated as the hub (devnets, upgrades)
    pub additional_chain_ids: Vec<i64>,
    /// Fixed gas limit used when a revert is executed directly on the hub EVM
    pub zevm_revert_gas_limit: u64,
}

impl Default for HubConfig {
    fn default() -> Self {
        Self {
            chain_id: 7000,
            additional_chain_ids: Vec::new(),
            zevm_revert_gas_limit: 1_000_000,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct FeeConfig {
    /// Gas price multiplier applied when gas is paid with the hub-native coin
    pub hub_native_gas_multiplier: u64,
    /// Flat protocol fee charged on hub-native transfers, in the smallest unit
    pub hub_native_protocol_fee: U256,
    /// Share of the unused gas fee that can be redistributed
    pub usable_remaining_fees_percentage: u64,
    /// Share of the unused gas fee sent to the stability pool for legacy legs
    pub remaining_fees_to_stability_pool_percent: u64,
}

impl Default for FeeConfig {
    fn default() -> Self {
        Self {
            hub_native_gas_multiplier: 2,
            hub_native_protocol_fee: U256::from(2_000_000_000_000_000_000u128),
            usable_remaining_fees_percentage: 95,
            remaining_fees_to_stability_pool_percent: 95,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct MigrationConfig {
    /// EVM gas price multiplier, expressed as numerator / denominator
    pub evm_gas_multiplier_numerator: u64,
    pub evm_gas_multiplier_denominator: u64,
    /// Extra amount withheld on EVM migrations to absorb gas price movement
    pub evm_buffer_amount: U256,
    /// Gas limit of a plain EVM value transfer
    pub evm_send_gas_limit: u64,
    /// Gas limit used for UTXO chain migrations
    pub utxo_gas_limit: u64,
    /// Gas price multiplier for UTXO chain migrations
    pub utxo_gas_multiplier: u64,
    /// Priority fee multiplier for all migrations
    pub priority_fee_multiplier: u64,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            evm_gas_multiplier_numerator: 25,
            evm_gas_multiplier_denominator: 10,
            evm_buffer_amount: U256::from(2_100_000_000u64),
            evm_send_gas_limit: 21_000,
            utxo_gas_limit: 1_000_000,
            utxo_gas_multiplier: 2,
            priority_fee_multiplier: 2,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// EnvFilter directive used when RUST_LOG is not set
    pub filter: String,
    /// Emit JSON lines instead of human readable output
    pub json: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            filter: "info,cctx_core=debug".to_string(),
            json: false,
        }
    }
}

impl Settings {
    /// Load settings from the file named by CCTX_CONFIG, or config/default.toml
    pub fn load() -> Result<Self> {
        let config_path = env::var("CCTX_CONFIG")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("config/default.toml"));

        Self::load_from(&config_path)
    }

    /// Load settings from a specific file
    pub fn load_from(config_path: &Path) -> Result<Self> {
        let config_str = std::fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {:?}", config_path))?;

        Self::from_toml_str(&config_str)
    }

    /// Parse and validate an in-memory TOML document
    pub fn from_toml_str(input: &str) -> Result<Self> {
        // Substitute environment variables
        let config_str = substitute_env_vars(input)?;

        let settings: Settings =
            toml::from_str(&config_str).with_context(|| "Failed to parse configuration")?;

        settings.validate()?;

        Ok(settings)
    }

    /// Validate configuration
    fn validate(&self) -> Result<()> {
        if self.hub.chain_id == 0 {
            anyhow::bail!("hub.chain_id must be set");
        }
        if self.fees.usable_remaining_fees_percentage > 100 {
            anyhow::bail!("fees.usable_remaining_fees_percentage must be at most 100");
        }
        if self.fees.remaining_fees_to_stability_pool_percent > 100 {
            anyhow::bail!("fees.remaining_fees_to_stability_pool_percent must be at most 100");
        }
        if self.fees.hub_native_gas_multiplier == 0 {
            anyhow::bail!("fees.hub_native_gas_multiplier must be positive");
        }
        if self.migration.evm_gas_multiplier_denominator == 0 {
            anyhow::bail!("migration.evm_gas_multiplier_denominator must be positive");
        }
        if self.migration.evm_gas_multiplier_numerator == 0
            || self.migration.utxo_gas_multiplier == 0
            || self.migration.priority_fee_multiplier == 0
        {
            anyhow::bail!("migration multipliers must be positive");
        }
        if self.hub.zevm_revert_gas_limit == 0 {
            tracing::warn!("hub.zevm_revert_gas_limit is 0 - hub reverts will run without gas");
        }

        Ok(())
    }

    /// Check whether a chain id designates the hub
    pub fn is_hub_chain(&self, chain_id: i64) -> bool {
        chain_id == self.hub.chain_id || self.hub.additional_chain_ids.contains(&chain_id)
    }
}

/// Substitute environment variables in the format ${VAR_NAME}
fn substitute_env_vars(input: &str) -> Result<String> {
    let mut result = input.to_string();
    let re = regex::Regex::new(r"\$\{([A-Z_][A-Z0-9_]*)\}")?;

    for cap in re.captures_iter(input) {
        let var_name = &cap[1];
        let var_value = env::var(var_name).unwrap_or_default();
        result = result.replace(&cap[0], &var_value);
    }

    Ok(result)
}
