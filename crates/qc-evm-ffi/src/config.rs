//! # Instance Configuration
//!
//! Three ways for a host to describe the engine it wants, all mapped onto
//! [`EngineConfig`]:
//!
//! | Source | Entry point |
//! |--------|-------------|
//! | `#[repr(C)]` struct | `qc_evm_new_with_config` |
//! | Named preset | `qc_evm_new_with_preset` |
//! | JSON document | `qc_evm_new_with_json_config` |

use crate::codec::{parse_address, parse_u256};
use primitive_types::U256;
use qc_evm_engine::domain::entities::{BlockContext, EngineConfig, EvmVersion};
use qc_evm_engine::domain::value_objects::Address;
use serde::Deserialize;
use std::ffi::c_int;
use thiserror::Error;

// =============================================================================
// ERRORS
// =============================================================================

/// Rejected configuration.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// Spec id does not name a supported fork.
    #[error("unknown spec id {0}")]
    UnknownSpecId(u8),

    /// Chain id zero is reserved.
    #[error("chain id must be non-zero")]
    ZeroChainId,

    /// Preset value outside `QcEvmPreset`.
    #[error("unknown preset {0}")]
    UnknownPreset(c_int),

    /// JSON document did not deserialize.
    #[error("invalid JSON config: {0}")]
    Json(String),

    /// A JSON field held a malformed hex string.
    #[error("invalid value for {field}: {reason}")]
    InvalidField {
        /// Field name.
        field: &'static str,
        /// Parser message.
        reason: String,
    },
}

impl From<serde_json::Error> for ConfigError {
    fn from(err: serde_json::Error) -> Self {
        Self::Json(err.to_string())
    }
}

// =============================================================================
// C STRUCT
// =============================================================================

/// Engine configuration as laid out for C callers.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QcEvmConfig {
    /// Chain id reported by CHAINID. Must be non-zero.
    pub chain_id: u64,
    /// Fork spec id (11 Berlin, 12 London, 15 Paris, 16 Shanghai, 17 Cancun).
    pub spec_id: u8,
    /// Skip the sender nonce check.
    pub disable_nonce_check: bool,
    /// Top up senders instead of rejecting for insufficient funds.
    pub disable_balance_check: bool,
    /// Skip the block gas limit check.
    pub disable_block_gas_limit: bool,
    /// Skip the base fee check.
    pub disable_base_fee: bool,
    /// Block gas limit, 0 for the default.
    pub block_gas_limit: u64,
}

impl Default for QcEvmConfig {
    fn default() -> Self {
        let engine = EngineConfig::default();
        Self {
            chain_id: engine.chain_id(),
            spec_id: engine.evm_version.spec_id(),
            disable_nonce_check: engine.disable_nonce_check,
            disable_balance_check: engine.disable_balance_check,
            disable_block_gas_limit: engine.disable_block_gas_limit,
            disable_base_fee: engine.disable_base_fee,
            block_gas_limit: 0,
        }
    }
}

impl TryFrom<&QcEvmConfig> for EngineConfig {
    type Error = ConfigError;

    fn try_from(raw: &QcEvmConfig) -> Result<Self, Self::Error> {
        if raw.chain_id == 0 {
            return Err(ConfigError::ZeroChainId);
        }
        let evm_version =
            EvmVersion::from_spec_id(raw.spec_id).ok_or(ConfigError::UnknownSpecId(raw.spec_id))?;

        let mut block = BlockContext {
            chain_id: raw.chain_id,
            ..BlockContext::default()
        };
        if raw.block_gas_limit != 0 {
            block.gas_limit = raw.block_gas_limit;
        }

        Ok(Self {
            evm_version,
            block,
            disable_nonce_check: raw.disable_nonce_check,
            disable_balance_check: raw.disable_balance_check,
            disable_block_gas_limit: raw.disable_block_gas_limit,
            disable_base_fee: raw.disable_base_fee,
            ..Self::default()
        })
    }
}

// =============================================================================
// PRESETS
// =============================================================================

/// Named chain configurations.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum QcEvmPreset {
    /// Ethereum mainnet (chain 1).
    Mainnet = 0,
    /// Sepolia testnet (chain 11155111).
    Sepolia = 1,
    /// BNB Smart Chain mainnet (chain 56).
    BscMainnet = 2,
    /// BNB Smart Chain testnet (chain 97).
    BscTestnet = 3,
}

impl QcEvmPreset {
    /// Chain id of the preset.
    #[must_use]
    pub const fn chain_id(self) -> u64 {
        match self {
            Self::Mainnet => 1,
            Self::Sepolia => 11_155_111,
            Self::BscMainnet => 56,
            Self::BscTestnet => 97,
        }
    }

    /// Engine configuration for the preset: Cancun rules, default limits.
    #[must_use]
    pub fn engine_config(self) -> EngineConfig {
        EngineConfig {
            evm_version: EvmVersion::Cancun,
            block: BlockContext {
                chain_id: self.chain_id(),
                ..BlockContext::default()
            },
            ..EngineConfig::default()
        }
    }
}

impl TryFrom<c_int> for QcEvmPreset {
    type Error = ConfigError;

    fn try_from(raw: c_int) -> Result<Self, Self::Error> {
        match raw {
            0 => Ok(Self::Mainnet),
            1 => Ok(Self::Sepolia),
            2 => Ok(Self::BscMainnet),
            3 => Ok(Self::BscTestnet),
            other => Err(ConfigError::UnknownPreset(other)),
        }
    }
}

// =============================================================================
// JSON
// =============================================================================

/// JSON configuration document. Every field is optional; unknown fields are
/// rejected.
///
/// ```json
/// {
///   "chain_id": 97,
///   "evm_version": "shanghai",
///   "base_fee": "0x7",
///   "coinbase": "0x00000000000000000000000000000000000000c0",
///   "disable_nonce_check": true
/// }
/// ```
#[derive(Clone, Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct JsonConfig {
    /// Chain id.
    pub chain_id: Option<u64>,
    /// Fork name (`berlin` .. `cancun`).
    pub evm_version: Option<EvmVersion>,
    /// Block number.
    pub block_number: Option<u64>,
    /// Block timestamp.
    pub timestamp: Option<u64>,
    /// Coinbase address (hex).
    pub coinbase: Option<String>,
    /// Block gas limit.
    pub block_gas_limit: Option<u64>,
    /// Base fee (hex).
    pub base_fee: Option<String>,
    /// PREVRANDAO (hex).
    pub prevrandao: Option<String>,
    /// Gas price for transactions that carry none (hex).
    pub default_gas_price: Option<String>,
    /// Maximum deployed code size.
    pub max_code_size: Option<usize>,
    /// Maximum init code size.
    pub max_init_code_size: Option<usize>,
    /// Skip the sender nonce check.
    pub disable_nonce_check: bool,
    /// Top up senders instead of rejecting for insufficient funds.
    pub disable_balance_check: bool,
    /// Skip the block gas limit check.
    pub disable_block_gas_limit: bool,
    /// Skip the base fee check.
    pub disable_base_fee: bool,
}

impl JsonConfig {
    /// Parses a JSON document.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Json` on malformed JSON or unknown fields.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(text)?)
    }

    /// Overlays the document on the default engine configuration.
    ///
    /// # Errors
    ///
    /// Returns `ZeroChainId` or `InvalidField` for malformed values.
    pub fn into_engine_config(self) -> Result<EngineConfig, ConfigError> {
        let mut config = EngineConfig::default();

        if let Some(chain_id) = self.chain_id {
            if chain_id == 0 {
                return Err(ConfigError::ZeroChainId);
            }
            config.block.chain_id = chain_id;
        }
        if let Some(version) = self.evm_version {
            config.evm_version = version;
        }
        if let Some(number) = self.block_number {
            config.block.number = number;
        }
        if let Some(timestamp) = self.timestamp {
            config.block.timestamp = timestamp;
        }
        if let Some(gas_limit) = self.block_gas_limit {
            config.block.gas_limit = gas_limit;
        }
        if let Some(coinbase) = self.coinbase.as_deref() {
            config.block.coinbase = json_address("coinbase", coinbase)?;
        }
        if let Some(base_fee) = self.base_fee.as_deref() {
            config.block.base_fee = json_u256("base_fee", base_fee)?;
        }
        if let Some(prevrandao) = self.prevrandao.as_deref() {
            config.block.prevrandao = json_u256("prevrandao", prevrandao)?;
        }
        if let Some(price) = self.default_gas_price.as_deref() {
            config.default_gas_price = json_u256("default_gas_price", price)?;
        }
        if let Some(size) = self.max_code_size {
            config.max_code_size = size;
        }
        if let Some(size) = self.max_init_code_size {
            config.max_init_code_size = size;
        }

        config.disable_nonce_check = self.disable_nonce_check;
        config.disable_balance_check = self.disable_balance_check;
        config.disable_block_gas_limit = self.disable_block_gas_limit;
        config.disable_base_fee = self.disable_base_fee;
        Ok(config)
    }
}

fn json_address(field: &'static str, value: &str) -> Result<Address, ConfigError> {
    parse_address(value).map_err(|e| ConfigError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

fn json_u256(field: &'static str, value: &str) -> Result<U256, ConfigError> {
    parse_u256(value).map_err(|e| ConfigError::InvalidField {
        field,
        reason: e.to_string(),
    })
}

/// Parses a JSON document straight into an engine configuration.
///
/// # Errors
///
/// See [`JsonConfig::from_json`] and [`JsonConfig::into_engine_config`].
pub fn engine_config_from_json(text: &str) -> Result<EngineConfig, ConfigError> {
    JsonConfig::from_json(text)?.into_engine_config()
}

// =============================================================================
// TESTS
// =============================================================================
