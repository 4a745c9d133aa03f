use std::collections::HashSet;

use rust_decimal::Decimal;
use serde::Deserialize;
use serde::de::Deserializer;

pub mod loader;
pub mod types;

pub use loader::*;
pub use types::*;

use self::types as cfg;

pub(crate) fn default_true() -> bool {
    true
}

pub(crate) fn default_logging_level() -> String {
    "info".to_string()
}

pub(crate) fn default_prometheus_listen() -> String {
    "0.0.0.0:9898".to_string()
}

pub(crate) fn default_rpc_timeout_secs() -> u64 {
    30
}

pub(crate) fn default_platform_decimals() -> u8 {
    9
}

pub(crate) fn default_fee_lamports() -> u64 {
    5_000
}

pub(crate) fn default_oracle_base_url() -> String {
    "https://api.coingecko.com/api/v3".to_string()
}

pub(crate) fn default_sol_oracle_id() -> String {
    "solana".to_string()
}

pub(crate) fn default_sao_oracle_id() -> String {
    "sao-network".to_string()
}

pub(crate) fn default_ar_oracle_id() -> String {
    "arweave".to_string()
}

pub(crate) fn default_refresh_interval_secs() -> u64 {
    3_600
}

pub(crate) fn default_oracle_timeout_ms() -> u64 {
    10_000
}

pub(crate) fn default_max_airdrop_lamports() -> u64 {
    2_000_000_000
}

#[derive(Deserialize)]
#[serde(untagged)]
enum RpcUrlField {
    Single(String),
    Multiple(Vec<String>),
}

pub(crate) fn deserialize_rpc_urls<'de, D>(deserializer: D) -> Result<Vec<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let helper = Option::<RpcUrlField>::deserialize(deserializer)?;
    let mut seen = HashSet::new();
    let mut urls = Vec::new();

    let values = match helper {
        Some(RpcUrlField::Single(url)) => vec![url],
        Some(RpcUrlField::Multiple(list)) => list,
        None => Vec::new(),
    };

    for value in values {
        let trimmed = value.trim();
        if trimmed.is_empty() {
            continue;
        }
        if seen.insert(trimmed.to_string()) {
            urls.push(trimmed.to_string());
        }
    }

    Ok(urls)
}

impl Default for cfg::GlobalConfig {
    fn default() -> Self {
        Self {
            rpc_urls: Vec::new(),
            rpc_timeout_secs: default_rpc_timeout_secs(),
            environment: cfg::Environment::default(),
            logging: cfg::LoggingConfig::default(),
            prometheus: cfg::PrometheusConfig::default(),
        }
    }
}

impl Default for cfg::LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_logging_level(),
            json: false,
        }
    }
}

impl Default for cfg::PrometheusConfig {
    fn default() -> Self {
        Self {
            enable: false,
            listen: default_prometheus_listen(),
        }
    }
}

impl Default for cfg::AssetsConfig {
    fn default() -> Self {
        Self {
            platform_mint: None,
            platform_decimals: default_platform_decimals(),
        }
    }
}

impl Default for cfg::FeesConfig {
    fn default() -> Self {
        Self {
            fee_accumulator_account: None,
            percent_to_charge: Decimal::ZERO,
            charge_blockchain_fee_from_sender: false,
            allow_fallback_to_default_fee: default_true(),
            default_fee_lamports: default_fee_lamports(),
            ata_creation_failure: cfg::AtaCreationPolicy::default(),
            compute_unit_price_micro_lamports: 0,
        }
    }
}

impl Default for cfg::RatesConfig {
    fn default() -> Self {
        Self {
            oracle_base_url: default_oracle_base_url(),
            api_key: None,
            sol_id: default_sol_oracle_id(),
            sao_id: default_sao_oracle_id(),
            ar_id: default_ar_oracle_id(),
            refresh_interval_secs: default_refresh_interval_secs(),
            request_timeout_ms: default_oracle_timeout_ms(),
        }
    }
}

impl Default for cfg::AirdropConfig {
    fn default() -> Self {
        Self {
            max_lamports: default_max_airdrop_lamports(),
        }
    }
}
