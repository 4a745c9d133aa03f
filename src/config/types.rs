use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use serde::Deserialize;
use solana_sdk::pubkey::Pubkey;

use super::ConfigError;
use crate::rates::OracleIds;
use crate::types::{Asset, MAX_DECIMALS};

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SaopayConfig {
    #[serde(default)]
    pub global: GlobalConfig,
    #[serde(default)]
    pub wallet: WalletConfig,
    #[serde(default)]
    pub assets: AssetsConfig,
    #[serde(default)]
    pub fees: FeesConfig,
    #[serde(default)]
    pub rates: RatesConfig,
    #[serde(default)]
    pub staking: StakingConfig,
    #[serde(default)]
    pub airdrop: AirdropConfig,
}

impl SaopayConfig {
    /// 加载后统一校验，避免运行期才发现取值越界。
    pub fn validate(&self) -> Result<(), ConfigError> {
        let percent = self.fees.percent_to_charge;
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(ConfigError::Invalid(format!(
                "fees.percent_to_charge 必须位于 [0, 100]，当前为 {percent}"
            )));
        }
        if self.rates.refresh_interval_secs == 0 {
            return Err(ConfigError::Invalid(
                "rates.refresh_interval_secs 必须大于 0".into(),
            ));
        }
        if self.global.rpc_timeout_secs == 0 {
            return Err(ConfigError::Invalid("global.rpc_timeout_secs 必须大于 0".into()));
        }
        if self.assets.platform_decimals > MAX_DECIMALS {
            return Err(ConfigError::Invalid(format!(
                "assets.platform_decimals 不能超过 {MAX_DECIMALS}，当前为 {}",
                self.assets.platform_decimals
            )));
        }
        self.assets.platform_asset()?;
        self.fees.fee_accumulator_pubkey()?;
        self.staking.vault_owner_pubkey()?;
        Ok(())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct GlobalConfig {
    #[serde(default, deserialize_with = "super::deserialize_rpc_urls")]
    pub rpc_urls: Vec<String>,
    #[serde(default = "super::default_rpc_timeout_secs")]
    pub rpc_timeout_secs: u64,
    #[serde(default)]
    pub environment: Environment,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub prometheus: PrometheusConfig,
}

impl GlobalConfig {
    pub fn rpc_urls(&self) -> &[String] {
        &self.rpc_urls
    }

    pub fn rpc_timeout(&self) -> Duration {
        Duration::from_secs(self.rpc_timeout_secs)
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Environment {
    #[default]
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn is_production(&self) -> bool {
        matches!(self, Environment::Production)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "super::default_logging_level")]
    pub level: String,
    #[serde(default)]
    pub json: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PrometheusConfig {
    #[serde(default)]
    pub enable: bool,
    #[serde(default = "super::default_prometheus_listen")]
    pub listen: String,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct WalletConfig {
    /// 手续费账户私钥；留空时读取环境变量。
    #[serde(default)]
    pub fee_payer_private_key: String,
}

/// `[assets]`：平台代币 SAO 的 Mint 与精度。
#[derive(Debug, Clone, Deserialize)]
pub struct AssetsConfig {
    #[serde(default)]
    pub platform_mint: Option<String>,
    #[serde(default = "super::default_platform_decimals")]
    pub platform_decimals: u8,
}

impl AssetsConfig {
    pub fn platform_asset(&self) -> Result<Option<Asset>, ConfigError> {
        parse_optional_pubkey("assets.platform_mint", self.platform_mint.as_deref())
            .map(|mint| mint.map(|mint| Asset::new(mint, self.platform_decimals)))
    }
}

/// 创建收款方关联账户失败时的处理方式。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AtaCreationPolicy {
    /// 记录告警后继续使用推导地址。
    #[default]
    Proceed,
    Fail,
}

#[derive(Debug, Clone, Deserialize)]
pub struct FeesConfig {
    #[serde(default)]
    pub fee_accumulator_account: Option<String>,
    #[serde(default)]
    pub percent_to_charge: Decimal,
    #[serde(default)]
    pub charge_blockchain_fee_from_sender: bool,
    #[serde(default = "super::default_true")]
    pub allow_fallback_to_default_fee: bool,
    #[serde(default = "super::default_fee_lamports")]
    pub default_fee_lamports: u64,
    #[serde(default)]
    pub ata_creation_failure: AtaCreationPolicy,
    #[serde(default)]
    pub compute_unit_price_micro_lamports: u64,
}

impl FeesConfig {
    pub fn fee_accumulator_pubkey(&self) -> Result<Option<Pubkey>, ConfigError> {
        parse_optional_pubkey(
            "fees.fee_accumulator_account",
            self.fee_accumulator_account.as_deref(),
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RatesConfig {
    #[serde(default = "super::default_oracle_base_url")]
    pub oracle_base_url: String,
    #[serde(default)]
    pub api_key: Option<String>,
    #[serde(default = "super::default_sol_oracle_id")]
    pub sol_id: String,
    #[serde(default = "super::default_sao_oracle_id")]
    pub sao_id: String,
    #[serde(default = "super::default_ar_oracle_id")]
    pub ar_id: String,
    #[serde(default = "super::default_refresh_interval_secs")]
    pub refresh_interval_secs: u64,
    #[serde(default = "super::default_oracle_timeout_ms")]
    pub request_timeout_ms: u64,
}

impl RatesConfig {
    pub fn oracle_ids(&self) -> OracleIds {
        OracleIds {
            sol: self.sol_id.clone(),
            sao: self.sao_id.clone(),
            ar: self.ar_id.clone(),
        }
    }

    pub fn refresh_interval(&self) -> Duration {
        Duration::from_secs(self.refresh_interval_secs)
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StakingConfig {
    /// 质押金库所有者，质押/解押即与其关联账户之间的转账。
    #[serde(default)]
    pub vault_owner: Option<String>,
}

impl StakingConfig {
    pub fn vault_owner_pubkey(&self) -> Result<Option<Pubkey>, ConfigError> {
        parse_optional_pubkey("staking.vault_owner", self.vault_owner.as_deref())
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct AirdropConfig {
    #[serde(default = "super::default_max_airdrop_lamports")]
    pub max_lamports: u64,
}

fn parse_optional_pubkey(field: &str, raw: Option<&str>) -> Result<Option<Pubkey>, ConfigError> {
    match raw.map(str::trim).filter(|value| !value.is_empty()) {
        Some(value) => Pubkey::from_str(value)
            .map(Some)
            .map_err(|err| ConfigError::Invalid(format!("{field} 不是合法公钥 {value}: {err}"))),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Deserialize)]
    struct Wrapper {
        global: GlobalConfig,
    }

    #[test]
    fn deserialize_single_rpc_url_string() {
        let wrapper: Wrapper =
            toml::from_str("[global]\nrpc_urls = \" http://localhost:8899 \"\n").unwrap();
        assert_eq!(wrapper.global.rpc_urls(), ["http://localhost:8899".to_string()]);
    }

    #[test]
    fn deserialize_rpc_url_list_dedups() {
        let wrapper: Wrapper = toml::from_str(
            "[global]\nrpc_urls = [\"https://a\", \"\", \"https://b\", \"https://a\"]\n",
        )
        .unwrap();
        assert_eq!(
            wrapper.global.rpc_urls(),
            ["https://a".to_string(), "https://b".to_string()]
        );
    }

    #[test]
    fn empty_document_uses_defaults() {
        let config: SaopayConfig = toml::from_str("").unwrap();
        assert_eq!(config.global.environment, Environment::Development);
        assert_eq!(config.assets.platform_decimals, 9);
        assert_eq!(config.fees.default_fee_lamports, 5_000);
        assert!(config.fees.allow_fallback_to_default_fee);
        assert!(!config.fees.charge_blockchain_fee_from_sender);
        assert_eq!(config.fees.ata_creation_failure, AtaCreationPolicy::Proceed);
        assert_eq!(config.rates.refresh_interval_secs, 3_600);
        assert_eq!(config.rates.sao_id, "sao-network");
        assert_eq!(config.airdrop.max_lamports, 2_000_000_000);
        config.validate().unwrap();
    }

    #[test]
    fn out_of_range_percentage_fails_validation() {
        let config: SaopayConfig = toml::from_str("[fees]\npercent_to_charge = 150\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));
    }

    #[test]
    fn oversized_platform_decimals_fail_validation() {
        let config: SaopayConfig = toml::from_str("[assets]\nplatform_decimals = 20\n").unwrap();
        assert!(matches!(config.validate(), Err(ConfigError::Invalid(_))));

        let config: SaopayConfig = toml::from_str("[assets]\nplatform_decimals = 19\n").unwrap();
        config.validate().unwrap();
    }

    #[test]
    fn malformed_fee_account_fails_validation() {
        let config: SaopayConfig =
            toml::from_str("[fees]\nfee_accumulator_account = \"nope\"\n").unwrap();
        assert!(config.validate().is_err());
    }

    #[test]
    fn policy_and_environment_parse_lowercase() {
        let config: SaopayConfig = toml::from_str(
            "[global]\nenvironment = \"production\"\n[fees]\nata_creation_failure = \"fail\"\n",
        )
        .unwrap();
        assert!(config.global.environment.is_production());
        assert_eq!(config.fees.ata_creation_failure, AtaCreationPolicy::Fail);
    }
}
