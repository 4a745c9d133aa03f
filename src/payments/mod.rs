//! 对外支付操作：转账（含平台手续费）、铸币、质押、余额与历史查询。

mod builder;
mod service;

use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

use crate::chain::SignatureInfo;
use crate::config::{AtaCreationPolicy, ConfigError, Environment, SaopayConfig};
use crate::error::{PaymentError, PaymentResult};
use crate::types::Asset;

pub use service::PaymentService;

/// 单次转账的手续费策略。
#[derive(Debug, Clone, PartialEq)]
pub struct SendAssetsConfig {
    /// 平台抽成百分比，取值 `[0, 100]`。
    pub percent_to_charge: Decimal,
    pub charge_blockchain_fee_from_sender: bool,
    pub allow_fallback_to_default_fee: bool,
    /// 手续费估算不受支持时使用的 lamports。
    pub default_fee: u64,
}

impl Default for SendAssetsConfig {
    fn default() -> Self {
        Self {
            percent_to_charge: Decimal::ZERO,
            charge_blockchain_fee_from_sender: false,
            allow_fallback_to_default_fee: true,
            default_fee: 5_000,
        }
    }
}

impl SendAssetsConfig {
    pub fn validate(&self) -> PaymentResult<()> {
        let percent = self.percent_to_charge;
        if percent < Decimal::ZERO || percent > Decimal::ONE_HUNDRED {
            return Err(PaymentError::Validation(format!(
                "手续费百分比必须位于 [0, 100]，当前为 {percent}"
            )));
        }
        Ok(())
    }
}

/// 服务级设置，启动时由配置文件生成。
#[derive(Debug, Clone)]
pub struct PaymentSettings {
    pub environment: Environment,
    pub platform_asset: Option<Asset>,
    pub fee_accumulator_account: Option<Pubkey>,
    pub staking_vault_owner: Option<Pubkey>,
    pub max_airdrop_lamports: u64,
    pub compute_unit_price: u64,
    pub ata_creation_policy: AtaCreationPolicy,
    pub send: SendAssetsConfig,
}

impl Default for PaymentSettings {
    fn default() -> Self {
        Self {
            environment: Environment::default(),
            platform_asset: None,
            fee_accumulator_account: None,
            staking_vault_owner: None,
            max_airdrop_lamports: 2_000_000_000,
            compute_unit_price: 0,
            ata_creation_policy: AtaCreationPolicy::default(),
            send: SendAssetsConfig::default(),
        }
    }
}

impl PaymentSettings {
    pub fn from_config(config: &SaopayConfig) -> Result<Self, ConfigError> {
        let fees = &config.fees;
        Ok(Self {
            environment: config.global.environment,
            platform_asset: config.assets.platform_asset()?,
            fee_accumulator_account: fees.fee_accumulator_pubkey()?,
            staking_vault_owner: config.staking.vault_owner_pubkey()?,
            max_airdrop_lamports: config.airdrop.max_lamports,
            compute_unit_price: fees.compute_unit_price_micro_lamports,
            ata_creation_policy: fees.ata_creation_failure,
            send: SendAssetsConfig {
                percent_to_charge: fees.percent_to_charge,
                charge_blockchain_fee_from_sender: fees.charge_blockchain_fee_from_sender,
                allow_fallback_to_default_fee: fees.allow_fallback_to_default_fee,
                default_fee: fees.default_fee_lamports,
            },
        })
    }
}

/// `recipient` 可以是钱包地址或代币账户地址。
pub struct SendAssetsRequest<'a> {
    pub asset: Asset,
    pub fee_payer: &'a Keypair,
    pub source: &'a Keypair,
    pub recipient: Pubkey,
    /// 整数单位（非最小单位）。
    pub amount: Decimal,
}

#[derive(Debug, Clone)]
pub struct PrepareTxResponse {
    pub transaction: Transaction,
    pub fee_in_sao: Decimal,
    /// 未启用链上手续费计入时为 0。
    pub blockchain_fee_in_sol_multiplied: u64,
    pub source_account: Pubkey,
    pub recipient_account: Pubkey,
    pub fee_account: Option<Pubkey>,
    pub recipient_created: bool,
}

pub struct CreatedAccount {
    pub keypair: Keypair,
    pub token_account: Pubkey,
    pub signature: Signature,
}

#[derive(Debug, Clone, Serialize)]
pub struct TransactionRecord {
    #[serde(flatten)]
    pub signature: SignatureInfo,
    pub transaction: Value,
}
