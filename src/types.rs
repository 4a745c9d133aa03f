use std::fmt;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use solana_sdk::pubkey::Pubkey;

use crate::error::{PaymentError, PaymentResult};

/// u64 最小单位可表示的最大精度。
pub const MAX_DECIMALS: u8 = 19;

/// 参与手续费折算的三种资产。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum AssetType {
    Sol,
    Sao,
    Ar,
}

impl AssetType {
    pub const ALL: [AssetType; 3] = [AssetType::Sol, AssetType::Sao, AssetType::Ar];

    pub fn as_str(&self) -> &'static str {
        match self {
            AssetType::Sol => "SOL",
            AssetType::Sao => "SAO",
            AssetType::Ar => "AR",
        }
    }
}

impl fmt::Display for AssetType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// 链上同质化代币：Mint 地址 + 固定精度。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Asset {
    pub mint: Pubkey,
    pub decimals: u8,
}

impl Asset {
    pub fn new(mint: Pubkey, decimals: u8) -> Self {
        Self { mint, decimals }
    }

    /// 每个整数单位对应的最小单位数量，例如 9 位精度为 1e9。
    pub fn multiplier(&self) -> PaymentResult<Decimal> {
        if self.decimals > MAX_DECIMALS {
            return Err(PaymentError::Validation(format!(
                "代币精度 {} 超出上限 {MAX_DECIMALS}",
                self.decimals
            )));
        }
        10u64
            .checked_pow(u32::from(self.decimals))
            .map(Decimal::from)
            .ok_or_else(|| PaymentError::Validation(format!("代币精度非法: {}", self.decimals)))
    }

    /// 整数单位换算为最小单位，向零截断。
    pub fn to_base_units(&self, amount: Decimal) -> PaymentResult<u64> {
        if amount.is_sign_negative() {
            return Err(PaymentError::Validation(format!("金额不能为负数: {amount}")));
        }
        let multiplier = self.multiplier()?;
        amount
            .checked_mul(multiplier)
            .map(|scaled| scaled.trunc())
            .and_then(|scaled| scaled.to_u64())
            .ok_or_else(|| PaymentError::Validation(format!("金额超出可表示范围: {amount}")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::str::FromStr;

    #[test]
    fn base_units_truncate_toward_zero() {
        let asset = Asset::new(Pubkey::new_unique(), 9);
        let amount = Decimal::from_str("1.0000000019").unwrap();
        assert_eq!(asset.to_base_units(amount).unwrap(), 1_000_000_001);
    }

    #[test]
    fn oversized_decimals_are_validation_errors() {
        let asset = Asset::new(Pubkey::new_unique(), 20);
        let err = asset.to_base_units(Decimal::ONE).unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));

        let widest = Asset::new(Pubkey::new_unique(), MAX_DECIMALS);
        assert_eq!(widest.to_base_units(Decimal::ONE).unwrap(), 10u64.pow(19));
        assert!(Asset::new(Pubkey::new_unique(), u8::MAX).multiplier().is_err());
    }

    #[test]
    fn negative_amount_is_rejected() {
        let asset = Asset::new(Pubkey::new_unique(), 6);
        let err = asset.to_base_units(Decimal::from(-1)).unwrap_err();
        assert!(matches!(err, PaymentError::Validation(_)));
    }

    #[test]
    fn asset_type_labels_are_uppercase() {
        let labels: Vec<&str> = AssetType::ALL.iter().map(AssetType::as_str).collect();
        assert_eq!(labels, vec!["SOL", "SAO", "AR"]);
    }
}
