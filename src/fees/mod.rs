//! 多币种手续费折算：各笔费用先折成 USD 累加，最后按 SAO 价格换算。

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;

use crate::error::{PaymentError, PaymentResult};
use crate::rates::ExchangeRateCache;
use crate::types::AssetType;

pub const LAMPORTS_PER_SOL: u64 = 1_000_000_000;
pub const WINSTONS_PER_AR: u64 = 1_000_000_000_000;
pub const SAO_BASE_UNITS: u64 = 1_000_000_000;

/// 单次交易准备期间使用，价格在构造时固定。
#[derive(Debug, Clone)]
pub struct FeeAccumulator {
    sol_usd: Decimal,
    sao_usd: Decimal,
    ar_usd: Decimal,
    usd_total: Decimal,
}

impl FeeAccumulator {
    /// 从汇率缓存读取三种价格，任意一种缺失即失败。
    pub async fn load(rates: &ExchangeRateCache) -> PaymentResult<Self> {
        let (sol, sao, ar) = futures::try_join!(
            rates.rate(AssetType::Sol),
            rates.rate(AssetType::Sao),
            rates.rate(AssetType::Ar),
        )?;
        Self::from_prices(sol, sao, ar)
    }

    pub fn from_prices(sol_usd: Decimal, sao_usd: Decimal, ar_usd: Decimal) -> PaymentResult<Self> {
        for (asset, price) in [
            (AssetType::Sol, sol_usd),
            (AssetType::Sao, sao_usd),
            (AssetType::Ar, ar_usd),
        ] {
            if price <= Decimal::ZERO {
                return Err(PaymentError::RateUnavailable(asset));
            }
        }
        Ok(Self {
            sol_usd,
            sao_usd,
            ar_usd,
            usd_total: Decimal::ZERO,
        })
    }

    pub fn add_sol(&mut self, amount: Decimal) -> PaymentResult<()> {
        self.add(AssetType::Sol, amount)
    }

    pub fn add_sao(&mut self, amount: Decimal) -> PaymentResult<()> {
        self.add(AssetType::Sao, amount)
    }

    pub fn add_ar(&mut self, amount: Decimal) -> PaymentResult<()> {
        self.add(AssetType::Ar, amount)
    }

    pub fn add_winstons(&mut self, winstons: u64) -> PaymentResult<()> {
        self.add_ar(Decimal::from(winstons) / Decimal::from(WINSTONS_PER_AR))
    }

    pub fn add_lamports(&mut self, lamports: u64) -> PaymentResult<()> {
        self.add_sol(Decimal::from(lamports) / Decimal::from(LAMPORTS_PER_SOL))
    }

    pub fn usd_total(&self) -> Decimal {
        self.usd_total
    }

    pub fn fee_in_sao(&self) -> PaymentResult<Decimal> {
        self.usd_total.checked_div(self.sao_usd).ok_or_else(|| {
            PaymentError::Validation(format!(
                "手续费折算 SAO 溢出: {} USD / {} USD",
                self.usd_total, self.sao_usd
            ))
        })
    }

    /// SAO 最小单位，向零截断。
    pub fn fee_in_sao_multiplied(&self) -> PaymentResult<u64> {
        let fee = self.fee_in_sao()?;
        fee.checked_mul(Decimal::from(SAO_BASE_UNITS))
            .and_then(|scaled| scaled.trunc().to_u64())
            .ok_or_else(|| PaymentError::Validation(format!("手续费超出可表示范围: {fee}")))
    }

    fn price(&self, asset: AssetType) -> Decimal {
        match asset {
            AssetType::Sol => self.sol_usd,
            AssetType::Sao => self.sao_usd,
            AssetType::Ar => self.ar_usd,
        }
    }

    fn add(&mut self, asset: AssetType, amount: Decimal) -> PaymentResult<()> {
        if amount.is_sign_negative() && !amount.is_zero() {
            return Err(PaymentError::Validation(format!(
                "{asset} 手续费不能为负数: {amount}"
            )));
        }
        let usd = amount
            .checked_mul(self.price(asset))
            .and_then(|usd| self.usd_total.checked_add(usd))
            .ok_or_else(|| PaymentError::Validation(format!("{asset} 手续费溢出: {amount}")))?;
        self.usd_total = usd;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use super::*;

    fn dec(raw: &str) -> Decimal {
        Decimal::from_str(raw).unwrap()
    }

    #[test]
    fn mixed_currencies_normalise_through_usd() {
        let mut acc = FeeAccumulator::from_prices(dec("100"), dec("0.5"), dec("5")).unwrap();
        acc.add_sao(dec("10")).unwrap();
        acc.add_sol(dec("0.01")).unwrap();
        acc.add_ar(dec("0.2")).unwrap();
        // 5 + 1 + 1 USD
        assert_eq!(acc.usd_total(), dec("7"));
        assert_eq!(acc.fee_in_sao().unwrap(), dec("14"));
        assert_eq!(acc.fee_in_sao_multiplied().unwrap(), 14_000_000_000);
    }

    #[test]
    fn sub_unit_helpers_scale_before_adding() {
        let mut acc = FeeAccumulator::from_prices(dec("100"), dec("1"), dec("10")).unwrap();
        acc.add_winstons(500_000_000_000).unwrap();
        acc.add_lamports(5_000).unwrap();
        assert_eq!(acc.usd_total(), dec("5.0005"));
    }

    #[test]
    fn multiplied_fee_truncates_toward_zero() {
        let mut acc = FeeAccumulator::from_prices(dec("1"), dec("3"), dec("1")).unwrap();
        acc.add_sol(dec("1")).unwrap();
        // 1/3 SAO = 0.333333333(3…) → 333_333_333 base units
        assert_eq!(acc.fee_in_sao_multiplied().unwrap(), 333_333_333);
    }

    #[test]
    fn tiny_sao_price_overflow_is_validation_error() {
        let mut acc =
            FeeAccumulator::from_prices(dec("1"), dec("0.00000000000000000001"), dec("1")).unwrap();
        acc.add_sol(dec("100000000000000000000")).unwrap();
        assert!(matches!(acc.fee_in_sao(), Err(PaymentError::Validation(_))));
        assert!(matches!(acc.fee_in_sao_multiplied(), Err(PaymentError::Validation(_))));
    }

    #[test]
    fn total_never_decreases() {
        let mut acc = FeeAccumulator::from_prices(dec("1"), dec("1"), dec("1")).unwrap();
        acc.add_sao(dec("2")).unwrap();
        assert!(acc.add_sao(dec("-1")).is_err());
        acc.add_sao(Decimal::ZERO).unwrap();
        assert_eq!(acc.usd_total(), dec("2"));
    }

    #[test]
    fn zero_price_is_rate_unavailable() {
        let err = FeeAccumulator::from_prices(dec("1"), Decimal::ZERO, dec("1")).unwrap_err();
        assert!(matches!(err, PaymentError::RateUnavailable(AssetType::Sao)));
    }
}
