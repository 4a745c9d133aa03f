use rust_decimal::Decimal;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

use crate::error::{PaymentError, PaymentResult};
use crate::instructions::maybe_insert_compute_unit_price;
use crate::instructions::token;
use crate::types::Asset;

/// 平台抽成 = 金额 × 百分比 / 100。
pub(crate) fn platform_fee(amount: Decimal, percent: Decimal) -> PaymentResult<Decimal> {
    amount
        .checked_mul(percent)
        .map(|value| value / Decimal::ONE_HUNDRED)
        .ok_or_else(|| PaymentError::Validation(format!("手续费计算溢出: {amount} × {percent}%")))
}

/// 一笔转账拆成收款与手续费两段，金额均为最小单位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct TransferLegs {
    pub source: Pubkey,
    pub recipient: Pubkey,
    pub authority: Pubkey,
    pub fee_account: Option<Pubkey>,
    pub recipient_units: u64,
    pub fee_units: u64,
}

impl TransferLegs {
    pub fn split(
        asset: &Asset,
        amount: Decimal,
        fee: Decimal,
        source: Pubkey,
        recipient: Pubkey,
        authority: Pubkey,
        fee_account: Option<Pubkey>,
    ) -> PaymentResult<Self> {
        let total = asset.to_base_units(amount)?;
        let fee_units = asset.to_base_units(fee)?;
        let recipient_units = total
            .checked_sub(fee_units)
            .ok_or(PaymentError::InsufficientAmount { fee, amount })?;
        if fee_units > 0 && fee_account.is_none() {
            return Err(PaymentError::Configuration(
                "存在应收手续费但未配置 fees.fee_accumulator_account".into(),
            ));
        }
        Ok(Self {
            source,
            recipient,
            authority,
            fee_account,
            recipient_units,
            fee_units,
        })
    }

    pub fn instructions(&self, compute_unit_price: u64) -> PaymentResult<Vec<Instruction>> {
        let mut instructions = Vec::with_capacity(3);
        instructions.push(token::transfer(
            &self.source,
            &self.recipient,
            &self.authority,
            self.recipient_units,
        )?);
        if self.fee_units > 0 {
            if let Some(fee_account) = &self.fee_account {
                instructions.push(token::transfer(
                    &self.source,
                    fee_account,
                    &self.authority,
                    self.fee_units,
                )?);
            }
        }
        maybe_insert_compute_unit_price(&mut instructions, compute_unit_price);
        Ok(instructions)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::decode_transfer_amount;

    fn legs(amount: i64, fee: i64, fee_account: Option<Pubkey>) -> PaymentResult<TransferLegs> {
        TransferLegs::split(
            &Asset::new(Pubkey::new_unique(), 9),
            Decimal::from(amount),
            Decimal::from(fee),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            Pubkey::new_unique(),
            fee_account,
        )
    }

    #[test]
    fn platform_fee_is_a_plain_percentage() {
        assert_eq!(
            platform_fee(Decimal::from(100), Decimal::from(5)).unwrap(),
            Decimal::from(5)
        );
        assert_eq!(
            platform_fee(Decimal::new(35, 1), Decimal::new(125, 1)).unwrap(),
            Decimal::new(4375, 4)
        );
    }

    #[test]
    fn zero_fee_builds_single_transfer() {
        let legs = legs(10, 0, None).unwrap();
        let instructions = legs.instructions(0).unwrap();
        assert_eq!(instructions.len(), 1);
        assert_eq!(decode_transfer_amount(&instructions[0].data), Some(10_000_000_000));
    }

    #[test]
    fn fee_leg_goes_to_fee_account() {
        let fee_account = Pubkey::new_unique();
        let legs = legs(100, 5, Some(fee_account)).unwrap();
        let instructions = legs.instructions(500).unwrap();
        assert_eq!(instructions.len(), 3);
        assert_eq!(decode_transfer_amount(&instructions[1].data), Some(95_000_000_000));
        assert_eq!(decode_transfer_amount(&instructions[2].data), Some(5_000_000_000));
        assert_eq!(instructions[2].accounts[1].pubkey, fee_account);
    }

    #[test]
    fn owed_fee_without_account_is_configuration_error() {
        let err = legs(100, 5, None).unwrap_err();
        assert!(matches!(err, PaymentError::Configuration(_)));
    }
}
