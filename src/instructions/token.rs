use solana_sdk::instruction::{AccountMeta, Instruction};
use solana_sdk::pubkey::Pubkey;

use crate::error::{PaymentError, PaymentResult};

pub const SPL_TOKEN_PROGRAM: Pubkey = spl_token::ID;
pub const ASSOCIATED_TOKEN_PROGRAM: Pubkey = spl_associated_token_account::ID;
const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");

/// `create_idempotent`：账户已存在时链上直接成功，不会重复收取租金。
pub fn create_associated_token_account_idempotent(
    payer: &Pubkey,
    associated: &Pubkey,
    owner: &Pubkey,
    mint: &Pubkey,
) -> Instruction {
    Instruction {
        program_id: ASSOCIATED_TOKEN_PROGRAM,
        accounts: vec![
            AccountMeta::new(*payer, true),
            AccountMeta::new(*associated, false),
            AccountMeta::new_readonly(*owner, false),
            AccountMeta::new_readonly(*mint, false),
            AccountMeta::new_readonly(SYSTEM_PROGRAM_ID, false),
            AccountMeta::new_readonly(SPL_TOKEN_PROGRAM, false),
        ],
        data: vec![1u8],
    }
}

pub fn transfer(
    source: &Pubkey,
    destination: &Pubkey,
    authority: &Pubkey,
    amount: u64,
) -> PaymentResult<Instruction> {
    spl_token::instruction::transfer(
        &SPL_TOKEN_PROGRAM,
        source,
        destination,
        authority,
        &[],
        amount,
    )
    .map_err(|err| PaymentError::Validation(format!("构造转账指令失败: {err}")))
}

pub fn mint_to(
    mint: &Pubkey,
    destination: &Pubkey,
    mint_authority: &Pubkey,
    amount: u64,
) -> PaymentResult<Instruction> {
    spl_token::instruction::mint_to(
        &SPL_TOKEN_PROGRAM,
        mint,
        destination,
        mint_authority,
        &[],
        amount,
    )
    .map_err(|err| PaymentError::Validation(format!("构造铸币指令失败: {err}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::decode_transfer_amount;

    #[test]
    fn transfer_data_carries_tag_and_amount() {
        let ix = transfer(
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
            95_000_000_000,
        )
        .unwrap();
        assert_eq!(ix.program_id, SPL_TOKEN_PROGRAM);
        assert_eq!(decode_transfer_amount(&ix.data), Some(95_000_000_000));
    }

    #[test]
    fn create_ata_targets_associated_program() {
        let payer = Pubkey::new_unique();
        let ata = Pubkey::new_unique();
        let ix = create_associated_token_account_idempotent(
            &payer,
            &ata,
            &Pubkey::new_unique(),
            &Pubkey::new_unique(),
        );
        assert_eq!(ix.program_id, ASSOCIATED_TOKEN_PROGRAM);
        assert_eq!(ix.accounts[1].pubkey, ata);
        assert!(ix.accounts[0].is_signer);
        assert_eq!(ix.data, vec![1]);
    }
}
