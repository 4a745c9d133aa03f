//! 关联代币账户（ATA）解析与按需创建。

use std::sync::Arc;

use dashmap::DashMap;
use once_cell::sync::Lazy;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use tracing::{debug, warn};

use crate::config::AtaCreationPolicy;
use crate::dispatcher::{Dispatcher, Operation};
use crate::error::{PaymentError, PaymentResult};
use crate::instructions::token::{
    ASSOCIATED_TOKEN_PROGRAM, SPL_TOKEN_PROGRAM, create_associated_token_account_idempotent,
};
use crate::instructions::{maybe_insert_compute_unit_price, sign_transaction};
use crate::monitoring::events;
use crate::types::Asset;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
struct AtaKey {
    owner: Pubkey,
    mint: Pubkey,
    token_program: Pubkey,
}

static ATA_CACHE: Lazy<DashMap<AtaKey, Pubkey>> = Lazy::new(DashMap::new);

/// 返回缓存的 ATA 地址，未命中时计算并写入缓存。
pub fn associated_token_address(owner: &Pubkey, mint: &Pubkey) -> Pubkey {
    let key = AtaKey {
        owner: *owner,
        mint: *mint,
        token_program: SPL_TOKEN_PROGRAM,
    };
    *ATA_CACHE.entry(key).or_insert_with(|| {
        Pubkey::find_program_address(
            &[owner.as_ref(), SPL_TOKEN_PROGRAM.as_ref(), mint.as_ref()],
            &ASSOCIATED_TOKEN_PROGRAM,
        )
        .0
    })
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolvedAccount {
    pub address: Pubkey,
    /// 本次调用是否提交了创建交易。
    pub created: bool,
}

pub struct AccountResolver {
    dispatcher: Arc<Dispatcher>,
    policy: AtaCreationPolicy,
    compute_unit_price: u64,
}

impl AccountResolver {
    pub fn new(dispatcher: Arc<Dispatcher>, policy: AtaCreationPolicy, compute_unit_price: u64) -> Self {
        Self {
            dispatcher,
            policy,
            compute_unit_price,
        }
    }

    /// `owner` 本身即代币账户时直接返回；否则返回已存在的 ATA，未创建时报 `AccountNotCreated`。
    pub async fn resolve(&self, owner: &Pubkey, asset: &Asset) -> PaymentResult<Pubkey> {
        if self.is_token_account(owner).await? {
            debug!(target: "accounts", owner = %owner, "地址本身即代币账户");
            return Ok(*owner);
        }

        let ata = associated_token_address(owner, &asset.mint);
        if self.is_token_account(&ata).await? {
            return Ok(ata);
        }

        Err(PaymentError::AccountNotCreated {
            owner: *owner,
            mint: asset.mint,
        })
    }

    /// 提交一笔 ATA 创建交易，由 `fee_payer` 支付租金。
    pub async fn create(
        &self,
        owner: &Pubkey,
        asset: &Asset,
        fee_payer: &Keypair,
    ) -> PaymentResult<(Pubkey, Signature)> {
        let ata = associated_token_address(owner, &asset.mint);
        let mut instructions = vec![create_associated_token_account_idempotent(
            &fee_payer.pubkey(),
            &ata,
            owner,
            &asset.mint,
        )];
        maybe_insert_compute_unit_price(&mut instructions, self.compute_unit_price);

        let blockhash = self.dispatcher.get_latest_blockhash().await?;
        let transaction = sign_transaction(&instructions, fee_payer, &[], blockhash);
        let signature = self
            .dispatcher
            .send_transaction(Operation::CreateAta, &transaction)
            .await?;
        events::ata_created(owner, &asset.mint, &ata, &signature);
        Ok((ata, signature))
    }

    /// 仅在 `AccountNotCreated` 时创建；创建失败按策略处理。
    pub async fn resolve_or_create(
        &self,
        owner: &Pubkey,
        asset: &Asset,
        fee_payer: &Keypair,
    ) -> PaymentResult<ResolvedAccount> {
        match self.resolve(owner, asset).await {
            Ok(address) => {
                return Ok(ResolvedAccount {
                    address,
                    created: false,
                });
            }
            Err(err) if err.is_account_not_created() => {}
            Err(err) => return Err(err),
        }

        match self.create(owner, asset, fee_payer).await {
            Ok(_) => Ok(ResolvedAccount {
                address: associated_token_address(owner, &asset.mint),
                created: true,
            }),
            Err(err) => {
                let fatal = self.policy == AtaCreationPolicy::Fail;
                events::ata_creation_failed(owner, &asset.mint, &err.to_string(), fatal);
                if fatal {
                    return Err(PaymentError::AccountCreationFailed(err.to_string()));
                }
                warn!(
                    target: "accounts",
                    owner = %owner,
                    mint = %asset.mint,
                    "关联账户创建失败，继续使用推导地址"
                );
                Ok(ResolvedAccount {
                    address: associated_token_address(owner, &asset.mint),
                    created: false,
                })
            }
        }
    }

    async fn is_token_account(&self, address: &Pubkey) -> PaymentResult<bool> {
        let account = self.dispatcher.get_account(address).await?;
        Ok(account.is_some_and(|account| account.owner == SPL_TOKEN_PROGRAM))
    }
}
