use std::str::FromStr;
use std::sync::Arc;

use rust_decimal::Decimal;
use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;
use tracing::{debug, info};

use super::builder::{TransferLegs, platform_fee};
use super::{
    CreatedAccount, PaymentSettings, PrepareTxResponse, SendAssetsConfig, SendAssetsRequest,
    TransactionRecord,
};
use crate::accounts::AccountResolver;
use crate::chain::TokenBalance;
use crate::dispatcher::{Dispatcher, Operation};
use crate::error::{PaymentError, PaymentResult};
use crate::fees::FeeAccumulator;
use crate::instructions::{maybe_insert_compute_unit_price, sign_transaction, token};
use crate::monitoring::events;
use crate::rates::ExchangeRateCache;
use crate::types::Asset;

pub struct PaymentService {
    dispatcher: Arc<Dispatcher>,
    accounts: AccountResolver,
    rates: Arc<ExchangeRateCache>,
    settings: PaymentSettings,
}

impl PaymentService {
    pub fn new(
        dispatcher: Arc<Dispatcher>,
        rates: Arc<ExchangeRateCache>,
        settings: PaymentSettings,
    ) -> Self {
        let accounts = AccountResolver::new(
            dispatcher.clone(),
            settings.ata_creation_policy,
            settings.compute_unit_price,
        );
        Self {
            dispatcher,
            accounts,
            rates,
            settings,
        }
    }

    pub fn settings(&self) -> &PaymentSettings {
        &self.settings
    }

    pub fn dispatcher(&self) -> &Arc<Dispatcher> {
        &self.dispatcher
    }

    pub fn accounts(&self) -> &AccountResolver {
        &self.accounts
    }

    /// 组装并签名一笔带平台抽成的转账，不提交。
    pub async fn prepare_send_assets_tx(
        &self,
        request: &SendAssetsRequest<'_>,
        config: &SendAssetsConfig,
    ) -> PaymentResult<PrepareTxResponse> {
        config.validate()?;
        ensure_positive(request.amount)?;

        let mut accumulator = FeeAccumulator::load(&self.rates).await?;
        accumulator.add_sao(platform_fee(request.amount, config.percent_to_charge)?)?;
        let mut fee_in_sao = accumulator.fee_in_sao()?;
        let fee_owed = !fee_in_sao.is_zero() || config.charge_blockchain_fee_from_sender;
        if fee_owed && self.settings.fee_accumulator_account.is_none() {
            return Err(PaymentError::Configuration(
                "存在应收手续费但未配置 fees.fee_accumulator_account".into(),
            ));
        }

        let authority = request.source.pubkey();
        let source_account = self.accounts.resolve(&authority, &request.asset).await?;
        let recipient = self
            .accounts
            .resolve_or_create(&request.recipient, &request.asset, request.fee_payer)
            .await?;
        let fee_account = match self.settings.fee_accumulator_account {
            Some(owner) if fee_owed => Some(
                self.accounts
                    .resolve_or_create(&owner, &request.asset, request.fee_payer)
                    .await?
                    .address,
            ),
            _ => None,
        };

        let split = |fee: Decimal| {
            TransferLegs::split(
                &request.asset,
                request.amount,
                fee,
                source_account,
                recipient.address,
                authority,
                fee_account,
            )
        };
        let mut legs = split(fee_in_sao)?;
        let mut instructions = legs.instructions(self.settings.compute_unit_price)?;
        let blockhash = self.dispatcher.get_latest_blockhash().await?;

        let mut blockchain_fee = 0;
        if config.charge_blockchain_fee_from_sender {
            let message = Message::new_with_blockhash(
                &instructions,
                Some(&request.fee_payer.pubkey()),
                &blockhash,
            );
            blockchain_fee = self.estimate_fee(&message, config).await?;
            accumulator.add_lamports(blockchain_fee)?;
            fee_in_sao = accumulator.fee_in_sao()?;
            if fee_in_sao >= request.amount {
                return Err(PaymentError::InsufficientAmount {
                    fee: fee_in_sao,
                    amount: request.amount,
                });
            }
            legs = split(fee_in_sao)?;
            instructions = legs.instructions(self.settings.compute_unit_price)?;
        }

        let transaction = sign_transaction(
            &instructions,
            request.fee_payer,
            &[request.source],
            blockhash,
        );
        events::payment_prepared(&request.asset.mint, request.amount, fee_in_sao, blockchain_fee);

        Ok(PrepareTxResponse {
            transaction,
            fee_in_sao,
            blockchain_fee_in_sol_multiplied: blockchain_fee,
            source_account,
            recipient_account: recipient.address,
            fee_account: legs.fee_account.filter(|_| legs.fee_units > 0),
            recipient_created: recipient.created,
        })
    }

    /// 组装后立即经调度器提交。
    pub async fn send_assets_with_auto_derive(
        &self,
        request: &SendAssetsRequest<'_>,
        config: &SendAssetsConfig,
    ) -> PaymentResult<Signature> {
        let prepared = self.prepare_send_assets_tx(request, config).await?;
        self.dispatcher
            .send_transaction(Operation::SendTransaction, &prepared.transaction)
            .await
    }

    /// 向收款方关联账户铸造 `amount` 个整数单位。
    pub async fn issue_asset(
        &self,
        asset: &Asset,
        mint_authority: &Keypair,
        fee_payer: &Keypair,
        recipient: &Pubkey,
        amount: Decimal,
    ) -> PaymentResult<Signature> {
        ensure_positive(amount)?;
        let units = asset.to_base_units(amount)?;
        let destination = self
            .accounts
            .resolve_or_create(recipient, asset, fee_payer)
            .await?;
        let instructions = vec![token::mint_to(
            &asset.mint,
            &destination.address,
            &mint_authority.pubkey(),
            units,
        )?];
        self.submit(Operation::IssueAsset, instructions, fee_payer, &[mint_authority])
            .await
    }

    /// 本地生成新钱包并为其创建关联账户。
    pub async fn create_account_with_ata(
        &self,
        asset: &Asset,
        fee_payer: &Keypair,
    ) -> PaymentResult<CreatedAccount> {
        let keypair = self.dispatcher.generate_keypair()?;
        let (token_account, signature) = self
            .accounts
            .create(&keypair.pubkey(), asset, fee_payer)
            .await?;
        info!(
            target: "payments",
            owner = %keypair.pubkey(),
            token_account = %token_account,
            "新账户已创建"
        );
        Ok(CreatedAccount {
            keypair,
            token_account,
            signature,
        })
    }

    /// 整数单位余额；链上不存在的账户视为 0。
    pub async fn get_token_account_balance(&self, account: &Pubkey) -> PaymentResult<Decimal> {
        match self.dispatcher.get_token_account_balance(account).await {
            Ok(balance) => whole_units(balance),
            Err(err) if err.is_not_found() => {
                debug!(target: "payments", account = %account, "账户不存在，余额按 0 处理");
                Ok(Decimal::ZERO)
            }
            Err(err) => Err(err),
        }
    }

    pub async fn get_token_account_balance_with_auto_derive(
        &self,
        owner: &Pubkey,
        asset: &Asset,
    ) -> PaymentResult<Decimal> {
        match self.accounts.resolve(owner, asset).await {
            Ok(account) => self.get_token_account_balance(&account).await,
            Err(err) if err.is_account_not_created() => Ok(Decimal::ZERO),
            Err(err) => Err(err),
        }
    }

    /// 地址的签名历史及每笔交易详情（JSON）。
    pub async fn get_transactions(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> PaymentResult<Vec<TransactionRecord>> {
        let signatures = self
            .dispatcher
            .get_signatures_for_address(address, limit)
            .await?;
        let mut records = Vec::with_capacity(signatures.len());
        for info in signatures {
            let signature = Signature::from_str(&info.signature).map_err(|err| {
                PaymentError::Serialization(format!("非法交易签名 {}: {err}", info.signature))
            })?;
            let transaction = self.dispatcher.get_transaction(&signature).await?;
            records.push(TransactionRecord {
                signature: info,
                transaction,
            });
        }
        Ok(records)
    }

    pub async fn get_transactions_with_auto_derive(
        &self,
        owner: &Pubkey,
        asset: &Asset,
        limit: usize,
    ) -> PaymentResult<Vec<TransactionRecord>> {
        match self.accounts.resolve(owner, asset).await {
            Ok(account) => self.get_transactions(&account, limit).await,
            Err(err) if err.is_account_not_created() => Ok(Vec::new()),
            Err(err) => Err(err),
        }
    }

    /// 从 `owner` 转入质押金库。
    pub async fn stake(
        &self,
        asset: &Asset,
        owner: &Keypair,
        fee_payer: &Keypair,
        amount: Decimal,
    ) -> PaymentResult<Signature> {
        ensure_positive(amount)?;
        let vault_owner = self.vault_owner()?;
        let units = asset.to_base_units(amount)?;
        let source = self.accounts.resolve(&owner.pubkey(), asset).await?;
        let vault = self
            .accounts
            .resolve_or_create(&vault_owner, asset, fee_payer)
            .await?;
        let instructions = vec![token::transfer(&source, &vault.address, &owner.pubkey(), units)?];
        self.submit(Operation::Stake, instructions, fee_payer, &[owner])
            .await
    }

    /// 从质押金库转回 `owner`，需金库所有者签名。
    pub async fn unstake(
        &self,
        asset: &Asset,
        vault_authority: &Keypair,
        fee_payer: &Keypair,
        owner: &Pubkey,
        amount: Decimal,
    ) -> PaymentResult<Signature> {
        ensure_positive(amount)?;
        let vault_owner = self.vault_owner()?;
        if vault_authority.pubkey() != vault_owner {
            return Err(PaymentError::Validation(format!(
                "签名者 {} 不是质押金库所有者 {vault_owner}",
                vault_authority.pubkey()
            )));
        }
        let units = asset.to_base_units(amount)?;
        let vault = self.accounts.resolve(&vault_owner, asset).await?;
        let destination = self.accounts.resolve_or_create(owner, asset, fee_payer).await?;
        let instructions = vec![token::transfer(
            &vault,
            &destination.address,
            &vault_owner,
            units,
        )?];
        self.submit(Operation::Unstake, instructions, fee_payer, &[vault_authority])
            .await
    }

    /// 生产环境禁用；其余环境单次不超过 `max_airdrop_lamports`。
    pub async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> PaymentResult<Signature> {
        if self.settings.environment.is_production() {
            return Err(PaymentError::Validation("生产环境不支持空投".into()));
        }
        if lamports == 0 || lamports > self.settings.max_airdrop_lamports {
            return Err(PaymentError::Validation(format!(
                "空投数量必须位于 (0, {}] lamports，当前为 {lamports}",
                self.settings.max_airdrop_lamports
            )));
        }
        self.dispatcher.request_airdrop(recipient, lamports).await
    }

    pub fn serialize_transaction(&self, transaction: &Transaction) -> PaymentResult<String> {
        self.dispatcher
            .serialize_transaction(transaction)
            .map_err(into_serialization)
    }

    pub fn deserialize_transaction(&self, encoded: &str) -> PaymentResult<Transaction> {
        self.dispatcher
            .deserialize_transaction(encoded)
            .map_err(into_serialization)
    }

    pub fn parse_pubkey(&self, raw: &str) -> PaymentResult<Pubkey> {
        self.dispatcher.parse_pubkey(raw).map_err(into_validation)
    }

    pub fn validate_private_key(&self, raw: &str) -> PaymentResult<Pubkey> {
        self.dispatcher
            .validate_private_key(raw)
            .map_err(into_validation)
    }

    async fn estimate_fee(&self, message: &Message, config: &SendAssetsConfig) -> PaymentResult<u64> {
        match self.dispatcher.get_fee_for_message(message).await {
            Ok(fee) => Ok(fee),
            Err(err) if err.is_unsupported() && config.allow_fallback_to_default_fee => {
                debug!(
                    target: "payments",
                    default_fee = config.default_fee,
                    "节点不支持手续费估算，使用默认值"
                );
                Ok(config.default_fee)
            }
            Err(err) => Err(err),
        }
    }

    async fn submit(
        &self,
        operation: Operation,
        mut instructions: Vec<Instruction>,
        fee_payer: &Keypair,
        signers: &[&Keypair],
    ) -> PaymentResult<Signature> {
        maybe_insert_compute_unit_price(&mut instructions, self.settings.compute_unit_price);
        let blockhash: Hash = self.dispatcher.get_latest_blockhash().await?;
        let transaction = sign_transaction(&instructions, fee_payer, signers, blockhash);
        self.dispatcher.send_transaction(operation, &transaction).await
    }

    fn vault_owner(&self) -> PaymentResult<Pubkey> {
        self.settings
            .staking_vault_owner
            .ok_or_else(|| PaymentError::Configuration("未配置 staking.vault_owner".into()))
    }
}

fn ensure_positive(amount: Decimal) -> PaymentResult<()> {
    if amount <= Decimal::ZERO {
        return Err(PaymentError::Validation(format!("金额必须大于 0，当前为 {amount}")));
    }
    Ok(())
}

fn whole_units(balance: TokenBalance) -> PaymentResult<Decimal> {
    Decimal::try_from_i128_with_scale(i128::from(balance.amount), u32::from(balance.decimals))
        .map_err(|err| {
            PaymentError::Validation(format!("余额精度 {} 无法表示: {err}", balance.decimals))
        })
}

fn into_serialization(err: PaymentError) -> PaymentError {
    match err.chain_error() {
        Some(source) => PaymentError::Serialization(source.message().to_string()),
        None => err,
    }
}

fn into_validation(err: PaymentError) -> PaymentError {
    match err.chain_error() {
        Some(source) => PaymentError::Validation(source.message().to_string()),
        None => err,
    }
}
