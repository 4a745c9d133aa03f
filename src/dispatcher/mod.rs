//! 多节点调度：按固定顺序逐个尝试节点，只有节点不可用时才切换。

mod operation;

use std::future::Future;
use std::sync::Arc;
use std::time::Instant;

use serde_json::Value;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;
use tracing::debug;

use crate::chain::{ChainClient, ChainError, ChainResult, SignatureInfo, TokenBalance};
use crate::error::{PaymentError, PaymentResult};
use crate::monitoring::events;
use crate::registrar::{CallOutcome, MetricsRegistrar};

pub use operation::Operation;

/// 调度列表中的单个节点，标签即指标维度。
#[derive(Clone)]
pub struct Provider {
    label: String,
    client: Arc<dyn ChainClient>,
}

impl Provider {
    pub fn new(client: Arc<dyn ChainClient>) -> Self {
        Self {
            label: client.label().to_string(),
            client,
        }
    }

    pub fn with_label(label: impl Into<String>, client: Arc<dyn ChainClient>) -> Self {
        Self {
            label: label.into(),
            client,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }
}

pub struct Dispatcher {
    providers: Vec<Provider>,
    registrar: MetricsRegistrar,
}

impl Dispatcher {
    pub fn new(providers: Vec<Provider>, registrar: MetricsRegistrar) -> PaymentResult<Self> {
        if providers.is_empty() {
            return Err(PaymentError::Configuration(
                "至少需要配置一个 RPC 节点 (global.rpc_urls)".into(),
            ));
        }
        Ok(Self {
            providers,
            registrar,
        })
    }

    pub fn providers(&self) -> &[Provider] {
        &self.providers
    }

    pub fn registrar(&self) -> &MetricsRegistrar {
        &self.registrar
    }

    /// 顺序执行网络操作：成功立即返回；不可用则记一次并尝试下一个节点；
    /// 其余错误直接返回，不再尝试后续节点。
    pub async fn dispatch<T, F, Fut>(&self, operation: Operation, call: F) -> PaymentResult<T>
    where
        F: Fn(Arc<dyn ChainClient>) -> Fut,
        Fut: Future<Output = ChainResult<T>>,
    {
        let name = operation.as_str();
        if operation.is_local() {
            return Err(PaymentError::Configuration(format!(
                "本地操作 {name} 应经由 dispatch_local 执行"
            )));
        }
        for (index, provider) in self.providers.iter().enumerate() {
            let started = Instant::now();
            let result = call(provider.client.clone()).await;
            events::dispatch_finished(name, &provider.label, started.elapsed(), result.is_ok());

            match result {
                Ok(value) => {
                    self.registrar
                        .record(&provider.label, CallOutcome::Success, None)
                        .await;
                    return Ok(value);
                }
                Err(err) if err.is_unavailable() => {
                    self.registrar
                        .record(
                            &provider.label,
                            CallOutcome::NotAvailable,
                            Some(err.message()),
                        )
                        .await;
                    events::provider_failover(name, &provider.label, index + 1, err.message());
                }
                Err(err) => {
                    self.registrar
                        .record(&provider.label, CallOutcome::Other, Some(err.message()))
                        .await;
                    return Err(PaymentError::Chain {
                        provider: provider.label.clone(),
                        operation: name,
                        source: err,
                    });
                }
            }
        }

        events::dispatch_exhausted(name, self.providers.len());
        Err(PaymentError::AllProvidersExhausted {
            operation: name,
            attempts: self.providers.len(),
        })
    }

    /// 本地操作：节点仅为实现的命名空间，任意错误都切换，不记指标。
    pub fn dispatch_local<T, F>(&self, operation: Operation, call: F) -> PaymentResult<T>
    where
        F: Fn(&dyn ChainClient) -> ChainResult<T>,
    {
        let name = operation.as_str();
        if !operation.is_local() {
            return Err(PaymentError::Configuration(format!(
                "网络操作 {name} 应经由 dispatch 执行"
            )));
        }
        let mut last_failure: Option<(String, ChainError)> = None;
        for provider in &self.providers {
            match call(provider.client.as_ref()) {
                Ok(value) => return Ok(value),
                Err(err) => {
                    debug!(
                        target: "dispatcher",
                        operation = name,
                        provider = %provider.label,
                        error = %err,
                        "本地操作失败，尝试下一个实现"
                    );
                    last_failure = Some((provider.label.clone(), err));
                }
            }
        }

        match last_failure {
            Some((provider, source)) => Err(PaymentError::Chain {
                provider,
                operation: name,
                source,
            }),
            None => Err(PaymentError::AllProvidersExhausted {
                operation: name,
                attempts: 0,
            }),
        }
    }

    pub async fn get_account(&self, pubkey: &Pubkey) -> PaymentResult<Option<Account>> {
        let pubkey = *pubkey;
        self.dispatch(Operation::GetAccount, move |client| async move {
            client.get_account(&pubkey).await
        })
        .await
    }

    pub async fn get_token_account_balance(&self, account: &Pubkey) -> PaymentResult<TokenBalance> {
        let account = *account;
        self.dispatch(Operation::GetTokenAccountBalance, move |client| async move {
            client.get_token_account_balance(&account).await
        })
        .await
    }

    pub async fn get_latest_blockhash(&self) -> PaymentResult<Hash> {
        self.dispatch(Operation::GetLatestBlockhash, |client| async move {
            client.get_latest_blockhash().await
        })
        .await
    }

    pub async fn get_fee_for_message(&self, message: &Message) -> PaymentResult<u64> {
        self.dispatch(Operation::GetFeeForMessage, move |client| async move {
            client.get_fee_for_message(message).await
        })
        .await
    }

    /// `operation` 标明提交的是哪类业务交易，仅用于日志与指标维度。
    pub async fn send_transaction(
        &self,
        operation: Operation,
        transaction: &Transaction,
    ) -> PaymentResult<Signature> {
        let signature = self
            .dispatch(operation, move |client| async move {
                client.send_transaction(transaction).await
            })
            .await?;
        events::transaction_submitted(operation.as_str(), &signature);
        Ok(signature)
    }

    pub async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> PaymentResult<Vec<SignatureInfo>> {
        let address = *address;
        self.dispatch(Operation::GetSignatures, move |client| async move {
            client.get_signatures_for_address(&address, limit).await
        })
        .await
    }

    pub async fn get_transaction(&self, signature: &Signature) -> PaymentResult<Value> {
        let signature = *signature;
        self.dispatch(Operation::GetTransaction, move |client| async move {
            client.get_transaction(&signature).await
        })
        .await
    }

    pub async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> PaymentResult<Signature> {
        let recipient = *recipient;
        self.dispatch(Operation::RequestAirdrop, move |client| async move {
            client.request_airdrop(&recipient, lamports).await
        })
        .await
    }

    pub fn parse_pubkey(&self, raw: &str) -> PaymentResult<Pubkey> {
        self.dispatch_local(Operation::ParsePubkey, |client| client.parse_pubkey(raw))
    }

    pub fn generate_keypair(&self) -> PaymentResult<Keypair> {
        self.dispatch_local(Operation::GenerateKeypair, |client| client.generate_keypair())
    }

    pub fn serialize_transaction(&self, transaction: &Transaction) -> PaymentResult<String> {
        self.dispatch_local(Operation::SerializeTransaction, |client| {
            client.serialize_transaction(transaction)
        })
    }

    pub fn deserialize_transaction(&self, encoded: &str) -> PaymentResult<Transaction> {
        self.dispatch_local(Operation::DeserializeTransaction, |client| {
            client.deserialize_transaction(encoded)
        })
    }

    pub fn validate_private_key(&self, raw: &str) -> PaymentResult<Pubkey> {
        self.dispatch_local(Operation::ValidatePrivateKey, |client| {
            client.validate_private_key(raw)
        })
    }
}
