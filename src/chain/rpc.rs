use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use serde_json::Value;
use solana_client::nonblocking::rpc_client::RpcClient;
use solana_client::rpc_client::GetConfirmedSignaturesForAddress2Config;
use solana_client::rpc_config::RpcTransactionConfig;
use solana_commitment_config::CommitmentConfig;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use solana_sdk::transaction::Transaction;
use tracing::debug;
use url::Url;

use super::error::{ChainError, ChainResult};
use super::{ChainClient, SignatureInfo, TokenBalance};

/// 基于 `solana-client` 非阻塞客户端的单节点实现。
#[derive(Clone)]
pub struct RpcChainClient {
    label: String,
    client: Arc<RpcClient>,
}

impl fmt::Debug for RpcChainClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RpcChainClient")
            .field("label", &self.label)
            .finish()
    }
}

impl RpcChainClient {
    pub fn new(url: &str, timeout: Duration) -> Self {
        let client = RpcClient::new_with_timeout_and_commitment(
            url.to_string(),
            timeout,
            CommitmentConfig::confirmed(),
        );
        Self {
            label: endpoint_label(url),
            client: Arc::new(client),
        }
    }
}

/// 仅保留 host 与端口，避免把 URL 中的 API key 写进指标。
pub(crate) fn endpoint_label(url: &str) -> String {
    match Url::parse(url) {
        Ok(parsed) => match (parsed.host_str(), parsed.port()) {
            (Some(host), Some(port)) => format!("{host}:{port}"),
            (Some(host), None) => host.to_string(),
            _ => url.to_string(),
        },
        Err(_) => url.to_string(),
    }
}

#[async_trait]
impl ChainClient for RpcChainClient {
    fn label(&self) -> &str {
        &self.label
    }

    async fn get_account(&self, pubkey: &Pubkey) -> ChainResult<Option<Account>> {
        let response = self
            .client
            .get_account_with_commitment(pubkey, self.client.commitment())
            .await?;
        Ok(response.value)
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> ChainResult<TokenBalance> {
        let ui_amount = self.client.get_token_account_balance(account).await?;
        let amount = ui_amount.amount.parse::<u64>().map_err(|err| {
            ChainError::Other(format!("余额字段无法解析 {}: {err}", ui_amount.amount))
        })?;
        Ok(TokenBalance {
            amount,
            decimals: ui_amount.decimals,
        })
    }

    async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        Ok(self.client.get_latest_blockhash().await?)
    }

    async fn get_fee_for_message(&self, message: &Message) -> ChainResult<u64> {
        Ok(self.client.get_fee_for_message(message).await?)
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature> {
        let signature = self.client.send_and_confirm_transaction(transaction).await?;
        debug!(
            target: "chain::rpc",
            endpoint = %self.label,
            %signature,
            "transaction confirmed"
        );
        Ok(signature)
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> ChainResult<Vec<SignatureInfo>> {
        let config = GetConfirmedSignaturesForAddress2Config {
            limit: Some(limit),
            ..GetConfirmedSignaturesForAddress2Config::default()
        };
        let statuses = self
            .client
            .get_signatures_for_address_with_config(address, config)
            .await?;
        Ok(statuses
            .into_iter()
            .map(|status| SignatureInfo {
                signature: status.signature,
                slot: status.slot,
                err: status.err.map(|err| format!("{err:?}")),
                memo: status.memo,
                block_time: status.block_time,
            })
            .collect())
    }

    async fn get_transaction(&self, signature: &Signature) -> ChainResult<Value> {
        let config = RpcTransactionConfig {
            max_supported_transaction_version: Some(0),
            ..RpcTransactionConfig::default()
        };
        let transaction = self
            .client
            .get_transaction_with_config(signature, config)
            .await?;
        serde_json::to_value(&transaction)
            .map_err(|err| ChainError::Other(format!("交易详情序列化失败: {err}")))
    }

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> ChainResult<Signature> {
        Ok(self.client.request_airdrop(recipient, lamports).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn label_strips_path_and_query() {
        assert_eq!(
            endpoint_label("https://mainnet.helius-rpc.com/?api-key=secret"),
            "mainnet.helius-rpc.com"
        );
        assert_eq!(endpoint_label("http://127.0.0.1:8899"), "127.0.0.1:8899");
        assert_eq!(endpoint_label("not a url"), "not a url");
    }
}
