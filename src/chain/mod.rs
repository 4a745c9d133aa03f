//! 单节点链客户端抽象：每个实现对应一个 RPC 节点，网络错误统一归类为 [`ChainError`]。

pub mod error;
mod local;
mod rpc;

use std::str::FromStr;

use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature, Signer};
use solana_sdk::transaction::Transaction;

pub use error::{ChainError, ChainResult, SERVICE_UNAVAILABLE_SIGNATURE};
pub use local::{decode_transaction, encode_transaction};
pub use rpc::RpcChainClient;

use crate::wallet::parse_keypair_string;

/// SPL Token 账户余额（最小单位）。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TokenBalance {
    pub amount: u64,
    pub decimals: u8,
}

/// 地址相关交易的签名摘要。
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SignatureInfo {
    pub signature: String,
    pub slot: u64,
    pub err: Option<String>,
    pub memo: Option<String>,
    pub block_time: Option<i64>,
}

#[async_trait]
pub trait ChainClient: Send + Sync {
    /// 用作指标维度的节点标签。
    fn label(&self) -> &str;

    async fn get_account(&self, pubkey: &Pubkey) -> ChainResult<Option<Account>>;

    async fn get_token_account_balance(&self, account: &Pubkey) -> ChainResult<TokenBalance>;

    async fn get_latest_blockhash(&self) -> ChainResult<Hash>;

    async fn get_fee_for_message(&self, message: &Message) -> ChainResult<u64>;

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature>;

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> ChainResult<Vec<SignatureInfo>>;

    async fn get_transaction(&self, signature: &Signature) -> ChainResult<Value>;

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> ChainResult<Signature>;

    // 以下为纯本地操作，不经过网络。

    fn parse_pubkey(&self, raw: &str) -> ChainResult<Pubkey> {
        Pubkey::from_str(raw.trim()).map_err(|err| ChainError::local(format!("非法公钥 {raw}: {err}")))
    }

    fn generate_keypair(&self) -> ChainResult<Keypair> {
        Ok(Keypair::new())
    }

    fn serialize_transaction(&self, transaction: &Transaction) -> ChainResult<String> {
        encode_transaction(transaction)
    }

    fn deserialize_transaction(&self, encoded: &str) -> ChainResult<Transaction> {
        decode_transaction(encoded)
    }

    fn validate_private_key(&self, raw: &str) -> ChainResult<Pubkey> {
        parse_keypair_string(raw)
            .map(|keypair| keypair.pubkey())
            .map_err(|err| ChainError::local(format!("私钥格式非法: {err}")))
    }
}
