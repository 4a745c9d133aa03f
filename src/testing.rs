//! 测试夹具：脚本化链节点、静态价格预言机与常用构造函数。

use std::collections::HashMap;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde_json::{Value, json};
use solana_sdk::account::Account;
use solana_sdk::hash::Hash;
use solana_sdk::message::Message;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signature};
use solana_sdk::transaction::Transaction;

use crate::chain::{ChainClient, ChainError, ChainResult, SignatureInfo, TokenBalance};
use crate::dispatcher::{Dispatcher, Provider};
use crate::rates::{ExchangeRateCache, OracleError, OracleIds, PriceOracle, SimplePrices};
use crate::registrar::MetricsRegistrar;
use crate::repository::{ExchangeRate, MemoryRepository, Repository};
use crate::types::AssetType;

pub(crate) const SCRIPTED_BLOCKHASH: Hash = Hash::new_from_array([7u8; 32]);
pub(crate) const DEFAULT_SCRIPTED_FEE: u64 = 5_000;
const SYSTEM_PROGRAM_ID: Pubkey = solana_sdk::pubkey!("11111111111111111111111111111111");

#[derive(Default)]
struct ChainState {
    accounts: HashMap<Pubkey, Account>,
    balances: HashMap<Pubkey, TokenBalance>,
    history: HashMap<Pubkey, Vec<SignatureInfo>>,
    transactions: HashMap<Signature, Value>,
    failure: Option<ChainError>,
    send_failure: Option<ChainError>,
    fee: Option<ChainResult<u64>>,
    local_failure: bool,
    sent: Vec<Transaction>,
    calls: Vec<&'static str>,
    airdrops: Vec<(Pubkey, u64)>,
}

/// 内存中的链节点：按脚本返回账户、余额与错误，并记录每次调用。
pub(crate) struct ScriptedChain {
    label: String,
    state: Mutex<ChainState>,
}

impl ScriptedChain {
    pub fn new(label: &str) -> Arc<Self> {
        Arc::new(Self {
            label: label.to_string(),
            state: Mutex::new(ChainState::default()),
        })
    }

    /// 注册一个 SPL Token 程序持有的账户。
    pub fn add_token_account(&self, address: Pubkey) {
        self.state
            .lock()
            .unwrap()
            .accounts
            .insert(address, Account::new(2_039_280, 165, &spl_token::ID));
    }

    /// 注册一个普通钱包账户（System Program 持有）。
    pub fn add_wallet(&self, address: Pubkey) {
        self.state.lock().unwrap().accounts.insert(
            address,
            Account::new(1_000_000_000, 0, &SYSTEM_PROGRAM_ID),
        );
    }

    pub fn set_balance(&self, account: Pubkey, amount: u64, decimals: u8) {
        self.state
            .lock()
            .unwrap()
            .balances
            .insert(account, TokenBalance { amount, decimals });
    }

    pub fn set_history(&self, address: Pubkey, signatures: Vec<Signature>) {
        let mut state = self.state.lock().unwrap();
        let infos = signatures
            .iter()
            .enumerate()
            .map(|(slot, signature)| SignatureInfo {
                signature: signature.to_string(),
                slot: slot as u64,
                err: None,
                memo: None,
                block_time: None,
            })
            .collect();
        for signature in signatures {
            state
                .transactions
                .insert(signature, json!({ "signature": signature.to_string() }));
        }
        state.history.insert(address, infos);
    }

    /// 之后的每次网络调用都返回该错误。
    pub fn fail_with(&self, error: ChainError) {
        self.state.lock().unwrap().failure = Some(error);
    }

    pub fn fail_sends(&self, error: ChainError) {
        self.state.lock().unwrap().send_failure = Some(error);
    }

    pub fn set_fee(&self, result: ChainResult<u64>) {
        self.state.lock().unwrap().fee = Some(result);
    }

    pub fn fail_local(&self) {
        self.state.lock().unwrap().local_failure = true;
    }

    pub fn sent(&self) -> Vec<Transaction> {
        self.state.lock().unwrap().sent.clone()
    }

    pub fn calls(&self) -> Vec<&'static str> {
        self.state.lock().unwrap().calls.clone()
    }

    pub fn airdrops(&self) -> Vec<(Pubkey, u64)> {
        self.state.lock().unwrap().airdrops.clone()
    }

    fn enter(&self, call: &'static str) -> ChainResult<std::sync::MutexGuard<'_, ChainState>> {
        let mut state = self.state.lock().unwrap();
        state.calls.push(call);
        match state.failure.clone() {
            Some(err) => Err(err),
            None => Ok(state),
        }
    }

    fn check_local(&self) -> ChainResult<()> {
        if self.state.lock().unwrap().local_failure {
            return Err(ChainError::local("scripted local failure"));
        }
        Ok(())
    }
}

#[async_trait]
impl ChainClient for ScriptedChain {
    fn label(&self) -> &str {
        &self.label
    }

    async fn get_account(&self, pubkey: &Pubkey) -> ChainResult<Option<Account>> {
        let state = self.enter("get_account")?;
        Ok(state.accounts.get(pubkey).cloned())
    }

    async fn get_token_account_balance(&self, account: &Pubkey) -> ChainResult<TokenBalance> {
        let state = self.enter("get_token_account_balance")?;
        state.balances.get(account).copied().ok_or_else(|| {
            ChainError::classify(format!(
                "RPC response error -32602: Invalid param: could not find account {account}"
            ))
        })
    }

    async fn get_latest_blockhash(&self) -> ChainResult<Hash> {
        self.enter("get_latest_blockhash")?;
        Ok(SCRIPTED_BLOCKHASH)
    }

    async fn get_fee_for_message(&self, _message: &Message) -> ChainResult<u64> {
        let state = self.enter("get_fee_for_message")?;
        state.fee.clone().unwrap_or(Ok(DEFAULT_SCRIPTED_FEE))
    }

    async fn send_transaction(&self, transaction: &Transaction) -> ChainResult<Signature> {
        let mut state = self.enter("send_transaction")?;
        if let Some(err) = state.send_failure.clone() {
            return Err(err);
        }

        let keys = &transaction.message.account_keys;
        for instruction in &transaction.message.instructions {
            let program = keys[instruction.program_id_index as usize];
            if program == spl_associated_token_account::ID {
                let ata = keys[instruction.accounts[1] as usize];
                state
                    .accounts
                    .insert(ata, Account::new(2_039_280, 165, &spl_token::ID));
            }
        }
        state.sent.push(transaction.clone());
        Ok(transaction.signatures.first().copied().unwrap_or_default())
    }

    async fn get_signatures_for_address(
        &self,
        address: &Pubkey,
        limit: usize,
    ) -> ChainResult<Vec<SignatureInfo>> {
        let state = self.enter("get_signatures_for_address")?;
        Ok(state
            .history
            .get(address)
            .map(|infos| infos.iter().take(limit).cloned().collect())
            .unwrap_or_default())
    }

    async fn get_transaction(&self, signature: &Signature) -> ChainResult<Value> {
        let state = self.enter("get_transaction")?;
        Ok(state
            .transactions
            .get(signature)
            .cloned()
            .unwrap_or(Value::Null))
    }

    async fn request_airdrop(&self, recipient: &Pubkey, lamports: u64) -> ChainResult<Signature> {
        let mut state = self.enter("request_airdrop")?;
        state.airdrops.push((*recipient, lamports));
        Ok(Signature::from([9u8; 64]))
    }

    fn parse_pubkey(&self, raw: &str) -> ChainResult<Pubkey> {
        self.check_local()?;
        Pubkey::from_str(raw.trim()).map_err(ChainError::local)
    }

    fn generate_keypair(&self) -> ChainResult<Keypair> {
        self.check_local()?;
        Ok(Keypair::new())
    }
}

/// 返回固定价格的预言机，可脚本化单次失败。
#[derive(Default)]
pub(crate) struct StaticOracle {
    prices: Mutex<SimplePrices>,
    fail_next: AtomicBool,
    requests: AtomicUsize,
}

impl StaticOracle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_prices(&self, prices: &[(&str, i64)]) {
        let mut table = self.prices.lock().unwrap();
        table.clear();
        for (id, price) in prices {
            let mut quotes = HashMap::new();
            quotes.insert("usd".to_string(), Decimal::from(*price));
            table.insert((*id).to_string(), quotes);
        }
    }

    pub fn fail_next(&self) {
        self.fail_next.store(true, Ordering::SeqCst);
    }

    pub fn requests(&self) -> usize {
        self.requests.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl PriceOracle for StaticOracle {
    async fn simple_price(
        &self,
        ids: &[String],
        _currencies: &[String],
    ) -> Result<SimplePrices, OracleError> {
        self.requests.fetch_add(1, Ordering::SeqCst);
        if self.fail_next.swap(false, Ordering::SeqCst) {
            return Err(OracleError::Schema("scripted failure".into()));
        }
        let table = self.prices.lock().unwrap();
        Ok(ids
            .iter()
            .filter_map(|id| table.get(id).map(|quotes| (id.clone(), quotes.clone())))
            .collect())
    }
}

pub(crate) fn default_oracle_ids() -> OracleIds {
    OracleIds {
        sol: "solana".into(),
        sao: "sao-network".into(),
        ar: "arweave".into(),
    }
}

/// 预先写入三种资产价格的汇率缓存。
pub(crate) async fn rate_cache(sol: Decimal, sao: Decimal, ar: Decimal) -> Arc<ExchangeRateCache> {
    let repository = Arc::new(MemoryRepository::new());
    for (asset, price) in [(AssetType::Sol, sol), (AssetType::Sao, sao), (AssetType::Ar, ar)] {
        repository
            .upsert_exchange_rate(ExchangeRate::new(asset, price))
            .await
            .unwrap();
    }
    Arc::new(ExchangeRateCache::new(
        repository,
        Arc::new(StaticOracle::new()),
        default_oracle_ids(),
    ))
}

/// 按顺序包装脚本节点，返回调度器与其指标存储。
pub(crate) fn dispatcher_over(chains: &[Arc<ScriptedChain>]) -> (Arc<Dispatcher>, Arc<MemoryRepository>) {
    let repository = Arc::new(MemoryRepository::new());
    let providers = chains
        .iter()
        .map(|chain| Provider::new(chain.clone() as Arc<dyn ChainClient>))
        .collect();
    let dispatcher = Dispatcher::new(providers, MetricsRegistrar::new(repository.clone())).unwrap();
    (Arc::new(dispatcher), repository)
}

/// 解析 SPL Token `Transfer` 指令的金额。
pub(crate) fn decode_transfer_amount(data: &[u8]) -> Option<u64> {
    match data {
        [3, rest @ ..] if rest.len() == 8 => {
            let mut bytes = [0u8; 8];
            bytes.copy_from_slice(rest);
            Some(u64::from_le_bytes(bytes))
        }
        _ => None,
    }
}
