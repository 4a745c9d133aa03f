use rust_decimal::Decimal;
use solana_sdk::pubkey::Pubkey;
use thiserror::Error;

use crate::chain::ChainError;
use crate::rates::OracleError;
use crate::repository::RepositoryError;
use crate::types::AssetType;

#[derive(Debug, Error)]
pub enum PaymentError {
    #[error("参数校验失败: {0}")]
    Validation(String),
    #[error("关联账户尚未创建: owner={owner} mint={mint}")]
    AccountNotCreated { owner: Pubkey, mint: Pubkey },
    #[error("关联账户创建失败: {0}")]
    AccountCreationFailed(String),
    #[error("{operation} 在节点 {provider} 失败: {source}")]
    Chain {
        provider: String,
        operation: &'static str,
        #[source]
        source: ChainError,
    },
    #[error("{operation} 的全部 {attempts} 个 RPC 节点均不可用")]
    AllProvidersExhausted {
        operation: &'static str,
        attempts: usize,
    },
    #[error("暂无 {0} 汇率数据")]
    RateUnavailable(AssetType),
    #[error("手续费 {fee} 不低于转账金额 {amount}")]
    InsufficientAmount { fee: Decimal, amount: Decimal },
    #[error("配置缺失或非法: {0}")]
    Configuration(String),
    #[error("序列化失败: {0}")]
    Serialization(String),
    #[error("存储访问失败: {0}")]
    Repository(#[from] RepositoryError),
    #[error("价格预言机请求失败: {0}")]
    Oracle(#[from] OracleError),
}

impl PaymentError {
    /// 节点返回的底层链错误（仅 `Chain` 变体）。
    pub fn chain_error(&self) -> Option<&ChainError> {
        match self {
            PaymentError::Chain { source, .. } => Some(source),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.chain_error().is_some_and(ChainError::is_not_found)
    }

    pub fn is_unsupported(&self) -> bool {
        self.chain_error().is_some_and(ChainError::is_unsupported)
    }

    pub fn is_account_not_created(&self) -> bool {
        matches!(self, PaymentError::AccountNotCreated { .. })
    }
}

pub type PaymentResult<T> = Result<T, PaymentError>;
