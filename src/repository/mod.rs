//! 持久化边界：汇率表、节点调用计数与节点错误目录。

mod memory;

use async_trait::async_trait;
use rust_decimal::Decimal;
use serde::Serialize;
use thiserror::Error;
use time::OffsetDateTime;

use crate::types::AssetType;

pub use memory::MemoryRepository;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("存储后端错误: {0}")]
    Backend(String),
    #[error("非法记录: {0}")]
    Invalid(String),
}

pub type RepositoryResult<T> = Result<T, RepositoryError>;

#[derive(Debug, Clone, PartialEq)]
pub struct ExchangeRate {
    pub asset: AssetType,
    pub usd_price: Decimal,
    pub updated_at: OffsetDateTime,
}

impl ExchangeRate {
    pub fn new(asset: AssetType, usd_price: Decimal) -> Self {
        Self {
            asset,
            usd_price,
            updated_at: OffsetDateTime::now_utc(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MetricCounter {
    SuccessCalls,
    NotAvailableErrors,
    OtherErrors,
}

impl MetricCounter {
    pub fn as_str(&self) -> &'static str {
        match self {
            MetricCounter::SuccessCalls => "success_calls",
            MetricCounter::NotAvailableErrors => "not_available_errors",
            MetricCounter::OtherErrors => "other_errors",
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ProviderMetric {
    pub provider: String,
    pub success_calls: u64,
    pub not_available_errors: u64,
    pub other_errors: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ProviderErrorRecord {
    pub provider: String,
    pub message: String,
    pub occurrences: u64,
}

/// 计数接口均为原子自增，SQL 后端应实现为 `SET counter = counter + 1`。
#[async_trait]
pub trait Repository: Send + Sync {
    async fn exchange_rate(&self, asset: AssetType) -> RepositoryResult<Option<ExchangeRate>>;

    /// 写入汇率；价格为零时保留旧值并返回 `false`。
    async fn upsert_exchange_rate(&self, rate: ExchangeRate) -> RepositoryResult<bool>;

    async fn provider_metric(&self, provider: &str) -> RepositoryResult<Option<ProviderMetric>>;

    async fn increment_provider_metric(
        &self,
        provider: &str,
        counter: MetricCounter,
    ) -> RepositoryResult<()>;

    async fn provider_error(
        &self,
        provider: &str,
        message: &str,
    ) -> RepositoryResult<Option<ProviderErrorRecord>>;

    async fn increment_provider_error(&self, provider: &str, message: &str)
    -> RepositoryResult<()>;

    async fn provider_errors(&self, provider: &str) -> RepositoryResult<Vec<ProviderErrorRecord>>;
}
