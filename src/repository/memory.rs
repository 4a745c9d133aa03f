use std::sync::atomic::{AtomicU64, Ordering};

use async_trait::async_trait;
use dashmap::DashMap;

use crate::types::AssetType;

use super::{
    ExchangeRate, MetricCounter, ProviderErrorRecord, ProviderMetric, Repository, RepositoryError,
    RepositoryResult,
};

#[derive(Default)]
struct MetricCells {
    success_calls: AtomicU64,
    not_available_errors: AtomicU64,
    other_errors: AtomicU64,
}

impl MetricCells {
    fn cell(&self, counter: MetricCounter) -> &AtomicU64 {
        match counter {
            MetricCounter::SuccessCalls => &self.success_calls,
            MetricCounter::NotAvailableErrors => &self.not_available_errors,
            MetricCounter::OtherErrors => &self.other_errors,
        }
    }

    fn snapshot(&self, provider: &str) -> ProviderMetric {
        ProviderMetric {
            provider: provider.to_string(),
            success_calls: self.success_calls.load(Ordering::Relaxed),
            not_available_errors: self.not_available_errors.load(Ordering::Relaxed),
            other_errors: self.other_errors.load(Ordering::Relaxed),
        }
    }
}

/// 进程内存储，基于 DashMap + 原子计数。
#[derive(Default)]
pub struct MemoryRepository {
    rates: DashMap<AssetType, ExchangeRate>,
    metrics: DashMap<String, MetricCells>,
    errors: DashMap<(String, String), AtomicU64>,
}

impl MemoryRepository {
    pub fn new() -> Self {
        Self::default()
    }
}

fn ensure_provider(provider: &str) -> RepositoryResult<()> {
    if provider.trim().is_empty() {
        return Err(RepositoryError::Invalid("provider 名称不能为空".into()));
    }
    Ok(())
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn exchange_rate(&self, asset: AssetType) -> RepositoryResult<Option<ExchangeRate>> {
        Ok(self.rates.get(&asset).map(|entry| entry.value().clone()))
    }

    async fn upsert_exchange_rate(&self, rate: ExchangeRate) -> RepositoryResult<bool> {
        if rate.usd_price.is_sign_negative() {
            return Err(RepositoryError::Invalid(format!(
                "{} 汇率不能为负数: {}",
                rate.asset, rate.usd_price
            )));
        }
        if rate.usd_price.is_zero() {
            return Ok(false);
        }
        self.rates.insert(rate.asset, rate);
        Ok(true)
    }

    async fn provider_metric(&self, provider: &str) -> RepositoryResult<Option<ProviderMetric>> {
        Ok(self
            .metrics
            .get(provider)
            .map(|cells| cells.snapshot(provider)))
    }

    async fn increment_provider_metric(
        &self,
        provider: &str,
        counter: MetricCounter,
    ) -> RepositoryResult<()> {
        ensure_provider(provider)?;
        let cells = self.metrics.entry(provider.to_string()).or_default();
        cells.cell(counter).fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn provider_error(
        &self,
        provider: &str,
        message: &str,
    ) -> RepositoryResult<Option<ProviderErrorRecord>> {
        let key = (provider.to_string(), message.to_string());
        Ok(self.errors.get(&key).map(|count| ProviderErrorRecord {
            provider: provider.to_string(),
            message: message.to_string(),
            occurrences: count.load(Ordering::Relaxed),
        }))
    }

    async fn increment_provider_error(
        &self,
        provider: &str,
        message: &str,
    ) -> RepositoryResult<()> {
        ensure_provider(provider)?;
        let counter = self
            .errors
            .entry((provider.to_string(), message.to_string()))
            .or_default();
        counter.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    async fn provider_errors(&self, provider: &str) -> RepositoryResult<Vec<ProviderErrorRecord>> {
        let mut records: Vec<ProviderErrorRecord> = self
            .errors
            .iter()
            .filter(|entry| entry.key().0 == provider)
            .map(|entry| ProviderErrorRecord {
                provider: entry.key().0.clone(),
                message: entry.key().1.clone(),
                occurrences: entry.value().load(Ordering::Relaxed),
            })
            .collect();
        records.sort_by(|a, b| {
            b.occurrences
                .cmp(&a.occurrences)
                .then_with(|| a.message.cmp(&b.message))
        });
        Ok(records)
    }
}
