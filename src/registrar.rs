//! 节点可靠性记录：每次网络调用计一次结果，失败时额外登记原始错误文本。

use std::sync::Arc;

use tracing::warn;

use crate::monitoring::events;
use crate::repository::{MetricCounter, ProviderMetric, Repository, RepositoryResult};

/// 错误目录中单条报文的最大长度（字符数）。
pub const MAX_ERROR_MESSAGE_CHARS: usize = 512;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallOutcome {
    Success,
    NotAvailable,
    Other,
}

impl CallOutcome {
    pub fn counter(&self) -> MetricCounter {
        match self {
            CallOutcome::Success => MetricCounter::SuccessCalls,
            CallOutcome::NotAvailable => MetricCounter::NotAvailableErrors,
            CallOutcome::Other => MetricCounter::OtherErrors,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            CallOutcome::Success => "success",
            CallOutcome::NotAvailable => "not_available",
            CallOutcome::Other => "other_error",
        }
    }
}

#[derive(Clone)]
pub struct MetricsRegistrar {
    repository: Arc<dyn Repository>,
}

impl MetricsRegistrar {
    pub fn new(repository: Arc<dyn Repository>) -> Self {
        Self { repository }
    }

    /// 尽力而为：存储失败只记录日志，不向调用方传播。
    pub async fn record(&self, provider: &str, outcome: CallOutcome, error: Option<&str>) {
        events::provider_call(provider, outcome);

        if let Err(err) = self
            .repository
            .increment_provider_metric(provider, outcome.counter())
            .await
        {
            warn!(
                target: "metrics",
                provider,
                counter = outcome.counter().as_str(),
                error = %err,
                "节点调用计数写入失败"
            );
        }

        let Some(message) = error else {
            return;
        };
        let message = truncate_message(message);
        if let Err(err) = self
            .repository
            .increment_provider_error(provider, &message)
            .await
        {
            warn!(
                target: "metrics",
                provider,
                error = %err,
                "节点错误目录写入失败"
            );
        }
    }

    pub async fn provider_metric(&self, provider: &str) -> RepositoryResult<ProviderMetric> {
        Ok(self
            .repository
            .provider_metric(provider)
            .await?
            .unwrap_or_else(|| ProviderMetric {
                provider: provider.to_string(),
                ..ProviderMetric::default()
            }))
    }
}

fn truncate_message(message: &str) -> String {
    match message.char_indices().nth(MAX_ERROR_MESSAGE_CHARS) {
        Some((index, _)) => message[..index].to_string(),
        None => message.to_string(),
    }
}
