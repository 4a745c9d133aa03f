use std::sync::Arc;
use std::time::Duration;

use rust_decimal::Decimal;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::error::{PaymentError, PaymentResult};
use crate::monitoring::events;
use crate::repository::{ExchangeRate, Repository};
use crate::types::AssetType;

use super::oracle::PriceOracle;

pub const QUOTE_CURRENCY: &str = "usd";

/// 每种资产在预言机中的 id。
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OracleIds {
    pub sol: String,
    pub sao: String,
    pub ar: String,
}

impl OracleIds {
    pub fn id_for(&self, asset: AssetType) -> &str {
        match asset {
            AssetType::Sol => &self.sol,
            AssetType::Sao => &self.sao,
            AssetType::Ar => &self.ar,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncReport {
    pub updated: Vec<AssetType>,
    pub skipped: Vec<AssetType>,
}

pub struct ExchangeRateCache {
    repository: Arc<dyn Repository>,
    oracle: Arc<dyn PriceOracle>,
    ids: OracleIds,
}

impl ExchangeRateCache {
    pub fn new(
        repository: Arc<dyn Repository>,
        oracle: Arc<dyn PriceOracle>,
        ids: OracleIds,
    ) -> Self {
        Self {
            repository,
            oracle,
            ids,
        }
    }

    /// 最近一次成功同步的 USD 价格。
    pub async fn rate(&self, asset: AssetType) -> PaymentResult<Decimal> {
        match self.repository.exchange_rate(asset).await? {
            Some(row) if !row.usd_price.is_zero() => Ok(row.usd_price),
            _ => Err(PaymentError::RateUnavailable(asset)),
        }
    }

    /// 单次批量拉取；价格为零或缺失的资产跳过，保留上一轮数据。
    pub async fn sync_once(&self) -> PaymentResult<SyncReport> {
        let ids: Vec<String> = AssetType::ALL
            .iter()
            .map(|asset| self.ids.id_for(*asset).to_string())
            .collect();
        let prices = self
            .oracle
            .simple_price(&ids, &[QUOTE_CURRENCY.to_string()])
            .await?;

        let mut report = SyncReport::default();
        for asset in AssetType::ALL {
            let price = prices
                .get(self.ids.id_for(asset))
                .and_then(|quotes| quotes.get(QUOTE_CURRENCY))
                .copied()
                .filter(|price| *price > Decimal::ZERO);

            let Some(price) = price else {
                debug!(target: "rates", asset = %asset, "预言机本轮无数据，跳过");
                report.skipped.push(asset);
                continue;
            };

            if self
                .repository
                .upsert_exchange_rate(ExchangeRate::new(asset, price))
                .await?
            {
                report.updated.push(asset);
            } else {
                report.skipped.push(asset);
            }
        }

        events::rate_sync(&report.updated, &report.skipped);
        Ok(report)
    }

    /// 后台定时同步，首轮立即执行；单轮失败只记录日志。
    pub fn spawn(self: Arc<Self>, period: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            info!(
                target: "rates",
                period_secs = period.as_secs(),
                "exchange rate sync loop started"
            );
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                if let Err(err) = self.sync_once().await {
                    events::rate_sync_failed(&err.to_string());
                }
            }
        })
    }
}
