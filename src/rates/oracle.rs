use std::collections::HashMap;
use std::fmt;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rust_decimal::Decimal;
use rust_decimal::prelude::FromPrimitive;
use serde_json::Value;
use thiserror::Error;
use tracing::trace;

#[derive(Debug, Error)]
pub enum OracleError {
    #[error("failed to call price oracle: {0}")]
    Http(#[from] reqwest::Error),
    #[error("price oracle {endpoint} failed with status {status}: {body}")]
    ApiStatus {
        endpoint: String,
        status: StatusCode,
        body: String,
    },
    #[error("failed to parse oracle response: {0}")]
    Json(#[from] serde_json::Error),
    #[error("unexpected oracle response schema: {0}")]
    Schema(String),
}

/// `id → currency → price`；缺失或为 null 的条目不会出现在结果里。
pub type SimplePrices = HashMap<String, HashMap<String, Decimal>>;

#[async_trait]
pub trait PriceOracle: Send + Sync {
    async fn simple_price(
        &self,
        ids: &[String],
        currencies: &[String],
    ) -> Result<SimplePrices, OracleError>;
}

/// CoinGecko 兼容的 `/simple/price` 接口。
#[derive(Clone)]
pub struct CoinGeckoOracle {
    base_url: String,
    api_key: Option<String>,
    client: reqwest::Client,
}

impl fmt::Debug for CoinGeckoOracle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CoinGeckoOracle")
            .field("base_url", &self.base_url)
            .field("api_key", &self.api_key.as_ref().map(|_| "***"))
            .finish()
    }
}

impl CoinGeckoOracle {
    pub fn new(
        base_url: impl Into<String>,
        api_key: Option<String>,
        timeout: Duration,
    ) -> Result<Self, OracleError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            api_key: api_key.filter(|key| !key.trim().is_empty()),
            client,
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/simple/price", self.base_url)
    }
}

#[async_trait]
impl PriceOracle for CoinGeckoOracle {
    async fn simple_price(
        &self,
        ids: &[String],
        currencies: &[String],
    ) -> Result<SimplePrices, OracleError> {
        let endpoint = self.endpoint();
        let mut request = self.client.get(&endpoint).query(&[
            ("ids", ids.join(",")),
            ("vs_currencies", currencies.join(",")),
        ]);
        if let Some(key) = &self.api_key {
            request = request.header("x-cg-pro-api-key", key);
        }

        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(OracleError::ApiStatus {
                endpoint,
                status,
                body,
            });
        }

        trace!(target: "rates::oracle", body = %body, "oracle response received");
        let payload: Value = serde_json::from_str(&body)?;
        parse_simple_prices(&payload)
    }
}

pub(crate) fn parse_simple_prices(payload: &Value) -> Result<SimplePrices, OracleError> {
    let entries = payload
        .as_object()
        .ok_or_else(|| OracleError::Schema("response must be an object".into()))?;

    let mut prices = SimplePrices::with_capacity(entries.len());
    for (id, quotes) in entries {
        let Some(quotes) = quotes.as_object() else {
            continue;
        };
        let mut by_currency = HashMap::with_capacity(quotes.len());
        for (currency, value) in quotes {
            if let Some(price) = decimal_from_value(value) {
                by_currency.insert(currency.to_ascii_lowercase(), price);
            }
        }
        prices.insert(id.clone(), by_currency);
    }
    Ok(prices)
}

fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(number) => number
            .as_i64()
            .map(Decimal::from)
            .or_else(|| number.as_f64().and_then(Decimal::from_f64)),
        Value::String(text) => text.trim().parse::<Decimal>().ok(),
        _ => None,
    }
}
