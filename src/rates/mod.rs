//! 汇率缓存：定时从价格预言机同步 USD 价格，供手续费折算读取。

mod cache;
pub mod oracle;

pub use cache::{ExchangeRateCache, OracleIds, QUOTE_CURRENCY, SyncReport};
pub use oracle::{CoinGeckoOracle, OracleError, PriceOracle, SimplePrices};
