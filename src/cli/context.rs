use std::fs;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::Arc;

use anyhow::{Context, Result, anyhow};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Keypair;
use time::macros::format_description;
use tracing::info;
use tracing_subscriber::fmt::time::UtcTime;
use tracing_subscriber::{EnvFilter, fmt};

use crate::chain::{ChainClient, RpcChainClient};
use crate::config::{LoggingConfig, SaopayConfig};
use crate::dispatcher::{Dispatcher, Provider};
use crate::payments::{PaymentService, PaymentSettings};
use crate::rates::{CoinGeckoOracle, ExchangeRateCache};
use crate::registrar::MetricsRegistrar;
use crate::repository::MemoryRepository;
use crate::types::Asset;
use crate::wallet::load_fee_payer;

/// 初始化 tracing，兼顾 JSON 与文本输出模式。
pub fn init_tracing(config: &LoggingConfig) -> Result<()> {
    let mut filter = EnvFilter::try_new(&config.level).unwrap_or_else(|_| EnvFilter::new("info"));

    const QUIET_TARGETS: &[(&str, &str)] = &[
        ("hyper", "warn"),
        ("hyper_util::client::legacy", "warn"),
        ("reqwest", "info"),
        ("solana_rpc_client", "info"),
    ];
    for (module, level) in QUIET_TARGETS {
        if !config.level.contains(module) {
            if let Ok(directive) = format!("{module}={level}").parse() {
                filter = filter.add_directive(directive);
            }
        }
    }

    let timer = UtcTime::new(format_description!(
        "[year]-[month]-[day] [hour]:[minute]:[second].[subsecond digits:3]"
    ));
    let base = fmt()
        .with_timer(timer)
        .with_file(false)
        .with_line_number(false)
        .with_thread_ids(false)
        .with_target(true)
        .with_level(true);

    if config.json {
        base.json()
            .with_current_span(false)
            .with_span_list(false)
            .with_env_filter(filter)
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    } else {
        base.with_env_filter(filter)
            .event_format(fmt::format().compact())
            .try_init()
            .map_err(|err| anyhow!(err.to_string()))?;
    }
    Ok(())
}

/// 一次 CLI 调用所需的全部运行期对象。
pub struct AppContext {
    pub config: SaopayConfig,
    pub rates: Arc<ExchangeRateCache>,
    pub service: PaymentService,
}

impl AppContext {
    pub fn build(config: SaopayConfig) -> Result<Self> {
        let repository = Arc::new(MemoryRepository::new());
        let timeout = config.global.rpc_timeout();
        let providers: Vec<Provider> = config
            .global
            .rpc_urls()
            .iter()
            .map(|url| {
                let client: Arc<dyn ChainClient> = Arc::new(RpcChainClient::new(url, timeout));
                Provider::new(client)
            })
            .collect();
        let labels: Vec<&str> = providers.iter().map(Provider::label).collect();
        info!(target: "dispatcher", providers = ?labels, "RPC 节点列表已加载");

        let dispatcher = Arc::new(Dispatcher::new(
            providers,
            MetricsRegistrar::new(repository.clone()),
        )?);

        let oracle = CoinGeckoOracle::new(
            config.rates.oracle_base_url.clone(),
            config.rates.api_key.clone(),
            config.rates.request_timeout(),
        )?;
        let rates = Arc::new(ExchangeRateCache::new(
            repository.clone(),
            Arc::new(oracle),
            config.rates.oracle_ids(),
        ));

        let settings = PaymentSettings::from_config(&config)?;
        let service = PaymentService::new(dispatcher, rates.clone(), settings);

        Ok(Self {
            config,
            rates,
            service,
        })
    }

    pub fn fee_payer(&self) -> Result<Arc<Keypair>> {
        Ok(load_fee_payer(&self.config.wallet)?)
    }

    /// 命令行显式给出的 Mint 优先，否则使用平台代币。
    pub fn resolve_asset(&self, mint: Option<&str>, decimals: Option<u8>) -> Result<Asset> {
        let platform = self.service.settings().platform_asset;
        match mint {
            Some(raw) => {
                let mint = Pubkey::from_str(raw.trim())
                    .with_context(|| format!("非法 Mint 地址: {raw}"))?;
                let decimals = decimals
                    .or(platform.filter(|asset| asset.mint == mint).map(|asset| asset.decimals))
                    .unwrap_or(self.config.assets.platform_decimals);
                Ok(Asset::new(mint, decimals))
            }
            None => platform
                .map(|asset| Asset::new(asset.mint, decimals.unwrap_or(asset.decimals)))
                .ok_or_else(|| anyhow!("未指定 --mint 且未配置 assets.platform_mint")),
        }
    }
}

pub fn init_configs(args: crate::cli::args::InitCmd) -> Result<()> {
    let output_dir: PathBuf = match args.output {
        Some(dir) => dir,
        None => std::env::current_dir()?,
    };

    fs::create_dir_all(&output_dir)?;

    let templates: [(&str, &str); 1] = [(
        "saopay.toml",
        include_str!(concat!(env!("CARGO_MANIFEST_DIR"), "/saopay.toml")),
    )];

    for (filename, contents) in templates {
        let target_path = output_dir.join(filename);
        if target_path.exists() && !args.force {
            println!(
                "跳过 {}（文件已存在，如需覆盖请加 --force）",
                target_path.display()
            );
            continue;
        }

        fs::write(&target_path, contents)?;
        println!("已写入 {}", target_path.display());
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::args::InitCmd;

    #[test]
    fn bundled_template_parses_and_validates() {
        let config: SaopayConfig = toml::from_str(include_str!(concat!(
            env!("CARGO_MANIFEST_DIR"),
            "/saopay.toml"
        )))
        .unwrap();
        config.validate().unwrap();
        assert_eq!(config.global.rpc_urls.len(), 1);
    }

    #[test]
    fn init_respects_existing_files() {
        let dir = tempfile::tempdir().unwrap();
        let target = dir.path().join("saopay.toml");
        fs::write(&target, "# keep").unwrap();

        init_configs(InitCmd {
            output: Some(dir.path().to_path_buf()),
            force: false,
        })
        .unwrap();
        assert_eq!(fs::read_to_string(&target).unwrap(), "# keep");

        init_configs(InitCmd {
            output: Some(dir.path().to_path_buf()),
            force: true,
        })
        .unwrap();
        assert!(fs::read_to_string(&target).unwrap().contains("[global]"));
    }

    #[test]
    fn context_requires_rpc_urls() {
        let result = AppContext::build(SaopayConfig::default());
        assert!(result.is_err());
    }
}
