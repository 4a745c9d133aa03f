//! CLI 模块负责解析命令行参数并分发到各子命令处理逻辑。

pub mod args;
pub mod commands;
pub mod context;

use anyhow::{Result, anyhow};
use clap::Parser;

use crate::cli::args::{Cli, Command};
use crate::cli::context::{AppContext, init_configs, init_tracing};
use crate::config::load_config;

pub async fn run() -> Result<()> {
    let Cli { config, command } = Cli::parse();
    let command = match command {
        Command::Init(args) => return init_configs(args),
        other => other,
    };

    let config = load_config(config)?;
    init_tracing(&config.global.logging)?;

    if config.global.prometheus.enable {
        crate::monitoring::try_init_prometheus(&config.global.prometheus.listen)
            .map_err(|err| anyhow!(err))?;
    }

    let ctx = AppContext::build(config)?;
    match command {
        Command::SyncRates => commands::sync_rates(&ctx).await,
        Command::Run => commands::run(&ctx).await,
        Command::Balance(args) => commands::balance(&ctx, args).await,
        Command::Send(args) => commands::send(&ctx, args).await,
        Command::Airdrop(args) => commands::airdrop(&ctx, args).await,
        Command::Init(_) => Ok(()),
    }
}
