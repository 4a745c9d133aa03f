use std::str::FromStr;

use anyhow::{Context, Result};
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signer;
use tracing::{info, warn};

use crate::cli::args::{AirdropCmd, BalanceCmd, SendCmd};
use crate::cli::context::AppContext;
use crate::payments::SendAssetsRequest;
use crate::types::AssetType;
use crate::wallet::parse_keypair_string;

pub async fn sync_rates(ctx: &AppContext) -> Result<()> {
    let report = ctx.rates.sync_once().await?;
    for asset in AssetType::ALL {
        match ctx.rates.rate(asset).await {
            Ok(price) => println!("{asset}: {price} USD"),
            Err(_) => println!("{asset}: 暂无数据"),
        }
    }
    if !report.skipped.is_empty() {
        warn!(target: "rates", skipped = ?report.skipped, "部分资产本轮未更新");
    }
    Ok(())
}

/// 启动汇率后台同步并等待 Ctrl-C。
pub async fn run(ctx: &AppContext) -> Result<()> {
    let handle = ctx.rates.clone().spawn(ctx.config.rates.refresh_interval());
    info!(
        target: "saopay",
        environment = ctx.config.global.environment.as_str(),
        "saopay 已启动，按 Ctrl-C 退出"
    );
    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for ctrl-c")?;
    handle.abort();

    for provider in ctx.service.dispatcher().providers() {
        let metric = ctx
            .service
            .dispatcher()
            .registrar()
            .provider_metric(provider.label())
            .await?;
        info!(
            target: "metrics",
            provider = provider.label(),
            success_calls = metric.success_calls,
            not_available_errors = metric.not_available_errors,
            other_errors = metric.other_errors,
            "节点调用统计"
        );
    }
    Ok(())
}

pub async fn balance(ctx: &AppContext, args: BalanceCmd) -> Result<()> {
    let address = parse_address(&args.address)?;
    let balance = if args.raw {
        ctx.service.get_token_account_balance(&address).await?
    } else {
        let asset = ctx.resolve_asset(args.mint.as_deref(), None)?;
        ctx.service
            .get_token_account_balance_with_auto_derive(&address, &asset)
            .await?
    };
    println!("{balance}");
    Ok(())
}

pub async fn send(ctx: &AppContext, args: SendCmd) -> Result<()> {
    ctx.rates.sync_once().await?;

    let fee_payer = ctx.fee_payer()?;
    let source = match args.source_key.as_deref() {
        Some(raw) => Some(parse_keypair_string(raw).context("付款方私钥格式非法")?),
        None => None,
    };
    let asset = ctx.resolve_asset(args.mint.as_deref(), args.decimals)?;
    let mut config = ctx.service.settings().send.clone();
    if let Some(percent) = args.percent {
        config.percent_to_charge = percent;
    }

    let request = SendAssetsRequest {
        asset,
        fee_payer: fee_payer.as_ref(),
        source: source.as_ref().unwrap_or(fee_payer.as_ref()),
        recipient: parse_address(&args.recipient)?,
        amount: args.amount,
    };
    info!(
        target: "payments",
        source = %request.source.pubkey(),
        recipient = %request.recipient,
        amount = %request.amount,
        "准备发送"
    );

    if args.dry_run {
        let prepared = ctx.service.prepare_send_assets_tx(&request, &config).await?;
        println!("fee_in_sao: {}", prepared.fee_in_sao);
        println!(
            "blockchain_fee_lamports: {}",
            prepared.blockchain_fee_in_sol_multiplied
        );
        println!("{}", ctx.service.serialize_transaction(&prepared.transaction)?);
        return Ok(());
    }

    let signature = ctx
        .service
        .send_assets_with_auto_derive(&request, &config)
        .await?;
    println!("{signature}");
    Ok(())
}

pub async fn airdrop(ctx: &AppContext, args: AirdropCmd) -> Result<()> {
    let recipient = parse_address(&args.recipient)?;
    let signature = ctx.service.request_airdrop(&recipient, args.lamports).await?;
    println!("{signature}");
    Ok(())
}

fn parse_address(raw: &str) -> Result<Pubkey> {
    Pubkey::from_str(raw.trim()).with_context(|| format!("非法地址: {raw}"))
}
