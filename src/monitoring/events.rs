use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::Signature;
use tracing::{debug, info, warn};

use crate::registrar::CallOutcome;
use crate::types::AssetType;

use super::metrics::prometheus_enabled;
use metrics::{counter, histogram};

pub fn provider_call(provider: &str, outcome: CallOutcome) {
    debug!(
        target: "monitoring::provider",
        provider,
        outcome = outcome.as_str(),
        "provider call recorded"
    );

    if prometheus_enabled() {
        counter!(
            "saopay_provider_calls_total",
            "provider" => provider.to_string(),
            "outcome" => outcome.as_str()
        )
        .increment(1);
    }
}

pub fn provider_failover(operation: &'static str, provider: &str, attempt: usize, error: &str) {
    warn!(
        target: "monitoring::provider",
        operation,
        provider,
        attempt,
        error,
        "节点不可用，切换至下一个节点"
    );

    if prometheus_enabled() {
        counter!(
            "saopay_provider_failover_total",
            "operation" => operation,
            "provider" => provider.to_string()
        )
        .increment(1);
    }
}

pub fn dispatch_finished(operation: &'static str, provider: &str, elapsed: Duration, ok: bool) {
    let elapsed_ms = elapsed.as_secs_f64() * 1000.0;
    debug!(
        target: "monitoring::dispatch",
        operation,
        provider,
        ok,
        elapsed_ms = format_args!("{elapsed_ms:.3}"),
        "dispatch finished"
    );

    if prometheus_enabled() {
        let status = if ok { "ok" } else { "error" };
        histogram!(
            "saopay_dispatch_latency_ms",
            "operation" => operation,
            "status" => status
        )
        .record(elapsed_ms);
    }
}

pub fn dispatch_exhausted(operation: &'static str, attempts: usize) {
    warn!(
        target: "monitoring::dispatch",
        operation,
        attempts,
        "全部节点均不可用"
    );

    if prometheus_enabled() {
        counter!("saopay_dispatch_exhausted_total", "operation" => operation).increment(1);
    }
}

pub fn rate_sync(updated: &[AssetType], skipped: &[AssetType]) {
    let updated_labels: Vec<&str> = updated.iter().map(AssetType::as_str).collect();
    let skipped_labels: Vec<&str> = skipped.iter().map(AssetType::as_str).collect();
    info!(
        target: "monitoring::rates",
        event = "sync",
        updated = ?updated_labels,
        skipped = ?skipped_labels,
        "exchange rate sync finished"
    );

    if prometheus_enabled() {
        for asset in updated {
            counter!(
                "saopay_rate_sync_total",
                "asset" => asset.as_str(),
                "result" => "updated"
            )
            .increment(1);
        }
        for asset in skipped {
            counter!(
                "saopay_rate_sync_total",
                "asset" => asset.as_str(),
                "result" => "skipped"
            )
            .increment(1);
        }
    }
}

pub fn rate_sync_failed(error: &str) {
    warn!(
        target: "monitoring::rates",
        event = "sync_failed",
        error,
        "汇率同步失败，保留上一轮数据"
    );

    if prometheus_enabled() {
        counter!("saopay_rate_sync_failures_total").increment(1);
    }
}

pub fn ata_created(owner: &Pubkey, mint: &Pubkey, ata: &Pubkey, signature: &Signature) {
    info!(
        target: "monitoring::accounts",
        event = "ata_created",
        owner = %owner,
        mint = %mint,
        ata = %ata,
        %signature,
        "associated token account created"
    );

    if prometheus_enabled() {
        counter!("saopay_ata_created_total", "result" => "created").increment(1);
    }
}

pub fn ata_creation_failed(owner: &Pubkey, mint: &Pubkey, error: &str, fatal: bool) {
    warn!(
        target: "monitoring::accounts",
        event = "ata_creation_failed",
        owner = %owner,
        mint = %mint,
        error,
        fatal,
        "关联账户创建失败"
    );

    if prometheus_enabled() {
        counter!("saopay_ata_created_total", "result" => "failed").increment(1);
    }
}

pub fn payment_prepared(
    mint: &Pubkey,
    amount: Decimal,
    fee_in_sao: Decimal,
    blockchain_fee_lamports: u64,
) {
    info!(
        target: "monitoring::payments",
        event = "prepared",
        mint = %mint,
        amount = %amount,
        fee_in_sao = %fee_in_sao,
        blockchain_fee_lamports,
        "send-assets transaction prepared"
    );

    if prometheus_enabled() {
        counter!("saopay_payments_prepared_total", "mint" => mint.to_string()).increment(1);
        if let Some(fee) = fee_in_sao.to_f64() {
            histogram!("saopay_payment_fee_sao", "mint" => mint.to_string()).record(fee);
        }
    }
}

pub fn transaction_submitted(operation: &'static str, signature: &Signature) {
    info!(
        target: "monitoring::payments",
        event = "submitted",
        operation,
        %signature,
        "transaction submitted"
    );

    if prometheus_enabled() {
        counter!("saopay_transactions_submitted_total", "operation" => operation).increment(1);
    }
}
