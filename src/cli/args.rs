use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use rust_decimal::Decimal;

#[derive(Parser, Debug)]
#[command(name = "saopay", version, about = "多节点 SPL 代币支付与手续费结算工具")]
pub struct Cli {
    #[arg(
        short,
        long,
        value_name = "FILE",
        help = "配置文件路径（默认查找 saopay.toml 或 config/saopay.toml）"
    )]
    pub config: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// 立即同步一次汇率并打印结果
    #[command(name = "sync-rates")]
    SyncRates,
    /// 常驻运行：后台定时同步汇率，Ctrl-C 退出
    Run,
    /// 查询代币余额
    Balance(BalanceCmd),
    /// 发送代币（按配置收取平台手续费）
    Send(SendCmd),
    /// 请求测试网空投
    Airdrop(AirdropCmd),
    /// 初始化配置模版文件
    Init(InitCmd),
}

#[derive(Args, Debug)]
pub struct BalanceCmd {
    #[arg(help = "钱包地址或代币账户地址")]
    pub address: String,
    #[arg(long, help = "代币 Mint（默认使用 assets.platform_mint）")]
    pub mint: Option<String>,
    #[arg(long, help = "地址本身即代币账户，不做 ATA 推导")]
    pub raw: bool,
}

#[derive(Args, Debug)]
pub struct SendCmd {
    #[arg(help = "收款地址")]
    pub recipient: String,
    #[arg(help = "发送数量（整数单位，可带小数）")]
    pub amount: Decimal,
    #[arg(long, help = "代币 Mint（默认使用 assets.platform_mint）")]
    pub mint: Option<String>,
    #[arg(long, help = "代币精度（默认使用 assets.platform_decimals）")]
    pub decimals: Option<u8>,
    #[arg(long, help = "覆盖 fees.percent_to_charge")]
    pub percent: Option<Decimal>,
    #[arg(
        long,
        value_name = "KEY",
        help = "付款方私钥（默认与手续费账户相同）"
    )]
    pub source_key: Option<String>,
    #[arg(long, help = "仅组装交易并输出 base64，不提交")]
    pub dry_run: bool,
}

#[derive(Args, Debug)]
pub struct AirdropCmd {
    #[arg(help = "接收地址")]
    pub recipient: String,
    #[arg(long, default_value_t = 1_000_000_000u64, help = "空投数量（lamports）")]
    pub lamports: u64,
}

#[derive(Args, Debug)]
pub struct InitCmd {
    #[arg(long, value_name = "DIR", help = "可选输出目录（默认当前目录）")]
    pub output: Option<PathBuf>,
    #[arg(long, help = "若文件存在则覆盖")]
    pub force: bool,
}

#[cfg(test)]
mod tests {
    use clap::CommandFactory;

    use super::*;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn send_parses_decimal_amount_and_flags() {
        let cli = Cli::try_parse_from([
            "saopay",
            "--config",
            "custom.toml",
            "send",
            "11111111111111111111111111111111",
            "12.5",
            "--percent",
            "2",
            "--dry-run",
        ])
        .unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("custom.toml")));
        match cli.command {
            Command::Send(cmd) => {
                assert_eq!(cmd.amount, Decimal::new(125, 1));
                assert_eq!(cmd.percent, Some(Decimal::from(2)));
                assert!(cmd.dry_run);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
