use std::env;
use std::sync::Arc;

use solana_sdk::signature::Keypair;

use crate::config::WalletConfig;
use crate::error::{PaymentError, PaymentResult};

pub const FEE_PAYER_KEY_ENV: &str = "SAOPAY_FEE_PAYER_KEY";

/// 加载手续费支付账户：环境变量优先，其次读取配置文件。
pub fn load_fee_payer(wallet: &WalletConfig) -> PaymentResult<Arc<Keypair>> {
    if let Ok(value) = env::var(FEE_PAYER_KEY_ENV) {
        if !value.trim().is_empty() {
            let keypair = parse_keypair_string(value.trim()).map_err(|err| {
                PaymentError::Configuration(format!("环境变量 {FEE_PAYER_KEY_ENV} 非法: {err}"))
            })?;
            return Ok(Arc::new(keypair));
        }
    }

    if !wallet.fee_payer_private_key.trim().is_empty() {
        let keypair = parse_keypair_string(wallet.fee_payer_private_key.trim()).map_err(|err| {
            PaymentError::Configuration(format!("配置 wallet.fee_payer_private_key 非法: {err}"))
        })?;
        return Ok(Arc::new(keypair));
    }

    Err(PaymentError::Configuration(format!(
        "缺少手续费账户私钥，请提供 wallet.fee_payer_private_key 或环境变量 {FEE_PAYER_KEY_ENV}"
    )))
}

/// 支持 JSON 字节数组、逗号分隔字节与 base58 三种私钥格式。
pub fn parse_keypair_string(raw: &str) -> Result<Keypair, anyhow::Error> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        anyhow::bail!("keypair string empty");
    }

    if trimmed.starts_with('[') {
        let bytes: Vec<u8> = serde_json::from_str(trimmed)?;
        Ok(Keypair::try_from(bytes.as_slice())?)
    } else if trimmed.contains(',') {
        let bytes = trimmed
            .split(',')
            .map(|part| part.trim())
            .filter(|part| !part.is_empty())
            .map(|part| part.parse::<u8>())
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Keypair::try_from(bytes.as_slice())?)
    } else {
        let data = bs58::decode(trimmed).into_vec()?;
        Ok(Keypair::try_from(data.as_slice())?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use solana_sdk::signature::Signer;

    #[test]
    fn parses_all_supported_encodings() {
        let keypair = Keypair::new();
        let bytes = keypair.to_bytes();

        let json = serde_json::to_string(&bytes.to_vec()).unwrap();
        let csv = bytes.iter().map(u8::to_string).collect::<Vec<_>>().join(",");
        let base58 = bs58::encode(bytes).into_string();

        for raw in [json, csv, base58] {
            let parsed = parse_keypair_string(&raw).expect("parse keypair");
            assert_eq!(parsed.pubkey(), keypair.pubkey());
        }
    }

    #[test]
    fn rejects_garbage() {
        assert!(parse_keypair_string("").is_err());
        assert!(parse_keypair_string("[1,2,3]").is_err());
        assert!(parse_keypair_string("not-base58-0OIl").is_err());
    }
}
