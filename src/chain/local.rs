use base64::{Engine as _, engine::general_purpose};
use bincode::serde::{decode_from_slice, encode_to_vec};
use solana_sdk::transaction::Transaction;

use super::error::{ChainError, ChainResult};

/// 交易线格式与 Solana RPC 保持一致：bincode legacy 编码 + base64。
pub fn encode_transaction(transaction: &Transaction) -> ChainResult<String> {
    let bytes = encode_to_vec(transaction, bincode::config::legacy())
        .map_err(|err| ChainError::local(format!("序列化交易失败: {err}")))?;
    Ok(general_purpose::STANDARD.encode(bytes))
}

pub fn decode_transaction(encoded: &str) -> ChainResult<Transaction> {
    let bytes = general_purpose::STANDARD
        .decode(encoded.trim())
        .map_err(|err| ChainError::local(format!("base64 解码失败: {err}")))?;
    let (transaction, consumed): (Transaction, usize) =
        decode_from_slice(&bytes, bincode::config::legacy())
            .map_err(|err| ChainError::local(format!("反序列化交易失败: {err}")))?;
    if consumed != bytes.len() {
        return Err(ChainError::local(format!(
            "交易数据包含 {} 字节多余内容",
            bytes.len() - consumed
        )));
    }
    Ok(transaction)
}
