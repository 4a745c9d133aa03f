/// 经由多节点调度器执行的操作目录。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    IssueAsset,
    CreateAta,
    GetAccount,
    GetTokenAccountBalance,
    GetLatestBlockhash,
    GetFeeForMessage,
    SendTransaction,
    GetSignatures,
    GetTransaction,
    Stake,
    Unstake,
    RequestAirdrop,
    ParsePubkey,
    GenerateKeypair,
    SerializeTransaction,
    DeserializeTransaction,
    ValidatePrivateKey,
}

impl Operation {
    pub fn as_str(&self) -> &'static str {
        match self {
            Operation::IssueAsset => "issue_asset",
            Operation::CreateAta => "create_ata",
            Operation::GetAccount => "get_account",
            Operation::GetTokenAccountBalance => "get_token_account_balance",
            Operation::GetLatestBlockhash => "get_latest_blockhash",
            Operation::GetFeeForMessage => "get_fee_for_message",
            Operation::SendTransaction => "send_transaction",
            Operation::GetSignatures => "get_signatures",
            Operation::GetTransaction => "get_transaction",
            Operation::Stake => "stake",
            Operation::Unstake => "unstake",
            Operation::RequestAirdrop => "request_airdrop",
            Operation::ParsePubkey => "parse_pubkey",
            Operation::GenerateKeypair => "generate_keypair",
            Operation::SerializeTransaction => "serialize_transaction",
            Operation::DeserializeTransaction => "deserialize_transaction",
            Operation::ValidatePrivateKey => "validate_private_key",
        }
    }

    /// 本地操作不计入节点指标，任意错误都切换下一个节点。
    pub fn is_local(&self) -> bool {
        matches!(
            self,
            Operation::ParsePubkey
                | Operation::GenerateKeypair
                | Operation::SerializeTransaction
                | Operation::DeserializeTransaction
                | Operation::ValidatePrivateKey
        )
    }
}
