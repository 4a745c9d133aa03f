pub mod compute_budget;
pub mod token;

use solana_sdk::hash::Hash;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;
use solana_sdk::signature::{Keypair, Signer};
use solana_sdk::transaction::Transaction;

pub use compute_budget::maybe_insert_compute_unit_price;

/// 用同一个区块哈希签名；手续费账户与其他签名者相同时只签一次。
pub fn sign_transaction(
    instructions: &[Instruction],
    fee_payer: &Keypair,
    signers: &[&Keypair],
    blockhash: Hash,
) -> Transaction {
    let payer: Pubkey = fee_payer.pubkey();
    let mut signer_refs: Vec<&dyn Signer> = Vec::with_capacity(1 + signers.len());
    signer_refs.push(fee_payer);
    let mut seen = vec![payer];
    for signer in signers {
        let pubkey = signer.pubkey();
        if seen.contains(&pubkey) {
            continue;
        }
        seen.push(pubkey);
        signer_refs.push(*signer);
    }
    Transaction::new_signed_with_payer(instructions, Some(&payer), &signer_refs, blockhash)
}
