use solana_compute_budget_interface::ComputeBudgetInstruction;
use solana_sdk::instruction::Instruction;
use solana_sdk::pubkey::Pubkey;

pub const COMPUTE_BUDGET_PROGRAM_ID: Pubkey =
    solana_sdk::pubkey!("ComputeBudget111111111111111111111111111111");

/// 单价为 0 时不插入；否则作为第一条指令。
pub fn maybe_insert_compute_unit_price(instructions: &mut Vec<Instruction>, micro_lamports: u64) {
    if micro_lamports == 0 {
        return;
    }
    instructions.insert(
        0,
        ComputeBudgetInstruction::set_compute_unit_price(micro_lamports),
    );
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_price_leaves_instructions_untouched() {
        let mut instructions = Vec::new();
        maybe_insert_compute_unit_price(&mut instructions, 0);
        assert!(instructions.is_empty());
    }

    #[test]
    fn price_instruction_goes_first() {
        let transfer = Instruction {
            program_id: spl_token::ID,
            accounts: Vec::new(),
            data: vec![3],
        };
        let mut instructions = vec![transfer];
        maybe_insert_compute_unit_price(&mut instructions, 1_000);
        assert_eq!(instructions.len(), 2);
        assert_eq!(instructions[0].program_id, COMPUTE_BUDGET_PROGRAM_ID);
        assert_eq!(instructions[0].data[0], 3);
        assert_eq!(&instructions[0].data[1..9], &1_000u64.to_le_bytes());
    }
}
