//! SPL 代币支付层：多节点调度、关联账户解析、多币种手续费折算与节点可靠性统计。

pub mod accounts;
pub mod chain;
pub mod cli;
pub mod config;
pub mod dispatcher;
pub mod error;
pub mod fees;
pub mod instructions;
pub mod monitoring;
pub mod payments;
pub mod rates;
pub mod registrar;
pub mod repository;
pub mod types;
pub mod wallet;

#[cfg(test)]
pub(crate) mod testing;

pub use error::{PaymentError, PaymentResult};
