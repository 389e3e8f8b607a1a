pub mod evm;
pub mod ledger;
pub mod tron;
pub mod verification;

pub use evm::EvmVerifier;
pub use ledger::{Ledger, MemoryLedger};
pub use tron::TronVerifier;
pub use verification::PaymentVerificationService;
