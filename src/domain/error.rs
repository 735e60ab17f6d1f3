use crate::domain::{AccountId, EntryId, EntryStatus, Money};

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error(transparent)]
    IO(#[from] std::io::Error),

    #[error("Ingestion failed with: {0}")]
    Ingestion(String),

    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("Account not found: {0}")]
    AccountNotFound(String),

    #[error("Insufficient credit: available {available}, requested {requested}")]
    InsufficientCredit { available: Money, requested: Money },

    #[error("Invalid amount: {0}")]
    InvalidAmount(Money),

    #[error("Account {0} has no linked payment source")]
    MissingPaymentSource(AccountId),

    #[error("Ledger entry not found: {0}")]
    EntryNotFound(EntryId),

    #[error("Ledger entry {id} cannot move from {from} to {to}")]
    InvalidTransition {
        id: EntryId,
        from: EntryStatus,
        to: EntryStatus,
    },

    #[error("Repayment of {requested} exceeds outstanding balance {outstanding}")]
    Overpayment { outstanding: Money, requested: Money },

    #[error("Bill scan rejected: confidence {confidence} is below {threshold}")]
    LowConfidenceScan { confidence: f64, threshold: f64 },

    #[error("Arithmetic overflow on account {0}")]
    Overflow(AccountId),

    #[error("Concurrent modification of account {0}")]
    Conflict(String),

    #[error("Store failed with: {0}")]
    Store(String),

    #[error("Engine failed with: {0}")]
    Engine(String),
}
