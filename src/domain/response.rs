use serde::{Serialize, Serializer};

use crate::domain::{EntryStatus, Error, LedgerEntry};

/// What the processor decided for one debit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DebitOutcome {
    Approved(LedgerEntry),
    /// A redelivery of an earlier debit. `status` is what the first delivery
    /// was decided as; `entry` is absent once history no longer holds it.
    Duplicate {
        status: EntryStatus,
        entry: Option<LedgerEntry>,
    },
    Declined(LedgerEntry),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResponseStatus {
    Ok,
    PaymentRequired,
    NotFound,
    UnprocessableEntity,
    InternalError,
}

impl ResponseStatus {
    pub fn code(self) -> u16 {
        match self {
            ResponseStatus::Ok => 200,
            ResponseStatus::PaymentRequired => 402,
            ResponseStatus::NotFound => 404,
            ResponseStatus::UnprocessableEntity => 422,
            ResponseStatus::InternalError => 500,
        }
    }
}

impl Serialize for ResponseStatus {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u16(self.code())
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct DebitResponse {
    pub status: ResponseStatus,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub transaction: Option<LedgerEntry>,
}

impl DebitResponse {
    /// Every fault that is not a business decision fails closed.
    pub fn from_result(result: Result<DebitOutcome, Error>) -> Self {
        match result {
            Ok(DebitOutcome::Approved(entry)) => Self {
                status: ResponseStatus::Ok,
                message: "Approved".to_string(),
                transaction: Some(entry),
            },
            Ok(DebitOutcome::Duplicate {
                status: EntryStatus::Declined,
                entry,
            }) => Self {
                status: ResponseStatus::PaymentRequired,
                message: "Payment Required: Insufficient Credit Line".to_string(),
                transaction: entry,
            },
            Ok(DebitOutcome::Duplicate { entry, .. }) => Self {
                status: ResponseStatus::Ok,
                message: "Idempotent success (Duplicate)".to_string(),
                transaction: entry,
            },
            Ok(DebitOutcome::Declined(entry)) => Self {
                status: ResponseStatus::PaymentRequired,
                message: "Payment Required: Insufficient Credit Line".to_string(),
                transaction: Some(entry),
            },
            Err(Error::AccountNotFound(_)) => Self {
                status: ResponseStatus::NotFound,
                message: "Account not found".to_string(),
                transaction: None,
            },
            Err(Error::InvalidAmount(amount)) => Self {
                status: ResponseStatus::UnprocessableEntity,
                message: format!("Invalid amount: {}", amount),
                transaction: None,
            },
            Err(e) => Self {
                status: ResponseStatus::InternalError,
                message: format!("Debit declined: {}", e),
                transaction: None,
            },
        }
    }

    pub fn is_success(&self) -> bool {
        self.status == ResponseStatus::Ok
    }
}
