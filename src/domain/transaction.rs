use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{AccountId, Error, Money};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntryId(pub Uuid);

impl EntryId {
    /// Time-ordered, so ids created later sort later.
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for EntryId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for EntryId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "tx_{}", self.0.simple())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryKind {
    PremiumPayment,
    Repayment,
    RewardRedemption,
}

/// `{} -> Pending -> (Settled | Failed)` or `{} -> Declined`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EntryStatus {
    Pending,
    Settled,
    Declined,
    Failed,
}

impl EntryStatus {
    pub fn is_terminal(self) -> bool {
        !matches!(self, EntryStatus::Pending)
    }

    pub fn can_transition_to(self, next: EntryStatus) -> bool {
        matches!(
            (self, next),
            (EntryStatus::Pending, EntryStatus::Settled)
                | (EntryStatus::Pending, EntryStatus::Failed)
        )
    }
}

impl core::fmt::Display for EntryStatus {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        let s = match self {
            EntryStatus::Pending => "PENDING",
            EntryStatus::Settled => "SETTLED",
            EntryStatus::Declined => "DECLINED",
            EntryStatus::Failed => "FAILED",
        };
        f.write_str(s)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EntryMetadata {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merchant_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ach_trace_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub points_minted: Option<u64>,
}

/// One monetary movement attempt against an account and its outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerEntry {
    pub id: EntryId,
    pub account_owner_id: AccountId,
    pub amount: Money,
    pub kind: EntryKind,
    pub status: EntryStatus,
    pub timestamp: DateTime<Utc>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metadata: Option<EntryMetadata>,
}

impl LedgerEntry {
    pub fn approved_premium(
        owner: AccountId,
        amount: Money,
        points_minted: u64,
        merchant_name: Option<String>,
        trace_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        let description = format!(
            "Premium Payment to {}",
            merchant_name.as_deref().unwrap_or("Insurance Provider")
        );
        Self {
            id: EntryId::new(),
            account_owner_id: owner,
            amount,
            kind: EntryKind::PremiumPayment,
            status: EntryStatus::Pending,
            timestamp: now,
            description,
            metadata: Some(EntryMetadata {
                merchant_name,
                ach_trace_id: trace_id,
                points_minted: Some(points_minted),
            }),
        }
    }

    pub fn declined_premium(
        owner: AccountId,
        amount: Money,
        trace_id: Option<String>,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id: EntryId::new(),
            account_owner_id: owner,
            amount,
            kind: EntryKind::PremiumPayment,
            status: EntryStatus::Declined,
            timestamp: now,
            description: "Declined: Insufficient Credit".to_string(),
            metadata: trace_id.map(|id| EntryMetadata {
                ach_trace_id: Some(id),
                ..EntryMetadata::default()
            }),
        }
    }

    pub fn repayment(owner: AccountId, amount: Money, now: DateTime<Utc>) -> Self {
        Self {
            id: EntryId::new(),
            account_owner_id: owner,
            amount,
            kind: EntryKind::Repayment,
            status: EntryStatus::Settled,
            timestamp: now,
            description: "Credit Line Repayment".to_string(),
            metadata: None,
        }
    }

    pub fn points_minted(&self) -> u64 {
        self.metadata
            .as_ref()
            .and_then(|m| m.points_minted)
            .unwrap_or(0)
    }

    /// Whether this entry shadows a new premium debit of `amount` arriving at `now`.
    pub fn is_recent_pending_premium(
        &self,
        amount: Money,
        now: DateTime<Utc>,
        window: Duration,
    ) -> bool {
        self.amount == amount
            && self.status == EntryStatus::Pending
            && self.kind == EntryKind::PremiumPayment
            && now
                .checked_sub_signed(window)
                .is_none_or(|cutoff| self.timestamp > cutoff)
    }

    pub fn transition(&mut self, next: EntryStatus) -> Result<(), Error> {
        if !self.status.can_transition_to(next) {
            return Err(Error::InvalidTransition {
                id: self.id,
                from: self.status,
                to: next,
            });
        }
        self.status = next;
        Ok(())
    }
}
