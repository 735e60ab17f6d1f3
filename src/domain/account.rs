use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::domain::{
    EntryId, EntryStatus, Error, InsurancePolicy, LedgerEntry, Money, PaymentSource,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AccountId(pub Uuid);

impl AccountId {
    pub fn new() -> Self {
        Self(Uuid::now_v7())
    }
}

impl Default for AccountId {
    fn default() -> Self {
        Self::new()
    }
}

impl core::fmt::Display for AccountId {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        core::fmt::Display::fmt(&self.0, f)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum KycStatus {
    Verified,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EmployerProfile {
    pub company_name: String,
    pub ein: Option<String>,
    pub employee_count: u32,
    pub total_volume: u64,
    pub engagement_score: u8,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Individual,
    Employer(EmployerProfile),
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Individual => "individual",
            Role::Employer(_) => "employer",
        }
    }
}

/// Outcome remembered for an explicit idempotency key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessedKey {
    pub entry_id: EntryId,
    pub status: EntryStatus,
    pub recorded_at: DateTime<Utc>,
}

/// One onboarded party: credit line, rewards and ledger history.
///
/// `current_balance == credit_limit - available_credit` holds after every
/// mutation made through the methods below.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: AccountId,
    #[serde(flatten)]
    pub role: Role,
    pub name: String,
    pub email: String,
    pub kyc_status: KycStatus,

    pub credit_limit: Money,
    pub available_credit: Money,
    pub current_balance: Money,

    pub payment_source: Option<PaymentSource>,
    pub policy: Option<InsurancePolicy>,

    pub points_balance: u64,
    pub lifetime_points: u64,

    /// Newest first.
    pub history: VecDeque<LedgerEntry>,
    pub idempotency_keys: HashMap<String, ProcessedKey>,
    /// Bumped by the store on every write.
    pub version: u64,
}

impl Account {
    pub fn new(
        role: Role,
        name: impl Into<String>,
        email: impl Into<String>,
        credit_limit: Money,
    ) -> Self {
        Self {
            id: AccountId::new(),
            role,
            name: name.into(),
            email: email.into(),
            kyc_status: KycStatus::Verified,
            credit_limit,
            available_credit: credit_limit,
            current_balance: Money::ZERO,
            payment_source: None,
            policy: None,
            points_balance: 0,
            lifetime_points: 0,
            history: VecDeque::new(),
            idempotency_keys: HashMap::new(),
            version: 0,
        }
    }

    pub fn with_payment_source(mut self, source: PaymentSource) -> Self {
        self.payment_source = Some(source);
        self
    }

    pub fn with_policy(mut self, policy: InsurancePolicy) -> Self {
        self.policy = Some(policy);
        self
    }

    pub fn with_bonus_points(mut self, points: u64) -> Self {
        self.points_balance = self.points_balance.saturating_add(points);
        self.lifetime_points = self.lifetime_points.saturating_add(points);
        self
    }

    /// Account number incoming debits are matched against.
    pub fn lookup_key(&self) -> Option<&str> {
        self.payment_source
            .as_ref()
            .map(|s| s.account_number.as_str())
    }

    pub fn merchant_name(&self) -> Option<String> {
        self.policy.as_ref().map(|p| p.carrier_name.clone())
    }

    pub fn is_consistent(&self) -> bool {
        self.available_credit >= Money::ZERO
            && self.available_credit <= self.credit_limit
            && self.credit_limit.checked_sub(self.available_credit) == Some(self.current_balance)
    }

    fn sync_balance(&mut self) -> Result<(), Error> {
        self.current_balance = self
            .credit_limit
            .checked_sub(self.available_credit)
            .ok_or(Error::Overflow(self.id))?;
        Ok(())
    }

    /// Draws `amount` from the credit line.
    pub fn reserve(&mut self, amount: Money) -> Result<(), Error> {
        if self.available_credit < amount {
            return Err(Error::InsufficientCredit {
                available: self.available_credit,
                requested: amount,
            });
        }
        self.available_credit = self
            .available_credit
            .checked_sub(amount)
            .ok_or(Error::Overflow(self.id))?;
        self.sync_balance()
    }

    /// Returns `amount` to the credit line.
    pub fn release(&mut self, amount: Money) -> Result<(), Error> {
        if amount > self.current_balance {
            return Err(Error::Overpayment {
                outstanding: self.current_balance,
                requested: amount,
            });
        }
        self.available_credit = self
            .available_credit
            .checked_add(amount)
            .ok_or(Error::Overflow(self.id))?;
        self.sync_balance()
    }

    pub fn mint_points(&mut self, points: u64) -> Result<(), Error> {
        self.points_balance = self
            .points_balance
            .checked_add(points)
            .ok_or(Error::Overflow(self.id))?;
        self.lifetime_points = self
            .lifetime_points
            .checked_add(points)
            .ok_or(Error::Overflow(self.id))?;
        Ok(())
    }

    /// Lifetime points never decrease.
    pub fn claw_back_points(&mut self, points: u64) {
        self.points_balance = self.points_balance.saturating_sub(points);
    }

    /// Prepends `entry`, dropping the oldest entries beyond `cap`.
    pub fn record(&mut self, entry: LedgerEntry, cap: Option<usize>) {
        self.history.push_front(entry);
        if let Some(cap) = cap {
            self.history.truncate(cap.max(1));
        }
    }

    pub fn entry(&self, id: EntryId) -> Option<&LedgerEntry> {
        self.history.iter().find(|e| e.id == id)
    }

    pub fn entry_mut(&mut self, id: EntryId) -> Option<&mut LedgerEntry> {
        self.history.iter_mut().find(|e| e.id == id)
    }

    pub fn page(&self, offset: usize, limit: usize) -> Vec<&LedgerEntry> {
        self.history.iter().skip(offset).take(limit).collect()
    }

    pub fn pending_count(&self) -> usize {
        self.history
            .iter()
            .filter(|e| e.status == EntryStatus::Pending)
            .count()
    }

    /// Percentage of the credit line in use.
    pub fn utilization(&self) -> Decimal {
        if self.credit_limit == Money::ZERO {
            return Decimal::ZERO;
        }
        (self.current_balance.to_decimal() / self.credit_limit.to_decimal() * Decimal::ONE_HUNDRED)
            .round_dp(1)
    }

    pub fn processed_key(
        &self,
        key: &str,
        now: DateTime<Utc>,
        ttl: Duration,
    ) -> Option<&ProcessedKey> {
        let cutoff = now.checked_sub_signed(ttl);
        self.idempotency_keys
            .get(key)
            .filter(|k| cutoff.is_none_or(|cutoff| k.recorded_at > cutoff))
    }

    pub fn remember_key(
        &mut self,
        key: String,
        entry: &LedgerEntry,
        now: DateTime<Utc>,
        ttl: Duration,
    ) {
        // a ttl reaching before the representable range keeps everything
        let cutoff = now.checked_sub_signed(ttl);
        self.idempotency_keys
            .retain(|_, k| cutoff.is_none_or(|cutoff| k.recorded_at > cutoff));
        self.idempotency_keys.insert(
            key,
            ProcessedKey {
                entry_id: entry.id,
                status: entry.status,
                recorded_at: now,
            },
        );
    }
}
