use std::sync::Arc;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::domain::{
    Account, AccountStore, Clock, DebitOutcome, DebitRequest, DebitResponse, EntryId, EntryKind,
    EntryStatus, Error, LedgerEntry, Money,
};

/// Whether a decision needs to be written back.
enum Change<T> {
    Commit(T),
    Unchanged(T),
}

#[derive(Debug, Clone)]
struct DebitPolicy {
    points_per_unit: Decimal,
    dedup_window: Duration,
    idempotency_ttl: Duration,
    max_cas_retries: u32,
    history_cap: Option<usize>,
    enforce_routing_number: bool,
}

impl From<&Config> for DebitPolicy {
    fn from(config: &Config) -> Self {
        Self {
            points_per_unit: config.points_per_unit,
            dedup_window: config.dedup_window(),
            idempotency_ttl: config.idempotency_ttl(),
            max_cas_retries: config.max_cas_retries,
            history_cap: config.history_cap,
            enforce_routing_number: config.enforce_routing_number,
        }
    }
}

/// Authorizes incoming ACH debits against the account store.
///
/// Every operation reads a snapshot of one account, decides, and writes the
/// result back with a version check. A lost race re-reads and decides again,
/// so two debits on the same account serialize while debits on different
/// accounts never wait on each other.
#[derive(Debug)]
pub struct DebitProcessor<S, C>
where
    S: AccountStore,
    C: Clock,
{
    store: Arc<S>,
    clock: C,
    policy: DebitPolicy,
}

impl<S, C> DebitProcessor<S, C>
where
    S: AccountStore,
    C: Clock,
{
    pub fn new(store: Arc<S>, clock: C, config: &Config) -> Self {
        Self {
            store,
            clock,
            policy: DebitPolicy::from(config),
        }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Wire-level entry point: every outcome becomes a status code.
    pub fn handle_debit(&self, request: &DebitRequest) -> DebitResponse {
        DebitResponse::from_result(self.authorize(request))
    }

    pub fn authorize(&self, request: &DebitRequest) -> Result<DebitOutcome, Error> {
        info!(
            account = %request.account_number,
            amount = %request.amount,
            "incoming debit"
        );

        if !request.amount.is_positive() {
            warn!(amount = %request.amount, "rejecting non-positive debit");
            return Err(Error::InvalidAmount(request.amount));
        }

        let result = self.mutate(&request.account_number, |account, now| {
            self.decide(account, request, now)
        });

        match &result {
            Ok(DebitOutcome::Approved(entry)) => info!(
                tx = %entry.id,
                account = %request.account_number,
                points = entry.points_minted(),
                "debit approved"
            ),
            Ok(DebitOutcome::Duplicate { .. }) => warn!(
                account = %request.account_number,
                amount = %request.amount,
                "duplicate debit detected"
            ),
            Ok(DebitOutcome::Declined(entry)) => warn!(
                tx = %entry.id,
                account = %request.account_number,
                requested = %request.amount,
                "insufficient credit"
            ),
            Err(Error::AccountNotFound(number)) => error!(account = %number, "account not found"),
            Err(e) => error!(account = %request.account_number, error = %e, "debit failed closed"),
        }

        result
    }

    fn decide(
        &self,
        account: &mut Account,
        request: &DebitRequest,
        now: DateTime<Utc>,
    ) -> Result<Change<DebitOutcome>, Error> {
        self.check_routing(account, request)?;

        if let Some(key) = request.idempotency_key.as_deref() {
            if let Some(processed) = account.processed_key(key, now, self.policy.idempotency_ttl) {
                return Ok(Change::Unchanged(DebitOutcome::Duplicate {
                    status: processed.status,
                    entry: account.entry(processed.entry_id).cloned(),
                }));
            }
        } else if account.history.iter().any(|e| {
            e.is_recent_pending_premium(request.amount, now, self.policy.dedup_window)
        }) {
            return Ok(Change::Unchanged(DebitOutcome::Duplicate {
                status: EntryStatus::Pending,
                entry: None,
            }));
        }

        let trace_id = request.idempotency_key.clone();
        let points = self.points_for(request.amount)?;

        let (entry, approved) = match account.reserve(request.amount) {
            Ok(()) => {
                account.mint_points(points)?;
                let entry = LedgerEntry::approved_premium(
                    account.id,
                    request.amount,
                    points,
                    account.merchant_name(),
                    trace_id,
                    now,
                );
                (entry, true)
            }
            Err(Error::InsufficientCredit { .. }) => (
                LedgerEntry::declined_premium(account.id, request.amount, trace_id, now),
                false,
            ),
            Err(e) => return Err(e),
        };

        if let Some(key) = request.idempotency_key.clone() {
            account.remember_key(key, &entry, now, self.policy.idempotency_ttl);
        }
        account.record(entry.clone(), self.policy.history_cap);

        Ok(Change::Commit(if approved {
            DebitOutcome::Approved(entry)
        } else {
            DebitOutcome::Declined(entry)
        }))
    }

    fn check_routing(&self, account: &Account, request: &DebitRequest) -> Result<(), Error> {
        let Some(source) = account.payment_source.as_ref() else {
            return Ok(());
        };
        if source.routing_number == request.routing_number {
            return Ok(());
        }
        warn!(
            account = %request.account_number,
            expected = %source.routing_number,
            received = %request.routing_number,
            "routing number mismatch"
        );
        if self.policy.enforce_routing_number {
            return Err(Error::AccountNotFound(request.account_number.clone()));
        }
        Ok(())
    }

    fn points_for(&self, amount: Money) -> Result<u64, Error> {
        amount
            .to_decimal()
            .checked_mul(self.policy.points_per_unit)
            .and_then(|points| points.floor().to_u64())
            .ok_or_else(|| Error::Engine(format!("cannot mint points for {}", amount)))
    }

    /// Marks a pending premium payment as cleared.
    pub fn settle(&self, account_number: &str, entry_id: EntryId) -> Result<LedgerEntry, Error> {
        let entry = self.mutate(account_number, |account, _| {
            let entry = account
                .entry_mut(entry_id)
                .ok_or(Error::EntryNotFound(entry_id))?;
            entry.transition(EntryStatus::Settled)?;
            Ok(Change::Commit(entry.clone()))
        })?;
        info!(tx = %entry.id, account = %account_number, "debit settled");
        Ok(entry)
    }

    /// Marks a pending premium payment as returned by the bank, giving the
    /// credit back and withdrawing the points it minted.
    pub fn fail(&self, account_number: &str, entry_id: EntryId) -> Result<LedgerEntry, Error> {
        let entry = self.mutate(account_number, |account, _| {
            let (amount, points) = {
                let entry = account
                    .entry_mut(entry_id)
                    .ok_or(Error::EntryNotFound(entry_id))?;
                entry.transition(EntryStatus::Failed)?;
                (entry.amount, entry.points_minted())
            };
            account.release(amount)?;
            account.claw_back_points(points);
            let entry = account
                .entry(entry_id)
                .cloned()
                .ok_or(Error::EntryNotFound(entry_id))?;
            Ok(Change::Commit(entry))
        })?;
        warn!(tx = %entry.id, account = %account_number, "debit failed");
        Ok(entry)
    }

    /// Settles every pending premium payment on the account.
    pub fn settle_pending(&self, account_number: &str) -> Result<usize, Error> {
        let settled = self.mutate(account_number, |account, _| {
            let mut settled = 0;
            for entry in account.history.iter_mut().filter(|e| {
                e.status == EntryStatus::Pending && e.kind == EntryKind::PremiumPayment
            }) {
                entry.transition(EntryStatus::Settled)?;
                settled += 1;
            }
            Ok(if settled == 0 {
                Change::Unchanged(0)
            } else {
                Change::Commit(settled)
            })
        })?;
        info!(account = %account_number, settled, "pending debits settled");
        Ok(settled)
    }

    /// Pays down the outstanding balance.
    pub fn repay(&self, account_number: &str, amount: Money) -> Result<LedgerEntry, Error> {
        if !amount.is_positive() {
            return Err(Error::InvalidAmount(amount));
        }
        let entry = self.mutate(account_number, |account, now| {
            account.release(amount)?;
            let entry = LedgerEntry::repayment(account.id, amount, now);
            account.record(entry.clone(), self.policy.history_cap);
            Ok(Change::Commit(entry))
        })?;
        info!(tx = %entry.id, account = %account_number, amount = %amount, "repayment applied");
        Ok(entry)
    }

    /// Read-decide-swap loop around one account.
    fn mutate<T>(
        &self,
        account_number: &str,
        mut apply: impl FnMut(&mut Account, DateTime<Utc>) -> Result<Change<T>, Error>,
    ) -> Result<T, Error> {
        for attempt in 0..=self.policy.max_cas_retries {
            let mut account = self
                .store
                .lookup(account_number)?
                .ok_or_else(|| Error::AccountNotFound(account_number.to_string()))?;
            if !account.is_consistent() {
                return Err(Error::Engine(format!("corrupt account record {}", account.id)));
            }
            let expected_version = account.version;

            match apply(&mut account, self.clock.now())? {
                Change::Unchanged(value) => return Ok(value),
                Change::Commit(value) => {
                    if !account.is_consistent() {
                        return Err(Error::Engine(format!(
                            "refusing to store inconsistent account {}",
                            account.id
                        )));
                    }
                    match self
                        .store
                        .compare_and_swap(account_number, expected_version, account)
                    {
                        Ok(()) => return Ok(value),
                        Err(Error::Conflict(_)) => {
                            debug!(
                                account = %account_number,
                                attempt,
                                "lost update race, retrying"
                            );
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
        }
        Err(Error::Conflict(account_number.to_string()))
    }
}
