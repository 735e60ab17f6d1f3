use std::sync::{Arc, Barrier};
use std::thread;

use chrono::{Duration, Utc};
use proptest::prelude::*;

use vitalperks_bridge::domain::{
    Account, AccountStore, DebitOutcome, DebitRequest, EntryKind, EntryStatus, Error,
    InsurancePolicy, Money, PaymentSource, ResponseStatus, Role,
};
use vitalperks_bridge::{Config, DebitProcessor, InMemoryAccountStore, ManualClock};

const ROUTING: &str = "123456789";
const NUMBER: &str = "9876543210";

type Processor = DebitProcessor<InMemoryAccountStore, Arc<ManualClock>>;

fn units(n: i64) -> Money {
    Money::from_units(n).unwrap()
}

fn setup() -> (Processor, Arc<ManualClock>) {
    setup_with(Config::default())
}

fn setup_with(config: Config) -> (Processor, Arc<ManualClock>) {
    let store = Arc::new(InMemoryAccountStore::new());
    let account = Account::new(Role::Individual, "Alex Johnson", "alex@example.com", units(5_000))
        .with_payment_source(PaymentSource::new(ROUTING, NUMBER))
        .with_policy(InsurancePolicy::new("Blue Cross", units(450), Utc::now()));
    store.register(account).unwrap();

    let clock = Arc::new(ManualClock::new(Utc::now()));
    let processor = DebitProcessor::new(store, Arc::clone(&clock), &config);
    (processor, clock)
}

fn account(processor: &Processor) -> Account {
    processor.store().lookup(NUMBER).unwrap().unwrap()
}

fn debit(amount: Money) -> DebitRequest {
    DebitRequest::new(ROUTING, NUMBER, amount)
}

#[test]
fn premium_pull_walkthrough() {
    let (processor, _) = setup();

    let first = processor.handle_debit(&debit(units(450)));
    assert_eq!(first.status, ResponseStatus::Ok);
    assert_eq!(first.message, "Approved");
    let entry = first.transaction.unwrap();
    assert_eq!(entry.status, EntryStatus::Pending);
    assert_eq!(entry.kind, EntryKind::PremiumPayment);
    assert_eq!(entry.description, "Premium Payment to Blue Cross");
    assert_eq!(entry.points_minted(), 450);

    let after_first = account(&processor);
    assert_eq!(after_first.available_credit, units(4_550));
    assert_eq!(after_first.current_balance, units(450));
    assert_eq!(after_first.points_balance, 450);
    assert_eq!(after_first.lifetime_points, 450);

    let second = processor.handle_debit(&debit(units(450)));
    assert_eq!(second.status, ResponseStatus::Ok);
    assert_eq!(second.message, "Idempotent success (Duplicate)");
    assert!(second.transaction.is_none());

    let after_second = account(&processor);
    assert_eq!(after_second.available_credit, units(4_550));
    assert_eq!(after_second.current_balance, units(450));
    assert_eq!(after_second.points_balance, 450);
    assert_eq!(after_second.history.len(), 1);

    let third = processor.handle_debit(&debit(units(10_000)));
    assert_eq!(third.status, ResponseStatus::PaymentRequired);

    let after_third = account(&processor);
    assert_eq!(after_third.available_credit, units(4_550));
    assert_eq!(after_third.current_balance, units(450));
    assert_eq!(after_third.history.len(), 2);
    assert_eq!(after_third.history[0].status, EntryStatus::Declined);
    assert_eq!(after_third.history[0].description, "Declined: Insufficient Credit");
}

#[test]
fn duplicate_window_expires_after_sixty_seconds() {
    let (processor, clock) = setup();
    processor.authorize(&debit(units(450))).unwrap();

    clock.advance(Duration::seconds(59));
    assert!(matches!(
        processor.authorize(&debit(units(450))).unwrap(),
        DebitOutcome::Duplicate {
            status: EntryStatus::Pending,
            entry: None,
        }
    ));

    clock.advance(Duration::seconds(1));
    assert!(matches!(
        processor.authorize(&debit(units(450))).unwrap(),
        DebitOutcome::Approved(_)
    ));
    assert_eq!(account(&processor).current_balance, units(900));
}

#[test]
fn settled_entries_do_not_shadow_new_debits() {
    let (processor, _) = setup();
    processor.authorize(&debit(units(450))).unwrap();
    processor.settle_pending(NUMBER).unwrap();

    assert!(matches!(
        processor.authorize(&debit(units(450))).unwrap(),
        DebitOutcome::Approved(_)
    ));
}

#[test]
fn different_amount_is_not_a_duplicate() {
    let (processor, _) = setup();
    processor.authorize(&debit(units(450))).unwrap();
    assert!(matches!(
        processor.authorize(&debit(units(451))).unwrap(),
        DebitOutcome::Approved(_)
    ));
}

#[test]
fn unknown_account_mutates_nothing() {
    let (processor, _) = setup();
    let before = account(&processor);

    let response = processor.handle_debit(&DebitRequest::new(ROUTING, "0000000000", units(450)));
    assert_eq!(response.status, ResponseStatus::NotFound);
    assert!(response.transaction.is_none());

    let after = account(&processor);
    assert_eq!(after.version, before.version);
    assert!(after.history.is_empty());
    assert_eq!(processor.store().account_numbers().unwrap(), vec![NUMBER.to_string()]);
}

#[test]
fn history_is_reverse_chronological() {
    let (processor, clock) = setup();
    for amount in [100, 200, 300, 6_000] {
        processor.authorize(&debit(units(amount))).unwrap();
        clock.advance(Duration::seconds(1));
    }
    let account = account(&processor);
    let amounts: Vec<Money> = account.history.iter().map(|e| e.amount).collect();
    assert_eq!(amounts, vec![units(6_000), units(300), units(200), units(100)]);
    assert!(
        account
            .history
            .iter()
            .zip(account.history.iter().skip(1))
            .all(|(a, b)| a.timestamp >= b.timestamp)
    );
}

#[test]
fn keyed_replay_returns_original_outcome() {
    let (processor, clock) = setup();
    let request = debit(units(450)).with_idempotency_key("ach-trace-001");

    let DebitOutcome::Approved(original) = processor.authorize(&request).unwrap() else {
        panic!("expected approval");
    };
    assert_eq!(
        original.metadata.as_ref().unwrap().ach_trace_id.as_deref(),
        Some("ach-trace-001")
    );

    // well past the heuristic window, still inside the key TTL
    clock.advance(Duration::minutes(30));
    let replay = processor.handle_debit(&request);
    assert_eq!(replay.status, ResponseStatus::Ok);
    assert_eq!(replay.transaction.as_ref().map(|e| e.id), Some(original.id));
    assert_eq!(account(&processor).current_balance, units(450));
    assert_eq!(account(&processor).history.len(), 1);
}

#[test]
fn keyed_requests_with_distinct_keys_are_not_deduplicated() {
    let (processor, _) = setup();
    processor
        .authorize(&debit(units(450)).with_idempotency_key("a"))
        .unwrap();
    assert!(matches!(
        processor
            .authorize(&debit(units(450)).with_idempotency_key("b"))
            .unwrap(),
        DebitOutcome::Approved(_)
    ));
    assert_eq!(account(&processor).current_balance, units(900));
}

#[test]
fn keyed_decline_replays_as_decline() {
    let (processor, _) = setup();
    let request = debit(units(9_000)).with_idempotency_key("big-pull");

    assert_eq!(processor.handle_debit(&request).status, ResponseStatus::PaymentRequired);
    assert_eq!(processor.handle_debit(&request).status, ResponseStatus::PaymentRequired);
    assert_eq!(account(&processor).history.len(), 1);
}

#[test]
fn keyed_decline_replays_as_decline_after_history_rolls_over() {
    let (processor, _) = setup_with(Config {
        history_cap: Some(1),
        ..Config::default()
    });
    let request = debit(units(9_000)).with_idempotency_key("big-pull");

    assert_eq!(processor.handle_debit(&request).status, ResponseStatus::PaymentRequired);
    assert_eq!(processor.handle_debit(&debit(units(5))).status, ResponseStatus::Ok);
    assert_eq!(account(&processor).history.len(), 1);

    let replay = processor.handle_debit(&request);
    assert_eq!(replay.status, ResponseStatus::PaymentRequired);
    assert_eq!(replay.message, "Payment Required: Insufficient Credit Line");
    assert!(replay.transaction.is_none());
    assert_eq!(account(&processor).current_balance, units(5));
}

#[test]
fn unbounded_windows_treat_every_pull_as_recent() {
    let (processor, clock) = setup_with(Config {
        dedup_window_secs: i64::MAX,
        idempotency_ttl_secs: i64::MAX,
        ..Config::default()
    });
    processor.authorize(&debit(units(450))).unwrap();
    processor
        .authorize(&debit(units(100)).with_idempotency_key("k"))
        .unwrap();

    clock.advance(Duration::days(365));
    assert!(matches!(
        processor.authorize(&debit(units(450))).unwrap(),
        DebitOutcome::Duplicate { .. }
    ));
    assert!(matches!(
        processor
            .authorize(&debit(units(100)).with_idempotency_key("k"))
            .unwrap(),
        DebitOutcome::Duplicate { .. }
    ));
    assert_eq!(account(&processor).current_balance, units(550));
}

#[test]
fn expired_key_is_processed_again() {
    let (processor, clock) = setup_with(Config {
        idempotency_ttl_secs: 120,
        ..Config::default()
    });
    let request = debit(units(450)).with_idempotency_key("k");
    processor.authorize(&request).unwrap();

    clock.advance(Duration::seconds(121));
    assert!(matches!(
        processor.authorize(&request).unwrap(),
        DebitOutcome::Approved(_)
    ));
}

#[test]
fn failed_debit_restores_credit_but_not_lifetime_points() {
    let (processor, _) = setup();
    let DebitOutcome::Approved(entry) = processor.authorize(&debit(units(450))).unwrap() else {
        panic!("expected approval");
    };

    let failed = processor.fail(NUMBER, entry.id).unwrap();
    assert_eq!(failed.status, EntryStatus::Failed);

    let account = account(&processor);
    assert_eq!(account.available_credit, units(5_000));
    assert_eq!(account.current_balance, Money::ZERO);
    assert_eq!(account.points_balance, 0);
    assert_eq!(account.lifetime_points, 450);

    assert!(matches!(
        processor.settle(NUMBER, entry.id),
        Err(Error::InvalidTransition {
            from: EntryStatus::Failed,
            to: EntryStatus::Settled,
            ..
        })
    ));
}

#[test]
fn settle_keeps_balances() {
    let (processor, _) = setup();
    let DebitOutcome::Approved(entry) = processor.authorize(&debit(units(450))).unwrap() else {
        panic!("expected approval");
    };
    let settled = processor.settle(NUMBER, entry.id).unwrap();
    assert_eq!(settled.status, EntryStatus::Settled);
    assert_eq!(account(&processor).current_balance, units(450));

    let missing = vitalperks_bridge::domain::EntryId::new();
    assert!(matches!(
        processor.settle(NUMBER, missing),
        Err(Error::EntryNotFound(_))
    ));
}

#[test]
fn repayment_restores_available_credit() {
    let (processor, _) = setup();
    processor.authorize(&debit(units(450))).unwrap();

    let entry = processor.repay(NUMBER, units(200)).unwrap();
    assert_eq!(entry.kind, EntryKind::Repayment);
    assert_eq!(entry.status, EntryStatus::Settled);

    let after = account(&processor);
    assert_eq!(after.available_credit, units(4_750));
    assert_eq!(after.current_balance, units(250));
    assert_eq!(after.history[0].id, entry.id);

    assert!(matches!(
        processor.repay(NUMBER, units(251)),
        Err(Error::Overpayment { .. })
    ));
    assert!(matches!(
        processor.repay(NUMBER, Money::ZERO),
        Err(Error::InvalidAmount(_))
    ));
}

#[test]
fn concurrent_identical_debits_apply_once() {
    let (processor, _) = setup();
    let processor = Arc::new(processor);
    let workers = 8;
    let barrier = Arc::new(Barrier::new(workers));

    let outcomes: Vec<DebitOutcome> = thread::scope(|scope| {
        let handles: Vec<_> = (0..workers)
            .map(|_| {
                let processor = Arc::clone(&processor);
                let barrier = Arc::clone(&barrier);
                scope.spawn(move || {
                    barrier.wait();
                    processor.authorize(&debit(units(450))).unwrap()
                })
            })
            .collect();
        handles.into_iter().map(|h| h.join().unwrap()).collect()
    });

    let approved = outcomes
        .iter()
        .filter(|o| matches!(o, DebitOutcome::Approved(_)))
        .count();
    assert_eq!(approved, 1);
    assert_eq!(outcomes.len() - approved, workers - 1);

    let account = account(&processor);
    assert_eq!(account.current_balance, units(450));
    assert_eq!(account.history.len(), 1);
}

#[test]
fn concurrent_distinct_debits_never_overdraw() {
    // each lost race means another pull committed, so 20 retries always suffice
    let (processor, _) = setup_with(Config {
        max_cas_retries: 32,
        ..Config::default()
    });
    let processor = Arc::new(processor);

    // twenty distinct pulls of 300 against a 5000 line: at most 16 fit
    thread::scope(|scope| {
        for i in 0..20 {
            let processor = Arc::clone(&processor);
            scope.spawn(move || {
                let request = debit(units(300)).with_idempotency_key(format!("pull-{}", i));
                let response = processor.handle_debit(&request);
                assert!(matches!(
                    response.status,
                    ResponseStatus::Ok | ResponseStatus::PaymentRequired
                ));
            });
        }
    });

    let account = account(&processor);
    assert!(account.is_consistent());
    let approved = account
        .history
        .iter()
        .filter(|e| e.status == EntryStatus::Pending)
        .count() as i64;
    assert!(approved <= 16);
    assert_eq!(account.current_balance, units(300 * approved));
    assert_eq!(account.points_balance, 300 * approved as u64);
}

proptest! {
    #[test]
    fn approved_debit_moves_exactly_the_amount(minor in 1i64..=50_000_000) {
        let (processor, _) = setup();
        let amount = Money(minor);
        let before = account(&processor);

        let outcome = processor.authorize(&debit(amount)).unwrap();
        prop_assert!(matches!(outcome, DebitOutcome::Approved(_)));

        let after = account(&processor);
        let points = (minor / Money::SCALE) as u64;
        prop_assert_eq!(
            after.available_credit,
            before.available_credit.checked_sub(amount).unwrap()
        );
        prop_assert_eq!(
            after.current_balance,
            before.current_balance.checked_add(amount).unwrap()
        );
        prop_assert_eq!(after.points_balance, before.points_balance + points);
        prop_assert_eq!(after.lifetime_points, before.lifetime_points + points);
        prop_assert!(before.is_consistent());
        prop_assert!(after.is_consistent());
    }

    #[test]
    fn over_limit_debit_only_appends_a_decline(minor in 50_000_001i64..=i64::MAX / 2) {
        let (processor, _) = setup();
        let before = account(&processor);

        let response = processor.handle_debit(&debit(Money(minor)));
        prop_assert_eq!(response.status, ResponseStatus::PaymentRequired);

        let after = account(&processor);
        prop_assert_eq!(after.available_credit, before.available_credit);
        prop_assert_eq!(after.current_balance, before.current_balance);
        prop_assert_eq!(after.points_balance, before.points_balance);
        prop_assert_eq!(after.history.len(), before.history.len() + 1);
        prop_assert_eq!(after.history[0].status, EntryStatus::Declined);
    }

    #[test]
    fn repeated_debit_within_window_applies_once(minor in 1i64..=50_000_000, gap in 0i64..60) {
        let (processor, clock) = setup();
        processor.authorize(&debit(Money(minor))).unwrap();
        let once = account(&processor);

        clock.advance(Duration::seconds(gap));
        let outcome = processor.authorize(&debit(Money(minor))).unwrap();
        prop_assert!(matches!(outcome, DebitOutcome::Duplicate { .. }), "expected DebitOutcome::Duplicate");

        let twice = account(&processor);
        prop_assert_eq!(twice.available_credit, once.available_credit);
        prop_assert_eq!(twice.history.len(), once.history.len());
        prop_assert_eq!(twice.version, once.version);
    }
}
