use concord::concurrency::try_lock_for;
use concord::coordination::{Account, Auditor, LockOrdering};
use concord::{AccountId, Bank, ReentrantMutex, TransferError};
use proptest::prelude::*;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Barrier;
use std::thread;
use std::time::Duration;

const PATIENCE: Duration = Duration::from_millis(100);

/// Runs one thread per `(first, second)` pair: take `first`, meet the others,
/// try `second` for a while, meet again, release. Returns how many threads
/// held both locks at once.
fn threads_holding_both<T: Send>(orders: &[(&ReentrantMutex<T>, &ReentrantMutex<T>)]) -> usize {
    let took_first = Barrier::new(orders.len());
    let decided = Barrier::new(orders.len());
    let winners = AtomicUsize::new(0);

    thread::scope(|s| {
        for &(first, second) in orders {
            let (took_first, decided, winners) = (&took_first, &decided, &winners);
            s.spawn(move || {
                let first = try_lock_for(first, PATIENCE);
                took_first.wait();
                let second = first.as_ref().and_then(|_| try_lock_for(second, PATIENCE));
                if second.is_some() {
                    winners.fetch_add(1, Ordering::SeqCst);
                }
                decided.wait();
            });
        }
    });
    winners.load(Ordering::SeqCst)
}

fn opposite_transfers(bank: &Bank) -> usize {
    let (a, b) = (&bank.accounts()[0], &bank.accounts()[1]);
    let [a1, a2] = bank.acquisition_order(a, b);
    let [b1, b2] = bank.acquisition_order(b, a);
    threads_holding_both(&[(a1.lock(), a2.lock()), (b1.lock(), b2.lock())])
}

#[test]
fn test_caller_order_deadlocks_on_opposite_transfers() {
    let bank = Bank::with_balances(&[100, 100]).ordered_by(LockOrdering::CallerOrder);
    assert_eq!(opposite_transfers(&bank), 0, "each transfer should hold one lock and wait for the other");
}

#[test]
fn test_id_order_lets_one_transfer_through() {
    let bank = Bank::with_balances(&[100, 100]);
    assert!(opposite_transfers(&bank) >= 1);
}

#[test]
fn test_six_transfers_preserve_total() {
    let bank = Bank::with_balances(&[100, 200, 300, 400]);
    let ids = [AccountId(1), AccountId(2), AccountId(3), AccountId(4)];
    let moves = [(0, 1), (1, 2), (2, 3), (3, 0), (1, 0), (2, 1)];

    thread::scope(|s| {
        for &(from, to) in &moves {
            let bank = &bank;
            s.spawn(move || {
                let outcome = bank.transfer_by_id(ids[from], ids[to], 100).unwrap();
                if let Err(err) = outcome {
                    assert!(matches!(err, TransferError::InsufficientFunds { .. }), "{err}");
                }
            });
        }
    });

    assert_eq!(bank.total(), 1_000);
    for account in bank.accounts() {
        assert!((0..=1_000).contains(&account.balance()), "{account:?}");
    }
}

#[test]
fn test_bidirectional_stress_finishes() {
    let bank = Bank::with_balances(&[10_000, 10_000, 10_000]);
    let committed = AtomicUsize::new(0);

    thread::scope(|s| {
        for t in 0..6 {
            let (bank, committed) = (&bank, &committed);
            s.spawn(move || {
                let accounts = bank.accounts();
                for i in 0..2_000 {
                    let from = &accounts[(t + i) % 3];
                    let to = &accounts[(t + i + 1 + t % 2) % 3];
                    if bank.transfer(from, to, 1 + (i as i64 % 7)).is_ok() {
                        committed.fetch_add(1, Ordering::Relaxed);
                    }
                }
            });
        }
        s.spawn(|| {
            for _ in 0..200 {
                let report = Auditor::new(&bank).audit();
                assert!(report.balances.iter().all(|&(_, b)| b >= 0));
            }
        });
    });

    assert_eq!(bank.total(), 30_000);
    assert!(committed.load(Ordering::Relaxed) > 0);
    assert_eq!(Auditor::new(&bank).audit().total, 30_000);
}

#[test]
fn test_rejections_do_not_touch_balances() {
    let bank = Bank::new(vec![Account::new(AccountId(7), 50), Account::new(AccountId(3), 0)]);
    let (a, b) = (&bank.accounts()[0], &bank.accounts()[1]);

    assert_eq!(bank.transfer(a, b, 0), Err(TransferError::NonPositiveAmount(0)));
    assert_eq!(bank.transfer(a, a, 10), Err(TransferError::SelfTransfer(AccountId(7))));
    assert_eq!(
        bank.transfer(b, a, 1),
        Err(TransferError::InsufficientFunds {
            account: AccountId(3),
            balance: 0,
            requested: 1
        })
    );
    assert!(bank.transfer_by_id(AccountId(7), AccountId(99), 1).is_none());
    assert_eq!((a.balance(), b.balance()), (50, 0));
    assert!(!a.lock().is_locked() && !b.lock().is_locked());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn test_transfers_conserve_money(
        balances in proptest::collection::vec(0i64..500, 2..6),
        transfers in proptest::collection::vec((0usize..6, 0usize..6, -5i64..200), 1..40),
    ) {
        let bank = Bank::with_balances(&balances);
        let total: i64 = balances.iter().sum();
        let n = balances.len();

        thread::scope(|s| {
            for chunk in transfers.chunks(10) {
                let bank = &bank;
                s.spawn(move || {
                    for &(from, to, amount) in chunk {
                        let accounts = bank.accounts();
                        let _ = bank.transfer(&accounts[from % n], &accounts[to % n], amount);
                    }
                });
            }
        });

        prop_assert_eq!(bank.total(), total);
        prop_assert!(bank.accounts().iter().all(|a| a.balance() >= 0));
    }
}
