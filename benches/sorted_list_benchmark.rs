use concord::FineGrainedSortedList;
use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use parking_lot::Mutex;
use std::thread;

const INSERTS: u64 = 2_000;

/// Deterministic xorshift stream so every run inserts the same values.
fn values(seed: u64, count: u64) -> Vec<i64> {
    let mut x = seed | 1;
    (0..count)
        .map(|_| {
            x ^= x << 13;
            x ^= x >> 7;
            x ^= x << 17;
            (x % 100_000) as i64
        })
        .collect()
}

/// One lock around a descending `Vec`, scanned the same way the list is walked.
fn global_insert(list: &Mutex<Vec<i64>>, value: i64) {
    let mut list = list.lock();
    let at = list.iter().position(|&v| v <= value).unwrap_or(list.len());
    list.insert(at, value);
}

fn bench_insert(c: &mut Criterion) {
    let mut group = c.benchmark_group("sorted_list_insert");
    group.sample_size(20);
    group.throughput(Throughput::Elements(INSERTS));

    for threads in [1u64, 2, 4, 8] {
        let batches: Vec<Vec<i64>> = (0..threads).map(|t| values(t + 1, INSERTS / threads)).collect();

        group.bench_with_input(BenchmarkId::new("hand_over_hand", threads), &batches, |b, batches| {
            b.iter(|| {
                let list = FineGrainedSortedList::new();
                thread::scope(|s| {
                    for batch in batches {
                        let list = &list;
                        s.spawn(move || {
                            for &v in batch {
                                list.insert(v);
                            }
                        });
                    }
                });
                list
            })
        });

        group.bench_with_input(BenchmarkId::new("global_lock", threads), &batches, |b, batches| {
            b.iter(|| {
                let list = Mutex::new(Vec::new());
                thread::scope(|s| {
                    for batch in batches {
                        let list = &list;
                        s.spawn(move || {
                            for &v in batch {
                                global_insert(list, v);
                            }
                        });
                    }
                });
                list
            })
        });
    }

    group.finish();
}

criterion_group!(benches, bench_insert);
criterion_main!(benches);
