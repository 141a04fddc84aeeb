/*!
 * Synchronization Primitives Benchmarks
 *
 * Compare plain and recursive locks, and condition variable round trips
 */

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use lockwork::{CondVar, Lock, LockType};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;

fn bench_uncontended(c: &mut Criterion) {
    let mut group = c.benchmark_group("uncontended_acquire_release");

    for lock_type in [LockType::Default, LockType::Recursive] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", lock_type)),
            &lock_type,
            |b, &lock_type| {
                let lock = Lock::new(lock_type);
                b.iter(|| {
                    lock.acquire().unwrap();
                    black_box(&lock);
                    lock.release().unwrap();
                });
            },
        );
    }

    group.finish();
}

fn bench_reentry(c: &mut Criterion) {
    let mut group = c.benchmark_group("recursive_reentry");

    for depth in [1usize, 4, 16] {
        group.bench_with_input(BenchmarkId::from_parameter(depth), &depth, |b, &depth| {
            let lock = Lock::new(LockType::Recursive);
            b.iter(|| {
                for _ in 0..depth {
                    lock.acquire().unwrap();
                }
                for _ in 0..depth {
                    lock.release().unwrap();
                }
            });
        });
    }

    group.finish();
}

fn bench_contended(c: &mut Criterion) {
    let mut group = c.benchmark_group("contended_acquire_release");

    for lock_type in [LockType::Default, LockType::Recursive] {
        for threads in [2, 4] {
            group.bench_with_input(
                BenchmarkId::new(format!("{:?}", lock_type), threads),
                &threads,
                |b, &threads| {
                    b.iter(|| {
                        let lock = Arc::new(Lock::new(lock_type));
                        let handles: Vec<_> = (0..threads)
                            .map(|_| {
                                let lock = lock.clone();
                                thread::spawn(move || {
                                    for _ in 0..1_000 {
                                        let _guard = lock.lock().unwrap();
                                    }
                                })
                            })
                            .collect();

                        for handle in handles {
                            handle.join().unwrap();
                        }
                    });
                },
            );
        }
    }

    group.finish();
}

fn bench_condvar_ping_pong(c: &mut Criterion) {
    let mut group = c.benchmark_group("condvar_ping_pong");

    for lock_type in [LockType::Default, LockType::Recursive] {
        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", lock_type)),
            &lock_type,
            |b, &lock_type| {
                b.iter(|| {
                    let lock = Arc::new(Lock::new(lock_type));
                    let cv = Arc::new(CondVar::default());
                    let turn = Arc::new(AtomicBool::new(false));

                    let peer = {
                        let lock = lock.clone();
                        let cv = cv.clone();
                        let turn = turn.clone();
                        thread::spawn(move || {
                            for _ in 0..100 {
                                let guard = lock.lock().unwrap();
                                cv.wait_while(guard.lock(), None, || !turn.load(Ordering::Relaxed))
                                    .unwrap();
                                turn.store(false, Ordering::Relaxed);
                                cv.signal();
                            }
                        })
                    };

                    for _ in 0..100 {
                        let guard = lock.lock().unwrap();
                        turn.store(true, Ordering::Relaxed);
                        cv.signal();
                        cv.wait_while(guard.lock(), None, || turn.load(Ordering::Relaxed))
                            .unwrap();
                    }

                    peer.join().unwrap();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_uncontended,
    bench_reentry,
    bench_contended,
    bench_condvar_ping_pong
);
criterion_main!(benches);
