//! Performance Benchmarks for the CLOAK Hook
//!
//! Run with: cargo bench

use std::sync::Arc;

use criterion::{criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion, Throughput};
use cloak::{CloakRuntime, RuntimeConfig};
use cloak_defi::{
    CallContext, ConfidentialLiquidityHook, EventLog, HookConfig, HostCallbacks, PoolId, PoolKey,
    TrackingMode, DEFAULT_HOOK_ADDRESS,
};
use cloak_fhe::{Address, ClearBackend, Coprocessor, DecryptionOracle, FheCoprocessor, OracleConfig, TransactionScope};

const OWNER: Address = Address::repeat_byte(0xa1);

fn pool_key(fee: u32) -> PoolKey {
    PoolKey::new(
        Address::repeat_byte(1),
        Address::repeat_byte(2),
        fee,
        60,
        DEFAULT_HOOK_ADDRESS,
    )
    .unwrap()
}

fn clear_hook(
    tracking: TrackingMode,
) -> (
    ConfidentialLiquidityHook<FheCoprocessor<ClearBackend>, EventLog>,
    DecryptionOracle<ClearBackend>,
    PoolId,
) {
    let cop = Arc::new(FheCoprocessor::new(ClearBackend));
    let oracle = DecryptionOracle::new(Arc::clone(&cop), OracleConfig::default());
    let mut hook = ConfidentialLiquidityHook::new(
        HookConfig::default().with_tracking(tracking),
        cop,
        EventLog::new(),
    );
    let pool_id = hook
        .on_pool_initialized(&CallContext::new(OWNER, OWNER), &pool_key(3000))
        .unwrap();
    (hook, oracle, pool_id)
}

// =============================================================================
// COPROCESSOR BENCHMARKS
// =============================================================================

fn bench_coprocessor_ops(c: &mut Criterion) {
    let mut group = c.benchmark_group("coprocessor_clear");
    let cop = Arc::new(FheCoprocessor::new(ClearBackend));
    let scope = TransactionScope::begin(&cop, DEFAULT_HOOK_ADDRESS);
    let a = scope.encrypt_magnitude(1_000).unwrap();
    let b = scope.encrypt_magnitude(250).unwrap();
    scope.grant_compute_rights(&a).unwrap();
    scope.grant_compute_rights(&b).unwrap();

    group.bench_function("encrypt", |bench| {
        bench.iter(|| cop.encrypt_magnitude(&DEFAULT_HOOK_ADDRESS, 42).unwrap())
    });
    group.bench_function("add", |bench| {
        bench.iter(|| cop.add(&DEFAULT_HOOK_ADDRESS, &a, &b).unwrap())
    });
    group.bench_function("sub", |bench| {
        bench.iter(|| cop.sub(&DEFAULT_HOOK_ADDRESS, &a, &b).unwrap())
    });
    group.bench_function("poll", |bench| bench.iter(|| cop.poll_decryption(&a)));

    group.finish();
}

// =============================================================================
// HOOK BENCHMARKS
// =============================================================================

fn bench_liquidity_tracking(c: &mut Criterion) {
    let mut group = c.benchmark_group("liquidity_tracking");

    for tracking in [TrackingMode::Token0Only, TrackingMode::Symmetric] {
        let (mut hook, _oracle, pool_id) = clear_hook(tracking);
        let mut delta = 1i128;

        group.bench_with_input(
            BenchmarkId::from_parameter(format!("{:?}", tracking)),
            &pool_id,
            |b, pool_id| {
                b.iter(|| {
                    delta = -delta;
                    hook.on_liquidity_will_change(pool_id, delta * 1_000).unwrap()
                })
            },
        );
    }

    group.finish();
}

fn bench_disclosure_round_trip(c: &mut Criterion) {
    let mut group = c.benchmark_group("disclosure_round_trip");

    group.bench_function("request_fulfil_retrieve_reset", |b| {
        let (mut hook, oracle, pool_id) = clear_hook(TrackingMode::Token0Only);
        hook.on_liquidity_will_change(&pool_id, 750).unwrap();

        b.iter(|| {
            hook.request_decryption(&pool_id, &OWNER).unwrap();
            oracle.fulfill_all();
            let totals = hook.get_decrypted_metrics(&pool_id).unwrap();
            hook.reset_tracking(&pool_id, &OWNER).unwrap();
            totals
        })
    });

    group.finish();
}

fn bench_oracle_batch(c: &mut Criterion) {
    let mut group = c.benchmark_group("oracle_fulfil");

    for pools in [1u32, 8, 32] {
        group.throughput(Throughput::Elements(pools as u64 * 2));
        group.bench_with_input(BenchmarkId::from_parameter(pools), &pools, |b, &pools| {
            b.iter_batched(
                || {
                    let runtime = CloakRuntime::clear(RuntimeConfig::default());
                    for i in 1..=pools {
                        let pool_id = runtime
                            .initialize_pool(&CallContext::new(OWNER, OWNER), &pool_key(i))
                            .unwrap();
                        runtime.request_decryption(&pool_id, &OWNER).unwrap();
                    }
                    runtime
                },
                |runtime| runtime.fulfill_now(),
                BatchSize::SmallInput,
            )
        });
    }

    group.finish();
}

// =============================================================================
// TFHE BENCHMARKS
// =============================================================================

#[cfg(feature = "tfhe")]
fn bench_tfhe_update(c: &mut Criterion) {
    use cloak_fhe::{FHEConfig, TfheBackend};

    let mut group = c.benchmark_group("tfhe_update");
    group.sample_size(10);

    let backend = TfheBackend::new(&FHEConfig::default()).unwrap();
    let cop = Arc::new(FheCoprocessor::new(backend));
    let scope = TransactionScope::begin(&cop, DEFAULT_HOOK_ADDRESS);
    let total = scope.encrypt_magnitude(10_000).unwrap();
    let delta = scope.encrypt_magnitude(250).unwrap();

    group.bench_function("add", |b| b.iter(|| scope.add(&total, &delta).unwrap()));
    group.bench_function("sub", |b| b.iter(|| scope.sub(&total, &delta).unwrap()));

    group.finish();
}

#[cfg(not(feature = "tfhe"))]
fn bench_tfhe_update(_c: &mut Criterion) {}

criterion_group!(
    coprocessor_benches,
    bench_coprocessor_ops,
);

criterion_group!(
    hook_benches,
    bench_liquidity_tracking,
    bench_disclosure_round_trip,
    bench_oracle_batch,
);

criterion_group!(
    tfhe_benches,
    bench_tfhe_update,
);

criterion_main!(coprocessor_benches, hook_benches, tfhe_benches);
