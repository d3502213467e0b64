//! Benchmarks for the overhead of calling host operations through a dispatch
//! table.
//!
//! - A direct call of the host function, the baseline
//! - Resolution through a bare table view
//! - Calls through a session handle, which also checks the session state

#![allow(missing_docs, clippy::must_use_candidate)]

use std::hint::black_box;

use criterion::{Criterion, criterion_group, criterion_main};
use ext_nif_rs::{
    dispatch_table,
    session::{Session, SessionCell},
    table::DispatchTable,
};

dispatch_table! {
    pub struct BenchCallbacks;
    pub struct BenchApi;
    prefix = "bench_";

    fn noop();
    fn add(a: i64, b: i64) -> i64;
}

unsafe extern "C" fn noop() {}

#[inline(never)]
unsafe extern "C" fn add(a: i64, b: i64) -> i64 {
    a.wrapping_add(b)
}

fn table() -> DispatchTable<BenchCallbacks> {
    DispatchTable::<BenchCallbacks>::builder()
        .populate(BenchCallbacks::noop, noop)
        .and_then(|b| b.populate(BenchCallbacks::add, add))
        .and_then(|b| b.build())
        .expect("bench table")
}

fn bench_call_overhead(c: &mut Criterion) {
    let table = table();
    let cell = SessionCell::new();
    let session = Session::bind(table.table_ref(), &cell, 2).expect("bind");
    session.activate();
    let api = BenchApi::from(session.handle());
    let view = table.table_ref();

    let mut group = c.benchmark_group("call_overhead");

    group.bench_function("add_direct", |b| {
        b.iter(|| unsafe { add(black_box(20), black_box(22)) });
    });

    group.bench_function("add_table_ref", |b| {
        b.iter(|| {
            view.invoke(BenchCallbacks::add, |f| unsafe {
                f(black_box(20), black_box(22))
            })
        });
    });

    group.bench_function("add_session", |b| {
        b.iter(|| unsafe { api.add(black_box(20), black_box(22)) });
    });

    group.bench_function("noop_session", |b| {
        b.iter(|| unsafe { api.noop() });
    });

    group.finish();
}

criterion_group!(benches, bench_call_overhead);
criterion_main!(benches);
