// Pepasm - Symbol resolution and linkage core for a two-unit Pep/10 assembler
// Copyright (C) 2026  Marcel Joachim Kloubert <marcel@kloubert.dev>
//
// This program is free software: you can redistribute it and/or modify
// it under the terms of the GNU Affero General Public License as published by
// the Free Software Foundation, either version 3 of the License, or
// (at your option) any later version.
//
// This program is distributed in the hope that it will be useful,
// but WITHOUT ANY WARRANTY; without even the implied warranty of
// MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
// GNU Affero General Public License for more details.
//
// You should have received a copy of the GNU Affero General Public License
// along with this program.  If not, see <https://www.gnu.org/licenses/>.

//! Performance benchmarks for the Pepasm assembler.
//!
//! Run with: cargo bench
//!
//! Results are saved to target/criterion/ with HTML reports.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use pepasm::symbol::{fork, LocationKind, SymbolStore, TableId, Value};
use pepasm::AsmDriver;

const SIZES: &[(&str, usize)] = &[("small", 16), ("medium", 256), ("large", 2048)];

// ============================================================================
// Benchmark Inputs
// ============================================================================

/// An operating system exporting `count` entry points, each with a loop.
fn os_source(count: usize) -> String {
    let mut text = String::new();
    for i in 0..count {
        text.push_str(&format!(".EXPORT entry{}\n", i));
    }
    for i in 0..count {
        text.push_str(&format!("entry{i}: LDWA {i},i\nloop{i}: SUBA 1,i\nBRNE loop{i}\n@DECO {i},i\nRET\n", i = i));
    }
    text
}

/// A user program calling every operating system entry point.
fn user_source(count: usize) -> String {
    let mut text = String::new();
    for i in 0..count {
        text.push_str(&format!(".IMPORT entry{}\n", i));
    }
    text.push_str("main: NOP\n");
    for i in 0..count {
        text.push_str(&format!("CALL entry{}\n", i));
    }
    text.push_str("RET\n");
    text
}

/// A root with `count` child scopes, each holding a few symbols, one of
/// them imported from the root.
fn scoped_store(count: usize) -> (SymbolStore, TableId) {
    let mut store = SymbolStore::new();
    let root = store.add_root(2);
    let shared = store.define(root, "shared").unwrap();
    store.mark_global(root, "shared").unwrap();
    store
        .set_value(shared, Value::location(2, 2, 0x100, LocationKind::Object))
        .unwrap();

    for i in 0..count {
        let scope = store.add_child(root).unwrap();
        for name in ["top", "next", "done"] {
            let id = store.define(scope, name).unwrap();
            store
                .set_value(id, Value::location(1, 2, i as u64, LocationKind::Code))
                .unwrap();
        }
        store.reference(scope, "shared").unwrap();
    }
    (store, root)
}

// ============================================================================
// Symbol Table Benchmarks
// ============================================================================

fn bench_symbols(c: &mut Criterion) {
    let mut group = c.benchmark_group("symbols");

    for &(label, count) in SIZES {
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("define_and_import", label), &count, |b, &count| {
            b.iter(|| scoped_store(black_box(count)))
        });

        let (store, root) = scoped_store(count);
        let aliases: Vec<_> = store
            .table(root)
            .map(|t| t.children().to_vec())
            .unwrap_or_default()
            .into_iter()
            .filter_map(|scope| store.get(scope, "shared"))
            .collect();
        group.bench_with_input(BenchmarkId::new("resolve", label), &aliases, |b, aliases| {
            b.iter(|| {
                aliases
                    .iter()
                    .map(|&id| store.resolve(black_box(id)).value())
                    .sum::<u64>()
            })
        });
    }

    group.finish();
}

// ============================================================================
// Fork Benchmarks
// ============================================================================

fn bench_fork(c: &mut Criterion) {
    let mut group = c.benchmark_group("fork");

    for &(label, count) in SIZES {
        let (store, root) = scoped_store(count);
        group.throughput(Throughput::Elements(count as u64));
        group.bench_with_input(BenchmarkId::new("fork_tree", label), &store, |b, store| {
            b.iter_batched(
                || store.clone(),
                |mut store| fork(&mut store, black_box(root)),
                criterion::BatchSize::LargeInput,
            )
        });
    }

    group.finish();
}

// ============================================================================
// End-to-End Assembly Benchmarks
// ============================================================================

fn bench_assemble(c: &mut Criterion) {
    let driver = AsmDriver::default();
    let mut group = c.benchmark_group("assemble");

    for &(label, count) in SIZES {
        let os = os_source(count);
        let user = user_source(count);

        group.throughput(Throughput::Bytes((os.len() + user.len()) as u64));
        group.bench_with_input(
            BenchmarkId::new("os_and_user", label),
            &(os, user),
            |b, (os, user)| b.iter(|| driver.assemble(black_box(os), Some(black_box(user)))),
        );
    }

    group.finish();
}

criterion_group!(benches, bench_symbols, bench_fork, bench_assemble);
criterion_main!(benches);
