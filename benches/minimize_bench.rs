//! Benchmarks for minimization and program transformation.
//!
//! Run with: `cargo bench`

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use symlog::{
    build_program,
    ddmin::{ddmin, ddmin_all, Outcome},
    transform::transform,
    BaseType, Fact, Literal, Rule, SymbolAllocator, Term,
};

/// Passes when every element of `culprits` is present.
fn needs(culprits: &[u32]) -> impl Fn(&[u32]) -> Outcome + '_ {
    move |candidate| culprits.iter().all(|c| candidate.contains(c)).into()
}

fn bench_ddmin(c: &mut Criterion) {
    let mut group = c.benchmark_group("ddmin");
    for size in [16u32, 64, 256] {
        let elements: Vec<u32> = (0..size).collect();
        let culprits = [1, size / 2, size - 1];
        group.bench_with_input(BenchmarkId::new("elements", size), &size, |b, _| {
            b.iter(|| black_box(ddmin(&elements, needs(&culprits))))
        });
    }
    group.finish();
}

fn bench_ddmin_all(c: &mut Criterion) {
    let mut group = c.benchmark_group("ddmin_all");
    for alternatives in [2u32, 4, 8] {
        let elements: Vec<u32> = (0..alternatives * 2).collect();
        // Pairs {0, 1}, {2, 3}, ... each trigger on their own.
        let test = |candidate: &[u32]| -> Outcome {
            (0..alternatives)
                .any(|i| candidate.contains(&(2 * i)) && candidate.contains(&(2 * i + 1)))
                .into()
        };
        group.bench_with_input(
            BenchmarkId::new("alternatives", alternatives),
            &alternatives,
            |b, _| b.iter(|| black_box(ddmin_all(&elements, test))),
        );
    }
    group.finish();
}

fn bench_transform(c: &mut Criterion) {
    let mut group = c.benchmark_group("transform");
    for symbols in [1usize, 4, 16] {
        let allocator = SymbolAllocator::new();
        let rule = Rule::new(
            Literal::new("t", [Term::var("X"), Term::var("Z")]),
            [
                Literal::new("r", [Term::var("X"), Term::var("Y")]),
                Literal::new("s", [Term::var("Y"), Term::var("Z")]),
            ],
        );
        let mut facts: Vec<Fact> = (0..symbols)
            .map(|i| {
                let sym = allocator.fresh(BaseType::Symbol).unwrap();
                Fact::new(Literal::new(
                    "r",
                    [Term::Symbolic(sym), Term::string(&format!("k{}", i))],
                ))
            })
            .collect();
        facts.extend((0..64).map(|i| {
            Fact::new(Literal::new(
                "s",
                [Term::string(&format!("k{}", i % 16)), Term::number(i)],
            ))
        }));
        let program = build_program([rule], facts).unwrap();

        group.bench_with_input(BenchmarkId::new("symbols", symbols), &symbols, |b, _| {
            b.iter(|| black_box(transform(&program).unwrap()))
        });
    }
    group.finish();
}

criterion_group!(benches, bench_ddmin, bench_ddmin_all, bench_transform);
criterion_main!(benches);
