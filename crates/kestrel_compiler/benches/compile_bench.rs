//! Benchmark harness for the kestrel back end.
//!
//! Uses criterion for reliable benchmarking.
//! Run with: cargo bench -p kestrel_compiler

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use kestrel_ast::builder::{self, *};
use kestrel_ast::Node;
use kestrel_checker::analyze;
use kestrel_compiler::{compile_tree, parse_tree, Program};
use kestrel_emitter::{generate, GeneratorOptions};
use kestrel_options::CompilerOptions;

const FULL_PROGRAM: &str = include_str!("../../../tests/fixtures/full_program.json");

/// Synthesize a program with `function_count` small functions and a main body
/// of `statements` declarations, loops and calls.
fn generate_large_tree(function_count: usize, statements: usize) -> Node {
    let fns = (0..function_count)
        .map(|i| {
            function(
                &format!("f{}", i),
                ty("int"),
                vec![param("a", ty("int")), param("b", ty("int"))],
                block(vec![
                    local_decl("t", ty("int"), Some(binary("*", ident("a"), ident("b")))),
                    ret(Some(binary("+", ident("t"), binary("%", ident("a"), int(7))))),
                ]),
            )
        })
        .collect();

    let mut body = Vec::new();
    for i in 0..statements {
        let name = format!("v{}", i);
        body.push(local_decl(&name, ty("int"), Some(int(i as i64))));
        body.push(counting_loop(
            local_decl("k", ty("int"), Some(int(0))),
            binary("<", ident("k"), int(3)),
            unary("++", ident("k")),
            block(vec![assign(
                &name,
                binary("+", ident(&name), call(&format!("f{}", i % function_count.max(1)), vec![ident("k"), int(2)])),
            )]),
        ));
        body.push(ident(&name));
    }

    program(vec![
        globals(vec![global_decl("total", ty("int"), Some(int(0)))]),
        builder::functions(fns),
        builder::main(block(body)),
    ])
}

fn bench_fixture(c: &mut Criterion) {
    let tree = parse_tree("bench.json", FULL_PROGRAM).unwrap();
    let options = CompilerOptions::default();

    c.bench_function("parse_fixture", |b| {
        b.iter(|| parse_tree("bench.json", black_box(FULL_PROGRAM)).unwrap());
    });

    c.bench_function("compile_fixture", |b| {
        b.iter(|| compile_tree(black_box(&tree), &options));
    });
}

// ============================================================================
// Phase Benchmarks
// ============================================================================

fn bench_phases(c: &mut Criterion) {
    let mut group = c.benchmark_group("phases");
    let tree = generate_large_tree(20, 100);

    group.bench_function("analyze", |b| {
        b.iter(|| analyze(black_box(&tree)));
    });

    let analysis = analyze(&tree);
    assert!(analysis.diagnostics.is_empty());
    group.bench_function("generate", |b| {
        b.iter(|| generate(black_box(&tree), &analysis.symbols, GeneratorOptions::default()).unwrap());
    });

    group.finish();
}

// ============================================================================
// Compile (Program) Benchmarks
// ============================================================================

fn bench_program_compile(c: &mut Criterion) {
    let mut group = c.benchmark_group("program_compile");
    let tree = generate_large_tree(10, 50);

    group.bench_function("single_unit", |b| {
        b.iter(|| {
            let mut program = Program::new(vec![], CompilerOptions::default());
            program.add_unit("bench.json", tree.clone());
            black_box(program.compile())
        });
    });

    group.bench_function("multiple_units", |b| {
        b.iter(|| {
            let mut program = Program::new(vec![], CompilerOptions::default());
            for i in 0..16 {
                program.add_unit(format!("unit_{}.json", i), tree.clone());
            }
            black_box(program.compile())
        });
    });

    group.finish();
}

// ============================================================================
// Scaling Benchmarks
// ============================================================================

fn bench_scaling(c: &mut Criterion) {
    let mut group = c.benchmark_group("scaling");
    let options = CompilerOptions::default();

    for size in [10, 50, 100, 200] {
        let tree = generate_large_tree(size / 5, size);
        group.bench_with_input(BenchmarkId::new("statements", size), &tree, |b, tree| {
            b.iter(|| compile_tree(black_box(tree), &options));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_fixture, bench_phases, bench_program_compile, bench_scaling);
criterion_main!(benches);
