//! Flattening throughput on generated libraries

use criterion::{black_box, criterion_group, criterion_main, BatchSize, BenchmarkId, Criterion};
use diagnostics::SourceMap;
use idlc::{Compilation, CompilationConfig};
use raw_ast::builder::FileBuilder;
use raw_ast::File;

/// `count` structs, each embedding the previous one, so the sort has a
/// chain as long as the library.
fn generate_struct_chain(source_map: &mut SourceMap, count: usize) -> File {
    let mut f = FileBuilder::in_source_map(source_map, "chain.fidl", "bench.chain");
    for i in 0..count {
        let mut members = vec![f.struct_member(f.ty("uint32"), "value")];
        if i > 0 {
            members.push(f.struct_member(f.ty(&format!("Link{}", i - 1)), "previous"));
        }
        f.push(f.struct_decl(&format!("Link{}", i), members));
    }
    f.finish()
}

/// One protocol with `count` methods, each with a request and response
fn generate_wide_protocol(source_map: &mut SourceMap, count: usize) -> File {
    let mut f = FileBuilder::in_source_map(source_map, "wide.fidl", "bench.wide");
    let methods = (0..count)
        .map(|i| {
            f.method(
                &format!("Method{}", i),
                Some(vec![f.param(f.ty("string").with_size(f.num("64")), "name")]),
                Some(vec![f.param(f.ty("vector").with_arg(f.ty("uint8")), "data")]),
            )
        })
        .collect();
    f.push(f.protocol("Wide", &[], methods));
    f.finish()
}

/// Many independent enums and constants referencing them
fn generate_constants(source_map: &mut SourceMap, count: usize) -> File {
    let mut f = FileBuilder::in_source_map(source_map, "consts.fidl", "bench.consts");
    for i in 0..count {
        let members = vec![
            f.enum_member("A", f.num("1")),
            f.enum_member("B", f.num("2")),
            f.enum_member("C", f.num("3")),
        ];
        f.push(f.enum_decl(&format!("Enum{}", i), Some(f.ty("uint16")), members));
        f.push(f.const_decl(
            &format!("CONST{}", i),
            f.ty("uint32"),
            f.const_ref(&format!("Enum{}.C", i)),
        ));
    }
    f.finish()
}

fn compile(source_map: SourceMap, file: File) -> bool {
    let mut compilation = Compilation::new(source_map, CompilationConfig::default());
    compilation.compile_library(vec![file]).is_ok()
}

fn bench_generated(
    c: &mut Criterion,
    group_name: &str,
    sizes: &[usize],
    generate: fn(&mut SourceMap, usize) -> File,
) {
    let mut group = c.benchmark_group(group_name);
    for &size in sizes {
        group.bench_with_input(BenchmarkId::from_parameter(size), &size, |b, &size| {
            b.iter_batched(
                || {
                    let mut source_map = SourceMap::new();
                    let file = generate(&mut source_map, size);
                    (source_map, file)
                },
                |(source_map, file)| black_box(compile(source_map, file)),
                BatchSize::SmallInput,
            );
        });
    }
    group.finish();
}

fn benchmark_struct_chain(c: &mut Criterion) {
    bench_generated(c, "struct_chain", &[10, 100, 500], generate_struct_chain);
}

fn benchmark_wide_protocol(c: &mut Criterion) {
    bench_generated(c, "wide_protocol", &[10, 100, 500], generate_wide_protocol);
}

fn benchmark_constants(c: &mut Criterion) {
    bench_generated(c, "constants", &[10, 100, 1000], generate_constants);
}

criterion_group!(
    benches,
    benchmark_struct_chain,
    benchmark_wide_protocol,
    benchmark_constants
);
criterion_main!(benches);
