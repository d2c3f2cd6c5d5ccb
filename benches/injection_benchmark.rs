//! Benchmark for building injected documents.
//!
//! Measures registrar sessions (decode, parse, leaf patching, registration)
//! and token projection for host files with a growing number of escaped
//! string literals.

use std::hint::black_box;
use std::sync::Arc;

use criterion::{BenchmarkId, Criterion, criterion_group, criterion_main};
use utsushi::document::TextDocument;
use utsushi::escaper::EscaperKind;
use utsushi::host::{HostDocument, OutlineHostFile};
use utsushi::language::{PlainTextLexer, PlainTextParser};
use utsushi::{
    Cancellation, ElementId, HostFile, InjectedLexer, InjectionCache, InjectionPolicy, InjectionRequest,
    InjectionSettings, LanguageRegistry, Placement,
};

/// Generate a host file with N escaped SQL literals, one per line.
fn generate_host(num_literals: usize) -> (OutlineHostFile, Vec<ElementId>) {
    let mut source = String::with_capacity(num_literals * 64);
    let mut ranges = Vec::with_capacity(num_literals);
    for i in 0..num_literals {
        source.push_str("db.query(");
        let start = source.len();
        source.push_str(&format!(
            "\"select \\\"col_{}\\\" from t_{} where id = {}\\n\"",
            i, i, i
        ));
        ranges.push(start..source.len());
        source.push_str(");\n");
    }

    let document: Arc<dyn HostDocument> = Arc::new(TextDocument::new(source));
    let url = url::Url::parse("file:///bench/queries.rs").unwrap();
    let mut builder = OutlineHostFile::builder(url, document);
    let root = builder.root();
    let hosts = ranges
        .into_iter()
        .map(|range| builder.host(root, range, "string", EscaperKind::Backslash))
        .collect();
    (builder.build(), hosts)
}

fn setup_cache() -> InjectionCache {
    let registry = Arc::new(LanguageRegistry::new());
    registry.register_parser("sql", Arc::new(PlainTextParser));
    registry.register_lexer("sql", Arc::new(PlainTextLexer));
    let policy: Arc<dyn InjectionPolicy> =
        Arc::new(|file: &dyn HostFile, element: ElementId| {
            file.injection_host(element)
                .map(|host| vec![InjectionRequest::new("sql", vec![Placement::whole(host)])])
                .unwrap_or_default()
        });
    InjectionCache::new(registry, policy, InjectionSettings::default())
}

fn benchmark_injection(c: &mut Criterion) {
    let _ = env_logger::builder().is_test(true).try_init();
    let mut group = c.benchmark_group("injection");

    for num_literals in [10, 100, 500].iter() {
        let (file, hosts) = generate_host(*num_literals);

        // Cold: every lookup runs a registrar session
        group.bench_with_input(
            BenchmarkId::new("cold_lookup", num_literals),
            &(&file, &hosts),
            |b, (file, hosts)| {
                b.iter(|| {
                    let cache = setup_cache();
                    let cancel = Cancellation::new();
                    for host in hosts.iter() {
                        cache
                            .injected_documents(*file, *host, &cancel)
                            .expect("injection succeeds");
                    }
                })
            },
        );

        // Warm: lookups hit the cache at an unchanged stamp
        let cache = setup_cache();
        let cancel = Cancellation::new();
        for host in hosts.iter() {
            cache
                .injected_documents(&file, *host, &cancel)
                .expect("injection succeeds");
        }
        group.bench_with_input(
            BenchmarkId::new("warm_lookup", num_literals),
            &(&file, &hosts),
            |b, (file, hosts)| {
                b.iter(|| {
                    for host in hosts.iter() {
                        cache
                            .injected_documents(*file, *host, &cancel)
                            .expect("cached lookup succeeds");
                    }
                })
            },
        );
    }

    group.finish();
}

fn benchmark_tokens(c: &mut Criterion) {
    let (file, hosts) = generate_host(200);
    let cache = setup_cache();
    let cancel = Cancellation::new();
    let documents: Vec<_> = hosts
        .iter()
        .flat_map(|host| {
            cache
                .injected_documents(&file, *host, &cancel)
                .expect("injection succeeds")
        })
        .map(|(document, _)| document)
        .collect();
    let lexer = PlainTextLexer;

    let mut group = c.benchmark_group("tokens");
    group.sample_size(20);
    group.bench_function("project_200_documents", |b| {
        b.iter(|| {
            for document in &documents {
                let lexed = lexer.tokenize(&document.decoded_text(), file.url());
                black_box(lexed);
                black_box(document.tokens_with(&lexer));
            }
        })
    });
    group.finish();
}

criterion_group!(benches, benchmark_injection, benchmark_tokens);
criterion_main!(benches);
