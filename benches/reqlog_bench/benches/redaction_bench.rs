//! Redaction benchmarks
//!
//! Measures header sanitization and JSON body masking on typical payloads.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use http::{HeaderMap, HeaderValue};
use reqlog_core::RedactionPolicy;

fn nested_body(items: usize) -> String {
    let users: Vec<String> = (0..items)
        .map(|i| {
            format!(
                r#"{{"id":{i},"name":"user{i}","password":"pw{i}","profile":{{"cpf":"000.000.000-{i:02}","city":"Recife"}}}}"#
            )
        })
        .collect();
    format!(r#"{{"access_token":"abc","users":[{}]}}"#, users.join(","))
}

fn bench_headers(c: &mut Criterion) {
    let policy = RedactionPolicy::new();
    let mut headers = HeaderMap::new();
    headers.insert("authorization", HeaderValue::from_static("Bearer eyJhbGciOi.payload.sig"));
    headers.insert("cookie", HeaderValue::from_static("session=abc; theme=dark"));
    headers.insert("content-type", HeaderValue::from_static("application/json"));
    headers.insert("user-agent", HeaderValue::from_static("bench/1.0"));
    headers.insert("accept", HeaderValue::from_static("*/*"));

    c.bench_function("sanitize_header_map", |b| {
        b.iter(|| policy.sanitize_header_map(black_box(&headers)))
    });
}

fn bench_bodies(c: &mut Criterion) {
    let policy = RedactionPolicy::new();
    let mut group = c.benchmark_group("sanitize_body");

    for items in [1usize, 10, 100] {
        let body = nested_body(items);
        group.bench_with_input(BenchmarkId::new("masked", items), &body, |b, body| {
            b.iter(|| policy.sanitize_body(black_box(body), 32_000))
        });
    }

    let disabled = RedactionPolicy::disabled();
    let body = nested_body(100);
    group.bench_function("disabled", |b| {
        b.iter(|| disabled.sanitize_body(black_box(&body), 32_000))
    });

    // Truncated bodies are not valid JSON and skip masking.
    group.bench_function("truncated", |b| {
        b.iter(|| policy.sanitize_body(black_box(&body), 256))
    });

    group.finish();
}

criterion_group!(benches, bench_headers, bench_bodies);
criterion_main!(benches);
