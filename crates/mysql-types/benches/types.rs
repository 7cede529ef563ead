//! Benchmarks for MySQL literal encoding and text-cell decoding.

#![allow(clippy::unwrap_used, clippy::approx_constant, missing_docs)]

use bytes::Bytes;
use criterion::{Criterion, Throughput, criterion_group, criterion_main};
use mysql_protocol::{ColumnDefinition, ColumnType};
use mysql_types::{EncodeOptions, FromSql, SqlValue, ToSql, append_sql_literal, decode_text_value};
use std::hint::black_box;

/// Benchmark string literal escaping in both SQL modes.
fn bench_string_literal(c: &mut Criterion) {
    let mut group = c.benchmark_group("string_literal");

    let plain = SqlValue::from("This is a typical database column value with some content");
    let quoted = SqlValue::from("It's a 'quoted' value with \\ backslashes\nand newlines");

    for (name, value) in [("plain", &plain), ("needs_escaping", &quoted)] {
        let len = value.as_str().map_or(0, str::len);
        group.throughput(Throughput::Bytes(len as u64));
        group.bench_function(format!("{name}/backslash"), |b| {
            b.iter(|| {
                let mut buf = Vec::with_capacity(128);
                append_sql_literal(&mut buf, black_box(value), EncodeOptions::new()).unwrap();
                black_box(buf)
            })
        });
        group.bench_function(format!("{name}/no_backslash_escapes"), |b| {
            let options = EncodeOptions::new().no_backslash_escapes(true);
            b.iter(|| {
                let mut buf = Vec::with_capacity(128);
                append_sql_literal(&mut buf, black_box(value), options).unwrap();
                black_box(buf)
            })
        });
    }

    group.finish();
}

/// Benchmark binary literal rendering.
fn bench_binary_literal(c: &mut Criterion) {
    let data = SqlValue::Binary(Bytes::from((0..=255u8).cycle().take(8192).collect::<Vec<_>>()));
    let mut group = c.benchmark_group("binary_literal");
    group.throughput(Throughput::Bytes(8192));
    group.bench_function("8k", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(16 * 1024);
            append_sql_literal(&mut buf, black_box(&data), EncodeOptions::new()).unwrap();
            black_box(buf)
        })
    });
    group.finish();
}

/// Benchmark numeric literal rendering.
fn bench_numeric_literal(c: &mut Criterion) {
    let int = 1_234_567_890i64.to_sql().unwrap();
    let double = 3.14159f64.to_sql().unwrap();

    c.bench_function("literal_i64", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(32);
            append_sql_literal(&mut buf, black_box(&int), EncodeOptions::new()).unwrap();
            black_box(buf)
        })
    });
    c.bench_function("literal_f64", |b| {
        b.iter(|| {
            let mut buf = Vec::with_capacity(32);
            append_sql_literal(&mut buf, black_box(&double), EncodeOptions::new()).unwrap();
            black_box(buf)
        })
    });
}

/// Benchmark decoding text-protocol cells.
fn bench_text_decode(c: &mut Criterion) {
    let mut group = c.benchmark_group("text_decode");

    let int_col = ColumnDefinition::new("id", ColumnType::LongLong);
    let int_cell = Bytes::from_static(b"9223372036854775807");
    group.bench_function("bigint", |b| {
        b.iter(|| black_box(decode_text_value(Some(int_cell.clone()), &int_col).unwrap()))
    });

    let str_col = ColumnDefinition::new("name", ColumnType::VarString);
    let str_cell = Bytes::from_static(b"a reasonably sized varchar value");
    group.bench_function("varchar", |b| {
        b.iter(|| black_box(decode_text_value(Some(str_cell.clone()), &str_col).unwrap()))
    });

    let dt_col = ColumnDefinition::new("created", ColumnType::DateTime);
    let dt_cell = Bytes::from_static(b"2024-06-01 12:34:56.789012");
    group.bench_function("datetime", |b| {
        b.iter(|| black_box(decode_text_value(Some(dt_cell.clone()), &dt_col).unwrap()))
    });

    group.finish();
}

/// Benchmark FromSql conversions.
fn bench_from_sql(c: &mut Criterion) {
    let int_value = SqlValue::Int(42);
    let string_value = SqlValue::String("Hello, World!".to_string());

    c.bench_function("from_sql_i32", |b| {
        b.iter(|| black_box(i32::from_sql(black_box(&int_value)).unwrap()))
    });
    c.bench_function("from_sql_string", |b| {
        b.iter(|| black_box(String::from_sql(black_box(&string_value)).unwrap()))
    });
}

criterion_group!(
    benches,
    bench_string_literal,
    bench_binary_literal,
    bench_numeric_literal,
    bench_text_decode,
    bench_from_sql,
);

criterion_main!(benches);
