//! Benchmark: decode a synthetic class file through the schema. Compares the
//! generic record decode with decode plus conversion to the typed ClassFile,
//! and measures schema parsing on its own.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use schemadec::classfile::{self, ClassFile, CLASS_FILE_SCHEMA, MAGIC};
use schemadec::{decode_with_extent, parse};
use std::io::Cursor;

const METHODS: u16 = 200;

fn push_u16(out: &mut Vec<u8>, v: u16) {
    out.extend_from_slice(&v.to_be_bytes());
}

fn push_utf8(out: &mut Vec<u8>, s: &str) {
    out.push(1);
    push_u16(out, s.len() as u16);
    out.extend_from_slice(s.as_bytes());
}

/// Class with `METHODS` methods, each with its own name and a 64-byte Code attribute.
fn synthetic_class() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(&MAGIC.to_be_bytes());
    push_u16(&mut out, 0);
    push_u16(&mut out, 61);

    // #1 name, #2 class, #3 "Code", #4 descriptor, then one name per method.
    let entries = 4 + METHODS;
    push_u16(&mut out, entries + 1);
    push_utf8(&mut out, "bench/Synthetic");
    out.push(7);
    push_u16(&mut out, 1);
    push_utf8(&mut out, "Code");
    push_utf8(&mut out, "()V");
    for i in 0..METHODS {
        push_utf8(&mut out, &format!("method{}", i));
    }

    push_u16(&mut out, 0x0021);
    push_u16(&mut out, 2);
    push_u16(&mut out, 2);
    push_u16(&mut out, 0);
    push_u16(&mut out, 0);

    push_u16(&mut out, METHODS);
    for i in 0..METHODS {
        push_u16(&mut out, 0x0001);
        push_u16(&mut out, 5 + i);
        push_u16(&mut out, 4);
        push_u16(&mut out, 1);
        push_u16(&mut out, 3);
        out.extend_from_slice(&64u32.to_be_bytes());
        out.extend(std::iter::repeat(0xB1).take(64));
    }
    push_u16(&mut out, 0);
    out
}

fn bench_decode(c: &mut Criterion) {
    let schema = classfile::schema().expect("class file schema");
    let bytes = synthetic_class();

    c.bench_function("parse_class_file_schema", |b| {
        b.iter(|| parse(black_box(CLASS_FILE_SCHEMA)).map(|s| s.records.len()))
    });

    c.bench_function("decode_class_file_records", |b| {
        b.iter(|| {
            let (consumed, result) = decode_with_extent(&schema, black_box(&bytes), "ClassFile");
            black_box(result.is_ok());
            consumed
        })
    });

    c.bench_function("decode_class_file_typed", |b| {
        b.iter(|| {
            ClassFile::decode_with(&schema, Cursor::new(black_box(&bytes[..])))
                .map(|class| class.methods.len())
                .unwrap_or(0)
        })
    });
}

criterion_group!(benches, bench_decode);
criterion_main!(benches);
