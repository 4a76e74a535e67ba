use std::fmt::Write as _;
use std::hint::black_box;

use criterion::{criterion_group, criterion_main, Criterion};

use reqlog::parser::LineParser;
use reqlog::{analyze_str, AnalyzerConfig};

const BASE_TIMESTAMP: i64 = 1_390_917_600_000_000;

/// Interleaved log of `requests` requests, each touching two backend groups
fn synthetic_log(requests: u64) -> String {
    let mut log = String::new();
    for id in 0..requests {
        let t = BASE_TIMESTAMP + (id as i64) * 1_000;
        let _ = writeln!(log, "{:016}\t{}\tStartRequest", t, id);
        for group in 0..2 {
            let _ = writeln!(
                log,
                "{:016}\t{}\tBackendConnect\t{}\thttp://backend{}-{:03}.example:1963/search?q={}",
                t + 10 + group,
                id,
                group,
                group,
                id % 17,
                id
            );
            let _ = writeln!(log, "{:016}\t{}\tBackendRequest\t{}", t + 20 + group, id, group);
            if (id + group as u64) % 11 == 0 {
                let _ = writeln!(
                    log,
                    "{:016}\t{}\tBackendError\t{}\tRequest timed out",
                    t + 30 + group,
                    id,
                    group
                );
            } else {
                let _ = writeln!(log, "{:016}\t{}\tBackendOk\t{}", t + 30 + group, id, group);
            }
        }
        let _ = writeln!(log, "{:016}\t{}\tStartMerge", t + 40, id);
        let _ = writeln!(log, "{:016}\t{}\tStartSendResult", t + 50, id);
        let _ = writeln!(log, "{:016}\t{}\tFinishRequest", t + 60 + (id as i64 % 97), id);
    }
    log
}

fn bench_parse_lines(c: &mut Criterion) {
    let log = synthetic_log(1_000);
    let parser = LineParser::new();
    c.bench_function("parse_lines_1k_requests", |b| {
        b.iter(|| {
            for line in log.lines() {
                let _ = black_box(parser.parse(black_box(line)));
            }
        });
    });
}

fn bench_analyze_sequential(c: &mut Criterion) {
    let log = synthetic_log(1_000);
    let config = AnalyzerConfig::default();
    c.bench_function("analyze_sequential_1k_requests", |b| {
        b.iter(|| black_box(analyze_str(&config, black_box(&log))));
    });
}

fn bench_analyze_parallel(c: &mut Criterion) {
    let log = synthetic_log(1_000);
    let mut config = AnalyzerConfig::default();
    config.performance.threads = 4;
    config.performance.batch_size = Some(500);
    c.bench_function("analyze_parallel_1k_requests", |b| {
        b.iter(|| black_box(analyze_str(&config, black_box(&log))));
    });
}

criterion_group!(
    benches,
    bench_parse_lines,
    bench_analyze_sequential,
    bench_analyze_parallel
);
criterion_main!(benches);
