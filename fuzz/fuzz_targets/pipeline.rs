#![no_main]

use libfuzzer_sys::fuzz_target;
use reqlog::{analyze_str, AnalyzerConfig};

const MAX_INPUT_LEN: usize = 16 * 1024;

fuzz_target!(|data: &[u8]| {
    if data.len() > MAX_INPUT_LEN {
        return;
    }

    let log = String::from_utf8_lossy(data);
    let sequential = analyze_str(&AnalyzerConfig::default(), &log)
        .expect("collect strategy never fails on in-memory input");

    let mut config = AnalyzerConfig::default();
    config.performance.threads = 3;
    config.performance.batch_size = Some(4);
    let parallel = analyze_str(&config, &log).expect("parallel run must succeed");

    assert_eq!(sequential.report, parallel.report);
});
