// tests/common/mod.rs
// Shared test utilities for integration tests
#![allow(dead_code)]

use std::io::Write;
use std::process::{Command, Stdio};
use tempfile::NamedTempFile;

const BINARY_PATH: &str = env!("CARGO_BIN_EXE_reqlog");

/// Run reqlog with the given arguments and input via stdin
pub fn run_reqlog_with_input(args: &[&str], input: &[u8]) -> (String, String, i32) {
    let mut cmd = Command::new(BINARY_PATH)
        .args(args)
        .stdin(Stdio::piped())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .spawn()
        .expect("Failed to start reqlog");

    if let Some(mut stdin) = cmd.stdin.take() {
        stdin.write_all(input).expect("Failed to write to stdin");
    }

    let output = cmd.wait_with_output().expect("Failed to read output");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// Run reqlog on a temporary file holding `file_content`
pub fn run_reqlog_with_file(args: &[&str], file_content: &[u8]) -> (String, String, i32) {
    let mut temp_file = NamedTempFile::new().expect("Failed to create temp file");
    temp_file
        .write_all(file_content)
        .expect("Failed to write to temp file");
    temp_file.flush().expect("Failed to flush temp file");

    let mut full_args = args.to_vec();
    full_args.push(temp_file.path().to_str().unwrap());

    let output = Command::new(BINARY_PATH)
        .args(&full_args)
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .output()
        .expect("Failed to execute reqlog");

    (
        String::from_utf8_lossy(&output.stdout).to_string(),
        String::from_utf8_lossy(&output.stderr).to_string(),
        output.status.code().unwrap_or(-1),
    )
}

/// A small log with two completed requests, one partial failure and one malformed line
pub const SAMPLE_LOG: &str = "\
1390917600000000\t1\tStartRequest
1390917600000010\t1\tBackendConnect\t0\thttp://backend0-001.example:1963/search?q=1
1390917600000020\t2\tStartRequest
1390917600000030\t1\tBackendRequest\t0
1390917600000040\t1\tBackendOk\t0
1390917600000050\t2\tBackendConnect\t0\thttp://backend0-002.example:1963/search?q=2
1390917600000060\t2\tBackendError\t0\tConnection refused
1390917600000070\t1\tStartMerge
1390917600000080\t1\tStartSendResult
1390917600000100\t2\tStartSendResult
this line is not an event
1390917600000140\t1\tFinishRequest
1390917600000150\t2\tFinishRequest
";
