use anyhow::{Context, Result};
use std::fs::File;
use std::io::{self, BufRead, BufReader};
use std::path::Path;

use crate::decompression::{maybe_decompress, Compression};

/// Boxed line source handed to the pipeline
pub type InputReader = Box<dyn BufRead + Send>;

/// Open the configured input: a file when a path is given, stdin otherwise.
/// Compressed input is decoded transparently.
pub fn open_input(file: Option<&str>) -> Result<InputReader> {
    match file {
        Some(path) => open_file(path),
        None => {
            let (compression, reader) =
                maybe_decompress(io::stdin()).context("Failed to read from stdin")?;
            log_compression("stdin", compression);
            Ok(Box::new(BufReader::new(reader)))
        }
    }
}

fn open_file(path: &str) -> Result<InputReader> {
    let path_ref = Path::new(path);
    if let Some(extension) = path_ref.extension().and_then(|ext| ext.to_str()) {
        if extension.eq_ignore_ascii_case("zip") {
            anyhow::bail!(
                "ZIP archives are not supported; extract the log first: unzip {}",
                path_ref.display()
            );
        }
    }

    let file = File::open(path_ref)
        .with_context(|| format!("Failed to open input file '{}'", path_ref.display()))?;
    let (compression, reader) = maybe_decompress(file)
        .with_context(|| format!("Failed to detect compression of '{}'", path_ref.display()))?;
    log_compression(path, compression);
    Ok(Box::new(BufReader::new(reader)))
}

fn log_compression(source: &str, compression: Compression) {
    if compression != Compression::None {
        tracing::debug!(source, ?compression, "decompressing input");
    }
}

/// Iterator over `(line_number, line)` pairs, 1-based, with line endings removed.
///
/// Invalid UTF-8 is replaced rather than aborting the stream: such lines can
/// never match the event pattern and are rejected downstream like any other
/// malformed line.
pub struct NumberedLines<R> {
    reader: R,
    buffer: Vec<u8>,
    line_number: u64,
}

impl<R: BufRead> NumberedLines<R> {
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            buffer: Vec::new(),
            line_number: 0,
        }
    }
}

impl<R: BufRead> Iterator for NumberedLines<R> {
    type Item = io::Result<(u64, String)>;

    fn next(&mut self) -> Option<Self::Item> {
        self.buffer.clear();
        match self.reader.read_until(b'\n', &mut self.buffer) {
            Ok(0) => None,
            Ok(_) => {
                self.line_number += 1;
                let text = String::from_utf8_lossy(&self.buffer);
                let line = text.trim_end_matches(['\r', '\n']).to_string();
                Some(Ok((self.line_number, line)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Cursor, Write};
    use tempfile::NamedTempFile;

    #[test]
    fn test_numbered_lines_strip_endings() {
        let input = Cursor::new(b"first\r\nsecond\n\nlast".to_vec());
        let lines: Vec<(u64, String)> = NumberedLines::new(input).map(|l| l.unwrap()).collect();
        assert_eq!(
            lines,
            vec![
                (1, "first".to_string()),
                (2, "second".to_string()),
                (3, String::new()),
                (4, "last".to_string()),
            ]
        );
    }

    #[test]
    fn test_numbered_lines_replace_invalid_utf8() {
        let input = Cursor::new(vec![0xFF, b'x', b'\n', b'o', b'k', b'\n']);
        let lines: Vec<(u64, String)> = NumberedLines::new(input).map(|l| l.unwrap()).collect();
        assert_eq!(lines.len(), 2);
        assert!(lines[0].1.ends_with('x'));
        assert_eq!(lines[1], (2, "ok".to_string()));
    }

    #[test]
    fn test_open_plain_file() -> Result<()> {
        let mut temp_file = NamedTempFile::new()?;
        writeln!(temp_file, "line one")?;
        temp_file.flush()?;

        let path = temp_file.path().to_str().unwrap().to_string();
        let reader = open_input(Some(&path))?;
        let lines: Vec<String> = reader.lines().collect::<io::Result<_>>()?;
        assert_eq!(lines, vec!["line one".to_string()]);
        Ok(())
    }

    #[test]
    fn test_missing_file_reports_path() {
        let err = open_input(Some("/definitely/not/here.log"))
            .err()
            .unwrap()
            .to_string();
        assert!(err.contains("/definitely/not/here.log"));
    }

    #[test]
    fn test_zip_rejected() {
        let err = open_input(Some("archive.zip")).err().unwrap().to_string();
        assert!(err.contains("ZIP archives are not supported"));
    }
}
