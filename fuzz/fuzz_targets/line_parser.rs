#![no_main]

use libfuzzer_sys::fuzz_target;
use reqlog::event::EventKind;
use reqlog::parser::LineParser;

const MAX_LINE_LEN: usize = 4096;

fuzz_target!(|data: &[u8]| {
    if data.is_empty() || data.len() > MAX_LINE_LEN {
        return;
    }

    let line = String::from_utf8_lossy(data);
    let parser = LineParser::new();

    // A parsed event must render back to a line that parses to the same event
    if let Ok(event) = parser.parse(&line) {
        let rendered = event.to_string();
        let reparsed = parser
            .parse(&rendered)
            .expect("rendered event must parse");
        assert_eq!(reparsed.timestamp, event.timestamp);
        assert_eq!(reparsed.request_id, event.request_id);
        assert_eq!(reparsed.data, event.data);
        assert!(EventKind::ALL.contains(&event.kind()));
    }
});
