#![no_main]
use libfuzzer_sys::fuzz_target;

use fnpipe::plugins::event_info::path::{parse_path, resolve};
use fnpipe::plugins::event_info::types::detect;

fuzz_target!(|data: &[u8]| {
    let Ok(s) = std::str::from_utf8(data) else {
        return;
    };
    let _ = parse_path(s);
    if let Ok(event) = serde_json::from_str::<serde_json::Value>(s) {
        if let Some(event_type) = detect(&event) {
            let _ = event_type.collect(&event);
        }
        let _ = resolve(&event, "Records[0].eventSource");
    }
});
