#![no_main]

use eventide::event::EventRecord;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Try to parse as JSON and then as a persisted record
    if let Ok(json_value) = serde_json::from_slice::<serde_json::Value>(data) {
        let _: Result<EventRecord, _> = serde_json::from_value(json_value);
    }
});
