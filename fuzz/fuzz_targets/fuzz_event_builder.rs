#![no_main]

use eventide::clock::WorldTime;
use eventide::event::{EventRecord, Repeat};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let Some((&seed_byte, rest)) = data.split_first() else {
        return;
    };
    let seed = i64::from(seed_byte as i8);

    let text = String::from_utf8_lossy(rest);
    let mut parts = text.splitn(3, ',');
    let id = parts.next().unwrap_or_default().to_string();
    let owner = parts.next().unwrap_or_default().to_string();
    let title = parts.next().unwrap_or_default().to_string();

    // Bad definitions must come back as errors, never as panics.
    let _ = EventRecord::builder(id)
        .owner(owner)
        .title(title)
        .armed_at(WorldTime::from_secs(seed))
        .initiation_delay(seed)
        .activation_delay(seed.wrapping_neg())
        .duration(seed.wrapping_mul(7))
        .repeat(Repeat::Count(u32::from(seed_byte)))
        .repeat_until(WorldTime::from_secs(seed.wrapping_add(60)))
        .build();
});
