#![no_main]

use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // Inbound traffic is attacker-controlled; the parser must never
    // panic, only reject.
    let _ = serde_json::from_slice::<noughts_server::protocol::ClientMessage>(data);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = serde_json::from_str::<noughts_server::protocol::ClientMessage>(s);
    }
});
