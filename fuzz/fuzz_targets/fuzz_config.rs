#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(config) = serde_json::from_slice::<portal_core::config::GateConfig>(data) {
        let _ = config.reachability_timeout();
        let _ = config.request_timeout();
    }
});
