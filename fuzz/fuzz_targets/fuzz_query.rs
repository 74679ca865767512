#![no_main]
use libfuzzer_sys::fuzz_target;
use portal_core::query::{append_param, merge_param, path_id_of, PATH_ID_PARAM, PUSH_ID_PARAM};

fuzz_target!(|data: &[u8]| {
    let Ok(text) = std::str::from_utf8(data) else {
        return;
    };
    let (url, id) = text.split_once('\n').unwrap_or((text, "42"));

    if let Ok(merged) = merge_param(url, PATH_ID_PARAM, id) {
        if !id.is_empty() {
            assert_eq!(path_id_of(&merged).as_deref(), Some(id));
        }
    }
    let _ = append_param(url, PUSH_ID_PARAM, id);
});
