#![no_main]

use libfuzzer_sys::fuzz_target;
use mysql_client::Config;

fuzz_target!(|data: &[u8]| {
    // Fuzz connection string parsing
    if let Ok(s) = std::str::from_utf8(data) {
        if let Ok(config) = Config::from_connection_string(s) {
            let _ = config.pool_key();
        }
    }
});
