#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{ChangeUser, HandshakeResponse, InitialHandshake, ServerVersion};

fuzz_target!(|data: &[u8]| {
    let payload = Bytes::copy_from_slice(data);

    let _ = InitialHandshake::decode(payload.clone());
    let _ = HandshakeResponse::decode(payload.clone());
    let _ = ChangeUser::decode(payload);

    if let Ok(s) = std::str::from_utf8(data) {
        let _ = ServerVersion::parse(s);
    }
});
