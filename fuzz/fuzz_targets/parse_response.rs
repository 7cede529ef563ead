#![no_main]

use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{AuthMoreData, AuthSwitchRequest, EofPayload, ErrorPayload, OkPayload};
use mysql_protocol::resultset::{ColumnDefinition, decode_column_count, decode_text_row};

fuzz_target!(|data: &[u8]| {
    let payload = Bytes::copy_from_slice(data);

    let _ = OkPayload::decode(payload.clone());
    let _ = ErrorPayload::decode(payload.clone());
    let _ = EofPayload::decode(payload.clone());
    let _ = AuthSwitchRequest::decode(payload.clone());
    let _ = AuthMoreData::decode(payload.clone());
    let _ = ColumnDefinition::decode(payload.clone());
    let _ = decode_column_count(payload.clone());

    if let Some((&columns, row)) = data.split_first() {
        let _ = decode_text_row(Bytes::copy_from_slice(row), usize::from(columns % 32));
    }
});
