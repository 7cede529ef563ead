#![no_main]

use arbitrary::Arbitrary;
use bytes::Bytes;
use libfuzzer_sys::fuzz_target;
use mysql_protocol::{ColumnDefinition, ColumnFlags, ColumnType};

/// Fuzz input combining column metadata with a raw text value.
#[derive(Debug, Arbitrary)]
struct FuzzInput {
    column_type: u8,
    flags: u16,
    value: Option<Vec<u8>>,
}

fuzz_target!(|input: FuzzInput| {
    let Ok(column_type) = ColumnType::from_u8(input.column_type) else {
        return;
    };
    let column = ColumnDefinition::new("c", column_type)
        .with_flags(ColumnFlags::from_bits_truncate(input.flags));

    let _ = mysql_types::decode_text_value(input.value.map(Bytes::from), &column);
});
