#![no_main]

use bytes::BytesMut;
use libfuzzer_sys::fuzz_target;
use mysql_codec::{MySqlCodec, PayloadAssembler};
use mysql_protocol::PacketHeader;
use tokio_util::codec::Decoder;

fuzz_target!(|data: &[u8]| {
    // Header alone
    let mut cursor = data;
    let _ = PacketHeader::decode(&mut cursor);

    // Framing and reassembly over an arbitrary byte stream
    let mut codec = MySqlCodec::new();
    let mut assembler = PayloadAssembler::new();
    let mut buf = BytesMut::from(data);
    while let Ok(Some(packet)) = codec.decode(&mut buf) {
        let _ = assembler.push(packet);
    }
});
