#![no_main]
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let mut sniffer = packetry::Sniffer::new(std::io::Cursor::new(data));
    while let Ok(Some(_packet)) = sniffer.next_packet() {}
});
