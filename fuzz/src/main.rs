extern crate afl;
extern crate packetry;

use afl::fuzz;
use std::io::Cursor;

fn main() {
    fuzz!(|data: &[u8]| {
        let mut sniffer = packetry::Sniffer::new(Cursor::new(data));
        loop {
            match sniffer.next_packet() {
                Ok(Some(_pkt)) => println!("ok"),
                Ok(None) => break,
                Err(e) => {
                    eprintln!("{}", e);
                    break;
                }
            }
        }
    });
}
