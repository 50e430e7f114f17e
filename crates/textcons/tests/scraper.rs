use std::io::{Read, Write};
use std::net::TcpStream;
use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant};

use textcons::{KeySink, TextCons, TextSource, SCREEN_BYTES, SCREEN_COLS};

struct FixedScreen {
    cells: [u8; SCREEN_BYTES],
}

impl FixedScreen {
    fn banner(text: &[u8]) -> Self {
        let mut cells = [0u8; SCREEN_BYTES];
        for (i, &ch) in text.iter().enumerate() {
            cells[i * 2] = ch;
            cells[i * 2 + 1] = 0x07;
        }
        Self { cells }
    }
}

impl TextSource for FixedScreen {
    fn copy_screen(&self, out: &mut [u8; SCREEN_BYTES]) {
        out.copy_from_slice(&self.cells);
    }
}

#[derive(Default)]
struct RecordingSink {
    events: Mutex<Vec<(bool, u8)>>,
}

impl KeySink for RecordingSink {
    fn key_event(&self, down: bool, ch: u8) {
        self.events.lock().unwrap().push((down, ch));
    }
}

fn read_until(stream: &mut TcpStream, needle: &[u8], deadline: Duration) -> Vec<u8> {
    stream.set_read_timeout(Some(Duration::from_millis(200))).unwrap();
    let start = Instant::now();
    let mut seen = Vec::new();
    let mut buf = [0u8; 4096];
    while start.elapsed() < deadline {
        match stream.read(&mut buf) {
            Ok(0) => break,
            Ok(n) => {
                seen.extend_from_slice(&buf[..n]);
                if seen.windows(needle.len()).any(|w| w == needle) {
                    return seen;
                }
            }
            Err(_) => {}
        }
    }
    panic!(
        "pattern {:?} not seen in {} bytes",
        String::from_utf8_lossy(needle),
        seen.len()
    );
}

#[test]
fn mirrors_screen_and_injects_keys() {
    let source = Arc::new(FixedScreen::banner(b"BOOTING GUEST"));
    let sink = Arc::new(RecordingSink::default());

    let cons = TextCons::spawn("127.0.0.1:0", source, sink.clone()).unwrap();
    let mut client = TcpStream::connect(cons.local_addr()).unwrap();

    // The first frame carries the banner row prefixed with its index.
    let frame = read_until(&mut client, b"BOOTING GUEST", Duration::from_secs(5));
    assert!(frame.windows(5).any(|w| w == b"[00] "));

    client.write_all(b"x").unwrap();
    let deadline = Instant::now() + Duration::from_secs(5);
    loop {
        {
            let events = sink.events.lock().unwrap();
            if events.len() >= 2 {
                assert_eq!(events[0], (true, b'x'));
                assert_eq!(events[1], (false, b'x'));
                break;
            }
        }
        assert!(Instant::now() < deadline, "key events not injected");
        std::thread::sleep(Duration::from_millis(10));
    }
}

#[test]
fn second_client_is_served_after_first_disconnects() {
    let source = Arc::new(FixedScreen::banner(b"HELLO"));
    let sink = Arc::new(RecordingSink::default());
    let cons = TextCons::spawn("127.0.0.1:0", source, sink).unwrap();

    {
        let mut first = TcpStream::connect(cons.local_addr()).unwrap();
        read_until(&mut first, b"HELLO", Duration::from_secs(5));
    }

    let mut second = TcpStream::connect(cons.local_addr()).unwrap();
    read_until(&mut second, b"HELLO", Duration::from_secs(5));
}

#[test]
fn bind_failure_is_reported() {
    let source = Arc::new(FixedScreen::banner(b""));
    let sink = Arc::new(RecordingSink::default());
    let first = TextCons::spawn("127.0.0.1:0", source.clone(), sink.clone()).unwrap();
    // The port is already taken by the first tap.
    assert!(TextCons::spawn(first.local_addr(), source, sink).is_err());
}

#[test]
fn screen_rows_are_fixed_width() {
    assert_eq!(SCREEN_BYTES, SCREEN_COLS * 25 * 2);
}
