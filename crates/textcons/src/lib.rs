//! Text console scraper, for debugging.
//!
//! A TCP endpoint that mirrors the guest's 80x25 text screen to whoever
//! connects (one client at a time) and injects received bytes as
//! keystrokes. The tap never owns guest state: it pulls screen snapshots
//! through [`TextSource`] and pushes keys through [`KeySink`]. Snapshots
//! may be torn with respect to guest writes; the periodic redraw makes
//! that harmless.

use std::io::{Read, Write};
use std::net::{TcpListener, TcpStream, ToSocketAddrs};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use thiserror::Error;
use tracing::{debug, info, warn};

pub const SCREEN_COLS: usize = 80;
pub const SCREEN_ROWS: usize = 25;
/// Bytes of one text page snapshot: (char, attribute) per cell.
pub const SCREEN_BYTES: usize = SCREEN_COLS * SCREEN_ROWS * 2;

/// Redraw cadence; coarse on purpose.
const REDRAW_PERIOD: Duration = Duration::from_millis(500);
/// Hold each injected key down briefly so the ROM's poll loop sees it.
const KEY_HOLD: Duration = Duration::from_millis(50);

#[derive(Debug, Error)]
pub enum TextConsError {
    #[error("text console socket: {0}")]
    Io(#[from] std::io::Error),
}

/// Read-only view of the active text page.
pub trait TextSource: Send + Sync + 'static {
    /// Copy the current screen contents. Torn reads are acceptable.
    fn copy_screen(&self, out: &mut [u8; SCREEN_BYTES]);
}

/// Keystroke injection back into the guest.
pub trait KeySink: Send + Sync + 'static {
    fn key_event(&self, down: bool, ch: u8);
}

pub struct TextCons {
    local_addr: std::net::SocketAddr,
}

impl TextCons {
    /// Bind the scraper and spawn its accept loop. The threads run for
    /// the lifetime of the process, like the VM they mirror.
    pub fn spawn<A: ToSocketAddrs>(
        addr: A,
        source: Arc<dyn TextSource>,
        keys: Arc<dyn KeySink>,
    ) -> Result<Self, TextConsError> {
        let listener = TcpListener::bind(addr)?;
        let local_addr = listener.local_addr()?;
        info!(%local_addr, "text console listening");

        thread::Builder::new()
            .name("textcons".into())
            .spawn(move || accept_loop(listener, source, keys))?;

        Ok(Self { local_addr })
    }

    pub fn local_addr(&self) -> std::net::SocketAddr {
        self.local_addr
    }
}

fn accept_loop(listener: TcpListener, source: Arc<dyn TextSource>, keys: Arc<dyn KeySink>) {
    loop {
        let stream = match listener.accept() {
            Ok((stream, peer)) => {
                info!(%peer, "text console client connected");
                stream
            }
            Err(err) => {
                warn!(%err, "text console accept failed");
                continue;
            }
        };
        handle_client(stream, &source, &keys);
    }
}

/// Serve one client: a writer thread pushes the screen at the redraw
/// cadence while this thread injects received bytes as keystrokes.
fn handle_client(stream: TcpStream, source: &Arc<dyn TextSource>, keys: &Arc<dyn KeySink>) {
    let connected = Arc::new(AtomicBool::new(true));

    let writer = {
        let stream = match stream.try_clone() {
            Ok(stream) => stream,
            Err(err) => {
                warn!(%err, "text console stream clone failed");
                return;
            }
        };
        let source = source.clone();
        let connected = connected.clone();
        thread::spawn(move || screen_push_loop(stream, source, connected))
    };

    let mut stream = stream;
    let mut buf = [0u8; 16];
    loop {
        match stream.read(&mut buf) {
            Ok(0) | Err(_) => break,
            Ok(n) => {
                for &ch in &buf[..n] {
                    debug!(ch, "text console key");
                    keys.key_event(true, ch);
                    thread::sleep(KEY_HOLD);
                    keys.key_event(false, ch);
                }
            }
        }
    }

    connected.store(false, Ordering::Relaxed);
    let _ = writer.join();
}

fn screen_push_loop(mut stream: TcpStream, source: Arc<dyn TextSource>, connected: Arc<AtomicBool>) {
    let mut screen = [0u8; SCREEN_BYTES];
    while connected.load(Ordering::Relaxed) {
        source.copy_screen(&mut screen);
        if send_screen(&mut stream, &screen).is_err() {
            return;
        }
        thread::sleep(REDRAW_PERIOD);
    }
}

/// One frame: clear the terminal, then the 25 rows with their row index,
/// characters only (attributes are dropped).
fn send_screen(stream: &mut TcpStream, screen: &[u8; SCREEN_BYTES]) -> std::io::Result<()> {
    stream.write_all(b"\x1b[2J\n")?;
    for row in 0..SCREEN_ROWS {
        write!(stream, "[{row:02}] ")?;
        let mut line = [0u8; SCREEN_COLS];
        for col in 0..SCREEN_COLS {
            line[col] = screen[(row * SCREEN_COLS + col) * 2];
        }
        stream.write_all(&line)?;
        stream.write_all(b"\r\n")?;
    }
    Ok(())
}
