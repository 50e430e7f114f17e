//! VGA register-state machine and renderer.
//!
//! Models the legacy register files (CRTC, sequencer, graphics controller,
//! attribute controller, DAC) and the planar write pipeline behind the
//! 0xA0000/0xB8000 apertures, and rasterizes the three modes the ROM can
//! program: 03h (80x25 text), 12h (640x480x4bpp), 13h (320x200x8bpp).
//!
//! The four 64 KiB planes are host-owned shadow memory; only the color
//! text buffer lives in guest RAM (the ROM writes it directly, so the
//! text renderer reads it back through [`memory::GuestMem`]).

use thiserror::Error;
use tracing::warn;

use glyphs::{Font, GLYPH_HEIGHT, GLYPH_WIDTH, TEXT_PALETTE};

mod planar;
pub mod ports;
mod regs;
mod render;

use regs::{Attribute, Crtc, Dac, Graphics, SeqReset, Sequencer, Status1};

pub use ports::{VGA_PORT_FIRST, VGA_PORT_LAST};

/// Size of one memory plane.
pub const PLANE_SIZE: usize = 64 * 1024;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum VgaError {
    #[error("unsupported video mode {0:#04x}")]
    UnsupportedMode(u8),
}

/// A 32-bpp BGRX frame. Resized when the mode switches.
pub struct Framebuffer {
    width: u32,
    height: u32,
    pixels: Vec<u32>,
}

impl Framebuffer {
    fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; (width * height) as usize],
        }
    }

    fn resize(&mut self, width: u32, height: u32) {
        self.width = width;
        self.height = height;
        self.pixels.clear();
        self.pixels.resize((width * height) as usize, 0);
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn pixels(&self) -> &[u32] {
        &self.pixels
    }
}

fn mode_dims(mode: u8) -> Option<(u32, u32)> {
    match mode {
        // Text renders as 80x25 cells of 8x16 glyphs.
        0x03 => Some((640, 400)),
        0x12 => Some((640, 480)),
        0x13 => Some((320, 200)),
        _ => None,
    }
}

pub struct Vga {
    font: Font,
    fb: Framebuffer,
    mode: u8,

    misc_output: u8,
    status1: Status1,
    cga_mode_ctrl: u8,
    cga_color_select: u8,

    seq: Sequencer,
    crtc: Crtc,
    gc: Graphics,
    atc: Attribute,
    dac: Dac,

    planes: Box<[[u8; PLANE_SIZE]; 4]>,
}

impl Vga {
    pub fn new(font: Font) -> Self {
        let mut vga = Self {
            font,
            fb: Framebuffer::new(640, 400),
            mode: 0x03,
            misc_output: 0,
            status1: Status1::default(),
            cga_mode_ctrl: 0,
            cga_color_select: 0,
            seq: Sequencer::default(),
            crtc: Crtc::default(),
            gc: Graphics::default(),
            atc: Attribute::default(),
            dac: Dac::default(),
            planes: Box::new([[0; PLANE_SIZE]; 4]),
        };
        // Power-on state renders: sync resets released, timing enabled.
        vga.seq.reset = SeqReset::ASYNC | SeqReset::SYNC;
        vga.crtc.mode_ctrl = ports::CRTC_MC_TE;
        render::initialize_palette(&mut vga.dac);
        vga
    }

    pub fn mode(&self) -> u8 {
        self.mode
    }

    pub fn framebuffer(&self) -> &Framebuffer {
        &self.fb
    }

    /// Default mode-13h palette entry, 8 bits per channel.
    pub fn dac_rgb(&self, index: u8) -> u32 {
        self.dac.palette_rgb[index as usize]
    }

    pub fn plane(&self, p: usize) -> &[u8; PLANE_SIZE] {
        &self.planes[p]
    }

    /// Rendering is suppressed while the screen is off, either sync reset
    /// is asserted, or CRTC timing is disabled.
    pub fn in_reset(&self) -> bool {
        self.seq.clock_mode & ports::SEQ_CM_SO != 0
            || !self.seq.reset.contains(SeqReset::ASYNC)
            || !self.seq.reset.contains(SeqReset::SYNC)
            || self.crtc.mode_ctrl & ports::CRTC_MC_TE == 0
    }

    fn check_size(&mut self) {
        if self.in_reset() {
            return;
        }
        if let Some((w, h)) = mode_dims(self.mode) {
            if self.fb.width != w || self.fb.height != h {
                self.fb.resize(w, h);
            }
        }
    }

    /// Switch the active mode; resizes the framebuffer. Modes other than
    /// 03h/12h/13h are rejected.
    pub fn switch_mode(&mut self, mode: u8) -> Result<(), VgaError> {
        let (w, h) = mode_dims(mode).ok_or(VgaError::UnsupportedMode(mode))?;
        self.mode = mode;
        if self.fb.width != w || self.fb.height != h {
            self.fb.resize(w, h);
        }
        Ok(())
    }

    /// Port read of 1 or 2 bytes. Two-byte transfers hit `port` and
    /// `port + 1` back to back.
    pub fn io_read(&mut self, port: u16, bytes: u8) -> u32 {
        match bytes {
            1 => u32::from(self.port_read(port)),
            2 => {
                let lo = u32::from(self.port_read(port));
                let hi = u32::from(self.port_read(port + 1));
                lo | (hi << 8)
            }
            _ => {
                warn!(port, bytes, "unsupported VGA port read width");
                0
            }
        }
    }

    pub fn io_write(&mut self, port: u16, bytes: u8, value: u32) {
        match bytes {
            1 => self.port_write(port, value as u8),
            2 => {
                self.port_write(port, value as u8);
                self.port_write(port + 1, (value >> 8) as u8);
            }
            _ => warn!(port, bytes, "unsupported VGA port write width"),
        }
    }

    /// Paint a glyph cell directly into the framebuffer. Used by the
    /// host-side write-char path when a graphics mode is active (in text
    /// mode the ROM writes the 0xB8000 buffer itself).
    pub fn draw_char(&mut self, row: u8, col: u8, ch: u8, attrib: u8, repeat: u16) {
        let fg = TEXT_PALETTE[(attrib & 0x0F) as usize];
        let bg = TEXT_PALETTE[(attrib >> 4) as usize];
        let width = self.fb.width as usize;
        let height = self.fb.height as usize;

        let mut col = col as usize;
        for _ in 0..repeat.max(1) {
            let x0 = col * GLYPH_WIDTH;
            let y0 = row as usize * GLYPH_HEIGHT;
            if x0 + GLYPH_WIDTH > width || y0 + GLYPH_HEIGHT > height {
                return;
            }
            let glyph = *self.font.glyph(ch);
            for (y, bits) in glyph.iter().enumerate() {
                for x in 0..GLYPH_WIDTH {
                    let px = if bits & (0x80 >> x) != 0 { fg } else { bg };
                    self.fb.pixels[(y0 + y) * width + x0 + x] = px;
                }
            }
            col += 1;
        }
    }
}

#[cfg(test)]
pub(crate) fn test_psf1() -> Vec<u8> {
    let mut bytes = vec![0x36, 0x04, 0x00, 0x10];
    for n in 0..glyphs::GLYPH_COUNT {
        for y in 0..glyphs::GLYPH_HEIGHT {
            bytes.push((n ^ y) as u8);
        }
    }
    bytes
}
