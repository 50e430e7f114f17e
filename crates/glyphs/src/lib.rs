//! PSF1 glyph rendering for the text-mode display path.
//!
//! The renderer consumes one text row of (character, attribute) cells and
//! produces 16 scanlines of 32-bpp pixels, MSB-first within each glyph
//! byte. Attribute low nibble selects the foreground, high nibble the
//! background, both through the fixed 16-color text palette.

use std::path::Path;

use thiserror::Error;

pub const GLYPH_COUNT: usize = 256;
pub const GLYPH_WIDTH: usize = 8;
pub const GLYPH_HEIGHT: usize = 16;

/// Widest text row the renderer accepts.
pub const MAX_COLUMNS: usize = 80;

/// 16-color text palette, BGRX.
pub const TEXT_PALETTE: [u32; 16] = [
    0x0000_0000,
    0x0000_00DD,
    0x0000_DD00,
    0x0000_DDDD,
    0x00DD_0000,
    0x00DD_00DD,
    0x00DD_DD00,
    0x00DD_DDDD,
    0x0055_5555,
    0x0000_00F0,
    0x0000_F000,
    0x0000_F0F0,
    0x00F0_0000,
    0x00F0_00F0,
    0x00F0_F000,
    0x00FF_FFFF,
];

const PSF1_MAGIC: [u8; 2] = [0x36, 0x04];
const PSF1_HEADER_LEN: usize = 4;

#[derive(Debug, Error)]
pub enum FontError {
    #[error("font file I/O: {0}")]
    Io(#[from] std::io::Error),
    #[error("not a PSF1 font")]
    BadMagic,
    #[error("unsupported glyph size {0} (need 8x16)")]
    UnsupportedGlyphSize(u8),
    #[error("font file truncated")]
    Truncated,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum RenderError {
    #[error("text row of {0} columns is wider than {MAX_COLUMNS}")]
    RowTooWide(usize),
    #[error("output buffer too small: need {need} pixels, have {have}")]
    OutputTooSmall { need: usize, have: usize },
}

/// An 8x16 bitmap font: 256 glyphs of 16 scanline bytes each.
pub struct Font {
    glyphs: Box<[[u8; GLYPH_HEIGHT]; GLYPH_COUNT]>,
}

impl Font {
    /// Load a PSF1 font file. Only the 8x16 layout is accepted; fonts with
    /// 512 glyphs are truncated to the first 256.
    pub fn load_psf1(path: &Path) -> Result<Self, FontError> {
        Self::from_psf1_bytes(&std::fs::read(path)?)
    }

    pub fn from_psf1_bytes(bytes: &[u8]) -> Result<Self, FontError> {
        let header = bytes.get(..PSF1_HEADER_LEN).ok_or(FontError::Truncated)?;
        if header[..2] != PSF1_MAGIC {
            return Err(FontError::BadMagic);
        }
        let charsize = header[3];
        if charsize as usize != GLYPH_HEIGHT {
            return Err(FontError::UnsupportedGlyphSize(charsize));
        }

        let data = bytes
            .get(PSF1_HEADER_LEN..PSF1_HEADER_LEN + GLYPH_COUNT * GLYPH_HEIGHT)
            .ok_or(FontError::Truncated)?;
        let mut glyphs = Box::new([[0u8; GLYPH_HEIGHT]; GLYPH_COUNT]);
        for (i, glyph) in glyphs.iter_mut().enumerate() {
            glyph.copy_from_slice(&data[i * GLYPH_HEIGHT..(i + 1) * GLYPH_HEIGHT]);
        }
        Ok(Self { glyphs })
    }

    pub fn glyph(&self, ch: u8) -> &[u8; GLYPH_HEIGHT] {
        &self.glyphs[ch as usize]
    }
}

#[inline]
fn expand_bits(bits: u8, out: &mut [u32], fg: u32, bg: u32) {
    for (x, px) in out.iter_mut().enumerate() {
        *px = if bits & (0x80 >> x) != 0 { fg } else { bg };
    }
}

/// Render one text row into `out`, which receives
/// `row.len() * 8 * 16` pixels: 16 scanlines, each `row.len() * 8` wide.
pub fn render_line(font: &Font, row: &[u16], out: &mut [u32]) -> Result<(), RenderError> {
    let cols = row.len();
    if cols > MAX_COLUMNS {
        return Err(RenderError::RowTooWide(cols));
    }
    let need = cols * GLYPH_WIDTH * GLYPH_HEIGHT;
    if out.len() < need {
        return Err(RenderError::OutputTooSmall {
            need,
            have: out.len(),
        });
    }

    let mut pos = 0;
    for y in 0..GLYPH_HEIGHT {
        for &cell in row {
            let ch = (cell & 0xFF) as u8;
            let attr = (cell >> 8) as u8;
            let fg = TEXT_PALETTE[(attr & 0x0F) as usize];
            let bg = TEXT_PALETTE[(attr >> 4) as usize];
            let bits = font.glyph(ch)[y];
            expand_bits(bits, &mut out[pos..pos + GLYPH_WIDTH], fg, bg);
            pos += GLYPH_WIDTH;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    pub(crate) fn test_font() -> Font {
        let mut bytes = vec![0x36, 0x04, 0x00, 0x10];
        // Glyph n scanline y = n ^ y, an easy pattern to assert on.
        for n in 0..GLYPH_COUNT {
            for y in 0..GLYPH_HEIGHT {
                bytes.push((n ^ y) as u8);
            }
        }
        Font::from_psf1_bytes(&bytes).unwrap()
    }

    #[test]
    fn msb_is_leftmost_pixel() {
        let font = test_font();
        // Glyph 0x80 scanline 0 is 0b1000_0000.
        let row = [0x0F00u16 | 0x80];
        let mut out = [0u32; GLYPH_WIDTH * GLYPH_HEIGHT];
        render_line(&font, &row, &mut out).unwrap();
        assert_eq!(out[0], TEXT_PALETTE[0x0F]);
        for px in &out[1..GLYPH_WIDTH] {
            assert_eq!(*px, TEXT_PALETTE[0]);
        }
    }

    #[test]
    fn attribute_nibbles_select_fg_and_bg() {
        let font = test_font();
        // Glyph 0xFF scanline 0 = 0xFF: all foreground.
        let row = [0x4100u16 | 0xFF];
        let mut out = [0u32; GLYPH_WIDTH * GLYPH_HEIGHT];
        render_line(&font, &row, &mut out).unwrap();
        for px in &out[..GLYPH_WIDTH] {
            assert_eq!(*px, TEXT_PALETTE[1]);
        }
        // Scanline 1 of glyph 0xFF = 0xFE: last pixel is background.
        assert_eq!(out[GLYPH_WIDTH * 2 - 1], TEXT_PALETTE[4]);
    }

    #[test]
    fn wide_rows_are_rejected() {
        let font = test_font();
        let row = [0u16; MAX_COLUMNS + 1];
        let mut out = vec![0u32; (MAX_COLUMNS + 1) * GLYPH_WIDTH * GLYPH_HEIGHT];
        assert_eq!(
            render_line(&font, &row, &mut out),
            Err(RenderError::RowTooWide(MAX_COLUMNS + 1))
        );
    }

    #[test]
    fn psf1_header_is_validated() {
        assert!(matches!(
            Font::from_psf1_bytes(&[0x36, 0x05, 0, 0x10]),
            Err(FontError::BadMagic)
        ));
        assert!(matches!(
            Font::from_psf1_bytes(&[0x36, 0x04, 0, 0x08]),
            Err(FontError::UnsupportedGlyphSize(8))
        ));
        assert!(matches!(
            Font::from_psf1_bytes(&[0x36, 0x04, 0, 0x10]),
            Err(FontError::Truncated)
        ));
    }
}
