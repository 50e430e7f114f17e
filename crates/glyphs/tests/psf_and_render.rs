use std::io::Write as _;

use glyphs::{render_line, Font, FontError, GLYPH_COUNT, GLYPH_HEIGHT, GLYPH_WIDTH, TEXT_PALETTE};
use proptest::prelude::*;

fn psf1_bytes() -> Vec<u8> {
    let mut bytes = vec![0x36, 0x04, 0x00, 0x10];
    for n in 0..GLYPH_COUNT {
        for y in 0..GLYPH_HEIGHT {
            bytes.push((n.wrapping_mul(31) ^ y) as u8);
        }
    }
    bytes
}

#[test]
fn load_psf1_from_file() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("vga16.psf");
    std::fs::File::create(&path)
        .unwrap()
        .write_all(&psf1_bytes())
        .unwrap();

    let font = Font::load_psf1(&path).unwrap();
    assert_eq!(font.glyph(1)[0], 31);

    let missing = dir.path().join("nope.psf");
    assert!(matches!(Font::load_psf1(&missing), Err(FontError::Io(_))));
}

#[test]
fn font_with_512_glyph_table_loads_first_256() {
    let mut bytes = psf1_bytes();
    bytes[2] = 0x01; // mode: 512 glyphs
    bytes.extend(std::iter::repeat(0xAA).take(256 * GLYPH_HEIGHT));
    let font = Font::from_psf1_bytes(&bytes).unwrap();
    assert_eq!(font.glyph(255)[1], (255u8.wrapping_mul(31)) ^ 1);
}

proptest! {
    // Rendered line is exactly cols*8 wide and 16 scanlines tall, and each
    // pixel equals fg where the glyph bit is set and bg otherwise.
    #[test]
    fn rendered_pixels_match_glyph_bits(
        cols in 1usize..=80,
        fill in any::<u8>(),
        attr in any::<u8>(),
    ) {
        let font = Font::from_psf1_bytes(&psf1_bytes()).unwrap();
        let row: Vec<u16> = (0..cols)
            .map(|i| u16::from_le_bytes([fill.wrapping_add(i as u8), attr]))
            .collect();

        let need = cols * GLYPH_WIDTH * GLYPH_HEIGHT;
        let mut out = vec![0xFFFF_FFFFu32; need + 7];
        render_line(&font, &row, &mut out).unwrap();

        let fg = TEXT_PALETTE[(attr & 0x0F) as usize];
        let bg = TEXT_PALETTE[(attr >> 4) as usize];
        for y in 0..GLYPH_HEIGHT {
            for (i, &cell) in row.iter().enumerate() {
                let bits = font.glyph((cell & 0xFF) as u8)[y];
                for x in 0..GLYPH_WIDTH {
                    let px = out[(y * cols + i) * GLYPH_WIDTH + x];
                    let expect = if bits & (0x80 >> x) != 0 { fg } else { bg };
                    prop_assert_eq!(px, expect);
                }
            }
        }
        // Nothing past the line is touched.
        for &px in &out[need..] {
            prop_assert_eq!(px, 0xFFFF_FFFF);
        }
    }
}
